//! Byte-arena primitives backing the serializer.
//!
//! All scratch memory used while serializing a message comes from a single
//! [`Workspace`] sized once at construction. [`Ring`] is a producer/consumer
//! cursor pair over an offset window of that arena; it deals purely in index
//! ranges so the arena bytes and the cursor state can be borrowed
//! independently.

mod ring;
pub use ring::Ring;

mod workspace;
pub use workspace::Workspace;
