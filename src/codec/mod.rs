//! Message serialization machinery.
//!
//! The [`Serializer`] is the entry point: it turns a header image plus a
//! body (none, buffers, a pull [`Source`](crate::protocol::Source), or a
//! push [`Stream`]) into successive [`WireView`]s of ready-to-transmit
//! byte ranges, applying chunked framing and deflate/gzip content coding
//! as the message metadata dictates.
//!
//! # Components
//!
//! - [`Serializer`]: lifecycle (`start_*` / `prepare` / `consume`) and the
//!   body-style state machine
//! - [`Stream`]: push-side handle writing body bytes straight into the
//!   workspace
//! - [`WireView`]: the scatter/gather transmit view
//! - [`Filter`]: streaming content-coding contract, with the
//!   [`DeflateFilter`] and [`GzipFilter`] adapters
//! - [`chunk`]: chunked transfer encoding constants and framing helpers

pub mod chunk;

mod filter;
pub use filter::DeflateFilter;
pub use filter::Filter;
pub use filter::FilterStatus;
pub use filter::GzipFilter;

mod serializer;
pub use serializer::Serializer;

mod stream;
pub use stream::Stream;
pub use stream::WriteView;

mod view;
pub use view::WireView;
pub use view::MAX_SLOTS;

pub use flate2::Compression;
