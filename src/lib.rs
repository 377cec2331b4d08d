//! Zero-copy HTTP/1.x message serializer.
//!
//! The serializer assembles an outgoing request or response on the wire from
//! an already-serialized header block plus a body delivered as in-memory
//! buffers, a pull-style [`Source`](protocol::Source), or a push-style
//! [`Stream`](codec::Stream). All scratch memory is carved from one fixed
//! workspace at construction; `prepare`/`consume` drive transmission without
//! further allocation.

pub mod buffer;
pub mod codec;
pub mod protocol;

pub(crate) use help::ensure;

mod help {

    macro_rules! ensure {
        ($predicate:expr, $error:expr) => {
            if !$predicate {
                return Err($error);
            }
        };
    }
    pub(crate) use ensure;
}
