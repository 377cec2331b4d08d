//! Error types for message serialization
//!
//! This module provides the error type surfaced by the serializer's
//! fallible operations. Recoverable conditions are returned as values;
//! precondition violations (calling `prepare` after completion, committing
//! a zero-length chunk, and so on) are programmer errors and panic at the
//! call site.
use std::io;
use thiserror::Error;

/// Errors surfaced while serializing an HTTP/1.x message
///
/// The first two variants are flow-control signals rather than failures:
/// the caller is expected to satisfy the condition and call `prepare`
/// again, which then produces the same view it would have produced.
#[derive(Error, Debug)]
pub enum SerializeError {
    /// The header carried `Expect: 100-continue` and has been fully
    /// transmitted; the caller must receive the interim response before
    /// resuming body serialization
    #[error("expect 100-continue: awaiting interim response before body")]
    ExpectContinue,

    /// A stream-style body has no buffered data; the caller must push
    /// bytes through the stream handle first
    #[error("stream body has no buffered data")]
    NeedData,

    /// The workspace cannot accommodate the framing required by the
    /// requested body style
    #[error("workspace too small: capacity {capacity} below required {required}")]
    BufferTooSmall { capacity: usize, required: usize },

    /// More body buffers were supplied than the wire view has slots for
    #[error("too many body buffers: {count} exceed the limit {max}")]
    TooManyBuffers { count: usize, max: usize },

    /// Error reported by the body source; the body is terminated
    #[error("body source error: {source}")]
    Source {
        #[from]
        source: io::Error,
    },

    /// The compression filter failed
    #[error("compression error: {reason}")]
    Compress { reason: String },
}

impl SerializeError {
    /// Creates a new BufferTooSmall error
    pub fn buffer_too_small(capacity: usize, required: usize) -> Self {
        Self::BufferTooSmall { capacity, required }
    }

    /// Creates a new TooManyBuffers error
    pub fn too_many_buffers(count: usize, max: usize) -> Self {
        Self::TooManyBuffers { count, max }
    }

    /// Creates a new Compress error
    pub fn compress<S: ToString>(reason: S) -> Self {
        Self::Compress { reason: reason.to_string() }
    }
}
