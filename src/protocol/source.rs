use bytes::Bytes;
use std::io;

/// Result of one pull from a body [`Source`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SourcePull {
    /// Bytes written into the destination
    pub bytes: usize,
    /// True when the source has reached end of body on this call
    pub finished: bool,
}

/// A pull-style producer of body bytes.
///
/// The serializer calls [`pull`](Source::pull) with a destination carved
/// from its workspace and frames whatever the source delivers. A source may
/// legitimately return zero bytes without finishing (nothing available this
/// round); the serializer will not emit an empty chunk for it. Errors
/// terminate the body and are forwarded to the caller of `prepare`.
pub trait Source {
    /// Writes up to `dst.len()` body bytes into `dst`.
    fn pull(&mut self, dst: &mut [u8]) -> io::Result<SourcePull>;
}

/// A source over an in-memory byte buffer.
///
/// Delivers as much as the destination holds per pull. Mainly useful in
/// tests and for small fixed bodies.
pub struct BytesSource {
    data: Bytes,
    pos: usize,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into(), pos: 0 }
    }
}

impl Source for BytesSource {
    fn pull(&mut self, dst: &mut [u8]) -> io::Result<SourcePull> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(dst.len());
        dst[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(SourcePull { bytes: n, finished: self.pos == self.data.len() })
    }
}
