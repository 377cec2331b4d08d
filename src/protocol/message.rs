use bytes::Bytes;

/// The content coding applied to the message body on the wire.
///
/// Codings beyond these three are negotiated away before serialization;
/// the serializer only ever sees the resolved value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ContentCoding {
    /// No transformation
    #[default]
    Identity,
    /// zlib-wrapped deflate (RFC 1950)
    Deflate,
    /// gzip (RFC 1952)
    Gzip,
}

impl ContentCoding {
    /// Returns true if the body is compressed on the wire
    #[inline]
    pub fn is_compressed(&self) -> bool {
        !matches!(self, ContentCoding::Identity)
    }
}

/// The header block of a message about to be serialized.
///
/// Holds the flat byte image of the start-line and fields (terminated by
/// the final CRLF pair) together with the metadata bits the serializer
/// consumes. The image is taken as [`Bytes`] so the serializer can hold on
/// to it for the duration of serialization without copying.
///
/// Metadata is trusted: the serializer does not re-parse the image or
/// cross-check the flags against it. Producing a consistent head is the
/// header builder's job.
#[derive(Debug, Clone)]
pub struct MessageHead {
    image: Bytes,
    expect_continue: bool,
    chunked: bool,
    coding: ContentCoding,
}

impl MessageHead {
    /// Creates a head over an already-serialized header image.
    ///
    /// Defaults: no `Expect: 100-continue`, not chunked, identity coding.
    pub fn new(image: impl Into<Bytes>) -> Self {
        Self { image: image.into(), expect_continue: false, chunked: false, coding: ContentCoding::Identity }
    }

    /// Marks the message as using chunked transfer encoding
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    /// Marks the header as carrying `Expect: 100-continue`
    pub fn expect_continue(mut self) -> Self {
        self.expect_continue = true;
        self
    }

    /// Sets the content coding of the body
    pub fn content_coding(mut self, coding: ContentCoding) -> Self {
        self.coding = coding;
        self
    }

    /// The flat header byte image
    #[inline]
    pub fn image(&self) -> &Bytes {
        &self.image
    }

    #[inline]
    pub fn is_expect_continue(&self) -> bool {
        self.expect_continue
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    #[inline]
    pub fn coding(&self) -> ContentCoding {
        self.coding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let head = MessageHead::new(&b"HTTP/1.1 200 OK\r\n\r\n"[..]);
        assert!(!head.is_chunked());
        assert!(!head.is_expect_continue());
        assert_eq!(head.coding(), ContentCoding::Identity);
        assert!(!head.coding().is_compressed());
    }

    #[test]
    fn builder_flags() {
        let head = MessageHead::new(&b"HTTP/1.1 200 OK\r\n\r\n"[..])
            .chunked()
            .expect_continue()
            .content_coding(ContentCoding::Gzip);
        assert!(head.is_chunked());
        assert!(head.is_expect_continue());
        assert!(head.coding().is_compressed());
    }
}
