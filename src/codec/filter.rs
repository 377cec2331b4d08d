//! Streaming content-coding filters.
//!
//! A [`Filter`] is invoked with one input range and one output range per
//! call and reports how much of each it used. The serializer drives it
//! with whatever ranges its workspace can spare, so filters must tolerate
//! partial input consumption and partial output production, down to
//! single-digit byte counts.
//!
//! Both adapters wrap the streaming half of `flate2`. The gzip member
//! frames the raw deflate stream itself (RFC 1952 header, CRC32 + ISIZE
//! trailer) so the whole transform fits the fixed-range calling
//! convention.

use flate2::{Compress, Compression, FlushCompress, Status};
use tracing::trace;

use crate::protocol::SerializeError;

/// Result of one filter invocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FilterStatus {
    /// Bytes consumed from the input range
    pub in_bytes: usize,
    /// Bytes produced into the output range
    pub out_bytes: usize,
    /// True once the terminal bytes of the coded stream have been emitted
    pub finished: bool,
}

/// A streaming byte transformer with explicit flush control.
///
/// `more == false` tells the filter no further input will ever arrive;
/// it must then drain its internal state and report `finished == true` in
/// the same call that emits its terminal bytes.
pub trait Filter {
    fn process(&mut self, out: &mut [u8], input: &[u8], more: bool) -> Result<FilterStatus, SerializeError>;
}

fn deflate_round(z: &mut Compress, out: &mut [u8], input: &[u8], more: bool) -> Result<FilterStatus, SerializeError> {
    let before_in = z.total_in();
    let before_out = z.total_out();
    let flush = if more { FlushCompress::None } else { FlushCompress::Finish };
    let status = z.compress(input, out, flush).map_err(SerializeError::compress)?;
    Ok(FilterStatus {
        in_bytes: (z.total_in() - before_in) as usize,
        out_bytes: (z.total_out() - before_out) as usize,
        finished: matches!(status, Status::StreamEnd),
    })
}

/// `deflate` content coding: a zlib-wrapped deflate stream (RFC 1950).
pub struct DeflateFilter {
    z: Compress,
}

impl DeflateFilter {
    pub fn new(level: Compression) -> Self {
        Self { z: Compress::new(level, true) }
    }
}

impl Filter for DeflateFilter {
    fn process(&mut self, out: &mut [u8], input: &[u8], more: bool) -> Result<FilterStatus, SerializeError> {
        let status = deflate_round(&mut self.z, out, input, more)?;
        if status.finished {
            trace!(total_out = self.z.total_out(), "deflate stream finished");
        }
        Ok(status)
    }
}

const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff];
const GZIP_TRAILER_LEN: usize = 8;

/// `gzip` content coding (RFC 1952): header, raw deflate stream, then a
/// CRC32/ISIZE trailer, all emitted through the range-pair interface.
pub struct GzipFilter {
    z: Compress,
    crc: crc32fast::Hasher,
    isize: u32,
    header_pos: usize,
    trailer: [u8; GZIP_TRAILER_LEN],
    trailer_pos: usize,
    trailer_ready: bool,
}

impl GzipFilter {
    pub fn new(level: Compression) -> Self {
        Self {
            z: Compress::new(level, false),
            crc: crc32fast::Hasher::new(),
            isize: 0,
            header_pos: 0,
            trailer: [0u8; GZIP_TRAILER_LEN],
            trailer_pos: 0,
            trailer_ready: false,
        }
    }
}

impl Filter for GzipFilter {
    fn process(&mut self, out: &mut [u8], input: &[u8], more: bool) -> Result<FilterStatus, SerializeError> {
        let mut out_bytes = 0;

        if self.header_pos < GZIP_HEADER.len() {
            let n = (GZIP_HEADER.len() - self.header_pos).min(out.len());
            out[..n].copy_from_slice(&GZIP_HEADER[self.header_pos..self.header_pos + n]);
            self.header_pos += n;
            out_bytes += n;
            if self.header_pos < GZIP_HEADER.len() {
                return Ok(FilterStatus { in_bytes: 0, out_bytes, finished: false });
            }
        }

        let mut in_bytes = 0;
        if !self.trailer_ready {
            let status = deflate_round(&mut self.z, &mut out[out_bytes..], input, more)?;
            in_bytes = status.in_bytes;
            out_bytes += status.out_bytes;
            self.crc.update(&input[..in_bytes]);
            self.isize = self.isize.wrapping_add(in_bytes as u32);
            if status.finished {
                let crc = self.crc.clone().finalize();
                self.trailer[..4].copy_from_slice(&crc.to_le_bytes());
                self.trailer[4..].copy_from_slice(&self.isize.to_le_bytes());
                self.trailer_ready = true;
                trace!(isize = self.isize, "gzip deflate stream finished, emitting trailer");
            }
        }

        let mut finished = false;
        if self.trailer_ready {
            let n = (GZIP_TRAILER_LEN - self.trailer_pos).min(out.len() - out_bytes);
            out[out_bytes..out_bytes + n].copy_from_slice(&self.trailer[self.trailer_pos..self.trailer_pos + n]);
            self.trailer_pos += n;
            out_bytes += n;
            finished = self.trailer_pos == GZIP_TRAILER_LEN;
        }

        Ok(FilterStatus { in_bytes, out_bytes, finished })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::{GzDecoder, ZlibDecoder};
    use std::io::Read;

    fn drain(filter: &mut dyn Filter, body: &[u8], out_chunk: usize) -> Vec<u8> {
        let mut coded = Vec::new();
        let mut pos = 0;
        let mut buf = vec![0u8; out_chunk];
        loop {
            let more = false;
            let status = filter.process(&mut buf, &body[pos..], more).unwrap();
            pos += status.in_bytes;
            coded.extend_from_slice(&buf[..status.out_bytes]);
            if status.finished {
                break;
            }
        }
        assert_eq!(pos, body.len());
        coded
    }

    #[test]
    fn deflate_roundtrip() {
        let body = b"hello world hello world hello world";
        let mut filter = DeflateFilter::new(Compression::default());
        let coded = drain(&mut filter, body, 256);

        let mut decoded = Vec::new();
        ZlibDecoder::new(&coded[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn deflate_empty_body() {
        let mut filter = DeflateFilter::new(Compression::default());
        let coded = drain(&mut filter, b"", 64);
        assert!(!coded.is_empty());

        let mut decoded = Vec::new();
        ZlibDecoder::new(&coded[..]).read_to_end(&mut decoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn gzip_roundtrip() {
        let body = vec![0u8; 1000];
        let mut filter = GzipFilter::new(Compression::default());
        let coded = drain(&mut filter, &body, 256);
        assert_eq!(&coded[..2], &[0x1f, 0x8b]);

        let mut decoded = Vec::new();
        GzDecoder::new(&coded[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn gzip_tiny_output_ranges() {
        // header, stream and trailer all have to split across calls
        let body = b"abcdefghij";
        let mut filter = GzipFilter::new(Compression::default());
        let coded = drain(&mut filter, body, 4);

        let mut decoded = Vec::new();
        GzDecoder::new(&coded[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn gzip_header_emitted_before_input_consumed() {
        let mut filter = GzipFilter::new(Compression::default());
        let mut out = [0u8; 4];
        let status = filter.process(&mut out, b"data", true).unwrap();
        assert_eq!(status.in_bytes, 0);
        assert_eq!(status.out_bytes, 4);
        assert!(!status.finished);
        assert_eq!(&out, &GZIP_HEADER[..4]);
    }
}
