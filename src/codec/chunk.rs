//! Chunked transfer encoding framing (RFC 7230 section 4.1).
//!
//! Chunk headers are emitted at a fixed width: 16 uppercase hex digits,
//! zero-padded on the left, then CRLF. The fixed width lets callers
//! reserve the header slot before the chunk length is known; conformant
//! readers tolerate the leading zeros.

use crate::buffer::{Ring, Workspace};

/// Length of an emitted chunk header: 16 hex digits plus CRLF.
pub const CHUNK_HEADER_LEN: usize = 18;

/// Length of the CRLF closing each chunk data block.
pub const CRLF_LEN: usize = 2;

/// Length of the last-chunk marker.
pub const LAST_CHUNK_LEN: usize = 5;

/// Workspace reservation covering a full chunk envelope:
/// chunk header + closing CRLF + last-chunk marker.
pub const CHUNKED_OVERHEAD: usize = CHUNK_HEADER_LEN + CRLF_LEN + LAST_CHUNK_LEN;

/// CRLF closing a chunk data block.
pub const CRLF: &[u8; CRLF_LEN] = b"\r\n";

/// The last-chunk marker ending a chunked body.
pub const LAST_CHUNK: &[u8; LAST_CHUNK_LEN] = b"0\r\n\r\n";

/// Fused chunk-close plus last-chunk, appended after a single known-length
/// chunk.
pub const CHUNK_TRAILER: &[u8; CRLF_LEN + LAST_CHUNK_LEN] = b"\r\n0\r\n\r\n";

const HEXDIG: &[u8; 16] = b"0123456789ABCDEF";

/// Formats the fixed-width header introducing a chunk of `size` bytes.
pub fn format_chunk_header(mut size: usize) -> [u8; CHUNK_HEADER_LEN] {
    let mut buf = [0u8; CHUNK_HEADER_LEN];
    for digit in buf[..16].iter_mut().rev() {
        *digit = HEXDIG[size & 0xf];
        size >>= 4;
    }
    buf[16] = b'\r';
    buf[17] = b'\n';
    buf
}

/// Appends the CRLF closing a chunk data block to a ring.
pub fn write_chunk_close(ring: &mut Ring, ws: &mut Workspace) {
    push(ring, ws, CRLF);
}

/// Appends the last-chunk marker to a ring.
pub fn write_last_chunk(ring: &mut Ring, ws: &mut Workspace) {
    push(ring, ws, LAST_CHUNK);
}

fn push(ring: &mut Ring, ws: &mut Workspace, lit: &[u8]) {
    let dst = ring.prepare(lit.len());
    ws.put_split(dst, lit);
    ring.commit(lit.len());
}
