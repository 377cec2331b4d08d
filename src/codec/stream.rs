use std::ops::Range;

use crate::codec::chunk::{self, CHUNKED_OVERHEAD, CHUNK_HEADER_LEN};
use crate::codec::serializer::Serializer;
use crate::ensure;
use crate::protocol::SerializeError;

/// Push-side handle over a stream-style body.
///
/// The caller writes body bytes directly into the serializer's workspace:
/// [`prepare`](Stream::prepare) opens a writable window,
/// [`commit`](Stream::commit) frames and publishes the bytes written into
/// it, and [`close`](Stream::close) ends the body. The handle borrows the
/// serializer mutably, so it is dropped before `Serializer::prepare` and
/// re-acquired with [`Serializer::stream`] as needed.
pub struct Stream<'a> {
    sr: &'a mut Serializer,
}

/// A writable window into the serializer's workspace, split in two when it
/// crosses the ring boundary.
pub struct WriteView<'a> {
    parts: [&'a mut [u8]; 2],
}

impl<'a> WriteView<'a> {
    fn new(a: &'a mut [u8], b: &'a mut [u8]) -> Self {
        Self { parts: [a, b] }
    }

    /// Total writable bytes.
    pub fn len(&self) -> usize {
        self.parts[0].len() + self.parts[1].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The two windows, in write order; the second is empty unless the
    /// window wraps.
    pub fn parts_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        let [a, b] = &mut self.parts;
        (&mut **a, &mut **b)
    }

    /// Copies `src` into the front of the window, returning how many bytes
    /// fit.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let k = src.len().min(self.parts[0].len());
        self.parts[0][..k].copy_from_slice(&src[..k]);
        let rest = &src[k..];
        let m = rest.len().min(self.parts[1].len());
        self.parts[1][..m].copy_from_slice(&rest[..m]);
        k + m
    }
}

/// Splits the header slot off the front of a prepared window.
fn skip_front((a, b): (Range<usize>, Range<usize>), n: usize) -> (Range<usize>, Range<usize>) {
    if n < a.len() {
        (a.start + n..a.end, b)
    } else {
        let spill = n - a.len();
        (b.start + spill..b.end, 0..0)
    }
}

impl<'a> Stream<'a> {
    pub(crate) fn new(sr: &'a mut Serializer) -> Self {
        Self { sr }
    }

    /// Size of the backing buffer window, fixed when the body was
    /// started. Bytes buffered via [`commit`](Stream::commit) count
    /// against it until the serializer drains them.
    pub fn capacity(&self) -> usize {
        if self.sr.compressed {
            self.sr.tmp1.capacity()
        } else {
            self.sr.tmp0.capacity()
        }
    }

    /// Body bytes buffered and not yet handed to the serializer.
    pub fn len(&self) -> usize {
        if self.sr.compressed {
            self.sr.tmp1.len()
        } else {
            self.sr.tmp0.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when another `commit` could not make progress; the serializer
    /// must be drained first. A chunked stream needs room for the full
    /// chunk envelope, not just one byte.
    pub fn is_full(&self) -> bool {
        let free = if self.sr.compressed {
            self.sr.tmp1.remaining()
        } else {
            self.sr.tmp0.remaining()
        };
        if self.sr.chunked && !self.sr.compressed {
            free < CHUNKED_OVERHEAD + 1
        } else {
            free == 0
        }
    }

    /// Opens a writable window for body bytes.
    ///
    /// In chunked mode the window unconditionally reserves space for the
    /// chunk header in front and the chunk close plus last chunk behind,
    /// so `commit(n); close()` always succeeds without interleaved
    /// draining. Returns `BufferTooSmall` when not even a one-byte chunk
    /// would fit; drain the serializer and retry.
    pub fn prepare(&mut self) -> Result<WriteView<'_>, SerializeError> {
        if self.sr.compressed {
            let (a, b) = self.sr.tmp1.prepare(self.sr.tmp1.remaining());
            let (s1, s2) = self.sr.ws.split_mut2(a, b);
            return Ok(WriteView::new(s1, s2));
        }

        let free = self.sr.tmp0.remaining();
        if self.sr.chunked {
            ensure!(
                free >= CHUNKED_OVERHEAD + 1,
                SerializeError::buffer_too_small(free, CHUNKED_OVERHEAD + 1)
            );
            let n = free - CHUNKED_OVERHEAD;
            let window = self.sr.tmp0.prepare(CHUNK_HEADER_LEN + n);
            let (a, b) = skip_front(window, CHUNK_HEADER_LEN);
            let (s1, s2) = self.sr.ws.split_mut2(a, b);
            return Ok(WriteView::new(s1, s2));
        }

        let (a, b) = self.sr.tmp0.prepare(free);
        let (s1, s2) = self.sr.ws.split_mut2(a, b);
        Ok(WriteView::new(s1, s2))
    }

    /// Publishes the first `n` bytes written into the prepared window.
    ///
    /// In chunked mode this writes the chunk header for the `n` bytes and
    /// closes the chunk.
    ///
    /// # Panics
    /// Panics on `commit(0)` in chunked mode (a zero-length chunk would
    /// terminate the body; use [`close`](Stream::close) for that) and when
    /// `n` exceeds the prepared window.
    pub fn commit(&mut self, n: usize) {
        if self.sr.compressed {
            self.sr.tmp1.commit(n);
            return;
        }

        if !self.sr.chunked {
            self.sr.tmp0.commit(n);
            return;
        }

        assert!(n != 0, "zero-length chunks are not valid; use close() to end the body");
        let window = self.sr.tmp0.prepare(CHUNK_HEADER_LEN + n);
        self.sr.ws.put_split(window, &chunk::format_chunk_header(n));
        self.sr.tmp0.commit(CHUNK_HEADER_LEN + n);
        chunk::write_chunk_close(&mut self.sr.tmp0, &mut self.sr.ws);
    }

    /// Ends the body. In chunked mode (uncompressed) this emits the
    /// last-chunk marker; a compressed body is closed by the flush round
    /// of the next `Serializer::prepare`.
    ///
    /// # Panics
    /// Panics if the body was already closed.
    pub fn close(&mut self) {
        assert!(self.sr.more, "stream body already closed");
        if self.sr.chunked && !self.sr.compressed {
            chunk::write_last_chunk(&mut self.sr.tmp0, &mut self.sr.ws);
        }
        self.sr.more = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageHead;

    fn drain(sr: &mut Serializer) -> Vec<u8> {
        let mut wire = Vec::new();
        while !sr.is_done() {
            match sr.prepare() {
                Ok(view) => {
                    let bytes = view.copy_to_vec();
                    sr.consume(bytes.len());
                    wire.extend_from_slice(&bytes);
                }
                Err(SerializeError::NeedData) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        wire
    }

    #[test]
    fn chunked_two_commits_then_close() {
        let head = MessageHead::new(&b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"[..]).chunked();
        let mut sr = Serializer::new(256);
        sr.start_stream(&head).unwrap();

        let mut stream = sr.stream();
        let mut window = stream.prepare().unwrap();
        assert_eq!(window.write(b"Hello"), 5);
        drop(window);
        stream.commit(5);

        let mut window = stream.prepare().unwrap();
        assert_eq!(window.write(b"World!"), 6);
        drop(window);
        stream.commit(6);
        stream.close();

        let wire = drain(&mut sr);
        let expected: Vec<u8> = [
            &b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"[..],
            b"0000000000000005\r\nHello\r\n",
            b"0000000000000006\r\nWorld!\r\n",
            b"0\r\n\r\n",
        ]
        .concat();
        assert_eq!(wire, expected);
        assert!(sr.is_done());
    }

    #[test]
    fn chunked_window_reserves_envelope() {
        let head = MessageHead::new(&b"H\r\n\r\n"[..]).chunked();
        let mut sr = Serializer::new(100);
        sr.start_stream(&head).unwrap();

        let mut stream = sr.stream();
        let window = stream.prepare().unwrap();
        // everything except the chunk header and the trailing envelope is
        // writable
        assert_eq!(window.len(), 100 - CHUNKED_OVERHEAD);
        drop(window);

        // fill the whole window, then close without draining in between
        let mut window = stream.prepare().unwrap();
        let max = window.len();
        let payload = vec![b'x'; max];
        assert_eq!(window.write(&payload), max);
        drop(window);
        stream.commit(max);
        assert!(stream.is_full());
        stream.close();

        let wire = drain(&mut sr);
        assert!(wire.ends_with(b"0\r\n\r\n"));
    }

    #[test]
    fn plain_stream_passthrough() {
        let head = MessageHead::new(&b"H\r\n\r\n"[..]);
        let mut sr = Serializer::new(64);
        sr.start_stream(&head).unwrap();

        let mut stream = sr.stream();
        assert_eq!(stream.capacity(), 64);
        let mut window = stream.prepare().unwrap();
        assert_eq!(window.write(b"abc"), 3);
        drop(window);
        stream.commit(3);
        assert_eq!(stream.len(), 3);
        // capacity is the fixed window size, not the space left in it
        assert_eq!(stream.capacity(), 64);
        stream.close();

        let wire = drain(&mut sr);
        assert_eq!(wire, b"H\r\n\r\nabc");
    }

    #[test]
    #[should_panic(expected = "zero-length chunks are not valid")]
    fn chunked_commit_zero_panics() {
        let head = MessageHead::new(&b"H\r\n\r\n"[..]).chunked();
        let mut sr = Serializer::new(256);
        sr.start_stream(&head).unwrap();
        sr.stream().commit(0);
    }

    #[test]
    #[should_panic(expected = "stream body already closed")]
    fn double_close_panics() {
        let head = MessageHead::new(&b"H\r\n\r\n"[..]);
        let mut sr = Serializer::new(256);
        sr.start_stream(&head).unwrap();
        let mut stream = sr.stream();
        stream.close();
        stream.close();
    }

    #[test]
    fn prepare_too_small_after_fill() {
        let head = MessageHead::new(&b"H\r\n\r\n"[..]).chunked();
        let mut sr = Serializer::new(26);
        sr.start_stream(&head).unwrap();

        let mut stream = sr.stream();
        let mut window = stream.prepare().unwrap();
        assert_eq!(window.len(), 1);
        window.write(b"x");
        drop(window);
        stream.commit(1);

        // the envelope space is spoken for until the serializer drains,
        // while the window size itself never changes
        assert!(stream.is_full());
        assert_eq!(stream.capacity(), 26);
        assert!(matches!(stream.prepare(), Err(SerializeError::BufferTooSmall { .. })));
    }
}
