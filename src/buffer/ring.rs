use std::ops::Range;

/// Producer/consumer ring over a fixed window of the workspace.
///
/// The ring never touches bytes itself: it tracks cursors over an offset
/// window `[base, base + capacity)` and hands out *absolute* index ranges
/// into the workspace. A view may span the physical end of the window, in
/// which case it is split into two ranges; the second range is empty when
/// no wrap occurs.
///
/// Writing is a two-step protocol: [`prepare`](Ring::prepare) returns
/// writable ranges past the committed region, and [`commit`](Ring::commit)
/// marks the first `n` of those bytes readable. `prepare` is pure: calling
/// it twice without an intervening `commit` returns the same ranges.
///
/// When a [`consume`](Ring::consume) drains the ring completely, the
/// cursors rewind to the window start so the next round of writes is
/// maximally contiguous.
#[derive(Debug, Clone, Default)]
pub struct Ring {
    base: usize,
    cap: usize,
    head: usize,
    len: usize,
}

impl Ring {
    /// Creates a ring over the window `range` of the workspace.
    pub fn new(range: Range<usize>) -> Self {
        Self { base: range.start, cap: range.len(), head: 0, len: 0 }
    }

    /// Total window size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Committed bytes not yet consumed.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writable bytes left in the window.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.cap - self.len
    }

    /// Returns up to two writable ranges totalling `min(n, remaining())`.
    pub fn prepare(&self, n: usize) -> (Range<usize>, Range<usize>) {
        let m = n.min(self.remaining());
        let wpos = (self.head + self.len) % self.cap.max(1);
        let first = m.min(self.cap - wpos);
        (
            self.base + wpos..self.base + wpos + first,
            self.base..self.base + (m - first),
        )
    }

    /// Marks the next `n` prepared bytes as readable.
    ///
    /// # Panics
    /// Panics if `n` exceeds the writable space.
    pub fn commit(&mut self, n: usize) {
        assert!(n <= self.remaining(), "ring commit past prepared space");
        self.len += n;
    }

    /// Returns up to two readable ranges totalling `len()`.
    pub fn data(&self) -> (Range<usize>, Range<usize>) {
        let first = self.len.min(self.cap - self.head);
        (
            self.base + self.head..self.base + self.head + first,
            self.base..self.base + (self.len - first),
        )
    }

    /// Advances the read cursor by `n`.
    ///
    /// # Panics
    /// Panics if `n` exceeds the readable bytes.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len, "ring consume past committed data");
        self.len -= n;
        if self.len == 0 {
            // rewind so the next write round is contiguous
            self.head = 0;
        } else {
            self.head = (self.head + n) % self.cap;
        }
    }
}
