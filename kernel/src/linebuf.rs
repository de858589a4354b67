use crate::error::{ConsoleError, Result};
use crate::param::BUFSIZE;

pub const EOF_BYTE: u8 = 0x04;

// r, w, e, c grow without bound and are masked into [0, BUFSIZE) on every
// access, so wraparound never needs special-casing.
#[derive(Debug)]
pub struct LineBuffer {
    buf: [u8; BUFSIZE],
    r: usize,
    w: usize,
    e: usize,
    c: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub const fn new() -> Self {
        LineBuffer {
            buf: [0; BUFSIZE],
            r: 0,
            w: 0,
            e: 0,
            c: 0,
        }
    }

    pub fn r(&self) -> usize {
        self.r
    }

    pub fn w(&self) -> usize {
        self.w
    }

    pub fn e(&self) -> usize {
        self.e
    }

    pub fn c(&self) -> usize {
        self.c
    }

    // Caller clamps to [w, e]; this just stores it.
    pub fn set_c(&mut self, c: usize) {
        debug_assert!(c >= self.w && c <= self.e);
        self.c = c;
    }

    pub fn is_editable_empty(&self) -> bool {
        self.w == self.e
    }

    pub fn is_full(&self) -> bool {
        self.e - self.r >= BUFSIZE
    }

    pub fn has_committed_bytes(&self) -> bool {
        self.r != self.w
    }

    pub fn byte_at(&self, pos: usize) -> u8 {
        self.buf[pos & (BUFSIZE - 1)]
    }

    fn store(&mut self, pos: usize, byte: u8) {
        self.buf[pos & (BUFSIZE - 1)] = byte;
    }

    pub fn read_byte_into(&mut self) -> Result<u8> {
        if self.r == self.w {
            return Err(ConsoleError::Underflow);
        }
        let byte = self.byte_at(self.r);
        self.r += 1;
        self.check_invariants();
        Ok(byte)
    }

    // Un-reads the last byte read_byte_into returned, for holding a mid-read
    // EOF byte over to the next read.
    pub fn retain_last_read(&mut self) {
        debug_assert!(self.r > 0);
        self.r -= 1;
    }

    pub fn try_insert(&mut self, byte: u8, pos: usize) -> Result<()> {
        debug_assert!(pos >= self.w && pos <= self.e);
        if self.is_full() {
            return Err(ConsoleError::Overflow);
        }
        let mut i = self.e;
        while i > pos {
            let moved = self.byte_at(i - 1);
            self.store(i, moved);
            i -= 1;
        }
        self.store(pos, byte);
        self.e += 1;
        self.check_invariants();
        Ok(())
    }

    // Shifts [hi, e) left to close the gap and sets the caret to lo.
    pub fn delete_range(&mut self, lo: usize, hi: usize) {
        if hi <= lo {
            return;
        }
        debug_assert!(lo >= self.w && hi <= self.e);
        let n = hi - lo;
        let mut i = hi;
        while i < self.e {
            let moved = self.byte_at(i);
            self.store(i - n, moved);
            i += 1;
        }
        self.e -= n;
        self.c = lo;
        self.check_invariants();
    }

    // w := e, c := w. Shared by the newline, buffer-full, and EOF paths.
    pub fn append_byte_and_commit(&mut self, byte: u8) {
        debug_assert!(!self.is_full());
        self.store(self.e, byte);
        self.e += 1;
        self.w = self.e;
        self.c = self.w;
        self.check_invariants();
    }

    pub fn append_newline_and_commit(&mut self) {
        self.append_byte_and_commit(b'\n');
    }

    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        debug_assert!(self.r <= self.w);
        debug_assert!(self.w <= self.e);
        debug_assert!(self.e - self.r <= BUFSIZE);
        debug_assert!(self.w <= self.c && self.c <= self.e);
    }

    #[cfg(not(debug_assertions))]
    fn check_invariants(&self) {}
}
