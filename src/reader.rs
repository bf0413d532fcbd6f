//! Buffered, single-pass byte reader with explicit EOF/ERR sentinels.
//!
//! This mirrors the shape of a hand-rolled buffered reader one would write
//! in C over a raw file descriptor: a fixed-size buffer, an offset, and a
//! valid-byte count, refilled on exhaustion. It intentionally does not
//! implement [`std::io::Read`] itself — the parser in [`crate::parser`]
//! wants a `next_char` style interface, not a byte-slice one.

use std::io;

/// Size of the internal read buffer, matching the original `BUFFER_SIZE`.
const BUFFER_SIZE: usize = 4096;

/// One byte read from a [`BufReader`], or a sentinel for end-of-stream or
/// a read error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextChar {
    Byte(u8),
    Eof,
    Err,
}

/// A single-pass, non-restartable buffered reader over any [`io::Read`].
pub struct BufReader<R> {
    inner: R,
    buffer: [u8; BUFFER_SIZE],
    off: usize,
    size: usize,
}

impl<R: io::Read> BufReader<R> {
    /// Creates a reader and performs the first fill.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let mut buffer = [0u8; BUFFER_SIZE];
        let size = inner.read(&mut buffer)?;
        Ok(BufReader { inner, buffer, off: 0, size })
    }

    /// Returns the next byte, refilling from the underlying reader when
    /// the buffer is exhausted. A refill that yields fewer bytes than
    /// the buffer size marks the stream as having reached its end; the
    /// following call (once the short buffer is drained) returns `Eof`.
    pub fn next_char(&mut self) -> NextChar {
        if self.off >= self.size && self.size < BUFFER_SIZE {
            return NextChar::Eof;
        }
        if self.off >= self.size {
            match self.inner.read(&mut self.buffer) {
                Ok(0) => {
                    self.size = 0;
                    self.off = 0;
                    return NextChar::Eof;
                }
                Ok(n) => {
                    self.size = n;
                    self.off = 0;
                }
                Err(_) => {
                    self.size = 0;
                    self.off = 0;
                    return NextChar::Err;
                }
            }
        }
        let byte = self.buffer[self.off];
        self.off += 1;
        NextChar::Byte(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_all_bytes_then_eof() {
        let data = b"hello".to_vec();
        let mut r = BufReader::new(io::Cursor::new(data)).unwrap();
        let mut out = Vec::new();
        loop {
            match r.next_char() {
                NextChar::Byte(b) => out.push(b),
                NextChar::Eof => break,
                NextChar::Err => panic!("unexpected err"),
            }
        }
        assert_eq!(out, b"hello");
        assert_eq!(r.next_char(), NextChar::Eof);
    }

    #[test]
    fn empty_input_is_immediate_eof() {
        let mut r = BufReader::new(io::Cursor::new(Vec::new())).unwrap();
        assert_eq!(r.next_char(), NextChar::Eof);
    }

    #[test]
    fn handles_exact_buffer_boundary() {
        let data = vec![b'x'; BUFFER_SIZE];
        let mut r = BufReader::new(io::Cursor::new(data)).unwrap();
        let mut count = 0;
        while let NextChar::Byte(_) = r.next_char() {
            count += 1;
        }
        assert_eq!(count, BUFFER_SIZE);
    }
}
