// Buffered LSB-first bit reader over any `Read`.
//
// Keeps at least two bytes of lookahead when the source has them so that
// `is_end()` can tell writer padding in the final byte apart from data.

use std::io::{self, Read};

use super::{BitSource, check_width, low_mask};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

/// Bit reader over a byte source.
pub struct BitReader<R: Read> {
    inner: R,
    buf: Vec<u8>,
    /// Valid bytes in `buf`.
    len: usize,
    /// Index of the byte holding the next unread bit.
    pos: usize,
    /// Bits already consumed from `buf[pos]` (0..8).
    bit: u32,
    exhausted: bool,
    bits_read: u64,
}

impl<R: Read> BitReader<R> {
    /// Create a reader with the default 64 KiB refill buffer.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(BUF_SIZE, inner)
    }

    /// Create a reader with a refill buffer of `capacity` bytes (minimum 2).
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner,
            buf: vec![0u8; capacity.max(2)],
            len: 0,
            pos: 0,
            bit: 0,
            exhausted: false,
            bits_read: 0,
        }
    }

    /// Total bits consumed so far.
    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }

    /// Give back the underlying reader. Buffered lookahead is discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Ensure at least `want` unread bytes are buffered, unless the source
    /// runs dry first.
    fn fill(&mut self, want: usize) -> io::Result<()> {
        if self.len - self.pos >= want || self.exhausted {
            return Ok(());
        }
        self.buf.copy_within(self.pos..self.len, 0);
        self.len -= self.pos;
        self.pos = 0;
        while self.len < want {
            match self.inner.read(&mut self.buf[self.len..]) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => self.len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<R: Read> BitSource for BitReader<R> {
    fn is_end(&mut self) -> io::Result<bool> {
        self.fill(2)?;
        match self.len - self.pos {
            0 => Ok(true),
            1 => Ok(self.bit > 0 && self.buf[self.pos] >> self.bit == 0),
            _ => Ok(false),
        }
    }

    fn read_bits(&mut self, bits: u32) -> io::Result<u64> {
        check_width(bits)?;
        let mut value = 0u64;
        let mut done = 0u32;
        while done < bits {
            if self.pos == self.len {
                self.fill(1)?;
                if self.pos == self.len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("stream ended inside a {bits}-bit field"),
                    ));
                }
            }
            let take = (8 - self.bit).min(bits - done);
            let chunk = u64::from(self.buf[self.pos] >> self.bit) & low_mask(take);
            value |= chunk << done;
            done += take;
            self.bit += take;
            if self.bit == 8 {
                self.bit = 0;
                self.pos += 1;
            }
        }
        self.bits_read += u64::from(bits);
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
