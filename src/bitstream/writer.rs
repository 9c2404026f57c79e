// Buffered LSB-first bit writer over any `Write`.
//
// A partially filled final byte is zero padded by `finish()`, which must be
// called to flush the tail; dropping the writer loses buffered bits.

use std::io::{self, Write};

use super::{BitSink, check_width, low_mask};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

/// Bit writer over a byte sink.
pub struct BitWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    /// Byte under construction.
    cur: u8,
    /// Bits already placed in `cur` (0..8).
    bit: u32,
    bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(BUF_SIZE),
            cur: 0,
            bit: 0,
            bits_written: 0,
        }
    }

    /// Total bits accepted so far (padding excluded).
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Pad the final byte with zero bits, flush everything and return the sink.
    pub fn finish(mut self) -> io::Result<W> {
        if self.bit > 0 {
            self.buf.push(self.cur);
            self.cur = 0;
            self.bit = 0;
        }
        self.drain()?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn drain(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl<W: Write> BitSink for BitWriter<W> {
    fn write_bits(&mut self, value: u64, bits: u32) -> io::Result<()> {
        check_width(bits)?;
        let mut done = 0u32;
        while done < bits {
            let take = (8 - self.bit).min(bits - done);
            let chunk = ((value >> done) & low_mask(take)) as u8;
            self.cur |= chunk << self.bit;
            done += take;
            self.bit += take;
            if self.bit == 8 {
                self.buf.push(self.cur);
                self.cur = 0;
                self.bit = 0;
                if self.buf.len() >= BUF_SIZE {
                    self.drain()?;
                }
            }
        }
        self.bits_written += u64::from(bits);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.bit != 0 {
            for &b in bytes {
                self.write_bits(u64::from(b), 8)?;
            }
            return Ok(());
        }
        self.buf.extend_from_slice(bytes);
        self.bits_written += 8 * bytes.len() as u64;
        if self.buf.len() >= BUF_SIZE {
            self.drain()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
