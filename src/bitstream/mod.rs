// Bit-level stream port used by every codec stage.
//
// Stages never touch bytes directly: they read and write fixed-width fields
// through `BitSource` / `BitSink`. Fields are packed LSB-first, so any field
// that is a whole number of bytes lands in little-endian byte order and plain
// text is written byte-for-byte.
//
// - `reader`: BitReader, a buffered `Read` adapter with end-of-stream detection
// - `writer`: BitWriter, a buffered `Write` adapter with zero padding on finish

pub mod reader;
pub mod writer;

pub use reader::BitReader;
pub use writer::BitWriter;

use std::io;

/// Width of the in-memory working value. Upper bound for any field width.
pub const NATIVE_BITS: u32 = u64::BITS;

/// Sequential fixed-width field reader.
pub trait BitSource {
    /// True once no further field can be read.
    ///
    /// Fewer than eight trailing zero bits are treated as writer padding.
    fn is_end(&mut self) -> io::Result<bool>;

    /// Read `bits` bits (1..=64) zero-extended into a `u64`.
    fn read_bits(&mut self, bits: u32) -> io::Result<u64>;

    /// Read `bits` bits (1..=64) sign-extended into an `i64`.
    fn read_signed_bits(&mut self, bits: u32) -> io::Result<i64> {
        Ok(sign_extend(self.read_bits(bits)?, bits))
    }
}

/// Sequential fixed-width field writer.
pub trait BitSink {
    /// Write the low `bits` bits (1..=64) of `value`.
    fn write_bits(&mut self, value: u64, bits: u32) -> io::Result<()>;

    /// Write `value` truncated to `bits` bits in two's complement.
    fn write_signed_bits(&mut self, value: i64, bits: u32) -> io::Result<()> {
        self.write_bits(value as u64, bits)
    }

    /// Write every byte of `bytes` as an 8-bit field.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            self.write_bits(u64::from(b), 8)?;
        }
        Ok(())
    }
}

impl<S: BitSource + ?Sized> BitSource for &mut S {
    fn is_end(&mut self) -> io::Result<bool> {
        (**self).is_end()
    }

    fn read_bits(&mut self, bits: u32) -> io::Result<u64> {
        (**self).read_bits(bits)
    }
}

impl<S: BitSink + ?Sized> BitSink for &mut S {
    fn write_bits(&mut self, value: u64, bits: u32) -> io::Result<()> {
        (**self).write_bits(value, bits)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_bytes(bytes)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mask selecting the low `bits` bits of a `u64`.
#[inline]
pub fn low_mask(bits: u32) -> u64 {
    if bits >= NATIVE_BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Replicate bit `bits - 1` of `value` into the high bits.
#[inline]
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits == 0 || bits >= NATIVE_BITS {
        return value as i64;
    }
    let shift = NATIVE_BITS - bits;
    ((value << shift) as i64) >> shift
}

/// Reject field widths outside 1..=64.
#[inline]
pub(crate) fn check_width(bits: u32) -> io::Result<()> {
    if bits == 0 || bits > NATIVE_BITS {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("field width {bits} outside 1..={NATIVE_BITS}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
