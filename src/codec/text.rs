// Bounded text buffers and lenient numeric parsing for the column projector.
//
// Parsing follows the C library conversions the file format was defined
// with: leading whitespace is skipped, the longest valid prefix is used,
// anything after it is ignored, and an empty prefix yields zero.

use std::fmt;

use super::CodecError;

/// Longest float literal: sign, 39 integer digits, point, 6 digits, terminator.
pub const FLOAT_TEXT_BUFFER_SIZE: usize = 1 + (38 + 1) + 1 + 6 + 1;

/// Decimal digits of a 64-bit value (`64 * log10(2)`, rounded up).
pub const MAX_DECIMAL_DIGITS: usize = (64 * 302 / 1000) + 1;

/// Sign, digits and the trailing newline.
pub const INT_TEXT_BUFFER_SIZE: usize = 1 + MAX_DECIMAL_DIGITS + 1;

// ---------------------------------------------------------------------------
// TextBuf
// ---------------------------------------------------------------------------

/// Fixed-capacity stack buffer. Overflow is an error, never a reallocation.
pub(crate) struct TextBuf<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> TextBuf<N> {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; N],
            len: 0,
        }
    }

    pub fn push(&mut self, byte: u8) -> Result<(), CodecError> {
        if self.len == N {
            return Err(CodecError::Memory(format!(
                "field longer than {N} bytes"
            )));
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Format `args` into a fresh buffer.
    pub fn format(args: fmt::Arguments<'_>) -> Result<Self, CodecError> {
        let mut buf = Self::new();
        fmt::Write::write_fmt(&mut buf, args)
            .map_err(|_| CodecError::Memory(format!("formatted text exceeds {N} bytes")))?;
        Ok(buf)
    }
}

impl<const N: usize> fmt::Write for TextBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > N {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lenient parsing
// ---------------------------------------------------------------------------

fn skip_space(text: &[u8]) -> &[u8] {
    let start = text
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C))
        .unwrap_or(text.len());
    &text[start..]
}

/// Split off an optional sign. Returns (negative, rest).
fn take_sign(text: &[u8]) -> (bool, &[u8]) {
    match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    }
}

/// Accumulate leading decimal digits. Returns `None` on overflow.
fn digits_u64(text: &[u8]) -> Option<u64> {
    let mut value = 0u64;
    for &b in text.iter().take_while(|b| b.is_ascii_digit()) {
        value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
    }
    Some(value)
}

/// Unsigned base-10 prefix. A leading `-` negates modulo 2^64; overflow
/// saturates to `u64::MAX`.
pub fn parse_unsigned(text: &[u8]) -> u64 {
    let (negative, rest) = take_sign(skip_space(text));
    match digits_u64(rest) {
        Some(v) if negative => v.wrapping_neg(),
        Some(v) => v,
        None => u64::MAX,
    }
}

/// Signed base-10 prefix, saturating at `i64::MIN` / `i64::MAX`.
pub fn parse_signed(text: &[u8]) -> i64 {
    let (negative, rest) = take_sign(skip_space(text));
    let magnitude = digits_u64(rest).unwrap_or(u64::MAX);
    if negative {
        if magnitude > i64::MIN.unsigned_abs() {
            i64::MIN
        } else {
            0i64.wrapping_sub_unsigned(magnitude)
        }
    } else {
        i64::try_from(magnitude).unwrap_or(i64::MAX)
    }
}

fn starts_with_ignore_case(text: &[u8], word: &[u8]) -> bool {
    text.len() >= word.len() && text[..word.len()].eq_ignore_ascii_case(word)
}

/// Length of the decimal float literal at the start of `text`
/// (`digits [. digits] [e [sign] digits]`), or 0 if there is none.
fn float_literal_len(text: &[u8]) -> usize {
    let count_digits = |from: usize| text[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let int_digits = count_digits(0);
    let mut end = int_digits;
    let mut frac_digits = 0;
    if text.get(end) == Some(&b'.') {
        frac_digits = count_digits(end + 1);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }
    if matches!(text.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(text.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    end
}

/// Hex float after its `0x` prefix: `hexdigits [. hexdigits] [p [sign] digits]`.
/// Returns `None` when no hex digit follows, leaving just the literal `0`.
fn parse_hex_float(text: &[u8]) -> Option<f32> {
    let mut mantissa = 0u64;
    let mut exponent = 0i64;
    let mut sticky = false;
    let mut digits = 0usize;
    let mut seen_point = false;
    let mut pos = 0;
    while let Some(&b) = text.get(pos) {
        pos += 1;
        if b == b'.' && !seen_point {
            seen_point = true;
            continue;
        }
        let Some(digit) = char::from(b).to_digit(16) else {
            pos -= 1;
            break;
        };
        digits += 1;
        if mantissa >> 60 == 0 {
            mantissa = (mantissa << 4) | u64::from(digit);
            if seen_point {
                exponent -= 4;
            }
        } else {
            // Far below f32 precision: only whether anything was dropped matters.
            sticky |= digit != 0;
            if !seen_point {
                exponent += 4;
            }
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(text.get(pos), Some(b'p' | b'P')) {
        let (negative, rest) = take_sign(&text[pos + 1..]);
        if rest.first().is_some_and(u8::is_ascii_digit) {
            let shift = digits_u64(rest).unwrap_or(u64::MAX).min(100_000) as i64;
            exponent += if negative { -shift } else { shift };
        }
    }

    if mantissa == 0 {
        return Some(0.0);
    }
    // One rounding to 24 bits, then an exact power-of-two scale in f64.
    let rounded = (mantissa | u64::from(sticky)) as f32;
    let scale = 2f64.powi(exponent.clamp(-1100, 1100) as i32);
    Some((f64::from(rounded) * scale) as f32)
}

/// Float literal prefix, correctly rounded to `f32`. Accepts `inf`,
/// `infinity` and `nan` in any case, and C99 hex floats (`0x1.8p3`);
/// out-of-range values become infinite.
pub fn parse_float(text: &[u8]) -> f32 {
    let (negative, rest) = take_sign(skip_space(text));
    let magnitude = if starts_with_ignore_case(rest, b"inf") {
        f32::INFINITY
    } else if starts_with_ignore_case(rest, b"nan") {
        f32::NAN
    } else if let Some(value) = rest
        .strip_prefix(b"0x")
        .or_else(|| rest.strip_prefix(b"0X"))
        .and_then(parse_hex_float)
    {
        value
    } else {
        let len = float_literal_len(rest);
        std::str::from_utf8(&rest[..len])
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .unwrap_or(0.0)
    };
    if negative { -magnitude } else { magnitude }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn buffer_sizes() {
        assert_eq!(FLOAT_TEXT_BUFFER_SIZE, 48);
        assert_eq!(MAX_DECIMAL_DIGITS, 20);
        assert_eq!(INT_TEXT_BUFFER_SIZE, 22);
    }

    #[test]
    fn text_buf_overflow_is_memory_error() {
        let mut buf = TextBuf::<2>::new();
        buf.push(b'1').unwrap();
        buf.push(b'2').unwrap();
        assert!(matches!(buf.push(b'3'), Err(CodecError::Memory(_))));
        assert_eq!(buf.as_bytes(), b"12");

        assert!(TextBuf::<3>::format(format_args!("{}", 12345)).is_err());
        let ok = TextBuf::<8>::format(format_args!("{}\n", -7)).unwrap();
        assert_eq!(ok.as_bytes(), b"-7\n");
    }

    #[test]
    fn text_buf_write_str_keeps_prefix_on_failure() {
        let mut buf = TextBuf::<4>::new();
        buf.write_str("ab").unwrap();
        assert!(buf.write_str("cde").is_err());
        assert_eq!(buf.as_bytes(), b"ab");
    }

    #[test]
    fn unsigned_prefix_rules() {
        assert_eq!(parse_unsigned(b"42"), 42);
        assert_eq!(parse_unsigned(b"  17\r\n"), 17);
        assert_eq!(parse_unsigned(b"+5"), 5);
        assert_eq!(parse_unsigned(b"12abc"), 12);
        assert_eq!(parse_unsigned(b""), 0);
        assert_eq!(parse_unsigned(b"x9"), 0);
        assert_eq!(parse_unsigned(b"-1"), u64::MAX);
        assert_eq!(parse_unsigned(b"18446744073709551615"), u64::MAX);
        assert_eq!(parse_unsigned(b"99999999999999999999"), u64::MAX);
    }

    #[test]
    fn signed_prefix_rules() {
        assert_eq!(parse_signed(b"-2"), -2);
        assert_eq!(parse_signed(b"7\n"), 7);
        assert_eq!(parse_signed(b" -0"), 0);
        assert_eq!(parse_signed(b"-9223372036854775808"), i64::MIN);
        assert_eq!(parse_signed(b"-9223372036854775809"), i64::MIN);
        assert_eq!(parse_signed(b"9223372036854775808"), i64::MAX);
        assert_eq!(parse_signed(b"--3"), 0);
    }

    #[test]
    fn float_prefix_rules() {
        assert_eq!(parse_float(b"4.5"), 4.5);
        assert_eq!(parse_float(b"4.5\n"), 4.5);
        assert_eq!(parse_float(b" -1.25,"), -1.25);
        assert_eq!(parse_float(b".5"), 0.5);
        assert_eq!(parse_float(b"3."), 3.0);
        assert_eq!(parse_float(b"1e3"), 1000.0);
        assert_eq!(parse_float(b"2E-1x"), 0.2);
        assert_eq!(parse_float(b"7e"), 7.0);
        assert_eq!(parse_float(b"7e+"), 7.0);
        assert_eq!(parse_float(b"."), 0.0);
        assert_eq!(parse_float(b"abc"), 0.0);
        assert_eq!(parse_float(b"1e99"), f32::INFINITY);
        assert_eq!(parse_float(b"-Infinity"), f32::NEG_INFINITY);
        assert!(parse_float(b"NaN").is_nan());
    }

    #[test]
    fn hex_float_prefix_rules() {
        assert_eq!(parse_float(b"0x1p3"), 8.0);
        assert_eq!(parse_float(b"0x10"), 16.0);
        assert_eq!(parse_float(b"0x.8"), 0.5);
        assert_eq!(parse_float(b" -0X1.8p1\n"), -3.0);
        assert_eq!(parse_float(b"0x1P-2,"), 0.25);
        assert_eq!(parse_float(b"0xA.Cp+0"), 10.75);
        // Exponent marker without digits is not part of the literal.
        assert_eq!(parse_float(b"0x1p"), 1.0);
        assert_eq!(parse_float(b"0x1p+x"), 1.0);
        // No hex digit: only the leading `0` parses.
        assert_eq!(parse_float(b"0x"), 0.0);
        assert_eq!(parse_float(b"0xg1"), 0.0);
        assert_eq!(parse_float(b"0x0p99999999999999999999"), 0.0);
        assert_eq!(parse_float(b"0x1p200"), f32::INFINITY);
        assert_eq!(parse_float(b"-0x1p-200"), -0.0);
        assert_eq!(parse_float(b"0xffffff"), 16_777_215.0);
        assert_eq!(
            parse_float(b"0x123456789abcdef01"),
            0x1_2345_6789_abcd_ef01u128 as f32
        );
    }
}
