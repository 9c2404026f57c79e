// Column projector: one CSV column <-> a stream of packed binary fields.
//
// Reading keeps only the target column and ignores the rest of each row.
// Writing produces rows that hold the value in the target column and leave
// every column before it empty. There is no quoting or escaping.

use std::fmt::Write as _;

use log::debug;

use crate::bitstream::{BitSink, BitSource, NATIVE_BITS};
use crate::options::{Datatype, Options};

use super::CodecError;
use super::text::{self, FLOAT_TEXT_BUFFER_SIZE, INT_TEXT_BUFFER_SIZE, TextBuf};

const CHAR_BITS: u32 = 8;
const FLOAT_BITS: u32 = 32;

// ---------------------------------------------------------------------------
// Text -> binary
// ---------------------------------------------------------------------------

/// Extract column `opts.column` from CSV text and write one field per row.
///
/// The field is parsed according to `opts.output_datatype`:
/// - `Uint`  -> 64-bit unsigned
/// - `Int`   -> 64-bit signed
/// - `Float` / `CompatibilityDefault` -> 32-bit IEEE float
///
/// A field ends at the separator, a newline or the end of the stream. The
/// last character of the stream is kept as part of the field even when it
/// is a separator or newline; the lenient parser ignores it.
pub fn read_csv<S, K>(input: &mut S, output: &mut K, opts: &Options) -> Result<u64, CodecError>
where
    S: BitSource + ?Sized,
    K: BitSink + ?Sized,
{
    opts.validate()?;
    debug!(
        "read-csv: column {} of '{}'-separated text as {}",
        opts.column,
        opts.separator_char.escape_ascii(),
        opts.output_datatype
    );

    let mut column = 1usize;
    let mut field = TextBuf::<{ FLOAT_TEXT_BUFFER_SIZE - 1 }>::new();
    let mut fields = 0u64;

    while !input.is_end()? {
        let ch = input.read_bits(CHAR_BITS)? as u8;
        let at_end = input.is_end()?;

        if ch == opts.separator_char || ch == b'\n' || at_end {
            if column == opts.column {
                if at_end {
                    field.push(ch)?;
                }
                emit_field(field.as_bytes(), output, opts.output_datatype)?;
                fields += 1;
                field.clear();
            }
            column += 1;
        } else if column == opts.column {
            field.push(ch)?;
        }

        if ch == b'\n' {
            column = 1;
        }
    }

    debug!("read-csv: {fields} fields");
    Ok(fields)
}

fn emit_field<K: BitSink + ?Sized>(
    field: &[u8],
    output: &mut K,
    datatype: Datatype,
) -> Result<(), CodecError> {
    match datatype {
        Datatype::Uint => output.write_bits(text::parse_unsigned(field), NATIVE_BITS)?,
        Datatype::Int => output.write_signed_bits(text::parse_signed(field), NATIVE_BITS)?,
        Datatype::Float | Datatype::CompatibilityDefault => {
            let value = text::parse_float(field);
            output.write_bits(u64::from(value.to_bits()), FLOAT_BITS)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Binary -> text
// ---------------------------------------------------------------------------

/// Write one CSV row per input field, placing the value in `opts.column`.
///
/// Fields are read according to `opts.input_datatype`:
/// - `Uint`  -> `value_size_bits` unsigned, printed in decimal
/// - `Int`   -> `value_size_bits` signed, printed in decimal
/// - `Float` / `CompatibilityDefault` -> 32-bit float printed with exactly
///   `num_decimal_places` fractional digits
pub fn write_csv<S, K>(input: &mut S, output: &mut K, opts: &Options) -> Result<u64, CodecError>
where
    S: BitSource + ?Sized,
    K: BitSink + ?Sized,
{
    opts.validate()?;
    debug!(
        "write-csv: {} fields of {} bits into column {}",
        opts.input_datatype, opts.value_size_bits, opts.column
    );

    let mut rows = 0u64;
    while !input.is_end()? {
        for _ in 1..opts.column {
            output.write_bits(u64::from(opts.separator_char), CHAR_BITS)?;
        }

        match opts.input_datatype {
            Datatype::Uint => {
                let value = input.read_bits(opts.value_size_bits)?;
                let line = TextBuf::<INT_TEXT_BUFFER_SIZE>::format(format_args!("{value}\n"))?;
                output.write_bytes(line.as_bytes())?;
            }
            Datatype::Int => {
                let value = input.read_signed_bits(opts.value_size_bits)?;
                let line = TextBuf::<INT_TEXT_BUFFER_SIZE>::format(format_args!("{value}\n"))?;
                output.write_bytes(line.as_bytes())?;
            }
            Datatype::Float | Datatype::CompatibilityDefault => {
                let value = f32::from_bits(input.read_bits(FLOAT_BITS)? as u32);
                let line = format_float_line(value, opts.num_decimal_places)?;
                output.write_bytes(line.as_bytes())?;
            }
        }
        rows += 1;
    }

    debug!("write-csv: {rows} rows");
    Ok(rows)
}

/// `printf("%.*f\n")` rendering of a float into the fixed float buffer.
fn format_float_line(
    value: f32,
    places: usize,
) -> Result<TextBuf<FLOAT_TEXT_BUFFER_SIZE>, CodecError> {
    let overflow = || {
        CodecError::Memory(format!(
            "{value} with {places} decimals exceeds {FLOAT_TEXT_BUFFER_SIZE} bytes"
        ))
    };
    // Any precision past the buffer overflows it, and `fmt` caps precision at u16.
    if places > FLOAT_TEXT_BUFFER_SIZE && value.is_finite() {
        return Err(overflow());
    }
    let mut line = TextBuf::<FLOAT_TEXT_BUFFER_SIZE>::new();
    let written = if value.is_nan() {
        line.write_str(if value.is_sign_negative() { "-nan\n" } else { "nan\n" })
    } else if value.is_infinite() {
        write!(line, "{value}\n")
    } else {
        write!(line, "{value:.places$}\n")
    };
    written.map_err(|_| overflow())?;
    Ok(line)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
