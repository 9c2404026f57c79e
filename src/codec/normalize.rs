// Normalization coder.
//
// Two independent families share this stage:
// - int <-> int: drop `ignore_bits` low bits on encode, restore them as
//   zeros on decode (`normalization_factor` unused)
// - float <-> int: scale by `normalization_factor` and round to an integer
//   on encode, divide back on decode (`ignore_bits` unused)
//
// Which family runs is decided by the (input, output) datatype pair. The
// legal pairs are asymmetric on purpose: COMPATIBILITY_DEFAULT on both sides
// selects the historical float path, while INT may be paired with it.

use log::{debug, warn};

use crate::bitstream::{BitSink, BitSource, NATIVE_BITS};
use crate::options::{Datatype, Options};

use super::CodecError;

const FLOAT_BITS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodeMode {
    IntToInt,
    FloatToInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeMode {
    IntToInt,
    IntToFloat,
}

fn encode_mode(opts: &Options) -> Result<EncodeMode, CodecError> {
    use Datatype::*;
    match (opts.input_datatype, opts.output_datatype) {
        (Int, Int | CompatibilityDefault) => Ok(EncodeMode::IntToInt),
        (CompatibilityDefault, CompatibilityDefault) | (Float, Int | CompatibilityDefault) => {
            Ok(EncodeMode::FloatToInt)
        }
        (input, output) => Err(CodecError::Datatype {
            operation: "normalize",
            input,
            output,
        }),
    }
}

fn decode_mode(opts: &Options) -> Result<DecodeMode, CodecError> {
    use Datatype::*;
    match (opts.output_datatype, opts.input_datatype) {
        (Int, Int | CompatibilityDefault) => Ok(DecodeMode::IntToInt),
        (CompatibilityDefault, CompatibilityDefault) | (Float, Int | CompatibilityDefault) => {
            Ok(DecodeMode::IntToFloat)
        }
        (output, input) => Err(CodecError::Datatype {
            operation: "denormalize",
            input,
            output,
        }),
    }
}

// ---------------------------------------------------------------------------
// Scalar kernels
// ---------------------------------------------------------------------------

/// Scale and round half away from zero, in `f32` arithmetic.
///
/// The result is not yet truncated: callers range-check it first.
#[inline]
pub fn quantize(value: f32, factor: f32) -> f32 {
    if value > 0.0 {
        value * factor + 0.5
    } else if value < 0.0 {
        value * factor - 0.5
    } else {
        value
    }
}

/// Signed range of a `bits`-wide field, as compared in `f32`.
///
/// The upper bound is converted from an integer and so rounds up to a power
/// of two once `bits` exceeds the float mantissa.
#[inline]
fn float_bounds(bits: u32) -> (f32, f32) {
    let half = 1u64 << (bits - 1);
    (-(half as f32), (half - 1) as f32)
}

/// Integer division by `2^ignore_bits`, truncating toward zero.
#[inline]
fn drop_low_bits(value: i64, ignore_bits: u32) -> i64 {
    (i128::from(value) / (1i128 << ignore_bits)) as i64
}

// ---------------------------------------------------------------------------
// Normalize
// ---------------------------------------------------------------------------

/// Reduce sample precision ahead of entropy coding.
///
/// - int -> int: 64-bit signed samples divided by `2^ignore_bits`, written
///   as signed `value_size_bits` fields.
/// - float -> int: 32-bit floats scaled by `normalization_factor`, rounded
///   half away from zero, range-checked against the signed
///   `value_size_bits` range (`InvalidValue` otherwise) and written packed.
pub fn normalize<S, K>(input: &mut S, output: &mut K, opts: &Options) -> Result<u64, CodecError>
where
    S: BitSource + ?Sized,
    K: BitSink + ?Sized,
{
    opts.validate()?;
    let mode = encode_mode(opts)?;
    let bits = opts.value_size_bits;
    debug!(
        "normalize: {mode:?}, {bits}-bit output, factor {}, ignore_bits {}",
        opts.normalization_factor, opts.ignore_bits
    );

    let (lower, upper) = float_bounds(bits);
    let mut samples = 0u64;
    while !input.is_end()? {
        match mode {
            EncodeMode::IntToInt => {
                let value = input.read_bits(NATIVE_BITS)? as i64;
                let normalized = drop_low_bits(value, opts.ignore_bits);
                output.write_signed_bits(normalized, bits)?;
            }
            EncodeMode::FloatToInt => {
                let value = f32::from_bits(input.read_bits(FLOAT_BITS)? as u32);
                let scaled = quantize(value, opts.normalization_factor);
                if scaled < lower || scaled > upper {
                    warn!("normalize: {value} scales to {scaled}, outside {bits} bits");
                    return Err(CodecError::InvalidValue {
                        value: scaled.to_string(),
                        bits,
                    });
                }
                output.write_bits(scaled as i64 as u64, bits)?;
            }
        }
        samples += 1;
    }

    debug!("normalize: {samples} samples");
    Ok(samples)
}

// ---------------------------------------------------------------------------
// Denormalize
// ---------------------------------------------------------------------------

/// Reverse of [`normalize`].
///
/// - int -> int: signed `value_size_bits` fields shifted left by
///   `ignore_bits` (zero fill), written as 64-bit signed.
/// - int -> float: sign-extended `value_size_bits` fields divided by
///   `normalization_factor`, written as 32-bit floats.
pub fn denormalize<S, K>(input: &mut S, output: &mut K, opts: &Options) -> Result<u64, CodecError>
where
    S: BitSource + ?Sized,
    K: BitSink + ?Sized,
{
    opts.validate()?;
    let mode = decode_mode(opts)?;
    let bits = opts.value_size_bits;
    debug!(
        "denormalize: {mode:?}, {bits}-bit input, factor {}, ignore_bits {}",
        opts.normalization_factor, opts.ignore_bits
    );

    let mut samples = 0u64;
    while !input.is_end()? {
        match mode {
            DecodeMode::IntToInt => {
                let normalized = input.read_signed_bits(bits)?;
                output.write_signed_bits(normalized << opts.ignore_bits, NATIVE_BITS)?;
            }
            DecodeMode::IntToFloat => {
                let normalized = input.read_signed_bits(bits)?;
                let value = normalized as f32 / opts.normalization_factor;
                output.write_bits(u64::from(value.to_bits()), FLOAT_BITS)?;
            }
        }
        samples += 1;
    }

    debug!("denormalize: {samples} samples");
    Ok(samples)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
