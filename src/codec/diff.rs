// Differential coder: each sample is replaced by its difference from the
// previous sample of the same phase.
//
// Phases model interleaved channels: with `num_phases = 3` the stream
// `a0 b0 c0 a1 b1 c1 ...` keeps one accumulator for each of a, b and c.
// A complete stream holds a whole number of rounds, so the phase cursor is
// back at 0 when the input runs out.

use log::{debug, warn};

use crate::bitstream::{BitSink, BitSource, NATIVE_BITS};
use crate::options::{Datatype, Options};

use super::CodecError;

/// How raw samples are widened before differencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeltaMode {
    /// Zero-extended samples; deltas are range-checked below native width.
    Unsigned,
    /// Sign-extended samples; deltas wrap silently.
    Signed,
}

impl DeltaMode {
    fn resolve(datatype: Datatype, opts: &Options, operation: &'static str) -> Result<Self, CodecError> {
        match datatype {
            Datatype::Uint | Datatype::CompatibilityDefault => Ok(DeltaMode::Unsigned),
            Datatype::Int => Ok(DeltaMode::Signed),
            Datatype::Float => Err(CodecError::Datatype {
                operation,
                input: opts.input_datatype,
                output: opts.output_datatype,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseState
// ---------------------------------------------------------------------------

/// Last sample seen per phase, plus the cyclic phase cursor.
struct PhaseState {
    last: Vec<i64>,
    phase: usize,
}

impl PhaseState {
    fn new(num_phases: usize) -> Result<Self, CodecError> {
        let mut last = Vec::new();
        last.try_reserve_exact(num_phases)
            .map_err(|_| CodecError::Allocation(num_phases))?;
        last.resize(num_phases, 0);
        Ok(Self { last, phase: 0 })
    }

    #[inline]
    fn last(&self) -> i64 {
        self.last[self.phase]
    }

    /// Record `value` for the current phase and move to the next one.
    #[inline]
    fn advance(&mut self, value: i64) {
        self.last[self.phase] = value;
        self.phase += 1;
        if self.phase == self.last.len() {
            self.phase = 0;
        }
    }

    fn finish(self) -> Result<(), CodecError> {
        if self.phase != 0 {
            warn!(
                "differential: stream ended at phase {} of {}",
                self.phase,
                self.last.len()
            );
            return Err(CodecError::Phase {
                phase: self.phase,
                num_phases: self.last.len(),
            });
        }
        Ok(())
    }
}

#[inline]
fn fits_signed(value: i64, bits: u32) -> bool {
    let half = 1i64 << (bits - 1);
    (-half..half).contains(&value)
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Delta-encode `value_size_bits` samples, mode chosen by `input_datatype`.
///
/// In unsigned mode with `value_size_bits < 64`, a delta outside the signed
/// range of the field width fails with `InvalidValue`. At 64 bits deltas
/// wrap without a check, as do all signed-mode deltas.
pub fn encode_differential<S, K>(
    input: &mut S,
    output: &mut K,
    opts: &Options,
) -> Result<u64, CodecError>
where
    S: BitSource + ?Sized,
    K: BitSink + ?Sized,
{
    opts.validate()?;
    let mode = DeltaMode::resolve(opts.input_datatype, opts, "differential encode")?;
    let bits = opts.value_size_bits;
    let mut state = PhaseState::new(opts.num_phases)?;
    debug!(
        "diff-encode: {mode:?} mode, {bits}-bit fields, {} phases",
        opts.num_phases
    );

    let mut samples = 0u64;
    while !input.is_end()? {
        let value = match mode {
            DeltaMode::Unsigned => input.read_bits(bits)? as i64,
            DeltaMode::Signed => input.read_signed_bits(bits)?,
        };

        let delta = value.wrapping_sub(state.last());

        match mode {
            DeltaMode::Unsigned => {
                if bits < NATIVE_BITS && !fits_signed(delta, bits) {
                    warn!("diff-encode: delta {delta} at sample {samples} exceeds {bits} bits");
                    return Err(CodecError::InvalidValue {
                        value: delta.to_string(),
                        bits,
                    });
                }
                output.write_bits(delta as u64, bits)?;
            }
            DeltaMode::Signed => output.write_signed_bits(delta, bits)?,
        }

        state.advance(value);
        samples += 1;
    }

    state.finish()?;
    debug!("diff-encode: {samples} samples");
    Ok(samples)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Reverse of [`encode_differential`], mode chosen by `output_datatype`.
///
/// Deltas are always sign-extended before accumulation.
pub fn decode_differential<S, K>(
    input: &mut S,
    output: &mut K,
    opts: &Options,
) -> Result<u64, CodecError>
where
    S: BitSource + ?Sized,
    K: BitSink + ?Sized,
{
    opts.validate()?;
    let mode = DeltaMode::resolve(opts.output_datatype, opts, "differential decode")?;
    let bits = opts.value_size_bits;
    let mut state = PhaseState::new(opts.num_phases)?;
    debug!(
        "diff-decode: {mode:?} mode, {bits}-bit fields, {} phases",
        opts.num_phases
    );

    let mut samples = 0u64;
    while !input.is_end()? {
        let delta = input.read_signed_bits(bits)?;
        let value = delta.wrapping_add(state.last());

        match mode {
            DeltaMode::Unsigned => output.write_bits(value as u64, bits)?,
            DeltaMode::Signed => output.write_signed_bits(value, bits)?,
        }

        state.advance(value);
        samples += 1;
    }

    state.finish()?;
    debug!("diff-decode: {samples} samples");
    Ok(samples)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
