// Codec stages: stream-to-stream transforms over the bit stream port.
//
// - `csv`: column projector, CSV text <-> packed fields for one column
// - `diff`: differential coder, per-phase integer deltas
// - `normalize`: normalization coder, float <-> int quantization and int re-binning
// - `text`: bounded text buffers and lenient numeric parsing
//
// Every entry point validates its Options, drains the input stream and
// returns the number of samples written. Errors abort the call immediately.

pub mod csv;
pub mod diff;
pub mod normalize;
pub mod text;

use std::fmt;
use std::io;

use thiserror::Error;

use crate::bitstream::{BitSink, BitSource};
use crate::options::{Datatype, Options};

pub use csv::{read_csv, write_csv};
pub use diff::{decode_differential, encode_differential};
pub use normalize::{denormalize, normalize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a stage call. All kinds are terminal for the call.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The datatype (combination) is not supported by the operation.
    #[error("unsupported datatypes for {operation}: input {input}, output {output}")]
    Datatype {
        operation: &'static str,
        input: Datatype,
        output: Datatype,
    },

    /// A computed value does not fit the configured field width.
    #[error("value {value} does not fit a signed {bits}-bit field")]
    InvalidValue { value: String, bits: u32 },

    /// The stream length is not a multiple of the phase count.
    #[error("stream ended at phase {phase} of {num_phases}")]
    Phase { phase: usize, num_phases: usize },

    /// The per-phase accumulators could not be allocated.
    #[error("failed to allocate {0} phase accumulators")]
    Allocation(usize),

    /// Text did not fit its fixed-size buffer.
    #[error("text buffer overflow: {0}")]
    Memory(String),

    /// Bit stream failure, passed through unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The options violate a structural invariant.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl CodecError {
    /// Stable numeric code, used as the CLI exit status.
    pub fn code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Datatype { .. } => 2,
            Self::InvalidValue { .. } => 3,
            Self::Phase { .. } => 4,
            Self::Allocation(_) => 5,
            Self::Memory(_) => 6,
            Self::InvalidOptions(_) => 7,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage dispatch
// ---------------------------------------------------------------------------

/// One of the six stage entry points, selectable by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ReadCsv,
    WriteCsv,
    DiffEncode,
    DiffDecode,
    Normalize,
    Denormalize,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::ReadCsv,
        Stage::WriteCsv,
        Stage::DiffEncode,
        Stage::DiffDecode,
        Stage::Normalize,
        Stage::Denormalize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ReadCsv => "read-csv",
            Stage::WriteCsv => "write-csv",
            Stage::DiffEncode => "diff-encode",
            Stage::DiffDecode => "diff-decode",
            Stage::Normalize => "normalize",
            Stage::Denormalize => "denormalize",
        }
    }

    /// Run the stage until `input` is exhausted.
    pub fn run<S, K>(self, input: &mut S, output: &mut K, opts: &Options) -> Result<u64, CodecError>
    where
        S: BitSource + ?Sized,
        K: BitSink + ?Sized,
    {
        match self {
            Stage::ReadCsv => read_csv(input, output, opts),
            Stage::WriteCsv => write_csv(input, output, opts),
            Stage::DiffEncode => encode_differential(input, output, opts),
            Stage::DiffDecode => decode_differential(input, output, opts),
            Stage::Normalize => normalize(input, output, opts),
            Stage::Denormalize => denormalize(input, output, opts),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::{BitReader, BitWriter};

    #[test]
    fn error_codes_are_distinct() {
        let errors = [
            CodecError::Io(io::Error::other("x")),
            CodecError::Datatype {
                operation: "normalize",
                input: Datatype::Uint,
                output: Datatype::Uint,
            },
            CodecError::InvalidValue {
                value: "9".into(),
                bits: 3,
            },
            CodecError::Phase {
                phase: 1,
                num_phases: 2,
            },
            CodecError::Allocation(4),
            CodecError::Memory("x".into()),
            CodecError::InvalidOptions("x".into()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(CodecError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn stage_names_are_distinct() {
        let mut names: Vec<&str> = Stage::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Stage::ALL.len());
        assert_eq!(Stage::DiffDecode.to_string(), "diff-decode");
    }

    #[test]
    fn dispatch_runs_selected_stage() {
        let opts = Options {
            column: 2,
            input_datatype: Datatype::Int,
            value_size_bits: 8,
            ..Default::default()
        };
        let data = [0xFFu8];
        let mut input = BitReader::new(&data[..]);
        let mut output = BitWriter::new(Vec::new());
        let n = Stage::WriteCsv.run(&mut input, &mut output, &opts).unwrap();
        assert_eq!(n, 1);
        assert_eq!(output.finish().unwrap(), b",-1\n");
    }
}
