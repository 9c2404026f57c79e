// Run parameters shared by every codec stage.
//
// Options are plain data, read-only for the duration of a stage call. The
// meaning of `input_datatype` / `output_datatype` depends on the stage and
// direction; see the dispatch tables in `codec::diff` and `codec::normalize`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::bitstream::NATIVE_BITS;
use crate::codec::CodecError;

// ---------------------------------------------------------------------------
// Datatype
// ---------------------------------------------------------------------------

/// Sample interpretation selected for one side of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Datatype {
    Uint,
    Int,
    Float,
    /// Nothing was requested. Each stage maps this to its historical
    /// behavior, which is not the same everywhere.
    #[default]
    CompatibilityDefault,
}

impl Datatype {
    pub const ALL: [Datatype; 4] = [
        Datatype::Uint,
        Datatype::Int,
        Datatype::Float,
        Datatype::CompatibilityDefault,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Datatype::Uint => "uint",
            Datatype::Int => "int",
            Datatype::Float => "float",
            Datatype::CompatibilityDefault => "default",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Datatype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uint" | "unsigned" => Ok(Datatype::Uint),
            "int" | "signed" => Ok(Datatype::Int),
            "float" => Ok(Datatype::Float),
            "default" | "compat" => Ok(Datatype::CompatibilityDefault),
            other => Err(format!("unknown datatype '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for one stage invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// CSV field delimiter.
    pub separator_char: u8,
    /// 1-based CSV column to project.
    pub column: usize,
    pub input_datatype: Datatype,
    pub output_datatype: Datatype,
    /// Packed field width in bits (1..=64).
    pub value_size_bits: u32,
    /// Fractional digits printed for float samples.
    pub num_decimal_places: usize,
    /// Quantization scale for float <-> int normalization.
    pub normalization_factor: f32,
    /// Low bits dropped by int -> int normalization.
    pub ignore_bits: u32,
    /// Number of interleaved channels sharing one delta stream.
    pub num_phases: usize,
    /// Where file drivers append a line when a stage fails.
    pub error_log_file: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            separator_char: b',',
            column: 1,
            input_datatype: Datatype::CompatibilityDefault,
            output_datatype: Datatype::CompatibilityDefault,
            value_size_bits: NATIVE_BITS,
            num_decimal_places: 6,
            normalization_factor: 1.0,
            ignore_bits: 0,
            num_phases: 1,
            error_log_file: None,
        }
    }
}

impl Options {
    /// Check the structural invariants every stage relies on.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.column == 0 {
            return Err(CodecError::InvalidOptions("column is 1-based".into()));
        }
        if self.num_phases == 0 {
            return Err(CodecError::InvalidOptions(
                "num_phases must be at least 1".into(),
            ));
        }
        if self.value_size_bits == 0 || self.value_size_bits > NATIVE_BITS {
            return Err(CodecError::InvalidOptions(format!(
                "value_size_bits {} outside 1..={NATIVE_BITS}",
                self.value_size_bits
            )));
        }
        if self.ignore_bits >= NATIVE_BITS {
            return Err(CodecError::InvalidOptions(format!(
                "ignore_bits {} must be below {NATIVE_BITS}",
                self.ignore_bits
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
