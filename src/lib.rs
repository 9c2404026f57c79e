//! Tabcodec: bit-exact codec stages for tabular sample compression.
//!
//! The crate provides:
//! - A bit-level stream port with LSB-first packing (`bitstream`)
//! - Run parameters and datatype selection (`options`)
//! - The codec stages: CSV column projection, differential coding and
//!   normalization (`codec`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use tabcodec::bitstream::{BitReader, BitWriter};
//! use tabcodec::codec;
//! use tabcodec::options::{Datatype, Options};
//!
//! let opts = Options {
//!     column: 2,
//!     output_datatype: Datatype::Float,
//!     ..Default::default()
//! };
//! let mut input = BitReader::new(&b"3,4.5,6\n"[..]);
//! let mut output = BitWriter::new(Vec::new());
//! codec::read_csv(&mut input, &mut output, &opts).unwrap();
//! assert_eq!(output.finish().unwrap(), 4.5f32.to_le_bytes());
//! ```

pub mod bitstream;
pub mod codec;
pub mod io;
pub mod options;

#[cfg(feature = "cli")]
pub mod cli;

pub use codec::{CodecError, Stage};
pub use options::{Datatype, Options};
