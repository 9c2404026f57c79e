// Stream- and file-level drivers for the codec stages.
//
// Provides `run_stream()` for any `Read`/`Write` pair and `run_file()`,
// which adds buffered file handles, size statistics, the error-log sink and,
// with the `file-io` feature, a streaming SHA-256 of the output.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, warn};
#[cfg(feature = "file-io")]
use sha2::Digest;
use thiserror::Error;

use crate::bitstream::{BitReader, BitWriter};
use crate::codec::{CodecError, Stage};
use crate::options::Options;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `run_file()`.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Stage that produced the output.
    pub stage: Stage,
    /// Samples (fields or rows) written.
    pub samples: u64,
    /// Input file size in bytes.
    pub input_size: u64,
    /// Output size in bytes, including final padding.
    pub output_size: u64,
    /// SHA-256 of the output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level runs.
#[derive(Debug, Error)]
pub enum IoError {
    /// I/O error outside the stage (file open, flush).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The stage itself failed.
    #[error("{stage}: {source}")]
    Codec {
        stage: Stage,
        #[source]
        source: CodecError,
    },
}

impl IoError {
    /// Exit status for the CLI: the stage error code, or 1 for plain I/O.
    pub fn code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Codec { source, .. } => source.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// run_stream
// ---------------------------------------------------------------------------

/// Run `stage` from `reader` into `writer`, padding and flushing the output.
///
/// Returns the number of samples written and the writer.
pub fn run_stream<R: Read, W: Write>(
    stage: Stage,
    reader: R,
    writer: W,
    opts: &Options,
) -> Result<(u64, W), CodecError> {
    let mut input = BitReader::new(reader);
    let mut output = BitWriter::new(writer);
    let samples = stage.run(&mut input, &mut output, opts)?;
    let writer = output.finish()?;
    Ok((samples, writer))
}

/// Like [`run_stream`], but a failure is tagged with the stage and, if
/// `opts.error_log_file` is set, appended to that file as one line.
pub fn run_logged<R: Read, W: Write>(
    stage: Stage,
    reader: R,
    writer: W,
    opts: &Options,
) -> Result<(u64, W), IoError> {
    run_stream(stage, reader, writer, opts).map_err(|source| {
        if let Some(log_path) = &opts.error_log_file {
            append_error_log(log_path, stage, &source);
        }
        IoError::Codec { stage, source }
    })
}

// ---------------------------------------------------------------------------
// run_file
// ---------------------------------------------------------------------------

/// Run `stage` over `input_path`, writing `output_path`.
///
/// Options are validated before either file is touched. If the stage fails
/// and `opts.error_log_file` is set, one line naming the stage and the error
/// is appended to that file before returning.
pub fn run_file(
    stage: Stage,
    input_path: &Path,
    output_path: &Path,
    opts: &Options,
) -> Result<RunStats, IoError> {
    opts.validate().map_err(|source| IoError::Codec { stage, source })?;

    let input_file = File::open(input_path)?;
    let input_size = input_file.metadata()?.len();
    let reader = BufReader::with_capacity(BUF_SIZE, input_file);

    let output_file = File::create(output_path)?;
    let writer = BufWriter::with_capacity(BUF_SIZE, output_file);

    debug!(
        "{stage}: {} -> {}",
        input_path.display(),
        output_path.display()
    );

    #[cfg(feature = "file-io")]
    let (samples, writer) = run_logged(
        stage,
        reader,
        HashingWriter {
            inner: writer,
            hasher: sha2::Sha256::new(),
            written: 0,
        },
        opts,
    )?;
    #[cfg(not(feature = "file-io"))]
    let (samples, writer) = run_logged(
        stage,
        reader,
        CountingWriter {
            inner: writer,
            written: 0,
        },
        opts,
    )?;

    #[cfg(feature = "file-io")]
    let (output_size, output_sha256) = {
        let HashingWriter {
            inner,
            hasher,
            written,
        } = writer;
        inner.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        (written, Some(hasher.finalize().into()))
    };
    #[cfg(not(feature = "file-io"))]
    let (output_size, output_sha256) = {
        let CountingWriter { inner, written } = writer;
        inner.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        (written, None)
    };

    Ok(RunStats {
        stage,
        samples,
        input_size,
        output_size,
        output_sha256,
    })
}

/// Append one failure line to the error log. Failing to log is not fatal.
fn append_error_log(path: &Path, stage: Stage, err: &CodecError) {
    let written = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{stage}: {err}"));
    if let Err(e) = written {
        warn!("cannot write error log {}: {e}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Output wrappers
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<W: Write> {
    inner: W,
    hasher: sha2::Sha256,
    written: u64,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(not(feature = "file-io"))]
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

#[cfg(not(feature = "file-io"))]
impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
