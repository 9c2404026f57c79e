// Command-line front end for the codec stages.
//
// One subcommand per stage, a shared option group mapping onto `Options`,
// and stdin/stdout as the default endpoints.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::bitstream::NATIVE_BITS;
use crate::codec::Stage;
use crate::codec::text::{FLOAT_TEXT_BUFFER_SIZE, INT_TEXT_BUFFER_SIZE};
use crate::io::{self as file_io, IoError, RunStats};
use crate::options::{Datatype, Options};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Separator parsing
// ---------------------------------------------------------------------------

/// Accepts a single ASCII character, or `tab` / `\t`.
fn parse_separator(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" => return Ok(b'\t'),
        "space" => return Ok(b' '),
        _ => {}
    }
    match s.as_bytes() {
        [b] if b.is_ascii() && *b != b'\n' => Ok(*b),
        [b'\n'] => Err("separator cannot be a newline".into()),
        _ => Err(format!("separator must be one ASCII character, got '{s}'")),
    }
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Bit-exact codec stages for tabular sample data.
#[derive(Parser, Debug)]
#[command(
    name = "tabcodec",
    version,
    about = "Codec stages for tabular sample compression",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Project one CSV column into packed binary samples.
    ReadCsv(StageArgs),
    /// Render packed binary samples as CSV lines.
    WriteCsv(StageArgs),
    /// Replace each sample by its difference from the previous one.
    DiffEncode(StageArgs),
    /// Undo diff-encode.
    DiffDecode(StageArgs),
    /// Quantize floats or drop low bits of integers.
    Normalize(StageArgs),
    /// Undo normalize (up to the dropped precision).
    Denormalize(StageArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct CodecArgs {
    /// Field separator character (`tab` for a tab).
    #[arg(long, short = 's', value_parser = parse_separator, default_value = ",")]
    separator: u8,

    /// 1-based column to project.
    #[arg(long, short = 'k', default_value_t = 1)]
    column: usize,

    /// Datatype of the input samples.
    #[arg(long = "input-type", short = 'i', default_value_t = Datatype::CompatibilityDefault)]
    input_type: Datatype,

    /// Datatype of the output samples.
    #[arg(long = "output-type", short = 'o', default_value_t = Datatype::CompatibilityDefault)]
    output_type: Datatype,

    /// Width of a packed integer field in bits (1-64).
    #[arg(long, short = 'b', default_value_t = 64)]
    bits: u32,

    /// Decimal places when printing floats.
    #[arg(long, short = 'd', default_value_t = 6)]
    decimals: usize,

    /// Float quantization factor.
    #[arg(long, default_value_t = 1.0)]
    factor: f32,

    /// Low bits dropped by integer normalization.
    #[arg(long = "ignore-bits", default_value_t = 0)]
    ignore_bits: u32,

    /// Number of interleaved channels for differential coding.
    #[arg(long, short = 'p', default_value_t = 1)]
    phases: usize,

    /// Append a line to this file when a stage fails.
    #[arg(long = "error-log", value_hint = ValueHint::FilePath)]
    error_log: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StageArgs {
    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    #[command(flatten)]
    codec: CodecArgs,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run(Stage),
    Config,
}

struct CliOptions {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    codec: Options,
}

impl From<CodecArgs> for Options {
    fn from(args: CodecArgs) -> Self {
        Options {
            separator_char: args.separator,
            column: args.column,
            input_datatype: args.input_type,
            output_datatype: args.output_type,
            value_size_bits: args.bits,
            num_decimal_places: args.decimals,
            normalization_factor: args.factor,
            ignore_bits: args.ignore_bits,
            num_phases: args.phases,
            error_log_file: args.error_log,
        }
    }
}

fn resolve_options(cli: Cli) -> CliOptions {
    let (command, args) = match cli.command {
        Cmd::ReadCsv(args) => (Command::Run(Stage::ReadCsv), Some(args)),
        Cmd::WriteCsv(args) => (Command::Run(Stage::WriteCsv), Some(args)),
        Cmd::DiffEncode(args) => (Command::Run(Stage::DiffEncode), Some(args)),
        Cmd::DiffDecode(args) => (Command::Run(Stage::DiffDecode), Some(args)),
        Cmd::Normalize(args) => (Command::Run(Stage::Normalize), Some(args)),
        Cmd::Denormalize(args) => (Command::Run(Stage::Denormalize), Some(args)),
        Cmd::Config => (Command::Config, None),
    };

    let mut opts = CliOptions {
        command,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        input_file: None,
        output_file: None,
        codec: Options::default(),
    };
    if let Some(args) = args {
        opts.use_stdout = args.stdout;
        opts.input_file = args.input.or(args.input_pos);
        opts.output_file = args.output.or(args.output_pos);
        opts.codec = args.codec.into();
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("tabcodec".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli).codec.validate();
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("tabcodec version {version}");

    let file_io = cfg!(feature = "file-io") as u8;
    let defaults = Options::default();

    eprintln!("FILE_IO={file_io}");
    eprintln!("NATIVE_BITS={NATIVE_BITS}");
    eprintln!("INT_TEXT_BUFFER_SIZE={INT_TEXT_BUFFER_SIZE}");
    eprintln!("FLOAT_TEXT_BUFFER_SIZE={FLOAT_TEXT_BUFFER_SIZE}");
    eprintln!("DEFAULT_SEPARATOR={:?}", defaults.separator_char as char);
    eprintln!("DEFAULT_DATATYPE={}", defaults.input_datatype);
    eprintln!("DEFAULT_BITS={}", defaults.value_size_bits);
    eprintln!("DEFAULT_DECIMALS={}", defaults.num_decimal_places);
    eprintln!("DEFAULT_PHASES={}", defaults.num_phases);
    eprintln!(
        "STAGES={}",
        Stage::ALL.map(Stage::name).join(",")
    );

    0
}

// ---------------------------------------------------------------------------
// Stage command
// ---------------------------------------------------------------------------

/// Byte counter used when stdin/stdout take the place of files.
struct Counted<T> {
    inner: T,
    count: u64,
}

impl<T: Read> Read for Counted<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

impl<T: Write> Write for Counted<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn open_input(opts: &CliOptions) -> io::Result<Box<dyn Read>> {
    Ok(match &opts.input_file {
        Some(path) => Box::new(BufReader::with_capacity(BUF_SIZE, File::open(path)?)),
        None => Box::new(BufReader::with_capacity(BUF_SIZE, io::stdin().lock())),
    })
}

fn open_output(opts: &CliOptions) -> io::Result<Box<dyn Write>> {
    Ok(match &opts.output_file {
        Some(path) => Box::new(BufWriter::with_capacity(BUF_SIZE, File::create(path)?)),
        None => Box::new(BufWriter::with_capacity(BUF_SIZE, io::stdout().lock())),
    })
}

/// Run `stage` with at least one end on stdin/stdout.
fn run_stdio(stage: Stage, opts: &CliOptions) -> Result<RunStats, IoError> {
    let mut reader = Counted {
        inner: open_input(opts)?,
        count: 0,
    };
    let writer = Counted {
        inner: open_output(opts)?,
        count: 0,
    };
    let (samples, mut writer) = file_io::run_logged(stage, &mut reader, writer, &opts.codec)?;
    writer.flush()?;
    Ok(RunStats {
        stage,
        samples,
        input_size: reader.count,
        output_size: writer.count,
        output_sha256: None,
    })
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn cmd_stage(stage: Stage, opts: &CliOptions) -> i32 {
    if let Err(e) = opts.codec.validate() {
        eprintln!("tabcodec: {e}");
        return e.code();
    }

    if let Some(path) = &opts.output_file
        && path.exists()
        && !opts.force
    {
        eprintln!(
            "tabcodec: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return 1;
    }

    let result = match (&opts.input_file, &opts.output_file) {
        (Some(input), Some(output)) => file_io::run_file(stage, input, output, &opts.codec),
        _ => run_stdio(stage, opts),
    };

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("tabcodec: {e}");
            return e.code();
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "tabcodec: {stage}: samples: {}, input size: {}, output size: {}",
            stats.samples, stats.input_size, stats.output_size
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": stage.name(),
            "samples": stats.samples,
            "input_size": stats.input_size,
            "output_size": stats.output_size,
            "output_sha256": stats.output_sha256.as_ref().map(|h| hex(h)),
            "input_type": opts.codec.input_datatype.name(),
            "output_type": opts.codec.output_datatype.name(),
            "bits": opts.codec.value_size_bits,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => eprintln!("{text}"),
            Err(e) => eprintln!("tabcodec: json: {e}"),
        }
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(opts.quiet, opts.verbose)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && let Some(path) = opts.output_file.take()
        && !opts.quiet
    {
        eprintln!(
            "tabcodec: warning: -c option overrides output filename: {}",
            path.display()
        );
    }

    let exit_code = match opts.command {
        Command::Run(stage) => cmd_stage(stage, &opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
