//! Command-line interface implementation
//!
//! Parses arguments, installs the log subscriber and hands off to the
//! conversion driver in [`convert`].

mod convert;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// vipp2dfa - Convert Xerox VIPP (.dbm/.frm) sources to Papyrus DocDEF (.dfa)
#[derive(Parser, Debug)]
#[command(name = "vipp2dfa")]
#[command(about = "Convert Xerox VIPP database masters and forms (.dbm, .frm) to Papyrus DocDEF (.dfa)")]
#[command(version)]
pub struct Cli {
    /// A .dbm file (with --single-file) or a directory to convert recursively
    pub input: PathBuf,

    /// Directory for generated .dfa files (default: output)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write conversion_report.json into the output directory
    #[arg(short, long)]
    pub report: bool,

    /// Convert one .dbm file together with the .frm files beside it
    #[arg(short, long)]
    pub single_file: bool,

    /// Path to vipp2dfa.toml (default: search upward from the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of parallel jobs (default: available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Wrap each sub-form in its own DOCFORMAT instead of include form
    #[arg(long)]
    pub standalone_forms: bool,

    /// Copy referenced images, fonts and PDFs into the output directory
    #[arg(long)]
    pub copy_resources: bool,
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A subscriber may already be installed when run() is called twice in one process.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    ExitCode::from(convert::run_convert(&cli))
}
