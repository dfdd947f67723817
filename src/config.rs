//! Configuration types for dir-verifier
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::signing::default_key_path;
use clap::Parser;
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Default number of hashing threads
const DEFAULT_WORKERS: usize = 20;

/// Default verification file name
pub const DEFAULT_VERIFICATION_FILE: &str = "verify.vf";

/// Build and verify signed SHA-256 manifests of a directory tree
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dir-verifier",
    version,
    about = "Build and verify signed SHA-256 manifests of a directory tree",
    long_about = "Hashes every regular file under a directory in parallel, writes a manifest \
                  signed with a local Ed25519 key, and later re-hashes the files to report \
                  anything that changed.\n\n\
                  Exit codes: 0 success, 1 operational error, 2 verification or signature failure.",
    after_help = "EXAMPLES:\n    \
        dir-verifier -d .                    # write ./verify.vf for the current directory\n    \
        dir-verifier -d /srv/data -t 64 -f data.vf\n    \
        dir-verifier -v                      # verify ./verify.vf\n    \
        dir-verifier -v -d /srv -f data.vf -k ~/.vkeys/ops"
)]
pub struct CliArgs {
    /// Directory to perform the operation on
    #[arg(short = 'd', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Verification file name
    #[arg(
        short = 'f',
        long = "file",
        default_value = DEFAULT_VERIFICATION_FILE,
        value_name = "FILE"
    )]
    pub verification_file: PathBuf,

    /// Verify files against an existing verification file
    #[arg(short = 'v', long)]
    pub verify: bool,

    /// Path to the Ed25519 key (generated if missing) [default: $HOME/.vkeys/default]
    #[arg(short = 'k', long = "key", value_name = "PATH")]
    pub key: Option<PathBuf>,

    /// Number of hashing threads
    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_WORKERS, value_name = "NUM")]
    pub threads: usize,

    /// Quiet mode - suppress progress and summary output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose logging
    #[arg(long)]
    pub verbose: bool,
}

/// What a run does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Hash `root` and write a signed verification file
    Build { root: PathBuf },

    /// Check the files listed in `<directory>/<verification file>`
    Verify { directory: PathBuf },
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,

    /// Verification file name as given on the command line
    pub verification_file: PathBuf,

    /// Signing key location
    pub key_path: PathBuf,

    /// Number of hashing workers
    pub worker_count: usize,

    /// Show progress and summary
    pub show_progress: bool,
}

impl RunConfig {
    /// Create a validated configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.threads == 0 || args.threads > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.threads,
                max: MAX_WORKERS,
            });
        }

        let mode = match (args.verify, args.directory) {
            (false, Some(root)) => Mode::Build { root },
            (false, None) => return Err(ConfigError::MissingDirectory),
            (true, directory) => Mode::Verify {
                directory: directory.unwrap_or_else(|| PathBuf::from(".")),
            },
        };

        let key_path = match args.key {
            Some(path) => path,
            None => default_key_path().ok_or(ConfigError::NoHomeDirectory)?,
        };

        Ok(Self {
            mode,
            verification_file: args.verification_file,
            key_path,
            worker_count: args.threads,
            show_progress: !args.quiet,
        })
    }

    /// Where the signed verification file is written (build) or read (verify).
    ///
    /// Builds write relative to the current directory; verification reads
    /// from inside the target directory.
    pub fn container_path(&self) -> PathBuf {
        match &self.mode {
            Mode::Build { .. } => self.verification_file.clone(),
            Mode::Verify { directory } => directory.join(&self.verification_file),
        }
    }
}
