//! dir-verifier - Signed Directory Manifests
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use dir_verifier::config::{CliArgs, Mode, RunConfig};
use dir_verifier::manifest::{build_manifest, verify_manifest, BuildConfig, Manifest, VerifyConfig};
use dir_verifier::progress::{print_header, print_mismatches, print_summary, ProgressReporter, RunSummary};
use dir_verifier::signing::{self, Ed25519KeyStore};
use dir_verifier::VerifierError;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Exit code for a failed verification or signature check
const EXIT_VERIFICATION_FAILED: u8 = 2;

enum Status {
    Success,
    VerificationFailed,
}

fn main() -> ExitCode {
    match run() {
        Ok(Status::Success) => ExitCode::SUCCESS,
        Ok(Status::VerificationFailed) => ExitCode::from(EXIT_VERIFICATION_FAILED),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            let signature_failed = e
                .downcast_ref::<VerifierError>()
                .is_some_and(VerifierError::is_verification_failure);
            if signature_failed {
                ExitCode::from(EXIT_VERIFICATION_FAILED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run() -> Result<Status> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = RunConfig::from_args(args).context("Invalid configuration")?;

    let keys = Ed25519KeyStore::load_or_generate(&config.key_path)
        .with_context(|| format!("Error loading key {}", config.key_path.display()))?;

    match &config.mode {
        Mode::Build { root } => run_build(&config, root, &keys),
        Mode::Verify { directory } => run_verify(&config, directory, &keys),
    }
}

/// Hash the tree and write the signed verification file
fn run_build(config: &RunConfig, root: &Path, keys: &Ed25519KeyStore) -> Result<Status> {
    let container_path = config.container_path();

    if config.show_progress {
        print_header(
            "build",
            &root.display().to_string(),
            config.worker_count,
            &container_path.display().to_string(),
        );
    }

    let progress = config
        .show_progress
        .then(|| ProgressReporter::new("Hashing files..."));

    let build = BuildConfig::new(root, config.worker_count).with_exclude(&container_path);
    let output = build_manifest(&build, |path, digest| {
        debug!(path, digest, "Hashed file");
        if let Some(ref p) = progress {
            p.record();
        }
    })
    .context("Error hashing files")?;

    let payload = output.manifest.to_json().context("Error encoding manifest")?;
    let container = signing::seal(keys, &payload);
    fs::write(&container_path, &container)
        .with_context(|| format!("Error writing file {}", container_path.display()))?;

    info!(
        path = %container_path.display(),
        files = output.manifest.len(),
        "Verification file written"
    );

    if let Some(ref p) = progress {
        p.finish("Manifest written");
        print_summary(&RunSummary {
            title: "Build Complete",
            files: output.manifest.len() as u64,
            failures: output.manifest.unreadable().count() as u64,
            stats: output.stats,
            output_path: &container_path.display().to_string(),
            output_size: Some(container.len() as u64),
        });
    }

    Ok(Status::Success)
}

/// Check the signed verification file, then every file it lists
fn run_verify(config: &RunConfig, directory: &Path, keys: &Ed25519KeyStore) -> Result<Status> {
    let container_path = config.container_path();

    if config.show_progress {
        print_header(
            "verify",
            &directory.display().to_string(),
            config.worker_count,
            &container_path.display().to_string(),
        );
    }

    let container = fs::read(&container_path)
        .with_context(|| format!("Unable to read file {}", container_path.display()))?;

    let payload = signing::open(keys, &container)
        .map_err(VerifierError::from)
        .context("Verifying signature failed")?;

    let manifest = Manifest::from_json(payload)
        .map_err(VerifierError::from)
        .context("Unable to parse verification file")?;

    let progress = config
        .show_progress
        .then(|| ProgressReporter::new("Verifying files..."));

    let output = verify_manifest(&manifest, &VerifyConfig::new(config.worker_count), |_, _| {
        if let Some(ref p) = progress {
            p.record();
        }
    })
    .context("Unable to verify hashes")?;

    if let Some(ref p) = progress {
        p.finish_and_clear();
        print_summary(&RunSummary {
            title: "Verify Complete",
            files: manifest.len() as u64,
            failures: output.report.len() as u64,
            stats: output.stats,
            output_path: &container_path.display().to_string(),
            output_size: Some(container.len() as u64),
        });
    }

    if output.report.is_clean() {
        println!("Verifying files succeeded!");
        Ok(Status::Success)
    } else {
        print_mismatches(&output.report);
        Ok(Status::VerificationFailed)
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("dir_verifier=debug,warn")
    } else {
        EnvFilter::new("dir_verifier=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
