use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use pbr_seal::config::Config;
use pbr_seal::fingerprint::HostProbe;
use pbr_seal::metrics::{MetricsSnapshot, SubmissionMetrics};
use pbr_seal::submission::{SubmissionWriter, find_latest};
use pbr_seal::{Signer, Validator, Verdict};

#[derive(Parser, Debug)]
#[command(author, version, about = "Seal and verify benchmark submission files")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign a results JSON file (or `-` for stdin) into a .pbr submission
    Seal {
        results: String,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Check one or more .pbr files
    Verify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print this machine's hardware fingerprint
    Fingerprint,
    /// Print the newest .pbr file in the results directory
    Latest {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = Config::from_env()?;
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match args.command {
        Command::Seal { results, output_dir } => seal(&config, &results, output_dir).await,
        Command::Verify { files } => verify(&config, &files),
        Command::Fingerprint => {
            println!("{}", HostProbe::from_config(&config).fingerprint().await);
            Ok(())
        }
        Command::Latest { dir } => {
            let dir = dir.unwrap_or_else(|| config.results_dir.clone());
            match find_latest(&dir).with_context(|| format!("reading {}", dir.display()))? {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("No result files found in {}", dir.display()),
            }
            Ok(())
        }
    }
}

async fn seal(config: &Config, results: &str, output_dir: Option<PathBuf>) -> Result<()> {
    let signer = Signer::new(config.signing_key()?.clone());

    let raw = if results == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(results).with_context(|| format!("reading {}", results))?
    };
    let results: serde_json::Value = serde_json::from_str(&raw).context("results must be JSON")?;

    let fingerprint = HostProbe::from_config(config).fingerprint().await;
    let package = signer.seal(results, fingerprint)?;

    let writer = SubmissionWriter::from_config(config);
    let output_dir = output_dir.unwrap_or_else(|| config.results_dir.clone());
    let path = writer.write(&package, &output_dir)?;

    println!("SUBMISSION FILE CREATED");
    println!("File: {}", path.display());
    println!("Upload this file to the leaderboard: {}", writer.upload_url());
    Ok(())
}

fn verify(config: &Config, files: &[PathBuf]) -> Result<()> {
    let metrics = Arc::new(SubmissionMetrics::new());
    let validator = Validator::new(config.signing_key()?.clone()).with_metrics(Arc::clone(&metrics));

    for file in files {
        match validator.validate_file(file) {
            Verdict::Accepted(data) => {
                println!("{}: VALID", file.display());
                println!("  Version: {}", data.version);
                println!("  Timestamp: {}", data.timestamp);
                let hw: String = data.hardware_fingerprint.chars().take(16).collect();
                println!("  Hardware: {}...", hw);
            }
            Verdict::Invalid => println!("{}: INVALID or TAMPERED", file.display()),
        }
    }

    let summary = metrics.get_metrics();
    println!("{} checked, {} valid, {} invalid", summary.total_submissions, summary.accepted, summary.rejected);
    ensure_all_accepted(&summary)
}

fn ensure_all_accepted(summary: &MetricsSnapshot) -> Result<()> {
    if summary.rejected > 0 {
        anyhow::bail!("{} submission(s) rejected", summary.rejected);
    }
    Ok(())
}
