//! Civitai Archiver - Main entry point

use anyhow::{Context, Result};
use civitai_archiver::{Archiver, ItemReport, config::ArchiverConfig, split_inputs};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const PROMPT: &str = "Enter the model URL or ID (separate multiple models with a comma):";

#[derive(Parser, Debug)]
#[command(name = "civitai-archiver")]
#[command(about = "Archive Civitai models, metadata and preview images", long_about = None)]
#[command(version)]
struct Cli {
    /// Model URLs or IDs (comma-separated lists are accepted). Prompts on stdin when omitted
    inputs: Vec<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override destination root folder
    #[arg(long)]
    root: Option<PathBuf>,

    /// Civitai API token (overrides CIVITAI_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Print one JSON report per item instead of a summary line
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for reports
    match cli.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let mut config = ArchiverConfig::load(cli.config)?;

    // CLI overrides
    if let Some(root) = cli.root {
        config.destination_root = root;
    }
    if let Some(token) = cli.token {
        config.auth_token = Some(token);
    }

    config.validate()?;

    tracing::info!(
        destination_root = ?config.destination_root,
        authenticated = config.auth_token.is_some(),
        "Configuration loaded"
    );

    let archiver = Archiver::new(config).context("Failed to create HTTP client")?;

    if !cli.inputs.is_empty() {
        let items: Vec<&str> = cli.inputs.iter().flat_map(|s| split_inputs(s)).collect();
        let reports = archiver.run_batch(items.as_slice()).await;
        print_reports(&reports, cli.json)?;

        return Ok(if reports.iter().all(ItemReport::is_success) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    // Interactive mode: one batch per line until EOF
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stderr = tokio::io::stderr();
    loop {
        stderr
            .write_all(format!("{}\n", PROMPT).as_bytes())
            .await
            .context("Failed to write prompt")?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };

        let reports = archiver.run_batch(split_inputs(&line).as_slice()).await;
        print_reports(&reports, cli.json)?;
    }

    tracing::info!("Input closed, exiting");
    Ok(ExitCode::SUCCESS)
}

fn print_reports(reports: &[ItemReport], json: bool) -> Result<()> {
    for report in reports {
        if json {
            println!(
                "{}",
                serde_json::to_string(report).context("Failed to encode report")?
            );
        } else {
            println!("{}", report.summary());
        }
    }
    Ok(())
}
