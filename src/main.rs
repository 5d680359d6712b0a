use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{error, info, warn};

use technosig_report::batch::{run_from_config, BatchSummary, CancelToken};
use technosig_report::config::ReportConfig;
use technosig_report::report::html::HtmlReportRenderer;
use technosig_report::report::json::JsonReportRenderer;
use technosig_report::report::DocumentRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Json,
}

/// Build one report per technosignature candidate.
#[derive(Parser, Debug)]
#[command(name = "technosig-report")]
#[command(version)]
struct Args {
    /// TOML configuration file; command-line options override it
    #[arg(short, long, env = "TECHNOSIG_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the upstream pipeline outputs
    #[arg(short, long, env = "TECHNOSIG_INPUT_DIR")]
    input: Option<PathBuf>,

    /// Directory for reports and plots (defaults to the input directory)
    #[arg(short, long, env = "TECHNOSIG_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Candidate table (.csv or .parquet)
    #[arg(long)]
    candidates: Option<PathBuf>,

    /// Radio-hits table (.csv or .parquet)
    #[arg(long)]
    radio_hits: Option<PathBuf>,

    /// Report document format
    #[arg(long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Compose candidates on a worker pool
    #[arg(long)]
    parallel: bool,

    /// Worker threads (implies --parallel)
    #[arg(long)]
    threads: Option<usize>,

    /// Give up on a candidate after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<(ReportConfig, Format)> {
        let mut cfg = match &self.config {
            Some(path) => ReportConfig::from_toml_file(path)?,
            None => ReportConfig::default(),
        };
        if let Some(input) = self.input {
            cfg.input_dir = input;
        }
        if self.output.is_some() {
            cfg.output_dir = self.output;
        }
        if self.candidates.is_some() {
            cfg.candidates = self.candidates;
        }
        if self.radio_hits.is_some() {
            cfg.radio_hits = self.radio_hits;
        }
        if self.parallel || self.threads.is_some() {
            cfg.batch.parallel = true;
        }
        if self.threads.is_some() {
            cfg.batch.threads = self.threads;
        }
        if self.timeout_secs.is_some() {
            cfg.batch.timeout_secs = self.timeout_secs;
        }
        Ok((cfg, self.format))
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(summary) => {
            info!(
                "Done: {} generated, {} failed, {} cancelled",
                summary.generated, summary.failed, summary.cancelled
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<BatchSummary> {
    let (config, format) = args.into_config()?;
    info!("Input directory: {}", config.input_dir.display());
    info!("Output directory: {}", config.output_dir().display());

    let document: Box<dyn DocumentRenderer> = match format {
        Format::Html => Box::new(HtmlReportRenderer),
        Format::Json => Box::new(JsonReportRenderer),
    };
    let outcomes = run_from_config(&config, document, CancelToken::new())?;
    let summary = BatchSummary::from_outcomes(&outcomes);
    if summary.failed > 0 {
        warn!(
            "{} candidates have no report; see {}",
            summary.failed,
            config.manifest_path().display()
        );
    }
    info!("Report numbers follow candidate table row order");
    Ok(summary)
}
