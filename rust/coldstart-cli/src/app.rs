//! Command-line surface and the top-level run.

use chrono::{DateTime, Utc};
use clap::Parser;
use coldstart_core::{parse_start_time, AnalyzeOptions, AnalyzeRequest, Analyzer};
use coldstart_provider_xray::{XrayBackend, XraySettings};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::ColdstartConfig;
use crate::error::CliError;
use crate::render::{render_details, render_report, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "coldstart",
    version,
    about = "Cold-start latency statistics from AWS X-Ray traces",
    after_help = "\
Examples:
  coldstart --function-name hello-dev --since 2h
  coldstart --function-name hello-dev --start-time 2019-03-06T15:00:00Z --format text
  coldstart --event event.json --traces"
)]
pub struct Cli {
    /// Function (X-Ray service) name to analyse
    #[arg(long, short = 'f', conflicts_with = "event")]
    pub function_name: Option<String>,

    /// Window start: RFC 3339 timestamp or epoch milliseconds
    #[arg(long, value_parser = parse_start_time, conflicts_with_all = ["since", "event"])]
    pub start_time: Option<DateTime<Utc>>,

    /// Window start relative to now, e.g. `30m` or `2h`
    #[arg(long, value_parser = humantime::parse_duration, conflicts_with = "event")]
    pub since: Option<std::time::Duration>,

    /// Read `{"startTime": ..., "functionName": ...}` from a file, or `-` for stdin
    #[arg(long)]
    pub event: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Percentile rank convention: nearest or legacy
    #[arg(long)]
    pub rank: Option<coldstart_core::RankMethod>,

    /// Phase to summarise: initialization, setup, lambda or function
    #[arg(long)]
    pub metric: Option<coldstart_core::Metric>,

    /// Also print every decoded trace
    #[arg(long)]
    pub traces: bool,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub profile: Option<String>,

    /// X-Ray endpoint override, e.g. a local emulator
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Config file to use instead of searching for coldstart.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    pub fn load_config(&self) -> Result<ColdstartConfig, CliError> {
        match &self.config {
            Some(path) => ColdstartConfig::load_from(path),
            None => ColdstartConfig::load(),
        }
    }

    /// Build the request from `--event` or from the individual flags.
    pub fn request(&self, now: DateTime<Utc>) -> Result<AnalyzeRequest, CliError> {
        if let Some(path) = &self.event {
            return read_event(path);
        }

        let function_name = self
            .function_name
            .clone()
            .ok_or_else(|| CliError::Usage("--function-name is required".to_string()))?;

        let start_time = match (self.start_time, self.since) {
            (Some(start), _) => start,
            (None, Some(since)) => {
                let since = chrono::Duration::from_std(since)
                    .map_err(|e| CliError::Usage(format!("--since is out of range: {}", e)))?;
                now.checked_sub_signed(since).ok_or_else(|| {
                    CliError::Usage("--since reaches before the earliest supported time".to_string())
                })?
            }
            (None, None) => {
                return Err(CliError::Usage(
                    "one of --start-time or --since is required".to_string(),
                ))
            }
        };

        Ok(AnalyzeRequest::new(start_time, function_name))
    }

    /// Command-line values override the config file.
    pub fn xray_settings(&self, config: &ColdstartConfig) -> XraySettings {
        XraySettings {
            region: self.region.clone().or_else(|| config.xray.region.clone()),
            profile: self.profile.clone().or_else(|| config.xray.profile.clone()),
            endpoint_url: self
                .endpoint_url
                .clone()
                .or_else(|| config.xray.endpoint_url.clone()),
        }
    }

    pub fn options(&self, config: &ColdstartConfig) -> AnalyzeOptions {
        AnalyzeOptions {
            metric: self.metric.or(config.report.metric).unwrap_or_default(),
            rank: self.rank.or(config.report.rank).unwrap_or_default(),
        }
    }

    pub fn output_format(&self, config: &ColdstartConfig) -> OutputFormat {
        self.format.or(config.report.format).unwrap_or_default()
    }
}

fn read_event(path: &Path) -> Result<AnalyzeRequest, CliError> {
    let io_error = |source: std::io::Error| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(io_error)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(io_error)?
    };
    serde_json::from_str(&content).map_err(CliError::Event)
}

/// Run one analysis against X-Ray and print the report to stdout.
pub async fn run(cli: &Cli, config: &ColdstartConfig) -> Result<(), CliError> {
    let now = Utc::now();
    let request = cli.request(now)?;
    let format = cli.output_format(config);

    let backend = XrayBackend::from_env(&cli.xray_settings(config)).await;
    let analyzer = Analyzer::new(backend).with_options(cli.options(config));
    let analysis = analyzer.run(&request, now).await?;

    if !analysis.unprocessed_ids.is_empty() {
        warn!(
            count = analysis.unprocessed_ids.len(),
            "some traces were not returned by X-Ray and are missing from the report"
        );
    }

    if cli.traces {
        println!("{}", render_details(&analysis.details, format)?);
    }
    println!("{}", render_report(&analysis.report, format)?);
    Ok(())
}
