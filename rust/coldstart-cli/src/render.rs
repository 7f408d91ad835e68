//! Report rendering for stdout.

use coldstart_core::{StatisticsReport, TraceDetail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CliError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => Err(format!("unknown format '{}' (expected json or text)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Text => f.write_str("text"),
        }
    }
}

pub fn render_report(report: &StatisticsReport, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report).map_err(CliError::Render),
        OutputFormat::Text => Ok(report_text(report)),
    }
}

pub fn render_details(details: &[TraceDetail], format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(details).map_err(CliError::Render),
        OutputFormat::Text => Ok(details_text(details)),
    }
}

fn millis(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.1} ms", value),
        None => "-".to_string(),
    }
}

fn report_text(report: &StatisticsReport) -> String {
    let rows = [
        ("function", report.function_name.clone()),
        ("datapoints", report.datapoints.to_string()),
        ("average", millis(report.average)),
        ("min", millis(report.min)),
        ("max", millis(report.max)),
        ("median", millis(report.median)),
        ("p90", millis(report.ninetieth)),
        ("raw", report.raw_data_joined()),
    ];
    rows.iter()
        .map(|(label, value)| format!("{:>10}  {}", label, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn details_text(details: &[TraceDetail]) -> String {
    let mut out = String::new();
    for detail in details {
        out.push_str(&format!("{}  {}", detail.trace_id, detail.timestamp_iso()));
        match detail.incomplete_reason() {
            Some(reason) => out.push_str(&format!("  (skipped: {})\n", reason)),
            None => {
                out.push('\n');
                for segment in detail.durations() {
                    out.push_str(&format!("    {:<24} {:>9.1} ms\n", segment.name, segment.duration));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use coldstart_core::{DecodeOutcome, IncompleteReason, Segment};

    fn report() -> StatisticsReport {
        StatisticsReport {
            function_name: "hello-dev".to_string(),
            datapoints: 2,
            average: Some(136.7),
            min: Some(100.0),
            max: Some(173.4),
            median: Some(100.0),
            ninetieth: Some(173.4),
            raw_data: vec![100.0, 173.4],
        }
    }

    #[test]
    fn json_report_uses_transport_keys() {
        let json = render_report(&report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["functionName"], "hello-dev");
        assert_eq!(value["ninetieth"], 173.4);
        assert_eq!(value["rawData"], "100,173.4");
    }

    #[test]
    fn text_report_aligns_labels() {
        let text = render_report(&report(), OutputFormat::Text).unwrap();
        assert!(text.contains("  function  hello-dev"));
        assert!(text.contains("       p90  173.4 ms"));
        assert!(text.contains("       raw  100,173.4"));
    }

    #[test]
    fn text_report_marks_absent_values() {
        let mut empty = report();
        empty.datapoints = 0;
        empty.median = None;
        let text = render_report(&empty, OutputFormat::Text).unwrap();
        assert!(text.contains("    median  -"));
    }

    #[test]
    fn details_text_shows_skipped_traces() {
        let timestamp = Utc.timestamp_millis_opt(1_551_886_707_308).unwrap();
        let details = vec![
            TraceDetail {
                function_name: "hello-dev".to_string(),
                trace_id: "1-a".to_string(),
                timestamp,
                outcome: DecodeOutcome::Usable(vec![Segment::new("Initialization", None, 173.4)]),
            },
            TraceDetail {
                function_name: "hello-dev".to_string(),
                trace_id: "1-b".to_string(),
                timestamp,
                outcome: DecodeOutcome::Incomplete(IncompleteReason::MissingSubsegments),
            },
        ];

        let text = render_details(&details, OutputFormat::Text).unwrap();
        assert!(text.contains("1-a  2019-03-06T15:38:27.308Z\n"));
        assert!(text.contains("Initialization"));
        assert!(text.contains("173.4 ms"));
        assert!(text.contains("1-b  2019-03-06T15:38:27.308Z  (skipped: AWS::Lambda::Function segment has no subsegments)"));
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
