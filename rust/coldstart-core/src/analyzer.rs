//! End-to-end analysis: list summaries, fetch and decode details, aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::backend::{SummaryQuery, TraceBackend};
use crate::error::AnalyzeError;
use crate::fetch::{filter_expression, TraceFetcher};
use crate::stats::{aggregate, Metric, RankMethod, StatisticsReport};
use crate::trace::TraceDetail;

/// Input of one analysis run. Deserialises from `{"startTime": ..., "functionName": ...}`
/// where `startTime` is an RFC 3339 string or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(deserialize_with = "deserialize_start_time")]
    pub start_time: DateTime<Utc>,
    pub function_name: String,
}

impl AnalyzeRequest {
    pub fn new(start_time: DateTime<Utc>, function_name: impl Into<String>) -> Self {
        Self {
            start_time,
            function_name: function_name.into(),
        }
    }
}

/// Parse an RFC 3339 timestamp or a count of epoch milliseconds.
pub fn parse_start_time(input: &str) -> Result<DateTime<Utc>, String> {
    let input = input.trim();
    if let Ok(millis) = input.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| format!("epoch milliseconds out of range: {}", millis));
    }
    DateTime::parse_from_rfc3339(input)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid start time '{}': {}", input, e))
}

fn deserialize_start_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(millis) => DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            serde::de::Error::custom(format!("epoch milliseconds out of range: {}", millis))
        }),
        Raw::Text(text) => parse_start_time(&text).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzeOptions {
    pub metric: Metric,
    pub rank: RankMethod,
}

/// Everything one run produced: the report plus the traces behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub report: StatisticsReport,
    pub details: Vec<TraceDetail>,
    pub unprocessed_ids: Vec<String>,
}

pub struct Analyzer<B> {
    backend: B,
    options: AnalyzeOptions,
}

impl<B: TraceBackend> Analyzer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            options: AnalyzeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AnalyzeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> AnalyzeOptions {
        self.options
    }

    /// Analyse the window from `request.start_time` until now.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<StatisticsReport, AnalyzeError> {
        self.analyze_until(request, Utc::now()).await
    }

    /// Analyse the window from `request.start_time` until `end_time`.
    pub async fn analyze_until(
        &self,
        request: &AnalyzeRequest,
        end_time: DateTime<Utc>,
    ) -> Result<StatisticsReport, AnalyzeError> {
        Ok(self.run(request, end_time).await?.report)
    }

    pub async fn run(
        &self,
        request: &AnalyzeRequest,
        end_time: DateTime<Utc>,
    ) -> Result<Analysis, AnalyzeError> {
        if request.start_time > end_time {
            return Err(AnalyzeError::InvalidWindow {
                start: request.start_time,
                end: end_time,
            });
        }

        let query = SummaryQuery {
            start_time: request.start_time,
            end_time,
            filter_expression: filter_expression(&request.function_name),
        };
        let fetcher = TraceFetcher::new(&self.backend);

        let summaries = fetcher.trace_summaries(&query).await?;
        info!(
            function = %request.function_name,
            count = summaries.len(),
            "fetched trace summaries"
        );

        let trace_ids: Vec<String> = summaries.into_iter().map(|summary| summary.id).collect();
        let fetched = fetcher.trace_details(&trace_ids).await?;
        info!(
            function = %request.function_name,
            count = fetched.details.len(),
            unprocessed = fetched.unprocessed_ids.len(),
            "decoded trace details"
        );

        let report = aggregate(
            &request.function_name,
            &fetched.details,
            self.options.metric,
            self.options.rank,
        );
        info!(
            function = %request.function_name,
            datapoints = report.datapoints,
            metric = %self.options.metric,
            "aggregated cold-start statistics"
        );

        Ok(Analysis {
            report,
            details: fetched.details,
            unprocessed_ids: fetched.unprocessed_ids,
        })
    }
}
