//! AWS X-Ray backend for coldstart analysis.
//!
//! Implements [`TraceBackend`] on top of the X-Ray API:
//! - `GetTraceSummaries` — one page per call, continuation via `NextToken`
//! - `BatchGetTraces` — up to five IDs per call; X-Ray's own `NextToken`
//!   for this call is followed internally so one call returns the whole chunk

use aws_config::{BehaviorVersion, Region};
use aws_sdk_xray::error::DisplayErrorContext;
use aws_sdk_xray::primitives::DateTime as XrayDateTime;
use aws_sdk_xray::{types, Client, Config};
use chrono::{DateTime, Utc};
use coldstart_core::{
    BackendError, RawSegment, RawTrace, SummaryPage, SummaryQuery, TraceBackend, TraceBatch,
    TraceSummary,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Client settings, usually read from the `[xray]` config section.
///
/// Unset fields fall back to the standard AWS environment/profile chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XraySettings {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    /// Override for local emulators.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

pub struct XrayBackend {
    client: Client,
}

impl std::fmt::Debug for XrayBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XrayBackend").finish()
    }
}

impl XrayBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Load the shared AWS configuration and apply `settings` on top.
    pub async fn from_env(settings: &XraySettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_xray::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        let config: Config = builder.build();

        debug!(
            region = ?config.region().map(|r| r.as_ref().to_string()),
            endpoint = ?settings.endpoint_url,
            "created X-Ray client"
        );

        Self::new(Client::from_conf(config))
    }
}

impl TraceBackend for XrayBackend {
    async fn list_trace_summaries(
        &self,
        query: &SummaryQuery,
        next_token: Option<String>,
    ) -> Result<SummaryPage, BackendError> {
        let output = self
            .client
            .get_trace_summaries()
            .start_time(to_xray_datetime(query.start_time))
            .end_time(to_xray_datetime(query.end_time))
            .filter_expression(&query.filter_expression)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| BackendError::Api(DisplayErrorContext(&e).to_string()))?;

        Ok(SummaryPage {
            summaries: output
                .trace_summaries()
                .iter()
                .filter_map(convert_summary)
                .collect(),
            next_token: output.next_token().map(ToString::to_string),
        })
    }

    async fn batch_get_traces(&self, trace_ids: &[String]) -> Result<TraceBatch, BackendError> {
        let mut batch = TraceBatch::default();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .batch_get_traces()
                .set_trace_ids(Some(trace_ids.to_vec()))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| BackendError::Api(DisplayErrorContext(&e).to_string()))?;

            for trace in output.traces() {
                batch.traces.push(convert_trace(trace)?);
            }
            batch
                .unprocessed_ids
                .extend(output.unprocessed_trace_ids().iter().cloned());

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(batch)
    }
}

fn to_xray_datetime(timestamp: DateTime<Utc>) -> XrayDateTime {
    XrayDateTime::from_millis(timestamp.timestamp_millis())
}

fn convert_summary(summary: &types::TraceSummary) -> Option<TraceSummary> {
    let Some(id) = summary.id() else {
        warn!("skipping trace summary without an id");
        return None;
    };
    Some(TraceSummary {
        id: id.to_string(),
        duration: summary.duration(),
        response_time: summary.response_time(),
    })
}

fn convert_trace(trace: &types::Trace) -> Result<RawTrace, BackendError> {
    let id = trace
        .id()
        .ok_or_else(|| BackendError::InvalidResponse("trace without an id".to_string()))?;

    let segments = trace
        .segments()
        .iter()
        .map(|segment| {
            let document = segment.document().ok_or_else(|| {
                BackendError::InvalidResponse(format!(
                    "segment {} of trace {} has no document",
                    segment.id().unwrap_or("<unknown>"),
                    id
                ))
            })?;
            Ok(RawSegment {
                id: segment.id().map(ToString::to_string),
                document: document.to_string(),
            })
        })
        .collect::<Result<Vec<_>, BackendError>>()?;

    Ok(RawTrace {
        id: id.to_string(),
        segments,
    })
}
