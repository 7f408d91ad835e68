//! Trace retrieval: paginated summary listing and chunked detail fetch.

use tracing::{debug, warn};

use crate::backend::{SummaryQuery, TraceBackend};
use crate::decode::decode_trace;
use crate::error::AnalyzeError;
use crate::trace::{TraceDetail, TraceSummary};

/// Upper bound on trace IDs per batch detail call.
pub const MAX_BATCH_SIZE: usize = 5;

/// Build the listing filter selecting traces of one service.
pub fn filter_expression(function_name: &str) -> String {
    let mut escaped = String::with_capacity(function_name.len());
    for ch in function_name.chars() {
        if ch == '"' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("service(\"{}\")", escaped)
}

/// Decoded details of a batch fetch, plus IDs the backend left unprocessed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedDetails {
    pub details: Vec<TraceDetail>,
    pub unprocessed_ids: Vec<String>,
}

pub struct TraceFetcher<'a, B> {
    backend: &'a B,
}

impl<'a, B: TraceBackend> TraceFetcher<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// List every summary matching `query`, following continuation tokens.
    ///
    /// Pages are concatenated in the order received.
    pub async fn trace_summaries(
        &self,
        query: &SummaryQuery,
    ) -> Result<Vec<TraceSummary>, AnalyzeError> {
        let mut summaries = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .backend
                .list_trace_summaries(query, next_token.take())
                .await?;
            pages += 1;
            debug!(page = pages, count = page.summaries.len(), "received trace summary page");
            summaries.extend(page.summaries);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(summaries)
    }

    /// Fetch and decode traces in chunks of [`MAX_BATCH_SIZE`], one chunk at a time.
    ///
    /// Unprocessed IDs are dropped from the result and reported back to the caller.
    pub async fn trace_details(&self, trace_ids: &[String]) -> Result<FetchedDetails, AnalyzeError> {
        let mut fetched = FetchedDetails {
            details: Vec::with_capacity(trace_ids.len()),
            unprocessed_ids: Vec::new(),
        };

        for (index, chunk) in trace_ids.chunks(MAX_BATCH_SIZE).enumerate() {
            let batch = self.backend.batch_get_traces(chunk).await?;
            debug!(
                chunk = index,
                requested = chunk.len(),
                returned = batch.traces.len(),
                "received trace batch"
            );

            if !batch.unprocessed_ids.is_empty() {
                warn!(
                    chunk = index,
                    ids = ?batch.unprocessed_ids,
                    "backend left trace IDs unprocessed; dropping them"
                );
                fetched.unprocessed_ids.extend(batch.unprocessed_ids);
            }

            for raw in &batch.traces {
                fetched.details.push(decode_trace(raw)?);
            }
        }

        Ok(fetched)
    }
}
