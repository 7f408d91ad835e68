//! Tracing backend interface.
//!
//! The fetcher only talks to a [`TraceBackend`]; the X-Ray client lives in its
//! own provider crate and [`StubBackend`] serves scripted data in tests.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;

use crate::error::BackendError;
use crate::trace::{RawTrace, TraceSummary};

/// Parameters shared by every page of one summary listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub filter_expression: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryPage {
    pub summaries: Vec<TraceSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceBatch {
    pub traces: Vec<RawTrace>,
    /// IDs the backend accepted but did not return.
    pub unprocessed_ids: Vec<String>,
}

/// Source of trace summaries and trace documents.
pub trait TraceBackend: Send + Sync {
    /// Fetch one page of summaries. `next_token` is `None` for the first page.
    fn list_trace_summaries(
        &self,
        query: &SummaryQuery,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<SummaryPage, BackendError>> + Send;

    /// Fetch full traces for at most [`MAX_BATCH_SIZE`](crate::fetch::MAX_BATCH_SIZE) IDs.
    fn batch_get_traces(
        &self,
        trace_ids: &[String],
    ) -> impl Future<Output = Result<TraceBatch, BackendError>> + Send;
}

/// A call observed by [`StubBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    ListSummaries {
        query: SummaryQuery,
        next_token: Option<String>,
    },
    BatchGet {
        trace_ids: Vec<String>,
    },
}

/// Stub backend for testing (replays scripted pages, serves traces by ID).
#[derive(Debug, Default)]
pub struct StubBackend {
    pages: Mutex<VecDeque<Result<SummaryPage, String>>>,
    traces: HashMap<String, RawTrace>,
    unprocessed: HashSet<String>,
    batch_failure: Option<String>,
    calls: Mutex<Vec<BackendCall>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a listing page. Pages are served in the order they were pushed.
    pub fn push_page(&mut self, summaries: Vec<TraceSummary>, next_token: Option<&str>) {
        self.pages.get_mut().push_back(Ok(SummaryPage {
            summaries,
            next_token: next_token.map(ToString::to_string),
        }));
    }

    /// Queue a listing failure.
    pub fn push_page_error(&mut self, message: &str) {
        self.pages.get_mut().push_back(Err(message.to_string()));
    }

    pub fn insert_trace(&mut self, trace: RawTrace) {
        self.traces.insert(trace.id.clone(), trace);
    }

    /// Report the given ID as unprocessed instead of returning it.
    pub fn mark_unprocessed(&mut self, trace_id: &str) {
        self.unprocessed.insert(trace_id.to_string());
    }

    /// Make every batch fetch fail with the given message.
    pub fn fail_batches(&mut self, message: &str) {
        self.batch_failure = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// The ID lists of every batch fetch, in call order.
    pub fn batch_calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::BatchGet { trace_ids } => Some(trace_ids.clone()),
                BackendCall::ListSummaries { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }
}

impl TraceBackend for StubBackend {
    async fn list_trace_summaries(
        &self,
        query: &SummaryQuery,
        next_token: Option<String>,
    ) -> Result<SummaryPage, BackendError> {
        self.record(BackendCall::ListSummaries {
            query: query.clone(),
            next_token,
        });
        match self.pages.lock().pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(BackendError::Api(message)),
            None => Ok(SummaryPage::default()),
        }
    }

    async fn batch_get_traces(&self, trace_ids: &[String]) -> Result<TraceBatch, BackendError> {
        self.record(BackendCall::BatchGet {
            trace_ids: trace_ids.to_vec(),
        });
        if let Some(message) = &self.batch_failure {
            return Err(BackendError::Api(message.clone()));
        }

        let mut batch = TraceBatch::default();
        for id in trace_ids {
            match self.traces.get(id) {
                Some(trace) if !self.unprocessed.contains(id) => batch.traces.push(trace.clone()),
                _ => batch.unprocessed_ids.push(id.clone()),
            }
        }
        Ok(batch)
    }
}
