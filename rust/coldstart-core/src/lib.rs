//! Cold-start latency analysis over distributed traces.
//!
//! This crate provides:
//! - Segment decoding of Lambda traces into named durations (`decode`)
//! - Paginated summary listing and chunked detail fetch (`fetch`)
//! - Descriptive statistics over the initialization phase (`stats`)
//! - The end-to-end [`Analyzer`] tying them together
//!
//! The tracing backend is abstracted behind [`TraceBackend`]; see the
//! `coldstart-provider-xray` crate for the AWS X-Ray implementation.

pub mod analyzer;
pub mod backend;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod stats;
pub mod trace;

pub use analyzer::{parse_start_time, Analysis, AnalyzeOptions, AnalyzeRequest, Analyzer};
pub use backend::{BackendCall, StubBackend, SummaryPage, SummaryQuery, TraceBackend, TraceBatch};
pub use decode::decode_trace;
pub use error::{AnalyzeError, BackendError};
pub use fetch::{filter_expression, FetchedDetails, TraceFetcher, MAX_BATCH_SIZE};
pub use stats::{aggregate, Datapoint, Metric, RankMethod, StatisticsReport};
pub use trace::{
    DecodeOutcome, IncompleteReason, RawSegment, RawTrace, Segment, TraceDetail, TraceSummary,
};
