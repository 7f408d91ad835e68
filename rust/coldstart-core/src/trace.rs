//! Trace data model: listing summaries, raw backend records and decoded details.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Origin of the platform invocation wrapper segment.
pub const LAMBDA_ORIGIN: &str = "AWS::Lambda";
/// Origin of the segment covering the function's own execution.
pub const FUNCTION_ORIGIN: &str = "AWS::Lambda::Function";
/// Subsegment emitted by the runtime for the cold-start init phase.
pub const INITIALIZATION: &str = "Initialization";
/// Derived interval: wrapper time not covered by the function or its init phase.
pub const SETUP: &str = "Setup";

/// One entry of a trace listing page. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub id: String,
    pub duration: Option<f64>,
    pub response_time: Option<f64>,
}

/// A trace as returned by a batch detail fetch, before decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrace {
    pub id: String,
    pub segments: Vec<RawSegment>,
}

/// Opaque segment record; `document` is an independently JSON-encoded segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub id: Option<String>,
    pub document: String,
}

/// A named timing interval, in milliseconds rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub id: Option<String>,
    pub duration: f64,
}

impl Segment {
    pub fn new(name: impl Into<String>, id: Option<String>, duration: f64) -> Self {
        Self {
            name: name.into(),
            id,
            duration,
        }
    }
}

/// Why a trace could not be decomposed into the full set of durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IncompleteReason {
    MissingFunctionSegment,
    MissingSubsegments,
    MissingInitialization,
    /// The wrapper, function or `Initialization` segment has no `end_time` yet.
    InProgress { segment: String },
    /// A subsegment reuses a label that must appear once.
    DuplicateLabel { label: String },
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncompleteReason::MissingFunctionSegment => {
                write!(f, "missing {} segment", FUNCTION_ORIGIN)
            }
            IncompleteReason::MissingSubsegments => {
                write!(f, "{} segment has no subsegments", FUNCTION_ORIGIN)
            }
            IncompleteReason::MissingInitialization => {
                write!(f, "missing {} subsegment", INITIALIZATION)
            }
            IncompleteReason::InProgress { segment } => {
                write!(f, "segment '{}' has not finished", segment)
            }
            IncompleteReason::DuplicateLabel { label } => {
                write!(f, "label '{}' appears more than once", label)
            }
        }
    }
}

/// Result of decoding one trace.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// Wrapper, function, every finished subsegment, then the derived `Setup` entry.
    Usable(Vec<Segment>),
    Incomplete(IncompleteReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceDetail {
    pub function_name: String,
    pub trace_id: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: DecodeOutcome,
}

impl TraceDetail {
    /// Decoded durations; empty for incomplete traces.
    pub fn durations(&self) -> &[Segment] {
        match &self.outcome {
            DecodeOutcome::Usable(segments) => segments,
            DecodeOutcome::Incomplete(_) => &[],
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.durations().is_empty()
    }

    pub fn incomplete_reason(&self) -> Option<&IncompleteReason> {
        match &self.outcome {
            DecodeOutcome::Usable(_) => None,
            DecodeOutcome::Incomplete(reason) => Some(reason),
        }
    }

    /// Duration of the first segment with the given name.
    pub fn duration_of(&self, name: &str) -> Option<f64> {
        self.durations()
            .iter()
            .find(|segment| segment.name == name)
            .map(|segment| segment.duration)
    }

    /// ISO-8601 start time with millisecond precision, e.g. `2019-03-06T15:38:27.308Z`.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl Serialize for TraceDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let reason = self.incomplete_reason();
        let fields = if reason.is_some() { 5 } else { 4 };
        let mut state = serializer.serialize_struct("TraceDetail", fields)?;
        state.serialize_field("functionName", &self.function_name)?;
        state.serialize_field("traceId", &self.trace_id)?;
        state.serialize_field("timestamp", &self.timestamp_iso())?;
        state.serialize_field("durations", self.durations())?;
        if let Some(reason) = reason {
            state.serialize_field("incomplete", reason)?;
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn detail(outcome: DecodeOutcome) -> TraceDetail {
        TraceDetail {
            function_name: "hello-dev".to_string(),
            trace_id: "1-5c7954d9-560bf598fb3f88607c3751e0".to_string(),
            timestamp: Utc.timestamp_millis_opt(1_551_886_707_308).unwrap(),
            outcome,
        }
    }

    #[test]
    fn timestamp_uses_millisecond_precision() {
        assert_eq!(
            detail(DecodeOutcome::Incomplete(IncompleteReason::MissingSubsegments)).timestamp_iso(),
            "2019-03-06T15:38:27.308Z"
        );
    }

    #[test]
    fn incomplete_trace_has_no_durations() {
        let trace = detail(DecodeOutcome::Incomplete(
            IncompleteReason::MissingFunctionSegment,
        ));
        assert!(!trace.is_usable());
        assert!(trace.durations().is_empty());
        assert_eq!(trace.duration_of(INITIALIZATION), None);
    }

    #[test]
    fn serializes_in_report_shape() {
        let trace = detail(DecodeOutcome::Usable(vec![
            Segment::new(LAMBDA_ORIGIN, Some("2cd1290ee882c1b0".to_string()), 376.0),
            Segment::new(SETUP, None, 200.1),
        ]));

        let value = serde_json::to_value(&trace).unwrap();
        assert_eq!(
            value,
            json!({
                "functionName": "hello-dev",
                "traceId": "1-5c7954d9-560bf598fb3f88607c3751e0",
                "timestamp": "2019-03-06T15:38:27.308Z",
                "durations": [
                    { "name": "AWS::Lambda", "id": "2cd1290ee882c1b0", "duration": 376.0 },
                    { "name": "Setup", "id": null, "duration": 200.1 }
                ]
            })
        );
    }

    #[test]
    fn serializes_incomplete_reason() {
        let trace = detail(DecodeOutcome::Incomplete(IncompleteReason::InProgress {
            segment: "Invocation".to_string(),
        }));

        let value = serde_json::to_value(&trace).unwrap();
        assert_eq!(value["durations"], json!([]));
        assert_eq!(
            value["incomplete"],
            json!({ "kind": "in_progress", "segment": "Invocation" })
        );
    }
}
