//! Segment decoding: turns one raw trace into a flat list of named durations.
//!
//! The decoder expects the shape produced by the Lambda runtime's X-Ray
//! instrumentation:
//! - an `AWS::Lambda` segment wrapping the whole invocation,
//! - an `AWS::Lambda::Function` segment whose subsegments include
//!   `Initialization` on cold starts.
//!
//! Anything short of that yields [`DecodeOutcome::Incomplete`]. Only a missing
//! or unreadable wrapper segment is treated as an error.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AnalyzeError;
use crate::trace::{
    DecodeOutcome, IncompleteReason, RawSegment, RawTrace, Segment, TraceDetail, FUNCTION_ORIGIN,
    INITIALIZATION, LAMBDA_ORIGIN, SETUP,
};

#[derive(Debug, Deserialize)]
struct SegmentDocument {
    id: Option<String>,
    name: Option<String>,
    origin: Option<String>,
    start_time: Option<f64>,
    end_time: Option<f64>,
    subsegments: Option<Vec<SegmentDocument>>,
}

impl SegmentDocument {
    fn elapsed_ms(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(round_tenth((end - start) * 1000.0)),
            _ => None,
        }
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.origin.clone())
            .unwrap_or_default()
    }
}

/// Round to one decimal place. Never returns `-0.0`.
pub fn round_tenth(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Convert fractional epoch seconds to a UTC timestamp, rounded to the millisecond.
pub fn epoch_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

/// Decode one raw trace into a [`TraceDetail`].
pub fn decode_trace(raw: &RawTrace) -> Result<TraceDetail, AnalyzeError> {
    let trace_id = raw.id.as_str();
    let documents = raw
        .segments
        .iter()
        .map(|segment| {
            serde_json::from_str::<SegmentDocument>(&segment.document)
                .map(|document| (segment, document))
                .map_err(|e| {
                    AnalyzeError::malformed(trace_id, format!("undecodable segment document: {}", e))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let find_origin = |origin: &str| {
        documents
            .iter()
            .find(|(_, document)| document.origin.as_deref() == Some(origin))
    };

    let (lambda_raw, lambda_doc) = find_origin(LAMBDA_ORIGIN)
        .ok_or_else(|| AnalyzeError::malformed(trace_id, format!("no {} segment", LAMBDA_ORIGIN)))?;
    let function_name = lambda_doc.name.clone().ok_or_else(|| {
        AnalyzeError::malformed(trace_id, format!("{} segment has no name", LAMBDA_ORIGIN))
    })?;
    let timestamp = lambda_doc
        .start_time
        .and_then(epoch_seconds_to_utc)
        .ok_or_else(|| {
            AnalyzeError::malformed(
                trace_id,
                format!("{} segment has no valid start_time", LAMBDA_ORIGIN),
            )
        })?;

    let outcome = match find_origin(FUNCTION_ORIGIN) {
        Some((function_raw, function_doc)) => {
            decompose(lambda_raw, lambda_doc, function_raw, function_doc)
        }
        None => DecodeOutcome::Incomplete(IncompleteReason::MissingFunctionSegment),
    };

    if let DecodeOutcome::Incomplete(reason) = &outcome {
        warn!(trace_id, %reason, "trace has no usable durations");
    }

    Ok(TraceDetail {
        function_name,
        trace_id: trace_id.to_string(),
        timestamp,
        outcome,
    })
}

fn decompose(
    lambda_raw: &RawSegment,
    lambda_doc: &SegmentDocument,
    function_raw: &RawSegment,
    function_doc: &SegmentDocument,
) -> DecodeOutcome {
    let in_progress = |document: &SegmentDocument| {
        DecodeOutcome::Incomplete(IncompleteReason::InProgress {
            segment: document.label(),
        })
    };

    let Some(lambda_ms) = lambda_doc.elapsed_ms() else {
        return in_progress(lambda_doc);
    };
    let Some(function_ms) = function_doc.elapsed_ms() else {
        return in_progress(function_doc);
    };

    let Some(subsegments) = &function_doc.subsegments else {
        return DecodeOutcome::Incomplete(IncompleteReason::MissingSubsegments);
    };

    let mut segments = Vec::with_capacity(subsegments.len() + 3);
    segments.push(Segment::new(
        LAMBDA_ORIGIN,
        lambda_raw.id.clone().or_else(|| lambda_doc.id.clone()),
        lambda_ms,
    ));
    segments.push(Segment::new(
        FUNCTION_ORIGIN,
        function_raw.id.clone().or_else(|| function_doc.id.clone()),
        function_ms,
    ));

    let mut initialization_ms = None;
    for subsegment in subsegments {
        let name = subsegment.name.clone().unwrap_or_default();
        if name == LAMBDA_ORIGIN || name == FUNCTION_ORIGIN || name == SETUP {
            return DecodeOutcome::Incomplete(IncompleteReason::DuplicateLabel { label: name });
        }

        let Some(duration) = subsegment.elapsed_ms() else {
            if name == INITIALIZATION {
                return in_progress(subsegment);
            }
            debug!(subsegment = %name, "skipping unfinished subsegment");
            continue;
        };

        if name == INITIALIZATION {
            if initialization_ms.is_some() {
                return DecodeOutcome::Incomplete(IncompleteReason::DuplicateLabel { label: name });
            }
            initialization_ms = Some(duration);
        }
        segments.push(Segment::new(name, subsegment.id.clone(), duration));
    }

    let Some(initialization_ms) = initialization_ms else {
        return DecodeOutcome::Incomplete(IncompleteReason::MissingInitialization);
    };

    // Signed on purpose: clock skew between segments can make this negative.
    let setup_ms = round_tenth(lambda_ms - function_ms - initialization_ms);
    segments.push(Segment::new(SETUP, None, setup_ms));

    DecodeOutcome::Usable(segments)
}
