//! Descriptive statistics over decoded cold-start traces.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::trace::{TraceDetail, FUNCTION_ORIGIN, INITIALIZATION, LAMBDA_ORIGIN, SETUP};

/// Which phase of a cold start the report summarises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Lambda,
    Function,
    Setup,
    #[default]
    Initialization,
}

impl Metric {
    /// Segment name the metric is read from.
    pub fn segment_name(&self) -> &'static str {
        match self {
            Metric::Lambda => LAMBDA_ORIGIN,
            Metric::Function => FUNCTION_ORIGIN,
            Metric::Setup => SETUP,
            Metric::Initialization => INITIALIZATION,
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lambda" => Ok(Metric::Lambda),
            "function" => Ok(Metric::Function),
            "setup" => Ok(Metric::Setup),
            "initialization" | "init" => Ok(Metric::Initialization),
            other => Err(format!(
                "unknown metric '{}' (expected lambda, function, setup or initialization)",
                other
            )),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Lambda => "lambda",
            Metric::Function => "function",
            Metric::Setup => "setup",
            Metric::Initialization => "initialization",
        };
        f.write_str(name)
    }
}

/// How the median and 90th percentile are picked from the sorted values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMethod {
    /// 1-based rank ⌈n·p⌉, always inside the data for n > 0.
    #[default]
    Nearest,
    /// 0-based index ⌈n·p⌉, as historical reports computed it. Out of range yields `None`.
    Legacy,
}

impl RankMethod {
    /// Pick the value at fraction `numerator / denominator` of an ascending slice.
    pub fn pick(&self, sorted: &[f64], numerator: usize, denominator: usize) -> Option<f64> {
        let rank = (sorted.len() * numerator).div_ceil(denominator);
        let index = match self {
            RankMethod::Nearest => rank.max(1) - 1,
            RankMethod::Legacy => rank,
        };
        sorted.get(index).copied()
    }
}

impl FromStr for RankMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "nearest-rank" => Ok(RankMethod::Nearest),
            "legacy" => Ok(RankMethod::Legacy),
            other => Err(format!(
                "unknown rank method '{}' (expected nearest or legacy)",
                other
            )),
        }
    }
}

impl fmt::Display for RankMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankMethod::Nearest => f.write_str("nearest"),
            RankMethod::Legacy => f.write_str("legacy"),
        }
    }
}

/// The four cold-start phases of one usable trace, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Datapoint {
    pub lambda: f64,
    pub function: f64,
    pub setup: f64,
    pub initialization: f64,
}

impl Datapoint {
    /// `None` unless the trace carries all four phases.
    pub fn from_detail(detail: &TraceDetail) -> Option<Self> {
        Some(Self {
            lambda: detail.duration_of(LAMBDA_ORIGIN)?,
            function: detail.duration_of(FUNCTION_ORIGIN)?,
            setup: detail.duration_of(SETUP)?,
            initialization: detail.duration_of(INITIALIZATION)?,
        })
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Lambda => self.lambda,
            Metric::Function => self.function,
            Metric::Setup => self.setup,
            Metric::Initialization => self.initialization,
        }
    }
}

/// Summary statistics for one function. Every statistic is `None` when
/// there are no datapoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub function_name: String,
    pub datapoints: usize,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
    pub ninetieth: Option<f64>,
    /// Ascending values; serialised as a comma-joined string.
    #[serde(serialize_with = "serialize_joined")]
    pub raw_data: Vec<f64>,
}

impl StatisticsReport {
    /// `raw_data` as transported: values joined with commas.
    pub fn raw_data_joined(&self) -> String {
        join_values(&self.raw_data)
    }
}

fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|&value| if value == 0.0 { 0.0 } else { value })
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn serialize_joined<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&join_values(values))
}

/// Extract one [`Datapoint`] per usable trace, in input order.
pub fn datapoints(details: &[TraceDetail]) -> Vec<Datapoint> {
    details
        .iter()
        .filter(|detail| detail.is_usable())
        .filter_map(Datapoint::from_detail)
        .collect()
}

/// Summarise `metric` over the usable traces in `details`.
pub fn aggregate(
    function_name: &str,
    details: &[TraceDetail],
    metric: Metric,
    rank: RankMethod,
) -> StatisticsReport {
    let mut values: Vec<f64> = datapoints(details)
        .iter()
        .map(|point| point.value(metric))
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let count = values.len();
    let (average, min, max) = if values.is_empty() {
        (None, None, None)
    } else {
        let sum: f64 = values.iter().sum();
        (
            Some(sum / count as f64),
            values.first().copied(),
            values.last().copied(),
        )
    };

    StatisticsReport {
        function_name: function_name.to_string(),
        datapoints: count,
        average,
        min,
        max,
        median: rank.pick(&values, 1, 2),
        ninetieth: rank.pick(&values, 9, 10),
        raw_data: values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{DecodeOutcome, IncompleteReason, Segment};
    use chrono::Utc;
    use serde_json::json;

    fn usable(initialization: f64) -> TraceDetail {
        TraceDetail {
            function_name: "hello-dev".to_string(),
            trace_id: format!("1-{}", initialization),
            timestamp: Utc::now(),
            outcome: DecodeOutcome::Usable(vec![
                Segment::new(LAMBDA_ORIGIN, Some("a".to_string()), initialization + 60.0),
                Segment::new(FUNCTION_ORIGIN, Some("b".to_string()), 10.0),
                Segment::new(INITIALIZATION, Some("c".to_string()), initialization),
                Segment::new(SETUP, None, 50.0),
            ]),
        }
    }

    fn incomplete() -> TraceDetail {
        TraceDetail {
            function_name: "hello-dev".to_string(),
            trace_id: "1-warm".to_string(),
            timestamp: Utc::now(),
            outcome: DecodeOutcome::Incomplete(IncompleteReason::MissingInitialization),
        }
    }

    #[test]
    fn worked_example_with_nearest_rank() {
        let details: Vec<_> = [100.0, 150.0, 120.0, 300.0, 110.0, 130.0]
            .into_iter()
            .map(usable)
            .collect();

        let report = aggregate("hello-dev", &details, Metric::Initialization, RankMethod::Nearest);
        assert_eq!(report.datapoints, 6);
        assert!((report.average.unwrap() - 151.666_666).abs() < 1e-3);
        assert_eq!(report.min, Some(100.0));
        assert_eq!(report.max, Some(300.0));
        assert_eq!(report.median, Some(120.0));
        assert_eq!(report.ninetieth, Some(300.0));
        assert_eq!(report.raw_data, vec![100.0, 110.0, 120.0, 130.0, 150.0, 300.0]);
        assert_eq!(report.raw_data_joined(), "100,110,120,130,150,300");
    }

    #[test]
    fn negative_zero_is_joined_as_zero() {
        let report = StatisticsReport {
            function_name: "hello-dev".to_string(),
            datapoints: 2,
            average: Some(5.0),
            min: Some(-0.0),
            max: Some(10.0),
            median: Some(-0.0),
            ninetieth: Some(10.0),
            raw_data: vec![-0.0, 10.0],
        };
        assert_eq!(report.raw_data_joined(), "0,10");
        assert_eq!(serde_json::to_value(&report).unwrap()["rawData"], "0,10");
    }

    #[test]
    fn legacy_rank_reads_one_past_and_runs_off_the_end() {
        let details: Vec<_> = [100.0, 150.0, 120.0, 300.0, 110.0, 130.0]
            .into_iter()
            .map(usable)
            .collect();

        let report = aggregate("hello-dev", &details, Metric::Initialization, RankMethod::Legacy);
        assert_eq!(report.median, Some(130.0));
        assert_eq!(report.ninetieth, None);
    }

    #[test]
    fn incomplete_traces_are_excluded() {
        let details = vec![incomplete(), usable(200.0), incomplete()];
        let report = aggregate("hello-dev", &details, Metric::Initialization, RankMethod::Nearest);
        assert_eq!(report.datapoints, 1);
        assert_eq!(report.median, Some(200.0));
        assert_eq!(report.ninetieth, Some(200.0));
    }

    #[test]
    fn empty_input_yields_absent_statistics() {
        let report = aggregate("hello-dev", &[], Metric::Initialization, RankMethod::Nearest);
        assert_eq!(report.datapoints, 0);
        assert_eq!(report.average, None);
        assert_eq!(report.min, None);
        assert_eq!(report.max, None);
        assert_eq!(report.median, None);
        assert_eq!(report.ninetieth, None);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["average"], json!(null));
        assert_eq!(value["rawData"], json!(""));
    }

    #[test]
    fn negative_values_are_kept() {
        let mut detail = usable(100.0);
        if let DecodeOutcome::Usable(segments) = &mut detail.outcome {
            segments[3].duration = -4.2;
        }
        let report = aggregate("hello-dev", &[detail], Metric::Setup, RankMethod::Nearest);
        assert_eq!(report.min, Some(-4.2));
        assert_eq!(report.raw_data, vec![-4.2]);
    }

    #[test]
    fn metric_selects_column() {
        let details = vec![usable(100.0), usable(200.0)];
        let report = aggregate("hello-dev", &details, Metric::Lambda, RankMethod::Nearest);
        assert_eq!(report.raw_data, vec![160.0, 260.0]);
    }

    #[test]
    fn report_serializes_in_transport_shape() {
        let report = aggregate(
            "hello-dev",
            &[usable(173.4), usable(100.0)],
            Metric::Initialization,
            RankMethod::Nearest,
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["functionName"], "hello-dev");
        assert_eq!(value["datapoints"], 2);
        assert_eq!(value["rawData"], "100,173.4");
        assert!(value.get("raw_data").is_none());
    }

    #[test]
    fn rank_picks_on_tiny_inputs() {
        assert_eq!(RankMethod::Nearest.pick(&[], 1, 2), None);
        assert_eq!(RankMethod::Nearest.pick(&[7.0], 1, 2), Some(7.0));
        assert_eq!(RankMethod::Nearest.pick(&[7.0], 9, 10), Some(7.0));
        assert_eq!(RankMethod::Legacy.pick(&[7.0], 1, 2), None);
        assert_eq!(RankMethod::Legacy.pick(&[1.0, 2.0, 3.0], 1, 2), Some(3.0));
    }

    #[test]
    fn parses_metric_and_rank_names() {
        assert_eq!("init".parse::<Metric>(), Ok(Metric::Initialization));
        assert_eq!("Setup".parse::<Metric>(), Ok(Metric::Setup));
        assert!("latency".parse::<Metric>().is_err());
        assert_eq!("legacy".parse::<RankMethod>(), Ok(RankMethod::Legacy));
        assert_eq!(RankMethod::default().to_string(), "nearest");
    }
}
