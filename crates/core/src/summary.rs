use std::cmp::Reverse;
use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::histogram::{HistogramBucket, LatencyBand, build_histogram};
use crate::model::span::{Span, SpanStatus};
use crate::time::time_range;
use crate::model::tree::flatten;
use crate::tree::{DuplicatePolicy, build_span_tree_with};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceSummary {
    pub trace_id: String,
    pub root_name: String,
    pub start: DateTime<Utc>,
    pub duration_ms: i64,
    pub span_count: usize,
    pub error_count: usize,
    pub status: SpanStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    StartAsc,
    StartDesc,
    DurationDesc,
}

impl FromStr for SortOrder {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start_asc" | "ts_asc" => Ok(Self::StartAsc),
            "start_desc" | "ts_desc" => Ok(Self::StartDesc),
            "duration_desc" => Ok(Self::DurationDesc),
            _ => Err(TraceError::Parse(format!("unknown sort order: {s}"))),
        }
    }
}

/// One summary per trace id, in first-seen order. Duplicate span ids are
/// resolved with `policy` before counting, as the span tree does.
pub fn summarize_traces(spans: &[Span], policy: DuplicatePolicy) -> Vec<TraceSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<Span>> = HashMap::new();
    for span in spans {
        let group = groups.entry(span.trace_id.as_str()).or_insert_with(|| {
            order.push(span.trace_id.as_str());
            Vec::new()
        });
        group.push(span.clone());
    }

    order
        .into_iter()
        .filter_map(|trace_id| groups.remove(trace_id).map(|g| summarize(trace_id, &g, policy)))
        .collect()
}

fn summarize(trace_id: &str, spans: &[Span], policy: DuplicatePolicy) -> TraceSummary {
    let roots = build_span_tree_with(spans, policy);
    let root_name = roots
        .first()
        .map(|r| r.span.name.clone())
        .unwrap_or_default();
    let kept: Vec<Span> = flatten(&roots).into_iter().map(|n| n.span.clone()).collect();
    let spans = kept.as_slice();
    let range = time_range(spans);
    let error_count = spans.iter().filter(|s| s.is_error()).count();
    let status = if error_count > 0 {
        SpanStatus::Error
    } else if spans.iter().any(|s| s.status == SpanStatus::Ok) {
        SpanStatus::Ok
    } else {
        SpanStatus::Unset
    };

    TraceSummary {
        trace_id: trace_id.to_string(),
        root_name,
        start: range.start,
        duration_ms: range.width_ms().max(0),
        span_count: spans.len(),
        error_count,
        status,
    }
}

pub fn sort_summaries(items: &mut [TraceSummary], order: SortOrder) {
    match order {
        SortOrder::StartAsc => items.sort_by_key(|i| i.start),
        SortOrder::StartDesc => items.sort_by_key(|i| Reverse(i.start)),
        SortOrder::DurationDesc => items.sort_by_key(|i| Reverse(i.duration_ms)),
    }
}

/// Histogram over trace-level durations.
pub fn latency_histogram(summaries: &[TraceSummary], bands: &[LatencyBand]) -> Vec<HistogramBucket> {
    let durations: Vec<f64> = summaries.iter().map(|s| s.duration_ms as f64).collect();
    build_histogram(&durations, bands)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::histogram::default_bands;

    fn span(trace: &str, id: &str, parent: Option<&str>, start_ms: i64, end_ms: i64) -> Span {
        let base = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        Span {
            trace_id: trace.into(),
            span_id: id.into(),
            parent_span_id: parent.map(str::to_string),
            name: format!("{id}-op"),
            start_time: base + Duration::milliseconds(start_ms),
            end_time: base + Duration::milliseconds(end_ms),
            status: SpanStatus::Ok,
            attributes: Default::default(),
        }
    }

    #[test]
    fn groups_by_trace_in_first_seen_order() {
        let mut failing = span("t2", "c", Some("b"), 60, 80);
        failing.status = SpanStatus::Error;
        let spans = vec![
            span("t2", "b", None, 50, 250),
            span("t1", "a", None, 0, 40),
            failing,
            span("t1", "a2", Some("a"), 10, 90),
        ];

        let summaries = summarize_traces(&spans, DuplicatePolicy::LastWins);
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].trace_id, "t2");
        assert_eq!(summaries[0].root_name, "b-op");
        assert_eq!(summaries[0].duration_ms, 200);
        assert_eq!(summaries[0].span_count, 2);
        assert_eq!(summaries[0].error_count, 1);
        assert_eq!(summaries[0].status, SpanStatus::Error);

        assert_eq!(summaries[1].trace_id, "t1");
        assert_eq!(summaries[1].duration_ms, 90);
        assert_eq!(summaries[1].status, SpanStatus::Ok);
    }

    #[test]
    fn sorts_by_duration_and_start() {
        let spans = vec![
            span("short", "a", None, 0, 50),
            span("long", "b", None, 10, 5_000),
        ];
        let mut summaries = summarize_traces(&spans, DuplicatePolicy::LastWins);

        sort_summaries(&mut summaries, SortOrder::DurationDesc);
        assert_eq!(summaries[0].trace_id, "long");

        sort_summaries(&mut summaries, SortOrder::StartAsc);
        assert_eq!(summaries[0].trace_id, "short");

        sort_summaries(&mut summaries, SortOrder::StartDesc);
        assert_eq!(summaries[0].trace_id, "long");
    }

    #[test]
    fn histogram_over_trace_durations() {
        let spans = vec![
            span("t1", "a", None, 0, 50),
            span("t2", "b", None, 0, 700),
            span("t3", "c", None, 0, 20_000),
        ];
        let summaries = summarize_traces(&spans, DuplicatePolicy::LastWins);
        let buckets = latency_histogram(&summaries, &default_bands());
        let counts: Vec<_> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn duplicate_ids_follow_the_policy() {
        let mut retried = span("t1", "root", None, 0, 900);
        retried.name = "retry".into();
        retried.status = SpanStatus::Error;
        let spans = vec![
            span("t1", "root", None, 0, 100),
            span("t1", "child", Some("root"), 10, 50),
            retried,
        ];

        let last = &summarize_traces(&spans, DuplicatePolicy::LastWins)[0];
        assert_eq!(last.root_name, "retry");
        assert_eq!(last.span_count, 2);
        assert_eq!(last.error_count, 1);
        assert_eq!(last.duration_ms, 900);

        let first = &summarize_traces(&spans, DuplicatePolicy::FirstWins)[0];
        assert_eq!(first.root_name, "root-op");
        assert_eq!(first.span_count, 2);
        assert_eq!(first.error_count, 0);
        assert_eq!(first.status, SpanStatus::Ok);
        assert_eq!(first.duration_ms, 100);
    }

    #[test]
    fn sort_order_parse() {
        assert_eq!("duration_desc".parse::<SortOrder>().unwrap(), SortOrder::DurationDesc);
        assert_eq!("ts_asc".parse::<SortOrder>().unwrap(), SortOrder::StartAsc);
        assert!("random".parse::<SortOrder>().is_err());
    }
}
