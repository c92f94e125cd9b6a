use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TraceError};
use crate::model::span::Span;

/// Parses an RFC 3339 timestamp, a zone-less ISO-8601 timestamp (read as
/// UTC), or a string of Unix epoch milliseconds.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(ts.and_utc());
        }
    }

    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        let millis = input
            .parse::<i64>()
            .map_err(|e| TraceError::Parse(format!("epoch millis out of range: {e}")))?;
        return from_millis(millis);
    }

    Err(TraceError::Parse(format!(
        "expected ISO-8601 time or epoch millis, got {input}"
    )))
}

/// Decodes a timestamp as it appears in a raw JSON span record.
pub fn decode_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => match n.as_i64() {
            Some(millis) => from_millis(millis),
            None => Err(TraceError::Parse(format!(
                "expected integer epoch millis, got {n}"
            ))),
        },
        Value::Null => Err(TraceError::Parse("timestamp is missing".to_string())),
        other => Err(TraceError::Parse(format!(
            "expected timestamp string or number, got {other}"
        ))),
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| TraceError::Parse(format!("epoch millis out of range: {millis}")))
}

/// The window spanned by a set of spans.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn empty_at(anchor: DateTime<Utc>) -> Self {
        Self {
            start: anchor,
            end: anchor,
        }
    }

    pub fn width_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    /// Width to divide by when laying spans out on a timeline; never zero.
    pub fn render_width_ms(&self) -> i64 {
        self.width_ms().max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Offset of `ts` from the start of the range.
    pub fn offset_ms(&self, ts: DateTime<Utc>) -> i64 {
        (ts - self.start).num_milliseconds()
    }
}

/// Minimal window containing every span. An empty input yields a zero-width
/// range at the Unix epoch; the result is never clamped.
pub fn time_range(spans: &[Span]) -> TimeRange {
    time_range_anchored(spans, DateTime::<Utc>::UNIX_EPOCH)
}

/// Like [`time_range`], but an empty input yields a zero-width range at `anchor`.
pub fn time_range_anchored(spans: &[Span], anchor: DateTime<Utc>) -> TimeRange {
    let mut iter = spans.iter();
    let Some(first) = iter.next() else {
        return TimeRange::empty_at(anchor);
    };

    iter.fold(
        TimeRange {
            start: first.start_time,
            end: first.end_time,
        },
        |acc, span| TimeRange {
            start: acc.start.min(span.start_time),
            end: acc.end.max(span.end_time),
        },
    )
}
