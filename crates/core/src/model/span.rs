use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TraceError};
use crate::time::decode_timestamp;

pub type Attributes = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanStatus {
    Ok,
    Error,
    #[default]
    Unset,
}

impl SpanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::Unset => "UNSET",
        }
    }

    /// Lenient decode used for raw records: anything unrecognised is `Unset`.
    pub fn from_raw(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpanStatus {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("STATUS_CODE_").unwrap_or(upper.as_str()) {
            "OK" => Ok(Self::Ok),
            "ERROR" => Ok(Self::Error),
            "UNSET" | "" => Ok(Self::Unset),
            _ => Err(TraceError::Parse(format!("unknown span status: {s}"))),
        }
    }
}

/// A span as handed over by a storage or export layer, before timestamps are
/// decoded. Field names are accepted in both `camelCase` and `snake_case`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpanRecord {
    #[serde(alias = "span_id")]
    pub span_id: String,
    #[serde(default, alias = "trace_id")]
    pub trace_id: String,
    #[serde(default, alias = "parent_span_id")]
    pub parent_span_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "start_time")]
    pub start_time: Value,
    #[serde(default, alias = "end_time")]
    pub end_time: Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub attributes: Option<Attributes>,
}

impl SpanRecord {
    /// Decodes the record into a [`Span`]. The only failure is a timestamp
    /// that cannot be read, reported against this record's span id.
    pub fn decode(self) -> Result<Span> {
        let start_time = decode_timestamp(&self.start_time)
            .map_err(|e| TraceError::malformed(&self.span_id, format!("startTime: {e}")))?;
        let end_time = decode_timestamp(&self.end_time)
            .map_err(|e| TraceError::malformed(&self.span_id, format!("endTime: {e}")))?;

        Ok(Span {
            trace_id: self.trace_id,
            span_id: self.span_id,
            parent_span_id: self.parent_span_id.filter(|p| !p.trim().is_empty()),
            name: self.name,
            start_time,
            end_time,
            status: self
                .status
                .as_deref()
                .map(SpanStatus::from_raw)
                .unwrap_or_default(),
            attributes: self.attributes.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Span {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SpanStatus,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Span {
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds().max(0)
    }

    /// Attribute value, treating an explicit JSON `null` as absent.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    pub fn is_error(&self) -> bool {
        self.status == SpanStatus::Error
    }
}

/// Result of decoding a batch of records: every decodable span, plus one
/// error per record that was rejected.
#[derive(Debug, Default)]
pub struct DecodedSpans {
    pub spans: Vec<Span>,
    pub rejected: Vec<TraceError>,
}

pub fn decode_spans(records: impl IntoIterator<Item = SpanRecord>) -> DecodedSpans {
    let mut out = DecodedSpans::default();
    for record in records {
        match record.decode() {
            Ok(span) => out.spans.push(span),
            Err(err) => {
                tracing::debug!(error = %err, "rejected span record");
                out.rejected.push(err);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> SpanRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decodes_camel_case_record() {
        let span = record(json!({
            "spanId": "s1",
            "traceId": "t1",
            "parentSpanId": null,
            "name": "invoke_agent planner",
            "startTime": "2026-02-01T00:00:00Z",
            "endTime": "2026-02-01T00:00:01.500Z",
            "status": "OK",
            "attributes": {"gen_ai.agent.name": "planner"}
        }))
        .decode()
        .unwrap();

        assert_eq!(span.span_id, "s1");
        assert_eq!(span.parent_span_id, None);
        assert_eq!(span.status, SpanStatus::Ok);
        assert_eq!(span.duration_ms(), 1500);
        assert_eq!(span.attr("gen_ai.agent.name"), Some(&json!("planner")));
    }

    #[test]
    fn decodes_snake_case_and_epoch_millis() {
        let span = record(json!({
            "span_id": "s2",
            "trace_id": "t1",
            "parent_span_id": "",
            "name": "tool",
            "start_time": 1_769_904_000_000_i64,
            "end_time": 1_769_904_000_250_i64,
            "status": "STATUS_CODE_ERROR"
        }))
        .decode()
        .unwrap();

        assert_eq!(span.parent_span_id, None);
        assert_eq!(span.status, SpanStatus::Error);
        assert_eq!(span.duration_ms(), 250);
        assert!(span.attributes.is_empty());
    }

    #[test]
    fn malformed_timestamp_names_the_span() {
        let err = record(json!({
            "spanId": "bad",
            "startTime": "yesterday-ish",
            "endTime": "2026-02-01T00:00:00Z"
        }))
        .decode()
        .unwrap_err();

        assert_eq!(err.span_id(), Some("bad"));
        assert!(err.to_string().contains("startTime"));
    }

    #[test]
    fn missing_end_time_is_malformed() {
        let err = record(json!({"spanId": "open", "startTime": "2026-02-01T00:00:00Z"}))
            .decode()
            .unwrap_err();
        assert!(matches!(err, TraceError::MalformedInput { ref span_id, .. } if span_id == "open"));
    }

    #[test]
    fn batch_decode_keeps_good_spans() {
        let decoded = decode_spans(vec![
            record(json!({"spanId": "a", "startTime": "2026-02-01T00:00:00Z", "endTime": "2026-02-01T00:00:01Z"})),
            record(json!({"spanId": "b", "startTime": "nope", "endTime": "nope"})),
            record(json!({"spanId": "c", "startTime": "2026-02-01T00:00:02Z", "endTime": "2026-02-01T00:00:03Z"})),
        ]);

        let ids: Vec<_> = decoded.spans.iter().map(|s| s.span_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(decoded.rejected.len(), 1);
        assert_eq!(decoded.rejected[0].span_id(), Some("b"));
    }

    #[test]
    fn status_parse() {
        assert_eq!("error".parse::<SpanStatus>().unwrap(), SpanStatus::Error);
        assert_eq!(SpanStatus::from_raw("weird"), SpanStatus::Unset);
        assert!("weird".parse::<SpanStatus>().is_err());
    }

    #[test]
    fn null_attribute_counts_as_absent() {
        let span = record(json!({
            "spanId": "n",
            "startTime": "2026-02-01T00:00:00Z",
            "endTime": "2026-02-01T00:00:00Z",
            "attributes": {"input.value": null}
        }))
        .decode()
        .unwrap();
        assert!(span.attr("input.value").is_none());
    }
}
