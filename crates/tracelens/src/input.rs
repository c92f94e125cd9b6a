use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracelens_core::model::span::{Span, SpanRecord, decode_spans};

/// A record that could not be turned into a span.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rejected {
    pub span_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadedSpans {
    pub spans: Vec<Span>,
    pub rejected: Vec<Rejected>,
}

/// Reads spans from a file, or stdin when `path` is `-`.
pub fn load_spans(path: &Path) -> anyhow::Result<LoadedSpans> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read spans from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    };
    Ok(parse_spans(&raw))
}

/// Accepts a JSON array of records, an object with a `spans` array, a single
/// record, or JSON Lines.
pub fn parse_spans(raw: &str) -> LoadedSpans {
    let mut rejected = Vec::new();
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut map)) => match map.remove("spans") {
            Some(Value::Array(items)) => items,
            Some(_) | None => vec![Value::Object(map)],
        },
        Ok(other) => {
            rejected.push(Rejected {
                span_id: None,
                reason: format!("expected span records, got {other}"),
            });
            Vec::new()
        }
        Err(_) => parse_lines(raw, &mut rejected),
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let span_id = item
            .get("spanId")
            .or_else(|| item.get("span_id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        match serde_json::from_value::<SpanRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => rejected.push(Rejected {
                span_id,
                reason: format!("record {i}: {e}"),
            }),
        }
    }

    let decoded = decode_spans(records);
    rejected.extend(decoded.rejected.into_iter().map(|err| Rejected {
        span_id: err.span_id().map(str::to_string),
        reason: err.to_string(),
    }));

    for r in &rejected {
        tracing::warn!(span_id = r.span_id.as_deref().unwrap_or("-"), reason = %r.reason, "skipping span");
    }

    LoadedSpans {
        spans: decoded.spans,
        rejected,
    }
}

fn parse_lines(raw: &str, rejected: &mut Vec<Rejected>) -> Vec<Value> {
    let mut items = Vec::new();
    for (n, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(v) => items.push(v),
            Err(e) => rejected.push(Rejected {
                span_id: None,
                reason: format!("line {}: {e}", n + 1),
            }),
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = r#"{"spanId":"a","startTime":"2026-02-01T00:00:00Z","endTime":"2026-02-01T00:00:01Z"}"#;
    const B: &str = r#"{"spanId":"b","parentSpanId":"a","startTime":"2026-02-01T00:00:00Z","endTime":"2026-02-01T00:00:01Z"}"#;

    #[test]
    fn parses_array() {
        let loaded = parse_spans(&format!("[{A},{B}]"));
        assert_eq!(loaded.spans.len(), 2);
        assert!(loaded.rejected.is_empty());
    }

    #[test]
    fn parses_wrapped_object() {
        let loaded = parse_spans(&format!(r#"{{"traceId":"t1","spans":[{A}]}}"#));
        assert_eq!(loaded.spans.len(), 1);
    }

    #[test]
    fn parses_single_record() {
        assert_eq!(parse_spans(A).spans.len(), 1);
    }

    #[test]
    fn parses_json_lines_and_reports_bad_lines() {
        let loaded = parse_spans(&format!("{A}\n\nnot json\n{B}\n"));
        assert_eq!(loaded.spans.len(), 2);
        assert_eq!(loaded.rejected.len(), 1);
        assert!(loaded.rejected[0].reason.starts_with("line 3"));
    }

    #[test]
    fn reports_undecodable_records_by_span_id() {
        let loaded = parse_spans(
            r#"[{"spanId":"x","startTime":"soon","endTime":"later"},{"name":"no id"}]"#,
        );
        assert!(loaded.spans.is_empty());
        assert_eq!(loaded.rejected.len(), 2);
        assert_eq!(loaded.rejected[0].span_id, None);
        assert!(loaded.rejected[0].reason.starts_with("record 1"));
        assert_eq!(loaded.rejected[1].span_id.as_deref(), Some("x"));
    }
}
