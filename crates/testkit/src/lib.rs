use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tracelens_core::model::span::{Span, SpanStatus};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
}

pub fn span(
    trace_id: &str,
    span_id: &str,
    parent: Option<&str>,
    name: &str,
    start_ms: i64,
    end_ms: i64,
    attrs: Value,
) -> Span {
    let base = base_time();
    Span {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: parent.map(str::to_string),
        name: name.to_string(),
        start_time: base + Duration::milliseconds(start_ms),
        end_time: base + Duration::milliseconds(end_ms),
        status: SpanStatus::Ok,
        attributes: attrs.as_object().cloned().unwrap_or_default(),
    }
}

/// A planner agent that calls a model, runs a search tool and delegates to a
/// sub-agent. Spans are deliberately out of order.
pub fn sample_agent_trace(trace_id: &str) -> Vec<Span> {
    let mut tool = span(
        trace_id,
        "tool",
        Some("agent"),
        "execute_tool web_search",
        900,
        1_600,
        json!({
            "gen_ai.tool.name": "web_search",
            "gen_ai.tool.input": {"query": "rust span trees"},
            "tool.output": "3 results"
        }),
    );
    tool.status = SpanStatus::Error;

    vec![
        tool,
        span(
            trace_id,
            "llm",
            Some("agent"),
            "chat gpt-4o",
            100,
            800,
            json!({
                "gen_ai.system": "openai",
                "gen_ai.request.model": "gpt-4o",
                "gen_ai.prompt": "Find docs on span trees",
                "gen_ai.completion": "Calling web_search"
            }),
        ),
        span(
            trace_id,
            "root",
            None,
            "POST /v1/run",
            0,
            2_400,
            json!({"input": "Find docs on span trees", "output": "done"}),
        ),
        span(
            trace_id,
            "agent",
            Some("root"),
            "invoke_agent planner",
            50,
            2_300,
            json!({
                "gen_ai.agent.name": "planner",
                "gen_ai.agent.input": "Find docs on span trees",
                "gen_ai.agent.output": "Here are three links"
            }),
        ),
        span(
            trace_id,
            "sub",
            Some("agent"),
            "delegate researcher",
            1_700,
            2_200,
            json!({"gen_ai.agent.name": "researcher", "user.message": "summarize results"}),
        ),
    ]
}

/// Raw JSON records in the camelCase shape exported by trace stores.
pub fn sample_records_json(trace_id: &str) -> Value {
    let spans: Vec<Value> = sample_agent_trace(trace_id)
        .into_iter()
        .map(|s| {
            json!({
                "spanId": s.span_id,
                "traceId": s.trace_id,
                "parentSpanId": s.parent_span_id,
                "name": s.name,
                "startTime": s.start_time.to_rfc3339(),
                "endTime": s.end_time.to_rfc3339(),
                "status": s.status.as_str(),
                "attributes": s.attributes,
            })
        })
        .collect();
    Value::Array(spans)
}
