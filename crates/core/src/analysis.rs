use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::{Category, Classifier};
use crate::extract::{Extractor, SpanIoResult};
use crate::model::span::Span;
use crate::model::tree::{SpanNode, flatten};
use crate::time::{TimeRange, time_range};
use crate::tree::{DuplicatePolicy, build_span_tree_with};

/// Everything a trace view needs, derived from one flat span list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceAnalysis {
    pub range: TimeRange,
    pub roots: Vec<SpanNode>,
    /// Per-span payloads in tree pre-order.
    pub spans: Vec<SpanIoResult>,
    pub category_counts: BTreeMap<Category, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    pub duplicates: DuplicatePolicy,
    pub classifier: Classifier,
    pub extractor: Extractor,
}

impl Analyzer {
    pub fn new(duplicates: DuplicatePolicy, classifier: Classifier, extractor: Extractor) -> Self {
        Self {
            duplicates,
            classifier,
            extractor,
        }
    }

    pub fn inspect(&self, span: &Span) -> SpanIoResult {
        let category = self.classifier.classify(span);
        self.extractor.extract(span, category)
    }

    pub fn analyze(&self, spans: &[Span]) -> TraceAnalysis {
        let roots = build_span_tree_with(spans, self.duplicates);
        let nodes = flatten(&roots);
        let kept: Vec<Span> = nodes.iter().map(|node| node.span.clone()).collect();
        let range = time_range(&kept);

        let io: Vec<SpanIoResult> = nodes.iter().map(|node| self.inspect(&node.span)).collect();

        let mut category_counts: BTreeMap<Category, usize> =
            Category::ALL.iter().map(|c| (*c, 0)).collect();
        for item in &io {
            *category_counts.entry(item.category).or_default() += 1;
        }

        tracing::debug!(
            spans = spans.len(),
            roots = roots.len(),
            width_ms = range.width_ms(),
            "analyzed trace"
        );

        TraceAnalysis {
            range,
            roots,
            spans: io,
            category_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::model::span::SpanStatus;

    fn span(id: &str, parent: Option<&str>, name: &str, start_ms: i64, attrs: serde_json::Value) -> Span {
        let base = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        Span {
            trace_id: "t1".into(),
            span_id: id.into(),
            parent_span_id: parent.map(str::to_string),
            name: name.into(),
            start_time: base + Duration::milliseconds(start_ms),
            end_time: base + Duration::milliseconds(start_ms + 100),
            status: SpanStatus::Ok,
            attributes: attrs.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn analysis_lists_spans_in_tree_order() {
        let spans = vec![
            span("tool", Some("agent"), "execute_tool search", 30, json!({"tool.input": "q"})),
            span("llm", Some("agent"), "chat", 10, json!({"gen_ai.system": "openai", "gen_ai.prompt": "hi"})),
            span("agent", None, "invoke_agent", 0, json!({"gen_ai.agent.name": "planner"})),
        ];

        let analysis = Analyzer::default().analyze(&spans);

        let order: Vec<_> = analysis.spans.iter().map(|s| s.span.span_id.as_str()).collect();
        assert_eq!(order, vec!["agent", "llm", "tool"]);
        assert_eq!(analysis.spans[1].input.as_deref(), Some("hi"));
        assert_eq!(analysis.spans[1].model_id.as_deref(), Some("openai"));
        assert_eq!(analysis.spans[2].input.as_deref(), Some("q"));
        assert_eq!(analysis.category_counts[&Category::Agent], 1);
        assert_eq!(analysis.category_counts[&Category::Llm], 1);
        assert_eq!(analysis.category_counts[&Category::Tool], 1);
        assert_eq!(analysis.category_counts[&Category::Other], 0);
        assert_eq!(analysis.range.width_ms(), 130);
    }

    #[test]
    fn empty_input_is_a_valid_analysis() {
        let analysis = Analyzer::default().analyze(&[]);
        assert!(analysis.roots.is_empty());
        assert!(analysis.spans.is_empty());
        assert_eq!(analysis.range.width_ms(), 0);
    }
}
