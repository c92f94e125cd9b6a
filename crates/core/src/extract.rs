use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::Category;
use crate::model::span::Span;

/// Read-only view of a span with its resolved payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanIoResult {
    pub span: Span,
    pub category: Category,
    pub input: Option<String>,
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// Ordered attribute keys tried for a span's input and output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyChain {
    pub input: Vec<String>,
    pub output: Vec<String>,
}

impl KeyChain {
    fn of(input: &[&str], output: &[&str]) -> Self {
        Self {
            input: input.iter().map(|k| k.to_string()).collect(),
            output: output.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Per-category fallback tables. Earlier keys win.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyTable {
    pub llm: KeyChain,
    pub tool: KeyChain,
    pub agent: KeyChain,
    /// Tried after the category chain comes up empty, and for `other`.
    pub generic: KeyChain,
    pub tool_name: Vec<String>,
    pub model_id: Vec<String>,
}

impl Default for KeyTable {
    fn default() -> Self {
        Self {
            llm: KeyChain::of(
                &[
                    "gen_ai.prompt",
                    "gen_ai.prompt.0.content",
                    "llm.prompts",
                    "llm.input_messages",
                    "input.value",
                ],
                &[
                    "gen_ai.completion",
                    "gen_ai.completion.0.content",
                    "llm.completions",
                    "llm.output_messages",
                    "output.value",
                ],
            ),
            tool: KeyChain::of(
                &["gen_ai.tool.input", "tool.input", "input.value", "tool.parameters"],
                &["gen_ai.tool.output", "tool.output", "output.value", "tool.result"],
            ),
            agent: KeyChain::of(
                &["gen_ai.agent.input", "agent.input", "input.value", "user.message"],
                &["gen_ai.agent.output", "agent.output", "output.value", "assistant.message"],
            ),
            generic: KeyChain::of(&["input", "request", "message"], &["output", "response", "result"]),
            tool_name: vec!["gen_ai.tool.name".to_string(), "tool.name".to_string()],
            model_id: vec![
                "gen_ai.request.model".to_string(),
                "llm.model_name".to_string(),
                "gen_ai.system".to_string(),
            ],
        }
    }
}

impl KeyTable {
    pub fn chain(&self, category: Category) -> Option<&KeyChain> {
        match category {
            Category::Llm => Some(&self.llm),
            Category::Tool => Some(&self.tool),
            Category::Agent => Some(&self.agent),
            Category::Other => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Extractor {
    table: KeyTable,
}

impl Extractor {
    pub fn new(table: KeyTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &KeyTable {
        &self.table
    }

    pub fn input(&self, span: &Span, category: Category) -> Option<String> {
        self.table
            .chain(category)
            .and_then(|chain| first_text(span, &chain.input))
            .or_else(|| first_text(span, &self.table.generic.input))
    }

    pub fn output(&self, span: &Span, category: Category) -> Option<String> {
        self.table
            .chain(category)
            .and_then(|chain| first_text(span, &chain.output))
            .or_else(|| first_text(span, &self.table.generic.output))
    }

    pub fn tool_name(&self, span: &Span) -> Option<String> {
        first_text(span, &self.table.tool_name)
    }

    pub fn model_id(&self, span: &Span) -> Option<String> {
        first_text(span, &self.table.model_id)
    }

    pub fn extract(&self, span: &Span, category: Category) -> SpanIoResult {
        SpanIoResult {
            input: self.input(span, category),
            output: self.output(span, category),
            tool_name: self.tool_name(span),
            model_id: self.model_id(span),
            category,
            span: span.clone(),
        }
    }
}

fn default_extractor() -> &'static Extractor {
    static DEFAULT: OnceLock<Extractor> = OnceLock::new();
    DEFAULT.get_or_init(Extractor::default)
}

/// Resolves a span's payloads with the default key table.
pub fn extract_io(span: &Span, category: Category) -> SpanIoResult {
    default_extractor().extract(span, category)
}

fn first_text(span: &Span, keys: &[String]) -> Option<String> {
    keys.iter()
        .find_map(|k| span.attr(k))
        .map(value_to_text)
}

/// Text form of an attribute value: strings as-is, objects and arrays as
/// pretty JSON with two-space indentation, other scalars as JSON text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}
