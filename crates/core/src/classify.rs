use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::model::span::Span;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Agent,
    Llm,
    Tool,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Agent, Self::Llm, Self::Tool, Self::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Llm => "llm",
            Self::Tool => "tool",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Self::Agent),
            "llm" => Ok(Self::Llm),
            "tool" => Ok(Self::Tool),
            "other" => Ok(Self::Other),
            _ => Err(TraceError::Parse(format!("unknown category: {s}"))),
        }
    }
}

/// One classification rule: a span matches when its lower-cased name
/// contains any marker, or when any of the attribute keys is present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: Category,
    pub name_markers: Vec<String>,
    pub attribute_keys: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: Category, name_markers: &[&str], attribute_keys: &[&str]) -> Self {
        Self {
            category,
            name_markers: name_markers.iter().map(|m| m.to_lowercase()).collect(),
            attribute_keys: attribute_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, lowered_name: &str, span: &Span) -> bool {
        self.name_markers.iter().any(|m| lowered_name.contains(m.as_str()))
            || self.attribute_keys.iter().any(|k| span.attr(k).is_some())
    }
}

/// Ordered rule table. The first matching rule decides, so a span named
/// `agent-tool` is an agent span even though it also names a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::new(Category::Agent, &["agent"], &["gen_ai.agent.name"]),
            CategoryRule::new(
                Category::Llm,
                &["llm", "bedrock", "converse"],
                &["gen_ai.system"],
            ),
            CategoryRule::new(Category::Tool, &["tool"], &["gen_ai.tool.name"]),
        ])
    }
}

impl Classifier {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                for marker in &mut rule.name_markers {
                    *marker = marker.to_lowercase();
                }
                rule
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn classify(&self, span: &Span) -> Category {
        let name = span.name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&name, span))
            .map(|rule| rule.category)
            .unwrap_or(Category::Other)
    }
}

fn default_classifier() -> &'static Classifier {
    static DEFAULT: OnceLock<Classifier> = OnceLock::new();
    DEFAULT.get_or_init(Classifier::default)
}

/// Classifies a span with the default rule table.
pub fn classify(span: &Span) -> Category {
    default_classifier().classify(span)
}
