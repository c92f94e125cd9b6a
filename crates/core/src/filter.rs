use glob::Pattern;

use crate::classify::Category;
use crate::error::{Result, TraceError};
use crate::extract::{SpanIoResult, value_to_text};
use crate::model::span::{Span, SpanStatus};

/// A `key=glob` condition on one span attribute. The `attrs.` prefix used
/// by the query syntax is dropped at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrFilter {
    pub key: String,
    pattern: Pattern,
}

impl AttrFilter {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || TraceError::InvalidArgument(format!("invalid where filter: {input}"));
        let (key, glob) = input.split_once('=').ok_or_else(invalid)?;
        let key = key.trim();
        let key = key.strip_prefix("attrs.").unwrap_or(key);
        let glob = glob.trim();
        if key.is_empty() || glob.is_empty() {
            return Err(invalid());
        }
        let pattern = Pattern::new(glob).map_err(|e| {
            TraceError::InvalidArgument(format!("invalid glob in where filter {input}: {e}"))
        })?;
        Ok(Self {
            key: key.to_string(),
            pattern,
        })
    }

    pub fn glob(&self) -> &str {
        self.pattern.as_str()
    }

    /// Compares the attribute in its text form. Absent and null attributes
    /// never match.
    pub fn matches_span(&self, span: &Span) -> bool {
        span.attr(&self.key)
            .is_some_and(|v| self.pattern.matches(&value_to_text(v)))
    }
}

/// Selects spans for a detail listing. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanFilter {
    pub category: Option<Category>,
    pub status: Option<SpanStatus>,
    pub name_glob: Option<String>,
    pub attr_filters: Vec<AttrFilter>,
}

impl SpanFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.status.is_none()
            && self.name_glob.is_none()
            && self.attr_filters.is_empty()
    }

    pub fn matches(&self, io: &SpanIoResult) -> bool {
        if let Some(category) = self.category
            && io.category != category
        {
            return false;
        }
        if let Some(status) = self.status
            && io.span.status != status
        {
            return false;
        }
        if let Some(glob) = &self.name_glob
            && !Pattern::new(glob)
                .map(|p| p.matches(&io.span.name))
                .unwrap_or(false)
        {
            return false;
        }
        self.attr_filters.iter().all(|f| f.matches_span(&io.span))
    }

    pub fn apply(&self, items: Vec<SpanIoResult>) -> Vec<SpanIoResult> {
        if self.is_empty() {
            return items;
        }
        items.into_iter().filter(|io| self.matches(io)).collect()
    }
}
