use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("malformed span {span_id}: {reason}")]
    MalformedInput { span_id: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(String),
}

impl TraceError {
    pub fn malformed(span_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            span_id: span_id.into(),
            reason: reason.into(),
        }
    }

    /// Span id carried by a per-span failure, if any.
    pub fn span_id(&self) -> Option<&str> {
        match self {
            Self::MalformedInput { span_id, .. } => Some(span_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;
