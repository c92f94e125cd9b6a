pub mod analysis;
pub mod classify;
pub mod error;
pub mod extract;
pub mod filter;
pub mod histogram;
pub mod model;
pub mod summary;
pub mod time;
pub mod tree;

pub use analysis::{Analyzer, TraceAnalysis};
pub use classify::{Category, Classifier, classify};
pub use error::{Result, TraceError};
pub use extract::{Extractor, KeyTable, SpanIoResult, extract_io};
pub use histogram::{HistogramBucket, LatencyBand, build_histogram, default_bands};
pub use model::span::{Span, SpanRecord, SpanStatus};
pub use model::tree::SpanNode;
pub use time::{TimeRange, time_range};
pub use tree::{DuplicatePolicy, build_span_tree};
