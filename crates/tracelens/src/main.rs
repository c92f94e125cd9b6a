mod config;
mod input;
mod output;
mod telemetry;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracelens_core::filter::{AttrFilter, SpanFilter};
use tracelens_core::histogram::bands_from_edges;
use tracelens_core::model::tree::find_subtree;
use tracelens_core::summary::{SortOrder, latency_histogram, sort_summaries, summarize_traces};
use tracelens_core::time::time_range;
use tracelens_core::tree::build_span_tree_with;
use tracelens_core::{Category, SpanNode, SpanStatus, TimeRange, TraceAnalysis, build_histogram};

use crate::config::{Config, parse_band_edges};
use crate::input::{Rejected, load_spans};
use crate::output::{
    print_histogram_human, print_range_human, print_spans_human, print_traces_human,
    print_tree_human,
};
use crate::telemetry::init_cli_tracing;

#[derive(Parser, Debug)]
#[command(name = "tracelens")]
#[command(about = "Inspect exported agent traces: span trees, payloads and latency")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true, help = "Log at debug level unless RUST_LOG is set")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Print the span forest with categories")]
    Tree {
        input: PathBuf,
        #[arg(long, help = "Only print the subtree under this span id")]
        root: Option<String>,
    },
    #[command(about = "List spans with their extracted input and output")]
    Spans {
        input: PathBuf,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, help = "Glob matched against the span name")]
        name: Option<String>,
        #[arg(long = "where", help = "Attribute filter, key=glob")]
        where_filters: Vec<String>,
    },
    #[command(about = "Show the time window covered by the spans")]
    Range { input: PathBuf },
    #[command(about = "Summarize each trace")]
    Traces {
        input: PathBuf,
        #[arg(long, default_value = "start_asc")]
        sort: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Bucket trace durations into latency bands")]
    Histogram {
        input: PathBuf,
        #[arg(long, help = "Comma-separated band edges, e.g. 100ms,500ms,1s")]
        bands: Option<String>,
        #[arg(long, help = "Bucket individual span durations instead of traces")]
        per_span: bool,
    },
    #[command(about = "Emit the full trace analysis as JSON")]
    Analyze { input: PathBuf },
}

#[derive(Serialize)]
struct RangeOutput {
    #[serde(flatten)]
    range: TimeRange,
    width_ms: i64,
    render_width_ms: i64,
    span_count: usize,
}

#[derive(Serialize)]
struct AnalyzeOutput {
    #[serde(flatten)]
    analysis: TraceAnalysis,
    rejected: Vec<Rejected>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing(cli.verbose);
    let cfg = Config::load().context("load configuration")?;
    let analyzer = cfg.analyzer();
    let color = !cli.json && std::io::stdout().is_terminal();

    match cli.command {
        Commands::Tree { input, root } => {
            let loaded = load_spans(&input)?;
            let roots = build_span_tree_with(&loaded.spans, cfg.duplicate_spans);
            let roots: Vec<SpanNode> = match root {
                Some(id) => {
                    let node = find_subtree(&roots, &id)
                        .with_context(|| format!("span {id} not found"))?;
                    vec![node.clone()]
                }
                None => roots,
            };
            if cli.json {
                print_json(&roots)?;
            } else {
                print_tree_human(&roots, &analyzer, color);
            }
        }
        Commands::Spans {
            input,
            category,
            status,
            name,
            where_filters,
        } => {
            let filter = SpanFilter {
                category: category.map(|c| c.parse::<Category>()).transpose()?,
                status: status.map(|s| s.parse::<SpanStatus>()).transpose()?,
                name_glob: name,
                attr_filters: where_filters
                    .iter()
                    .map(|f| AttrFilter::parse(f))
                    .collect::<tracelens_core::Result<Vec<_>>>()?,
            };
            let loaded = load_spans(&input)?;
            let items = filter.apply(analyzer.analyze(&loaded.spans).spans);
            if cli.json {
                print_json(&items)?;
            } else {
                print_spans_human(&items, color);
            }
        }
        Commands::Range { input } => {
            let loaded = load_spans(&input)?;
            let range = time_range(&loaded.spans);
            if cli.json {
                print_json(&RangeOutput {
                    range,
                    width_ms: range.width_ms(),
                    render_width_ms: range.render_width_ms(),
                    span_count: loaded.spans.len(),
                })?;
            } else {
                print_range_human(&range, loaded.spans.len());
            }
        }
        Commands::Traces { input, sort, limit } => {
            let order: SortOrder = sort.parse()?;
            let loaded = load_spans(&input)?;
            let mut items = summarize_traces(&loaded.spans, cfg.duplicate_spans);
            sort_summaries(&mut items, order);
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            if cli.json {
                print_json(&items)?;
            } else {
                print_traces_human(&items, color);
            }
        }
        Commands::Histogram {
            input,
            bands,
            per_span,
        } => {
            let bands = match bands {
                Some(raw) => bands_from_edges(&parse_band_edges(&raw)?),
                None => cfg.bands(),
            };
            let loaded = load_spans(&input)?;
            let buckets = if per_span {
                let durations: Vec<f64> = loaded
                    .spans
                    .iter()
                    .map(|s| s.duration_ms() as f64)
                    .collect();
                build_histogram(&durations, &bands)
            } else {
                latency_histogram(&summarize_traces(&loaded.spans, cfg.duplicate_spans), &bands)
            };
            if cli.json {
                print_json(&buckets)?;
            } else {
                print_histogram_human(&buckets);
            }
        }
        Commands::Analyze { input } => {
            let loaded = load_spans(&input)?;
            let analysis = analyzer.analyze(&loaded.spans);
            print_json(&AnalyzeOutput {
                analysis,
                rejected: loaded.rejected,
            })?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
