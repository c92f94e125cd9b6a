use chrono::SecondsFormat;
use owo_colors::OwoColorize;
use tracelens_core::histogram::HistogramBucket;
use tracelens_core::model::span::SpanStatus;
use tracelens_core::model::tree::SpanNode;
use tracelens_core::summary::TraceSummary;
use tracelens_core::{Analyzer, Category, SpanIoResult, TimeRange};

const PREVIEW_CHARS: usize = 80;

pub fn print_tree_human(roots: &[SpanNode], analyzer: &Analyzer, color: bool) {
    for root in roots {
        for node in root.iter() {
            let category = analyzer.classifier.classify(&node.span);
            println!(
                "{}{} {} ({}ms) {}",
                "  ".repeat(node.depth - root.depth),
                category_label(category, color),
                node.span.name,
                node.span.duration_ms(),
                status_label(node.span.status, color)
            );
        }
    }
    let total: usize = roots.iter().map(|r| r.descendant_count() + 1).sum();
    println!("-- {} spans ({} roots) --", total, roots.len());
}

pub fn print_spans_human(items: &[SpanIoResult], color: bool) {
    for item in items {
        let mut line = format!(
            "span={} {} {} ({}ms) {}",
            item.span.span_id,
            category_label(item.category, color),
            item.span.name,
            item.span.duration_ms(),
            status_label(item.span.status, color)
        );
        if let Some(tool) = &item.tool_name {
            line.push_str(&format!(" tool={tool}"));
        }
        if let Some(model) = &item.model_id {
            line.push_str(&format!(" model={model}"));
        }
        println!("{line}");
        if let Some(input) = &item.input {
            println!("  in:  {}", preview(input));
        }
        if let Some(output) = &item.output {
            println!("  out: {}", preview(output));
        }
    }
    println!("-- {} spans --", items.len());
}

pub fn print_range_human(range: &TimeRange, span_count: usize) {
    println!("start={}", range.start.to_rfc3339_opts(SecondsFormat::Millis, true));
    println!("end={}", range.end.to_rfc3339_opts(SecondsFormat::Millis, true));
    println!(
        "width={}ms render_width={}ms spans={}",
        range.width_ms(),
        range.render_width_ms(),
        span_count
    );
}

pub fn print_traces_human(items: &[TraceSummary], color: bool) {
    for item in items {
        println!(
            "trace={} duration={}ms spans={} errors={} status={} root=\"{}\"",
            item.trace_id,
            item.duration_ms,
            item.span_count,
            item.error_count,
            status_label(item.status, color),
            item.root_name
        );
    }
    println!("-- {} traces --", items.len());
}

pub fn print_histogram_human(buckets: &[HistogramBucket]) {
    let widest = buckets.iter().map(|b| b.label.len()).max().unwrap_or(0);
    let peak = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    for bucket in buckets {
        println!(
            "{:<widest$} {:>6} {}",
            bucket.label,
            bucket.count,
            bar(bucket.count, peak)
        );
    }
    let total: usize = buckets.iter().map(|b| b.count).sum();
    println!("-- {} samples --", total);
}

fn category_label(category: Category, color: bool) -> String {
    let label = format!("[{category}]");
    if !color {
        return label;
    }
    match category {
        Category::Agent => label.magenta().to_string(),
        Category::Llm => label.cyan().to_string(),
        Category::Tool => label.yellow().to_string(),
        Category::Other => label.bright_black().to_string(),
    }
}

fn status_label(status: SpanStatus, color: bool) -> String {
    if !color {
        return status.to_string();
    }
    match status {
        SpanStatus::Ok => status.green().to_string(),
        SpanStatus::Error => status.red().to_string(),
        SpanStatus::Unset => status.bright_black().to_string(),
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}

fn bar(count: usize, peak: usize) -> String {
    const WIDTH: usize = 40;
    if peak == 0 {
        return String::new();
    }
    "#".repeat((count * WIDTH).div_ceil(peak))
}
