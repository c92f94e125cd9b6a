use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::model::span::Span;
use crate::model::tree::SpanNode;

/// Which record survives when several spans share a span id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The last occurrence in input order replaces earlier ones.
    #[default]
    LastWins,
    /// The first occurrence is kept, later ones are dropped.
    FirstWins,
}

impl FromStr for DuplicatePolicy {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "last" | "last_wins" => Ok(Self::LastWins),
            "first" | "first_wins" => Ok(Self::FirstWins),
            _ => Err(TraceError::Parse(format!("unknown duplicate policy: {s}"))),
        }
    }
}

/// Builds the span forest with the default [`DuplicatePolicy`].
pub fn build_span_tree(spans: &[Span]) -> Vec<SpanNode> {
    build_span_tree_with(spans, DuplicatePolicy::default())
}

/// Rebuilds the parent/child hierarchy from a flat span list.
///
/// Spans without a parent, with a parent id that is not in `spans`, or that
/// name themselves as parent become roots. Parent cycles are cut where the
/// loop closes: walking up from each span in input order, the span whose
/// parent link leads back onto the current path is made a root. Roots and
/// every children list are ordered by ascending start time, ties keeping
/// input order.
pub fn build_span_tree_with(spans: &[Span], policy: DuplicatePolicy) -> Vec<SpanNode> {
    let index = index_spans(spans, policy);
    let kept: Vec<usize> = (0..spans.len())
        .filter(|&i| index.get(spans[i].span_id.as_str()) == Some(&i))
        .collect();

    let mut parent: Vec<Option<usize>> = vec![None; spans.len()];
    for &i in &kept {
        let Some(parent_id) = spans[i].parent_span_id.as_deref() else {
            continue;
        };
        match index.get(parent_id) {
            Some(&p) if p == i => {
                tracing::debug!(span_id = %spans[i].span_id, "span is its own parent, treating as root");
            }
            Some(&p) => parent[i] = Some(p),
            None => {}
        }
    }

    break_cycles(spans, &kept, &mut parent);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
    let mut roots = Vec::new();
    for &i in &kept {
        match parent[i] {
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }

    roots.sort_by_key(|&i| spans[i].start_time);
    for list in &mut children {
        list.sort_by_key(|&i| spans[i].start_time);
    }

    materialize(spans, &roots, &children)
}

fn index_spans(spans: &[Span], policy: DuplicatePolicy) -> HashMap<&str, usize> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(spans.len());
    for (i, span) in spans.iter().enumerate() {
        let id = span.span_id.as_str();
        match policy {
            DuplicatePolicy::LastWins => {
                if index.insert(id, i).is_some() {
                    tracing::debug!(span_id = %id, "duplicate span id, keeping last occurrence");
                }
            }
            DuplicatePolicy::FirstWins => {
                if index.contains_key(id) {
                    tracing::debug!(span_id = %id, "duplicate span id, keeping first occurrence");
                } else {
                    index.insert(id, i);
                }
            }
        }
    }
    index
}

fn break_cycles(spans: &[Span], kept: &[usize], parent: &mut [Option<usize>]) {
    // settled: ancestry already known to end at a root
    let mut settled = vec![false; parent.len()];
    for &start in kept {
        if settled[start] {
            continue;
        }

        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut cur = start;
        loop {
            path.push(cur);
            on_path.insert(cur);
            match parent[cur] {
                Some(p) if settled[p] => break,
                Some(p) if on_path.contains(&p) => {
                    tracing::debug!(
                        span_id = %spans[cur].span_id,
                        parent_span_id = %spans[p].span_id,
                        "parent cycle detected, treating span as root"
                    );
                    parent[cur] = None;
                    break;
                }
                Some(p) => cur = p,
                None => break,
            }
        }

        for i in path {
            settled[i] = true;
        }
    }
}

fn materialize(spans: &[Span], roots: &[usize], children: &[Vec<usize>]) -> Vec<SpanNode> {
    let mut depth = vec![0usize; spans.len()];
    let mut order = Vec::with_capacity(spans.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        for &c in children[i].iter().rev() {
            depth[c] = depth[i] + 1;
            stack.push(c);
        }
    }

    // Reverse pre-order builds every child before its parent.
    let mut built: Vec<Option<SpanNode>> = (0..spans.len()).map(|_| None).collect();
    for &i in order.iter().rev() {
        let kids = children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(SpanNode {
            span: spans[i].clone(),
            depth: depth[i],
            children: kids,
        });
    }

    roots.iter().filter_map(|&r| built[r].take()).collect()
}
