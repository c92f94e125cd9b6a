use serde::{Deserialize, Serialize};

use crate::model::span::Span;

/// A span with its children. Dropping, cloning and comparing walk the subtree
/// with an explicit stack, so arbitrarily long parent chains are safe.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpanNode {
    pub span: Span,
    pub depth: usize,
    pub children: Vec<SpanNode>,
}

impl SpanNode {
    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.iter().count() - 1
    }

    /// Pre-order walk over this node and everything below it.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    pub fn find(&self, span_id: &str) -> Option<&SpanNode> {
        self.iter().find(|n| n.span.span_id == span_id)
    }
}

impl Drop for SpanNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

impl Clone for SpanNode {
    fn clone(&self) -> Self {
        // In reverse pre-order every subtree is finished before its parent,
        // leaving the parent's children on top of `built`, last child first.
        let mut built: Vec<SpanNode> = Vec::new();
        let nodes: Vec<&SpanNode> = self.iter().skip(1).collect();
        for node in nodes.into_iter().rev() {
            let split = built.len() - node.children.len();
            let mut children = built.split_off(split);
            children.reverse();
            built.push(SpanNode {
                span: node.span.clone(),
                depth: node.depth,
                children,
            });
        }
        built.reverse();
        SpanNode {
            span: self.span.clone(),
            depth: self.depth,
            children: built,
        }
    }
}

impl PartialEq for SpanNode {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self.iter(), other.iter());
        loop {
            match (a.next(), b.next()) {
                (None, None) => return true,
                (Some(x), Some(y))
                    if x.depth == y.depth
                        && x.children.len() == y.children.len()
                        && x.span == y.span => {}
                _ => return false,
            }
        }
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a SpanNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a SpanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Every node of a forest in pre-order, roots in their given order.
pub fn flatten(roots: &[SpanNode]) -> Vec<&SpanNode> {
    roots.iter().flat_map(SpanNode::iter).collect()
}

pub fn find_subtree<'a>(roots: &'a [SpanNode], span_id: &str) -> Option<&'a SpanNode> {
    roots.iter().find_map(|root| root.find(span_id))
}
