//! Branch-and-bound nodes and per-node records.

use crate::route::Route;
use crate::view::ArcFix;
use serde::Serialize;
use std::cmp::Ordering;

/// A BB node: its fix list and the columns it starts from
#[derive(Debug, Clone)]
pub struct BbNode {
    pub id: usize,
    pub parent: Option<usize>,
    /// Fix applied on the edge from the parent
    pub fix: Option<ArcFix>,
    /// Every fix from the root, in application order
    pub fixes: Vec<ArcFix>,
    /// Seed columns before CG, the full pool after
    pub routes: Vec<Route>,
    pub depth: usize,
    /// CG objective, `+inf` until solved
    pub lp_value: f64,
}

impl BbNode {
    pub fn root(id: usize) -> Self {
        BbNode {
            id,
            parent: None,
            fix: None,
            fixes: Vec::new(),
            routes: Vec::new(),
            depth: 0,
            lp_value: f64::INFINITY,
        }
    }

    pub fn child(&self, id: usize, fix: ArcFix, routes: Vec<Route>) -> Self {
        let mut fixes = Vec::with_capacity(self.fixes.len() + 1);
        fixes.extend_from_slice(&self.fixes);
        fixes.push(fix);
        BbNode {
            id,
            parent: Some(self.id),
            fix: Some(fix),
            fixes,
            routes,
            depth: self.depth + 1,
            lp_value: f64::INFINITY,
        }
    }

    /// Fix label for log lines
    pub fn fix_label(&self) -> String {
        self.fix.map_or_else(|| "root".to_string(), |f| f.to_string())
    }
}

/// Open node of the best-first queue with the fixes of its two children.
/// Ordered so that `BinaryHeap` pops the smallest `lp_value`, then the
/// smallest id.
#[derive(Debug)]
pub(crate) struct OpenNode {
    pub node: BbNode,
    pub children: [ArcFix; 2],
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .node
            .lp_value
            .total_cmp(&self.node.lp_value)
            .then_with(|| other.node.id.cmp(&self.node.id))
    }
}

/// What happened to a solved node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeOutcome {
    PrunedInfeasible,
    PrunedByBound,
    Integral,
    Branched,
}

/// Trace of one solved node
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub id: usize,
    pub parent: Option<usize>,
    pub depth: usize,
    pub fix: Option<ArcFix>,
    /// CG objective (the infeasibility sentinel included)
    pub lp_value: f64,
    pub outcome: NodeOutcome,
}
