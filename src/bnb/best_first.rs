//! Best-first exploration with a priority queue keyed by LP value.
//!
//! Children are solved as soon as their parent is expanded; only fractional
//! children that survive the bound test are queued. The global lower bound is
//! the smallest LP value left in the queue.

use super::node::{BbNode, OpenNode};
use super::{NodeEvaluation, SearchState, SearchStatus};
use log::info;
use std::collections::BinaryHeap;

pub(crate) fn search(state: &mut SearchState<'_>, mut root: BbNode) -> SearchStatus {
    let mut queue: BinaryHeap<OpenNode> = BinaryHeap::new();

    match state.solve_node(&mut root) {
        NodeEvaluation::Fractional(children) => {
            state.raise_lower_bound(root.lp_value);
            queue.push(OpenNode { node: root, children });
        }
        _ => return state.exhausted(),
    }

    while let Some(OpenNode { node, children }) = queue.pop() {
        if state.time_exceeded() {
            return state.stop(SearchStatus::TimeLimit);
        }
        // The incumbent may have improved since the node was queued
        if state.prune_by_bound(&node) {
            continue;
        }

        for fix in children {
            let mut child = state.make_child(&node, fix);
            if let NodeEvaluation::Fractional(grandchildren) = state.solve_node(&mut child) {
                info!(
                    "ENQUEUE node={} nodeLB={:.4} queue={}",
                    child.id,
                    child.lp_value,
                    queue.len() + 1
                );
                state.statistics.enqueued += 1;
                queue.push(OpenNode {
                    node: child,
                    children: grandchildren,
                });
            }
        }
        drop(node);

        let open_min = queue
            .peek()
            .map_or(state.upper_bound, |open| open.node.lp_value);
        state.raise_lower_bound(open_min);
        if state.gap_reached() && !queue.is_empty() {
            return state.stop(SearchStatus::GapReached);
        }
    }

    state.exhausted()
}
