//! Depth-first diving.
//!
//! At a fractional node the child on the side closer to the flow value is
//! explored first. While it is being explored the second child waits, and its
//! parent's LP value sits on the frontier stack. The global lower bound is the
//! smallest of the frontier values and the bound of the node just solved.
//! When the first subtree improves the incumbent enough, the second child is
//! pruned by its parent's bound without being solved.

use super::node::BbNode;
use super::{NodeEvaluation, SearchState, SearchStatus};

enum Flow {
    Continue,
    Stop(SearchStatus),
}

pub(crate) fn search(state: &mut SearchState<'_>, root: BbNode) -> SearchStatus {
    let mut frontier: Vec<f64> = Vec::new();
    match dive(state, root, &mut frontier) {
        Flow::Stop(status) => status,
        Flow::Continue => state.exhausted(),
    }
}

fn dive(state: &mut SearchState<'_>, mut node: BbNode, frontier: &mut Vec<f64>) -> Flow {
    if state.time_exceeded() {
        return Flow::Stop(state.stop(SearchStatus::TimeLimit));
    }

    let evaluation = state.solve_node(&mut node);
    let subtree_bound = match evaluation {
        NodeEvaluation::Fractional(_) => node.lp_value,
        _ => f64::INFINITY,
    };
    let waiting = frontier.iter().copied().fold(f64::INFINITY, f64::min);
    state.raise_lower_bound(subtree_bound.min(waiting));

    let work_left = subtree_bound.is_finite() || !frontier.is_empty();
    if work_left && state.gap_reached() {
        return Flow::Stop(state.stop(SearchStatus::GapReached));
    }
    let NodeEvaluation::Fractional([first, second]) = evaluation else {
        return Flow::Continue;
    };

    frontier.push(node.lp_value);
    let child = state.make_child(&node, first);
    if let Flow::Stop(status) = dive(state, child, frontier) {
        return Flow::Stop(status);
    }
    frontier.pop();

    if state.prune_by_bound(&node) {
        return Flow::Continue;
    }
    let child = state.make_child(&node, second);
    drop(node);
    dive(state, child, frontier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bnb::{NodeOutcome, SearchStrategy};
    use crate::config::SolverConfig;
    use crate::instance::{GeneratorConfig, Instance};
    use std::time::Instant;

    #[test]
    fn test_every_child_is_solved_or_pruned_by_bound() {
        for seed in [4, 21] {
            let instance = Instance::random("dive", 8, seed, &GeneratorConfig::default())
                .unwrap()
                .with_gap(0.0);
            let config = SolverConfig::default();
            let mut state = SearchState::new(&instance, &config, Instant::now());
            let root = BbNode::root(state.next_id());

            let status = search(&mut state, root);
            assert_eq!(status, SearchStatus::Optimal);
            let result = state.into_result(SearchStrategy::DepthFirst, status);
            let branched = result
                .nodes
                .iter()
                .filter(|r| r.outcome == NodeOutcome::Branched)
                .count();
            let solved_pruned = result
                .nodes
                .iter()
                .filter(|r| r.outcome == NodeOutcome::PrunedByBound)
                .count();
            let skipped = result.statistics.pruned_by_bound - solved_pruned;
            assert_eq!(result.nodes.len() + skipped, 1 + 2 * branched, "seed {}", seed);
        }
    }
}
