//! Branch-and-price driver.
//!
//! Both search strategies share [`SearchState`]: global bounds, the incumbent,
//! the node-id generator, the node view and the statistics. A node is solved by
//! installing its fix list into the view, running column generation and then
//! either pruning it, recording an incumbent or returning its two child fixes.
//!
//! Each BB event is logged at `info` level with the event name first:
//! `[Node ..]`, `PRUNE BY BOUND`, `PRUNE RELAX INFEASIBLE`, `INCUMBENT`,
//! `FRACTIONAL`, `ENQUEUE` and `STOP`. An integral node whose routes do not
//! cover every customer exactly once is logged at `warn` level as
//! `REJECT INCUMBENT` and leaves the upper bound unchanged.

pub mod best_first;
pub mod depth_first;
pub mod node;

pub use node::{BbNode, NodeOutcome, NodeRecord};

use crate::branching::{choose_branch_arc, filter_routes, BranchChoice, FLOW_EPSILON};
use crate::colgen::ColumnGeneration;
use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::instance::Instance;
use crate::lp::check_backend;
use crate::route::Route;
use crate::solution::Solution;
use crate::view::{ArcFix, NodeView};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// A node whose LP value is within this distance of the upper bound is pruned
pub const BOUND_TOLERANCE: f64 = 1e-6;

/// Tree exploration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// Priority queue keyed by LP value
    BestFirst,
    /// Recursive dive, first-branch child first
    DepthFirst,
}

impl SearchStrategy {
    pub fn all() -> [SearchStrategy; 2] {
        [SearchStrategy::BestFirst, SearchStrategy::DepthFirst]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SearchStrategy::BestFirst => "PQ(best-first)",
            SearchStrategy::DepthFirst => "REC(depth-first)",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    /// Tree exhausted, incumbent proven optimal
    Optimal,
    /// Stopped early with the relative gap below the instance's `gap`
    GapReached,
    /// Stopped by the time limit
    TimeLimit,
    /// No integer solution exists
    Infeasible,
}

impl SearchStatus {
    /// Optimal or within the requested gap
    pub fn is_solved(self) -> bool {
        matches!(self, SearchStatus::Optimal | SearchStatus::GapReached)
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchStatus::Optimal => "Optimal",
            SearchStatus::GapReached => "GapReached",
            SearchStatus::TimeLimit => "TimeLimit",
            SearchStatus::Infeasible => "Infeasible",
        };
        f.write_str(s)
    }
}

/// Event counters of one search
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStatistics {
    pub nodes_solved: usize,
    pub pruned_by_bound: usize,
    pub pruned_infeasible: usize,
    pub incumbents: usize,
    pub fractional_nodes: usize,
    pub enqueued: usize,
    pub max_depth: usize,
    pub cg_iterations: usize,
    pub columns_generated: usize,
    /// Upper bound after each improvement
    pub upper_bound_history: Vec<f64>,
    /// Lower bound after each increase
    pub lower_bound_history: Vec<f64>,
}

/// Everything a search reports
#[derive(Debug, Clone, Serialize)]
pub struct BranchAndPriceResult {
    pub strategy: SearchStrategy,
    pub status: SearchStatus,
    pub solution: Solution,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub gap: f64,
    pub statistics: SearchStatistics,
    /// One record per solved node
    pub nodes: Vec<NodeRecord>,
    /// Wall-clock seconds
    pub computation_time: f64,
}

/// Branch-and-price solver for one instance
pub struct BranchAndPrice<'a> {
    instance: &'a Instance,
    config: SolverConfig,
}

impl<'a> BranchAndPrice<'a> {
    /// Check the configuration against the instance and the compiled backends.
    pub fn new(instance: &'a Instance, config: SolverConfig) -> Result<Self, SolverError> {
        config.validate()?;
        check_backend(config.lp_backend)?;
        if !(instance.very_big > 2.0 * instance.max_route_length) {
            return Err(SolverError::Config(format!(
                "very_big ({}) must exceed twice max_route_length ({})",
                instance.very_big, instance.max_route_length
            )));
        }
        if !(instance.gap >= 0.0) {
            return Err(SolverError::Config(format!(
                "gap must be non-negative, got {}",
                instance.gap
            )));
        }
        Ok(BranchAndPrice { instance, config })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Run the search with `strategy`
    pub fn solve(&self, strategy: SearchStrategy) -> BranchAndPriceResult {
        let start = Instant::now();
        info!(
            "{} on {} ({} customers, gap {:e})",
            strategy, self.instance.name, self.instance.num_customers, self.instance.gap
        );
        let mut state = SearchState::new(self.instance, &self.config, start);
        let root = BbNode::root(state.next_id());
        let status = match strategy {
            SearchStrategy::BestFirst => best_first::search(&mut state, root),
            SearchStrategy::DepthFirst => depth_first::search(&mut state, root),
        };
        state.into_result(strategy, status)
    }
}

/// What `solve_node` decided
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NodeEvaluation {
    Infeasible,
    PrunedByBound,
    Integral,
    Fractional([ArcFix; 2]),
}

/// Search state shared by both strategies
pub(crate) struct SearchState<'a> {
    instance: &'a Instance,
    cg: ColumnGeneration<'a>,
    view: NodeView,
    time_limit: Option<f64>,
    start: Instant,
    next_id: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
    incumbent: Vec<Route>,
    pub statistics: SearchStatistics,
    records: Vec<NodeRecord>,
}

impl<'a> SearchState<'a> {
    pub fn new(instance: &'a Instance, config: &SolverConfig, start: Instant) -> Self {
        SearchState {
            instance,
            cg: ColumnGeneration::new(instance, config),
            view: NodeView::new(instance),
            time_limit: config.time_limit,
            start,
            next_id: 0,
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
            incumbent: Vec::new(),
            statistics: SearchStatistics::default(),
            records: Vec::new(),
        }
    }

    pub fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn has_incumbent(&self) -> bool {
        self.upper_bound.is_finite()
    }

    /// Install the node's fixes, run CG and classify the node.
    pub fn solve_node(&mut self, node: &mut BbNode) -> NodeEvaluation {
        info!(
            "[Node {} | depth={} | fixes={}] {}",
            node.id,
            node.depth,
            node.fixes.len(),
            node.fix_label()
        );
        self.view.install(self.instance, &node.fixes);
        let outcome = self.cg.run(&mut self.view, &mut node.routes);

        let stats = &mut self.statistics;
        stats.nodes_solved += 1;
        stats.cg_iterations += outcome.iterations;
        stats.columns_generated += outcome.columns_added;
        stats.max_depth = stats.max_depth.max(node.depth);

        let lp = outcome.objective;
        if lp < -BOUND_TOLERANCE || lp > 2.0 * self.instance.max_route_length {
            info!("PRUNE RELAX INFEASIBLE node={} lp={:.4e}", node.id, lp);
            self.statistics.pruned_infeasible += 1;
            self.record(node, lp, NodeOutcome::PrunedInfeasible);
            return NodeEvaluation::Infeasible;
        }
        node.lp_value = lp;

        if lp >= self.upper_bound - BOUND_TOLERANCE {
            info!(
                "PRUNE BY BOUND node={} nodeLB={:.4} globalUB={:.4}",
                node.id, lp, self.upper_bound
            );
            self.statistics.pruned_by_bound += 1;
            self.record(node, lp, NodeOutcome::PrunedByBound);
            return NodeEvaluation::PrunedByBound;
        }

        let choice = choose_branch_arc(self.view.aggregate_flows(&node.routes, FLOW_EPSILON));
        let Some(children) = choice.children() else {
            self.update_incumbent(node.id, lp, &node.routes);
            self.record(node, lp, NodeOutcome::Integral);
            return NodeEvaluation::Integral;
        };
        if let BranchChoice::Fractional { from, to, value, .. } = choice {
            info!(
                "FRACTIONAL node={} nodeLB={:.4} arc=({}->{}) flow={:.6}",
                node.id, lp, from, to, value
            );
        }
        self.statistics.fractional_nodes += 1;
        self.record(node, lp, NodeOutcome::Branched);
        NodeEvaluation::Fractional(children)
    }

    /// Prune `node` if its LP bound can no longer beat the incumbent. Used for
    /// nodes that were solved earlier and waited while the incumbent improved.
    pub fn prune_by_bound(&mut self, node: &BbNode) -> bool {
        if node.lp_value < self.upper_bound - BOUND_TOLERANCE {
            return false;
        }
        info!(
            "PRUNE BY BOUND node={} nodeLB={:.4} globalUB={:.4}",
            node.id, node.lp_value, self.upper_bound
        );
        self.statistics.pruned_by_bound += 1;
        true
    }

    /// Child of `parent` under `fix`, seeded with the parent's columns that
    /// survive the fix.
    pub fn make_child(&mut self, parent: &BbNode, fix: ArcFix) -> BbNode {
        let id = self.next_id();
        let mut fixes = parent.fixes.clone();
        fixes.push(fix);
        self.view.install(self.instance, &fixes);
        let routes = filter_routes(&self.view, &parent.routes, &fix);
        parent.child(id, fix, routes)
    }

    fn update_incumbent(&mut self, node_id: usize, value: f64, routes: &[Route]) {
        if value >= self.upper_bound {
            return;
        }
        let candidate = Solution {
            routes: routes.iter().filter(|r| r.q > FLOW_EPSILON).cloned().collect(),
            ..Solution::new()
        };
        let violations = candidate.violations(self.instance);
        if !violations.is_empty() {
            warn!(
                "REJECT INCUMBENT node={} value={:.4} violations={:?}",
                node_id, value, violations
            );
            return;
        }
        self.upper_bound = value;
        self.incumbent = candidate.routes;
        self.statistics.incumbents += 1;
        self.statistics.upper_bound_history.push(value);
        info!(
            "INCUMBENT node={} value={:.4} routes={} globalLB={:.4} gap={:.3e}",
            node_id,
            value,
            self.incumbent.len(),
            self.lower_bound,
            self.gap()
        );
    }

    /// Raise the global lower bound to `candidate`, capped by the upper bound.
    pub fn raise_lower_bound(&mut self, candidate: f64) {
        let candidate = candidate.min(self.upper_bound);
        if candidate.is_finite() && candidate > self.lower_bound {
            self.lower_bound = candidate;
            self.statistics.lower_bound_history.push(candidate);
        }
    }

    /// Relative gap, infinite while there is no incumbent
    pub fn gap(&self) -> f64 {
        if !self.has_incumbent() || !self.lower_bound.is_finite() {
            return f64::INFINITY;
        }
        if self.upper_bound.abs() < 1e-9 {
            return if self.lower_bound >= self.upper_bound - 1e-9 {
                0.0
            } else {
                f64::INFINITY
            };
        }
        ((self.upper_bound - self.lower_bound) / self.upper_bound).max(0.0)
    }

    pub fn gap_reached(&self) -> bool {
        self.has_incumbent() && self.gap() < self.instance.gap
    }

    pub fn time_exceeded(&self) -> bool {
        self.time_limit
            .map_or(false, |limit| self.start.elapsed().as_secs_f64() >= limit)
    }

    /// Log the stop event and return `status`
    pub fn stop(&self, status: SearchStatus) -> SearchStatus {
        info!(
            "STOP {} globalLB={:.4} globalUB={:.4} gap={:.3e} nodes={}",
            status,
            self.lower_bound,
            self.upper_bound,
            self.gap(),
            self.statistics.nodes_solved
        );
        status
    }

    /// Status once the whole tree has been explored
    pub fn exhausted(&mut self) -> SearchStatus {
        if self.has_incumbent() {
            self.raise_lower_bound(self.upper_bound);
            self.stop(SearchStatus::Optimal)
        } else {
            self.stop(SearchStatus::Infeasible)
        }
    }

    fn record(&mut self, node: &BbNode, lp_value: f64, outcome: NodeOutcome) {
        self.records.push(NodeRecord {
            id: node.id,
            parent: node.parent,
            depth: node.depth,
            fix: node.fix,
            lp_value,
            outcome,
        });
    }

    fn into_result(self, strategy: SearchStrategy, status: SearchStatus) -> BranchAndPriceResult {
        let gap = self.gap();
        let elapsed = self.start.elapsed().as_secs_f64();
        let mut solution = Solution::from_routes(self.instance, self.incumbent, strategy.name());
        solution.computation_time = elapsed;
        if !self.upper_bound.is_finite() {
            solution.cost = f64::INFINITY;
        }
        BranchAndPriceResult {
            strategy,
            status,
            solution,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
            gap,
            statistics: self.statistics,
            nodes: self.records,
            computation_time: elapsed,
        }
    }
}
