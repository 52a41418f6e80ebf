//! Per-node arc cost views and branching decisions.
//!
//! `dist` is rebuilt from `dist_base` plus the node's ordered fix list before
//! anything else happens at a node. `cost` holds reduced costs for pricing and
//! `edges` aggregates LP arc flows for branching.

use crate::instance::Instance;
use crate::route::Route;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arcs whose cost is within this distance of `very_big` are forbidden
pub const FORBIDDEN_TOLERANCE: f64 = 1e-6;

/// Branching direction on an arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixKind {
    /// Arc flow fixed to 0
    Forbid,
    /// Arc flow fixed to 1
    Impose,
}

impl FixKind {
    /// Branch value, 0 or 1
    pub fn value(self) -> u8 {
        match self {
            FixKind::Forbid => 0,
            FixKind::Impose => 1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            FixKind::Forbid => FixKind::Impose,
            FixKind::Impose => FixKind::Forbid,
        }
    }
}

/// One branching decision on arc `(from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArcFix {
    pub from: usize,
    pub to: usize,
    pub kind: FixKind,
}

impl ArcFix {
    pub fn forbid(from: usize, to: usize) -> Self {
        ArcFix { from, to, kind: FixKind::Forbid }
    }

    pub fn impose(from: usize, to: usize) -> Self {
        ArcFix { from, to, kind: FixKind::Impose }
    }
}

impl fmt::Display for ArcFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}->{})={}", self.from, self.to, self.kind.value())
    }
}

/// Mutable matrices owned by the active BB node
#[derive(Debug, Clone)]
pub struct NodeView {
    very_big: f64,
    /// Arc costs under the node's fixes
    pub dist: Vec<Vec<f64>>,
    /// Reduced arc costs for pricing
    pub cost: Vec<Vec<f64>>,
    /// Aggregated LP arc flows
    pub edges: Vec<Vec<f64>>,
}

impl NodeView {
    pub fn new(instance: &Instance) -> Self {
        let n = instance.num_nodes();
        NodeView {
            very_big: instance.very_big,
            dist: instance.dist_base.clone(),
            cost: instance.dist_base.clone(),
            edges: vec![vec![0.0; n]; n],
        }
    }

    /// Reset `dist` to `dist_base` and apply `fixes` in order.
    pub fn install(&mut self, instance: &Instance, fixes: &[ArcFix]) {
        for (row, base) in self.dist.iter_mut().zip(&instance.dist_base) {
            row.copy_from_slice(base);
        }
        for fix in fixes {
            self.apply_fix(fix);
        }
    }

    /// Apply one fix on top of the current `dist`.
    ///
    /// Imposing `(u, v)` removes every other arc leaving `u` (unless `u` is the
    /// depot origin), every other arc entering `v` (unless `v` is the depot
    /// return) and the reverse arc `(v, u)`.
    pub fn apply_fix(&mut self, fix: &ArcFix) {
        let (u, v) = (fix.from, fix.to);
        let n = self.dist.len();
        match fix.kind {
            FixKind::Forbid => self.dist[u][v] = self.very_big,
            FixKind::Impose => {
                if u != 0 {
                    for k in (0..n).filter(|&k| k != v) {
                        self.dist[u][k] = self.very_big;
                    }
                }
                if v != n - 1 {
                    for k in (0..n).filter(|&k| k != u) {
                        self.dist[k][v] = self.very_big;
                    }
                }
                self.dist[v][u] = self.very_big;
            }
        }
    }

    /// `cost[i][j] = dist[i][j] - duals[i-1]` for customers, `dist` elsewhere.
    pub fn update_reduced_costs(&mut self, duals: &[f64]) {
        let n = self.dist.len();
        for i in 0..n {
            let pi = if i >= 1 && i <= duals.len() { duals[i - 1] } else { 0.0 };
            for j in 0..n {
                self.cost[i][j] = self.dist[i][j] - pi;
            }
        }
    }

    #[inline]
    pub fn is_forbidden(&self, u: usize, v: usize) -> bool {
        self.dist[u][v] >= self.very_big - FORBIDDEN_TOLERANCE
    }

    /// True if no arc of `route` is forbidden in the current `dist`
    pub fn allows(&self, route: &Route) -> bool {
        route.arcs().all(|(u, v)| !self.is_forbidden(u, v))
    }

    /// `edges[i][j] = sum of q over routes with q > min_flow that use (i, j)`
    pub fn aggregate_flows(&mut self, routes: &[Route], min_flow: f64) -> &[Vec<f64>] {
        for row in self.edges.iter_mut() {
            row.fill(0.0);
        }
        for route in routes.iter().filter(|r| r.q > min_flow) {
            for (u, v) in route.arcs() {
                self.edges[u][v] += route.q;
            }
        }
        &self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Customer, GeneratorConfig, Instance};

    fn small_instance() -> Instance {
        Instance::random("view", 5, 11, &GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn test_forbid_single_arc() {
        let instance = small_instance();
        let mut view = NodeView::new(&instance);
        view.install(&instance, &[ArcFix::forbid(1, 2)]);
        assert!(view.is_forbidden(1, 2));
        assert!(!view.is_forbidden(2, 1));
        assert_eq!(view.dist[1][3], instance.dist_base[1][3]);
    }

    #[test]
    fn test_impose_arc() {
        let instance = small_instance();
        let ret = instance.depot_return();
        let mut view = NodeView::new(&instance);
        view.install(&instance, &[ArcFix::impose(2, 3)]);
        assert!(!view.is_forbidden(2, 3));
        assert!(view.is_forbidden(2, 4));
        assert!(view.is_forbidden(2, ret));
        assert!(view.is_forbidden(1, 3));
        assert!(view.is_forbidden(0, 3));
        assert!(view.is_forbidden(3, 2));
        assert!(!view.is_forbidden(3, 4));
        assert!(!view.is_forbidden(0, 2));
    }

    #[test]
    fn test_impose_keeps_depot_free() {
        let instance = small_instance();
        let ret = instance.depot_return();
        let mut view = NodeView::new(&instance);
        view.install(&instance, &[ArcFix::impose(0, 1), ArcFix::impose(4, ret)]);
        // other customers may still leave the depot and reach the return depot
        assert!(!view.is_forbidden(0, 2));
        assert!(!view.is_forbidden(3, ret));
        assert!(view.is_forbidden(2, 1));
        assert!(view.is_forbidden(4, 1));
    }

    #[test]
    fn test_install_is_incremental() {
        let instance = small_instance();
        let parent = vec![ArcFix::forbid(1, 2), ArcFix::impose(3, 4)];
        let fix = ArcFix::impose(0, 5);

        let mut fresh = NodeView::new(&instance);
        let mut all = parent.clone();
        all.push(fix);
        fresh.install(&instance, &all);

        let mut incremental = NodeView::new(&instance);
        incremental.install(&instance, &parent);
        incremental.apply_fix(&fix);

        assert_eq!(fresh.dist, incremental.dist);
    }

    #[test]
    fn test_install_resets_previous_node() {
        let instance = small_instance();
        let mut view = NodeView::new(&instance);
        view.install(&instance, &[ArcFix::impose(1, 2)]);
        view.install(&instance, &[]);
        assert_eq!(view.dist, instance.dist_base);
    }

    #[test]
    fn test_reduced_costs() {
        let depot = Customer::new(0, 0.0, 0.0, 0, 0.0, 100.0, 0.0);
        let customers = vec![
            Customer::new(1, 1.0, 0.0, 1, 0.0, 100.0, 0.0),
            Customer::new(2, 2.0, 0.0, 1, 0.0, 100.0, 0.0),
        ];
        let instance = Instance::new("rc", 10, depot, customers, Default::default()).unwrap();
        let mut view = NodeView::new(&instance);
        view.update_reduced_costs(&[5.0, 7.0]);
        assert_eq!(view.cost[0][1], 1.0);
        assert_eq!(view.cost[1][2], 1.0 - 5.0);
        assert_eq!(view.cost[2][3], 2.0 - 7.0);
        assert_eq!(view.cost[3][0], 0.0);
    }

    #[test]
    fn test_aggregate_flows() {
        let instance = small_instance();
        let mut view = NodeView::new(&instance);
        let mut a = Route::new(vec![0, 1, 2, 6]);
        a.q = 0.5;
        let mut b = Route::new(vec![0, 1, 3, 6]);
        b.q = 0.5;
        let mut c = Route::new(vec![0, 4, 6]);
        c.q = 1e-9;
        let edges = view.aggregate_flows(&[a, b, c], 1e-6);
        assert!((edges[0][1] - 1.0).abs() < 1e-12);
        assert!((edges[1][2] - 0.5).abs() < 1e-12);
        assert_eq!(edges[0][4], 0.0);
    }
}
