//! Pricing subproblem: label-setting shortest path with resource constraints.
//!
//! Labels are extended forward from the depot origin along non-forbidden arcs
//! and processed in non-decreasing service-start time. Each label carries its
//! reduced cost, time, load and (elementary mode) the set of customers it may
//! no longer visit. That set holds the customers already on the path plus the
//! ones that are out of reach by time or capacity, which keeps the dominance
//! test exact while discarding many more labels.

use crate::config::{Elementarity, SolverConfig};
use crate::instance::Instance;
use crate::view::NodeView;
use fixedbitset::FixedBitSet;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Slack on the reachability test that fills the unreachable set
const REACH_TOLERANCE: f64 = 1e-9;

/// A path `0 -> ... -> N+1` with negative reduced cost
#[derive(Debug, Clone, PartialEq)]
pub struct PricedPath {
    pub path: Vec<usize>,
    pub reduced_cost: f64,
}

#[derive(Debug, Clone)]
struct Label {
    vertex: usize,
    reduced_cost: f64,
    time: f64,
    load: u32,
    /// Customers the label can no longer visit (elementary mode only)
    unreachable: FixedBitSet,
    parent: Option<usize>,
    alive: bool,
}

impl Label {
    fn dominates(&self, other: &Label) -> bool {
        self.reduced_cost <= other.reduced_cost
            && self.time <= other.time
            && self.load <= other.load
            && self.unreachable.is_subset(&other.unreachable)
    }
}

/// Counters for one pricing call
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingStats {
    pub labels_created: usize,
    pub labels_dominated: usize,
    pub labels_processed: usize,
    pub routes_found: usize,
}

/// Label-setting pricer bound to one instance
#[derive(Debug, Clone)]
pub struct Pricer<'a> {
    instance: &'a Instance,
    elementarity: Elementarity,
    max_routes: usize,
    tolerance: f64,
}

impl<'a> Pricer<'a> {
    pub fn new(instance: &'a Instance, config: &SolverConfig) -> Self {
        Pricer {
            instance,
            elementarity: config.elementarity,
            max_routes: config.routes_per_pricing(instance.num_customers),
            tolerance: config.reduced_cost_tolerance,
        }
    }

    /// Routes with reduced cost below `-tolerance` in `view.cost`, most
    /// negative first. Arcs forbidden in `view.dist` are never used.
    pub fn price(&self, view: &NodeView) -> Vec<PricedPath> {
        let (paths, stats) = self.price_with_stats(view);
        log::trace!(
            "pricing: {} labels created, {} dominated, {} processed, {} routes",
            stats.labels_created,
            stats.labels_dominated,
            stats.labels_processed,
            stats.routes_found
        );
        paths
    }

    pub fn price_with_stats(&self, view: &NodeView) -> (Vec<PricedPath>, PricingStats) {
        let instance = self.instance;
        let ret = instance.depot_return();
        let elementary = self.elementarity == Elementarity::Elementary;
        let mut stats = PricingStats::default();

        let mut arena: Vec<Label> = Vec::new();
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); instance.num_nodes()];
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, usize)>> = BinaryHeap::new();

        let mut start = Label {
            vertex: 0,
            reduced_cost: 0.0,
            time: instance.nodes[0].ready_time,
            load: 0,
            unreachable: FixedBitSet::with_capacity(if elementary { instance.num_nodes() } else { 0 }),
            parent: None,
            alive: true,
        };
        if elementary {
            self.mark_unreachable(&mut start);
        }
        arena.push(start);
        buckets[0].push(0);
        heap.push(Reverse((OrderedFloat(instance.nodes[0].ready_time), 0)));
        stats.labels_created += 1;

        while let Some(Reverse((_, id))) = heap.pop() {
            if !arena[id].alive {
                continue;
            }
            let u = arena[id].vertex;
            if u == ret {
                continue;
            }
            stats.labels_processed += 1;

            for v in 1..=ret {
                if v == u || (u == 0 && v == ret) || view.is_forbidden(u, v) {
                    continue;
                }
                let label = &arena[id];
                if elementary && v != ret && label.unreachable.contains(v) {
                    continue;
                }

                let load = label.load + instance.demand(v);
                if load > instance.capacity {
                    continue;
                }
                let time = instance.arrival_time(label.time, u, v, view.dist[u][v]);
                if time > instance.nodes[v].due_time {
                    continue;
                }
                // Cycles must consume a resource or SPPRC would not terminate
                if !elementary && v != ret && time <= label.time && load == label.load {
                    continue;
                }

                let mut next = Label {
                    vertex: v,
                    reduced_cost: label.reduced_cost + view.cost[u][v],
                    time,
                    load,
                    unreachable: label.unreachable.clone(),
                    parent: Some(id),
                    alive: true,
                };
                if elementary && v != ret {
                    next.unreachable.insert(v);
                    self.mark_unreachable(&mut next);
                }

                if let Some(new_id) = insert_label(&mut arena, &mut buckets[v], next, &mut stats) {
                    if v != ret {
                        heap.push(Reverse((OrderedFloat(time), new_id)));
                    }
                }
            }
        }

        let mut finished: Vec<usize> = buckets[ret]
            .iter()
            .copied()
            .filter(|&id| arena[id].alive && arena[id].reduced_cost < -self.tolerance)
            .collect();
        finished.sort_by(|&a, &b| {
            arena[a]
                .reduced_cost
                .total_cmp(&arena[b].reduced_cost)
                .then(a.cmp(&b))
        });
        finished.truncate(self.max_routes);

        let paths: Vec<PricedPath> = finished
            .into_iter()
            .map(|id| PricedPath {
                path: rebuild_path(&arena, id),
                reduced_cost: arena[id].reduced_cost,
            })
            .collect();
        stats.routes_found = paths.len();
        (paths, stats)
    }

    /// Add every customer that `label` cannot reach any more by capacity or
    /// by the shortest-time lower bound.
    fn mark_unreachable(&self, label: &mut Label) {
        let instance = self.instance;
        for w in instance.customers() {
            if label.unreachable.contains(w) {
                continue;
            }
            let over_capacity = label.load + instance.demand(w) > instance.capacity;
            let too_late = label.time + instance.min_reach_time(label.vertex, w)
                > instance.nodes[w].due_time + REACH_TOLERANCE;
            if over_capacity || too_late {
                label.unreachable.insert(w);
            }
        }
    }
}

/// Insert `label` into its vertex bucket unless an existing label dominates it.
/// Labels the new one dominates are killed.
fn insert_label(
    arena: &mut Vec<Label>,
    bucket: &mut Vec<usize>,
    label: Label,
    stats: &mut PricingStats,
) -> Option<usize> {
    if bucket.iter().any(|&id| arena[id].dominates(&label)) {
        stats.labels_dominated += 1;
        return None;
    }
    bucket.retain(|&id| {
        if label.dominates(&arena[id]) {
            arena[id].alive = false;
            stats.labels_dominated += 1;
            false
        } else {
            true
        }
    });

    let id = arena.len();
    arena.push(label);
    bucket.push(id);
    stats.labels_created += 1;
    Some(id)
}

fn rebuild_path(arena: &[Label], last: usize) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = Some(last);
    while let Some(id) = current {
        path.push(arena[id].vertex);
        current = arena[id].parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Customer, GeneratorConfig};
    use crate::route::Route;
    use crate::view::ArcFix;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn square_instance() -> Instance {
        let depot = Customer::new(0, 0.0, 0.0, 0, 0.0, 1000.0, 0.0);
        let customers = vec![
            Customer::new(1, 10.0, 0.0, 5, 0.0, 1000.0, 1.0),
            Customer::new(2, 10.0, 10.0, 5, 0.0, 1000.0, 1.0),
            Customer::new(3, 0.0, 10.0, 5, 0.0, 1000.0, 1.0),
        ];
        Instance::new("square", 10, depot, customers, Default::default()).unwrap()
    }

    fn priced_view(instance: &Instance, fixes: &[ArcFix], duals: &[f64]) -> NodeView {
        let mut view = NodeView::new(instance);
        view.install(instance, fixes);
        view.update_reduced_costs(duals);
        view
    }

    fn reduced_cost(instance: &Instance, path: &[usize], duals: &[f64]) -> f64 {
        let route = Route::new(path.to_vec());
        route.cost_in(&instance.dist_base) - route.customers().iter().map(|&c| duals[c - 1]).sum::<f64>()
    }

    /// Minimum reduced cost over all elementary feasible routes, by enumeration
    fn brute_force_best(instance: &Instance, view: &NodeView) -> f64 {
        fn extend(
            instance: &Instance,
            view: &NodeView,
            path: &mut Vec<usize>,
            time: f64,
            load: u32,
            rc: f64,
            best: &mut f64,
        ) {
            let u = *path.last().unwrap();
            let ret = instance.depot_return();
            for v in 1..=ret {
                if v == u || path.contains(&v) || (u == 0 && v == ret) || view.is_forbidden(u, v) {
                    continue;
                }
                let next_load = load + instance.demand(v);
                let next_time = instance.arrival_time(time, u, v, view.dist[u][v]);
                if next_load > instance.capacity || next_time > instance.nodes[v].due_time {
                    continue;
                }
                let next_rc = rc + view.cost[u][v];
                if v == ret {
                    *best = best.min(next_rc);
                } else {
                    path.push(v);
                    extend(instance, view, path, next_time, next_load, next_rc, best);
                    path.pop();
                }
            }
        }

        let mut best = f64::INFINITY;
        extend(instance, view, &mut vec![0], instance.nodes[0].ready_time, 0, 0.0, &mut best);
        best
    }

    #[test]
    fn test_zero_duals_price_nothing() {
        let instance = square_instance();
        let view = priced_view(&instance, &[], &[0.0; 3]);
        let pricer = Pricer::new(&instance, &SolverConfig::default());
        assert!(pricer.price(&view).is_empty());
    }

    #[test]
    fn test_routes_have_negative_reduced_cost() {
        let instance = square_instance();
        let duals = [30.0, 30.0, 30.0];
        let view = priced_view(&instance, &[], &duals);
        let pricer = Pricer::new(&instance, &SolverConfig::default());
        let paths = pricer.price(&view);
        assert!(!paths.is_empty());
        for p in &paths {
            let rc = reduced_cost(&instance, &p.path, &duals);
            assert!(rc < -1e-9);
            assert!((rc - p.reduced_cost).abs() < 1e-9);
            assert!(Route::new(p.path.clone()).check(&instance).is_ok());
        }
        // capacity 10 allows two customers per route
        assert!(paths.iter().all(|p| p.path.len() <= 4));
        for w in paths.windows(2) {
            assert!(w[0].reduced_cost <= w[1].reduced_cost);
        }
    }

    #[test]
    fn test_forbidden_arc_never_used() {
        let instance = square_instance();
        let duals = [30.0, 30.0, 30.0];
        let view = priced_view(&instance, &[ArcFix::forbid(1, 2), ArcFix::forbid(0, 3)], &duals);
        let pricer = Pricer::new(&instance, &SolverConfig::default());
        let paths = pricer.price(&view);
        assert!(!paths.is_empty());
        for p in &paths {
            let route = Route::new(p.path.clone());
            assert!(!route.uses_arc(1, 2));
            assert!(!route.uses_arc(0, 3));
        }
    }

    #[test]
    fn test_time_windows_respected() {
        let depot = Customer::new(0, 0.0, 0.0, 0, 0.0, 100.0, 0.0);
        let customers = vec![
            Customer::new(1, 5.0, 0.0, 1, 0.0, 6.0, 1.0),
            Customer::new(2, 10.0, 0.0, 1, 20.0, 30.0, 1.0),
        ];
        let instance = Instance::new("tw", 10, depot, customers, Default::default()).unwrap();
        let duals = [20.0, 40.0];
        let view = priced_view(&instance, &[], &duals);
        let pricer = Pricer::new(&instance, &SolverConfig::default());
        let paths = pricer.price(&view);
        // 2 -> 1 would reach customer 1 after its window closes
        assert!(paths.iter().any(|p| p.path == vec![0, 1, 2, 3]));
        assert!(paths.iter().all(|p| p.path != vec![0, 2, 1, 3]));
        for p in &paths {
            assert!(Route::new(p.path.clone()).check(&instance).is_ok());
        }
    }

    #[test]
    fn test_matches_enumeration() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for seed in 0..5 {
            let instance = Instance::random("enum", 7, seed, &GeneratorConfig {
                capacity: 60,
                ..Default::default()
            })
            .unwrap();
            let duals: Vec<f64> = instance
                .customers()
                .map(|i| {
                    let trip = instance.distance(0, i) + instance.distance(i, instance.depot_return());
                    trip * rng.gen_range(0.3..1.2)
                })
                .collect();
            let view = priced_view(&instance, &[], &duals);
            let pricer = Pricer::new(&instance, &SolverConfig::default());
            let paths = pricer.price(&view);
            let best = brute_force_best(&instance, &view);

            if best < -1e-6 {
                assert!(!paths.is_empty(), "seed {}: missed a negative route", seed);
                assert!((paths[0].reduced_cost - best).abs() < 1e-6);
            } else {
                assert!(paths.iter().all(|p| p.reduced_cost >= best - 1e-6));
            }
            for p in &paths {
                let mut seen = p.path.clone();
                seen.sort_unstable();
                seen.dedup();
                assert_eq!(seen.len(), p.path.len(), "path {:?} repeats a node", p.path);
            }
        }
    }

    #[test]
    fn test_non_elementary_bound_is_weaker() {
        let instance = Instance::random("spprc", 6, 9, &GeneratorConfig::default()).unwrap();
        let duals: Vec<f64> = instance
            .customers()
            .map(|i| instance.distance(0, i) + instance.distance(i, instance.depot_return()))
            .collect();
        let view = priced_view(&instance, &[], &duals);

        let elementary = Pricer::new(&instance, &SolverConfig::default()).price(&view);
        let relaxed_config = SolverConfig {
            elementarity: Elementarity::NonElementary,
            ..Default::default()
        };
        let relaxed = Pricer::new(&instance, &relaxed_config).price(&view);

        if let Some(best) = elementary.first() {
            assert!(!relaxed.is_empty());
            assert!(relaxed[0].reduced_cost <= best.reduced_cost + 1e-9);
        }
    }

    #[test]
    fn test_route_limit() {
        let instance = Instance::random("limit", 8, 2, &GeneratorConfig::default()).unwrap();
        let duals: Vec<f64> = instance.customers().map(|_| 200.0).collect();
        let view = priced_view(&instance, &[], &duals);
        let config = SolverConfig {
            max_routes_per_pricing: Some(2),
            ..Default::default()
        };
        let (paths, stats) = Pricer::new(&instance, &config).price_with_stats(&view);
        assert_eq!(paths.len(), 2);
        assert_eq!(stats.routes_found, 2);
        assert!(stats.labels_created > stats.routes_found);
    }
}
