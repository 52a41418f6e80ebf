//! Route records: one column of the restricted master.

use crate::instance::Instance;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource or structure violation found while checking a route
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteViolation {
    #[error("route must start at 0 and end at {expected}")]
    Endpoints { expected: usize },

    #[error("route visits no customer")]
    Empty,

    #[error("node {0} is not a customer")]
    NotCustomer(usize),

    #[error("customer {customer} reached at {arrival:.2}, window closes at {due:.2}")]
    TimeWindow {
        customer: usize,
        arrival: f64,
        due: f64,
    },

    #[error("load {load} exceeds capacity {capacity}")]
    Capacity { load: u32, capacity: u32 },
}

/// Path `0 -> customers -> N+1` with its real cost and LP flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Node sequence, depot copies included
    pub path: Vec<usize>,
    /// Sum of arc costs in the node view the route was last priced in
    pub cost: f64,
    /// Value of the route's column in the last RMP solution
    pub q: f64,
}

impl Route {
    pub fn new(path: Vec<usize>) -> Self {
        Route {
            path,
            cost: 0.0,
            q: 0.0,
        }
    }

    /// Depot -> `customer` -> depot, costed in `dist_base`
    pub fn trivial(instance: &Instance, customer: usize) -> Self {
        let mut route = Route::new(vec![0, customer, instance.depot_return()]);
        route.recompute_cost(&instance.dist_base);
        route
    }

    /// Single-customer routes are never filtered out of a node's pool
    #[inline]
    pub fn is_trivial(&self) -> bool {
        self.path.len() <= 3
    }

    /// Consecutive arcs of the path
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.path.windows(2).map(|w| (w[0], w[1]))
    }

    /// Interior nodes
    pub fn customers(&self) -> &[usize] {
        if self.path.len() < 2 {
            return &[];
        }
        &self.path[1..self.path.len() - 1]
    }

    pub fn uses_arc(&self, from: usize, to: usize) -> bool {
        self.arcs().any(|(u, v)| u == from && v == to)
    }

    /// Cost of the path in `dist`
    pub fn cost_in(&self, dist: &[Vec<f64>]) -> f64 {
        self.arcs().map(|(u, v)| dist[u][v]).sum()
    }

    pub fn recompute_cost(&mut self, dist: &[Vec<f64>]) {
        self.cost = self.cost_in(dist);
    }

    /// Covering rows (0-based) of the column
    pub fn rows(&self) -> Vec<usize> {
        self.customers().iter().map(|&c| c - 1).collect()
    }

    pub fn load(&self, instance: &Instance) -> u32 {
        self.customers().iter().map(|&c| instance.demand(c)).sum()
    }

    /// Service start times along the path, computed in `dist_base`.
    pub fn schedule(&self, instance: &Instance) -> Result<Vec<f64>, RouteViolation> {
        let ret = instance.depot_return();
        if self.path.first() != Some(&0) || self.path.last() != Some(&ret) {
            return Err(RouteViolation::Endpoints { expected: ret });
        }
        if self.path.len() < 3 {
            return Err(RouteViolation::Empty);
        }
        if let Some(&bad) = self
            .customers()
            .iter()
            .find(|&&c| c == 0 || c > instance.num_customers)
        {
            return Err(RouteViolation::NotCustomer(bad));
        }

        let mut times = Vec::with_capacity(self.path.len());
        let mut time = instance.nodes[0].ready_time;
        times.push(time);
        for (u, v) in self.arcs() {
            time = instance.arrival_time(time, u, v, instance.distance(u, v));
            let due = instance.nodes[v].due_time;
            if time > due + 1e-9 {
                return Err(RouteViolation::TimeWindow {
                    customer: v,
                    arrival: time,
                    due,
                });
            }
            times.push(time);
        }
        Ok(times)
    }

    /// Structure, time windows and capacity
    pub fn check(&self, instance: &Instance) -> Result<(), RouteViolation> {
        self.schedule(instance)?;
        let load = self.load(instance);
        if load > instance.capacity {
            return Err(RouteViolation::Capacity {
                load,
                capacity: instance.capacity,
            });
        }
        Ok(())
    }

    /// Path rendered as `0-3-7-11`
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (cost {:.2})", self.path_string(), self.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Customer, Instance};

    fn line_instance() -> Instance {
        // depot at 0, customers at x = 1, 2, 3
        let depot = Customer::new(0, 0.0, 0.0, 0, 0.0, 100.0, 0.0);
        let customers = vec![
            Customer::new(1, 1.0, 0.0, 4, 0.0, 100.0, 1.0),
            Customer::new(2, 2.0, 0.0, 4, 0.0, 3.0, 1.0),
            Customer::new(3, 3.0, 0.0, 4, 0.0, 100.0, 1.0),
        ];
        Instance::new("line", 10, depot, customers, Default::default()).unwrap()
    }

    #[test]
    fn test_trivial_route() {
        let instance = line_instance();
        let route = Route::trivial(&instance, 3);
        assert!(route.is_trivial());
        assert_eq!(route.path, vec![0, 3, 4]);
        assert!((route.cost - 6.0).abs() < 1e-12);
        assert_eq!(route.rows(), vec![2]);
    }

    #[test]
    fn test_arcs_and_cost() {
        let instance = line_instance();
        let mut route = Route::new(vec![0, 1, 2, 4]);
        assert!(!route.is_trivial());
        assert!(route.uses_arc(1, 2));
        assert!(!route.uses_arc(2, 1));
        route.recompute_cost(&instance.dist_base);
        assert!((route.cost - 4.0).abs() < 1e-12);
        assert_eq!(route.path_string(), "0-1-2-4");
    }

    #[test]
    fn test_time_window_violation() {
        let instance = line_instance();
        // reach 2 after serving 3 first: 3 + 1 + 1 = 5 > 3
        let route = Route::new(vec![0, 3, 2, 4]);
        assert!(matches!(
            route.check(&instance),
            Err(RouteViolation::TimeWindow { customer: 2, .. })
        ));
        let route = Route::new(vec![0, 1, 2, 3, 4]);
        assert!(matches!(
            route.check(&instance),
            Err(RouteViolation::Capacity { load: 12, capacity: 10 })
        ));
    }

    #[test]
    fn test_schedule() {
        let instance = line_instance();
        let route = Route::new(vec![0, 1, 2, 4]);
        let times = route.schedule(&instance).unwrap();
        assert_eq!(times, vec![0.0, 1.0, 3.0, 6.0]);
        assert!(matches!(
            Route::new(vec![0, 4]).check(&instance),
            Err(RouteViolation::Empty)
        ));
    }
}
