//! Solution representation and validation for the VRPTW.
//!
//! A solution is a set of routes, each leaving the depot origin and ending at
//! the depot copy `N+1`. It is feasible when every customer is served exactly
//! once and every route respects time windows and vehicle capacity.

use crate::instance::Instance;
use crate::route::{Route, RouteViolation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a route set is not a feasible VRPTW solution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolutionViolation {
    #[error("customer {0} is not served")]
    Uncovered(usize),

    #[error("customer {customer} is served {times} times")]
    Repeated { customer: usize, times: usize },

    #[error("route {index}: {violation}")]
    Route {
        index: usize,
        violation: RouteViolation,
    },
}

/// Represents a solution to the VRPTW
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Vehicle routes
    pub routes: Vec<Route>,
    /// Total travel cost in base distances
    pub cost: f64,
    /// Whether the route set passed validation
    pub feasible: bool,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            routes: Vec::new(),
            cost: f64::INFINITY,
            feasible: false,
            algorithm: String::new(),
            computation_time: 0.0,
        }
    }

    /// Build a solution from routes, recosting them in `dist_base`.
    pub fn from_routes(instance: &Instance, routes: Vec<Route>, algorithm: &str) -> Self {
        let mut solution = Solution {
            routes,
            cost: 0.0,
            feasible: false,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        };
        solution.validate(instance);
        solution
    }

    /// Recompute route costs and the feasibility flag
    pub fn validate(&mut self, instance: &Instance) {
        for route in &mut self.routes {
            route.recompute_cost(&instance.dist_base);
        }
        self.cost = self.routes.iter().map(|r| r.cost).sum();
        self.feasible = !self.routes.is_empty() && self.violations(instance).is_empty();
    }

    /// Every reason the route set fails to be a feasible solution
    pub fn violations(&self, instance: &Instance) -> Vec<SolutionViolation> {
        let mut visits = vec![0usize; instance.num_nodes()];
        let mut violations = Vec::new();

        for (index, route) in self.routes.iter().enumerate() {
            if let Err(violation) = route.check(instance) {
                violations.push(SolutionViolation::Route { index, violation });
            }
            for &c in route.customers() {
                if c < visits.len() {
                    visits[c] += 1;
                }
            }
        }
        for c in instance.customers() {
            match visits[c] {
                0 => violations.push(SolutionViolation::Uncovered(c)),
                1 => {}
                times => violations.push(SolutionViolation::Repeated { customer: c, times }),
            }
        }
        violations
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Load of each route
    pub fn loads(&self, instance: &Instance) -> Vec<u32> {
        self.routes.iter().map(|r| r.load(instance)).collect()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Routes: {}", self.routes.len())?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        for (k, route) in self.routes.iter().enumerate() {
            writeln!(f, "  #{:<3} {}", k + 1, route)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Customer;

    fn line_instance() -> Instance {
        let depot = Customer::new(0, 0.0, 0.0, 0, 0.0, 100.0, 0.0);
        let customers = vec![
            Customer::new(1, 1.0, 0.0, 4, 0.0, 100.0, 1.0),
            Customer::new(2, 2.0, 0.0, 4, 0.0, 100.0, 1.0),
            Customer::new(3, 3.0, 0.0, 4, 0.0, 100.0, 1.0),
        ];
        Instance::new("line", 10, depot, customers, Default::default()).unwrap()
    }

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.routes.is_empty());
        assert!(!sol.feasible);
        assert_eq!(sol.cost, f64::INFINITY);
    }

    #[test]
    fn test_feasible_solution() {
        let instance = line_instance();
        let routes = vec![Route::new(vec![0, 1, 2, 4]), Route::new(vec![0, 3, 4])];
        let sol = Solution::from_routes(&instance, routes, "test");
        assert!(sol.feasible);
        assert!((sol.cost - 10.0).abs() < 1e-12);
        assert_eq!(sol.loads(&instance), vec![8, 4]);
    }

    #[test]
    fn test_violations() {
        let instance = line_instance();
        let routes = vec![Route::new(vec![0, 1, 2, 4]), Route::new(vec![0, 2, 4])];
        let sol = Solution::from_routes(&instance, routes, "test");
        assert!(!sol.feasible);
        let violations = sol.violations(&instance);
        assert!(violations.contains(&SolutionViolation::Uncovered(3)));
        assert!(violations.contains(&SolutionViolation::Repeated { customer: 2, times: 2 }));

        let overloaded = Solution::from_routes(&instance, vec![Route::new(vec![0, 1, 2, 3, 4])], "test");
        assert!(matches!(
            overloaded.violations(&instance)[0],
            SolutionViolation::Route { index: 0, .. }
        ));
    }
}
