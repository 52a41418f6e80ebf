//! Column generation at one BB node.

use crate::config::{LpBackend, SolverConfig};
use crate::error::LpError;
use crate::instance::Instance;
use crate::lp::create_master;
use crate::pricing::Pricer;
use crate::route::Route;
use crate::view::NodeView;
use log::{debug, warn};
use std::collections::HashSet;

/// Objective reported when the master is infeasible, unbounded or failed
pub const INFEASIBLE_OBJECTIVE: f64 = 1e10;

/// Result of one column generation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgOutcome {
    /// Final RMP objective, or [`INFEASIBLE_OBJECTIVE`]
    pub objective: f64,
    /// Number of RMP solves
    pub iterations: usize,
    /// Priced routes added to the pool
    pub columns_added: usize,
}

impl CgOutcome {
    fn infeasible(iterations: usize, columns_added: usize) -> Self {
        CgOutcome {
            objective: INFEASIBLE_OBJECTIVE,
            iterations,
            columns_added,
        }
    }

    pub fn is_infeasible(&self) -> bool {
        self.objective >= INFEASIBLE_OBJECTIVE
    }
}

pub struct ColumnGeneration<'a> {
    instance: &'a Instance,
    pricer: Pricer<'a>,
    backend: LpBackend,
    max_iterations: Option<usize>,
}

impl<'a> ColumnGeneration<'a> {
    pub fn new(instance: &'a Instance, config: &SolverConfig) -> Self {
        ColumnGeneration {
            instance,
            pricer: Pricer::new(instance, config),
            backend: config.lp_backend,
            max_iterations: config.max_cg_iterations,
        }
    }

    /// Solve the node relaxation defined by `view.dist`, starting from `routes`.
    ///
    /// On return `routes` holds the seed columns, any injected trivial routes
    /// and every priced column, each with its cost in `view.dist` and its value
    /// `q` in the final RMP solution. LP failures are logged and reported as
    /// [`INFEASIBLE_OBJECTIVE`] with every `q` set to zero.
    pub fn run(&self, view: &mut NodeView, routes: &mut Vec<Route>) -> CgOutcome {
        let mut iterations = 0;
        let mut columns_added = 0;
        match self.solve(view, routes, &mut iterations, &mut columns_added) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("LP backend failed after {} CG iterations: {}", iterations, e);
                for route in routes.iter_mut() {
                    route.q = 0.0;
                }
                CgOutcome::infeasible(iterations, columns_added)
            }
        }
    }

    fn solve(
        &self,
        view: &mut NodeView,
        routes: &mut Vec<Route>,
        iterations: &mut usize,
        columns_added: &mut usize,
    ) -> Result<CgOutcome, LpError> {
        self.prepare_seed(view, routes);

        let mut known: HashSet<Vec<usize>> = routes.iter().map(|r| r.path.clone()).collect();
        let mut master = create_master(self.backend, self.instance.num_customers)?;
        for route in routes.iter() {
            master.add_column(route.cost, &route.rows())?;
        }

        loop {
            *iterations += 1;
            let status = master.optimize()?;
            if !status.is_optimal() {
                debug!("CG iter {} | RMP {:?}", iterations, status);
                for route in routes.iter_mut() {
                    route.q = 0.0;
                }
                return Ok(CgOutcome::infeasible(*iterations, *columns_added));
            }
            let objective = master.objective()?;
            debug!(
                "CG iter {} | obj {:.4} | routes {}",
                iterations,
                objective,
                routes.len()
            );
            if self.max_iterations.map_or(false, |cap| *iterations >= cap) {
                break;
            }

            let duals = master.duals()?;
            view.update_reduced_costs(&duals);

            let mut added = 0;
            for priced in self.pricer.price(view) {
                if !known.insert(priced.path.clone()) {
                    continue;
                }
                let mut route = Route::new(priced.path);
                route.recompute_cost(&view.dist);
                master.add_column(route.cost, &route.rows())?;
                routes.push(route);
                added += 1;
            }
            *columns_added += added;
            if added == 0 {
                break;
            }
        }

        let values = master.primal_values()?;
        for (route, q) in routes.iter_mut().zip(values) {
            route.q = q;
        }
        Ok(CgOutcome {
            objective: master.objective()?,
            iterations: *iterations,
            columns_added: *columns_added,
        })
    }

    /// Cost carried routes in the node's `dist` and add the trivial route of
    /// every customer that has none.
    fn prepare_seed(&self, view: &NodeView, routes: &mut Vec<Route>) {
        let mut has_trivial = vec![false; self.instance.num_nodes()];
        for route in routes.iter_mut() {
            route.recompute_cost(&view.dist);
            route.q = 0.0;
            if route.is_trivial() {
                if let Some(&c) = route.customers().first() {
                    has_trivial[c] = true;
                }
            }
        }
        for c in self.instance.customers() {
            if !has_trivial[c] {
                let mut route = Route::trivial(self.instance, c);
                route.recompute_cost(&view.dist);
                routes.push(route);
            }
        }
        debug_assert!(routes.iter().all(|r| (r.cost - r.cost_in(&view.dist)).abs() < 1e-9));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Customer, GeneratorConfig};
    use crate::view::ArcFix;

    fn square_instance() -> Instance {
        let depot = Customer::new(0, 0.0, 0.0, 0, 0.0, 1000.0, 0.0);
        let customers = vec![
            Customer::new(1, 10.0, 0.0, 5, 0.0, 1000.0, 1.0),
            Customer::new(2, 10.0, 10.0, 5, 0.0, 1000.0, 1.0),
            Customer::new(3, 0.0, 10.0, 5, 0.0, 1000.0, 1.0),
        ];
        Instance::new("square", 10, depot, customers, Default::default()).unwrap()
    }

    fn coverage(routes: &[Route], customer: usize) -> f64 {
        routes
            .iter()
            .filter(|r| r.customers().contains(&customer))
            .map(|r| r.q)
            .sum()
    }

    #[test]
    fn test_single_customer() {
        let depot = Customer::new(0, 0.0, 0.0, 0, 0.0, 100.0, 0.0);
        let customers = vec![Customer::new(1, 3.0, 4.0, 1, 0.0, 100.0, 0.0)];
        let instance = Instance::new("one", 10, depot, customers, Default::default()).unwrap();
        let cg = ColumnGeneration::new(&instance, &SolverConfig::default());
        let mut view = NodeView::new(&instance);
        let mut routes = Vec::new();
        let outcome = cg.run(&mut view, &mut routes);
        assert!((outcome.objective - 10.0).abs() < 1e-9);
        assert_eq!(routes.len(), 1);
        assert!((routes[0].q - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_square() {
        let instance = square_instance();
        let cg = ColumnGeneration::new(&instance, &SolverConfig::default());
        let mut view = NodeView::new(&instance);
        let mut routes = Vec::new();
        let outcome = cg.run(&mut view, &mut routes);

        let pair = 20.0 + 200f64.sqrt();
        assert!((outcome.objective - 1.5 * pair).abs() < 1e-6);
        assert!(outcome.columns_added > 0);
        for c in instance.customers() {
            assert!(coverage(&routes, c) >= 1.0 - 1e-6);
        }
        let value: f64 = routes.iter().map(|r| r.cost * r.q).sum();
        assert!((value - outcome.objective).abs() < 1e-6);
    }

    #[test]
    fn test_seed_routes_are_not_duplicated() {
        let instance = square_instance();
        let cg = ColumnGeneration::new(&instance, &SolverConfig::default());
        let mut view = NodeView::new(&instance);
        let mut routes = vec![Route::trivial(&instance, 2), Route::new(vec![0, 1, 2, 4])];
        cg.run(&mut view, &mut routes);

        let mut paths: Vec<_> = routes.iter().map(|r| r.path.clone()).collect();
        let total = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), total);
        for c in instance.customers() {
            assert_eq!(
                routes.iter().filter(|r| r.is_trivial() && r.path[1] == c).count(),
                1
            );
        }
    }

    #[test]
    fn test_isolated_customer_exceeds_route_cap() {
        let instance = square_instance();
        let cg = ColumnGeneration::new(&instance, &SolverConfig::default());
        let mut view = NodeView::new(&instance);
        view.install(
            &instance,
            &[ArcFix::forbid(0, 1), ArcFix::forbid(2, 1), ArcFix::forbid(3, 1)],
        );
        let mut routes = Vec::new();
        let outcome = cg.run(&mut view, &mut routes);
        assert!(outcome.objective > 2.0 * instance.max_route_length);
    }

    #[test]
    fn test_columns_respect_fixes() {
        let instance = Instance::random("fixes", 8, 4, &GeneratorConfig::default()).unwrap();
        let cg = ColumnGeneration::new(&instance, &SolverConfig::default());
        let mut view = NodeView::new(&instance);
        view.install(&instance, &[ArcFix::impose(0, 3), ArcFix::forbid(1, 2)]);
        let mut routes = Vec::new();
        cg.run(&mut view, &mut routes);
        for route in routes.iter().filter(|r| !r.is_trivial()) {
            assert!(view.allows(route), "{} uses a forbidden arc", route);
        }
    }

    #[test]
    fn test_iteration_cap() {
        let instance = Instance::random("cap", 8, 4, &GeneratorConfig::default()).unwrap();
        let config = SolverConfig {
            max_cg_iterations: Some(1),
            ..Default::default()
        };
        let cg = ColumnGeneration::new(&instance, &config);
        let mut view = NodeView::new(&instance);
        let mut routes = Vec::new();
        let outcome = cg.run(&mut view, &mut routes);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.columns_added, 0);
        assert_eq!(routes.len(), instance.num_customers);
    }

    #[cfg(not(feature = "gurobi"))]
    #[test]
    fn test_backend_failure_is_infeasible() {
        let instance = square_instance();
        let config = SolverConfig {
            lp_backend: LpBackend::Gurobi,
            ..Default::default()
        };
        let cg = ColumnGeneration::new(&instance, &config);
        let mut view = NodeView::new(&instance);
        let mut routes = Vec::new();
        let outcome = cg.run(&mut view, &mut routes);
        assert!(outcome.is_infeasible());
        assert!(routes.iter().all(|r| r.q == 0.0));
    }
}
