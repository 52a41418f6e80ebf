//! Solver configuration.
//!
//! Instance-level tolerances (`gap`, `max_route_length`, `very_big`) live on
//! the [`Instance`](crate::instance::Instance); everything that tunes the
//! algorithm lives here and can be loaded from a JSON file.

use crate::error::SolverError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Relaxation solved by the pricing subproblem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Elementarity {
    /// ESPPRC: labels carry the set of visited customers
    #[default]
    Elementary,
    /// SPPRC: cycles allowed, weaker bound, faster pricing
    NonElementary,
}

/// Which LP engine solves the restricted master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LpBackend {
    /// Pure-Rust simplex from the `microlp` crate
    #[default]
    Microlp,
    /// Gurobi through the `grb` crate (requires the `gurobi` feature)
    Gurobi,
}

impl std::fmt::Display for LpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LpBackend::Microlp => write!(f, "microlp"),
            LpBackend::Gurobi => write!(f, "gurobi"),
        }
    }
}

/// Branch-and-price configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Pricing relaxation
    pub elementarity: Elementarity,
    /// Maximum number of columns returned by one pricing call (None = number of customers)
    pub max_routes_per_pricing: Option<usize>,
    /// A priced route is kept only if its reduced cost is below `-reduced_cost_tolerance`
    pub reduced_cost_tolerance: f64,
    /// Restricted master backend
    pub lp_backend: LpBackend,
    /// Wall-clock limit in seconds, checked between BB nodes
    pub time_limit: Option<f64>,
    /// Hard cap on CG iterations per node. Capping makes node values heuristic.
    pub max_cg_iterations: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            elementarity: Elementarity::Elementary,
            max_routes_per_pricing: None,
            reduced_cost_tolerance: 1e-6,
            lp_backend: LpBackend::Microlp,
            time_limit: None,
            max_cg_iterations: None,
        }
    }
}

impl SolverConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SolverError> {
        let reader = BufReader::new(File::open(path)?);
        let config: SolverConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the search meaningless.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.reduced_cost_tolerance >= 0.0) {
            return Err(SolverError::Config(format!(
                "reduced_cost_tolerance must be non-negative, got {}",
                self.reduced_cost_tolerance
            )));
        }
        if self.max_routes_per_pricing == Some(0) {
            return Err(SolverError::Config(
                "max_routes_per_pricing must be at least 1".to_string(),
            ));
        }
        if let Some(limit) = self.time_limit {
            if !(limit > 0.0) {
                return Err(SolverError::Config(format!(
                    "time_limit must be positive, got {}",
                    limit
                )));
            }
        }
        Ok(())
    }

    /// Number of columns a pricing call may return on an instance with `num_customers`.
    pub fn routes_per_pricing(&self, num_customers: usize) -> usize {
        self.max_routes_per_pricing
            .unwrap_or(num_customers)
            .max(1)
    }
}
