//! Restricted master LP backends.
//!
//! The master is a set-covering LP: one `>= 1` row per customer and one
//! non-negative continuous column per route. Columns are only ever appended,
//! and every backend keeps its previous basis across calls to
//! [`MasterLp::optimize`].

pub mod microlp;

// When built with the `gurobi` feature, expose the Gurobi master
#[cfg(feature = "gurobi")]
pub mod gurobi;

use crate::config::LpBackend;
use crate::error::LpError;

/// Outcome of an optimize call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    InfeasibleOrUnbounded,
}

impl LpStatus {
    pub fn is_optimal(self) -> bool {
        self == LpStatus::Optimal
    }
}

/// Minimal master surface needed by column generation. Dropping the value
/// releases the model.
pub trait MasterLp {
    /// Append a column with objective `cost` and a coefficient 1 in each of `rows`
    /// (a repeated row adds up). Returns the column index.
    fn add_column(&mut self, cost: f64, rows: &[usize]) -> Result<usize, LpError>;

    fn optimize(&mut self) -> Result<LpStatus, LpError>;

    /// Objective of the last optimal solve
    fn objective(&self) -> Result<f64, LpError>;

    /// Dual value of each covering row
    fn duals(&self) -> Result<Vec<f64>, LpError>;

    /// Value of each column, in insertion order
    fn primal_values(&self) -> Result<Vec<f64>, LpError>;

    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;
}

/// Create an empty master with `num_rows` covering rows.
pub fn create_master(backend: LpBackend, num_rows: usize) -> Result<Box<dyn MasterLp>, LpError> {
    match backend {
        LpBackend::Microlp => Ok(Box::new(microlp::MicrolpMaster::new(num_rows))),
        #[cfg(feature = "gurobi")]
        LpBackend::Gurobi => Ok(Box::new(gurobi::GurobiMaster::new(num_rows)?)),
        #[cfg(not(feature = "gurobi"))]
        LpBackend::Gurobi => Err(LpError::Unavailable("gurobi")),
    }
}

/// Fail early when `backend` is not compiled in.
pub fn check_backend(backend: LpBackend) -> Result<(), LpError> {
    match backend {
        LpBackend::Microlp => Ok(()),
        #[cfg(feature = "gurobi")]
        LpBackend::Gurobi => Ok(()),
        #[cfg(not(feature = "gurobi"))]
        LpBackend::Gurobi => Err(LpError::Unavailable("gurobi")),
    }
}
