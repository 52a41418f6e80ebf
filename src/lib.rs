//! VRPTW Branch-and-Price Library
//!
//! An exact solver for the Vehicle Routing Problem with Time Windows (VRPTW)
//! based on column generation inside a branch-and-bound tree.
//!
//! # Features
//!
//! - Set-covering restricted master solved with the `microlp` simplex, or by
//!   Gurobi with the `gurobi` feature
//! - Elementary shortest path with resource constraints (ESPPRC) pricing by
//!   label setting, with an optional non-elementary relaxation
//! - Branching on the most fractional arc flow (forbid / impose)
//! - Best-first (priority queue) and depth-first (recursive) tree search
//! - Solomon loader, benchmarking harness and SVG output
//!
//! # Example
//!
//! ```no_run
//! use vrptw_bp::instance::{Instance, LoadOptions};
//! use vrptw_bp::bnb::{BranchAndPrice, SearchStrategy};
//! use vrptw_bp::config::SolverConfig;
//!
//! // Load instance
//! let instance = Instance::from_solomon_file("c101.txt", &LoadOptions::default()).unwrap();
//!
//! // Solve with best-first search
//! let solver = BranchAndPrice::new(&instance, SolverConfig::default()).unwrap();
//! let result = solver.solve(SearchStrategy::BestFirst);
//!
//! println!("Best cost: {:.2} ({})", result.upper_bound, result.status);
//! ```

pub mod benchmark;
pub mod bnb;
pub mod branching;
pub mod colgen;
pub mod config;
pub mod error;
pub mod instance;
pub mod lp;
pub mod pricing;
pub mod route;
pub mod solution;
pub mod view;
pub mod visualization;

pub use bnb::{BranchAndPrice, BranchAndPriceResult, SearchStatus, SearchStrategy};
pub use config::SolverConfig;
pub use error::SolverError;
pub use instance::Instance;
pub use route::Route;
pub use solution::Solution;
