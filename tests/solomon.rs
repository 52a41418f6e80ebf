//! Published optima of the Solomon C1/C2 instances. These take minutes each,
//! so they are ignored by default:
//!
//! ```text
//! VRPTW_DATASET_DIR=data cargo test --release --test solomon -- --ignored
//! ```

use vrptw_bp::benchmark::{known_optimum, resolve_dataset_path, DEFAULT_DATASETS};
use vrptw_bp::instance::LoadOptions;
use vrptw_bp::{BranchAndPrice, Instance, SearchStrategy, SolverConfig};

fn solve_dataset(name: &str) {
    let Ok(dir) = std::env::var("VRPTW_DATASET_DIR") else {
        eprintln!("VRPTW_DATASET_DIR not set, skipping {}", name);
        return;
    };
    let path = resolve_dataset_path(&dir, name)
        .unwrap_or_else(|| panic!("{} not found in {}", name, dir));
    let instance = Instance::from_solomon_file(&path, &LoadOptions::default()).unwrap();
    let expected = known_optimum(name).unwrap();

    let solver = BranchAndPrice::new(&instance, SolverConfig::default()).unwrap();
    for strategy in SearchStrategy::all() {
        let result = solver.solve(strategy);
        assert!(result.status.is_solved(), "{} {}: {}", name, strategy, result.status);
        assert!(result.solution.violations(&instance).is_empty());
        let tolerance = 0.01_f64.max(instance.gap * expected);
        assert!(
            (result.upper_bound - expected).abs() <= tolerance,
            "{} {}: {:.2} vs {:.2}",
            name,
            strategy,
            result.upper_bound,
            expected
        );
    }
}

#[test]
#[ignore]
fn solomon_clustered_instances() {
    for name in DEFAULT_DATASETS {
        solve_dataset(name);
    }
}
