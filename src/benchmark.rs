//! Benchmarking harness for the branch-and-price solver.
//!
//! Runs every search strategy on a list of Solomon datasets, collects one
//! summary row per run and one row per route, and writes both tables as CSV.

use crate::bnb::{BranchAndPrice, BranchAndPriceResult, SearchStrategy};
use crate::config::SolverConfig;
use crate::error::InstanceError;
use crate::instance::{Instance, InstanceOverrides, LoadOptions};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Solomon datasets solved when none are given
pub const DEFAULT_DATASETS: [&str; 14] = [
    "c104", "c105", "c106", "c107", "c108", "c109", "c201", "c202", "c203", "c204", "c205", "c206",
    "c207", "c208",
];

/// Published optimum of a Solomon 100-customer instance
pub fn known_optimum(dataset: &str) -> Option<f64> {
    let value = match dataset.to_ascii_lowercase().as_str() {
        "c104" => 824.78,
        "c105" => 828.94,
        "c106" | "c107" | "c108" | "c109" => 827.30,
        "c201" | "c202" => 591.56,
        "c203" => 591.17,
        "c204" => 590.60,
        "c205" => 588.88,
        "c206" => 588.49,
        "c207" => 588.29,
        "c208" => 588.32,
        _ => return None,
    };
    Some(value)
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Directory holding the dataset files
    pub data_dir: PathBuf,
    /// Dataset names, resolved against `data_dir`
    pub datasets: Vec<String>,
    /// Strategies run on every dataset, in this order
    pub strategies: Vec<SearchStrategy>,
    /// Solver configuration shared by every run
    pub solver: SolverConfig,
    /// Loader options
    pub load: LoadOptions,
    /// Gap, route-length cap and forbidden-arc cost applied to every dataset
    pub overrides: InstanceOverrides,
    /// Solve datasets in parallel (one search per thread)
    pub parallel: bool,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            data_dir: PathBuf::from("data"),
            datasets: DEFAULT_DATASETS.iter().map(|s| s.to_string()).collect(),
            strategies: SearchStrategy::all().to_vec(),
            solver: SolverConfig::default(),
            load: LoadOptions::default(),
            overrides: InstanceOverrides::default(),
            parallel: false,
            show_progress: true,
        }
    }
}

/// One row of `summary.csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SummaryRecord {
    pub dataset: String,
    pub algorithm: String,
    pub status: String,
    pub time_sec: f64,
    pub best_cost: Option<f64>,
    pub num_routes: usize,
    /// Empty unless the run failed before searching
    pub error: String,
    pub lower_bound: Option<f64>,
    pub nodes: usize,
    pub known_optimum: Option<f64>,
    /// Relative distance of `best_cost` to the published optimum
    pub gap_to_known: Option<f64>,
    pub timestamp: String,
}

/// One row of `routes.csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteRecord {
    pub dataset: String,
    pub algorithm: String,
    pub route_id: Option<usize>,
    pub route_cost: Option<f64>,
    /// `0-3-7-11`, `NO_ROUTES` or `ERROR: ...`
    pub path: String,
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    summaries: Vec<SummaryRecord>,
    routes: Vec<RouteRecord>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            summaries: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Run every strategy on every dataset. Rows keep the dataset order
    /// even when datasets are solved in parallel.
    pub fn run(&mut self) {
        let total = (self.config.datasets.len() * self.config.strategies.len()) as u64;
        let pb = if self.config.show_progress {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let runs: Vec<(Vec<SummaryRecord>, Vec<RouteRecord>)> = if self.config.parallel {
            self.config
                .datasets
                .par_iter()
                .map(|name| self.run_dataset(name, &pb))
                .collect()
        } else {
            self.config
                .datasets
                .iter()
                .map(|name| self.run_dataset(name, &pb))
                .collect()
        };
        pb.finish_and_clear();

        for (summaries, routes) in runs {
            self.summaries.extend(summaries);
            self.routes.extend(routes);
        }
    }

    /// Load one dataset and run every strategy on it
    fn run_dataset(&self, name: &str, pb: &ProgressBar) -> (Vec<SummaryRecord>, Vec<RouteRecord>) {
        let instance = match self.load(name) {
            Ok(instance) => instance,
            Err(e) => return self.failed(name, &e.to_string(), pb),
        };
        let solver = match BranchAndPrice::new(&instance, self.config.solver.clone()) {
            Ok(solver) => solver,
            Err(e) => return self.failed(name, &e.to_string(), pb),
        };

        let mut summaries = Vec::new();
        let mut routes = Vec::new();
        for strategy in &self.config.strategies {
            pb.set_message(format!("{} {}", name, strategy));
            let result = solver.solve(*strategy);
            log::info!(
                "{} {}: {} cost={:.2} time={:.2}s",
                name,
                strategy,
                result.status,
                result.upper_bound,
                result.computation_time
            );
            summaries.push(Self::summary_record(name, &result));
            routes.extend(Self::route_records(name, &result));
            pb.inc(1);
        }

        (summaries, routes)
    }

    /// Error rows for every strategy of a dataset that could not be solved
    fn failed(
        &self,
        name: &str,
        message: &str,
        pb: &ProgressBar,
    ) -> (Vec<SummaryRecord>, Vec<RouteRecord>) {
        log::error!("{}: {}", name, message);
        let mut summaries = Vec::new();
        let mut routes = Vec::new();
        for strategy in &self.config.strategies {
            summaries.push(Self::error_record(name, *strategy, message));
            routes.push(RouteRecord {
                dataset: name.to_string(),
                algorithm: strategy.name().to_string(),
                route_id: None,
                route_cost: None,
                path: format!("ERROR: {}", message),
            });
            pb.inc(1);
        }
        (summaries, routes)
    }

    /// Resolve and parse a dataset, applying the instance overrides
    pub fn load(&self, name: &str) -> Result<Instance, InstanceError> {
        let path = resolve_dataset_path(&self.config.data_dir, name).ok_or_else(|| {
            InstanceError::NotFound {
                name: name.to_string(),
                dir: self.config.data_dir.display().to_string(),
            }
        })?;
        let instance = Instance::from_solomon_file(&path, &self.config.load)?;
        Ok(instance.with_overrides(&self.config.overrides))
    }

    fn summary_record(dataset: &str, result: &BranchAndPriceResult) -> SummaryRecord {
        let best_cost = result.upper_bound.is_finite().then_some(result.upper_bound);
        let known = known_optimum(dataset);
        let gap_to_known = match (best_cost, known) {
            (Some(cost), Some(opt)) if opt > 0.0 => Some((cost - opt) / opt),
            _ => None,
        };
        SummaryRecord {
            dataset: dataset.to_string(),
            algorithm: result.strategy.name().to_string(),
            status: result.status.to_string(),
            time_sec: result.computation_time,
            best_cost,
            num_routes: result.solution.num_routes(),
            error: String::new(),
            lower_bound: result.lower_bound.is_finite().then_some(result.lower_bound),
            nodes: result.statistics.nodes_solved,
            known_optimum: known,
            gap_to_known,
            timestamp: timestamp(),
        }
    }

    fn route_records(dataset: &str, result: &BranchAndPriceResult) -> Vec<RouteRecord> {
        let algorithm = result.strategy.name().to_string();
        if result.solution.routes.is_empty() {
            return vec![RouteRecord {
                dataset: dataset.to_string(),
                algorithm,
                route_id: None,
                route_cost: None,
                path: "NO_ROUTES".to_string(),
            }];
        }
        result
            .solution
            .routes
            .iter()
            .enumerate()
            .map(|(k, route)| RouteRecord {
                dataset: dataset.to_string(),
                algorithm: algorithm.clone(),
                route_id: Some(k + 1),
                route_cost: Some(route.cost),
                path: route.path_string(),
            })
            .collect()
    }

    fn error_record(dataset: &str, strategy: SearchStrategy, message: &str) -> SummaryRecord {
        SummaryRecord {
            dataset: dataset.to_string(),
            algorithm: strategy.name().to_string(),
            status: "Error".to_string(),
            time_sec: 0.0,
            best_cost: None,
            num_routes: 0,
            error: message.to_string(),
            lower_bound: None,
            nodes: 0,
            known_optimum: known_optimum(dataset),
            gap_to_known: None,
            timestamp: timestamp(),
        }
    }

    /// Export summary rows to CSV
    pub fn export_summary_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for record in &self.summaries {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export route rows to CSV
    pub fn export_routes_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for record in &self.routes {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("     VRPTW Branch-and-Price Report\n");
        report.push_str("========================================\n\n");

        report.push_str(&format!(
            "{:<10} {:<18} {:<11} {:>10} {:>10} {:>7} {:>7} {:>10}\n",
            "Dataset", "Algorithm", "Status", "Cost", "Known", "Routes", "Nodes", "Time"
        ));
        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        for record in &self.summaries {
            let cost = record
                .best_cost
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string());
            let known = record
                .known_optimum
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string());
            report.push_str(&format!(
                "{:<10} {:<18} {:<11} {:>10} {:>10} {:>7} {:>7} {:>10.3}\n",
                record.dataset,
                record.algorithm,
                record.status,
                cost,
                known,
                record.num_routes,
                record.nodes,
                record.time_sec
            ));
            if !record.error.is_empty() {
                report.push_str(&format!("    error: {}\n", record.error));
            }
        }

        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        report.push_str("\nPer algorithm:\n");
        let mut per_algorithm: BTreeMap<&str, (usize, usize, f64)> = BTreeMap::new();
        for record in &self.summaries {
            let entry = per_algorithm.entry(record.algorithm.as_str()).or_insert((0, 0, 0.0));
            entry.0 += 1;
            if record.status == "Optimal" || record.status == "GapReached" {
                entry.1 += 1;
            }
            entry.2 += record.time_sec;
        }
        for (algorithm, (runs, solved, time)) in &per_algorithm {
            report.push_str(&format!(
                "  {}: solved {}/{} in {:.2}s\n",
                algorithm, solved, runs, time
            ));
        }

        report
    }

    /// Get summary rows
    pub fn summaries(&self) -> &[SummaryRecord] {
        &self.summaries
    }

    /// Get route rows
    pub fn routes(&self) -> &[RouteRecord] {
        &self.routes
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Find the file of `name` in `dir`, trying lower/upper case and `.txt`/`.TXT`.
pub fn resolve_dataset_path<P: AsRef<Path>>(dir: P, name: &str) -> Option<PathBuf> {
    let dir = dir.as_ref();
    let stems = [
        name.to_string(),
        name.to_ascii_lowercase(),
        name.to_ascii_uppercase(),
    ];
    for stem in &stems {
        for suffix in ["", ".txt", ".TXT"] {
            let candidate = dir.join(format!("{}{}", stem, suffix));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
