//! VRPTW Branch-and-Price - Command Line Interface
//!
//! Exact solver for the Vehicle Routing Problem with Time Windows.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use vrptw_bp::benchmark::{Benchmark, BenchmarkConfig, DEFAULT_DATASETS};
use vrptw_bp::bnb::{BranchAndPrice, BranchAndPriceResult, SearchStrategy};
use vrptw_bp::config::{Elementarity, LpBackend, SolverConfig};
use vrptw_bp::instance::{
    DistancePrecision, GeneratorConfig, Instance, InstanceOverrides, LoadOptions,
};
use vrptw_bp::visualization::{generate_comparison_data, Visualizer};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "vrptw-bp")]
#[command(version = "1.0")]
#[command(about = "Exact branch-and-price solver for the VRPTW")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that loads and solves instances
#[derive(clap::Args, Clone)]
struct SolverArgs {
    /// JSON solver configuration (fields left out take their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relative optimality gap
    #[arg(long)]
    gap: Option<f64>,

    /// Route-length cap used by the relaxation-infeasibility test
    #[arg(long)]
    max_route_length: Option<f64>,

    /// Cost given to forbidden arcs
    #[arg(long)]
    very_big: Option<f64>,

    /// Restricted master backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Solve the SPPRC relaxation instead of the ESPPRC
    #[arg(long)]
    non_elementary: bool,

    /// Wall-clock limit per search in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Keep only the first K customers
    #[arg(long)]
    max_customers: Option<usize>,

    /// Truncate distances to one decimal
    #[arg(long)]
    truncate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance
    Solve {
        /// Solomon-format instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Search strategy
        #[arg(short, long, value_enum, default_value = "both")]
        strategy: Strategy,

        #[command(flatten)]
        solver: SolverArgs,

        /// Write the results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write an SVG route map of the best solution
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Write an SVG schedule chart of the best solution
        #[arg(long)]
        schedule_svg: Option<PathBuf>,

        /// Write node and route data of the best solution for external plotting
        #[arg(long)]
        plot_data: Option<PathBuf>,
    },

    /// Run both strategies on a list of Solomon datasets
    Benchmark {
        /// Directory containing the dataset files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Dataset names (default: c104-c109, c201-c208)
        #[arg(long, value_delimiter = ',')]
        datasets: Option<Vec<String>>,

        #[command(flatten)]
        solver: SolverArgs,

        /// Solve datasets in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Print instance statistics
    Analyze {
        #[arg(short, long)]
        instance: PathBuf,

        /// Keep only the first K customers
        #[arg(long)]
        max_customers: Option<usize>,
    },

    /// Write a random Solomon-format instance
    Generate {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of customers
        #[arg(short, long, default_value = "10")]
        customers: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Vehicle capacity
        #[arg(long, default_value = "200")]
        capacity: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Both,
    BestFirst,
    DepthFirst,
}

impl Strategy {
    fn strategies(self) -> Vec<SearchStrategy> {
        match self {
            Strategy::Both => SearchStrategy::all().to_vec(),
            Strategy::BestFirst => vec![SearchStrategy::BestFirst],
            Strategy::DepthFirst => vec![SearchStrategy::DepthFirst],
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Microlp,
    Gurobi,
}

impl SolverArgs {
    fn solver_config(&self) -> Result<SolverConfig> {
        let mut config = match &self.config {
            Some(path) => SolverConfig::from_file(path)
                .with_context(|| format!("loading solver configuration {}", path.display()))?,
            None => SolverConfig::default(),
        };
        if let Some(backend) = self.backend {
            config.lp_backend = match backend {
                Backend::Microlp => LpBackend::Microlp,
                Backend::Gurobi => LpBackend::Gurobi,
            };
        }
        if self.non_elementary {
            config.elementarity = Elementarity::NonElementary;
        }
        if self.time_limit.is_some() {
            config.time_limit = self.time_limit;
        }
        config.validate()?;
        Ok(config)
    }

    fn overrides(&self) -> InstanceOverrides {
        InstanceOverrides {
            gap: self.gap,
            max_route_length: self.max_route_length,
            very_big: self.very_big,
        }
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            max_customers: self.max_customers,
            precision: if self.truncate {
                DistancePrecision::Truncated
            } else {
                DistancePrecision::Exact
            },
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            strategy,
            solver,
            output,
            svg,
            schedule_svg,
            plot_data,
        } => {
            let drawings = Drawings {
                svg,
                schedule_svg,
                plot_data,
            };
            solve_instance(&instance, strategy, &solver, output, drawings)
        }

        Commands::Benchmark {
            dir,
            output,
            datasets,
            solver,
            parallel,
        } => run_benchmark(dir, &output, datasets, &solver, parallel),

        Commands::Analyze {
            instance,
            max_customers,
        } => analyze_instance(&instance, max_customers),

        Commands::Generate {
            output,
            customers,
            seed,
            capacity,
        } => generate_instance(&output, customers, seed, capacity),
    }
}

/// Files drawn from the best solution of a `solve` run
struct Drawings {
    svg: Option<PathBuf>,
    schedule_svg: Option<PathBuf>,
    plot_data: Option<PathBuf>,
}

impl Drawings {
    fn is_empty(&self) -> bool {
        self.svg.is_none() && self.schedule_svg.is_none() && self.plot_data.is_none()
    }
}

fn solve_instance(
    path: &Path,
    strategy: Strategy,
    args: &SolverArgs,
    output: Option<PathBuf>,
    drawings: Drawings,
) -> Result<()> {
    println!("Loading instance from {:?}...", path);
    let instance = Instance::from_solomon_file(path, &args.load_options())
        .with_context(|| format!("loading instance {}", path.display()))?
        .with_overrides(&args.overrides());
    println!("{}", instance.statistics());

    let config = args.solver_config()?;
    let solver = BranchAndPrice::new(&instance, config)?;

    let mut results: Vec<BranchAndPriceResult> = Vec::new();
    for strategy in strategy.strategies() {
        println!("Solving with {}...", strategy);
        let result = solver.solve(strategy);
        print_result(&instance, &result);
        results.push(result);
    }

    if results.len() > 1 {
        print!("\n{}", generate_comparison_data(&results));
    }

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&results)?;
        std::fs::write(&output, json)
            .with_context(|| format!("writing results to {}", output.display()))?;
        println!("Results saved to {:?}", output);
    }

    if !drawings.is_empty() {
        let best = results
            .iter()
            .filter(|r| !r.solution.routes.is_empty())
            .min_by(|a, b| a.upper_bound.total_cmp(&b.upper_bound));
        match best {
            Some(result) => draw_solution(&instance, result, &drawings)?,
            None => println!("No solution to draw"),
        }
    }

    Ok(())
}

fn draw_solution(instance: &Instance, result: &BranchAndPriceResult, drawings: &Drawings) -> Result<()> {
    let viz = Visualizer::new();
    let solution = &result.solution;
    if let Some(path) = &drawings.svg {
        viz.save_svg(&viz.generate_svg(instance, solution), path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Route map saved to {:?}", path);
    }
    if let Some(path) = &drawings.schedule_svg {
        viz.save_svg(&viz.generate_schedule_svg(instance, solution), path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Schedule chart saved to {:?}", path);
    }
    if let Some(path) = &drawings.plot_data {
        std::fs::write(path, viz.export_plot_data(instance, solution))
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Plot data saved to {:?}", path);
    }
    Ok(())
}

fn print_result(instance: &Instance, result: &BranchAndPriceResult) {
    let stats = &result.statistics;
    println!("\n=== {} ===", result.strategy);
    println!("Status: {}", result.status);
    println!("Best cost: {:.4}", result.upper_bound);
    println!("Lower bound: {:.4}", result.lower_bound);
    println!("Gap: {:.3e}", result.gap);
    println!(
        "Nodes: {} (pruned by bound {}, infeasible {}, incumbents {}, max depth {})",
        stats.nodes_solved,
        stats.pruned_by_bound,
        stats.pruned_infeasible,
        stats.incumbents,
        stats.max_depth
    );
    println!(
        "Column generation: {} iterations, {} columns",
        stats.cg_iterations, stats.columns_generated
    );
    println!("Time: {:.3}s", result.computation_time);
    if !result.solution.routes.is_empty() {
        println!("{}", result.solution);
        let loads: Vec<String> = result
            .solution
            .loads(instance)
            .iter()
            .map(|load| format!("{}/{}", load, instance.capacity))
            .collect();
        println!("Loads: {}", loads.join(" "));
    }
}

fn run_benchmark(
    dir: PathBuf,
    output: &Path,
    datasets: Option<Vec<String>>,
    args: &SolverArgs,
    parallel: bool,
) -> Result<()> {
    let datasets =
        datasets.unwrap_or_else(|| DEFAULT_DATASETS.iter().map(|s| s.to_string()).collect());
    if datasets.is_empty() {
        bail!("no datasets given");
    }
    println!("Running {} datasets from {:?}...", datasets.len(), dir);

    std::fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let config = BenchmarkConfig {
        data_dir: dir,
        datasets,
        solver: args.solver_config()?,
        load: args.load_options(),
        overrides: args.overrides(),
        parallel,
        ..Default::default()
    };

    let mut benchmark = Benchmark::new(config);
    benchmark.run();

    let summary_path = output.join("summary.csv");
    benchmark
        .export_summary_csv(&summary_path)
        .context("exporting summary")?;
    println!("\nSummary exported to {:?}", summary_path);

    let routes_path = output.join("routes.csv");
    benchmark
        .export_routes_csv(&routes_path)
        .context("exporting routes")?;
    println!("Routes exported to {:?}", routes_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report).context("saving report")?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_instance(path: &Path, max_customers: Option<usize>) -> Result<()> {
    let options = LoadOptions {
        max_customers,
        ..Default::default()
    };
    let instance = Instance::from_solomon_file(path, &options)
        .with_context(|| format!("loading instance {}", path.display()))?;
    println!("{}", instance.statistics());
    Ok(())
}

fn generate_instance(output: &Path, customers: usize, seed: u64, capacity: u32) -> Result<()> {
    let config = GeneratorConfig {
        capacity,
        ..Default::default()
    };
    let name = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "random".to_string());
    let instance = Instance::random(name, customers, seed, &config)?;
    instance
        .write_solomon(output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Generated {} customers (seed {}) into {:?}",
        customers, seed, output
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_overrides_reach_instance() {
        let cli = Cli::try_parse_from([
            "vrptw-bp",
            "solve",
            "-i",
            "c101.txt",
            "--gap",
            "0.01",
            "--max-route-length",
            "750",
            "--very-big",
            "1e7",
            "--plot-data",
            "plot.txt",
        ])
        .unwrap();
        let Commands::Solve { solver, plot_data, schedule_svg, .. } = cli.command else {
            panic!("expected the solve command");
        };
        assert_eq!(plot_data, Some(PathBuf::from("plot.txt")));
        assert!(schedule_svg.is_none());

        let instance = Instance::random("cli", 4, 1, &GeneratorConfig::default())
            .unwrap()
            .with_overrides(&solver.overrides());
        assert_eq!(instance.gap, 0.01);
        assert_eq!(instance.max_route_length, 750.0);
        assert_eq!(instance.very_big, 1e7);
    }

    #[test]
    fn test_benchmark_overrides_default_to_none() {
        let cli = Cli::try_parse_from(["vrptw-bp", "benchmark", "-d", "data", "--very-big", "5e6"])
            .unwrap();
        let Commands::Benchmark { solver, .. } = cli.command else {
            panic!("expected the benchmark command");
        };
        let overrides = solver.overrides();
        assert_eq!(overrides.very_big, Some(5e6));
        assert!(overrides.gap.is_none());
        assert!(overrides.max_route_length.is_none());
    }
}
