//! Module for parsing and representing VRPTW instances.
//!
//! Customers are numbered `1..=N`. Index `0` is the depot as origin and
//! `N + 1` is a copy of the depot used as the route destination, so every
//! route is a path `0 -> ... -> N+1` in a graph without cycles through the depot.
//!
//! The Solomon text format is supported for reading and writing. Distances are
//! Euclidean; travel time equals travel cost.

use crate::error::InstanceError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default relative optimality gap
pub const DEFAULT_GAP: f64 = 1e-8;

/// `very_big` defaults to this multiple of the relaxation cap `2 * max_route_length`
const VERY_BIG_FACTOR: f64 = 1000.0;

/// A node of the instance (depot or customer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Internal index (0 = depot origin, N+1 = depot return)
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Demand, zero for the depot
    pub demand: u32,
    /// Earliest service start
    pub ready_time: f64,
    /// Latest service start
    pub due_time: f64,
    /// Service duration
    pub service_time: f64,
}

impl Customer {
    pub fn new(
        id: usize,
        x: f64,
        y: f64,
        demand: u32,
        ready_time: f64,
        due_time: f64,
        service_time: f64,
    ) -> Self {
        Customer {
            id,
            x,
            y,
            demand,
            ready_time,
            due_time,
            service_time,
        }
    }

    /// Width of the time window
    pub fn window_width(&self) -> f64 {
        self.due_time - self.ready_time
    }
}

/// Rounding applied to Euclidean distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistancePrecision {
    /// Full double precision
    #[default]
    Exact,
    /// Truncated to one decimal (Kohl's convention)
    Truncated,
}

impl DistancePrecision {
    fn apply(self, d: f64) -> f64 {
        match self {
            DistancePrecision::Exact => d,
            DistancePrecision::Truncated => (d * 10.0).floor() / 10.0,
        }
    }
}

/// Options for the Solomon loader
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Keep only the first `k` customers (the classic 25/50 subsets)
    pub max_customers: Option<usize>,
    /// Distance rounding
    pub precision: DistancePrecision,
}

/// Replacements for the instance-level tolerances, applied after loading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InstanceOverrides {
    pub gap: Option<f64>,
    pub max_route_length: Option<f64>,
    pub very_big: Option<f64>,
}

/// Parameters of the random instance generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Coordinates are drawn in `[0, grid]`
    pub grid: u32,
    /// Vehicle capacity
    pub capacity: u32,
    /// Demands are drawn in `[1, max_demand]`
    pub max_demand: u32,
    /// Depot closing time
    pub horizon: f64,
    /// Service duration of every customer
    pub service_time: f64,
    /// Time-window widths are drawn in this range
    pub window_width: (f64, f64),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            grid: 100,
            capacity: 200,
            max_demand: 30,
            horizon: 1000.0,
            service_time: 10.0,
            window_width: (40.0, 160.0),
        }
    }
}

/// Static VRPTW data. Never mutated by the solver: per-node arc costs live in
/// [`NodeView`](crate::view::NodeView).
#[derive(Debug, Clone)]
pub struct Instance {
    /// Name of the instance
    pub name: String,
    /// Number of customers N
    pub num_customers: usize,
    /// Vehicle capacity
    pub capacity: u32,
    /// Nodes `0..=N+1`; `nodes[N+1]` is a copy of the depot
    pub nodes: Vec<Customer>,
    /// Base arc costs, `(N+2) x (N+2)`
    pub dist_base: Vec<Vec<f64>>,
    /// Relative optimality gap
    pub gap: f64,
    /// Upper bound on the cost of any single elementary route
    pub max_route_length: f64,
    /// Cost written on forbidden arcs
    pub very_big: f64,
    /// Shortest time from service start at `i` to arrival at `j`, waiting excluded
    reach: Vec<Vec<f64>>,
}

impl Instance {
    /// Build an instance from coordinates. `customers` are renumbered `1..=N`
    /// in the given order.
    pub fn new(
        name: impl Into<String>,
        capacity: u32,
        depot: Customer,
        customers: Vec<Customer>,
        precision: DistancePrecision,
    ) -> Result<Self, InstanceError> {
        let nodes = Self::number_nodes(depot, customers);
        let dist_base = Self::compute_distance_matrix(&nodes, precision);
        Self::assemble(name.into(), capacity, nodes, dist_base)
    }

    /// Build an instance from an explicit cost matrix over `[depot, customers...]`,
    /// i.e. `(N+1) x (N+1)`. The return depot copies the depot row and column.
    pub fn from_matrix(
        name: impl Into<String>,
        capacity: u32,
        depot: Customer,
        customers: Vec<Customer>,
        distances: Vec<Vec<f64>>,
    ) -> Result<Self, InstanceError> {
        let size = customers.len() + 1;
        if distances.len() != size || distances.iter().any(|row| row.len() != size) {
            return Err(InstanceError::Invalid(format!(
                "distance matrix must be {}x{}",
                size, size
            )));
        }
        if distances.iter().flatten().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(InstanceError::Invalid(
                "distances must be finite and non-negative".to_string(),
            ));
        }

        let nodes = Self::number_nodes(depot, customers);
        let n = nodes.len();
        let ret = n - 1;
        let mut dist_base = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let a = if i == ret { 0 } else { i };
                    let b = if j == ret { 0 } else { j };
                    dist_base[i][j] = distances[a][b];
                }
            }
        }
        Self::assemble(name.into(), capacity, nodes, dist_base)
    }

    /// Parse a Solomon-format file
    pub fn from_solomon_file<P: AsRef<Path>>(
        path: P,
        options: &LoadOptions,
    ) -> Result<Self, InstanceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut instance = Self::from_solomon_str(&content, options)?;
        if instance.name.is_empty() {
            instance.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
        }
        Ok(instance)
    }

    /// Parse the Solomon format from a string
    pub fn from_solomon_str(content: &str, options: &LoadOptions) -> Result<Self, InstanceError> {
        let mut lines = content.lines().enumerate().peekable();

        let mut name = String::new();
        while let Some(&(_, line)) = lines.peek() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                if !trimmed.starts_with("VEHICLE") {
                    name = trimmed.to_string();
                    lines.next();
                }
                break;
            }
            lines.next();
        }

        // Skip to the vehicle block
        let mut found_vehicle = false;
        for (_, line) in lines.by_ref() {
            let trimmed = line.trim();
            if trimmed.starts_with("NUMBER") {
                found_vehicle = true;
                break;
            }
        }
        if !found_vehicle {
            return Err(InstanceError::Invalid("missing VEHICLE section".to_string()));
        }

        let mut capacity = None;
        for (idx, line) in lines.by_ref() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }
            if parts.len() < 2 {
                return Err(InstanceError::parse(idx + 1, "expected vehicle number and capacity"));
            }
            let cap: f64 = parts[1]
                .parse()
                .map_err(|_| InstanceError::parse(idx + 1, "invalid capacity"))?;
            capacity = Some(cap as u32);
            break;
        }
        let capacity =
            capacity.ok_or_else(|| InstanceError::Invalid("missing vehicle capacity".to_string()))?;

        for (_, line) in lines.by_ref() {
            if line.trim().starts_with("CUSTOMER") {
                break;
            }
        }

        let mut rows = Vec::new();
        for (idx, line) in lines {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }
            // Column header line
            if parts[0].parse::<f64>().is_err() {
                continue;
            }
            if parts.len() != 7 {
                return Err(InstanceError::parse(
                    idx + 1,
                    format!("expected 7 fields, found {}", parts.len()),
                ));
            }
            let mut values = [0.0f64; 7];
            for (k, part) in parts.iter().enumerate() {
                values[k] = part
                    .parse()
                    .map_err(|_| InstanceError::parse(idx + 1, format!("invalid number `{}`", part)))?;
            }
            if values[3] < 0.0 {
                return Err(InstanceError::parse(idx + 1, "negative demand"));
            }
            rows.push(Customer::new(
                values[0] as usize,
                values[1],
                values[2],
                values[3] as u32,
                values[4],
                values[5],
                values[6],
            ));
        }

        if rows.is_empty() {
            return Err(InstanceError::Invalid("no depot or customer rows".to_string()));
        }
        let depot = rows.remove(0);
        if let Some(k) = options.max_customers {
            rows.truncate(k);
        }

        Self::new(name, capacity, depot, rows, options.precision)
    }

    /// Seeded random instance in the Solomon style (integer coordinates and
    /// windows). Every customer can be served by a dedicated vehicle.
    pub fn random(
        name: impl Into<String>,
        num_customers: usize,
        seed: u64,
        config: &GeneratorConfig,
    ) -> Result<Self, InstanceError> {
        use rand::prelude::*;
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let center = config.grid as f64 / 2.0;
        let depot = Customer::new(0, center, center, 0, 0.0, config.horizon, 0.0);

        let (w_min, w_max) = config.window_width;
        let mut customers = Vec::with_capacity(num_customers);
        for id in 1..=num_customers {
            let x = rng.gen_range(0..=config.grid) as f64;
            let y = rng.gen_range(0..=config.grid) as f64;
            let demand = rng.gen_range(1..=config.max_demand.max(1));

            let travel = ((x - center).powi(2) + (y - center).powi(2)).sqrt();
            let earliest = travel.ceil();
            let latest = (config.horizon - config.service_time - travel).floor();
            if latest < earliest {
                return Err(InstanceError::Invalid(format!(
                    "horizon {} too short for the grid",
                    config.horizon
                )));
            }
            let middle = rng.gen_range(earliest..=latest).round();
            let half = (rng.gen_range(w_min..=w_max.max(w_min)) / 2.0).round();
            let ready = (middle - half).max(0.0);
            let due = (middle + half).min(latest);

            customers.push(Customer::new(id, x, y, demand, ready, due, config.service_time));
        }

        Self::new(
            name,
            config.capacity,
            depot,
            customers,
            DistancePrecision::Exact,
        )
    }

    /// Serialize in the Solomon format (depot and customers, no return copy)
    pub fn to_solomon_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n\n", self.name));
        out.push_str("VEHICLE\n");
        out.push_str("NUMBER     CAPACITY\n");
        out.push_str(&format!("{:>5}{:>13}\n\n", self.num_customers, self.capacity));
        out.push_str("CUSTOMER\n");
        out.push_str("CUST NO.  XCOORD.   YCOORD.    DEMAND   READY TIME  DUE DATE   SERVICE   TIME\n\n");
        for node in &self.nodes[..=self.num_customers] {
            out.push_str(&format!(
                "{:>5}{:>11}{:>11}{:>11}{:>11}{:>11}{:>11}\n",
                node.id, node.x, node.y, node.demand, node.ready_time, node.due_time, node.service_time
            ));
        }
        out
    }

    /// Write the instance to a Solomon-format file
    pub fn write_solomon<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        fs::write(path, self.to_solomon_string())
    }

    /// Override the relative optimality gap
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    /// Override the route-length cap. `very_big` is kept unless overridden too.
    pub fn with_max_route_length(mut self, max_route_length: f64) -> Self {
        self.max_route_length = max_route_length;
        self
    }

    /// Override the forbidden-arc cost
    pub fn with_very_big(mut self, very_big: f64) -> Self {
        self.very_big = very_big;
        self
    }

    /// Apply every override that is set
    pub fn with_overrides(self, overrides: &InstanceOverrides) -> Self {
        let mut instance = self;
        if let Some(gap) = overrides.gap {
            instance = instance.with_gap(gap);
        }
        if let Some(length) = overrides.max_route_length {
            instance = instance.with_max_route_length(length);
        }
        if let Some(very_big) = overrides.very_big {
            instance = instance.with_very_big(very_big);
        }
        instance
    }

    fn number_nodes(depot: Customer, customers: Vec<Customer>) -> Vec<Customer> {
        let n = customers.len();
        let mut nodes = Vec::with_capacity(n + 2);
        let mut origin = depot;
        origin.id = 0;
        origin.demand = 0;
        let mut destination = origin.clone();
        destination.id = n + 1;
        nodes.push(origin);
        for (k, mut c) in customers.into_iter().enumerate() {
            c.id = k + 1;
            nodes.push(c);
        }
        nodes.push(destination);
        nodes
    }

    fn assemble(
        name: String,
        capacity: u32,
        nodes: Vec<Customer>,
        dist_base: Vec<Vec<f64>>,
    ) -> Result<Self, InstanceError> {
        let num_customers = nodes.len() - 2;
        if num_customers == 0 {
            return Err(InstanceError::Invalid("instance has no customer".to_string()));
        }

        let max_route_length: f64 = dist_base
            .iter()
            .take(num_customers + 1)
            .map(|row| row.iter().cloned().fold(0.0, f64::max))
            .sum();
        let reach = Self::compute_reach(&nodes, &dist_base);

        let instance = Instance {
            name,
            num_customers,
            capacity,
            nodes,
            dist_base,
            gap: DEFAULT_GAP,
            max_route_length,
            very_big: VERY_BIG_FACTOR * 2.0 * max_route_length.max(1.0),
            reach,
        };
        instance.validate()?;
        Ok(instance)
    }

    fn validate(&self) -> Result<(), InstanceError> {
        for node in &self.nodes {
            if node.due_time < node.ready_time {
                return Err(InstanceError::Invalid(format!(
                    "node {} has an empty time window [{}, {}]",
                    node.id, node.ready_time, node.due_time
                )));
            }
        }
        for i in self.customers() {
            let node = &self.nodes[i];
            if node.demand > self.capacity {
                return Err(InstanceError::Invalid(format!(
                    "customer {} demand {} exceeds capacity {}",
                    i, node.demand, self.capacity
                )));
            }
            let start = self.nodes[0].ready_time;
            let arrival = self.arrival_time(start, 0, i, self.dist_base[0][i]);
            let back = self.arrival_time(arrival, i, self.depot_return(), self.dist_base[i][self.depot_return()]);
            if arrival > node.due_time || back > self.nodes[self.depot_return()].due_time {
                return Err(InstanceError::Invalid(format!(
                    "customer {} cannot be served by a dedicated vehicle",
                    i
                )));
            }
        }
        Ok(())
    }

    /// Compute Euclidean distance matrix
    fn compute_distance_matrix(nodes: &[Customer], precision: DistancePrecision) -> Vec<Vec<f64>> {
        let n = nodes.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dx = nodes[i].x - nodes[j].x;
                    let dy = nodes[i].y - nodes[j].y;
                    matrix[i][j] = precision.apply((dx * dx + dy * dy).sqrt());
                }
            }
        }

        matrix
    }

    /// Floyd-Warshall over `service[i] + dist[i][j]`
    fn compute_reach(nodes: &[Customer], dist: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n = nodes.len();
        let mut reach = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    reach[i][j] = nodes[i].service_time + dist[i][j];
                }
            }
        }
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    let via = reach[i][k] + reach[k][j];
                    if via < reach[i][j] {
                        reach[i][j] = via;
                    }
                }
            }
        }
        reach
    }

    /// Index of the depot copy ending every route
    #[inline]
    pub fn depot_return(&self) -> usize {
        self.num_customers + 1
    }

    /// Number of vertices, depot copies included
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_customers + 2
    }

    /// Customer indices `1..=N`
    pub fn customers(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.num_customers
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.dist_base[i][j]
    }

    #[inline]
    pub fn demand(&self, i: usize) -> u32 {
        self.nodes[i].demand
    }

    /// Service start at `v` when leaving `u` (service started at `time`) along an
    /// arc of length `travel`
    #[inline]
    pub fn arrival_time(&self, time: f64, u: usize, v: usize, travel: f64) -> f64 {
        (time + self.nodes[u].service_time + travel).max(self.nodes[v].ready_time)
    }

    /// Lower bound on the time between service start at `i` and arrival at `j`
    #[inline]
    pub fn min_reach_time(&self, i: usize, j: usize) -> f64 {
        self.reach[i][j]
    }

    /// Depot closing time
    pub fn horizon(&self) -> f64 {
        self.nodes[0].due_time
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let customers = &self.nodes[1..=self.num_customers];
        let total_demand: u32 = customers.iter().map(|c| c.demand).sum();
        let n = customers.len() as f64;

        let mut distances: Vec<f64> = Vec::new();
        for i in 0..=self.num_customers {
            for j in i + 1..=self.num_customers {
                distances.push(self.distance(i, j));
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        InstanceStatistics {
            name: self.name.clone(),
            num_customers: self.num_customers,
            capacity: self.capacity,
            total_demand,
            min_vehicles: total_demand.div_ceil(self.capacity.max(1)),
            horizon: self.horizon(),
            avg_window_width: customers.iter().map(|c| c.window_width()).sum::<f64>() / n,
            avg_service_time: customers.iter().map(|c| c.service_time).sum::<f64>() / n,
            avg_distance,
            max_distance,
            max_route_length: self.max_route_length,
            very_big: self.very_big,
        }
    }
}

/// Statistics about a VRPTW instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_customers: usize,
    pub capacity: u32,
    pub total_demand: u32,
    pub min_vehicles: u32,
    pub horizon: f64,
    pub avg_window_width: f64,
    pub avg_service_time: f64,
    pub avg_distance: f64,
    pub max_distance: f64,
    pub max_route_length: f64,
    pub very_big: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Customers: {}", self.num_customers)?;
        writeln!(f, "  Capacity: {}", self.capacity)?;
        writeln!(f, "  Total demand: {} (at least {} vehicles)", self.total_demand, self.min_vehicles)?;
        writeln!(f, "  Horizon: {:.1}", self.horizon)?;
        writeln!(f, "  Avg window width: {:.2}", self.avg_window_width)?;
        writeln!(f, "  Avg service time: {:.2}", self.avg_service_time)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)?;
        writeln!(f, "  Max route length: {:.2}", self.max_route_length)?;
        writeln!(f, "  Forbidden-arc cost: {:.3e}", self.very_big)
    }
}
