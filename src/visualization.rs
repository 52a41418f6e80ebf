//! Visualization utilities for VRPTW solutions.
//!
//! Generates SVG route maps and schedule charts, and exports data for plotting.

use crate::bnb::BranchAndPriceResult;
use crate::instance::{Customer, Instance};
use crate::solution::Solution;
use std::path::Path;

/// Stroke colors cycled over routes
const PALETTE: [&str; 10] = [
    "#e74c3c", "#3498db", "#2ecc71", "#9b59b6", "#f39c12", "#1abc9c", "#d35400", "#34495e",
    "#c0392b", "#16a085",
];

/// Maps instance coordinates to canvas coordinates (y axis pointing up)
struct Frame {
    origin: (f64, f64),
    scale: f64,
    margin: f64,
    height: f64,
}

impl Frame {
    fn project(&self, node: &Customer) -> (f64, f64) {
        (
            self.margin + (node.x - self.origin.0) * self.scale,
            self.height - self.margin - (node.y - self.origin.1) * self.scale,
        )
    }
}

/// SVG route-map generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// Node radius
    pub node_radius: f64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 6.0,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn color(route_index: usize) -> &'static str {
        PALETTE[route_index % PALETTE.len()]
    }

    /// Generate an SVG map of the solution's routes
    pub fn generate_svg(&self, instance: &Instance, solution: &Solution) -> String {
        let mut svg = String::new();

        let frame = self.frame(instance);

        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .node {{ fill: #ffffff; stroke: #2c3e50; stroke-width: 1.5; }}
    .depot {{ fill: #2c3e50; stroke: #000000; stroke-width: 2; }}
    .route {{ stroke-width: 2; fill: none; }}
    .label {{ font-family: Arial; font-size: 9px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            self.width, self.height, self.width, self.height
        ));

        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">Instance: {} | Cost: {:.2} | Routes: {} | Feasible: {}</text>
"##,
            self.margin,
            instance.name,
            solution.cost,
            solution.routes.len(),
            solution.feasible
        ));

        for (k, route) in solution.routes.iter().enumerate() {
            let mut points = String::new();
            for &v in &route.path {
                if v >= instance.num_nodes() {
                    continue;
                }
                let (x, y) = frame.project(&instance.nodes[v]);
                points.push_str(&format!("{:.2},{:.2} ", x, y));
            }
            svg.push_str(&format!(
                r##"<polyline points="{}" class="route" stroke="{}"/>
"##,
                points.trim_end(),
                Self::color(k)
            ));
        }

        // the return copy shares the depot's coordinates
        for node in &instance.nodes[..=instance.num_customers] {
            let (x, y) = frame.project(node);
            if node.id == 0 {
                let side = 2.0 * self.node_radius;
                svg.push_str(&format!(
                    r##"<rect x="{:.2}" y="{:.2}" width="{}" height="{}" class="depot"/>
"##,
                    x - self.node_radius,
                    y - self.node_radius,
                    side,
                    side
                ));
            } else {
                svg.push_str(&format!(
                    r##"<circle cx="{:.2}" cy="{:.2}" r="{}" class="node"/>
"##,
                    x, y, self.node_radius
                ));
            }
            svg.push_str(&format!(
                r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                x,
                y - self.node_radius - 3.0,
                node.id
            ));
        }

        svg.push_str("</svg>");

        svg
    }

    /// One row per route: time windows as grey bars, service starts as dots
    pub fn generate_schedule_svg(&self, instance: &Instance, solution: &Solution) -> String {
        let mut svg = String::new();

        let margin = 60.0;
        let row_height = 28.0;
        let width = self.width;
        let height = 2.0 * margin + row_height * solution.routes.len().max(1) as f64;
        let horizon = instance.horizon().max(1.0);
        let x_scale = (width - 2.0 * margin) / horizon;

        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .window {{ fill: #bdc3c7; }}
    .axis {{ stroke: #2c3e50; stroke-width: 1; }}
    .label {{ font-family: Arial; font-size: 11px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            width, height, width, height
        ));

        svg.push_str(&format!(
            r#"<text x="{}" y="25" class="title">Schedule - Horizon: {:.0}</text>
"#,
            margin, horizon
        ));
        svg.push_str(&format!(
            r##"<line x1="{}" y1="{}" x2="{}" y2="{}" class="axis"/>
"##,
            margin,
            height - margin,
            width - margin,
            height - margin
        ));

        for (k, route) in solution.routes.iter().enumerate() {
            let y = margin + k as f64 * row_height;
            svg.push_str(&format!(
                r#"<text x="{}" y="{:.2}" class="label">#{}</text>
"#,
                10.0,
                y + row_height / 2.0,
                k + 1
            ));

            let times = match route.schedule(instance) {
                Ok(times) => times,
                Err(_) => continue,
            };
            for (&v, &t) in route.path.iter().zip(&times) {
                let node = &instance.nodes[v];
                if v != 0 && v != instance.depot_return() {
                    svg.push_str(&format!(
                        r##"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" class="window"/>
"##,
                        margin + node.ready_time * x_scale,
                        y + 4.0,
                        (node.window_width() * x_scale).max(1.0),
                        row_height - 8.0
                    ));
                }
                svg.push_str(&format!(
                    r##"<circle cx="{:.2}" cy="{:.2}" r="4" fill="{}"/>
"##,
                    margin + t * x_scale,
                    y + row_height / 2.0,
                    Self::color(k)
                ));
            }
        }

        svg.push_str("</svg>");

        svg
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        std::fs::write(path, svg)
    }

    /// Fit the instance's bounding box into the canvas, keeping the aspect ratio
    fn frame(&self, instance: &Instance) -> Frame {
        let (lo, hi) = instance.nodes.iter().fold(
            ((f64::INFINITY, f64::INFINITY), (f64::NEG_INFINITY, f64::NEG_INFINITY)),
            |(lo, hi), c| ((lo.0.min(c.x), lo.1.min(c.y)), (hi.0.max(c.x), hi.1.max(c.y))),
        );
        let usable_w = self.width - 2.0 * self.margin;
        let usable_h = self.height - 2.0 * self.margin;
        Frame {
            origin: lo,
            scale: (usable_w / (hi.0 - lo.0).max(1.0)).min(usable_h / (hi.1 - lo.1).max(1.0)),
            margin: self.margin,
            height: self.height,
        }
    }

    /// Export data for external plotting (e.g., matplotlib)
    pub fn export_plot_data(&self, instance: &Instance, solution: &Solution) -> String {
        let mut data = String::new();

        data.push_str("# VRPTW Solution Data\n");
        data.push_str(&format!("# Instance: {}\n", instance.name));
        data.push_str(&format!("# Cost: {:.2}\n", solution.cost));
        data.push_str(&format!("# Feasible: {}\n\n", solution.feasible));

        data.push_str("# Nodes: id, x, y, demand, ready, due, service\n");
        for node in &instance.nodes[..=instance.num_customers] {
            data.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                node.id, node.x, node.y, node.demand, node.ready_time, node.due_time, node.service_time
            ));
        }

        data.push_str("\n# Routes: route, cost, node sequence\n");
        for (k, route) in solution.routes.iter().enumerate() {
            let path: Vec<String> = route.path.iter().map(|n| n.to_string()).collect();
            data.push_str(&format!("{},{:.2},{}\n", k + 1, route.cost, path.join(",")));
        }

        data
    }
}

/// Bound trajectories of several searches, one line per bound update
pub fn generate_comparison_data(results: &[BranchAndPriceResult]) -> String {
    let mut data = String::new();

    data.push_str("# Strategy Comparison\n");
    data.push_str("strategy,status,cost,lower_bound,nodes,time\n");
    for result in results {
        data.push_str(&format!(
            "{},{},{:.2},{:.2},{},{:.4}\n",
            result.strategy,
            result.status,
            result.upper_bound,
            result.lower_bound,
            result.statistics.nodes_solved,
            result.computation_time
        ));
    }

    data.push_str("\n# Bound history: strategy,kind,step,value\n");
    for result in results {
        let stats = &result.statistics;
        for (step, value) in stats.upper_bound_history.iter().enumerate() {
            data.push_str(&format!("{},upper,{},{:.4}\n", result.strategy, step, value));
        }
        for (step, value) in stats.lower_bound_history.iter().enumerate() {
            data.push_str(&format!("{},lower,{},{:.4}\n", result.strategy, step, value));
        }
    }

    data
}
