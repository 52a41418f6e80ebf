//! Restricted master solved with the pure-Rust `microlp` simplex.
//!
//! `microlp` reports primal values only, so the master keeps the dual of the
//! covering LP as its working model:
//!
//! ```text
//! max  sum_i pi_i   s.t.  sum_{i in r} a_ir pi_i <= c_r  for every route r,  pi >= 0
//! ```
//!
//! A new route is a new dual row, which `microlp` adds to a solved model and
//! reoptimises from the previous basis. The route values are only needed once
//! a node's column generation has converged; they come from one solve of the
//! covering LP itself.

use super::{LpStatus, MasterLp};
use crate::error::LpError;
use ::microlp::{ComparisonOp, Error, LinearExpr, OptimizationDirection, Problem, Solution, Variable};

#[derive(Debug, Clone)]
struct Column {
    cost: f64,
    /// (row, coefficient) with repeated rows merged
    entries: Vec<(usize, f64)>,
}

/// Covering master backed by `microlp`
pub struct MicrolpMaster {
    num_rows: usize,
    columns: Vec<Column>,
    /// Dual model solved so far, with its row variables
    dual: Option<(Solution, Vec<Variable>)>,
    /// Columns not yet added to `dual`
    pending: usize,
    status: Option<LpStatus>,
}

impl MicrolpMaster {
    pub fn new(num_rows: usize) -> Self {
        MicrolpMaster {
            num_rows,
            columns: Vec::new(),
            dual: None,
            pending: 0,
            status: None,
        }
    }

    fn solution(&self) -> Result<&(Solution, Vec<Variable>), LpError> {
        match (self.status, &self.dual) {
            (Some(LpStatus::Optimal), Some(dual)) => Ok(dual),
            _ => Err(LpError::NotSolved),
        }
    }

    /// Solve the dual model from scratch over every column.
    fn solve_dual(&self) -> Result<(Solution, Vec<Variable>), Error> {
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let pi: Vec<Variable> = (0..self.num_rows)
            .map(|_| problem.add_var(1.0, (0.0, f64::INFINITY)))
            .collect();
        for column in &self.columns {
            problem.add_constraint(row_expr(&pi, column), ComparisonOp::Le, column.cost);
        }
        problem.solve().map(|solution| (solution, pi))
    }

    /// Add the pending columns to the solved dual model, falling back to a
    /// fresh solve if the warm model cannot be reused.
    fn reoptimize(&mut self) -> Result<(Solution, Vec<Variable>), Error> {
        let Some((mut solution, pi)) = self.dual.take() else {
            return self.solve_dual();
        };
        let first = self.columns.len() - self.pending;
        for column in &self.columns[first..] {
            solution = match solution.add_constraint(row_expr(&pi, column), ComparisonOp::Le, column.cost) {
                Ok(solution) => solution,
                Err(_) => return self.solve_dual(),
            };
        }
        Ok((solution, pi))
    }
}

fn row_expr(pi: &[Variable], column: &Column) -> LinearExpr {
    let mut expr = LinearExpr::empty();
    for &(row, coefficient) in &column.entries {
        expr.add(pi[row], coefficient);
    }
    expr
}

fn backend_err(context: &str, err: Error) -> LpError {
    LpError::Backend(format!("{}: {}", context, err))
}

impl MasterLp for MicrolpMaster {
    fn add_column(&mut self, cost: f64, rows: &[usize]) -> Result<usize, LpError> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.num_rows) {
            return Err(LpError::Backend(format!(
                "row {} out of range (model has {} rows)",
                bad, self.num_rows
            )));
        }
        if !cost.is_finite() {
            return Err(LpError::Backend(format!("column cost {} is not finite", cost)));
        }
        let mut entries: Vec<(usize, f64)> = Vec::with_capacity(rows.len());
        for &row in rows {
            match entries.iter_mut().find(|(r, _)| *r == row) {
                Some((_, coefficient)) => *coefficient += 1.0,
                None => entries.push((row, 1.0)),
            }
        }
        self.columns.push(Column { cost, entries });
        self.pending += 1;
        self.status = None;
        Ok(self.columns.len() - 1)
    }

    fn optimize(&mut self) -> Result<LpStatus, LpError> {
        let status = match self.reoptimize() {
            Ok(dual) => {
                self.dual = Some(dual);
                LpStatus::Optimal
            }
            // an unbounded dual means some row is not covered by any column
            Err(Error::Unbounded) => LpStatus::Infeasible,
            Err(Error::Infeasible) => LpStatus::InfeasibleOrUnbounded,
            Err(err) => return Err(backend_err("Failed to optimize master", err)),
        };
        self.pending = if status.is_optimal() { 0 } else { self.columns.len() };
        self.status = Some(status);
        Ok(status)
    }

    fn objective(&self) -> Result<f64, LpError> {
        let (solution, _) = self.solution()?;
        Ok(solution.objective())
    }

    fn duals(&self) -> Result<Vec<f64>, LpError> {
        let (solution, pi) = self.solution()?;
        Ok(pi.iter().map(|&v| solution[v].max(0.0)).collect())
    }

    fn primal_values(&self) -> Result<Vec<f64>, LpError> {
        self.solution()?;
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let y: Vec<Variable> = self
            .columns
            .iter()
            .map(|column| problem.add_var(column.cost, (0.0, f64::INFINITY)))
            .collect();
        let mut cover: Vec<LinearExpr> = (0..self.num_rows).map(|_| LinearExpr::empty()).collect();
        for (column, &var) in self.columns.iter().zip(&y) {
            for &(row, coefficient) in &column.entries {
                cover[row].add(var, coefficient);
            }
        }
        for expr in cover {
            problem.add_constraint(expr, ComparisonOp::Ge, 1.0);
        }
        let solution = problem
            .solve()
            .map_err(|e| backend_err("Failed to recover route values", e))?;
        Ok(y.iter().map(|&v| solution[v].max(0.0)).collect())
    }

    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-7, "{} != {}", a, b);
    }

    #[test]
    fn test_single_covering_column() {
        let mut lp = MicrolpMaster::new(2);
        lp.add_column(3.0, &[0]).unwrap();
        lp.add_column(3.0, &[1]).unwrap();
        lp.add_column(4.0, &[0, 1]).unwrap();
        assert_eq!(lp.optimize().unwrap(), LpStatus::Optimal);
        assert_close(lp.objective().unwrap(), 4.0);

        let x = lp.primal_values().unwrap();
        assert_close(x[2], 1.0);
        let y = lp.duals().unwrap();
        assert_close(y[0] + y[1], 4.0);
        assert!(y.iter().all(|&v| v > -1e-9 && v < 3.0 + 1e-9));
    }

    #[test]
    fn test_fractional_triangle() {
        let mut lp = MicrolpMaster::new(3);
        for r in 0..3 {
            lp.add_column(1.0, &[r]).unwrap();
        }
        lp.add_column(1.0, &[0, 1]).unwrap();
        lp.add_column(1.0, &[1, 2]).unwrap();
        lp.add_column(1.0, &[0, 2]).unwrap();
        assert_eq!(lp.optimize().unwrap(), LpStatus::Optimal);
        assert_close(lp.objective().unwrap(), 1.5);

        let x = lp.primal_values().unwrap();
        for k in 3..6 {
            assert_close(x[k], 0.5);
        }
        for y in lp.duals().unwrap() {
            assert_close(y, 0.5);
        }
    }

    #[test]
    fn test_warm_start_after_new_column() {
        let mut lp = MicrolpMaster::new(2);
        lp.add_column(10.0, &[0]).unwrap();
        lp.add_column(10.0, &[1]).unwrap();
        lp.optimize().unwrap();
        assert_close(lp.objective().unwrap(), 20.0);
        assert_close(lp.duals().unwrap()[0], 10.0);

        lp.add_column(5.0, &[0, 1]).unwrap();
        assert!(lp.objective().is_err());
        assert_eq!(lp.optimize().unwrap(), LpStatus::Optimal);
        assert_close(lp.objective().unwrap(), 5.0);
        assert_eq!(lp.primal_values().unwrap().len(), 3);
    }

    #[test]
    fn test_infeasible_until_covered() {
        let mut lp = MicrolpMaster::new(2);
        lp.add_column(1.0, &[0]).unwrap();
        assert_eq!(lp.optimize().unwrap(), LpStatus::Infeasible);
        assert!(lp.duals().is_err());

        lp.add_column(2.0, &[1]).unwrap();
        assert_eq!(lp.optimize().unwrap(), LpStatus::Optimal);
        assert_close(lp.objective().unwrap(), 3.0);
    }

    #[test]
    fn test_repeated_row_counts_twice() {
        let mut lp = MicrolpMaster::new(1);
        lp.add_column(10.0, &[0]).unwrap();
        lp.add_column(6.0, &[0, 0]).unwrap();
        lp.optimize().unwrap();
        // y = 0.5 on the doubled column covers the row
        assert_close(lp.objective().unwrap(), 3.0);
        assert_close(lp.primal_values().unwrap()[1], 0.5);
    }

    #[test]
    fn test_row_out_of_range() {
        let mut lp = MicrolpMaster::new(2);
        assert!(lp.add_column(1.0, &[2]).is_err());
        assert!(lp.add_column(f64::NAN, &[0]).is_err());
    }

    #[test]
    fn test_primal_and_dual_objectives_agree() {
        // 30 rows, trivial columns plus all consecutive pairs and triples,
        // added over several reoptimisations
        let m = 30;
        let mut lp = MicrolpMaster::new(m);
        let mut costs = Vec::new();
        for r in 0..m {
            costs.push(2.0 + r as f64 * 0.01);
            lp.add_column(2.0 + r as f64 * 0.01, &[r]).unwrap();
        }
        lp.optimize().unwrap();
        for r in 0..m - 1 {
            costs.push(2.5);
            lp.add_column(2.5, &[r, r + 1]).unwrap();
        }
        lp.optimize().unwrap();
        for r in 0..m - 2 {
            costs.push(3.2);
            lp.add_column(3.2, &[r, r + 1, r + 2]).unwrap();
        }
        assert_eq!(lp.optimize().unwrap(), LpStatus::Optimal);
        // 10 disjoint triples cover everything
        assert_close(lp.objective().unwrap(), 32.0);
        let y = lp.duals().unwrap();
        let x = lp.primal_values().unwrap();
        let primal: f64 = x.iter().zip(&costs).map(|(v, c)| v * c).sum();
        assert_close(primal, y.iter().sum::<f64>());
    }
}
