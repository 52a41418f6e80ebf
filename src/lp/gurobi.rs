//! Gurobi-backed master, enabled with the `gurobi` feature.
//!
//! Primal simplex (`Method = 0`) keeps the basis warm across column additions.

use super::{LpStatus, MasterLp};
use crate::error::LpError;
use grb::prelude::*;

fn backend_err(what: &str, e: grb::Error) -> LpError {
    LpError::Backend(format!("{}: {}", what, e))
}

/// Covering master held in a Gurobi model
pub struct GurobiMaster {
    model: Model,
    rows: Vec<Constr>,
    columns: Vec<Var>,
    status: Option<LpStatus>,
}

impl GurobiMaster {
    pub fn new(num_rows: usize) -> Result<Self, LpError> {
        let env = Env::new("").map_err(|e| backend_err("Failed to create Gurobi environment", e))?;
        let mut model =
            Model::with_env("rmp", env).map_err(|e| backend_err("Failed to create model", e))?;

        model
            .set_param(param::OutputFlag, 0)
            .map_err(|e| backend_err("Failed to set output flag", e))?;
        model
            .set_param(param::Method, 0)
            .map_err(|e| backend_err("Failed to select primal simplex", e))?;
        model
            .set_attr(attr::ModelSense, ModelSense::Minimize)
            .map_err(|e| backend_err("Failed to set model sense", e))?;

        let mut rows = Vec::with_capacity(num_rows);
        for i in 0..num_rows {
            let constr = model
                .add_constr(&format!("cover_{}", i), c!(Expr::Constant(0.0) >= 1.0))
                .map_err(|e| backend_err("Failed to add covering row", e))?;
            rows.push(constr);
        }
        model
            .update()
            .map_err(|e| backend_err("Failed to update model", e))?;

        Ok(GurobiMaster {
            model,
            rows,
            columns: Vec::new(),
            status: None,
        })
    }

    fn require_optimal(&self) -> Result<(), LpError> {
        match self.status {
            Some(LpStatus::Optimal) => Ok(()),
            _ => Err(LpError::NotSolved),
        }
    }
}

impl MasterLp for GurobiMaster {
    fn add_column(&mut self, cost: f64, rows: &[usize]) -> Result<usize, LpError> {
        let mut coeffs: Vec<(Constr, f64)> = Vec::with_capacity(rows.len());
        for &r in rows {
            let constr = *self
                .rows
                .get(r)
                .ok_or_else(|| LpError::Backend(format!("row {} out of range", r)))?;
            match coeffs.iter_mut().find(|(c, _)| *c == constr) {
                Some((_, coef)) => *coef += 1.0,
                None => coeffs.push((constr, 1.0)),
            }
        }

        let name = format!("route_{}", self.columns.len());
        let var = self
            .model
            .add_var(&name, Continuous, cost, 0.0, INFINITY, coeffs)
            .map_err(|e| backend_err("Failed to add column", e))?;
        self.columns.push(var);
        self.status = None;
        Ok(self.columns.len() - 1)
    }

    fn optimize(&mut self) -> Result<LpStatus, LpError> {
        self.model
            .optimize()
            .map_err(|e| backend_err("Optimization failed", e))?;
        let status = self
            .model
            .status()
            .map_err(|e| backend_err("Failed to read status", e))?;
        let status = match status {
            Status::Optimal => LpStatus::Optimal,
            Status::Infeasible => LpStatus::Infeasible,
            Status::Unbounded => LpStatus::Unbounded,
            Status::InfOrUnbd => LpStatus::InfeasibleOrUnbounded,
            other => return Err(LpError::Backend(format!("unexpected status {:?}", other))),
        };
        self.status = Some(status);
        Ok(status)
    }

    fn objective(&self) -> Result<f64, LpError> {
        self.require_optimal()?;
        self.model
            .get_attr(attr::ObjVal)
            .map_err(|e| backend_err("Failed to read objective", e))
    }

    fn duals(&self) -> Result<Vec<f64>, LpError> {
        self.require_optimal()?;
        self.rows
            .iter()
            .map(|c| {
                self.model
                    .get_obj_attr(attr::Pi, c)
                    .map_err(|e| backend_err("Failed to read dual", e))
            })
            .collect()
    }

    fn primal_values(&self) -> Result<Vec<f64>, LpError> {
        self.require_optimal()?;
        self.columns
            .iter()
            .map(|v| {
                self.model
                    .get_obj_attr(attr::X, v)
                    .map_err(|e| backend_err("Failed to read column value", e))
            })
            .collect()
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn num_columns(&self) -> usize {
        self.columns.len()
    }
}
