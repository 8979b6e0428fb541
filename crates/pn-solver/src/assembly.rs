//! Assembly of the live constraints into a square nonlinear system.
//!
//! Constraints are gathered in the model's fixed collection order and
//! entity order within each collection; the unknowns are every variable
//! referenced by at least one residual, ordered by name. Variables that no
//! constraint references (the head of an isolated junction, for example)
//! stay out of the system entirely.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use pn_expr::{Constraint, Var};
use pn_model::HydraulicModel;
use std::collections::BTreeMap;

/// A frozen snapshot of the system: residual rows and the variables they
/// reference. Invalidated by any constraint rebuild; gather it anew after
/// each registry flush.
pub struct Assembly {
    constraints: Vec<Constraint>,
    vars: Vec<Var>,
}

impl Assembly {
    /// Gather all live constraints and their referenced variables.
    ///
    /// Variable names are unique by construction (`flow[..]`, `head[..]`,
    /// ...), so ordering by name also deduplicates.
    pub fn gather(model: &HydraulicModel) -> SolverResult<Self> {
        let mut constraints = Vec::new();
        for (_, set) in model.constraint_sets() {
            for con in set.values() {
                constraints.push(con.clone());
            }
        }

        let mut vars: BTreeMap<String, Var> = BTreeMap::new();
        for con in &constraints {
            for v in con.vars() {
                vars.insert(v.name().to_owned(), v);
            }
        }
        let vars: Vec<Var> = vars.into_values().collect();

        if constraints.len() != vars.len() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "system is not square: {} constraints over {} variables",
                    constraints.len(),
                    vars.len()
                ),
            });
        }
        Ok(Self { constraints, vars })
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// Current variable values as an initial guess.
    pub fn initial_guess(&self) -> DVector<f64> {
        DVector::from_iterator(self.vars.len(), self.vars.iter().map(|v| v.value()))
    }

    /// Write `x` into the variable cells.
    pub fn store(&self, x: &DVector<f64>) {
        for (v, &value) in self.vars.iter().zip(x.iter()) {
            v.set_value(value);
        }
    }

    /// Residual vector at `x`.
    pub fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        self.store(x);
        let mut r = DVector::zeros(self.constraints.len());
        for (i, con) in self.constraints.iter().enumerate() {
            let value = con.evaluate();
            if !value.is_finite() {
                return Err(SolverError::Numeric {
                    what: format!("non-finite residual for {}", con.name()),
                });
            }
            r[i] = value;
        }
        Ok(r)
    }

    /// Dense Jacobian at `x`, rows in constraint order, columns in variable
    /// order, entries from forward-mode differentiation.
    pub fn jacobian(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        self.store(x);
        let n = self.vars.len();
        let mut jac = DMatrix::zeros(self.constraints.len(), n);
        for (i, con) in self.constraints.iter().enumerate() {
            for v in con.vars() {
                let j = self
                    .vars
                    .binary_search_by(|probe| probe.name().cmp(v.name()))
                    .map_err(|_| SolverError::ProblemSetup {
                        what: format!("variable {} missing from assembly", v.name()),
                    })?;
                jac[(i, j)] = con.derivative(&v);
            }
        }
        Ok(jac)
    }
}
