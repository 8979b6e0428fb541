//! Named residual constraints.

use crate::{Expr, Var};

/// A single algebraic constraint `residual == 0`, bound to one entity.
#[derive(Clone)]
pub struct Constraint {
    name: String,
    residual: Expr,
}

impl Constraint {
    pub fn new(name: impl Into<String>, residual: Expr) -> Self {
        Self {
            name: name.into(),
            residual,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn residual(&self) -> &Expr {
        &self.residual
    }

    /// Residual value at the current variable values.
    pub fn evaluate(&self) -> f64 {
        self.residual.evaluate()
    }

    /// Partial derivative of the residual with respect to `var`.
    pub fn derivative(&self, var: &Var) -> f64 {
        self.residual.derivative(var)
    }

    /// Variables referenced by the residual.
    pub fn vars(&self) -> Vec<Var> {
        self.residual.vars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Var;

    #[test]
    fn constraint_wraps_expression() {
        let x = Var::new("x", 4.0);
        let con = Constraint::new("quad", x.expr().powf(2.0) - 16.0);
        assert_eq!(con.name(), "quad");
        assert_eq!(con.evaluate(), 0.0);
        assert_eq!(con.derivative(&x), 8.0);
        assert_eq!(con.vars().len(), 1);
    }
}
