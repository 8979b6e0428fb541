//! Expression trees with evaluation and forward-mode differentiation.

use crate::vars::{Param, Var};
use std::collections::HashSet;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

enum Node {
    Const(f64),
    Var(Var),
    Param(Param),
    Add(Expr, Expr),
    Sub(Expr, Expr),
    Mul(Expr, Expr),
    Div(Expr, Expr),
    Neg(Expr),
    /// Constant exponent only; that covers every relation in the model and
    /// keeps the derivative rule closed-form.
    Pow(Expr, f64),
    Sign(Expr),
    Abs(Expr),
    /// Ordered (predicate, branch) arms plus a final branch. The first arm
    /// whose predicate evaluates <= 0 is selected; predicates are treated as
    /// constant under differentiation.
    Conditional {
        arms: Vec<(Expr, Expr)>,
        otherwise: Expr,
    },
}

/// A cheaply clonable algebraic expression.
#[derive(Clone)]
pub struct Expr(Rc<Node>);

impl Expr {
    pub fn constant(value: f64) -> Self {
        Self(Rc::new(Node::Const(value)))
    }

    pub fn var(var: &Var) -> Self {
        Self(Rc::new(Node::Var(var.clone())))
    }

    pub fn param(param: &Param) -> Self {
        Self(Rc::new(Node::Param(param.clone())))
    }

    /// Raise to a constant power.
    pub fn powf(self, exponent: f64) -> Self {
        Self(Rc::new(Node::Pow(self, exponent)))
    }

    /// Evaluate at the current variable/parameter values.
    pub fn evaluate(&self) -> f64 {
        match &*self.0 {
            Node::Const(v) => *v,
            Node::Var(v) => v.value(),
            Node::Param(p) => p.value(),
            Node::Add(a, b) => a.evaluate() + b.evaluate(),
            Node::Sub(a, b) => a.evaluate() - b.evaluate(),
            Node::Mul(a, b) => a.evaluate() * b.evaluate(),
            Node::Div(a, b) => a.evaluate() / b.evaluate(),
            Node::Neg(a) => -a.evaluate(),
            Node::Pow(a, e) => a.evaluate().powf(*e),
            Node::Sign(a) => signum0(a.evaluate()),
            Node::Abs(a) => a.evaluate().abs(),
            Node::Conditional { arms, otherwise } => {
                for (pred, branch) in arms {
                    if pred.evaluate() <= 0.0 {
                        return branch.evaluate();
                    }
                }
                otherwise.evaluate()
            }
        }
    }

    /// Partial derivative with respect to `var` at the current values.
    pub fn derivative(&self, var: &Var) -> f64 {
        match &*self.0 {
            Node::Const(_) | Node::Param(_) => 0.0,
            Node::Var(v) => {
                if v.same_as(var) {
                    1.0
                } else {
                    0.0
                }
            }
            Node::Add(a, b) => a.derivative(var) + b.derivative(var),
            Node::Sub(a, b) => a.derivative(var) - b.derivative(var),
            Node::Mul(a, b) => a.derivative(var) * b.evaluate() + a.evaluate() * b.derivative(var),
            Node::Div(a, b) => {
                let bv = b.evaluate();
                (a.derivative(var) * bv - a.evaluate() * b.derivative(var)) / (bv * bv)
            }
            Node::Neg(a) => -a.derivative(var),
            Node::Pow(a, e) => {
                let da = a.derivative(var);
                if da == 0.0 {
                    0.0
                } else {
                    e * a.evaluate().powf(e - 1.0) * da
                }
            }
            // sign is piecewise constant
            Node::Sign(_) => 0.0,
            Node::Abs(a) => signum0(a.evaluate()) * a.derivative(var),
            Node::Conditional { arms, otherwise } => {
                for (pred, branch) in arms {
                    if pred.evaluate() <= 0.0 {
                        return branch.derivative(var);
                    }
                }
                otherwise.derivative(var)
            }
        }
    }

    /// All variables referenced by this expression, deduplicated by cell
    /// identity, in order of first appearance.
    pub fn vars(&self) -> Vec<Var> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_vars(&mut seen, &mut out);
        out
    }

    fn collect_vars(&self, seen: &mut HashSet<usize>, out: &mut Vec<Var>) {
        match &*self.0 {
            Node::Const(_) | Node::Param(_) => {}
            Node::Var(v) => {
                if seen.insert(v.cell_addr()) {
                    out.push(v.clone());
                }
            }
            Node::Add(a, b) | Node::Sub(a, b) | Node::Mul(a, b) | Node::Div(a, b) => {
                a.collect_vars(seen, out);
                b.collect_vars(seen, out);
            }
            Node::Neg(a) | Node::Pow(a, _) | Node::Sign(a) | Node::Abs(a) => {
                a.collect_vars(seen, out);
            }
            Node::Conditional { arms, otherwise } => {
                for (pred, branch) in arms {
                    pred.collect_vars(seen, out);
                    branch.collect_vars(seen, out);
                }
                otherwise.collect_vars(seen, out);
            }
        }
    }
}

/// sign(0) = 0; `f64::signum` would give 1.0, which breaks the odd
/// symmetry of the sign-adjusted headloss terms at zero flow.
fn signum0(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Sign of an expression (piecewise constant: -1, 0, or 1).
pub fn sign(e: Expr) -> Expr {
    Expr(Rc::new(Node::Sign(e)))
}

/// Absolute value of an expression.
pub fn abs(e: Expr) -> Expr {
    Expr(Rc::new(Node::Abs(e)))
}

/// Builder for branch-selected expressions.
///
/// Arms are tested in insertion order; the first arm whose predicate
/// evaluates <= 0 supplies the value. `otherwise` closes the builder.
pub struct ConditionalExpr {
    arms: Vec<(Expr, Expr)>,
}

impl ConditionalExpr {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { arms: Vec::new() }
    }

    /// Add an arm: use `branch` when `predicate` evaluates <= 0.
    pub fn when(mut self, predicate: Expr, branch: Expr) -> Self {
        self.arms.push((predicate, branch));
        self
    }

    /// Close with the branch used when no predicate fires.
    pub fn otherwise(self, branch: Expr) -> Expr {
        Expr(Rc::new(Node::Conditional {
            arms: self.arms,
            otherwise: branch,
        }))
    }
}

// Operator overloads. Expressions are Rc trees, so by-value ops are cheap.

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr(Rc::new(Node::Add(self, rhs)))
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr(Rc::new(Node::Sub(self, rhs)))
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr(Rc::new(Node::Mul(self, rhs)))
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr(Rc::new(Node::Div(self, rhs)))
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr(Rc::new(Node::Neg(self)))
    }
}

impl Add<f64> for Expr {
    type Output = Expr;
    fn add(self, rhs: f64) -> Expr {
        self + Expr::constant(rhs)
    }
}

impl Add<Expr> for f64 {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::constant(self) + rhs
    }
}

impl Sub<f64> for Expr {
    type Output = Expr;
    fn sub(self, rhs: f64) -> Expr {
        self - Expr::constant(rhs)
    }
}

impl Sub<Expr> for f64 {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::constant(self) - rhs
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;
    fn mul(self, rhs: f64) -> Expr {
        self * Expr::constant(rhs)
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::constant(self) * rhs
    }
}
