//! pn-expr: algebraic expression primitives with automatic differentiation.
//!
//! This crate is the narrow seam between the constraint-assembly core and
//! the nonlinear solver: expressions support `+`, `-`, `*`, constant powers,
//! `sign`, `abs`, and branch selection via [`ConditionalExpr`], and can be
//! evaluated and differentiated at the current variable values.
//!
//! # Example
//!
//! ```
//! use pn_expr::{Var, abs, sign};
//!
//! let q = Var::new("flow", 2.0);
//! let headloss = sign(q.expr()) * abs(q.expr()).powf(1.852);
//! assert!((headloss.evaluate() - 2.0f64.powf(1.852)).abs() < 1e-12);
//! let slope = headloss.derivative(&q);
//! assert!((slope - 1.852 * 2.0f64.powf(0.852)).abs() < 1e-9);
//! ```

pub mod constraint;
pub mod expr;
pub mod vars;

pub use constraint::Constraint;
pub use expr::{ConditionalExpr, Expr, abs, sign};
pub use vars::{Param, Var};
