//! Variable and parameter value cells.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

struct ValueCell {
    name: String,
    value: Cell<f64>,
}

/// A solver unknown: a named, shared, mutable scalar.
///
/// Cloning a `Var` clones the handle, not the cell; all clones observe
/// `set_value`. Identity (for differentiation and solver indexing) is the
/// cell, not the name.
#[derive(Clone)]
pub struct Var(Rc<ValueCell>);

impl Var {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self(Rc::new(ValueCell {
            name: name.into(),
            value: Cell::new(value),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn value(&self) -> f64 {
        self.0.value.get()
    }

    pub fn set_value(&self, value: f64) {
        self.0.value.set(value);
    }

    /// Identity comparison: true iff both handles refer to the same cell.
    pub fn same_as(&self, other: &Var) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn cell_addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Expression referencing this variable.
    pub fn expr(&self) -> crate::Expr {
        crate::Expr::var(self)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var({}={})", self.name(), self.value())
    }
}

/// A model constant: same cell shape as [`Var`], but never solved for and
/// treated as constant under differentiation. Mutability allows smoothing
/// coefficients to be recomputed in place when an underlying curve changes.
#[derive(Clone)]
pub struct Param(Rc<ValueCell>);

impl Param {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self(Rc::new(ValueCell {
            name: name.into(),
            value: Cell::new(value),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn value(&self) -> f64 {
        self.0.value.get()
    }

    pub fn set_value(&self, value: f64) {
        self.0.value.set(value);
    }

    /// Expression referencing this parameter.
    pub fn expr(&self) -> crate::Expr {
        crate::Expr::param(self)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Param({}={})", self.name(), self.value())
    }
}
