//! The hydraulic model: named variable, parameter, and constraint
//! collections over one network.
//!
//! Variables are the solver unknowns (flows, junction heads, delivered
//! demands under pressure-dependent demand, leak rates). Parameters are
//! everything the constraints read but the solver does not touch: fixed
//! heads, resistances, settings, smoothing coefficients. All collections
//! are keyed by entity name in `BTreeMap`s so iteration order, and with it
//! solver assembly, is deterministic.

use crate::constants::{Constants, HW_EXP, HW_K};
use crate::error::ModelResult;
use crate::options::{DemandModel, HydraulicOptions};
use crate::registry::{BuilderKind, ChangeRegistry};
use crate::smoothing::{self, CubicCoeffs};
use pn_core::{GRAVITY, ensure_finite};
use pn_expr::{Constraint, Expr, Param, Var};
use pn_network::{LinkKind, Network, Node, NodeKind, PumpCurve};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// One live constraint per entity within a named category.
pub type ConstraintSet = BTreeMap<String, Constraint>;

/// Cubic coefficients stored as four named parameters, referenced from
/// constraint expressions.
#[derive(Debug)]
pub struct Poly4 {
    pub a: Param,
    pub b: Param,
    pub c: Param,
    pub d: Param,
}

impl Poly4 {
    fn new(prefix: &str, entity: &str, coeffs: CubicCoeffs) -> Self {
        Self {
            a: Param::new(format!("{prefix}_a[{entity}]"), coeffs.a),
            b: Param::new(format!("{prefix}_b[{entity}]"), coeffs.b),
            c: Param::new(format!("{prefix}_c[{entity}]"), coeffs.c),
            d: Param::new(format!("{prefix}_d[{entity}]"), coeffs.d),
        }
    }

    /// `a*x^3 + b*x^2 + c*x + d` over an expression.
    pub fn expr(&self, x: &Expr) -> Expr {
        self.a.expr() * x.clone().powf(3.0)
            + self.b.expr() * x.clone().powf(2.0)
            + self.c.expr() * x.clone()
            + self.d.expr()
    }
}

/// Low-flow treatment of a head-pump curve.
#[derive(Debug)]
pub enum PumpSmoothing {
    /// Exponent C <= 1: cubic blend between the low-flow line and the curve.
    Cubic(Poly4),
    /// Exponent C > 1: straight line below the tangent flow `q_bar`.
    Line { q_bar: Param, h_bar: Param },
}

/// Cached head-pump coefficients and their smoothing, refit only when the
/// curve's (A, B, C) snapshot changes.
#[derive(Debug)]
pub struct PumpParams {
    pub a: Param,
    pub b: Param,
    /// Curve exponent; a constant of the expression, not a cell.
    pub c: f64,
    pub smoothing: PumpSmoothing,
    snapshot: [u64; 3],
}

/// Named variable/parameter/constraint collections for one network.
pub struct HydraulicModel {
    pub options: HydraulicOptions,
    pub constants: Constants,

    // Unknowns
    pub flow: BTreeMap<String, Var>,
    pub head: BTreeMap<String, Var>,
    /// Delivered demand; populated only under pressure-dependent demand.
    pub demand: BTreeMap<String, Var>,
    pub leak_rate: BTreeMap<String, Var>,

    // Node parameters
    pub source_head: BTreeMap<String, Param>,
    pub elevation: BTreeMap<String, Param>,
    pub expected_demand: BTreeMap<String, Param>,
    pub pmin: BTreeMap<String, Param>,
    pub pnom: BTreeMap<String, Param>,
    pub pdd_poly1: BTreeMap<String, Poly4>,
    pub pdd_poly2: BTreeMap<String, Poly4>,
    pub leak_area: BTreeMap<String, Param>,
    pub leak_coeff: BTreeMap<String, Param>,
    pub leak_poly: BTreeMap<String, Poly4>,

    // Link parameters
    pub hw_resistance: BTreeMap<String, Param>,
    pub minor_loss: BTreeMap<String, Param>,
    pub valve_setting: BTreeMap<String, Param>,
    pub tcv_resistance: BTreeMap<String, Param>,
    pub pump_power: BTreeMap<String, Param>,
    pub pump: BTreeMap<String, PumpParams>,

    // Constraint collections, one live constraint per entity each
    pub mass_balance: ConstraintSet,
    pub pdd_mass_balance: ConstraintSet,
    pub hazen_williams_headloss: ConstraintSet,
    pub head_pump_headloss: ConstraintSet,
    pub power_pump_headloss: ConstraintSet,
    pub prv_headloss: ConstraintSet,
    pub fcv_headloss: ConstraintSet,
    pub tcv_headloss: ConstraintSet,
    pub pdd: ConstraintSet,
    pub leak_con: ConstraintSet,
}

/// Resistance of a minor-loss element: `8 k / (g pi^2 d^4)`, i.e.
/// `k / (2 g A^2)` for a circular cross-section.
fn minor_loss_resistance(k: f64, diameter: f64) -> f64 {
    8.0 * k / (GRAVITY * PI.powi(2) * diameter.powi(4))
}

impl HydraulicModel {
    /// Create all variables and parameters for `wn`. Constraints start
    /// empty; call [`HydraulicModel::build_all`] next.
    pub fn new(wn: &Network, options: HydraulicOptions) -> ModelResult<Self> {
        let constants = Constants::new(&options)?;
        let mut m = Self {
            options,
            constants,
            flow: BTreeMap::new(),
            head: BTreeMap::new(),
            demand: BTreeMap::new(),
            leak_rate: BTreeMap::new(),
            source_head: BTreeMap::new(),
            elevation: BTreeMap::new(),
            expected_demand: BTreeMap::new(),
            pmin: BTreeMap::new(),
            pnom: BTreeMap::new(),
            pdd_poly1: BTreeMap::new(),
            pdd_poly2: BTreeMap::new(),
            leak_area: BTreeMap::new(),
            leak_coeff: BTreeMap::new(),
            leak_poly: BTreeMap::new(),
            hw_resistance: BTreeMap::new(),
            minor_loss: BTreeMap::new(),
            valve_setting: BTreeMap::new(),
            tcv_resistance: BTreeMap::new(),
            pump_power: BTreeMap::new(),
            pump: BTreeMap::new(),
            mass_balance: ConstraintSet::new(),
            pdd_mass_balance: ConstraintSet::new(),
            hazen_williams_headloss: ConstraintSet::new(),
            head_pump_headloss: ConstraintSet::new(),
            power_pump_headloss: ConstraintSet::new(),
            prv_headloss: ConstraintSet::new(),
            fcv_headloss: ConstraintSet::new(),
            tcv_headloss: ConstraintSet::new(),
            pdd: ConstraintSet::new(),
            leak_con: ConstraintSet::new(),
        };

        for node in wn.nodes() {
            let name = node.name.clone();
            m.elevation.insert(
                name.clone(),
                Param::new(format!("elevation[{name}]"), node.elevation()),
            );
            match &node.kind {
                NodeKind::Junction(j) => {
                    m.head.insert(
                        name.clone(),
                        Var::new(format!("head[{name}]"), j.elevation),
                    );
                    let expected = j.expected_demand();
                    m.expected_demand.insert(
                        name.clone(),
                        Param::new(format!("expected_demand[{name}]"), expected),
                    );
                    m.pmin.insert(
                        name.clone(),
                        Param::new(format!("pmin[{name}]"), j.minimum_pressure),
                    );
                    m.pnom.insert(
                        name.clone(),
                        Param::new(format!("pnom[{name}]"), j.required_pressure),
                    );
                    if m.options.demand_model == DemandModel::PressureDependent {
                        m.demand.insert(
                            name.clone(),
                            Var::new(format!("demand[{name}]"), expected),
                        );
                        let delta = m.constants.pdd_smoothing_delta;
                        let slope = m.constants.pdd_slope.value();
                        let p1 = smoothing::pdd_poly1_coefficients(
                            j.minimum_pressure,
                            j.required_pressure,
                            delta,
                            slope,
                        )?;
                        let p2 = smoothing::pdd_poly2_coefficients(
                            j.minimum_pressure,
                            j.required_pressure,
                            delta,
                            slope,
                        )?;
                        m.pdd_poly1.insert(name.clone(), Poly4::new("pdd1", &name, p1));
                        m.pdd_poly2.insert(name.clone(), Poly4::new("pdd2", &name, p2));
                    }
                }
                NodeKind::Tank(t) => {
                    m.source_head.insert(
                        name.clone(),
                        Param::new(format!("source_head[{name}]"), t.head()),
                    );
                }
                NodeKind::Reservoir(r) => {
                    m.source_head.insert(
                        name.clone(),
                        Param::new(format!("source_head[{name}]"), r.base_head),
                    );
                }
            }
            if !matches!(node.kind, NodeKind::Reservoir(_)) {
                m.leak_rate.insert(
                    name.clone(),
                    Var::new(format!("leak_rate[{name}]"), 0.0),
                );
                if let Some(leak) = node.leak() {
                    m.leak_area.insert(
                        name.clone(),
                        Param::new(format!("leak_area[{name}]"), leak.area),
                    );
                    m.leak_coeff.insert(
                        name.clone(),
                        Param::new(format!("leak_coeff[{name}]"), leak.discharge_coeff),
                    );
                    let poly = smoothing::leak_poly_coefficients(
                        leak.discharge_coeff,
                        leak.area,
                        m.constants.leak_delta,
                        m.constants.leak_slope.value(),
                    )?;
                    m.leak_poly.insert(name.clone(), Poly4::new("leak", &name, poly));
                }
            }
        }

        for link in wn.links() {
            let name = link.name.clone();
            m.flow
                .insert(name.clone(), Var::new(format!("flow[{name}]"), 0.001));
            match &link.kind {
                LinkKind::Pipe(p) => {
                    let k = ensure_finite(
                        HW_K * p.roughness.powf(-HW_EXP) * p.diameter.powf(-4.871) * p.length,
                        "pipe resistance",
                    )?;
                    m.hw_resistance
                        .insert(name.clone(), Param::new(format!("hw_resistance[{name}]"), k));
                    m.minor_loss.insert(
                        name.clone(),
                        Param::new(
                            format!("minor_loss[{name}]"),
                            minor_loss_resistance(p.minor_loss, p.diameter),
                        ),
                    );
                }
                LinkKind::HeadPump(pump) => {
                    m.refresh_pump_params(&name, &pump.curve)?;
                }
                LinkKind::PowerPump(pump) => {
                    m.pump_power.insert(
                        name.clone(),
                        Param::new(format!("pump_power[{name}]"), pump.power),
                    );
                }
                LinkKind::Prv(v) | LinkKind::Fcv(v) => {
                    m.valve_setting.insert(
                        name.clone(),
                        Param::new(format!("valve_setting[{name}]"), v.setting),
                    );
                    m.minor_loss.insert(
                        name.clone(),
                        Param::new(
                            format!("minor_loss[{name}]"),
                            minor_loss_resistance(v.minor_loss, v.diameter),
                        ),
                    );
                }
                LinkKind::Tcv(v) => {
                    let r = ensure_finite(
                        minor_loss_resistance(v.setting, v.diameter),
                        "throttle resistance",
                    )?;
                    m.tcv_resistance.insert(
                        name.clone(),
                        Param::new(format!("tcv_resistance[{name}]"), r),
                    );
                    m.minor_loss.insert(
                        name.clone(),
                        Param::new(
                            format!("minor_loss[{name}]"),
                            minor_loss_resistance(v.minor_loss, v.diameter),
                        ),
                    );
                }
            }
        }

        Ok(m)
    }

    /// Fit (or refit) the cached pump coefficients and smoothing for one
    /// head pump. A no-op when the curve's (A, B, C) snapshot is unchanged.
    pub fn refresh_pump_params(&mut self, name: &str, curve: &PumpCurve) -> ModelResult<()> {
        let (a, b, c) = curve.head_curve_coefficients();
        let snapshot = [a.to_bits(), b.to_bits(), c.to_bits()];
        if let Some(existing) = self.pump.get(name)
            && existing.snapshot == snapshot
        {
            return Ok(());
        }

        let q1 = self.constants.pump_q1.value();
        let q2 = self.constants.pump_q2.value();
        let slope = self.constants.pump_slope.value();
        let smoothing = if c <= 1.0 {
            let coeffs = smoothing::pump_poly_coefficients(a, b, c, q1, q2, slope)?;
            PumpSmoothing::Cubic(Poly4::new("pump", name, coeffs))
        } else {
            let (q_bar, h_bar) = smoothing::pump_line_params(a, b, c, slope)?;
            PumpSmoothing::Line {
                q_bar: Param::new(format!("pump_qbar[{name}]"), q_bar),
                h_bar: Param::new(format!("pump_hbar[{name}]"), h_bar),
            }
        };
        self.pump.insert(
            name.to_owned(),
            PumpParams {
                a: Param::new(format!("pump_A[{name}]"), a),
                b: Param::new(format!("pump_B[{name}]"), b),
                c,
                smoothing,
                snapshot,
            },
        );
        Ok(())
    }

    /// Head expression for a node: junction head variable, or the fixed
    /// source-head parameter for tanks and reservoirs.
    pub fn node_head_expr(&self, node: &Node) -> Expr {
        match &node.kind {
            NodeKind::Junction(_) => self.head[&node.name].expr(),
            NodeKind::Tank(_) | NodeKind::Reservoir(_) => self.source_head[&node.name].expr(),
        }
    }

    /// Copy current tank/reservoir heads from the network into the fixed
    /// head parameters (tank levels move between time steps).
    pub fn sync_source_heads(&self, wn: &Network) {
        for node in wn.nodes() {
            if let Some(h) = node.source_head() {
                self.source_head[&node.name].set_value(h);
            }
        }
    }

    /// Build every constraint collection from scratch for the current
    /// network state.
    pub fn build_all(&mut self, wn: &Network, reg: &mut ChangeRegistry) -> ModelResult<()> {
        use crate::constraints::dispatch;
        let mass = match self.options.demand_model {
            DemandModel::DemandDriven => BuilderKind::MassBalance,
            DemandModel::PressureDependent => BuilderKind::PddMassBalance,
        };
        dispatch(mass, self, wn, reg, None)?;
        dispatch(BuilderKind::HazenWilliams, self, wn, reg, None)?;
        dispatch(BuilderKind::HeadPump, self, wn, reg, None)?;
        dispatch(BuilderKind::PowerPump, self, wn, reg, None)?;
        dispatch(BuilderKind::Prv, self, wn, reg, None)?;
        dispatch(BuilderKind::Fcv, self, wn, reg, None)?;
        dispatch(BuilderKind::Tcv, self, wn, reg, None)?;
        if self.options.demand_model == DemandModel::PressureDependent {
            dispatch(BuilderKind::Pdd, self, wn, reg, None)?;
        }
        dispatch(BuilderKind::Leak, self, wn, reg, None)?;
        Ok(())
    }

    /// All constraint collections in the fixed assembly order.
    pub fn constraint_sets(&self) -> Vec<(&'static str, &ConstraintSet)> {
        vec![
            ("mass_balance", &self.mass_balance),
            ("pdd_mass_balance", &self.pdd_mass_balance),
            ("hazen_williams_headloss", &self.hazen_williams_headloss),
            ("head_pump_headloss", &self.head_pump_headloss),
            ("power_pump_headloss", &self.power_pump_headloss),
            ("prv_headloss", &self.prv_headloss),
            ("fcv_headloss", &self.fcv_headloss),
            ("tcv_headloss", &self.tcv_headloss),
            ("pdd", &self.pdd),
            ("leak_con", &self.leak_con),
        ]
    }
}
