//! Network element data: nodes, links, statuses, pump curves.

use pn_core::Real;
use serde::{Deserialize, Serialize};

/// Discrete regime of a link for the current solve.
///
/// `Active` only applies to regulating valves (pressure or flow pinned to
/// the setting); pipes and pumps are either `Open` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkStatus {
    Closed,
    Open,
    Active,
}

/// Discrete demand regime of a junction under pressure-dependent demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemandStatus {
    /// Pressure at or below the minimum: no demand delivered.
    Zero,
    /// Pressure between minimum and required: partial delivery.
    Partial,
    /// Pressure at or above the required value: full expected demand.
    Full,
}

/// Discrete regime of a leak orifice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeakRegime {
    /// No differential head across the orifice; discharge pinned to zero.
    Zero,
    /// Smoothed orifice law applies.
    Partial,
}

/// Leak orifice parameters attached to a junction or tank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakParams {
    /// Orifice area (m^2)
    pub area: Real,
    /// Discharge coefficient (typically 0.75)
    pub discharge_coeff: Real,
}

/// A demand node with unknown head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Junction {
    /// Elevation (m)
    pub elevation: Real,
    /// Base demand per category (m^3/s); the expected demand is their sum.
    pub base_demands: Vec<Real>,
    /// Pressure below which no demand is delivered (m, p_min)
    pub minimum_pressure: Real,
    /// Pressure at which the full expected demand is delivered (m, p_nom)
    pub required_pressure: Real,
    /// Leak orifice, if one is configured
    pub leak: Option<LeakParams>,
    /// Leak enabled for the current step
    pub leak_active: bool,

    // Regime tags, recomputed by the classifiers each solve pass.
    pub demand_status: DemandStatus,
    pub leak_regime: LeakRegime,
}

impl Junction {
    /// Total expected demand across categories (m^3/s).
    pub fn expected_demand(&self) -> Real {
        self.base_demands.iter().sum()
    }
}

/// A storage node; its head is fixed within a single time step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    /// Bottom elevation (m)
    pub elevation: Real,
    /// Water level above the bottom (m)
    pub level: Real,
    /// Leak orifice, if one is configured
    pub leak: Option<LeakParams>,
    /// Leak enabled for the current step
    pub leak_active: bool,
    pub leak_regime: LeakRegime,
}

impl Tank {
    /// Hydraulic head (m).
    pub fn head(&self) -> Real {
        self.elevation + self.level
    }
}

/// An infinite source/sink with fixed head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservoir {
    /// Fixed head (m)
    pub base_head: Real,
}

/// Node kind: junction, tank, or reservoir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Junction(Junction),
    Tank(Tank),
    Reservoir(Reservoir),
}

/// A node with identity and runtime isolation flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// No hydraulic path to any tank or reservoir.
    pub is_isolated: bool,
    pub kind: NodeKind,
}

impl Node {
    pub fn as_junction(&self) -> Option<&Junction> {
        match &self.kind {
            NodeKind::Junction(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_junction_mut(&mut self) -> Option<&mut Junction> {
        match &mut self.kind {
            NodeKind::Junction(j) => Some(j),
            _ => None,
        }
    }

    /// Elevation (m); for reservoirs this is the base head.
    pub fn elevation(&self) -> Real {
        match &self.kind {
            NodeKind::Junction(j) => j.elevation,
            NodeKind::Tank(t) => t.elevation,
            NodeKind::Reservoir(r) => r.base_head,
        }
    }

    /// Fixed head for tanks and reservoirs; None for junctions.
    pub fn source_head(&self) -> Option<Real> {
        match &self.kind {
            NodeKind::Junction(_) => None,
            NodeKind::Tank(t) => Some(t.head()),
            NodeKind::Reservoir(r) => Some(r.base_head),
        }
    }

    /// Leak parameters, for node kinds that can leak.
    pub fn leak(&self) -> Option<LeakParams> {
        match &self.kind {
            NodeKind::Junction(j) => j.leak,
            NodeKind::Tank(t) => t.leak,
            NodeKind::Reservoir(_) => None,
        }
    }

    /// Whether the leak flag is set for the current step.
    pub fn leak_enabled(&self) -> bool {
        match &self.kind {
            NodeKind::Junction(j) => j.leak_active,
            NodeKind::Tank(t) => t.leak_active,
            NodeKind::Reservoir(_) => false,
        }
    }

    pub fn leak_regime(&self) -> Option<LeakRegime> {
        match &self.kind {
            NodeKind::Junction(j) => Some(j.leak_regime),
            NodeKind::Tank(t) => Some(t.leak_regime),
            NodeKind::Reservoir(_) => None,
        }
    }

    pub fn set_leak_regime(&mut self, regime: LeakRegime) {
        match &mut self.kind {
            NodeKind::Junction(j) => j.leak_regime = regime,
            NodeKind::Tank(t) => t.leak_regime = regime,
            NodeKind::Reservoir(_) => {}
        }
    }
}

/// Pump head curve: `head_gain = A - B * q^C` for forward flow q.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PumpCurve {
    /// Design point (flow, head). The standard one-point fit gives
    /// A = 4h/3, B = h/(3 q^2), C = 2.
    SinglePoint { flow: Real, head: Real },
    /// Explicit fitted coefficients.
    Coefficients { a: Real, b: Real, c: Real },
}

impl PumpCurve {
    /// Head curve coefficients (A, B, C).
    pub fn head_curve_coefficients(&self) -> (Real, Real, Real) {
        match *self {
            PumpCurve::SinglePoint { flow, head } => {
                let a = 4.0 * head / 3.0;
                let b = head / (3.0 * flow * flow);
                (a, b, 2.0)
            }
            PumpCurve::Coefficients { a, b, c } => (a, b, c),
        }
    }
}

/// A pipe following the Hazen-Williams headloss law.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipe {
    /// Length (m)
    pub length: Real,
    /// Inner diameter (m)
    pub diameter: Real,
    /// Hazen-Williams roughness coefficient (dimensionless C factor)
    pub roughness: Real,
    /// Minor loss coefficient (sum of fitting K factors)
    pub minor_loss: Real,
}

/// A pump constrained to a fitted head curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadPump {
    pub curve: PumpCurve,
}

/// A pump delivering fixed power to the fluid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerPump {
    /// Power delivered to the fluid (W)
    pub power: Real,
}

/// Common valve data for PRV/FCV/TCV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valve {
    /// Valve diameter (m), used for the minor-loss resistance
    pub diameter: Real,
    /// Setting: pressure (m) for PRV, flow (m^3/s) for FCV,
    /// headloss coefficient for TCV
    pub setting: Real,
    /// Minor loss coefficient when fully open
    pub minor_loss: Real,
}

/// Link kind: pipe, pump, or valve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LinkKind {
    Pipe(Pipe),
    HeadPump(HeadPump),
    PowerPump(PowerPump),
    Prv(Valve),
    Fcv(Valve),
    Tcv(Valve),
}

/// A link with identity, endpoints (weak, by node name), and runtime status.
///
/// Positive flow is start -> end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub start_node: String,
    pub end_node: String,
    pub status: LinkStatus,
    pub is_isolated: bool,
    pub kind: LinkKind,
}

impl Link {
    pub fn as_valve(&self) -> Option<&Valve> {
        match &self.kind {
            LinkKind::Prv(v) | LinkKind::Fcv(v) | LinkKind::Tcv(v) => Some(v),
            _ => None,
        }
    }
}
