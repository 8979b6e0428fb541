//! Shared per-run constants of the constraint system.
//!
//! Breakpoints and near-zero slopes are fixed for the whole run; the
//! Hazen-Williams blend polynomial depends only on them, so it is fitted
//! once here. Per-entity coefficients (pump blends, PDD transitions, leak
//! polynomials) live on [`crate::HydraulicModel`] instead, since they change
//! when the entity's curve or thresholds change.

use crate::options::HydraulicOptions;
use crate::smoothing::{self, SmoothingError};
use pn_expr::Param;

/// Hazen-Williams resistance prefactor for SI units:
/// `K = HW_K * C^-1.852 * d^-4.871 * L`.
pub const HW_K: f64 = 10.666829500036352;

/// Hazen-Williams flow exponent.
pub const HW_EXP: f64 = 1.852;

/// Minor-loss flow exponent.
pub const HW_MINOR_EXP: f64 = 2.0;

/// Water density times gravity (N/m^3), used by the power-pump relation.
pub const RHO_G: f64 = 9.81 * 1000.0;

/// Shared smoothing constants, exposed as [`Param`]s so constraint
/// expressions reference the same cells everywhere.
pub struct Constants {
    /// Upper bound of the linear Hazen-Williams region (m^3/s).
    pub hw_q1: Param,
    /// Lower bound of the power-law Hazen-Williams region (m^3/s).
    pub hw_q2: Param,
    /// Slope of the linear Hazen-Williams region.
    pub hw_m: Param,
    /// Hazen-Williams blend cubic on `[hw_q1, hw_q2]`.
    pub hw_a: Param,
    pub hw_b: Param,
    pub hw_c: Param,
    pub hw_d: Param,

    /// Lower breakpoint of the head-pump blend (m^3/s).
    pub pump_q1: Param,
    /// Upper breakpoint of the head-pump blend (m^3/s).
    pub pump_q2: Param,
    /// Slope of the pump curve's low-flow linear segment.
    pub pump_slope: Param,

    /// Near-threshold slope of the pressure-demand relation.
    pub pdd_slope: Param,
    /// Near-zero slope of the leak orifice relation.
    pub leak_slope: Param,

    /// Width of the PDD cubic transition zones (m of pressure head).
    pub pdd_smoothing_delta: f64,
    /// Width of the smoothed leak region (m of head).
    pub leak_delta: f64,
}

impl Constants {
    pub fn new(options: &HydraulicOptions) -> Result<Self, SmoothingError> {
        let hw_q1 = 2e-4;
        let hw_q2 = 4e-4;
        let hw_m = 1e-3;
        let blend = smoothing::hazen_williams_coeffs(hw_q1, hw_q2, hw_m, HW_EXP)?;

        Ok(Self {
            hw_q1: Param::new("hw_q1", hw_q1),
            hw_q2: Param::new("hw_q2", hw_q2),
            hw_m: Param::new("hw_m", hw_m),
            hw_a: Param::new("hw_a", blend.a),
            hw_b: Param::new("hw_b", blend.b),
            hw_c: Param::new("hw_c", blend.c),
            hw_d: Param::new("hw_d", blend.d),
            pump_q1: Param::new("pump_q1", 0.0),
            pump_q2: Param::new("pump_q2", 1e-8),
            pump_slope: Param::new("pump_slope", -1e-11),
            pdd_slope: Param::new("pdd_slope", 1e-11),
            leak_slope: Param::new("leak_slope", 1e-11),
            pdd_smoothing_delta: options.pdd_smoothing_delta,
            leak_delta: options.leak_delta,
        })
    }
}
