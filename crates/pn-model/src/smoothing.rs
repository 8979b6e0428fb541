//! C1-continuous blends between physical regimes.
//!
//! Every discontinuous relation in the model (laminar/turbulent headloss,
//! pump curve near zero flow, pressure-demand transitions, leak orifice near
//! zero differential head) is joined by a cubic fitted so value and slope
//! match the governing relations exactly at the two breakpoints. The fit is
//! a closed-form two-point Hermite solve, not iterative.

use pn_core::GRAVITY;
use thiserror::Error;
use tracing::warn;

/// Fatal configuration errors from smoothing setup.
#[derive(Error, Debug, Clone)]
pub enum SmoothingError {
    #[error("Invalid smoothing breakpoints: x1={x1} must be strictly below x2={x2}")]
    InvalidBreakpoints { x1: f64, x2: f64 },

    #[error("Non-finite smoothing input for {what}")]
    NonFinite { what: &'static str },

    #[error("Unsupported pump curve: {detail}")]
    UnsupportedCurve { detail: String },
}

/// Coefficients of `a*x^3 + b*x^2 + c*x + d`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCoeffs {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl CubicCoeffs {
    pub fn evaluate(&self, x: f64) -> f64 {
        ((self.a * x + self.b) * x + self.c) * x + self.d
    }

    pub fn slope(&self, x: f64) -> f64 {
        (3.0 * self.a * x + 2.0 * self.b) * x + self.c
    }
}

/// Fit a cubic through `(x1, f1)` and `(x2, f2)` with slopes `df1`, `df2`.
///
/// Four conditions, four unknowns; solved in closed form.
pub fn cubic_spline(
    x1: f64,
    x2: f64,
    f1: f64,
    f2: f64,
    df1: f64,
    df2: f64,
) -> Result<CubicCoeffs, SmoothingError> {
    for (v, what) in [
        (x1, "x1"),
        (x2, "x2"),
        (f1, "f1"),
        (f2, "f2"),
        (df1, "df1"),
        (df2, "df2"),
    ] {
        if !v.is_finite() {
            return Err(SmoothingError::NonFinite { what });
        }
    }
    if x1 >= x2 {
        return Err(SmoothingError::InvalidBreakpoints { x1, x2 });
    }

    let a = (2.0 * (f1 - f2) - (x1 - x2) * (df2 + df1))
        / (x2.powi(3) - x1.powi(3) + 3.0 * x1 * x2 * (x1 - x2));
    let b = (df1 - df2 + 3.0 * (x2.powi(2) - x1.powi(2)) * a) / (2.0 * (x1 - x2));
    let c = df2 - 3.0 * x2.powi(2) * a - 2.0 * x2 * b;
    let d = f2 - x2.powi(3) * a - x2.powi(2) * b - x2 * c;
    Ok(CubicCoeffs { a, b, c, d })
}

/// Blend for Hazen-Williams headloss near zero flow: joins the linear
/// relation `m*q` on `[0, q1]` to the power law `q^exp` beyond `q2`.
pub fn hazen_williams_coeffs(
    q1: f64,
    q2: f64,
    m: f64,
    exp: f64,
) -> Result<CubicCoeffs, SmoothingError> {
    let f1 = m * q1;
    let f2 = q2.powf(exp);
    let df1 = m;
    let df2 = exp * q2.powf(exp - 1.0);
    cubic_spline(q1, q2, f1, f2, df1, df2)
}

/// Blend for a head-pump curve `A - B*q^C` with exponent `C <= 1`: joins the
/// linear segment `slope*q + A` on `[.., q1]` to the curve beyond `q2`.
///
/// When the resulting cubic is not monotonically decreasing the coefficients
/// are still returned, with a warning; the solve may still converge on the
/// continuous approximation.
pub fn pump_poly_coefficients(
    a_coeff: f64,
    b_coeff: f64,
    c_exp: f64,
    q1: f64,
    q2: f64,
    slope: f64,
) -> Result<CubicCoeffs, SmoothingError> {
    let f1 = slope * q1 + a_coeff;
    let f2 = a_coeff - b_coeff * q2.powf(c_exp);
    let df1 = slope;
    let df2 = -b_coeff * c_exp * q2.powf(c_exp - 1.0);

    let coeffs = cubic_spline(q1, q2, f1, f2, df1, df2)?;
    let CubicCoeffs { a, b, .. } = coeffs;

    let monotone = if a <= 0.0 && b <= 0.0 {
        true
    } else if a <= 0.0 && b > 0.0 {
        q2 <= -2.0 * b / (6.0 * a) && df2 < 0.0
    } else {
        // a > 0.0
        df2 < 0.0
    };
    if !monotone {
        warn!(a, b, "pump smoothing polynomial is not monotonically decreasing");
    }
    Ok(coeffs)
}

/// Line extension for a head-pump curve with exponent `C > 1`: the point
/// `(q_bar, h_bar)` where the curve slope equals `slope`, so the low-flow
/// line `slope*(q - q_bar) + h_bar` leaves the curve tangentially.
pub fn pump_line_params(
    a_coeff: f64,
    b_coeff: f64,
    c_exp: f64,
    slope: f64,
) -> Result<(f64, f64), SmoothingError> {
    if b_coeff <= 0.0 || c_exp <= 1.0 {
        return Err(SmoothingError::UnsupportedCurve {
            detail: format!(
                "tangent extension requires B > 0 and C > 1, got B={b_coeff}, C={c_exp}"
            ),
        });
    }
    let q_bar = (slope / (-b_coeff * c_exp)).powf(1.0 / (c_exp - 1.0));
    let h_bar = a_coeff - b_coeff * q_bar.powf(c_exp);
    if !q_bar.is_finite() || !h_bar.is_finite() {
        return Err(SmoothingError::UnsupportedCurve {
            detail: format!("tangent point is not finite for B={b_coeff}, C={c_exp}"),
        });
    }
    Ok((q_bar, h_bar))
}

/// Lower transition of the pressure-demand relation: joins the near-zero
/// line `slope*(p - p_min)` to the square-root region at `p_min + delta`.
pub fn pdd_poly1_coefficients(
    p_min: f64,
    p_nom: f64,
    delta: f64,
    slope: f64,
) -> Result<CubicCoeffs, SmoothingError> {
    check_pdd_window(p_min, p_nom, delta)?;
    let span = p_nom - p_min;
    let x1 = p_min;
    let f1 = 0.0;
    let df1 = slope;
    let x2 = p_min + delta;
    let f2 = (delta / span).sqrt();
    let df2 = 0.5 * (delta / span).powf(-0.5) / span;
    cubic_spline(x1, x2, f1, f2, df1, df2)
}

/// Upper transition of the pressure-demand relation: joins the square-root
/// region to the full-demand line `slope*(p - p_nom) + 1` at `p_nom`.
pub fn pdd_poly2_coefficients(
    p_min: f64,
    p_nom: f64,
    delta: f64,
    slope: f64,
) -> Result<CubicCoeffs, SmoothingError> {
    check_pdd_window(p_min, p_nom, delta)?;
    let span = p_nom - p_min;
    let x1 = p_nom - delta;
    let f1 = ((x1 - p_min) / span).sqrt();
    let df1 = 0.5 * ((x1 - p_min) / span).powf(-0.5) / span;
    let x2 = p_nom;
    let f2 = 1.0;
    let df2 = slope;
    cubic_spline(x1, x2, f1, f2, df1, df2)
}

fn check_pdd_window(p_min: f64, p_nom: f64, delta: f64) -> Result<(), SmoothingError> {
    if delta <= 0.0 || p_min + delta >= p_nom - delta {
        return Err(SmoothingError::InvalidBreakpoints {
            x1: p_min + delta,
            x2: p_nom - delta,
        });
    }
    Ok(())
}

/// Smoothed leak orifice law `Cd * area * sqrt(2 g p)` on `[0, delta]`,
/// joined to the near-zero line `slope*p` at zero differential head.
pub fn leak_poly_coefficients(
    discharge_coeff: f64,
    area: f64,
    delta: f64,
    slope: f64,
) -> Result<CubicCoeffs, SmoothingError> {
    let x1 = 0.0;
    let f1 = 0.0;
    let df1 = slope;
    let x2 = delta;
    let f2 = discharge_coeff * area * (2.0 * GRAVITY * delta).sqrt();
    let df2 = 0.5 * discharge_coeff * area * (2.0 * GRAVITY / delta).sqrt();
    cubic_spline(x1, x2, f1, f2, df1, df2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spline_matches_anchors_exactly() {
        let c = cubic_spline(1.0, 3.0, 2.0, -4.0, 0.5, 1.25).unwrap();
        assert!((c.evaluate(1.0) - 2.0).abs() < 1e-12);
        assert!((c.evaluate(3.0) + 4.0).abs() < 1e-12);
        assert!((c.slope(1.0) - 0.5).abs() < 1e-12);
        assert!((c.slope(3.0) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn spline_rejects_reversed_breakpoints() {
        assert!(matches!(
            cubic_spline(3.0, 1.0, 0.0, 0.0, 0.0, 0.0),
            Err(SmoothingError::InvalidBreakpoints { .. })
        ));
        assert!(matches!(
            cubic_spline(1.0, 1.0, 0.0, 0.0, 0.0, 0.0),
            Err(SmoothingError::InvalidBreakpoints { .. })
        ));
    }

    #[test]
    fn spline_rejects_non_finite_input() {
        assert!(matches!(
            cubic_spline(0.0, 1.0, f64::NAN, 0.0, 0.0, 0.0),
            Err(SmoothingError::NonFinite { .. })
        ));
    }

    #[test]
    fn hazen_williams_blend_is_c1() {
        let q1 = 0.0002;
        let q2 = 0.0004;
        let m = 0.001;
        let exp = 1.852;
        let c = hazen_williams_coeffs(q1, q2, m, exp).unwrap();
        assert!((c.evaluate(q1) - m * q1).abs() < 1e-15);
        assert!((c.slope(q1) - m).abs() < 1e-9);
        assert!((c.evaluate(q2) - q2.powf(exp)).abs() < 1e-15);
        assert!((c.slope(q2) - exp * q2.powf(exp - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn pump_line_is_tangent_to_curve() {
        let (a_coeff, b_coeff, c_exp) = (40.0, 1000.0, 2.0);
        let slope = -1e-11;
        let (q_bar, h_bar) = pump_line_params(a_coeff, b_coeff, c_exp, slope).unwrap();
        assert!(q_bar > 0.0);
        // value matches
        assert!((h_bar - (a_coeff - b_coeff * q_bar.powf(c_exp))).abs() < 1e-12);
        // slope matches
        let curve_slope = -b_coeff * c_exp * q_bar.powf(c_exp - 1.0);
        assert!((curve_slope - slope).abs() < 1e-20);
    }

    #[test]
    fn pump_line_rejects_low_exponent() {
        assert!(matches!(
            pump_line_params(40.0, 1000.0, 1.0, -1e-11),
            Err(SmoothingError::UnsupportedCurve { .. })
        ));
        assert!(matches!(
            pump_line_params(40.0, -1.0, 2.0, -1e-11),
            Err(SmoothingError::UnsupportedCurve { .. })
        ));
    }

    #[test]
    fn pump_poly_anchors_curve_for_shallow_exponent() {
        let (a_coeff, b_coeff, c_exp) = (30.0, 500.0, 0.9);
        let (q1, q2, slope) = (0.0, 1e-8, -1e-11);
        let c = pump_poly_coefficients(a_coeff, b_coeff, c_exp, q1, q2, slope).unwrap();
        assert!((c.evaluate(q1) - a_coeff).abs() < 1e-9);
        let f2 = a_coeff - b_coeff * q2.powf(c_exp);
        assert!((c.evaluate(q2) - f2).abs() < 1e-9);
    }

    #[test]
    fn pdd_polys_anchor_the_four_regions() {
        let (p_min, p_nom, delta, slope) = (14.06, 17.57, 0.2, 1e-11);
        let span = p_nom - p_min;

        let p1 = pdd_poly1_coefficients(p_min, p_nom, delta, slope).unwrap();
        assert!(p1.evaluate(p_min).abs() < 1e-9);
        assert!((p1.evaluate(p_min + delta) - (delta / span).sqrt()).abs() < 1e-9);

        let p2 = pdd_poly2_coefficients(p_min, p_nom, delta, slope).unwrap();
        assert!((p2.evaluate(p_nom) - 1.0).abs() < 1e-9);
        assert!(
            (p2.evaluate(p_nom - delta) - ((span - delta) / span).sqrt()).abs() < 1e-9
        );
    }

    #[test]
    fn pdd_window_must_fit_between_thresholds() {
        // delta so large the two transition zones overlap
        assert!(matches!(
            pdd_poly1_coefficients(0.0, 1.0, 0.6, 1e-11),
            Err(SmoothingError::InvalidBreakpoints { .. })
        ));
    }

    #[test]
    fn leak_poly_is_zero_at_zero_head() {
        let c = leak_poly_coefficients(0.75, 1e-4, 1e-4, 1e-11).unwrap();
        assert!(c.evaluate(0.0).abs() < 1e-15);
        let f2 = 0.75 * 1e-4 * (2.0 * GRAVITY * 1e-4).sqrt();
        assert!((c.evaluate(1e-4) - f2).abs() < 1e-12);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn spline_interpolates_any_well_separated_anchors(
                x1 in -5.0f64..5.0,
                gap in 0.5f64..5.0,
                f1 in -10.0f64..10.0,
                f2 in -10.0f64..10.0,
                df1 in -10.0f64..10.0,
                df2 in -10.0f64..10.0,
            ) {
                let x2 = x1 + gap;
                let c = cubic_spline(x1, x2, f1, f2, df1, df2).unwrap();
                let scale = f1.abs().max(f2.abs()).max(1.0);
                prop_assert!((c.evaluate(x1) - f1).abs() < 1e-8 * scale);
                prop_assert!((c.evaluate(x2) - f2).abs() < 1e-8 * scale);
                let dscale = df1.abs().max(df2.abs()).max(1.0);
                prop_assert!((c.slope(x1) - df1).abs() < 1e-7 * dscale);
                prop_assert!((c.slope(x2) - df2).abs() < 1e-7 * dscale);
            }

            #[test]
            fn pdd_blends_are_monotone_within_unit_fraction(
                p_min in 0.0f64..10.0,
                span in 2.0f64..30.0,
                delta in 0.05f64..0.5,
            ) {
                let p_nom = p_min + span;
                let p1 = pdd_poly1_coefficients(p_min, p_nom, delta, 1e-11).unwrap();
                let p2 = pdd_poly2_coefficients(p_min, p_nom, delta, 1e-11).unwrap();
                let steps = 50;
                let mut prev_lo = f64::NEG_INFINITY;
                let mut prev_hi = f64::NEG_INFINITY;
                for i in 0..=steps {
                    let t = i as f64 / steps as f64;
                    let lo = p1.evaluate(p_min + t * delta);
                    let hi = p2.evaluate(p_nom - delta + t * delta);
                    prop_assert!(lo >= -1e-9 && lo <= 1.0 + 1e-9, "lower blend {lo}");
                    prop_assert!(hi >= -1e-9 && hi <= 1.0 + 1e-9, "upper blend {hi}");
                    prop_assert!(lo + 1e-9 >= prev_lo, "lower blend decreased at t={t}");
                    prop_assert!(hi + 1e-9 >= prev_hi, "upper blend decreased at t={t}");
                    prev_lo = lo;
                    prev_hi = hi;
                }
            }
        }
    }
}
