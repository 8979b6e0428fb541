//! Hazen-Williams headloss for pipes.
//!
//! Three flow regions, joined C1-continuously at the shared breakpoints
//! `hw_q1` and `hw_q2`:
//!   |q| <= q1          linear,  K*m*q
//!   q1 < |q| <= q2     cubic blend (odd extension via sign)
//!   |q| > q2           power law, sign(q)*K*|q|^1.852
//! plus the signed minor-loss quadratic. The residual is written as
//! `start_h - end_h - headloss`, so a Closed or isolated pipe reduces to
//! `flow == 0`.

use crate::error::ModelResult;
use crate::model::HydraulicModel;
use crate::registry::{AttrValue, Attribute, BuilderKind, ChangeRegistry, Element};
use pn_expr::{abs, sign, ConditionalExpr, Constraint};
use pn_network::{LinkStatus, Network};

pub(super) fn build(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    let names = super::narrowed(wn.pipe_names(), index_over);
    for name in names {
        m.hazen_williams_headloss.remove(&name);

        let link = super::fetch_link(wn, &name)?;
        let f = m.flow[&name].expr();

        let con = if link.status == LinkStatus::Closed || link.is_isolated {
            Constraint::new(format!("hazen_williams_headloss[{name}]"), f)
        } else {
            let (start_h, end_h) = super::endpoint_heads(m, wn, link)?;
            let k = m.hw_resistance[&name].expr();
            let minor_k = m.minor_loss[&name].expr();
            let c = &m.constants;
            let minor_term =
                sign(f.clone()) * minor_k * f.clone().powf(crate::constants::HW_MINOR_EXP);

            let blend = c.hw_a.expr() * f.clone().powf(3.0)
                + sign(f.clone()) * c.hw_b.expr() * f.clone().powf(2.0)
                + c.hw_c.expr() * f.clone()
                + sign(f.clone()) * c.hw_d.expr();

            let expr = ConditionalExpr::new()
                .when(
                    abs(f.clone()) - c.hw_q1.expr(),
                    -(k.clone() * c.hw_m.expr() * f.clone()) - minor_term.clone()
                        + start_h.clone()
                        - end_h.clone(),
                )
                .when(
                    abs(f.clone()) - c.hw_q2.expr(),
                    -(k.clone() * blend) - minor_term.clone() + start_h.clone() - end_h.clone(),
                )
                .otherwise(
                    -(sign(f.clone()) * k * abs(f).powf(crate::constants::HW_EXP)) - minor_term
                        + start_h
                        - end_h,
                );
            Constraint::new(format!("hazen_williams_headloss[{name}]"), expr)
        };
        m.hazen_williams_headloss.insert(name.clone(), con);

        let el = Element::Link(name.clone());
        reg.register(el.clone(), Attribute::Status, BuilderKind::HazenWilliams);
        reg.register(el.clone(), Attribute::Isolated, BuilderKind::HazenWilliams);
        reg.observe(el.clone(), Attribute::Status, AttrValue::Status(link.status));
        reg.observe(el, Attribute::Isolated, AttrValue::Bool(link.is_isolated));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{HW_EXP, HW_K};
    use crate::options::HydraulicOptions;
    use pn_network::NetworkBuilder;

    fn single_pipe(minor_loss: f64) -> Network {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R1", 60.0);
        b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
        b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, minor_loss);
        b.build().unwrap()
    }

    fn built(wn: &Network) -> HydraulicModel {
        let mut m = HydraulicModel::new(wn, HydraulicOptions::default()).unwrap();
        let mut reg = ChangeRegistry::new();
        build(&mut m, wn, &mut reg, None).unwrap();
        m
    }

    #[test]
    fn turbulent_region_matches_power_law() {
        let wn = single_pipe(0.0);
        let m = built(&wn);
        let k = m.hw_resistance["P1"].value();
        let q = 0.05;
        m.flow["P1"].set_value(q);
        m.head["J1"].set_value(20.0);
        let r = m.hazen_williams_headloss["P1"].evaluate();
        // residual = start_h - end_h - K q^1.852
        assert!((r - (60.0 - 20.0 - k * q.powf(HW_EXP))).abs() < 1e-9);
    }

    #[test]
    fn negative_flow_is_odd_symmetric() {
        let wn = single_pipe(0.5);
        let m = built(&wn);
        m.head["J1"].set_value(60.0); // same head both ends
        let q = 0.05;
        m.flow["P1"].set_value(q);
        let pos = m.hazen_williams_headloss["P1"].evaluate();
        m.flow["P1"].set_value(-q);
        let neg = m.hazen_williams_headloss["P1"].evaluate();
        assert!((pos + neg).abs() < 1e-9);
    }

    #[test]
    fn continuity_and_slope_across_breakpoints() {
        let wn = single_pipe(0.2);
        let m = built(&wn);
        m.head["J1"].set_value(20.0);
        let con = &m.hazen_williams_headloss["P1"];
        let fvar = &m.flow["P1"];
        let q1 = m.constants.hw_q1.value();
        let q2 = m.constants.hw_q2.value();
        for bp in [q1, q2, -q1, -q2] {
            let eps = 1e-9;
            fvar.set_value(bp - eps);
            let below = con.evaluate();
            fvar.set_value(bp + eps);
            let above = con.evaluate();
            assert!(
                (below - above).abs() < 1e-6,
                "discontinuity at {bp}: {below} vs {above}"
            );
        }
        // finite-difference derivative matches AD near the upper breakpoint
        let q = q2 * 1.5;
        let h = 1e-9;
        fvar.set_value(q - h);
        let lo = con.evaluate();
        fvar.set_value(q + h);
        let hi = con.evaluate();
        fvar.set_value(q);
        let fd = (hi - lo) / (2.0 * h);
        assert!((fd - con.derivative(fvar)).abs() < 1e-4 * fd.abs().max(1.0));
    }

    #[test]
    fn closed_pipe_pins_flow() {
        let mut wn = single_pipe(0.0);
        wn.link_mut("P1").unwrap().status = LinkStatus::Closed;
        let m = built(&wn);
        m.flow["P1"].set_value(0.3);
        assert!((m.hazen_williams_headloss["P1"].evaluate() - 0.3).abs() < 1e-15);
        // head does not appear in the pinned constraint
        assert_eq!(m.hazen_williams_headloss["P1"].vars().len(), 1);
    }

    #[test]
    fn isolated_pipe_pins_flow() {
        let mut wn = single_pipe(0.0);
        wn.link_mut("P1").unwrap().is_isolated = true;
        let m = built(&wn);
        m.flow["P1"].set_value(0.01);
        assert!((m.hazen_williams_headloss["P1"].evaluate() - 0.01).abs() < 1e-15);
    }

    #[test]
    fn resistance_formula() {
        let wn = single_pipe(0.0);
        let m = built(&wn);
        let expected = HW_K * 130.0f64.powf(-HW_EXP) * 0.3f64.powf(-4.871) * 300.0;
        assert!((m.hw_resistance["P1"].value() - expected).abs() < 1e-9 * expected);
    }
}
