//! Pump head-gain constraints.
//!
//! Head pumps follow the fitted curve `head_gain = A - B*q^C`, with the
//! low-flow side handled per exponent: C <= 1 uses a cubic blend into a
//! near-horizontal line, C > 1 switches to the tangent line below the flow
//! where the curve slope reaches `pump_slope`. Power pumps need no
//! smoothing; `power + (start_h - end_h)*q*rho*g = 0` is differentiable
//! everywhere.

use crate::constants::RHO_G;
use crate::error::ModelResult;
use crate::model::{HydraulicModel, PumpSmoothing};
use crate::registry::{AttrValue, Attribute, BuilderKind, ChangeRegistry, Element};
use pn_expr::{ConditionalExpr, Constraint};
use pn_network::{LinkKind, LinkStatus, Network};

pub(super) fn build_head_pump(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    let names = super::narrowed(wn.head_pump_names(), index_over);
    for name in names {
        m.head_pump_headloss.remove(&name);

        let link = super::fetch_link(wn, &name)?;
        let LinkKind::HeadPump(pump) = &link.kind else {
            continue;
        };
        m.refresh_pump_params(&name, &pump.curve)?;
        let f = m.flow[&name].expr();

        let con = if link.status == LinkStatus::Closed || link.is_isolated {
            Constraint::new(format!("head_pump_headloss[{name}]"), f)
        } else {
            let (start_h, end_h) = super::endpoint_heads(m, wn, link)?;
            let params = &m.pump[&name];
            let curve = params.a.expr() - params.b.expr() * f.clone().powf(params.c)
                - end_h.clone()
                + start_h.clone();

            let expr = match &params.smoothing {
                PumpSmoothing::Cubic(poly) => ConditionalExpr::new()
                    .when(
                        f.clone() - m.constants.pump_q1.expr(),
                        m.constants.pump_slope.expr() * f.clone() + params.a.expr() - end_h.clone()
                            + start_h.clone(),
                    )
                    .when(f.clone() - m.constants.pump_q2.expr(), poly.expr(&f) - end_h + start_h)
                    .otherwise(curve),
                PumpSmoothing::Line { q_bar, h_bar } => ConditionalExpr::new()
                    .when(
                        f.clone() - q_bar.expr(),
                        m.constants.pump_slope.expr() * (f.clone() - q_bar.expr()) + h_bar.expr()
                            - end_h
                            + start_h,
                    )
                    .otherwise(curve),
            };
            Constraint::new(format!("head_pump_headloss[{name}]"), expr)
        };
        m.head_pump_headloss.insert(name.clone(), con);

        let (a, b, c) = pump.curve.head_curve_coefficients();
        let el = Element::Link(name.clone());
        reg.register(el.clone(), Attribute::Status, BuilderKind::HeadPump);
        reg.register(el.clone(), Attribute::Isolated, BuilderKind::HeadPump);
        reg.register(el.clone(), Attribute::PumpCurve, BuilderKind::HeadPump);
        reg.observe(el.clone(), Attribute::Status, AttrValue::Status(link.status));
        reg.observe(el.clone(), Attribute::Isolated, AttrValue::Bool(link.is_isolated));
        reg.observe(el, Attribute::PumpCurve, AttrValue::curve(a, b, c));
    }
    Ok(())
}

pub(super) fn build_power_pump(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    let names = super::narrowed(wn.power_pump_names(), index_over);
    for name in names {
        m.power_pump_headloss.remove(&name);

        let link = super::fetch_link(wn, &name)?;
        let f = m.flow[&name].expr();

        let con = if link.status == LinkStatus::Closed || link.is_isolated {
            Constraint::new(format!("power_pump_headloss[{name}]"), f)
        } else {
            let (start_h, end_h) = super::endpoint_heads(m, wn, link)?;
            let expr = m.pump_power[&name].expr() + (start_h - end_h) * f * RHO_G;
            Constraint::new(format!("power_pump_headloss[{name}]"), expr)
        };
        m.power_pump_headloss.insert(name.clone(), con);

        let el = Element::Link(name.clone());
        reg.register(el.clone(), Attribute::Status, BuilderKind::PowerPump);
        reg.register(el.clone(), Attribute::Isolated, BuilderKind::PowerPump);
        reg.observe(el.clone(), Attribute::Status, AttrValue::Status(link.status));
        reg.observe(el, Attribute::Isolated, AttrValue::Bool(link.is_isolated));
    }
    Ok(())
}
