//! Regulating valve constraints (PRV, FCV, TCV).
//!
//! Active pins the controlled quantity to the setting: downstream pressure
//! for a PRV, flow for an FCV, the commanded loss coefficient for a TCV.
//! Open is a minor-loss-only quadratic, split by flow sign so reverse flow
//! produces a head gain rather than a loss. Closed or isolated pins the
//! flow to zero.

use crate::error::ModelResult;
use crate::model::HydraulicModel;
use crate::registry::{AttrValue, Attribute, BuilderKind, ChangeRegistry, Element};
use pn_expr::{ConditionalExpr, Constraint, Expr};
use pn_network::{LinkStatus, Network};

/// `sign(f)*resistance*f^2 - start_h + end_h`, written as a two-arm split
/// so the conditional boundary sits exactly at zero flow.
fn sign_split_quadratic(f: &Expr, resistance: &Expr, start_h: Expr, end_h: Expr) -> Expr {
    ConditionalExpr::new()
        .when(
            f.clone(),
            -(resistance.clone() * f.clone().powf(2.0)) - start_h.clone() + end_h.clone(),
        )
        .otherwise(resistance.clone() * f.clone().powf(2.0) - start_h + end_h)
}

pub(super) fn build_prv(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    let names = super::narrowed(wn.prv_names(), index_over);
    for name in names {
        m.prv_headloss.remove(&name);

        let link = super::fetch_link(wn, &name)?;
        let f = m.flow[&name].expr();

        let con = if link.status == LinkStatus::Closed || link.is_isolated {
            Constraint::new(format!("prv_headloss[{name}]"), f)
        } else {
            let (start_h, end_h) = super::endpoint_heads(m, wn, link)?;
            let expr = match link.status {
                LinkStatus::Active => {
                    end_h - m.valve_setting[&name].expr() - m.elevation[&link.end_node].expr()
                }
                LinkStatus::Open => {
                    sign_split_quadratic(&f, &m.minor_loss[&name].expr(), start_h, end_h)
                }
                LinkStatus::Closed => unreachable!("handled above"),
            };
            Constraint::new(format!("prv_headloss[{name}]"), expr)
        };
        m.prv_headloss.insert(name.clone(), con);

        register_valve(reg, &name, link.status, link.is_isolated, BuilderKind::Prv);
    }
    Ok(())
}

pub(super) fn build_fcv(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    let names = super::narrowed(wn.fcv_names(), index_over);
    for name in names {
        m.fcv_headloss.remove(&name);

        let link = super::fetch_link(wn, &name)?;
        let f = m.flow[&name].expr();

        let con = if link.status == LinkStatus::Closed || link.is_isolated {
            Constraint::new(format!("fcv_headloss[{name}]"), f)
        } else {
            let (start_h, end_h) = super::endpoint_heads(m, wn, link)?;
            let expr = match link.status {
                LinkStatus::Active => f.clone() - m.valve_setting[&name].expr(),
                LinkStatus::Open => {
                    sign_split_quadratic(&f, &m.minor_loss[&name].expr(), start_h, end_h)
                }
                LinkStatus::Closed => unreachable!("handled above"),
            };
            Constraint::new(format!("fcv_headloss[{name}]"), expr)
        };
        m.fcv_headloss.insert(name.clone(), con);

        register_valve(reg, &name, link.status, link.is_isolated, BuilderKind::Fcv);
    }
    Ok(())
}

pub(super) fn build_tcv(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    let names = super::narrowed(wn.tcv_names(), index_over);
    for name in names {
        m.tcv_headloss.remove(&name);

        let link = super::fetch_link(wn, &name)?;
        let f = m.flow[&name].expr();

        let con = if link.status == LinkStatus::Closed || link.is_isolated {
            Constraint::new(format!("tcv_headloss[{name}]"), f)
        } else {
            let (start_h, end_h) = super::endpoint_heads(m, wn, link)?;
            let resistance = match link.status {
                LinkStatus::Active => m.tcv_resistance[&name].expr(),
                LinkStatus::Open => m.minor_loss[&name].expr(),
                LinkStatus::Closed => unreachable!("handled above"),
            };
            let expr = sign_split_quadratic(&f, &resistance, start_h, end_h);
            Constraint::new(format!("tcv_headloss[{name}]"), expr)
        };
        m.tcv_headloss.insert(name.clone(), con);

        register_valve(reg, &name, link.status, link.is_isolated, BuilderKind::Tcv);
    }
    Ok(())
}

fn register_valve(
    reg: &mut ChangeRegistry,
    name: &str,
    status: LinkStatus,
    isolated: bool,
    kind: BuilderKind,
) {
    let el = Element::Link(name.to_owned());
    reg.register(el.clone(), Attribute::Status, kind);
    reg.register(el.clone(), Attribute::Isolated, kind);
    reg.observe(el.clone(), Attribute::Status, AttrValue::Status(status));
    reg.observe(el, Attribute::Isolated, AttrValue::Bool(isolated));
}
