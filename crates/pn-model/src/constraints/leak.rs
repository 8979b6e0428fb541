//! Leak discharge at junctions and tanks.
//!
//! An active leak in the Partial regime follows the orifice law
//! `Cd * area * sqrt(2 g p)`, smoothed on `[0, leak_delta]` with a cubic
//! and pinned to a near-zero line below. The Zero regime, an inactive
//! flag, and isolation all pin the leak rate to zero. A Partial regime on
//! a node with no configured orifice cannot happen through the
//! classifiers; reaching the builder that way is a contract violation.

use crate::error::{ModelError, ModelResult};
use crate::model::HydraulicModel;
use crate::registry::{AttrValue, Attribute, BuilderKind, ChangeRegistry, Element};
use pn_core::GRAVITY;
use pn_expr::{ConditionalExpr, Constraint};
use pn_network::{LeakRegime, Network};

pub(super) fn build(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    let names = super::narrowed(wn.junction_and_tank_names(), index_over);
    for name in names {
        m.leak_con.remove(&name);

        let node = super::fetch_node(wn, &name)?;
        let leak_rate = m.leak_rate[&name].expr();
        let active = node.leak_enabled() && !node.is_isolated;

        let con = if !active {
            Constraint::new(format!("leak_con[{name}]"), leak_rate)
        } else {
            let regime = node.leak_regime().ok_or_else(|| ModelError::UnexpectedStatus {
                entity: name.clone(),
                detail: "leak flag set on a node without a leak regime".to_owned(),
            })?;
            match regime {
                LeakRegime::Zero => Constraint::new(format!("leak_con[{name}]"), leak_rate),
                LeakRegime::Partial => {
                    let poly = m.leak_poly.get(&name).ok_or_else(|| {
                        ModelError::UnexpectedStatus {
                            entity: name.clone(),
                            detail: "Partial leak regime on a node without an orifice".to_owned(),
                        }
                    })?;
                    let p = m.node_head_expr(node) - m.elevation[&name].expr();
                    let slope = m.constants.leak_slope.expr();
                    let delta = m.constants.leak_delta;
                    let cd = m.leak_coeff[&name].expr();
                    let area = m.leak_area[&name].expr();

                    let orifice =
                        cd * area * (2.0 * GRAVITY * p.clone()).powf(0.5);
                    let expr = ConditionalExpr::new()
                        .when(p.clone(), leak_rate.clone() - slope * p.clone())
                        .when(p.clone() - delta, leak_rate.clone() - poly.expr(&p))
                        .otherwise(leak_rate - orifice);
                    Constraint::new(format!("leak_con[{name}]"), expr)
                }
            }
        };
        m.leak_con.insert(name.clone(), con);

        let el = Element::Node(name.clone());
        reg.register(el.clone(), Attribute::LeakStatus, BuilderKind::Leak);
        reg.register(el.clone(), Attribute::LeakRegime, BuilderKind::Leak);
        reg.register(el.clone(), Attribute::Isolated, BuilderKind::Leak);
        reg.observe(
            el.clone(),
            Attribute::LeakStatus,
            AttrValue::Bool(node.leak_enabled()),
        );
        if let Some(regime) = node.leak_regime() {
            reg.observe(el.clone(), Attribute::LeakRegime, AttrValue::Leak(regime));
        }
        reg.observe(el, Attribute::Isolated, AttrValue::Bool(node.is_isolated));
    }
    Ok(())
}
