//! Pressure-dependent demand at junctions.
//!
//! In the Partial regime the delivered demand follows the expected demand
//! scaled by a pressure fraction: zero-slope line below `p_min`, cubic
//! transition on `[p_min, p_min+delta]`, square root of the normalized
//! pressure in the middle, cubic transition on `[p_nom-delta, p_nom]`, and
//! a near-flat line above `p_nom`. Full pins demand to the expected value,
//! Zero (and isolation) pins it to zero.

use crate::error::ModelResult;
use crate::model::HydraulicModel;
use crate::registry::{AttrValue, Attribute, BuilderKind, ChangeRegistry, Element};
use pn_expr::{ConditionalExpr, Constraint};
use pn_network::{DemandStatus, Network};

pub(super) fn build(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    let names = super::narrowed(wn.junction_names(), index_over);
    for name in names {
        m.pdd.remove(&name);

        let node = super::fetch_node(wn, &name)?;
        let Some(junction) = node.as_junction() else {
            continue;
        };
        let d = m.demand[&name].expr();
        let d_expected = m.expected_demand[&name].expr();

        let con = if node.is_isolated {
            Constraint::new(format!("pdd[{name}]"), d)
        } else {
            match junction.demand_status {
                DemandStatus::Partial => {
                    let p = m.head[&name].expr() - m.elevation[&name].expr();
                    let pmin = m.pmin[&name].expr();
                    let pnom = m.pnom[&name].expr();
                    let slope = m.constants.pdd_slope.expr();
                    let delta = m.constants.pdd_smoothing_delta;
                    let poly1 = &m.pdd_poly1[&name];
                    let poly2 = &m.pdd_poly2[&name];

                    let frac_mid = ((p.clone() - pmin.clone())
                        / (pnom.clone() - pmin.clone()))
                    .powf(0.5);

                    let expr = ConditionalExpr::new()
                        .when(
                            p.clone() - pmin.clone(),
                            d.clone()
                                - d_expected.clone()
                                    * slope.clone()
                                    * (p.clone() - pmin.clone()),
                        )
                        .when(
                            p.clone() - pmin - delta,
                            d.clone() - d_expected.clone() * poly1.expr(&p),
                        )
                        .when(
                            p.clone() - pnom.clone() + delta,
                            d.clone() - d_expected.clone() * frac_mid,
                        )
                        .when(
                            p.clone() - pnom.clone(),
                            d.clone() - d_expected.clone() * poly2.expr(&p),
                        )
                        .otherwise(d - d_expected * (slope * (p - pnom) + 1.0));
                    Constraint::new(format!("pdd[{name}]"), expr)
                }
                DemandStatus::Full => Constraint::new(format!("pdd[{name}]"), d - d_expected),
                DemandStatus::Zero => Constraint::new(format!("pdd[{name}]"), d),
            }
        };
        m.pdd.insert(name.clone(), con);

        let el = Element::Node(name.clone());
        reg.register(el.clone(), Attribute::Isolated, BuilderKind::Pdd);
        reg.register(el.clone(), Attribute::DemandStatus, BuilderKind::Pdd);
        reg.observe(el.clone(), Attribute::Isolated, AttrValue::Bool(node.is_isolated));
        reg.observe(
            el,
            Attribute::DemandStatus,
            AttrValue::Demand(junction.demand_status),
        );
    }
    Ok(())
}
