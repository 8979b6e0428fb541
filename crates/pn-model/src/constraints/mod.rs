//! Constraint builders, one per physical relation.
//!
//! Each builder is a function over (model, network, registry, subset): it
//! replaces the constraints of its collection for the given entity subset
//! (default: every entity of the relevant type), then registers itself with
//! the registry for the attributes it read and records their current
//! values. Rebuilding an entity's constraint always removes the prior one
//! first, so each (collection, entity) pair holds at most one live
//! constraint.

mod hazen_williams;
mod leak;
mod mass_balance;
mod pdd;
mod pump;
mod valve;

use crate::error::{ModelError, ModelResult};
use crate::model::HydraulicModel;
use crate::registry::{BuilderKind, ChangeRegistry};
use pn_expr::Expr;
use pn_network::{Link, Network, Node};
use std::collections::BTreeSet;

/// Run one builder for a subset of its entities (`None` = all).
pub fn dispatch(
    kind: BuilderKind,
    model: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    match kind {
        BuilderKind::MassBalance => mass_balance::build_demand_driven(model, wn, reg, index_over),
        BuilderKind::PddMassBalance => {
            mass_balance::build_pressure_dependent(model, wn, reg, index_over)
        }
        BuilderKind::HazenWilliams => hazen_williams::build(model, wn, reg, index_over),
        BuilderKind::HeadPump => pump::build_head_pump(model, wn, reg, index_over),
        BuilderKind::PowerPump => pump::build_power_pump(model, wn, reg, index_over),
        BuilderKind::Prv => valve::build_prv(model, wn, reg, index_over),
        BuilderKind::Fcv => valve::build_fcv(model, wn, reg, index_over),
        BuilderKind::Tcv => valve::build_tcv(model, wn, reg, index_over),
        BuilderKind::Pdd => pdd::build(model, wn, reg, index_over),
        BuilderKind::Leak => leak::build(model, wn, reg, index_over),
    }
}

/// Entity subset a builder runs over: the full typed list, or the
/// intersection of `index_over` with it (registry queues can carry names
/// of other entity types watching the same attribute).
fn narrowed(all: Vec<String>, index_over: Option<&[String]>) -> Vec<String> {
    match index_over {
        None => all,
        Some(selected) => {
            let members: BTreeSet<&str> = all.iter().map(String::as_str).collect();
            selected
                .iter()
                .filter(|n| members.contains(n.as_str()))
                .cloned()
                .collect()
        }
    }
}

fn fetch_node<'a>(wn: &'a Network, name: &str) -> ModelResult<&'a Node> {
    wn.node(name).ok_or_else(|| ModelError::UnknownEntity {
        what: "node",
        name: name.to_owned(),
    })
}

fn fetch_link<'a>(wn: &'a Network, name: &str) -> ModelResult<&'a Link> {
    wn.link(name).ok_or_else(|| ModelError::UnknownEntity {
        what: "link",
        name: name.to_owned(),
    })
}

/// Head expressions for a link's endpoints: junction head variables, or
/// fixed source-head parameters for tanks and reservoirs.
fn endpoint_heads(m: &HydraulicModel, wn: &Network, link: &Link) -> ModelResult<(Expr, Expr)> {
    let start = fetch_node(wn, &link.start_node)?;
    let end = fetch_node(wn, &link.end_node)?;
    Ok((m.node_head_expr(start), m.node_head_expr(end)))
}
