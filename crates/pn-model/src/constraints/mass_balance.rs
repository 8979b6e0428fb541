//! Mass balance at junctions.
//!
//! Residual = demand - sum(inlet flows) + sum(outlet flows) + leak rate
//! (when the leak participates). Under demand-driven mode the demand is the
//! fixed expected-demand parameter; under pressure-dependent mode it is the
//! delivered-demand variable. Isolated junctions get no balance at all:
//! every incident link is pinned to zero flow elsewhere, and a trivial row
//! here would only make the system singular.

use crate::error::ModelResult;
use crate::model::HydraulicModel;
use crate::registry::{AttrValue, Attribute, BuilderKind, ChangeRegistry, Element};
use pn_expr::{Constraint, Expr};
use pn_network::{Direction, Network};

pub(super) fn build_demand_driven(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    build(m, wn, reg, index_over, BuilderKind::MassBalance)
}

pub(super) fn build_pressure_dependent(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
) -> ModelResult<()> {
    build(m, wn, reg, index_over, BuilderKind::PddMassBalance)
}

fn build(
    m: &mut HydraulicModel,
    wn: &Network,
    reg: &mut ChangeRegistry,
    index_over: Option<&[String]>,
    kind: BuilderKind,
) -> ModelResult<()> {
    let names = super::narrowed(wn.junction_names(), index_over);
    for name in names {
        match kind {
            BuilderKind::PddMassBalance => m.pdd_mass_balance.remove(&name),
            _ => m.mass_balance.remove(&name),
        };

        let node = super::fetch_node(wn, &name)?;
        let leak_active = node.leak_enabled();
        if !node.is_isolated {
            let mut expr: Expr = match kind {
                BuilderKind::PddMassBalance => m.demand[&name].expr(),
                _ => m.expected_demand[&name].expr(),
            };
            for link_name in wn.links_for_node(&name, Direction::Inlet) {
                expr = expr - m.flow[&link_name].expr();
            }
            for link_name in wn.links_for_node(&name, Direction::Outlet) {
                expr = expr + m.flow[&link_name].expr();
            }
            if leak_active {
                expr = expr + m.leak_rate[&name].expr();
            }
            let con = Constraint::new(format!("mass_balance[{name}]"), expr);
            match kind {
                BuilderKind::PddMassBalance => m.pdd_mass_balance.insert(name.clone(), con),
                _ => m.mass_balance.insert(name.clone(), con),
            };
        }

        let el = Element::Node(name.clone());
        reg.register(el.clone(), Attribute::LeakStatus, kind);
        reg.register(el.clone(), Attribute::Isolated, kind);
        reg.observe(el.clone(), Attribute::LeakStatus, AttrValue::Bool(leak_active));
        reg.observe(el, Attribute::Isolated, AttrValue::Bool(node.is_isolated));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::HydraulicOptions;
    use pn_network::NetworkBuilder;

    fn sample() -> Network {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R1", 60.0);
        b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
        b.add_junction("J2", 12.0, 0.01, 0.0, 20.0);
        b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
        b.add_pipe("P2", "J1", "J2", 200.0, 0.25, 120.0, 0.0);
        b.build().unwrap()
    }

    #[test]
    fn residual_signs_follow_flow_orientation() {
        let wn = sample();
        let mut m = HydraulicModel::new(&wn, HydraulicOptions::default()).unwrap();
        let mut reg = ChangeRegistry::new();
        build_demand_driven(&mut m, &wn, &mut reg, None).unwrap();

        // J1: expected 0.02, inlet P1, outlet P2
        m.flow["P1"].set_value(0.05);
        m.flow["P2"].set_value(0.03);
        let r = m.mass_balance["J1"].evaluate();
        assert!((r - (0.02 - 0.05 + 0.03)).abs() < 1e-15);
    }

    #[test]
    fn isolated_junction_gets_no_balance() {
        let mut wn = sample();
        wn.node_mut("J2").unwrap().is_isolated = true;
        let mut m = HydraulicModel::new(&wn, HydraulicOptions::default()).unwrap();
        let mut reg = ChangeRegistry::new();
        build_demand_driven(&mut m, &wn, &mut reg, None).unwrap();
        assert!(m.mass_balance.contains_key("J1"));
        assert!(!m.mass_balance.contains_key("J2"));
    }

    #[test]
    fn leak_term_included_when_flag_set() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R1", 60.0);
        b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
        b.set_leak("J1", 1e-4, 0.75).unwrap();
        b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
        let wn = b.build().unwrap();

        let mut m = HydraulicModel::new(&wn, HydraulicOptions::default()).unwrap();
        let mut reg = ChangeRegistry::new();
        build_demand_driven(&mut m, &wn, &mut reg, None).unwrap();
        m.flow["P1"].set_value(0.0);
        m.leak_rate["J1"].set_value(0.005);
        assert!((m.mass_balance["J1"].evaluate() - 0.025).abs() < 1e-15);
    }

    #[test]
    fn rebuild_replaces_the_prior_constraint() {
        let wn = sample();
        let mut m = HydraulicModel::new(&wn, HydraulicOptions::default()).unwrap();
        let mut reg = ChangeRegistry::new();
        build_demand_driven(&mut m, &wn, &mut reg, None).unwrap();
        build_demand_driven(&mut m, &wn, &mut reg, Some(&["J1".to_owned()])).unwrap();
        assert_eq!(m.mass_balance.len(), 2);
    }
}
