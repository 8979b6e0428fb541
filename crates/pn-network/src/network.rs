//! The frozen network: element storage, name lookup, adjacency.

use crate::elements::{Link, LinkKind, Node, NodeKind};
use std::collections::BTreeMap;

/// Flow-relative orientation of a link at a node.
///
/// Positive flow is start -> end, so an `Inlet` link of a node is one whose
/// end node is that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inlet,
    Outlet,
}

/// A validated pipe network.
///
/// Built by [`crate::NetworkBuilder`]; element runtime state (status tags,
/// isolation flags) stays mutable through `node_mut`/`link_mut`, the
/// topology does not change after `build()`.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) node_index: BTreeMap<String, usize>,
    pub(crate) link_index: BTreeMap<String, usize>,
    /// Per node: indices of links whose end node is this node.
    pub(crate) inlet_links: Vec<Vec<usize>>,
    /// Per node: indices of links whose start node is this node.
    pub(crate) outlet_links: Vec<Vec<usize>>,
}

impl Network {
    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All links, in insertion order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.node_index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        let i = *self.node_index.get(name)?;
        Some(&mut self.nodes[i])
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.link_index.get(name).map(|&i| &self.links[i])
    }

    pub fn link_mut(&mut self, name: &str) -> Option<&mut Link> {
        let i = *self.link_index.get(name)?;
        Some(&mut self.links[i])
    }

    /// Names of links incident to a node, filtered by orientation.
    pub fn links_for_node(&self, node_name: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.node_index.get(node_name) else {
            return Vec::new();
        };
        let list = match direction {
            Direction::Inlet => &self.inlet_links[idx],
            Direction::Outlet => &self.outlet_links[idx],
        };
        list.iter().map(|&i| self.links[i].name.clone()).collect()
    }

    fn node_names_where(&self, pred: impl Fn(&Node) -> bool) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| pred(n))
            .map(|n| n.name.clone())
            .collect()
    }

    fn link_names_where(&self, pred: impl Fn(&Link) -> bool) -> Vec<String> {
        self.links
            .iter()
            .filter(|l| pred(l))
            .map(|l| l.name.clone())
            .collect()
    }

    pub fn junction_names(&self) -> Vec<String> {
        self.node_names_where(|n| matches!(n.kind, NodeKind::Junction(_)))
    }

    pub fn tank_names(&self) -> Vec<String> {
        self.node_names_where(|n| matches!(n.kind, NodeKind::Tank(_)))
    }

    pub fn reservoir_names(&self) -> Vec<String> {
        self.node_names_where(|n| matches!(n.kind, NodeKind::Reservoir(_)))
    }

    /// Junctions followed by tanks: the index set of the leak builders.
    pub fn junction_and_tank_names(&self) -> Vec<String> {
        self.node_names_where(|n| !matches!(n.kind, NodeKind::Reservoir(_)))
    }

    pub fn pipe_names(&self) -> Vec<String> {
        self.link_names_where(|l| matches!(l.kind, LinkKind::Pipe(_)))
    }

    pub fn head_pump_names(&self) -> Vec<String> {
        self.link_names_where(|l| matches!(l.kind, LinkKind::HeadPump(_)))
    }

    pub fn power_pump_names(&self) -> Vec<String> {
        self.link_names_where(|l| matches!(l.kind, LinkKind::PowerPump(_)))
    }

    pub fn prv_names(&self) -> Vec<String> {
        self.link_names_where(|l| matches!(l.kind, LinkKind::Prv(_)))
    }

    pub fn fcv_names(&self) -> Vec<String> {
        self.link_names_where(|l| matches!(l.kind, LinkKind::Fcv(_)))
    }

    pub fn tcv_names(&self) -> Vec<String> {
        self.link_names_where(|l| matches!(l.kind, LinkKind::Tcv(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkBuilder;
    use crate::elements::{LinkStatus, PumpCurve};

    fn sample() -> Network {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R1", 60.0);
        b.add_tank("T1", 40.0, 5.0);
        b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
        b.add_junction("J2", 12.0, 0.01, 0.0, 20.0);
        b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
        b.add_pipe("P2", "J1", "J2", 200.0, 0.25, 120.0, 0.0);
        b.add_head_pump(
            "PU1",
            "T1",
            "J1",
            PumpCurve::SinglePoint {
                flow: 0.05,
                head: 25.0,
            },
        );
        b.add_fcv("V1", "J2", "T1", 0.2, 0.01, 0.1);
        b.build().unwrap()
    }

    #[test]
    fn typed_name_lists() {
        let wn = sample();
        assert_eq!(wn.junction_names(), vec!["J1", "J2"]);
        assert_eq!(wn.tank_names(), vec!["T1"]);
        assert_eq!(wn.reservoir_names(), vec!["R1"]);
        assert_eq!(wn.pipe_names(), vec!["P1", "P2"]);
        assert_eq!(wn.head_pump_names(), vec!["PU1"]);
        assert_eq!(wn.fcv_names(), vec!["V1"]);
        assert!(wn.prv_names().is_empty());
        assert_eq!(wn.junction_and_tank_names(), vec!["T1", "J1", "J2"]);
    }

    #[test]
    fn adjacency_orientation() {
        let wn = sample();
        assert_eq!(
            wn.links_for_node("J1", Direction::Inlet),
            vec!["P1", "PU1"]
        );
        assert_eq!(wn.links_for_node("J1", Direction::Outlet), vec!["P2"]);
        assert_eq!(wn.links_for_node("T1", Direction::Inlet), vec!["V1"]);
    }

    #[test]
    fn runtime_state_is_mutable() {
        let mut wn = sample();
        wn.link_mut("P1").unwrap().status = LinkStatus::Closed;
        assert_eq!(wn.link("P1").unwrap().status, LinkStatus::Closed);
        wn.node_mut("J1").unwrap().is_isolated = true;
        assert!(wn.node("J1").unwrap().is_isolated);
    }

    #[test]
    fn unknown_names_return_none() {
        let wn = sample();
        assert!(wn.node("nope").is_none());
        assert!(wn.link("nope").is_none());
        assert!(wn.links_for_node("nope", Direction::Inlet).is_empty());
    }
}
