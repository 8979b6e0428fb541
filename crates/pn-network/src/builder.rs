//! Incremental network builder.

use crate::elements::{
    DemandStatus, HeadPump, Junction, LeakParams, LeakRegime, Link, LinkKind, LinkStatus, Node,
    NodeKind, Pipe, PowerPump, PumpCurve, Reservoir, Tank, Valve,
};
use crate::error::{NetworkError, NetworkResult};
use crate::network::Network;
use std::collections::BTreeMap;

/// Builder for constructing a network incrementally.
///
/// Use the `add_*` methods to register elements, then call `build()` to
/// validate and freeze the topology into a [`Network`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl NetworkBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a junction with a single demand category.
    pub fn add_junction(
        &mut self,
        name: impl Into<String>,
        elevation: f64,
        base_demand: f64,
        minimum_pressure: f64,
        required_pressure: f64,
    ) {
        self.nodes.push(Node {
            name: name.into(),
            is_isolated: false,
            kind: NodeKind::Junction(Junction {
                elevation,
                base_demands: vec![base_demand],
                minimum_pressure,
                required_pressure,
                leak: None,
                leak_active: false,
                demand_status: DemandStatus::Full,
                leak_regime: LeakRegime::Zero,
            }),
        });
    }

    /// Append an extra demand category to an existing junction.
    pub fn add_demand_category(&mut self, junction: &str, base_demand: f64) -> NetworkResult<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.name == junction)
            .ok_or_else(|| NetworkError::UnknownName {
                what: "junction",
                name: junction.to_string(),
            })?;
        match node.as_junction_mut() {
            Some(j) => {
                j.base_demands.push(base_demand);
                Ok(())
            }
            None => Err(NetworkError::UnknownName {
                what: "junction",
                name: junction.to_string(),
            }),
        }
    }

    /// Attach a leak orifice to a junction or tank and enable it.
    pub fn set_leak(&mut self, node: &str, area: f64, discharge_coeff: f64) -> NetworkResult<()> {
        let n = self
            .nodes
            .iter_mut()
            .find(|n| n.name == node)
            .ok_or_else(|| NetworkError::UnknownName {
                what: "node",
                name: node.to_string(),
            })?;
        let params = LeakParams {
            area,
            discharge_coeff,
        };
        match &mut n.kind {
            NodeKind::Junction(j) => {
                j.leak = Some(params);
                j.leak_active = true;
                Ok(())
            }
            NodeKind::Tank(t) => {
                t.leak = Some(params);
                t.leak_active = true;
                Ok(())
            }
            NodeKind::Reservoir(_) => Err(NetworkError::Invalid {
                what: "leak",
                name: node.to_string(),
                detail: "reservoirs cannot leak".to_string(),
            }),
        }
    }

    pub fn add_tank(&mut self, name: impl Into<String>, elevation: f64, level: f64) {
        self.nodes.push(Node {
            name: name.into(),
            is_isolated: false,
            kind: NodeKind::Tank(Tank {
                elevation,
                level,
                leak: None,
                leak_active: false,
                leak_regime: LeakRegime::Zero,
            }),
        });
    }

    pub fn add_reservoir(&mut self, name: impl Into<String>, base_head: f64) {
        self.nodes.push(Node {
            name: name.into(),
            is_isolated: false,
            kind: NodeKind::Reservoir(Reservoir { base_head }),
        });
    }

    fn add_link(&mut self, name: String, start: &str, end: &str, kind: LinkKind) {
        self.links.push(Link {
            name,
            start_node: start.to_string(),
            end_node: end.to_string(),
            status: LinkStatus::Open,
            is_isolated: false,
            kind,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_pipe(
        &mut self,
        name: impl Into<String>,
        start: &str,
        end: &str,
        length: f64,
        diameter: f64,
        roughness: f64,
        minor_loss: f64,
    ) {
        self.add_link(
            name.into(),
            start,
            end,
            LinkKind::Pipe(Pipe {
                length,
                diameter,
                roughness,
                minor_loss,
            }),
        );
    }

    pub fn add_head_pump(
        &mut self,
        name: impl Into<String>,
        start: &str,
        end: &str,
        curve: PumpCurve,
    ) {
        self.add_link(name.into(), start, end, LinkKind::HeadPump(HeadPump { curve }));
    }

    pub fn add_power_pump(&mut self, name: impl Into<String>, start: &str, end: &str, power: f64) {
        self.add_link(name.into(), start, end, LinkKind::PowerPump(PowerPump { power }));
    }

    pub fn add_prv(
        &mut self,
        name: impl Into<String>,
        start: &str,
        end: &str,
        diameter: f64,
        setting: f64,
        minor_loss: f64,
    ) {
        self.add_link(
            name.into(),
            start,
            end,
            LinkKind::Prv(Valve {
                diameter,
                setting,
                minor_loss,
            }),
        );
    }

    pub fn add_fcv(
        &mut self,
        name: impl Into<String>,
        start: &str,
        end: &str,
        diameter: f64,
        setting: f64,
        minor_loss: f64,
    ) {
        self.add_link(
            name.into(),
            start,
            end,
            LinkKind::Fcv(Valve {
                diameter,
                setting,
                minor_loss,
            }),
        );
    }

    pub fn add_tcv(
        &mut self,
        name: impl Into<String>,
        start: &str,
        end: &str,
        diameter: f64,
        setting: f64,
        minor_loss: f64,
    ) {
        self.add_link(
            name.into(),
            start,
            end,
            LinkKind::Tcv(Valve {
                diameter,
                setting,
                minor_loss,
            }),
        );
    }

    /// Build and validate the network, returning a frozen [`Network`].
    pub fn build(self) -> NetworkResult<Network> {
        let mut node_index = BTreeMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if node_index.insert(node.name.clone(), i).is_some() {
                return Err(NetworkError::DuplicateName {
                    what: "node",
                    name: node.name.clone(),
                });
            }
        }

        let mut link_index = BTreeMap::new();
        for (i, link) in self.links.iter().enumerate() {
            if link_index.insert(link.name.clone(), i).is_some() {
                return Err(NetworkError::DuplicateName {
                    what: "link",
                    name: link.name.clone(),
                });
            }
        }

        validate_elements(&self.nodes, &self.links, &node_index)?;

        // Adjacency: inlet = links ending at the node, outlet = starting there.
        let mut inlet_links = vec![Vec::new(); self.nodes.len()];
        let mut outlet_links = vec![Vec::new(); self.nodes.len()];
        for (i, link) in self.links.iter().enumerate() {
            outlet_links[node_index[&link.start_node]].push(i);
            inlet_links[node_index[&link.end_node]].push(i);
        }

        Ok(Network {
            nodes: self.nodes,
            links: self.links,
            node_index,
            link_index,
            inlet_links,
            outlet_links,
        })
    }
}

fn validate_elements(
    nodes: &[Node],
    links: &[Link],
    node_index: &BTreeMap<String, usize>,
) -> NetworkResult<()> {
    for node in nodes {
        if let NodeKind::Junction(j) = &node.kind {
            if j.required_pressure <= j.minimum_pressure {
                return Err(NetworkError::Invalid {
                    what: "pressure thresholds",
                    name: node.name.clone(),
                    detail: format!(
                        "required_pressure {} must exceed minimum_pressure {}",
                        j.required_pressure, j.minimum_pressure
                    ),
                });
            }
            if let Some(leak) = j.leak {
                check_positive(leak.area, "leak area", &node.name)?;
                check_positive(leak.discharge_coeff, "leak discharge coefficient", &node.name)?;
            }
        }
    }

    for link in links {
        for endpoint in [&link.start_node, &link.end_node] {
            if !node_index.contains_key(endpoint) {
                return Err(NetworkError::UnknownEndpoint {
                    name: endpoint.clone(),
                    link: link.name.clone(),
                });
            }
        }
        if link.start_node == link.end_node {
            return Err(NetworkError::Invalid {
                what: "endpoints",
                name: link.name.clone(),
                detail: "start and end node are the same".to_string(),
            });
        }
        match &link.kind {
            LinkKind::Pipe(p) => {
                check_positive(p.length, "length", &link.name)?;
                check_positive(p.diameter, "diameter", &link.name)?;
                check_positive(p.roughness, "roughness", &link.name)?;
            }
            LinkKind::HeadPump(p) => {
                if let PumpCurve::SinglePoint { flow, head } = p.curve {
                    check_positive(flow, "curve flow", &link.name)?;
                    check_positive(head, "curve head", &link.name)?;
                }
            }
            LinkKind::PowerPump(p) => check_positive(p.power, "power", &link.name)?,
            LinkKind::Prv(v) | LinkKind::Fcv(v) | LinkKind::Tcv(v) => {
                check_positive(v.diameter, "diameter", &link.name)?;
            }
        }
    }

    Ok(())
}

fn check_positive(value: f64, what: &'static str, name: &str) -> NetworkResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NetworkError::NonPositive {
            what,
            name: name.to_string(),
            value,
        })
    }
}
