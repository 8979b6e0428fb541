//! Isolation detection: nodes and links with no hydraulic path to a source.
//!
//! A junction is isolated when every path to a tank or reservoir passes
//! through a closed link. Isolated elements are forced to trivial behavior
//! (zero flow, zero demand) by the constraint builders.

use crate::elements::LinkStatus;
use crate::network::Network;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use std::collections::BTreeSet;

/// Result of an isolation sweep.
#[derive(Debug, Clone, Default)]
pub struct IsolationReport {
    pub isolated_nodes: BTreeSet<String>,
    pub isolated_links: BTreeSet<String>,
}

impl IsolationReport {
    /// Write the isolation flags back onto the network elements.
    pub fn apply(&self, network: &mut Network) {
        for node in network.nodes.iter_mut() {
            node.is_isolated = self.isolated_nodes.contains(&node.name);
        }
        for link in network.links.iter_mut() {
            link.is_isolated = self.isolated_links.contains(&link.name);
        }
    }
}

/// Classify nodes and links that cannot reach any tank or reservoir through
/// non-closed links.
///
/// A link is isolated when either endpoint is; such a link can only be a
/// closed one bridging a supplied and an unsupplied region.
pub fn identify_isolated(network: &Network) -> IsolationReport {
    let mut graph: UnGraph<(), ()> = UnGraph::default();

    let node_ix: Vec<NodeIndex> = network.nodes().iter().map(|_| graph.add_node(())).collect();
    let index_of = |name: &str| -> usize {
        network
            .node_index
            .get(name)
            .copied()
            .expect("validated network endpoint")
    };

    for link in network.links() {
        if link.status != LinkStatus::Closed {
            graph.add_edge(
                node_ix[index_of(&link.start_node)],
                node_ix[index_of(&link.end_node)],
                (),
            );
        }
    }

    // Virtual super-source tied to every tank and reservoir lets one BFS
    // cover all sources at once.
    let source = graph.add_node(());
    for (i, node) in network.nodes().iter().enumerate() {
        if node.source_head().is_some() {
            graph.add_edge(source, node_ix[i], ());
        }
    }

    // Network nodes were added first, so graph index i < len maps back to
    // nodes[i]; the super-source lands past the end.
    let mut reached = vec![false; network.nodes().len()];
    let mut bfs = Bfs::new(&graph, source);
    while let Some(ix) = bfs.next(&graph) {
        if ix.index() < reached.len() {
            reached[ix.index()] = true;
        }
    }

    let mut report = IsolationReport::default();
    for (i, node) in network.nodes().iter().enumerate() {
        if !reached[i] {
            report.isolated_nodes.insert(node.name.clone());
        }
    }
    for link in network.links() {
        if report.isolated_nodes.contains(&link.start_node)
            || report.isolated_nodes.contains(&link.end_node)
        {
            report.isolated_links.insert(link.name.clone());
        }
    }
    report
}
