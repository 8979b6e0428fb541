//! pn-network: topology layer for pressurized pipe networks.
//!
//! Provides:
//! - Network elements (junctions, tanks, reservoirs; pipes, pumps, valves)
//! - Incremental network builder with validation
//! - Typed name lists and inlet/outlet adjacency for constraint assembly
//! - Isolation detection (no hydraulic path to a tank or reservoir)
//!
//! # Example
//!
//! ```
//! use pn_network::{Direction, NetworkBuilder};
//!
//! let mut builder = NetworkBuilder::new();
//! builder.add_reservoir("R1", 50.0);
//! builder.add_junction("J1", 10.0, 0.01, 0.0, 20.0);
//! builder.add_pipe("P1", "R1", "J1", 100.0, 0.3, 130.0, 0.0);
//! let network = builder.build().unwrap();
//!
//! assert_eq!(network.junction_names(), vec!["J1".to_string()]);
//! assert_eq!(network.links_for_node("J1", Direction::Inlet), vec!["P1".to_string()]);
//! ```

pub mod builder;
pub mod elements;
pub mod error;
pub mod isolation;
pub mod network;

// Re-exports for ergonomics
pub use builder::NetworkBuilder;
pub use elements::{
    DemandStatus, HeadPump, Junction, LeakParams, LeakRegime, Link, LinkKind, LinkStatus, Node,
    NodeKind, Pipe, PowerPump, PumpCurve, Reservoir, Tank, Valve,
};
pub use error::NetworkError;
pub use isolation::{IsolationReport, identify_isolated};
pub use network::{Direction, Network};
