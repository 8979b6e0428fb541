//! Regime classifiers for nodes and links.
//!
//! Pure functions over current head/flow estimates and configured settings.
//! They run every status round of a solve, so each is a handful of
//! comparisons. Isolation always wins: an isolated element classifies as
//! Closed (links) or trivial (nodes) regardless of anything else.

use pn_network::{DemandStatus, LeakRegime, LinkStatus};

/// Classify the demand regime of a junction from its pressure head (m).
///
/// Zero at or below `p_min`, Full at or above `p_nom`, Partial between.
pub fn demand_status(pressure: f64, p_min: f64, p_nom: f64) -> DemandStatus {
    if pressure <= p_min {
        DemandStatus::Zero
    } else if pressure >= p_nom {
        DemandStatus::Full
    } else {
        DemandStatus::Partial
    }
}

/// Whether a node's leak participates in the current solve.
pub fn leak_is_active(leak_flag: bool, isolated: bool) -> bool {
    leak_flag && !isolated
}

/// Classify the leak regime from the differential head across the orifice.
///
/// At or below zero head there is no discharge to smooth; the rate is
/// pinned to zero instead.
pub fn leak_regime(pressure: f64) -> LeakRegime {
    if pressure <= 0.0 {
        LeakRegime::Zero
    } else {
        LeakRegime::Partial
    }
}

/// Classify a pressure-reducing valve from the current estimates.
///
/// Transitions follow the EPANET rules: reverse flow closes the valve; a
/// starting head too low to sustain the setting lets it pass through Open;
/// otherwise it actively pins the downstream pressure.
pub fn prv_status(
    current: LinkStatus,
    start_head: f64,
    end_head: f64,
    flow: f64,
    setting: f64,
    end_elevation: f64,
    isolated: bool,
) -> LinkStatus {
    if isolated {
        return LinkStatus::Closed;
    }
    let target = setting + end_elevation;
    match current {
        LinkStatus::Active => {
            if flow < 0.0 {
                LinkStatus::Closed
            } else if start_head < target {
                LinkStatus::Open
            } else {
                LinkStatus::Active
            }
        }
        LinkStatus::Open => {
            if flow < 0.0 {
                LinkStatus::Closed
            } else if start_head >= target {
                LinkStatus::Active
            } else {
                LinkStatus::Open
            }
        }
        LinkStatus::Closed => {
            if start_head >= target && end_head < target {
                LinkStatus::Active
            } else if start_head < target && start_head > end_head {
                LinkStatus::Open
            } else {
                LinkStatus::Closed
            }
        }
    }
}

/// Classify a flow-control valve from the current estimates.
///
/// The valve regulates (Active) whenever the head gradient can drive the
/// setting; a reversed gradient means the setting is unattainable and the
/// valve passes through Open.
pub fn fcv_status(start_head: f64, end_head: f64, isolated: bool) -> LinkStatus {
    if isolated {
        LinkStatus::Closed
    } else if start_head < end_head {
        LinkStatus::Open
    } else {
        LinkStatus::Active
    }
}

/// Classify a throttle-control valve.
///
/// A TCV has no pinned variable; Active simply means its commanded loss
/// coefficient applies instead of the fully-open minor loss.
pub fn tcv_status(has_setting: bool, isolated: bool) -> LinkStatus {
    if isolated {
        LinkStatus::Closed
    } else if has_setting {
        LinkStatus::Active
    } else {
        LinkStatus::Open
    }
}
