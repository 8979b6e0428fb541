//! Per-run hydraulic options.

use serde::{Deserialize, Serialize};

/// Demand formulation for junctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DemandModel {
    /// Deliver the full expected demand regardless of pressure.
    #[default]
    DemandDriven,
    /// Delivered demand depends continuously on available pressure.
    PressureDependent,
}

/// Options governing one hydraulic model instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydraulicOptions {
    pub demand_model: DemandModel,
    /// Width of the cubic transition zones of the pressure-demand relation
    /// (m of pressure head). Must satisfy
    /// `p_min + delta < p_nom - delta` for every junction.
    pub pdd_smoothing_delta: f64,
    /// Width of the smoothed region of the leak orifice law (m of head).
    pub leak_delta: f64,
}

impl Default for HydraulicOptions {
    fn default() -> Self {
        Self {
            demand_model: DemandModel::DemandDriven,
            pdd_smoothing_delta: 0.2,
            leak_delta: 1e-4,
        }
    }
}
