//! Per-time-step solve orchestration.
//!
//! One solve step alternates classification and solution: run the status
//! classifiers, flush the change registry (rebuilding only the affected
//! constraints), Newton-solve the assembled system, then re-classify. The
//! step is done when a solve changes no status tag; a bound on the number
//! of rounds guards against status cycling. The engine requires exclusive
//! access to the network and model throughout; nothing here is shared
//! across threads.

use crate::assembly::Assembly;
use crate::error::{SolverError, SolverResult};
use crate::newton::{NewtonConfig, newton_solve};
use pn_model::status::{demand_status, fcv_status, leak_is_active, leak_regime, prv_status, tcv_status};
use pn_model::{
    AttrValue, Attribute, ChangeRegistry, DemandModel, Element, HydraulicModel, HydraulicOptions,
};
use pn_network::{LinkKind, Network, NodeKind, identify_isolated};
use std::collections::BTreeMap;
use tracing::debug;

/// Engine configuration.
pub struct EngineConfig {
    pub newton: NewtonConfig,
    /// Maximum classify-solve rounds per time step.
    pub max_status_rounds: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            newton: NewtonConfig::default(),
            max_status_rounds: 20,
        }
    }
}

/// Solution of one time step.
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Head per node (m); fixed heads included.
    pub heads: BTreeMap<String, f64>,
    /// Flow per link (m^3/s), positive start -> end.
    pub flows: BTreeMap<String, f64>,
    /// Delivered demand per junction (m^3/s).
    pub demands: BTreeMap<String, f64>,
    /// Leak discharge per junction/tank (m^3/s).
    pub leak_rates: BTreeMap<String, f64>,
    /// Total Newton iterations across status rounds.
    pub iterations: usize,
    pub residual_norm: f64,
    /// Classify-solve rounds taken.
    pub status_rounds: usize,
}

/// Steady-state solver over a hydraulic model with incremental rebuilds.
pub struct HydraulicEngine {
    model: HydraulicModel,
    registry: ChangeRegistry,
    config: EngineConfig,
}

impl HydraulicEngine {
    /// Build the model and all constraints for the network's current state.
    pub fn new(
        wn: &mut Network,
        options: HydraulicOptions,
        config: EngineConfig,
    ) -> SolverResult<Self> {
        identify_isolated(wn).apply(wn);
        let mut model = HydraulicModel::new(wn, options)?;
        let mut registry = ChangeRegistry::new();
        model.build_all(wn, &mut registry)?;
        Ok(Self {
            model,
            registry,
            config,
        })
    }

    pub fn model(&self) -> &HydraulicModel {
        &self.model
    }

    pub fn registry(&self) -> &ChangeRegistry {
        &self.registry
    }

    /// Solve one time step for the network's current boundary state.
    pub fn solve_step(&mut self, wn: &mut Network) -> SolverResult<SolveReport> {
        self.model.sync_source_heads(wn);
        self.notify_commanded_state(wn);
        self.refresh_isolation(wn);
        self.registry.flush(&mut self.model, wn)?;

        let mut iterations = 0;
        for round in 0..self.config.max_status_rounds {
            let asm = Assembly::gather(&self.model)?;
            let result = newton_solve(
                asm.initial_guess(),
                |x| asm.residual(x),
                |x| asm.jacobian(x),
                &self.config.newton,
            )?;
            asm.store(&result.x);
            iterations += result.iterations;

            if !self.reclassify(wn) {
                debug!(rounds = round + 1, iterations, "solve step settled");
                return Ok(self.report(wn, iterations, result.residual_norm, round + 1));
            }
            self.refresh_isolation(wn);
            self.registry.flush(&mut self.model, wn)?;
        }

        Err(SolverError::ConvergenceFailed {
            what: format!(
                "status classification did not settle within {} rounds",
                self.config.max_status_rounds
            ),
        })
    }

    /// Pick up attribute edits made on the network between solve steps:
    /// commanded link statuses, leak flags, and pump curves. Unchanged
    /// values are no-ops in the registry.
    fn notify_commanded_state(&mut self, wn: &Network) {
        for link in wn.links() {
            self.registry.notify(
                Element::Link(link.name.clone()),
                Attribute::Status,
                AttrValue::Status(link.status),
            );
            if let LinkKind::HeadPump(pump) = &link.kind {
                let (a, b, c) = pump.curve.head_curve_coefficients();
                self.registry.notify(
                    Element::Link(link.name.clone()),
                    Attribute::PumpCurve,
                    AttrValue::curve(a, b, c),
                );
            }
        }
        for node in wn.nodes() {
            self.registry.notify(
                Element::Node(node.name.clone()),
                Attribute::LeakStatus,
                AttrValue::Bool(node.leak_enabled()),
            );
        }
    }

    /// Recompute isolation flags and notify the registry of changes.
    fn refresh_isolation(&mut self, wn: &mut Network) {
        identify_isolated(wn).apply(wn);
        for node in wn.nodes() {
            self.registry.notify(
                Element::Node(node.name.clone()),
                Attribute::Isolated,
                AttrValue::Bool(node.is_isolated),
            );
        }
        for link in wn.links() {
            self.registry.notify(
                Element::Link(link.name.clone()),
                Attribute::Isolated,
                AttrValue::Bool(link.is_isolated),
            );
        }
    }

    /// Head value of a node at the current iterate.
    fn head_value(&self, wn: &Network, name: &str) -> f64 {
        match self.model.head.get(name) {
            Some(var) => var.value(),
            None => wn
                .node(name)
                .and_then(|n| n.source_head())
                .unwrap_or_default(),
        }
    }

    /// Re-run every classifier against the current iterate, writing changed
    /// tags back to the network and notifying the registry. Returns whether
    /// anything changed.
    fn reclassify(&mut self, wn: &mut Network) -> bool {
        let mut changed = false;
        let pdd_active = self.model.options.demand_model == DemandModel::PressureDependent;

        for name in wn.junction_and_tank_names() {
            let pressure = self.head_value(wn, &name)
                - wn.node(&name).map(|n| n.elevation()).unwrap_or_default();
            let node = wn.node_mut(&name).expect("name from the network");

            if pdd_active && let NodeKind::Junction(j) = &mut node.kind {
                let status = demand_status(pressure, j.minimum_pressure, j.required_pressure);
                if status != j.demand_status {
                    j.demand_status = status;
                    changed = true;
                }
                self.registry.notify(
                    Element::Node(name.clone()),
                    Attribute::DemandStatus,
                    AttrValue::Demand(status),
                );
            }

            if leak_is_active(node.leak_enabled(), node.is_isolated) {
                let regime = leak_regime(pressure);
                if node.leak_regime() != Some(regime) {
                    node.set_leak_regime(regime);
                    changed = true;
                }
                self.registry.notify(
                    Element::Node(name.clone()),
                    Attribute::LeakRegime,
                    AttrValue::Leak(regime),
                );
            }
        }

        for name in wn
            .links()
            .iter()
            .filter(|l| l.as_valve().is_some())
            .map(|l| l.name.clone())
            .collect::<Vec<_>>()
        {
            let link = wn.link(&name).expect("name from the network");
            let start_h = self.head_value(wn, &link.start_node);
            let end_h = self.head_value(wn, &link.end_node);
            let flow = self.model.flow[&name].value();
            let isolated = link.is_isolated;
            let status = match &link.kind {
                LinkKind::Prv(v) => {
                    let end_elev = wn
                        .node(&link.end_node)
                        .map(|n| n.elevation())
                        .unwrap_or_default();
                    prv_status(
                        link.status,
                        start_h,
                        end_h,
                        flow,
                        v.setting,
                        end_elev,
                        isolated,
                    )
                }
                LinkKind::Fcv(_) => fcv_status(start_h, end_h, isolated),
                LinkKind::Tcv(_) => tcv_status(true, isolated),
                _ => unreachable!("filtered to valves"),
            };
            let link = wn.link_mut(&name).expect("name from the network");
            if link.status != status {
                link.status = status;
                changed = true;
            }
            self.registry.notify(
                Element::Link(name.clone()),
                Attribute::Status,
                AttrValue::Status(status),
            );
        }

        changed
    }

    fn report(
        &self,
        wn: &Network,
        iterations: usize,
        residual_norm: f64,
        status_rounds: usize,
    ) -> SolveReport {
        let mut heads = BTreeMap::new();
        for node in wn.nodes() {
            heads.insert(node.name.clone(), self.head_value(wn, &node.name));
        }
        let flows = self
            .model
            .flow
            .iter()
            .map(|(k, v)| (k.clone(), v.value()))
            .collect();
        let demands = wn
            .junction_names()
            .into_iter()
            .map(|name| {
                let d = match self.model.demand.get(&name) {
                    Some(var) => var.value(),
                    None => self.model.expected_demand[&name].value(),
                };
                (name, d)
            })
            .collect();
        let leak_rates = self
            .model
            .leak_rate
            .iter()
            .map(|(k, v)| (k.clone(), v.value()))
            .collect();
        SolveReport {
            heads,
            flows,
            demands,
            leak_rates,
            iterations,
            residual_norm,
            status_rounds,
        }
    }
}
