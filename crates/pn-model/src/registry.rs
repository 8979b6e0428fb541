//! Change tracking: which builders must rerun when an attribute changes.
//!
//! Every constraint builder, after writing a constraint for an entity,
//! registers itself here against the attributes it read. Between solves the
//! driver calls [`ChangeRegistry::notify`] with current attribute values;
//! only values that differ from the last-observed ones queue their watching
//! builders, and [`ChangeRegistry::flush`] reruns each queued builder for
//! exactly the entities that changed.

use crate::error::ModelResult;
use crate::model::HydraulicModel;
use pn_network::{DemandStatus, LeakRegime, LinkStatus, Network};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// An entity reference by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Element {
    Node(String),
    Link(String),
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::Node(n) | Element::Link(n) => n,
        }
    }
}

/// Watched attributes of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Attribute {
    Status,
    Isolated,
    LeakStatus,
    DemandStatus,
    LeakRegime,
    PumpCurve,
}

/// A snapshot of an attribute value, comparable for change detection.
/// Floats are compared bitwise: any numeric change counts as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue {
    Status(LinkStatus),
    Bool(bool),
    Demand(DemandStatus),
    Leak(LeakRegime),
    Curve([u64; 3]),
}

impl AttrValue {
    /// Snapshot of pump curve coefficients (A, B, C).
    pub fn curve(a: f64, b: f64, c: f64) -> Self {
        AttrValue::Curve([a.to_bits(), b.to_bits(), c.to_bits()])
    }
}

/// The constraint builders, as queueable identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuilderKind {
    MassBalance,
    PddMassBalance,
    HazenWilliams,
    HeadPump,
    PowerPump,
    Prv,
    Fcv,
    Tcv,
    Pdd,
    Leak,
}

/// (entity, attribute) -> watching builders, with last-observed values and
/// a pending-rebuild queue.
#[derive(Debug, Default)]
pub struct ChangeRegistry {
    watchers: BTreeMap<(Element, Attribute), Vec<BuilderKind>>,
    last_seen: BTreeMap<(Element, Attribute), AttrValue>,
    pending: BTreeMap<BuilderKind, BTreeSet<String>>,
    rebuilds: u64,
}

impl ChangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `builder` to changes of `attribute` on `element`.
    /// Idempotent: re-registering is a no-op.
    pub fn register(&mut self, element: Element, attribute: Attribute, builder: BuilderKind) {
        let list = self.watchers.entry((element, attribute)).or_default();
        if !list.contains(&builder) {
            list.push(builder);
        }
    }

    /// Record the current value of an attribute without queueing anyone.
    /// Builders call this right after reading the attribute, so the next
    /// `notify` with the same value is a no-op.
    pub fn observe(&mut self, element: Element, attribute: Attribute, value: AttrValue) {
        self.last_seen.insert((element, attribute), value);
    }

    /// Compare `value` against the last-observed one; when it differs (or
    /// was never observed), queue every watching builder for this element.
    pub fn notify(&mut self, element: Element, attribute: Attribute, value: AttrValue) {
        let key = (element, attribute);
        if self.last_seen.get(&key) == Some(&value) {
            return;
        }
        if let Some(builders) = self.watchers.get(&key) {
            for &b in builders {
                self.pending
                    .entry(b)
                    .or_default()
                    .insert(key.0.name().to_owned());
            }
        }
        self.last_seen.insert(key, value);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Rerun every queued builder for exactly its changed entities.
    ///
    /// Returns the number of builder invocations. Builders re-register and
    /// re-observe while running, so the queue is drained up front.
    pub fn flush(&mut self, model: &mut HydraulicModel, wn: &Network) -> ModelResult<u64> {
        let pending = std::mem::take(&mut self.pending);
        let mut invocations = 0;
        for (builder, names) in pending {
            let names: Vec<String> = names.into_iter().collect();
            debug!(builder = ?builder, count = names.len(), "rebuilding constraints");
            crate::constraints::dispatch(builder, model, wn, self, Some(&names))?;
            invocations += 1;
            self.rebuilds += 1;
        }
        Ok(invocations)
    }

    /// Total builder invocations performed by `flush` so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}
