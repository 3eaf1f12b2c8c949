//! Bridge Registry
//!
//! Records *why* a bridge exists (two-party call or conference) for bridges
//! created by this process. The control plane stays authoritative for whether a
//! bridge exists at all; the registry only drives cleanup policy.

use dashmap::DashMap;
use std::fmt;
use tracing::debug;

use rvoip_ari_client::BridgeId;

/// Semantic kind of a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeKind {
    /// Exactly two legs; torn down when one leg remains
    Call,
    /// Three or more legs, or explicitly joined; persists until vacated
    Conference,
}

impl BridgeKind {
    /// Kind of a bridge dialed with `participants` addresses
    pub fn for_participants(participants: usize) -> Self {
        if participants == 2 {
            Self::Call
        } else {
            Self::Conference
        }
    }

    /// Prefix used when naming bridges of this kind on the control plane
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::Conference => "Conference",
        }
    }
}

impl fmt::Display for BridgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => f.write_str("call"),
            Self::Conference => f.write_str("conference"),
        }
    }
}

/// Concurrent map from bridge identifier to kind
#[derive(Debug, Default)]
pub struct BridgeRegistry {
    kinds: DashMap<BridgeId, BridgeKind>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bridge_id: &BridgeId) -> Option<BridgeKind> {
        self.kinds.get(bridge_id).map(|entry| *entry.value())
    }

    /// Tag a bridge, returning the previous kind
    pub fn set(&self, bridge_id: BridgeId, kind: BridgeKind) -> Option<BridgeKind> {
        debug!("Registry: bridge {} tagged as {}", bridge_id, kind);
        self.kinds.insert(bridge_id, kind)
    }

    pub fn remove(&self, bridge_id: &BridgeId) -> Option<BridgeKind> {
        self.kinds.remove(bridge_id).map(|(_, kind)| kind)
    }

    /// Mark a bridge as a conference. Returns true when the tag changed.
    pub fn promote_to_conference(&self, bridge_id: &BridgeId) -> bool {
        let previous = self.kinds.insert(bridge_id.clone(), BridgeKind::Conference);
        let changed = previous != Some(BridgeKind::Conference);
        if changed {
            debug!("Registry: bridge {} promoted to conference", bridge_id);
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Copy of all entries, sorted by bridge identifier
    pub fn snapshot(&self) -> Vec<(BridgeId, BridgeKind)> {
        let mut entries: Vec<_> = self
            .kinds
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
