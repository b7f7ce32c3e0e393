// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Adapters from `kube::runtime::reflector::Store<K>` watch caches to the
//! read-only accessor traits `cortex-engine` steps run against. Keeping
//! these as thin wrappers means filter/weigher code never touches `kube`
//! directly, only `cortex_engine::{inventory, knowledge}`.

use cortex_config::crd::{Hypervisor, Knowledge, KnowledgeStatus, Reservation};
use cortex_engine::inventory::{HypervisorRecord, InventoryStore, ReservationRecord, ReservationStore};
use cortex_engine::knowledge::KnowledgeStore;
use kube::runtime::reflector::Store;
use kube::ResourceExt;

/// Read-only inventory backed by a watched `Hypervisor` reflector store.
#[derive(Clone)]
pub struct ReflectorInventory {
    store: Store<Hypervisor>,
}

impl ReflectorInventory {
    /// Wraps a reflector store.
    #[must_use]
    pub fn new(store: Store<Hypervisor>) -> Self {
        Self { store }
    }
}

impl InventoryStore for ReflectorInventory {
    fn get(&self, host: &str) -> Option<HypervisorRecord> {
        self.store.state().into_iter().find_map(|obj| {
            if obj.name_any() != host {
                return None;
            }
            Some(HypervisorRecord {
                name: obj.name_any(),
                spec: obj.spec.clone(),
                status: obj.status.clone().unwrap_or_default(),
            })
        })
    }

    fn all(&self) -> Vec<HypervisorRecord> {
        self.store
            .state()
            .iter()
            .map(|obj| HypervisorRecord {
                name: obj.name_any(),
                spec: obj.spec.clone(),
                status: obj.status.clone().unwrap_or_default(),
            })
            .collect()
    }
}

/// Read-only reservation list backed by a watched `Reservation` reflector
/// store.
#[derive(Clone)]
pub struct ReflectorReservations {
    store: Store<Reservation>,
}

impl ReflectorReservations {
    /// Wraps a reflector store.
    #[must_use]
    pub fn new(store: Store<Reservation>) -> Self {
        Self { store }
    }
}

impl ReservationStore for ReflectorReservations {
    fn list(&self) -> Vec<ReservationRecord> {
        self.store
            .state()
            .iter()
            .map(|obj| ReservationRecord {
                name: obj.name_any(),
                spec: obj.spec.clone(),
                status: obj.status.clone().unwrap_or_default(),
            })
            .collect()
    }
}

/// Read-only knowledge snapshot lookup backed by a watched `Knowledge`
/// reflector store, keyed by `spec.name` (the well-known snapshot name)
/// rather than the object's own CRD name.
#[derive(Clone)]
pub struct ReflectorKnowledge {
    store: Store<Knowledge>,
}

impl ReflectorKnowledge {
    /// Wraps a reflector store.
    #[must_use]
    pub fn new(store: Store<Knowledge>) -> Self {
        Self { store }
    }
}

impl KnowledgeStore for ReflectorKnowledge {
    fn get(&self, name: &str) -> Option<KnowledgeStatus> {
        self.store
            .state()
            .into_iter()
            .find(|obj| obj.spec.name == name)
            .and_then(|obj| obj.status.clone())
    }
}
