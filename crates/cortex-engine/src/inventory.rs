// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Read-through accessors over the `Hypervisor` inventory cache and
//! `Reservation` CRDs.
//!
//! These are traits rather than concrete kube clients so that filter and
//! weigher steps — and their tests — never depend on `kube` directly.
//! `cortex-controller` provides the production implementation backed by a
//! watched reflector store; tests use simple in-memory maps.

use cortex_config::crd::{HypervisorSpec, HypervisorStatus, ReservationSpec, ReservationStatus};
use std::collections::HashMap;

/// A single hypervisor's spec and observed status, keyed by host name.
#[derive(Debug, Clone)]
pub struct HypervisorRecord {
    /// The host's name (the subject identifier used throughout requests).
    pub name: String,
    /// Operator-declared pinning metadata.
    pub spec: HypervisorSpec,
    /// Observed inventory facts.
    pub status: HypervisorStatus,
}

/// Read-only accessor over the inventory cache.
pub trait InventoryStore: Send + Sync {
    /// Looks up a single host by name.
    fn get(&self, host: &str) -> Option<HypervisorRecord>;
    /// Returns every known host. Used by filters that need the whole
    /// universe (e.g. live-migration source-host lookup, capacity ledger).
    fn all(&self) -> Vec<HypervisorRecord>;
}

/// A single reservation's spec and observed status.
#[derive(Debug, Clone)]
pub struct ReservationRecord {
    /// The reservation object's name.
    pub name: String,
    /// Reservation spec (scheduler descriptor, requested resources).
    pub spec: ReservationSpec,
    /// Reservation status (phase, pinned host).
    pub status: ReservationStatus,
}

/// Read-only accessor over reservations.
pub trait ReservationStore: Send + Sync {
    /// Returns every known reservation, regardless of phase — callers
    /// filter for `Active` themselves per the spec's algorithm.
    fn list(&self) -> Vec<ReservationRecord>;
}

/// A simple in-memory [`InventoryStore`], used by the controller before a
/// kube reflector is wired up and extensively by tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    hosts: HashMap<String, (HypervisorSpec, HypervisorStatus)>,
}

impl InMemoryInventory {
    /// Builds an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a host record.
    pub fn insert(&mut self, name: impl Into<String>, spec: HypervisorSpec, status: HypervisorStatus) {
        let _ = self.hosts.insert(name.into(), (spec, status));
    }
}

impl InventoryStore for InMemoryInventory {
    fn get(&self, host: &str) -> Option<HypervisorRecord> {
        self.hosts.get(host).map(|(spec, status)| HypervisorRecord {
            name: host.to_string(),
            spec: spec.clone(),
            status: status.clone(),
        })
    }

    fn all(&self) -> Vec<HypervisorRecord> {
        self.hosts
            .iter()
            .map(|(name, (spec, status))| HypervisorRecord {
                name: name.clone(),
                spec: spec.clone(),
                status: status.clone(),
            })
            .collect()
    }
}

/// A simple in-memory [`ReservationStore`], used by the controller before a
/// kube reflector is wired up and extensively by tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReservations {
    reservations: Vec<ReservationRecord>,
}

impl InMemoryReservations {
    /// Builds an empty reservation store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reservation record.
    pub fn push(&mut self, name: impl Into<String>, spec: ReservationSpec, status: ReservationStatus) {
        self.reservations.push(ReservationRecord {
            name: name.into(),
            spec,
            status,
        });
    }
}

impl ReservationStore for InMemoryReservations {
    fn list(&self) -> Vec<ReservationRecord> {
        self.reservations.clone()
    }
}
