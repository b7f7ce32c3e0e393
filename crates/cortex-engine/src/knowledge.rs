// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Typed read-through accessor over `Knowledge` CRD status blobs.
//!
//! The knowledge status field is an opaque JSON array of feature rows. This
//! module re-architects that into a typed view: the accessor decodes a
//! named snapshot into a caller-chosen row type and fails closed (returns
//! `None`, never partial data) on decode/kind mismatch, matching the
//! "Typed knowledge over raw bytes" redesign flag.

use cortex_config::crd::KnowledgeStatus;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// A source of current `Knowledge` CRD statuses, keyed by the knowledge's
/// well-known name (e.g. `"host-az"`).
pub trait KnowledgeStore: Send + Sync {
    /// Looks up the current status for a named knowledge snapshot.
    fn get(&self, name: &str) -> Option<KnowledgeStatus>;
}

/// A simple in-memory [`KnowledgeStore`], used by the controller before a
/// kube reflector is wired up and by tests.
#[derive(Debug, Default)]
pub struct InMemoryKnowledge {
    snapshots: RwLock<HashMap<String, KnowledgeStatus>>,
}

impl InMemoryKnowledge {
    /// Builds an empty knowledge store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a named snapshot's status.
    pub fn set(&self, name: impl Into<String>, status: KnowledgeStatus) {
        #[allow(clippy::unwrap_used)]
        let mut guard = self.snapshots.write().unwrap();
        let _ = guard.insert(name.into(), status);
    }
}

impl KnowledgeStore for InMemoryKnowledge {
    fn get(&self, name: &str) -> Option<KnowledgeStatus> {
        #[allow(clippy::unwrap_used)]
        self.snapshots.read().unwrap().get(name).cloned()
    }
}

/// Typed read-through accessor over a [`KnowledgeStore`].
#[derive(Clone)]
pub struct KnowledgeAccessor {
    store: Arc<dyn KnowledgeStore>,
}

impl KnowledgeAccessor {
    /// Wraps a knowledge store.
    #[must_use]
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Reads a named snapshot and decodes its rows as `T`.
    ///
    /// Returns `None` when the snapshot is absent, invalid (per
    /// [`KnowledgeStatus::is_valid`]: zero raw length or an error
    /// condition set), or fails to decode as `Vec<T>` — a kind mismatch
    /// fails closed rather than returning partial data.
    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Option<Vec<T>> {
        let status = self.store.get(name)?;
        if !status.is_valid() {
            return None;
        }
        match serde_json::from_value::<Vec<T>>(status.raw.clone()) {
            Ok(rows) => Some(rows),
            Err(err) => {
                warn!(knowledge = name, error = %err, "knowledge snapshot failed to decode");
                None
            }
        }
    }
}
