// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! The running pipeline registry: a concurrent map from a `Pipeline`
//! object's namespaced name to its currently built [`PipelineEngine`].
//!
//! The controller is the single writer, swapping an entry whenever the
//! owning `Pipeline` or any of its steps changes. `cortex-api` is a
//! many-reader: every inbound scheduling request looks a pipeline up here
//! and runs it. `DashMap`'s per-shard locking gives us the swap without a
//! registry-wide lock blocking concurrent requests.

use cortex_engine::PipelineEngine;
use dashmap::DashMap;
use std::sync::Arc;

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Concurrent registry of built, runnable pipelines.
#[derive(Default)]
pub struct PipelineRegistry {
    pipelines: DashMap<String, Arc<PipelineEngine>>,
}

impl PipelineRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a pipeline by namespace and name.
    #[must_use]
    pub fn get(&self, namespace: &str, name: &str) -> Option<Arc<PipelineEngine>> {
        self.pipelines.get(&key(namespace, name)).map(|entry| Arc::clone(&entry))
    }

    /// Installs (or atomically replaces) a pipeline.
    pub fn insert(&self, namespace: &str, name: &str, engine: Arc<PipelineEngine>) {
        let _ = self.pipelines.insert(key(namespace, name), engine);
    }

    /// Removes a pipeline, e.g. on deletion or when it becomes unready.
    pub fn remove(&self, namespace: &str, name: &str) {
        let _ = self.pipelines.remove(&key(namespace, name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_engine::PipelineEngine;
    use cortex_telemetry::PipelineMetrics;
    use std::sync::Arc;

    #[test]
    fn insert_then_get_round_trips() {
        let registry = PipelineRegistry::new();
        let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
        let engine = Arc::new(PipelineEngine::new("nova-default".to_string(), vec![], metrics));
        registry.insert("openstack", "nova-default", Arc::clone(&engine));
        let fetched = registry.get("openstack", "nova-default").expect("present");
        assert_eq!(fetched.name(), "nova-default");
    }

    #[test]
    fn remove_clears_entry() {
        let registry = PipelineRegistry::new();
        let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
        let engine = Arc::new(PipelineEngine::new("nova-default".to_string(), vec![], metrics));
        registry.insert("openstack", "nova-default", engine);
        registry.remove("openstack", "nova-default");
        assert!(registry.get("openstack", "nova-default").is_none());
    }
}
