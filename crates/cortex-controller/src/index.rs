// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Dependency index from knowledge name -> referencing steps, and from
//! step -> referencing pipelines. Populated as each kind reconciles so
//! that a knowledge or step change can requeue the right dependents via
//! `Controller::watches`, without every reconciler re-listing the world.

use cortex_config::crd::{Pipeline, Step};
use dashmap::DashMap;
use kube::runtime::reflector::ObjectRef;
use std::collections::HashSet;

/// A namespaced object key, used as the index's own hashable identity.
type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// Tracks which steps depend on which knowledges, and which pipelines
/// depend on which steps.
#[derive(Default)]
pub struct DependencyIndex {
    steps_by_knowledge: DashMap<Key, HashSet<ObjectRef<Step>>>,
    pipelines_by_step: DashMap<Key, HashSet<ObjectRef<Pipeline>>>,
}

impl DependencyIndex {
    /// Builds an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the knowledge set a single step depends on.
    pub fn reindex_step(&self, step_ref: ObjectRef<Step>, knowledge_namespace: &str, knowledge_names: &[String]) {
        self.steps_by_knowledge
            .retain(|_, steps| {
                let _ = steps.remove(&step_ref);
                true
            });
        for name in knowledge_names {
            self.steps_by_knowledge
                .entry(key(knowledge_namespace, name))
                .or_default()
                .insert(step_ref.clone());
        }
    }

    /// Replaces the step set a single pipeline depends on.
    pub fn reindex_pipeline(&self, pipeline_ref: ObjectRef<Pipeline>, step_namespace: &str, step_names: &[String]) {
        self.pipelines_by_step.retain(|_, pipelines| {
            let _ = pipelines.remove(&pipeline_ref);
            true
        });
        for name in step_names {
            self.pipelines_by_step
                .entry(key(step_namespace, name))
                .or_default()
                .insert(pipeline_ref.clone());
        }
    }

    /// Steps that reference the named knowledge.
    #[must_use]
    pub fn steps_for_knowledge(&self, namespace: &str, name: &str) -> Vec<ObjectRef<Step>> {
        self.steps_by_knowledge
            .get(&key(namespace, name))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Pipelines that reference the named step.
    #[must_use]
    pub fn pipelines_for_step(&self, namespace: &str, name: &str) -> Vec<ObjectRef<Pipeline>> {
        self.pipelines_by_step
            .get(&key(namespace, name))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reindex_step_tracks_knowledge_dependents() {
        let index = DependencyIndex::new();
        let step_ref: ObjectRef<Step> = ObjectRef::new("capacity").within("default");
        index.reindex_step(step_ref.clone(), "default", &["host-utilization".to_string()]);
        let dependents = index.steps_for_knowledge("default", "host-utilization");
        assert_eq!(dependents, vec![step_ref]);
    }

    #[test]
    fn reindex_pipeline_tracks_step_dependents() {
        let index = DependencyIndex::new();
        let pipeline_ref: ObjectRef<Pipeline> = ObjectRef::new("nova-default").within("default");
        index.reindex_pipeline(pipeline_ref.clone(), "default", &["correct-az".to_string()]);
        let dependents = index.pipelines_for_step("default", "correct-az");
        assert_eq!(dependents, vec![pipeline_ref]);
    }
}
