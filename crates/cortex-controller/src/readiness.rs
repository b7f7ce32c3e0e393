// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Pure readiness computations over CRD specs/statuses, kept free of any
//! `kube` client so they're trivially unit-testable.

use cortex_config::crd::{KnowledgeStatus, PipelineSpec, PipelineStepRef, StepSpec, StepStatus};

/// A knowledge-readiness lookup keyed by name.
pub trait KnowledgeLookup {
    /// Returns the named knowledge's status, if known.
    fn lookup(&self, name: &str) -> Option<KnowledgeStatus>;
}

/// A step-readiness lookup keyed by name.
pub trait StepLookup {
    /// Returns the named step's status, if known.
    fn lookup(&self, name: &str) -> Option<StepStatus>;
}

/// Recomputes a step's readiness: the count of its referenced knowledges
/// that are present, non-empty and error-free, against the total.
#[must_use]
pub fn step_readiness(spec: &StepSpec, knowledges: &impl KnowledgeLookup) -> (bool, u32, u32) {
    let total = spec.knowledges.len() as u32;
    let ready = spec
        .knowledges
        .iter()
        .filter(|k| knowledges.lookup(&k.name).is_some_and(|status| status.is_valid()))
        .count() as u32;
    (ready == total, ready, total)
}

/// Recomputes a pipeline's readiness: every *mandatory* step reference
/// must be ready. Non-mandatory steps still count towards the
/// `ready/total` fraction reported in status.
#[must_use]
pub fn pipeline_readiness(spec: &PipelineSpec, steps: &impl StepLookup) -> (bool, u32, u32) {
    let total = spec.steps.len() as u32;
    let ready = spec
        .steps
        .iter()
        .filter(|s| steps.lookup(&s.step_ref.name).is_some_and(|status| status.ready))
        .count() as u32;
    let mandatory_ready = spec
        .steps
        .iter()
        .filter(|s: &&PipelineStepRef| s.mandatory)
        .all(|s| steps.lookup(&s.step_ref.name).is_some_and(|status| status.ready));
    (mandatory_ready, ready, total)
}

/// Formats the `ready/total` fraction string carried in `Pipeline` status.
#[must_use]
pub fn ready_frac(ready: u32, total: u32) -> String {
    format!("{ready}/{total}")
}
