// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! The common step contract shared by every filter and weigher.

use crate::activation::ActivationMap;
use crate::error::Error;
use crate::inventory::{InventoryStore, ReservationStore};
use crate::knowledge::KnowledgeAccessor;
use crate::request::SchedulingRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-subject scalar statistics a step may report for operator
/// visibility. Statistics never affect ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct StepStatistics {
    /// Unit label for the reported values, e.g. `"ratio"`, `"bytes"`.
    pub unit: String,
    /// Per-subject scalar values.
    pub values: HashMap<String, f64>,
}

/// The output of a step that chose to contribute for this request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepResult {
    /// The step's own activation map, seeded from
    /// [`crate::activation::prepare_result`] and then pruned/adjusted.
    pub activations: ActivationMap,
    /// Optional per-subject statistics.
    pub statistics: Option<StepStatistics>,
}

/// The non-error outcome of running a step: either it contributed a
/// result, or it chose not to run for this request (its preconditions
/// were not met). Skipping is distinguished from an error with a sentinel
/// variant rather than an error string, so the engine can match on it
/// directly instead of parsing a message.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step ran and produced a result.
    Ran(StepResult),
    /// The step's preconditions were not met for this request (e.g. no
    /// project id, no AZ requested). Silently logged, never propagated as
    /// an error.
    Skipped {
        /// Why the step chose not to run.
        reason: &'static str,
    },
}

/// Context shared by every step invocation: read-only accessors into
/// cluster-wide state. All I/O happens through these — a step must not
/// reach out to any other external system.
#[derive(Clone)]
pub struct StepContext {
    /// Read-through cache over the `Hypervisor` CRD inventory.
    pub inventory: Arc<dyn InventoryStore>,
    /// Read-through cache over `Reservation` CRDs.
    pub reservations: Arc<dyn ReservationStore>,
    /// Typed accessor over `Knowledge` CRD status blobs.
    pub knowledge: KnowledgeAccessor,
}

/// A single filter or weigher unit of pipeline work.
///
/// Every `run` must start from [`crate::activation::prepare_result`],
/// which seeds the activation map with the identity value for every
/// subject in the request; the step then either deletes keys (filter) or
/// adjusts values (weigh). Returning [`StepOutcome::Skipped`] is the
/// non-error signal that the step chose not to contribute; returning
/// `Err` is logged and the step's activations are discarded — neither
/// aborts the pipeline.
#[async_trait]
pub trait Step: Send + Sync {
    /// The step's name, as configured on its `Step` CRD, used in
    /// audit trails, metrics labels and logs.
    fn name(&self) -> &str;

    /// Whether this step is a filter (only drops keys) or a weigher (only
    /// adjusts values, never drops keys). Used by the pipeline engine to
    /// validate the universal invariant in property-based tests and by
    /// the controller to validate a pipeline's declared `PipelineKind`.
    fn is_filter(&self) -> bool;

    /// Runs the step against a single request.
    async fn run(
        &self,
        ctx: &StepContext,
        request: &dyn SchedulingRequest,
    ) -> Result<StepOutcome, Error>;
}
