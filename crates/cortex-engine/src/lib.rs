// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! The Cortex pipeline engine: request model, activation combinator,
//! the step contract, read-through accessors over cluster state, and the
//! pipeline runner itself.
//!
//! This crate has no `kube` dependency: it is the pure decision core,
//! testable without a cluster. `cortex-controller` supplies the production
//! [`inventory::InventoryStore`], [`inventory::ReservationStore`] and
//! [`knowledge::KnowledgeStore`] implementations backed by watched
//! reflectors; `cortex-steps` supplies concrete [`step::Step`]
//! implementations.

pub mod activation;
pub mod error;
pub mod inventory;
pub mod knowledge;
pub mod pipeline;
pub mod request;
pub mod step;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use activation::ActivationMap;
pub use error::Error;
pub use pipeline::{ConfiguredStep, PipelineEngine, PipelineResult, StepAudit};
pub use request::{CinderRequest, ManilaRequest, NovaRequest, SchedulingRequest, Subject};
pub use step::{Step, StepContext, StepOutcome, StepResult, StepStatistics};
