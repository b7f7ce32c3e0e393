// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline-lifecycle controller: reconciles `Step` and `Pipeline` CRDs
//! into a live [`registry::PipelineRegistry`] that `cortex-api` serves
//! requests from, and maintains the watched read-only caches
//! (`Hypervisor`, `Reservation`, `Knowledge`) that steps run against.

pub mod controller;
pub mod error;
pub mod index;
pub mod readiness;
pub mod registry;
pub mod stores;

pub use controller::{run, ControllerContext};
pub use error::Error;
pub use index::DependencyIndex;
pub use registry::PipelineRegistry;
pub use stores::{ReflectorInventory, ReflectorKnowledge, ReflectorReservations};
