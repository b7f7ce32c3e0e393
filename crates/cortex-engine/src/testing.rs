// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Test-only helpers shared across crates that exercise [`crate::step::Step`]
//! implementations without a real cluster. Gated behind the `test-utils`
//! feature so this never ships in production builds.

use crate::inventory::{InMemoryInventory, InMemoryReservations};
use crate::knowledge::{InMemoryKnowledge, KnowledgeAccessor};
use crate::step::StepContext;
use std::sync::Arc;

/// A [`StepContext`] backed by empty in-memory stores, for filters that
/// don't need inventory/knowledge fixtures.
#[must_use]
pub fn empty_context() -> StepContext {
    StepContext {
        inventory: Arc::new(InMemoryInventory::new()),
        reservations: Arc::new(InMemoryReservations::new()),
        knowledge: KnowledgeAccessor::new(Arc::new(InMemoryKnowledge::new())),
    }
}

/// A [`StepContext`] backed by the given inventory, with empty reservations
/// and knowledge stores.
#[must_use]
pub fn context_with_inventory(inventory: InMemoryInventory) -> StepContext {
    StepContext {
        inventory: Arc::new(inventory),
        reservations: Arc::new(InMemoryReservations::new()),
        knowledge: KnowledgeAccessor::new(Arc::new(InMemoryKnowledge::new())),
    }
}
