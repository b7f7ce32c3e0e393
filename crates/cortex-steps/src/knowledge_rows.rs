// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Typed row shapes for the knowledge snapshots weigher steps read through
//! [`cortex_engine::knowledge::KnowledgeAccessor`].

use serde::Deserialize;

/// A row of the `"host-utilization"` knowledge snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct UtilizationRow {
    /// Host name.
    pub host: String,
    /// Fraction of CPU capacity currently utilized, in `[0, 1]`.
    pub cpu_utilized_ratio: f64,
}

/// A row of the `"host-noisy-neighbour"` knowledge snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct NoisyNeighbourRow {
    /// Host name.
    pub host: String,
    /// Noisy-neighbour score, in `[0, 1]`, higher is noisier.
    pub noisy_score: f64,
}
