// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Weigher-step implementations: monotonic scoring contributions that
//! never drop keys.

mod anti_noisy_neighbour;
mod balanced_utilization;
mod binpacking;

pub use anti_noisy_neighbour::AntiNoisyNeighbourWeigher;
pub use balanced_utilization::BalancedUtilizationWeigher;
pub use binpacking::BinpackingWeigher;
