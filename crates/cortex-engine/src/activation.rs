// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! The activation combinator: merges a step's per-host activation deltas
//! into the running weight vector.
//!
//! `apply(current, delta)` intersects the key sets — any subject absent
//! from `delta` is dropped, which is how filter steps prune — and adds
//! `tanh(delta[s])` to every retained subject's weight. Bounding each
//! step's contribution to `(-1, 1)` keeps any single step's influence
//! comparable to any other's regardless of the raw magnitude of its
//! internal scoring, while preserving sign and monotonicity.

use crate::request::Subject;
use std::collections::HashMap;

/// A per-subject activation value.
pub type ActivationMap = HashMap<Subject, f64>;

/// The identity element of the activation combinator.
pub const IDENTITY: f64 = 0.0;

/// Seeds an activation map with the identity value for every subject. Every
/// step's `run` must start from this map: steps then either delete keys
/// (filter) or adjust values (weigh). This is what makes the combinator's
/// intersection semantics correct.
#[must_use]
pub fn prepare_result(subjects: &[Subject]) -> ActivationMap {
    subjects.iter().map(|s| (s.clone(), IDENTITY)).collect()
}

/// Applies a step's activation delta onto the current running weights.
///
/// The result's key set is `keys(current) ∩ keys(delta)`. For retained
/// subjects, the new weight is `current[s] + tanh(delta[s])`.
#[must_use]
pub fn apply(current: &ActivationMap, delta: &ActivationMap) -> ActivationMap {
    current
        .iter()
        .filter_map(|(subject, current_weight)| {
            delta
                .get(subject)
                .map(|delta_weight| (subject.clone(), current_weight + delta_weight.tanh()))
        })
        .collect()
}
