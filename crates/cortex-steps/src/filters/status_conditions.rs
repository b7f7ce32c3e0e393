// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_config::crd::{Condition, ConditionStatus};
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

const REQUIRED: &[(&str, ConditionStatus)] = &[
    ("Ready", ConditionStatus::True),
    ("Terminating", ConditionStatus::False),
    ("Tainted", ConditionStatus::False),
];

/// Drops hosts whose `Ready`/`Terminating`/`Tainted` conditions don't meet
/// the required values.
///
/// Open question carried from the source: a condition that is entirely
/// missing from a host's condition set currently passes rather than fails.
/// This is policy-selectable via [`StatusConditionsFilter::treat_missing_as_pass`]
/// rather than hard-coded, since the upstream behaviour is an unresolved
/// TODO, not a deliberate invariant.
pub struct StatusConditionsFilter {
    name: String,
    treat_missing_as_pass: bool,
}

impl StatusConditionsFilter {
    /// Builds the filter with the upstream default policy (missing
    /// conditions pass).
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            name,
            treat_missing_as_pass: true,
        }
    }

    /// Builds the filter with an explicit missing-condition policy.
    #[must_use]
    pub fn with_policy(name: String, treat_missing_as_pass: bool) -> Self {
        Self {
            name,
            treat_missing_as_pass,
        }
    }
}

fn condition_holds(conditions: &[Condition], type_: &str, want: ConditionStatus, missing_passes: bool) -> bool {
    match conditions.iter().find(|c| c.type_ == type_) {
        Some(condition) => condition.status == want,
        None => missing_passes,
    }
}

#[async_trait]
impl Step for StatusConditionsFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_filter(&self) -> bool {
        true
    }

    async fn run(
        &self,
        ctx: &StepContext,
        request: &dyn SchedulingRequest,
    ) -> Result<StepOutcome, Error> {
        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            let Some(record) = ctx.inventory.get(host) else {
                return false;
            };
            REQUIRED.iter().all(|(type_, want)| {
                condition_holds(&record.status.conditions, type_, *want, self.treat_missing_as_pass)
            })
        });

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}
