// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

/// Drops hosts that share no aggregate with a requested destination's
/// aggregate set, and further restricts to a single named host when one is
/// given. No-op when the request carries no destination descriptor.
pub struct RequestedDestinationFilter {
    name: String,
}

impl RequestedDestinationFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for RequestedDestinationFilter {
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
        let Some(destination) = request.requested_destination() else {
            return Ok(StepOutcome::Skipped {
                reason: "no requested destination",
            });
        };

        let mut activations = activation::prepare_result(request.subjects());

        if !destination.aggregates.is_empty() {
            activations.retain(|host, _| {
                ctx.inventory.get(host).is_some_and(|record| {
                    record
                        .status
                        .aggregates
                        .iter()
                        .any(|agg| destination.aggregates.contains(&agg.name))
                })
            });
        }

        if let Some(only_host) = &destination.host {
            activations.retain(|host, _| host == only_host);
        }

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}
