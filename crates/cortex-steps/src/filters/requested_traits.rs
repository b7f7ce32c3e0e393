// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

const PREFIX: &str = "trait:";
const REQUIRED: &str = "required";
const FORBIDDEN: &str = "forbidden";

/// For every `trait:<name>` extra-spec valued `required` or `forbidden`,
/// requires the named trait to be present or absent on the host
/// respectively. Skips when the request has no trait constraints.
pub struct RequestedTraitsFilter {
    name: String,
}

impl RequestedTraitsFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for RequestedTraitsFilter {
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
        let Some(flavor) = request.flavor() else {
            return Ok(StepOutcome::Skipped {
                reason: "request carries no flavor",
            });
        };

        let constraints: Vec<(&str, &str)> = flavor
            .extra_specs
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(PREFIX).map(|name| (name, v.as_str())))
            .filter(|(_, v)| *v == REQUIRED || *v == FORBIDDEN)
            .collect();

        if constraints.is_empty() {
            return Ok(StepOutcome::Skipped {
                reason: "no trait constraints requested",
            });
        }

        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            let Some(record) = ctx.inventory.get(host) else {
                return false;
            };
            constraints.iter().all(|(trait_name, requirement)| {
                let present = record.status.traits.iter().any(|t| t == trait_name);
                match *requirement {
                    REQUIRED => present,
                    FORBIDDEN => !present,
                    _ => true,
                }
            })
        });

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}
