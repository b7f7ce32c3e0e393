// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

/// Drops hosts whose `allowedProjects` list is non-empty and does not
/// contain the request's project id. Hosts with an empty list are
/// unrestricted. A host missing from inventory is dropped.
pub struct AllowedProjectsFilter {
    name: String,
}

impl AllowedProjectsFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for AllowedProjectsFilter {
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
        let project_id = request.project_id();
        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            let Some(record) = ctx.inventory.get(host) else {
                return false;
            };
            record.spec.allowed_projects.is_empty()
                || record
                    .spec
                    .allowed_projects
                    .iter()
                    .any(|p| p == project_id)
        });

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}
