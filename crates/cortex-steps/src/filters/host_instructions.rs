// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};
use cortex_engine::activation;

/// Drops hosts named in `ignore_hosts`; when `force_hosts` is non-empty,
/// keeps only the hosts it names. Absence of either list is a no-op.
pub struct HostInstructionsFilter {
    name: String,
}

impl HostInstructionsFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for HostInstructionsFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_filter(&self) -> bool {
        true
    }

    async fn run(
        &self,
        _ctx: &StepContext,
        request: &dyn SchedulingRequest,
    ) -> Result<StepOutcome, Error> {
        let mut activations = activation::prepare_result(request.subjects());

        for ignored in request.ignore_hosts() {
            let _ = activations.remove(ignored);
        }

        let force_hosts = request.force_hosts();
        if !force_hosts.is_empty() {
            activations.retain(|host, _| force_hosts.contains(host));
        }

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}
