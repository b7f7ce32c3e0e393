// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult, StepStatistics};
use std::collections::HashMap;

/// Favours already-fuller hosts, to pack workloads tightly and keep empty
/// hosts free to scale down. Reads inventory directly (no knowledge
/// dependency): `delta = 2 * (allocated_cpu / capacity_cpu) - 1`. Never
/// drops keys; a host with zero declared capacity or absent from
/// inventory scores `0.0`.
pub struct BinpackingWeigher {
    name: String,
}

impl BinpackingWeigher {
    /// Builds the weigher under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for BinpackingWeigher {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_filter(&self) -> bool {
        false
    }

    async fn run(
        &self,
        ctx: &StepContext,
        request: &dyn SchedulingRequest,
    ) -> Result<StepOutcome, Error> {
        let mut activations = activation::prepare_result(request.subjects());
        let mut values = HashMap::with_capacity(activations.len());
        for (host, weight) in &mut activations {
            let ratio = ctx
                .inventory
                .get(host)
                .filter(|record| record.status.capacity.cpu > 0)
                .map(|record| record.status.allocation.cpu as f64 / record.status.capacity.cpu as f64)
                .unwrap_or(0.0);
            *weight = 2.0 * ratio.clamp(0.0, 1.0) - 1.0;
            values.insert(host.clone(), ratio);
        }

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: Some(StepStatistics {
                unit: "ratio".to_string(),
                values,
            }),
        }))
    }
}
