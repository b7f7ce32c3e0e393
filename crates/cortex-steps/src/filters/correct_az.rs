// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_config::crd::AZ_LABEL;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

/// Keeps only hosts whose AZ label equals the requested availability zone.
/// Hosts without an AZ label fail the check. Skips when the request does
/// not name an AZ.
pub struct CorrectAzFilter {
    name: String,
}

impl CorrectAzFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for CorrectAzFilter {
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
        let Some(az) = request.availability_zone().filter(|az| !az.is_empty()) else {
            return Ok(StepOutcome::Skipped {
                reason: "no availability zone requested",
            });
        };

        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            ctx.inventory
                .get(host)
                .and_then(|record| record.status.labels.get(AZ_LABEL).cloned())
                .is_some_and(|host_az| host_az == az)
        });

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_config::crd::HypervisorStatus;
    use cortex_engine::inventory::InMemoryInventory;
    use cortex_engine::request::NovaRequest;
    use std::collections::BTreeMap;

    fn status_with_az(az: &str) -> HypervisorStatus {
        let mut labels = BTreeMap::new();
        let _ = labels.insert(AZ_LABEL.to_string(), az.to_string());
        HypervisorStatus {
            labels,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn skips_without_requested_az() {
        let request = NovaRequest::new(vec!["h1".into()]);
        let filter = CorrectAzFilter::new("correct-az".into());
        let outcome = filter
            .run(&cortex_engine::testing::empty_context(), &request)
            .await
            .expect("ok");
        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn keeps_only_matching_az_and_drops_missing_label() {
        let mut inventory = InMemoryInventory::new();
        inventory.insert("h1", Default::default(), status_with_az("az1"));
        inventory.insert("h2", Default::default(), status_with_az("az2"));
        inventory.insert("h3", Default::default(), HypervisorStatus::default());
        let ctx = cortex_engine::testing::context_with_inventory(inventory);

        let mut request = NovaRequest::new(vec!["h1".into(), "h2".into(), "h3".into()]);
        request.availability_zone = Some("az1".into());

        let filter = CorrectAzFilter::new("correct-az".into());
        let outcome = filter.run(&ctx, &request).await.expect("ok");
        let StepOutcome::Ran(result) = outcome else {
            panic!("expected Ran")
        };
        assert_eq!(result.activations.len(), 1);
        assert!(result.activations.contains_key("h1"));
    }
}
