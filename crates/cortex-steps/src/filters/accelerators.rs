// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

const ACCEL_DEVICE_PROFILE: &str = "accel:device_profile";
const ACCELERATOR_TRAIT: &str = "COMPUTE_ACCELERATORS";

/// When the flavor requests `accel:device_profile`, drops hosts lacking
/// the `COMPUTE_ACCELERATORS` trait.
pub struct AcceleratorsFilter {
    name: String,
}

impl AcceleratorsFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for AcceleratorsFilter {
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
        let wants_accelerators = request
            .flavor()
            .is_some_and(|flavor| flavor.extra_specs.contains_key(ACCEL_DEVICE_PROFILE));

        if !wants_accelerators {
            return Ok(StepOutcome::Skipped {
                reason: "no accelerator device profile requested",
            });
        }

        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            ctx.inventory
                .get(host)
                .is_some_and(|record| record.status.traits.iter().any(|t| t == ACCELERATOR_TRAIT))
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
    use cortex_engine::request::{Flavor, NovaRequest};

    #[tokio::test]
    async fn drops_hosts_without_accelerator_trait() {
        let mut inventory = InMemoryInventory::new();
        inventory.insert(
            "h1",
            Default::default(),
            HypervisorStatus {
                traits: vec![ACCELERATOR_TRAIT.to_string()],
                ..Default::default()
            },
        );
        inventory.insert("h2", Default::default(), HypervisorStatus::default());
        let ctx = cortex_engine::testing::context_with_inventory(inventory);

        let mut extra_specs = std::collections::HashMap::new();
        let _ = extra_specs.insert(ACCEL_DEVICE_PROFILE.to_string(), "gpu".to_string());
        let mut request = NovaRequest::new(vec!["h1".into(), "h2".into()]);
        request.flavor = Flavor {
            extra_specs,
            ..Default::default()
        };

        let filter = AcceleratorsFilter::new("has-accelerators".into());
        let outcome = filter.run(&ctx, &request).await.expect("ok");
        let StepOutcome::Ran(result) = outcome else {
            panic!("expected Ran")
        };
        assert_eq!(result.activations.len(), 1);
        assert!(result.activations.contains_key("h1"));
    }
}
