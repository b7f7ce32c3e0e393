// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

const FLAVOR_KEY: &str = "hw:virtio_packed_ring";
const IMAGE_KEY: &str = "hw_virtio_packed_ring";
const PACKED_TRAIT: &str = "COMPUTE_NET_VIRTIO_PACKED";

/// When the flavor or image requests packed virtqueue, drops hosts lacking
/// the `COMPUTE_NET_VIRTIO_PACKED` trait.
pub struct PackedVirtqueueFilter {
    name: String,
}

impl PackedVirtqueueFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for PackedVirtqueueFilter {
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
        let wants_packed = request
            .flavor()
            .is_some_and(|flavor| flavor.extra_specs.contains_key(FLAVOR_KEY))
            || request.image_properties().contains_key(IMAGE_KEY);

        if !wants_packed {
            return Ok(StepOutcome::Skipped {
                reason: "packed virtqueue not requested",
            });
        }

        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            ctx.inventory
                .get(host)
                .is_some_and(|record| record.status.traits.iter().any(|t| t == PACKED_TRAIT))
        });

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}
