// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::{GroupPolicy, SchedulingRequest};
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

/// Enforces instance-group affinity/anti-affinity. For `affinity` with a
/// non-empty host list, keeps only those hosts. For `anti-affinity`, drops
/// a host once it already hosts `max_server_per_host` group members —
/// except the host already running the instance being scheduled (the
/// resize exception), which is never dropped for this reason.
pub struct InstanceGroupFilter {
    name: String,
}

impl InstanceGroupFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for InstanceGroupFilter {
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
        let Some(group) = request.instance_group() else {
            return Ok(StepOutcome::Skipped {
                reason: "no instance group on request",
            });
        };
        let Some(policy) = group.policy else {
            return Ok(StepOutcome::Skipped {
                reason: "instance group carries no policy",
            });
        };

        let mut activations = activation::prepare_result(request.subjects());

        match policy {
            GroupPolicy::Affinity => {
                if group.hosts.is_empty() {
                    return Ok(StepOutcome::Skipped {
                        reason: "affinity group names no hosts",
                    });
                }
                activations.retain(|host, _| group.hosts.contains(host));
            }
            GroupPolicy::AntiAffinity => {
                if group.members.is_empty() {
                    return Ok(StepOutcome::Skipped {
                        reason: "anti-affinity group has no members",
                    });
                }
                let max_per_host = group.max_server_per_host();
                let instance_id = request.instance_id();
                activations.retain(|host, _| {
                    let Some(record) = ctx.inventory.get(host) else {
                        return false;
                    };
                    if record.status.instances.iter().any(|i| i == instance_id) {
                        return true;
                    }
                    let resident_members = record
                        .status
                        .instances
                        .iter()
                        .filter(|i| group.members.contains(i))
                        .count();
                    (resident_members as u32) < max_per_host
                });
            }
        }

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}
