// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

const FILTER_TENANT_ID: &str = "filter_tenant_id";

/// Keeps a host if it is unpinned (no `filter_tenant_id` metadata on any of
/// its aggregates) or pinned to the request's project. Skips when the
/// request carries no project id.
pub struct ProjectAggregatesFilter {
    name: String,
}

impl ProjectAggregatesFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for ProjectAggregatesFilter {
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
        if project_id.is_empty() {
            return Ok(StepOutcome::Skipped {
                reason: "request carries no project id",
            });
        }

        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            let Some(record) = ctx.inventory.get(host) else {
                return false;
            };
            let pins: Vec<&String> = record
                .status
                .aggregates
                .iter()
                .filter_map(|agg| agg.metadata.get(FILTER_TENANT_ID))
                .collect();
            pins.is_empty() || pins.iter().any(|p| p.as_str() == project_id)
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
    use cortex_config::crd::AggregateMembership;
    use cortex_engine::inventory::InMemoryInventory;
    use cortex_engine::request::NovaRequest;
    use std::collections::BTreeMap;

    fn pinned_status(project: &str) -> cortex_config::crd::HypervisorStatus {
        let mut metadata = BTreeMap::new();
        let _ = metadata.insert(FILTER_TENANT_ID.to_string(), project.to_string());
        cortex_config::crd::HypervisorStatus {
            aggregates: vec![AggregateMembership {
                name: "pinned-agg".into(),
                metadata,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn keeps_unpinned_and_correctly_pinned_hosts() {
        let mut inventory = InMemoryInventory::new();
        inventory.insert("unpinned", Default::default(), Default::default());
        inventory.insert("pinned-a", Default::default(), pinned_status("proj-a"));
        inventory.insert("pinned-b", Default::default(), pinned_status("proj-b"));
        let ctx = cortex_engine::testing::context_with_inventory(inventory);

        let mut request = NovaRequest::new(vec!["unpinned".into(), "pinned-a".into(), "pinned-b".into()]);
        request.project_id = "proj-a".into();

        let filter = ProjectAggregatesFilter::new("project-aggregates".into());
        let outcome = filter.run(&ctx, &request).await.expect("ok");
        let StepOutcome::Ran(result) = outcome else {
            panic!("expected Ran")
        };
        assert_eq!(result.activations.len(), 2);
        assert!(!result.activations.contains_key("pinned-b"));
    }
}
