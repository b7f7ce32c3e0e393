// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};
use std::collections::HashSet;

const CHECK_TYPE_HINT: &str = "_nova_check_type";
const LIVE_MIGRATE: &str = "live_migrate";
const SOURCE_HOST_HINT: &str = "source_host";

/// For live-migration requests, drops target hosts that differ from the
/// source host's CPU architecture, or that lack any CPU mode, feature or
/// emulated device the source supports. The source host must be present
/// in inventory; its absence is a fatal error, since the caller explicitly
/// named it.
pub struct LiveMigratableFilter {
    name: String,
}

impl LiveMigratableFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for LiveMigratableFilter {
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
        let hints = request.scheduler_hints();
        if hints.get(CHECK_TYPE_HINT).map(String::as_str) != Some(LIVE_MIGRATE) {
            return Ok(StepOutcome::Skipped {
                reason: "not a live migration request",
            });
        }
        let Some(source_host) = hints.get(SOURCE_HOST_HINT).filter(|h| !h.is_empty()) else {
            return Ok(StepOutcome::Skipped {
                reason: "live migration request carries no source host",
            });
        };

        let Some(source) = ctx.inventory.get(source_host) else {
            return Err(Error::Fatal {
                step: self.name.clone(),
                details: format!("source host '{source_host}' not found in inventory"),
            });
        };

        let source_modes: HashSet<&str> = source
            .status
            .domain_capabilities
            .cpu_modes
            .iter()
            .map(String::as_str)
            .collect();
        let source_features: HashSet<&str> = source
            .status
            .domain_capabilities
            .cpu_features
            .iter()
            .map(String::as_str)
            .collect();
        let source_devices: HashSet<&str> = source
            .status
            .domain_capabilities
            .emulated_devices
            .iter()
            .map(String::as_str)
            .collect();

        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            let Some(target) = ctx.inventory.get(host) else {
                return false;
            };
            if target.status.architecture != source.status.architecture {
                return false;
            }
            let target_modes: HashSet<&str> = target
                .status
                .domain_capabilities
                .cpu_modes
                .iter()
                .map(String::as_str)
                .collect();
            let target_features: HashSet<&str> = target
                .status
                .domain_capabilities
                .cpu_features
                .iter()
                .map(String::as_str)
                .collect();
            let target_devices: HashSet<&str> = target
                .status
                .domain_capabilities
                .emulated_devices
                .iter()
                .map(String::as_str)
                .collect();

            source_modes.is_subset(&target_modes)
                && source_features.is_subset(&target_features)
                && source_devices.is_subset(&target_devices)
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
    use cortex_config::crd::{DomainCapabilities, HypervisorStatus};
    use cortex_engine::inventory::InMemoryInventory;
    use cortex_engine::request::NovaRequest;

    fn host(arch: &str, modes: &[&str], features: &[&str], devices: &[&str]) -> HypervisorStatus {
        HypervisorStatus {
            architecture: arch.to_string(),
            domain_capabilities: DomainCapabilities {
                cpu_modes: modes.iter().map(|s| s.to_string()).collect(),
                cpu_features: features.iter().map(|s| s.to_string()).collect(),
                emulated_devices: devices.iter().map(|s| s.to_string()).collect(),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn keeps_compatible_and_drops_incompatible_targets() {
        let mut inventory = InMemoryInventory::new();
        inventory.insert(
            "h1",
            Default::default(),
            host("x86_64", &["host-passthrough", "custom"], &["sev"], &["video"]),
        );
        inventory.insert("h2", Default::default(), host("x86_64", &["host-passthrough"], &[], &[]));
        inventory.insert(
            "h3",
            Default::default(),
            host(
                "x86_64",
                &["host-passthrough", "custom", "host-model"],
                &["sev"],
                &["video"],
            ),
        );
        inventory.insert("h4", Default::default(), host("aarch64", &[], &[], &[]));
        let ctx = cortex_engine::testing::context_with_inventory(inventory);

        let mut request = NovaRequest::new(vec!["h1".into(), "h2".into(), "h3".into(), "h4".into()]);
        let _ = request
            .scheduler_hints
            .insert(CHECK_TYPE_HINT.to_string(), LIVE_MIGRATE.to_string());
        let _ = request
            .scheduler_hints
            .insert(SOURCE_HOST_HINT.to_string(), "h1".to_string());

        let filter = LiveMigratableFilter::new("live-migratable".into());
        let outcome = filter.run(&ctx, &request).await.expect("ok");
        let StepOutcome::Ran(result) = outcome else {
            panic!("expected Ran")
        };
        assert_eq!(result.activations.len(), 2);
        assert!(result.activations.contains_key("h1"));
        assert!(result.activations.contains_key("h3"));
    }

    #[tokio::test]
    async fn unknown_source_host_is_fatal() {
        let ctx = cortex_engine::testing::empty_context();
        let mut request = NovaRequest::new(vec!["h1".into()]);
        let _ = request
            .scheduler_hints
            .insert(CHECK_TYPE_HINT.to_string(), LIVE_MIGRATE.to_string());
        let _ = request
            .scheduler_hints
            .insert(SOURCE_HOST_HINT.to_string(), "ghost".to_string());

        let filter = LiveMigratableFilter::new("live-migratable".into());
        let err = filter.run(&ctx, &request).await.expect_err("should error");
        assert!(err.is_caller_fatal());
    }
}
