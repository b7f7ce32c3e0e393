// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult};

const PREFIX: &str = "capabilities:";

/// Operators not used in production flavours; their presence in a
/// `capabilities:` extra-spec skips the filter entirely rather than risk
/// over-filtering on semantics we don't model.
const UNSUPPORTED_OPERATORS: &[&str] = &[
    "=", "<in>", "<all-in>", "==", "!=", ">=", "<=", "s==", "s!=", "s<", "s<=", "s>", "s>=", "<or>",
];

/// For every `capabilities:<key>` extra-spec, requires equality against the
/// host's flattened capability of the same key. Missing capability drops
/// the host. Skips entirely when any constraint uses an unsupported
/// operator expression.
pub struct ComputeCapabilitiesFilter {
    name: String,
}

impl ComputeCapabilitiesFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for ComputeCapabilitiesFilter {
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
            .filter_map(|(k, v)| k.strip_prefix(PREFIX).map(|key| (key, v.as_str())))
            .collect();

        if constraints.is_empty() {
            return Ok(StepOutcome::Skipped {
                reason: "no capability constraints requested",
            });
        }

        if constraints.iter().any(|(_, value)| has_unsupported_operator(value)) {
            return Ok(StepOutcome::Skipped {
                reason: "unsupported capability operator",
            });
        }

        let mut activations = activation::prepare_result(request.subjects());
        activations.retain(|host, _| {
            let Some(record) = ctx.inventory.get(host) else {
                return false;
            };
            constraints
                .iter()
                .all(|(key, expected)| record.status.capabilities.get(*key).map(String::as_str) == Some(*expected))
        });

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: None,
        }))
    }
}

fn has_unsupported_operator(value: &str) -> bool {
    let first_token = value.split_whitespace().next().unwrap_or(value);
    UNSUPPORTED_OPERATORS.contains(&first_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_config::crd::HypervisorStatus;
    use cortex_engine::inventory::InMemoryInventory;
    use cortex_engine::request::{Flavor, NovaRequest};
    use std::collections::BTreeMap;

    fn status_with_capability(key: &str, value: &str) -> HypervisorStatus {
        let mut capabilities = BTreeMap::new();
        let _ = capabilities.insert(key.to_string(), value.to_string());
        HypervisorStatus {
            capabilities,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unsupported_operator_skips_the_whole_filter() {
        let mut inventory = InMemoryInventory::new();
        inventory.insert("h1", Default::default(), status_with_capability("cpu_arch", "x86_64"));
        inventory.insert("h2", Default::default(), status_with_capability("cpu_arch", "aarch64"));
        let ctx = cortex_engine::testing::context_with_inventory(inventory);

        let mut extra_specs = std::collections::HashMap::new();
        let _ = extra_specs.insert(
            "capabilities:cpu_arch".to_string(),
            "<in> x86_64,aarch64".to_string(),
        );
        let mut request = NovaRequest::new(vec!["h1".into(), "h2".into()]);
        request.flavor = Flavor {
            extra_specs,
            ..Default::default()
        };

        let filter = ComputeCapabilitiesFilter::new("compute-capabilities".into());
        let outcome = filter.run(&ctx, &request).await.expect("ok");
        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn requires_exact_equality_and_drops_missing() {
        let mut inventory = InMemoryInventory::new();
        inventory.insert("h1", Default::default(), status_with_capability("cpu_arch", "x86_64"));
        inventory.insert("h2", Default::default(), HypervisorStatus::default());
        let ctx = cortex_engine::testing::context_with_inventory(inventory);

        let mut extra_specs = std::collections::HashMap::new();
        let _ = extra_specs.insert("capabilities:cpu_arch".to_string(), "x86_64".to_string());
        let mut request = NovaRequest::new(vec!["h1".into(), "h2".into()]);
        request.flavor = Flavor {
            extra_specs,
            ..Default::default()
        };

        let filter = ComputeCapabilitiesFilter::new("compute-capabilities".into());
        let outcome = filter.run(&ctx, &request).await.expect("ok");
        let StepOutcome::Ran(result) = outcome else {
            panic!("expected Ran")
        };
        assert_eq!(result.activations.len(), 1);
        assert!(result.activations.contains_key("h1"));
    }
}
