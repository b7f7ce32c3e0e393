// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use crate::knowledge_rows::UtilizationRow;
use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult, StepStatistics};
use std::collections::HashMap;

const KNOWLEDGE_NAME: &str = "host-utilization";

/// Favours less-utilized hosts by reading the `"host-utilization"`
/// knowledge snapshot and emitting `-(2*ratio - 1)`, so an empty host
/// scores `+1` and a fully utilized host scores `-1`. Never drops keys;
/// hosts absent from the snapshot score `0.0`.
pub struct BalancedUtilizationWeigher {
    name: String,
}

impl BalancedUtilizationWeigher {
    /// Builds the weigher under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for BalancedUtilizationWeigher {
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
        let Some(rows) = ctx.knowledge.read::<UtilizationRow>(KNOWLEDGE_NAME) else {
            return Ok(StepOutcome::Skipped {
                reason: "host-utilization knowledge unavailable",
            });
        };

        let ratios: HashMap<String, f64> = rows.into_iter().map(|r| (r.host, r.cpu_utilized_ratio)).collect();

        let mut activations = activation::prepare_result(request.subjects());
        let mut values = HashMap::with_capacity(activations.len());
        for (host, weight) in &mut activations {
            let signal = match ratios.get(host) {
                Some(ratio) if ratio.is_finite() => -(2.0 * ratio - 1.0),
                _ => 0.0,
            };
            *weight = signal;
            values.insert(host.clone(), ratios.get(host).copied().unwrap_or(0.0));
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

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_config::crd::KnowledgeStatus;
    use cortex_engine::inventory::{InMemoryInventory, InMemoryReservations};
    use cortex_engine::knowledge::{InMemoryKnowledge, KnowledgeAccessor};
    use cortex_engine::request::NovaRequest;
    use cortex_engine::step::StepContext;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn prefers_less_utilized_hosts_and_never_drops_keys() {
        let knowledge = InMemoryKnowledge::new();
        knowledge.set(
            KNOWLEDGE_NAME,
            KnowledgeStatus {
                raw_length: 2,
                raw: json!([
                    {"host": "busy", "cpu_utilized_ratio": 0.9},
                    {"host": "idle", "cpu_utilized_ratio": 0.1},
                ]),
                conditions: vec![],
            },
        );
        let ctx = StepContext {
            inventory: Arc::new(InMemoryInventory::new()),
            reservations: Arc::new(InMemoryReservations::new()),
            knowledge: KnowledgeAccessor::new(Arc::new(knowledge)),
        };

        let request = NovaRequest::new(vec!["busy".into(), "idle".into(), "unknown".into()]);
        let weigher = BalancedUtilizationWeigher::new("balanced-utilization".into());
        let outcome = weigher.run(&ctx, &request).await.expect("ok");
        let StepOutcome::Ran(result) = outcome else {
            panic!("expected Ran")
        };
        assert_eq!(result.activations.len(), 3);
        assert!(result.activations["idle"] > result.activations["busy"]);
        assert_eq!(result.activations["unknown"], 0.0);
    }
}
