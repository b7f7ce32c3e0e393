// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use crate::knowledge_rows::NoisyNeighbourRow;
use async_trait::async_trait;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult, StepStatistics};
use std::collections::HashMap;

const KNOWLEDGE_NAME: &str = "host-noisy-neighbour";

/// Penalises hosts with a high noisy-neighbour score by reading the
/// `"host-noisy-neighbour"` knowledge snapshot and emitting `-score`.
/// Never drops keys; hosts absent from the snapshot score `0.0`.
pub struct AntiNoisyNeighbourWeigher {
    name: String,
}

impl AntiNoisyNeighbourWeigher {
    /// Builds the weigher under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for AntiNoisyNeighbourWeigher {
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
        let Some(rows) = ctx.knowledge.read::<NoisyNeighbourRow>(KNOWLEDGE_NAME) else {
            return Ok(StepOutcome::Skipped {
                reason: "host-noisy-neighbour knowledge unavailable",
            });
        };

        let scores: HashMap<String, f64> = rows.into_iter().map(|r| (r.host, r.noisy_score)).collect();

        let mut activations = activation::prepare_result(request.subjects());
        let mut values = HashMap::with_capacity(activations.len());
        for (host, weight) in &mut activations {
            let score = scores.get(host).copied().unwrap_or(0.0);
            *weight = if score.is_finite() { -score } else { 0.0 };
            values.insert(host.clone(), score);
        }

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: Some(StepStatistics {
                unit: "score".to_string(),
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
    async fn penalises_noisy_hosts() {
        let knowledge = InMemoryKnowledge::new();
        knowledge.set(
            KNOWLEDGE_NAME,
            KnowledgeStatus {
                raw_length: 1,
                raw: json!([{"host": "noisy", "noisy_score": 0.8}]),
                conditions: vec![],
            },
        );
        let ctx = StepContext {
            inventory: Arc::new(InMemoryInventory::new()),
            reservations: Arc::new(InMemoryReservations::new()),
            knowledge: KnowledgeAccessor::new(Arc::new(knowledge)),
        };

        let request = NovaRequest::new(vec!["noisy".into(), "quiet".into()]);
        let weigher = AntiNoisyNeighbourWeigher::new("anti-noisy-neighbour".into());
        let outcome = weigher.run(&ctx, &request).await.expect("ok");
        let StepOutcome::Ran(result) = outcome else {
            panic!("expected Ran")
        };
        assert_eq!(result.activations["quiet"], 0.0);
        assert!(result.activations["noisy"] < 0.0);
    }
}
