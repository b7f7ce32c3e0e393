// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! The pipeline engine: runs an ordered set of heterogeneous steps,
//! combines their per-host activation outputs with externally supplied
//! input weights, sorts deterministically, and records a per-step audit
//! trail.
//!
//! Steps run concurrently (fan-out, join on all); the combinator phase
//! that applies their activations is single-threaded and strictly
//! sequential in configuration order. Because each step only reads
//! external state plus the request and contributes an activation map,
//! parallel execution does not affect determinism.

use crate::activation::{self, ActivationMap};
use crate::error::Error;
use crate::request::{InputWeights, SchedulingRequest, Subject};
use crate::step::{Step, StepContext, StepOutcome, StepResult, StepStatistics};
use cortex_telemetry::PipelineMetrics;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, info_span, warn};

/// A named, audited contribution from a single step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepAudit {
    /// The step's configured name.
    pub name: String,
    /// The step's own activation map (before combination with other
    /// steps).
    pub activations: ActivationMap,
    /// Optional per-subject statistics.
    pub statistics: Option<StepStatistics>,
}

/// The full, audited result of running a pipeline once.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    /// Subjects surviving the pipeline, strictly descending by aggregated
    /// weight, ties broken by lexicographic subject order.
    pub ordered_subjects: Vec<Subject>,
    /// The first surviving subject, or `None` when the list is empty.
    pub target: Option<Subject>,
    /// The request's raw, unbounded input weights.
    pub raw_weights: InputWeights,
    /// Input weights after `tanh` normalisation.
    pub normalized_weights: ActivationMap,
    /// Final aggregated weights after every step's contribution.
    pub aggregated_weights: ActivationMap,
    /// Per-step audit entries, in configuration order, for steps that
    /// produced activations (skipped/errored steps are omitted).
    pub steps: Vec<StepAudit>,
}

/// A single configured pipeline step: its audit name, whether it is
/// mandatory (informational only at run time — readiness is the
/// controller's concern), and the step implementation itself.
#[derive(Clone)]
pub struct ConfiguredStep {
    /// Name used in the audit trail, metrics labels and logs.
    pub name: String,
    /// The step implementation.
    pub step: Arc<dyn Step>,
}

/// An ordered, named, runnable chain of steps.
#[derive(Clone)]
pub struct PipelineEngine {
    /// The pipeline's own name, used as a metrics label and in logs.
    name: String,
    /// Steps in configuration order. Activation application order equals
    /// this order; step execution order is undefined.
    steps: Vec<ConfiguredStep>,
    /// Shared metrics registry.
    metrics: Arc<PipelineMetrics>,
}

impl PipelineEngine {
    /// Builds a pipeline engine from an ordered step list.
    #[must_use]
    pub fn new(name: String, steps: Vec<ConfiguredStep>, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            name,
            steps,
            metrics,
        }
    }

    /// The pipeline's configured name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the pipeline once against a single request.
    ///
    /// Returns `Err` only when a step raises a caller-fatal error
    /// ([`Error::is_caller_fatal`]); every step still runs to completion
    /// first, so siblings are never aborted.
    pub async fn run(
        &self,
        ctx: &StepContext,
        request: &dyn SchedulingRequest,
    ) -> Result<PipelineResult, Error> {
        let fields = request.trace_fields();
        let trace_summary = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let span = info_span!("pipeline_run", pipeline = %self.name, request = %trace_summary);
        self.run_inner(ctx, request).instrument(span).await
    }

    async fn run_inner(
        &self,
        ctx: &StepContext,
        request: &dyn SchedulingRequest,
    ) -> Result<PipelineResult, Error> {
        let pipeline_started = Instant::now();
        let subjects = request.subjects().to_vec();
        let raw_weights = request.weights().clone();

        let normalized_weights: ActivationMap = subjects
            .iter()
            .map(|s| {
                let raw = raw_weights.get(s).copied().unwrap_or(activation::IDENTITY);
                (s.clone(), raw.tanh())
            })
            .collect();

        self.metrics
            .subjects_in
            .with_label_values(&[&self.name])
            .inc_by(subjects.len() as u64);

        // Fan out: run every step concurrently, joined before the
        // sequential combinator phase below.
        let run_futures = self.steps.iter().map(|configured| {
            let ctx = ctx.clone();
            async move {
                let started = Instant::now();
                let outcome = configured.step.run(&ctx, request).await;
                (configured.clone(), outcome, started.elapsed())
            }
        });
        let results = futures::future::join_all(run_futures).await;

        let mut aggregated = normalized_weights.clone();
        let mut audits = Vec::with_capacity(results.len());
        let mut caller_fatal: Option<Error> = None;

        for (configured, outcome, elapsed) in results {
            self.metrics
                .step_run_duration
                .with_label_values(&[&self.name, &configured.name])
                .observe(elapsed.as_secs_f64());

            match outcome {
                Ok(StepOutcome::Ran(StepResult {
                    activations,
                    statistics,
                })) => {
                    let removed = subjects.len().saturating_sub(activations.len());
                    if removed > 0 {
                        self.metrics
                            .step_removed_subjects
                            .with_label_values(&[&self.name, &configured.name])
                            .inc_by(removed as u64);
                    }
                    aggregated = activation::apply(&aggregated, &activations);
                    audits.push(StepAudit {
                        name: configured.name.clone(),
                        activations,
                        statistics,
                    });
                }
                Ok(StepOutcome::Skipped { reason }) => {
                    tracing::debug!(step = %configured.name, reason, "step skipped");
                }
                Err(err) => {
                    let fatal = err.is_caller_fatal();
                    warn!(step = %configured.name, error = %err, fatal, "step error");
                    if fatal && caller_fatal.is_none() {
                        caller_fatal = Some(err);
                    }
                }
            }
        }

        // Every step has already run to completion above; returning here
        // does not abort any sibling.
        if let Some(err) = caller_fatal {
            return Err(err);
        }

        let ordered_subjects = sort_descending(&aggregated);
        let target = ordered_subjects.first().cloned();

        self.metrics
            .subjects_out
            .with_label_values(&[&self.name])
            .inc_by(ordered_subjects.len() as u64);
        self.metrics
            .requests_total
            .with_label_values(&[&self.name])
            .inc();
        self.metrics
            .pipeline_run_duration
            .with_label_values(&[&self.name])
            .observe(pipeline_started.elapsed().as_secs_f64());

        Ok(PipelineResult {
            ordered_subjects,
            target,
            raw_weights,
            normalized_weights,
            aggregated_weights: aggregated,
            steps: audits,
        })
    }
}

/// Sorts subjects by descending weight with a stable lexicographic
/// tie-break, matching the pipeline result's ordering contract.
fn sort_descending(aggregated: &ActivationMap) -> Vec<Subject> {
    let mut subjects: Vec<&Subject> = aggregated.keys().collect();
    subjects.sort_by(|a, b| {
        let wa = aggregated[*a];
        let wb = aggregated[*b];
        match wb.partial_cmp(&wa) {
            Some(Ordering::Equal) | None => a.cmp(b),
            Some(ordering) => ordering,
        }
    });
    subjects.into_iter().cloned().collect()
}

/// Resolves per-pipeline request timeouts are deliberately not enforced by
/// the engine itself (spec §5): a slow step slows the request. This helper
/// exists only so callers at the HTTP layer can apply their own
/// request-scoped deadline without the engine needing to know about it.
#[must_use]
pub fn no_engine_timeout() -> Option<Duration> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error as EngineError;
    use crate::inventory::{InMemoryInventory, InMemoryReservations};
    use crate::knowledge::{InMemoryKnowledge, KnowledgeAccessor};
    use crate::request::NovaRequest;
    use async_trait::async_trait;

    struct KeepAll;
    #[async_trait]
    impl Step for KeepAll {
        fn name(&self) -> &str {
            "keep-all"
        }
        fn is_filter(&self) -> bool {
            true
        }
        async fn run(
            &self,
            _ctx: &StepContext,
            request: &dyn SchedulingRequest,
        ) -> Result<StepOutcome, EngineError> {
            Ok(StepOutcome::Ran(StepResult {
                activations: activation::prepare_result(request.subjects()),
                statistics: None,
            }))
        }
    }

    struct DropOne(String);
    #[async_trait]
    impl Step for DropOne {
        fn name(&self) -> &str {
            "drop-one"
        }
        fn is_filter(&self) -> bool {
            true
        }
        async fn run(
            &self,
            _ctx: &StepContext,
            request: &dyn SchedulingRequest,
        ) -> Result<StepOutcome, EngineError> {
            let mut map = activation::prepare_result(request.subjects());
            let _ = map.remove(&self.0);
            Ok(StepOutcome::Ran(StepResult {
                activations: map,
                statistics: None,
            }))
        }
    }

    struct AlwaysErrors;
    #[async_trait]
    impl Step for AlwaysErrors {
        fn name(&self) -> &str {
            "always-errors"
        }
        fn is_filter(&self) -> bool {
            true
        }
        async fn run(
            &self,
            _ctx: &StepContext,
            _request: &dyn SchedulingRequest,
        ) -> Result<StepOutcome, EngineError> {
            Err(EngineError::Transient {
                step: "always-errors".to_string(),
                details: "boom".to_string(),
            })
        }
    }

    fn test_ctx() -> StepContext {
        StepContext {
            inventory: Arc::new(InMemoryInventory::new()),
            reservations: Arc::new(InMemoryReservations::new()),
            knowledge: KnowledgeAccessor::new(Arc::new(InMemoryKnowledge::new())),
        }
    }

    #[tokio::test]
    async fn pipeline_applies_steps_in_order_and_sorts_descending() {
        let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
        let engine = PipelineEngine::new(
            "test".to_string(),
            vec![ConfiguredStep {
                name: "keep-all".to_string(),
                step: Arc::new(KeepAll),
            }],
            metrics,
        );
        let mut request = NovaRequest::new(vec!["h1".to_string(), "h2".to_string()]);
        request.weights.insert("h1".to_string(), 5.0);
        request.weights.insert("h2".to_string(), -5.0);

        let result = engine.run(&test_ctx(), &request).await.expect("ok");
        assert_eq!(result.ordered_subjects, vec!["h1".to_string(), "h2".to_string()]);
        assert_eq!(result.target, Some("h1".to_string()));
    }

    #[tokio::test]
    async fn pipeline_ties_break_lexicographically() {
        let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
        let engine = PipelineEngine::new(
            "test".to_string(),
            vec![ConfiguredStep {
                name: "keep-all".to_string(),
                step: Arc::new(KeepAll),
            }],
            metrics,
        );
        let request = NovaRequest::new(vec!["zeta".to_string(), "alpha".to_string()]);
        let result = engine.run(&test_ctx(), &request).await.expect("ok");
        assert_eq!(result.ordered_subjects, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[tokio::test]
    async fn filter_step_prunes_subjects() {
        let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
        let engine = PipelineEngine::new(
            "test".to_string(),
            vec![ConfiguredStep {
                name: "drop-h2".to_string(),
                step: Arc::new(DropOne("h2".to_string())),
            }],
            metrics,
        );
        let request = NovaRequest::new(vec!["h1".to_string(), "h2".to_string()]);
        let result = engine.run(&test_ctx(), &request).await.expect("ok");
        assert_eq!(result.ordered_subjects, vec!["h1".to_string()]);
    }

    #[tokio::test]
    async fn errored_step_is_treated_as_no_opinion() {
        let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
        let engine = PipelineEngine::new(
            "test".to_string(),
            vec![ConfiguredStep {
                name: "always-errors".to_string(),
                step: Arc::new(AlwaysErrors),
            }],
            metrics,
        );
        let request = NovaRequest::new(vec!["h1".to_string(), "h2".to_string()]);
        let result = engine.run(&test_ctx(), &request).await.expect("ok");
        // No step's activations were applied, so the normalised input
        // weights (both subjects, identity 0.0) pass through unchanged.
        assert_eq!(result.ordered_subjects.len(), 2);
        assert!(result.steps.is_empty());
    }

    #[tokio::test]
    async fn determinism_same_input_same_output() {
        let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
        let engine = PipelineEngine::new(
            "test".to_string(),
            vec![ConfiguredStep {
                name: "keep-all".to_string(),
                step: Arc::new(KeepAll),
            }],
            metrics,
        );
        let request = NovaRequest::new(vec!["h1".to_string(), "h2".to_string(), "h3".to_string()]);
        let r1 = engine.run(&test_ctx(), &request).await.expect("ok");
        let r2 = engine.run(&test_ctx(), &request).await.expect("ok");
        assert_eq!(r1.ordered_subjects, r2.ordered_subjects);
        assert_eq!(r1.aggregated_weights, r2.aggregated_weights);
    }

    struct AlwaysFatal;
    #[async_trait]
    impl Step for AlwaysFatal {
        fn name(&self) -> &str {
            "always-fatal"
        }
        fn is_filter(&self) -> bool {
            true
        }
        async fn run(
            &self,
            _ctx: &StepContext,
            _request: &dyn SchedulingRequest,
        ) -> Result<StepOutcome, EngineError> {
            Err(EngineError::Fatal {
                step: "always-fatal".to_string(),
                details: "unknown host".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn caller_fatal_step_error_propagates_out_of_run() {
        let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
        let engine = PipelineEngine::new(
            "test".to_string(),
            vec![
                ConfiguredStep {
                    name: "keep-all".to_string(),
                    step: Arc::new(KeepAll),
                },
                ConfiguredStep {
                    name: "always-fatal".to_string(),
                    step: Arc::new(AlwaysFatal),
                },
            ],
            metrics,
        );
        let request = NovaRequest::new(vec!["h1".to_string(), "h2".to_string()]);
        let err = engine
            .run(&test_ctx(), &request)
            .await
            .expect_err("should be fatal");
        assert!(err.is_caller_fatal());
    }
}
