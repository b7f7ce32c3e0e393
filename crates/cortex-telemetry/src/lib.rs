// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics registry for the Cortex decision engine.
//!
//! This crate owns the process-wide [`prometheus::Registry`] and the metric
//! families described in the decision API spec: per-pipeline run duration,
//! per-step run duration, per-step removed-subject counts, subject
//! in/out counts, request totals, and API request duration.

use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder, core::Collector,
};
use thiserror::Error;

/// Errors raised while registering or rendering metrics.
#[derive(Error, Debug)]
pub enum Error {
    /// A metric family could not be registered (e.g. duplicate name).
    #[error("failed to register metric '{name}': {details}")]
    Registration {
        /// Name of the metric that failed to register.
        name: &'static str,
        /// Human-readable cause.
        details: String,
    },

    /// The text encoder failed to render the registry.
    #[error("failed to encode metrics: {0}")]
    Encode(String),
}

/// Handle to the process-wide metrics registry plus pre-registered metric
/// families used by the pipeline engine and the HTTP API.
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    /// `cortex_scheduler_pipeline_run_duration_seconds{pipeline}`
    pub pipeline_run_duration: HistogramVec,
    /// `cortex_scheduler_pipeline_step_run_duration_seconds{pipeline,step}`
    pub step_run_duration: HistogramVec,
    /// `cortex_scheduler_pipeline_step_removed_subjects{pipeline,step}`
    pub step_removed_subjects: IntCounterVec,
    /// `cortex_scheduler_pipeline_subject_number_in{pipeline}`
    pub subjects_in: IntCounterVec,
    /// `cortex_scheduler_pipeline_subject_number_out{pipeline}`
    pub subjects_out: IntCounterVec,
    /// `cortex_scheduler_pipeline_requests_total{pipeline}`
    pub requests_total: IntCounterVec,
    /// `cortex_scheduler_api_request_duration_seconds{method,path,status,error}`
    pub api_request_duration: HistogramVec,
}

impl PipelineMetrics {
    /// Builds a fresh registry and registers all known metric families.
    pub fn new() -> Result<Self, Error> {
        let registry = Registry::new();

        let pipeline_run_duration = register_histogram(
            &registry,
            "cortex_scheduler_pipeline_run_duration_seconds",
            "Time to run a full pipeline for a single request",
            &["pipeline"],
        )?;
        let step_run_duration = register_histogram(
            &registry,
            "cortex_scheduler_pipeline_step_run_duration_seconds",
            "Time spent in a single pipeline step",
            &["pipeline", "step"],
        )?;
        let step_removed_subjects = register_counter(
            &registry,
            "cortex_scheduler_pipeline_step_removed_subjects",
            "Number of subjects removed by a filter step",
            &["pipeline", "step"],
        )?;
        let subjects_in = register_counter(
            &registry,
            "cortex_scheduler_pipeline_subject_number_in",
            "Number of candidate subjects entering a pipeline run",
            &["pipeline"],
        )?;
        let subjects_out = register_counter(
            &registry,
            "cortex_scheduler_pipeline_subject_number_out",
            "Number of subjects surviving a pipeline run",
            &["pipeline"],
        )?;
        let requests_total = register_counter(
            &registry,
            "cortex_scheduler_pipeline_requests_total",
            "Total number of requests handled by a pipeline",
            &["pipeline"],
        )?;
        let api_request_duration = register_histogram(
            &registry,
            "cortex_scheduler_api_request_duration_seconds",
            "Time to handle a decision API HTTP request",
            &["method", "path", "status", "error"],
        )?;

        Ok(Self {
            registry,
            pipeline_run_duration,
            step_run_duration,
            step_removed_subjects,
            subjects_in,
            subjects_out,
            requests_total,
            api_request_duration,
        })
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, Error> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&metric_families)
            .map_err(|e| Error::Encode(e.to_string()))
    }

    /// The underlying registry, for advanced use (e.g. registering
    /// additional process-level collectors).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for PipelineMetrics {
    /// Builds an empty-but-functional metrics handle.
    ///
    /// # Panics
    /// Panics if metric registration fails, which can only happen if this
    /// module registers a duplicate metric name — a programming error, not
    /// a runtime condition.
    fn default() -> Self {
        #[allow(clippy::expect_used)]
        Self::new().expect("built-in metric families must register cleanly")
    }
}

fn register_histogram(
    registry: &Registry,
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> Result<HistogramVec, Error> {
    let hv = HistogramVec::new(HistogramOpts::new(name, help), labels).map_err(|e| {
        Error::Registration {
            name,
            details: e.to_string(),
        }
    })?;
    register(registry, name, hv.clone())?;
    Ok(hv)
}

fn register_counter(
    registry: &Registry,
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec, Error> {
    let cv =
        IntCounterVec::new(Opts::new(name, help), labels).map_err(|e| Error::Registration {
            name,
            details: e.to_string(),
        })?;
    register(registry, name, cv.clone())?;
    Ok(cv)
}

fn register(registry: &Registry, name: &'static str, collector: impl Collector + 'static) -> Result<(), Error> {
    registry
        .register(Box::new(collector))
        .map_err(|e| Error::Registration {
            name,
            details: e.to_string(),
        })
}
