// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the pipeline engine, following the taxonomy distinguished by
//! the decision pipeline: configuration errors, transient external
//! failures, malformed requests, and fatal errors. "Skipped" is
//! deliberately *not* an error — see [`crate::step::StepOutcome`].

use thiserror::Error;

/// Errors surfaced by steps and the pipeline engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid step options, an unknown step implementation, or another
    /// misconfiguration detected at step-init time. Does not retry; the
    /// step is marked unready by the controller.
    #[error("configuration error in step '{step}': {details}")]
    Configuration {
        /// Name of the step that failed to configure.
        step: String,
        /// Human-readable details.
        details: String,
    },

    /// A call to external state (inventory list, knowledge read,
    /// reservation list, database query) failed. Logged and the step's
    /// activations are discarded; the pipeline still returns a
    /// best-effort result.
    #[error("transient failure in step '{step}': {details}")]
    Transient {
        /// Name of the step that failed.
        step: String,
        /// Human-readable details.
        details: String,
    },

    /// The request was missing a required field or carried an invalid
    /// value for a field the step requires.
    #[error("malformed request for step '{step}': {details}")]
    Malformed {
        /// Name of the step that rejected the request.
        step: String,
        /// Human-readable details.
        details: String,
    },

    /// An unrecoverable condition where continuing would silently produce
    /// a wrong answer — e.g. live-migration naming an unknown source host.
    /// The API surfaces this as a 500 since the caller explicitly named
    /// something that doesn't exist.
    #[error("fatal error in step '{step}': {details}")]
    Fatal {
        /// Name of the step that failed fatally.
        step: String,
        /// Human-readable details.
        details: String,
    },

    /// No pipeline instance is live under the requested name.
    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),
}

impl Error {
    /// Whether this error should be surfaced to the HTTP caller as a fatal
    /// failure rather than silently treated as "no opinion" by the engine.
    /// Only [`Error::Fatal`] and [`Error::Malformed`] propagate this way;
    /// configuration and transient errors are swallowed by the pipeline
    /// engine per spec.
    #[must_use]
    pub fn is_caller_fatal(&self) -> bool {
        matches!(self, Error::Fatal { .. } | Error::Malformed { .. })
    }
}
