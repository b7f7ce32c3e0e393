// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors raised by the pipeline-lifecycle controller.

use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by the reconciliation loops.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The Kubernetes API returned an error for a get/list/patch call.
    #[error("kube api error: {0}")]
    #[diagnostic(code(cortex::controller::kube))]
    Kube(#[from] kube::Error),

    /// A step's option blob failed to build a runnable step.
    #[error("step '{name}' failed to build: {details}")]
    #[diagnostic(code(cortex::controller::step_build))]
    StepBuild {
        /// Name of the step CRD.
        name: String,
        /// Cause, from the engine/steps crates.
        details: String,
    },

    /// Status patch was rejected (e.g. resource version conflict).
    #[error("status patch for '{name}' failed: {details}")]
    #[diagnostic(code(cortex::controller::status_patch))]
    StatusPatch {
        /// Name of the object being patched.
        name: String,
        /// Cause.
        details: String,
    },
}
