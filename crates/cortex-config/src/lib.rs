// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! CRD schemas and configuration loading for the Cortex decision engine.
//!
//! This crate is intentionally free of any pipeline-execution logic: it
//! only describes the shapes that flow in from Kubernetes (via `kube`) and
//! from the layered `conf.json`/`secrets.json` files, plus the recursive
//! merge rule that combines the two.

pub mod crd;
pub mod error;
pub mod merge;
pub mod settings;

pub use error::Error;
pub use settings::Settings;
