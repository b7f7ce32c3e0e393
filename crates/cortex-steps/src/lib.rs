// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Concrete filter and weigher step implementations, plus the
//! implementation-key registry the pipeline-lifecycle controller uses to
//! turn a `Step` CRD into a runnable [`cortex_engine::step::Step`].

pub mod filters;
mod knowledge_rows;
pub mod registry;
pub mod weighers;

pub use registry::build;
