// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Decision HTTP API: one `POST /scheduler/<family>/<pipeline>` route per
//! scheduler family, plus `/up` and `/metrics`.

pub mod dto;
pub mod error;
pub mod routes;

pub use error::Error;
pub use routes::{router, AppState, Family};
