// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide settings, loaded from `/etc/config/conf.json` merged over
//! `/etc/secrets/secrets.json` (see [`crate::merge`]).

use crate::error::{Context, Error};
use crate::merge::merge;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file path, matching the spec's documented layout.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/config/conf.json";
/// Default secrets file path, matching the spec's documented layout.
pub const DEFAULT_SECRETS_PATH: &str = "/etc/secrets/secrets.json";

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_operator() -> String {
    "cortex".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Top-level settings for a Cortex scheduler process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Settings {
    /// Address the HTTP decision API binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Operator tag used to select which Pipeline/Step CRDs this process
    /// reconciles (`spec.operator`).
    #[serde(default = "default_operator")]
    pub operator: String,
    /// Kubernetes namespace the controller watches for CRDs.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            operator: default_operator(),
            namespace: default_namespace(),
        }
    }
}

impl Settings {
    /// Loads settings from a base config file and an overlay secrets file,
    /// merged with [`merge`]. Either file may be absent, in which case it
    /// contributes nothing to the merge.
    pub fn load(config_path: &Path, secrets_path: &Path) -> Result<Self, Error> {
        let base = read_json_or_empty(config_path)?;
        let overlay = read_json_or_empty(secrets_path)?;
        let merged = merge(base, overlay);
        serde_json::from_value(merged).map_err(|e| Error::DeserializationError {
            context: Context::file(format!(
                "{} merged with {}",
                config_path.display(),
                secrets_path.display()
            )),
            format: "JSON".to_string(),
            details: e.to_string(),
        })
    }
}

fn read_json_or_empty(path: &Path) -> Result<serde_json::Value, Error> {
    if !path.exists() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    let contents = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
        context: Context::file(path.display().to_string()),
        details: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| Error::DeserializationError {
        context: Context::file(path.display().to_string()),
        format: "JSON".to_string(),
        details: e.to_string(),
    })
}
