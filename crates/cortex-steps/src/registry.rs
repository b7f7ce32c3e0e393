// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Maps a `Step` CRD's `impl` key to a concrete [`Step`] instance. This is
//! the factory half of the heterogeneous step list: the controller decodes
//! a step's option blob and hands it here to get back a trait object it
//! can slot into a pipeline.

use crate::filters::{
    AcceleratorsFilter, AllowedProjectsFilter, CapacityFilter, ComputeCapabilitiesFilter,
    CorrectAzFilter, HostInstructionsFilter, InstanceGroupFilter, LiveMigratableFilter,
    PackedVirtqueueFilter, ProjectAggregatesFilter, RequestedDestinationFilter,
    RequestedTraitsFilter, StatusConditionsFilter,
};
use crate::weighers::{AntiNoisyNeighbourWeigher, BalancedUtilizationWeigher, BinpackingWeigher};
use cortex_engine::error::Error;
use cortex_engine::step::Step;
use serde::Deserialize;
use std::sync::Arc;

/// Options accepted by the `status-conditions` implementation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusConditionsOpts {
    #[serde(default = "default_true")]
    treat_missing_as_pass: bool,
}

fn default_true() -> bool {
    true
}

/// Builds a [`Step`] trait object for the named implementation key, as
/// found in a `Step` CRD's `spec.impl`.
///
/// # Errors
/// Returns [`Error::Configuration`] for an unknown implementation key or
/// an options blob that fails to decode.
pub fn build(implementation: &str, name: String, opts: &serde_json::Value) -> Result<Arc<dyn Step>, Error> {
    let step: Arc<dyn Step> = match implementation {
        "host-instructions" => Arc::new(HostInstructionsFilter::new(name)),
        "correct-az" => Arc::new(CorrectAzFilter::new(name)),
        "allowed-projects" => Arc::new(AllowedProjectsFilter::new(name)),
        "project-aggregates" => Arc::new(ProjectAggregatesFilter::new(name)),
        "requested-destination" => Arc::new(RequestedDestinationFilter::new(name)),
        "compute-capabilities" => Arc::new(ComputeCapabilitiesFilter::new(name)),
        "has-requested-traits" => Arc::new(RequestedTraitsFilter::new(name)),
        "has-accelerators" => Arc::new(AcceleratorsFilter::new(name)),
        "packed-virtqueue" => Arc::new(PackedVirtqueueFilter::new(name)),
        "status-conditions" => {
            let decoded: StatusConditionsOpts = decode_opts(&name, opts)?;
            Arc::new(StatusConditionsFilter::with_policy(
                name,
                decoded.treat_missing_as_pass,
            ))
        }
        "instance-group" => Arc::new(InstanceGroupFilter::new(name)),
        "live-migratable" => Arc::new(LiveMigratableFilter::new(name)),
        "capacity-reservation" => Arc::new(CapacityFilter::new(name)),
        "balanced-utilization" => Arc::new(BalancedUtilizationWeigher::new(name)),
        "anti-noisy-neighbour" => Arc::new(AntiNoisyNeighbourWeigher::new(name)),
        "binpacking" => Arc::new(BinpackingWeigher::new(name)),
        other => {
            return Err(Error::Configuration {
                step: name,
                details: format!("unknown step implementation '{other}'"),
            });
        }
    };
    Ok(step)
}

fn decode_opts<T: serde::de::DeserializeOwned + Default>(
    name: &str,
    opts: &serde_json::Value,
) -> Result<T, Error> {
    if opts.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(opts.clone()).map_err(|err| Error::Configuration {
        step: name.to_string(),
        details: format!("invalid options: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_known_implementations() {
        let step = build("correct-az", "az".to_string(), &serde_json::Value::Null).expect("should build");
        assert_eq!(step.name(), "az");
        assert!(step.is_filter());
    }

    #[test]
    fn rejects_unknown_implementation() {
        let err = build("does-not-exist", "x".to_string(), &serde_json::Value::Null)
            .expect_err("should fail");
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn decodes_status_conditions_options() {
        let opts = serde_json::json!({"treatMissingAsPass": false});
        let step = build("status-conditions", "sc".to_string(), &opts).expect("should build");
        assert_eq!(step.name(), "sc");
    }
}
