// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Wire shapes for the decision API's request/response bodies, decoupled
//! from `cortex-engine`'s internal request/result types so the HTTP
//! contract stays stable independent of engine refactors.

use cortex_engine::request::{Destination, Flavor, GroupPolicy, InstanceGroup};
use cortex_engine::{CinderRequest, ManilaRequest, NovaRequest, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_num_instances() -> u32 {
    1
}

/// `POST /scheduler/nova/<pipeline>` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaRequestBody {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub spec: NovaSpec,
    #[serde(default)]
    pub image: HashMap<String, String>,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub domain_id: String,
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub instance_group: Option<InstanceGroupBody>,
    #[serde(default)]
    pub requested_destination: Option<DestinationBody>,
    #[serde(default)]
    pub scheduler_hints: HashMap<String, String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default = "default_num_instances")]
    pub num_instances: u32,
    #[serde(default)]
    pub ignore_hosts: Vec<String>,
    #[serde(default)]
    pub force_hosts: Vec<String>,
    #[serde(default)]
    pub rebuild: bool,
    #[serde(default)]
    pub live: bool,
}

/// Flavor fields nested in a Nova request's `spec`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaSpec {
    #[serde(default)]
    pub flavor_name: String,
    #[serde(default)]
    pub vcpus: i64,
    #[serde(default)]
    pub memory_mb: i64,
    #[serde(default)]
    pub disk_gb: i64,
    #[serde(default)]
    pub extra_specs: HashMap<String, String>,
}

/// Instance-group payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupBody {
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub rules: HashMap<String, String>,
}

/// Requested-destination payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationBody {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub aggregates: Vec<String>,
}

impl NovaRequestBody {
    /// Converts the wire body into an engine-native [`NovaRequest`].
    ///
    /// # Errors
    /// Returns a message when `instanceGroup.policy` names anything other
    /// than `"affinity"`/`"anti-affinity"`.
    pub fn into_request(self) -> Result<NovaRequest, String> {
        let instance_group = self
            .instance_group
            .map(|body| {
                let policy = match body.policy.as_deref() {
                    None => None,
                    Some("affinity") => Some(GroupPolicy::Affinity),
                    Some("anti-affinity") => Some(GroupPolicy::AntiAffinity),
                    Some(other) => return Err(format!("unknown instance group policy '{other}'")),
                };
                Ok(InstanceGroup {
                    policy,
                    hosts: body.hosts,
                    members: body.members,
                    rules: body.rules,
                })
            })
            .transpose()?;

        Ok(NovaRequest {
            subjects: self.hosts,
            weights: self.weights,
            flavor: Flavor {
                name: self.spec.flavor_name,
                vcpus: self.spec.vcpus,
                memory_mb: self.spec.memory_mb,
                disk_gb: self.spec.disk_gb,
                extra_specs: self.spec.extra_specs,
            },
            image_properties: self.image,
            project_id: self.project_id,
            domain_id: self.domain_id,
            instance_id: self.instance_id,
            instance_group,
            requested_destination: self.requested_destination.map(|d| Destination {
                host: d.host,
                aggregates: d.aggregates,
            }),
            scheduler_hints: self.scheduler_hints,
            availability_zone: self.availability_zone,
            num_instances: self.num_instances,
            ignore_hosts: self.ignore_hosts,
            force_hosts: self.force_hosts,
            rebuild: self.rebuild,
            live: self.live,
        })
    }
}

/// `POST /scheduler/cinder/<pipeline>` request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CinderRequestBody {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub volume_id: String,
}

impl From<CinderRequestBody> for CinderRequest {
    fn from(body: CinderRequestBody) -> Self {
        CinderRequest {
            subjects: body.hosts,
            weights: body.weights,
            project_id: body.project_id,
            availability_zone: body.availability_zone,
            volume_id: body.volume_id,
        }
    }
}

/// `POST /scheduler/manila/<pipeline>` request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManilaRequestBody {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub share_id: String,
}

impl From<ManilaRequestBody> for ManilaRequest {
    fn from(body: ManilaRequestBody) -> Self {
        ManilaRequest {
            subjects: body.hosts,
            weights: body.weights,
            project_id: body.project_id,
            availability_zone: body.availability_zone,
            share_id: body.share_id,
        }
    }
}

/// `POST /scheduler/<family>/<pipeline>` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingResponse {
    pub hosts: Vec<String>,
    pub weights: HashMap<String, f64>,
    pub steps: Vec<StepAuditBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A single step's audit trail in the response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAuditBody {
    pub name: String,
    pub activations: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<HashMap<String, f64>>,
}

impl From<PipelineResult> for SchedulingResponse {
    fn from(result: PipelineResult) -> Self {
        SchedulingResponse {
            hosts: result.ordered_subjects,
            weights: result.aggregated_weights,
            steps: result
                .steps
                .into_iter()
                .map(|audit| StepAuditBody {
                    name: audit.name,
                    activations: audit.activations,
                    statistics: audit.statistics.map(|s| s.values),
                })
                .collect(),
            target: result.target,
        }
    }
}
