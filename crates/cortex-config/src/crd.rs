// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Custom resource schemas consumed by the Cortex pipeline-lifecycle
//! controller: `Pipeline`, `Step`, `Knowledge`, `Hypervisor`, `Reservation`.
//!
//! Pipeline and Step CRDs are owned by operators — Cortex only writes their
//! `status` subresource, never their `spec`. Hypervisor, Knowledge and
//! Reservation CRDs are read-only from Cortex's perspective.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A namespaced reference to another custom resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub struct ObjectRef {
    /// Name of the referenced object.
    pub name: String,
    /// Namespace of the referenced object, defaults to the referencing
    /// object's own namespace when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A generic status condition, mirroring the Kubernetes convention.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// The condition type, e.g. "Ready".
    #[serde(rename = "type")]
    pub type_: String,
    /// The condition status.
    pub status: ConditionStatus,
    /// Machine-readable reason for the condition's last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable message describing the condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Tri-state status for a [`Condition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The condition could not be evaluated.
    Unknown,
}

// ---------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------

/// The kind of pipeline, determining which class of steps it may reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    /// Only filter steps.
    Filter,
    /// Only weigher steps.
    Weigher,
    /// Both filter and weigher steps.
    FilterWeigher,
}

/// A step reference within a pipeline, with a mandatory flag.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct PipelineStepRef {
    /// Reference to the `Step` custom resource.
    #[serde(rename = "ref")]
    pub step_ref: ObjectRef,
    /// Whether this step must be ready for the pipeline itself to be ready.
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
}

fn default_mandatory() -> bool {
    true
}

/// `Pipeline` custom resource spec: an ordered, named sequence of steps.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cortex.cobaltcore.dev",
    version = "v1",
    kind = "Pipeline",
    namespaced,
    status = "PipelineStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    /// Operator tag; only pipelines matching the running process's operator
    /// tag are reconciled by that process.
    pub operator: String,
    /// The kind of pipeline.
    #[serde(rename = "type")]
    pub kind: PipelineKind,
    /// Ordered list of step references.
    pub steps: Vec<PipelineStepRef>,
}

/// `Pipeline` status, reporting step readiness.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    /// Whether every mandatory step is ready.
    pub ready: bool,
    /// Count of currently ready steps.
    pub ready_steps: u32,
    /// Total count of referenced steps.
    pub total_steps: u32,
    /// Human-readable `ready/total` fraction, e.g. `"3/4"`.
    pub steps_ready_frac: String,
    /// Status conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ---------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------

/// The kind of a step: a filter prunes subjects, a weigher scores them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// A filter step.
    Filter,
    /// A weigher step.
    Weigher,
}

/// Reference to a secret holding database connection details for a step.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct DatabaseSecretRef {
    /// Name of the secret.
    pub name: String,
    /// Namespace of the secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// `Step` custom resource spec.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cortex.cobaltcore.dev",
    version = "v1",
    kind = "Step",
    namespaced,
    status = "StepStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    /// Operator tag; only steps matching the running process's operator tag
    /// are reconciled by that process.
    pub operator: String,
    /// Whether this step is a filter or a weigher.
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// The implementation key looked up in the step registry, e.g.
    /// `"capacity-reservation"`.
    #[serde(rename = "impl")]
    pub implementation: String,
    /// Opaque, implementation-specific option blob.
    #[serde(default)]
    pub opts: serde_json::Value,
    /// Knowledge snapshots this step depends on.
    #[serde(default)]
    pub knowledges: Vec<ObjectRef>,
    /// Optional reference to a database connection secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_secret_ref: Option<DatabaseSecretRef>,
}

/// `Step` status, reporting knowledge readiness.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    /// Whether every referenced knowledge is ready.
    pub ready: bool,
    /// Count of currently ready knowledges.
    pub ready_knowledges: u32,
    /// Total count of referenced knowledges.
    pub total_knowledges: u32,
    /// Status conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ---------------------------------------------------------------------
// Knowledge
// ---------------------------------------------------------------------

/// `Knowledge` custom resource spec: a named, versioned feature snapshot
/// published by the (out-of-scope) extraction engine.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cortex.cobaltcore.dev",
    version = "v1",
    kind = "Knowledge",
    namespaced,
    status = "KnowledgeStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSpec {
    /// Well-known name identifying this snapshot's shape, e.g. `"host-az"`.
    pub name: String,
}

/// `Knowledge` status carrying the published feature rows.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStatus {
    /// Length of `raw` in bytes, as published by the extractor. A snapshot
    /// is only considered readable when this is non-zero and no error
    /// condition is set.
    #[serde(default)]
    pub raw_length: u64,
    /// The feature rows, as an opaque JSON array decoded by a typed reader
    /// registered for this knowledge's `name`.
    #[serde(default)]
    pub raw: serde_json::Value,
    /// Status conditions, notably an `Error` condition set by the extractor.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl KnowledgeStatus {
    /// Whether this snapshot is valid to read, per the spec invariant: raw
    /// length is non-zero and no `Error` condition is set.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.raw_length > 0 && !self.has_error_condition()
    }

    /// Whether an `Error` condition with status `True` is present.
    #[must_use]
    pub fn has_error_condition(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.type_ == "Error" && c.status == ConditionStatus::True)
    }
}

// ---------------------------------------------------------------------
// Hypervisor
// ---------------------------------------------------------------------

/// Simple integer resource quantities. Memory and disk are expressed in
/// bytes; cpu is expressed in whole vCPUs. See `DESIGN.md` for why this
/// repository does not model Kubernetes `Quantity` strings here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuantities {
    /// Number of virtual CPUs.
    pub cpu: i64,
    /// Memory, in bytes.
    pub memory_bytes: i64,
    /// Disk, in bytes. Not considered by the capacity filter (spec design
    /// decision: disk is handled by a downstream component).
    #[serde(default)]
    pub disk_bytes: i64,
}

/// `Hypervisor` custom resource spec: operator-managed pinning metadata.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cortex.cobaltcore.dev",
    version = "v1",
    kind = "Hypervisor",
    namespaced,
    status = "HypervisorStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct HypervisorSpec {
    /// Project identifiers allowed to schedule onto this host. Empty means
    /// unrestricted.
    #[serde(default)]
    pub allowed_projects: Vec<String>,
    /// Aggregate metadata pinning this host belongs to, keyed by aggregate
    /// name, e.g. `{"filter_tenant_id": "project-a"}`.
    #[serde(default)]
    pub aggregates: Vec<AggregateMembership>,
    /// Custom (operator-declared) traits, in addition to observed traits in
    /// status.
    #[serde(default)]
    pub custom_traits: Vec<String>,
}

/// A single aggregate membership with its metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMembership {
    /// Name of the aggregate.
    pub name: String,
    /// Metadata key/value pairs on the aggregate.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// CPU/device capability facts reported by libvirt-style domain
/// capabilities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainCapabilities {
    /// Supported CPU modes, e.g. `"host-passthrough"`, `"custom"`.
    #[serde(default)]
    pub cpu_modes: Vec<String>,
    /// Supported CPU features, e.g. `"sev"`.
    #[serde(default)]
    pub cpu_features: Vec<String>,
    /// Supported emulated devices, e.g. `"video"`.
    #[serde(default)]
    pub emulated_devices: Vec<String>,
}

/// `Hypervisor` status: observed inventory facts.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HypervisorStatus {
    /// CPU architecture, e.g. `"x86_64"`.
    #[serde(default)]
    pub architecture: String,
    /// Hypervisor type tag, e.g. `"QEMU"`.
    #[serde(default)]
    pub hypervisor_type: String,
    /// Declared total capacity.
    #[serde(default)]
    pub capacity: ResourceQuantities,
    /// Currently allocated resources.
    #[serde(default)]
    pub allocation: ResourceQuantities,
    /// Instance ids currently resident on this host.
    #[serde(default)]
    pub instances: Vec<String>,
    /// Aggregate memberships as observed (union of spec and controller-
    /// observed aggregates).
    #[serde(default)]
    pub aggregates: Vec<AggregateMembership>,
    /// Observed capability traits, comma-joined in some upstream knowledge
    /// snapshots but represented here as a real list.
    #[serde(default)]
    pub traits: Vec<String>,
    /// Flattened `capabilities:<key>` facts, e.g. `{"cpu_arch": "x86_64"}`,
    /// consulted by the compute-capabilities filter.
    #[serde(default)]
    pub capabilities: BTreeMap<String, String>,
    /// Labels, notably the availability-zone label.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Status conditions, notably `Ready`, `Terminating`, `Tainted`.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Domain capabilities used by the live-migration compatibility filter.
    #[serde(default)]
    pub domain_capabilities: DomainCapabilities,
}

/// Well-known label key carrying the availability zone.
pub const AZ_LABEL: &str = "cortex.cobaltcore.dev/availability-zone";

// ---------------------------------------------------------------------
// Reservation
// ---------------------------------------------------------------------

/// Lifecycle phase of a [`Reservation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ReservationPhase {
    /// Reservation has been requested but not yet committed.
    Pending,
    /// Reservation is committed and consumes capacity.
    Active,
    /// Reservation failed to commit.
    Failed,
}

/// The Cortex/Nova-scoped descriptor naming what a reservation is for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CortexNovaScheduler {
    /// Project identifier this reservation is scoped to.
    pub project_id: String,
    /// Domain identifier this reservation is scoped to.
    #[serde(default)]
    pub domain_id: String,
    /// Flavor name this reservation is scoped to.
    pub flavor_name: String,
    /// Flavor extra-specs captured at reservation time.
    #[serde(default)]
    pub flavor_extra_specs: BTreeMap<String, String>,
}

/// Scheduler-scoped descriptor for a reservation. Only the `cortex_nova`
/// variant currently influences the capacity filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationScheduler {
    /// Present when this reservation is scoped to Cortex's Nova family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cortex_nova: Option<CortexNovaScheduler>,
}

/// Resource request carried by a reservation (no disk component).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    /// Number of virtual CPUs reserved.
    pub cpu: i64,
    /// Memory reserved, in bytes.
    pub memory_bytes: i64,
}

/// `Reservation` custom resource spec.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cortex.cobaltcore.dev",
    version = "v1",
    kind = "Reservation",
    namespaced,
    status = "ReservationStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSpec {
    /// Scheduler-scoped descriptor for this reservation.
    pub scheduler: ReservationScheduler,
    /// Requested resources.
    pub requests: ReservationRequest,
    /// Whether this reservation should never be slotted, even when a
    /// matching request from its own project/flavor arrives.
    #[serde(default)]
    pub lock_reserved: bool,
}

/// `Reservation` status.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationStatus {
    /// Current lifecycle phase.
    #[serde(default)]
    pub phase: Option<ReservationPhase>,
    /// Host this reservation is pinned to.
    #[serde(default)]
    pub host: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_validity_requires_length_and_no_error() {
        let mut status = KnowledgeStatus {
            raw_length: 0,
            ..Default::default()
        };
        assert!(!status.is_valid());

        status.raw_length = 10;
        assert!(status.is_valid());

        status.conditions.push(Condition {
            type_: "Error".to_string(),
            status: ConditionStatus::True,
            reason: None,
            message: None,
        });
        assert!(!status.is_valid());
    }

    #[test]
    fn pipeline_spec_roundtrips_through_json() {
        let spec = PipelineSpec {
            operator: "cortex".to_string(),
            kind: PipelineKind::FilterWeigher,
            steps: vec![PipelineStepRef {
                step_ref: ObjectRef {
                    name: "correct-az".to_string(),
                    namespace: None,
                },
                mandatory: true,
            }],
        };
        let json = serde_json::to_string(&spec).expect("serialize");
        let back: PipelineSpec = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.steps.len(), 1);
        assert_eq!(back.kind, PipelineKind::FilterWeigher);
    }
}
