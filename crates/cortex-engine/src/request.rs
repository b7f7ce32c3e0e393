// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Scheduling request model.
//!
//! Different scheduler families (Nova, Cinder, Manila) share the pipeline
//! shape but differ in request payload. Rather than parameterise the engine
//! by a generic type, the engine is parameterised by the
//! [`SchedulingRequest`] trait object: every family implements the same set
//! of accessors, returning empty/`None` for fields that family does not
//! have. This keeps `PipelineEngine` and `Step` free of generic parameters
//! while still letting filters that only need shared fields (host
//! instructions, AZ, allowed projects, project aggregates, status
//! conditions) run unmodified against any family.

use std::collections::HashMap;

/// A candidate host identifier.
pub type Subject = String;

/// Per-subject input weight mapping, subject -> raw (unbounded) weight.
pub type InputWeights = HashMap<Subject, f64>;

/// Requested resource shape for a Nova compute request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flavor {
    /// Flavor name, matched against a reservation's `flavorName` by the
    /// capacity filter's slotting rule.
    pub name: String,
    /// Number of virtual CPUs requested.
    pub vcpus: i64,
    /// Memory requested, in megabytes (10^6 bytes, the upstream flavor
    /// convention — not mebibytes).
    pub memory_mb: i64,
    /// Disk requested, in gigabytes. Not considered by the capacity filter.
    pub disk_gb: i64,
    /// Extra-spec key/value pairs, e.g. `"capabilities:cpu_arch"`,
    /// `"trait:CUSTOM_FOO"`.
    pub extra_specs: HashMap<String, String>,
}

/// Instance-group affinity/anti-affinity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPolicy {
    /// All members must be scheduled onto hosts from the allowed set.
    Affinity,
    /// Members must be spread so no host exceeds `max_server_per_host`.
    AntiAffinity,
}

/// An instance-group descriptor attached to a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceGroup {
    /// The group's policy, if one is set.
    pub policy: Option<GroupPolicy>,
    /// For `Affinity`: the allowed host list. Empty means unconstrained.
    pub hosts: Vec<String>,
    /// Instance ids that are members of this group (used to count
    /// resident members per host for anti-affinity).
    pub members: Vec<String>,
    /// Group policy rule overrides, e.g. `"max_server_per_host" -> "2"`.
    pub rules: HashMap<String, String>,
}

impl InstanceGroup {
    /// `max_server_per_host`, defaulting to 1 when absent or unparsable.
    #[must_use]
    pub fn max_server_per_host(&self) -> u32 {
        self.rules
            .get("max_server_per_host")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1)
    }
}

/// A requested-destination descriptor (`GET /os-hosts` style hints).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Destination {
    /// A specific host requested, if any.
    pub host: Option<String>,
    /// Aggregates the destination must intersect with.
    pub aggregates: Vec<String>,
}

/// Per-family scheduling request trait.
///
/// Every accessor is infallible: families that lack a concept (e.g. Cinder
/// has no instance group) simply return an empty/`None` value, which every
/// filter is written to treat as "this constraint does not apply" per the
/// spec's no-op-on-absence rule.
pub trait SchedulingRequest: Send + Sync + std::fmt::Debug {
    /// Candidate host identifiers.
    fn subjects(&self) -> &[Subject];
    /// Input weights supplied by the upstream scheduler.
    fn weights(&self) -> &InputWeights;
    /// Project identifier, empty string if not applicable.
    fn project_id(&self) -> &str;
    /// Domain identifier, empty string if not applicable.
    fn domain_id(&self) -> &str;
    /// Instance identifier being scheduled (or resized/migrated).
    fn instance_id(&self) -> &str;
    /// Requested availability zone, if any.
    fn availability_zone(&self) -> Option<&str>;
    /// Number of instances this request must place simultaneously.
    fn num_instances(&self) -> u32;
    /// Hosts to unconditionally exclude.
    fn ignore_hosts(&self) -> &[String];
    /// Hosts to unconditionally restrict to, if non-empty.
    fn force_hosts(&self) -> &[String];
    /// Instance-group descriptor, if any.
    fn instance_group(&self) -> Option<&InstanceGroup>;
    /// Requested-destination descriptor, if any.
    fn requested_destination(&self) -> Option<&Destination>;
    /// Scheduler hints map (e.g. `_nova_check_type`, `source_host`).
    fn scheduler_hints(&self) -> &HashMap<String, String>;
    /// Flavor, for families that request compute resources.
    fn flavor(&self) -> Option<&Flavor>;
    /// Image properties (e.g. `hw_virtio_packed_ring`).
    fn image_properties(&self) -> &HashMap<String, String>;
    /// Key/value pairs attached to tracing spans for request-scoped logs.
    fn trace_fields(&self) -> Vec<(&'static str, String)> {
        vec![("instance_id", self.instance_id().to_string())]
    }
}

/// A Nova (compute) scheduling request — the fully-featured family.
#[derive(Debug, Clone, Default)]
pub struct NovaRequest {
    /// Candidate hosts.
    pub subjects: Vec<Subject>,
    /// Upstream input weights.
    pub weights: InputWeights,
    /// Requested flavor.
    pub flavor: Flavor,
    /// Image properties.
    pub image_properties: HashMap<String, String>,
    /// Project identifier.
    pub project_id: String,
    /// Domain identifier.
    pub domain_id: String,
    /// Instance identifier.
    pub instance_id: String,
    /// Instance-group descriptor.
    pub instance_group: Option<InstanceGroup>,
    /// Requested-destination descriptor.
    pub requested_destination: Option<Destination>,
    /// Scheduler hints (includes `_nova_check_type`, `source_host` for
    /// live migration).
    pub scheduler_hints: HashMap<String, String>,
    /// Requested availability zone.
    pub availability_zone: Option<String>,
    /// Number of instances to place simultaneously.
    pub num_instances: u32,
    /// Hosts to exclude unconditionally.
    pub ignore_hosts: Vec<String>,
    /// Hosts to restrict to, if non-empty.
    pub force_hosts: Vec<String>,
    /// Whether this is a rebuild request.
    pub rebuild: bool,
    /// Whether this is a live-migration request (also signalled via
    /// `scheduler_hints["_nova_check_type"]`).
    pub live: bool,
}

impl NovaRequest {
    /// Convenience constructor for a minimal request against a fixed
    /// subject list, used pervasively in tests.
    #[must_use]
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self {
            subjects,
            num_instances: 1,
            ..Default::default()
        }
    }
}

impl SchedulingRequest for NovaRequest {
    fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    fn weights(&self) -> &InputWeights {
        &self.weights
    }

    fn project_id(&self) -> &str {
        &self.project_id
    }

    fn domain_id(&self) -> &str {
        &self.domain_id
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn availability_zone(&self) -> Option<&str> {
        self.availability_zone.as_deref()
    }

    fn num_instances(&self) -> u32 {
        self.num_instances.max(1)
    }

    fn ignore_hosts(&self) -> &[String] {
        &self.ignore_hosts
    }

    fn force_hosts(&self) -> &[String] {
        &self.force_hosts
    }

    fn instance_group(&self) -> Option<&InstanceGroup> {
        self.instance_group.as_ref()
    }

    fn requested_destination(&self) -> Option<&Destination> {
        self.requested_destination.as_ref()
    }

    fn scheduler_hints(&self) -> &HashMap<String, String> {
        &self.scheduler_hints
    }

    fn flavor(&self) -> Option<&Flavor> {
        Some(&self.flavor)
    }

    fn image_properties(&self) -> &HashMap<String, String> {
        &self.image_properties
    }
}

/// A minimal Cinder (volume) scheduling request. Only the
/// family-agnostic filters (host instructions, AZ, allowed projects,
/// project aggregates, status conditions) are meaningful against this
/// family; Nova-only filters (capacity, live-migration, instance-group,
/// accelerators, packed virtqueue) are simply not wired into Cinder
/// pipelines.
#[derive(Debug, Clone, Default)]
pub struct CinderRequest {
    /// Candidate hosts (backends).
    pub subjects: Vec<Subject>,
    /// Upstream input weights.
    pub weights: InputWeights,
    /// Project identifier.
    pub project_id: String,
    /// Requested availability zone.
    pub availability_zone: Option<String>,
    /// Volume identifier being scheduled.
    pub volume_id: String,
}

impl SchedulingRequest for CinderRequest {
    fn subjects(&self) -> &[Subject] {
        &self.subjects
    }
    fn weights(&self) -> &InputWeights {
        &self.weights
    }
    fn project_id(&self) -> &str {
        &self.project_id
    }
    fn domain_id(&self) -> &str {
        ""
    }
    fn instance_id(&self) -> &str {
        &self.volume_id
    }
    fn availability_zone(&self) -> Option<&str> {
        self.availability_zone.as_deref()
    }
    fn num_instances(&self) -> u32 {
        1
    }
    fn ignore_hosts(&self) -> &[String] {
        &[]
    }
    fn force_hosts(&self) -> &[String] {
        &[]
    }
    fn instance_group(&self) -> Option<&InstanceGroup> {
        None
    }
    fn requested_destination(&self) -> Option<&Destination> {
        None
    }
    fn scheduler_hints(&self) -> &HashMap<String, String> {
        static EMPTY: once_cell_like::Empty = once_cell_like::Empty;
        EMPTY.get()
    }
    fn flavor(&self) -> Option<&Flavor> {
        None
    }
    fn image_properties(&self) -> &HashMap<String, String> {
        static EMPTY: once_cell_like::Empty = once_cell_like::Empty;
        EMPTY.get()
    }
}

/// A minimal Manila (share) scheduling request, structurally identical to
/// [`CinderRequest`] for the purposes of the shared filters.
#[derive(Debug, Clone, Default)]
pub struct ManilaRequest {
    /// Candidate hosts.
    pub subjects: Vec<Subject>,
    /// Upstream input weights.
    pub weights: InputWeights,
    /// Project identifier.
    pub project_id: String,
    /// Requested availability zone.
    pub availability_zone: Option<String>,
    /// Share identifier being scheduled.
    pub share_id: String,
}

impl SchedulingRequest for ManilaRequest {
    fn subjects(&self) -> &[Subject] {
        &self.subjects
    }
    fn weights(&self) -> &InputWeights {
        &self.weights
    }
    fn project_id(&self) -> &str {
        &self.project_id
    }
    fn domain_id(&self) -> &str {
        ""
    }
    fn instance_id(&self) -> &str {
        &self.share_id
    }
    fn availability_zone(&self) -> Option<&str> {
        self.availability_zone.as_deref()
    }
    fn num_instances(&self) -> u32 {
        1
    }
    fn ignore_hosts(&self) -> &[String] {
        &[]
    }
    fn force_hosts(&self) -> &[String] {
        &[]
    }
    fn instance_group(&self) -> Option<&InstanceGroup> {
        None
    }
    fn requested_destination(&self) -> Option<&Destination> {
        None
    }
    fn scheduler_hints(&self) -> &HashMap<String, String> {
        static EMPTY: once_cell_like::Empty = once_cell_like::Empty;
        EMPTY.get()
    }
    fn flavor(&self) -> Option<&Flavor> {
        None
    }
    fn image_properties(&self) -> &HashMap<String, String> {
        static EMPTY: once_cell_like::Empty = once_cell_like::Empty;
        EMPTY.get()
    }
}

/// Tiny helper providing `'static` empty maps for request accessors that
/// return references but have nothing to return, without allocating on
/// every call.
mod once_cell_like {
    use once_cell::sync::Lazy;
    use std::collections::HashMap;

    static EMPTY_MAP: Lazy<HashMap<String, String>> = Lazy::new(HashMap::new);

    pub struct Empty;

    impl Empty {
        pub fn get(&self) -> &'static HashMap<String, String> {
            &EMPTY_MAP
        }
    }
}
