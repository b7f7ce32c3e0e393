// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Runs each filter through a full [`PipelineEngine`] rather than calling
//! `Step::run` directly, exercising fan-out, combination and sorting
//! together with the filter's own logic.

use cortex_config::crd::{
    CortexNovaScheduler, DomainCapabilities, HypervisorStatus, ReservationPhase, ReservationRequest,
    ReservationScheduler, ReservationSpec, ReservationStatus, ResourceQuantities,
};
use cortex_engine::inventory::{InMemoryInventory, InMemoryReservations};
use cortex_engine::knowledge::{InMemoryKnowledge, KnowledgeAccessor};
use cortex_engine::pipeline::{ConfiguredStep, PipelineEngine};
use cortex_engine::request::{Flavor, GroupPolicy, InstanceGroup, NovaRequest};
use cortex_engine::step::StepContext;
use cortex_steps::filters::{
    CapacityFilter, ComputeCapabilitiesFilter, InstanceGroupFilter, LiveMigratableFilter,
    RequestedTraitsFilter,
};
use cortex_telemetry::PipelineMetrics;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn pipeline(name: &str, steps: Vec<ConfiguredStep>) -> PipelineEngine {
    let metrics = Arc::new(PipelineMetrics::new().expect("metrics"));
    PipelineEngine::new(name.to_string(), steps, metrics)
}

fn configured<S: cortex_engine::step::Step + 'static>(name: &str, step: S) -> ConfiguredStep {
    ConfiguredStep {
        name: name.to_string(),
        step: Arc::new(step),
    }
}

#[tokio::test]
async fn scenario_1_slotting_unlocks_matching_reservation() {
    let mut inventory = InMemoryInventory::new();
    inventory.insert(
        "h",
        Default::default(),
        HypervisorStatus {
            capacity: ResourceQuantities {
                cpu: 8,
                memory_bytes: 16 * 1024 * 1024 * 1024,
                disk_bytes: 0,
            },
            ..Default::default()
        },
    );
    let mut reservations = InMemoryReservations::new();
    reservations.push(
        "r1",
        ReservationSpec {
            scheduler: ReservationScheduler {
                cortex_nova: Some(CortexNovaScheduler {
                    project_id: "proj-a".into(),
                    domain_id: String::new(),
                    flavor_name: "m1.large".into(),
                    flavor_extra_specs: Default::default(),
                }),
            },
            requests: ReservationRequest {
                cpu: 4,
                memory_bytes: 8 * 1024 * 1024 * 1024,
            },
            lock_reserved: false,
        },
        ReservationStatus {
            phase: Some(ReservationPhase::Active),
            host: "h".into(),
        },
    );
    let ctx = StepContext {
        inventory: Arc::new(inventory),
        reservations: Arc::new(reservations),
        knowledge: KnowledgeAccessor::new(Arc::new(InMemoryKnowledge::new())),
    };

    let mut request = NovaRequest::new(vec!["h".into()]);
    request.project_id = "proj-a".into();
    request.flavor = Flavor {
        name: "m1.large".into(),
        vcpus: 6,
        memory_mb: 12288,
        ..Default::default()
    };

    let engine = pipeline(
        "capacity-only",
        vec![configured("capacity-reservation", CapacityFilter::new("capacity-reservation".into()))],
    );
    let result = engine.run(&ctx, &request).await.expect("ok");
    assert_eq!(result.ordered_subjects, vec!["h".to_string()]);

    request.flavor.extra_specs = HashMap::new();
    let mut locked_reservations = InMemoryReservations::new();
    locked_reservations.push(
        "r1",
        ReservationSpec {
            scheduler: ReservationScheduler {
                cortex_nova: Some(CortexNovaScheduler {
                    project_id: "proj-a".into(),
                    domain_id: String::new(),
                    flavor_name: "m1.large".into(),
                    flavor_extra_specs: Default::default(),
                }),
            },
            requests: ReservationRequest {
                cpu: 4,
                memory_bytes: 8 * 1024 * 1024 * 1024,
            },
            lock_reserved: true,
        },
        ReservationStatus {
            phase: Some(ReservationPhase::Active),
            host: "h".into(),
        },
    );
    let mut locked_inventory = InMemoryInventory::new();
    locked_inventory.insert(
        "h",
        Default::default(),
        HypervisorStatus {
            capacity: ResourceQuantities {
                cpu: 8,
                memory_bytes: 16 * 1024 * 1024 * 1024,
                disk_bytes: 0,
            },
            ..Default::default()
        },
    );
    let locked_ctx = StepContext {
        inventory: Arc::new(locked_inventory),
        reservations: Arc::new(locked_reservations),
        knowledge: KnowledgeAccessor::new(Arc::new(InMemoryKnowledge::new())),
    };
    let result = engine.run(&locked_ctx, &request).await.expect("ok");
    assert!(result.ordered_subjects.is_empty());
}

#[tokio::test]
async fn scenario_2_anti_affinity_with_resize_exception() {
    fn status_with_instances(instances: &[&str]) -> HypervisorStatus {
        HypervisorStatus {
            instances: instances.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
    let mut inventory = InMemoryInventory::new();
    inventory.insert("h1", Default::default(), status_with_instances(&["v1"]));
    inventory.insert("h2", Default::default(), status_with_instances(&["v2"]));
    inventory.insert("h3", Default::default(), status_with_instances(&[]));
    let ctx = cortex_engine::testing::context_with_inventory(inventory);

    let mut request = NovaRequest::new(vec!["h1".into(), "h2".into(), "h3".into()]);
    request.instance_id = "v1".into();
    request.instance_group = Some(InstanceGroup {
        policy: Some(GroupPolicy::AntiAffinity),
        hosts: vec![],
        members: vec!["v1".into(), "v2".into()],
        rules: Default::default(),
    });

    let engine = pipeline(
        "instance-group-only",
        vec![configured("instance-group", InstanceGroupFilter::new("instance-group".into()))],
    );
    let result = engine.run(&ctx, &request).await.expect("ok");
    let mut survivors = result.ordered_subjects;
    survivors.sort();
    assert_eq!(survivors, vec!["h1".to_string(), "h3".to_string()]);
}

#[tokio::test]
async fn scenario_3_unsupported_capability_operator_skips_filter() {
    fn status_with_capability(key: &str, value: &str) -> HypervisorStatus {
        let mut capabilities = BTreeMap::new();
        let _ = capabilities.insert(key.to_string(), value.to_string());
        HypervisorStatus {
            capabilities,
            ..Default::default()
        }
    }
    let mut inventory = InMemoryInventory::new();
    inventory.insert("h1", Default::default(), status_with_capability("cpu_arch", "x86_64"));
    inventory.insert("h2", Default::default(), status_with_capability("cpu_arch", "aarch64"));
    let ctx = cortex_engine::testing::context_with_inventory(inventory);

    let mut extra_specs = HashMap::new();
    let _ = extra_specs.insert("capabilities:cpu_arch".to_string(), "<in> x86_64,aarch64".to_string());
    let mut request = NovaRequest::new(vec!["h1".into(), "h2".into()]);
    request.flavor = Flavor {
        extra_specs,
        ..Default::default()
    };

    let engine = pipeline(
        "compute-capabilities-only",
        vec![configured(
            "compute-capabilities",
            ComputeCapabilitiesFilter::new("compute-capabilities".into()),
        )],
    );
    let result = engine.run(&ctx, &request).await.expect("ok");
    let mut survivors = result.ordered_subjects;
    survivors.sort();
    assert_eq!(survivors, vec!["h1".to_string(), "h2".to_string()]);
}

#[tokio::test]
async fn scenario_4_required_trait_filter() {
    fn with_traits(traits: &[&str]) -> HypervisorStatus {
        HypervisorStatus {
            traits: traits.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
    let mut inventory = InMemoryInventory::new();
    inventory.insert("h1", Default::default(), with_traits(&["CUSTOM_FOO", "CUSTOM_BAZ"]));
    inventory.insert("h2", Default::default(), with_traits(&["CUSTOM_FOO", "CUSTOM_BAR"]));
    inventory.insert("h3", Default::default(), with_traits(&["CUSTOM_BAZ"]));
    let ctx = cortex_engine::testing::context_with_inventory(inventory);

    let mut extra_specs = HashMap::new();
    let _ = extra_specs.insert("trait:CUSTOM_FOO".to_string(), "required".to_string());
    let _ = extra_specs.insert("trait:CUSTOM_BAR".to_string(), "forbidden".to_string());
    let mut request = NovaRequest::new(vec!["h1".into(), "h2".into(), "h3".into()]);
    request.flavor = Flavor {
        extra_specs,
        ..Default::default()
    };

    let engine = pipeline(
        "requested-traits-only",
        vec![configured("has-requested-traits", RequestedTraitsFilter::new("has-requested-traits".into()))],
    );
    let result = engine.run(&ctx, &request).await.expect("ok");
    assert_eq!(result.ordered_subjects, vec!["h1".to_string()]);
}

#[tokio::test]
async fn scenario_5_live_migration_compatibility() {
    fn host(arch: &str, modes: &[&str], features: &[&str], devices: &[&str]) -> HypervisorStatus {
        HypervisorStatus {
            architecture: arch.to_string(),
            domain_capabilities: DomainCapabilities {
                cpu_modes: modes.iter().map(|s| s.to_string()).collect(),
                cpu_features: features.iter().map(|s| s.to_string()).collect(),
                emulated_devices: devices.iter().map(|s| s.to_string()).collect(),
            },
            ..Default::default()
        }
    }
    let mut inventory = InMemoryInventory::new();
    inventory.insert(
        "h1",
        Default::default(),
        host("x86_64", &["host-passthrough", "custom"], &["sev"], &["video"]),
    );
    inventory.insert("h2", Default::default(), host("x86_64", &["host-passthrough"], &[], &[]));
    inventory.insert(
        "h3",
        Default::default(),
        host("x86_64", &["host-passthrough", "custom", "host-model"], &["sev"], &["video"]),
    );
    inventory.insert("h4", Default::default(), host("aarch64", &[], &[], &[]));
    let ctx = cortex_engine::testing::context_with_inventory(inventory);

    let mut request = NovaRequest::new(vec!["h1".into(), "h2".into(), "h3".into(), "h4".into()]);
    let _ = request
        .scheduler_hints
        .insert("_nova_check_type".to_string(), "live_migrate".to_string());
    let _ = request.scheduler_hints.insert("source_host".to_string(), "h1".to_string());

    let engine = pipeline(
        "live-migratable-only",
        vec![configured("live-migratable", LiveMigratableFilter::new("live-migratable".into()))],
    );
    let result = engine.run(&ctx, &request).await.expect("ok");
    let mut survivors = result.ordered_subjects;
    survivors.sort();
    assert_eq!(survivors, vec!["h1".to_string(), "h3".to_string()]);
}

#[tokio::test]
async fn scenario_6_capacity_with_num_instances() {
    let mut inventory = InMemoryInventory::new();
    inventory.insert(
        "h1",
        Default::default(),
        HypervisorStatus {
            capacity: ResourceQuantities {
                cpu: 16,
                memory_bytes: 32768 * 1024 * 1024,
                disk_bytes: 0,
            },
            ..Default::default()
        },
    );
    inventory.insert(
        "h5",
        Default::default(),
        HypervisorStatus {
            capacity: ResourceQuantities {
                cpu: 2,
                memory_bytes: 4096 * 1024 * 1024,
                disk_bytes: 0,
            },
            ..Default::default()
        },
    );
    let ctx = cortex_engine::testing::context_with_inventory(inventory);

    let mut request = NovaRequest::new(vec!["h1".into(), "h5".into()]);
    request.num_instances = 8;
    request.flavor = Flavor {
        name: "m1.small".into(),
        vcpus: 1,
        memory_mb: 4096,
        ..Default::default()
    };

    let engine = pipeline(
        "capacity-only",
        vec![configured("capacity-reservation", CapacityFilter::new("capacity-reservation".into()))],
    );
    let result = engine.run(&ctx, &request).await.expect("ok");
    assert_eq!(result.ordered_subjects, vec!["h1".to_string()]);

    request.num_instances = 9;
    let result = engine.run(&ctx, &request).await.expect("ok");
    assert!(result.ordered_subjects.is_empty());
}

/// Composes several filters in series, confirming that the surviving
/// intersection (not just each filter in isolation) is what the pipeline
/// reports.
#[tokio::test]
async fn composed_pipeline_intersects_every_filters_survivors() {
    fn with_traits(traits: &[&str]) -> HypervisorStatus {
        HypervisorStatus {
            traits: traits.iter().map(|s| s.to_string()).collect(),
            instances: vec![],
            ..Default::default()
        }
    }
    let mut inventory = InMemoryInventory::new();
    inventory.insert("h1", Default::default(), with_traits(&["CUSTOM_FOO"]));
    inventory.insert("h2", Default::default(), with_traits(&["CUSTOM_FOO"]));
    inventory.insert("h3", Default::default(), with_traits(&[]));
    let ctx = cortex_engine::testing::context_with_inventory(inventory);

    let mut extra_specs = HashMap::new();
    let _ = extra_specs.insert("trait:CUSTOM_FOO".to_string(), "required".to_string());
    let mut request = NovaRequest::new(vec!["h1".into(), "h2".into(), "h3".into()]);
    request.flavor = Flavor {
        extra_specs,
        ..Default::default()
    };
    request.instance_group = Some(InstanceGroup {
        policy: Some(GroupPolicy::Affinity),
        hosts: vec!["h1".into()],
        members: vec![],
        rules: Default::default(),
    });

    let engine = pipeline(
        "traits-then-affinity",
        vec![
            configured("has-requested-traits", RequestedTraitsFilter::new("has-requested-traits".into())),
            configured("instance-group", InstanceGroupFilter::new("instance-group".into())),
        ],
    );
    let result = engine.run(&ctx, &request).await.expect("ok");
    assert_eq!(result.ordered_subjects, vec!["h1".to_string()]);
    assert_eq!(result.steps.len(), 2);
}
