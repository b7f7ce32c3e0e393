// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation loops for the `Step` and `Pipeline` CRDs.
//!
//! `Knowledge` and `Hypervisor`/`Reservation` are never reconciled here —
//! they're watched only as reflector caches feeding `cortex-engine`'s
//! read-only store traits. A `Knowledge` change walks the dependency index
//! to requeue every `Step` that reads it; a `Step` change walks the index
//! again to requeue every `Pipeline` that references it. This two-hop
//! `.watches()` relation is what keeps reconciliation incremental instead
//! of re-listing every `Pipeline` on every `Knowledge` tick.

use crate::error::Error;
use crate::index::DependencyIndex;
use crate::readiness::{self, KnowledgeLookup};
use crate::registry::PipelineRegistry;
use crate::stores::{ReflectorInventory, ReflectorKnowledge, ReflectorReservations};
use cortex_config::crd::{
    Condition, ConditionStatus, Hypervisor, Knowledge, Pipeline, PipelineStatus, Reservation, Step, StepStatus,
};
use cortex_engine::knowledge::KnowledgeAccessor;
use cortex_engine::step::StepContext;
use cortex_engine::{ConfiguredStep, PipelineEngine};
use cortex_telemetry::PipelineMetrics;
use futures::StreamExt;
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, Controller, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const FIELD_MANAGER: &str = "cortex-controller";

/// Shared state every reconciler closes over.
pub struct ControllerContext {
    /// Kubernetes client, used for status patches.
    pub client: Client,
    /// Only objects tagged with this operator string are reconciled.
    pub operator: String,
    /// Bidirectional knowledge/step/pipeline dependency tracker.
    pub index: Arc<DependencyIndex>,
    /// The live, queryable set of runnable pipelines.
    pub registry: Arc<PipelineRegistry>,
    /// Shared metrics handed to every built [`PipelineEngine`].
    pub metrics: Arc<PipelineMetrics>,
    /// Watched `Knowledge` cache, read by step readiness and engine wiring.
    pub knowledge_store: Store<Knowledge>,
}

struct KnowledgeStoreLookup<'a>(&'a Store<Knowledge>);

impl KnowledgeLookup for KnowledgeStoreLookup<'_> {
    fn lookup(&self, name: &str) -> Option<cortex_config::crd::KnowledgeStatus> {
        self.0
            .state()
            .into_iter()
            .find(|obj| obj.spec.name == name)
            .and_then(|obj| obj.status.clone())
    }
}

fn ready_condition(ready: bool) -> Condition {
    Condition {
        type_: "Ready".to_string(),
        status: if ready { ConditionStatus::True } else { ConditionStatus::False },
        reason: None,
        message: None,
    }
}

async fn reconcile_step(step: Arc<Step>, ctx: Arc<ControllerContext>) -> Result<Action, Error> {
    if step.spec.operator != ctx.operator {
        return Ok(Action::await_change());
    }
    let name = step.name_any();
    let namespace = step.namespace().unwrap_or_default();
    info!(step = %name, namespace = %namespace, "reconciling step");

    let knowledge_names: Vec<String> = step.spec.knowledges.iter().map(|r| r.name.clone()).collect();
    let step_ref: ObjectRef<Step> = ObjectRef::new(&name).within(&namespace);
    ctx.index.reindex_step(step_ref, &namespace, &knowledge_names);

    let lookup = KnowledgeStoreLookup(&ctx.knowledge_store);
    let (ready, ready_knowledges, total_knowledges) = readiness::step_readiness(&step.spec, &lookup);

    let status = StepStatus {
        ready,
        ready_knowledges,
        total_knowledges,
        conditions: vec![ready_condition(ready)],
    };
    patch_step_status(&ctx.client, &namespace, &name, &status).await?;

    for pipeline_ref in ctx.index.pipelines_for_step(&namespace, &name) {
        info!(pipeline = %pipeline_ref.name, "requeuing dependent pipeline");
    }

    Ok(Action::requeue(Duration::from_secs(300)))
}

async fn patch_step_status(client: &Client, namespace: &str, name: &str, status: &StepStatus) -> Result<(), Error> {
    let api: Api<Step> = Api::namespaced(client.clone(), namespace);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
        .map_err(|err| Error::StatusPatch {
            name: name.to_string(),
            details: err.to_string(),
        })?;
    Ok(())
}

fn step_error_policy(_step: Arc<Step>, err: &Error, _ctx: Arc<ControllerContext>) -> Action {
    error!(error = %err, "step reconciliation failed");
    Action::requeue(Duration::from_secs(30))
}

async fn reconcile_pipeline(pipeline: Arc<Pipeline>, ctx: Arc<ControllerContext>) -> Result<Action, Error> {
    if pipeline.spec.operator != ctx.operator {
        return Ok(Action::await_change());
    }
    let name = pipeline.name_any();
    let namespace = pipeline.namespace().unwrap_or_default();
    info!(pipeline = %name, namespace = %namespace, "reconciling pipeline");

    let step_names: Vec<String> = pipeline.spec.steps.iter().map(|s| s.step_ref.name.clone()).collect();
    let pipeline_ref: ObjectRef<Pipeline> = ObjectRef::new(&name).within(&namespace);
    ctx.index.reindex_pipeline(pipeline_ref, &namespace, &step_names);

    let step_api: Api<Step> = Api::namespaced(ctx.client.clone(), &namespace);
    let mut fetched = Vec::with_capacity(pipeline.spec.steps.len());
    for step_ref in &pipeline.spec.steps {
        match step_api.get(&step_ref.step_ref.name).await {
            Ok(step) => fetched.push(Some(step)),
            Err(err) => {
                warn!(step = %step_ref.step_ref.name, error = %err, "referenced step not found");
                fetched.push(None);
            }
        }
    }

    let total = pipeline.spec.steps.len() as u32;
    let ready_count = fetched
        .iter()
        .filter(|s| s.as_ref().and_then(|s| s.status.as_ref()).is_some_and(|st| st.ready))
        .count() as u32;
    let mandatory_ready = pipeline
        .spec
        .steps
        .iter()
        .zip(&fetched)
        .filter(|(step_ref, _)| step_ref.mandatory)
        .all(|(_, fetched)| fetched.as_ref().and_then(|s| s.status.as_ref()).is_some_and(|st| st.ready));

    let status = PipelineStatus {
        ready: mandatory_ready,
        ready_steps: ready_count,
        total_steps: total,
        steps_ready_frac: readiness::ready_frac(ready_count, total),
        conditions: vec![ready_condition(mandatory_ready)],
    };
    patch_pipeline_status(&ctx.client, &namespace, &name, &status).await?;

    if mandatory_ready {
        let configured: Vec<ConfiguredStep> = fetched
            .into_iter()
            .zip(&pipeline.spec.steps)
            .filter_map(|(step, step_ref)| step.map(|s| (s, step_ref)))
            .filter_map(|(step, step_ref)| {
                match cortex_steps::build(&step.spec.implementation, step_ref.step_ref.name.clone(), &step.spec.opts) {
                    Ok(built) => Some(ConfiguredStep {
                        name: step_ref.step_ref.name.clone(),
                        step: built,
                    }),
                    Err(err) => {
                        warn!(step = %step_ref.step_ref.name, error = %err, "step failed to build, dropping from pipeline");
                        None
                    }
                }
            })
            .collect();
        let engine = Arc::new(PipelineEngine::new(name.clone(), configured, Arc::clone(&ctx.metrics)));
        ctx.registry.insert(&namespace, &name, engine);
    } else {
        ctx.registry.remove(&namespace, &name);
    }

    Ok(Action::requeue(Duration::from_secs(300)))
}

async fn patch_pipeline_status(
    client: &Client,
    namespace: &str,
    name: &str,
    status: &PipelineStatus,
) -> Result<(), Error> {
    let api: Api<Pipeline> = Api::namespaced(client.clone(), namespace);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
        .map_err(|err| Error::StatusPatch {
            name: name.to_string(),
            details: err.to_string(),
        })?;
    Ok(())
}

fn pipeline_error_policy(_pipeline: Arc<Pipeline>, err: &Error, _ctx: Arc<ControllerContext>) -> Action {
    error!(error = %err, "pipeline reconciliation failed");
    Action::requeue(Duration::from_secs(30))
}

/// Spawns the `Hypervisor`/`Reservation`/`Knowledge` watch loops and the
/// `Step`/`Pipeline` reconciliation controllers as background tasks (each
/// "a separate reconciliation goroutine managed by the runtime"), then
/// returns the [`StepContext`] those watch loops feed. The returned context
/// is read-only and safe to hand to every inbound decision-API request.
pub async fn run(
    client: Client,
    operator: String,
    registry: Arc<PipelineRegistry>,
    metrics: Arc<PipelineMetrics>,
) -> Result<StepContext, Error> {
    let index = Arc::new(DependencyIndex::new());

    let hypervisor_api: Api<Hypervisor> = Api::all(client.clone());
    let (hypervisor_store, hypervisor_writer) = reflector::store();
    let hypervisor_watch = reflector::reflector(hypervisor_writer, watcher(hypervisor_api, watcher::Config::default()))
        .default_backoff()
        .touched_objects();

    let reservation_api: Api<Reservation> = Api::all(client.clone());
    let (reservation_store, reservation_writer) = reflector::store();
    let reservation_watch =
        reflector::reflector(reservation_writer, watcher(reservation_api, watcher::Config::default()))
            .default_backoff()
            .touched_objects();

    let knowledge_api: Api<Knowledge> = Api::all(client.clone());
    let (knowledge_store, knowledge_writer) = reflector::store();
    let knowledge_watch = reflector::reflector(knowledge_writer, watcher(knowledge_api, watcher::Config::default()))
        .default_backoff()
        .touched_objects();

    let step_context = StepContext {
        inventory: Arc::new(ReflectorInventory::new(hypervisor_store)),
        reservations: Arc::new(ReflectorReservations::new(reservation_store)),
        knowledge: KnowledgeAccessor::new(Arc::new(ReflectorKnowledge::new(knowledge_store.clone()))),
    };

    let ctx = Arc::new(ControllerContext {
        client: client.clone(),
        operator,
        index: Arc::clone(&index),
        registry,
        metrics,
        knowledge_store,
    });

    let step_api: Api<Step> = Api::all(client.clone());
    let pipeline_api: Api<Pipeline> = Api::all(client.clone());

    let knowledge_index_for_steps = Arc::clone(&index);
    let step_controller = Controller::new(step_api.clone(), watcher::Config::default())
        .watches(knowledge_api, watcher::Config::default(), move |knowledge| {
            let namespace = knowledge.namespace().unwrap_or_default();
            knowledge_index_for_steps
                .steps_for_knowledge(&namespace, &knowledge.spec.name)
                .into_iter()
        })
        .shutdown_on_signal()
        .run(reconcile_step, step_error_policy, Arc::clone(&ctx))
        .for_each(|res| async move {
            if let Err(err) = res {
                error!(error = %err, "step controller stream error");
            }
        });

    let pipeline_controller = Controller::new(pipeline_api, watcher::Config::default())
        .watches(step_api, watcher::Config::default(), move |step| {
            let namespace = step.namespace().unwrap_or_default();
            index.pipelines_for_step(&namespace, &step.name_any()).into_iter()
        })
        .shutdown_on_signal()
        .run(reconcile_pipeline, pipeline_error_policy, ctx)
        .for_each(|res| async move {
            if let Err(err) = res {
                error!(error = %err, "pipeline controller stream error");
            }
        });

    let _ = tokio::spawn(hypervisor_watch.for_each(|res| async move {
        if let Err(err) = res {
            warn!(error = %err, "hypervisor reflector stream error");
        }
    }));
    let _ = tokio::spawn(reservation_watch.for_each(|res| async move {
        if let Err(err) = res {
            warn!(error = %err, "reservation reflector stream error");
        }
    }));
    let _ = tokio::spawn(knowledge_watch.for_each(|res| async move {
        if let Err(err) = res {
            warn!(error = %err, "knowledge reflector stream error");
        }
    }));
    let _ = tokio::spawn(step_controller);
    let _ = tokio::spawn(pipeline_controller);

    Ok(step_context)
}
