// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use cortex_config::crd::ReservationPhase;
use cortex_engine::activation;
use cortex_engine::error::Error;
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::{Step, StepContext, StepOutcome, StepResult, StepStatistics};
use std::collections::HashMap;

/// Upstream flavor memory convention: megabytes (10^6 bytes), not
/// mebibytes. Capacity and allocation are tracked in bytes; this divisor
/// converts free bytes to free megabytes before dividing by the flavor's
/// requested `memory_mb`. Intentional — see the project's design notes.
const BYTES_PER_MEGABYTE: i64 = 1_000_000;

/// Maintains a per-host free-resource ledger (declared capacity minus
/// current allocation minus non-slotted active reservations) and keeps
/// only hosts with enough free vCPU and memory slots for
/// `num_instances` copies of the requested flavor.
///
/// The slotting rule: an active reservation scoped to the requesting
/// project and flavor is treated as already paid for and is not
/// subtracted, unless the reservation sets `lockReserved`.
pub struct CapacityFilter {
    name: String,
}

impl CapacityFilter {
    /// Builds the filter under its configured step name.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Step for CapacityFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_filter(&self) -> bool {
        true
    }

    async fn run(
        &self,
        ctx: &StepContext,
        request: &dyn SchedulingRequest,
    ) -> Result<StepOutcome, Error> {
        let subjects = request.subjects();
        if subjects.is_empty() {
            return Ok(StepOutcome::Ran(StepResult::default()));
        }

        let Some(flavor) = request.flavor() else {
            return Ok(StepOutcome::Skipped {
                reason: "request carries no flavor",
            });
        };

        if flavor.vcpus == 0 || flavor.memory_mb == 0 {
            return Err(Error::Configuration {
                step: self.name.clone(),
                details: "flavor reports zero vCPUs or zero memory".to_string(),
            });
        }

        let num_instances = i64::from(request.num_instances().max(1));

        let mut free: HashMap<String, (i64, i64)> = HashMap::new();
        for host in subjects {
            if let Some(record) = ctx.inventory.get(host) {
                free.insert(
                    host.clone(),
                    (
                        record.status.capacity.cpu - record.status.allocation.cpu,
                        record.status.capacity.memory_bytes - record.status.allocation.memory_bytes,
                    ),
                );
            }
        }

        for reservation in ctx.reservations.list() {
            if reservation.status.phase != Some(ReservationPhase::Active) {
                continue;
            }
            let Some(cortex_nova) = reservation.spec.scheduler.cortex_nova.as_ref() else {
                continue;
            };
            let host = &reservation.status.host;
            let Some(entry) = free.get_mut(host.as_str()) else {
                continue;
            };

            let matches_requester = !reservation.spec.lock_reserved
                && cortex_nova.project_id == request.project_id()
                && cortex_nova.flavor_name == flavor.name;
            if matches_requester {
                continue;
            }
            entry.0 -= reservation.spec.requests.cpu;
            entry.1 -= reservation.spec.requests.memory_bytes;
        }

        let mut slots = HashMap::with_capacity(free.len());
        let mut activations = activation::prepare_result(subjects);
        activations.retain(|host, _| {
            let Some((free_cpu, free_mem)) = free.get(host) else {
                return false;
            };
            if *free_cpu < 0 {
                return false;
            }
            let vcpu_slots = free_cpu / flavor.vcpus;
            let mem_slots = (free_mem / BYTES_PER_MEGABYTE) / flavor.memory_mb;
            slots.insert(host.clone(), vcpu_slots.min(mem_slots) as f64);
            vcpu_slots >= num_instances && mem_slots >= num_instances
        });

        Ok(StepOutcome::Ran(StepResult {
            activations,
            statistics: Some(StepStatistics {
                unit: "slots".to_string(),
                values: slots,
            }),
        }))
    }
}
