// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Filter-step implementations: host pruning against inventory and
//! knowledge state.

mod accelerators;
mod allowed_projects;
mod capacity;
mod compute_capabilities;
mod correct_az;
mod host_instructions;
mod instance_group;
mod live_migratable;
mod packed_virtqueue;
mod project_aggregates;
mod requested_destination;
mod requested_traits;
mod status_conditions;

pub use accelerators::AcceleratorsFilter;
pub use allowed_projects::AllowedProjectsFilter;
pub use capacity::CapacityFilter;
pub use compute_capabilities::ComputeCapabilitiesFilter;
pub use correct_az::CorrectAzFilter;
pub use host_instructions::HostInstructionsFilter;
pub use instance_group::InstanceGroupFilter;
pub use live_migratable::LiveMigratableFilter;
pub use packed_virtqueue::PackedVirtqueueFilter;
pub use project_aggregates::ProjectAggregatesFilter;
pub use requested_destination::RequestedDestinationFilter;
pub use requested_traits::RequestedTraitsFilter;
pub use status_conditions::StatusConditionsFilter;
