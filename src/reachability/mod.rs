//! Reachability Builder
//!
//! Expands eligible protection groups into the set of protected volumes.
//!
//! ```text
//! group ──▶ volume
//! group ──▶ host ─────────────▶ volume (connected to host)
//! group ──▶ host group ──▶ host ──▶ volume
//! group ──▶ host group ───────▶ volume (connected to host group)
//! ```
//!
//! Host groups are expanded one level; they do not nest.

mod proptest;

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use clap::ValueEnum;
use tracing::debug;

use crate::domain::model::{
    HostGroup, HostGroupName, HostName, ProtectionGroup, ProtectionSchedule, Volume, VolumeName,
};
use crate::fetch::ArraySnapshot;
use crate::policy::{eligible_groups, EnabledCheckMode, ScheduleTable};

/// How protection is traced from groups to volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReachabilityMode {
    /// Follow group, host and host-group membership to connected volumes
    #[default]
    Full,
    /// Only count direct group membership of a volume (weaker approximation)
    Direct,
}

impl fmt::Display for ReachabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReachabilityMode::Full => write!(f, "full"),
            ReachabilityMode::Direct => write!(f, "direct"),
        }
    }
}

/// Volumes protected by at least one eligible group, following host and
/// host-group membership.
pub fn compute_protected_volumes(
    groups: &[ProtectionGroup],
    schedules: &[ProtectionSchedule],
    host_groups: &[HostGroup],
    volumes_with_connections: &[Volume],
    mode: EnabledCheckMode,
) -> BTreeSet<VolumeName> {
    let eligible = eligible_groups(groups, &ScheduleTable::new(schedules), mode);

    let mut protected_volumes: BTreeSet<VolumeName> = BTreeSet::new();
    let mut protected_hosts: HashSet<&HostName> = HashSet::new();
    let mut protected_hostgroups: HashSet<&HostGroupName> = HashSet::new();

    // Direct membership of eligible groups
    for group in groups.iter().filter(|g| eligible.contains(&g.name)) {
        protected_volumes.extend(group.volumes.iter().cloned());
        protected_hosts.extend(group.hosts.iter());
        protected_hostgroups.extend(group.hgroups.iter());
    }

    // Hosts reached through a protected host group
    for host_group in host_groups {
        if protected_hostgroups.contains(&host_group.name) {
            protected_hosts.extend(host_group.hosts.iter());
        }
    }

    // Volumes connected to a protected host or host group
    for volume in volumes_with_connections {
        let via_host = volume
            .host
            .as_ref()
            .is_some_and(|h| protected_hosts.contains(h));
        let via_hgroup = volume
            .hgroup
            .as_ref()
            .is_some_and(|hg| protected_hostgroups.contains(hg));

        if via_host || via_hgroup {
            protected_volumes.insert(volume.name.clone());
        }
    }

    debug!(
        hosts = protected_hosts.len(),
        hgroups = protected_hostgroups.len(),
        volumes = protected_volumes.len(),
        "Computed protected set"
    );

    protected_volumes
}

/// Volumes whose own `protection_group` field names an eligible group.
///
/// Ignores protection inherited through hosts and host groups, so it can
/// report volumes as unprotected that [`compute_protected_volumes`] would
/// count as protected.
pub fn compute_direct_protected_volumes(
    groups: &[ProtectionGroup],
    schedules: &[ProtectionSchedule],
    protected_volumes: &[Volume],
    mode: EnabledCheckMode,
) -> BTreeSet<VolumeName> {
    let eligible = eligible_groups(groups, &ScheduleTable::new(schedules), mode);

    protected_volumes
        .iter()
        .filter(|v| {
            v.protection_group
                .as_ref()
                .is_some_and(|pg| eligible.contains(pg))
        })
        .map(|v| v.name.clone())
        .collect()
}

/// Protected set of a fetched snapshot under the given modes.
pub fn protected_volumes(
    snapshot: &ArraySnapshot,
    reachability: ReachabilityMode,
    mode: EnabledCheckMode,
) -> BTreeSet<VolumeName> {
    match reachability {
        ReachabilityMode::Full => compute_protected_volumes(
            &snapshot.protection_groups,
            &snapshot.schedules,
            &snapshot.host_groups,
            &snapshot.connected_volumes,
            mode,
        ),
        ReachabilityMode::Direct => compute_direct_protected_volumes(
            &snapshot.protection_groups,
            &snapshot.schedules,
            &snapshot.protected_volumes,
            mode,
        ),
    }
}
