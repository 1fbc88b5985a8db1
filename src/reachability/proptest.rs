//! Property-Based Tests for Reachability
//!
//! # Test Properties
//!
//! 1. **Complement**: the report is a subset of all volumes, disjoint from the protected set
//! 2. **Idempotence**: the same snapshot always yields the same protected set
//! 3. **Monotonicity**: `local` and `remote` never protect more than `either`
//! 4. **NoCheck Superset**: `nocheck` protects at least as much as every other mode
//! 5. **Order Independence**: shuffling the input lists does not change the result
//! 6. **Report Order**: output names are strictly increasing byte-wise

#![cfg(test)]

use std::collections::BTreeSet;

use proptest::prelude::*;

use super::compute_protected_volumes;
use crate::domain::model::{HostGroup, ProtectionGroup, ProtectionSchedule, Volume, VolumeName};
use crate::policy::EnabledCheckMode;
use crate::report::unprotected;

// =============================================================================
// Property Strategies
// =============================================================================

const VOLUMES: usize = 10;
const HOSTS: usize = 4;
const HGROUPS: usize = 3;
const GROUPS: usize = 5;

#[derive(Debug, Clone)]
struct Snapshot {
    groups: Vec<ProtectionGroup>,
    schedules: Vec<ProtectionSchedule>,
    host_groups: Vec<HostGroup>,
    connections: Vec<Volume>,
    all_volumes: Vec<Volume>,
}

fn subset(prefix: &'static str, n: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(any::<bool>(), n).prop_map(move |mask| {
        mask.into_iter()
            .enumerate()
            .filter(|(_, picked)| *picked)
            .map(|(i, _)| format!("{prefix}{i}"))
            .collect()
    })
}

fn group_strategy(index: usize) -> impl Strategy<Value = ProtectionGroup> {
    (
        subset("vol-", VOLUMES),
        subset("host-", HOSTS),
        subset("hg-", HGROUPS),
        prop::collection::vec(any::<bool>(), 0..3),
    )
        .prop_map(move |(volumes, hosts, hgroups, targets)| {
            let mut group = ProtectionGroup::new(format!("pg-{index}"))
                .with_volumes(volumes)
                .with_hosts(hosts)
                .with_hgroups(hgroups);
            for (i, allowed) in targets.into_iter().enumerate() {
                group = group.with_target(format!("target-{i}"), allowed);
            }
            group
        })
}

/// Schedules for a random subset of groups, so some lookups miss.
fn schedules_strategy() -> impl Strategy<Value = Vec<ProtectionSchedule>> {
    prop::collection::vec(prop::option::of((any::<bool>(), any::<bool>())), GROUPS).prop_map(
        |flags| {
            flags
                .into_iter()
                .enumerate()
                .filter_map(|(i, f)| {
                    f.map(|(snap, rep)| ProtectionSchedule::new(format!("pg-{i}"), snap, rep))
                })
                .collect()
        },
    )
}

fn host_groups_strategy() -> impl Strategy<Value = Vec<HostGroup>> {
    prop::collection::vec(subset("host-", HOSTS), HGROUPS).prop_map(|members| {
        members
            .into_iter()
            .enumerate()
            .map(|(i, hosts)| HostGroup::new(format!("hg-{i}"), hosts))
            .collect()
    })
}

fn connection_strategy() -> impl Strategy<Value = Volume> {
    (
        0..VOLUMES,
        prop::option::of(0..HOSTS),
        prop::option::of(0..HGROUPS),
    )
        .prop_map(|(v, host, hgroup)| {
            let mut volume = Volume::new(format!("vol-{v}"));
            if let Some(h) = host {
                volume = volume.connected_to_host(format!("host-{h}"));
            }
            if let Some(hg) = hgroup {
                volume = volume.connected_to_hgroup(format!("hg-{hg}"));
            }
            volume
        })
}

fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    let groups: Vec<_> = (0..GROUPS).map(group_strategy).collect();
    (
        groups,
        schedules_strategy(),
        host_groups_strategy(),
        prop::collection::vec(connection_strategy(), 0..15),
    )
        .prop_map(|(groups, schedules, host_groups, connections)| Snapshot {
            groups,
            schedules,
            host_groups,
            connections,
            all_volumes: (0..VOLUMES).map(|i| Volume::new(format!("vol-{i}"))).collect(),
        })
}

fn mode_strategy() -> impl Strategy<Value = EnabledCheckMode> {
    prop::sample::select(EnabledCheckMode::ALL.to_vec())
}

fn protected(snapshot: &Snapshot, mode: EnabledCheckMode) -> BTreeSet<VolumeName> {
    compute_protected_volumes(
        &snapshot.groups,
        &snapshot.schedules,
        &snapshot.host_groups,
        &snapshot.connections,
        mode,
    )
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the report never names a protected volume or an unknown one.
    #[test]
    fn prop_report_is_complement(snapshot in snapshot_strategy(), mode in mode_strategy()) {
        let protected_set = protected(&snapshot, mode);
        let report = unprotected(&snapshot.all_volumes, &protected_set, None);

        let known: BTreeSet<_> = snapshot.all_volumes.iter().map(|v| v.name.clone()).collect();
        for name in &report {
            prop_assert!(known.contains(name));
            prop_assert!(!protected_set.contains(name));
        }
        for volume in &snapshot.all_volumes {
            prop_assert!(protected_set.contains(&volume.name) || report.contains(&volume.name));
        }
    }

    /// Property: computing twice gives the same set.
    #[test]
    fn prop_idempotent(snapshot in snapshot_strategy(), mode in mode_strategy()) {
        prop_assert_eq!(protected(&snapshot, mode), protected(&snapshot, mode));
    }

    /// Property: widening to `either` never shrinks the protected set.
    #[test]
    fn prop_either_is_monotonic(snapshot in snapshot_strategy()) {
        let either = protected(&snapshot, EnabledCheckMode::Either);
        let local = protected(&snapshot, EnabledCheckMode::Local);
        let remote = protected(&snapshot, EnabledCheckMode::Remote);

        prop_assert!(local.is_subset(&either));
        prop_assert!(remote.is_subset(&either));
    }

    /// Property: `nocheck` protects a superset of every other mode.
    #[test]
    fn prop_nocheck_is_superset(snapshot in snapshot_strategy(), mode in mode_strategy()) {
        let nocheck = protected(&snapshot, EnabledCheckMode::NoCheck);
        prop_assert!(protected(&snapshot, mode).is_subset(&nocheck));
    }

    /// Property: input order does not matter.
    #[test]
    fn prop_order_independent(snapshot in snapshot_strategy(), mode in mode_strategy()) {
        let mut reversed = snapshot.clone();
        reversed.groups.reverse();
        reversed.schedules.reverse();
        reversed.host_groups.reverse();
        reversed.connections.reverse();

        prop_assert_eq!(protected(&snapshot, mode), protected(&reversed, mode));
    }

    /// Property: output is sorted and free of duplicates, and the ignore
    /// filter removes every matching name.
    #[test]
    fn prop_report_sorted_and_filtered(
        snapshot in snapshot_strategy(),
        mode in mode_strategy(),
        ignore in "[a-z0-9-]{0,4}",
    ) {
        let protected_set = protected(&snapshot, mode);

        let mut volumes = snapshot.all_volumes.clone();
        volumes.reverse();
        volumes.extend(snapshot.all_volumes.iter().cloned());

        let report = unprotected(&volumes, &protected_set, Some(ignore.as_str()));
        for pair in report.windows(2) {
            prop_assert!(pair[0].as_str().as_bytes() < pair[1].as_str().as_bytes());
        }
        if !ignore.is_empty() {
            for name in &report {
                prop_assert!(!name.as_str().contains(ignore.as_str()));
            }
        } else {
            prop_assert_eq!(&report, &unprotected(&volumes, &protected_set, None));
        }
    }
}
