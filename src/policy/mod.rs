//! Eligibility Filter
//!
//! Decides whether a protection group counts as "enabled" under the
//! selected [`EnabledCheckMode`].
//!
//! Groups are linked to their schedules by name only. A group whose name has
//! no schedule entry is treated as not enabled (fail closed) in every mode
//! except [`EnabledCheckMode::NoCheck`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use clap::ValueEnum;
use tracing::{debug, warn};

use crate::domain::model::{GroupName, ProtectionGroup, ProtectionSchedule};

// =============================================================================
// Check Mode
// =============================================================================

/// Policy used to decide whether a protection group is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum EnabledCheckMode {
    /// Local snapshot schedule enabled
    Local,
    /// Replication schedule enabled with at least one allowed target
    Remote,
    /// Either of the above
    #[default]
    Either,
    /// Every group counts; finds volumes in no group at all
    #[value(name = "nocheck")]
    NoCheck,
}

impl EnabledCheckMode {
    pub const ALL: [EnabledCheckMode; 4] = [
        EnabledCheckMode::Local,
        EnabledCheckMode::Remote,
        EnabledCheckMode::Either,
        EnabledCheckMode::NoCheck,
    ];

    /// Sentence appended to each reported volume
    pub fn explanation(&self) -> &'static str {
        match self {
            EnabledCheckMode::Either => {
                "is not in a local or remote PG with a schedule enabled and allowed target."
            }
            EnabledCheckMode::NoCheck => "is not in a PG.",
            EnabledCheckMode::Local => "is not in a PG with a snap schedule enabled.",
            EnabledCheckMode::Remote => {
                "is not in a PG with a remote schedule enabled and allowed target."
            }
        }
    }
}

impl fmt::Display for EnabledCheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnabledCheckMode::Local => write!(f, "local"),
            EnabledCheckMode::Remote => write!(f, "remote"),
            EnabledCheckMode::Either => write!(f, "either"),
            EnabledCheckMode::NoCheck => write!(f, "nocheck"),
        }
    }
}

// =============================================================================
// Schedule Lookup
// =============================================================================

/// Schedules keyed by protection group name
#[derive(Debug, Clone, Default)]
pub struct ScheduleTable {
    by_group: HashMap<GroupName, ProtectionSchedule>,
}

impl ScheduleTable {
    pub fn new(schedules: &[ProtectionSchedule]) -> Self {
        let by_group = schedules
            .iter()
            .map(|s| (s.name.clone(), s.clone()))
            .collect();
        Self { by_group }
    }

    pub fn get(&self, group: &GroupName) -> Option<&ProtectionSchedule> {
        self.by_group.get(group)
    }
}

// =============================================================================
// Eligibility
// =============================================================================

/// True if the group has at least one replication target that is allowed.
pub fn has_allowed_target(group: &ProtectionGroup) -> bool {
    group.targets.iter().any(|t| t.allowed)
}

/// Whether `group` counts as enabled under `mode`.
pub fn is_enabled(
    group: &ProtectionGroup,
    schedule: Option<&ProtectionSchedule>,
    mode: EnabledCheckMode,
) -> bool {
    let remote = |s: &ProtectionSchedule| s.replicate_enabled && has_allowed_target(group);

    match (mode, schedule) {
        (EnabledCheckMode::NoCheck, _) => true,
        (_, None) => false,
        (EnabledCheckMode::Local, Some(s)) => s.snap_enabled,
        (EnabledCheckMode::Remote, Some(s)) => remote(s),
        (EnabledCheckMode::Either, Some(s)) => s.snap_enabled || remote(s),
    }
}

/// Names of every group that is enabled under `mode`.
pub fn eligible_groups(
    groups: &[ProtectionGroup],
    schedules: &ScheduleTable,
    mode: EnabledCheckMode,
) -> BTreeSet<GroupName> {
    groups
        .iter()
        .filter(|group| {
            let schedule = schedules.get(&group.name);
            if schedule.is_none() && mode != EnabledCheckMode::NoCheck {
                warn!(
                    group = %group.name,
                    "No schedule found for protection group, treating it as not enabled"
                );
            }
            let enabled = is_enabled(group, schedule, mode);
            debug!(group = %group.name, %mode, enabled, "Checked protection group");
            enabled
        })
        .map(|group| group.name.clone())
        .collect()
}
