//! Array Records
//!
//! Read-only records fetched from the array. Field names follow the array's
//! JSON so the REST adapter can deserialize straight into them.

use std::fmt;

use serde::{Deserialize, Deserializer};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

identifier!(
    /// Protection group name. Also the key that links a group to its schedule.
    GroupName
);
identifier!(
    /// Volume name, unique on the array.
    VolumeName
);
identifier!(
    /// Host name.
    HostName
);
identifier!(
    /// Host group name.
    HostGroupName
);

/// The array sends `null` for empty member lists.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Protection Groups
// =============================================================================

/// A replication destination of a protection group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplicationTarget {
    #[serde(default)]
    pub name: String,

    /// Whether the destination currently accepts replication
    #[serde(default)]
    pub allowed: bool,
}

/// A protection group and its membership lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtectionGroup {
    pub name: GroupName,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub volumes: Vec<VolumeName>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub hosts: Vec<HostName>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub hgroups: Vec<HostGroupName>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub targets: Vec<ReplicationTarget>,
}

impl ProtectionGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: GroupName::new(name),
            volumes: Vec::new(),
            hosts: Vec::new(),
            hgroups: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn with_volumes<I, S>(mut self, volumes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.volumes = volumes.into_iter().map(VolumeName::new).collect();
        self
    }

    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = hosts.into_iter().map(HostName::new).collect();
        self
    }

    pub fn with_hgroups<I, S>(mut self, hgroups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hgroups = hgroups.into_iter().map(HostGroupName::new).collect();
        self
    }

    pub fn with_target(mut self, name: impl Into<String>, allowed: bool) -> Self {
        self.targets.push(ReplicationTarget {
            name: name.into(),
            allowed,
        });
        self
    }
}

/// Snapshot and replication flags of a protection group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtectionSchedule {
    pub name: GroupName,

    #[serde(default)]
    pub snap_enabled: bool,

    #[serde(default)]
    pub replicate_enabled: bool,
}

impl ProtectionSchedule {
    pub fn new(name: impl Into<String>, snap_enabled: bool, replicate_enabled: bool) -> Self {
        Self {
            name: GroupName::new(name),
            snap_enabled,
            replicate_enabled,
        }
    }
}

// =============================================================================
// Hosts and Volumes
// =============================================================================

/// A named set of hosts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostGroup {
    pub name: HostGroupName,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub hosts: Vec<HostName>,
}

impl HostGroup {
    pub fn new<I, S>(name: impl Into<String>, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: HostGroupName::new(name),
            hosts: hosts.into_iter().map(HostName::new).collect(),
        }
    }
}

/// A volume record.
///
/// Depending on the query, `host`/`hgroup` carry one connection of the
/// volume (a volume with several connections is listed once per
/// connection) and `protection_group` carries one direct membership.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Volume {
    pub name: VolumeName,

    #[serde(default)]
    pub host: Option<HostName>,

    #[serde(default)]
    pub hgroup: Option<HostGroupName>,

    #[serde(default)]
    pub protection_group: Option<GroupName>,
}

impl Volume {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: VolumeName::new(name),
            host: None,
            hgroup: None,
            protection_group: None,
        }
    }

    pub fn connected_to_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(HostName::new(host));
        self
    }

    pub fn connected_to_hgroup(mut self, hgroup: impl Into<String>) -> Self {
        self.hgroup = Some(HostGroupName::new(hgroup));
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.protection_group = Some(GroupName::new(group));
        self
    }
}
