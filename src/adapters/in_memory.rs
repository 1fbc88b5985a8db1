//! In-Memory Array Source
//!
//! Serves a fixed snapshot through the `ArraySource` port. Used by tests
//! and for replaying captured array state.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::model::{HostGroup, ProtectionGroup, ProtectionSchedule, Volume};
use crate::domain::ports::ArraySource;
use crate::error::{Error, Result};

/// Which query an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    ProtectionGroups,
    Schedules,
    HostGroups,
    ConnectedVolumes,
    ProtectedVolumes,
    Volumes,
}

/// Fixed array contents.
#[derive(Debug, Default)]
pub struct InMemoryArraySource {
    groups: Vec<ProtectionGroup>,
    schedules: Vec<ProtectionSchedule>,
    host_groups: Vec<HostGroup>,
    connected_volumes: Vec<Volume>,
    protected_volumes: Vec<Volume>,
    volumes: Vec<Volume>,
    fail_on: Option<FailOn>,
    calls: AtomicUsize,
}

impl InMemoryArraySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: ProtectionGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_schedule(mut self, schedule: ProtectionSchedule) -> Self {
        self.schedules.push(schedule);
        self
    }

    pub fn with_host_group(mut self, host_group: HostGroup) -> Self {
        self.host_groups.push(host_group);
        self
    }

    /// Add a volume to the full listing.
    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volumes.push(volume);
        self
    }

    /// Add a host or host-group connection of a volume.
    pub fn with_connection(mut self, volume: Volume) -> Self {
        self.connected_volumes.push(volume);
        self
    }

    /// Add a direct protection-group membership of a volume.
    pub fn with_membership(mut self, volume: Volume) -> Self {
        self.protected_volumes.push(volume);
        self
    }

    /// Make one query fail with a connection-style error.
    pub fn failing_on(mut self, fail_on: FailOn) -> Self {
        self.fail_on = Some(fail_on);
        self
    }

    /// Number of queries served so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn serve<T: Clone>(&self, query: FailOn, items: &[T]) -> Result<Vec<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(query) {
            return Err(Error::Authentication(format!(
                "injected failure for {:?}",
                query
            )));
        }
        Ok(items.to_vec())
    }
}

#[async_trait]
impl ArraySource for InMemoryArraySource {
    async fn list_protection_groups(&self) -> Result<Vec<ProtectionGroup>> {
        self.serve(FailOn::ProtectionGroups, &self.groups)
    }

    async fn list_schedules(&self) -> Result<Vec<ProtectionSchedule>> {
        self.serve(FailOn::Schedules, &self.schedules)
    }

    async fn list_host_groups(&self) -> Result<Vec<HostGroup>> {
        self.serve(FailOn::HostGroups, &self.host_groups)
    }

    async fn list_connected_volumes(&self) -> Result<Vec<Volume>> {
        self.serve(FailOn::ConnectedVolumes, &self.connected_volumes)
    }

    async fn list_protected_volumes(&self) -> Result<Vec<Volume>> {
        self.serve(FailOn::ProtectedVolumes, &self.protected_volumes)
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        self.serve(FailOn::Volumes, &self.volumes)
    }
}
