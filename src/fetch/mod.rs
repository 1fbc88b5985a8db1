//! Fetch Orchestrator
//!
//! Issues the independent array queries concurrently and gathers them into
//! one [`ArraySnapshot`]. At most `max_concurrency` queries are in flight;
//! the first failure aborts the rest.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::domain::model::{HostGroup, ProtectionGroup, ProtectionSchedule, Volume};
use crate::domain::ports::ArraySource;
use crate::error::{Error, Result};
use crate::reachability::ReachabilityMode;

// =============================================================================
// Queries
// =============================================================================

/// One independent read against the array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    ProtectionGroups,
    Schedules,
    HostGroups,
    ConnectedVolumes,
    ProtectedVolumes,
    AllVolumes,
}

/// Result of one query
#[derive(Debug)]
enum Collection {
    ProtectionGroups(Vec<ProtectionGroup>),
    Schedules(Vec<ProtectionSchedule>),
    HostGroups(Vec<HostGroup>),
    ConnectedVolumes(Vec<Volume>),
    ProtectedVolumes(Vec<Volume>),
    AllVolumes(Vec<Volume>),
}

impl Query {
    async fn run(self, source: &dyn ArraySource) -> Result<Collection> {
        Ok(match self {
            Query::ProtectionGroups => {
                Collection::ProtectionGroups(source.list_protection_groups().await?)
            }
            Query::Schedules => Collection::Schedules(source.list_schedules().await?),
            Query::HostGroups => Collection::HostGroups(source.list_host_groups().await?),
            Query::ConnectedVolumes => {
                Collection::ConnectedVolumes(source.list_connected_volumes().await?)
            }
            Query::ProtectedVolumes => {
                Collection::ProtectedVolumes(source.list_protected_volumes().await?)
            }
            Query::AllVolumes => Collection::AllVolumes(source.list_volumes().await?),
        })
    }
}

/// Set of queries needed for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    queries: Vec<Query>,
}

impl FetchPlan {
    /// Queries the given reachability mode depends on.
    pub fn for_mode(mode: ReachabilityMode) -> Self {
        let queries = match mode {
            ReachabilityMode::Full => vec![
                Query::ProtectionGroups,
                Query::Schedules,
                Query::HostGroups,
                Query::ConnectedVolumes,
                Query::AllVolumes,
            ],
            ReachabilityMode::Direct => vec![
                Query::ProtectionGroups,
                Query::Schedules,
                Query::ProtectedVolumes,
                Query::AllVolumes,
            ],
        };
        Self { queries }
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything read from the array for one run.
///
/// Collections that were not part of the plan stay empty.
#[derive(Debug, Clone, Default)]
pub struct ArraySnapshot {
    pub protection_groups: Vec<ProtectionGroup>,
    pub schedules: Vec<ProtectionSchedule>,
    pub host_groups: Vec<HostGroup>,
    pub connected_volumes: Vec<Volume>,
    pub protected_volumes: Vec<Volume>,
    pub all_volumes: Vec<Volume>,
}

impl ArraySnapshot {
    fn absorb(&mut self, collection: Collection) {
        match collection {
            Collection::ProtectionGroups(items) => self.protection_groups = items,
            Collection::Schedules(items) => self.schedules = items,
            Collection::HostGroups(items) => self.host_groups = items,
            Collection::ConnectedVolumes(items) => self.connected_volumes = items,
            Collection::ProtectedVolumes(items) => self.protected_volumes = items,
            Collection::AllVolumes(items) => self.all_volumes = items,
        }
    }
}

// =============================================================================
// Orchestration
// =============================================================================

/// Run every query of `plan` against `source` on a bounded pool.
#[instrument(skip_all, fields(queries = plan.queries().len(), max_concurrency = max_concurrency))]
pub async fn fetch_snapshot(
    source: Arc<dyn ArraySource>,
    plan: &FetchPlan,
    max_concurrency: usize,
) -> Result<ArraySnapshot> {
    if max_concurrency == 0 {
        return Err(Error::Config("max concurrency must be at least 1".into()));
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let mut join_set = JoinSet::new();

    for &query in plan.queries() {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| Error::Internal(format!("Fetch pool closed: {}", e)))?;
            debug!(?query, "Dispatching query");
            query.run(source.as_ref()).await
        });
    }

    let mut snapshot = ArraySnapshot::default();
    while let Some(joined) = join_set.join_next().await {
        let outcome = joined
            .map_err(|e| Error::Internal(format!("Fetch task failed: {}", e)))
            .and_then(|result| result);

        match outcome {
            Ok(collection) => snapshot.absorb(collection),
            Err(e) => {
                warn!("Query failed, abandoning remaining queries: {}", e);
                join_set.abort_all();
                return Err(e);
            }
        }
    }

    debug!(
        groups = snapshot.protection_groups.len(),
        schedules = snapshot.schedules.len(),
        host_groups = snapshot.host_groups.len(),
        volumes = snapshot.all_volumes.len(),
        "Snapshot complete"
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FailOn, InMemoryArraySource};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn fixture() -> InMemoryArraySource {
        InMemoryArraySource::new()
            .with_group(ProtectionGroup::new("pg1").with_hgroups(["hg1"]))
            .with_schedule(ProtectionSchedule::new("pg1", true, false))
            .with_host_group(HostGroup::new("hg1", ["h1"]))
            .with_connection(Volume::new("v1").connected_to_host("h1"))
            .with_membership(Volume::new("v2").in_group("pg1"))
            .with_volume(Volume::new("v1"))
            .with_volume(Volume::new("v2"))
            .with_volume(Volume::new("v3"))
    }

    // =========================================================================
    // Plan Tests
    // =========================================================================

    #[test]
    fn test_full_plan() {
        let plan = FetchPlan::for_mode(ReachabilityMode::Full);
        assert_eq!(plan.queries().len(), 5);
        assert!(plan.queries().contains(&Query::HostGroups));
        assert!(plan.queries().contains(&Query::ConnectedVolumes));
        assert!(!plan.queries().contains(&Query::ProtectedVolumes));
    }

    #[test]
    fn test_direct_plan() {
        let plan = FetchPlan::for_mode(ReachabilityMode::Direct);
        assert_eq!(plan.queries().len(), 4);
        assert!(plan.queries().contains(&Query::ProtectedVolumes));
        assert!(!plan.queries().contains(&Query::HostGroups));
    }

    // =========================================================================
    // Fetch Tests
    // =========================================================================

    #[tokio::test]
    async fn test_fetch_full_snapshot() {
        let source = Arc::new(fixture());
        let plan = FetchPlan::for_mode(ReachabilityMode::Full);

        let snapshot = fetch_snapshot(source.clone(), &plan, 5).await.unwrap();

        assert_eq!(snapshot.protection_groups.len(), 1);
        assert_eq!(snapshot.schedules.len(), 1);
        assert_eq!(snapshot.host_groups.len(), 1);
        assert_eq!(snapshot.connected_volumes.len(), 1);
        assert_eq!(snapshot.all_volumes.len(), 3);
        assert!(snapshot.protected_volumes.is_empty());
        assert_eq!(source.call_count(), 5);
    }

    #[tokio::test]
    async fn test_fetch_direct_snapshot() {
        let source = Arc::new(fixture());
        let plan = FetchPlan::for_mode(ReachabilityMode::Direct);

        let snapshot = fetch_snapshot(source, &plan, 1).await.unwrap();

        assert_eq!(snapshot.protected_volumes.len(), 1);
        assert!(snapshot.host_groups.is_empty());
        assert!(snapshot.connected_volumes.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_propagates_failure() {
        let source = Arc::new(fixture().failing_on(FailOn::Schedules));
        let plan = FetchPlan::for_mode(ReachabilityMode::Full);

        let err = fetch_snapshot(source, &plan, 5).await.unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_fetch_rejects_zero_concurrency() {
        let source = Arc::new(fixture());
        let plan = FetchPlan::for_mode(ReachabilityMode::Full);

        let result = fetch_snapshot(source, &plan, 0).await;
        assert_matches!(result, Err(Error::Config(_)));
    }

    /// Source that records how many queries run at the same time.
    #[derive(Default)]
    struct GaugedSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl GaugedSource {
        async fn observe<T>(&self) -> Result<Vec<T>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl ArraySource for GaugedSource {
        async fn list_protection_groups(&self) -> Result<Vec<ProtectionGroup>> {
            self.observe().await
        }
        async fn list_schedules(&self) -> Result<Vec<ProtectionSchedule>> {
            self.observe().await
        }
        async fn list_host_groups(&self) -> Result<Vec<HostGroup>> {
            self.observe().await
        }
        async fn list_connected_volumes(&self) -> Result<Vec<Volume>> {
            self.observe().await
        }
        async fn list_protected_volumes(&self) -> Result<Vec<Volume>> {
            self.observe().await
        }
        async fn list_volumes(&self) -> Result<Vec<Volume>> {
            self.observe().await
        }
    }

    /// Source whose schedule query fails at once while every other query
    /// is slow and records whether it ever finished.
    #[derive(Default)]
    struct StalledSource {
        finished: AtomicBool,
    }

    impl StalledSource {
        const STALL: Duration = Duration::from_millis(500);

        async fn stall<T>(&self) -> Result<Vec<T>> {
            tokio::time::sleep(Self::STALL).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl ArraySource for StalledSource {
        async fn list_protection_groups(&self) -> Result<Vec<ProtectionGroup>> {
            self.stall().await
        }
        async fn list_schedules(&self) -> Result<Vec<ProtectionSchedule>> {
            Err(Error::Authentication("session expired".into()))
        }
        async fn list_host_groups(&self) -> Result<Vec<HostGroup>> {
            self.stall().await
        }
        async fn list_connected_volumes(&self) -> Result<Vec<Volume>> {
            self.stall().await
        }
        async fn list_protected_volumes(&self) -> Result<Vec<Volume>> {
            self.stall().await
        }
        async fn list_volumes(&self) -> Result<Vec<Volume>> {
            self.stall().await
        }
    }

    #[tokio::test]
    async fn test_first_failure_aborts_in_flight_queries() {
        let source = Arc::new(StalledSource::default());
        let plan = FetchPlan::for_mode(ReachabilityMode::Full);

        let started = Instant::now();
        let result = fetch_snapshot(source.clone(), &plan, 5).await;
        let elapsed = started.elapsed();

        assert_matches!(result, Err(Error::Authentication(_)));
        assert!(
            elapsed < StalledSource::STALL / 2,
            "fetch waited {:?} for queries that should have been aborted",
            elapsed
        );

        // Outlive the stalled queries; an aborted task never gets to finish
        tokio::time::sleep(StalledSource::STALL * 2).await;
        assert!(!source.finished.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fetch_respects_concurrency_bound() {
        let source = Arc::new(GaugedSource::default());
        let plan = FetchPlan::for_mode(ReachabilityMode::Full);

        fetch_snapshot(source.clone(), &plan, 2).await.unwrap();

        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= 2, "peak concurrency {} exceeded bound", peak);
    }
}
