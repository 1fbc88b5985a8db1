//! Audit pipeline: fetch, filter, expand, report.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::DEFAULT_MAX_CONCURRENCY;
use crate::domain::model::VolumeName;
use crate::domain::ports::ArraySource;
use crate::error::Result;
use crate::fetch::{fetch_snapshot, FetchPlan};
use crate::policy::EnabledCheckMode;
use crate::reachability::{protected_volumes, ReachabilityMode};
use crate::report::unprotected;

/// Options for one audit run
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub check_mode: EnabledCheckMode,
    pub reachability: ReachabilityMode,
    pub ignore: Option<String>,
    pub max_concurrency: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            check_mode: EnabledCheckMode::default(),
            reachability: ReachabilityMode::default(),
            ignore: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Names of the volumes no enabled protection group covers, sorted.
///
/// Any failed query fails the whole run; no partial result is returned.
#[instrument(skip_all, fields(check_mode = %options.check_mode, reachability = %options.reachability))]
pub async fn find_unprotected(
    source: Arc<dyn ArraySource>,
    options: &AuditOptions,
) -> Result<Vec<VolumeName>> {
    let plan = FetchPlan::for_mode(options.reachability);
    let snapshot = fetch_snapshot(source, &plan, options.max_concurrency).await?;

    let protected = protected_volumes(&snapshot, options.reachability, options.check_mode);
    let report = unprotected(&snapshot.all_volumes, &protected, options.ignore.as_deref());

    info!(
        total = snapshot.all_volumes.len(),
        protected = protected.len(),
        unprotected = report.len(),
        "Audit complete"
    );

    Ok(report)
}
