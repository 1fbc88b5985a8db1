//! Domain Ports (Port/Adapter Pattern)
//!
//! The audit core only sees the array through [`ArraySource`]. The REST
//! client and the in-memory fixture both implement it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   Fetch Orchestrator → Eligibility → Reach   │
//! └──────────────────────────────────────────────┘
//!                       │ ArraySource
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │  FlashArrayClient │ InMemoryArraySource      │
//! └──────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;

use super::model::{HostGroup, ProtectionGroup, ProtectionSchedule, Volume};
use crate::error::Result;

/// Read-only view of one array.
///
/// Every method is an independent query; implementations must be safe to
/// call concurrently from several tasks.
#[async_trait]
pub trait ArraySource: Send + Sync {
    /// Protection groups with their member and target lists.
    async fn list_protection_groups(&self) -> Result<Vec<ProtectionGroup>>;

    /// Protection groups with their schedule flags.
    async fn list_schedules(&self) -> Result<Vec<ProtectionSchedule>>;

    /// Host groups with their member hosts.
    async fn list_host_groups(&self) -> Result<Vec<HostGroup>>;

    /// Volumes annotated with the host or host group they are connected to.
    async fn list_connected_volumes(&self) -> Result<Vec<Volume>>;

    /// Volumes annotated with the protection group they are a direct member of.
    async fn list_protected_volumes(&self) -> Result<Vec<Volume>>;

    /// Every volume on the array.
    async fn list_volumes(&self) -> Result<Vec<Volume>>;
}
