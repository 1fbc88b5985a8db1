//! pgaudit - Protection Gap Finder for FlashArray
//!
//! Lists the volumes on an array that no enabled protection group covers,
//! so operators can spot backup and replication gaps.
//!
//! # Architecture
//!
//! ```text
//! ArraySource → Fetch Orchestrator → Eligibility Filter → Reachability Builder → Report
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - REST and in-memory implementations of the array port
//! - [`audit`] - The end-to-end pipeline
//! - [`config`] - Connection settings and credential resolution
//! - [`domain`] - Typed records and the `ArraySource` port
//! - [`error`] - Error types and exit codes
//! - [`fetch`] - Concurrent query orchestration
//! - [`policy`] - Protection group eligibility
//! - [`prompt`] - Interactive password prompt
//! - [`reachability`] - Protected volume computation
//! - [`report`] - Unprotected volume listing

pub mod adapters;
pub mod audit;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod policy;
pub mod prompt;
pub mod reachability;
pub mod report;

// Re-export commonly used types
pub use adapters::{FlashArrayClient, InMemoryArraySource};
pub use audit::{find_unprotected, AuditOptions};
pub use config::{ArrayConfig, Credentials};
pub use domain::ArraySource;
pub use error::{Error, Result};
pub use policy::EnabledCheckMode;
pub use reachability::{compute_protected_volumes, ReachabilityMode};
pub use report::unprotected;
