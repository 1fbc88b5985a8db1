//! Domain Layer
//!
//! - **Model** (`model.rs`) - Typed identifiers and the records read from the array
//! - **Ports** (`ports.rs`) - The [`ArraySource`] abstraction over the array

pub mod model;
pub mod ports;

pub use model::{
    GroupName, HostGroup, HostGroupName, HostName, ProtectionGroup, ProtectionSchedule,
    ReplicationTarget, Volume, VolumeName,
};
pub use ports::ArraySource;
