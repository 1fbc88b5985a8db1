//! Infrastructure Adapters
//!
//! Implementations of the [`ArraySource`](crate::domain::ArraySource) port.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               ArraySource (port)             │
//! └──────────────────────────────────────────────┘
//!                       │
//!           ┌───────────┴────────────┐
//!           ▼                        ▼
//!   FlashArrayClient          InMemoryArraySource
//!   (Purity REST 1.x)         (fixtures, replay)
//! ```

mod flasharray;
mod in_memory;

pub use flasharray::FlashArrayClient;
pub use in_memory::{FailOn, InMemoryArraySource};
