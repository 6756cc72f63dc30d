//! Milestone intelligence registry.
//!
//! One mutable record per pipeline stage, in fixed stage order. All
//! RPC-driven mutation goes through the call dispatcher; the lifetime
//! watchdog is the only other writer and synchronizes through the shared
//! context mutex.

mod record;
mod types;

pub use record::MilestoneRegistry;
pub use types::{MilestoneCondition, MilestoneIntelligence, MilestoneKind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown milestone kind: {0}")]
    UnknownKind(String),

    #[error("invalid condition transition for {kind}: {from} -> {to}")]
    InvalidTransition {
        kind: &'static str,
        from: &'static str,
        to: &'static str,
    },

    #[error("milestone {0} is not running")]
    NotRunning(&'static str),
}
