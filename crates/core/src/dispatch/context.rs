use std::sync::Arc;

use tokio::sync::Mutex;

use crate::registry::MilestoneRegistry;
use crate::transcript::Transcript;

/// The mutable state confined to the call runner: the milestone registry
/// plus the worker log transcript.
#[derive(Debug, Default)]
pub struct CallContext {
    pub registry: MilestoneRegistry,
    pub transcript: Transcript,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The context handle shared between the call runner and the lifetime
/// watchdog. The mutex is held briefly, per unit or per watchdog tick.
pub type SharedCallContext = Arc<Mutex<CallContext>>;

/// Build a fresh shared context for one orchestrator lifetime.
pub fn shared_context() -> SharedCallContext {
    Arc::new(Mutex::new(CallContext::new()))
}
