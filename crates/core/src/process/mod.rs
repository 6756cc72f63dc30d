//! Worker process lifecycle.
//!
//! The orchestrator spawns one worker process per configured milestone,
//! records its identity in the registry at spawn time, and reaps the
//! record when it exits. Spawning sits behind a trait so the driver is
//! testable without real processes.

mod driver;
mod spawner;

pub use driver::{DriverError, PipelineDriver};
pub use spawner::{LaunchError, TokioWorkerSpawner, WorkerHandle, WorkerSpawner};
