//! Testing utilities and mock implementations.
//!
//! Mock versions of the process-facing traits, so orchestration tests
//! never touch real OS processes.

mod mock_spawner;
mod mock_terminator;

pub use mock_spawner::MockSpawner;
pub use mock_terminator::MockTerminator;
