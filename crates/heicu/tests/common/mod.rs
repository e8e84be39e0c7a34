//! Shared test utilities for heicu integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a session to recording collaborators
//! - `ScriptedDecoder`, `RecordingProvider` and `RecordingSink` test doubles

pub mod doubles;
pub mod harness;

#[allow(unused_imports)]
pub use doubles::*;
pub use harness::TestHarness;
