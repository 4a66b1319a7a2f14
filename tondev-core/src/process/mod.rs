//! Child process execution with output streamed to a terminal.

pub mod runner;

pub use runner::{run, ProcessRunner, SpawnOptions};
