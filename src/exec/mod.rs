//! Subprocess execution inside conda environments

pub mod runner;

pub use runner::{display_args, env_invocation, CommandOutput, CommandRunner, SystemRunner};
