#![warn(missing_docs)]
//! Vectorized robot/task environments for reinforcement learning.
//!
//! This crate bundles the environment driver ([`core`]), the reference
//! plugins on the planar simulation ([`envs`]) and the run exports
//! ([`metrics`]). The `lockstep` binary runs a fixed policy on a configured
//! environment and writes the metrics table of the run.
pub use lockstep_core as core;
pub use lockstep_envs as envs;
pub use lockstep_metrics as metrics;

pub use lockstep_core::{Env, EnvConfig, EnvironmentDriver, LockstepError, PluginConfig, Step};
pub use lockstep_envs::RunConfig;
pub use lockstep_metrics::{CsvRecorder, RunMetadata};
