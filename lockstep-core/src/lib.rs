#![warn(missing_docs)]
//! Core of a batched robot-learning environment.
//!
//! An environment is composed of a robot plugin, which owns actuation, and a
//! task plugin, which owns goals. [`EnvironmentDriver`] steps `N` independent
//! copies of the pair in lockstep on top of a [`Simulation`], resets the slots
//! that end an episode and aggregates per-episode metrics.
pub mod config;
pub mod dummy;
pub mod error;
pub mod logger;
pub mod record;
pub mod registry;
pub mod space;
pub mod util;

mod base;
pub use base::{
    find_joints, ArticulationData, Env, Policy, RandomPolicy, RobotPlugin, Simulation, Step,
    StepInfo, TaskPlugin, ZeroPolicy,
};

mod driver;
pub use config::{EnvConfig, PluginConfig};
pub use driver::EnvironmentDriver;
pub use error::LockstepError;
pub use logger::{Aggregation, ScalarLogger};
pub use space::{ComposedSpaces, Space, SpaceDecl, SpaceSizes};
