//! Registries of the built-in plugins.
use crate::{
    robots::Jetbot,
    tasks::{GoThroughPositions, GoToPosition},
};
use anyhow::Result;
use lockstep_core::registry::{RobotRegistry, TaskRegistry};

/// Robots shipped with this crate.
pub fn builtin_robots() -> Result<RobotRegistry> {
    let mut registry = RobotRegistry::new("robot");
    registry.register(Jetbot::TYPE, Jetbot::build)?;
    Ok(registry)
}

/// Tasks shipped with this crate.
pub fn builtin_tasks() -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new("task");
    registry.register(GoToPosition::TYPE, GoToPosition::build)?;
    registry.register(GoThroughPositions::TYPE, GoThroughPositions::build)?;
    Ok(registry)
}
