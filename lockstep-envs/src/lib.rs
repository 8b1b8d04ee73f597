#![warn(missing_docs)]
//! Reference plugins and simulation for `lockstep-core`.
//!
//! * [`robots::Jetbot`] - differential-drive robot with two wheels
//! * [`tasks::GoToPosition`] - drive to a goal and stay there
//! * [`tasks::GoThroughPositions`] - drive through a sequence of waypoints
//! * [`sim::PlanarSim`] - kinematic simulation of differential-drive robots
//!
//! ```no_run
//! use lockstep_envs::RunConfig;
//! # fn main() -> anyhow::Result<()> {
//! let mut env = RunConfig::load("run.yaml")?.make_env()?;
//! let act = ndarray::Array2::zeros((env.num_envs(), env.spaces().action));
//! let step = env.step(act.view())?;
//! # Ok(())
//! # }
//! ```
pub mod robots;
pub mod sim;
pub mod tasks;

mod config;
mod registry;
pub use config::RunConfig;
pub use registry::{builtin_robots, builtin_tasks};
