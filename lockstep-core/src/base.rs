//! Core functionalities.
mod env;
mod policy;
mod robot;
mod sim;
mod step;
mod task;
pub use env::Env;
pub use policy::{Policy, RandomPolicy, ZeroPolicy};
pub use robot::RobotPlugin;
pub use sim::{find_joints, ArticulationData, Simulation};
pub use step::{Step, StepInfo};
pub use task::TaskPlugin;
