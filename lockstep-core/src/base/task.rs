//! Task plugin contract.
use super::{RobotPlugin, Simulation};
use crate::{logger::ScalarLogger, record::Record, space::SpaceDecl};
use anyhow::Result;
use ndarray::{Array1, Array2, ArrayView2};

/// Objective-specific behavior: goals, task reward and termination terms.
///
/// A task reads the robot through `&dyn RobotPlugin` and the articulation through
/// `&dyn Simulation`; neither can be mutated from the reward or termination terms.
/// Only [`TaskPlugin::reset`] may write the simulation, to place the robot at
/// the start of an episode.
pub trait TaskPlugin {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Dimensions this task contributes to the composed spaces.
    fn spaces(&self) -> SpaceDecl;

    /// Registers the metrics this task logs.
    fn register_logs(&self, _logger: &mut ScalarLogger) -> Result<()> {
        Ok(())
    }

    /// Binds to the robot and captures the spatial origins of the slots.
    fn run_setup(&mut self, robot: &dyn RobotPlugin, sim: &dyn Simulation) -> Result<()>;

    /// Receives the task's columns of the action batch. Only called when the task
    /// declares a non-zero action width.
    fn process_actions(&mut self, _actions: ArrayView2<f32>) {}

    /// The task's slice of the observation, `N × spaces().observation`.
    fn get_observations(&self, robot: &dyn RobotPlugin, sim: &dyn Simulation) -> Array2<f32>;

    /// The task's slice of the privileged state, `N × spaces().state`.
    fn get_states(&self, _robot: &dyn RobotPlugin, sim: &dyn Simulation) -> Array2<f32> {
        Array2::zeros((sim.num_envs(), 0))
    }

    /// Task reward terms, one value per slot.
    ///
    /// Called after [`TaskPlugin::get_dones`] in the same step; goal transitions
    /// (e.g. moving on to the next waypoint) happen here.
    fn compute_rewards(
        &mut self,
        robot: &dyn RobotPlugin,
        sim: &dyn Simulation,
        logger: &mut ScalarLogger,
    ) -> Result<Array1<f32>>;

    /// `(early_termination, clean_termination)` signals from the current state.
    fn get_dones(
        &mut self,
        robot: &dyn RobotPlugin,
        sim: &dyn Simulation,
    ) -> (Array1<bool>, Array1<bool>);

    /// Per-episode extras for the slots being reset, merged into the step log.
    fn compute_logs(&self, _env_ids: &[usize]) -> Record {
        Record::empty()
    }

    /// Generates new goals for the given slots and places the robot.
    ///
    /// `generator_actions` has one row per entry of `env_ids` and
    /// `spaces().generator` columns; `seeds` has one seed per entry of `env_ids`.
    fn reset(
        &mut self,
        env_ids: &[usize],
        generator_actions: Option<ArrayView2<f32>>,
        seeds: Option<&[u64]>,
        robot: &dyn RobotPlugin,
        sim: &mut dyn Simulation,
    );

    /// Creates debug markers. Best effort.
    fn create_task_visualization(&mut self, _sim: &mut dyn Simulation) {}

    /// Updates debug markers after a step. Best effort.
    fn update_task_visualization(&self, _sim: &mut dyn Simulation) {}
}
