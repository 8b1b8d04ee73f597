//! Robot plugin contract.
use super::Simulation;
use crate::{logger::ScalarLogger, record::Record, space::SpaceDecl};
use anyhow::Result;
use ndarray::{Array1, Array2, ArrayView2};

/// Agent-specific behavior: actuation state and robot-level reward and termination terms.
///
/// A robot owns its action buffers and everything derived from them. The driver
/// calls the methods in the order documented on
/// [`EnvironmentDriver`](crate::EnvironmentDriver); methods taking `env_ids`
/// must leave the rows of other slots untouched.
pub trait RobotPlugin {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Dimensions this robot contributes to the composed spaces.
    fn spaces(&self) -> SpaceDecl;

    /// Registers the metrics this robot logs from [`RobotPlugin::compute_rewards`].
    fn register_logs(&self, _logger: &mut ScalarLogger) -> Result<()> {
        Ok(())
    }

    /// Clears the actuation buffers of the given slots, or of all slots if `None`.
    fn initialize_buffers(&mut self, env_ids: Option<&[usize]>);

    /// Binds to the articulation, e.g. resolves joint indices.
    ///
    /// Called once after construction, before any step.
    fn run_setup(&mut self, sim: &dyn Simulation) -> Result<()>;

    /// Moves the current actions to the previous-action buffer, adopts `actions`
    /// and derives the actuation command. Does not touch the simulation.
    fn process_actions(&mut self, actions: ArrayView2<f32>);

    /// Pre-integration derived quantities, e.g. a motor model.
    fn compute_physics(&mut self) {}

    /// Issues the actuation command; called once per physics sub-step.
    fn apply_actions(&mut self, sim: &mut dyn Simulation);

    /// The robot's slice of the observation, `N × spaces().observation`.
    fn get_observations(&self, sim: &dyn Simulation) -> Array2<f32>;

    /// The robot's slice of the privileged state, `N × spaces().state`.
    fn get_states(&self, sim: &dyn Simulation) -> Array2<f32> {
        Array2::zeros((sim.num_envs(), 0))
    }

    /// Robot-level reward terms, one value per slot.
    ///
    /// Logs its terms into `logger` before returning.
    fn compute_rewards(&self, sim: &dyn Simulation, logger: &mut ScalarLogger)
        -> Result<Array1<f32>>;

    /// `(early_termination, clean_termination)` signals. The default never terminates.
    fn get_dones(&self, sim: &dyn Simulation) -> (Array1<bool>, Array1<bool>) {
        let n = sim.num_envs();
        (Array1::from_elem(n, false), Array1::from_elem(n, false))
    }

    /// Per-episode extras for the slots being reset, merged into the step log.
    fn compute_logs(&self, _env_ids: &[usize]) -> Record {
        Record::empty()
    }

    /// Reinitializes actuation state of the given slots.
    ///
    /// Must zero the previous-action rows of those slots. `generator_actions`
    /// has one row per entry of `env_ids` and `spaces().generator` columns;
    /// `seeds` has one seed per entry of `env_ids`.
    fn reset(
        &mut self,
        env_ids: &[usize],
        generator_actions: Option<ArrayView2<f32>>,
        seeds: Option<&[u64]>,
    );

    /// Writes the initial actuation state of the given slots to the simulation.
    fn set_initial_conditions(&mut self, env_ids: &[usize], sim: &mut dyn Simulation);

    /// Actions adopted at the last [`RobotPlugin::process_actions`].
    fn actions(&self) -> ArrayView2<f32>;

    /// Actions of the step before.
    fn previous_actions(&self) -> ArrayView2<f32>;
}
