//! Differential-drive robot with two velocity-controlled wheels.
use anyhow::Result;
use lockstep_core::{
    find_joints,
    logger::{Aggregation, ScalarLogger},
    registry::PluginContext,
    LockstepError, PluginConfig, RobotPlugin, Simulation, SpaceDecl,
};
use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Configuration of [`Jetbot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JetbotConfig {
    /// Wheel velocity in rad/s commanded by an action of 1.
    pub max_wheel_velocity: f32,

    /// Weight of the squared change of the actions between two steps.
    pub rew_action_rate_scale: f32,

    /// Weight of the squared wheel accelerations.
    pub rew_joint_accel_scale: f32,

    /// Names of the left and right wheel joints.
    pub wheel_joint_names: Vec<String>,
}

impl Default for JetbotConfig {
    fn default() -> Self {
        Self {
            max_wheel_velocity: 10.0,
            rew_action_rate_scale: -0.12,
            rew_joint_accel_scale: -2.5e-6,
            wheel_joint_names: vec!["left_wheel_joint".to_string(), "right_wheel_joint".to_string()],
        }
    }
}

impl JetbotConfig {
    /// Sets the wheel velocity commanded by a unit action.
    pub fn max_wheel_velocity(mut self, v: f32) -> Self {
        self.max_wheel_velocity = v;
        self
    }

    /// Sets the reward weights of the action rate and the wheel accelerations.
    pub fn reward_scales(mut self, action_rate: f32, joint_accel: f32) -> Self {
        self.rew_action_rate_scale = action_rate;
        self.rew_joint_accel_scale = joint_accel;
        self
    }
}

/// Two-wheeled robot driven by wheel velocity targets.
///
/// Actions are clipped to `[-1, 1]` and scaled by `max_wheel_velocity`. The
/// robot observes its own clipped actions and penalizes the action rate and the
/// wheel accelerations.
pub struct Jetbot {
    config: JetbotConfig,
    actions: Array2<f32>,
    previous_actions: Array2<f32>,
    wheel_cmd: Array2<f32>,
    joint_ids: Vec<usize>,
}

impl Jetbot {
    /// Tag of the robot in the registry.
    pub const TYPE: &'static str = "jetbot";

    const NUM_ACTIONS: usize = 2;

    /// Creates the robot for `num_envs` slots.
    pub fn new(config: JetbotConfig, num_envs: usize) -> Self {
        let shape = (num_envs, Self::NUM_ACTIONS);
        Self {
            config,
            actions: Array2::zeros(shape),
            previous_actions: Array2::zeros(shape),
            wheel_cmd: Array2::zeros(shape),
            joint_ids: vec![],
        }
    }

    /// Registry constructor.
    pub fn build(config: &PluginConfig, ctx: PluginContext) -> Result<Box<dyn RobotPlugin>> {
        Ok(Box::new(Self::new(config.settings()?, ctx.num_envs)))
    }

    /// Wheel velocity command of the current actions, `N × 2`.
    pub fn wheel_command(&self) -> ArrayView2<f32> {
        self.wheel_cmd.view()
    }
}

impl RobotPlugin for Jetbot {
    fn name(&self) -> &str {
        Self::TYPE
    }

    fn spaces(&self) -> SpaceDecl {
        SpaceDecl::new(2, 2, 0, 0)
    }

    fn register_logs(&self, logger: &mut ScalarLogger) -> Result<()> {
        logger.add_log("Robot", "action_rate", Aggregation::Mean)?;
        logger.add_log("Robot", "joint_acceleration", Aggregation::Mean)
    }

    fn initialize_buffers(&mut self, env_ids: Option<&[usize]>) {
        match env_ids {
            None => {
                self.actions.fill(0.0);
                self.previous_actions.fill(0.0);
                self.wheel_cmd.fill(0.0);
            }
            Some(ids) => {
                for &ix in ids {
                    self.actions.row_mut(ix).fill(0.0);
                    self.previous_actions.row_mut(ix).fill(0.0);
                    self.wheel_cmd.row_mut(ix).fill(0.0);
                }
            }
        }
    }

    fn run_setup(&mut self, sim: &dyn Simulation) -> Result<()> {
        let joint_ids = find_joints(sim, &self.config.wheel_joint_names)?;
        if joint_ids.len() != Self::NUM_ACTIONS {
            return Err(LockstepError::SpaceMismatch {
                component: Self::TYPE.to_string(),
                space: "action",
                declared: Self::NUM_ACTIONS,
                actual: joint_ids.len(),
            }
            .into());
        }
        debug!("Jetbot wheel joints: {:?}", joint_ids);
        self.joint_ids = joint_ids;
        Ok(())
    }

    fn process_actions(&mut self, actions: ArrayView2<f32>) {
        self.previous_actions.assign(&self.actions);
        self.actions.assign(&actions.mapv(|a| a.clamp(-1.0, 1.0)));
        self.wheel_cmd = &self.actions * self.config.max_wheel_velocity;
    }

    fn apply_actions(&mut self, sim: &mut dyn Simulation) {
        sim.set_joint_velocity_target(self.wheel_cmd.view(), &self.joint_ids);
    }

    fn get_observations(&self, _sim: &dyn Simulation) -> Array2<f32> {
        self.actions.clone()
    }

    fn compute_rewards(
        &self,
        sim: &dyn Simulation,
        logger: &mut ScalarLogger,
    ) -> Result<Array1<f32>> {
        let action_rate = (&self.actions - &self.previous_actions)
            .mapv(|d| d * d)
            .sum_axis(Axis(1));
        let joint_accel = sim
            .data()
            .joint_acc
            .select(Axis(1), &self.joint_ids)
            .mapv(|a| a * a)
            .sum_axis(Axis(1));

        logger.log("Robot", "action_rate", action_rate.view())?;
        logger.log("Robot", "joint_acceleration", joint_accel.view())?;

        Ok(action_rate * self.config.rew_action_rate_scale
            + joint_accel * self.config.rew_joint_accel_scale)
    }

    fn reset(
        &mut self,
        env_ids: &[usize],
        _generator_actions: Option<ArrayView2<f32>>,
        _seeds: Option<&[u64]>,
    ) {
        trace!("Jetbot::reset()");
        self.initialize_buffers(Some(env_ids));
    }

    fn set_initial_conditions(&mut self, env_ids: &[usize], sim: &mut dyn Simulation) {
        let zeros = Array2::zeros((env_ids.len(), self.joint_ids.len()));
        sim.write_joint_state(env_ids, &self.joint_ids, zeros.view(), zeros.view());
    }

    fn actions(&self) -> ArrayView2<f32> {
        self.actions.view()
    }

    fn previous_actions(&self) -> ArrayView2<f32> {
        self.previous_actions.view()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{PlanarSim, PlanarSimConfig};
    use ndarray::array;

    fn setup(num_envs: usize) -> Result<(Jetbot, PlanarSim, ScalarLogger)> {
        let sim = PlanarSim::new(num_envs, PlanarSimConfig::default())?;
        let mut robot = Jetbot::new(JetbotConfig::default(), num_envs);
        let mut logger = ScalarLogger::new(num_envs);
        robot.register_logs(&mut logger)?;
        robot.run_setup(&sim)?;
        robot.initialize_buffers(None);
        Ok((robot, sim, logger))
    }

    #[test]
    fn test_actions_are_clipped_and_scaled() -> Result<()> {
        let (mut robot, _, _) = setup(2)?;
        robot.process_actions(array![[2.0, -0.5], [0.0, -3.0]].view());
        robot.process_actions(array![[0.5, 0.5], [1.0, 1.0]].view());

        assert_eq!(robot.previous_actions(), array![[1.0, -0.5], [0.0, -1.0]]);
        assert_eq!(robot.wheel_command(), array![[5.0, 5.0], [10.0, 10.0]]);
        Ok(())
    }

    #[test]
    fn test_reward_reads_joint_acceleration() -> Result<()> {
        let (mut robot, mut sim, mut logger) = setup(2)?;
        robot.process_actions(array![[1.0, 1.0], [0.0, 0.0]].view());
        robot.apply_actions(&mut sim);
        sim.step();
        sim.sync();

        let reward = robot.compute_rewards(&sim, &mut logger)?;
        let acc = sim.data().joint_acc.row(0).mapv(|a| a * a).sum();

        assert!(acc > 0.0);
        let expected = 2.0 * -0.12 + acc * -2.5e-6;
        assert!((reward[0] - expected).abs() < 1e-5);
        assert_eq!(reward[1], 0.0);
        Ok(())
    }

    #[test]
    fn test_reset_zeroes_only_given_slots() -> Result<()> {
        let (mut robot, _, _) = setup(3)?;
        robot.process_actions(Array2::from_elem((3, 2), 0.5).view());
        robot.process_actions(Array2::from_elem((3, 2), 0.25).view());
        robot.reset(&[1], None, None);

        assert_eq!(robot.actions().row(1).to_vec(), vec![0.0, 0.0]);
        assert_eq!(robot.previous_actions().row(1).to_vec(), vec![0.0, 0.0]);
        assert_eq!(robot.previous_actions().row(0).to_vec(), vec![0.5, 0.5]);
        assert_eq!(robot.actions().row(2).to_vec(), vec![0.25, 0.25]);
        Ok(())
    }

    #[test]
    fn test_missing_wheel_joint() -> Result<()> {
        let sim = PlanarSim::new(1, PlanarSimConfig::default())?;
        let config = JetbotConfig {
            wheel_joint_names: vec!["left_wheel_joint".into(), "caster".into()],
            ..JetbotConfig::default()
        };
        let err = Jetbot::new(config, 1).run_setup(&sim).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LockstepError>(),
            Some(&LockstepError::UnknownJoint("caster".into()))
        );

        let config = JetbotConfig {
            wheel_joint_names: vec!["left_wheel_joint".into()],
            ..JetbotConfig::default()
        };
        let err = Jetbot::new(config, 1).run_setup(&sim).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LockstepError>(),
            Some(LockstepError::SpaceMismatch { actual: 1, .. })
        ));
        Ok(())
    }
}
