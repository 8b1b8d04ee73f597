//! Drive to a goal position and stay there.
use super::common::{base_observations, point_around, polar_error, SpawnRange};
use anyhow::Result;
use lockstep_core::{
    logger::{Aggregation, ScalarLogger},
    registry::PluginContext,
    util::{lerp, unit_samples},
    PluginConfig, RobotPlugin, Simulation, SpaceDecl, TaskPlugin,
};
use log::trace;
use ndarray::{Array1, Array2, ArrayView2, Zip};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Configuration of [`GoToPosition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoToPositionConfig {
    /// Goals are drawn within this radius of the slot origin.
    pub goal_spawn_radius: f32,

    /// Smallest initial distance of the robot to the goal.
    pub spawn_min_distance: f32,

    /// Largest initial distance of the robot to the goal.
    pub spawn_max_distance: f32,

    /// Largest initial angle between the robot's heading and the goal, in radians.
    pub spawn_max_heading_error: f32,

    /// The episode fails beyond this distance to the goal.
    pub maximum_robot_distance: f32,

    /// The goal is reached within this distance.
    pub position_tolerance: f32,

    /// The episode succeeds after this many consecutive steps within tolerance.
    pub reset_after_n_steps_in_tolerance: u32,

    /// Weight of the decrease of the distance over one step.
    pub progress_weight: f32,

    /// Length scale of `exp(-distance / coeff)`.
    pub position_exponential_reward_coeff: f32,

    /// Weight of the position reward.
    pub position_weight: f32,

    /// Angle scale of `exp(-|heading error| / coeff)`.
    pub heading_exponential_reward_coeff: f32,

    /// Weight of the heading reward.
    pub heading_weight: f32,

    /// Paid once when the robot leaves the allowed area.
    pub boundary_penalty: f32,

    /// Paid at every step.
    pub time_penalty: f32,
}

impl Default for GoToPositionConfig {
    fn default() -> Self {
        Self {
            goal_spawn_radius: 1.0,
            spawn_min_distance: 0.5,
            spawn_max_distance: 3.0,
            spawn_max_heading_error: FRAC_PI_2,
            maximum_robot_distance: 6.0,
            position_tolerance: 0.1,
            reset_after_n_steps_in_tolerance: 30,
            progress_weight: 1.0,
            position_exponential_reward_coeff: 0.25,
            position_weight: 1.0,
            heading_exponential_reward_coeff: 0.25,
            heading_weight: 0.05,
            boundary_penalty: 10.0,
            time_penalty: 0.0,
        }
    }
}

/// Single-goal navigation task.
///
/// Generator actions, one row per reset slot, are five unit samples: goal radius,
/// goal angle, spawn distance, spawn bearing and spawn heading error.
pub struct GoToPosition {
    config: GoToPositionConfig,
    goals: Array2<f32>,
    previous_distance: Array1<f32>,
    steps_in_tolerance: Array1<u32>,
    boundary_violation: Array1<bool>,
    origins: Array2<f32>,
    rng: SmallRng,
}

impl GoToPosition {
    /// Tag of the task in the registry.
    pub const TYPE: &'static str = "go_to_position";

    /// Creates the task for `num_envs` slots.
    pub fn new(config: GoToPositionConfig, num_envs: usize, seed: u64) -> Self {
        Self {
            config,
            goals: Array2::zeros((num_envs, 2)),
            previous_distance: Array1::zeros(num_envs),
            steps_in_tolerance: Array1::zeros(num_envs),
            boundary_violation: Array1::from_elem(num_envs, false),
            origins: Array2::zeros((num_envs, 2)),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Registry constructor.
    pub fn build(config: &PluginConfig, ctx: PluginContext) -> Result<Box<dyn TaskPlugin>> {
        Ok(Box::new(Self::new(config.settings()?, ctx.num_envs, ctx.seed)))
    }

    /// Goal positions in the world frame, `N × 2`.
    pub fn goals(&self) -> ArrayView2<f32> {
        self.goals.view()
    }

    /// Consecutive steps within tolerance, per slot.
    pub fn steps_in_tolerance(&self) -> &Array1<u32> {
        &self.steps_in_tolerance
    }

    fn errors(&self, sim: &dyn Simulation) -> (Array1<f32>, Array1<f32>) {
        let data = sim.data();
        let n = data.num_envs();
        let mut distance = Array1::zeros(n);
        let mut heading_error = Array1::zeros(n);
        for ix in 0..n {
            let (d, h) = polar_error(data, ix, self.goals.row(ix));
            distance[ix] = d;
            heading_error[ix] = h;
        }
        (distance, heading_error)
    }

    fn spawn_range(&self) -> SpawnRange {
        SpawnRange {
            min_distance: self.config.spawn_min_distance,
            max_distance: self.config.spawn_max_distance,
            max_heading_error: self.config.spawn_max_heading_error,
        }
    }
}

impl TaskPlugin for GoToPosition {
    fn name(&self) -> &str {
        Self::TYPE
    }

    fn spaces(&self) -> SpaceDecl {
        SpaceDecl::new(0, 6, 0, 5)
    }

    fn register_logs(&self, logger: &mut ScalarLogger) -> Result<()> {
        logger.add_log("Task", "distance", Aggregation::Mean)?;
        logger.add_log("Task", "heading_error", Aggregation::Mean)?;
        logger.add_log("Task", "progress_reward", Aggregation::Sum)?;
        logger.add_log("Task", "position_reward", Aggregation::Sum)?;
        logger.add_log("Task", "heading_reward", Aggregation::Sum)?;
        logger.add_log("Task", "in_tolerance", Aggregation::Max)
    }

    fn run_setup(&mut self, _robot: &dyn RobotPlugin, sim: &dyn Simulation) -> Result<()> {
        self.origins = sim.env_origins().to_owned();
        Ok(())
    }

    fn get_observations(&self, _robot: &dyn RobotPlugin, sim: &dyn Simulation) -> Array2<f32> {
        let (distance, heading_error) = self.errors(sim);
        base_observations(sim.data(), &distance, &heading_error)
    }

    fn compute_rewards(
        &mut self,
        _robot: &dyn RobotPlugin,
        sim: &dyn Simulation,
        logger: &mut ScalarLogger,
    ) -> Result<Array1<f32>> {
        let c = &self.config;
        let (distance, heading_error) = self.errors(sim);
        let progress = (&self.previous_distance - &distance) * c.progress_weight;
        let position = distance.mapv(|d| (-d / c.position_exponential_reward_coeff).exp())
            * c.position_weight;
        let heading = heading_error
            .mapv(|h| (-h.abs() / c.heading_exponential_reward_coeff).exp())
            * c.heading_weight;
        let penalty = self
            .boundary_violation
            .mapv(|b| if b { c.boundary_penalty } else { 0.0 })
            + c.time_penalty;
        let in_tolerance = distance.mapv(|d| (d < c.position_tolerance) as u8 as f32);

        logger.log("Task", "distance", distance.view())?;
        logger.log("Task", "heading_error", heading_error.mapv(f32::abs).view())?;
        logger.log("Task", "progress_reward", progress.view())?;
        logger.log("Task", "position_reward", position.view())?;
        logger.log("Task", "heading_reward", heading.view())?;
        logger.log("Task", "in_tolerance", in_tolerance.view())?;

        self.previous_distance = distance;
        Ok(progress + position + heading - penalty)
    }

    fn get_dones(
        &mut self,
        _robot: &dyn RobotPlugin,
        sim: &dyn Simulation,
    ) -> (Array1<bool>, Array1<bool>) {
        let (distance, _) = self.errors(sim);
        let tolerance = self.config.position_tolerance;
        Zip::from(&mut self.steps_in_tolerance)
            .and(&distance)
            .for_each(|n, &d| *n = if d < tolerance { *n + 1 } else { 0 });

        self.boundary_violation = distance.mapv(|d| d > self.config.maximum_robot_distance);
        let target = self.config.reset_after_n_steps_in_tolerance;
        let success = self.steps_in_tolerance.mapv(|n| n >= target);
        (self.boundary_violation.clone(), success)
    }

    fn reset(
        &mut self,
        env_ids: &[usize],
        generator_actions: Option<ArrayView2<f32>>,
        seeds: Option<&[u64]>,
        _robot: &dyn RobotPlugin,
        sim: &mut dyn Simulation,
    ) {
        trace!("GoToPosition::reset()");
        let u = unit_samples(&mut self.rng, env_ids.len(), 5, generator_actions, seeds);
        let spawn = self.spawn_range();
        let mut pose = Array2::zeros((env_ids.len(), 3));

        for (k, &ix) in env_ids.iter().enumerate() {
            let origin = [self.origins[[ix, 0]], self.origins[[ix, 1]]];
            let goal = point_around(origin, self.config.goal_spawn_radius, [u[[k, 0]], u[[k, 1]]]);
            let p = spawn.pose(goal, [u[[k, 2]], u[[k, 3]], u[[k, 4]]]);

            self.goals[[ix, 0]] = goal[0];
            self.goals[[ix, 1]] = goal[1];
            pose.row_mut(k).assign(&Array1::from(p.to_vec()));
            self.previous_distance[ix] =
                lerp(spawn.min_distance, spawn.max_distance, u[[k, 2]]);
            self.steps_in_tolerance[ix] = 0;
            self.boundary_violation[ix] = false;
        }

        let velocity = Array2::zeros((env_ids.len(), 3));
        sim.write_root_state(env_ids, pose.view(), velocity.view());
    }

    fn create_task_visualization(&mut self, sim: &mut dyn Simulation) {
        self.update_task_visualization(sim);
    }

    fn update_task_visualization(&self, sim: &mut dyn Simulation) {
        sim.draw_markers("goal", self.goals.view());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        robots::{Jetbot, JetbotConfig},
        sim::{PlanarSim, PlanarSimConfig},
    };
    use ndarray::array;

    fn setup(num_envs: usize) -> Result<(GoToPosition, Jetbot, PlanarSim)> {
        let sim = PlanarSim::new(num_envs, PlanarSimConfig::default().env_spacing(10.0))?;
        let robot = Jetbot::new(JetbotConfig::default(), num_envs);
        let mut task = GoToPosition::new(GoToPositionConfig::default(), num_envs, 0);
        task.run_setup(&robot, &sim)?;
        Ok((task, robot, sim))
    }

    #[test]
    fn test_generator_actions_place_goal_and_robot() -> Result<()> {
        let (mut task, robot, mut sim) = setup(4)?;
        // goal at the origin of slot 3, robot 3 m away along +x, facing the goal
        let g = array![[0.0, 0.0, 1.0, 0.0, 0.5]];
        task.reset(&[3], Some(g.view()), None, &robot, &mut sim);

        let origin = sim.env_origins().row(3).to_owned();
        assert_eq!(task.goals().row(3), origin);
        let data = sim.data();
        assert!((data.root_pos_w[[3, 0]] - origin[0] - 3.0).abs() < 1e-5);
        assert!((data.root_pos_w[[3, 1]] - origin[1]).abs() < 1e-5);

        let obs = task.get_observations(&robot, &sim);
        assert!((obs[[3, 3]] - 3.0).abs() < 1e-5);
        assert!((obs[[3, 4]] - 1.0).abs() < 1e-5);
        // untouched slots keep their default state
        assert_eq!(data.root_pos_w.row(0).to_vec(), vec![0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_seeded_reset_is_reproducible() -> Result<()> {
        let (mut a, robot, mut sim_a) = setup(2)?;
        let (mut b, _, mut sim_b) = setup(2)?;
        // different generators, same per-slot seeds
        b.rng = SmallRng::seed_from_u64(99);
        a.reset(&[0, 1], None, Some(&[5, 6]), &robot, &mut sim_a);
        b.reset(&[1], None, Some(&[6]), &robot, &mut sim_b);

        assert_eq!(a.goals().row(1), b.goals().row(1));
        assert_eq!(sim_a.data().root_pos_w.row(1), sim_b.data().root_pos_w.row(1));
        Ok(())
    }

    #[test]
    fn test_success_after_steps_in_tolerance() -> Result<()> {
        let config = GoToPositionConfig {
            reset_after_n_steps_in_tolerance: 3,
            ..GoToPositionConfig::default()
        };
        let (_, robot, mut sim) = setup(1)?;
        let mut task = GoToPosition::new(config, 1, 0);
        task.run_setup(&robot, &sim)?;
        task.reset(&[0], Some(array![[0.0, 0.0, 0.0, 0.0, 0.5]].view()), None, &robot, &mut sim);
        // put the robot on the goal
        sim.write_root_state(&[0], array![[0.0, 0.0, 0.0]].view(), array![[0.0, 0.0, 0.0]].view());

        let mut logger = ScalarLogger::new(1);
        task.register_logs(&mut logger)?;
        for expected in [false, false, true] {
            let (early, clean) = task.get_dones(&robot, &sim);
            task.compute_rewards(&robot, &sim, &mut logger)?;
            assert!(!early[0]);
            assert_eq!(clean[0], expected);
        }
        Ok(())
    }

    #[test]
    fn test_boundary_violation_is_penalized() -> Result<()> {
        let (mut task, robot, mut sim) = setup(1)?;
        task.reset(&[0], Some(array![[0.0, 0.0, 0.0, 0.0, 0.5]].view()), None, &robot, &mut sim);
        sim.write_root_state(&[0], array![[7.0, 0.0, 0.0]].view(), array![[0.0, 0.0, 0.0]].view());

        let mut logger = ScalarLogger::new(1);
        task.register_logs(&mut logger)?;
        let (early, clean) = task.get_dones(&robot, &sim);
        let reward = task.compute_rewards(&robot, &sim, &mut logger)?;

        assert!(early[0] && !clean[0]);
        assert!(reward[0] < -10.0);
        Ok(())
    }
}
