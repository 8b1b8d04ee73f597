//! Drive through a sequence of waypoints.
use super::common::{base_observations, point_around, polar_error, SpawnRange};
use anyhow::Result;
use lockstep_core::{
    logger::{Aggregation, ScalarLogger},
    record::{Record, RecordValue},
    registry::PluginContext,
    util::{lerp, unit_samples},
    LockstepError, PluginConfig, RobotPlugin, Simulation, SpaceDecl, TaskPlugin,
};
use log::trace;
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Configuration of [`GoThroughPositions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoThroughPositionsConfig {
    /// Number of waypoints per episode.
    pub num_goals: usize,

    /// Number of waypoints after the current one included in the observation.
    pub num_subsequent_goals: usize,

    /// The first waypoint is drawn within this radius of the slot origin.
    pub goal_spawn_radius: f32,

    /// Smallest distance between consecutive waypoints.
    pub min_goal_spacing: f32,

    /// Largest distance between consecutive waypoints.
    pub max_goal_spacing: f32,

    /// Smallest initial distance of the robot to the first waypoint.
    pub spawn_min_distance: f32,

    /// Largest initial distance of the robot to the first waypoint.
    pub spawn_max_distance: f32,

    /// Largest initial angle between the robot's heading and the first waypoint.
    pub spawn_max_heading_error: f32,

    /// The episode fails beyond this distance to the current waypoint.
    pub maximum_robot_distance: f32,

    /// A waypoint is reached within this distance.
    pub position_tolerance: f32,

    /// Paid once per reached waypoint.
    pub goal_reached_bonus: f32,

    /// Weight of the decrease of the distance over one step.
    pub progress_weight: f32,

    /// Length scale of `exp(-distance / coeff)`.
    pub position_exponential_reward_coeff: f32,

    /// Weight of the position reward.
    pub position_weight: f32,

    /// Paid once when the robot leaves the allowed area.
    pub boundary_penalty: f32,

    /// Paid at every step.
    pub time_penalty: f32,
}

impl Default for GoThroughPositionsConfig {
    fn default() -> Self {
        Self {
            num_goals: 5,
            num_subsequent_goals: 2,
            goal_spawn_radius: 1.0,
            min_goal_spacing: 1.0,
            max_goal_spacing: 3.0,
            spawn_min_distance: 0.5,
            spawn_max_distance: 2.0,
            spawn_max_heading_error: FRAC_PI_2,
            maximum_robot_distance: 6.0,
            position_tolerance: 0.2,
            goal_reached_bonus: 10.0,
            progress_weight: 1.0,
            position_exponential_reward_coeff: 0.25,
            position_weight: 0.5,
            boundary_penalty: 10.0,
            time_penalty: 0.0,
        }
    }
}

/// Waypoint-following task.
///
/// Every slot holds `num_goals` waypoints generated at reset as a random walk
/// starting near the slot origin. The current waypoint advances when the robot
/// is within tolerance; the episode succeeds once all waypoints are reached.
pub struct GoThroughPositions {
    config: GoThroughPositionsConfig,
    goals: Array3<f32>,
    target_index: Array1<usize>,
    previous_distance: Array1<f32>,
    boundary_violation: Array1<bool>,
    origins: Array2<f32>,
    rng: SmallRng,
}

impl GoThroughPositions {
    /// Tag of the task in the registry.
    pub const TYPE: &'static str = "go_through_positions";

    /// Creates the task for `num_envs` slots.
    pub fn new(config: GoThroughPositionsConfig, num_envs: usize, seed: u64) -> Result<Self> {
        if config.num_goals == 0 {
            return Err(LockstepError::InvalidConfig("num_goals must be positive".to_string()).into());
        }
        if config.min_goal_spacing > config.max_goal_spacing {
            return Err(LockstepError::InvalidConfig(
                "min_goal_spacing must not exceed max_goal_spacing".to_string(),
            )
            .into());
        }
        Ok(Self {
            goals: Array3::zeros((num_envs, config.num_goals, 2)),
            config,
            target_index: Array1::zeros(num_envs),
            previous_distance: Array1::zeros(num_envs),
            boundary_violation: Array1::from_elem(num_envs, false),
            origins: Array2::zeros((num_envs, 2)),
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Registry constructor.
    pub fn build(config: &PluginConfig, ctx: PluginContext) -> Result<Box<dyn TaskPlugin>> {
        Ok(Box::new(Self::new(config.settings()?, ctx.num_envs, ctx.seed)?))
    }

    /// Waypoints in the world frame, `N × num_goals × 2`.
    pub fn goals(&self) -> ArrayView3<f32> {
        self.goals.view()
    }

    /// Index of the current waypoint, per slot. Equals `num_goals` once all are reached.
    pub fn target_index(&self) -> &Array1<usize> {
        &self.target_index
    }

    fn current_goal(&self, ix: usize) -> ArrayView1<f32> {
        let k = self.target_index[ix].min(self.config.num_goals - 1);
        self.goals.slice(s![ix, k, ..])
    }

    fn errors(&self, sim: &dyn Simulation) -> (Array1<f32>, Array1<f32>) {
        let data = sim.data();
        let n = data.num_envs();
        let mut distance = Array1::zeros(n);
        let mut heading_error = Array1::zeros(n);
        for ix in 0..n {
            let (d, h) = polar_error(data, ix, self.current_goal(ix));
            distance[ix] = d;
            heading_error[ix] = h;
        }
        (distance, heading_error)
    }
}

impl TaskPlugin for GoThroughPositions {
    fn name(&self) -> &str {
        Self::TYPE
    }

    fn spaces(&self) -> SpaceDecl {
        SpaceDecl::new(0, 6 + 3 * self.config.num_subsequent_goals as i64, 0, 0)
    }

    fn register_logs(&self, logger: &mut ScalarLogger) -> Result<()> {
        logger.add_log("Task", "distance", Aggregation::Mean)?;
        logger.add_log("Task", "progress_reward", Aggregation::Sum)?;
        logger.add_log("Task", "goals_reached", Aggregation::Max)
    }

    fn run_setup(&mut self, _robot: &dyn RobotPlugin, sim: &dyn Simulation) -> Result<()> {
        self.origins = sim.env_origins().to_owned();
        Ok(())
    }

    fn get_observations(&self, _robot: &dyn RobotPlugin, sim: &dyn Simulation) -> Array2<f32> {
        let data = sim.data();
        let (distance, heading_error) = self.errors(sim);
        let lookahead = self.config.num_subsequent_goals;

        let mut obs = Array2::zeros((data.num_envs(), 6 + 3 * lookahead));
        obs.slice_mut(s![.., ..6])
            .assign(&base_observations(data, &distance, &heading_error));
        for (ix, mut row) in obs.outer_iter_mut().enumerate() {
            for j in 0..lookahead {
                let k = self.target_index[ix] + j + 1;
                if k >= self.config.num_goals {
                    break;
                }
                let (d, h) = polar_error(data, ix, self.goals.slice(s![ix, k, ..]));
                row[6 + 3 * j] = d;
                row[6 + 3 * j + 1] = h.cos();
                row[6 + 3 * j + 2] = h.sin();
            }
        }
        obs
    }

    fn compute_rewards(
        &mut self,
        _robot: &dyn RobotPlugin,
        sim: &dyn Simulation,
        logger: &mut ScalarLogger,
    ) -> Result<Array1<f32>> {
        let (distance, _) = self.errors(sim);
        let n = distance.len();
        let mut progress = Array1::zeros(n);
        let mut reward = Array1::zeros(n);

        for ix in 0..n {
            let c = &self.config;
            let d = distance[ix];
            progress[ix] = (self.previous_distance[ix] - d) * c.progress_weight;
            reward[ix] = progress[ix]
                + (-d / c.position_exponential_reward_coeff).exp() * c.position_weight
                - c.time_penalty;
            if self.boundary_violation[ix] {
                reward[ix] -= c.boundary_penalty;
            }

            self.previous_distance[ix] = d;
            if d < c.position_tolerance && self.target_index[ix] < c.num_goals {
                reward[ix] += c.goal_reached_bonus;
                self.target_index[ix] += 1;
                if self.target_index[ix] < self.config.num_goals {
                    let (d_next, _) = polar_error(sim.data(), ix, self.current_goal(ix));
                    self.previous_distance[ix] = d_next;
                }
            }
        }

        let goals_reached = self.target_index.mapv(|k| k as f32);
        logger.log("Task", "distance", distance.view())?;
        logger.log("Task", "progress_reward", progress.view())?;
        logger.log("Task", "goals_reached", goals_reached.view())?;
        Ok(reward)
    }

    fn get_dones(
        &mut self,
        _robot: &dyn RobotPlugin,
        sim: &dyn Simulation,
    ) -> (Array1<bool>, Array1<bool>) {
        let (distance, _) = self.errors(sim);
        self.boundary_violation = distance.mapv(|d| d > self.config.maximum_robot_distance);
        let num_goals = self.config.num_goals;
        let success = self.target_index.mapv(|k| k >= num_goals);
        (self.boundary_violation.clone(), success)
    }

    fn compute_logs(&self, env_ids: &[usize]) -> Record {
        if env_ids.is_empty() {
            return Record::empty();
        }
        let completed: f32 = env_ids
            .iter()
            .map(|&ix| self.target_index[ix] as f32 / self.config.num_goals as f32)
            .sum();
        Record::from_slice(&[(
            "Task/goals_completed_fraction",
            RecordValue::Scalar(completed / env_ids.len() as f32),
        )])
    }

    fn reset(
        &mut self,
        env_ids: &[usize],
        _generator_actions: Option<ArrayView2<f32>>,
        seeds: Option<&[u64]>,
        _robot: &dyn RobotPlugin,
        sim: &mut dyn Simulation,
    ) {
        trace!("GoThroughPositions::reset()");
        let num_goals = self.config.num_goals;
        // first goal (2), spacing and direction of the others, spawn pose (3)
        let dims = 2 + 2 * (num_goals - 1) + 3;
        let u = unit_samples(&mut self.rng, env_ids.len(), dims, None, seeds);
        let spawn = SpawnRange {
            min_distance: self.config.spawn_min_distance,
            max_distance: self.config.spawn_max_distance,
            max_heading_error: self.config.spawn_max_heading_error,
        };
        let mut pose = Array2::zeros((env_ids.len(), 3));

        for (k, &ix) in env_ids.iter().enumerate() {
            let u = u.row(k);
            let origin = [self.origins[[ix, 0]], self.origins[[ix, 1]]];
            let mut goal = point_around(origin, self.config.goal_spawn_radius, [u[0], u[1]]);
            self.goals[[ix, 0, 0]] = goal[0];
            self.goals[[ix, 0, 1]] = goal[1];

            for g in 1..num_goals {
                let step = lerp(
                    self.config.min_goal_spacing,
                    self.config.max_goal_spacing,
                    u[2 * g],
                );
                let angle = TAU * u[2 * g + 1];
                goal = [goal[0] + step * angle.cos(), goal[1] + step * angle.sin()];
                self.goals[[ix, g, 0]] = goal[0];
                self.goals[[ix, g, 1]] = goal[1];
            }

            let first = [self.goals[[ix, 0, 0]], self.goals[[ix, 0, 1]]];
            let p = spawn.pose(first, [u[dims - 3], u[dims - 2], u[dims - 1]]);
            pose.row_mut(k).assign(&ArrayView1::from(&p[..]));

            self.target_index[ix] = 0;
            self.previous_distance[ix] = lerp(spawn.min_distance, spawn.max_distance, u[dims - 3]);
            self.boundary_violation[ix] = false;
        }

        let velocity = Array2::zeros((env_ids.len(), 3));
        sim.write_root_state(env_ids, pose.view(), velocity.view());
    }

    fn create_task_visualization(&mut self, sim: &mut dyn Simulation) {
        self.update_task_visualization(sim);
    }

    fn update_task_visualization(&self, sim: &mut dyn Simulation) {
        let n = self.goals.len_of(Axis(0));
        let mut current = Array2::zeros((n, 2));
        for (ix, mut row) in current.outer_iter_mut().enumerate() {
            row.assign(&self.current_goal(ix));
        }
        sim.draw_markers("current_goal", current.view());

        let all = self.goals.view().into_shape((n * self.config.num_goals, 2));
        if let Ok(all) = all {
            sim.draw_markers("goals", all);
        }
    }
}
