//! Minimal simulation and plugins, used for tests.
//!
//! [`DummySim`] integrates joint velocities and counts its calls,
//! [`DummyRobot`] forwards its actions to two joints and [`DummyTask`] counts
//! steps and ends episodes on a per-slot schedule.
use crate::{
    base::{find_joints, ArticulationData, RobotPlugin, Simulation, TaskPlugin},
    logger::{Aggregation, ScalarLogger},
    record::Record,
    space::SpaceDecl,
    util::unit_samples,
};
use anyhow::Result;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::{rngs::SmallRng, SeedableRng};
use std::collections::HashMap;

/// Simulation with two velocity-controlled joints and a fixed root.
pub struct DummySim {
    data: ArticulationData,
    origins: Array2<f32>,
    joint_names: Vec<String>,

    /// Number of calls to [`Simulation::step`].
    pub steps: usize,

    /// Number of calls to [`Simulation::sync`].
    pub syncs: usize,

    /// Last marker positions drawn under each name.
    pub markers: HashMap<String, Array2<f32>>,
}

impl DummySim {
    /// Physics time step.
    pub const DT: f32 = 0.01;

    /// Creates the simulation with `num_envs` slots.
    pub fn new(num_envs: usize) -> Self {
        Self {
            data: ArticulationData::new(num_envs, 2),
            origins: Array2::zeros((num_envs, 2)),
            joint_names: vec!["j0".to_string(), "j1".to_string()],
            steps: 0,
            syncs: 0,
            markers: HashMap::new(),
        }
    }
}

impl Simulation for DummySim {
    fn num_envs(&self) -> usize {
        self.data.num_envs()
    }

    fn physics_dt(&self) -> f32 {
        Self::DT
    }

    fn env_origins(&self) -> ArrayView2<f32> {
        self.origins.view()
    }

    fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    fn data(&self) -> &ArticulationData {
        &self.data
    }

    fn set_joint_velocity_target(&mut self, targets: ArrayView2<f32>, joint_ids: &[usize]) {
        for (j, &jx) in joint_ids.iter().enumerate() {
            self.data
                .joint_vel_target
                .column_mut(jx)
                .assign(&targets.column(j));
        }
    }

    fn write_root_state(
        &mut self,
        env_ids: &[usize],
        pose: ArrayView2<f32>,
        velocity: ArrayView2<f32>,
    ) {
        self.data.write_root_state(env_ids, pose, velocity);
    }

    fn write_joint_state(
        &mut self,
        env_ids: &[usize],
        joint_ids: &[usize],
        position: ArrayView2<f32>,
        velocity: ArrayView2<f32>,
    ) {
        self.data
            .write_joint_state(env_ids, joint_ids, position, velocity);
    }

    fn step(&mut self) {
        let data = &mut self.data;
        data.joint_acc = (&data.joint_vel_target - &data.joint_vel) / Self::DT;
        data.joint_vel.assign(&data.joint_vel_target);
        data.joint_pos.scaled_add(Self::DT, &data.joint_vel);
        self.steps += 1;
    }

    fn sync(&mut self) {
        self.syncs += 1;
    }

    fn draw_markers(&mut self, name: &str, positions: ArrayView2<f32>) {
        self.markers.insert(name.to_string(), positions.to_owned());
    }
}

/// Robot whose two actions are the velocity targets of joints `j0` and `j1`.
///
/// Observes its actions; the reward is minus the squared action norm, logged
/// as `Robot/action_norm`.
pub struct DummyRobot {
    actions: Array2<f32>,
    previous_actions: Array2<f32>,
    joint_ids: Vec<usize>,
}

impl DummyRobot {
    /// Creates the robot for `num_envs` slots.
    pub fn new(num_envs: usize) -> Self {
        Self {
            actions: Array2::zeros((num_envs, 2)),
            previous_actions: Array2::zeros((num_envs, 2)),
            joint_ids: vec![],
        }
    }
}

impl RobotPlugin for DummyRobot {
    fn name(&self) -> &str {
        "dummy_robot"
    }

    fn spaces(&self) -> SpaceDecl {
        SpaceDecl::new(2, 2, 0, 0)
    }

    fn register_logs(&self, logger: &mut ScalarLogger) -> Result<()> {
        logger.add_log("Robot", "action_norm", Aggregation::Mean)
    }

    fn initialize_buffers(&mut self, env_ids: Option<&[usize]>) {
        match env_ids {
            None => {
                self.actions.fill(0.0);
                self.previous_actions.fill(0.0);
            }
            Some(ids) => {
                for &ix in ids {
                    self.actions.row_mut(ix).fill(0.0);
                    self.previous_actions.row_mut(ix).fill(0.0);
                }
            }
        }
    }

    fn run_setup(&mut self, sim: &dyn Simulation) -> Result<()> {
        self.joint_ids = find_joints(sim, &["j0".to_string(), "j1".to_string()])?;
        Ok(())
    }

    fn process_actions(&mut self, actions: ArrayView2<f32>) {
        self.previous_actions.assign(&self.actions);
        self.actions.assign(&actions);
    }

    fn apply_actions(&mut self, sim: &mut dyn Simulation) {
        sim.set_joint_velocity_target(self.actions.view(), &self.joint_ids);
    }

    fn get_observations(&self, _sim: &dyn Simulation) -> Array2<f32> {
        self.actions.clone()
    }

    fn compute_rewards(
        &self,
        _sim: &dyn Simulation,
        logger: &mut ScalarLogger,
    ) -> Result<Array1<f32>> {
        let norm = self.actions.mapv(|a| a * a).sum_axis(Axis(1));
        logger.log("Robot", "action_norm", norm.view())?;
        Ok(-norm)
    }

    fn reset(
        &mut self,
        env_ids: &[usize],
        _generator_actions: Option<ArrayView2<f32>>,
        _seeds: Option<&[u64]>,
    ) {
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

/// Task that counts the steps of every slot.
///
/// Observes the counter, rewards 1 per step and keeps one generated value per
/// slot as its privileged state. A slot fails when its counter reaches the
/// value set with [`DummyTask::fail_after`].
pub struct DummyTask {
    counter: Array1<u32>,
    fail_after: Array1<u32>,
    target: Array1<f32>,
    rng: SmallRng,
}

impl DummyTask {
    /// Creates the task for `num_envs` slots.
    pub fn new(num_envs: usize, seed: u64) -> Self {
        Self {
            counter: Array1::zeros(num_envs),
            fail_after: Array1::from_elem(num_envs, u32::MAX),
            target: Array1::zeros(num_envs),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Makes slot `ix` fail on the `steps`-th step of each episode.
    pub fn fail_after(&mut self, ix: usize, steps: u32) {
        self.fail_after[ix] = steps;
    }
}

impl TaskPlugin for DummyTask {
    fn name(&self) -> &str {
        "dummy_task"
    }

    fn spaces(&self) -> SpaceDecl {
        SpaceDecl::new(0, 1, 1, 1)
    }

    fn register_logs(&self, logger: &mut ScalarLogger) -> Result<()> {
        logger.add_log("Task", "alive", Aggregation::Sum)
    }

    fn run_setup(&mut self, _robot: &dyn RobotPlugin, _sim: &dyn Simulation) -> Result<()> {
        Ok(())
    }

    fn get_observations(&self, _robot: &dyn RobotPlugin, _sim: &dyn Simulation) -> Array2<f32> {
        self.counter.mapv(|c| c as f32).insert_axis(Axis(1))
    }

    fn get_states(&self, _robot: &dyn RobotPlugin, _sim: &dyn Simulation) -> Array2<f32> {
        self.target.clone().insert_axis(Axis(1))
    }

    fn compute_rewards(
        &mut self,
        _robot: &dyn RobotPlugin,
        _sim: &dyn Simulation,
        logger: &mut ScalarLogger,
    ) -> Result<Array1<f32>> {
        let reward = Array1::ones(self.counter.len());
        logger.log("Task", "alive", reward.view())?;
        Ok(reward)
    }

    fn get_dones(
        &mut self,
        _robot: &dyn RobotPlugin,
        _sim: &dyn Simulation,
    ) -> (Array1<bool>, Array1<bool>) {
        self.counter += 1;
        let early = ndarray::Zip::from(&self.counter)
            .and(&self.fail_after)
            .map_collect(|&c, &f| c >= f);
        (early, Array1::from_elem(self.counter.len(), false))
    }

    fn compute_logs(&self, env_ids: &[usize]) -> Record {
        Record::from_scalar("Task/resets", env_ids.len() as f32)
    }

    fn reset(
        &mut self,
        env_ids: &[usize],
        generator_actions: Option<ArrayView2<f32>>,
        seeds: Option<&[u64]>,
        _robot: &dyn RobotPlugin,
        _sim: &mut dyn Simulation,
    ) {
        let samples = unit_samples(&mut self.rng, env_ids.len(), 1, generator_actions, seeds);
        for (k, &ix) in env_ids.iter().enumerate() {
            self.counter[ix] = 0;
            self.target[ix] = samples[[k, 0]];
        }
    }

    fn create_task_visualization(&mut self, sim: &mut dyn Simulation) {
        self.update_task_visualization(sim);
    }

    fn update_task_visualization(&self, sim: &mut dyn Simulation) {
        let positions = self.marker_positions();
        sim.draw_markers("counter", positions.view());
    }
}

impl DummyTask {
    fn marker_positions(&self) -> Array2<f32> {
        let mut positions = Array2::zeros((self.counter.len(), 2));
        positions
            .column_mut(0)
            .assign(&self.counter.mapv(|c| c as f32));
        positions
    }
}
