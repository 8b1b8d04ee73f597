//! Batched environment driver.
use crate::{
    base::{Env, RobotPlugin, Simulation, Step, StepInfo, TaskPlugin},
    config::EnvConfig,
    error::LockstepError,
    logger::ScalarLogger,
    record::{Record, RecordValue},
    registry::{PluginContext, RobotRegistry, TaskRegistry},
    space::{compose, ComposedSpaces, Space, SpaceSizes},
    util::env_id_order,
};
use anyhow::Result;
use log::{debug, info, trace};
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

const ROBOT: usize = 0;
const TASK: usize = 1;

/// Finalized metrics of the episodes ended since the last step returned.
#[derive(Debug, Default)]
struct EpisodeLog {
    record: Record,
    episodes: usize,
}

impl EpisodeLog {
    /// Adds the record of `episodes` finished episodes. Scalars shared with
    /// earlier records are averaged, weighted by episode count.
    fn absorb(&mut self, record: Record, episodes: usize) {
        if episodes == 0 {
            return;
        }
        let (w_old, w_new) = (self.episodes as f32, episodes as f32);
        for (k, v) in record.iter() {
            let merged = match (self.record.get(k), v) {
                (Some(RecordValue::Scalar(a)), RecordValue::Scalar(b)) => {
                    RecordValue::Scalar((a * w_old + b * w_new) / (w_old + w_new))
                }
                _ => v.clone(),
            };
            self.record.insert(k.clone(), merged);
        }
        self.episodes += episodes;
    }

    fn take(&mut self) -> Record {
        self.episodes = 0;
        std::mem::take(&mut self.record)
    }
}

/// Per-slot bookkeeping owned by the driver.
#[derive(Debug, Clone)]
struct SlotBuffers {
    episode_length: Array1<u32>,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Steps `N` copies of one robot-task pair in lockstep.
///
/// The driver owns the simulation and both plugins. One call to
/// [`EnvironmentDriver::step`] runs, in this order:
///
/// ```mermaid
/// graph TD
///     A[robot.process_actions] --> B[task.process_actions]
///     B --> C["decimation x (compute_physics, apply_actions, sim.step, sim.sync)"]
///     C --> D[robot.get_dones, task.get_dones, timeout]
///     D --> E[robot.compute_rewards + task.compute_rewards]
///     E --> F[episode counters += 1]
///     F --> G["done slots: reset_logs, compute_logs, robot.reset, task.reset, set_initial_conditions"]
///     G --> H["observation [task | robot]"]
/// ```
///
/// * Terminations of the robot and the task are merged by union. A slot also
///   terminates cleanly when its counter, read before the increment, has reached
///   `episode_length - 1`, so every episode spans at most `episode_length` steps.
/// * Rewards and terminations are computed from the state at the end of the
///   physics sub-steps; the robot terms read joint accelerations produced by
///   actuation in the same step.
/// * Slots that end an episode are reset inside the step. Their rows of the
///   returned observation belong to the next episode.
/// * The step log also carries the episodes cut short by [`EnvironmentDriver::reset`]
///   since the previous step, averaged with the step's own by episode count.
///
/// Column layouts of the composed spaces:
///
/// | space        | layout           |
/// |--------------|------------------|
/// | action       | `[robot | task]` |
/// | generator    | `[robot | task]` |
/// | observation  | `[task | robot]` |
/// | state        | `[task | robot]` |
pub struct EnvironmentDriver<S: Simulation> {
    config: EnvConfig,
    sim: S,
    robot: Box<dyn RobotPlugin>,
    task: Box<dyn TaskPlugin>,
    spaces: ComposedSpaces,
    logger: ScalarLogger,
    buffers: SlotBuffers,
    episode_log: EpisodeLog,
    debug_vis: bool,
}

impl<S: Simulation> EnvironmentDriver<S> {
    /// Composes `robot` and `task` on top of `sim`.
    ///
    /// Fails without returning a partially built driver if the configuration is
    /// invalid, a space size is negative, a metric is registered twice or a plugin
    /// cannot bind to the simulation. The driver is fully reset on return.
    pub fn new(
        config: &EnvConfig,
        sim: S,
        mut robot: Box<dyn RobotPlugin>,
        mut task: Box<dyn TaskPlugin>,
    ) -> Result<Self> {
        config.validate()?;
        if sim.num_envs() != config.num_envs {
            return Err(LockstepError::InvalidConfig(format!(
                "simulation has {} slots, configuration asks for {}",
                sim.num_envs(),
                config.num_envs
            ))
            .into());
        }

        let spaces = compose(&[
            (robot.name(), robot.spaces()),
            (task.name(), task.spaces()),
        ])?;

        let mut logger = ScalarLogger::new(config.num_envs);
        robot.register_logs(&mut logger)?;
        task.register_logs(&mut logger)?;

        robot.run_setup(&sim)?;
        task.run_setup(robot.as_ref(), &sim)?;
        robot.initialize_buffers(None);

        let mut driver = Self {
            config: config.clone(),
            sim,
            robot,
            task,
            spaces,
            logger,
            buffers: SlotBuffers {
                episode_length: Array1::zeros(config.num_envs),
            },
            episode_log: EpisodeLog::default(),
            debug_vis: false,
        };
        driver.set_debug_vis(config.debug_vis);

        info!(
            "Created environment: robot = {}, task = {}, num_envs = {}, spaces = {:?}",
            driver.robot.name(),
            driver.task.name(),
            driver.num_envs(),
            driver.spaces.total()
        );

        driver.reset(None)?;
        Ok(driver)
    }

    /// Builds the plugins selected by `config` from the registries.
    ///
    /// The task receives `config.seed + 1` so that robot and task do not share a
    /// random stream.
    pub fn from_registry(
        config: &EnvConfig,
        sim: S,
        robots: &RobotRegistry,
        tasks: &TaskRegistry,
    ) -> Result<Self> {
        let ctx = PluginContext {
            num_envs: config.num_envs,
            seed: config.seed,
        };
        let robot = robots.build(&config.robot, ctx)?;
        let task = tasks.build(
            &config.task,
            PluginContext {
                seed: config.seed.wrapping_add(1),
                ..ctx
            },
        )?;
        Self::new(config, sim, robot, task)
    }

    /// Advances every slot by one control step.
    pub fn step(&mut self, actions: ArrayView2<f32>) -> Result<Step> {
        trace!("EnvironmentDriver::step()");
        let n = self.num_envs();
        let expected = [n, self.spaces.total().action];
        if actions.shape() != expected {
            return Err(LockstepError::ActionShape {
                expected,
                got: [actions.nrows(), actions.ncols()],
            }
            .into());
        }

        self.robot
            .process_actions(actions.slice(s![.., self.spaces.range(Space::Action, ROBOT)]));
        let task_cols = self.spaces.range(Space::Action, TASK);
        if !task_cols.is_empty() {
            self.task.process_actions(actions.slice(s![.., task_cols]));
        }

        for _ in 0..self.config.decimation {
            self.robot.compute_physics();
            self.robot.apply_actions(&mut self.sim);
            self.sim.step();
            self.sim.sync();
        }

        let (early_robot, clean_robot) = self.robot.get_dones(&self.sim);
        let (early_task, clean_task) = self.task.get_dones(self.robot.as_ref(), &self.sim);
        let horizon = self.config.episode_length as u32;
        let early = Zip::from(&early_robot)
            .and(&early_task)
            .map_collect(|&r, &t| r || t);
        let clean = Zip::from(&clean_robot)
            .and(&clean_task)
            .and(&self.buffers.episode_length)
            .map_collect(|&r, &t, &len| r || t || len + 1 >= horizon);

        let mut reward = self.robot.compute_rewards(&self.sim, &mut self.logger)?;
        reward += &self
            .task
            .compute_rewards(self.robot.as_ref(), &self.sim, &mut self.logger)?;

        self.buffers.episode_length += 1;

        let done_ids: Vec<usize> = (0..n).filter(|&ix| early[ix] || clean[ix]).collect();
        if !done_ids.is_empty() {
            debug!("Resetting {} of {} slots: {:?}", done_ids.len(), n, done_ids);
            self.reset_idx(&done_ids, None, None)?;
        }
        let log = self.episode_log.take();

        let obs = self.observations()?;
        let states = self.states()?;
        if self.debug_vis {
            self.task.update_task_visualization(&mut self.sim);
        }

        Ok(Step::new(
            obs,
            reward,
            early,
            clean,
            StepInfo {
                log,
                states,
                done_ids,
            },
        ))
    }

    /// Resets the given slots, or all slots if `None`, and returns the observation
    /// of every slot.
    ///
    /// Slots that had started an episode are finalized as in [`Self::step`]; their
    /// metrics are reported in the `log` of the next step.
    pub fn reset(&mut self, env_ids: Option<&[usize]>) -> Result<Array2<f32>> {
        self.reset_with(env_ids, None, None)
    }

    /// Resets the given slots with explicit generator actions or per-slot seeds.
    ///
    /// `generator_actions` has one row per reset slot, in the order of `env_ids`,
    /// and the composed generator width; `seeds` has one seed per reset slot.
    /// With `env_ids = None` the rows refer to slots `0..N`.
    pub fn reset_with(
        &mut self,
        env_ids: Option<&[usize]>,
        generator_actions: Option<ArrayView2<f32>>,
        seeds: Option<&[u64]>,
    ) -> Result<Array2<f32>> {
        trace!("EnvironmentDriver::reset()");
        let n = self.num_envs();
        let all: Vec<usize>;
        let env_ids: &[usize] = match env_ids {
            Some(ids) => ids,
            None => {
                all = (0..n).collect();
                &all[..]
            }
        };
        let order = env_id_order(env_ids, n)?;

        if let Some(g) = &generator_actions {
            let expected = [env_ids.len(), self.spaces.total().generator];
            if g.shape() != expected {
                return Err(LockstepError::GeneratorShape {
                    expected,
                    got: [g.nrows(), g.ncols()],
                }
                .into());
            }
        }
        if let Some(seeds) = seeds {
            if seeds.len() != env_ids.len() {
                return Err(LockstepError::SeedCount {
                    expected: env_ids.len(),
                    got: seeds.len(),
                }
                .into());
            }
        }

        let sorted_ids: Vec<usize> = order.iter().map(|&k| env_ids[k]).collect();
        let sorted_generator = generator_actions.map(|g| g.select(Axis(0), &order));
        let sorted_seeds: Option<Vec<u64>> =
            seeds.map(|seeds| order.iter().map(|&k| seeds[k]).collect());

        if sorted_ids.len() < n {
            debug!("Resetting {} of {} slots: {:?}", sorted_ids.len(), n, sorted_ids);
        }
        if !sorted_ids.is_empty() {
            self.reset_idx(
                &sorted_ids,
                sorted_generator.as_ref().map(|g| g.view()),
                sorted_seeds.as_deref(),
            )?;
        }
        self.observations()
    }

    /// Finalizes the logs of `env_ids` into the episode log and resets robot,
    /// task and counters.
    ///
    /// `env_ids` is sorted and valid; rows of `generator_actions` and `seeds`
    /// follow it. Slots with a zero counter have no episode to finalize.
    fn reset_idx(
        &mut self,
        env_ids: &[usize],
        generator_actions: Option<ArrayView2<f32>>,
        seeds: Option<&[u64]>,
    ) -> Result<()> {
        let finished: Vec<usize> = env_ids
            .iter()
            .copied()
            .filter(|&ix| self.buffers.episode_length[ix] > 0)
            .collect();
        if !finished.is_empty() {
            let mut log = self
                .logger
                .reset_logs(&finished, self.buffers.episode_length.view());
            log.merge(self.robot.compute_logs(&finished));
            log.merge(self.task.compute_logs(&finished));
            self.episode_log.absorb(log, finished.len());
        }

        let robot_cols = self.spaces.range(Space::Generator, ROBOT);
        let task_cols = self.spaces.range(Space::Generator, TASK);
        let robot_gen = generator_actions.map(|g| g.slice_move(s![.., robot_cols]));
        let task_gen = generator_actions.map(|g| g.slice_move(s![.., task_cols]));

        self.robot.reset(env_ids, robot_gen, seeds);
        self.task
            .reset(env_ids, task_gen, seeds, self.robot.as_ref(), &mut self.sim);
        self.robot.set_initial_conditions(env_ids, &mut self.sim);

        for &ix in env_ids {
            self.buffers.episode_length[ix] = 0;
        }
        Ok(())
    }

    fn observations(&self) -> Result<Array2<f32>> {
        let task_obs = self.task.get_observations(self.robot.as_ref(), &self.sim);
        let robot_obs = self.robot.get_observations(&self.sim);
        self.check_shape(TASK, Space::Observation, &task_obs)?;
        self.check_shape(ROBOT, Space::Observation, &robot_obs)?;
        Ok(concatenate(Axis(1), &[task_obs.view(), robot_obs.view()])?)
    }

    fn states(&self) -> Result<Option<Array2<f32>>> {
        if self.spaces.total().state == 0 {
            return Ok(None);
        }
        let task_states = self.task.get_states(self.robot.as_ref(), &self.sim);
        let robot_states = self.robot.get_states(&self.sim);
        self.check_shape(TASK, Space::State, &task_states)?;
        self.check_shape(ROBOT, Space::State, &robot_states)?;
        Ok(Some(concatenate(
            Axis(1),
            &[task_states.view(), robot_states.view()],
        )?))
    }

    fn check_shape(&self, component: usize, space: Space, x: &Array2<f32>) -> Result<()> {
        let expected = [self.num_envs(), self.spaces.part(component).get(space)];
        if x.shape() != expected {
            return Err(LockstepError::ObservationShape {
                component: self.spaces.name(component).to_string(),
                kind: match space {
                    Space::State => "state",
                    _ => "observation",
                },
                expected,
                got: [x.nrows(), x.ncols()],
            }
            .into());
        }
        Ok(())
    }

    /// Enables or disables debug visualization.
    ///
    /// Enabling creates the task's markers. Step outputs do not depend on it.
    pub fn set_debug_vis(&mut self, enabled: bool) {
        if enabled && !self.debug_vis {
            self.task.create_task_visualization(&mut self.sim);
        }
        self.debug_vis = enabled;
    }

    /// Whether debug visualization is enabled.
    pub fn debug_vis(&self) -> bool {
        self.debug_vis
    }

    /// Number of slots.
    pub fn num_envs(&self) -> usize {
        self.config.num_envs
    }

    /// Composed space sizes.
    pub fn spaces(&self) -> &SpaceSizes {
        self.spaces.total()
    }

    /// Per-component space sizes; component 0 is the robot, 1 the task.
    pub fn composed_spaces(&self) -> &ComposedSpaces {
        &self.spaces
    }

    /// Steps since the last reset, per slot.
    pub fn episode_length_buf(&self) -> ArrayView1<u32> {
        self.buffers.episode_length.view()
    }

    /// The configuration the driver was built with.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// The robot plugin.
    pub fn robot(&self) -> &dyn RobotPlugin {
        self.robot.as_ref()
    }

    /// The task plugin.
    pub fn task(&self) -> &dyn TaskPlugin {
        self.task.as_ref()
    }

    /// The simulation.
    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// The simulation, mutably. Writes are seen by the next step.
    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// The metric aggregator.
    pub fn logger(&self) -> &ScalarLogger {
        &self.logger
    }
}

impl<S: Simulation> Env for EnvironmentDriver<S> {
    fn num_envs(&self) -> usize {
        self.config.num_envs
    }

    fn spaces(&self) -> &SpaceSizes {
        self.spaces.total()
    }

    fn step(&mut self, act: ArrayView2<f32>) -> Result<Step> {
        Self::step(self, act)
    }

    fn reset(&mut self, env_ids: Option<&[usize]>) -> Result<Array2<f32>> {
        Self::reset(self, env_ids)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        dummy::{DummyRobot, DummySim, DummyTask},
        logger::EPISODE_LENGTH_KEY,
    };
    use ndarray::array;

    fn driver(num_envs: usize, decimation: usize, horizon: usize) -> EnvironmentDriver<DummySim> {
        let config = EnvConfig::default()
            .num_envs(num_envs)
            .decimation(decimation)
            .episode_length(horizon);
        EnvironmentDriver::new(
            &config,
            DummySim::new(num_envs),
            Box::new(DummyRobot::new(num_envs)),
            Box::new(DummyTask::new(num_envs, 0)),
        )
        .unwrap()
    }

    fn zeros(d: &EnvironmentDriver<DummySim>) -> Array2<f32> {
        Array2::zeros((d.num_envs(), d.spaces().action))
    }

    #[test_log::test]
    fn test_horizon_ends_every_slot_at_once() -> Result<()> {
        let mut d = driver(3, 4, 20);
        let act = zeros(&d);

        for t in 1..20 {
            let step = d.step(act.view())?;
            assert!(step.info.done_ids.is_empty(), "step {}", t);
            assert!(step.info.log.is_empty());
            assert_eq!(d.episode_length_buf().to_vec(), vec![t; 3]);
        }

        let step = d.step(act.view())?;
        assert_eq!(step.clean_termination.to_vec(), vec![true; 3]);
        assert_eq!(step.early_termination.to_vec(), vec![false; 3]);
        assert_eq!(step.info.done_ids, vec![0, 1, 2]);
        assert_eq!(step.info.log.get_scalar(EPISODE_LENGTH_KEY)?, 20.0);
        assert_eq!(d.episode_length_buf().to_vec(), vec![0; 3]);

        // 20 steps of 4 sub-steps, each followed by a sync
        assert_eq!(d.sim().steps, 80);
        assert_eq!(d.sim().syncs, 80);
        Ok(())
    }

    #[test]
    fn test_early_termination_resets_only_failed_slot() -> Result<()> {
        let config = EnvConfig::default().num_envs(3).episode_length(100);
        let mut task = DummyTask::new(3, 0);
        task.fail_after(1, 5);
        let mut d = EnvironmentDriver::new(
            &config,
            DummySim::new(3),
            Box::new(DummyRobot::new(3)),
            Box::new(task),
        )?;
        let act = zeros(&d);

        for _ in 0..4 {
            d.step(act.view())?;
        }
        let step = d.step(act.view())?;

        assert_eq!(step.early_termination.to_vec(), vec![false, true, false]);
        assert_eq!(step.info.done_ids, vec![1]);
        assert_eq!(step.info.log.get_scalar(EPISODE_LENGTH_KEY)?, 5.0);
        assert_eq!(d.episode_length_buf().to_vec(), vec![5, 0, 5]);
        // the reset slot observes the start of a new episode
        assert_eq!(step.obs.column(0).to_vec(), vec![5.0, 0.0, 5.0]);
        Ok(())
    }

    #[test]
    fn test_partial_reset_leaves_other_slots() -> Result<()> {
        let mut d = driver(4, 1, 100);
        let act = Array2::from_elem((4, d.spaces().action), 0.5);
        d.step(act.view())?;
        d.step(act.view())?;
        let before = d.robot().actions().to_owned();

        let obs = d.reset(Some(&[3, 1]))?;

        assert_eq!(d.episode_length_buf().to_vec(), vec![2, 0, 2, 0]);
        assert_eq!(obs.column(0).to_vec(), vec![2.0, 0.0, 2.0, 0.0]);
        for ix in [0, 2] {
            assert_eq!(d.robot().actions().row(ix), before.row(ix));
            assert_eq!(d.robot().previous_actions().row(ix).to_vec(), vec![0.5, 0.5]);
        }
        for ix in [1, 3] {
            assert_eq!(d.robot().actions().row(ix).to_vec(), vec![0.0, 0.0]);
            assert_eq!(d.robot().previous_actions().row(ix).to_vec(), vec![0.0, 0.0]);
        }
        Ok(())
    }

    #[test]
    fn test_reset_all_ids_equals_reset_none() -> Result<()> {
        let mut a = driver(3, 2, 50);
        let mut b = driver(3, 2, 50);
        let act = Array2::from_elem((3, a.spaces().action), -0.25);
        a.step(act.view())?;
        b.step(act.view())?;

        let seeds = [3, 4, 5];
        let obs_a = a.reset_with(None, None, Some(&seeds))?;
        let obs_b = b.reset_with(Some(&[0, 1, 2]), None, Some(&seeds))?;

        assert_eq!(obs_a, obs_b);
        assert_eq!(a.episode_length_buf(), b.episode_length_buf());
        Ok(())
    }

    #[test]
    fn test_generator_rows_follow_env_ids() -> Result<()> {
        let mut d = driver(3, 1, 50);
        assert_eq!(d.spaces().generator, 1);

        d.reset_with(Some(&[2, 0]), Some(array![[0.75], [0.25]].view()), None)?;
        let step = d.step(zeros(&d).view())?;
        let states = step.info.states.unwrap();

        assert_eq!(states[[0, 0]], 0.25);
        assert_eq!(states[[2, 0]], 0.75);
        Ok(())
    }

    #[test]
    fn test_invalid_inputs_are_rejected() -> Result<()> {
        let mut d = driver(2, 1, 10);

        let err = d.step(Array2::zeros((2, 3)).view()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LockstepError>(),
            Some(&LockstepError::ActionShape {
                expected: [2, 2],
                got: [2, 3]
            })
        );

        let err = d.reset(Some(&[0, 2])).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LockstepError>(),
            Some(&LockstepError::EnvIdOutOfRange { id: 2, num_envs: 2 })
        );

        let err = d
            .reset_with(Some(&[0]), Some(Array2::zeros((1, 2)).view()), None)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<LockstepError>(),
            Some(&LockstepError::GeneratorShape {
                expected: [1, 1],
                got: [1, 2]
            })
        );

        let err = d.reset_with(Some(&[0, 1]), None, Some(&[1])).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LockstepError>(),
            Some(&LockstepError::SeedCount {
                expected: 2,
                got: 1
            })
        );

        // nothing was reset by the failed calls
        assert_eq!(d.episode_length_buf().to_vec(), vec![0, 0]);
        Ok(())
    }

    #[test]
    fn test_termination_is_monotone() -> Result<()> {
        let config = EnvConfig::default().num_envs(2).episode_length(100);
        let mut task = DummyTask::new(2, 0);
        task.fail_after(0, 3);
        let mut d = EnvironmentDriver::new(
            &config,
            DummySim::new(2),
            Box::new(DummyRobot::new(2)),
            Box::new(task),
        )?;
        let act = zeros(&d);

        // once a slot terminates it is reset within the same step and never
        // reported as running with a stale counter
        for _ in 0..10 {
            let step = d.step(act.view())?;
            for ix in 0..2 {
                let done = step.early_termination[ix] || step.clean_termination[ix];
                assert_eq!(done, step.info.done_ids.contains(&ix));
                if done {
                    assert_eq!(d.episode_length_buf()[ix], 0);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_debug_vis_does_not_change_outputs() -> Result<()> {
        let mut a = driver(2, 2, 5);
        let mut b = driver(2, 2, 5);
        b.set_debug_vis(true);
        let act = array![[0.1, -0.2], [0.3, 0.4]];

        for _ in 0..7 {
            let sa = a.step(act.view())?;
            let sb = b.step(act.view())?;
            assert_eq!(sa.obs, sb.obs);
            assert_eq!(sa.reward, sb.reward);
            assert_eq!(sa.clean_termination, sb.clean_termination);
            assert_eq!(sa.info.log, sb.info.log);
        }
        assert!(a.sim().markers.is_empty());
        assert!(b.sim().markers.contains_key("counter"));
        Ok(())
    }

    #[test]
    fn test_robot_log_is_finalized_per_episode() -> Result<()> {
        let mut d = driver(2, 1, 2);
        d.step(array![[1.0, 0.0], [0.0, 0.0]].view())?;
        let step = d.step(array![[1.0, 0.0], [0.0, 0.0]].view())?;

        // mean over slots of the per-episode mean action norm
        assert_eq!(step.info.log.get_scalar("Robot/action_norm")?, 0.5);
        assert_eq!(step.info.log.get_scalar("Task/alive")?, 2.0);
        assert_eq!(step.info.log.get_scalar("Task/resets")?, 2.0);
        Ok(())
    }

    #[test]
    fn test_external_reset_reports_cut_episode() -> Result<()> {
        let mut d = driver(2, 1, 100);
        let act = array![[1.0, 0.0], [0.0, 0.0]];
        for _ in 0..3 {
            d.step(act.view())?;
        }

        let obs = d.reset(Some(&[0]))?;
        assert_eq!(obs.dim(), (2, 3));

        let log = d.step(act.view())?.info.log;
        assert_eq!(log.get_scalar(EPISODE_LENGTH_KEY)?, 3.0);
        assert_eq!(log.get_scalar("Robot/action_norm")?, 1.0);
        assert_eq!(log.get_scalar("Task/alive")?, 3.0);
        assert_eq!(log.get_scalar("Task/resets")?, 1.0);

        // reported once, and fresh slots have nothing to report
        assert!(d.step(act.view())?.info.log.is_empty());
        d.reset(None)?;
        d.reset(None)?;
        let log = d.step(act.view())?.info.log;
        assert_eq!(log.get_scalar(EPISODE_LENGTH_KEY)?, (2.0 + 5.0) / 2.0);
        assert_eq!(log.get_scalar("Task/resets")?, 2.0);
        Ok(())
    }

    #[test]
    fn test_cut_and_finished_episodes_are_averaged() -> Result<()> {
        let mut d = driver(2, 1, 4);
        let act = array![[1.0, 0.0], [0.0, 0.0]];
        for _ in 0..3 {
            d.step(act.view())?;
        }
        d.reset(Some(&[0]))?;

        // slot 1 times out, slot 0 was cut at 3 steps
        let step = d.step(act.view())?;
        assert_eq!(step.info.done_ids, vec![1]);
        let log = step.info.log;
        assert_eq!(log.get_scalar(EPISODE_LENGTH_KEY)?, 3.5);
        assert_eq!(log.get_scalar("Task/alive")?, 3.5);
        assert_eq!(log.get_scalar("Robot/action_norm")?, 0.5);
        Ok(())
    }

    #[test]
    fn test_construction_fails_on_mismatched_sim() {
        let config = EnvConfig::default().num_envs(3);
        let err = EnvironmentDriver::new(
            &config,
            DummySim::new(2),
            Box::new(DummyRobot::new(3)),
            Box::new(DummyTask::new(3, 0)),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err.downcast_ref::<LockstepError>(),
            Some(LockstepError::InvalidConfig(_))
        ));
    }
}
