use anyhow::Result;
use lockstep_core::{
    dummy::{DummyRobot, DummySim, DummyTask},
    logger::EPISODE_LENGTH_KEY,
    record::{BufferedRecorder, Record},
    registry::{PluginContext, RobotRegistry, TaskRegistry},
    util::rollout,
    EnvConfig, EnvironmentDriver, LockstepError, PluginConfig, RandomPolicy, RobotPlugin,
    TaskPlugin, ZeroPolicy,
};

fn dummy_robot(_: &PluginConfig, ctx: PluginContext) -> Result<Box<dyn RobotPlugin>> {
    Ok(Box::new(DummyRobot::new(ctx.num_envs)))
}

fn dummy_task(_: &PluginConfig, ctx: PluginContext) -> Result<Box<dyn TaskPlugin>> {
    Ok(Box::new(DummyTask::new(ctx.num_envs, ctx.seed)))
}

fn registries() -> Result<(RobotRegistry, TaskRegistry)> {
    let mut robots = RobotRegistry::new("robot");
    robots.register("dummy", dummy_robot)?;
    let mut tasks = TaskRegistry::new("task");
    tasks.register("dummy", dummy_task)?;
    Ok((robots, tasks))
}

fn config(num_envs: usize, horizon: usize) -> EnvConfig {
    EnvConfig::default()
        .num_envs(num_envs)
        .decimation(2)
        .episode_length(horizon)
        .robot(PluginConfig::new("dummy"))
        .task(PluginConfig::new("dummy"))
}

#[test_log::test]
fn test_rollout_flushes_windows() -> Result<()> {
    let (robots, tasks) = registries()?;
    let mut env = EnvironmentDriver::from_registry(&config(4, 5), DummySim::new(4), &robots, &tasks)?;
    let mut policy = ZeroPolicy::new(2);
    let mut recorder = BufferedRecorder::new();

    let summary = rollout(&mut env, &mut policy, 20, 10, &mut recorder)?;

    assert_eq!(summary.steps, 20);
    assert_eq!(summary.episodes, 16);
    assert_eq!(summary.total_reward, 80.0);

    let windows: Vec<&Record> = recorder.iter().collect();
    assert_eq!(windows.len(), 2);
    for (ix, record) in windows.iter().enumerate() {
        assert_eq!(record.get_scalar("window")?, ix as f32);
        assert_eq!(record.get_scalar(EPISODE_LENGTH_KEY)?, 5.0);
        assert_eq!(record.get_scalar("Task/alive")?, 5.0);
    }
    Ok(())
}

#[test]
fn test_same_seed_same_trajectory() -> Result<()> {
    let (robots, tasks) = registries()?;
    let run = || -> Result<Vec<f32>> {
        let mut env =
            EnvironmentDriver::from_registry(&config(3, 7), DummySim::new(3), &robots, &tasks)?;
        let mut policy = RandomPolicy::new(2, 11);
        let mut obs = env.reset(None)?;
        let mut trace = vec![];
        for _ in 0..15 {
            let act = lockstep_core::Policy::sample(&mut policy, obs.view());
            let step = env.step(act.view())?;
            trace.extend(step.reward.iter());
            trace.extend(step.info.states.unwrap().iter());
            obs = step.obs;
        }
        Ok(trace)
    };
    assert_eq!(run()?, run()?);
    Ok(())
}

#[test]
fn test_unknown_plugin_type() -> Result<()> {
    let (robots, tasks) = registries()?;
    let config = config(2, 3).task(PluginConfig::new("go_nowhere"));
    let err = EnvironmentDriver::from_registry(&config, DummySim::new(2), &robots, &tasks)
        .err()
        .unwrap();

    assert_eq!(
        err.downcast_ref::<LockstepError>(),
        Some(&LockstepError::UnknownPluginType {
            family: "task",
            tag: "go_nowhere".into()
        })
    );
    Ok(())
}
