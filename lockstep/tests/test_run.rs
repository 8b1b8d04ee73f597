use anyhow::Result;
use lockstep::{
    core::{util::rollout, RandomPolicy},
    CsvRecorder, EnvConfig, PluginConfig, RunConfig, RunMetadata,
};
use tempdir::TempDir;

#[test]
fn test_run_from_yaml() -> Result<()> {
    let dir = TempDir::new("lockstep_run")?;
    let config = RunConfig::default().env(
        EnvConfig::default()
            .num_envs(4)
            .decimation(2)
            .episode_length(30)
            .task(PluginConfig::new("go_through_positions")),
    );
    config.save(dir.path().join("run.yaml"))?;

    let mut env = RunConfig::load(dir.path().join("run.yaml"))?.make_env()?;
    let out = dir.path().join("out");
    RunMetadata::new(&env).save(&out)?;
    let mut recorder = CsvRecorder::new(&out)?;
    let mut policy = RandomPolicy::new(env.spaces().action, 0);

    let summary = rollout(&mut env, &mut policy, 90, 30, &mut recorder)?;
    assert!(summary.episodes >= 4 * 3);

    let text = std::fs::read_to_string(recorder.path())?;
    assert_eq!(text.lines().count(), 1 + 3);
    assert!(text.starts_with("window,"));
    recorder.finish()?;
    Ok(())
}
