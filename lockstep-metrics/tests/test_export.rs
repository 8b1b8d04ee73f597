use anyhow::Result;
use lockstep_core::{
    dummy::{DummyRobot, DummySim, DummyTask},
    util::rollout,
    EnvConfig, EnvironmentDriver, PluginConfig, ZeroPolicy,
};
use lockstep_metrics::{CsvRecorder, RunMetadata, METADATA_FILE, METRICS_FILE};
use tempdir::TempDir;

#[test_log::test]
fn test_rollout_export() -> Result<()> {
    let config = EnvConfig::default()
        .num_envs(4)
        .decimation(2)
        .episode_length(5)
        .robot(PluginConfig::new("dummy"))
        .task(PluginConfig::new("dummy"));
    let mut env = EnvironmentDriver::new(
        &config,
        DummySim::new(4),
        Box::new(DummyRobot::new(4)),
        Box::new(DummyTask::new(4, 1)),
    )?;
    let dir = TempDir::new("rollout_export")?;
    RunMetadata::new(&env).save(dir.path())?;
    let mut recorder = CsvRecorder::new(dir.path())?;

    rollout(&mut env, &mut ZeroPolicy::new(2), 20, 10, &mut recorder)?;

    let metadata = RunMetadata::load(dir.path().join(METADATA_FILE))?;
    assert_eq!(metadata.num_envs, 4);
    assert_eq!(metadata.episode_length, 5);
    assert_eq!(metadata.task, "dummy");

    let mut rdr = csv::Reader::from_path(dir.path().join(METRICS_FILE))?;
    let header: Vec<String> = rdr.headers()?.iter().map(|s| s.to_string()).collect();
    assert_eq!(header[0], "window");
    let length_ix = header
        .iter()
        .position(|k| k == "Episode/length")
        .expect("episode length column");

    let rows = rdr.records().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(rows.len(), 2);
    for (ix, row) in rows.iter().enumerate() {
        assert_eq!(&row[0], ix.to_string());
        assert_eq!(&row[length_ix], "5");
        assert_eq!(row.len(), header.len());
    }
    Ok(())
}
