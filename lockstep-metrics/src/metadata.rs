use anyhow::Result;
use chrono::{DateTime, Local};
use lockstep_core::{EnvironmentDriver, Simulation, SpaceSizes};
use serde::{Deserialize, Serialize};
use std::{
    fs::{create_dir_all, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Name of the run-metadata record in a run directory.
pub const METADATA_FILE: &str = "metadata.yaml";

/// Shape of a run, saved next to its metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Type tag of the robot plugin.
    pub robot: String,

    /// Type tag of the task plugin.
    pub task: String,

    /// Number of environment slots.
    pub num_envs: usize,

    /// Simulation steps per environment step.
    pub decimation: usize,

    /// Episode horizon in environment steps.
    pub episode_length: usize,

    /// Base seed of the run.
    pub seed: u64,

    /// Sizes of the composed spaces.
    pub spaces: SpaceSizes,

    /// Time the run was started.
    pub start_time: DateTime<Local>,
}

impl RunMetadata {
    /// Describes the run of `env`, starting now.
    pub fn new<S: Simulation>(env: &EnvironmentDriver<S>) -> Self {
        let config = env.config();
        Self {
            robot: config.robot.kind.clone(),
            task: config.task.kind.clone(),
            num_envs: config.num_envs,
            decimation: config.decimation,
            episode_length: config.episode_length,
            seed: config.seed,
            spaces: *env.spaces(),
            start_time: Local::now(),
        }
    }

    /// Writes `metadata.yaml` in `dir` and returns its path.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(METADATA_FILE);
        let mut file = File::create(&path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(path)
    }

    /// Reads a metadata record.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let rdr = BufReader::new(File::open(path)?);
        Ok(serde_yaml::from_reader(rdr)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use lockstep_core::{
        dummy::{DummyRobot, DummySim, DummyTask},
        EnvConfig, PluginConfig,
    };
    use tempdir::TempDir;

    #[test]
    fn test_save_and_load() -> Result<()> {
        let config = EnvConfig::default()
            .num_envs(3)
            .decimation(2)
            .episode_length(40)
            .seed(11)
            .robot(PluginConfig::new("dummy"))
            .task(PluginConfig::new("dummy"));
        let env = EnvironmentDriver::new(
            &config,
            DummySim::new(3),
            Box::new(DummyRobot::new(3)),
            Box::new(DummyTask::new(3, 11)),
        )?;
        let metadata = RunMetadata::new(&env);
        assert_eq!(metadata.spaces, *env.spaces());
        assert_eq!(metadata.spaces.action, 2);

        let dir = TempDir::new("run_metadata")?;
        let path = metadata.save(dir.path())?;
        assert_eq!(path, dir.path().join(METADATA_FILE));
        assert_eq!(RunMetadata::load(&path)?, metadata);
        Ok(())
    }
}
