//! Configuration of a run on the planar simulation.
use crate::{
    registry::{builtin_robots, builtin_tasks},
    sim::{PlanarSim, PlanarSimConfig},
};
use anyhow::Result;
use lockstep_core::{EnvConfig, EnvironmentDriver};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Environment and simulation settings of a run.
///
/// ```yaml
/// env:
///   num_envs: 16
///   decimation: 4
///   episode_length: 300
///   seed: 42
///   robot:
///     type: jetbot
///   task:
///     type: go_to_position
///     settings:
///       position_tolerance: 0.05
/// sim:
///   physics_dt: 0.0166667
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Environment configuration.
    pub env: EnvConfig,

    /// Simulation configuration.
    #[serde(default)]
    pub sim: PlanarSimConfig,
}

impl RunConfig {
    /// Sets the environment configuration.
    pub fn env(mut self, v: EnvConfig) -> Self {
        self.env = v;
        self
    }

    /// Sets the simulation configuration.
    pub fn sim(mut self, v: PlanarSimConfig) -> Self {
        self.sim = v;
        self
    }

    /// Builds the environment with the built-in plugins.
    pub fn make_env(&self) -> Result<EnvironmentDriver<PlanarSim>> {
        let sim = PlanarSim::new(self.env.num_envs, self.sim.clone())?;
        EnvironmentDriver::from_registry(&self.env, sim, &builtin_robots()?, &builtin_tasks()?)
    }

    /// Constructs [`RunConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b: Self = serde_yaml::from_reader(rdr)?;
        b.env.validate()?;
        Ok(b)
    }

    /// Saves [`RunConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
