//! Configuration of [`EnvironmentDriver`](crate::EnvironmentDriver).
use crate::error::LockstepError;
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Version of the configuration format understood by this crate.
pub const CONFIG_VERSION: u32 = 1;

fn config_version() -> u32 {
    CONFIG_VERSION
}

fn null_settings() -> serde_yaml::Value {
    serde_yaml::Value::Null
}

/// Selects a plugin type from a registry and carries its settings.
///
/// ```yaml
/// type: jetbot
/// settings:
///   max_wheel_velocity: 10.0
/// ```
///
/// `settings` is deserialized by the constructor registered for `type`, into
/// the plugin's own configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    /// Registry tag.
    #[serde(rename = "type")]
    pub kind: String,

    /// Plugin-specific settings. Missing settings mean the plugin defaults.
    #[serde(default = "null_settings")]
    pub settings: serde_yaml::Value,
}

impl PluginConfig {
    /// Selects `kind` with default settings.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            settings: serde_yaml::Value::Null,
        }
    }

    /// Selects `kind` with the given settings.
    pub fn with_settings<T: Serialize>(kind: impl Into<String>, settings: &T) -> Result<Self> {
        Ok(Self {
            kind: kind.into(),
            settings: serde_yaml::to_value(settings)?,
        })
    }

    /// Deserializes the settings into the plugin's configuration struct.
    ///
    /// Unknown fields are an error if `T` denies them.
    pub fn settings<T: DeserializeOwned + Default>(&self) -> Result<T> {
        match &self.settings {
            serde_yaml::Value::Null => Ok(T::default()),
            value => Ok(serde_yaml::from_value(value.clone())?),
        }
    }
}

/// Configuration of [`EnvironmentDriver`](crate::EnvironmentDriver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    /// Format version, must be [`CONFIG_VERSION`].
    #[serde(default = "config_version")]
    pub version: u32,

    /// Number of slots.
    pub num_envs: usize,

    /// Physics sub-steps per control step.
    pub decimation: usize,

    /// Episode horizon in control steps.
    pub episode_length: usize,

    /// Seed of the plugins' random generators.
    #[serde(default)]
    pub seed: u64,

    /// Enables debug visualization at construction.
    #[serde(default)]
    pub debug_vis: bool,

    /// Robot plugin.
    pub robot: PluginConfig,

    /// Task plugin.
    pub task: PluginConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            num_envs: 1,
            decimation: 1,
            episode_length: 1,
            seed: 42,
            debug_vis: false,
            robot: PluginConfig::new("jetbot"),
            task: PluginConfig::new("go_to_position"),
        }
    }
}

impl EnvConfig {
    /// Sets the number of slots.
    pub fn num_envs(mut self, v: usize) -> Self {
        self.num_envs = v;
        self
    }

    /// Sets the number of physics sub-steps per control step.
    pub fn decimation(mut self, v: usize) -> Self {
        self.decimation = v;
        self
    }

    /// Sets the episode horizon.
    pub fn episode_length(mut self, v: usize) -> Self {
        self.episode_length = v;
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Enables or disables debug visualization.
    pub fn debug_vis(mut self, v: bool) -> Self {
        self.debug_vis = v;
        self
    }

    /// Sets the robot plugin.
    pub fn robot(mut self, v: PluginConfig) -> Self {
        self.robot = v;
        self
    }

    /// Sets the task plugin.
    pub fn task(mut self, v: PluginConfig) -> Self {
        self.task = v;
        self
    }

    /// Checks the version and value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(LockstepError::ConfigVersion {
                expected: CONFIG_VERSION,
                found: self.version,
            }
            .into());
        }
        let positive = [
            ("num_envs", self.num_envs),
            ("decimation", self.decimation),
            ("episode_length", self.episode_length),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(LockstepError::InvalidConfig(format!("{} must be positive", name)).into());
            }
        }
        // episode counters are u32
        if self.episode_length > u32::MAX as usize {
            return Err(LockstepError::InvalidConfig(format!(
                "episode_length must not exceed {}",
                u32::MAX
            ))
            .into());
        }
        Ok(())
    }

    /// Constructs [`EnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b: Self = serde_yaml::from_reader(rdr)?;
        b.validate()?;
        Ok(b)
    }

    /// Saves [`EnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct WheelSettings {
        radius: f32,
        joints: Vec<String>,
    }

    #[test]
    fn test_serde_env_config() -> Result<()> {
        let config = EnvConfig::default()
            .num_envs(16)
            .decimation(4)
            .episode_length(300)
            .robot(PluginConfig::with_settings(
                "jetbot",
                &WheelSettings {
                    radius: 0.1,
                    joints: vec!["left".into()],
                },
            )?);

        let dir = TempDir::new("env_config")?;
        let path = dir.path().join("env.yaml");
        config.save(&path)?;
        let config_ = EnvConfig::load(&path)?;
        assert_eq!(config, config_);

        let settings: WheelSettings = config_.robot.settings()?;
        assert_eq!(settings.radius, 0.1);
        let defaults: WheelSettings = config_.task.settings()?;
        assert_eq!(defaults, WheelSettings::default());
        Ok(())
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let yaml = "
num_envs: 2
decimation: 1
episode_length: 10
horizon: 3
robot:
  type: jetbot
task:
  type: go_to_position
";
        assert!(serde_yaml::from_str::<EnvConfig>(yaml).is_err());

        let plugin = PluginConfig {
            kind: "jetbot".into(),
            settings: serde_yaml::from_str("radius: 0.2\ncolour: red\n").unwrap(),
        };
        assert!(plugin.settings::<WheelSettings>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(EnvConfig::default().validate().is_ok());
        assert!(EnvConfig::default().decimation(0).validate().is_err());
        assert!(EnvConfig::default()
            .episode_length(u32::MAX as usize)
            .validate()
            .is_ok());
        assert!(EnvConfig::default()
            .episode_length(u32::MAX as usize + 1)
            .validate()
            .is_err());

        let mut config = EnvConfig::default();
        config.version = 2;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<LockstepError>(),
            Some(&LockstepError::ConfigVersion {
                expected: 1,
                found: 2
            })
        );
    }
}
