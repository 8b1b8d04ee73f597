//! Explicit registries of plugin constructors.
//!
//! A registry maps a type tag to a constructor. Registries are filled once at
//! start-up; registering a tag twice fails right there instead of shadowing
//! the first entry.
use crate::{config::PluginConfig, error::LockstepError, RobotPlugin, TaskPlugin};
use anyhow::Result;
use std::collections::BTreeMap;

/// Arguments handed to every plugin constructor.
#[derive(Debug, Clone, Copy)]
pub struct PluginContext {
    /// Number of slots.
    pub num_envs: usize,

    /// Seed of the plugin's random generator.
    pub seed: u64,
}

/// Constructor of a robot plugin.
pub type RobotFactory = fn(&PluginConfig, PluginContext) -> Result<Box<dyn RobotPlugin>>;

/// Constructor of a task plugin.
pub type TaskFactory = fn(&PluginConfig, PluginContext) -> Result<Box<dyn TaskPlugin>>;

/// Registry of robot constructors.
pub type RobotRegistry = Registry<RobotFactory>;

/// Registry of task constructors.
pub type TaskRegistry = Registry<TaskFactory>;

/// Mapping from a type tag to a constructor.
pub struct Registry<F> {
    family: &'static str,
    entries: BTreeMap<String, F>,
}

impl<F: Copy> Registry<F> {
    /// An empty registry for the given plugin family, e.g. `"robot"`.
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            entries: BTreeMap::new(),
        }
    }

    /// Registers `factory` under `tag`.
    ///
    /// Fails with [`LockstepError::DuplicateRegistration`] if `tag` is taken.
    pub fn register(&mut self, tag: &str, factory: F) -> Result<()> {
        if self.entries.contains_key(tag) {
            return Err(LockstepError::DuplicateRegistration {
                family: self.family,
                tag: tag.to_string(),
            }
            .into());
        }
        self.entries.insert(tag.to_string(), factory);
        Ok(())
    }

    /// Looks up the constructor registered under `tag`.
    pub fn get(&self, tag: &str) -> Result<F> {
        self.entries.get(tag).copied().ok_or_else(|| {
            LockstepError::UnknownPluginType {
                family: self.family,
                tag: tag.to_string(),
            }
            .into()
        })
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }
}

impl Registry<RobotFactory> {
    /// Builds the robot selected by `config`.
    pub fn build(&self, config: &PluginConfig, ctx: PluginContext) -> Result<Box<dyn RobotPlugin>> {
        (self.get(&config.kind)?)(config, ctx)
    }
}

impl Registry<TaskFactory> {
    /// Builds the task selected by `config`.
    pub fn build(&self, config: &PluginConfig, ctx: PluginContext) -> Result<Box<dyn TaskPlugin>> {
        (self.get(&config.kind)?)(config, ctx)
    }
}
