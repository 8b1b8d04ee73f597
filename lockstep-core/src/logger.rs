//! Per-episode scalar metrics.
//!
//! Plugins register their metrics once, fold one value per slot into them at
//! every step, and the driver finalizes the slots that end an episode. The
//! finalized values are averaged over those slots and returned as a [`Record`]
//! with `category/name` keys.
use crate::{
    error::LockstepError,
    record::{Record, RecordValue},
};
use anyhow::Result;
use ndarray::{Array1, ArrayView1};
use std::collections::BTreeMap;

/// How the contributions of a slot are folded over an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Running mean over the contributions since the slot's last reset.
    Mean,
    /// Sum of the contributions.
    Sum,
    /// Largest contribution.
    Max,
    /// Smallest contribution.
    Min,
}

impl Aggregation {
    fn initial(&self) -> f32 {
        match self {
            Self::Mean | Self::Sum => 0.0,
            Self::Max => f32::NEG_INFINITY,
            Self::Min => f32::INFINITY,
        }
    }

    fn fold(&self, acc: f32, v: f32) -> f32 {
        match self {
            Self::Mean | Self::Sum => acc + v,
            Self::Max => acc.max(v),
            Self::Min => acc.min(v),
        }
    }
}

struct Accumulator {
    rule: Aggregation,
    values: Array1<f32>,
    contributions: Array1<u32>,
}

impl Accumulator {
    fn new(rule: Aggregation, num_envs: usize) -> Self {
        Self {
            rule,
            values: Array1::from_elem(num_envs, rule.initial()),
            contributions: Array1::zeros(num_envs),
        }
    }

    /// Finalized value of a slot; slots without contribution report 0.
    fn finalize(&self, ix: usize) -> f32 {
        match (self.contributions[ix], self.rule) {
            (0, _) => 0.0,
            (n, Aggregation::Mean) => self.values[ix] / n as f32,
            (_, _) => self.values[ix],
        }
    }

    fn clear(&mut self, ix: usize) {
        self.values[ix] = self.rule.initial();
        self.contributions[ix] = 0;
    }
}

/// Key of the mean episode length emitted by [`ScalarLogger::reset_logs`].
pub const EPISODE_LENGTH_KEY: &str = "Episode/length";

/// Aggregator of named per-slot scalars.
pub struct ScalarLogger {
    num_envs: usize,
    entries: BTreeMap<(String, String), Accumulator>,
}

impl ScalarLogger {
    /// Creates a logger for `num_envs` slots.
    pub fn new(num_envs: usize) -> Self {
        Self {
            num_envs,
            entries: BTreeMap::new(),
        }
    }

    /// Registers a metric.
    ///
    /// Fails with [`LockstepError::DuplicateMetric`] if `(category, name)` is already registered.
    pub fn add_log(&mut self, category: &str, name: &str, rule: Aggregation) -> Result<()> {
        let key = (category.to_string(), name.to_string());
        if self.entries.contains_key(&key) {
            return Err(LockstepError::DuplicateMetric(key.0, key.1).into());
        }
        self.entries.insert(key, Accumulator::new(rule, self.num_envs));
        Ok(())
    }

    /// Folds one value per slot into a registered metric.
    pub fn log(&mut self, category: &str, name: &str, values: ArrayView1<f32>) -> Result<()> {
        let num_envs = self.num_envs;
        let acc = self
            .entries
            .get_mut(&(category.to_string(), name.to_string()))
            .ok_or_else(|| LockstepError::UnknownMetric(category.into(), name.into()))?;

        if values.len() != num_envs {
            return Err(LockstepError::MetricLength {
                key: format!("{}/{}", category, name),
                expected: num_envs,
                got: values.len(),
            }
            .into());
        }

        let rule = acc.rule;
        acc.values
            .zip_mut_with(&values, |a, &v| *a = rule.fold(*a, v));
        acc.contributions += 1;
        Ok(())
    }

    /// Finalizes the metrics of the given slots and clears them.
    ///
    /// Each metric is finalized per slot according to its rule and averaged over
    /// `env_ids`. The returned record also holds [`EPISODE_LENGTH_KEY`], the mean
    /// of `episode_length` over `env_ids`. Rows outside `env_ids` are not touched.
    /// An empty `env_ids` returns an empty record.
    pub fn reset_logs(&mut self, env_ids: &[usize], episode_length: ArrayView1<u32>) -> Record {
        let mut record = Record::empty();
        if env_ids.is_empty() {
            return record;
        }
        let n = env_ids.len() as f32;

        for ((category, name), acc) in self.entries.iter_mut() {
            let mean = env_ids.iter().map(|&ix| acc.finalize(ix)).sum::<f32>() / n;
            record.insert(format!("{}/{}", category, name), RecordValue::Scalar(mean));
            env_ids.iter().for_each(|&ix| acc.clear(ix));
        }

        let length = env_ids
            .iter()
            .map(|&ix| episode_length[ix] as f32)
            .sum::<f32>()
            / n;
        record.insert(EPISODE_LENGTH_KEY, RecordValue::Scalar(length));

        record
    }

    /// Value a metric would finalize to for slot `ix`, without clearing it.
    pub fn value(&self, category: &str, name: &str, ix: usize) -> Result<f32> {
        let acc = self
            .entries
            .get(&(category.to_string(), name.to_string()))
            .ok_or_else(|| LockstepError::UnknownMetric(category.into(), name.into()))?;
        Ok(acc.finalize(ix))
    }

    /// Registered keys as `category/name`, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .keys()
            .map(|(c, n)| format!("{}/{}", c, n))
            .collect()
    }

    /// Number of slots.
    pub fn num_envs(&self) -> usize {
        self.num_envs
    }
}
