//! Environment step.
use crate::record::Record;
use ndarray::{Array1, Array2, Zip};

/// Additional information emitted with a [`Step`].
#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    /// Per-episode metrics of the slots reset in this step, keyed `category/name`.
    ///
    /// Empty when no slot was reset.
    pub log: Record,

    /// Privileged state, present when the composed state space is not empty.
    pub states: Option<Array2<f32>>,

    /// Slots that ended an episode in this step and were reset.
    pub done_ids: Vec<usize>,
}

/// Result of one batched step.
///
/// Slots listed in `info.done_ids` have already been reset: their rows of `obs`
/// are the first observation of the next episode.
#[derive(Debug, Clone)]
pub struct Step {
    /// Observation, `N × observation_space`.
    pub obs: Array2<f32>,

    /// Reward, one per slot.
    pub reward: Array1<f32>,

    /// Episode ended by a failure condition.
    pub early_termination: Array1<bool>,

    /// Episode ended by success or timeout.
    pub clean_termination: Array1<bool>,

    /// Information besides the transition itself.
    pub info: StepInfo,
}

impl Step {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: Array2<f32>,
        reward: Array1<f32>,
        early_termination: Array1<bool>,
        clean_termination: Array1<bool>,
        info: StepInfo,
    ) -> Self {
        Step {
            obs,
            reward,
            early_termination,
            clean_termination,
            info,
        }
    }

    /// Early or clean termination, per slot.
    pub fn is_done(&self) -> Array1<bool> {
        Zip::from(&self.early_termination)
            .and(&self.clean_termination)
            .map_collect(|&e, &c| e || c)
    }

    /// Number of slots in the step.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` for a step over zero slots.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }
}
