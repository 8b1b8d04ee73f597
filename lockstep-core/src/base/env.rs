//! Environment.
use super::Step;
use crate::space::SpaceSizes;
use anyhow::Result;
use ndarray::{Array2, ArrayView2};

/// The step/reset boundary consumed by a training loop.
///
/// An environment advances `num_envs()` slots in lockstep.
pub trait Env {
    /// Number of slots.
    fn num_envs(&self) -> usize;

    /// Composed spaces exposed to the caller.
    fn spaces(&self) -> &SpaceSizes;

    /// Performs a step of all slots and resets the slots whose episode ended.
    fn step(&mut self, act: ArrayView2<f32>) -> Result<Step>;

    /// Resets the given slots, or all slots if `env_ids` is `None`, and returns
    /// the observation of all slots.
    fn reset(&mut self, env_ids: Option<&[usize]>) -> Result<Array2<f32>>;
}
