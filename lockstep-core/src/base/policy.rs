//! Policy.
use ndarray::{Array2, ArrayView2};

/// A policy on a batch of slots.
///
/// Policy is a mapping from an observation batch to an action batch.
pub trait Policy {
    /// Sample an action batch given an observation batch.
    fn sample(&mut self, obs: ArrayView2<f32>) -> Array2<f32>;
}

/// Always emits zero actions.
pub struct ZeroPolicy {
    action_space: usize,
}

impl ZeroPolicy {
    /// Constructs the policy.
    pub fn new(action_space: usize) -> Self {
        Self { action_space }
    }
}

impl Policy for ZeroPolicy {
    fn sample(&mut self, obs: ArrayView2<f32>) -> Array2<f32> {
        Array2::zeros((obs.nrows(), self.action_space))
    }
}

/// Emits actions uniformly distributed in `[-1, 1)`.
pub struct RandomPolicy {
    action_space: usize,
    rng: fastrand::Rng,
}

impl RandomPolicy {
    /// Constructs the policy with a seed.
    pub fn new(action_space: usize, seed: u64) -> Self {
        Self {
            action_space,
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn sample(&mut self, obs: ArrayView2<f32>) -> Array2<f32> {
        let rng = &self.rng;
        Array2::from_shape_simple_fn((obs.nrows(), self.action_space), || {
            2.0 * rng.f32() - 1.0
        })
    }
}
