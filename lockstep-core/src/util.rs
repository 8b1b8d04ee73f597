//! Utilities for slot bookkeeping, seeded sampling and rollouts.
use crate::{
    error::LockstepError,
    record::AggregateRecorder,
    Env, Policy,
};
use anyhow::Result;
use log::info;
use ndarray::{Array2, ArrayView2};
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Validates slot ids and returns the permutation that sorts them.
///
/// Fails if an id is outside `[0, num_envs)` or appears twice.
pub fn env_id_order(env_ids: &[usize], num_envs: usize) -> Result<Vec<usize>> {
    if let Some(&id) = env_ids.iter().find(|&&id| id >= num_envs) {
        return Err(LockstepError::EnvIdOutOfRange { id, num_envs }.into());
    }
    let mut order: Vec<usize> = (0..env_ids.len()).collect();
    order.sort_by_key(|&k| env_ids[k]);
    if let Some(w) = order.windows(2).find(|w| env_ids[w[0]] == env_ids[w[1]]) {
        return Err(LockstepError::DuplicateEnvId(env_ids[w[0]]).into());
    }
    Ok(order)
}

/// Draws `dims` unit samples in `[0, 1]` for each of `n` reset slots.
///
/// Row `k` comes from, in order of precedence:
/// 1. row `k` of `generator`, clamped to `[0, 1]`,
/// 2. a generator seeded with `seeds[k]`,
/// 3. `rng`.
///
/// Precedence 2 makes the initial conditions of a slot a function of its seed alone.
pub fn unit_samples(
    rng: &mut SmallRng,
    n: usize,
    dims: usize,
    generator: Option<ArrayView2<f32>>,
    seeds: Option<&[u64]>,
) -> Array2<f32> {
    let mut samples = Array2::zeros((n, dims));
    for (k, mut row) in samples.outer_iter_mut().enumerate() {
        match (&generator, seeds) {
            (Some(g), _) => row.assign(&g.row(k).mapv(|v| v.clamp(0.0, 1.0))),
            (None, Some(seeds)) => {
                let mut slot_rng = SmallRng::seed_from_u64(seeds[k]);
                row.iter_mut().for_each(|v| *v = slot_rng.gen::<f32>());
            }
            (None, None) => row.iter_mut().for_each(|v| *v = rng.gen::<f32>()),
        }
    }
    samples
}

/// Linear map of a unit sample into `[lo, hi]`.
pub fn lerp(lo: f32, hi: f32, u: f32) -> f32 {
    lo + (hi - lo) * u
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_angle(a: f32) -> f32 {
    use std::f32::consts::PI;
    let a = (a + PI).rem_euclid(2.0 * PI) - PI;
    if a <= -PI {
        a + 2.0 * PI
    } else {
        a
    }
}

/// Summary of a rollout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolloutSummary {
    /// Number of batched steps performed.
    pub steps: usize,

    /// Number of episodes that ended, over all slots.
    pub episodes: usize,

    /// Sum of rewards over all slots and steps.
    pub total_reward: f32,
}

/// Runs a policy for `n_steps` batched steps.
///
/// The log of every step is stored in `recorder`, and the recorder is flushed
/// every `flush_interval` steps and once more at the end if anything is pending.
pub fn rollout<E, P, R>(
    env: &mut E,
    policy: &mut P,
    n_steps: usize,
    flush_interval: usize,
    recorder: &mut R,
) -> Result<RolloutSummary>
where
    E: Env,
    P: Policy,
    R: AggregateRecorder,
{
    let flush_interval = flush_interval.max(1);
    let mut summary = RolloutSummary::default();
    let mut window = 0;
    let mut pending = false;
    let mut obs = env.reset(None)?;

    for step_ix in 0..n_steps {
        let act = policy.sample(obs.view());
        let step = env.step(act.view())?;

        summary.steps += 1;
        summary.episodes += step.info.done_ids.len();
        summary.total_reward += step.reward.sum();

        if !step.info.log.is_empty() {
            recorder.store(step.info.log);
            pending = true;
        }
        obs = step.obs;

        if (step_ix + 1) % flush_interval == 0 && pending {
            recorder.flush(window);
            info!(
                "Window {}: {} steps, {} episodes",
                window, summary.steps, summary.episodes
            );
            window += 1;
            pending = false;
        }
    }

    if pending {
        recorder.flush(window);
    }

    Ok(summary)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;
    use std::f32::consts::PI;

    #[test]
    fn test_env_id_order() -> Result<()> {
        assert_eq!(env_id_order(&[3, 1, 0], 4)?, vec![2, 1, 0]);
        assert_eq!(env_id_order(&[], 4)?, Vec::<usize>::new());

        let err = env_id_order(&[0, 4], 4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LockstepError>(),
            Some(&LockstepError::EnvIdOutOfRange { id: 4, num_envs: 4 })
        );
        let err = env_id_order(&[2, 1, 2], 4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LockstepError>(),
            Some(&LockstepError::DuplicateEnvId(2))
        );
        Ok(())
    }

    #[test]
    fn test_unit_samples_precedence() {
        let mut rng = SmallRng::seed_from_u64(0);
        let g = array![[-1.0, 0.5], [2.0, 0.25]];
        let s = unit_samples(&mut rng, 2, 2, Some(g.view()), Some(&[1, 2]));
        assert_eq!(s, array![[0.0, 0.5], [1.0, 0.25]]);

        // seeded rows do not depend on the shared generator or on the other rows
        let a = unit_samples(&mut SmallRng::seed_from_u64(1), 2, 3, None, Some(&[7, 8]));
        let b = unit_samples(&mut SmallRng::seed_from_u64(2), 1, 3, None, Some(&[8]));
        assert_eq!(a.row(1), b.row(0));
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
        assert!(wrap_angle(-PI) > 0.0);
    }
}
