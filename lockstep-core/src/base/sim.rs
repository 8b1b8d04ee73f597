//! Handle on the physics and scene collaborator.
use crate::error::LockstepError;
use anyhow::Result;
use ndarray::{s, Array1, Array2, ArrayView2};

/// Batched state of the articulation simulated in every slot.
///
/// Root state is planar: position `(x, y)` and heading `yaw` in the world frame.
/// Joint buffers have one column per joint, in the order of
/// [`Simulation::joint_names`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArticulationData {
    /// Root position in the world frame, `N × 2`.
    pub root_pos_w: Array2<f32>,

    /// Root heading in the world frame, in `(-π, π]`.
    pub root_yaw_w: Array1<f32>,

    /// Root linear velocity in the world frame, `N × 2`.
    pub root_lin_vel_w: Array2<f32>,

    /// Root angular velocity about the vertical axis.
    pub root_ang_vel_w: Array1<f32>,

    /// Joint positions, `N × J`.
    pub joint_pos: Array2<f32>,

    /// Joint velocities, `N × J`.
    pub joint_vel: Array2<f32>,

    /// Joint accelerations over the last physics step, `N × J`.
    pub joint_acc: Array2<f32>,

    /// Commanded joint velocities, `N × J`.
    pub joint_vel_target: Array2<f32>,
}

impl ArticulationData {
    /// Zeroed buffers for `num_envs` slots and `num_joints` joints.
    pub fn new(num_envs: usize, num_joints: usize) -> Self {
        Self {
            root_pos_w: Array2::zeros((num_envs, 2)),
            root_yaw_w: Array1::zeros(num_envs),
            root_lin_vel_w: Array2::zeros((num_envs, 2)),
            root_ang_vel_w: Array1::zeros(num_envs),
            joint_pos: Array2::zeros((num_envs, num_joints)),
            joint_vel: Array2::zeros((num_envs, num_joints)),
            joint_acc: Array2::zeros((num_envs, num_joints)),
            joint_vel_target: Array2::zeros((num_envs, num_joints)),
        }
    }

    /// Number of slots.
    pub fn num_envs(&self) -> usize {
        self.root_yaw_w.len()
    }

    /// Root linear velocity rotated into the body frame, `N × 2`.
    pub fn root_lin_vel_b(&self) -> Array2<f32> {
        let mut vel_b = Array2::zeros((self.num_envs(), 2));
        for (ix, mut row) in vel_b.outer_iter_mut().enumerate() {
            let (sin, cos) = self.root_yaw_w[ix].sin_cos();
            let vx = self.root_lin_vel_w[[ix, 0]];
            let vy = self.root_lin_vel_w[[ix, 1]];
            row[0] = cos * vx + sin * vy;
            row[1] = -sin * vx + cos * vy;
        }
        vel_b
    }

    /// Writes the rows of `pose` (`x, y, yaw`) and `velocity` (`vx, vy, ω`) into
    /// the root state of the given slots.
    pub fn write_root_state(
        &mut self,
        env_ids: &[usize],
        pose: ArrayView2<f32>,
        velocity: ArrayView2<f32>,
    ) {
        for (k, &ix) in env_ids.iter().enumerate() {
            self.root_pos_w
                .row_mut(ix)
                .assign(&pose.slice(s![k, 0..2]));
            self.root_yaw_w[ix] = pose[[k, 2]];
            self.root_lin_vel_w
                .row_mut(ix)
                .assign(&velocity.slice(s![k, 0..2]));
            self.root_ang_vel_w[ix] = velocity[[k, 2]];
        }
    }

    /// Writes joint positions and velocities of the given slots and joints.
    ///
    /// Joint accelerations of those entries are cleared.
    pub fn write_joint_state(
        &mut self,
        env_ids: &[usize],
        joint_ids: &[usize],
        position: ArrayView2<f32>,
        velocity: ArrayView2<f32>,
    ) {
        for (k, &ix) in env_ids.iter().enumerate() {
            for (j, &jx) in joint_ids.iter().enumerate() {
                self.joint_pos[[ix, jx]] = position[[k, j]];
                self.joint_vel[[ix, jx]] = velocity[[k, j]];
                self.joint_acc[[ix, jx]] = 0.0;
            }
        }
    }
}

/// The physics/scene collaborator as seen by the driver and the plugins.
///
/// Every slot holds one instance of the same articulation. All calls are
/// synchronous; [`Simulation::step`] integrates one physics sub-step for the
/// whole batch.
pub trait Simulation {
    /// Number of slots.
    fn num_envs(&self) -> usize;

    /// Duration of one physics sub-step in seconds.
    fn physics_dt(&self) -> f32;

    /// Origin of every slot in the world frame, `N × 2`.
    fn env_origins(&self) -> ArrayView2<f32>;

    /// Names of the articulation's joints.
    fn joint_names(&self) -> &[String];

    /// Current articulation state.
    fn data(&self) -> &ArticulationData;

    /// Sets velocity targets; `targets` has one column per entry of `joint_ids`.
    fn set_joint_velocity_target(&mut self, targets: ArrayView2<f32>, joint_ids: &[usize]);

    /// Teleports the root of the given slots, see [`ArticulationData::write_root_state`].
    fn write_root_state(
        &mut self,
        env_ids: &[usize],
        pose: ArrayView2<f32>,
        velocity: ArrayView2<f32>,
    );

    /// Overwrites joint state of the given slots.
    fn write_joint_state(
        &mut self,
        env_ids: &[usize],
        joint_ids: &[usize],
        position: ArrayView2<f32>,
        velocity: ArrayView2<f32>,
    );

    /// Integrates one physics sub-step.
    fn step(&mut self);

    /// Refreshes buffers derived from the integrated state.
    fn sync(&mut self);

    /// Draws debug markers. Best effort; the default does nothing.
    fn draw_markers(&mut self, _name: &str, _positions: ArrayView2<f32>) {}
}

/// Resolves joint names into indices of the articulation's joint buffers.
pub fn find_joints<S: Simulation + ?Sized>(sim: &S, names: &[String]) -> Result<Vec<usize>> {
    names
        .iter()
        .map(|name| {
            sim.joint_names()
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| LockstepError::UnknownJoint(name.clone()).into())
        })
        .collect()
}
