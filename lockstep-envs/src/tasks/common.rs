//! Geometry shared by the navigation tasks.
use lockstep_core::{
    util::{lerp, wrap_angle},
    ArticulationData,
};
use ndarray::{Array1, Array2, ArrayView1};
use std::f32::consts::{PI, TAU};

/// Distance and heading error from the robot root of slot `ix` to `target`.
///
/// The heading error is the angle from the robot's heading to the bearing of
/// the target, in `(-π, π]`.
pub(crate) fn polar_error(data: &ArticulationData, ix: usize, target: ArrayView1<f32>) -> (f32, f32) {
    let dx = target[0] - data.root_pos_w[[ix, 0]];
    let dy = target[1] - data.root_pos_w[[ix, 1]];
    let bearing = dy.atan2(dx);
    ((dx * dx + dy * dy).sqrt(), wrap_angle(bearing - data.root_yaw_w[ix]))
}

/// Observation common to the navigation tasks, `N × 6`:
/// body-frame linear velocity, yaw rate, distance, cos and sin of the heading error.
pub(crate) fn base_observations(
    data: &ArticulationData,
    distance: &Array1<f32>,
    heading_error: &Array1<f32>,
) -> Array2<f32> {
    let vel_b = data.root_lin_vel_b();
    let mut obs = Array2::zeros((data.num_envs(), 6));
    for (ix, mut row) in obs.outer_iter_mut().enumerate() {
        row[0] = vel_b[[ix, 0]];
        row[1] = vel_b[[ix, 1]];
        row[2] = data.root_ang_vel_w[ix];
        row[3] = distance[ix];
        row[4] = heading_error[ix].cos();
        row[5] = heading_error[ix].sin();
    }
    obs
}

/// Range of initial robot poses around a goal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpawnRange {
    pub min_distance: f32,
    pub max_distance: f32,
    pub max_heading_error: f32,
}

impl SpawnRange {
    /// Pose `(x, y, yaw)` from three unit samples: distance, bearing from the goal
    /// and heading error. The robot faces the goal up to the heading error.
    pub fn pose(&self, goal: [f32; 2], u: [f32; 3]) -> [f32; 3] {
        let distance = lerp(self.min_distance, self.max_distance, u[0]);
        let bearing = TAU * u[1];
        let heading_error = lerp(-self.max_heading_error, self.max_heading_error, u[2]);
        [
            goal[0] + distance * bearing.cos(),
            goal[1] + distance * bearing.sin(),
            wrap_angle(bearing + PI + heading_error),
        ]
    }
}

/// Point at `radius × u[0]` and angle `2π × u[1]` from `center`.
pub(crate) fn point_around(center: [f32; 2], radius: f32, u: [f32; 2]) -> [f32; 2] {
    let r = radius * u[0];
    let angle = TAU * u[1];
    [center[0] + r * angle.cos(), center[1] + r * angle.sin()]
}
