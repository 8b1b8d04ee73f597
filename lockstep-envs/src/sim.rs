//! Planar differential-drive simulation.
//!
//! Each slot holds a two-wheeled robot on a plane. Wheel velocities follow
//! their targets with a first-order lag:
//!
//! ```text
//! ω(t + dt) = ω(t) + α (ω_target - ω(t)),  α = dt / (dt + τ)
//! ```
//!
//! and the body moves with unicycle kinematics,
//! `v = r (ω_l + ω_r) / 2`, `ω_z = r (ω_r - ω_l) / b`.
use anyhow::Result;
use lockstep_core::{util::wrap_angle, ArticulationData, LockstepError, Simulation};
use log::info;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration of [`PlanarSim`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanarSimConfig {
    /// Physics time step in seconds.
    pub physics_dt: f32,

    /// Distance between neighbouring slot origins on the grid.
    pub env_spacing: f32,

    /// Wheel radius in meters.
    pub wheel_radius: f32,

    /// Distance between the wheels in meters.
    pub wheel_base: f32,

    /// Time constant of the wheel motors in seconds; 0 for an instantaneous response.
    pub motor_time_constant: f32,

    /// Names of the left and right wheel joints.
    pub joint_names: [String; 2],
}

impl Default for PlanarSimConfig {
    fn default() -> Self {
        Self {
            physics_dt: 1.0 / 60.0,
            env_spacing: 20.0,
            wheel_radius: 0.0325,
            wheel_base: 0.1125,
            motor_time_constant: 0.05,
            joint_names: ["left_wheel_joint".to_string(), "right_wheel_joint".to_string()],
        }
    }
}

impl PlanarSimConfig {
    /// Sets the physics time step.
    pub fn physics_dt(mut self, v: f32) -> Self {
        self.physics_dt = v;
        self
    }

    /// Sets the spacing of the slot origins.
    pub fn env_spacing(mut self, v: f32) -> Self {
        self.env_spacing = v;
        self
    }

    /// Sets the motor time constant.
    pub fn motor_time_constant(mut self, v: f32) -> Self {
        self.motor_time_constant = v;
        self
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("physics_dt", self.physics_dt),
            ("wheel_radius", self.wheel_radius),
            ("wheel_base", self.wheel_base),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(LockstepError::InvalidConfig(format!("{} must be positive", name)).into());
            }
        }
        if self.motor_time_constant < 0.0 || self.env_spacing < 0.0 {
            return Err(LockstepError::InvalidConfig(
                "motor_time_constant and env_spacing must not be negative".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// Kinematic simulation of `N` differential-drive robots.
///
/// Joint 0 is the left wheel and joint 1 the right wheel.
pub struct PlanarSim {
    config: PlanarSimConfig,
    data: ArticulationData,
    origins: Array2<f32>,
    joint_names: Vec<String>,
    markers: HashMap<String, Array2<f32>>,
}

impl PlanarSim {
    /// Creates the simulation with slot origins on a square grid centred on zero.
    pub fn new(num_envs: usize, config: PlanarSimConfig) -> Result<Self> {
        config.validate()?;
        let origins = grid_origins(num_envs, config.env_spacing);
        info!(
            "Created planar simulation: num_envs = {}, physics_dt = {}",
            num_envs, config.physics_dt
        );
        Ok(Self {
            joint_names: config.joint_names.to_vec(),
            config,
            data: ArticulationData::new(num_envs, 2),
            origins,
            markers: HashMap::new(),
        })
    }

    /// Configuration of the simulation.
    pub fn config(&self) -> &PlanarSimConfig {
        &self.config
    }

    /// Last positions drawn for a marker set.
    pub fn markers(&self, name: &str) -> Option<ArrayView2<f32>> {
        self.markers.get(name).map(|m| m.view())
    }

    fn alpha(&self) -> f32 {
        let dt = self.config.physics_dt;
        let tau = self.config.motor_time_constant;
        if tau <= 0.0 {
            1.0
        } else {
            dt / (dt + tau)
        }
    }
}

fn grid_origins(num_envs: usize, spacing: f32) -> Array2<f32> {
    let cols = (num_envs as f32).sqrt().ceil().max(1.0) as usize;
    let rows = (num_envs + cols - 1) / cols;
    let mut origins = Array2::zeros((num_envs, 2));
    for (ix, mut row) in origins.outer_iter_mut().enumerate() {
        let (r, c) = (ix / cols, ix % cols);
        row[0] = (r as f32 - (rows as f32 - 1.0) / 2.0) * spacing;
        row[1] = (c as f32 - (cols as f32 - 1.0) / 2.0) * spacing;
    }
    origins
}

impl Simulation for PlanarSim {
    fn num_envs(&self) -> usize {
        self.data.num_envs()
    }

    fn physics_dt(&self) -> f32 {
        self.config.physics_dt
    }

    fn env_origins(&self) -> ArrayView2<f32> {
        self.origins.view()
    }

    fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    fn data(&self) -> &ArticulationData {
        &self.data
    }

    fn set_joint_velocity_target(&mut self, targets: ArrayView2<f32>, joint_ids: &[usize]) {
        for (j, &jx) in joint_ids.iter().enumerate() {
            self.data
                .joint_vel_target
                .column_mut(jx)
                .assign(&targets.column(j));
        }
    }

    fn write_root_state(
        &mut self,
        env_ids: &[usize],
        pose: ArrayView2<f32>,
        velocity: ArrayView2<f32>,
    ) {
        self.data.write_root_state(env_ids, pose, velocity);
    }

    fn write_joint_state(
        &mut self,
        env_ids: &[usize],
        joint_ids: &[usize],
        position: ArrayView2<f32>,
        velocity: ArrayView2<f32>,
    ) {
        self.data
            .write_joint_state(env_ids, joint_ids, position, velocity);
        // motors start from the written velocity
        for &ix in env_ids {
            for &jx in joint_ids {
                self.data.joint_vel_target[[ix, jx]] = self.data.joint_vel[[ix, jx]];
            }
        }
    }

    fn step(&mut self) {
        let dt = self.config.physics_dt;
        let r = self.config.wheel_radius;
        let b = self.config.wheel_base;
        let alpha = self.alpha();
        let data = &mut self.data;

        for ix in 0..data.num_envs() {
            for jx in 0..2 {
                let vel = data.joint_vel[[ix, jx]];
                let new_vel = vel + alpha * (data.joint_vel_target[[ix, jx]] - vel);
                data.joint_acc[[ix, jx]] = (new_vel - vel) / dt;
                data.joint_vel[[ix, jx]] = new_vel;
                data.joint_pos[[ix, jx]] += new_vel * dt;
            }

            let (left, right) = (data.joint_vel[[ix, 0]], data.joint_vel[[ix, 1]]);
            let v = r * (left + right) / 2.0;
            let w = r * (right - left) / b;
            let yaw = wrap_angle(data.root_yaw_w[ix] + w * dt);
            let (sin, cos) = yaw.sin_cos();
            data.root_yaw_w[ix] = yaw;
            data.root_pos_w[[ix, 0]] += v * cos * dt;
            data.root_pos_w[[ix, 1]] += v * sin * dt;
        }
    }

    fn sync(&mut self) {
        let r = self.config.wheel_radius;
        let b = self.config.wheel_base;
        let data = &mut self.data;

        for ix in 0..data.num_envs() {
            let (left, right) = (data.joint_vel[[ix, 0]], data.joint_vel[[ix, 1]]);
            let v = r * (left + right) / 2.0;
            let (sin, cos) = data.root_yaw_w[ix].sin_cos();
            data.root_lin_vel_w[[ix, 0]] = v * cos;
            data.root_lin_vel_w[[ix, 1]] = v * sin;
            data.root_ang_vel_w[ix] = r * (right - left) / b;
        }
    }

    fn draw_markers(&mut self, name: &str, positions: ArrayView2<f32>) {
        self.markers.insert(name.to_string(), positions.to_owned());
    }
}
