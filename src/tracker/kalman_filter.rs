//! Linear Kalman filter over marker position, velocity and radius.
//!
//! State layout is `[x, y, vx, vy, radius, radius_rate]`; observations are
//! `[x, y, radius, 0]`, the last slot pinning the radius rate towards zero.
//! All matrices are fixed-size `nalgebra` types, and components are only
//! addressed through [`MotionState`] and the index constants below.

use nalgebra::{Point2, SMatrix, SVector};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracker::circle_detector::Circle;

const STATE_DIM: usize = 6;
const OBS_DIM: usize = 4;

type StateVector = SVector<f64, STATE_DIM>;
type StateMatrix = SMatrix<f64, STATE_DIM, STATE_DIM>;
type ObservationVector = SVector<f64, OBS_DIM>;
type ObservationMatrix = SMatrix<f64, OBS_DIM, STATE_DIM>;
type InnovationMatrix = SMatrix<f64, OBS_DIM, OBS_DIM>;

// State slots
const X: usize = 0;
const Y: usize = 1;
const VX: usize = 2;
const VY: usize = 3;
const RADIUS: usize = 4;
const RADIUS_RATE: usize = 5;

// Observation slots
const OBS_X: usize = 0;
const OBS_Y: usize = 1;
const OBS_RADIUS: usize = 2;
const OBS_RESERVED: usize = 3;

/// Noise model for [`MotionFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterNoise {
    /// Process noise on x and y (px^2).
    pub position: f64,
    /// Process noise on vx and vy.
    pub velocity: f64,
    /// Process noise on the radius (px^2).
    pub radius: f64,
    /// Process noise on the radius rate.
    pub radius_rate: f64,
    /// Measurement noise, applied to every observation slot.
    pub measurement: f64,
    /// Initial error covariance per state dimension.
    pub initial_uncertainty: f64,
}

impl Default for FilterNoise {
    fn default() -> Self {
        Self {
            position: 0.01,
            velocity: 3.0,
            radius: 0.01,
            radius_rate: 3.0,
            measurement: 0.1,
            initial_uncertainty: 1.0,
        }
    }
}

impl FilterNoise {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let terms = [
            ("position noise", self.position),
            ("velocity noise", self.velocity),
            ("radius noise", self.radius),
            ("radius rate noise", self.radius_rate),
            ("measurement noise", self.measurement),
            ("initial uncertainty", self.initial_uncertainty),
        ];
        for (name, value) in terms {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidNoise { name, value });
            }
        }
        Ok(())
    }
}

/// Named view of the filter state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    pub radius_rate: f64,
}

impl MotionState {
    fn from_vector(v: &StateVector) -> Self {
        Self {
            x: v[X],
            y: v[Y],
            vx: v[VX],
            vy: v[VY],
            radius: v[RADIUS],
            radius_rate: v[RADIUS_RATE],
        }
    }

    fn to_vector(self) -> StateVector {
        let mut v = StateVector::zeros();
        v[X] = self.x;
        v[Y] = self.y;
        v[VX] = self.vx;
        v[VY] = self.vy;
        v[RADIUS] = self.radius;
        v[RADIUS_RATE] = self.radius_rate;
        v
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// Constant-velocity, constant-radius-rate Kalman filter for one marker.
#[derive(Debug, Clone)]
pub struct MotionFilter {
    state: StateVector,
    covariance: StateMatrix,
    transition: StateMatrix,
    observation: ObservationMatrix,
    process_noise: StateMatrix,
    measurement_noise: InnovationMatrix,
}

impl MotionFilter {
    /// Start a filter at a first detection, at rest.
    pub fn new(initial: &Circle, noise: &FilterNoise) -> Self {
        let state = MotionState {
            x: initial.center.x as f64,
            y: initial.center.y as f64,
            radius: initial.radius as f64,
            ..MotionState::default()
        }
        .to_vector();

        let mut observation = ObservationMatrix::zeros();
        observation[(OBS_X, X)] = 1.0;
        observation[(OBS_Y, Y)] = 1.0;
        observation[(OBS_RADIUS, RADIUS)] = 1.0;
        observation[(OBS_RESERVED, RADIUS_RATE)] = 1.0;

        let mut q = StateVector::zeros();
        q[X] = noise.position;
        q[Y] = noise.position;
        q[VX] = noise.velocity;
        q[VY] = noise.velocity;
        q[RADIUS] = noise.radius;
        q[RADIUS_RATE] = noise.radius_rate;

        Self {
            state,
            covariance: StateMatrix::identity() * noise.initial_uncertainty,
            transition: StateMatrix::identity(),
            observation,
            process_noise: StateMatrix::from_diagonal(&q),
            measurement_noise: InnovationMatrix::identity() * noise.measurement,
        }
    }

    /// Set the elapsed time (seconds) used by the next prediction.
    pub fn set_time_step(&mut self, dt: f64) {
        self.transition[(X, VX)] = dt;
        self.transition[(Y, VY)] = dt;
        self.transition[(RADIUS, RADIUS_RATE)] = dt;
    }

    /// Advance one step with the transition model and return the a priori
    /// estimate.
    pub fn predict(&mut self) -> MotionState {
        let f = &self.transition;
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
        self.state()
    }

    /// Fold in an observed circle and return the a posteriori estimate.
    pub fn correct(&mut self, observed: &Circle) -> MotionState {
        let mut z = ObservationVector::zeros();
        z[OBS_X] = observed.center.x as f64;
        z[OBS_Y] = observed.center.y as f64;
        z[OBS_RADIUS] = observed.radius as f64;
        z[OBS_RESERVED] = 0.0;

        let h = &self.observation;
        let pht = self.covariance * h.transpose();
        let innovation_cov = h * pht + self.measurement_noise;

        let Some(s_inv) = innovation_cov.try_inverse() else {
            tracing::warn!("singular innovation covariance, skipping correction");
            return self.state();
        };

        let gain = pht * s_inv;
        let innovation = z - h * self.state;
        self.state += gain * innovation;
        self.covariance = (StateMatrix::identity() - gain * h) * self.covariance;
        self.state()
    }

    pub fn state(&self) -> MotionState {
        MotionState::from_vector(&self.state)
    }

    /// Current error covariance (6x6, state layout).
    pub fn covariance(&self) -> &SMatrix<f64, 6, 6> {
        &self.covariance
    }
}
