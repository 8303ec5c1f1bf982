//! Conversion from depth-image coordinates to camera space.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maps `(pixel x, pixel y, depth mm)` to camera-space millimetres.
///
/// Sensor SDKs usually ship a per-pixel lookup table for this; wrap it in an
/// implementation of this trait, or use [`PinholeMapper`] as an approximation.
pub trait CameraSpaceMapper {
    fn to_camera_space(&self, pixel: &Point3<f32>) -> Point3<f32>;
}

/// Ideal pinhole model derived from the sensor's fields of view.
///
/// Camera space has x to the right, y down and z along the optical axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeMapper {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl PinholeMapper {
    pub fn from_fov(
        width: usize,
        height: usize,
        horizontal_fov_deg: f64,
        vertical_fov_deg: f64,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyFrame {
                width: width as u32,
                height: height as u32,
            });
        }
        for fov in [horizontal_fov_deg, vertical_fov_deg] {
            if !(fov > 0.0 && fov < 180.0) {
                return Err(ConfigError::InvalidFieldOfView(fov));
            }
        }

        let half_w = width as f64 / 2.0;
        let half_h = height as f64 / 2.0;
        Ok(Self {
            fx: (half_w / (horizontal_fov_deg.to_radians() / 2.0).tan()) as f32,
            fy: (half_h / (vertical_fov_deg.to_radians() / 2.0).tan()) as f32,
            cx: half_w as f32,
            cy: half_h as f32,
        })
    }
}

impl CameraSpaceMapper for PinholeMapper {
    fn to_camera_space(&self, pixel: &Point3<f32>) -> Point3<f32> {
        let z = pixel.z;
        Point3::new(
            (pixel.x - self.cx) / self.fx * z,
            (pixel.y - self.cy) / self.fy * z,
            z,
        )
    }
}
