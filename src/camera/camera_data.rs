//! Camera data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in camera_operations.rs

use crate::constants::camera::{FAR_PLANE, FOV_DEGREES, NEAR_PLANE, RESOLUTION_X, RESOLUTION_Y};
use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Camera data structure - pure data, no methods
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    /// Camera position in world space
    pub position: Point3<f32>,

    /// Yaw rotation (radians, around Y axis); 0 looks down +X
    pub yaw_radians: f32,

    /// Pitch rotation (radians)
    pub pitch_radians: f32,

    /// Field of view (vertical, radians)
    pub fov_radians: f32,

    /// Aspect ratio (width / height)
    pub aspect_ratio: f32,

    pub near_plane: f32,
    pub far_plane: f32,

    /// Position at the previous motion update
    pub old_position: Point3<f32>,

    /// World units per second, derived from successive positions
    pub velocity: Vector3<f32>,
}

impl Default for CameraData {
    fn default() -> Self {
        let position = Point3::new(-10.0, 0.0, 0.0);
        Self {
            position,
            yaw_radians: 0.0,
            pitch_radians: 0.0,
            fov_radians: FOV_DEGREES.to_radians(),
            aspect_ratio: RESOLUTION_X as f32 / RESOLUTION_Y as f32,
            near_plane: NEAR_PLANE,
            far_plane: FAR_PLANE,
            old_position: position,
            velocity: Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

/// Plane in Hessian form: dot(normal, p) + distance >= 0 is inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub distance: f32,
}

/// View volume planes, normals pointing inward
/// Order: left, right, top, bottom, near, far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

/// Camera configuration for initialization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub initial_position: [f32; 3],
    pub initial_yaw: f32,
    pub initial_pitch: f32,
    pub fov_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_position: [-10.0, 0.0, 0.0],
            initial_yaw: 0.0,
            initial_pitch: 0.0,
            fov_degrees: FOV_DEGREES,
            near_plane: NEAR_PLANE,
            far_plane: FAR_PLANE,
        }
    }
}
