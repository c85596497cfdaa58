//! Camera operations - Pure DOP functions
//!
//! All functions are pure: they take data, return new data, no side effects.
//! No methods, no self, just transformations.

use super::camera_data::{CameraConfig, CameraData, Frustum, Plane};
use crate::bounds::AABB;
use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4};

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize camera with default optics
pub fn init_camera(position: Point3<f32>, yaw: f32, pitch: f32) -> CameraData {
    CameraData {
        position,
        old_position: position,
        yaw_radians: yaw,
        pitch_radians: pitch,
        ..Default::default()
    }
}

/// Camera at `position` facing `target`
pub fn init_camera_looking_at(position: Point3<f32>, target: Point3<f32>) -> CameraData {
    let direction = target - position;
    let length = direction.magnitude();
    if length <= f32::EPSILON {
        return init_camera(position, 0.0, 0.0);
    }
    let yaw = direction.z.atan2(direction.x);
    let pitch = (direction.y / length).clamp(-1.0, 1.0).asin();
    init_camera(position, yaw, pitch)
}

/// Initialize camera from config
pub fn init_camera_from_config(config: &CameraConfig, aspect_ratio: f32) -> CameraData {
    let position = Point3::from(config.initial_position);
    CameraData {
        position,
        old_position: position,
        yaw_radians: config.initial_yaw,
        pitch_radians: config.initial_pitch,
        fov_radians: config.fov_degrees.to_radians(),
        aspect_ratio,
        near_plane: config.near_plane,
        far_plane: config.far_plane,
        velocity: Vector3::new(0.0, 0.0, 0.0),
    }
}

// ============================================================================
// VIEW/PROJECTION MATRICES
// ============================================================================

/// Build view matrix from camera data
pub fn build_view_matrix(camera: &CameraData) -> Matrix4<f32> {
    let forward = calculate_forward_vector(camera.yaw_radians, camera.pitch_radians);
    let target = camera.position + forward;
    let up = Vector3::new(0.0, 1.0, 0.0);

    Matrix4::look_at_rh(camera.position, target, up)
}

/// Build projection matrix from camera data
pub fn build_projection_matrix(camera: &CameraData) -> Matrix4<f32> {
    cgmath::perspective(
        Rad(camera.fov_radians),
        camera.aspect_ratio,
        camera.near_plane,
        camera.far_plane,
    )
}

pub fn build_view_projection(camera: &CameraData) -> Matrix4<f32> {
    build_projection_matrix(camera) * build_view_matrix(camera)
}

// ============================================================================
// FRUSTUM
// ============================================================================

/// Extract the six view planes (Gribb-Hartmann)
pub fn extract_frustum(camera: &CameraData) -> Frustum {
    frustum_from_matrix(&build_view_projection(camera))
}

pub fn frustum_from_matrix(vp: &Matrix4<f32>) -> Frustum {
    let m = vp;
    let rows = [
        // Left
        Vector4::new(m.x.w + m.x.x, m.y.w + m.y.x, m.z.w + m.z.x, m.w.w + m.w.x),
        // Right
        Vector4::new(m.x.w - m.x.x, m.y.w - m.y.x, m.z.w - m.z.x, m.w.w - m.w.x),
        // Top
        Vector4::new(m.x.w - m.x.y, m.y.w - m.y.y, m.z.w - m.z.y, m.w.w - m.w.y),
        // Bottom
        Vector4::new(m.x.w + m.x.y, m.y.w + m.y.y, m.z.w + m.z.y, m.w.w + m.w.y),
        // Near
        Vector4::new(m.x.w + m.x.z, m.y.w + m.y.z, m.z.w + m.z.z, m.w.w + m.w.z),
        // Far
        Vector4::new(m.x.w - m.x.z, m.y.w - m.y.z, m.z.w - m.z.z, m.w.w - m.w.z),
    ];

    Frustum {
        planes: rows.map(normalize_plane),
    }
}

fn normalize_plane(row: Vector4<f32>) -> Plane {
    let normal = Vector3::new(row.x, row.y, row.z);
    let length = normal.magnitude();
    if length > 0.0 {
        Plane {
            normal: normal / length,
            distance: row.w / length,
        }
    } else {
        Plane {
            normal,
            distance: row.w,
        }
    }
}

/// Signed distance; positive on the inner side
pub fn plane_distance(plane: &Plane, point: Point3<f32>) -> f32 {
    plane.normal.dot(point.to_vec()) + plane.distance
}

/// Conservative box test: false only if some plane has the whole box outside
pub fn aabb_in_frustum(frustum: &Frustum, aabb: &AABB) -> bool {
    frustum.planes.iter().all(|plane| {
        // Corner farthest along the plane normal
        let positive = Point3::new(
            if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
            if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
            if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
        );
        plane_distance(plane, positive) >= 0.0
    })
}

// ============================================================================
// UPDATES
// ============================================================================

/// Derive velocity from the distance moved since the last update
pub fn update_camera_motion(camera: &CameraData, delta_time: f32) -> CameraData {
    let mut new_camera = *camera;
    new_camera.velocity = if delta_time > 0.0 {
        (camera.position - camera.old_position) / delta_time
    } else {
        Vector3::new(0.0, 0.0, 0.0)
    };
    new_camera.old_position = camera.position;
    new_camera
}

pub fn camera_speed(camera: &CameraData) -> f32 {
    camera.velocity.magnitude()
}

// ============================================================================
// MOVEMENT
// ============================================================================

pub fn move_to(camera: &CameraData, position: Point3<f32>) -> CameraData {
    let mut new_camera = *camera;
    new_camera.position = position;
    new_camera
}

// ============================================================================
// UTILITIES
// ============================================================================

/// Calculate forward vector from yaw and pitch
pub fn calculate_forward_vector(yaw: f32, pitch: f32) -> Vector3<f32> {
    Vector3::new(
        yaw.cos() * pitch.cos(),
        pitch.sin(),
        yaw.sin() * pitch.cos(),
    )
    .normalize()
}

/// Log camera context for debugging
pub fn log_camera_context(camera: &CameraData) {
    log::debug!(
        "[Camera] Position: ({:.2}, {:.2}, {:.2}) | Speed: {:.3}",
        camera.position.x,
        camera.position.y,
        camera.position.z,
        camera_speed(camera)
    );

    log::debug!(
        "[Camera] Yaw: {:.3}rad ({:.1}°) | Pitch: {:.3}rad ({:.1}°) | FOV: {:.3}rad ({:.1}°)",
        camera.yaw_radians,
        camera.yaw_radians.to_degrees(),
        camera.pitch_radians,
        camera.pitch_radians.to_degrees(),
        camera.fov_radians,
        camera.fov_radians.to_degrees()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::create_aabb;

    fn unit_box_at(x: f32, y: f32, z: f32) -> AABB {
        create_aabb(
            Point3::new(x - 0.5, y - 0.5, z - 0.5),
            Point3::new(x + 0.5, y + 0.5, z + 0.5),
        )
    }

    #[test]
    fn test_default_camera_faces_origin() {
        let camera = CameraData::default();
        let forward = calculate_forward_vector(camera.yaw_radians, camera.pitch_radians);
        assert!((forward - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-6);
    }

    #[test]
    fn test_frustum_keeps_boxes_in_view() {
        let frustum = extract_frustum(&CameraData::default());
        assert!(aabb_in_frustum(&frustum, &unit_box_at(0.0, 0.0, 0.0)));
        // Behind the camera
        assert!(!aabb_in_frustum(&frustum, &unit_box_at(-20.0, 0.0, 0.0)));
        // Far off to the side
        assert!(!aabb_in_frustum(&frustum, &unit_box_at(0.0, 0.0, 50.0)));
        // Straddling the left edge still counts
        assert!(aabb_in_frustum(
            &frustum,
            &create_aabb(Point3::new(0.0, -1.0, -30.0), Point3::new(1.0, 1.0, 30.0))
        ));
    }

    #[test]
    fn test_frustum_planes_are_normalized() {
        let frustum = extract_frustum(&CameraData::default());
        for plane in &frustum.planes {
            assert!((plane.normal.magnitude() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_looking_at_target() {
        let camera = init_camera_looking_at(Point3::new(0.0, 0.0, 10.0), Point3::new(0.0, 0.0, 0.0));
        let forward = calculate_forward_vector(camera.yaw_radians, camera.pitch_radians);
        assert!((forward - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-5);
        let frustum = extract_frustum(&camera);
        assert!(aabb_in_frustum(&frustum, &unit_box_at(0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_motion_derives_velocity() {
        let camera = CameraData::default();
        let moved = move_to(&camera, Point3::new(-8.0, 0.0, 0.0));
        let updated = update_camera_motion(&moved, 0.5);
        assert!((updated.velocity.x - 4.0).abs() < 1e-5);
        assert_eq!(updated.old_position, updated.position);

        let still = update_camera_motion(&updated, 0.5);
        assert_eq!(camera_speed(&still), 0.0);
        assert_eq!(camera_speed(&update_camera_motion(&moved, 0.0)), 0.0);
    }
}
