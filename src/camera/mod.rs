/// Camera Module - Data-Oriented Programming (DOP) style
///
/// This module follows pure DOP principles:
/// - camera_data.rs: Pure data structures with NO methods
/// - camera_operations.rs: Pure functions that operate on data

pub mod camera_data;
pub mod camera_operations;

// Re-export data structures
pub use camera_data::{CameraConfig, CameraData, Frustum, Plane};

// Re-export all operations
pub use camera_operations::{
    // Initialization
    init_camera,
    init_camera_from_config,
    init_camera_looking_at,

    // View/projection
    build_projection_matrix,
    build_view_matrix,
    build_view_projection,

    // Frustum
    aabb_in_frustum,
    extract_frustum,
    frustum_from_matrix,
    plane_distance,

    // Updates
    camera_speed,
    update_camera_motion,

    // Movement
    move_to,

    // Utilities
    calculate_forward_vector,
    log_camera_context,
};
