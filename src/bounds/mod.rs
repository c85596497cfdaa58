//! Bounds Module - axis-aligned boxes shared by clustering, the DAG, and culling

pub mod aabb;

pub use aabb::{
    aabb_center, aabb_contains, aabb_contains_point, aabb_diagonal_length, aabb_empty,
    aabb_expand_point, aabb_extent, aabb_from_points, aabb_half_extents, aabb_intersects,
    aabb_is_valid, aabb_union, create_aabb, AABB,
};
