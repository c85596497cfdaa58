/// Data-Oriented Axis-Aligned Bounding Box System
///
/// Pure functions over box data - no methods, just data transformations.

use cgmath::{InnerSpace, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-Aligned Bounding Box - pure data structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

/// Create new AABB from min/max points
pub fn create_aabb(min: Point3<f32>, max: Point3<f32>) -> AABB {
    AABB { min, max }
}

/// Inverted box that any expansion overwrites
pub fn aabb_empty() -> AABB {
    AABB {
        min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
        max: Point3::new(f32::MIN, f32::MIN, f32::MIN),
    }
}

/// True once at least one point has been added
pub fn aabb_is_valid(aabb: &AABB) -> bool {
    aabb.min.x <= aabb.max.x && aabb.min.y <= aabb.max.y && aabb.min.z <= aabb.max.z
}

/// Grow AABB to include a point (mutating)
pub fn aabb_expand_point(aabb: &mut AABB, point: Point3<f32>) {
    aabb.min.x = aabb.min.x.min(point.x);
    aabb.min.y = aabb.min.y.min(point.y);
    aabb.min.z = aabb.min.z.min(point.z);
    aabb.max.x = aabb.max.x.max(point.x);
    aabb.max.y = aabb.max.y.max(point.y);
    aabb.max.z = aabb.max.z.max(point.z);
}

/// Tightest AABB around a set of points
/// Returns the inverted empty box when there are no points
pub fn aabb_from_points<I>(points: I) -> AABB
where
    I: IntoIterator<Item = Point3<f32>>,
{
    let mut aabb = aabb_empty();
    for point in points {
        aabb_expand_point(&mut aabb, point);
    }
    aabb
}

/// Smallest AABB enclosing both inputs
pub fn aabb_union(a: &AABB, b: &AABB) -> AABB {
    AABB {
        min: Point3::new(a.min.x.min(b.min.x), a.min.y.min(b.min.y), a.min.z.min(b.min.z)),
        max: Point3::new(a.max.x.max(b.max.x), a.max.y.max(b.max.y), a.max.z.max(b.max.z)),
    }
}

/// Get center point of AABB
pub fn aabb_center(aabb: &AABB) -> Point3<f32> {
    Point3::new(
        (aabb.min.x + aabb.max.x) * 0.5,
        (aabb.min.y + aabb.max.y) * 0.5,
        (aabb.min.z + aabb.max.z) * 0.5,
    )
}

/// Get half extents of AABB
pub fn aabb_half_extents(aabb: &AABB) -> Vector3<f32> {
    aabb_extent(aabb) * 0.5
}

/// Full size along each axis
pub fn aabb_extent(aabb: &AABB) -> Vector3<f32> {
    aabb.max - aabb.min
}

/// Length of the min-to-max diagonal
pub fn aabb_diagonal_length(aabb: &AABB) -> f32 {
    aabb_extent(aabb).magnitude()
}

/// Test if two AABBs are non-disjoint
/// Touching faces count as overlap
pub fn aabb_intersects(aabb1: &AABB, aabb2: &AABB) -> bool {
    aabb1.min.x <= aabb2.max.x && aabb1.max.x >= aabb2.min.x &&
    aabb1.min.y <= aabb2.max.y && aabb1.max.y >= aabb2.min.y &&
    aabb1.min.z <= aabb2.max.z && aabb1.max.z >= aabb2.min.z
}

/// Test if `outer` fully contains `inner`
pub fn aabb_contains(outer: &AABB, inner: &AABB) -> bool {
    inner.min.x >= outer.min.x && inner.max.x <= outer.max.x &&
    inner.min.y >= outer.min.y && inner.max.y <= outer.max.y &&
    inner.min.z >= outer.min.z && inner.max.z <= outer.max.z
}

/// Test if AABB contains a point
pub fn aabb_contains_point(aabb: &AABB, point: Point3<f32>) -> bool {
    point.x >= aabb.min.x && point.x <= aabb.max.x &&
    point.y >= aabb.min.y && point.y <= aabb.max.y &&
    point.z >= aabb.min.z && point.z <= aabb.max.z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> AABB {
        create_aabb(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_from_points() {
        let aabb = aabb_from_points(vec![
            Point3::new(1.0, -2.0, 0.5),
            Point3::new(-1.0, 3.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
        ]);
        assert_eq!(aabb.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Point3::new(1.0, 3.0, 2.0));
        assert!(aabb_is_valid(&aabb));
        assert!(!aabb_is_valid(&aabb_from_points(Vec::new())));
    }

    #[test]
    fn test_intersects_touching_and_disjoint() {
        let a = unit_box();
        let touching = create_aabb(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let disjoint = create_aabb(Point3::new(1.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(aabb_intersects(&a, &touching));
        assert!(aabb_intersects(&touching, &a));
        assert!(!aabb_intersects(&a, &disjoint));
    }

    #[test]
    fn test_contains_is_stricter_than_overlap() {
        let outer = unit_box();
        let inner = create_aabb(Point3::new(0.25, 0.25, 0.25), Point3::new(0.75, 0.75, 0.75));
        let straddling = create_aabb(Point3::new(0.5, 0.5, 0.5), Point3::new(1.5, 1.5, 1.5));
        assert!(aabb_contains(&outer, &inner));
        assert!(!aabb_contains(&outer, &straddling));
        assert!(aabb_intersects(&outer, &straddling));
    }

    #[test]
    fn test_center_and_diagonal() {
        let aabb = create_aabb(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(aabb_center(&aabb), Point3::new(0.0, 0.0, 0.0));
        assert!((aabb_diagonal_length(&aabb) - 12.0_f32.sqrt()).abs() < 1e-6);
        assert_eq!(aabb_half_extents(&aabb), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_union() {
        let a = unit_box();
        let b = create_aabb(Point3::new(-1.0, 0.5, 0.5), Point3::new(0.5, 3.0, 0.75));
        let u = aabb_union(&a, &b);
        assert_eq!(u.min, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.max, Point3::new(1.0, 3.0, 1.0));
        assert!(aabb_contains_point(&u, Point3::new(0.0, 2.0, 0.5)));
    }
}
