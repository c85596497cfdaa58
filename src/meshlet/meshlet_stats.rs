//! Packing statistics
//!
//! Load is the fraction of the configured limit a meshlet uses; averages
//! and variances are taken over every descriptor seen.

use super::clusterer_data::MeshletConfig;
use super::cull_metadata::is_backface_cullable;
use super::packer_data::PackedMeshletGeometry;
use serde::{Deserialize, Serialize};

/// Aggregated meshlet counts and load - pure data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshletStats {
    pub meshlets_total: usize,
    /// Meshlets whose normal cone allows backface culling
    pub backface_total: usize,
    pub vertex_total: usize,
    pub primitive_total: usize,
    pub vertex_load_average: f64,
    pub vertex_load_variance: f64,
    pub primitive_load_average: f64,
    pub primitive_load_variance: f64,
}

/// Gather stats over any number of packed buffers
pub fn compute_meshlet_stats<'a, I>(buffers: I, config: &MeshletConfig) -> MeshletStats
where
    I: IntoIterator<Item = &'a PackedMeshletGeometry>,
{
    let mut stats = MeshletStats::default();
    let mut vertex_loads = Vec::new();
    let mut primitive_loads = Vec::new();

    for geometry in buffers {
        for descriptor in &geometry.descriptors {
            stats.meshlets_total += 1;
            stats.vertex_total += descriptor.vertex_count as usize;
            stats.primitive_total += descriptor.primitive_count as usize;
            if is_backface_cullable(&descriptor.cull) {
                stats.backface_total += 1;
            }
            vertex_loads.push(descriptor.vertex_count as f64 / config.max_vertices as f64);
            primitive_loads.push(descriptor.primitive_count as f64 / config.max_primitives as f64);
        }
    }

    (stats.vertex_load_average, stats.vertex_load_variance) = mean_and_variance(&vertex_loads);
    (stats.primitive_load_average, stats.primitive_load_variance) =
        mean_and_variance(&primitive_loads);

    stats
}

/// Merge two stat blocks, weighting the load moments by meshlet count
pub fn merge_meshlet_stats(a: &MeshletStats, b: &MeshletStats) -> MeshletStats {
    let total = a.meshlets_total + b.meshlets_total;
    if total == 0 {
        return MeshletStats::default();
    }

    let wa = a.meshlets_total as f64 / total as f64;
    let wb = b.meshlets_total as f64 / total as f64;
    let merge = |mean_a: f64, var_a: f64, mean_b: f64, var_b: f64| {
        let mean = wa * mean_a + wb * mean_b;
        let variance = wa * (var_a + (mean_a - mean).powi(2)) + wb * (var_b + (mean_b - mean).powi(2));
        (mean, variance)
    };

    let (vertex_load_average, vertex_load_variance) = merge(
        a.vertex_load_average,
        a.vertex_load_variance,
        b.vertex_load_average,
        b.vertex_load_variance,
    );
    let (primitive_load_average, primitive_load_variance) = merge(
        a.primitive_load_average,
        a.primitive_load_variance,
        b.primitive_load_average,
        b.primitive_load_variance,
    );

    MeshletStats {
        meshlets_total: total,
        backface_total: a.backface_total + b.backface_total,
        vertex_total: a.vertex_total + b.vertex_total,
        primitive_total: a.primitive_total + b.primitive_total,
        vertex_load_average,
        vertex_load_variance,
        primitive_load_average,
        primitive_load_variance,
    }
}

pub fn log_meshlet_stats(label: &str, stats: &MeshletStats) {
    log::info!(
        "[log_meshlet_stats] {}: {} meshlets ({} backface cullable), {} vertices, {} primitives",
        label,
        stats.meshlets_total,
        stats.backface_total,
        stats.vertex_total,
        stats.primitive_total
    );
    log::debug!(
        "[log_meshlet_stats] {}: vertex load {:.3} (var {:.4}), primitive load {:.3} (var {:.4})",
        label,
        stats.vertex_load_average,
        stats.vertex_load_variance,
        stats.primitive_load_average,
        stats.primitive_load_variance
    );
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshlet::clusterer_operations::cluster_meshlets;
    use crate::meshlet::cull_metadata::build_cull_metadata;
    use crate::meshlet::mesh_utils::{create_cube_mesh, create_grid_mesh, mesh_bounds};
    use crate::meshlet::packer_data::PackingConfig;
    use crate::meshlet::packer_operations::pack_meshlets;

    fn packed(mesh: &crate::meshlet::mesh_data::MeshData, config: &MeshletConfig) -> PackedMeshletGeometry {
        let meshlets = cluster_meshlets(&mesh.vertices, &mesh.indices, config).unwrap();
        let mut geometry = pack_meshlets(&meshlets, &PackingConfig::default()).geometry;
        build_cull_metadata(&mut geometry, &mesh.vertices, &mesh_bounds(&mesh.vertices));
        geometry
    }

    #[test]
    fn test_cube_stats() {
        let config = MeshletConfig::default();
        let geometry = packed(&create_cube_mesh(), &config);
        let stats = compute_meshlet_stats([&geometry], &config);
        assert_eq!(stats.meshlets_total, 1);
        assert_eq!(stats.vertex_total, 8);
        assert_eq!(stats.primitive_total, 12);
        assert_eq!(stats.backface_total, 0);
        assert!((stats.vertex_load_average - 8.0 / 64.0).abs() < 1e-9);
        assert_eq!(stats.vertex_load_variance, 0.0);
    }

    #[test]
    fn test_merge_matches_joint_computation() {
        let config = MeshletConfig::default();
        let grid = packed(&create_grid_mesh(16, 16, 8.0), &config);
        let cube = packed(&create_cube_mesh(), &config);

        let joint = compute_meshlet_stats([&grid, &cube], &config);
        let merged = merge_meshlet_stats(
            &compute_meshlet_stats([&grid], &config),
            &compute_meshlet_stats([&cube], &config),
        );
        assert_eq!(joint.meshlets_total, merged.meshlets_total);
        assert_eq!(joint.backface_total, merged.backface_total);
        assert!((joint.primitive_load_average - merged.primitive_load_average).abs() < 1e-9);
        assert!((joint.primitive_load_variance - merged.primitive_load_variance).abs() < 1e-9);
        assert!(joint.backface_total >= 1);
    }

    #[test]
    fn test_empty_input() {
        let stats = compute_meshlet_stats(std::iter::empty(), &MeshletConfig::default());
        assert_eq!(stats, MeshletStats::default());
    }
}
