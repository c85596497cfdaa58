//! Scene assembly - Pure DOP functions
//!
//! Load-time pipeline: LOD chains (meshes in parallel), then clustering,
//! packing, and cull metadata per level (levels in parallel), then the DAG.

use super::dag_data::DagNode;
use super::dag_operations::{build_dag, validate_dag};
use super::error::{record_processing_error, LodErrorContext, LodResult, ProcessingReport};
use super::lod_chain_data::{LodBuildConfig, LodChain, LodLevel};
use super::lod_chain_operations::{build_lod_chain, validate_lod_build_config};
use super::scene_data::{LodScene, MeshLevel, MeshletSlot, SceneMesh};
use super::simplifier::MeshSimplifier;
use crate::bounds::aabb_center;
use crate::meshlet::clusterer_data::MeshletConfig;
use crate::meshlet::clusterer_operations::{cluster_meshlets, validate_meshlet_config};
use crate::meshlet::cull_metadata::{build_cull_metadata, meshlet_float_bounds};
use crate::meshlet::mesh_data::NamedMesh;
use crate::meshlet::mesh_utils::mesh_bounds;
use crate::meshlet::meshlet_stats::{compute_meshlet_stats, log_meshlet_stats};
use crate::meshlet::packer_data::{PackedMeshletGeometry, PackingConfig};
use crate::meshlet::packer_operations::{pack_all_meshlets, validate_packing_config};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Turn named meshes into a selectable scene
///
/// Fails only on invalid configuration or malformed input meshes.
/// Degraded results (short chains, childless nodes) land in the report.
pub fn build_scene(
    meshes: &[NamedMesh],
    simplifier: &dyn MeshSimplifier,
    meshlet_config: &MeshletConfig,
    packing_config: &PackingConfig,
    lod_config: &LodBuildConfig,
) -> LodResult<LodScene> {
    let _span = tracing::info_span!("build_scene", meshes = meshes.len()).entered();
    validate_meshlet_config(meshlet_config)?;
    validate_packing_config(packing_config)?;
    validate_lod_build_config(lod_config)?;

    log::info!("[build_scene] Preprocessing {} meshes", meshes.len());

    let chains: Vec<_> = meshes
        .par_iter()
        .map(|mesh| build_lod_chain(mesh, simplifier, lod_config))
        .collect();

    let mut report = ProcessingReport::default();
    let mut scene_meshes = Vec::with_capacity(meshes.len());
    for chain in chains {
        let (chain, errors) = chain?;
        for error in errors {
            record_processing_error(&mut report, error);
        }
        scene_meshes.push(build_scene_mesh(&chain, meshlet_config, packing_config)?);
    }

    let level_count = scene_meshes
        .iter()
        .map(|mesh| mesh.levels.len())
        .max()
        .unwrap_or(0);
    let mut nodes: Vec<Vec<DagNode>> = vec![Vec::new(); level_count];
    let mut mesh_max_lod = Vec::with_capacity(scene_meshes.len());

    for (mesh_index, mesh) in scene_meshes.iter().enumerate() {
        mesh_max_lod.push(mesh.levels.len().saturating_sub(1) as u32);
        for level in &mesh.levels {
            for (meshlet_index, ((meshlet, bounds), slot)) in level
                .meshlets
                .iter()
                .zip(&level.meshlet_bounds)
                .zip(&level.meshlet_slots)
                .enumerate()
            {
                nodes[level.lod as usize].push(DagNode {
                    id: 0,
                    lod: level.lod,
                    mesh_index: mesh_index as u32,
                    meshlet_index: meshlet_index as u32,
                    buffer_index: slot.buffer_index,
                    descriptor_index: slot.descriptor_index,
                    bounds: *bounds,
                    center: aabb_center(bounds),
                    triangle_count: meshlet.primitives.len() as u32,
                    simplification_error: level.error,
                    children: BTreeMap::new(),
                    parents: Vec::new(),
                });
            }
        }
    }

    let dag = build_dag(nodes, mesh_max_lod);
    for error in validate_dag(&dag) {
        record_processing_error(&mut report, error);
    }

    let stats = compute_meshlet_stats(
        scene_meshes
            .iter()
            .flat_map(|mesh| &mesh.levels)
            .flat_map(|level| &level.buffers),
        meshlet_config,
    );
    log_meshlet_stats("scene", &stats);

    Ok(LodScene {
        meshes: scene_meshes,
        dag: Arc::new(dag),
        stats,
        report,
    })
}

/// Cluster, pack, and annotate every level of one chain
pub fn build_scene_mesh(
    chain: &LodChain,
    meshlet_config: &MeshletConfig,
    packing_config: &PackingConfig,
) -> LodResult<SceneMesh> {
    let levels = chain
        .levels
        .par_iter()
        .map(|level| build_mesh_level(level, meshlet_config, packing_config))
        .collect::<LodResult<Vec<_>>>()?;

    let base = chain
        .levels
        .first()
        .map(|level| mesh_bounds(&level.mesh.vertices))
        .lod_context(&format!("level 0 of '{}'", chain.name))?;

    Ok(SceneMesh {
        name: chain.name.clone(),
        center: aabb_center(&base),
        bounds: base,
        levels,
    })
}

/// Meshlets, packed buffers, and cull data for one level
pub fn build_mesh_level(
    level: &LodLevel,
    meshlet_config: &MeshletConfig,
    packing_config: &PackingConfig,
) -> LodResult<MeshLevel> {
    let _span = tracing::debug_span!("build_mesh_level", lod = level.lod).entered();
    let vertices = &level.mesh.vertices;

    let meshlets = cluster_meshlets(vertices, &level.mesh.indices, meshlet_config)?;
    let object_bounds = mesh_bounds(vertices);

    let mut buffers = pack_all_meshlets(&meshlets, packing_config);
    for buffer in &mut buffers {
        build_cull_metadata(buffer, vertices, &object_bounds);
    }

    let meshlet_slots = meshlet_slots(&buffers);
    let meshlet_bounds = meshlets
        .iter()
        .map(|meshlet| meshlet_float_bounds(vertices, meshlet))
        .collect();
    let triangle_count = meshlets.iter().map(|m| m.primitives.len()).sum();

    log::debug!(
        "[build_mesh_level] Level {}: {} meshlets in {} buffers, {} triangles",
        level.lod,
        meshlets.len(),
        buffers.len(),
        triangle_count
    );

    Ok(MeshLevel {
        lod: level.lod,
        vertices: vertices.clone(),
        meshlets,
        buffers,
        meshlet_slots,
        meshlet_bounds,
        object_bounds,
        triangle_count,
        error: level.error,
    })
}

/// Buffer and descriptor of every packed meshlet, in packing order
pub fn meshlet_slots(buffers: &[PackedMeshletGeometry]) -> Vec<MeshletSlot> {
    buffers
        .iter()
        .enumerate()
        .flat_map(|(buffer_index, buffer)| {
            (0..buffer.descriptors.len()).map(move |descriptor_index| MeshletSlot {
                buffer_index: buffer_index as u32,
                descriptor_index: descriptor_index as u32,
            })
        })
        .collect()
}

/// Level `lod` of mesh `mesh_index`, if it exists
pub fn mesh_level(scene: &LodScene, mesh_index: u32, lod: u32) -> Option<&MeshLevel> {
    scene
        .meshes
        .get(mesh_index as usize)?
        .levels
        .get(lod as usize)
}

/// Meshlet count per level of one mesh
pub fn meshlet_counts(mesh: &SceneMesh) -> Vec<usize> {
    mesh.levels.iter().map(|level| level.meshlets.len()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::dag_operations::{dag_node_count, is_acyclic};
    use crate::lod::simplifier::QuadricSimplifier;
    use crate::meshlet::mesh_utils::{create_cube_mesh, create_sphere_mesh, translate_mesh};
    use cgmath::Vector3;

    fn named(name: &str, mesh: crate::meshlet::mesh_data::MeshData) -> NamedMesh {
        NamedMesh {
            name: name.to_string(),
            mesh,
        }
    }

    fn build(meshes: &[NamedMesh], max_lod: u32) -> LodScene {
        build_scene(
            meshes,
            &QuadricSimplifier,
            &MeshletConfig::default(),
            &PackingConfig::default(),
            &LodBuildConfig {
                max_lod,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_scene_nodes_match_meshlets() {
        let sphere = create_sphere_mesh(48, 24, 2.0);
        let scene = build(&[named("sphere", sphere)], 3);

        let meshlet_total: usize = scene.meshes[0].levels.iter().map(|l| l.meshlets.len()).sum();
        assert_eq!(dag_node_count(&scene.dag), meshlet_total);
        assert_eq!(scene.stats.meshlets_total, meshlet_total);
        assert!(is_acyclic(&scene.dag));

        let counts = meshlet_counts(&scene.meshes[0]);
        assert!(counts[0] > 1);
        assert_eq!(scene.dag.mesh_max_lod, vec![(counts.len() - 1) as u32]);
        for root in &scene.dag.roots {
            assert_eq!(root.level, scene.dag.mesh_max_lod[0]);
        }
    }

    #[test]
    fn test_meshes_keep_their_own_roots() {
        let sphere = create_sphere_mesh(32, 16, 1.0);
        let moved = translate_mesh(&sphere, Vector3::new(10.0, 0.0, 0.0));
        let scene = build(&[named("a", sphere), named("b", moved)], 2);

        for (mesh_index, max_lod) in scene.dag.mesh_max_lod.iter().enumerate() {
            let roots: Vec<_> = scene
                .dag
                .roots
                .iter()
                .filter(|r| scene.dag.levels[r.level as usize][r.index as usize].mesh_index == mesh_index as u32)
                .collect();
            assert!(!roots.is_empty());
            assert!(roots.iter().all(|r| r.level == *max_lod));
        }

        // Links never cross meshes
        for node in scene.dag.levels.iter().flatten() {
            for child in node.children.values() {
                let child = &scene.dag.levels[child.level as usize][child.index as usize];
                assert_eq!(child.mesh_index, node.mesh_index);
            }
        }
    }

    #[test]
    fn test_levels_record_compounded_error() {
        let scene = build(&[named("sphere", create_sphere_mesh(32, 16, 1.0))], 3);
        let levels = &scene.meshes[0].levels;
        assert_eq!(levels[0].error, 0.0);
        for pair in levels.windows(2) {
            assert!(pair[1].error >= pair[0].error);
            assert!(pair[1].triangle_count < pair[0].triangle_count);
        }
        assert!(mesh_level(&scene, 0, 0).is_some());
        assert!(mesh_level(&scene, 3, 0).is_none());
    }

    #[test]
    fn test_nodes_address_their_packed_buffer() {
        let packing = PackingConfig {
            offset_field_bits: 3,
            ..Default::default()
        };
        let scene = build_scene(
            &[named("sphere", create_sphere_mesh(32, 16, 1.0))],
            &QuadricSimplifier,
            &MeshletConfig::default(),
            &packing,
            &LodBuildConfig {
                max_lod: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let level = &scene.meshes[0].levels[0];
        assert!(level.buffers.len() > 1);
        assert_eq!(level.meshlet_slots.len(), level.meshlets.len());

        for node in &scene.dag.levels[0] {
            let buffer = &level.buffers[node.buffer_index as usize];
            assert!((node.descriptor_index as usize) < buffer.descriptors.len());
            assert_eq!(
                crate::meshlet::unpack_meshlet(buffer, node.descriptor_index as usize),
                Some(crate::meshlet::meshlet_triangles(&level.meshlets[node.meshlet_index as usize]))
            );
        }
    }

    #[test]
    fn test_malformed_mesh_fails_scene() {
        let mut bad = create_cube_mesh();
        bad.indices.push(1);
        let result = build_scene(
            &[named("bad", bad)],
            &QuadricSimplifier,
            &MeshletConfig::default(),
            &PackingConfig::default(),
            &LodBuildConfig::default(),
        );
        assert!(result.is_err());
    }
}
