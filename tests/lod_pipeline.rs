//! End-to-end pipeline tests through the public API
//!
//! Meshes -> meshlets -> packed buffers -> scene + DAG -> frames -> batches.

use meshlet_lod::camera::{init_camera_looking_at, CameraData};
use meshlet_lod::lod::{dag_node, is_acyclic};
use meshlet_lod::meshlet::mesh_utils::{
    create_cube_mesh, create_grid_mesh, create_sphere_mesh, create_strip_mesh, translate_mesh,
};
use meshlet_lod::meshlet::{cluster_meshlets, meshlet_triangles, pack_all_meshlets, unpack_meshlet};
use meshlet_lod::traversal::is_valid_cut;
use meshlet_lod::{
    build_scene, create_lod_system, update_frame, LodBuildConfig, LodScene, LodSystemConfig,
    MeshData, MeshletConfig, NamedMesh, PackingConfig, QuadricSimplifier, Vertex,
};
use cgmath::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn named(name: &str, mesh: MeshData) -> NamedMesh {
    NamedMesh {
        name: name.to_string(),
        mesh,
    }
}

/// Random indexed soup; some triangles repeat a vertex on purpose
fn random_soup(rng: &mut StdRng, vertex_count: usize, triangle_count: usize) -> MeshData {
    let vertices = (0..vertex_count)
        .map(|_| Vertex {
            position: [
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ],
            ..Default::default()
        })
        .collect();
    let indices = (0..triangle_count * 3)
        .map(|_| rng.gen_range(0..vertex_count as u32))
        .collect();
    MeshData { vertices, indices }
}

fn triangle_multiset(triangles: impl IntoIterator<Item = [u32; 3]>) -> HashMap<[u32; 3], usize> {
    let mut counts = HashMap::new();
    for triangle in triangles {
        *counts.entry(triangle).or_insert(0) += 1;
    }
    counts
}

fn camera_at(x: f32) -> CameraData {
    init_camera_looking_at(Point3::new(x, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0))
}

fn two_sphere_scene() -> Vec<NamedMesh> {
    let sphere = create_sphere_mesh(40, 20, 1.0);
    let shifted = translate_mesh(&sphere, Vector3::new(0.0, 0.0, 3.0));
    vec![named("left", sphere), named("right", shifted)]
}

#[test]
fn test_cube_is_one_meshlet() {
    let cube = create_cube_mesh();
    let meshlets = cluster_meshlets(&cube.vertices, &cube.indices, &MeshletConfig::default()).unwrap();
    assert_eq!(meshlets.len(), 1);
    assert_eq!(meshlets[0].primitives.len(), 12);
    assert_eq!(meshlets[0].vertices.len(), 8);
}

#[test]
fn test_strip_splits_within_limits() {
    let strip = create_strip_mesh(200);
    let config = MeshletConfig::default();
    let meshlets = cluster_meshlets(&strip.vertices, &strip.indices, &config).unwrap();
    assert!(meshlets.len() >= 2);
    for meshlet in &meshlets {
        assert!(meshlet.vertices.len() <= config.max_vertices as usize);
        assert!(meshlet.primitives.len() <= config.max_primitives as usize);
    }
    let total: usize = meshlets.iter().map(|m| m.primitives.len()).sum();
    assert_eq!(total, 200);
}

#[test]
fn test_random_soups_are_covered_exactly_once() {
    let mut rng = StdRng::seed_from_u64(7);
    let configs = [
        MeshletConfig::default(),
        MeshletConfig {
            max_vertices: 16,
            max_primitives: 20,
            ..Default::default()
        },
        MeshletConfig {
            reorder_for_cache: true,
            ..Default::default()
        },
    ];

    for config in &configs {
        let soup = random_soup(&mut rng, 300, 700);
        let meshlets = cluster_meshlets(&soup.vertices, &soup.indices, config).unwrap();

        let expected = triangle_multiset(
            soup.indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2]),
        );
        let mut produced = Vec::new();
        for meshlet in &meshlets {
            assert!(meshlet.vertices.len() <= config.max_vertices as usize);
            assert!(meshlet.primitives.len() <= config.max_primitives as usize);
            produced.extend(meshlet_triangles(meshlet));
        }

        // Cache reordering may rotate a triangle's corners
        let canonical = |t: [u32; 3]| {
            let start = (0..3).min_by_key(|&i| t[i]).unwrap_or(0);
            [t[start], t[(start + 1) % 3], t[(start + 2) % 3]]
        };
        let expected: HashMap<[u32; 3], usize> = expected
            .into_iter()
            .fold(HashMap::new(), |mut acc, (t, n)| {
                *acc.entry(canonical(t)).or_insert(0) += n;
                acc
            });
        assert_eq!(triangle_multiset(produced.into_iter().map(canonical)), expected);
    }
}

#[test]
fn test_packed_buffers_unpack_to_meshlets() {
    let grid = create_grid_mesh(24, 24, 4.0);
    let meshlets = cluster_meshlets(&grid.vertices, &grid.indices, &MeshletConfig::default()).unwrap();
    let buffers = pack_all_meshlets(&meshlets, &PackingConfig::default());
    assert_eq!(buffers.len(), 1);

    for (index, meshlet) in meshlets.iter().enumerate() {
        assert_eq!(unpack_meshlet(&buffers[0], index), Some(meshlet_triangles(meshlet)));
    }
}

#[test]
fn test_scene_dag_is_acyclic_with_per_mesh_roots() {
    init_logging();
    let scene: LodScene = build_scene(
        &two_sphere_scene(),
        &QuadricSimplifier,
        &MeshletConfig::default(),
        &PackingConfig::default(),
        &LodBuildConfig {
            max_lod: 4,
            ..Default::default()
        },
    )
    .unwrap();

    assert!(is_acyclic(&scene.dag));
    assert_eq!(scene.meshes.len(), 2);
    for mesh_index in 0..2u32 {
        assert!(scene.dag.roots.iter().any(|&root| {
            dag_node(&scene.dag, root).map(|node| node.mesh_index) == Some(mesh_index)
        }));
    }
}

#[test]
fn test_frames_produce_valid_cuts() {
    init_logging();
    let mut system = create_lod_system(
        LodSystemConfig::default(),
        &two_sphere_scene(),
        &QuadricSimplifier,
    )
    .unwrap();

    for x in [-1.5, -3.0, -8.0, -30.0] {
        let frame = update_frame(&mut system, &camera_at(x), 0.5).unwrap();
        assert!(frame.stats.traversal_ran || frame.stats.debounced);
        assert!(is_valid_cut(&system.scene.dag, &frame.selection));

        let drawn: usize = frame.batches.iter().map(|b| b.count as usize).sum();
        assert_eq!(drawn, frame.stats.meshlets_drawn);
        assert_eq!(frame.stats.draw_calls, frame.batches.len());
    }
}

#[test]
fn test_far_camera_draws_roots_only() {
    init_logging();
    let mut config = LodSystemConfig::default();
    config.scheduler.worker_cap = 4;
    let mut system = create_lod_system(config, &two_sphere_scene(), &QuadricSimplifier).unwrap();

    let frame = update_frame(&mut system, &camera_at(-2_000.0), 0.016).unwrap();
    let mut roots = system.scene.dag.roots.clone();
    roots.sort_unstable();
    assert_eq!(frame.selection, roots);
}

#[test]
fn test_locked_lod_ignores_camera() {
    let mut config = LodSystemConfig::default();
    config.selection.locked_lod = 2;
    let mut system = create_lod_system(config, &two_sphere_scene(), &QuadricSimplifier).unwrap();

    let expected: usize = system
        .scene
        .meshes
        .iter()
        .map(|mesh| mesh.levels[2.min(mesh.levels.len() - 1)].meshlets.len())
        .sum();

    for x in [-1.0, -10.0, -1_000.0] {
        let frame = update_frame(&mut system, &camera_at(x), 0.016).unwrap();
        assert_eq!(frame.selection.len(), expected);
        assert!(frame.selection.iter().all(|r| r.level == 2));
        assert_eq!(frame.stats.draw_calls, 2);
    }
}

#[test]
fn test_single_worker_frames_repeat() {
    let mut config = LodSystemConfig::default();
    config.scheduler.worker_cap = 1;
    config.selection.debounce_scale = 0.0;
    let meshes = two_sphere_scene();

    let mut selections = Vec::new();
    for _ in 0..3 {
        let mut system = create_lod_system(config.clone(), &meshes, &QuadricSimplifier).unwrap();
        let frame = update_frame(&mut system, &camera_at(-5.0), 0.016).unwrap();
        selections.push(frame.selection);
    }
    assert!(selections.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_batches_stay_inside_one_packed_buffer() {
    init_logging();
    let mut config = LodSystemConfig::default();
    config.packing.offset_field_bits = 3;
    config.selection.locked_lod = 0;
    let meshes = vec![named("sphere", create_sphere_mesh(64, 32, 1.0))];
    let mut system = create_lod_system(config, &meshes, &QuadricSimplifier).unwrap();

    let level = &system.scene.meshes[0].levels[0];
    assert!(level.buffers.len() > 1);
    let buffer_sizes: Vec<u32> = level
        .buffers
        .iter()
        .map(|buffer| buffer.descriptors.len() as u32)
        .collect();
    let meshlet_total = level.meshlets.len();

    let frame = update_frame(&mut system, &camera_at(-5.0), 0.016).unwrap();
    assert_eq!(frame.stats.meshlets_drawn, meshlet_total);
    assert!(frame.batches.len() >= buffer_sizes.len());
    for batch in &frame.batches {
        let size = buffer_sizes[batch.buffer_index as usize];
        assert!(batch.start + batch.count <= size);
    }
}
