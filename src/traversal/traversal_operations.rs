//! Traversal operations - Pure DOP functions
//!
//! Node evaluation, threshold preparation, cut enforcement, and the
//! direct (non-traversing) selection modes.

use super::traversal_data::{CameraSnapshot, NodeDecision, SelectionConfig, SelectionParams, SelectionPolicy};
use crate::bounds::aabb_diagonal_length;
use crate::camera::{aabb_in_frustum, extract_frustum, CameraData};
use crate::error::{invalid_config, EngineResult};
use crate::lod::{dag_node, has_ancestor_in, is_leaf, level_nodes, DagNode, LodDag, LodScene, NodeRef};
use cgmath::MetricSpace;
use rustc_hash::FxHashSet;

// ============================================================================
// CONFIGURATION
// ============================================================================

pub fn validate_selection_config(config: &SelectionConfig) -> EngineResult<()> {
    if config.thresholds.is_empty() {
        return Err(invalid_config(
            "selection.thresholds",
            "[]",
            "needs at least one entry",
        ));
    }

    if let Some(bad) = config.thresholds.iter().find(|t| !(**t > 0.0)) {
        return Err(invalid_config(
            "selection.thresholds",
            bad,
            "entries must be positive",
        ));
    }

    if config.thresholds.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(invalid_config(
            "selection.thresholds",
            format!("{:?}", config.thresholds),
            "must be strictly ascending",
        ));
    }

    if !(config.threshold_scale > 0.0) {
        return Err(invalid_config(
            "selection.threshold_scale",
            config.threshold_scale,
            "must be positive",
        ));
    }

    if !(config.extension_factor > 1.0) {
        return Err(invalid_config(
            "selection.extension_factor",
            config.extension_factor,
            "must be greater than 1",
        ));
    }

    if !(config.pixel_threshold >= 0.0) {
        return Err(invalid_config(
            "selection.pixel_threshold",
            config.pixel_threshold,
            "must not be negative",
        ));
    }

    if !(config.sse_threshold > 0.0) {
        return Err(invalid_config(
            "selection.sse_threshold",
            config.sse_threshold,
            "must be positive",
        ));
    }

    if config.resolution.contains(&0) {
        return Err(invalid_config(
            "selection.resolution",
            format!("{:?}", config.resolution),
            "must be non-zero in both axes",
        ));
    }

    if config.locked_lod < -1 {
        return Err(invalid_config(
            "selection.locked_lod",
            config.locked_lod,
            "must be -1 (unlocked) or a level",
        ));
    }

    if !(config.debounce_scale >= 0.0) {
        return Err(invalid_config(
            "selection.debounce_scale",
            config.debounce_scale,
            "must not be negative",
        ));
    }

    Ok(())
}

/// Thresholds for levels 0..=max_lod
///
/// A short table is extended by repeatedly multiplying the last entry by
/// the extension factor, then every entry is scaled.
pub fn prepare_thresholds(config: &SelectionConfig, max_lod: u32) -> Vec<f32> {
    let wanted = max_lod as usize + 1;
    let mut thresholds = config.thresholds.clone();
    if thresholds.is_empty() {
        thresholds.push(1.0);
    }

    while thresholds.len() < wanted {
        let last = thresholds[thresholds.len() - 1];
        thresholds.push(last * config.extension_factor);
    }

    for threshold in &mut thresholds {
        *threshold *= config.threshold_scale;
    }
    thresholds
}

pub fn selection_params(config: &SelectionConfig, max_lod: u32) -> SelectionParams {
    SelectionParams {
        policy: config.policy,
        thresholds: prepare_thresholds(config, max_lod),
        pixel_threshold: config.pixel_threshold,
        sse_threshold: config.sse_threshold,
        resolution: config.resolution,
    }
}

/// Highest level present in the DAG
pub fn dag_max_lod(dag: &LodDag) -> u32 {
    dag.levels.len().saturating_sub(1) as u32
}

pub fn camera_snapshot(camera: &CameraData) -> CameraSnapshot {
    CameraSnapshot {
        position: camera.position,
        frustum: extract_frustum(camera),
        fov_radians: camera.fov_radians,
    }
}

// ============================================================================
// NODE EVALUATION
// ============================================================================

/// Threshold for `lod`, reusing the last entry past the end
pub fn level_threshold(thresholds: &[f32], lod: u32) -> f32 {
    thresholds
        .get(lod as usize)
        .or_else(|| thresholds.last())
        .copied()
        .unwrap_or(f32::INFINITY)
}

/// Angular size of `extent` at `distance`, in pixels along the vertical axis
pub fn projected_pixels(extent: f32, distance: f32, fov_radians: f32, resolution_y: u32) -> f32 {
    let angle = extent.atan2(distance);
    (angle / fov_radians) * resolution_y as f32
}

/// Decide what to do with one node
///
/// Frustum first, then leaves are always drawn, then the policy.
pub fn evaluate_node(node: &DagNode, camera: &CameraSnapshot, params: &SelectionParams) -> NodeDecision {
    if !aabb_in_frustum(&camera.frustum, &node.bounds) {
        return NodeDecision::Culled;
    }

    if is_leaf(node) {
        return NodeDecision::Select;
    }

    let distance = camera.position.distance(node.center);
    let threshold = level_threshold(&params.thresholds, node.lod);

    match params.policy {
        SelectionPolicy::Distance => {
            if distance < threshold {
                NodeDecision::Expand
            } else {
                NodeDecision::Select
            }
        }
        SelectionPolicy::ScreenSpaceError => {
            if distance <= f32::EPSILON {
                return NodeDecision::Expand;
            }

            let resolution_y = params.resolution[1];
            let size = projected_pixels(
                aabb_diagonal_length(&node.bounds) * 0.5,
                distance,
                camera.fov_radians,
                resolution_y,
            );
            if size < params.pixel_threshold {
                return NodeDecision::TooSmall;
            }

            if distance < threshold {
                return NodeDecision::Expand;
            }

            let error = projected_pixels(
                node.simplification_error,
                distance,
                camera.fov_radians,
                resolution_y,
            );
            if error < params.sse_threshold {
                NodeDecision::Select
            } else {
                NodeDecision::Expand
            }
        }
    }
}

// ============================================================================
// CUT
// ============================================================================

/// Drop selected nodes that have a selected ancestor
///
/// Overlap links let one fine node hang under several coarse ones, so a
/// node can be drawn by one parent and reached again through another.
/// Returns the kept nodes sorted by (level, index) and the number removed.
pub fn enforce_cut(dag: &LodDag, selected: &[NodeRef]) -> (Vec<NodeRef>, usize) {
    let ids: FxHashSet<u32> = selected
        .iter()
        .filter_map(|&node_ref| dag_node(dag, node_ref))
        .map(|node| node.id)
        .collect();

    let mut kept: Vec<NodeRef> = selected
        .iter()
        .copied()
        .filter(|&node_ref| !has_ancestor_in(dag, node_ref, &ids))
        .collect();
    kept.sort_unstable();
    kept.dedup();

    let shadowed = selected.len() - kept.len();
    if shadowed > 0 {
        log::debug!("[enforce_cut] Removed {} shadowed nodes", shadowed);
    }
    (kept, shadowed)
}

/// Does the selection form a valid cut (no selected node under another)
pub fn is_valid_cut(dag: &LodDag, selected: &[NodeRef]) -> bool {
    let ids: FxHashSet<u32> = selected
        .iter()
        .filter_map(|&node_ref| dag_node(dag, node_ref))
        .map(|node| node.id)
        .collect();
    ids.len() == selected.len()
        && selected
            .iter()
            .all(|&node_ref| !has_ancestor_in(dag, node_ref, &ids))
}

// ============================================================================
// DIRECT SELECTION
// ============================================================================

/// Every meshlet of level `locked_lod` for each mesh
///
/// Meshes whose chain stopped short contribute their coarsest level.
pub fn select_locked_lod(dag: &LodDag, locked_lod: u32) -> Vec<NodeRef> {
    let mut selected = Vec::new();
    for (mesh_index, max_lod) in dag.mesh_max_lod.iter().enumerate() {
        let lod = locked_lod.min(*max_lod);
        selected.extend(level_nodes(dag, mesh_index as u32, lod));
    }
    selected.sort_unstable();
    selected
}

/// First level whose threshold covers `distance`, else the last one
pub fn discrete_level(thresholds: &[f32], distance: f32) -> u32 {
    thresholds
        .iter()
        .position(|&threshold| distance <= threshold)
        .unwrap_or(thresholds.len().saturating_sub(1)) as u32
}

/// One whole level per mesh, chosen by distance to the mesh center
pub fn select_discrete_lod(scene: &LodScene, camera: &CameraData, thresholds: &[f32]) -> Vec<NodeRef> {
    let mut selected = Vec::new();
    for (mesh_index, mesh) in scene.meshes.iter().enumerate() {
        let distance = camera.position.distance(mesh.center);
        let max_lod = scene
            .dag
            .mesh_max_lod
            .get(mesh_index)
            .copied()
            .unwrap_or(0);
        let lod = discrete_level(thresholds, distance).min(max_lod);
        selected.extend(level_nodes(&scene.dag, mesh_index as u32, lod));
    }
    selected.sort_unstable();
    selected
}

// ============================================================================
// DEBOUNCE
// ============================================================================

/// Skip this frame's traversal?
///
/// Never skips without a previous selection. A camera that has not moved
/// since the last traversal keeps that selection; a moving one waits
/// `speed * debounce_scale` seconds between traversals.
pub fn should_debounce(
    has_selection: bool,
    moved_since_traversal: bool,
    speed: f32,
    seconds_since_traversal: f32,
    debounce_scale: f32,
) -> bool {
    if !has_selection {
        return false;
    }
    if !moved_since_traversal {
        return true;
    }
    seconds_since_traversal < speed * debounce_scale
}
