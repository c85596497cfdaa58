//! LOD system operations - Pure DOP functions
//!
//! `update_frame` is the per-frame entry point: derive camera motion, pick
//! nodes (locked, discrete, or traversed), then coalesce them into batches.
//! Selection fully finishes before coalescing starts.

use crate::camera::{camera_speed, init_camera_from_config, update_camera_motion, CameraData};
use crate::config::LodSystemConfig;
use crate::draw::{coalesce_selection, create_batch_pool};
use crate::error::EngineResult;
use crate::lod::{build_scene, report_processing_errors, LodScene, MeshSimplifier};
use crate::lod_system_data::{FrameResult, FrameStats, FrameTotals, LodSystemData, SelectionMode};
use crate::meshlet::NamedMesh;
use crate::traversal::{
    camera_snapshot, create_traversal_scheduler, dag_max_lod, prepare_thresholds, run_traversal,
    select_discrete_lod, select_locked_lod, selection_params, should_debounce,
    validate_selection_config, SelectionConfig,
};
use std::time::Duration;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Preprocess `meshes` and set up frame state
pub fn create_lod_system(
    config: LodSystemConfig,
    meshes: &[NamedMesh],
    simplifier: &dyn MeshSimplifier,
) -> EngineResult<LodSystemData> {
    config.validate()?;
    let scene = build_scene(
        meshes,
        simplifier,
        &config.meshlet,
        &config.packing,
        &config.lod,
    )?;
    create_lod_system_from_scene(config, scene)
}

/// Set up frame state around an already built scene
pub fn create_lod_system_from_scene(
    config: LodSystemConfig,
    mut scene: LodScene,
) -> EngineResult<LodSystemData> {
    config.validate()?;

    let reported = report_processing_errors(&mut scene.report);
    if reported > 0 {
        log::info!("[create_lod_system] Continuing with {} processing errors", reported);
    }

    let [width, height] = config.selection.resolution;
    let camera = init_camera_from_config(&config.camera, width as f32 / height as f32);

    log::info!(
        "[create_lod_system] {} meshes, {} DAG levels, {} roots",
        scene.meshes.len(),
        scene.dag.levels.len(),
        scene.dag.roots.len()
    );

    Ok(LodSystemData {
        scheduler: create_traversal_scheduler(&config.scheduler)?,
        batch_pool: create_batch_pool(&config.draw),
        camera,
        scene,
        config,
        selection: Vec::new(),
        last_mode: None,
        seconds_since_traversal: None,
        last_traversal_position: None,
        frame_index: 0,
    })
}

/// Swap selection settings; the next frame re-selects from scratch
pub fn set_selection_config(system: &mut LodSystemData, selection: SelectionConfig) -> EngineResult<()> {
    validate_selection_config(&selection)?;
    system.config.selection = selection;
    invalidate_selection(system);
    Ok(())
}

/// Force the next continuous frame to traverse
pub fn invalidate_selection(system: &mut LodSystemData) {
    system.selection.clear();
    system.seconds_since_traversal = None;
    system.last_traversal_position = None;
}

pub fn selection_mode(config: &SelectionConfig) -> SelectionMode {
    if config.locked_lod >= 0 {
        SelectionMode::Locked(config.locked_lod as u32)
    } else if config.discrete {
        SelectionMode::Discrete
    } else {
        SelectionMode::Continuous
    }
}

// ============================================================================
// FRAME UPDATE
// ============================================================================

/// Select and batch one frame for `camera`
///
/// `delta_time` is seconds since the previous frame. It feeds the camera
/// velocity estimate and the debounce clock, so debouncing follows the
/// caller's frame timeline rather than wall time.
pub fn update_frame(
    system: &mut LodSystemData,
    camera: &CameraData,
    delta_time: f32,
) -> EngineResult<FrameResult> {
    let mut tracked = *camera;
    tracked.old_position = system.camera.position;
    system.camera = update_camera_motion(&tracked, delta_time);
    system.frame_index += 1;
    if let Some(seconds) = system.seconds_since_traversal.as_mut() {
        *seconds += delta_time.max(0.0);
    }

    let mode = selection_mode(&system.config.selection);
    if system.last_mode != Some(mode) {
        invalidate_selection(system);
        system.last_mode = Some(mode);
    }

    let mut stats = FrameStats {
        frame_index: system.frame_index,
        mode,
        traversal_ran: false,
        debounced: false,
        nodes_visited: 0,
        nodes_culled: 0,
        nodes_too_small: 0,
        nodes_selected: 0,
        nodes_shadowed: 0,
        draw_calls: 0,
        meshlets_drawn: 0,
        triangles_drawn: 0,
        batches_dropped: 0,
        duplicates_skipped: 0,
        traversal_time: Duration::ZERO,
    };

    let dag = &system.scene.dag;
    match mode {
        SelectionMode::Locked(lod) => {
            system.selection = select_locked_lod(dag, lod);
        }
        SelectionMode::Discrete => {
            let thresholds = prepare_thresholds(&system.config.selection, dag_max_lod(dag));
            system.selection = select_discrete_lod(&system.scene, &system.camera, &thresholds);
        }
        SelectionMode::Continuous => {
            let moved = system.last_traversal_position != Some(system.camera.position);
            let since = system.seconds_since_traversal.unwrap_or(f32::INFINITY);

            if should_debounce(
                !system.selection.is_empty(),
                moved,
                camera_speed(&system.camera),
                since,
                system.config.selection.debounce_scale,
            ) {
                stats.debounced = true;
            } else {
                let params = selection_params(&system.config.selection, dag_max_lod(dag));
                let outcome = run_traversal(
                    &mut system.scheduler,
                    dag,
                    camera_snapshot(&system.camera),
                    params,
                )?;

                stats.traversal_ran = true;
                stats.nodes_visited = outcome.visited;
                stats.nodes_culled = outcome.culled;
                stats.nodes_too_small = outcome.too_small;
                stats.nodes_shadowed = outcome.shadowed;
                stats.traversal_time = outcome.elapsed;

                system.selection = outcome.selected;
                system.seconds_since_traversal = Some(0.0);
                system.last_traversal_position = Some(system.camera.position);
            }
        }
    }

    let coalesced = coalesce_selection(&system.scene.dag, &system.selection, &mut system.batch_pool);
    stats.nodes_selected = system.selection.len();
    stats.draw_calls = coalesced.draw_calls;
    stats.meshlets_drawn = coalesced.meshlets_drawn;
    stats.triangles_drawn = coalesced.triangles_drawn;
    stats.batches_dropped = coalesced.batches_dropped;
    stats.duplicates_skipped = coalesced.duplicates_skipped;

    log::trace!(
        "[update_frame] Frame {} {:?}: {} selected, {} draw calls, {} triangles{}",
        stats.frame_index,
        stats.mode,
        stats.nodes_selected,
        stats.draw_calls,
        stats.triangles_drawn,
        if stats.debounced { " (debounced)" } else { "" }
    );

    Ok(FrameResult {
        batches: system.batch_pool.batches.clone(),
        stats,
        selection: system.selection.clone(),
    })
}

// ============================================================================
// AGGREGATION
// ============================================================================

pub fn accumulate_frame_stats(totals: &mut FrameTotals, stats: &FrameStats) {
    totals.frames += 1;
    totals.traversals += stats.traversal_ran as u64;
    totals.debounced += stats.debounced as u64;
    totals.draw_calls += stats.draw_calls as u64;
    totals.triangles_drawn += stats.triangles_drawn;
    totals.batches_dropped += stats.batches_dropped as u64;
    totals.traversal_time += stats.traversal_time;
}

pub fn log_frame_totals(label: &str, totals: &FrameTotals) {
    let frames = totals.frames.max(1);
    log::info!(
        "[{}] {} frames, {} traversals ({} debounced), {:.1} draw calls/frame, {:.0} triangles/frame, {} batches dropped, {:?} traversing",
        label,
        totals.frames,
        totals.traversals,
        totals.debounced,
        totals.draw_calls as f64 / frames as f64,
        totals.triangles_drawn as f64 / frames as f64,
        totals.batches_dropped,
        totals.traversal_time
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{init_camera_looking_at, move_to};
    use crate::lod::QuadricSimplifier;
    use crate::meshlet::mesh_utils::create_sphere_mesh;
    use crate::traversal::is_valid_cut;
    use cgmath::Point3;

    fn system(config: LodSystemConfig) -> LodSystemData {
        let meshes = [NamedMesh {
            name: "sphere".to_string(),
            mesh: create_sphere_mesh(32, 16, 1.0),
        }];
        let mut config = config;
        config.lod.max_lod = 3;
        config.scheduler.worker_cap = 2;
        create_lod_system(config, &meshes, &QuadricSimplifier).unwrap()
    }

    fn camera_at(x: f32) -> CameraData {
        init_camera_looking_at(Point3::new(x, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0))
    }

    #[test]
    fn test_static_camera_is_debounced() {
        let mut system = system(LodSystemConfig::default());
        let camera = camera_at(-4.0);

        let first = update_frame(&mut system, &camera, 0.016).unwrap();
        assert!(first.stats.traversal_ran);
        assert!(!first.selection.is_empty());
        assert!(is_valid_cut(&system.scene.dag, &first.selection));

        let second = update_frame(&mut system, &camera, 0.016).unwrap();
        assert!(second.stats.debounced);
        assert!(!second.stats.traversal_ran);
        assert_eq!(second.selection, first.selection);
        assert_eq!(second.batches, first.batches);
    }

    #[test]
    fn test_fast_motion_waits_for_delay() {
        let mut system = system(LodSystemConfig::default());
        let camera = camera_at(-4.0);
        update_frame(&mut system, &camera, 0.016).unwrap();

        // 10 units in 10 ms: a 1000 s delay
        let moved = move_to(&camera, Point3::new(-14.0, 0.0, 0.0));
        let frame = update_frame(&mut system, &moved, 0.01).unwrap();
        assert!(frame.stats.debounced);

        let mut config = system.config.selection.clone();
        config.debounce_scale = 0.0;
        set_selection_config(&mut system, config).unwrap();
        let frame = update_frame(&mut system, &moved, 0.01).unwrap();
        assert!(frame.stats.traversal_ran);
    }

    #[test]
    fn test_debounce_follows_frame_time() {
        let mut config = LodSystemConfig::default();
        config.selection.debounce_scale = 0.25;
        let mut system = system(config);

        // 0.02 units per 10 ms frame: 2 units/s, so 0.5 s between traversals
        let mut traversal_frames = Vec::new();
        for frame in 0..120u32 {
            let camera = camera_at(-10.0 + 0.02 * frame as f32);
            let result = update_frame(&mut system, &camera, 0.01).unwrap();
            assert!(result.stats.traversal_ran != result.stats.debounced);
            if result.stats.traversal_ran {
                traversal_frames.push(frame);
            }
        }

        assert_eq!(traversal_frames[0], 0);
        assert!(traversal_frames.len() >= 3);
        for pair in traversal_frames.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((49..=52).contains(&gap), "gap {}", gap);
        }
    }

    #[test]
    fn test_traversal_reports_too_small_nodes() {
        let mut config = LodSystemConfig::default();
        config.selection.policy = crate::traversal::SelectionPolicy::ScreenSpaceError;
        config.selection.pixel_threshold = 1.0e6;
        let mut system = system(config);

        let frame = update_frame(&mut system, &camera_at(-4.0), 0.016).unwrap();
        assert!(frame.stats.traversal_ran);
        assert!(frame.stats.nodes_too_small > 0);
        assert!(frame.selection.is_empty());
    }

    #[test]
    fn test_locked_lod_selects_one_level() {
        let mut config = LodSystemConfig::default();
        config.selection.locked_lod = 1;
        let mut system = system(config);

        for x in [-2.0, -50.0, -500.0] {
            let frame = update_frame(&mut system, &camera_at(x), 0.016).unwrap();
            assert_eq!(frame.stats.mode, SelectionMode::Locked(1));
            assert!(!frame.stats.traversal_ran);
            assert_eq!(frame.selection.len(), system.scene.meshes[0].levels[1].meshlets.len());
            assert!(frame.selection.iter().all(|r| r.level == 1));
            assert_eq!(frame.stats.meshlets_drawn, frame.selection.len());
            // Whole level in one run
            assert_eq!(frame.stats.draw_calls, 1);
        }
    }

    #[test]
    fn test_discrete_mode_picks_by_distance() {
        let mut config = LodSystemConfig::default();
        config.selection.discrete = true;
        let mut system = system(config);

        let near = update_frame(&mut system, &camera_at(-0.2), 0.016).unwrap();
        assert!(near.selection.iter().all(|r| r.level == 0));

        let far = update_frame(&mut system, &camera_at(-500.0), 0.016).unwrap();
        let coarsest = system.scene.dag.mesh_max_lod[0];
        assert!(far.selection.iter().all(|r| r.level == coarsest));
    }

    #[test]
    fn test_totals_accumulate() {
        let mut system = system(LodSystemConfig::default());
        let mut totals = FrameTotals::default();
        for _ in 0..3 {
            let frame = update_frame(&mut system, &camera_at(-6.0), 0.016).unwrap();
            accumulate_frame_stats(&mut totals, &frame.stats);
        }
        assert_eq!(totals.frames, 3);
        assert_eq!(totals.traversals, 1);
        assert_eq!(totals.debounced, 2);
        assert!(totals.draw_calls >= 3);
    }
}
