//! Draw batch operations - Pure DOP functions
//!
//! Single-threaded; runs strictly after traversal has drained.

use super::draw_batch_data::{BatchPool, CoalesceStats, DrawBatch, DrawConfig};
use crate::error::{invalid_config, EngineResult};
use crate::lod::{dag_node, LodDag, NodeRef};
use std::collections::BTreeMap;

// ============================================================================
// POOL
// ============================================================================

pub fn validate_draw_config(config: &DrawConfig) -> EngineResult<()> {
    if config.batch_pool_capacity == 0 {
        return Err(invalid_config(
            "draw.batch_pool_capacity",
            config.batch_pool_capacity,
            "must be at least 1",
        ));
    }
    Ok(())
}

pub fn create_batch_pool(config: &DrawConfig) -> BatchPool {
    BatchPool {
        capacity: config.batch_pool_capacity,
        batches: Vec::with_capacity(config.batch_pool_capacity),
    }
}

/// Return every slot for the next frame
pub fn reset_batch_pool(pool: &mut BatchPool) {
    pool.batches.clear();
}

pub fn pool_remaining(pool: &BatchPool) -> usize {
    pool.capacity.saturating_sub(pool.batches.len())
}

/// Store `batch` in a free slot; false when the pool is exhausted
pub fn push_batch(pool: &mut BatchPool, batch: DrawBatch) -> bool {
    if pool.batches.len() >= pool.capacity {
        return false;
    }
    pool.batches.push(batch);
    true
}

// ============================================================================
// COALESCING
// ============================================================================

/// Merge selected nodes into contiguous descriptor ranges
///
/// Groups by (mesh, lod, packed buffer) and walks each group in descriptor
/// order. An index gap or the end of a group closes the current batch.
/// Repeated descriptors are counted and skipped. Batches past the pool capacity are
/// dropped for this frame. The pool is reset first.
pub fn coalesce_selection(dag: &LodDag, selected: &[NodeRef], pool: &mut BatchPool) -> CoalesceStats {
    reset_batch_pool(pool);
    let mut stats = CoalesceStats::default();

    let mut groups: BTreeMap<(u32, u32, u32), Vec<(u32, u32)>> = BTreeMap::new();
    for &node_ref in selected {
        if let Some(node) = dag_node(dag, node_ref) {
            groups
                .entry((node.mesh_index, node.lod, node.buffer_index))
                .or_default()
                .push((node.descriptor_index, node.triangle_count));
        }
    }

    let mut warned = false;
    for ((mesh_index, lod, buffer_index), mut meshlets) in groups {
        meshlets.sort_unstable_by_key(|&(index, _)| index);

        let mut current: Option<DrawBatch> = None;
        let mut last_index: Option<u32> = None;
        for (index, triangles) in meshlets {
            if last_index == Some(index) {
                stats.duplicates_skipped += 1;
                continue;
            }
            last_index = Some(index);

            match current.as_mut() {
                Some(batch) if batch.start + batch.count == index => {
                    batch.count += 1;
                    batch.triangles += triangles as u64;
                }
                _ => {
                    if let Some(done) = current.take() {
                        finalize_batch(pool, done, &mut stats, &mut warned);
                    }
                    current = Some(DrawBatch {
                        mesh_index,
                        lod,
                        buffer_index,
                        start: index,
                        count: 1,
                        triangles: triangles as u64,
                    });
                }
            }
        }

        if let Some(done) = current {
            finalize_batch(pool, done, &mut stats, &mut warned);
        }
    }

    if stats.batches_dropped > 0 {
        log::debug!(
            "[coalesce_selection] {} batches dropped, {} slots",
            stats.batches_dropped,
            pool.capacity
        );
    }
    stats
}

fn finalize_batch(pool: &mut BatchPool, batch: DrawBatch, stats: &mut CoalesceStats, warned: &mut bool) {
    if push_batch(pool, batch) {
        stats.draw_calls += 1;
        stats.meshlets_drawn += batch.count as usize;
        stats.triangles_drawn += batch.triangles;
        return;
    }

    stats.batches_dropped += 1;
    if !*warned {
        *warned = true;
        log::warn!(
            "[coalesce_selection] Batch pool exhausted at {} slots, dropping the rest of this frame",
            pool.capacity
        );
    }
}
