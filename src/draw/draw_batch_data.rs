//! Draw batch data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Batches are built by draw_batch_operations.rs after traversal drains.

use crate::constants::draw::BATCH_POOL_CAPACITY;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// Batch slots available per frame
    pub batch_pool_capacity: usize,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            batch_pool_capacity: BATCH_POOL_CAPACITY,
        }
    }
}

/// A run of consecutive descriptors inside one packed buffer
///
/// The backend draws descriptors `start..start + count` of packed buffer
/// `buffer_index` of level `lod`. A batch never spans two buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawBatch {
    pub mesh_index: u32,
    pub lod: u32,
    pub buffer_index: u32,
    pub start: u32,
    pub count: u32,
    pub triangles: u64,
}

/// Fixed-capacity batch storage, refilled every frame
///
/// `batches` is allocated once with `capacity` and never grows past it.
#[derive(Debug, Clone, Default)]
pub struct BatchPool {
    pub capacity: usize,
    pub batches: Vec<DrawBatch>,
}

/// Tallies from one coalescing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoalesceStats {
    pub draw_calls: usize,
    pub meshlets_drawn: usize,
    pub triangles_drawn: u64,
    /// Batches that found no free slot
    pub batches_dropped: usize,
    pub duplicates_skipped: usize,
}
