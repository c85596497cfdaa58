//! LOD chain data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Chain building lives in lod_chain_operations.rs

use crate::constants::lod::{MAX_LOD, REDUCTION_RATIO};
use crate::meshlet::mesh_data::MeshData;
use serde::{Deserialize, Serialize};

/// Simplification settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodBuildConfig {
    /// Simplified levels to attempt above level 0
    pub max_lod: u32,
    /// Each level targets this fraction of the previous triangle count
    pub reduction_ratio: f32,
    /// Per-step error budget, relative to the mesh's bounding diagonal
    pub max_error: f32,
}

/// One detail level of one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct LodLevel {
    pub lod: u32,
    pub mesh: MeshData,
    /// Error reported by the simplification step that produced this level
    pub step_error: f32,
    /// Sum of step errors from level 0 up to here
    pub error: f32,
}

/// Progressively simplified versions of a mesh, finest first
#[derive(Debug, Clone, PartialEq)]
pub struct LodChain {
    pub name: String,
    pub levels: Vec<LodLevel>,
}

impl Default for LodBuildConfig {
    fn default() -> Self {
        Self {
            max_lod: MAX_LOD,
            reduction_ratio: REDUCTION_RATIO,
            max_error: 1.0,
        }
    }
}
