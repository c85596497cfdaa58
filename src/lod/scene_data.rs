//! Scene data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Everything here is built once by scene_operations.rs and read-only afterwards.

use super::dag_data::LodDag;
use super::error::ProcessingReport;
use crate::bounds::AABB;
use crate::meshlet::clusterer_data::Meshlet;
use crate::meshlet::mesh_data::Vertex;
use crate::meshlet::meshlet_stats::MeshletStats;
use crate::meshlet::packer_data::PackedMeshletGeometry;
use cgmath::Point3;
use std::sync::Arc;

/// Where one meshlet landed after packing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshletSlot {
    pub buffer_index: u32,
    pub descriptor_index: u32,
}

/// GPU-ready data for one mesh at one detail level
#[derive(Debug, Clone, PartialEq)]
pub struct MeshLevel {
    pub lod: u32,
    pub vertices: Vec<Vertex>,
    pub meshlets: Vec<Meshlet>,
    /// Packed buffers; meshlet indices run continuously across them
    pub buffers: Vec<PackedMeshletGeometry>,
    /// Buffer and descriptor of every meshlet, in meshlet order
    pub meshlet_slots: Vec<MeshletSlot>,
    /// Exact object-space bounds per meshlet
    pub meshlet_bounds: Vec<AABB>,
    /// Bounds the cull grid is quantized against
    pub object_bounds: AABB,
    pub triangle_count: usize,
    /// Compounded simplification error
    pub error: f32,
}

/// One input mesh with all of its levels
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMesh {
    pub name: String,
    pub center: Point3<f32>,
    pub bounds: AABB,
    /// Finest first
    pub levels: Vec<MeshLevel>,
}

/// Preprocessed scene ready for per-frame selection
#[derive(Debug, Clone, Default)]
pub struct LodScene {
    pub meshes: Vec<SceneMesh>,
    /// Shared with traversal workers
    pub dag: Arc<LodDag>,
    pub stats: MeshletStats,
    pub report: ProcessingReport,
}
