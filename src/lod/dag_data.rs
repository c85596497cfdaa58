//! LOD DAG data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Nodes live in flat per-level arrays that own them. Every link between
//! nodes is a `NodeRef` (level, index) into those arrays, never a pointer.

use crate::bounds::AABB;
use cgmath::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Arena address of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub level: u32,
    pub index: u32,
}

/// One meshlet of one mesh at one detail level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagNode {
    /// Unique across the whole DAG
    pub id: u32,
    pub lod: u32,
    pub mesh_index: u32,
    /// Index into the (mesh, lod) meshlet list
    pub meshlet_index: u32,
    /// Packed buffer of the (mesh, lod) level holding this meshlet
    pub buffer_index: u32,
    /// Descriptor slot inside that buffer
    pub descriptor_index: u32,
    pub bounds: AABB,
    pub center: Point3<f32>,
    pub triangle_count: u32,
    /// Compounded simplification error of this node's level
    pub simplification_error: f32,
    /// Child id -> finer node; empty for leaves
    pub children: BTreeMap<u32, NodeRef>,
    /// Coarser nodes linking to this one
    pub parents: Vec<NodeRef>,
}

/// Nodes grouped by level, finest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LodDag {
    pub levels: Vec<Vec<DagNode>>,
    /// Coarsest node of every mesh, ordered by level then index
    pub roots: Vec<NodeRef>,
    /// Node id -> arena address
    pub id_index: Vec<NodeRef>,
    /// Coarsest level each mesh reached
    pub mesh_max_lod: Vec<u32>,
}
