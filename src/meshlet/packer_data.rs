//! Packed meshlet geometry - Pure DOP
//!
//! NO METHODS. Just data.
//! Packing lives in packer_operations.rs, cull fields are filled by cull_metadata.rs

use super::cull_metadata::MeshletCullData;
use crate::constants::packing::{OFFSET_FIELD_BITS, PRIMITIVE_ALIGNMENT, VERTEX_ALIGNMENT};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// Layout rules for packed buffers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    /// Vertex sub-ranges start on multiples of this many entries
    pub vertex_alignment: u32,
    /// Primitive sub-ranges start on multiples of this many bytes
    pub primitive_alignment: u32,
    /// Width of the descriptor begin fields, counted in alignment units
    pub offset_field_bits: u32,
}

/// Per-meshlet descriptor consumed by the GPU backend
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshletDescriptor {
    /// First entry in `vertex_indices`
    pub vertex_begin: u32,
    /// First byte in `primitive_indices`
    pub primitive_begin: u32,
    pub vertex_count: u16,
    pub primitive_count: u16,
    pub cull: MeshletCullData,
}

const_assert_eq!(std::mem::size_of::<MeshletDescriptor>(), 24);

/// Global index arrays plus descriptors
///
/// Primitives are stored as three u8 local indices each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedMeshletGeometry {
    pub vertex_indices: Vec<u32>,
    pub primitive_indices: Vec<u8>,
    pub descriptors: Vec<MeshletDescriptor>,
}

/// Outcome of one packing pass
#[derive(Debug, Clone, PartialEq)]
pub struct PackResult {
    pub geometry: PackedMeshletGeometry,
    /// Meshlets written into `geometry`, from the front of the input
    pub packed_count: usize,
    /// False when a begin offset ran out of descriptor range
    pub complete: bool,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            vertex_alignment: VERTEX_ALIGNMENT,
            primitive_alignment: PRIMITIVE_ALIGNMENT,
            offset_field_bits: OFFSET_FIELD_BITS,
        }
    }
}
