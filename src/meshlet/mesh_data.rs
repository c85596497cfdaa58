//! Mesh data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Mesh generation and queries live in mesh_utils.rs

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// Vertex layout shared by every LOD level
/// Immutable once a level is built
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

const_assert_eq!(std::mem::size_of::<Vertex>(), 48);

/// Indexed triangle list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
}

/// Mesh handed to the scene builder
#[derive(Debug, Clone)]
pub struct NamedMesh {
    pub name: String,
    pub mesh: MeshData,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 1.0, 0.0],
            color: [1.0; 4],
            uv: [0.0; 2],
        }
    }
}
