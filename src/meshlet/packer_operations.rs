//! Meshlet packer operations - Pure DOP functions
//!
//! Concatenates meshlets into global index arrays. Each sub-range is padded
//! to the configured alignment by repeating its last entry, so padding is
//! never referenced by an in-range primitive.

use super::clusterer_data::Meshlet;
use super::packer_data::{MeshletDescriptor, PackResult, PackedMeshletGeometry, PackingConfig};
use crate::error::{invalid_config, EngineResult};
use bytemuck::Zeroable;

/// Alignments must be powers of two and the offset field non-trivial
pub fn validate_packing_config(config: &PackingConfig) -> EngineResult<()> {
    if !config.vertex_alignment.is_power_of_two() {
        return Err(invalid_config(
            "packing.vertex_alignment",
            config.vertex_alignment,
            "must be a power of two",
        ));
    }

    if !config.primitive_alignment.is_power_of_two() || config.primitive_alignment < 4 {
        return Err(invalid_config(
            "packing.primitive_alignment",
            config.primitive_alignment,
            "must be a power of two of at least 4",
        ));
    }

    if config.offset_field_bits == 0 || config.offset_field_bits > 32 {
        return Err(invalid_config(
            "packing.offset_field_bits",
            config.offset_field_bits,
            "must be within 1..=32",
        ));
    }

    Ok(())
}

/// Whether `begin` still fits the descriptor's begin field
pub fn is_begin_legal(begin: usize, alignment: u32, offset_field_bits: u32) -> bool {
    (begin as u64 / alignment as u64) < (1u64 << offset_field_bits)
}

/// Pack as many meshlets as the descriptor offset range allows
///
/// Stops at the first meshlet whose begin offset is out of range and returns
/// what was packed so far. The caller starts a new buffer for the rest.
pub fn pack_meshlets(meshlets: &[Meshlet], config: &PackingConfig) -> PackResult {
    let mut geometry = PackedMeshletGeometry::default();

    for (packed, meshlet) in meshlets.iter().enumerate() {
        let vertex_legal = is_begin_legal(
            geometry.vertex_indices.len(),
            config.vertex_alignment,
            config.offset_field_bits,
        );
        let primitive_legal = is_begin_legal(
            geometry.primitive_indices.len(),
            config.primitive_alignment,
            config.offset_field_bits,
        );

        if !vertex_legal || !primitive_legal {
            log::debug!(
                "[pack_meshlets] Offset range exhausted after {} of {} meshlets",
                packed,
                meshlets.len()
            );
            return PackResult {
                geometry,
                packed_count: packed,
                complete: false,
            };
        }

        append_meshlet(&mut geometry, meshlet, config);
    }

    PackResult {
        packed_count: meshlets.len(),
        geometry,
        complete: true,
    }
}

/// Pack every meshlet, opening a new buffer each time one fills up
pub fn pack_all_meshlets(meshlets: &[Meshlet], config: &PackingConfig) -> Vec<PackedMeshletGeometry> {
    let mut buffers = Vec::new();
    let mut remaining = meshlets;

    while !remaining.is_empty() {
        let result = pack_meshlets(remaining, config);
        if result.packed_count == 0 {
            log::error!("[pack_all_meshlets] Empty buffer could not take a meshlet");
            break;
        }
        remaining = &remaining[result.packed_count..];
        buffers.push(result.geometry);
    }

    if buffers.len() > 1 {
        log::info!(
            "[pack_all_meshlets] {} meshlets split across {} packed buffers",
            meshlets.len(),
            buffers.len()
        );
    }

    buffers
}

/// Append one meshlet and its aligned padding
pub fn append_meshlet(
    geometry: &mut PackedMeshletGeometry,
    meshlet: &Meshlet,
    config: &PackingConfig,
) {
    let mut descriptor = MeshletDescriptor::zeroed();
    descriptor.vertex_begin = geometry.vertex_indices.len() as u32;
    descriptor.primitive_begin = geometry.primitive_indices.len() as u32;
    descriptor.vertex_count = meshlet.vertices.len() as u16;
    descriptor.primitive_count = meshlet.primitives.len() as u16;

    geometry.vertex_indices.extend_from_slice(&meshlet.vertices);
    for primitive in &meshlet.primitives {
        geometry.primitive_indices.extend_from_slice(primitive);
    }

    // Pad with existing values to aid compression
    if let Some(&last) = meshlet.vertices.last() {
        while geometry.vertex_indices.len() % config.vertex_alignment as usize != 0 {
            geometry.vertex_indices.push(last);
        }
    }

    if let Some(last) = meshlet.primitives.last() {
        let mut corner = 0;
        while geometry.primitive_indices.len() % config.primitive_alignment as usize != 0 {
            geometry.primitive_indices.push(last[corner % 3]);
            corner += 1;
        }
    }

    geometry.descriptors.push(descriptor);
}

/// Vertex indices referenced by a descriptor, padding excluded
pub fn descriptor_vertices<'a>(
    geometry: &'a PackedMeshletGeometry,
    descriptor: &MeshletDescriptor,
) -> &'a [u32] {
    let begin = descriptor.vertex_begin as usize;
    &geometry.vertex_indices[begin..begin + descriptor.vertex_count as usize]
}

/// Local primitive triples referenced by a descriptor, padding excluded
pub fn descriptor_primitives(
    geometry: &PackedMeshletGeometry,
    descriptor: &MeshletDescriptor,
) -> Vec<[u8; 3]> {
    let begin = descriptor.primitive_begin as usize;
    let end = begin + descriptor.primitive_count as usize * 3;
    geometry.primitive_indices[begin..end]
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect()
}

/// Reconstruct the global vertex-index triples of meshlet `index`
pub fn unpack_meshlet(geometry: &PackedMeshletGeometry, index: usize) -> Option<Vec<[u32; 3]>> {
    let descriptor = geometry.descriptors.get(index)?;
    let vertices = descriptor_vertices(geometry, descriptor);
    descriptor_primitives(geometry, descriptor)
        .into_iter()
        .map(|p| {
            Some([
                *vertices.get(p[0] as usize)?,
                *vertices.get(p[1] as usize)?,
                *vertices.get(p[2] as usize)?,
            ])
        })
        .collect()
}
