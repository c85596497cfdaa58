//! LOD chain operations - Pure DOP functions
//!
//! Each level is simplified from the one before it. A step that fails to
//! reduce the triangle count ends the chain for that mesh.

use super::error::{LodErrorContext, LodResult, ProcessingError};
use super::lod_chain_data::{LodBuildConfig, LodChain, LodLevel};
use super::simplifier::MeshSimplifier;
use crate::error::invalid_config;
use crate::meshlet::mesh_data::{MeshData, NamedMesh};
use crate::meshlet::mesh_utils::{triangle_count, validate_mesh};

/// Reduction must shrink and the error budget must be usable
pub fn validate_lod_build_config(config: &LodBuildConfig) -> LodResult<()> {
    if !(config.reduction_ratio > 0.0 && config.reduction_ratio < 1.0) {
        return Err(invalid_config(
            "lod.reduction_ratio",
            config.reduction_ratio,
            "must be strictly between 0 and 1",
        ));
    }

    if !config.max_error.is_finite() || config.max_error < 0.0 {
        return Err(invalid_config(
            "lod.max_error",
            config.max_error,
            "must be a finite non-negative number",
        ));
    }

    Ok(())
}

/// Index count the next simplification should aim for
pub fn target_index_count(previous_triangles: usize, reduction_ratio: f32) -> usize {
    ((previous_triangles as f64 * reduction_ratio as f64) as usize) * 3
}

/// Build up to `max_lod` simplified levels above the input mesh
///
/// Returns the chain plus any non-fatal errors that truncated it. Invalid
/// input meshes are rejected outright.
pub fn build_lod_chain(
    named: &NamedMesh,
    simplifier: &dyn MeshSimplifier,
    config: &LodBuildConfig,
) -> LodResult<(LodChain, Vec<ProcessingError>)> {
    let _span = tracing::debug_span!("build_lod_chain", mesh = %named.name).entered();
    validate_lod_build_config(config)?;
    validate_mesh(&named.mesh).lod_context(&format!("mesh '{}'", named.name))?;

    let mut levels = vec![LodLevel {
        lod: 0,
        mesh: named.mesh.clone(),
        step_error: 0.0,
        error: 0.0,
    }];
    let mut errors = Vec::new();

    for lod in 1..=config.max_lod {
        let Some(previous) = levels.last() else {
            break;
        };
        let previous_triangles = triangle_count(&previous.mesh);
        let target = target_index_count(previous_triangles, config.reduction_ratio);

        let simplified = match simplifier.simplify(
            &previous.mesh.vertices,
            &previous.mesh.indices,
            target,
            config.max_error,
        ) {
            Ok(simplified) => simplified,
            Err(e) => {
                errors.push(ProcessingError::SimplifierFailed {
                    mesh: named.name.clone(),
                    level: lod,
                    reason: e.to_string(),
                });
                break;
            }
        };

        let triangles = simplified.indices.len() / 3;
        if triangles == 0 {
            errors.push(ProcessingError::SimplificationEmpty {
                mesh: named.name.clone(),
                level: lod,
            });
            break;
        }
        if triangles >= previous_triangles {
            errors.push(ProcessingError::SimplificationStalled {
                mesh: named.name.clone(),
                level: lod,
                triangles,
            });
            break;
        }

        let mesh = MeshData {
            vertices: simplified.vertices,
            indices: simplified.indices,
        };
        if let Err(e) = validate_mesh(&mesh) {
            errors.push(ProcessingError::SimplifierFailed {
                mesh: named.name.clone(),
                level: lod,
                reason: e.to_string(),
            });
            break;
        }

        // Errors compound: a coarse level is judged against level 0
        let error = previous.error + simplified.error;
        log::debug!(
            "[build_lod_chain] {} level {}: {} -> {} triangles, error {:.5}",
            named.name,
            lod,
            previous_triangles,
            triangles,
            error
        );
        levels.push(LodLevel {
            lod,
            mesh,
            step_error: simplified.error,
            error,
        });
    }

    log::info!(
        "[build_lod_chain] {} built {} levels ({} triangles at level 0)",
        named.name,
        levels.len(),
        triangle_count(&named.mesh)
    );

    Ok((
        LodChain {
            name: named.name.clone(),
            levels,
        },
        errors,
    ))
}

/// Coarsest level index in a chain
pub fn chain_max_lod(chain: &LodChain) -> u32 {
    chain.levels.len().saturating_sub(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, EngineResult};
    use crate::lod::simplifier::{QuadricSimplifier, SimplifiedMesh};
    use crate::meshlet::mesh_data::Vertex;
    use crate::meshlet::mesh_utils::{create_cube_mesh, create_grid_mesh, create_sphere_mesh};

    /// Returns its input unchanged
    struct StuckSimplifier;

    impl MeshSimplifier for StuckSimplifier {
        fn simplify(
            &self,
            vertices: &[Vertex],
            indices: &[u32],
            _target: usize,
            _max_error: f32,
        ) -> EngineResult<SimplifiedMesh> {
            Ok(SimplifiedMesh {
                vertices: vertices.to_vec(),
                indices: indices.to_vec(),
                error: 0.0,
            })
        }
    }

    /// Drops half the triangles with a fixed error, fails on the second call
    struct HalvingSimplifier {
        fail_below: usize,
    }

    impl MeshSimplifier for HalvingSimplifier {
        fn simplify(
            &self,
            vertices: &[Vertex],
            indices: &[u32],
            _target: usize,
            _max_error: f32,
        ) -> EngineResult<SimplifiedMesh> {
            if indices.len() < self.fail_below {
                return Err(EngineError::ProcessingFailed("too small".to_string()));
            }
            let keep = (indices.len() / 3 / 2) * 3;
            Ok(SimplifiedMesh {
                vertices: vertices.to_vec(),
                indices: indices[..keep].to_vec(),
                error: 0.25,
            })
        }
    }

    fn named(name: &str, mesh: MeshData) -> NamedMesh {
        NamedMesh {
            name: name.to_string(),
            mesh,
        }
    }

    #[test]
    fn test_stalled_simplification_truncates_chain() {
        let mesh = named("cube", create_cube_mesh());
        let (chain, errors) =
            build_lod_chain(&mesh, &StuckSimplifier, &LodBuildConfig::default()).unwrap();
        assert_eq!(chain.levels.len(), 1);
        assert_eq!(chain_max_lod(&chain), 0);
        assert!(matches!(
            errors.as_slice(),
            [ProcessingError::SimplificationStalled { level: 1, .. }]
        ));
    }

    #[test]
    fn test_errors_compound_across_levels() {
        let grid = named("grid", create_grid_mesh(8, 8, 4.0));
        let simplifier = HalvingSimplifier { fail_below: 0 };
        let config = LodBuildConfig {
            max_lod: 3,
            ..Default::default()
        };
        let (chain, errors) = build_lod_chain(&grid, &simplifier, &config).unwrap();
        assert!(errors.is_empty());
        assert_eq!(chain.levels.len(), 4);
        let expected = [0.0, 0.25, 0.5, 0.75];
        for (level, expected) in chain.levels.iter().zip(expected) {
            assert!((level.error - expected).abs() < 1e-6);
        }
        assert_eq!(triangle_count(&chain.levels[3].mesh), 16);
    }

    #[test]
    fn test_simplifier_failure_is_recorded() {
        let grid = named("grid", create_grid_mesh(8, 8, 4.0));
        // 128 triangles -> 64 -> fails once below 64 triangles
        let simplifier = HalvingSimplifier { fail_below: 64 * 3 };
        let (chain, errors) =
            build_lod_chain(&grid, &simplifier, &LodBuildConfig::default()).unwrap();
        assert_eq!(chain.levels.len(), 3);
        assert!(matches!(
            errors.as_slice(),
            [ProcessingError::SimplifierFailed { level: 3, .. }]
        ));
    }

    #[test]
    fn test_quadric_chain_is_strictly_decreasing() {
        let sphere = named("sphere", create_sphere_mesh(32, 16, 1.0));
        let config = LodBuildConfig {
            max_lod: 4,
            ..Default::default()
        };
        let (chain, _) = build_lod_chain(&sphere, &QuadricSimplifier, &config).unwrap();
        assert!(chain.levels.len() >= 2);
        for pair in chain.levels.windows(2) {
            assert!(triangle_count(&pair[1].mesh) < triangle_count(&pair[0].mesh));
            assert!(pair[1].error >= pair[0].error);
        }
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let mut bad = create_cube_mesh();
        bad.indices.push(0);
        match build_lod_chain(&named("bad", bad), &QuadricSimplifier, &LodBuildConfig::default()) {
            Err(EngineError::ProcessingFailed(message)) => {
                assert!(message.starts_with("mesh 'bad'"));
                assert!(message.contains("Invalid mesh"));
            }
            other => panic!("expected a rejected mesh, got {:?}", other.map(|(chain, _)| chain.levels.len())),
        }

        let config = LodBuildConfig {
            reduction_ratio: 1.5,
            ..Default::default()
        };
        assert!(validate_lod_build_config(&config).is_err());
    }

    #[test]
    fn test_target_index_count() {
        assert_eq!(target_index_count(100, 0.55), 165);
        assert_eq!(target_index_count(1, 0.55), 0);
    }
}
