/// LOD Error Handling
///
/// Fatal conditions go through `EngineError`. Conditions that only degrade
/// the built hierarchy are collected as `ProcessingError`s and reported once.
use crate::error::{EngineError, EngineResult};

/// LOD-specific result type
pub type LodResult<T> = EngineResult<T>;

/// Error context for LOD operations
pub trait LodErrorContext<T> {
    fn lod_context(self, context: &str) -> LodResult<T>;
}

impl<T> LodErrorContext<T> for Option<T> {
    fn lod_context(self, context: &str) -> LodResult<T> {
        self.ok_or_else(|| EngineError::ResourceNotFound {
            resource_type: "lod".to_string(),
            id: context.to_string(),
        })
    }
}

impl<T, E> LodErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn lod_context(self, context: &str) -> LodResult<T> {
        self.map_err(|e| EngineError::ProcessingFailed(format!("{}: {}", context, e)))
    }
}

/// Non-fatal preprocessing conditions
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessingError {
    #[error("Simplification of '{mesh}' stalled at level {level} ({triangles} triangles)")]
    SimplificationStalled {
        mesh: String,
        level: u32,
        triangles: usize,
    },

    #[error("Simplification of '{mesh}' collapsed to nothing at level {level}")]
    SimplificationEmpty { mesh: String, level: u32 },

    #[error("Simplifier failed for '{mesh}' at level {level}: {reason}")]
    SimplifierFailed {
        mesh: String,
        level: u32,
        reason: String,
    },

    #[error("Node {node} of mesh {mesh_index} at level {level} has no children")]
    ChildlessNode {
        node: u32,
        mesh_index: u32,
        level: u32,
    },
}

/// Errors gathered while building a scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingReport {
    pub errors: Vec<ProcessingError>,
}

pub fn record_processing_error(report: &mut ProcessingReport, error: ProcessingError) {
    log::debug!("[record_processing_error] {}", error);
    report.errors.push(error);
}

/// Log every collected error once, then clear the report
///
/// Returns how many errors were reported.
pub fn report_processing_errors(report: &mut ProcessingReport) -> usize {
    let count = report.errors.len();
    if count == 0 {
        return 0;
    }

    log::warn!(
        "[report_processing_errors] {} processing errors during preprocessing:",
        count
    );
    for error in report.errors.drain(..) {
        log::warn!("[report_processing_errors]   {}", error);
    }

    count
}
