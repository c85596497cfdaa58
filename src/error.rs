//! Error handling for the meshlet LOD pipeline
//!
//! One error type for every fallible operation. Frame-time paths never
//! return these; they degrade and report through frame statistics instead.

use std::error::Error as StdError;
use std::fmt;

/// Main error type for meshlet-lod
#[derive(Debug)]
pub enum EngineError {
    // Mesh Errors
    InvalidMesh {
        reason: String,
    },
    IndexOutOfRange {
        index: u32,
        vertex_count: usize,
    },

    // Threading Errors
    ChannelClosed {
        name: String,
    },
    TaskJoinError {
        task: String,
    },

    // Configuration Errors
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    // System Errors
    IoError {
        path: String,
        error: String,
    },
    ParseError {
        value: String,
        expected_type: String,
    },
    ResourceNotFound {
        resource_type: String,
        id: String,
    },

    // Processing Errors
    ProcessingFailed(String),

}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidMesh { reason } => write!(f, "Invalid mesh: {}", reason),
            EngineError::IndexOutOfRange {
                index,
                vertex_count,
            } => write!(
                f,
                "Index {} out of range for {} vertices",
                index, vertex_count
            ),

            EngineError::ChannelClosed { name } => write!(f, "Channel closed: {}", name),
            EngineError::TaskJoinError { task } => write!(f, "Task join error: {}", task),

            EngineError::InvalidConfig {
                field,
                value,
                reason,
            } => write!(f, "Invalid config: {} = {} ({})", field, value, reason),

            EngineError::IoError { path, error } => write!(f, "IO error for {}: {}", path, error),
            EngineError::ParseError {
                value,
                expected_type,
            } => write!(
                f,
                "Parse error: '{}' is not a valid {}",
                value, expected_type
            ),
            EngineError::ResourceNotFound { resource_type, id } => {
                write!(f, "Resource not found: {} '{}'", resource_type, id)
            }

            EngineError::ProcessingFailed(msg) => write!(f, "Processing failed: {}", msg),

        }
    }
}

impl StdError for EngineError {}

/// Type alias for Results in meshlet-lod
pub type EngineResult<T> = Result<T, EngineError>;

// Conversion traits for common error types

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::IoError {
            path: String::new(),
            error: error.to_string(),
        }
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for EngineError {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        EngineError::ChannelClosed {
            name: "task_queue".to_string(),
        }
    }
}

impl From<crossbeam_channel::RecvError> for EngineError {
    fn from(_: crossbeam_channel::RecvError) -> Self {
        EngineError::ChannelClosed {
            name: "task_queue".to_string(),
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(error: toml::de::Error) -> Self {
        EngineError::ParseError {
            value: error.message().to_string(),
            expected_type: "toml document".to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::ParseError {
            value: error.to_string(),
            expected_type: "json document".to_string(),
        }
    }
}

// Helper functions for common error patterns

/// Convert Option to Result with context
pub trait OptionExt<T> {
    fn ok_or_engine<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> EngineError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_engine<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> EngineError,
    {
        self.ok_or_else(f)
    }
}

/// Build an `InvalidConfig` error
pub fn invalid_config(field: &str, value: impl fmt::Display, reason: &str) -> EngineError {
    EngineError::InvalidConfig {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::IndexOutOfRange {
            index: 10,
            vertex_count: 5,
        };
        assert_eq!(err.to_string(), "Index 10 out of range for 5 vertices");
    }

    #[test]
    fn test_option_ext() {
        let opt: Option<i32> = None;
        let result = opt.ok_or_engine(|| EngineError::ResourceNotFound {
            resource_type: "dag root".to_string(),
            id: "3".to_string(),
        });
        assert!(matches!(result, Err(EngineError::ResourceNotFound { .. })));
        assert_eq!(Some(4).ok_or_engine(|| unreachable!()).ok(), Some(4));
    }

    #[test]
    fn test_invalid_config_helper() {
        let err = invalid_config("max_vertices", 2, "must be at least 3");
        assert_eq!(
            err.to_string(),
            "Invalid config: max_vertices = 2 (must be at least 3)"
        );
    }
}
