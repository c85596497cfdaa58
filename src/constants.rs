//! Shared constants for clustering, packing, and LOD selection

/// Meshlet size limits
pub mod meshlet {
    /// Default unique vertices per meshlet
    pub const MAX_VERTICES: u32 = 64;

    /// Default primitives per meshlet
    pub const MAX_PRIMITIVES: u32 = 126;

    /// Local vertex indices are stored as u8
    pub const MAX_VERTICES_LIMIT: u32 = 256;

    /// Primitive counts are stored as u8
    pub const MAX_PRIMITIVES_LIMIT: u32 = 255;

    /// Post-transform cache entries assumed by index reordering
    pub const VERTEX_CACHE_SIZE: u32 = 16;
}

/// Packed geometry layout
pub mod packing {
    /// Vertex index sub-ranges start on multiples of this many entries
    pub const VERTEX_ALIGNMENT: u32 = 16;

    /// Primitive index sub-ranges start on multiples of this many bytes
    pub const PRIMITIVE_ALIGNMENT: u32 = 32;

    /// Width of the descriptor begin fields, in alignment units
    pub const OFFSET_FIELD_BITS: u32 = 20;
}

/// Cull metadata quantization
pub mod culling {
    /// Bits per axis of the bounding box grid
    pub const GRID_BITS: u32 = 8;

    /// Largest grid coordinate
    pub const GRID_LAST: i32 = (1 << GRID_BITS) - 1;

    /// Signed 8-bit quantization scale for cone data
    pub const CONE_SCALE: f32 = 127.0;

    /// Cone angle stored for meshlets that cannot be backface culled
    pub const CONE_NOT_CULLABLE: i8 = 127;
}

/// LOD chain and selection
pub mod lod {
    /// Default number of simplified levels above level 0
    pub const MAX_LOD: u32 = 10;

    /// Fraction of the previous triangle count each simplification targets
    pub const REDUCTION_RATIO: f32 = 0.55;

    /// Default per-level distance thresholds
    pub const DEFAULT_THRESHOLDS: [f32; 11] =
        [0.5, 1.5, 2.0, 3.0, 4.0, 5.0, 8.0, 10.0, 15.0, 18.0, 20.0];

    /// Growth applied when thresholds must be extended past the table
    pub const THRESHOLD_EXTENSION_FACTOR: f32 = 1.25;

    /// Minimum projected size, in pixels, worth traversing
    pub const PIXEL_THRESHOLD: f32 = 0.005;

    /// Projected error, in pixels, below which a node is drawn as is
    pub const SSE_THRESHOLD: f32 = 0.75;

    /// Locked LOD value meaning "traverse the DAG"
    pub const UNLOCKED: i32 = -1;

    /// Seconds of traversal delay per unit of camera speed
    pub const DEBOUNCE_SCALE: f32 = 0.01;
}

/// Selection camera defaults
pub mod camera {
    pub const FOV_DEGREES: f32 = 45.0;
    pub const NEAR_PLANE: f32 = 0.01;
    pub const FAR_PLANE: f32 = 10_000.0;
    pub const RESOLUTION_X: u32 = 1280;
    pub const RESOLUTION_Y: u32 = 720;
}

/// Traversal worker pool
pub mod scheduler {
    /// Upper bound on traversal workers
    pub const WORKER_CAP: usize = 12;

    pub const THREAD_NAME_PREFIX: &str = "lod-traversal";
}

/// Draw submission
pub mod draw {
    /// Pre-allocated draw batch slots per frame
    pub const BATCH_POOL_CAPACITY: usize = 4096;
}
