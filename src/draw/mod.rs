//! Draw Module - coalescing selected meshlets into draw batches

pub mod draw_batch_data;
pub mod draw_batch_operations;

pub use draw_batch_data::{BatchPool, CoalesceStats, DrawBatch, DrawConfig};

// Re-export DOP operations
pub use draw_batch_operations::{
    coalesce_selection, create_batch_pool, pool_remaining, push_batch, reset_batch_pool,
    validate_draw_config,
};
