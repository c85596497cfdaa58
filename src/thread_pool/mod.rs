//! Thread Pool Module - fixed worker set fed by an explicit task channel

pub mod thread_pool_data;
pub mod thread_pool_operations;

pub use thread_pool_data::{
    PoolCounters, SchedulerConfig, TaskHandler, TaskQueue, ThreadPoolStats, WorkerMessage,
    WorkerPoolData,
};

// Re-export DOP operations
pub use thread_pool_operations::{
    create_worker_pool, pool_size, pool_stats, restart_worker_pool, spawn_workers,
    stop_and_join, submit_task, submit_to_pool, validate_scheduler_config, wait_idle,
};
