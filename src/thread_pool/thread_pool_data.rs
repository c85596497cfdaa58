//! Worker pool data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Tasks are explicit records sent over a channel to a fixed set of workers.

use crate::constants::scheduler::{THREAD_NAME_PREFIX, WORKER_CAP};
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Worker pool sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pool size is min(hardware concurrency, worker_cap)
    pub worker_cap: usize,
    pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_cap: WORKER_CAP,
            thread_name_prefix: THREAD_NAME_PREFIX.to_string(),
        }
    }
}

/// What travels down the task channel
#[derive(Debug)]
pub enum WorkerMessage<T> {
    Task(T),
    Shutdown,
}

/// Shared counters
///
/// `in_flight` counts tasks submitted but not yet finished. It is a
/// mutex-guarded count rather than an atomic so `idle` can be waited on.
#[derive(Debug, Default)]
pub struct PoolCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub in_flight: Mutex<usize>,
    pub idle: Condvar,
}

/// Submission side of a pool; handed to every task so it can enqueue more
#[derive(Debug)]
pub struct TaskQueue<T> {
    pub sender: Sender<WorkerMessage<T>>,
    pub counters: Arc<PoolCounters>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Runs one task; may submit follow-up tasks through the queue
pub type TaskHandler<T> = Arc<dyn Fn(T, &TaskQueue<T>) + Send + Sync>;

/// A fixed set of worker threads draining one channel
pub struct WorkerPoolData<T: Send + 'static> {
    pub config: SchedulerConfig,
    pub worker_count: usize,
    pub handler: TaskHandler<T>,
    /// None while the pool is stopped
    pub queue: Option<TaskQueue<T>>,
    pub workers: Vec<JoinHandle<()>>,
    pub counters: Arc<PoolCounters>,
    /// Bumped on every respawn
    pub generation: u64,
}

/// Snapshot for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadPoolStats {
    pub worker_count: usize,
    pub running: bool,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub in_flight: usize,
    pub generation: u64,
}
