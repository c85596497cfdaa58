//! Worker pool operations - Pure DOP functions
//!
//! Lifecycle: create (stopped) -> spawn -> submit / wait_idle -> stop_and_join.
//! A stopped pool can be respawned; each respawn gets a fresh channel.

use super::thread_pool_data::{
    PoolCounters, SchedulerConfig, TaskHandler, TaskQueue, ThreadPoolStats, WorkerMessage,
    WorkerPoolData,
};
use crate::error::{invalid_config, EngineError, EngineResult};
use crossbeam_channel::Receiver;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

// ============================================================================
// CONFIGURATION
// ============================================================================

pub fn validate_scheduler_config(config: &SchedulerConfig) -> EngineResult<()> {
    if config.worker_cap == 0 {
        return Err(invalid_config(
            "scheduler.worker_cap",
            config.worker_cap,
            "must be at least 1",
        ));
    }

    if config.thread_name_prefix.is_empty() {
        return Err(invalid_config(
            "scheduler.thread_name_prefix",
            "\"\"",
            "must not be empty",
        ));
    }

    Ok(())
}

/// min(hardware concurrency, cap), never zero
pub fn pool_size(config: &SchedulerConfig) -> usize {
    num_cpus::get().min(config.worker_cap).max(1)
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Build a stopped pool
pub fn create_worker_pool<T: Send + 'static>(
    config: &SchedulerConfig,
    handler: TaskHandler<T>,
) -> EngineResult<WorkerPoolData<T>> {
    validate_scheduler_config(config)?;
    let worker_count = pool_size(config);

    log::debug!(
        "[create_worker_pool] {} workers (cap {}, {} cpus)",
        worker_count,
        config.worker_cap,
        num_cpus::get()
    );

    Ok(WorkerPoolData {
        config: config.clone(),
        worker_count,
        handler,
        queue: None,
        workers: Vec::with_capacity(worker_count),
        counters: Arc::new(PoolCounters::default()),
        generation: 0,
    })
}

/// Start the worker threads; no-op if already running
pub fn spawn_workers<T: Send + 'static>(pool: &mut WorkerPoolData<T>) -> EngineResult<()> {
    if pool.queue.is_some() {
        return Ok(());
    }

    let (sender, receiver) = crossbeam_channel::unbounded();
    let queue = TaskQueue {
        sender,
        counters: Arc::clone(&pool.counters),
    };
    pool.generation += 1;

    for worker_index in 0..pool.worker_count {
        let receiver = receiver.clone();
        let queue = queue.clone();
        let handler = Arc::clone(&pool.handler);
        let name = format!(
            "{}-{}-{}",
            pool.config.thread_name_prefix, pool.generation, worker_index
        );

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(receiver, queue, handler))
            .map_err(|error| EngineError::IoError {
                path: name,
                error: error.to_string(),
            })?;
        pool.workers.push(handle);
    }

    pool.queue = Some(queue);
    log::trace!(
        "[spawn_workers] Generation {} running {} workers",
        pool.generation,
        pool.workers.len()
    );
    Ok(())
}

/// Decrements `in_flight` even if the handler unwinds
struct InFlightGuard<'a> {
    counters: &'a PoolCounters,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        let mut in_flight = self.counters.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.counters.idle.notify_all();
        }
    }
}

fn worker_loop<T>(
    receiver: Receiver<WorkerMessage<T>>,
    queue: TaskQueue<T>,
    handler: TaskHandler<T>,
) {
    while let Ok(message) = receiver.recv() {
        match message {
            WorkerMessage::Task(task) => {
                let _guard = InFlightGuard {
                    counters: &queue.counters,
                };
                handler(task, &queue);
            }
            WorkerMessage::Shutdown => break,
        }
    }
}

/// Enqueue one task
pub fn submit_task<T>(queue: &TaskQueue<T>, task: T) -> EngineResult<()> {
    // Count before sending so wait_idle cannot observe zero early
    *queue.counters.in_flight.lock() += 1;
    queue.counters.submitted.fetch_add(1, Ordering::Relaxed);

    if queue.sender.send(WorkerMessage::Task(task)).is_err() {
        let mut in_flight = queue.counters.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            queue.counters.idle.notify_all();
        }
        return Err(EngineError::ChannelClosed {
            name: "worker task queue".to_string(),
        });
    }

    Ok(())
}

/// Submit through a pool handle; fails if the pool is stopped
pub fn submit_to_pool<T: Send + 'static>(
    pool: &WorkerPoolData<T>,
    task: T,
) -> EngineResult<()> {
    match &pool.queue {
        Some(queue) => submit_task(queue, task),
        None => Err(EngineError::ChannelClosed {
            name: "worker task queue (pool stopped)".to_string(),
        }),
    }
}

/// Block until every submitted task, including follow-ups, has finished
pub fn wait_idle<T: Send + 'static>(pool: &WorkerPoolData<T>) {
    let mut in_flight = pool.counters.in_flight.lock();
    while *in_flight > 0 {
        pool.counters.idle.wait(&mut in_flight);
    }
}

/// Drain, stop, and join every worker
pub fn stop_and_join<T: Send + 'static>(pool: &mut WorkerPoolData<T>) -> EngineResult<()> {
    let Some(queue) = pool.queue.take() else {
        return Ok(());
    };

    wait_idle(pool);
    for _ in 0..pool.workers.len() {
        // Receivers only disappear once a worker has already exited
        let _ = queue.sender.send(WorkerMessage::Shutdown);
    }
    drop(queue);

    let mut failed = 0usize;
    for handle in pool.workers.drain(..) {
        if handle.join().is_err() {
            failed += 1;
        }
    }

    if failed > 0 {
        log::error!("[stop_and_join] {} workers panicked", failed);
        return Err(EngineError::TaskJoinError {
            task: format!("{} of {} workers", failed, pool.worker_count),
        });
    }

    Ok(())
}

/// Stop (if running) and spawn a fresh set of workers
pub fn restart_worker_pool<T: Send + 'static>(pool: &mut WorkerPoolData<T>) -> EngineResult<()> {
    stop_and_join(pool)?;
    spawn_workers(pool)
}

pub fn pool_stats<T: Send + 'static>(pool: &WorkerPoolData<T>) -> ThreadPoolStats {
    ThreadPoolStats {
        worker_count: pool.worker_count,
        running: pool.queue.is_some(),
        tasks_submitted: pool.counters.submitted.load(Ordering::Relaxed),
        tasks_completed: pool.counters.completed.load(Ordering::Relaxed),
        in_flight: *pool.counters.in_flight.lock(),
        generation: pool.generation,
    }
}

impl<T: Send + 'static> Drop for WorkerPoolData<T> {
    fn drop(&mut self) {
        if let Err(e) = stop_and_join(self) {
            log::warn!("[WorkerPoolData::drop] {}", e);
        }
    }
}
