//! Concurrent DAG traversal
//!
//! Roots go on the task channel, workers evaluate nodes and push children
//! back onto it, and the caller blocks until nothing is in flight.
//! Idle -> Scheduled -> Expanding -> Drained -> Idle.

use super::traversal_data::{
    CameraSnapshot, NodeDecision, SelectionParams, TraversalCounters, TraversalFrame,
    TraversalOutcome, TraversalPhase, TraversalScheduler, TraversalTask,
};
use super::traversal_operations::{enforce_cut, evaluate_node};
use crate::error::{EngineError, EngineResult, OptionExt};
use crate::lod::{dag_node, LodDag, NodeRef};
use crate::thread_pool::{
    create_worker_pool, restart_worker_pool, submit_task, submit_to_pool, wait_idle,
    SchedulerConfig, TaskHandler, TaskQueue,
};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

pub fn create_traversal_scheduler(config: &SchedulerConfig) -> EngineResult<TraversalScheduler> {
    let handler: TaskHandler<TraversalTask> = Arc::new(process_traversal_task);
    Ok(TraversalScheduler {
        pool: create_worker_pool(config, handler)?,
        phase: TraversalPhase::Idle,
        traversals: 0,
    })
}

/// Run one full traversal and return the cut it selected
///
/// The worker pool is stopped, joined, and respawned before the roots go
/// out. The call returns only after every task has finished.
pub fn run_traversal(
    scheduler: &mut TraversalScheduler,
    dag: &Arc<LodDag>,
    camera: CameraSnapshot,
    params: SelectionParams,
) -> EngineResult<TraversalOutcome> {
    let started = Instant::now();
    restart_worker_pool(&mut scheduler.pool)?;

    let frame = Arc::new(TraversalFrame {
        dag: Arc::clone(dag),
        camera,
        params,
        visited: Mutex::new(FxHashSet::default()),
        selected: Mutex::new(Vec::new()),
        counters: TraversalCounters::default(),
    });

    scheduler.phase = TraversalPhase::Scheduled;
    for &root in &dag.roots {
        let Some(node) = dag_node(dag, root) else {
            continue;
        };
        frame.visited.lock().insert(node.id);
        submit_to_pool(
            &scheduler.pool,
            TraversalTask {
                node_ref: root,
                frame: Arc::clone(&frame),
            },
        )?;
    }

    scheduler.phase = TraversalPhase::Expanding;
    wait_idle(&scheduler.pool);
    scheduler.phase = TraversalPhase::Drained;

    let raw_selection = std::mem::take(&mut *frame.selected.lock());
    let visited = frame.visited.lock().len();
    let (selected, shadowed) = enforce_cut(dag, &raw_selection);

    scheduler.traversals += 1;
    scheduler.phase = TraversalPhase::Idle;

    let outcome = TraversalOutcome {
        selected,
        visited,
        evaluated: frame.counters.evaluated.load(Ordering::Relaxed),
        culled: frame.counters.culled.load(Ordering::Relaxed),
        too_small: frame.counters.too_small.load(Ordering::Relaxed),
        expanded: frame.counters.expanded.load(Ordering::Relaxed),
        shadowed,
        elapsed: started.elapsed(),
    };

    log::debug!(
        "[run_traversal] #{}: {} visited, {} culled, {} selected ({} shadowed) in {:?}",
        scheduler.traversals,
        outcome.visited,
        outcome.culled,
        outcome.selected.len(),
        outcome.shadowed,
        outcome.elapsed
    );

    Ok(outcome)
}

/// Worker body: evaluate one node, then select it or fan out to children
fn process_traversal_task(task: TraversalTask, queue: &TaskQueue<TraversalTask>) {
    let frame = &task.frame;
    let Some(node) = dag_node(&frame.dag, task.node_ref) else {
        log::warn!("[process_traversal_task] Dangling node ref {:?}", task.node_ref);
        return;
    };
    frame.counters.evaluated.fetch_add(1, Ordering::Relaxed);

    match evaluate_node(node, &frame.camera, &frame.params) {
        NodeDecision::Culled => {
            frame.counters.culled.fetch_add(1, Ordering::Relaxed);
        }
        NodeDecision::TooSmall => {
            frame.counters.too_small.fetch_add(1, Ordering::Relaxed);
        }
        NodeDecision::Select => {
            frame.selected.lock().push(task.node_ref);
        }
        NodeDecision::Expand => {
            frame.counters.expanded.fetch_add(1, Ordering::Relaxed);
            for (&id, &child) in &node.children {
                // First worker to claim a child submits it
                let fresh = frame.visited.lock().insert(id);
                if !fresh {
                    continue;
                }

                let result = submit_task(
                    queue,
                    TraversalTask {
                        node_ref: child,
                        frame: Arc::clone(frame),
                    },
                );
                if let Err(e) = result {
                    log::error!("[process_traversal_task] {}", e);
                }
            }
        }
    }
}

/// Traversal that never touches the pool; used where threads are unwanted
pub fn run_traversal_inline(
    dag: &LodDag,
    camera: &CameraSnapshot,
    params: &SelectionParams,
) -> EngineResult<Vec<NodeRef>> {
    let mut visited: FxHashSet<u32> = FxHashSet::default();
    let mut stack: Vec<NodeRef> = Vec::new();
    let mut selected = Vec::new();

    for &root in &dag.roots {
        let node = dag_node(dag, root).ok_or_engine(|| EngineError::ResourceNotFound {
            resource_type: "dag root".to_string(),
            id: format!("{:?}", root),
        })?;
        if visited.insert(node.id) {
            stack.push(root);
        }
    }

    while let Some(node_ref) = stack.pop() {
        let Some(node) = dag_node(dag, node_ref) else {
            continue;
        };
        match evaluate_node(node, camera, params) {
            NodeDecision::Select => selected.push(node_ref),
            NodeDecision::Expand => {
                for (&id, &child) in &node.children {
                    if visited.insert(id) {
                        stack.push(child);
                    }
                }
            }
            NodeDecision::Culled | NodeDecision::TooSmall => {}
        }
    }

    Ok(enforce_cut(dag, &selected).0)
}
