//! LOD DAG operations - Pure DOP functions
//!
//! A parent at level L links to every node of the same mesh at level L-1
//! whose bounding box overlaps its own. Edges only ever descend one level.

use super::dag_data::{DagNode, LodDag, NodeRef};
use super::error::ProcessingError;
use crate::bounds::aabb_intersects;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

// ============================================================================
// CONSTRUCTION
// ============================================================================

/// Link per-level nodes into a DAG
///
/// Ids are reassigned in level order and any existing links are replaced.
pub fn build_dag(mut levels: Vec<Vec<DagNode>>, mesh_max_lod: Vec<u32>) -> LodDag {
    let _span = tracing::info_span!("build_dag", levels = levels.len()).entered();

    let mut id_index = Vec::new();
    for (level, nodes) in levels.iter_mut().enumerate() {
        for (index, node) in nodes.iter_mut().enumerate() {
            node.id = id_index.len() as u32;
            node.lod = level as u32;
            node.children.clear();
            node.parents.clear();
            id_index.push(NodeRef {
                level: level as u32,
                index: index as u32,
            });
        }
    }

    for level in (1..levels.len()).rev() {
        let (lower, upper) = levels.split_at_mut(level);
        let children = &lower[level - 1];
        upper[0].par_iter_mut().for_each(|parent| {
            for (index, child) in children.iter().enumerate() {
                if child.mesh_index == parent.mesh_index
                    && aabb_intersects(&parent.bounds, &child.bounds)
                {
                    parent.children.insert(
                        child.id,
                        NodeRef {
                            level: (level - 1) as u32,
                            index: index as u32,
                        },
                    );
                }
            }
        });
    }

    // Reverse index
    let mut links = Vec::new();
    for (level, nodes) in levels.iter().enumerate() {
        for (index, node) in nodes.iter().enumerate() {
            let parent = NodeRef {
                level: level as u32,
                index: index as u32,
            };
            links.extend(node.children.values().map(|&child| (child, parent)));
        }
    }
    let edge_count = links.len();
    for (child, parent) in links {
        levels[child.level as usize][child.index as usize]
            .parents
            .push(parent);
    }

    let mut roots = Vec::new();
    for (level, nodes) in levels.iter().enumerate().rev() {
        for (index, node) in nodes.iter().enumerate() {
            if mesh_max_lod.get(node.mesh_index as usize) == Some(&(level as u32)) {
                roots.push(NodeRef {
                    level: level as u32,
                    index: index as u32,
                });
            }
        }
    }

    log::info!(
        "[build_dag] {} nodes over {} levels, {} edges, {} roots",
        id_index.len(),
        levels.len(),
        edge_count,
        roots.len()
    );

    LodDag {
        levels,
        roots,
        id_index,
        mesh_max_lod,
    }
}

// ============================================================================
// QUERIES
// ============================================================================

pub fn dag_node(dag: &LodDag, node_ref: NodeRef) -> Option<&DagNode> {
    dag.levels
        .get(node_ref.level as usize)?
        .get(node_ref.index as usize)
}

pub fn dag_node_by_id(dag: &LodDag, id: u32) -> Option<&DagNode> {
    let node_ref = *dag.id_index.get(id as usize)?;
    dag_node(dag, node_ref)
}

pub fn dag_node_count(dag: &LodDag) -> usize {
    dag.id_index.len()
}

pub fn dag_edge_count(dag: &LodDag) -> usize {
    dag.levels
        .iter()
        .flatten()
        .map(|node| node.children.len())
        .sum()
}

/// Leaves have no children; every level-0 node is a leaf
pub fn is_leaf(node: &DagNode) -> bool {
    node.children.is_empty()
}

/// Nodes of one mesh at one level, in meshlet order
pub fn level_nodes(dag: &LodDag, mesh_index: u32, lod: u32) -> Vec<NodeRef> {
    dag.levels
        .get(lod as usize)
        .map(|nodes| {
            nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| node.mesh_index == mesh_index)
                .map(|(index, _)| NodeRef {
                    level: lod,
                    index: index as u32,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Does any ancestor of `node_ref` appear in `ids`
pub fn has_ancestor_in(dag: &LodDag, node_ref: NodeRef, ids: &FxHashSet<u32>) -> bool {
    let mut seen: FxHashSet<NodeRef> = FxHashSet::default();
    let mut queue: VecDeque<NodeRef> = VecDeque::new();
    if let Some(node) = dag_node(dag, node_ref) {
        queue.extend(node.parents.iter().copied());
    }

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current) {
            continue;
        }
        let Some(node) = dag_node(dag, current) else {
            continue;
        };
        if ids.contains(&node.id) {
            return true;
        }
        queue.extend(node.parents.iter().copied());
    }

    false
}

/// Ids of every node reachable below `node_ref`
pub fn collect_descendants(dag: &LodDag, node_ref: NodeRef) -> FxHashSet<u32> {
    let mut found = FxHashSet::default();
    let mut stack = Vec::new();
    if let Some(node) = dag_node(dag, node_ref) {
        stack.extend(node.children.values().copied());
    }

    while let Some(current) = stack.pop() {
        let Some(node) = dag_node(dag, current) else {
            continue;
        };
        if found.insert(node.id) {
            stack.extend(node.children.values().copied());
        }
    }

    found
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Non-leaf-level nodes that ended up without children
pub fn validate_dag(dag: &LodDag) -> Vec<ProcessingError> {
    dag.levels
        .iter()
        .skip(1)
        .flatten()
        .filter(|node| is_leaf(node))
        .map(|node| ProcessingError::ChildlessNode {
            node: node.id,
            mesh_index: node.mesh_index,
            level: node.lod,
        })
        .collect()
}

/// Every edge descends exactly one level and lands on the node it names
///
/// Level-descending edges rule out cycles.
pub fn is_acyclic(dag: &LodDag) -> bool {
    dag.levels.iter().enumerate().all(|(level, nodes)| {
        nodes.iter().all(|node| {
            node.children.iter().all(|(&child_id, &child_ref)| {
                child_ref.level + 1 == level as u32
                    && dag_node(dag, child_ref).map(|child| child.id) == Some(child_id)
            })
        })
    })
}
