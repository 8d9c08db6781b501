//! Expands the operations reachable from a target into an explicit DAG of
//! nodes, each counting the inputs it still waits on.

use crate::densemap::{self, DenseMap};
use crate::error::{Error, Result};
use crate::graph::{Graph, OpId};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId(u32);
impl densemap::Index for NodeId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}
impl From<usize> for NodeId {
    fn from(u: usize) -> NodeId {
        NodeId(u as u32)
    }
}

#[derive(Debug)]
pub struct Node {
    pub op: OpId,
    /// Number of distinct input nodes, i.e. nodes that must finish first.
    pub pending: usize,
    /// Nodes producing our inputs.
    pub ins: Vec<NodeId>,
    /// Nodes consuming our outputs.
    pub outs: Vec<NodeId>,
}

#[derive(Debug)]
pub struct Plan {
    nodes: DenseMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

/// DFS work items.  Leave marks the end of an operation's subtree, so the
/// set of entered-but-not-left operations is exactly the current path.
enum Visit {
    Enter(OpId),
    Leave(OpId),
}

#[derive(Default)]
struct Builder {
    nodes: DenseMap<NodeId, Node>,
    ids: FxHashMap<OpId, NodeId>,
}

impl Builder {
    fn node(&mut self, op: OpId) -> NodeId {
        if let Some(&id) = self.ids.get(&op) {
            return id;
        }
        let id = self.nodes.push(Node {
            op,
            pending: 0,
            ins: Vec::new(),
            outs: Vec::new(),
        });
        self.ids.insert(op, id);
        id
    }

    /// Records that `node` consumes an output of `input`; linking the same
    /// pair twice is a no-op.
    fn link(&mut self, node: NodeId, input: NodeId) {
        if self.nodes[node].ins.contains(&input) {
            return;
        }
        self.nodes[node].ins.push(input);
        self.nodes[node].pending += 1;
        self.nodes[input].outs.push(node);
    }
}

impl Plan {
    /// Plans the operations needed for `root`.  Fails if they form a cycle.
    pub fn build(graph: &Graph, root: OpId) -> Result<Plan> {
        Plan::build_all(graph, &[root])
    }

    /// Plans the operations needed for all of `roots` as one graph, so that
    /// shared operations are planned (and later run) once.
    pub fn build_all(graph: &Graph, roots: &[OpId]) -> Result<Plan> {
        let mut b = Builder::default();
        for &root in roots {
            b.node(root);
        }

        let mut path: FxHashSet<OpId> = FxHashSet::default();
        let mut done: FxHashSet<OpId> = FxHashSet::default();
        let mut stack: Vec<Visit> = roots.iter().rev().map(|&op| Visit::Enter(op)).collect();
        while let Some(visit) = stack.pop() {
            let op = match visit {
                Visit::Leave(op) => {
                    path.remove(&op);
                    done.insert(op);
                    continue;
                }
                Visit::Enter(op) => op,
            };
            if done.contains(&op) {
                continue;
            }
            path.insert(op);
            stack.push(Visit::Leave(op));

            let node = b.node(op);
            for &input in graph.operation(op).ins() {
                let producer = match graph.target(input).operation {
                    None => continue,
                    Some(producer) => producer,
                };
                if path.contains(&producer) {
                    return Err(Error::CyclicOperations(graph.target(input).name.clone()));
                }
                let input_node = b.node(producer);
                b.link(node, input_node);
                if !done.contains(&producer) {
                    stack.push(Visit::Enter(producer));
                }
            }
        }

        let roots = b
            .nodes
            .all_ids()
            .filter(|&id| b.nodes[id].pending == 0)
            .collect();
        Ok(Plan {
            nodes: b.nodes,
            roots,
        })
    }

    /// Nodes with no inputs to wait for.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.nodes.all_ids()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total count of input edges, which a full run decrements to zero.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.pending).sum()
    }
}
