//! Graph indexing and evaluation order for a single project level.
//!
//! The project's node/edge lists are loaded into a petgraph `DiGraph` whose
//! node weights point back into `Project::nodes` and whose edge weights carry
//! the resolved handles. Notes never enter the graph. Edges that cannot carry
//! power (dangling ids, a load driving something, an unknown handle) are kept
//! aside as [`RejectedEdge`]s so the engine can report them.

use std::collections::{BTreeMap, HashMap, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::{Edge, Node, NodeId, NodeKind, Project};

/// Output handle of every node with a single output
pub const DEFAULT_OUTPUT: &str = "out";
/// Input handle of every node with a single input
pub const DEFAULT_INPUT: &str = "in";

/// Resolved connection stored on each graph edge
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLink {
    /// Position in `Project::edges`
    pub edge: usize,
    pub from_handle: String,
    pub to_handle: String,
}

/// Why an edge was left out of the graph
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    MissingNode(NodeId),
    Note(NodeId),
    NoOutput(NodeId),
    NoInput(NodeId),
    NoConverterOutputs(NodeId),
    UnknownOutput { node: NodeId, handle: String },
    NoPorts(NodeId),
    UnknownPort { node: NodeId, handle: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingNode(id) => write!(f, "edge references missing node '{id}'"),
            RejectReason::Note(id) => write!(f, "edge touches note '{id}'"),
            RejectReason::NoOutput(id) => write!(f, "node '{id}' has no output handle"),
            RejectReason::NoInput(id) => write!(f, "node '{id}' has no input handle"),
            RejectReason::NoConverterOutputs(id) => {
                write!(f, "converter '{id}' declares no outputs")
            }
            RejectReason::UnknownOutput { node, handle } => {
                write!(f, "converter '{node}' has no output '{handle}'")
            }
            RejectReason::NoPorts(id) => write!(f, "subsystem '{id}' has no input ports"),
            RejectReason::UnknownPort { node, handle } => {
                write!(f, "subsystem '{node}' has no input port '{handle}'")
            }
        }
    }
}

/// An edge excluded from evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEdge {
    /// Position in `Project::edges`
    pub edge: usize,
    pub reason: RejectReason,
}

/// Safe evaluation order for one project level
#[derive(Debug, Clone, Default)]
pub struct EvaluationOrder {
    /// Sources first, loads last
    pub order: Vec<NodeIndex>,
    /// Nodes on a cycle or downstream of one
    pub blocked: Vec<NodeIndex>,
    /// Strongly connected components that form cycles
    pub cycles: Vec<Vec<NodeIndex>>,
}

impl EvaluationOrder {
    pub fn has_cycle(&self) -> bool {
        !self.blocked.is_empty()
    }
}

type HandleMap = BTreeMap<String, Vec<EdgeIndex>>;

/// Lookup structures over one project level.
#[derive(Debug)]
pub struct GraphIndex<'p> {
    project: &'p Project,
    pub graph: DiGraph<usize, EdgeLink>,
    by_id: HashMap<&'p NodeId, NodeIndex>,
    incoming: Vec<HandleMap>,
    outgoing: Vec<HandleMap>,
    rejected: Vec<RejectedEdge>,
    duplicates: Vec<NodeId>,
}

impl<'p> GraphIndex<'p> {
    pub fn build(project: &'p Project) -> Self {
        let mut graph = DiGraph::with_capacity(project.nodes.len(), project.edges.len());
        let mut by_id: HashMap<&NodeId, NodeIndex> = HashMap::with_capacity(project.nodes.len());
        let mut duplicates = Vec::new();

        for (i, node) in project.nodes.iter().enumerate() {
            if matches!(node.kind, NodeKind::Note(_)) {
                continue;
            }
            if by_id.contains_key(&node.id) {
                duplicates.push(node.id.clone());
                continue;
            }
            let ix = graph.add_node(i);
            by_id.insert(&node.id, ix);
        }

        let mut incoming = vec![HandleMap::new(); graph.node_count()];
        let mut outgoing = vec![HandleMap::new(); graph.node_count()];
        let mut rejected = Vec::new();

        for (i, edge) in project.edges.iter().enumerate() {
            match resolve_link(project, &graph, &by_id, edge) {
                Ok((from, to, from_handle, to_handle)) => {
                    let ix = graph.add_edge(
                        from,
                        to,
                        EdgeLink {
                            edge: i,
                            from_handle: from_handle.clone(),
                            to_handle: to_handle.clone(),
                        },
                    );
                    outgoing[from.index()].entry(from_handle).or_default().push(ix);
                    incoming[to.index()].entry(to_handle).or_default().push(ix);
                }
                Err(reason) => rejected.push(RejectedEdge { edge: i, reason }),
            }
        }

        Self {
            project,
            graph,
            by_id,
            incoming,
            outgoing,
            rejected,
            duplicates,
        }
    }

    pub fn project(&self) -> &'p Project {
        self.project
    }

    pub fn node(&self, ix: NodeIndex) -> &'p Node {
        &self.project.nodes[self.graph[ix]]
    }

    pub fn edge(&self, ix: EdgeIndex) -> &'p Edge {
        &self.project.edges[self.graph[ix].edge]
    }

    pub fn link(&self, ix: EdgeIndex) -> &EdgeLink {
        &self.graph[ix]
    }

    /// Source node of an indexed edge
    pub fn source(&self, ix: EdgeIndex) -> NodeIndex {
        // Indexed edges always have both endpoints.
        self.graph
            .edge_endpoints(ix)
            .map(|(from, _)| from)
            .unwrap_or_else(|| NodeIndex::new(0))
    }

    /// Target node of an indexed edge
    pub fn target(&self, ix: EdgeIndex) -> NodeIndex {
        self.graph
            .edge_endpoints(ix)
            .map(|(_, to)| to)
            .unwrap_or_else(|| NodeIndex::new(0))
    }

    pub fn index_of(&self, id: &NodeId) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    /// Graph nodes in project order
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Incoming edges grouped by target handle
    pub fn incoming(&self, ix: NodeIndex) -> &HandleMap {
        &self.incoming[ix.index()]
    }

    pub fn incoming_at(&self, ix: NodeIndex, handle: &str) -> &[EdgeIndex] {
        self.incoming[ix.index()]
            .get(handle)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Outgoing edges grouped by source handle
    pub fn outgoing(&self, ix: NodeIndex) -> &HandleMap {
        &self.outgoing[ix.index()]
    }

    pub fn outgoing_at(&self, ix: NodeIndex, handle: &str) -> &[EdgeIndex] {
        self.outgoing[ix.index()]
            .get(handle)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rejected(&self) -> &[RejectedEdge] {
        &self.rejected
    }

    /// Node ids declared more than once (only the first is evaluated)
    pub fn duplicates(&self) -> &[NodeId] {
        &self.duplicates
    }

    /// Topological order via Kahn's algorithm, seeded in project order so the
    /// result is deterministic. Whatever Kahn cannot schedule sits on a cycle
    /// or downstream of one.
    pub fn evaluation_order(&self) -> EvaluationOrder {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.edges_directed(n, Direction::Incoming).count())
            .collect();

        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(node) = queue.pop_front() {
            order.push(node);
            let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
                .graph
                .edges_directed(node, Direction::Outgoing)
                .map(|e| (e.id(), e.target()))
                .collect();
            edges.sort_by_key(|(e, _)| e.index());
            for (_, target) in edges {
                let deg = &mut in_degree[target.index()];
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(target);
                }
            }
        }

        if order.len() == self.graph.node_count() {
            return EvaluationOrder {
                order,
                ..EvaluationOrder::default()
            };
        }

        let blocked: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] > 0)
            .collect();
        let cycles = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();

        EvaluationOrder {
            order,
            blocked,
            cycles,
        }
    }
}

/// Resolve an edge endpoint to the graph node indexed under `id`, which may
/// sit after a note sharing the same id.
fn lookup<'a>(
    project: &'a Project,
    graph: &DiGraph<usize, EdgeLink>,
    by_id: &HashMap<&NodeId, NodeIndex>,
    id: &NodeId,
) -> Result<(NodeIndex, &'a Node), RejectReason> {
    match by_id.get(id) {
        Some(&ix) => Ok((ix, &project.nodes[graph[ix]])),
        None if project.node(id).is_some() => Err(RejectReason::Note(id.clone())),
        None => Err(RejectReason::MissingNode(id.clone())),
    }
}

fn resolve_link(
    project: &Project,
    graph: &DiGraph<usize, EdgeLink>,
    by_id: &HashMap<&NodeId, NodeIndex>,
    edge: &Edge,
) -> Result<(NodeIndex, NodeIndex, String, String), RejectReason> {
    let (from, source) = lookup(project, graph, by_id, &edge.from)?;
    let (to, target) = lookup(project, graph, by_id, &edge.to)?;

    let from_handle = match &source.kind {
        NodeKind::DualOutputConverter(dual) => {
            let first = dual
                .outputs
                .first()
                .ok_or_else(|| RejectReason::NoConverterOutputs(source.id.clone()))?;
            match &edge.from_handle {
                Some(handle) if dual.output(handle).is_some() => handle.clone(),
                Some(handle) => {
                    return Err(RejectReason::UnknownOutput {
                        node: source.id.clone(),
                        handle: handle.clone(),
                    })
                }
                None => first.id.clone(),
            }
        }
        kind if kind.has_output() => DEFAULT_OUTPUT.to_string(),
        _ => return Err(RejectReason::NoOutput(source.id.clone())),
    };

    let to_handle = match &target.kind {
        NodeKind::Subsystem(sub) => {
            let ports = sub.ports();
            let (first, _) = ports
                .first()
                .ok_or_else(|| RejectReason::NoPorts(target.id.clone()))?;
            match &edge.to_handle {
                Some(handle) if ports.iter().any(|(id, _)| id.as_str() == handle) => {
                    handle.clone()
                }
                Some(handle) => {
                    return Err(RejectReason::UnknownPort {
                        node: target.id.clone(),
                        handle: handle.clone(),
                    })
                }
                None => first.as_str().to_string(),
            }
        }
        kind if kind.has_input() => DEFAULT_INPUT.to_string(),
        _ => return Err(RejectReason::NoInput(target.id.clone())),
    };

    Ok((from, to, from_handle, to_handle))
}
