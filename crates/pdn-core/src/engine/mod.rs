//! Power-flow evaluation of a project tree.
//!
//! One call runs, per project level:
//!
//! 1. [`GraphIndex`] build and topological order (cycles are reported, never
//!    looped on)
//! 2. the voltage pass, sources first ([`voltage`])
//! 3. the demand pass, loads first ([`demand`]), which charges interconnect
//!    loss to the feeding node ([`interconnect`]) and recurses into
//!    subsystems ([`subsystem`])
//!
//! Nothing here returns an error: questionable input produces warnings next
//! to a best-effort result.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::diagnostics::{categories, Diagnostics};
use crate::graph_utils::{EvaluationOrder, GraphIndex};
use crate::{EdgeId, Margins, NodeId, NodeKind, Project, Scenario};

mod demand;
mod interconnect;
mod subsystem;
mod voltage;
mod warnings;

use warnings::WarningCollector;

/// Evaluate a project with the default [`EngineConfig`].
pub fn compute(project: &Project) -> ComputeResult {
    compute_with_config(project, &EngineConfig::default())
}

/// Evaluate a project under its `current_scenario`.
pub fn compute_with_config(project: &Project, config: &EngineConfig) -> ComputeResult {
    debug!(
        nodes = project.nodes.len(),
        edges = project.edges.len(),
        scenario = %project.current_scenario,
        "computing power tree"
    );
    evaluate(
        project,
        project.current_scenario,
        &BTreeMap::new(),
        0,
        config,
    )
}

/// Evaluate one project level.
///
/// `injected` maps `SubsystemInput` ids to the voltage supplied by the
/// enclosing project; `depth` is the nesting level of `project`.
pub(crate) fn evaluate(
    project: &Project,
    scenario: Scenario,
    injected: &BTreeMap<NodeId, f64>,
    depth: usize,
    config: &EngineConfig,
) -> ComputeResult {
    let mut eval = Evaluation::new(project, scenario, injected, depth, config);
    eval.report_structure();

    let order = eval.index.evaluation_order();
    debug!(depth, evaluated = order.order.len(), "evaluation order resolved");
    if order.has_cycle() {
        eval.report_cycles(&order);
    }

    eval.propagate_voltages(&order.order);
    eval.aggregate_demand(&order.order);
    eval.finish()
}

/// Per-branch figures of a dual-output converter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchResult {
    pub v_out: f64,
    pub p_out: f64,
    pub i_out: f64,
    pub p_in: f64,
    pub i_in: f64,
    pub loss: f64,
    pub eta: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Electrical figures of one node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeResult {
    /// Voltage arriving at the input (a source's own output voltage)
    pub v_upstream: Option<f64>,
    pub p_in: f64,
    /// Power delivered through the output, including outgoing edge loss.
    /// For a subsystem this is the pass-through output handle only; nested
    /// load power lives in `subsystem`.
    pub p_out: f64,
    pub i_in: f64,
    /// Current through the output, on the same terms as `p_out`
    pub i_out: f64,
    /// Per-instance input power before the parallel multiplier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_in_single: Option<f64>,
    /// Conversion loss
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<f64>,
    /// Interconnect loss on the outgoing edges. A bus with no feeding edge
    /// also keeps its own bar loss here.
    pub edge_loss: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_results: Option<BTreeMap<String, BranchResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_voltages: Option<BTreeMap<String, f64>>,
    /// Result of a subsystem's nested project, per instance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<Box<ComputeResult>>,
}

/// Electrical figures of one edge
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EdgeResult {
    pub voltage: Option<f64>,
    pub current: f64,
    /// Power drawn from the upstream node, loss included
    pub power: f64,
    pub loss: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Project-wide sums, nested subsystems included
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub source_power: f64,
    pub load_power: f64,
    pub converter_loss: f64,
    pub edge_loss: f64,
    pub total_loss: f64,
    /// `load_power / source_power`, when anything is sourced
    pub efficiency: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComputeResult {
    pub nodes: BTreeMap<NodeId, NodeResult>,
    pub edges: BTreeMap<EdgeId, EdgeResult>,
    pub totals: Totals,
    pub global_warnings: Diagnostics,
}

impl ComputeResult {
    pub fn node(&self, id: &str) -> Option<&NodeResult> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeResult> {
        self.edges.get(id)
    }

    /// Whether part of the result is a sentinel (cycle, runaway nesting)
    pub fn has_fatal(&self) -> bool {
        self.global_warnings.has_errors()
    }
}

/// Working state of one project level
pub(crate) struct Evaluation<'p, 'c> {
    pub(crate) index: GraphIndex<'p>,
    pub(crate) config: &'c EngineConfig,
    pub(crate) scenario: Scenario,
    pub(crate) margins: Margins,
    pub(crate) depth: usize,
    pub(crate) injected: &'c BTreeMap<NodeId, f64>,
    /// Indexed by graph node
    pub(crate) nodes: Vec<NodeResult>,
    /// Indexed by position in `Project::edges`
    pub(crate) edges: Vec<EdgeResult>,
    pub(crate) warnings: WarningCollector,
}

impl<'p, 'c> Evaluation<'p, 'c> {
    fn new(
        project: &'p Project,
        scenario: Scenario,
        injected: &'c BTreeMap<NodeId, f64>,
        depth: usize,
        config: &'c EngineConfig,
    ) -> Self {
        let index = GraphIndex::build(project);
        let nodes = vec![NodeResult::default(); index.graph.node_count()];
        Self {
            index,
            config,
            scenario,
            margins: project.default_margins,
            depth,
            injected,
            nodes,
            edges: vec![EdgeResult::default(); project.edges.len()],
            warnings: WarningCollector::new(),
        }
    }

    pub(crate) fn warn_node(&mut self, ix: NodeIndex, category: &str, message: String) {
        let id = &self.index.node(ix).id;
        self.warnings
            .node(id, &mut self.nodes[ix.index()], category, message);
    }

    fn report_structure(&mut self) {
        let project = self.index.project();
        for rejected in self.index.rejected() {
            let edge = &project.edges[rejected.edge];
            self.warnings.edge(
                &edge.id,
                &mut self.edges[rejected.edge],
                categories::STRUCTURE,
                format!("edge ignored: {}", rejected.reason),
            );
        }
        for id in self.index.duplicates() {
            self.warnings.global(
                categories::STRUCTURE,
                &format!("duplicate node id '{id}'; only the first is evaluated"),
            );
        }
    }

    fn report_cycles(&mut self, order: &EvaluationOrder) {
        for cycle in &order.cycles {
            let members: Vec<&str> = cycle
                .iter()
                .map(|&n| self.index.node(n).id.as_str())
                .collect();
            let message = format!("Cycle detected: {}", members.join(" -> "));
            warn!(depth = self.depth, "{message}");
            self.warnings.fatal(categories::STRUCTURE, &message, None);
        }
        for &ix in &order.blocked {
            self.warn_node(
                ix,
                categories::STRUCTURE,
                "not evaluated: on or downstream of a cycle".to_string(),
            );
        }
    }

    fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for ix in self.index.node_indices() {
            let result = &self.nodes[ix.index()];
            match &self.index.node(ix).kind {
                NodeKind::Source(_) | NodeKind::SubsystemInput(_) => {
                    totals.source_power += result.p_out;
                }
                NodeKind::Load(_) => totals.load_power += result.p_out,
                NodeKind::Converter(_) | NodeKind::DualOutputConverter(_) => {
                    totals.converter_loss += result.loss.unwrap_or(0.0);
                }
                NodeKind::Subsystem(sub) => {
                    if let Some(nested) = &result.subsystem {
                        let copies = sub.num_paralleled_systems.max(1) as f64;
                        // Ports are already paid for by the feeding edges;
                        // only sources local to the nested project add up.
                        let through_ports: f64 = sub
                            .ports()
                            .iter()
                            .filter_map(|(port, _)| nested.node(port.as_str()))
                            .map(|port| port.p_out)
                            .sum();
                        totals.source_power +=
                            copies * (nested.totals.source_power - through_ports);
                        totals.load_power += copies * nested.totals.load_power;
                        totals.converter_loss += copies * nested.totals.converter_loss;
                        totals.edge_loss += copies * nested.totals.edge_loss;
                    }
                }
                NodeKind::Bus(_) | NodeKind::Note(_) => {}
            }
        }
        totals.edge_loss += self.edges.iter().map(|e| e.loss).sum::<f64>();
        totals.total_loss = totals.converter_loss + totals.edge_loss;
        if totals.source_power > 0.0 {
            totals.efficiency = Some(totals.load_power / totals.source_power);
        }
        totals
    }

    fn finish(self) -> ComputeResult {
        let totals = self.totals();
        let project = self.index.project();
        let mut warnings = self.warnings;

        let mut nodes = BTreeMap::new();
        for (ix, result) in self.index.node_indices().zip(self.nodes) {
            nodes.insert(self.index.node(ix).id.clone(), result);
        }

        let mut edges = BTreeMap::new();
        for (edge, result) in project.edges.iter().zip(self.edges) {
            if edges.insert(edge.id.clone(), result).is_some() {
                warnings.global(
                    categories::STRUCTURE,
                    &format!("duplicate edge id '{}'; only the last is reported", edge.id),
                );
            }
        }

        ComputeResult {
            nodes,
            edges,
            totals,
            global_warnings: warnings.finish(),
        }
    }
}
