//! # pdn-core: Power-Distribution Tree Evaluation
//!
//! Turns a power-distribution graph (sources, converters, buses, loads and
//! recursively nested subsystems joined by resistive interconnects) into
//! per-node and per-edge electrical quantities plus diagnostics.
//!
//! ## Design Philosophy
//!
//! A [`Project`] is an immutable snapshot produced by the editor. Evaluation
//! is a pure function of that snapshot:
//!
//! - **Forward pass**: voltages flow from sources toward loads.
//! - **Backward pass**: demanded current/power flows from loads back to
//!   sources, through efficiency models and interconnect losses.
//! - **Recursion**: a [`NodeKind::Subsystem`] owns a nested project that is
//!   evaluated in isolation, with voltages injected at its input ports, and
//!   scaled by its parallel count.
//!
//! Electrically questionable input never fails the call; it is reported in
//! [`Diagnostics`] next to a best-effort result.
//!
//! ## Quick Start
//!
//! ```rust
//! use pdn_core::*;
//!
//! let mut project = Project::new();
//! project.add_node(Node::new("vin", NodeKind::Source(Source { vout: Volts(12.0) })));
//! project.add_node(Node::new(
//!     "buck",
//!     NodeKind::Converter(Converter {
//!         vin_min: Volts(9.0),
//!         vin_max: Volts(14.0),
//!         vout: Volts(5.0),
//!         iout_max: Amperes(3.0),
//!         efficiency: EfficiencyModel::fixed(0.9),
//!         phase_count: 1,
//!     }),
//! ));
//! project.add_node(Node::new("mcu", NodeKind::Load(Load::new(Volts(5.0), Amperes(2.0), Amperes(2.0)))));
//! project.add_edge(Edge::new("e1", "vin", "buck"));
//! project.add_edge(Edge::new("e2", "buck", "mcu"));
//!
//! let result = compute(&project);
//! let buck = &result.nodes[&NodeId::new("buck")];
//! assert!((buck.p_in - 10.0 / 0.9).abs() < 1e-9);
//! assert!(result.global_warnings.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`efficiency`] - Efficiency models and the standalone resolver
//! - [`graph_utils`] - Graph indexing and evaluation order
//! - [`engine`] - Voltage/demand passes, interconnect loss, subsystem recursion
//! - [`aggregate`] - Roll-ups across all nesting levels
//! - [`diagnostics`] - Warning collection
//! - [`units`] - Unit newtypes for the input model

use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod config;
pub mod diagnostics;
pub mod efficiency;
pub mod engine;
pub mod error;
pub mod graph_utils;
pub mod units;

pub use aggregate::{
    compute_deep_aggregates, compute_deep_aggregates_with_config, deep_aggregate, DeepAggregates,
};
pub use config::EngineConfig;
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use efficiency::{
    resolve_efficiency, resolve_efficiency_with, CurvePoint, EfficiencyModel, EfficiencyTable,
    OperatingPoint, Resolution, DEFAULT_EFFICIENCY,
};
pub use engine::{
    compute, compute_with_config, BranchResult, ComputeResult, EdgeResult, NodeResult, Totals,
};
pub use error::{EfficiencyError, PdnError, PdnResult};
pub use graph_utils::GraphIndex;
pub use units::{Amperes, CurrentUnit, DisplayUnits, Milliohms, PowerUnit, Volts, Watts};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl NodeId {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        NodeId(value.into())
    }
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EdgeId {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        EdgeId(value.into())
    }
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for EdgeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId::new(value)
    }
}

impl From<&str> for EdgeId {
    fn from(value: &str) -> Self {
        EdgeId::new(value)
    }
}

fn one() -> u32 {
    1
}

/// Operating condition selecting which load current applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scenario {
    #[default]
    Typical,
    Max,
    Idle,
}

impl std::str::FromStr for Scenario {
    type Err = PdnError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "typical" | "typ" => Ok(Scenario::Typical),
            "max" => Ok(Scenario::Max),
            "idle" => Ok(Scenario::Idle),
            other => Err(PdnError::Parse(format!(
                "unknown scenario '{other}'; supported values: typical, max, idle"
            ))),
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Scenario::Typical => "Typical",
            Scenario::Max => "Max",
            Scenario::Idle => "Idle",
        };
        f.write_str(name)
    }
}

/// Derating applied to component limits
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    /// Percentage of `Iout_max` held back as headroom (0 = use the full rating)
    pub current_pct: f64,
}

impl Margins {
    /// Usable fraction of a current rating
    pub fn current_derating(&self) -> f64 {
        (1.0 - self.current_pct / 100.0).clamp(0.0, 1.0)
    }
}

// Basic component structs

/// Fixed-voltage supply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub vout: Volts,
}

/// Single-input, single-output regulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Converter {
    pub vin_min: Volts,
    pub vin_max: Volts,
    pub vout: Volts,
    /// Output current rating; 0 disables the capacity check
    #[serde(default)]
    pub iout_max: Amperes,
    pub efficiency: EfficiencyModel,
    #[serde(default = "one")]
    pub phase_count: u32,
}

/// One regulated output of a [`DualOutputConverter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterOutput {
    /// Output handle id
    pub id: String,
    pub vout: Volts,
    #[serde(default)]
    pub iout_max: Amperes,
    pub efficiency: EfficiencyModel,
}

/// Single input feeding several independently regulated outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualOutputConverter {
    pub vin_min: Volts,
    pub vin_max: Volts,
    pub outputs: Vec<ConverterOutput>,
}

impl DualOutputConverter {
    pub fn output(&self, id: &str) -> Option<&ConverterOutput> {
        self.outputs.iter().find(|o| o.id == id)
    }
}

/// Terminal consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub vreq: Volts,
    pub i_typ: Amperes,
    pub i_max: Amperes,
    /// Idle draw; absent means the load is off when idle
    #[serde(default)]
    pub i_idle: Option<Amperes>,
    #[serde(default = "one")]
    pub num_paralleled_devices: u32,
    #[serde(default)]
    pub critical: bool,
}

impl Load {
    pub fn new(vreq: Volts, i_typ: Amperes, i_max: Amperes) -> Self {
        Self {
            vreq,
            i_typ,
            i_max,
            i_idle: None,
            num_paralleled_devices: 1,
            critical: false,
        }
    }

    pub fn with_devices(mut self, count: u32) -> Self {
        self.num_paralleled_devices = count;
        self
    }

    pub fn with_idle(mut self, i_idle: Amperes) -> Self {
        self.i_idle = Some(i_idle);
        self
    }

    pub fn as_critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Current of a single device under the given scenario
    pub fn device_current(&self, scenario: Scenario) -> Amperes {
        match scenario {
            Scenario::Typical => self.i_typ,
            Scenario::Max => self.i_max,
            Scenario::Idle => self.i_idle.unwrap_or(Amperes::ZERO),
        }
    }
}

/// Zero-conversion aggregation point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub v_bus: Volts,
    /// Bus bar resistance, charged to the edges feeding the bus
    #[serde(default)]
    pub r_milliohm: Milliohms,
}

/// Box wrapping an independently evaluated nested project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsystem {
    pub project: Project,
    #[serde(default = "one")]
    pub num_paralleled_systems: u32,
    #[serde(default)]
    pub input_handle_order: Vec<NodeId>,
}

impl Subsystem {
    /// Input ports as `(SubsystemInput id, declared voltage)`, in handle order.
    ///
    /// Ids listed in `input_handle_order` come first (unknown ids are
    /// ignored), then any remaining ports in node-list order.
    pub fn ports(&self) -> Vec<(&NodeId, Volts)> {
        let declared: Vec<(&NodeId, Volts)> = self
            .project
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::SubsystemInput(port) => Some((&n.id, port.vout)),
                _ => None,
            })
            .collect();

        let mut ordered = Vec::with_capacity(declared.len());
        for id in &self.input_handle_order {
            if let Some(port) = declared.iter().find(|(pid, _)| *pid == id) {
                if !ordered.iter().any(|(pid, _): &(&NodeId, Volts)| *pid == id) {
                    ordered.push(*port);
                }
            }
        }
        for port in declared {
            if !ordered.iter().any(|(pid, _)| *pid == port.0) {
                ordered.push(port);
            }
        }
        ordered
    }
}

/// Pseudo-source inside a nested project, fed through the parent's port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemInput {
    /// Voltage used when the matching external port is unconnected
    pub vout: Volts,
}

/// Annotation, not part of the power graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub text: String,
}

// Enum to represent the electrical role of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Source(Source),
    Converter(Converter),
    DualOutputConverter(DualOutputConverter),
    Load(Load),
    Bus(Bus),
    Subsystem(Subsystem),
    SubsystemInput(SubsystemInput),
    Note(Note),
}

impl NodeKind {
    /// Short type name used in reports
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Source(_) => "Source",
            NodeKind::Converter(_) => "Converter",
            NodeKind::DualOutputConverter(_) => "DualOutputConverter",
            NodeKind::Load(_) => "Load",
            NodeKind::Bus(_) => "Bus",
            NodeKind::Subsystem(_) => "Subsystem",
            NodeKind::SubsystemInput(_) => "SubsystemInput",
            NodeKind::Note(_) => "Note",
        }
    }

    /// Whether edges may leave this node
    pub fn has_output(&self) -> bool {
        match self {
            NodeKind::Source(_)
            | NodeKind::Converter(_)
            | NodeKind::DualOutputConverter(_)
            | NodeKind::Bus(_)
            | NodeKind::Subsystem(_)
            | NodeKind::SubsystemInput(_) => true,
            NodeKind::Load(_) | NodeKind::Note(_) => false,
        }
    }

    /// Whether edges may end at this node
    pub fn has_input(&self) -> bool {
        match self {
            NodeKind::Converter(_)
            | NodeKind::DualOutputConverter(_)
            | NodeKind::Load(_)
            | NodeKind::Bus(_)
            | NodeKind::Subsystem(_) => true,
            NodeKind::Source(_) | NodeKind::SubsystemInput(_) | NodeKind::Note(_) => false,
        }
    }
}

/// A block on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id: NodeId(id),
            kind,
        }
    }
}

/// Physical wiring of an edge
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Interconnect {
    pub r_milliohm: Milliohms,
}

/// Directed connection carrying current from `from`'s output to `to`'s input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub from_handle: Option<String>,
    #[serde(default)]
    pub to_handle: Option<String>,
    #[serde(default)]
    pub interconnect: Interconnect,
}

impl Edge {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: EdgeId(id.into()),
            from: NodeId(from.into()),
            to: NodeId(to.into()),
            from_handle: None,
            to_handle: None,
            interconnect: Interconnect::default(),
        }
    }

    pub fn with_resistance(mut self, r: Milliohms) -> Self {
        self.interconnect.r_milliohm = r;
        self
    }

    pub fn from_handle(mut self, handle: impl Into<String>) -> Self {
        self.from_handle = Some(handle.into());
        self
    }

    pub fn to_handle(mut self, handle: impl Into<String>) -> Self {
        self.to_handle = Some(handle.into());
        self
    }
}

/// Editor snapshot handed to the engine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub current_scenario: Scenario,
    pub scenarios: Vec<Scenario>,
    pub units: DisplayUnits,
    pub default_margins: Margins,
}

impl Project {
    pub fn new() -> Self {
        Self {
            scenarios: vec![Scenario::Typical, Scenario::Max, Scenario::Idle],
            ..Self::default()
        }
    }

    /// Parse a snapshot, rejecting anything that is not a project object.
    pub fn from_json_str(input: &str) -> PdnResult<Self> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        if !value.is_object() {
            return Err(PdnError::Parse("project snapshot must be a JSON object".into()));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_edge(&mut self, edge: Edge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.current_scenario = scenario;
        self
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Statistics about the project's composition
    pub fn stats(&self) -> ProjectStats {
        let mut stats = ProjectStats::default();

        for node in &self.nodes {
            match &node.kind {
                NodeKind::Source(_) | NodeKind::SubsystemInput(_) => stats.num_sources += 1,
                NodeKind::Converter(_) => stats.num_converters += 1,
                NodeKind::DualOutputConverter(_) => stats.num_converters += 1,
                NodeKind::Load(_) => stats.num_loads += 1,
                NodeKind::Bus(_) => stats.num_buses += 1,
                NodeKind::Subsystem(sub) => {
                    stats.num_subsystems += 1;
                    let nested = sub.project.stats();
                    stats.max_depth = stats.max_depth.max(nested.max_depth + 1);
                }
                NodeKind::Note(_) => stats.num_notes += 1,
            }
        }

        stats.num_edges = self.edges.len();
        stats
    }
}

/// Statistics about a project's composition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectStats {
    pub num_sources: usize,
    pub num_converters: usize,
    pub num_loads: usize,
    pub num_buses: usize,
    pub num_subsystems: usize,
    pub num_notes: usize,
    pub num_edges: usize,
    /// Deepest subsystem nesting below this project
    pub max_depth: usize,
}

impl std::fmt::Display for ProjectStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sources, {} converters, {} loads, {} buses, {} subsystems (depth {}), {} edges",
            self.num_sources,
            self.num_converters,
            self.num_loads,
            self.num_buses,
            self.num_subsystems,
            self.max_depth,
            self.num_edges
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port_project(ids: &[&str]) -> Project {
        let mut project = Project::new();
        for id in ids {
            project.add_node(Node::new(
                *id,
                NodeKind::SubsystemInput(SubsystemInput { vout: Volts(5.0) }),
            ));
        }
        project
    }

    #[test]
    fn test_load_device_current_by_scenario() {
        let load = Load::new(Volts(5.0), Amperes(1.0), Amperes(3.0));
        assert_eq!(load.device_current(Scenario::Typical), Amperes(1.0));
        assert_eq!(load.device_current(Scenario::Max), Amperes(3.0));
        assert_eq!(load.device_current(Scenario::Idle), Amperes(0.0));

        let load = load.with_idle(Amperes(0.1));
        assert_eq!(load.device_current(Scenario::Idle), Amperes(0.1));
    }

    #[test]
    fn test_subsystem_port_order() {
        let sub = Subsystem {
            project: port_project(&["a", "b", "c"]),
            num_paralleled_systems: 1,
            input_handle_order: vec![NodeId::new("c"), NodeId::new("ghost"), NodeId::new("a")],
        };
        let order: Vec<&str> = sub.ports().iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_scenario_from_str() {
        assert_eq!("MAX".parse::<Scenario>().unwrap(), Scenario::Max);
        assert!("peak".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_margins_derating() {
        assert_eq!(Margins::default().current_derating(), 1.0);
        let m = Margins { current_pct: 20.0 };
        assert!((m.current_derating() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_project_json_roundtrip_shape() {
        let json = r#"{
            "nodes": [
                { "id": "vin", "type": "Source", "vout": 12.0 },
                { "id": "bus", "type": "Bus", "v_bus": 12.0 },
                { "id": "n1", "type": "Note", "text": "hello" },
                { "id": "led", "type": "Load", "vreq": 12.0, "i_typ": 0.2, "i_max": 0.3, "critical": true }
            ],
            "edges": [
                { "id": "e1", "from": "vin", "to": "bus", "interconnect": { "r_milliohm": 5.0 } },
                { "id": "e2", "from": "bus", "to": "led" }
            ],
            "current_scenario": "Max"
        }"#;
        let project = Project::from_json_str(json).unwrap();
        assert_eq!(project.nodes.len(), 4);
        assert_eq!(project.current_scenario, Scenario::Max);
        assert_eq!(project.edges[0].interconnect.r_milliohm, Milliohms(5.0));
        match &project.nodes[3].kind {
            NodeKind::Load(load) => {
                assert!(load.critical);
                assert_eq!(load.num_paralleled_devices, 1);
            }
            other => panic!("expected load, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_non_object_snapshot_is_rejected() {
        assert!(matches!(
            Project::from_json_str("42"),
            Err(PdnError::Parse(_))
        ));
    }

    #[test]
    fn test_project_stats_depth() {
        let mut inner = port_project(&["p"]);
        inner.add_node(Node::new(
            "ld",
            NodeKind::Load(Load::new(Volts(5.0), Amperes(1.0), Amperes(1.0))),
        ));
        let mut outer = Project::new();
        outer.add_node(Node::new(
            "sub",
            NodeKind::Subsystem(Subsystem {
                project: inner,
                num_paralleled_systems: 2,
                input_handle_order: Vec::new(),
            }),
        ));
        let stats = outer.stats();
        assert_eq!(stats.num_subsystems, 1);
        assert_eq!(stats.max_depth, 1);
    }
}
