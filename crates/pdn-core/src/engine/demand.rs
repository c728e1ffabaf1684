//! Backward pass: demand from loads back to sources.
//!
//! Nodes are visited in reverse topological order, so by the time a node is
//! reached every edge leaving it already carries its consumer's demand plus
//! interconnect loss. The node sums that into `p_out`, converts it to input
//! demand, and hands the input demand to its feeding edges.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;
use tracing::trace;

use crate::diagnostics::categories;
use crate::efficiency::{resolve_or, EfficiencyModel, OperatingPoint};
use crate::graph_utils::{DEFAULT_INPUT, DEFAULT_OUTPUT};
use crate::units::{Amperes, Volts, Watts};
use crate::{Bus, Converter, DualOutputConverter, Load, NodeKind};

use super::interconnect::Demand;
use super::{BranchResult, Evaluation};

/// Outcome of one conversion stage
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Stage {
    pub(crate) eta: f64,
    pub(crate) p_in: f64,
    pub(crate) loss: f64,
    pub(crate) warnings: Vec<String>,
}

impl Evaluation<'_, '_> {
    pub(crate) fn aggregate_demand(&mut self, order: &[NodeIndex]) {
        for &ix in order.iter().rev() {
            let node = self.index.node(ix);
            let inputs = match &node.kind {
                NodeKind::Load(load) => self.load_demand(ix, load),
                NodeKind::Converter(conv) => self.converter_demand(ix, conv),
                NodeKind::DualOutputConverter(dual) => self.dual_output_demand(ix, dual),
                NodeKind::Bus(bus) => self.bus_demand(ix, bus),
                NodeKind::Subsystem(sub) => self.subsystem_demand(ix, sub),
                NodeKind::Source(_) | NodeKind::SubsystemInput(_) => {
                    self.source_supply(ix);
                    Vec::new()
                }
                NodeKind::Note(_) => Vec::new(),
            };

            for (handle, demand) in inputs {
                self.feed_edges(ix, &handle, demand);
            }

            let result = &self.nodes[ix.index()];
            trace!(
                node = %node.id,
                kind = node.kind.type_name(),
                p_in = result.p_in,
                p_out = result.p_out,
                i_out = result.i_out,
                "node evaluated"
            );
        }
    }

    fn load_demand(&mut self, ix: NodeIndex, load: &Load) -> Vec<(String, Demand)> {
        let devices = self.multiplier(ix, "num_paralleled_devices", load.num_paralleled_devices);
        let single = load.device_current(self.scenario);
        let current = single * devices as f64;
        let power = load.vreq * current;

        let result = &mut self.nodes[ix.index()];
        result.i_out = current.value();
        result.i_in = current.value();
        result.p_out = power.value();
        result.p_in = power.value();
        result.p_in_single = Some((load.vreq * single).value());

        vec![(DEFAULT_INPUT.to_string(), Demand::new(power.value(), current.value()))]
    }

    fn converter_demand(&mut self, ix: NodeIndex, conv: &Converter) -> Vec<(String, Demand)> {
        let (out, edge_loss) = self.output_demand(ix, DEFAULT_OUTPUT);
        let op = OperatingPoint::new(out.power, out.current, conv.vout.value())
            .with_phases(conv.phase_count);
        let stage = self.convert(ix, None, &conv.efficiency, &op, conv.iout_max);
        let i_in = self.input_current(ix, stage.p_in);

        let result = &mut self.nodes[ix.index()];
        result.p_out = out.power;
        result.i_out = out.current;
        result.edge_loss = edge_loss;
        result.p_in = stage.p_in;
        result.i_in = i_in;
        result.loss = Some(stage.loss);
        result.eta = Some(stage.eta);

        vec![(DEFAULT_INPUT.to_string(), Demand::new(stage.p_in, i_in))]
    }

    fn dual_output_demand(
        &mut self,
        ix: NodeIndex,
        dual: &DualOutputConverter,
    ) -> Vec<(String, Demand)> {
        let v_in = self.nodes[ix.index()].v_upstream.map(Volts);
        let mut branches = BTreeMap::new();
        let mut out = Demand::default();
        let mut edge_loss = 0.0;
        let mut p_in = 0.0;
        let mut loss = 0.0;

        for output in &dual.outputs {
            let (branch_out, branch_edge_loss) = self.output_demand(ix, &output.id);
            let op = OperatingPoint::new(branch_out.power, branch_out.current, output.vout.value());
            let stage = self.convert(
                ix,
                Some(&output.id),
                &output.efficiency,
                &op,
                output.iout_max,
            );
            let branch_i_in = v_in
                .and_then(|v| Watts(stage.p_in).current_at(v))
                .map_or(0.0, Amperes::value);

            out += branch_out;
            edge_loss += branch_edge_loss;
            p_in += stage.p_in;
            loss += stage.loss;
            branches.insert(
                output.id.clone(),
                BranchResult {
                    v_out: output.vout.value(),
                    p_out: branch_out.power,
                    i_out: branch_out.current,
                    p_in: stage.p_in,
                    i_in: branch_i_in,
                    loss: stage.loss,
                    eta: stage.eta,
                    warnings: stage.warnings,
                },
            );
        }

        let i_in = self.input_current(ix, p_in);
        let result = &mut self.nodes[ix.index()];
        result.p_out = out.power;
        result.i_out = out.current;
        result.edge_loss = edge_loss;
        result.p_in = p_in;
        result.i_in = i_in;
        result.loss = Some(loss);
        if p_in > 0.0 {
            result.eta = Some(out.power / p_in);
        }
        result.branch_results = Some(branches);

        vec![(DEFAULT_INPUT.to_string(), Demand::new(p_in, i_in))]
    }

    fn bus_demand(&mut self, ix: NodeIndex, bus: &Bus) -> Vec<(String, Demand)> {
        let (out, mut edge_loss) = self.output_demand(ix, DEFAULT_OUTPUT);
        let fed = !self.index.incoming_at(ix, DEFAULT_INPUT).is_empty();
        let result = &mut self.nodes[ix.index()];
        let v = result.v_upstream.map_or(bus.v_bus, Volts);
        let i_in = Watts(out.power).current_at(v).map_or(0.0, Amperes::value);

        // The feeding edges carry the bar loss; with none, the bus keeps it.
        if !fed {
            edge_loss += Amperes(i_in).resistive_loss(bus.r_milliohm).value();
        }

        result.p_out = out.power;
        result.i_out = out.current;
        result.edge_loss = edge_loss;
        result.p_in = out.power;
        result.i_in = i_in;

        vec![(DEFAULT_INPUT.to_string(), Demand::new(out.power, i_in))]
    }

    /// Sources and subsystem ports supply whatever their outputs pull.
    fn source_supply(&mut self, ix: NodeIndex) {
        let (out, edge_loss) = self.output_demand(ix, DEFAULT_OUTPUT);
        let result = &mut self.nodes[ix.index()];
        result.p_out = out.power;
        result.p_in = out.power;
        result.i_out = out.current;
        result.i_in = out.current;
        result.edge_loss = edge_loss;
    }

    /// One conversion stage: resolve efficiency, derive input power, check
    /// the output current rating.
    fn convert(
        &mut self,
        ix: NodeIndex,
        branch: Option<&str>,
        model: &EfficiencyModel,
        op: &OperatingPoint,
        iout_max: Amperes,
    ) -> Stage {
        let prefix = branch.map(|id| format!("output {id}: ")).unwrap_or_default();
        let default = self.config.fallback_efficiency();
        let mut stage = Stage::default();
        let mut findings: Vec<(&str, String)> = Vec::new();

        let resolution = resolve_or(model, op, default);
        let eta = resolution.eta;
        if let Some(err) = resolution.fallback {
            findings.push((
                categories::MODEL,
                format!("{prefix}efficiency model unusable ({err}); using {default}"),
            ));
        }

        let limit = iout_max.value() * self.margins.current_derating();
        if iout_max.value() > 0.0 && op.i_out > limit {
            findings.push((
                categories::CAPACITY,
                format!(
                    "{prefix}Iout exceeds Iout_max: {:.3} A drawn, {limit:.3} A allowed",
                    op.i_out
                ),
            ));
        }

        stage.eta = eta;
        stage.p_in = if op.p_out > 0.0 { op.p_out / eta } else { 0.0 };
        stage.loss = stage.p_in - op.p_out;

        for (category, message) in findings {
            if branch.is_some() {
                stage.warnings.push(message.clone());
            }
            self.warn_node(ix, category, message);
        }
        stage
    }

    /// Input current for a given input power at the node's resolved voltage
    fn input_current(&mut self, ix: NodeIndex, p_in: f64) -> f64 {
        if p_in <= 0.0 {
            return 0.0;
        }
        let v_in = self.nodes[ix.index()].v_upstream.map(Volts);
        match v_in.and_then(|v| Watts(p_in).current_at(v)) {
            Some(current) => current.value(),
            None => {
                self.warn_node(
                    ix,
                    categories::STRUCTURE,
                    "no input voltage; input current set to 0".to_string(),
                );
                0.0
            }
        }
    }

    /// Parallel multiplier, with 0 treated as 1
    pub(crate) fn multiplier(&mut self, ix: NodeIndex, field: &str, value: u32) -> u32 {
        if value == 0 {
            self.warn_node(ix, categories::MODEL, format!("{field} is 0; treated as 1"));
            1
        } else {
            value
        }
    }
}
