//! Forward pass: voltages from sources toward loads, with input
//! compatibility checks on every edge.
//!
//! Regulated outputs (converters, buses) always present their declared
//! voltage; upstream sag is not modelled. Instead each consumer checks the
//! voltage it receives against what it accepts.

use std::collections::BTreeMap;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::diagnostics::categories;
use crate::graph_utils::DEFAULT_INPUT;
use crate::{NodeKind, Volts};

use super::Evaluation;

impl Evaluation<'_, '_> {
    pub(crate) fn propagate_voltages(&mut self, order: &[NodeIndex]) {
        for &ix in order {
            let node = self.index.node(ix);
            match &node.kind {
                NodeKind::Source(source) => {
                    self.nodes[ix.index()].v_upstream = Some(source.vout.value());
                }
                NodeKind::SubsystemInput(port) => {
                    let v = self
                        .injected
                        .get(&node.id)
                        .copied()
                        .unwrap_or(port.vout.value());
                    self.nodes[ix.index()].v_upstream = Some(v);
                }
                NodeKind::Subsystem(sub) => {
                    let mut ports = BTreeMap::new();
                    let mut first = None;
                    for (port, declared) in sub.ports() {
                        // An unconnected port falls back to the voltage
                        // declared inside the nested project.
                        let v = self
                            .input_voltage(ix, port.as_str())
                            .unwrap_or(declared.value());
                        first.get_or_insert(v);
                        ports.insert(port.to_string(), v);
                    }
                    let result = &mut self.nodes[ix.index()];
                    result.v_upstream = first;
                    result.port_voltages = Some(ports);
                }
                NodeKind::Note(_) => {}
                _ => {
                    let v = self.input_voltage(ix, DEFAULT_INPUT);
                    self.nodes[ix.index()].v_upstream = v;
                }
            }
            self.check_compatibility(ix);
        }
    }

    /// Voltage on one input handle: the first resolvable feeding edge wins.
    fn input_voltage(&mut self, ix: NodeIndex, handle: &str) -> Option<f64> {
        let feeds = self.index.incoming_at(ix, handle).to_vec();
        let tolerance = self.config.voltage_tolerance;

        let mut chosen: Option<f64> = None;
        let mut disagree = false;
        for e in feeds {
            let link = self.index.link(e);
            let v = self.output_voltage(self.index.source(e), &link.from_handle);
            self.edges[link.edge].voltage = v;

            match (chosen, v) {
                (None, Some(v)) => chosen = Some(v),
                (Some(first), Some(v)) if (first - v).abs() > tolerance => disagree = true,
                _ => {}
            }
        }

        if let (true, Some(first)) = (disagree, chosen) {
            self.warn_node(
                ix,
                categories::COMPATIBILITY,
                format!("multiple input voltages disagree; using {first:.3} V"),
            );
        }
        chosen
    }

    /// Voltage a node presents on one of its output handles
    fn output_voltage(&self, ix: NodeIndex, handle: &str) -> Option<f64> {
        match &self.index.node(ix).kind {
            NodeKind::Source(source) => Some(source.vout.value()),
            NodeKind::Converter(conv) => Some(conv.vout.value()),
            NodeKind::DualOutputConverter(dual) => dual.output(handle).map(|o| o.vout.value()),
            NodeKind::Bus(bus) => Some(bus.v_bus.value()),
            // Ports resolve in this pass; the subsystem output mirrors its
            // first port.
            NodeKind::SubsystemInput(_) | NodeKind::Subsystem(_) => {
                self.nodes[ix.index()].v_upstream
            }
            NodeKind::Load(_) | NodeKind::Note(_) => None,
        }
    }

    fn check_compatibility(&mut self, ix: NodeIndex) {
        let node = self.index.node(ix);
        let tolerance = self.config.voltage_tolerance;
        let feeds: Vec<(String, EdgeIndex)> = self
            .index
            .incoming(ix)
            .iter()
            .flat_map(|(handle, edges)| edges.iter().map(move |&e| (handle.clone(), e)))
            .collect();

        for (handle, e) in feeds {
            let edge_ix = self.index.link(e).edge;
            let Some(v) = self.edges[edge_ix].voltage else {
                continue;
            };

            let finding = match &node.kind {
                NodeKind::Converter(conv) => range_violation(v, conv.vin_min, conv.vin_max, tolerance),
                NodeKind::DualOutputConverter(dual) => {
                    range_violation(v, dual.vin_min, dual.vin_max, tolerance)
                }
                NodeKind::Load(load) => mismatch(v, load.vreq, tolerance),
                NodeKind::Subsystem(sub) => sub
                    .ports()
                    .into_iter()
                    .find(|(port, _)| port.as_str() == handle)
                    .and_then(|(_, declared)| mismatch(v, declared, tolerance)),
                _ => None,
            };

            if let Some(message) = finding {
                let edge = self.index.edge(e);
                self.warnings.link(
                    &edge.id,
                    &mut self.edges[edge_ix],
                    &mut self.nodes[ix.index()],
                    categories::COMPATIBILITY,
                    message,
                );
            }
        }
    }
}

fn range_violation(v: f64, vin_min: Volts, vin_max: Volts, tolerance: f64) -> Option<String> {
    if v < vin_min.value() - tolerance || v > vin_max.value() + tolerance {
        Some(format!(
            "Converter Vin Range Violation: {v:.3} V outside [{:.3}, {:.3}] V",
            vin_min.value(),
            vin_max.value()
        ))
    } else {
        None
    }
}

fn mismatch(v: f64, required: Volts, tolerance: f64) -> Option<String> {
    if (v - required.value()).abs() > tolerance {
        Some(format!(
            "Vin != Vout: {v:.3} V supplied, {:.3} V required",
            required.value()
        ))
    } else {
        None
    }
}
