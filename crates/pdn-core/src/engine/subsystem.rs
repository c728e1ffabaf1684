//! Subsystem recursion.
//!
//! The nested project is evaluated on its own, seeing only the voltages
//! resolved at the parent's ports and the parent's scenario. Its per-port
//! demand becomes the subsystem's per-instance input (`p_in_single`) and is
//! multiplied by `num_paralleled_systems`. The subsystem's output handle
//! passes the first port's voltage straight through; demand drawn from it is
//! added once, unscaled, to the first port.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;
use tracing::{debug, warn};

use crate::diagnostics::categories;
use crate::graph_utils::DEFAULT_OUTPUT;
use crate::{NodeId, Subsystem};

use super::interconnect::Demand;
use super::{evaluate, Evaluation};

impl Evaluation<'_, '_> {
    pub(crate) fn subsystem_demand(
        &mut self,
        ix: NodeIndex,
        sub: &Subsystem,
    ) -> Vec<(String, Demand)> {
        let node = self.index.node(ix);
        let nested_depth = self.depth + 1;

        if nested_depth > self.config.max_subsystem_depth {
            let message = format!(
                "Subsystem nesting exceeds maximum depth of {}",
                self.config.max_subsystem_depth
            );
            warn!(subsystem = %node.id, depth = nested_depth, "{message}");
            self.warnings
                .fatal(categories::SCALE, &message, Some(node.id.as_str()));
            self.nodes[ix.index()].warnings.push(message);
            return Vec::new();
        }

        let copies = self.multiplier(ix, "num_paralleled_systems", sub.num_paralleled_systems);
        let voltages = self.nodes[ix.index()]
            .port_voltages
            .clone()
            .unwrap_or_default();
        let injected: BTreeMap<NodeId, f64> = voltages
            .iter()
            .map(|(port, v)| (NodeId::new(port.clone()), *v))
            .collect();

        debug!(subsystem = %node.id, depth = nested_depth, copies, "evaluating nested project");
        let nested = evaluate(
            &sub.project,
            self.scenario,
            &injected,
            nested_depth,
            self.config,
        );

        let ports = sub.ports();
        let per_port: Vec<(String, Demand)> = ports
            .iter()
            .map(|(port, _)| {
                let demand = nested
                    .node(port.as_str())
                    .map(|r| Demand::new(r.p_in, r.i_in))
                    .unwrap_or_default();
                (port.to_string(), demand)
            })
            .collect();
        let single: Demand = per_port
            .iter()
            .fold(Demand::default(), |acc, (_, d)| acc + *d);

        let (pass, edge_loss) = self.output_demand(ix, DEFAULT_OUTPUT);
        let scale = copies as f64;

        let mut inputs: Vec<(String, Demand)> = per_port
            .into_iter()
            .map(|(port, demand)| (port, demand.scaled(scale)))
            .collect();
        if let Some((_, first)) = inputs.first_mut() {
            *first += pass;
        }

        if !nested.global_warnings.is_empty() {
            self.warnings.nested(&node.id, &nested.global_warnings);
            self.nodes[ix.index()].warnings.push(format!(
                "nested project reported {}",
                nested.global_warnings.summary()
            ));
        }

        let result = &mut self.nodes[ix.index()];
        result.p_in_single = Some(single.power);
        result.p_in = single.power * scale + pass.power;
        result.i_in = single.current * scale + pass.current;
        result.p_out = pass.power;
        result.i_out = pass.current;
        result.loss = Some(nested.totals.total_loss * scale);
        result.edge_loss = edge_loss;
        result.port_voltages = Some(voltages);
        result.subsystem = Some(Box::new(nested));

        inputs
    }
}
