//! Roll-ups over a finished [`ComputeResult`] tree.
//!
//! Nested subsystem results are stored per instance, so every figure found
//! below a subsystem is multiplied by the product of the
//! `num_paralleled_systems` of all enclosing subsystems.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::engine::{compute_with_config, ComputeResult};
use crate::{NodeId, NodeKind, Project};

/// Load and loss sums across every nesting level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeepAggregates {
    pub critical_load_power: f64,
    pub non_critical_load_power: f64,
    pub edge_loss: f64,
    pub converter_loss: f64,
    /// `critical_load_power + non_critical_load_power`
    pub total_load_power: f64,
}

impl DeepAggregates {
    pub fn total_loss(&self) -> f64 {
        self.edge_loss + self.converter_loss
    }
}

/// Evaluate `project` and roll up the result.
pub fn compute_deep_aggregates(project: &Project) -> DeepAggregates {
    compute_deep_aggregates_with_config(project, &EngineConfig::default())
}

pub fn compute_deep_aggregates_with_config(
    project: &Project,
    config: &EngineConfig,
) -> DeepAggregates {
    let result = compute_with_config(project, config);
    deep_aggregate(project, &result)
}

/// Roll up an already computed result of `project`.
pub fn deep_aggregate(project: &Project, result: &ComputeResult) -> DeepAggregates {
    let mut totals = DeepAggregates::default();
    accumulate(project, result, 1.0, &mut totals);
    totals.total_load_power = totals.critical_load_power + totals.non_critical_load_power;
    totals
}

fn accumulate(project: &Project, result: &ComputeResult, copies: f64, totals: &mut DeepAggregates) {
    let mut seen: HashSet<&NodeId> = HashSet::new();

    for node in &project.nodes {
        if !seen.insert(&node.id) {
            continue;
        }
        let Some(node_result) = result.node(node.id.as_str()) else {
            continue;
        };

        match &node.kind {
            NodeKind::Load(load) if load.critical => {
                totals.critical_load_power += node_result.p_out * copies;
            }
            NodeKind::Load(_) => totals.non_critical_load_power += node_result.p_out * copies,
            NodeKind::Converter(_) | NodeKind::DualOutputConverter(_) => {
                totals.converter_loss += node_result.loss.unwrap_or(0.0) * copies;
            }
            NodeKind::Subsystem(sub) => {
                if let Some(nested) = &node_result.subsystem {
                    let factor = copies * sub.num_paralleled_systems.max(1) as f64;
                    accumulate(&sub.project, nested, factor, totals);
                }
            }
            _ => {}
        }
    }

    totals.edge_loss += result.edges.values().map(|e| e.loss).sum::<f64>() * copies;
}
