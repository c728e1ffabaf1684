//! Dual bookkeeping of warnings: every finding is attached to the node or
//! edge it concerns and also recorded once in the project-wide list.

use crate::diagnostics::Diagnostics;
use crate::{EdgeId, NodeId};

use super::{EdgeResult, NodeResult};

#[derive(Debug, Default)]
pub(crate) struct WarningCollector {
    global: Diagnostics,
}

impl WarningCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn node(
        &mut self,
        id: &NodeId,
        result: &mut NodeResult,
        category: &str,
        message: String,
    ) {
        self.global
            .add_warning_with_entity(category, &message, id.as_str());
        result.warnings.push(message);
    }

    pub(crate) fn edge(
        &mut self,
        id: &EdgeId,
        result: &mut EdgeResult,
        category: &str,
        message: String,
    ) {
        self.global
            .add_warning_with_entity(category, &message, id.as_str());
        result.warnings.push(message);
    }

    /// Attach one finding to an edge and the node it feeds
    pub(crate) fn link(
        &mut self,
        id: &EdgeId,
        edge: &mut EdgeResult,
        node: &mut NodeResult,
        category: &str,
        message: String,
    ) {
        self.global
            .add_warning_with_entity(category, &message, id.as_str());
        node.warnings.push(message.clone());
        edge.warnings.push(message);
    }

    pub(crate) fn global(&mut self, category: &str, message: &str) {
        self.global.add_warning(category, message);
    }

    /// Record a finding that invalidates part of the result
    pub(crate) fn fatal(&mut self, category: &str, message: &str, entity: Option<&str>) {
        match entity {
            Some(entity) => self.global.add_error_with_entity(category, message, entity),
            None => self.global.add_error(category, message),
        }
    }

    /// Lift a nested project's findings, scoped by the subsystem id
    pub(crate) fn nested(&mut self, scope: &NodeId, nested: &Diagnostics) {
        self.global.merge_scoped(scope.as_str(), nested);
    }

    pub(crate) fn finish(self) -> Diagnostics {
        self.global
    }
}
