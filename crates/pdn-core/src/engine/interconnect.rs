//! Interconnect loss: demand arriving at an input handle is shared among the
//! edges feeding it, and each edge dissipates I²R on top of its share.
//!
//! A bus's own bar resistance is charged once, from the bus's total
//! throughput current, and split over the feeding edges like the demand.

use petgraph::graph::NodeIndex;

use crate::units::{Amperes, Milliohms, Watts};
use crate::{Node, NodeKind};

use super::Evaluation;

/// Power and current demanded at an input handle, or carried by an edge
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Demand {
    pub(crate) power: f64,
    pub(crate) current: f64,
}

impl Demand {
    pub(crate) fn new(power: f64, current: f64) -> Self {
        Self { power, current }
    }

    /// Equal share for each of `feeds` parallel edges
    pub(crate) fn split(self, feeds: usize) -> Self {
        if feeds <= 1 {
            return self;
        }
        let n = feeds as f64;
        Self {
            power: self.power / n,
            current: self.current / n,
        }
    }

    pub(crate) fn scaled(self, factor: f64) -> Self {
        Self {
            power: self.power * factor,
            current: self.current * factor,
        }
    }
}

impl std::ops::Add for Demand {
    type Output = Demand;
    fn add(self, rhs: Demand) -> Demand {
        Demand {
            power: self.power + rhs.power,
            current: self.current + rhs.current,
        }
    }
}

impl std::ops::AddAssign for Demand {
    fn add_assign(&mut self, rhs: Demand) {
        self.power += rhs.power;
        self.current += rhs.current;
    }
}

/// What one edge carries once its resistance is accounted for
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EdgeFlow {
    pub(crate) current: Amperes,
    /// Power drawn from the upstream node, loss included
    pub(crate) power: Watts,
    pub(crate) loss: Watts,
}

impl EdgeFlow {
    /// `attached` is loss owed by the target (bus self-loss share) on top of
    /// the edge's own I²R.
    pub(crate) fn carry(share: Demand, resistance: Milliohms, attached: Watts) -> Self {
        let current = Amperes(share.current);
        let loss = current.resistive_loss(resistance) + attached;
        Self {
            current,
            power: Watts(share.power) + loss,
            loss,
        }
    }
}

/// Self-loss of a bus carrying `throughput` amps; zero for anything else.
pub(crate) fn bus_self_loss(target: &Node, throughput: f64) -> Watts {
    match &target.kind {
        NodeKind::Bus(bus) => Amperes(throughput).resistive_loss(bus.r_milliohm),
        _ => Watts::ZERO,
    }
}

impl Evaluation<'_, '_> {
    /// Spread the demand at one input handle over the edges feeding it
    pub(crate) fn feed_edges(&mut self, ix: NodeIndex, handle: &str, demand: Demand) {
        let feeds = self.index.incoming_at(ix, handle).to_vec();
        if feeds.is_empty() {
            return;
        }

        let target = self.index.node(ix);
        let share = demand.split(feeds.len());
        let attached = bus_self_loss(target, demand.current) / feeds.len() as f64;
        for e in feeds {
            let edge = self.index.edge(e);
            let flow = EdgeFlow::carry(share, edge.interconnect.r_milliohm, attached);
            let result = &mut self.edges[self.index.link(e).edge];
            result.current = flow.current.value();
            result.power = flow.power.value();
            result.loss = flow.loss.value();
        }
    }

    /// Demand pulled through one output handle, plus the edge losses in it
    pub(crate) fn output_demand(&self, ix: NodeIndex, handle: &str) -> (Demand, f64) {
        let mut demand = Demand::default();
        let mut loss = 0.0;
        for &e in self.index.outgoing_at(ix, handle) {
            let result = &self.edges[self.index.link(e).edge];
            demand += Demand::new(result.power, result.current);
            loss += result.loss;
        }
        (demand, loss)
    }
}
