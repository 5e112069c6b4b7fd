use crate::calculations::{EarlyDates, NodeBounds, earliest_successor_start};
use crate::graph::DependencyGraph;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// What set a task's early start in the max-reduction. Ties keep every
/// winner, sorted, so parallel driving chains are all visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Driver {
    ScheduleStart,
    Constraint,
    ActualStart,
    Predecessor(NodeIndex),
}

pub struct ForwardPass<'a> {
    graph: &'a DependencyGraph,
    bounds: &'a [NodeBounds],
    clamp_negative_offsets: bool,
}

impl<'a> ForwardPass<'a> {
    pub fn new(
        graph: &'a DependencyGraph,
        bounds: &'a [NodeBounds],
        clamp_negative_offsets: bool,
    ) -> Self {
        Self {
            graph,
            bounds,
            clamp_negative_offsets,
        }
    }

    /// Walks `order`, recomputing only nodes inside `scope` when one is given.
    /// Nodes outside the scope keep the values already in `early`.
    pub fn execute(
        &self,
        order: &[NodeIndex],
        scope: Option<&[bool]>,
        early: &mut [EarlyDates],
        drivers: &mut [Vec<Driver>],
    ) {
        for &ix in order {
            if let Some(scope) = scope {
                if !scope[ix.index()] {
                    continue;
                }
            }
            let (dates, winners) = self.evaluate(ix, |pred| early[pred.index()]);
            early[ix.index()] = dates;
            drivers[ix.index()] = winners;
        }
    }

    /// Computes one weakly connected component in isolation.
    pub fn execute_component(
        &self,
        component: &[NodeIndex],
    ) -> Vec<(NodeIndex, EarlyDates, Vec<Driver>)> {
        let mut finished: HashMap<NodeIndex, EarlyDates> = HashMap::with_capacity(component.len());
        let mut results = Vec::with_capacity(component.len());

        for &ix in component {
            let (dates, winners) =
                self.evaluate(ix, |pred| finished.get(&pred).copied().unwrap_or_default());
            finished.insert(ix, dates);
            results.push((ix, dates, winners));
        }
        results
    }

    /// Early dates of one node given its predecessors' early dates.
    pub fn evaluate<F>(&self, ix: NodeIndex, early_of: F) -> (EarlyDates, Vec<Driver>)
    where
        F: Fn(NodeIndex) -> EarlyDates,
    {
        let duration = self.graph.node(ix).duration_days;
        let bounds = self.bounds[ix.index()];

        if let Some(pinned) = bounds.pinned_start {
            return (
                EarlyDates {
                    start: pinned,
                    finish: pinned + duration,
                },
                vec![Driver::ActualStart],
            );
        }

        let mut best: Option<i64> = None;
        let mut winners: Vec<Driver> = Vec::new();
        let mut consider = |candidate: i64, driver: Driver| match best {
            Some(current) if candidate < current => {}
            Some(current) if candidate == current => winners.push(driver),
            _ => {
                best = Some(candidate);
                winners.clear();
                winners.push(driver);
            }
        };

        for (pred, edge) in self.graph.links(ix, Direction::Incoming) {
            let candidate =
                earliest_successor_start(edge.kind, edge.lag_days, early_of(pred), duration);
            consider(candidate, Driver::Predecessor(pred));
        }
        if !self.graph.has_links(ix, Direction::Incoming) {
            consider(0, Driver::ScheduleStart);
        }
        if let Some(not_before) = bounds.earliest_start {
            consider(not_before, Driver::Constraint);
        }

        let mut start = best.unwrap_or(0);
        if self.clamp_negative_offsets && start < 0 {
            start = 0;
            winners = vec![Driver::ScheduleStart];
        }
        winners.sort_unstable();

        (
            EarlyDates {
                start,
                finish: start + duration,
            },
            winners,
        )
    }
}
