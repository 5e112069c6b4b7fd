use crate::calculations::{LateDates, NodeBounds, latest_predecessor_finish};
use crate::graph::DependencyGraph;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

pub struct BackwardPass<'a> {
    graph: &'a DependencyGraph,
    bounds: &'a [NodeBounds],
}

impl<'a> BackwardPass<'a> {
    pub fn new(graph: &'a DependencyGraph, bounds: &'a [NodeBounds]) -> Self {
        Self { graph, bounds }
    }

    /// Walks `order` in reverse, recomputing only nodes inside `scope` when one
    /// is given.
    pub fn execute(
        &self,
        order: &[NodeIndex],
        seed: i64,
        scope: Option<&[bool]>,
        late: &mut [LateDates],
    ) {
        for &ix in order.iter().rev() {
            if let Some(scope) = scope {
                if !scope[ix.index()] {
                    continue;
                }
            }
            late[ix.index()] = self.evaluate(ix, seed, |succ| late[succ.index()]);
        }
    }

    pub fn execute_component(
        &self,
        component: &[NodeIndex],
        seed: i64,
    ) -> Vec<(NodeIndex, LateDates)> {
        let mut finished: HashMap<NodeIndex, LateDates> = HashMap::with_capacity(component.len());
        let mut results = Vec::with_capacity(component.len());

        for &ix in component.iter().rev() {
            let dates =
                self.evaluate(ix, seed, |succ| finished.get(&succ).copied().unwrap_or_default());
            finished.insert(ix, dates);
            results.push((ix, dates));
        }
        results
    }

    /// Late dates of one node: the minimum over the seed, every outgoing
    /// edge's bound and a finish-no-later-than constraint.
    pub fn evaluate<F>(&self, ix: NodeIndex, seed: i64, late_of: F) -> LateDates
    where
        F: Fn(NodeIndex) -> LateDates,
    {
        let duration = self.graph.node(ix).duration_days;

        let mut finish = self
            .graph
            .links(ix, Direction::Outgoing)
            .map(|(succ, edge)| {
                latest_predecessor_finish(edge.kind, edge.lag_days, late_of(succ), duration)
            })
            .fold(seed, i64::min);
        if let Some(not_after) = self.bounds[ix.index()].latest_finish {
            finish = finish.min(not_after);
        }

        LateDates {
            start: finish - duration,
            finish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Dependency, DependencyType, Task};

    fn late_dates(
        tasks: &[Task],
        deps: &[Dependency],
        seed: i64,
        bounds: Vec<NodeBounds>,
    ) -> Vec<LateDates> {
        let dag = DependencyGraph::build(tasks, deps).unwrap();
        let order = dag.topological_indices().unwrap();
        let mut late = vec![LateDates::default(); tasks.len()];
        BackwardPass::new(&dag, &bounds).execute(&order, seed, None, &mut late);
        late
    }

    fn at(start: i64, finish: i64) -> LateDates {
        LateDates { start, finish }
    }

    #[test]
    fn late_finish_is_min_over_outgoing_edges() {
        // A -> B (FS), A -> C (FF lag 1); seed 10
        let tasks = vec![Task::new("A", 2), Task::new("B", 4), Task::new("C", 3)];
        let deps = vec![
            Dependency::finish_to_start("A", "B"),
            Dependency::new("A", "C", DependencyType::FinishToFinish, 1),
        ];
        let late = late_dates(&tasks, &deps, 10, vec![NodeBounds::default(); 3]);
        assert_eq!(late[1], at(6, 10));
        assert_eq!(late[2], at(7, 10));
        // via B: 6, via C: 10 - 1 = 9
        assert_eq!(late[0], at(4, 6));
    }

    #[test]
    fn every_task_is_capped_by_the_seed() {
        // A --SS--> B: the edge alone would allow A to finish at 12.
        let tasks = vec![Task::new("A", 10), Task::new("B", 1)];
        let deps = vec![Dependency::new("A", "B", DependencyType::StartToStart, 0)];
        let late = late_dates(&tasks, &deps, 10, vec![NodeBounds::default(); 2]);
        assert_eq!(late[1], at(9, 10));
        assert_eq!(late[0], at(0, 10));
    }

    #[test]
    fn finish_constraint_tightens_late_dates() {
        let tasks = vec![Task::new("A", 2), Task::new("B", 2)];
        let deps = vec![Dependency::finish_to_start("A", "B")];
        let mut bounds = vec![NodeBounds::default(); 2];
        bounds[1].latest_finish = Some(3);
        let late = late_dates(&tasks, &deps, 10, bounds);
        assert_eq!(late[1], at(1, 3));
        assert_eq!(late[0], at(-1, 1));
    }
}
