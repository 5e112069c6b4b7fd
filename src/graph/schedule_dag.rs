use crate::error::{GraphDefect, Result, ScheduleError};
use crate::graph::cycles::CycleDetector;
use crate::task::{Dependency, DependencyType, Task, TaskConstraints, TaskId};
use crate::task_validation;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use tracing::debug;

/// Edge weight: the relationship and its lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    pub kind: DependencyType,
    pub lag_days: i64,
}

/// Tasks as nodes and typed dependencies as edges.
///
/// Node indices follow the order tasks were supplied in and never change for
/// the lifetime of the graph, so per-node results are stored in plain vectors
/// indexed by `NodeIndex::index()`.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<Task, DependencyEdge>,
    id_to_index: HashMap<TaskId, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the graph, rejecting negative durations, duplicate task ids,
    /// self-dependencies, duplicate edges and edges to unknown tasks.
    pub fn build(tasks: &[Task], dependencies: &[Dependency]) -> Result<Self> {
        task_validation::validate_task_collection(tasks)?;

        let mut graph: DiGraph<Task, DependencyEdge> =
            DiGraph::with_capacity(tasks.len(), dependencies.len());
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::with_capacity(tasks.len());

        for task in tasks {
            let node_ix = graph.add_node(task.clone());
            id_to_index.insert(task.id.clone(), node_ix);
        }

        let mut dag = Self { graph, id_to_index };
        for dependency in dependencies {
            let (u, v) = dag.resolve_endpoints(dependency).map_err(|missing| {
                GraphDefect::DanglingReference {
                    predecessor: dependency.predecessor.clone(),
                    successor: dependency.successor.clone(),
                    missing,
                }
            })?;
            dag.check_new_edge(dependency, u, v)?;
            dag.graph.add_edge(
                u,
                v,
                DependencyEdge {
                    kind: dependency.kind,
                    lag_days: dependency.lag_days,
                },
            );
        }

        debug!(
            tasks = dag.task_count(),
            dependencies = dag.dependency_count(),
            "built dependency graph"
        );
        Ok(dag)
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.id_to_index.contains_key(id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.index_of(id).map(|ix| &self.graph[ix])
    }

    /// Tasks in input order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.graph.node_indices().map(move |ix| &self.graph[ix])
    }

    /// Dependencies ordered by predecessor, then successor input position.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut edges: Vec<(NodeIndex, NodeIndex, DependencyEdge)> = self
            .graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target(), *edge.weight()))
            .collect();
        edges.sort_by_key(|(u, v, _)| (*u, *v));
        edges
            .into_iter()
            .map(|(u, v, edge)| self.to_dependency(u, v, edge))
            .collect()
    }

    /// Incoming dependencies of `id`, ordered by predecessor input position.
    pub fn predecessors_of(&self, id: &TaskId) -> Result<Vec<Dependency>> {
        let ix = self.require(id)?;
        Ok(self
            .sorted_links(ix, Direction::Incoming)
            .into_iter()
            .map(|(pred, edge)| self.to_dependency(pred, ix, edge))
            .collect())
    }

    /// Outgoing dependencies of `id`, ordered by successor input position.
    pub fn successors_of(&self, id: &TaskId) -> Result<Vec<Dependency>> {
        let ix = self.require(id)?;
        Ok(self
            .sorted_links(ix, Direction::Outgoing)
            .into_iter()
            .map(|(succ, edge)| self.to_dependency(ix, succ, edge))
            .collect())
    }

    /// Kahn's algorithm, always releasing the ready task that came first in
    /// the input, so identical input yields an identical order.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        Ok(self
            .topological_indices()?
            .into_iter()
            .map(|ix| self.graph[ix].id.clone())
            .collect())
    }

    pub(crate) fn topological_indices(&self) -> Result<Vec<NodeIndex>> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|ix| self.graph.edges_directed(ix, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|ix| in_degree[ix.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.task_count());
        while let Some(Reverse(ix)) = ready.pop() {
            order.push(ix);
            for succ in self.graph.neighbors_directed(ix, Direction::Outgoing) {
                let degree = &mut in_degree[succ.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        if order.len() < self.task_count() {
            return Err(ScheduleError::CycleDetected {
                cycles: CycleDetector::find_cycles(self),
            });
        }
        Ok(order)
    }

    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub(crate) fn index_of(&self, id: &TaskId) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    pub(crate) fn require(&self, id: &TaskId) -> Result<NodeIndex> {
        self.index_of(id)
            .ok_or_else(|| ScheduleError::UnknownTask(id.clone()))
    }

    pub(crate) fn node(&self, ix: NodeIndex) -> &Task {
        &self.graph[ix]
    }

    pub(crate) fn id(&self, ix: NodeIndex) -> &TaskId {
        &self.graph[ix].id
    }

    /// Unordered (neighbour, edge) pairs in the given direction.
    pub(crate) fn links(
        &self,
        ix: NodeIndex,
        direction: Direction,
    ) -> impl Iterator<Item = (NodeIndex, DependencyEdge)> + '_ {
        self.graph.edges_directed(ix, direction).map(move |edge| {
            let other = if direction == Direction::Incoming {
                edge.source()
            } else {
                edge.target()
            };
            (other, *edge.weight())
        })
    }

    pub(crate) fn sorted_links(
        &self,
        ix: NodeIndex,
        direction: Direction,
    ) -> Vec<(NodeIndex, DependencyEdge)> {
        let mut links: Vec<_> = self.links(ix, direction).collect();
        links.sort_by_key(|(other, _)| *other);
        links
    }

    pub(crate) fn has_links(&self, ix: NodeIndex, direction: Direction) -> bool {
        self.graph.edges_directed(ix, direction).next().is_some()
    }

    /// Marks every node reachable from `origins` (origins included) following
    /// edges in `direction`.
    pub(crate) fn reachable(&self, origins: &[NodeIndex], direction: Direction) -> Vec<bool> {
        let mut seen = vec![false; self.task_count()];
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        for &origin in origins {
            if !seen[origin.index()] {
                seen[origin.index()] = true;
                queue.push_back(origin);
            }
        }
        while let Some(ix) = queue.pop_front() {
            for next in self.graph.neighbors_directed(ix, direction) {
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    pub(crate) fn set_duration(&mut self, ix: NodeIndex, duration_days: i64) -> Result<()> {
        if duration_days < 0 {
            return Err(GraphDefect::NegativeDuration {
                task: self.graph[ix].id.clone(),
                duration_days,
            }
            .into());
        }
        self.graph[ix].duration_days = duration_days;
        Ok(())
    }

    pub(crate) fn set_constraints(&mut self, ix: NodeIndex, constraints: TaskConstraints) {
        self.graph[ix].constraints = constraints;
    }

    /// Adds an edge without checking acyclicity; the caller validates and
    /// rolls back with [`DependencyGraph::remove_dependency`].
    pub(crate) fn add_dependency(
        &mut self,
        dependency: &Dependency,
    ) -> Result<(NodeIndex, NodeIndex)> {
        let (u, v) = self.resolve_endpoints(dependency).map_err(|missing| {
            ScheduleError::DanglingReference {
                predecessor: dependency.predecessor.clone(),
                successor: dependency.successor.clone(),
                missing,
            }
        })?;
        self.check_new_edge(dependency, u, v)?;
        self.graph.add_edge(
            u,
            v,
            DependencyEdge {
                kind: dependency.kind,
                lag_days: dependency.lag_days,
            },
        );
        Ok((u, v))
    }

    pub(crate) fn remove_dependency(
        &mut self,
        predecessor: &TaskId,
        successor: &TaskId,
    ) -> Result<(NodeIndex, NodeIndex, DependencyEdge)> {
        let unknown = || ScheduleError::UnknownDependency {
            predecessor: predecessor.clone(),
            successor: successor.clone(),
        };
        let u = self.index_of(predecessor).ok_or_else(unknown)?;
        let v = self.index_of(successor).ok_or_else(unknown)?;
        let edge_ix = self.graph.find_edge(u, v).ok_or_else(unknown)?;
        let edge = self.graph.remove_edge(edge_ix).ok_or_else(unknown)?;
        Ok((u, v, edge))
    }

    fn resolve_endpoints(
        &self,
        dependency: &Dependency,
    ) -> std::result::Result<(NodeIndex, NodeIndex), TaskId> {
        let u = self
            .index_of(&dependency.predecessor)
            .ok_or_else(|| dependency.predecessor.clone())?;
        let v = self
            .index_of(&dependency.successor)
            .ok_or_else(|| dependency.successor.clone())?;
        Ok((u, v))
    }

    fn check_new_edge(&self, dependency: &Dependency, u: NodeIndex, v: NodeIndex) -> Result<()> {
        if u == v {
            return Err(GraphDefect::SelfDependency {
                task: dependency.predecessor.clone(),
            }
            .into());
        }
        if self.graph.find_edge(u, v).is_some() {
            return Err(GraphDefect::DuplicateDependency {
                predecessor: dependency.predecessor.clone(),
                successor: dependency.successor.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn to_dependency(&self, u: NodeIndex, v: NodeIndex, edge: DependencyEdge) -> Dependency {
        Dependency::new(
            self.graph[u].id.clone(),
            self.graph[v].id.clone(),
            edge.kind,
            edge.lag_days,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> DependencyGraph {
        let tasks = vec![Task::new("A", 3), Task::new("B", 2), Task::new("C", 4)];
        let deps = vec![
            Dependency::finish_to_start("A", "B"),
            Dependency::finish_to_start("B", "C"),
        ];
        DependencyGraph::build(&tasks, &deps).unwrap()
    }

    #[test]
    fn build_rejects_self_dependency() {
        let tasks = vec![Task::new("A", 1)];
        let err = DependencyGraph::build(&tasks, &[Dependency::finish_to_start("A", "A")])
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::InvalidGraph(GraphDefect::SelfDependency { task: "A".into() })
        );
    }

    #[test]
    fn build_rejects_duplicate_pair_even_with_different_type() {
        let tasks = vec![Task::new("A", 1), Task::new("B", 1)];
        let deps = vec![
            Dependency::finish_to_start("A", "B"),
            Dependency::new("A", "B", DependencyType::StartToStart, 2),
        ];
        let err = DependencyGraph::build(&tasks, &deps).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidGraph(GraphDefect::DuplicateDependency { .. })
        ));
    }

    #[test]
    fn build_rejects_dangling_reference() {
        let tasks = vec![Task::new("A", 1)];
        let err = DependencyGraph::build(&tasks, &[Dependency::finish_to_start("A", "Z")])
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::InvalidGraph(GraphDefect::DanglingReference {
                predecessor: "A".into(),
                successor: "Z".into(),
                missing: "Z".into(),
            })
        );
    }

    #[test]
    fn adjacency_queries_follow_input_order() {
        let tasks = vec![Task::new("A", 1), Task::new("B", 1), Task::new("C", 1)];
        let deps = vec![
            Dependency::finish_to_start("A", "C"),
            Dependency::new("B", "C", DependencyType::FinishToFinish, -1),
        ];
        let dag = DependencyGraph::build(&tasks, &deps).unwrap();

        let preds = dag.predecessors_of(&"C".into()).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].predecessor.as_str(), "A");
        assert_eq!(preds[1].kind, DependencyType::FinishToFinish);
        assert_eq!(preds[1].lag_days, -1);
        assert_eq!(dag.successors_of(&"A".into()).unwrap().len(), 1);
        assert!(matches!(
            dag.successors_of(&"Q".into()),
            Err(ScheduleError::UnknownTask(_))
        ));
    }

    #[test]
    fn topological_order_breaks_ties_by_input_order() {
        let tasks = vec![
            Task::new("D", 1),
            Task::new("A", 1),
            Task::new("C", 1),
            Task::new("B", 1),
        ];
        let deps = vec![Dependency::finish_to_start("B", "D")];
        let dag = DependencyGraph::build(&tasks, &deps).unwrap();
        let order: Vec<String> = dag
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(order, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn topological_order_reports_cycles() {
        let mut dag = chain();
        dag.add_dependency(&Dependency::finish_to_start("C", "A")).unwrap();
        let err = dag.topological_order().unwrap_err();
        assert_eq!(
            err.cycles(),
            &[vec![TaskId::from("A"), TaskId::from("B"), TaskId::from("C")]]
        );
    }

    #[test]
    fn reachable_walks_both_directions() {
        let dag = chain();
        let b = dag.index_of(&"B".into()).unwrap();
        assert_eq!(dag.reachable(&[b], Direction::Outgoing), vec![false, true, true]);
        assert_eq!(dag.reachable(&[b], Direction::Incoming), vec![true, true, false]);
    }

    #[test]
    fn remove_dependency_round_trips() {
        let mut dag = chain();
        let (u, v, edge) = dag
            .remove_dependency(&"A".into(), &"B".into())
            .unwrap();
        assert_eq!(edge.kind, DependencyType::FinishToStart);
        assert_eq!((u.index(), v.index()), (0, 1));
        assert_eq!(dag.dependency_count(), 1);
        assert!(matches!(
            dag.remove_dependency(&"A".into(), &"B".into()),
            Err(ScheduleError::UnknownDependency { .. })
        ));
        assert_eq!(dag.dependencies(), vec![Dependency::finish_to_start("B", "C")]);
    }
}
