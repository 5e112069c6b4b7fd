use crate::graph::schedule_dag::DependencyGraph;
use petgraph::Direction;
use petgraph::graph::NodeIndex;

/// Splits a topological order into weakly connected components.
///
/// Each component keeps the relative order of `order`, so it is itself a
/// valid topological order of its subgraph. Components are returned in the
/// order their first task appears in `order`.
pub fn split_components(graph: &DependencyGraph, order: &[NodeIndex]) -> Vec<Vec<NodeIndex>> {
    const UNASSIGNED: usize = usize::MAX;
    let mut component = vec![UNASSIGNED; graph.task_count()];
    let mut count = 0;

    for &start in order {
        if component[start.index()] != UNASSIGNED {
            continue;
        }
        component[start.index()] = count;
        let mut stack = vec![start];
        while let Some(ix) = stack.pop() {
            let neighbours = graph
                .links(ix, Direction::Outgoing)
                .chain(graph.links(ix, Direction::Incoming));
            for (next, _) in neighbours {
                if component[next.index()] == UNASSIGNED {
                    component[next.index()] = count;
                    stack.push(next);
                }
            }
        }
        count += 1;
    }

    let mut components: Vec<Vec<NodeIndex>> = vec![Vec::new(); count];
    for &ix in order {
        components[component[ix.index()]].push(ix);
    }
    components
}
