//! Acyclicity check run before any date computation.

use crate::error::{Cycle, Result, ScheduleError};
use crate::graph::schedule_dag::DependencyGraph;
use petgraph::Direction;
use petgraph::graph::NodeIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    cursor: usize,
}

impl Frame {
    fn new(graph: &DependencyGraph, node: NodeIndex) -> Self {
        let successors = graph
            .sorted_links(node, Direction::Outgoing)
            .into_iter()
            .map(|(succ, _)| succ)
            .collect();
        Self {
            node,
            successors,
            cursor: 0,
        }
    }
}

pub struct CycleDetector;

impl CycleDetector {
    /// Every cycle closed by a back edge, in discovery order.
    ///
    /// Three-colour DFS with an explicit stack so long chains cannot overflow
    /// the thread stack. Roots and successors are visited in input order.
    pub fn find_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
        let mut color = vec![Color::White; graph.task_count()];
        let mut cycles: Vec<Cycle> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        for root in graph.node_indices() {
            if color[root.index()] != Color::White {
                continue;
            }
            color[root.index()] = Color::Gray;
            stack.push(Frame::new(graph, root));

            loop {
                let Some(frame) = stack.last_mut() else {
                    break;
                };
                let node = frame.node;
                let next = frame.successors.get(frame.cursor).copied();
                frame.cursor += 1;

                let Some(next) = next else {
                    color[node.index()] = Color::Black;
                    stack.pop();
                    continue;
                };

                match color[next.index()] {
                    Color::White => {
                        color[next.index()] = Color::Gray;
                        stack.push(Frame::new(graph, next));
                    }
                    Color::Gray => {
                        // Gray nodes are exactly the frames on the stack.
                        if let Some(start) = stack.iter().position(|f| f.node == next) {
                            cycles.push(
                                stack[start..]
                                    .iter()
                                    .map(|f| graph.id(f.node).clone())
                                    .collect(),
                            );
                        }
                    }
                    Color::Black => {}
                }
            }
        }

        cycles
    }

    /// Fails with `CycleDetected` carrying every cycle found.
    pub fn ensure_acyclic(graph: &DependencyGraph) -> Result<()> {
        let cycles = Self::find_cycles(graph);
        if cycles.is_empty() {
            Ok(())
        } else {
            Err(ScheduleError::CycleDetected { cycles })
        }
    }
}
