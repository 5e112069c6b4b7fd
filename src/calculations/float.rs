use crate::calculations::{EarlyDates, LateDates};
use crate::graph::DependencyGraph;
use crate::task::DependencyType;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskFloat {
    pub total: i64,
    /// Days before the earliest FS successor moves, with each edge's lag
    /// netted out: `min(successor.ES - lag) - EF`.
    pub free: i64,
    pub is_critical: bool,
}

pub struct FloatCalculator<'a> {
    graph: &'a DependencyGraph,
    criticality_threshold_days: i64,
}

impl<'a> FloatCalculator<'a> {
    pub fn new(graph: &'a DependencyGraph, criticality_threshold_days: i64) -> Self {
        Self {
            graph,
            criticality_threshold_days,
        }
    }

    pub fn execute(
        &self,
        early: &[EarlyDates],
        late: &[LateDates],
        scope: Option<&[bool]>,
        floats: &mut [TaskFloat],
    ) {
        for ix in self.graph.node_indices() {
            if let Some(scope) = scope {
                if !scope[ix.index()] {
                    continue;
                }
            }
            floats[ix.index()] = self.evaluate(ix, early, late);
        }
    }

    /// Total float is `LS - ES`. Free float is the room before the earliest
    /// FS successor (net of lag) would move; without an FS successor it falls
    /// back to total float. Criticality comes from total float alone.
    pub fn evaluate(&self, ix: NodeIndex, early: &[EarlyDates], late: &[LateDates]) -> TaskFloat {
        let own_early = early[ix.index()];
        let total = late[ix.index()].start - own_early.start;

        let free = self
            .graph
            .links(ix, Direction::Outgoing)
            .filter(|(_, edge)| edge.kind == DependencyType::FinishToStart)
            .map(|(succ, edge)| early[succ.index()].start - edge.lag_days - own_early.finish)
            .min()
            .unwrap_or(total);

        TaskFloat {
            total,
            free,
            is_critical: total <= self.criticality_threshold_days,
        }
    }
}
