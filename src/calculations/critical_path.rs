use crate::calculations::{Driver, EarlyDates, TaskFloat};
use crate::graph::DependencyGraph;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatSummary {
    pub critical_count: usize,
    pub negative_float_count: usize,
    pub min_total_float: Option<i64>,
    pub max_total_float: Option<i64>,
    pub mean_total_float: Option<f64>,
}

impl FloatSummary {
    pub fn from_floats(floats: &[TaskFloat]) -> Self {
        if floats.is_empty() {
            return Self::default();
        }
        let sum: i64 = floats.iter().map(|f| f.total).sum();
        Self {
            critical_count: floats.iter().filter(|f| f.is_critical).count(),
            negative_float_count: floats.iter().filter(|f| f.total < 0).count(),
            min_total_float: floats.iter().map(|f| f.total).min(),
            max_total_float: floats.iter().map(|f| f.total).max(),
            mean_total_float: Some(sum as f64 / floats.len() as f64),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathResult {
    /// Longest chains of critical tasks linked by driving edges, sorted.
    pub critical_paths: Vec<Vec<TaskId>>,
    /// Max early finish over all tasks.
    pub project_duration_days: i64,
    /// Tasks appearing on any returned path, in input order.
    pub tasks_on_critical_path: Vec<TaskId>,
    pub float_summary: FloatSummary,
    /// Set when enumeration stopped at the configured path limit.
    #[serde(default)]
    pub truncated: bool,
}

pub struct CriticalPathResolver<'a> {
    graph: &'a DependencyGraph,
    max_paths: usize,
}

impl<'a> CriticalPathResolver<'a> {
    pub fn new(graph: &'a DependencyGraph, max_paths: usize) -> Self {
        Self { graph, max_paths }
    }

    /// Follows driving edges between critical tasks and keeps the longest
    /// chains: those ending on the latest finish any chain reaches, starting
    /// from the earliest start that still reaches it.
    pub fn resolve(
        &self,
        early: &[EarlyDates],
        floats: &[TaskFloat],
        drivers: &[Vec<Driver>],
    ) -> CriticalPathResult {
        let n = self.graph.task_count();
        let mut driven: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut is_driven = vec![false; n];

        for ix in self.graph.node_indices() {
            let succ = ix.index();
            if !floats[succ].is_critical {
                continue;
            }
            for driver in &drivers[succ] {
                if let Driver::Predecessor(pred) = driver {
                    if floats[pred.index()].is_critical {
                        driven[pred.index()].push(succ);
                        is_driven[succ] = true;
                    }
                }
            }
        }
        for next in &mut driven {
            next.sort_unstable();
        }

        let reach = latest_reach(&driven, early);
        let starts: Vec<usize> = (0..n)
            .filter(|&i| floats[i].is_critical && !is_driven[i])
            .collect();
        let finish = starts.iter().map(|&i| reach[i]).max();

        let mut paths: Vec<Vec<usize>> = Vec::new();
        let mut truncated = false;
        if let Some(finish) = finish {
            let earliest = starts
                .iter()
                .filter(|&&i| reach[i] == finish)
                .map(|&i| early[i].start)
                .min()
                .unwrap_or_default();
            let extends = |node: usize| reach[node] == finish;

            'starts: for &start in starts
                .iter()
                .filter(|&&i| extends(i) && early[i].start == earliest)
            {
                let mut path = vec![start];
                let mut cursors = vec![0usize];
                while let Some(&node) = path.last() {
                    let depth = cursors.len() - 1;
                    let children = &driven[node];
                    if cursors[depth] == 0
                        && early[node].finish == finish
                        && !children.iter().any(|&c| extends(c))
                    {
                        if paths.len() >= self.max_paths {
                            truncated = true;
                            break 'starts;
                        }
                        paths.push(path.clone());
                    }
                    let skip = cursors[depth];
                    match children[skip..].iter().position(|&c| extends(c)) {
                        Some(offset) => {
                            cursors[depth] = skip + offset + 1;
                            path.push(children[skip + offset]);
                            cursors.push(0);
                        }
                        None => {
                            path.pop();
                            cursors.pop();
                        }
                    }
                }
            }
        }
        if truncated {
            warn!(limit = self.max_paths, "critical path enumeration truncated");
        }

        let mut on_path = vec![false; n];
        for path in &paths {
            for &node in path {
                on_path[node] = true;
            }
        }

        let mut critical_paths: Vec<Vec<TaskId>> = paths
            .into_iter()
            .map(|path| {
                path.into_iter()
                    .map(|i| self.graph.id(petgraph::graph::NodeIndex::new(i)).clone())
                    .collect()
            })
            .collect();
        critical_paths.sort();

        CriticalPathResult {
            critical_paths,
            project_duration_days: early.iter().map(|e| e.finish).max().unwrap_or(0),
            tasks_on_critical_path: self
                .graph
                .node_indices()
                .filter(|ix| on_path[ix.index()])
                .map(|ix| self.graph.id(ix).clone())
                .collect(),
            float_summary: FloatSummary::from_floats(floats),
            truncated,
        }
    }
}

/// Latest early finish reachable from each task by following driving edges
/// between critical tasks, the task's own finish included.
fn latest_reach(driven: &[Vec<usize>], early: &[EarlyDates]) -> Vec<i64> {
    let mut reach: Vec<Option<i64>> = vec![None; driven.len()];
    let mut stack: Vec<(usize, bool)> = Vec::new();
    for root in 0..driven.len() {
        stack.push((root, false));
        while let Some((node, expanded)) = stack.pop() {
            if reach[node].is_some() {
                continue;
            }
            if expanded {
                let latest = driven[node]
                    .iter()
                    .filter_map(|&child| reach[child])
                    .fold(early[node].finish, i64::max);
                reach[node] = Some(latest);
            } else {
                stack.push((node, true));
                stack.extend(
                    driven[node]
                        .iter()
                        .filter(|&&child| reach[child].is_none())
                        .map(|&child| (child, false)),
                );
            }
        }
    }
    reach
        .into_iter()
        .zip(early)
        .map(|(latest, dates)| latest.unwrap_or(dates.finish))
        .collect()
}
