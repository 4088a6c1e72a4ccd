//! Dependency graph over the schedulable tasks of a project.
//!
//! Excluded tasks are dropped before the graph is built. Nodes are keyed by
//! [`TaskNo`] and edges run from predecessor to successor. Edges are added in
//! ascending task-number order, so neighbours iterate in that order too.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::error::ScheduleError;
use crate::task::{Task, TaskNo};

/// Validated predecessor/successor structure of the non-excluded tasks.
#[derive(Debug)]
pub struct TaskGraph<'a> {
    nodes: BTreeMap<TaskNo, &'a Task>,
    graph: DiGraphMap<TaskNo, ()>,
}

impl<'a> TaskGraph<'a> {
    /// Build the graph, rejecting duplicate task numbers, zero durations,
    /// self references and predecessors that are missing or excluded.
    pub fn build(tasks: &'a [Task]) -> Result<Self, ScheduleError> {
        let mut nodes = BTreeMap::new();
        for task in tasks.iter().filter(|t| !t.excluded) {
            if task.duration == 0 {
                return Err(ScheduleError::InvalidDuration(task.task_no));
            }
            if nodes.insert(task.task_no, task).is_some() {
                return Err(ScheduleError::DuplicateTaskNo(task.task_no));
            }
        }

        let mut graph = DiGraphMap::with_capacity(nodes.len(), nodes.len());
        for no in nodes.keys() {
            graph.add_node(*no);
        }
        for (no, task) in &nodes {
            for pred in task.predecessor.iter() {
                if pred == no {
                    return Err(ScheduleError::Cycle { cycle: vec![*no] });
                }
                if !nodes.contains_key(pred) {
                    return Err(ScheduleError::DanglingReference {
                        task: *no,
                        missing: *pred,
                    });
                }
                graph.add_edge(*pred, *no, ());
            }
        }

        Ok(TaskGraph { nodes, graph })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The task behind a node. Only valid for numbers taken from this graph.
    pub fn task(&self, no: &TaskNo) -> Option<&'a Task> {
        self.nodes.get(no).copied()
    }

    pub fn predecessors(&self, no: &TaskNo) -> impl Iterator<Item = TaskNo> + '_ {
        self.graph.neighbors_directed(*no, Direction::Incoming)
    }

    pub fn successors(&self, no: &TaskNo) -> impl Iterator<Item = TaskNo> + '_ {
        self.graph.neighbors_directed(*no, Direction::Outgoing)
    }

    /// Kahn's algorithm; ties between independent tasks break by ascending
    /// task number.
    pub fn topological_order(&self) -> Result<Vec<TaskNo>, ScheduleError> {
        let (order, blocked) = kahn(&self.graph);
        if blocked.is_empty() {
            return Ok(order);
        }
        Err(ScheduleError::Cycle {
            cycle: find_cycle(&self.graph, &blocked),
        })
    }
}

/// Task numbers of every task, predecessors first. Unlike [`TaskGraph`] this
/// never fails: unknown and self references are ignored and tasks caught in a
/// cycle go last in task-number order. Used for display sorting.
pub fn dependency_order(tasks: &[Task]) -> Vec<TaskNo> {
    let known: BTreeSet<TaskNo> = tasks.iter().map(|t| t.task_no).collect();
    let mut graph: DiGraphMap<TaskNo, ()> = DiGraphMap::new();
    for no in &known {
        graph.add_node(*no);
    }
    for task in tasks {
        for pred in task.predecessor.iter() {
            if *pred != task.task_no && known.contains(pred) {
                graph.add_edge(*pred, task.task_no, ());
            }
        }
    }

    let (mut order, blocked) = kahn(&graph);
    order.extend(blocked);
    order
}

/// Returns the released order and the nodes left with unreleased
/// predecessors, both ascending where ties allow.
fn kahn(graph: &DiGraphMap<TaskNo, ()>) -> (Vec<TaskNo>, BTreeSet<TaskNo>) {
    let mut in_degree: BTreeMap<TaskNo, usize> = graph
        .nodes()
        .map(|no| (no, graph.neighbors_directed(no, Direction::Incoming).count()))
        .collect();
    let mut ready: BTreeSet<TaskNo> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(no, _)| *no)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(no) = ready.pop_first() {
        order.push(no);
        for succ in graph.neighbors_directed(no, Direction::Outgoing) {
            if let Some(degree) = in_degree.get_mut(&succ) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(succ);
                }
            }
        }
    }

    let blocked = in_degree
        .into_iter()
        .filter(|(_, degree)| *degree > 0)
        .map(|(no, _)| no)
        .collect();
    (order, blocked)
}

/// One concrete cycle, in dependency order, from the strongly connected
/// component holding the lowest blocked task number. Every member of a
/// non-trivial component has a predecessor inside it, so walking
/// predecessors must come back to a visited node.
fn find_cycle(graph: &DiGraphMap<TaskNo, ()>, blocked: &BTreeSet<TaskNo>) -> Vec<TaskNo> {
    let component: BTreeSet<TaskNo> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| scc.into_iter().collect::<BTreeSet<_>>())
        .filter(|scc| scc.iter().any(|no| blocked.contains(no)))
        .min_by_key(|scc| scc.first().copied())
        .unwrap_or_default();

    let Some(mut current) = component.first().copied() else {
        return blocked.iter().copied().collect();
    };
    let mut path: Vec<TaskNo> = Vec::new();
    let mut seen: BTreeMap<TaskNo, usize> = BTreeMap::new();
    loop {
        if let Some(&start) = seen.get(&current) {
            let mut cycle = path.split_off(start);
            cycle.reverse();
            return cycle;
        }
        seen.insert(current, path.len());
        path.push(current);
        let next = graph
            .neighbors_directed(current, Direction::Incoming)
            .find(|p| component.contains(p));
        match next {
            Some(next) => current = next,
            None => return path,
        }
    }
}
