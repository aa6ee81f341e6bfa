// src/dag/graph.rs

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;

use crate::types::TaskId;

/// Dependency edges between registered tasks.
///
/// Edge direction: dependency -> dependent. For a task B that waits on A we
/// store the edge `A -> B`, so a path `X -> ... -> Y` means "X must complete
/// before Y may run".
///
/// The graph never contains a cycle; callers check [`DagGraph::would_cycle`]
/// before adding an edge.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    graph: DiGraphMap<TaskId, ()>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.graph.contains_node(id)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether adding the edge `dependency -> task` would close a cycle,
    /// i.e. whether `task` already (transitively) precedes `dependency`.
    ///
    /// A task that is not in the graph yet precedes nothing, so for fresh
    /// registrations only a self-reference can cycle.
    pub fn would_cycle(&self, task: TaskId, dependency: TaskId) -> bool {
        if task == dependency {
            return true;
        }
        if !self.contains(task) || !self.contains(dependency) {
            return false;
        }
        has_path_connecting(&self.graph, task, dependency, None)
    }

    /// Insert a task node together with its dependency edges.
    pub fn add_task(&mut self, id: TaskId, deps: &[TaskId]) {
        self.graph.add_node(id);
        for dep in deps {
            self.graph.add_edge(*dep, id, ());
        }
    }

    pub fn add_edge(&mut self, dependency: TaskId, task: TaskId) {
        self.graph.add_edge(dependency, task, ());
    }

    /// Remove a task and every edge touching it.
    pub fn remove_task(&mut self, id: TaskId) {
        self.graph.remove_node(id);
    }

    /// Immediate dependencies of a task, sorted by id.
    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Immediate dependents of a task (tasks that wait on it), sorted by id.
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// All task ids, sorted.
    pub fn tasks(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.graph.nodes().collect();
        ids.sort_unstable();
        ids
    }

    fn neighbors(&self, id: TaskId, dir: Direction) -> Vec<TaskId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut ids: Vec<TaskId> = self.graph.neighbors_directed(id, dir).collect();
        ids.sort_unstable();
        ids
    }
}
