//! The validated task graph.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::task::{Task, TaskSpec};

/// Immutable DAG of named tasks.
///
/// Edges go from prerequisite to dependent. Node weights are declaration
/// indices into `specs`, which is what breaks ties when planning.
pub struct TaskGraph {
    graph: DiGraph<usize, ()>,
    specs: Vec<TaskSpec>,
    by_name: FxHashMap<String, NodeIndex>,
}

/// Collects task specs in declaration order.
#[derive(Default)]
pub struct TaskGraphBuilder {
    specs: Vec<TaskSpec>,
}

impl TaskGraphBuilder {
    /// Register a task.
    pub fn task(mut self, spec: TaskSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Register a task through a mutable reference.
    pub fn add(&mut self, spec: TaskSpec) -> &mut Self {
        self.specs.push(spec);
        self
    }

    /// Validate the declarations and freeze them into a [`TaskGraph`].
    pub fn build(self) -> Result<TaskGraph> {
        let mut graph = DiGraph::with_capacity(self.specs.len(), self.specs.len());
        let mut by_name = FxHashMap::default();

        for (position, spec) in self.specs.iter().enumerate() {
            let idx = graph.add_node(position);
            if by_name.insert(spec.name.clone(), idx).is_some() {
                return Err(GraphError::DuplicateTask(spec.name.clone()));
            }
        }

        for spec in &self.specs {
            let dependent = by_name[&spec.name];
            for dep in &spec.deps {
                if dep == &spec.name {
                    return Err(GraphError::SelfDependency(spec.name.clone()));
                }
                let prerequisite =
                    *by_name
                        .get(dep)
                        .ok_or_else(|| GraphError::UnknownPrerequisite {
                            task: spec.name.clone(),
                            prerequisite: dep.clone(),
                        })?;
                graph.update_edge(prerequisite, dependent, ());
            }
        }

        let task_graph = TaskGraph {
            graph,
            specs: self.specs,
            by_name,
        };
        task_graph.detect_cycles()?;

        Ok(task_graph)
    }
}

impl TaskGraph {
    /// Start declaring a graph.
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::default()
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Whether a task with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All task specs in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.specs.iter()
    }

    /// Declared prerequisites of a task.
    pub fn prerequisites(&self, name: &str) -> Result<&[String]> {
        self.spec(name).map(|spec| spec.deps.as_slice())
    }

    /// Look up a task spec by name.
    pub fn spec(&self, name: &str) -> Result<&TaskSpec> {
        self.node(name).map(|idx| &self.specs[self.graph[idx]])
    }

    /// Transitive prerequisite closure of `targets`, in topological order.
    ///
    /// Ties between tasks that are ready at the same time are broken by
    /// declaration order.
    pub fn plan<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<String>> {
        Ok(self
            .plan_nodes(targets)?
            .into_iter()
            .map(|idx| self.name_of(idx).to_string())
            .collect())
    }

    pub(crate) fn plan_nodes<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<NodeIndex>> {
        let mut closure = FxHashSet::default();
        let mut stack = Vec::new();
        for target in targets {
            let idx = self.node(target.as_ref())?;
            if closure.insert(idx) {
                stack.push(idx);
            }
        }
        while let Some(idx) = stack.pop() {
            for prerequisite in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if closure.insert(prerequisite) {
                    stack.push(prerequisite);
                }
            }
        }

        // Kahn's algorithm restricted to the closure, smallest declaration index first.
        let mut in_degree: FxHashMap<NodeIndex, usize> = closure
            .iter()
            .map(|&idx| {
                let degree = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count();
                (idx, degree)
            })
            .collect();
        let mut ready: BinaryHeap<Reverse<(usize, NodeIndex)>> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&idx, _)| Reverse((self.graph[idx], idx)))
            .collect();

        let mut order = Vec::with_capacity(closure.len());
        while let Some(Reverse((_, idx))) = ready.pop() {
            order.push(idx);
            for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((self.graph[dependent], dependent)));
                    }
                }
            }
        }

        Ok(order)
    }

    pub(crate) fn node(&self, name: &str) -> Result<NodeIndex> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownTask(name.to_string()))
    }

    pub(crate) fn name_of(&self, idx: NodeIndex) -> &str {
        &self.specs[self.graph[idx]].name
    }

    pub(crate) fn body_of(&self, idx: NodeIndex) -> Arc<dyn Task> {
        Arc::clone(&self.specs[self.graph[idx]].task)
    }

    pub(crate) fn prerequisite_nodes(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    pub(crate) fn dependent_nodes(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    fn detect_cycles(&self) -> Result<()> {
        use petgraph::algo::kosaraju_scc;

        for scc in kosaraju_scc(&self.graph) {
            if scc.len() > 1 {
                let members: FxHashSet<NodeIndex> = scc.iter().copied().collect();
                let start = scc
                    .iter()
                    .copied()
                    .min_by_key(|&idx| self.graph[idx])
                    .unwrap_or(scc[0]);
                let mut path: Vec<String> = self
                    .cycle_from(start, &members)
                    .into_iter()
                    .map(|idx| self.name_of(idx).to_string())
                    .collect();
                path.push(self.name_of(start).to_string());
                return Err(GraphError::Cycle { path });
            }
        }

        Ok(())
    }

    /// Walk prerequisite edges inside one strongly connected component until
    /// the walk returns to `start`.
    fn cycle_from(&self, start: NodeIndex, members: &FxHashSet<NodeIndex>) -> Vec<NodeIndex> {
        let mut path = vec![start];
        let mut visited = FxHashSet::default();
        visited.insert(start);

        fn walk(
            graph: &TaskGraph,
            current: NodeIndex,
            start: NodeIndex,
            members: &FxHashSet<NodeIndex>,
            visited: &mut FxHashSet<NodeIndex>,
            path: &mut Vec<NodeIndex>,
        ) -> bool {
            let mut next: Vec<NodeIndex> = graph
                .prerequisite_nodes(current)
                .filter(|idx| members.contains(idx))
                .collect();
            next.sort_by_key(|&idx| graph.graph[idx]);

            for idx in next {
                if idx == start {
                    return true;
                }
                if visited.insert(idx) {
                    path.push(idx);
                    if walk(graph, idx, start, members, visited, path) {
                        return true;
                    }
                    path.pop();
                }
            }
            false
        }

        walk(self, start, start, members, &mut visited, &mut path);
        path
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.specs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Noop;

    fn graph(decls: Vec<(&str, Vec<&str>)>) -> Result<TaskGraph> {
        decls
            .into_iter()
            .fold(TaskGraph::builder(), |builder, (name, deps)| {
                builder.task(TaskSpec::new(name, Noop).with_deps(deps))
            })
            .build()
    }

    #[test]
    fn test_plan_is_topological_with_declaration_ties() {
        let g = graph(vec![
            ("lint", vec![]),
            ("js", vec![]),
            ("css", vec![]),
            ("html", vec!["js", "css"]),
            ("lib", vec![]),
            ("default", vec!["html", "lib"]),
        ])
        .unwrap();

        assert_eq!(
            g.plan(&["default"]).unwrap(),
            vec!["js", "css", "html", "lib", "default"]
        );
    }

    #[test]
    fn test_plan_includes_each_task_once() {
        let g = graph(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ])
        .unwrap();

        assert_eq!(g.plan(&["d", "b"]).unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_plan_only_contains_closure() {
        let g = graph(vec![("a", vec![]), ("b", vec![]), ("c", vec!["b"])]).unwrap();
        assert_eq!(g.plan(&["c"]).unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn test_unknown_target() {
        let g = graph(vec![("a", vec![])]).unwrap();
        assert_eq!(
            g.plan(&["nope"]).unwrap_err(),
            GraphError::UnknownTask("nope".into())
        );
    }

    #[test]
    fn test_duplicate_task() {
        let err = graph(vec![("a", vec![]), ("a", vec![])]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateTask("a".into()));
    }

    #[test]
    fn test_unknown_prerequisite() {
        let err = graph(vec![("html", vec!["js"])]).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownPrerequisite {
                task: "html".into(),
                prerequisite: "js".into()
            }
        );
    }

    #[test]
    fn test_self_dependency() {
        let err = graph(vec![("a", vec!["a"])]).unwrap_err();
        assert_eq!(err, GraphError::SelfDependency("a".into()));
    }

    #[test]
    fn test_cycle_reports_path() {
        let err = graph(vec![("a", vec!["c"]), ("b", vec!["a"]), ("c", vec!["b"])]).unwrap_err();
        match err {
            GraphError::Cycle { path } => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
                assert!(path.contains(&"b".to_string()));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        let msg = graph(vec![("x", vec!["y"]), ("y", vec!["x"])])
            .unwrap_err()
            .to_string();
        assert!(msg.contains("x -> y -> x"), "{msg}");
    }

    #[test]
    fn test_prerequisites_lookup() {
        let g = graph(vec![("js", vec![]), ("html", vec!["js"])]).unwrap();
        assert_eq!(g.prerequisites("html").unwrap(), ["js".to_string()]);
        assert!(g.contains("js"));
        assert!(!g.contains("css"));
        assert_eq!(g.len(), 2);
    }
}
