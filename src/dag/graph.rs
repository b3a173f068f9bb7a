// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::ValidationError;

/// A single named command within a workflow.
///
/// Tasks are immutable once added to a [`Graph`]; `retries` is the number of
/// *extra* attempts after the first one (0 means exactly one attempt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub cmd: String,
    pub depends_on: Vec<String>,
    pub retries: u32,
}

/// A named workflow: a set of tasks keyed by name.
///
/// The map is ordered so that iteration, hashing and scheduling are
/// independent of insertion order. Dependencies are stored as name lists and
/// resolved during traversal, so the graph owns every task exactly once.
/// Equality is semantic: two graphs are equal when they hold the same tasks,
/// regardless of how they were built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    name: String,
    tasks: BTreeMap<String, Task>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: BTreeMap::new(),
        }
    }

    /// Add a task to the graph.
    ///
    /// Fails with [`ValidationError::DuplicateTask`] when a task with the
    /// same name already exists.
    pub fn add_task(&mut self, task: Task) -> Result<(), ValidationError> {
        if self.tasks.contains_key(&task.name) {
            return Err(ValidationError::DuplicateTask(task.name));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// All tasks in ascending name order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check the graph invariants:
    /// - non-empty workflow name
    /// - at least one task
    /// - task names restricted to letters, digits, `_`, `-`
    /// - every task has a command
    /// - every dependency refers to a task in this graph
    /// - no cycles
    ///
    /// Pure; performs no I/O. Must pass before anything is executed or
    /// persisted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyWorkflowName);
        }
        if self.tasks.is_empty() {
            return Err(ValidationError::NoTasks);
        }

        for (name, task) in &self.tasks {
            if !is_valid_task_name(name) {
                return Err(ValidationError::InvalidTaskName(name.clone()));
            }
            if task.cmd.is_empty() {
                return Err(ValidationError::MissingCommand(name.clone()));
            }
            for dep in &task.depends_on {
                if !self.tasks.contains_key(dep) {
                    return Err(ValidationError::MissingDependency {
                        task: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        self.topological_sort().map(|_| ())
    }

    /// Return tasks in deterministic execution order.
    ///
    /// Kahn's algorithm with the ready set kept in a `BTreeSet`, so whenever
    /// several tasks have no remaining incoming edges the lexicographically
    /// smallest name is extracted first. Two graphs with the same structure
    /// therefore always produce byte-identical orderings.
    pub fn topological_sort(&self) -> Result<Vec<&Task>, ValidationError> {
        let mut in_degree: BTreeMap<&str, usize> =
            self.tasks.keys().map(|n| (n.as_str(), 0)).collect();
        let mut neighbors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for task in self.tasks.values() {
            for dep in &task.depends_on {
                neighbors
                    .entry(dep.as_str())
                    .or_default()
                    .push(task.name.as_str());
                if let Some(deg) = in_degree.get_mut(task.name.as_str()) {
                    *deg += 1;
                }
            }
        }

        for list in neighbors.values_mut() {
            list.sort_unstable();
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order: Vec<&Task> = Vec::with_capacity(self.tasks.len());

        while let Some(name) = ready.pop_first() {
            order.push(&self.tasks[name]);

            if let Some(dependents) = neighbors.get(name) {
                for &dependent in dependents {
                    if let Some(deg) = in_degree.get_mut(dependent) {
                        *deg -= 1;
                        if *deg == 0 {
                            ready.insert(dependent);
                        }
                    }
                }
            }
        }

        // A shorter result means some tasks never reached in-degree 0.
        if order.len() != self.tasks.len() {
            return Err(ValidationError::Cycle);
        }

        Ok(order)
    }

    /// Tasks with no dependencies, in ascending name order.
    pub fn roots(&self) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|t| t.depends_on.is_empty())
            .collect()
    }

    /// All `dependency -> dependent` edges.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges = Vec::new();
        for task in self.tasks.values() {
            for dep in &task.depends_on {
                edges.push((dep.as_str(), task.name.as_str()));
            }
        }
        edges
    }

    /// Compute the canonical 256-bit content digest of the graph.
    ///
    /// Tasks are hashed in ascending name order with their dependency lists
    /// sorted, every field length-prefixed, so the digest is invariant under
    /// insertion order and dependency-list permutation. Returned as a
    /// lowercase hex string.
    pub fn compute_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hash_field(&mut hasher, self.name.as_bytes());

        for task in self.tasks.values() {
            hash_field(&mut hasher, task.name.as_bytes());
            hash_field(&mut hasher, task.cmd.as_bytes());

            let mut deps = task.depends_on.clone();
            deps.sort_unstable();
            hash_field(&mut hasher, &(deps.len() as u64).to_le_bytes());
            for dep in &deps {
                hash_field(&mut hasher, dep.as_bytes());
            }

            hash_field(&mut hasher, &u64::from(task.retries).to_le_bytes());
        }

        hasher.finalize().to_hex().to_string()
    }
}

/// Length-prefix each field so that adjacent fields can never be confused.
fn hash_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn is_valid_task_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, cmd: &str, deps: &[&str]) -> Task {
        Task {
            name: name.to_string(),
            cmd: cmd.to_string(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            retries: 0,
        }
    }

    fn graph(name: &str, tasks: Vec<Task>) -> Graph {
        let mut g = Graph::new(name);
        for t in tasks {
            g.add_task(t).expect("duplicate task in test fixture");
        }
        g
    }

    #[test]
    fn topological_sort_orders_chain() {
        let g = graph(
            "test",
            vec![
                task("a", "echo a", &[]),
                task("b", "echo b", &["a"]),
                task("c", "echo c", &["b"]),
            ],
        );

        let order: Vec<&str> = g
            .topological_sort()
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn topological_sort_breaks_ties_lexicographically() {
        // Diamond: b and c are both ready after a; b must come first.
        let g = graph(
            "test",
            vec![
                task("d", "echo d", &["b", "c"]),
                task("c", "echo c", &["a"]),
                task("b", "echo b", &["a"]),
                task("a", "echo a", &[]),
            ],
        );

        let order: Vec<&str> = g
            .topological_sort()
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(order, ["a", "b", "c", "d"]);
    }

    #[test]
    fn topological_sort_is_a_permutation_respecting_dependencies() {
        let g = graph(
            "test",
            vec![
                task("a", "echo a", &[]),
                task("b", "echo b", &[]),
                task("c", "echo c", &["a", "b"]),
            ],
        );

        let order: Vec<&str> = g
            .topological_sort()
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(order.len(), 3);

        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert!(pos("c") > pos("a"));
        assert!(pos("c") > pos("b"));
    }

    #[test]
    fn cycle_is_rejected() {
        let g = graph(
            "test",
            vec![task("a", "echo a", &["b"]), task("b", "echo b", &["a"])],
        );

        assert_eq!(g.validate(), Err(ValidationError::Cycle));
        assert!(g.topological_sort().is_err());
    }

    #[test]
    fn validate_rejects_empty_name() {
        let g = graph("", vec![task("a", "echo a", &[])]);
        assert_eq!(g.validate(), Err(ValidationError::EmptyWorkflowName));
    }

    #[test]
    fn validate_rejects_empty_graph() {
        let g = Graph::new("test");
        assert_eq!(g.validate(), Err(ValidationError::NoTasks));
    }

    #[test]
    fn validate_rejects_missing_command() {
        let g = graph("test", vec![task("a", "", &[])]);
        assert_eq!(
            g.validate(),
            Err(ValidationError::MissingCommand("a".to_string()))
        );
    }

    #[test]
    fn validate_rejects_missing_dependency() {
        let g = graph("test", vec![task("a", "echo a", &["nonexistent"])]);
        assert_eq!(
            g.validate(),
            Err(ValidationError::MissingDependency {
                task: "a".to_string(),
                dependency: "nonexistent".to_string(),
            })
        );
    }

    #[test]
    fn validate_rejects_invalid_task_names() {
        for name in ["task 1", "task!", "@bad", "task.name"] {
            let g = graph("test", vec![task(name, "echo test", &[])]);
            assert_eq!(
                g.validate(),
                Err(ValidationError::InvalidTaskName(name.to_string())),
                "name {name:?} should be rejected"
            );
        }
    }

    #[test]
    fn validate_accepts_valid_task_names() {
        for name in ["task_1", "A", "deploy-prod", "task123"] {
            let g = graph("test", vec![task(name, "echo test", &[])]);
            assert_eq!(g.validate(), Ok(()), "name {name:?} should be accepted");
        }
    }

    #[test]
    fn add_task_rejects_duplicates() {
        let mut g = Graph::new("test");
        g.add_task(task("a", "echo a", &[])).unwrap();
        assert_eq!(
            g.add_task(task("a", "echo again", &[])),
            Err(ValidationError::DuplicateTask("a".to_string()))
        );
    }

    #[test]
    fn hash_is_stable_and_order_independent() {
        let g1 = graph(
            "test",
            vec![
                task("a", "echo a", &[]),
                task("b", "echo b", &["a"]),
                task("c", "echo c", &["a", "b"]),
            ],
        );
        // Same graph, different insertion order and permuted dependency list.
        let g2 = graph(
            "test",
            vec![
                task("c", "echo c", &["b", "a"]),
                task("a", "echo a", &[]),
                task("b", "echo b", &["a"]),
            ],
        );

        assert_eq!(g1.compute_hash(), g1.compute_hash());
        assert_eq!(g1.compute_hash(), g2.compute_hash());
    }

    #[test]
    fn hash_changes_when_graph_changes() {
        let g1 = graph("test", vec![task("a", "echo a", &[])]);

        let mut retried = task("a", "echo a", &[]);
        retried.retries = 2;
        let g2 = graph("test", vec![retried]);
        let g3 = graph("test", vec![task("a", "echo b", &[])]);

        assert_ne!(g1.compute_hash(), g2.compute_hash());
        assert_ne!(g1.compute_hash(), g3.compute_hash());
    }

    #[test]
    fn roots_returns_dependency_free_tasks() {
        let g = graph(
            "test",
            vec![
                task("a", "echo a", &[]),
                task("b", "echo b", &["a"]),
                task("c", "echo c", &[]),
            ],
        );

        let roots: Vec<&str> = g.roots().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(roots, ["a", "c"]);
    }
}
