//! Inheritance graph over group `inherits` edges
//!
//! Edges point from a group to each of its parents. The graph is a view over
//! a [`GroupMap`]; it never owns groups and looks everything up by name.
//!
//! - **Ancestor closure**: breadth-first, the group itself first, parents in
//!   declaration order
//! - **Cycle prevention**: an edge `child -> parent` is refused when `child`
//!   is already reachable from `parent`
//! - **Cycle detection**: DFS with white/gray/black marking, for auditing
//!   documents edited outside the service

use crate::group::GroupMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// DFS marking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Read-only graph view over a set of groups
#[derive(Debug, Clone, Copy)]
pub struct InheritanceGraph<'a> {
    groups: &'a GroupMap,
}

impl<'a> InheritanceGraph<'a> {
    /// Create a view over `groups`
    pub fn new(groups: &'a GroupMap) -> Self {
        Self { groups }
    }

    /// `name` followed by every group reachable through `inherits`
    ///
    /// Each group appears once, in breadth-first order. Unknown parent names
    /// are listed but not expanded. Terminates on cyclic input.
    pub fn ancestors_of(&self, name: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(name);
        queue.push_back(name);

        while let Some(current) = queue.pop_front() {
            order.push(current.to_string());

            let Some(group) = self.groups.get(current) else {
                continue;
            };

            for parent in &group.inherits {
                if visited.insert(parent.as_str()) {
                    queue.push_back(parent.as_str());
                }
            }
        }

        order
    }

    /// Whether adding `child -> new_parent` would let `child` reach itself
    pub fn would_create_cycle(&self, child: &str, new_parent: &str) -> bool {
        self.ancestors_of(new_parent).iter().any(|g| g == child)
    }

    /// The cycle an edge `child -> new_parent` would close, starting and
    /// ending at `child`; `None` if the edge is safe
    pub fn cycle_path(&self, child: &str, new_parent: &str) -> Option<Vec<String>> {
        if child == new_parent {
            return Some(vec![child.to_string(), child.to_string()]);
        }

        // BFS from new_parent, remembering how each group was reached
        let mut came_from: HashMap<&str, &str> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(new_parent);
        came_from.insert(new_parent, new_parent);

        while let Some(current) = queue.pop_front() {
            if current == child {
                let mut path = vec![current.to_string()];
                let mut step = current;
                while step != new_parent {
                    step = came_from[step];
                    path.push(step.to_string());
                }
                path.push(child.to_string());
                path.reverse();
                return Some(path);
            }

            if let Some(group) = self.groups.get(current) {
                for parent in &group.inherits {
                    if !came_from.contains_key(parent.as_str()) {
                        came_from.insert(parent.as_str(), current);
                        queue.push_back(parent.as_str());
                    }
                }
            }
        }

        None
    }

    /// Groups whose `inherits` lists `name`, sorted by name
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, group)| group.inherits.iter().any(|p| p == name))
            .map(|(group_name, _)| group_name.clone())
            .collect()
    }

    /// `(group, parent)` pairs where `parent` does not exist
    pub fn dangling_references(&self) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        for (name, group) in self.groups {
            for parent in &group.inherits {
                if !self.groups.contains_key(parent) {
                    dangling.push((name.clone(), parent.clone()));
                }
            }
        }
        dangling
    }

    /// Every cycle found by a DFS from each group, as `a -> ... -> a` paths
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut cycles = Vec::new();

        for start in self.groups.keys() {
            if !marks.contains_key(start.as_str()) {
                self.visit(start, &mut marks, &mut cycles);
            }
        }

        cycles
    }

    /// Iterative DFS from `start`
    ///
    /// The stack holds `(group, next parent index)`; its groups are the
    /// current path, so chain depth never touches the call stack.
    fn visit(
        &self,
        start: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        let groups: &'a GroupMap = self.groups;
        let mut stack: Vec<(&'a str, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::Visiting);

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            top.1 += 1;

            let Some(parent) = groups.get(node).and_then(|g| g.inherits.get(next)) else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };
            let parent = parent.as_str();

            match marks.get(parent) {
                Some(Mark::Visiting) => {
                    // Back edge: the cycle is the path suffix starting at parent
                    if let Some(from) = stack.iter().position(|(n, _)| *n == parent) {
                        let cycle = stack[from..]
                            .iter()
                            .map(|(n, _)| n.to_string())
                            .chain(std::iter::once(parent.to_string()))
                            .collect();
                        cycles.push(cycle);
                    }
                }
                Some(Mark::Done) => {}
                None => {
                    // Dangling parents are reported separately
                    if groups.contains_key(parent) {
                        marks.insert(parent, Mark::Visiting);
                        stack.push((parent, 0));
                    }
                }
            }
        }
    }
}
