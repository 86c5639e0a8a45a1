//! Pass dependency graph and topological ordering.

use std::collections::{BinaryHeap, HashMap};

/// Directed graph over pass indices. Edges point from a prerequisite to its
/// dependent.
pub(crate) struct DependencyGraph {
    nodes: Vec<usize>,
    successors: HashMap<usize, Vec<usize>>,
    in_degree: HashMap<usize, usize>,
}

impl DependencyGraph {
    pub(crate) fn new() -> DependencyGraph {
        DependencyGraph {
            nodes: Vec::new(),
            successors: HashMap::new(),
            in_degree: HashMap::new(),
        }
    }

    pub(crate) fn add_node(&mut self, node: usize) {
        if !self.in_degree.contains_key(&node) {
            self.nodes.push(node);
            self.in_degree.insert(node, 0);
            self.successors.insert(node, Vec::new());
        }
    }

    /// Requires `before` to be ordered ahead of `after`. Both must have been
    /// added as nodes.
    pub(crate) fn add_dependency(&mut self, before: usize, after: usize) {
        debug_assert!(self.in_degree.contains_key(&before));
        debug_assert!(self.in_degree.contains_key(&after));
        self.successors.get_mut(&before).unwrap().push(after);
        *self.in_degree.get_mut(&after).unwrap() += 1;
    }

    /// Kahn's algorithm with declaration order as the tie-break: among ready
    /// nodes, the lowest index goes first, so re-sorting an unchanged graph
    /// reproduces the same order.
    ///
    /// On a cycle, returns `Err` with some node inside it.
    pub(crate) fn toposort(mut self) -> Result<Vec<usize>, usize> {
        use std::cmp::Reverse;

        let mut ready: BinaryHeap<Reverse<usize>> = self
            .nodes
            .iter()
            .filter(|&&n| self.in_degree[&n] == 0)
            .map(|&n| Reverse(n))
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(node)) = ready.pop() {
            sorted.push(node);
            for &succ in &self.successors[&node] {
                let degree = self.in_degree.get_mut(&succ).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        if sorted.len() == self.nodes.len() {
            Ok(sorted)
        } else {
            let stuck = self
                .nodes
                .iter()
                .copied()
                .find(|n| !sorted.contains(n))
                .unwrap_or(0);
            Err(stuck)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[usize], edges: &[(usize, usize)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for &n in nodes {
            g.add_node(n);
        }
        for &(a, b) in edges {
            g.add_dependency(a, b);
        }
        g
    }

    #[test]
    fn dependencies_order_before_dependents() {
        let sorted = graph(&[0, 1, 2], &[(0, 1), (1, 2)]).toposort().unwrap();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn declaration_order_breaks_ties() {
        // a diamond: 0 -> {1, 2} -> 3, plus the free node 4
        let sorted = graph(&[0, 1, 2, 3, 4], &[(0, 1), (0, 2), (1, 3), (2, 3)])
            .toposort()
            .unwrap();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);

        // same graph declared backwards still respects edges, ties resolved
        // by the lowest index
        let sorted = graph(&[0, 1, 2, 3], &[(3, 1), (2, 1)]).toposort().unwrap();
        assert_eq!(sorted, vec![0, 2, 3, 1]);
    }

    #[test]
    fn resorting_is_stable() {
        let edges = [(0, 2), (1, 2), (2, 4)];
        let a = graph(&[0, 1, 2, 3, 4], &edges).toposort().unwrap();
        let b = graph(&[0, 1, 2, 3, 4], &edges).toposort().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn subgraphs_of_a_dag_stay_sortable() {
        // drop node 1 (and its edges) from 0 -> 1 -> 2: 2 must still sort
        // after 0's subgraph without node 1's mediation
        let sorted = graph(&[0, 2], &[]).toposort().unwrap();
        assert_eq!(sorted, vec![0, 2]);
    }

    #[test]
    fn cycles_are_detected() {
        assert!(graph(&[0, 1], &[(0, 1), (1, 0)]).toposort().is_err());
        assert!(graph(&[0, 1, 2], &[(0, 1), (1, 2), (2, 0)]).toposort().is_err());
        // self-dependency
        assert!(graph(&[0], &[(0, 0)]).toposort().is_err());
    }
}
