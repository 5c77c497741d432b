//! Deployment-order dependency graph over resource descriptors.
//!
//! An edge `A -> B` means the toolkit creates/updates `A` strictly before `B`
//! and destroys `B` strictly before `A`. Edges come from two places: explicit
//! `depends_on` declarations and the references embedded in properties.

use std::collections::{BTreeMap, VecDeque};

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::{DefinitionError, Result};
use crate::resource::ResourceDescriptor;

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    index_map: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the graph, rejecting duplicate ids and dangling references.
    ///
    /// Nodes keep declaration order, which is also the tie-break order of
    /// [`Self::creation_order`].
    pub fn build(descriptors: &[ResourceDescriptor]) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut index_map = BTreeMap::new();

        for descriptor in descriptors {
            descriptor.validate_logical_id()?;
            if index_map.contains_key(&descriptor.logical_id) {
                return Err(DefinitionError::DuplicateLogicalId(
                    descriptor.logical_id.clone(),
                ));
            }
            let idx = graph.add_node(descriptor.logical_id.clone());
            index_map.insert(descriptor.logical_id.clone(), idx);
        }

        for descriptor in descriptors {
            let to = index_map[&descriptor.logical_id];
            for dependency in descriptor.all_dependencies() {
                let Some(&from) = index_map.get(&dependency) else {
                    return Err(DefinitionError::UnknownReference {
                        from: descriptor.logical_id.clone(),
                        target: dependency,
                    });
                };
                graph.update_edge(from, to, ());
            }
        }

        Ok(Self { graph, index_map })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn ensure_acyclic(&self) -> Result<()> {
        self.creation_order().map(|_| ())
    }

    /// Kahn's algorithm with declaration-order tie-breaking.
    pub fn creation_order(&self) -> Result<Vec<String>> {
        let mut in_degree: Vec<usize> = vec![0; self.graph.node_count()];
        for edge in self.graph.edge_references() {
            in_degree[edge.target().index()] += 1;
        }

        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(idx) = queue.pop_front() {
            order.push(self.graph[idx].clone());

            let mut next: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect();
            next.sort_unstable();
            for neighbor in next {
                let degree = &mut in_degree[neighbor.index()];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let cycle_node = self
                .graph
                .node_indices()
                .find(|idx| in_degree[idx.index()] > 0)
                .map_or_else(|| "unknown".to_string(), |idx| self.graph[idx].clone());
            return Err(DefinitionError::DependencyCycle(cycle_node));
        }

        Ok(order)
    }

    pub fn destruction_order(&self) -> Result<Vec<String>> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }

    /// True when `before` is guaranteed to be created ahead of `after`.
    pub fn must_precede(&self, before: &str, after: &str) -> bool {
        match (self.index_map.get(before), self.index_map.get(after)) {
            (Some(&from), Some(&to)) if from != to => {
                has_path_connecting(&self.graph, from, to, None)
            }
            _ => false,
        }
    }

    /// Direct upstream dependencies of a node, in declaration order.
    pub fn upstream(&self, logical_id: &str) -> Vec<String> {
        let Some(&idx) = self.index_map.get(logical_id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        neighbors.sort_unstable();
        neighbors
            .into_iter()
            .map(|idx| self.graph[idx].clone())
            .collect()
    }
}
