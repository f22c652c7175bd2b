//! Directed search graph over footstep nodes.
//!
//! Stores the best-known incoming edge and cost-from-start per node; the
//! graph is rebuilt for every planning call and discarded afterwards.

use std::collections::HashMap;

use crate::graph::footstep_node::FootstepNode;

#[derive(Debug, Default)]
pub struct FootstepGraph {
    incoming_best_edge: HashMap<FootstepNode, FootstepNode>,
    cost_from_start: HashMap<FootstepNode, f64>,
}

impl FootstepGraph {
    pub fn initialize(&mut self, start_node: FootstepNode) {
        self.incoming_best_edge.clear();
        self.cost_from_start.clear();
        self.cost_from_start.insert(start_node, 0.0);
    }

    /// Adds another zero-cost root (the second start foot); roots have no
    /// incoming edge
    pub fn add_root(&mut self, root: FootstepNode) {
        self.cost_from_start.insert(root, 0.0);
    }

    pub fn cost_from_start(&self, node: &FootstepNode) -> Option<f64> {
        self.cost_from_start.get(node).copied()
    }

    pub fn contains(&self, node: &FootstepNode) -> bool {
        self.cost_from_start.contains_key(node)
    }

    /// Records the edge if it improves on the best-known cost to `step`.
    /// Returns the new cost from start when an improvement happened.
    pub fn check_and_set_edge(
        &mut self,
        stance: &FootstepNode,
        step: &FootstepNode,
        transition_cost: f64,
    ) -> Option<f64> {
        let stance_cost = self.cost_from_start(stance)?;
        let tentative = stance_cost + transition_cost;

        match self.cost_from_start.get(step) {
            Some(&existing) if existing <= tentative => None,
            _ => {
                self.cost_from_start.insert(*step, tentative);
                self.incoming_best_edge.insert(*step, *stance);
                Some(tentative)
            }
        }
    }

    /// Path from the start node to `end`, inclusive
    pub fn path_from_start(&self, end: &FootstepNode) -> Vec<FootstepNode> {
        let mut path = vec![*end];
        let mut current = *end;
        while let Some(parent) = self.incoming_best_edge.get(&current) {
            path.push(*parent);
            current = *parent;
        }
        path.reverse();
        path
    }

    pub fn parent(&self, node: &FootstepNode) -> Option<&FootstepNode> {
        self.incoming_best_edge.get(node)
    }
}
