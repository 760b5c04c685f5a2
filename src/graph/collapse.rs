//! Collapsible leaf connections.
//!
//! Clicking a node in a collapsible graph hides (or shows again) the links to
//! its leaf neighbours. Nodes left without a visible link disappear with them.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::model::{Graph, LinkId};
use super::types::NodeId;

/// Hidden-link bookkeeping. Reset whenever the graph is rebuilt.
#[derive(Clone, Debug, Default)]
pub struct CollapseState {
	hidden: HashSet<LinkId>,
	hidden_nodes: HashSet<NodeId>,
}

impl CollapseState {
	/// Toggle the links between `root` and each of its leaf neighbours.
	///
	/// Returns the links whose visibility changed.
	pub fn toggle(&mut self, graph: &Graph, root: &NodeId) -> Vec<LinkId> {
		let leaves: HashSet<&NodeId> = graph
			.adjacency()
			.neighbors(root)
			.filter(|n| *n != root && self.is_leaf(graph, n))
			.collect();

		let toggled: Vec<LinkId> = graph
			.incident_links(root)
			.filter(|l| {
				let other = if l.source() == root { l.target() } else { l.source() };
				leaves.contains(other)
			})
			.map(|l| l.id.clone())
			.collect();

		for id in &toggled {
			if !self.hidden.remove(id) {
				self.hidden.insert(id.clone());
			}
		}
		self.recount(graph);
		debug!(
			"force-graph-engine: toggled {} leaf links of `{}`",
			toggled.len(),
			root
		);
		toggled
	}

	fn is_leaf(&self, graph: &Graph, id: &NodeId) -> bool {
		let (mut incoming, mut outgoing) = (0, 0);
		for link in graph.incident_links(id) {
			if self.hidden.contains(&link.id) {
				continue;
			}
			if link.target() == id {
				incoming += 1;
			}
			if link.source() == id {
				outgoing += 1;
			}
		}
		if graph.is_directed() {
			incoming <= 1 && outgoing < 1
		} else {
			incoming + outgoing <= 1
		}
	}

	/// Whether a link is currently shown.
	pub fn is_link_visible(&self, id: &LinkId) -> bool {
		!self.hidden.contains(id)
	}

	/// Whether a node is currently shown: nodes that never had links always
	/// are, others only while at least one of their links is visible.
	pub fn is_node_visible(&self, id: &NodeId) -> bool {
		!self.hidden_nodes.contains(id)
	}

	/// Rebuild the hidden-node set from per-node (total, visible) link counts.
	fn recount(&mut self, graph: &Graph) {
		self.hidden_nodes.clear();
		if self.hidden.is_empty() {
			return;
		}
		let mut degrees: HashMap<&NodeId, (usize, usize)> = HashMap::new();
		for link in graph.links() {
			let shown = usize::from(self.is_link_visible(&link.id));
			for end in [link.source(), link.target()] {
				let entry = degrees.entry(end).or_default();
				entry.0 += 1;
				entry.1 += shown;
			}
		}
		self.hidden_nodes.extend(
			degrees
				.into_iter()
				.filter(|(_, (total, visible))| *total > 0 && *visible == 0)
				.map(|(id, _)| id.clone()),
		);
	}

	/// Forget every hidden link.
	pub fn reset(&mut self) {
		self.hidden.clear();
		self.hidden_nodes.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::types::{GraphData, GraphLink, GraphNode};

	fn graph(nodes: &[&str], links: &[(&str, &str)], directed: bool) -> Graph {
		let data = GraphData {
			nodes: nodes.iter().map(|id| GraphNode::new(*id)).collect(),
			links: links.iter().map(|(s, t)| GraphLink::new(*s, *t)).collect(),
		};
		Graph::rebuild(None, &data, directed).unwrap().0
	}

	#[test]
	fn test_toggle_hides_and_restores_leaves() {
		// hub with two leaves and one neighbour that has another link
		let g = graph(
			&["hub", "l1", "l2", "mid", "far", "orphan"],
			&[("hub", "l1"), ("hub", "l2"), ("hub", "mid"), ("mid", "far")],
			false,
		);
		let mut state = CollapseState::default();
		let hub = NodeId::from("hub");

		let toggled = state.toggle(&g, &hub);
		assert_eq!(toggled, vec![LinkId::new("hub", "l1"), LinkId::new("hub", "l2")]);
		assert!(!state.is_link_visible(&LinkId::new("hub", "l1")));
		assert!(state.is_link_visible(&LinkId::new("hub", "mid")));
		assert!(!state.is_node_visible(&NodeId::from("l1")));
		assert!(state.is_node_visible(&hub));
		assert!(state.is_node_visible(&NodeId::from("orphan")));

		state.toggle(&g, &hub);
		assert!(g.links().all(|l| state.is_link_visible(&l.id)));
	}

	#[test]
	fn test_node_visibility_follows_each_toggle() {
		let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")], false);
		let mut state = CollapseState::default();
		let (a, b, c) = (NodeId::from("a"), NodeId::from("b"), NodeId::from("c"));

		state.toggle(&g, &b);
		assert!(!state.is_node_visible(&a));
		assert!(!state.is_node_visible(&c));
		// the root goes as well once none of its links is left
		assert!(!state.is_node_visible(&b));

		state.toggle(&g, &b);
		assert!([&a, &b, &c].iter().all(|n| state.is_node_visible(n)));

		state.toggle(&g, &b);
		state.reset();
		assert!(state.is_node_visible(&a));
	}

	#[test]
	fn test_directed_leaf_has_no_outgoing_links() {
		let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("c", "d")], true);
		let mut state = CollapseState::default();
		let toggled = state.toggle(&g, &NodeId::from("a"));
		assert_eq!(toggled, vec![LinkId::new("a", "b")]);
	}
}
