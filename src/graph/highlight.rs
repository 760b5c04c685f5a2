//! Hover-driven highlight propagation.
//!
//! Focusing a node highlights everything within `highlight_degree` hops of it
//! (breadth-first over the adjacency map); focusing a link highlights the link
//! and its two endpoints. The highlighted set is always recomputed from scratch
//! from the current focus, so repeated hover cycles cannot accumulate state.

use std::collections::{HashMap, HashSet, VecDeque};

use super::model::{Graph, LinkId};
use super::types::NodeId;

/// What the pointer is resting on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HighlightFocus {
	/// A node, expanded by hop count.
	Node(NodeId),
	/// A single link.
	Link(LinkId),
}

/// Highlighted nodes and links.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HighlightSet {
	/// Highlighted nodes.
	pub nodes: HashSet<NodeId>,
	/// Highlighted links.
	pub links: HashSet<LinkId>,
}

impl HighlightSet {
	/// Whether nothing is highlighted.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.links.is_empty()
	}
}

/// Breadth-first expansion from `focus` up to `degree` hops.
///
/// A link is highlighted when both endpoints were reached and at least one of
/// them lies strictly inside the hop limit, i.e. the link is one of the hops
/// taken. With `degree = 1` that is exactly the links touching `focus`.
pub fn traverse(graph: &Graph, focus: &NodeId, degree: u32) -> HighlightSet {
	let mut set = HighlightSet::default();
	if !graph.contains_node(focus) {
		return set;
	}

	let mut depth: HashMap<&NodeId, u32> = HashMap::from([(focus, 0)]);
	let mut queue = VecDeque::from([focus]);
	while let Some(id) = queue.pop_front() {
		let d = depth[id];
		if d >= degree {
			continue;
		}
		for next in graph.adjacency().neighbors(id) {
			if !depth.contains_key(next) {
				depth.insert(next, d + 1);
				queue.push_back(next);
			}
		}
	}

	for link in graph.links() {
		let (Some(&ds), Some(&dt)) = (depth.get(link.source()), depth.get(link.target())) else {
			continue;
		};
		let hop = if graph.is_directed() { ds < degree && dt <= ds + 1 } else { ds.min(dt) < degree };
		if hop {
			set.links.insert(link.id.clone());
		}
	}
	set.nodes = depth.into_keys().cloned().collect();
	set
}

/// Current focus and the set it produces.
///
/// Focus changes are cheap and only mark the set stale; the traversal runs at
/// most once per [`HighlightState::resolve`] call no matter how many focus
/// changes happened in between.
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	focus: Option<HighlightFocus>,
	set: HighlightSet,
	stale: bool,
}

impl HighlightState {
	/// Change the focus. `None` clears every highlight.
	pub fn set_focus(&mut self, focus: Option<HighlightFocus>) {
		if self.focus != focus {
			self.focus = focus;
			self.stale = true;
		}
	}

	/// Current focus.
	pub fn focus(&self) -> Option<&HighlightFocus> {
		self.focus.as_ref()
	}

	/// Force recomputation, e.g. after the graph changed underneath the focus.
	pub fn invalidate(&mut self) {
		self.stale = true;
	}

	/// Recompute the highlighted set if the focus or graph changed.
	pub fn resolve(&mut self, graph: &Graph, degree: u32) -> &HighlightSet {
		if self.stale {
			self.set = match &self.focus {
				None => HighlightSet::default(),
				Some(HighlightFocus::Node(id)) => traverse(graph, id, degree),
				Some(HighlightFocus::Link(id)) => match graph.link(id) {
					Some(link) => HighlightSet {
						nodes: HashSet::from([link.source().clone(), link.target().clone()]),
						links: HashSet::from([id.clone()]),
					},
					None => HighlightSet::default(),
				},
			};
			if self.set.is_empty() {
				self.focus = None;
			}
			self.stale = false;
		}
		&self.set
	}

	/// Whether a highlight is showing.
	pub fn is_active(&self) -> bool {
		!self.set.is_empty()
	}

	/// Whether `id` is highlighted as of the last resolve.
	pub fn is_node_highlighted(&self, id: &NodeId) -> bool {
		self.set.nodes.contains(id)
	}

	/// Whether `id` is highlighted as of the last resolve.
	pub fn is_link_highlighted(&self, id: &LinkId) -> bool {
		self.set.links.contains(id)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::graph::types::{GraphData, GraphLink, GraphNode};

	fn graph(links: &[(&str, &str)], directed: bool) -> Graph {
		let mut nodes: Vec<&str> = links.iter().flat_map(|(s, t)| [*s, *t]).collect();
		nodes.sort();
		nodes.dedup();
		let data = GraphData {
			nodes: nodes.into_iter().map(GraphNode::new).collect(),
			links: links.iter().map(|(s, t)| GraphLink::new(*s, *t)).collect(),
		};
		Graph::rebuild(None, &data, directed).unwrap().0
	}

	fn ids(set: &HashSet<NodeId>) -> Vec<&str> {
		let mut v: Vec<&str> = set.iter().map(NodeId::as_str).collect();
		v.sort();
		v
	}

	fn links(set: &HashSet<LinkId>) -> Vec<String> {
		let mut v: Vec<String> = set.iter().map(ToString::to_string).collect();
		v.sort();
		v
	}

	// a - b - c - d, plus b - e and a triangle edge b - x - a
	const EDGES: &[(&str, &str)] = &[("a", "b"), ("b", "c"), ("c", "d"), ("b", "e"), ("a", "x"), ("x", "b")];

	#[test]
	fn test_degree_one_is_direct_neighbourhood() {
		let g = graph(EDGES, false);
		let set = traverse(&g, &NodeId::from("a"), 1);
		assert_eq!(ids(&set.nodes), vec!["a", "b", "x"]);
		assert_eq!(links(&set.links), vec!["a,b", "a,x"]);
	}

	#[test]
	fn test_degree_zero_is_focus_only() {
		let g = graph(EDGES, false);
		let set = traverse(&g, &NodeId::from("b"), 0);
		assert_eq!(ids(&set.nodes), vec!["b"]);
		assert!(set.links.is_empty());
	}

	#[test]
	fn test_degree_two_reaches_second_ring() {
		let g = graph(EDGES, false);
		let set = traverse(&g, &NodeId::from("a"), 2);
		assert_eq!(ids(&set.nodes), vec!["a", "b", "c", "e", "x"]);
		assert_eq!(links(&set.links), vec!["a,b", "a,x", "b,c", "b,e", "x,b"]);
	}

	#[test]
	fn test_directed_follows_out_links() {
		let g = graph(&[("a", "b"), ("c", "a")], true);
		let set = traverse(&g, &NodeId::from("a"), 1);
		assert_eq!(ids(&set.nodes), vec!["a", "b"]);
		assert_eq!(links(&set.links), vec!["a,b"]);
	}

	#[test]
	fn test_focus_leave_and_idempotence() {
		let g = graph(EDGES, false);
		let mut state = HighlightState::default();

		state.set_focus(Some(HighlightFocus::Node(NodeId::from("c"))));
		let once = state.resolve(&g, 1).clone();
		state.set_focus(Some(HighlightFocus::Node(NodeId::from("c"))));
		state.invalidate();
		assert_eq!(state.resolve(&g, 1), &once);
		assert!(state.is_node_highlighted(&NodeId::from("d")));

		for _ in 0..3 {
			state.set_focus(Some(HighlightFocus::Node(NodeId::from("a"))));
			state.resolve(&g, 1);
			state.set_focus(None);
			state.resolve(&g, 1);
		}
		assert!(!state.is_active());
		assert!(g.nodes().all(|n| !state.is_node_highlighted(n.id())));
		assert!(g.links().all(|l| !state.is_link_highlighted(&l.id)));
	}

	#[test]
	fn test_link_focus_highlights_endpoints() {
		let g = graph(EDGES, false);
		let mut state = HighlightState::default();
		state.set_focus(Some(HighlightFocus::Link(LinkId::new("c", "d"))));
		let set = state.resolve(&g, 3);
		assert_eq!(ids(&set.nodes), vec!["c", "d"]);
		assert_eq!(links(&set.links), vec!["c,d"]);
	}

	#[test]
	fn test_focus_on_missing_node_clears() {
		let g = graph(EDGES, false);
		let mut state = HighlightState::default();
		state.set_focus(Some(HighlightFocus::Node(NodeId::from("nope"))));
		assert!(state.resolve(&g, 1).is_empty());
		assert_eq!(state.focus(), None);
	}
}
