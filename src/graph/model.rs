//! Indexed graph snapshot built from the input dataset.
//!
//! A [`Graph`] is rebuilt on every dataset update and never mutated afterwards.
//! Rebuilding validates the input, assigns stable link ids, counts degrees and
//! builds the adjacency map in a single pass over the links. The [`GraphDiff`]
//! it returns tells the layout which nodes to carry forward and which to seed.

use std::collections::HashMap;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use log::info;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::error::{GraphError, GraphResult};
use super::types::{GraphData, GraphLink, GraphNode, NodeId};

/// Stable link identifier.
///
/// Derived from the endpoints and the occurrence index among links with the
/// same endpoints, so re-sending an unchanged dataset keeps every id and
/// multi-edges stay distinct.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId {
	/// Source node.
	pub source: NodeId,
	/// Target node.
	pub target: NodeId,
	/// 0 for the first link between this ordered pair, 1 for the second, ...
	pub occurrence: usize,
}

impl LinkId {
	/// Id of the first link from `source` to `target`.
	pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			occurrence: 0,
		}
	}

	/// Whether this link starts and ends on the same node.
	pub fn is_self_link(&self) -> bool {
		self.source == self.target
	}
}

impl fmt::Display for LinkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{},{}", self.source, self.target)?;
		if self.occurrence > 0 {
			write!(f, "#{}", self.occurrence)?;
		}
		Ok(())
	}
}

impl Serialize for LinkId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// A node of the snapshot.
#[derive(Clone, Debug)]
pub struct NodeRecord {
	/// Input attributes.
	pub data: GraphNode,
	/// Number of links touching this node (a self-link counts once).
	pub degree: usize,
	datum: Value,
}

impl NodeRecord {
	/// Node id.
	pub fn id(&self) -> &NodeId {
		&self.data.id
	}

	/// The full input datum as JSON.
	pub fn datum(&self) -> &Value {
		&self.datum
	}
}

/// A link of the snapshot.
#[derive(Clone, Debug)]
pub struct LinkRecord {
	/// Stable id.
	pub id: LinkId,
	/// Input attributes.
	pub data: GraphLink,
	datum: Value,
}

impl LinkRecord {
	/// Source node id.
	pub fn source(&self) -> &NodeId {
		&self.id.source
	}

	/// Target node id.
	pub fn target(&self) -> &NodeId {
		&self.id.target
	}

	/// The full input datum as JSON.
	pub fn datum(&self) -> &Value {
		&self.datum
	}
}

/// Neighbour sets per node.
///
/// Undirected graphs register every link in both directions. Directed graphs
/// register only source → target.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjacencyMap {
	neighbors: IndexMap<NodeId, IndexSet<NodeId>>,
}

impl AdjacencyMap {
	fn with_nodes<'a>(ids: impl Iterator<Item = &'a NodeId>) -> Self {
		Self {
			neighbors: ids.map(|id| (id.clone(), IndexSet::new())).collect(),
		}
	}

	fn connect(&mut self, from: &NodeId, to: &NodeId) {
		if let Some(set) = self.neighbors.get_mut(from) {
			set.insert(to.clone());
		}
	}

	/// Nodes reachable from `id` in one hop.
	pub fn neighbors(&self, id: &NodeId) -> impl Iterator<Item = &NodeId> {
		self.neighbors.get(id).into_iter().flatten()
	}

	/// Whether `to` is reachable from `from` in one hop.
	pub fn contains(&self, from: &NodeId, to: &NodeId) -> bool {
		self.neighbors.get(from).is_some_and(|set| set.contains(to))
	}

	/// Number of nodes with an entry.
	pub fn len(&self) -> usize {
		self.neighbors.len()
	}

	/// Whether the map has no nodes.
	pub fn is_empty(&self) -> bool {
		self.neighbors.is_empty()
	}

	/// Iterate every `(node, neighbours)` entry.
	pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &IndexSet<NodeId>)> {
		self.neighbors.iter()
	}
}

/// What changed between two consecutive snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphDiff {
	/// Nodes that did not exist before.
	pub added_nodes: Vec<NodeId>,
	/// Nodes that no longer exist.
	pub removed_nodes: Vec<NodeId>,
	/// Links that did not exist before.
	pub added_links: Vec<LinkId>,
	/// Links that no longer exist.
	pub removed_links: Vec<LinkId>,
}

impl GraphDiff {
	/// Whether any node or link was added or removed.
	pub fn is_structural(&self) -> bool {
		!(self.added_nodes.is_empty()
			&& self.removed_nodes.is_empty()
			&& self.added_links.is_empty()
			&& self.removed_links.is_empty())
	}
}

/// Immutable graph snapshot: nodes, links and adjacency.
///
/// Every link endpoint is guaranteed to exist among the nodes.
#[derive(Clone, Debug, Default)]
pub struct Graph {
	nodes: IndexMap<NodeId, NodeRecord>,
	links: IndexMap<LinkId, LinkRecord>,
	adjacency: AdjacencyMap,
	directed: bool,
}

impl Graph {
	/// Build a snapshot from a dataset, diffing against `previous` when given.
	pub fn rebuild(
		previous: Option<&Graph>,
		data: &GraphData,
		directed: bool,
	) -> GraphResult<(Graph, GraphDiff)> {
		let mut nodes = IndexMap::with_capacity(data.nodes.len());
		for node in &data.nodes {
			if nodes.contains_key(&node.id) {
				return Err(GraphError::DuplicateNode(node.id.clone()));
			}
			nodes.insert(
				node.id.clone(),
				NodeRecord {
					data: node.clone(),
					degree: 0,
					datum: node.datum(),
				},
			);
		}

		let mut adjacency = AdjacencyMap::with_nodes(nodes.keys());
		let mut links = IndexMap::with_capacity(data.links.len());
		let mut occurrences: HashMap<(&NodeId, &NodeId), usize> = HashMap::new();

		for link in &data.links {
			let occurrence = occurrences.entry((&link.source, &link.target)).or_insert(0);
			let id = LinkId {
				source: link.source.clone(),
				target: link.target.clone(),
				occurrence: *occurrence,
			};
			*occurrence += 1;

			for end in [&link.source, &link.target] {
				if !nodes.contains_key(end) {
					return Err(GraphError::UnknownLinkEndpoint {
						link: id,
						node: end.clone(),
					});
				}
			}

			if let Some(record) = nodes.get_mut(&link.source) {
				record.degree += 1;
			}
			if !id.is_self_link() {
				if let Some(record) = nodes.get_mut(&link.target) {
					record.degree += 1;
				}
			}

			adjacency.connect(&link.source, &link.target);
			if !directed {
				adjacency.connect(&link.target, &link.source);
			}

			links.insert(
				id.clone(),
				LinkRecord {
					id,
					data: link.clone(),
					datum: link.datum(),
				},
			);
		}

		let graph = Graph {
			nodes,
			links,
			adjacency,
			directed,
		};
		let diff = graph.diff_from(previous);
		info!(
			"force-graph-engine: rebuilt graph with {} nodes, {} links (+{}/-{} nodes)",
			graph.nodes.len(),
			graph.links.len(),
			diff.added_nodes.len(),
			diff.removed_nodes.len()
		);
		Ok((graph, diff))
	}

	fn diff_from(&self, previous: Option<&Graph>) -> GraphDiff {
		let Some(previous) = previous else {
			return GraphDiff {
				added_nodes: self.nodes.keys().cloned().collect(),
				added_links: self.links.keys().cloned().collect(),
				..GraphDiff::default()
			};
		};

		GraphDiff {
			added_nodes: keys_missing_from(&self.nodes, &previous.nodes),
			removed_nodes: keys_missing_from(&previous.nodes, &self.nodes),
			added_links: keys_missing_from(&self.links, &previous.links),
			removed_links: keys_missing_from(&previous.links, &self.links),
		}
	}

	/// A new snapshot without `id` and every link touching it.
	pub fn without_node(&self, id: &NodeId) -> GraphResult<(Graph, GraphDiff)> {
		if !self.nodes.contains_key(id) {
			return Err(GraphError::NodeNotFound(id.clone()));
		}
		Graph::rebuild(Some(self), &self.to_data_without(id), self.directed)
	}

	fn to_data_without(&self, id: &NodeId) -> GraphData {
		GraphData {
			nodes: self
				.nodes
				.values()
				.filter(|n| n.id() != id)
				.map(|n| n.data.clone())
				.collect(),
			links: self
				.links
				.values()
				.filter(|l| l.source() != id && l.target() != id)
				.map(|l| l.data.clone())
				.collect(),
		}
	}

	/// Node by id.
	pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
		self.nodes.get(id)
	}

	/// Link by id.
	pub fn link(&self, id: &LinkId) -> Option<&LinkRecord> {
		self.links.get(id)
	}

	/// All nodes, in input order.
	pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
		self.nodes.values()
	}

	/// All links, in input order.
	pub fn links(&self) -> impl Iterator<Item = &LinkRecord> {
		self.links.values()
	}

	/// Links touching `id` on either end.
	pub fn incident_links<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a LinkRecord> {
		self.links
			.values()
			.filter(move |l| l.source() == id || l.target() == id)
	}

	/// Position of a node in input order.
	pub fn node_index(&self, id: &NodeId) -> Option<usize> {
		self.nodes.get_index_of(id)
	}

	/// Whether the node exists.
	pub fn contains_node(&self, id: &NodeId) -> bool {
		self.nodes.contains_key(id)
	}

	/// Number of nodes.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of links.
	pub fn link_count(&self) -> usize {
		self.links.len()
	}

	/// The adjacency map.
	pub fn adjacency(&self) -> &AdjacencyMap {
		&self.adjacency
	}

	/// Whether links only traverse source → target.
	pub fn is_directed(&self) -> bool {
		self.directed
	}
}

fn keys_missing_from<K, A, B>(from: &IndexMap<K, A>, other: &IndexMap<K, B>) -> Vec<K>
where
	K: Clone + Eq + std::hash::Hash,
{
	from.keys().filter(|k| !other.contains_key(*k)).cloned().collect()
}

/// Every node reachable from `id` through links in either direction, in link order.
pub(crate) fn undirected_neighbors<'a>(graph: &'a Graph, id: &'a NodeId) -> IndexSet<&'a NodeId> {
	if !graph.is_directed() {
		return graph.adjacency().neighbors(id).filter(|n| *n != id).collect();
	}
	graph
		.incident_links(id)
		.map(|l| if l.source() == id { l.target() } else { l.source() })
		.filter(|n| *n != id)
		.collect()
}
