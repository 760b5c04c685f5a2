//! Error types for dataset ingestion and graph lookups.

use thiserror::Error;

use super::model::LinkId;
use super::types::NodeId;

/// Failures raised while building or querying a graph.
///
/// Data-integrity variants are never recovered from silently: dropping the
/// offending node or link would leave the adjacency map inconsistent.
#[derive(Debug, Error)]
pub enum GraphError {
	/// Two input nodes share the same id.
	#[error("duplicate node id `{0}`")]
	DuplicateNode(NodeId),

	/// A link names an endpoint that is not among the input nodes.
	#[error("link `{link}` references unknown node `{node}`")]
	UnknownLinkEndpoint {
		/// The offending link.
		link: LinkId,
		/// The endpoint id that did not resolve.
		node: NodeId,
	},

	/// An operation named a node that is not in the current graph.
	#[error("node `{0}` not found")]
	NodeNotFound(NodeId),

	/// An operation named a link that is not in the current graph.
	#[error("link `{0}` not found")]
	LinkNotFound(LinkId),

	/// The dataset could not be parsed.
	#[error("invalid graph data: {0}")]
	InvalidData(#[from] serde_json::Error),
}

/// Result alias used across the graph modules.
pub type GraphResult<T> = Result<T, GraphError>;
