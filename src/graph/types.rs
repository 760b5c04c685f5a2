//! Graph data structures for input to the engine.
//!
//! The shapes mirror the JSON dataset hosts hand in:
//! `{ "nodes": [{ "id": .. }], "links": [{ "source": .., "target": .. }] }`.
//! Attributes the engine does not interpret are kept in `extra` so callbacks
//! and events still see the full datum.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::GraphResult;
use super::geometry::{LineType, Point, SelfLinkDirection};

/// Unique node identifier.
///
/// Datasets may use strings or integers; both normalize to the same textual id,
/// so `1` and `"1"` name the same node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
	/// Create an id from anything string-like.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The id as text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for NodeId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for NodeId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl<'de> Deserialize<'de> for NodeId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum RawId {
			Text(String),
			Signed(i64),
			Unsigned(u64),
		}

		Ok(match RawId::deserialize(deserializer)? {
			RawId::Text(s) => Self(s),
			RawId::Signed(n) => Self(n.to_string()),
			RawId::Unsigned(n) => Self(n.to_string()),
		})
	}
}

/// Marker shape drawn for a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SymbolType {
	#[default]
	/// Circle (the fallback for unknown names).
	Circle,
	/// Plus sign.
	Cross,
	/// Rhombus.
	Diamond,
	/// Square.
	Square,
	/// Five-pointed star.
	Star,
	/// Upward triangle.
	Triangle,
	/// Three-armed wye.
	Wye,
}

impl From<String> for SymbolType {
	fn from(name: String) -> Self {
		match name.as_str() {
			"cross" => Self::Cross,
			"diamond" => Self::Diamond,
			"square" => Self::Square,
			"star" => Self::Star,
			"triangle" => Self::Triangle,
			"wye" => Self::Wye,
			_ => Self::Circle,
		}
	}
}

impl From<SymbolType> for String {
	fn from(symbol: SymbolType) -> Self {
		match symbol {
			SymbolType::Circle => "circle",
			SymbolType::Cross => "cross",
			SymbolType::Diamond => "diamond",
			SymbolType::Square => "square",
			SymbolType::Star => "star",
			SymbolType::Triangle => "triangle",
			SymbolType::Wye => "wye",
		}
		.to_string()
	}
}

/// A node in the input dataset.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
	/// Unique identifier for this node. Used to reference nodes in links.
	pub id: NodeId,
	/// Initial x coordinate. Used verbatim when the graph is static.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	/// Initial y coordinate.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
	/// Fixed x coordinate; with `fy` the node starts pinned.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fx: Option<f64>,
	/// Fixed y coordinate.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fy: Option<f64>,
	/// Fill color override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	/// Label color override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub font_color: Option<String>,
	/// Highlight color override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub highlight_color: Option<String>,
	/// Symbol area override, in px².
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<f64>,
	/// Opacity override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub opacity: Option<f64>,
	/// Stroke color override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stroke_color: Option<String>,
	/// Stroke width override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stroke_width: Option<f64>,
	/// Symbol override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub symbol_type: Option<SymbolType>,
	/// Any other attributes, passed through to callbacks and events.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl GraphNode {
	/// A node with only an id.
	pub fn new(id: impl Into<NodeId>) -> Self {
		Self {
			id: id.into(),
			..Self::default()
		}
	}

	/// Set the initial position.
	pub fn with_position(mut self, x: f64, y: f64) -> Self {
		self.x = Some(x);
		self.y = Some(y);
		self
	}

	/// The node as a JSON object, as seen by callbacks and event listeners.
	pub fn datum(&self) -> Value {
		serde_json::to_value(self).unwrap_or(Value::Null)
	}
}

/// A link between two nodes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLink {
	/// Source node ID.
	pub source: NodeId,
	/// Target node ID.
	pub target: NodeId,
	/// Line type override.
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub line_type: Option<LineType>,
	/// Intermediate points the path passes through, in order.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub break_points: Vec<Point>,
	/// Self-link arc placement override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub self_link_direction: Option<SelfLinkDirection>,
	/// Stroke color override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	/// Opacity override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub opacity: Option<f64>,
	/// Stroke width override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stroke_width: Option<f64>,
	/// Weight used by semantic stroke width.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
	/// Any other attributes, passed through to callbacks and events.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl GraphLink {
	/// A plain link from `source` to `target`.
	pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			..Self::default()
		}
	}

	/// Set the line type.
	pub fn with_type(mut self, line_type: LineType) -> Self {
		self.line_type = Some(line_type);
		self
	}

	/// The link as a JSON object, as seen by callbacks and event listeners.
	pub fn datum(&self) -> Value {
		serde_json::to_value(self).unwrap_or(Value::Null)
	}
}

/// Complete graph data: nodes and links.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphData {
	/// Every node of the graph.
	#[serde(default)]
	pub nodes: Vec<GraphNode>,
	/// Every link of the graph; multi-edges and self-links are allowed.
	#[serde(default)]
	pub links: Vec<GraphLink>,
}

impl GraphData {
	/// Parse a JSON dataset.
	pub fn from_json(json: &str) -> GraphResult<Self> {
		Ok(serde_json::from_str(json)?)
	}
}
