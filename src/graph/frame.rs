//! Render-ready snapshot handed to the drawing layer.
//!
//! A [`Frame`] is a read-only copy of everything a renderer needs: node
//! positions with their display attributes already resolved, link path
//! definitions, highlight flags and the view transform. Per-datum overrides win
//! over the configured defaults; highlight styling is applied on top.

use serde::Serialize;
use serde_json::Value;

use super::config::{ResolvedConfig, SAME};
use super::collapse::CollapseState;
use super::geometry::{LinkGeometry, Point, build_link_path};
use super::highlight::HighlightSet;
use super::layout::LayoutEngine;
use super::model::{Graph, LinkId, LinkRecord, NodeRecord};
use super::types::{NodeId, SymbolType};
use super::view::ViewTransform;

/// One node as it should be drawn.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFrame {
	/// Node id.
	pub id: NodeId,
	/// Position in graph space.
	pub x: f64,
	/// Position in graph space.
	pub y: f64,
	/// Whether the node is part of the active highlight.
	pub highlighted: bool,
	/// Whether the node is held in place.
	pub pinned: bool,
	/// Fill color.
	pub color: String,
	/// Opacity, lowered while another part of the graph is highlighted.
	pub opacity: f64,
	/// Symbol area in px².
	pub size: f64,
	/// Symbol shape.
	pub symbol_type: SymbolType,
	/// Stroke color.
	pub stroke_color: String,
	/// Stroke width.
	pub stroke_width: f64,
	/// Label text; absent when labels are off or the datum has no label.
	pub label: Option<String>,
	/// Label color.
	pub font_color: String,
	/// Label size.
	pub font_size: f64,
	/// Label weight.
	pub font_weight: String,
	/// Output of the `node.viewGenerator` callback, if configured.
	pub view: Option<Value>,
}

/// One link as it should be drawn.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFrame {
	/// Link id.
	pub id: LinkId,
	/// Source node id.
	pub source: NodeId,
	/// Target node id.
	pub target: NodeId,
	/// Path-definition string (`M`, `L` and `A` commands).
	pub path_definition: String,
	/// Points the path passes through, for hit-testing.
	pub points: Vec<Point>,
	/// Whether the link is part of the active highlight.
	pub highlighted: bool,
	/// Stroke color.
	pub color: String,
	/// Opacity, lowered while another part of the graph is highlighted.
	pub opacity: f64,
	/// Stroke width, scaled by `value` when semantic widths are on.
	pub stroke_width: f64,
	/// Label text; absent unless link labels are on.
	pub label: Option<String>,
	/// Label color.
	pub font_color: String,
	/// Label size.
	pub font_size: f64,
	/// Whether the renderer should draw an arrow marker.
	pub directed: bool,
}

/// Everything drawn in one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Frame {
	/// Visible nodes, in input order.
	pub nodes: Vec<NodeFrame>,
	/// Visible links, in input order.
	pub links: Vec<LinkFrame>,
	/// Pan and zoom applied to the whole graph.
	pub transform: ViewTransform,
}

impl Frame {
	/// Node by id.
	pub fn node(&self, id: &NodeId) -> Option<&NodeFrame> {
		self.nodes.iter().find(|n| &n.id == id)
	}

	/// Link by id.
	pub fn link(&self, id: &LinkId) -> Option<&LinkFrame> {
		self.links.iter().find(|l| &l.id == id)
	}
}

/// Borrowed state a frame is assembled from.
pub struct FrameSource<'a> {
	/// Current graph snapshot.
	pub graph: &'a Graph,
	/// Owner of the positions.
	pub layout: &'a LayoutEngine,
	/// Resolved highlight set.
	pub highlight: &'a HighlightSet,
	/// Collapsed links.
	pub collapse: &'a CollapseState,
	/// Resolved configuration.
	pub config: &'a ResolvedConfig,
	/// Current view transform.
	pub transform: ViewTransform,
}

impl FrameSource<'_> {
	/// Assemble the frame.
	pub fn build(&self) -> Frame {
		let nodes = self
			.graph
			.nodes()
			.filter(|n| self.collapse.is_node_visible(n.id()))
			.filter_map(|n| self.node_frame(n))
			.collect();
		let links = self
			.graph
			.links()
			.filter(|l| self.collapse.is_link_visible(&l.id))
			.filter_map(|l| self.link_frame(l))
			.collect();
		Frame {
			nodes,
			links,
			transform: self.transform,
		}
	}

	fn node_frame(&self, node: &NodeRecord) -> Option<NodeFrame> {
		let body = self.layout.body(node.id())?;
		let defaults = &self.config.config.node;
		let data = &node.data;
		let active = !self.highlight.is_empty();
		let highlighted = self.highlight.nodes.contains(node.id());

		let color = data.color.clone().unwrap_or_else(|| defaults.color.clone());
		let stroke_color = data
			.stroke_color
			.clone()
			.unwrap_or_else(|| defaults.stroke_color.clone());
		let opacity = data.opacity.unwrap_or(defaults.opacity);

		let (color, stroke_color, font_size, font_weight) = if highlighted && active {
			let highlight_color = data.highlight_color.as_deref().unwrap_or(&defaults.highlight_color);
			(
				inherit(highlight_color, color),
				inherit(&defaults.highlight_stroke_color, stroke_color),
				defaults.highlight_font_size,
				defaults.highlight_font_weight.clone(),
			)
		} else {
			(color, stroke_color, defaults.font_size, defaults.font_weight.clone())
		};

		let label = if defaults.render_label {
			match self.config.callback("node.labelProperty") {
				Some(f) => text(&f(node.datum())),
				None => text(&node.datum()[defaults.label_property.as_str()]),
			}
		} else {
			None
		};

		Some(NodeFrame {
			id: node.id().clone(),
			x: body.x,
			y: body.y,
			highlighted,
			pinned: body.is_pinned(),
			color,
			opacity: if active && !highlighted {
				self.config.config.highlight_opacity
			} else {
				opacity
			},
			size: data.size.unwrap_or(defaults.size),
			symbol_type: data.symbol_type.unwrap_or(defaults.symbol_type),
			stroke_color,
			stroke_width: data.stroke_width.unwrap_or(defaults.stroke_width),
			label,
			font_color: data
				.font_color
				.clone()
				.unwrap_or_else(|| defaults.font_color.clone()),
			font_size,
			font_weight,
			view: self
				.config
				.callback("node.viewGenerator")
				.map(|f| f(node.datum())),
		})
	}

	fn link_frame(&self, link: &LinkRecord) -> Option<LinkFrame> {
		let source = self.layout.position(link.source())?;
		let target = self.layout.position(link.target())?;
		let defaults = &self.config.config.link;
		let data = &link.data;
		let active = !self.highlight.is_empty();
		let highlighted = self.highlight.links.contains(&link.id);

		let path = build_link_path(&LinkGeometry {
			source,
			target,
			line_type: data.line_type.unwrap_or(defaults.line_type),
			break_points: &data.break_points,
			source_id: link.source(),
			target_id: link.target(),
			self_link_direction: data.self_link_direction.unwrap_or(defaults.self_link_direction),
		});

		let color = data.color.clone().unwrap_or_else(|| defaults.color.clone());
		let color = if highlighted && active {
			inherit(&defaults.highlight_color, color)
		} else {
			color
		};

		let mut stroke_width = data.stroke_width.unwrap_or(defaults.stroke_width);
		if defaults.semantic_stroke_width {
			stroke_width += data.value.unwrap_or(1.0) * stroke_width / 10.0;
		}

		let label = if defaults.render_label {
			match self.config.callback("link.labelProperty") {
				Some(f) => text(&f(link.datum())),
				None => text(&link.datum()[defaults.label_property.as_str()]),
			}
		} else {
			None
		};

		Some(LinkFrame {
			id: link.id.clone(),
			source: link.source().clone(),
			target: link.target().clone(),
			path_definition: path.definition(),
			points: path.points(),
			highlighted,
			color,
			opacity: if active && !highlighted {
				self.config.config.highlight_opacity
			} else {
				data.opacity.unwrap_or(defaults.opacity)
			},
			stroke_width,
			label,
			font_color: defaults.font_color.clone(),
			font_size: defaults.font_size,
			directed: self.config.config.directed,
		})
	}
}

/// `value`, or `base` when `value` is the [`SAME`] marker.
fn inherit(value: &str, base: String) -> String {
	if value == SAME { base } else { value.to_string() }
}

fn text(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(s) => Some(s.clone()),
		other => Some(other.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::graph::config::{ConfigEntry, resolve};
	use crate::graph::highlight::traverse;
	use crate::graph::types::{GraphData, GraphLink, GraphNode};

	struct Fixture {
		graph: Graph,
		layout: LayoutEngine,
		config: ResolvedConfig,
	}

	impl Fixture {
		fn new(data: GraphData, user: serde_json::Value) -> Self {
			let config = resolve(Some(&ConfigEntry::from(user)));
			let (graph, diff) = Graph::rebuild(None, &data, config.config.directed).unwrap();
			let mut layout = LayoutEngine::new(&config.config);
			layout.sync(&graph, &diff, &config.config);
			Self { graph, layout, config }
		}

		fn build(&self, highlight: &HighlightSet, collapse: &CollapseState) -> Frame {
			FrameSource {
				graph: &self.graph,
				layout: &self.layout,
				highlight,
				collapse,
				config: &self.config,
				transform: ViewTransform::default(),
			}
			.build()
		}
	}

	fn line() -> GraphData {
		let mut b = GraphNode::new("b").with_position(100.0, 0.0);
		b.color = Some("blue".into());
		let mut link = GraphLink::new("a", "b");
		link.value = Some(5.0);
		link.extra.insert("label".into(), json!("a to b"));
		GraphData {
			nodes: vec![
				GraphNode::new("a").with_position(0.0, 0.0),
				b,
				GraphNode::new("c").with_position(0.0, 100.0),
			],
			links: vec![link],
		}
	}

	#[test]
	fn test_static_frame_uses_dataset_positions() {
		let f = Fixture::new(line(), json!({ "staticGraph": true }));
		let frame = f.build(&HighlightSet::default(), &CollapseState::default());

		let b = frame.node(&NodeId::from("b")).unwrap();
		assert_eq!((b.x, b.y), (100.0, 0.0));
		assert_eq!(b.color, "blue");
		assert_eq!(b.label.as_deref(), Some("b"));

		let link = frame.link(&LinkId::new("a", "b")).unwrap();
		assert_eq!(link.path_definition, "M0,-3 L90,-3 A0,0 0 0,1 100,-3");
		assert_eq!(link.stroke_width, 1.5);
		assert_eq!(link.label, None);
		assert!(!link.directed);
	}

	#[test]
	fn test_highlight_styles_and_dims_the_rest() {
		let f = Fixture::new(
			line(),
			json!({
				"staticGraph": true,
				"highlightOpacity": 0.2,
				"node": { "highlightColor": "red", "highlightFontWeight": "bold", "strokeColor": "white" }
			}),
		);
		let set = traverse(&f.graph, &NodeId::from("a"), 1);
		let frame = f.build(&set, &CollapseState::default());

		let a = frame.node(&NodeId::from("a")).unwrap();
		assert!(a.highlighted);
		assert_eq!(a.color, "red");
		assert_eq!(a.stroke_color, "white");
		assert_eq!(a.font_weight, "bold");
		assert_eq!(a.opacity, 1.0);

		let c = frame.node(&NodeId::from("c")).unwrap();
		assert!(!c.highlighted);
		assert_eq!(c.color, "#d3d3d3");
		assert_eq!(c.opacity, 0.2);

		let link = &frame.links[0];
		assert!(link.highlighted);
		assert_eq!(link.color, "#d3d3d3");
	}

	#[test]
	fn test_semantic_width_labels_and_direction() {
		let f = Fixture::new(
			line(),
			json!({
				"staticGraph": true,
				"directed": true,
				"link": { "semanticStrokeWidth": true, "strokeWidth": 2, "renderLabel": true }
			}),
		);
		let frame = f.build(&HighlightSet::default(), &CollapseState::default());
		let link = &frame.links[0];
		assert_eq!(link.stroke_width, 3.0);
		assert_eq!(link.label.as_deref(), Some("a to b"));
		assert!(link.directed);
	}

	#[test]
	fn test_label_and_view_callbacks() {
		let user = ConfigEntry::from(json!({ "staticGraph": true })).with(
			"node",
			ConfigEntry::tree([
				(
					"labelProperty",
					ConfigEntry::callback(|d| json!(format!("node {}", d["id"].as_str().unwrap_or("?")))),
				),
				("viewGenerator", ConfigEntry::callback(|d| json!({ "tag": d["id"] }))),
			]),
		);
		let config = resolve(Some(&user));
		let (graph, diff) = Graph::rebuild(None, &line(), false).unwrap();
		let mut layout = LayoutEngine::new(&config.config);
		layout.sync(&graph, &diff, &config.config);

		let frame = FrameSource {
			graph: &graph,
			layout: &layout,
			highlight: &HighlightSet::default(),
			collapse: &CollapseState::default(),
			config: &config,
			transform: ViewTransform::default(),
		}
		.build();

		let a = frame.node(&NodeId::from("a")).unwrap();
		assert_eq!(a.label.as_deref(), Some("node a"));
		assert_eq!(a.view, Some(json!({ "tag": "a" })));
	}

	#[test]
	fn test_collapsed_elements_are_omitted() {
		let f = Fixture::new(line(), json!({ "staticGraph": true, "collapsible": true }));
		let mut collapse = CollapseState::default();
		collapse.toggle(&f.graph, &NodeId::from("a"));
		let frame = f.build(&HighlightSet::default(), &collapse);

		assert!(frame.links.is_empty());
		let ids: Vec<&str> = frame.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["c"]);
	}
}
