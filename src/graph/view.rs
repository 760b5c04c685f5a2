//! Zoom, pan and node-drag interaction state.
//!
//! The transform maps graph space to screen space as
//! `screen = graph * k + (x, y)`. Zoom is clamped to the configured bounds;
//! out-of-range requests land on the bound instead of being rejected.
//!
//! Dragging pins the node through [`LayoutEngine::pin`]; the controller never
//! writes node positions itself.

use log::debug;
use serde::Serialize;

use super::config::GraphConfig;
use super::geometry::Point;
use super::layout::LayoutEngine;
use super::types::NodeId;

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ViewTransform {
	/// Horizontal translation in screen pixels.
	pub x: f64,
	/// Vertical translation in screen pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

/// Tracks an in-progress node drag operation.
#[derive(Clone, Debug, PartialEq)]
pub struct DragState {
	/// Node being dragged.
	pub node: NodeId,
	/// Screen position where the drag started.
	pub start: Point,
	/// Graph position of the node when the drag started.
	pub node_start: Point,
	/// Whether the node was pinned before the drag.
	pub was_pinned: bool,
}

/// What happened when a drag ended.
#[derive(Clone, Debug, PartialEq)]
pub struct DragRelease {
	/// The dropped node.
	pub node: NodeId,
	/// Where it was dropped.
	pub position: Point,
	/// Whether the pin was released and the layout restarted.
	pub rearranged: bool,
}

/// Owns the view transform and drag lifecycle.
#[derive(Clone, Debug)]
pub struct ViewController {
	transform: ViewTransform,
	min_zoom: f64,
	max_zoom: f64,
	pan_and_zoom: bool,
	drag_enabled: bool,
	rearrange_on_drop: bool,
	drag_alpha: f64,
	drag: Option<DragState>,
}

impl ViewController {
	/// A controller at the initial zoom (identity when unset).
	pub fn new(config: &GraphConfig) -> Self {
		let mut view = Self {
			transform: ViewTransform::default(),
			min_zoom: 0.0,
			max_zoom: 0.0,
			pan_and_zoom: false,
			drag_enabled: false,
			rearrange_on_drop: false,
			drag_alpha: 0.0,
			drag: None,
		};
		view.reconfigure(config);
		if let Some(k) = config.initial_zoom {
			view.transform.k = view.clamp_zoom(k);
		}
		view
	}

	/// Apply new bounds and switches; the current zoom is re-clamped.
	pub fn reconfigure(&mut self, config: &GraphConfig) {
		(self.min_zoom, self.max_zoom) = config.zoom_bounds();
		self.pan_and_zoom = config.pan_and_zoom;
		self.drag_enabled = config.drag_enabled();
		self.rearrange_on_drop = config.automatic_rearrange_after_drop_node;
		self.drag_alpha = config.d3.alpha_target;
		self.transform.k = self.clamp_zoom(self.transform.k);
	}

	/// Current transform.
	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	/// Zoom bounds in effect.
	pub fn zoom_bounds(&self) -> (f64, f64) {
		(self.min_zoom, self.max_zoom)
	}

	fn clamp_zoom(&self, k: f64) -> f64 {
		if k.is_nan() {
			return self.transform.k.clamp(self.min_zoom, self.max_zoom);
		}
		k.clamp(self.min_zoom, self.max_zoom)
	}

	/// Convert a screen position to graph space.
	pub fn screen_to_graph(&self, screen: Point) -> Point {
		let t = self.transform;
		Point::new((screen.x - t.x) / t.k, (screen.y - t.y) / t.k)
	}

	/// Zoom to `k` keeping the graph point under `anchor` (screen space) fixed.
	///
	/// Returns `(previous, new)` zoom when the zoom level changed.
	pub fn zoom_to(&mut self, k: f64, anchor: Point) -> Option<(f64, f64)> {
		if !self.pan_and_zoom {
			return None;
		}
		let previous = self.transform.k;
		let new_k = self.clamp_zoom(k);
		if new_k == previous {
			return None;
		}
		let ratio = new_k / previous;
		self.transform.x = anchor.x - (anchor.x - self.transform.x) * ratio;
		self.transform.y = anchor.y - (anchor.y - self.transform.y) * ratio;
		self.transform.k = new_k;
		debug!("force-graph-engine: zoom {} -> {}", previous, new_k);
		Some((previous, new_k))
	}

	/// Multiply the zoom by `factor` around `anchor`.
	pub fn zoom_by(&mut self, factor: f64, anchor: Point) -> Option<(f64, f64)> {
		self.zoom_to(self.transform.k * factor, anchor)
	}

	/// Translate the view by a screen-space delta.
	pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
		if !self.pan_and_zoom || !(dx.is_finite() && dy.is_finite()) {
			return false;
		}
		self.transform.x += dx;
		self.transform.y += dy;
		true
	}

	/// Center the view on `target` at zoom `k` inside a `width × height` viewport.
	///
	/// Focusing is driven by the host rather than by user gestures, so it
	/// applies even when pan and zoom are disabled.
	pub fn focus_on(&mut self, target: Point, k: f64, width: f64, height: f64) {
		let k = self.clamp_zoom(k);
		self.transform = ViewTransform {
			x: width / 2.0 - target.x * k,
			y: height / 2.0 - target.y * k,
			k,
		};
	}

	/// The drag in progress, if any.
	pub fn drag(&self) -> Option<&DragState> {
		self.drag.as_ref()
	}

	/// Begin dragging `node` from screen position `at`.
	///
	/// Pins the node where it currently is and keeps the simulation warm. A
	/// drag still in progress is dropped first.
	pub fn drag_start(&mut self, layout: &mut LayoutEngine, node: &NodeId, at: Point) -> bool {
		if !self.drag_enabled {
			return false;
		}
		if layout.body(node).is_none() {
			return false;
		}
		self.drag_end(layout);
		let Some(body) = layout.body(node) else {
			return false;
		};
		let (node_start, was_pinned) = (body.position(), body.is_pinned());
		layout.pin(node, node_start.x, node_start.y);
		layout.reheat(self.drag_alpha);
		debug!("force-graph-engine: drag start `{}`", node);
		self.drag = Some(DragState {
			node: node.clone(),
			start: at,
			node_start,
			was_pinned,
		});
		true
	}

	/// Follow the pointer to screen position `at`. Returns the new pin.
	pub fn drag_move(&mut self, layout: &mut LayoutEngine, at: Point) -> Option<(NodeId, Point)> {
		let drag = self.drag.as_ref()?;
		let k = self.transform.k;
		let target = Point::new(
			drag.node_start.x + (at.x - drag.start.x) / k,
			drag.node_start.y + (at.y - drag.start.y) / k,
		);
		layout.pin(&drag.node, target.x, target.y);
		Some((drag.node.clone(), target))
	}

	/// Drop the dragged node.
	///
	/// With automatic rearrangement the pin is released and the layout
	/// restarts; otherwise the node stays pinned where it was dropped.
	pub fn drag_end(&mut self, layout: &mut LayoutEngine) -> Option<DragRelease> {
		let drag = self.drag.take()?;
		layout.cool();
		let position = layout.position(&drag.node).unwrap_or(drag.node_start);
		if self.rearrange_on_drop {
			layout.unpin(&drag.node);
			layout.restart();
		}
		debug!("force-graph-engine: drag end `{}`", drag.node);
		Some(DragRelease {
			node: drag.node,
			position,
			rearranged: self.rearrange_on_drop,
		})
	}

	/// Abandon a drag without a drop, e.g. when the pointer leaves the canvas.
	pub fn cancel_drag(&mut self, layout: &mut LayoutEngine) {
		if let Some(drag) = self.drag.take() {
			layout.cool();
			if !drag.was_pinned {
				layout.unpin(&drag.node);
			}
		}
	}

	/// Forget a drag whose node no longer exists.
	pub fn forget_drag_of_missing(&mut self, layout: &LayoutEngine) {
		if self
			.drag
			.as_ref()
			.is_some_and(|d| layout.body(&d.node).is_none())
		{
			self.drag = None;
		}
	}
}
