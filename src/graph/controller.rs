//! The single owner of graph, layout, highlight and view state.
//!
//! Every host event enters through one `&mut self` method and is applied
//! completely before the next one, so a tick never observes a half-applied
//! update. Events only mark the frame dirty; the frame is rebuilt at most once
//! when [`GraphController::frame`] is next read, however many pointer moves or
//! hover changes arrived in between.

use log::{debug, info, warn};
use serde_json::Value;

use super::collapse::CollapseState;
use super::config::{ConfigEntry, ResolvedConfig, resolve};
use super::error::{GraphError, GraphResult};
use super::frame::{Frame, FrameSource};
use super::geometry::Point;
use super::highlight::{HighlightFocus, HighlightState};
use super::layout::{LayoutEngine, LayoutState};
use super::model::{Graph, GraphDiff, LinkId};
use super::scheduler::Scheduler;
use super::types::{GraphData, NodeId};
use super::view::{DragRelease, ViewController, ViewTransform};

/// Something the user did, reported to listeners with the affected datum.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
	/// A node was clicked.
	NodeClick {
		/// Node id.
		id: NodeId,
		/// Full node datum.
		datum: Value,
	},
	/// A node was double-clicked.
	NodeDoubleClick {
		/// Node id.
		id: NodeId,
		/// Full node datum.
		datum: Value,
	},
	/// The pointer entered a node.
	NodeMouseOver {
		/// Node id.
		id: NodeId,
		/// Full node datum.
		datum: Value,
	},
	/// The pointer left a node.
	NodeMouseOut {
		/// Node id.
		id: NodeId,
		/// Full node datum.
		datum: Value,
	},
	/// A link was clicked.
	LinkClick {
		/// Link id.
		id: LinkId,
		/// Full link datum.
		datum: Value,
	},
	/// The pointer entered a link.
	LinkMouseOver {
		/// Link id.
		id: LinkId,
		/// Full link datum.
		datum: Value,
	},
	/// The pointer left a link.
	LinkMouseOut {
		/// Link id.
		id: LinkId,
		/// Full link datum.
		datum: Value,
	},
	/// A node drag began.
	NodeDragStart {
		/// Node id.
		id: NodeId,
		/// Full node datum.
		datum: Value,
	},
	/// The dragged node moved.
	NodeDragMove {
		/// Node id.
		id: NodeId,
		/// Full node datum.
		datum: Value,
		/// New pinned position.
		position: Point,
	},
	/// The dragged node was dropped.
	NodeDragEnd {
		/// Node id.
		id: NodeId,
		/// Full node datum.
		datum: Value,
		/// Drop position.
		position: Point,
	},
	/// The zoom level changed.
	ZoomChange {
		/// Zoom before the change.
		previous: f64,
		/// Zoom after the change.
		current: f64,
	},
	/// A node was moved by the user and released.
	NodePositionChange {
		/// Node id.
		id: NodeId,
		/// Full node datum.
		datum: Value,
		/// Final position.
		position: Point,
	},
}

type Listener = Box<dyn FnMut(&GraphEvent)>;

/// Wires the data model, layout, geometry, highlight and view together.
pub struct GraphController<S: Scheduler> {
	config: ResolvedConfig,
	graph: Graph,
	layout: LayoutEngine,
	highlight: HighlightState,
	collapse: CollapseState,
	view: ViewController,
	scheduler: S,
	listeners: Vec<Listener>,
	frame: Option<Frame>,
	torn_down: bool,
}

impl<S: Scheduler> GraphController<S> {
	/// Build a controller for `data` and start the layout.
	pub fn new(data: &GraphData, config: Option<ConfigEntry>, scheduler: S) -> GraphResult<Self> {
		let config = resolve(config.as_ref());
		let (graph, diff) = Graph::rebuild(None, data, config.config.directed)?;
		let mut layout = LayoutEngine::new(&config.config);
		layout.sync(&graph, &diff, &config.config);
		let view = ViewController::new(&config.config);

		let mut controller = Self {
			config,
			graph,
			layout,
			highlight: HighlightState::default(),
			collapse: CollapseState::default(),
			view,
			scheduler,
			listeners: Vec::new(),
			frame: None,
			torn_down: false,
		};
		controller.schedule_if_running();
		Ok(controller)
	}

	/// Replace the dataset.
	///
	/// Nodes that survive keep their position, velocity and pin. On error
	/// nothing changes.
	pub fn update_data(&mut self, data: &GraphData) -> GraphResult<GraphDiff> {
		let (graph, diff) = Graph::rebuild(Some(&self.graph), data, self.config.config.directed)?;
		self.install(graph, &diff);
		Ok(diff)
	}

	/// Remove one node and every link touching it.
	pub fn remove_node(&mut self, id: &NodeId) -> GraphResult<GraphDiff> {
		let (graph, diff) = self.graph.without_node(id)?;
		self.install(graph, &diff);
		Ok(diff)
	}

	fn install(&mut self, graph: Graph, diff: &GraphDiff) {
		self.graph = graph;
		self.layout.sync(&self.graph, diff, &self.config.config);
		self.collapse.reset();
		self.highlight.invalidate();
		self.view.forget_drag_of_missing(&self.layout);
		self.mark_dirty();
		self.schedule_if_running();
	}

	/// Replace the configuration overrides.
	pub fn update_config(&mut self, config: Option<ConfigEntry>) {
		let config = resolve(config.as_ref());
		let directed_changed = config.config.directed != self.graph.is_directed();
		self.config = config;

		if directed_changed {
			match Graph::rebuild(Some(&self.graph), &self.data(), self.config.config.directed) {
				Ok((graph, diff)) => {
					self.graph = graph;
					self.layout.sync(&self.graph, &diff, &self.config.config);
				}
				Err(e) => warn!("force-graph-engine: could not switch direction: {}", e),
			}
			self.collapse.reset();
		}
		if !self.config.config.collapsible {
			self.collapse.reset();
		}

		self.layout.reconfigure(&self.config.config);
		self.view.reconfigure(&self.config.config);
		self.highlight.invalidate();
		self.mark_dirty();

		if self.layout.state() == LayoutState::Static {
			self.scheduler.cancel();
		} else {
			self.schedule_if_running();
		}
	}

	/// The current dataset, rebuilt from the snapshot.
	pub fn data(&self) -> GraphData {
		GraphData {
			nodes: self.graph.nodes().map(|n| n.data.clone()).collect(),
			links: self.graph.links().map(|l| l.data.clone()).collect(),
		}
	}

	/// Advance the layout by one tick. Call when the scheduled callback fires.
	pub fn on_frame(&mut self) {
		if self.torn_down {
			return;
		}
		self.scheduler.acknowledge();
		if self.layout.is_running() {
			self.layout.tick();
			self.mark_dirty();
		}
		self.schedule_if_running();
	}

	/// Pump frames until nothing is scheduled or `max_frames` ran.
	///
	/// Returns how many frames ran.
	pub fn run_until_settled(&mut self, max_frames: usize) -> usize {
		let mut frames = 0;
		while frames < max_frames && self.scheduler.is_pending() {
			self.on_frame();
			frames += 1;
		}
		frames
	}

	/// The render-ready frame, rebuilt if anything changed since the last read.
	pub fn frame(&mut self) -> &Frame {
		let frame = match self.frame.take() {
			Some(frame) => frame,
			None => {
				let degree = self.config.config.highlight_degree;
				let highlight = self.highlight.resolve(&self.graph, degree);
				FrameSource {
					graph: &self.graph,
					layout: &self.layout,
					highlight,
					collapse: &self.collapse,
					config: &self.config,
					transform: self.view.transform(),
				}
				.build()
			}
		};
		self.frame.insert(frame)
	}

	/// The pointer entered a node.
	pub fn hover_node(&mut self, id: &NodeId) -> GraphResult<()> {
		let datum = self.node_datum(id)?;
		if self.config.config.node_highlight_behavior && self.view.drag().is_none() {
			self.highlight.set_focus(Some(HighlightFocus::Node(id.clone())));
			self.mark_dirty();
		}
		self.emit(GraphEvent::NodeMouseOver { id: id.clone(), datum });
		Ok(())
	}

	/// The pointer left a node. A highlight focused elsewhere is kept.
	pub fn leave_node(&mut self, id: &NodeId) -> GraphResult<()> {
		let datum = self.node_datum(id)?;
		let focused = matches!(self.highlight.focus(), Some(HighlightFocus::Node(f)) if f == id);
		if self.config.config.node_highlight_behavior && focused && self.view.drag().is_none() {
			self.highlight.set_focus(None);
			self.mark_dirty();
		}
		self.emit(GraphEvent::NodeMouseOut { id: id.clone(), datum });
		Ok(())
	}

	/// The pointer entered a link.
	pub fn hover_link(&mut self, id: &LinkId) -> GraphResult<()> {
		let datum = self.link_datum(id)?;
		if self.config.config.link_highlight_behavior {
			self.highlight.set_focus(Some(HighlightFocus::Link(id.clone())));
			self.mark_dirty();
		}
		self.emit(GraphEvent::LinkMouseOver { id: id.clone(), datum });
		Ok(())
	}

	/// The pointer left a link. A highlight focused elsewhere is kept.
	pub fn leave_link(&mut self, id: &LinkId) -> GraphResult<()> {
		let datum = self.link_datum(id)?;
		let focused = matches!(self.highlight.focus(), Some(HighlightFocus::Link(f)) if f == id);
		if self.config.config.link_highlight_behavior && focused {
			self.highlight.set_focus(None);
			self.mark_dirty();
		}
		self.emit(GraphEvent::LinkMouseOut { id: id.clone(), datum });
		Ok(())
	}

	/// A node was clicked. Toggles its leaf links when the graph is collapsible.
	pub fn click_node(&mut self, id: &NodeId) -> GraphResult<()> {
		let datum = self.node_datum(id)?;
		if self.config.config.collapsible {
			self.collapse.toggle(&self.graph, id);
			self.mark_dirty();
		}
		self.emit(GraphEvent::NodeClick { id: id.clone(), datum });
		Ok(())
	}

	/// A node was double-clicked.
	pub fn double_click_node(&mut self, id: &NodeId) -> GraphResult<()> {
		let datum = self.node_datum(id)?;
		self.emit(GraphEvent::NodeDoubleClick { id: id.clone(), datum });
		Ok(())
	}

	/// A link was clicked.
	pub fn click_link(&mut self, id: &LinkId) -> GraphResult<()> {
		let datum = self.link_datum(id)?;
		self.emit(GraphEvent::LinkClick { id: id.clone(), datum });
		Ok(())
	}

	/// Start dragging a node from screen position `at`.
	///
	/// Returns `false` when dragging is disabled.
	pub fn drag_start(&mut self, id: &NodeId, at: Point) -> GraphResult<bool> {
		let datum = self.node_datum(id)?;
		if self.view.drag().is_some() {
			self.drag_end();
		}
		if !self.view.drag_start(&mut self.layout, id, at) {
			return Ok(false);
		}
		self.mark_dirty();
		self.schedule_if_running();
		self.emit(GraphEvent::NodeDragStart { id: id.clone(), datum });
		Ok(true)
	}

	/// Move the dragged node with the pointer. Returns the new pin.
	pub fn drag_move(&mut self, at: Point) -> Option<Point> {
		let (id, position) = self.view.drag_move(&mut self.layout, at)?;
		self.mark_dirty();
		self.schedule_if_running();
		if let Ok(datum) = self.node_datum(&id) {
			self.emit(GraphEvent::NodeDragMove { id, datum, position });
		}
		Some(position)
	}

	/// Drop the dragged node.
	pub fn drag_end(&mut self) -> Option<DragRelease> {
		let release = self.view.drag_end(&mut self.layout)?;
		self.mark_dirty();
		self.schedule_if_running();
		if let Ok(datum) = self.node_datum(&release.node) {
			self.emit(GraphEvent::NodeDragEnd {
				id: release.node.clone(),
				datum: datum.clone(),
				position: release.position,
			});
			self.emit(GraphEvent::NodePositionChange {
				id: release.node.clone(),
				datum,
				position: release.position,
			});
		}
		Some(release)
	}

	/// Abandon the drag in progress without a drop.
	pub fn cancel_drag(&mut self) {
		self.view.cancel_drag(&mut self.layout);
		self.mark_dirty();
	}

	/// Multiply the zoom by `factor` around the screen point `anchor`.
	pub fn zoom_by(&mut self, factor: f64, anchor: Point) -> bool {
		let changed = self.view.zoom_by(factor, anchor);
		self.after_zoom(changed)
	}

	/// Zoom to `k` around the screen point `anchor`.
	pub fn zoom_to(&mut self, k: f64, anchor: Point) -> bool {
		let changed = self.view.zoom_to(k, anchor);
		self.after_zoom(changed)
	}

	fn after_zoom(&mut self, changed: Option<(f64, f64)>) -> bool {
		let Some((previous, current)) = changed else {
			return false;
		};
		self.mark_dirty();
		self.emit(GraphEvent::ZoomChange { previous, current });
		true
	}

	/// Translate the view by a screen-space delta.
	pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
		let moved = self.view.pan_by(dx, dy);
		if moved {
			self.mark_dirty();
		}
		moved
	}

	/// Center the view on a node at the configured focus zoom.
	///
	/// `None` leaves the transform where it is.
	pub fn focus_node(&mut self, id: Option<&NodeId>) -> GraphResult<()> {
		let Some(id) = id else {
			return Ok(());
		};
		let position = self
			.layout
			.position(id)
			.ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
		let c = &self.config.config;
		let previous = self.view.transform().k;
		self.view.focus_on(position, c.focus_zoom, c.width, c.height);
		debug!("force-graph-engine: focused `{}`", id);
		self.mark_dirty();
		let current = self.view.transform().k;
		if current != previous {
			self.emit(GraphEvent::ZoomChange { previous, current });
		}
		Ok(())
	}

	/// Release a pinned node back into the simulation.
	pub fn release_node(&mut self, id: &NodeId) -> GraphResult<()> {
		if !self.layout.unpin(id) {
			return Err(GraphError::NodeNotFound(id.clone()));
		}
		self.mark_dirty();
		Ok(())
	}

	/// Reset alpha and resume ticking. No-op while static.
	pub fn restart_layout(&mut self) {
		self.layout.restart();
		self.schedule_if_running();
	}

	/// Change the viewport size; the centering force follows the new midpoint.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.config.config.width = width;
		self.config.config.height = height;
		self.layout.resize(width, height);
		self.schedule_if_running();
	}

	/// Register a listener for user-facing events.
	pub fn on_event(&mut self, listener: impl FnMut(&GraphEvent) + 'static) {
		self.listeners.push(Box::new(listener));
	}

	/// Stop scheduling frames and drop every listener.
	pub fn teardown(&mut self) {
		if !self.torn_down {
			info!("force-graph-engine: teardown");
		}
		self.scheduler.cancel();
		self.listeners.clear();
		self.torn_down = true;
	}

	/// The injected scheduler.
	pub fn scheduler(&self) -> &S {
		&self.scheduler
	}

	/// Resolved configuration.
	pub fn config(&self) -> &ResolvedConfig {
		&self.config
	}

	/// Current graph snapshot.
	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	/// The layout engine.
	pub fn layout(&self) -> &LayoutEngine {
		&self.layout
	}

	/// Current pan and zoom.
	pub fn transform(&self) -> ViewTransform {
		self.view.transform()
	}

	/// Node currently or last focused by a hover, if the highlight is still showing.
	pub fn highlight_focus(&self) -> Option<&HighlightFocus> {
		self.highlight.focus()
	}

	fn schedule_if_running(&mut self) {
		if !self.torn_down && self.layout.is_running() {
			self.scheduler.schedule();
		}
	}

	fn mark_dirty(&mut self) {
		self.frame = None;
	}

	fn emit(&mut self, event: GraphEvent) {
		for listener in &mut self.listeners {
			listener(&event);
		}
	}

	fn node_datum(&self, id: &NodeId) -> GraphResult<Value> {
		self.graph
			.node(id)
			.map(|n| n.datum().clone())
			.ok_or_else(|| GraphError::NodeNotFound(id.clone()))
	}

	fn link_datum(&self, id: &LinkId) -> GraphResult<Value> {
		self.graph
			.link(id)
			.map(|l| l.datum().clone())
			.ok_or_else(|| GraphError::LinkNotFound(id.clone()))
	}
}

impl<S: Scheduler> Drop for GraphController<S> {
	fn drop(&mut self) {
		self.scheduler.cancel();
	}
}
