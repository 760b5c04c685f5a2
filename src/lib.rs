//! force-graph-engine: layout and geometry core for interactive node-link graphs.
//!
//! This crate computes everything a renderer needs to draw a force-directed
//! graph: node positions over time, link path definitions, highlight flags and
//! the pan/zoom transform. Painting is left to the host.

pub mod graph;

pub use graph::{
	ConfigEntry, Frame, GraphConfig, GraphController, GraphData, GraphError, GraphEvent, GraphLink, GraphNode,
	GraphResult, LinkFrame, LinkId, ManualScheduler, NodeFrame, NodeId, Point, Scheduler,
};
#[cfg(feature = "web")]
pub use graph::AnimationFrameScheduler;

/// Initialize logging and panic hooks for the WASM target.
#[cfg(feature = "web")]
pub fn init_logging() {
	let _ = console_log::init_with_level(log::Level::Debug);
	console_error_panic_hook::set_once();
	log::info!("force-graph-engine: logging initialized");
}
