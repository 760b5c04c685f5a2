//! Node-link graph layout and geometry engine.
//!
//! Turns a node/link dataset and a configuration tree into render-ready
//! frames:
//! - Indexed graph snapshots with adjacency, rebuilt and diffed on every update
//! - Force-directed layout that keeps node positions across updates
//! - Exact SVG-style path definitions for straight, curved and self links
//! - Hover highlighting by hop count, collapsible leaf links
//! - Pan, zoom and node dragging
//!
//! # Example
//!
//! ```ignore
//! use force_graph_engine::{GraphController, GraphData, ManualScheduler};
//!
//! let data = GraphData::from_json(r#"{
//!     "nodes": [{ "id": "a" }, { "id": "b" }],
//!     "links": [{ "source": "a", "target": "b" }]
//! }"#)?;
//!
//! let mut graph = GraphController::new(&data, None, ManualScheduler::new())?;
//! graph.run_until_settled(500);
//! for link in &graph.frame().links {
//!     println!("{}", link.path_definition);
//! }
//! ```

mod collapse;
mod config;
mod controller;
mod error;
mod frame;
mod geometry;
mod highlight;
mod layout;
mod model;
mod scheduler;
mod types;
mod view;

pub use collapse::CollapseState;
pub use config::{
	ConfigCallback, ConfigEntry, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, GraphConfig, LinkConfig, NodeConfig,
	ResolvedConfig, SAME, SimulationConfig, resolve,
};
pub use controller::{GraphController, GraphEvent};
pub use error::{GraphError, GraphResult};
pub use frame::{Frame, FrameSource, LinkFrame, NodeFrame};
pub use geometry::{
	LINK_OFFSET, LineType, LinkGeometry, LinkPath, PathSegment, Point, STRAIGHT_PORTION, SelfLinkDirection,
	build_link_path, collision_offset, segment_angle,
};
pub use highlight::{HighlightFocus, HighlightSet, HighlightState, traverse};
pub use layout::{Body, LayoutEngine, LayoutState, node_radius};
pub use model::{AdjacencyMap, Graph, GraphDiff, LinkId, LinkRecord, NodeRecord};
#[cfg(feature = "web")]
pub use scheduler::AnimationFrameScheduler;
pub use scheduler::{ManualScheduler, Scheduler};
pub use types::{GraphData, GraphLink, GraphNode, NodeId, SymbolType};
pub use view::{DragRelease, DragState, ViewController, ViewTransform};
