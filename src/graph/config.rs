//! Configuration defaults and user override resolution.
//!
//! The configuration is a tree with a global section plus `d3`, `node` and
//! `link` subtrees. Hosts hand in an override tree of the same shape, built
//! from JSON or assembled with [`ConfigEntry`]. Resolution never fails:
//!
//! - unknown keys are ignored,
//! - a leaf whose JSON kind does not match the default keeps the default,
//! - callback leaves replace the default wholesale and are never merged into.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::geometry::{LineType, SelfLinkDirection};
use super::types::SymbolType;

/// Marker meaning "inherit the non-highlighted value".
pub const SAME: &str = "SAME";

/// Default lower zoom bound.
pub const DEFAULT_MIN_ZOOM: f64 = 0.1;

/// Default upper zoom bound.
pub const DEFAULT_MAX_ZOOM: f64 = 8.0;

/// A function-valued configuration leaf. Receives the node or link datum.
pub type ConfigCallback = Rc<dyn Fn(&Value) -> Value>;

/// Physics parameters of the layout simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
	/// Alpha held while a node is being dragged.
	pub alpha_target: f64,
	/// Convergence threshold.
	pub alpha_min: f64,
	/// Per-tick alpha decay rate (~300 ticks from 1 to `alpha_min`).
	pub alpha_decay: f64,
	/// Share of velocity lost per tick.
	pub velocity_decay: f64,
	/// Charge strength between every node pair (negative repels).
	pub gravity: f64,
	/// Rest length of the link springs.
	pub link_length: f64,
	/// Stiffness of the link springs.
	pub link_strength: f64,
	/// Turns the link springs off entirely.
	pub disable_link_force: bool,
	/// Pull towards the viewport midpoint.
	pub center_strength: f64,
	/// Strength of the overlap separation.
	pub collision_strength: f64,
	/// Seed new nodes next to an already placed neighbour.
	pub seed_near_parent: bool,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			alpha_target: 0.05,
			alpha_min: 0.001,
			alpha_decay: 0.0228,
			velocity_decay: 0.4,
			gravity: -100.0,
			link_length: 100.0,
			link_strength: 1.0,
			disable_link_force: false,
			center_strength: 0.06,
			collision_strength: 1.0,
			seed_near_parent: true,
		}
	}
}

/// Node display defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
	/// Fill color.
	pub color: String,
	/// Label color.
	pub font_color: String,
	/// Label size.
	pub font_size: f64,
	/// Label weight.
	pub font_weight: String,
	/// Fill color while highlighted, or `"SAME"`.
	pub highlight_color: String,
	/// Label size while highlighted.
	pub highlight_font_size: f64,
	/// Label weight while highlighted.
	pub highlight_font_weight: String,
	/// Stroke color while highlighted, or `"SAME"`.
	pub highlight_stroke_color: String,
	/// Datum key used as label (a callback may replace it).
	pub label_property: String,
	/// Opacity.
	pub opacity: f64,
	/// Whether labels are drawn.
	pub render_label: bool,
	/// Symbol area in px².
	pub size: f64,
	/// Stroke color.
	pub stroke_color: String,
	/// Stroke width.
	pub stroke_width: f64,
	/// Symbol shape.
	pub symbol_type: SymbolType,
}

impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			color: "#d3d3d3".into(),
			font_color: "black".into(),
			font_size: 8.0,
			font_weight: "normal".into(),
			highlight_color: SAME.into(),
			highlight_font_size: 8.0,
			highlight_font_weight: "normal".into(),
			highlight_stroke_color: SAME.into(),
			label_property: "id".into(),
			opacity: 1.0,
			render_label: true,
			size: 200.0,
			stroke_color: "none".into(),
			stroke_width: 1.5,
			symbol_type: SymbolType::Circle,
		}
	}
}

/// Link display defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkConfig {
	/// Stroke color.
	pub color: String,
	/// Label color.
	pub font_color: String,
	/// Label size.
	pub font_size: f64,
	/// Stroke color while highlighted, or `"SAME"`.
	pub highlight_color: String,
	/// Datum key used as label (a callback may replace it).
	pub label_property: String,
	/// Opacity.
	pub opacity: f64,
	/// Whether labels are drawn.
	pub render_label: bool,
	/// Scale the stroke width with the link's `value`.
	pub semantic_stroke_width: bool,
	/// Stroke width.
	pub stroke_width: f64,
	/// Line type.
	#[serde(rename = "type")]
	pub line_type: LineType,
	/// Quadrant self-link loops are drawn in.
	pub self_link_direction: SelfLinkDirection,
	/// Arrow marker width for directed graphs.
	pub marker_width: f64,
	/// Arrow marker height for directed graphs.
	pub marker_height: f64,
}

impl Default for LinkConfig {
	fn default() -> Self {
		Self {
			color: "#d3d3d3".into(),
			font_color: "black".into(),
			font_size: 8.0,
			highlight_color: SAME.into(),
			label_property: "label".into(),
			opacity: 1.0,
			render_label: false,
			semantic_stroke_width: false,
			stroke_width: 1.5,
			line_type: LineType::Straight,
			self_link_direction: SelfLinkDirection::TopRight,
			marker_width: 6.0,
			marker_height: 6.0,
		}
	}
}

/// Fully resolved graph configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphConfig {
	/// Release a dropped node and restart the layout.
	pub automatic_rearrange_after_drop_node: bool,
	/// Clicking a node toggles its leaf connections.
	pub collapsible: bool,
	/// Links only traverse source → target for highlighting and collapsing.
	pub directed: bool,
	/// Zoom level used when focusing a node.
	pub focus_zoom: f64,
	/// Disable node dragging.
	pub freeze_all_drag_events: bool,
	/// Viewport height.
	pub height: f64,
	/// Viewport width.
	pub width: f64,
	/// Hops from the hovered node that get highlighted.
	pub highlight_degree: u32,
	/// Opacity of everything outside the highlight while one is active.
	pub highlight_opacity: f64,
	/// Starting zoom level; identity when absent.
	#[serde(deserialize_with = "lenient")]
	pub initial_zoom: Option<f64>,
	/// Hovering a link highlights it and its endpoints.
	pub link_highlight_behavior: bool,
	/// Upper zoom bound.
	pub max_zoom: f64,
	/// Lower zoom bound.
	pub min_zoom: f64,
	/// Hovering a node highlights its neighbourhood.
	pub node_highlight_behavior: bool,
	/// Enable zooming and panning.
	pub pan_and_zoom: bool,
	/// Disable the simulation; positions come from the dataset.
	pub static_graph: bool,
	/// Static graph that still allows dragging nodes.
	pub static_graph_with_drag_and_drop: bool,
	/// Simulation parameters.
	pub d3: SimulationConfig,
	/// Node display defaults.
	pub node: NodeConfig,
	/// Link display defaults.
	pub link: LinkConfig,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			automatic_rearrange_after_drop_node: false,
			collapsible: false,
			directed: false,
			focus_zoom: 1.0,
			freeze_all_drag_events: false,
			height: 400.0,
			width: 800.0,
			highlight_degree: 1,
			highlight_opacity: 1.0,
			initial_zoom: None,
			link_highlight_behavior: false,
			max_zoom: DEFAULT_MAX_ZOOM,
			min_zoom: DEFAULT_MIN_ZOOM,
			node_highlight_behavior: false,
			pan_and_zoom: false,
			static_graph: false,
			static_graph_with_drag_and_drop: false,
			d3: SimulationConfig::default(),
			node: NodeConfig::default(),
			link: LinkConfig::default(),
		}
	}
}

impl GraphConfig {
	/// Whether the simulation is switched off.
	pub fn is_static(&self) -> bool {
		self.static_graph || self.static_graph_with_drag_and_drop
	}

	/// Whether nodes may be dragged.
	pub fn drag_enabled(&self) -> bool {
		!self.freeze_all_drag_events && (!self.static_graph || self.static_graph_with_drag_and_drop)
	}

	/// Zoom bounds, falling back to the defaults when the configured pair is unusable.
	pub fn zoom_bounds(&self) -> (f64, f64) {
		let valid = self.min_zoom.is_finite()
			&& self.max_zoom.is_finite()
			&& self.min_zoom > 0.0
			&& self.min_zoom <= self.max_zoom;
		if valid {
			(self.min_zoom, self.max_zoom)
		} else {
			warn!(
				"force-graph-engine: zoom bounds [{}, {}] unusable, using defaults",
				self.min_zoom, self.max_zoom
			);
			(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)
		}
	}
}

/// Deserializes an optional leaf, treating a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: serde::de::DeserializeOwned,
{
	let value = Value::deserialize(deserializer)?;
	Ok(serde_json::from_value(value).ok())
}

/// One node of a user configuration tree.
#[derive(Clone)]
pub enum ConfigEntry {
	/// A data leaf.
	Value(Value),
	/// A function leaf; replaces the default wholesale.
	Callback(ConfigCallback),
	/// A nested section.
	Subtree(BTreeMap<String, ConfigEntry>),
}

impl ConfigEntry {
	/// Wrap a closure as a callback leaf.
	pub fn callback(f: impl Fn(&Value) -> Value + 'static) -> Self {
		ConfigEntry::Callback(Rc::new(f))
	}

	/// Build a subtree from key/entry pairs.
	pub fn tree<K: Into<String>>(entries: impl IntoIterator<Item = (K, ConfigEntry)>) -> Self {
		ConfigEntry::Subtree(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}

	/// Set `key` inside this subtree, turning a leaf into a subtree if needed.
	pub fn with(mut self, key: impl Into<String>, entry: impl Into<ConfigEntry>) -> Self {
		if !matches!(self, ConfigEntry::Subtree(_)) {
			self = ConfigEntry::Subtree(BTreeMap::new());
		}
		if let ConfigEntry::Subtree(ref mut children) = self {
			children.insert(key.into(), entry.into());
		}
		self
	}
}

impl fmt::Debug for ConfigEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigEntry::Value(v) => write!(f, "Value({v})"),
			ConfigEntry::Callback(_) => f.write_str("Callback(..)"),
			ConfigEntry::Subtree(children) => f.debug_map().entries(children.iter()).finish(),
		}
	}
}

impl From<Value> for ConfigEntry {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(map) => ConfigEntry::Subtree(
				map.into_iter()
					.map(|(k, v)| (k, ConfigEntry::from(v)))
					.collect(),
			),
			other => ConfigEntry::Value(other),
		}
	}
}

/// Configuration after merging user overrides onto the defaults.
#[derive(Clone, Default)]
pub struct ResolvedConfig {
	/// Typed data leaves.
	pub config: GraphConfig,
	callbacks: BTreeMap<String, ConfigCallback>,
}

impl ResolvedConfig {
	/// Callback stored at a dotted path such as `node.labelProperty`.
	pub fn callback(&self, path: &str) -> Option<&ConfigCallback> {
		self.callbacks.get(path)
	}

	/// Dotted paths of every callback leaf.
	pub fn callback_paths(&self) -> impl Iterator<Item = &str> {
		self.callbacks.keys().map(String::as_str)
	}
}

impl fmt::Debug for ResolvedConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolvedConfig")
			.field("config", &self.config)
			.field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Dotted paths of leaves that may hold a callback even though their default is data.
const CALLBACK_LEAVES: &[&str] = &[
	"node.labelProperty",
	"node.viewGenerator",
	"link.labelProperty",
];

/// Merge `user` onto the built-in defaults.
pub fn resolve(user: Option<&ConfigEntry>) -> ResolvedConfig {
	let Some(user) = user else {
		return ResolvedConfig::default();
	};
	let defaults = serde_json::to_value(GraphConfig::default()).unwrap_or(Value::Null);

	let mut callbacks = BTreeMap::new();
	let merged = merge(&defaults, &defaults, user, "", &mut callbacks);
	let config = match serde_json::from_value(merged) {
		Ok(config) => config,
		Err(e) => {
			warn!("force-graph-engine: configuration rejected, using defaults: {}", e);
			GraphConfig::default()
		}
	};

	ResolvedConfig { config, callbacks }
}

fn merge(
	root: &Value,
	default: &Value,
	user: &ConfigEntry,
	path: &str,
	callbacks: &mut BTreeMap<String, ConfigCallback>,
) -> Value {
	match (default, user) {
		(_, ConfigEntry::Callback(f)) => {
			callbacks.insert(path.to_string(), f.clone());
			default.clone()
		}
		(Value::Object(defaults), ConfigEntry::Subtree(children)) => {
			let mut merged = Map::with_capacity(defaults.len());
			for (key, default_leaf) in defaults {
				let child_path = join(path, key);
				let value = match children.get(key) {
					Some(entry) => merge(root, default_leaf, entry, &child_path, callbacks),
					None => default_leaf.clone(),
				};
				merged.insert(key.clone(), value);
			}
			for (key, entry) in children {
				if defaults.contains_key(key) {
					continue;
				}
				let child_path = join(path, key);
				match entry {
					ConfigEntry::Callback(f) if CALLBACK_LEAVES.contains(&child_path.as_str()) => {
						callbacks.insert(child_path, f.clone());
					}
					_ => debug!("force-graph-engine: ignoring unknown config key `{}`", child_path),
				}
			}
			Value::Object(merged)
		}
		(default, ConfigEntry::Value(value)) if same_kind(default, value) && fits(root, path, value) => {
			value.clone()
		}
		_ => {
			warn!(
				"force-graph-engine: config `{}` has the wrong type, keeping default {}",
				path, default
			);
			default.clone()
		}
	}
}

fn join(path: &str, key: &str) -> String {
	if path.is_empty() {
		key.to_string()
	} else {
		format!("{path}.{key}")
	}
}

/// Whether the typed configuration still deserializes with `value` placed at
/// `path`, e.g. an integer leaf rejects values outside its range.
fn fits(root: &Value, path: &str, value: &Value) -> bool {
	let mut trial = root.clone();
	match trial.pointer_mut(&format!("/{}", path.replace('.', "/"))) {
		Some(slot) => *slot = value.clone(),
		None => return false,
	}
	serde_json::from_value::<GraphConfig>(trial).is_ok()
}

/// Whether `value` may replace a leaf whose default is `default`.
fn same_kind(default: &Value, value: &Value) -> bool {
	match (default, value) {
		// Optional leaves accept anything; the typed deserializer decides.
		(Value::Null, v) => !v.is_object(),
		(Value::Bool(_), Value::Bool(_)) => true,
		(Value::String(_), Value::String(_)) => true,
		(Value::Number(d), Value::Number(v)) => !d.is_u64() || v.is_u64(),
		_ => false,
	}
}
