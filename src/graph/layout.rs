//! Force-directed layout simulation.
//!
//! The engine owns every node's position and velocity. Other components read
//! positions through [`LayoutEngine::position`] and change them only through the
//! pin operations; nothing else holds a mutable reference to a body.
//!
//! Each tick decays `alpha` towards its target, applies the forces, then
//! integrates velocity into position:
//!
//! - **charge**: every node pair repels, scaled by `alpha / distance²`
//! - **links**: springs pull linked nodes towards `link_length`
//! - **centering**: a weak pull towards the viewport midpoint
//! - **collision**: overlapping nodes are pushed apart by their radii
//!
//! Pinned nodes are placed at their pin and never integrated, but still exert
//! forces on their neighbours.

use std::collections::HashMap;
use std::f64::consts::PI;

use log::{info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{GraphConfig, SimulationConfig};
use super::geometry::Point;
use super::model::{Graph, GraphDiff, undirected_neighbors};
use super::types::{GraphNode, NodeId};

/// Distance below which charge stops growing, squared.
const DISTANCE_MIN2: f64 = 1.0;

/// Radius of the first phyllotaxis seed ring.
const INITIAL_RADIUS: f64 = 10.0;

/// Distance at which a new node is seeded from its placed neighbour.
const PARENT_JITTER: f64 = 10.0;

/// Simulation lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutState {
	/// Ticking.
	Running,
	/// Alpha fell below the threshold; ticking is paused.
	Converged,
	/// Simulation disabled; positions come from the dataset and pins.
	Static,
}

/// Per-node simulation record.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
	/// Current x.
	pub x: f64,
	/// Current y.
	pub y: f64,
	/// Velocity along x.
	pub vx: f64,
	/// Velocity along y.
	pub vy: f64,
	/// Pinned x, held while dragged or fixed.
	pub fx: Option<f64>,
	/// Pinned y.
	pub fy: Option<f64>,
	/// Collision radius.
	pub radius: f64,
}

impl Body {
	fn at(p: Point, radius: f64) -> Self {
		Self {
			x: p.x,
			y: p.y,
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
			radius,
		}
	}

	/// Current position.
	pub fn position(&self) -> Point {
		Point::new(self.x, self.y)
	}

	/// Whether the body is held in place.
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}
}

#[derive(Clone, Copy, Debug)]
struct Spring {
	source: usize,
	target: usize,
	bias: f64,
}

/// Owns positions and velocities and advances them tick by tick.
pub struct LayoutEngine {
	params: SimulationConfig,
	center: Point,
	ids: Vec<NodeId>,
	bodies: Vec<Body>,
	index: HashMap<NodeId, usize>,
	springs: Vec<Spring>,
	alpha: f64,
	alpha_target: f64,
	state: LayoutState,
	rng: StdRng,
}

impl LayoutEngine {
	/// An empty engine sized to the configured viewport.
	pub fn new(config: &GraphConfig) -> Self {
		Self {
			params: config.d3.clone(),
			center: Point::new(config.width / 2.0, config.height / 2.0),
			ids: Vec::new(),
			bodies: Vec::new(),
			index: HashMap::new(),
			springs: Vec::new(),
			alpha: 1.0,
			alpha_target: 0.0,
			state: if config.is_static() {
				LayoutState::Static
			} else {
				LayoutState::Running
			},
			rng: StdRng::seed_from_u64(0x5eed),
		}
	}

	/// Apply new simulation parameters and the static toggle.
	pub fn reconfigure(&mut self, config: &GraphConfig) {
		self.params = config.d3.clone();
		self.resize(config.width, config.height);
		self.set_static(config.is_static());
	}

	/// Move the centering target to the middle of a `width × height` viewport.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.center = Point::new(width / 2.0, height / 2.0);
	}

	/// Align the bodies with a freshly rebuilt graph.
	///
	/// Bodies of nodes present before keep position, velocity and pin. New
	/// nodes are seeded from dataset coordinates when given, next to a placed
	/// neighbour when enabled, or on a spiral around the centre. Any structural
	/// change restarts the simulation.
	pub fn sync(&mut self, graph: &Graph, diff: &GraphDiff, config: &GraphConfig) {
		let mut previous: HashMap<NodeId, Body> = self
			.ids
			.drain(..)
			.zip(self.bodies.drain(..))
			.collect();
		self.index.clear();

		for node in graph.nodes() {
			let radius = node_radius(node.data.size.unwrap_or(config.node.size));
			let body = match previous.remove(node.id()) {
				Some(mut body) => {
					body.radius = radius;
					body
				}
				None => {
					let seed = self.seed_position(graph, &node.data, &previous);
					let mut body = Body::at(seed, radius);
					body.fx = node.data.fx;
					body.fy = node.data.fy;
					body
				}
			};
			self.index.insert(node.id().clone(), self.ids.len());
			self.ids.push(node.id().clone());
			self.bodies.push(body);
		}

		if self.state == LayoutState::Static {
			for (body, node) in self.bodies.iter_mut().zip(graph.nodes()) {
				if let (Some(x), Some(y)) = (node.data.x, node.data.y) {
					if !body.is_pinned() {
						body.x = x;
						body.y = y;
					}
				}
				snap_to_pin(body);
			}
		}

		self.rebuild_springs(graph);

		if diff.is_structural() {
			self.restart();
		}
	}

	fn seed_position(
		&mut self,
		graph: &Graph,
		data: &GraphNode,
		previous: &HashMap<NodeId, Body>,
	) -> Point {
		if let (Some(x), Some(y)) = (data.x, data.y) {
			return Point::new(x, y);
		}

		if self.params.seed_near_parent {
			let parent = undirected_neighbors(graph, &data.id)
				.into_iter()
				.find_map(|n| {
					self.index
						.get(n)
						.map(|&i| self.bodies[i].position())
						.or_else(|| previous.get(n).map(Body::position))
				});
			if let Some(parent) = parent {
				let angle = self.rng.gen_range(0.0..2.0 * PI);
				return Point::new(
					parent.x + PARENT_JITTER * angle.cos(),
					parent.y + PARENT_JITTER * angle.sin(),
				);
			}
		}

		let placed = self.bodies.len();
		let radius = INITIAL_RADIUS * (0.5 + placed as f64).sqrt();
		let angle = placed as f64 * PI * (3.0 - 5f64.sqrt());
		Point::new(
			self.center.x + radius * angle.cos(),
			self.center.y + radius * angle.sin(),
		)
	}

	fn rebuild_springs(&mut self, graph: &Graph) {
		let mut count = vec![0usize; self.bodies.len()];
		let mut pairs = Vec::with_capacity(graph.link_count());
		for link in graph.links() {
			if link.id.is_self_link() {
				continue;
			}
			if let (Some(&s), Some(&t)) = (self.index.get(link.source()), self.index.get(link.target())) {
				count[s] += 1;
				count[t] += 1;
				pairs.push((s, t));
			}
		}
		self.springs = pairs
			.into_iter()
			.map(|(source, target)| Spring {
				source,
				target,
				bias: count[source] as f64 / (count[source] + count[target]) as f64,
			})
			.collect();
	}

	/// Current lifecycle state.
	pub fn state(&self) -> LayoutState {
		self.state
	}

	/// Current alpha.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Whether ticks should be scheduled.
	pub fn is_running(&self) -> bool {
		self.state == LayoutState::Running
	}

	/// Position of a node.
	pub fn position(&self, id: &NodeId) -> Option<Point> {
		self.body(id).map(Body::position)
	}

	/// Simulation record of a node.
	pub fn body(&self, id: &NodeId) -> Option<&Body> {
		self.index.get(id).map(|&i| &self.bodies[i])
	}

	/// Positions of every node, in graph order.
	pub fn positions(&self) -> impl Iterator<Item = (&NodeId, Point)> {
		self.ids.iter().zip(self.bodies.iter().map(Body::position))
	}

	/// Reset alpha and resume ticking. No-op while static.
	pub fn restart(&mut self) {
		if self.state == LayoutState::Static {
			return;
		}
		self.alpha = 1.0;
		if self.state != LayoutState::Running {
			info!("force-graph-engine: layout restarted");
		}
		self.state = LayoutState::Running;
	}

	/// Keep the simulation warm at `target` until [`LayoutEngine::cool`].
	///
	/// Alpha is raised to `target` when below it, never reset to 1. A drag on a
	/// settled graph therefore starts from the target, not from a full restart.
	pub fn reheat(&mut self, target: f64) {
		if self.state == LayoutState::Static {
			return;
		}
		self.alpha_target = target;
		self.alpha = self.alpha.max(target);
		self.state = LayoutState::Running;
	}

	/// Let alpha decay to zero again.
	pub fn cool(&mut self) {
		self.alpha_target = 0.0;
	}

	/// Enter or leave static mode.
	pub fn set_static(&mut self, enabled: bool) {
		match (enabled, self.state) {
			(true, LayoutState::Static) | (false, LayoutState::Running | LayoutState::Converged) => {}
			(true, _) => {
				info!("force-graph-engine: layout is static");
				self.state = LayoutState::Static;
				self.bodies.iter_mut().for_each(snap_to_pin);
			}
			(false, LayoutState::Static) => {
				self.state = LayoutState::Converged;
				self.restart();
			}
		}
	}

	/// Hold a node at `(x, y)`. Unknown ids are ignored.
	pub fn pin(&mut self, id: &NodeId, x: f64, y: f64) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		let body = &mut self.bodies[i];
		body.fx = Some(x);
		body.fy = Some(y);
		if self.state == LayoutState::Static {
			snap_to_pin(body);
		}
		true
	}

	/// Release a pinned node back into the simulation.
	pub fn unpin(&mut self, id: &NodeId) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		let body = &mut self.bodies[i];
		body.fx = None;
		body.fy = None;
		true
	}

	/// Advance one step. Returns whether the simulation is still running.
	pub fn tick(&mut self) -> bool {
		if self.state != LayoutState::Running {
			return false;
		}

		self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;

		self.apply_charge();
		if !self.params.disable_link_force {
			self.apply_links();
		}
		self.apply_centering();
		self.apply_collision();
		self.integrate();

		if self.alpha < self.params.alpha_min {
			self.state = LayoutState::Converged;
			info!("force-graph-engine: layout converged");
		}
		self.is_running()
	}

	fn jiggle(&mut self) -> f64 {
		(self.rng.gen_range(0.0..1.0) - 0.5) * 1e-6
	}

	fn apply_charge(&mut self) {
		let strength = self.params.gravity * self.alpha;
		let n = self.bodies.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let mut dx = self.bodies[j].x - self.bodies[i].x;
				let mut dy = self.bodies[j].y - self.bodies[i].y;
				if dx == 0.0 {
					dx = self.jiggle();
				}
				if dy == 0.0 {
					dy = self.jiggle();
				}
				let mut l2 = dx * dx + dy * dy;
				if l2 < DISTANCE_MIN2 {
					l2 = (DISTANCE_MIN2 * l2).sqrt();
				}
				let w = strength / l2;
				self.bodies[i].vx += dx * w;
				self.bodies[i].vy += dy * w;
				self.bodies[j].vx -= dx * w;
				self.bodies[j].vy -= dy * w;
			}
		}
	}

	fn apply_links(&mut self) {
		let (distance, strength) = (self.params.link_length, self.params.link_strength);
		for k in 0..self.springs.len() {
			let Spring { source, target, bias } = self.springs[k];
			let (s, t) = (&self.bodies[source], &self.bodies[target]);
			let mut x = t.x + t.vx - s.x - s.vx;
			let mut y = t.y + t.vy - s.y - s.vy;
			if x == 0.0 {
				x = self.jiggle();
			}
			if y == 0.0 {
				y = self.jiggle();
			}
			let l = (x * x + y * y).sqrt();
			let scale = (l - distance) / l * self.alpha * strength;
			let (x, y) = (x * scale, y * scale);

			self.bodies[target].vx -= x * bias;
			self.bodies[target].vy -= y * bias;
			self.bodies[source].vx += x * (1.0 - bias);
			self.bodies[source].vy += y * (1.0 - bias);
		}
	}

	fn apply_centering(&mut self) {
		let k = self.params.center_strength * self.alpha;
		let center = self.center;
		for body in &mut self.bodies {
			body.vx += (center.x - body.x) * k;
			body.vy += (center.y - body.y) * k;
		}
	}

	fn apply_collision(&mut self) {
		let strength = self.params.collision_strength;
		let n = self.bodies.len();
		for i in 0..n {
			let ri = self.bodies[i].radius;
			let ri2 = ri * ri;
			let xi = self.bodies[i].x + self.bodies[i].vx;
			let yi = self.bodies[i].y + self.bodies[i].vy;
			for j in (i + 1)..n {
				let rj = self.bodies[j].radius;
				let r = ri + rj;
				let mut x = xi - self.bodies[j].x - self.bodies[j].vx;
				let mut y = yi - self.bodies[j].y - self.bodies[j].vy;
				let mut l = x * x + y * y;
				if l >= r * r {
					continue;
				}
				if x == 0.0 {
					x = self.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = self.jiggle();
					l += y * y;
				}
				let dist = l.sqrt();
				let push = (r - dist) / dist * strength;
				let (x, y) = (x * push, y * push);
				let share = rj * rj / (ri2 + rj * rj);

				self.bodies[i].vx += x * share;
				self.bodies[i].vy += y * share;
				self.bodies[j].vx -= x * (1.0 - share);
				self.bodies[j].vy -= y * (1.0 - share);
			}
		}
	}

	fn integrate(&mut self) {
		let decay = 1.0 - self.params.velocity_decay;
		for body in &mut self.bodies {
			match body.fx {
				Some(fx) => {
					body.x = fx;
					body.vx = 0.0;
				}
				None => {
					body.vx *= decay;
					body.x += body.vx;
				}
			}
			match body.fy {
				Some(fy) => {
					body.y = fy;
					body.vy = 0.0;
				}
				None => {
					body.vy *= decay;
					body.y += body.vy;
				}
			}
		}
		trace!("force-graph-engine: tick alpha={:.4}", self.alpha);
	}
}

fn snap_to_pin(body: &mut Body) {
	if let Some(fx) = body.fx {
		body.x = fx;
	}
	if let Some(fy) = body.fy {
		body.y = fy;
	}
	body.vx = 0.0;
	body.vy = 0.0;
}

/// Collision radius of a symbol with area `size` px².
pub fn node_radius(size: f64) -> f64 {
	(size.max(0.0) / PI).sqrt()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::types::{GraphData, GraphLink};

	fn build(
		engine: &mut LayoutEngine,
		previous: Option<&Graph>,
		data: &GraphData,
		config: &GraphConfig,
	) -> Graph {
		let (graph, diff) = Graph::rebuild(previous, data, false).unwrap();
		engine.sync(&graph, &diff, config);
		graph
	}

	fn chain(ids: &[&str]) -> GraphData {
		GraphData {
			nodes: ids.iter().map(|id| GraphNode::new(*id)).collect(),
			links: ids.windows(2).map(|w| GraphLink::new(w[0], w[1])).collect(),
		}
	}

	fn run(engine: &mut LayoutEngine, max: usize) -> usize {
		let mut ticks = 0;
		while engine.tick() && ticks < max {
			ticks += 1;
		}
		ticks
	}

	#[test]
	fn test_converges_and_stops() {
		let config = GraphConfig::default();
		let mut engine = LayoutEngine::new(&config);
		build(&mut engine, None, &chain(&["a", "b", "c"]), &config);

		assert_eq!(engine.state(), LayoutState::Running);
		let ticks = run(&mut engine, 10_000);
		assert!(ticks < 1000, "took {ticks} ticks");
		assert_eq!(engine.state(), LayoutState::Converged);

		let before = engine.position(&NodeId::from("a"));
		assert!(!engine.tick());
		assert_eq!(engine.position(&NodeId::from("a")), before);
	}

	#[test]
	fn test_linked_nodes_settle_near_link_length() {
		let config = GraphConfig::default();
		let mut engine = LayoutEngine::new(&config);
		build(&mut engine, None, &chain(&["a", "b"]), &config);
		run(&mut engine, 10_000);

		let a = engine.position(&NodeId::from("a")).unwrap();
		let b = engine.position(&NodeId::from("b")).unwrap();
		let d = a.distance(b);
		assert!(d > 50.0 && d < 250.0, "distance {d}");
	}

	#[test]
	fn test_positions_survive_rebuild() {
		let config = GraphConfig::default();
		let mut engine = LayoutEngine::new(&config);
		let first = build(&mut engine, None, &chain(&["a", "b"]), &config);
		run(&mut engine, 50);
		let a = engine.position(&NodeId::from("a")).unwrap();

		build(&mut engine, Some(&first), &chain(&["a", "b", "c"]), &config);
		assert_eq!(engine.position(&NodeId::from("a")), Some(a));
		assert_eq!(engine.state(), LayoutState::Running);
		assert_eq!(engine.alpha(), 1.0);

		let c = engine.position(&NodeId::from("c")).unwrap();
		let b = engine.position(&NodeId::from("b")).unwrap();
		assert!((c.distance(b) - PARENT_JITTER).abs() < 1e-9);
	}

	#[test]
	fn test_seeding_picks_first_linked_neighbour() {
		let config = GraphConfig::default();
		let first = GraphData {
			nodes: vec![
				GraphNode::new("a").with_position(0.0, 0.0),
				GraphNode::new("b").with_position(500.0, 0.0),
			],
			links: vec![GraphLink::new("a", "b")],
		};
		let mut second = first.clone();
		second.nodes.push(GraphNode::new("c"));
		second.links.push(GraphLink::new("b", "c"));
		second.links.push(GraphLink::new("a", "c"));

		let seeded: Vec<Point> = (0..20)
			.map(|_| {
				let mut engine = LayoutEngine::new(&config);
				let graph = build(&mut engine, None, &first, &config);
				build(&mut engine, Some(&graph), &second, &config);
				engine.position(&NodeId::from("c")).unwrap()
			})
			.collect();

		assert!(seeded.iter().all(|p| *p == seeded[0]));
		assert!((seeded[0].distance(Point::new(500.0, 0.0)) - PARENT_JITTER).abs() < 1e-9);
	}

	#[test]
	fn test_unchanged_rebuild_keeps_alpha() {
		let config = GraphConfig::default();
		let mut engine = LayoutEngine::new(&config);
		let data = chain(&["a", "b"]);
		let first = build(&mut engine, None, &data, &config);
		run(&mut engine, 10_000);
		build(&mut engine, Some(&first), &data, &config);
		assert_eq!(engine.state(), LayoutState::Converged);
	}

	#[test]
	fn test_pinned_node_does_not_move() {
		let config = GraphConfig::default();
		let mut engine = LayoutEngine::new(&config);
		build(&mut engine, None, &chain(&["a", "b", "c"]), &config);
		let a = NodeId::from("a");
		assert!(engine.pin(&a, 10.0, 20.0));
		for _ in 0..100 {
			engine.tick();
		}
		assert_eq!(engine.position(&a), Some(Point::new(10.0, 20.0)));

		engine.unpin(&a);
		engine.restart();
		engine.tick();
		assert!(!engine.body(&a).unwrap().is_pinned());
		assert!(!engine.pin(&NodeId::from("ghost"), 0.0, 0.0));
	}

	#[test]
	fn test_coincident_nodes_separate() {
		let config = GraphConfig::default();
		let mut engine = LayoutEngine::new(&config);
		let data = GraphData {
			nodes: vec![
				GraphNode::new("a").with_position(5.0, 5.0),
				GraphNode::new("b").with_position(5.0, 5.0),
				GraphNode::new("lonely"),
			],
			links: vec![],
		};
		build(&mut engine, None, &data, &config);
		for _ in 0..50 {
			engine.tick();
		}
		let a = engine.position(&NodeId::from("a")).unwrap();
		let b = engine.position(&NodeId::from("b")).unwrap();
		assert!(a.distance(b) > 1.0);
		assert!(a.x.is_finite() && b.y.is_finite());
	}

	#[test]
	fn test_static_mode_uses_dataset_coordinates() {
		let config = GraphConfig {
			static_graph: true,
			..GraphConfig::default()
		};
		let mut engine = LayoutEngine::new(&config);
		let data = GraphData {
			nodes: vec![
				GraphNode::new("a").with_position(1.0, 2.0),
				GraphNode::new("b").with_position(30.0, 40.0),
			],
			links: vec![GraphLink::new("a", "b")],
		};
		build(&mut engine, None, &data, &config);

		assert_eq!(engine.state(), LayoutState::Static);
		assert!(!engine.tick());
		assert_eq!(engine.position(&NodeId::from("b")), Some(Point::new(30.0, 40.0)));

		engine.pin(&NodeId::from("a"), 7.0, 8.0);
		assert_eq!(engine.position(&NodeId::from("a")), Some(Point::new(7.0, 8.0)));

		engine.set_static(false);
		assert_eq!(engine.state(), LayoutState::Running);
	}

	#[test]
	fn test_reheat_holds_alpha_until_cooled() {
		let config = GraphConfig::default();
		let mut engine = LayoutEngine::new(&config);
		build(&mut engine, None, &chain(&["a", "b"]), &config);
		run(&mut engine, 10_000);

		engine.reheat(config.d3.alpha_target);
		for _ in 0..2000 {
			assert!(engine.tick());
		}
		engine.cool();
		run(&mut engine, 10_000);
		assert_eq!(engine.state(), LayoutState::Converged);
	}

	#[test]
	fn test_removed_nodes_drop_bodies() {
		let config = GraphConfig::default();
		let mut engine = LayoutEngine::new(&config);
		let first = build(&mut engine, None, &chain(&["a", "b", "c"]), &config);
		build(&mut engine, Some(&first), &chain(&["a", "b"]), &config);
		assert!(engine.position(&NodeId::from("c")).is_none());
		assert_eq!(engine.positions().count(), 2);
	}
}
