//! Link path construction.
//!
//! Turns a pair of node coordinates into a drawable path in the SVG path
//! mini-language (`M x,y`, `L x,y`, `A rx,ry rotation large-arc,sweep x,y`).
//! The output strings are an external format consumed verbatim by renderers,
//! so number formatting and segment order are fixed.
//!
//! # Path shapes
//!
//! - **Self-link**: a fixed elliptical arc (radii 40,30) leaving and re-entering
//!   the node, placed in one of four quadrants by [`SelfLinkDirection`].
//! - **Regular link**: both endpoints are shifted sideways by [`LINK_OFFSET`] so
//!   that links running in opposite directions between the same two nodes do not
//!   overlap. A straight segment covers the first [`STRAIGHT_PORTION`] of the
//!   distance, then one arc segment per breakpoint and one for the target.
//!   The arc radius comes from the link's [`LineType`].

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::NodeId;

/// Perpendicular displacement applied to both endpoints of a regular link.
pub const LINK_OFFSET: f64 = 3.0;

/// Share of the source→target distance drawn as a straight line.
pub const STRAIGHT_PORTION: f64 = 0.9;

const SELF_LINK_RX: f64 = 40.0;
const SELF_LINK_RY: f64 = 30.0;
const SELF_LINK_ROTATION: f64 = 45.0;

/// A 2D coordinate in graph space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate (grows downwards).
	pub y: f64,
}

impl Point {
	/// Create a point.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		let (dx, dy) = (other.x - self.x, other.y - self.y);
		(dx * dx + dy * dy).sqrt()
	}

	fn offset(self, dx: f64, dy: f64) -> Self {
		Self::new(self.x + dx, self.y + dy)
	}

	fn lerp(self, other: Point, t: f64) -> Self {
		Self::new(
			self.x + (other.x - self.x) * t,
			self.y + (other.y - self.y) * t,
		)
	}
}

/// How a link is drawn between its endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LineType {
	/// Straight segments (arc radius 0).
	#[default]
	Straight,
	/// A gentle bow whose curvature scales with the link length.
	CurveSmooth,
	/// A pronounced arc regardless of length.
	CurveFull,
}

impl LineType {
	/// Arc radius for a segment running from `from` to `to`.
	pub fn radius(self, from: Point, to: Point) -> f64 {
		match self {
			LineType::Straight => 0.0,
			LineType::CurveSmooth => from.distance(to),
			LineType::CurveFull => 1.0,
		}
	}
}

impl From<String> for LineType {
	fn from(name: String) -> Self {
		match name.as_str() {
			"CURVE_SMOOTH" => Self::CurveSmooth,
			"CURVE_FULL" => Self::CurveFull,
			_ => Self::Straight,
		}
	}
}

impl From<LineType> for String {
	fn from(line_type: LineType) -> Self {
		match line_type {
			LineType::Straight => "STRAIGHT",
			LineType::CurveSmooth => "CURVE_SMOOTH",
			LineType::CurveFull => "CURVE_FULL",
		}
		.to_string()
	}
}

/// Quadrant a self-link loop is drawn in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SelfLinkDirection {
	/// Up and to the right of the node.
	#[default]
	TopRight,
	/// Up and to the left.
	TopLeft,
	/// Down and to the left.
	BottomLeft,
	/// Down and to the right.
	BottomRight,
}

impl SelfLinkDirection {
	/// Arc rotation and endpoint nudge for this quadrant.
	fn arc_params(self) -> (f64, f64, f64) {
		match self {
			SelfLinkDirection::TopRight => (-SELF_LINK_ROTATION, 1.0, 1.0),
			SelfLinkDirection::TopLeft => (SELF_LINK_ROTATION, 1.0, -1.0),
			SelfLinkDirection::BottomLeft => (-SELF_LINK_ROTATION, -1.0, -1.0),
			SelfLinkDirection::BottomRight => (SELF_LINK_ROTATION, -1.0, 1.0),
		}
	}
}

impl From<String> for SelfLinkDirection {
	fn from(name: String) -> Self {
		match name.as_str() {
			"TOP_LEFT" => Self::TopLeft,
			"BOTTOM_LEFT" => Self::BottomLeft,
			"BOTTOM_RIGHT" => Self::BottomRight,
			_ => Self::TopRight,
		}
	}
}

impl From<SelfLinkDirection> for String {
	fn from(direction: SelfLinkDirection) -> Self {
		match direction {
			SelfLinkDirection::TopRight => "TOP_RIGHT",
			SelfLinkDirection::TopLeft => "TOP_LEFT",
			SelfLinkDirection::BottomLeft => "BOTTOM_LEFT",
			SelfLinkDirection::BottomRight => "BOTTOM_RIGHT",
		}
		.to_string()
	}
}

/// One command of a path description.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PathSegment {
	/// `M x,y`
	MoveTo(Point),
	/// `L x,y`
	LineTo(Point),
	/// `A rx,ry rotation large-arc,sweep x,y`
	Arc {
		/// Horizontal radius.
		rx: f64,
		/// Vertical radius.
		ry: f64,
		/// X-axis rotation in degrees.
		rotation: f64,
		/// Large-arc flag.
		large_arc: bool,
		/// Sweep flag.
		sweep: bool,
		/// Segment end point.
		to: Point,
	},
}

impl PathSegment {
	/// Point the segment ends at.
	pub fn end(&self) -> Point {
		match *self {
			PathSegment::MoveTo(p) | PathSegment::LineTo(p) => p,
			PathSegment::Arc { to, .. } => to,
		}
	}
}

impl fmt::Display for PathSegment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			PathSegment::MoveTo(p) => write!(f, "M{},{}", num(p.x), num(p.y)),
			PathSegment::LineTo(p) => write!(f, "L{},{}", num(p.x), num(p.y)),
			PathSegment::Arc {
				rx,
				ry,
				rotation,
				large_arc,
				sweep,
				to,
			} => write!(
				f,
				"A{},{} {} {},{} {},{}",
				num(rx),
				num(ry),
				num(rotation),
				u8::from(large_arc),
				u8::from(sweep),
				num(to.x),
				num(to.y)
			),
		}
	}
}

/// Formats a coordinate the way the path strings expect: integers without a
/// fractional part, and no negative zero.
fn num(v: f64) -> f64 {
	if v == 0.0 { 0.0 } else { v }
}

/// A drawable link path.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkPath {
	/// Ordered path commands.
	pub segments: Vec<PathSegment>,
}

impl LinkPath {
	/// The path-definition string, e.g. `M0,-3 L90,-3 A0,0 0 0,1 100,-3`.
	pub fn definition(&self) -> String {
		self.to_string()
	}

	/// Coordinates the path passes through, in drawing order.
	pub fn points(&self) -> Vec<Point> {
		self.segments.iter().map(PathSegment::end).collect()
	}

	/// Radii of the arc segments, in drawing order.
	pub fn arc_radii(&self) -> Vec<(f64, f64)> {
		self.segments
			.iter()
			.filter_map(|s| match *s {
				PathSegment::Arc { rx, ry, .. } => Some((rx, ry)),
				_ => None,
			})
			.collect()
	}
}

impl fmt::Display for LinkPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, segment) in self.segments.iter().enumerate() {
			if i > 0 {
				f.write_str(" ")?;
			}
			write!(f, "{segment}")?;
		}
		Ok(())
	}
}

/// Everything needed to draw one link.
#[derive(Clone, Copy, Debug)]
pub struct LinkGeometry<'a> {
	/// Source node position.
	pub source: Point,
	/// Target node position.
	pub target: Point,
	/// Line type; unknown names already fell back to straight on parse.
	pub line_type: LineType,
	/// Breakpoints between source and target.
	pub break_points: &'a [Point],
	/// Source node id.
	pub source_id: &'a NodeId,
	/// Target node id.
	pub target_id: &'a NodeId,
	/// Placement of the loop when this is a self-link.
	pub self_link_direction: SelfLinkDirection,
}

/// Angle of the segment `from → to` in radians.
///
/// A vertical segment resolves to ±π/2 explicitly: `-π/2` when `from` lies
/// below `to`, `π/2` otherwise (including coincident points). This agrees with
/// `atan2` for every non-degenerate vertical segment; offsets depend on the sign.
pub fn segment_angle(from: Point, to: Point) -> f64 {
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	if dx == 0.0 {
		if from.y > to.y { -FRAC_PI_2 } else { FRAC_PI_2 }
	} else {
		dy.atan2(dx)
	}
}

/// Displacement applied to both endpoints of a regular link.
pub fn collision_offset(from: Point, to: Point) -> (f64, f64) {
	let theta = segment_angle(from, to);
	(theta.sin() * LINK_OFFSET, -theta.cos() * LINK_OFFSET)
}

/// Builds the path for one link.
pub fn build_link_path(link: &LinkGeometry<'_>) -> LinkPath {
	if link.source_id == link.target_id && link.source == link.target {
		return self_link_path(link.source, link.self_link_direction);
	}

	let (ox, oy) = collision_offset(link.source, link.target);
	let start = link.source.offset(ox, oy);
	let end = link.target.offset(ox, oy);

	let mut segments = Vec::with_capacity(link.break_points.len() + 3);
	segments.push(PathSegment::MoveTo(start));
	segments.push(PathSegment::LineTo(start.lerp(end, STRAIGHT_PORTION)));

	let mut previous = start;
	for &to in link.break_points.iter().chain(std::iter::once(&end)) {
		let radius = link.line_type.radius(previous, to);
		segments.push(PathSegment::Arc {
			rx: radius,
			ry: radius,
			rotation: 0.0,
			large_arc: false,
			sweep: true,
			to,
		});
		previous = to;
	}

	LinkPath { segments }
}

fn self_link_path(at: Point, direction: SelfLinkDirection) -> LinkPath {
	let (rotation, nudge_x, nudge_y) = direction.arc_params();
	LinkPath {
		segments: vec![
			PathSegment::MoveTo(at),
			PathSegment::Arc {
				rx: SELF_LINK_RX,
				ry: SELF_LINK_RY,
				rotation,
				large_arc: true,
				sweep: true,
				to: at.offset(nudge_x, nudge_y),
			},
		],
	}
}
