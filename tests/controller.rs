use std::cell::RefCell;
use std::rc::Rc;

use force_graph_engine::graph::{LayoutState, Scheduler};
use force_graph_engine::{
	ConfigEntry, GraphController, GraphData, GraphError, GraphEvent, GraphLink, GraphNode, LinkId, ManualScheduler,
	NodeId, Point,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn dataset(nodes: &[&str], links: &[(&str, &str)]) -> GraphData {
	GraphData {
		nodes: nodes.iter().map(|id| GraphNode::new(*id)).collect(),
		links: links.iter().map(|(s, t)| GraphLink::new(*s, *t)).collect(),
	}
}

fn controller(config: serde_json::Value) -> GraphController<ManualScheduler> {
	let data = dataset(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
	GraphController::new(&data, Some(ConfigEntry::from(config)), ManualScheduler::new()).unwrap()
}

fn recorder(graph: &mut GraphController<ManualScheduler>) -> Rc<RefCell<Vec<GraphEvent>>> {
	let events = Rc::new(RefCell::new(Vec::new()));
	let sink = events.clone();
	graph.on_event(move |e| sink.borrow_mut().push(e.clone()));
	events
}

fn highlighted(graph: &mut GraphController<ManualScheduler>) -> (Vec<String>, Vec<String>) {
	let frame = graph.frame();
	let nodes = frame
		.nodes
		.iter()
		.filter(|n| n.highlighted)
		.map(|n| n.id.to_string())
		.collect();
	let links = frame
		.links
		.iter()
		.filter(|l| l.highlighted)
		.map(|l| l.id.to_string())
		.collect();
	(nodes, links)
}

#[test]
fn test_layout_settles_and_stops_scheduling() {
	let mut graph = controller(json!({}));
	assert!(graph.scheduler().is_pending());

	let frames = graph.run_until_settled(2_000);
	assert!(frames > 0 && frames < 2_000);
	assert_eq!(graph.layout().state(), LayoutState::Converged);
	assert!(!graph.scheduler().is_pending());
	assert!(graph.frame().nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
}

#[test]
fn test_update_keeps_positions_of_surviving_nodes() {
	let mut graph = controller(json!({}));
	graph.run_until_settled(2_000);
	let before = graph.layout().position(&NodeId::from("a")).unwrap();

	let data = dataset(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
	let diff = graph.update_data(&data).unwrap();
	assert!(!diff.is_structural());
	assert_eq!(graph.layout().position(&NodeId::from("a")), Some(before));
	assert!(!graph.scheduler().is_pending());

	let data = dataset(&["a", "b", "c", "d", "e"], &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]);
	let diff = graph.update_data(&data).unwrap();
	assert_eq!(diff.added_nodes, vec![NodeId::from("e")]);
	assert_eq!(graph.layout().position(&NodeId::from("a")), Some(before));
	assert_eq!(graph.layout().state(), LayoutState::Running);
	assert!(graph.scheduler().is_pending());
}

#[test]
fn test_invalid_update_leaves_state_untouched() {
	let mut graph = controller(json!({}));
	let bad = dataset(&["a", "b"], &[("a", "zzz")]);
	let err = graph.update_data(&bad).unwrap_err();
	assert!(matches!(err, GraphError::UnknownLinkEndpoint { .. }));
	assert_eq!(graph.graph().node_count(), 4);

	let dup = dataset(&["a", "a"], &[]);
	assert!(matches!(graph.update_data(&dup), Err(GraphError::DuplicateNode(_))));
	assert_eq!(graph.graph().link_count(), 3);
}

#[test]
fn test_remove_node_drops_incident_links() {
	let mut graph = controller(json!({}));
	let diff = graph.remove_node(&NodeId::from("b")).unwrap();
	assert_eq!(diff.removed_nodes, vec![NodeId::from("b")]);
	assert_eq!(diff.removed_links, vec![LinkId::new("a", "b"), LinkId::new("b", "c")]);

	let frame = graph.frame();
	assert_eq!(frame.links.len(), 1);
	assert!(frame.node(&NodeId::from("b")).is_none());
	assert!(
		graph
			.graph()
			.adjacency()
			.iter()
			.all(|(_, neighbours)| !neighbours.contains(&NodeId::from("b")))
	);
}

#[test]
fn test_hover_highlights_neighbourhood_and_leave_restores() {
	let mut graph = controller(json!({ "nodeHighlightBehavior": true, "highlightOpacity": 0.3 }));
	let events = recorder(&mut graph);
	let b = NodeId::from("b");

	for _ in 0..3 {
		graph.hover_node(&b).unwrap();
		let (mut nodes, mut links) = highlighted(&mut graph);
		nodes.sort();
		links.sort();
		assert_eq!(nodes, vec!["a", "b", "c"]);
		assert_eq!(links, vec!["a,b", "b,c"]);
		assert_eq!(graph.frame().node(&NodeId::from("d")).unwrap().opacity, 0.3);

		graph.leave_node(&b).unwrap();
		assert_eq!(highlighted(&mut graph), (vec![], vec![]));
		assert!(graph.frame().nodes.iter().all(|n| n.opacity == 1.0));
	}
	assert_eq!(events.borrow().len(), 6);
}

#[test]
fn test_late_leave_keeps_current_highlight() {
	let mut graph = controller(json!({ "nodeHighlightBehavior": true, "linkHighlightBehavior": true }));
	graph.hover_node(&NodeId::from("a")).unwrap();
	graph.hover_node(&NodeId::from("d")).unwrap();
	graph.leave_node(&NodeId::from("a")).unwrap();

	let (mut nodes, _) = highlighted(&mut graph);
	nodes.sort();
	assert_eq!(nodes, vec!["c", "d"]);

	graph.hover_link(&LinkId::new("a", "b")).unwrap();
	graph.leave_node(&NodeId::from("d")).unwrap();
	graph.leave_link(&LinkId::new("b", "c")).unwrap();
	let (_, links) = highlighted(&mut graph);
	assert_eq!(links, vec!["a,b"]);

	graph.leave_link(&LinkId::new("a", "b")).unwrap();
	assert_eq!(highlighted(&mut graph), (vec![], vec![]));
}

#[test]
fn test_hover_without_highlight_behavior_only_reports() {
	let mut graph = controller(json!({}));
	let events = recorder(&mut graph);
	graph.hover_node(&NodeId::from("a")).unwrap();
	assert_eq!(highlighted(&mut graph), (vec![], vec![]));
	assert!(matches!(events.borrow()[0], GraphEvent::NodeMouseOver { .. }));
}

#[test]
fn test_link_hover_highlights_endpoints() {
	let mut graph = controller(json!({ "linkHighlightBehavior": true }));
	graph.hover_link(&LinkId::new("c", "d")).unwrap();
	let (mut nodes, links) = highlighted(&mut graph);
	nodes.sort();
	assert_eq!(nodes, vec!["c", "d"]);
	assert_eq!(links, vec!["c,d"]);

	assert!(matches!(
		graph.hover_link(&LinkId::new("a", "d")),
		Err(GraphError::LinkNotFound(_))
	));
}

#[test]
fn test_events_carry_datum() {
	let mut data = dataset(&["a", "b"], &[("a", "b")]);
	data.nodes[0].extra.insert("team".into(), json!("core"));
	let mut graph = GraphController::new(&data, None, ManualScheduler::new()).unwrap();
	let events = recorder(&mut graph);

	graph.click_node(&NodeId::from("a")).unwrap();
	graph.double_click_node(&NodeId::from("b")).unwrap();
	graph.click_link(&LinkId::new("a", "b")).unwrap();

	let events = events.borrow();
	match &events[0] {
		GraphEvent::NodeClick { id, datum } => {
			assert_eq!(id, &NodeId::from("a"));
			assert_eq!(datum["team"], json!("core"));
		}
		other => panic!("unexpected event {other:?}"),
	}
	assert!(matches!(events[1], GraphEvent::NodeDoubleClick { .. }));
	match &events[2] {
		GraphEvent::LinkClick { datum, .. } => assert_eq!(datum["source"], json!("a")),
		other => panic!("unexpected event {other:?}"),
	}
	assert!(matches!(
		graph.click_node(&NodeId::from("nope")),
		Err(GraphError::NodeNotFound(_))
	));
}

#[test]
fn test_drag_lifecycle() {
	let mut graph = controller(json!({}));
	graph.run_until_settled(2_000);
	let events = recorder(&mut graph);
	let a = NodeId::from("a");
	let start = graph.layout().position(&a).unwrap();

	assert!(graph.drag_start(&a, Point::new(0.0, 0.0)).unwrap());
	assert_eq!(graph.layout().state(), LayoutState::Running);
	assert!(graph.scheduler().is_pending());

	for step in 1..=5 {
		graph.drag_move(Point::new(step as f64 * 10.0, 0.0));
	}
	graph.on_frame();
	let pinned = Point::new(start.x + 50.0, start.y);
	assert_eq!(graph.layout().position(&a), Some(pinned));
	assert!(graph.frame().node(&a).unwrap().pinned);

	let release = graph.drag_end().unwrap();
	assert_eq!(release.position, pinned);
	assert!(!release.rearranged);

	let events = events.borrow();
	assert!(matches!(events[0], GraphEvent::NodeDragStart { .. }));
	assert_eq!(
		events
			.iter()
			.filter(|e| matches!(e, GraphEvent::NodeDragMove { .. }))
			.count(),
		5
	);
	assert!(matches!(
		events.last(),
		Some(GraphEvent::NodePositionChange { position, .. }) if *position == pinned
	));

	graph.release_node(&a).unwrap();
	assert!(!graph.layout().body(&a).unwrap().is_pinned());
}

#[test]
fn test_frozen_drag_does_nothing() {
	let mut graph = controller(json!({ "freezeAllDragEvents": true }));
	assert!(!graph.drag_start(&NodeId::from("a"), Point::default()).unwrap());
	assert_eq!(graph.drag_move(Point::new(5.0, 5.0)), None);
	assert!(graph.drag_end().is_none());
}

#[test]
fn test_new_drag_releases_the_previous_node() {
	let mut graph = controller(json!({ "automaticRearrangeAfterDropNode": true }));
	graph.run_until_settled(2_000);
	let events = recorder(&mut graph);
	let (a, b) = (NodeId::from("a"), NodeId::from("b"));

	assert!(graph.drag_start(&a, Point::default()).unwrap());
	assert!(graph.drag_start(&b, Point::default()).unwrap());
	assert!(!graph.frame().node(&a).unwrap().pinned);
	assert!(graph.frame().node(&b).unwrap().pinned);

	let names: Vec<_> = events
		.borrow()
		.iter()
		.filter_map(|e| match e {
			GraphEvent::NodeDragStart { id, .. } => Some(format!("start {id}")),
			GraphEvent::NodeDragEnd { id, .. } => Some(format!("end {id}")),
			_ => None,
		})
		.collect();
	assert_eq!(names, vec!["start a", "end a", "start b"]);
}

#[test]
fn test_zoom_is_clamped_and_reported() {
	let mut graph = controller(json!({ "panAndZoom": true, "maxZoom": 4 }));
	let events = recorder(&mut graph);

	assert!(graph.zoom_by(10.0, Point::default()));
	assert_eq!(graph.transform().k, 4.0);
	assert!(!graph.zoom_by(2.0, Point::default()));
	assert!(graph.pan_by(10.0, 5.0));
	assert_eq!(graph.frame().transform.x, 10.0);

	assert_eq!(
		events.borrow().as_slice(),
		&[GraphEvent::ZoomChange {
			previous: 1.0,
			current: 4.0
		}]
	);
}

#[test]
fn test_zoom_disabled_without_pan_and_zoom() {
	let mut graph = controller(json!({}));
	assert!(!graph.zoom_by(2.0, Point::default()));
	assert!(!graph.pan_by(1.0, 1.0));
}

#[test]
fn test_static_graph_never_schedules() {
	let mut data = dataset(&["a", "b"], &[("a", "b")]);
	data.nodes[0] = GraphNode::new("a").with_position(10.0, 20.0);
	data.nodes[1] = GraphNode::new("b").with_position(30.0, 20.0);
	let user = ConfigEntry::from(json!({ "staticGraph": true }));
	let mut graph = GraphController::new(&data, Some(user), ManualScheduler::new()).unwrap();

	assert_eq!(graph.layout().state(), LayoutState::Static);
	assert!(!graph.scheduler().is_pending());
	assert_eq!(graph.run_until_settled(10), 0);
	assert_eq!(graph.frame().links[0].path_definition, "M10,17 L28,17 A0,0 0 0,1 30,17");

	graph.restart_layout();
	assert!(!graph.scheduler().is_pending());
}

#[test]
fn test_switching_to_static_cancels_ticks() {
	let mut graph = controller(json!({}));
	assert!(graph.scheduler().is_pending());
	graph.update_config(Some(ConfigEntry::from(json!({ "staticGraph": true }))));
	assert!(!graph.scheduler().is_pending());

	graph.update_config(None);
	assert_eq!(graph.layout().state(), LayoutState::Running);
	assert!(graph.scheduler().is_pending());
}

#[test]
fn test_collapsible_click_hides_leaves() {
	let data = dataset(&["hub", "x", "y", "z", "w"], &[("hub", "x"), ("hub", "y"), ("hub", "z"), ("z", "w")]);
	let user = ConfigEntry::from(json!({ "collapsible": true }));
	let mut graph = GraphController::new(&data, Some(user), ManualScheduler::new()).unwrap();
	let hub = NodeId::from("hub");

	graph.click_node(&hub).unwrap();
	let ids: Vec<String> = graph.frame().nodes.iter().map(|n| n.id.to_string()).collect();
	assert_eq!(ids, vec!["hub", "z", "w"]);
	assert_eq!(graph.frame().links.len(), 2);

	graph.click_node(&hub).unwrap();
	assert_eq!(graph.frame().nodes.len(), 5);
}

#[test]
fn test_focus_node_centers_view() {
	let mut data = dataset(&["a"], &[]);
	data.nodes[0] = GraphNode::new("a").with_position(100.0, 50.0);
	let user = ConfigEntry::from(json!({ "staticGraph": true, "focusZoom": 2 }));
	let mut graph = GraphController::new(&data, Some(user), ManualScheduler::new()).unwrap();

	graph.focus_node(Some(&NodeId::from("a"))).unwrap();
	let t = graph.transform();
	assert_eq!((t.x, t.y, t.k), (200.0, 100.0, 2.0));

	graph.focus_node(None).unwrap();
	assert_eq!(graph.transform(), t);
	assert!(graph.focus_node(Some(&NodeId::from("b"))).is_err());
}

#[test]
fn test_directed_toggle_rebuilds_adjacency() {
	let mut graph = controller(json!({}));
	assert!(graph.graph().adjacency().contains(&NodeId::from("b"), &NodeId::from("a")));

	graph.update_config(Some(ConfigEntry::from(json!({ "directed": true }))));
	assert!(graph.graph().is_directed());
	assert!(!graph.graph().adjacency().contains(&NodeId::from("b"), &NodeId::from("a")));
	assert!(graph.frame().links.iter().all(|l| l.directed));
}

#[test]
fn test_teardown_stops_frames() {
	let mut graph = controller(json!({}));
	let events = recorder(&mut graph);
	graph.teardown();
	assert!(!graph.scheduler().is_pending());

	graph.restart_layout();
	assert!(!graph.scheduler().is_pending());
	graph.click_node(&NodeId::from("a")).unwrap();
	assert!(events.borrow().is_empty());
}

#[test]
fn test_integer_ids_from_json() {
	let data = GraphData::from_json(
		r#"{
			"nodes": [{ "id": 1 }, { "id": 2, "color": "red" }],
			"links": [{ "source": 1, "target": 2 }, { "source": 1, "target": 2 }, { "source": 2, "target": 2 }]
		}"#,
	)
	.unwrap();
	let mut graph = GraphController::new(&data, None, ManualScheduler::new()).unwrap();
	let frame = graph.frame();
	let ids: Vec<String> = frame.links.iter().map(|l| l.id.to_string()).collect();
	assert_eq!(ids, vec!["1,2", "1,2#1", "2,2"]);
	assert_eq!(frame.node(&NodeId::from("2")).unwrap().color, "red");
}
