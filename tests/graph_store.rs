use flowforge::workflow::{
    Attributes, Connection, GraphEdge, GraphNode, GraphStore, NodeChange, NodeKind, Position,
    StoreEvent, WorkflowSnapshot,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn node(id: &str, kind: NodeKind) -> GraphNode {
    let mut node = GraphNode::new(kind, id, Position::new(0.0, 0.0));
    node.id = id.to_string();
    node
}

fn connect(store: &GraphStore, source: &str, target: &str) -> String {
    store
        .connect(Connection {
            source: source.to_string(),
            target: target.to_string(),
            source_handle: None,
            target_handle: None,
        })
        .unwrap()
}

fn sample_store() -> GraphStore {
    let store = GraphStore::new();
    store.add_node(node("in", NodeKind::Input));
    store.add_node(node("split", NodeKind::FanOut { parallel_paths: 3 }));
    store.add_node(node("out", NodeKind::Output));
    connect(&store, "in", "split");
    connect(&store, "split", "out");
    store
}

#[test]
fn export_import_round_trip_preserves_graph() {
    let store = sample_store();
    let mut partial = Attributes::new();
    partial.insert("description".to_string(), json!("entry point"));
    store.update_node("in", &partial);

    let exported = store.export_snapshot();
    let raw = exported.to_json_pretty().unwrap();
    let parsed = WorkflowSnapshot::from_json(&raw).unwrap();

    let other = GraphStore::new();
    other.import_snapshot(parsed);

    assert_eq!(other.nodes(), store.nodes());
    assert_eq!(other.edges(), store.edges());
    assert_eq!(other.name(), "Untitled Workflow");
    assert_eq!(exported.file_name(), "Untitled_Workflow.json");
}

#[test]
fn node_removal_never_leaves_dangling_edges() {
    let store = sample_store();
    store.remove_node("split");

    let ids: Vec<String> = store.nodes().into_iter().map(|n| n.id).collect();
    assert_eq!(ids, vec!["in".to_string(), "out".to_string()]);
    assert!(store.edges().is_empty());

    // Removing again is a no-op
    store.remove_node("split");
    assert_eq!(store.nodes().len(), 2);
}

#[test]
fn canvas_removals_cascade_like_direct_removal() {
    let store = sample_store();
    store.apply_changes(&[NodeChange::Remove { id: "out".to_string() }], &[]);
    let edges: Vec<GraphEdge> = store.edges();
    assert_eq!(edges.len(), 1);
    assert!(edges.iter().all(|e| e.source != "out" && e.target != "out"));
}

#[test]
fn import_accepts_dangling_edges() {
    let raw = json!({
        "nodes": [],
        "edges": [{"id": "e1", "source": "ghost", "target": "phantom"}]
    })
    .to_string();
    let store = GraphStore::new();
    store.import_snapshot(WorkflowSnapshot::from_json(&raw).unwrap());
    assert_eq!(store.edges().len(), 1);
    assert!(store.nodes().is_empty());
}

#[test]
fn import_rejects_non_array_collections() {
    let raw = json!({"nodes": {}, "edges": []}).to_string();
    assert!(WorkflowSnapshot::from_json(&raw).is_err());
    assert!(WorkflowSnapshot::from_json("not json").is_err());
}

#[test]
fn observers_see_fan_out_handle_changes() {
    let store = sample_store();
    let mut events = store.subscribe();

    let mut partial = Attributes::new();
    partial.insert("parallelPaths".to_string(), json!(5));
    store.update_node("split", &partial);

    assert_eq!(
        events.try_recv().unwrap(),
        StoreEvent::NodeUpdated {
            id: "split".to_string()
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        StoreEvent::HandleCountChanged {
            id: "split".to_string(),
            count: 5
        }
    );
    assert_eq!(
        store.node("split").unwrap().data.kind(),
        &NodeKind::FanOut { parallel_paths: 5 }
    );
}

#[test]
fn snapshot_json_keeps_hyphenated_types_and_absent_fields() {
    let raw = json!({
        "name": "Aliases",
        "nodes": [
            {"id": "a", "position": {"x": 1.0, "y": 2.0}, "data": {"type": "fan-out", "label": "S"}},
            {"id": "b", "position": {"x": 3.0, "y": 4.0}, "data": {"type": "api-call"}}
        ],
        "edges": [{"id": "e", "source": "a", "target": "b"}]
    });
    let store = GraphStore::new();
    store.import_snapshot(WorkflowSnapshot::from_json(&raw.to_string()).unwrap());

    let exported = serde_json::to_value(store.export_snapshot()).unwrap();
    assert_eq!(exported["nodes"][0]["data"], raw["nodes"][0]["data"]);
    assert_eq!(exported["nodes"][1]["data"], raw["nodes"][1]["data"]);
    assert_eq!(exported["edges"], raw["edges"]);
}
