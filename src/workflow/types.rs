//! Core workflow graph type definitions
//!
//! Nodes, edges and the export/import snapshot exchanged with the editor canvas.
//! The JSON shapes follow what the canvas renders (camelCase keys, `type`
//! discriminators), so a snapshot downloaded from the editor imports as-is.

use crate::error::{FlowForgeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Free-form attribute bag carried by nodes and edges
pub type Attributes = Map<String, Value>;

/// Parallel path count a fan node starts with when none is given
pub const DEFAULT_PARALLEL_PATHS: u32 = 3;

/// Render type the canvas registers its node component under
pub const RENDER_TYPE: &str = "customNode";

/// Canvas coordinates. Opaque to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single unit of work on the canvas
///
/// Besides the semantic `data`, nodes carry presentation state the canvas
/// writes back through change deltas (selection, measured size). Anything
/// else the canvas attaches is preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique node identifier within the graph (e.g., "node-3f2a...")
    pub id: String,
    /// Canvas component used to draw the node
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub render_type: Option<String>,
    #[serde(default)]
    pub position: Position,
    /// Typed node attributes keyed by the `type` discriminator
    #[serde(default)]
    pub data: NodeData,
    /// Presentation only, replaced wholesale by style updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dragging: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(flatten)]
    pub extra: Attributes,
}

impl GraphNode {
    /// Create a node the way the canvas does on drop: generated id, custom
    /// render type, and kind-specific defaults in `data`.
    pub fn new(kind: NodeKind, label: impl Into<String>, position: Position) -> Self {
        Self {
            id: format!("node-{}", Uuid::new_v4().simple()),
            render_type: Some(RENDER_TYPE.to_string()),
            position,
            data: NodeData::new(kind, label),
            style: None,
            selected: None,
            dragging: None,
            width: None,
            height: None,
            extra: Attributes::new(),
        }
    }
}

/// Node attributes, decoded into a variant keyed by the `type` discriminator.
///
/// The wire object is kept exactly as received (alias spellings, absent
/// labels, values that do not fit the variant), so reading and writing a node
/// never changes its data. [`NodeKind`] is the typed view of that object and is
/// re-derived on every mutation.
///
/// On the wire this is the flat object the canvas produces, e.g.
/// `{"type": "fanIn", "label": "Split", "parallelPaths": 3, "action": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Attributes", into = "Attributes")]
pub struct NodeData {
    kind: NodeKind,
    attributes: Attributes,
}

/// Node palette of the editor
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Input,
    Transform,
    Output,
    Conditional { condition: String },
    FanIn { parallel_paths: u32 },
    FanOut { parallel_paths: u32 },
    Llm,
    Api,
    Webhook,
    Notification,
    Analytics,
    Messaging,
    /// Any discriminator this build does not know about. Data without a
    /// string `type` decodes to `Custom("")`.
    Custom(String),
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Custom(String::new())
    }
}

impl NodeKind {
    /// Canonical discriminator for new nodes of this kind
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Transform => "transform",
            NodeKind::Output => "output",
            NodeKind::Conditional { .. } => "conditional",
            NodeKind::FanIn { .. } => "fanIn",
            NodeKind::FanOut { .. } => "fanOut",
            NodeKind::Llm => "llm",
            NodeKind::Api => "api",
            NodeKind::Webhook => "webhook",
            NodeKind::Notification => "notification",
            NodeKind::Analytics => "analytics",
            NodeKind::Messaging => "messaging",
            NodeKind::Custom(name) => name,
        }
    }

    /// Number of parallel output/input handles for fan nodes
    pub fn handle_count(&self) -> Option<u32> {
        match self {
            NodeKind::FanIn { parallel_paths } | NodeKind::FanOut { parallel_paths } => {
                Some(*parallel_paths)
            }
            _ => None,
        }
    }

    /// Typed view of a node data object. Never fails: fields that do not fit
    /// fall back to their defaults here and stay untouched in the object.
    fn decode(attrs: &Attributes) -> Self {
        let Some(name) = attrs.get("type").and_then(Value::as_str) else {
            return NodeKind::default();
        };
        match name {
            "input" => NodeKind::Input,
            "transform" => NodeKind::Transform,
            "output" => NodeKind::Output,
            "conditional" => NodeKind::Conditional {
                condition: attrs
                    .get("condition")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "fanIn" | "fan-in" => NodeKind::FanIn {
                parallel_paths: parallel_paths(attrs),
            },
            "fanOut" | "fan-out" => NodeKind::FanOut {
                parallel_paths: parallel_paths(attrs),
            },
            "llm" | "llm-call" => NodeKind::Llm,
            "api" | "api-call" => NodeKind::Api,
            "webhook" => NodeKind::Webhook,
            "notification" => NodeKind::Notification,
            "analytics" => NodeKind::Analytics,
            "messaging" => NodeKind::Messaging,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// `parallelPaths` as a number or numeric string, else the default
fn parallel_paths(attrs: &Attributes) -> u32 {
    match attrs.get("parallelPaths") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
    .unwrap_or(DEFAULT_PARALLEL_PATHS)
}

impl NodeData {
    /// Data for a node dropped from the palette, with the kind's fields spelled out
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("type".to_string(), Value::String(kind.type_name().to_string()));
        attributes.insert("label".to_string(), Value::String(label.into()));
        match &kind {
            NodeKind::Conditional { condition } => {
                attributes.insert("condition".to_string(), Value::String(condition.clone()));
            }
            NodeKind::FanIn { parallel_paths } | NodeKind::FanOut { parallel_paths } => {
                attributes.insert("parallelPaths".to_string(), Value::from(*parallel_paths));
            }
            _ => {}
        }
        Self { kind, attributes }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Display label; empty when the data carries none
    pub fn label(&self) -> &str {
        self.attributes
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The full data object as it goes on the wire
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Shallow-merge `partial`: its keys win, unspecified keys are kept.
    /// A `type` key re-tags the node.
    pub fn merge(&mut self, partial: &Attributes) {
        for (key, value) in partial {
            self.attributes.insert(key.clone(), value.clone());
        }
        self.kind = NodeKind::decode(&self.attributes);
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
        self.kind = NodeKind::decode(&self.attributes);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.attributes.remove(key);
        self.kind = NodeKind::decode(&self.attributes);
        removed
    }
}

impl From<Attributes> for NodeData {
    fn from(attributes: Attributes) -> Self {
        Self {
            kind: NodeKind::decode(&attributes),
            attributes,
        }
    }
}

impl From<NodeData> for Attributes {
    fn from(data: NodeData) -> Self {
        data.attributes
    }
}

/// Directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Named output port on the source (e.g. "true"/"false" on conditionals)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Named input port on the target (e.g. a fan-in path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(flatten)]
    pub extra: Attributes,
}

impl GraphEdge {
    pub fn references(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// A request to connect two handles, as emitted by the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl Connection {
    /// Deterministic edge id used by the canvas for this connection
    pub fn edge_id(&self) -> String {
        format!(
            "reactflow__edge-{}{}-{}{}",
            self.source,
            self.source_handle.as_deref().unwrap_or_default(),
            self.target,
            self.target_handle.as_deref().unwrap_or_default()
        )
    }

    /// True when `edge` already links the same handles
    pub fn matches(&self, edge: &GraphEdge) -> bool {
        edge.source == self.source
            && edge.target == self.target
            && edge.source_handle == self.source_handle
            && edge.target_handle == self.target_handle
    }

    /// Build the edge the editor draws for a new connection
    pub fn into_edge(self) -> GraphEdge {
        let mut style = Attributes::new();
        style.insert("stroke".to_string(), Value::from("#555"));
        style.insert("strokeWidth".to_string(), Value::from(2));
        GraphEdge {
            id: self.edge_id(),
            source: self.source,
            target: self.target,
            source_handle: self.source_handle,
            target_handle: self.target_handle,
            style: Some(Value::Object(style)),
            animated: Some(true),
            selected: None,
            extra: Attributes::new(),
        }
    }
}

/// Export/import unit of a whole graph
///
/// Format: `{ "name": "...", "nodes": [...], "edges": [...], "exportedAt": "<ISO-8601>" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

impl WorkflowSnapshot {
    /// Parse an exported workflow document.
    ///
    /// Only checks that `nodes` and `edges` are arrays before decoding; dangling
    /// edge references are accepted and left to the caller.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let object = value.as_object().ok_or_else(|| {
            FlowForgeError::MalformedPayload("workflow must be a JSON object".to_string())
        })?;
        for key in ["nodes", "edges"] {
            if !object.get(key).is_some_and(Value::is_array) {
                return Err(FlowForgeError::MalformedPayload(format!("`{key}` must be an array")));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Download file name: whitespace runs become underscores
    pub fn file_name(&self) -> String {
        let stem = self.name.split_whitespace().collect::<Vec<_>>().join("_");
        format!("{stem}.json")
    }
}

/// Result of running one node, pushed by the remote run channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeReport {
    pub is_success: bool,
    pub node_id: String,
    #[serde(default)]
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> NodeData {
        serde_json::from_value(value).expect("valid node data")
    }

    #[test]
    fn test_fan_node_parses_parallel_paths() {
        let parsed = data(json!({"type": "fanOut", "label": "Split", "parallelPaths": 5}));
        assert_eq!(parsed.kind(), &NodeKind::FanOut { parallel_paths: 5 });
        assert_eq!(parsed.kind().handle_count(), Some(5));
        assert_eq!(parsed.label(), "Split");
    }

    #[test]
    fn test_fan_node_defaults_to_three_paths() {
        let parsed = data(json!({"type": "fan-in", "label": "Join"}));
        assert_eq!(parsed.kind(), &NodeKind::FanIn { parallel_paths: DEFAULT_PARALLEL_PATHS });
    }

    #[test]
    fn test_data_is_written_back_exactly_as_read() {
        let inputs = [
            json!({"type": "fan-in", "label": "J"}),
            json!({"type": "fan-out", "label": "S", "parallelPaths": "4"}),
            json!({"type": "conditional", "label": "C"}),
            json!({"type": "llm-call", "label": "Ask"}),
            json!({"type": "api-call"}),
            json!({"type": "input"}),
            json!({"label": "no type"}),
        ];
        for raw in inputs {
            let parsed = data(raw.clone());
            assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
        }
        assert_eq!(data(json!({"type": "llm-call"})).kind(), &NodeKind::Llm);
        assert_eq!(data(json!({"type": "api-call"})).kind(), &NodeKind::Api);
        assert_eq!(
            data(json!({"type": "fan-out", "parallelPaths": "4"})).kind(),
            &NodeKind::FanOut { parallel_paths: 4 }
        );
    }

    #[test]
    fn test_residual_attributes_survive_round_trip() {
        let raw = json!({
            "type": "llm",
            "label": "Summarise",
            "model": "CHAT",
            "temperature": 0.2,
            "messages": [{"role": "user", "content": "hi"}]
        });
        let parsed = data(raw.clone());
        assert_eq!(parsed.kind(), &NodeKind::Llm);
        assert_eq!(parsed.get("model"), Some(&json!("CHAT")));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }

    #[test]
    fn test_unknown_type_is_kept_as_custom() {
        let parsed = data(json!({"type": "sentiment", "label": "Mood"}));
        assert_eq!(parsed.kind(), &NodeKind::Custom("sentiment".to_string()));
        assert_eq!(serde_json::to_value(&parsed).unwrap()["type"], json!("sentiment"));
    }

    #[test]
    fn test_missing_or_odd_type_decodes_as_untyped() {
        let parsed = data(json!({"label": "nope"}));
        assert_eq!(parsed.kind(), &NodeKind::Custom(String::new()));
        let parsed = data(json!({"type": 7, "label": "numeric"}));
        assert_eq!(parsed.kind(), &NodeKind::Custom(String::new()));
        assert_eq!(parsed.get("type"), Some(&json!(7)));
    }

    #[test]
    fn test_merge_keeps_unspecified_fields_and_retags() {
        let mut node = data(json!({"type": "transform", "label": "Map", "action": "trim"}));
        let mut partial = Attributes::new();
        partial.insert("label".to_string(), json!("Map v2"));
        node.merge(&partial);
        assert_eq!(node.label(), "Map v2");
        assert_eq!(node.get("action"), Some(&json!("trim")));

        partial.insert("type".to_string(), json!("conditional"));
        partial.insert("condition".to_string(), json!("x > 1"));
        node.merge(&partial);
        assert_eq!(
            node.kind(),
            &NodeKind::Conditional {
                condition: "x > 1".to_string()
            }
        );
    }

    #[test]
    fn test_merge_keeps_values_that_do_not_fit_the_variant() {
        let mut node = data(json!({"type": "fanIn", "label": "Old", "parallelPaths": 5}));
        let mut partial = Attributes::new();
        partial.insert("label".to_string(), json!("New"));
        partial.insert("parallelPaths".to_string(), json!(""));
        node.merge(&partial);

        assert_eq!(node.label(), "New");
        assert_eq!(node.get("parallelPaths"), Some(&json!("")));
        assert_eq!(node.kind().handle_count(), Some(DEFAULT_PARALLEL_PATHS));
    }

    #[test]
    fn test_new_data_spells_out_kind_fields() {
        let fan = NodeData::new(NodeKind::FanOut { parallel_paths: 3 }, "Split");
        assert_eq!(
            serde_json::to_value(&fan).unwrap(),
            json!({"type": "fanOut", "label": "Split", "parallelPaths": 3})
        );
    }

    #[test]
    fn test_node_keeps_canvas_fields() {
        let raw = json!({
            "id": "node-1",
            "type": "customNode",
            "position": {"x": 10.0, "y": 20.0},
            "positionAbsolute": {"x": 10.0, "y": 20.0},
            "data": {"type": "input", "label": "Start"},
            "width": 150.0,
            "height": 40.0
        });
        let node: GraphNode = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(node.render_type.as_deref(), Some(RENDER_TYPE));
        assert_eq!(node.width, Some(150.0));
        assert!(node.extra.contains_key("positionAbsolute"));
        assert_eq!(serde_json::to_value(&node).unwrap(), raw);
    }

    #[test]
    fn test_connection_edge_id_matches_canvas_format() {
        let conn = Connection {
            source: "a".to_string(),
            target: "b".to_string(),
            source_handle: Some("true".to_string()),
            target_handle: None,
        };
        assert_eq!(conn.edge_id(), "reactflow__edge-atrue-b");
        let edge = conn.clone().into_edge();
        assert!(conn.matches(&edge));
        assert_eq!(edge.animated, Some(true));
    }

    #[test]
    fn test_snapshot_requires_arrays() {
        let err = WorkflowSnapshot::from_json(r#"{"name": "x", "nodes": {}, "edges": []}"#).unwrap_err();
        assert!(matches!(err, FlowForgeError::MalformedPayload(ref m) if m.contains("nodes")));

        let err = WorkflowSnapshot::from_json("{not json").unwrap_err();
        assert!(matches!(err, FlowForgeError::MalformedPayload(_)));

        let ok = WorkflowSnapshot::from_json(r#"{"nodes": [], "edges": []}"#).unwrap();
        assert!(ok.name.is_empty());
        assert!(ok.exported_at.is_none());
    }

    #[test]
    fn test_snapshot_accepts_typeless_node_data() {
        let raw = r#"{"nodes": [{"id": "x", "position": {"x": 0, "y": 0}, "data": {"label": "no type"}}], "edges": []}"#;
        let snapshot = WorkflowSnapshot::from_json(raw).unwrap();
        assert_eq!(snapshot.nodes[0].data.label(), "no type");
        assert_eq!(
            serde_json::to_value(&snapshot.nodes[0].data).unwrap(),
            json!({"label": "no type"})
        );
    }

    #[test]
    fn test_snapshot_file_name() {
        let snapshot = WorkflowSnapshot {
            name: "Untitled  Workflow v2".to_string(),
            nodes: vec![],
            edges: vec![],
            exported_at: None,
        };
        assert_eq!(snapshot.file_name(), "Untitled_Workflow_v2.json");
    }
}
