//! Wire shapes of exported path records

use crate::models::{Node, NodeKind};
use serde::Deserialize;
use serde_json::{Map, Value};

/// A path as it appears in an export: either the graph-database shape
/// (`{"nodes": [{"id": .., "properties": {..}}]}`), a flat list of node
/// property maps, or a JSON string holding the flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawPath {
    Graph { nodes: Vec<RawGraphNode> },
    Flat(Vec<Map<String, Value>>),
    Encoded(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGraphNode {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl RawPath {
    /// Convert into nodes, preserving order
    pub(crate) fn into_nodes(self) -> Result<Vec<Node>, serde_json::Error> {
        match self {
            RawPath::Graph { nodes } => Ok(nodes
                .iter()
                .map(|n| node_from_properties(&n.properties, Some(&n.id)))
                .collect()),
            RawPath::Flat(maps) => Ok(maps
                .iter()
                .map(|props| node_from_properties(props, None))
                .collect()),
            RawPath::Encoded(text) => {
                let maps: Vec<Map<String, Value>> = serde_json::from_str(&text)?;
                Ok(maps
                    .iter()
                    .map(|props| node_from_properties(props, None))
                    .collect())
            }
        }
    }
}

/// Render a property value as text; `null` and absent become empty
pub(crate) fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

fn prop<'a>(props: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| props.get(*k))
}

/// Extract the fixed node fields from a property map
pub(crate) fn node_from_properties(props: &Map<String, Value>, id: Option<&Value>) -> Node {
    let kind_raw = value_text(prop(props, &["kind", "node_name"]));
    let id = match id {
        Some(v) if !v.is_null() => value_text(Some(v)),
        _ => value_text(props.get("id")),
    };

    Node {
        full_inst: value_text(props.get("full_inst")),
        debug_location: value_text(prop(props, &["debug_location", "src_loc"])),
        ir_opcode: value_text(props.get("ir_opcode")),
        content_hash: value_text(prop(props, &["content_hash", "n_hash"])),
        node_type: value_text(props.get("node_type")),
        func_name: value_text(props.get("func_name")),
        call_site_name: value_text(prop(props, &["call_site_name", "cs_name"])),
        kind: NodeKind::from_raw(&kind_raw),
        id,
    }
}

/// Name of the procedure a record was queried from. The export may give a
/// plain string or the function node itself.
pub(crate) fn procedure_name(value: &Value) -> String {
    match value {
        Value::Object(obj) => {
            let props = obj
                .get("properties")
                .and_then(Value::as_object)
                .unwrap_or(obj);
            value_text(prop(props, &["name", "func_name"]))
        }
        other => value_text(Some(other)),
    }
}
