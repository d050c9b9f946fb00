//! Recognition of the payload shapes accepted by the importer.

use serde::Deserialize;
use serde_json::{Map, Value};
use worldline_model::{
    ContentId, DisplayAttributes, NodeKind, Position, RecordId, SaveNode, TreeId,
};

use crate::error::ImportError;
use crate::export::{EXPORT_FORMAT, EXPORT_VERSION};

/// The top-level shape of an import payload.
#[derive(Debug)]
pub(crate) enum Payload {
    /// An array of records, or the node list of an export document.
    Batch(Vec<Value>),
    /// One record or one initial-configuration document.
    Single(ForeignRecord),
}

/// One record in any of the accepted shapes.
#[derive(Debug)]
pub(crate) enum ForeignRecord {
    /// Already a save node (as written by export).
    Node(Box<SaveNode>),
    /// A save record that may embed its narrative history.
    Session(Box<SessionRecord>),
    /// A bare starting configuration with no history.
    InitialConfig(Map<String, Value>),
}

/// A save record as written by the game: the terminal state of a playthrough,
/// optionally with the beats that led there.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionRecord {
    #[serde(alias = "recordId")]
    pub id: RecordId,
    #[serde(default)]
    pub tree_id: Option<TreeId>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub content_id: Option<ContentId>,
    #[serde(default)]
    pub parent_content_id: Option<ContentId>,
    #[serde(default)]
    pub causing_action: Option<String>,
    #[serde(default)]
    pub offered_options: Option<Vec<String>>,
    #[serde(default)]
    pub choice_label: Option<String>,
    #[serde(default)]
    pub display: DisplayAttributes,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub manual_position: Option<Position>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub narrative: Option<Value>,
    #[serde(default)]
    pub history: Vec<HistoryBeat>,
}

/// One narrative beat inside a session record's history.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryBeat {
    #[serde(default, alias = "contentId")]
    pub id: Option<ContentId>,
    #[serde(default, alias = "causingAction")]
    pub action: Option<String>,
    #[serde(default, alias = "offeredOptions")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub choice_label: Option<String>,
    #[serde(default, alias = "backgroundImage")]
    pub background: Option<String>,
    #[serde(default, alias = "text")]
    pub narrative: Option<Value>,
}

/// Decide what kind of payload `value` is.
pub(crate) fn detect(value: Value) -> Result<Payload, ImportError> {
    match value {
        Value::Array(elements) => Ok(Payload::Batch(elements)),
        Value::Object(map) if is_export_document(&map) => export_nodes(map).map(Payload::Batch),
        Value::Object(map) => parse_object(map)
            .map(Payload::Single)
            .map_err(ImportError::MalformedPayload),
        other => Err(ImportError::MalformedPayload(format!(
            "expected an object or array, found {}",
            type_name(&other)
        ))),
    }
}

/// Parse one batch element.
pub(crate) fn parse_record(value: Value) -> Result<ForeignRecord, String> {
    match value {
        Value::Object(map) => parse_object(map),
        other => Err(format!("expected an object, found {}", type_name(&other))),
    }
}

fn parse_object(map: Map<String, Value>) -> Result<ForeignRecord, String> {
    let has = |key: &str| map.contains_key(key);
    let has_record_id = has("id") || has("recordId");

    if has("recordId") && has("treeId") && !has("history") {
        serde_json::from_value(Value::Object(map))
            .map(|node| ForeignRecord::Node(Box::new(node)))
            .map_err(|e| format!("invalid save node: {e}"))
    } else if has_record_id && (has("history") || has("contentId") || has("parentContentId")) {
        serde_json::from_value(Value::Object(map))
            .map(|record| ForeignRecord::Session(Box::new(record)))
            .map_err(|e| format!("invalid save record: {e}"))
    } else if (has("protagonist") || has("world")) && has("history") {
        Err("initial configuration carries a history but no record id".to_string())
    } else if has("protagonist") || has("world") {
        Ok(ForeignRecord::InitialConfig(map))
    } else {
        Err("neither a save record nor an initial configuration".to_string())
    }
}

fn is_export_document(map: &Map<String, Value>) -> bool {
    map.get("format").and_then(Value::as_str) == Some(EXPORT_FORMAT)
}

fn export_nodes(mut map: Map<String, Value>) -> Result<Vec<Value>, ImportError> {
    let version = map.get("version").and_then(Value::as_u64).unwrap_or(0);
    if version == 0 || version > u64::from(EXPORT_VERSION) {
        return Err(ImportError::MalformedPayload(format!(
            "unsupported export version {version}"
        )));
    }
    match map.remove("nodes") {
        Some(Value::Array(nodes)) => Ok(nodes),
        _ => Err(ImportError::MalformedPayload(
            "export document has no node list".to_string(),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
