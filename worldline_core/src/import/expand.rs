//! Materialization of foreign records into save nodes.

use serde_json::{Map, Value};
use worldline_model::{ContentId, NodeKind, RecordId, SaveNode, TreeId};

use super::payload::{HistoryBeat, SessionRecord};
use crate::config::ImportConfig;

/// Expand a session record into one node per history beat.
///
/// Beats are chained through their content ids. Timestamps count back from
/// the record's own timestamp by `history_step_ms` per beat, so relative
/// order survives even when absolute times are unknown. Only the last node
/// carries the record's own id and terminal metadata.
///
/// The record's `parentContentId` names the terminal beat's parent. When it
/// points into the history itself the chain starts at a root; otherwise it
/// anchors the first beat to a node outside the record.
pub(crate) fn expand_session(record: SessionRecord, config: &ImportConfig) -> Vec<SaveNode> {
    let tree_id = record
        .tree_id
        .clone()
        .unwrap_or_else(|| TreeId::new(record.id.as_str()));

    if record.history.is_empty() {
        let content_id = record.content_id.clone();
        return vec![terminal_node(&record, tree_id, content_id, HistoryBeat::default())];
    }

    let last = record.history.len() - 1;
    let mut parent = record
        .parent_content_id
        .clone()
        .filter(|anchor| !names_beat(&record, anchor));
    let mut nodes = Vec::with_capacity(record.history.len());

    for (i, beat) in record.history.iter().enumerate() {
        let content_id = beat
            .id
            .clone()
            .or_else(|| (i == last).then(|| record.content_id.clone()).flatten())
            .unwrap_or_else(|| derive_beat_id(config, &tree_id, parent.as_ref(), beat));

        let mut node = if i == last {
            terminal_node(&record, tree_id.clone(), Some(content_id.clone()), beat.clone())
        } else {
            let record_id =
                RecordId::derived(&config.id_namespace, &[tree_id.as_str(), content_id.as_str()]);
            beat_node(SaveNode::with_record_id(record_id, tree_id.clone()), beat.clone())
                .with_content(content_id.clone())
        };
        node.parent_content_id = parent.clone();
        let back = config.history_step_ms.saturating_mul((last - i) as i64);
        node.timestamp = record.timestamp.saturating_sub(back);

        parent = Some(content_id);
        nodes.push(node);
    }
    nodes
}

/// True when `content_id` is the id of one of the record's own beats.
fn names_beat(record: &SessionRecord, content_id: &ContentId) -> bool {
    record.content_id.as_ref() == Some(content_id)
        || record.history.iter().any(|beat| beat.id.as_ref() == Some(content_id))
}

/// Synthesize the single node for a bare initial configuration.
///
/// Ids are derived from the document itself, so importing the same document
/// twice lands on the same tree and content.
pub(crate) fn synthesize_initial_config(
    doc: Map<String, Value>,
    config: &ImportConfig,
) -> SaveNode {
    let ns = &config.id_namespace;
    let doc = Value::Object(doc);
    let canonical = doc.to_string();

    let tree_id = TreeId::derived(ns, &["initial-config", canonical.as_str()]);
    let content_id = ContentId::derived(ns, &[tree_id.as_str(), "initial-config"]);
    let record_id = RecordId::derived(ns, &[tree_id.as_str(), content_id.as_str()]);

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| doc.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };

    let mut node = SaveNode::with_record_id(record_id, tree_id)
        .with_content(content_id)
        .with_kind(NodeKind::InitialConfig)
        .with_timestamp(doc.get("timestamp").and_then(Value::as_i64).unwrap_or(0));
    node.display.background_image = text(&["backgroundImage", "background"]);
    node.label = text(&["title", "name"]);
    node.narrative = Some(doc);
    node
}

/// Build the node that carries the record's own identity and metadata.
fn terminal_node(
    record: &SessionRecord,
    tree_id: TreeId,
    content_id: Option<ContentId>,
    beat: HistoryBeat,
) -> SaveNode {
    let mut node = beat_node(SaveNode::with_record_id(record.id.clone(), tree_id), beat);
    node.content_id = content_id;
    node.parent_content_id = record.parent_content_id.clone();
    node.timestamp = record.timestamp;
    node.kind = record.kind;
    node.label = record.label.clone();
    node.manual_position = record.manual_position;

    node.causing_action = node.causing_action.or_else(|| record.causing_action.clone());
    node.offered_options = node.offered_options.or_else(|| record.offered_options.clone());
    node.choice_label = node.choice_label.or_else(|| record.choice_label.clone());
    node.narrative = node.narrative.or_else(|| record.narrative.clone());

    if let Some(image) = &record.display.background_image {
        node.display.background_image = Some(image.clone());
    }
    node.display.extra.extend(record.display.extra.clone());
    node
}

fn beat_node(mut node: SaveNode, beat: HistoryBeat) -> SaveNode {
    node.causing_action = beat.action;
    node.offered_options = beat.options;
    node.choice_label = beat.choice_label;
    node.display.background_image = beat.background;
    node.narrative = beat.narrative;
    node
}

/// Content id for a beat that arrived without one. Derived from the path
/// that led to it, so shared prefixes of two exported branches coincide.
fn derive_beat_id(
    config: &ImportConfig,
    tree_id: &TreeId,
    parent: Option<&ContentId>,
    beat: &HistoryBeat,
) -> ContentId {
    let narrative = beat
        .narrative
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_default();
    ContentId::derived(
        &config.id_namespace,
        &[
            tree_id.as_str(),
            parent.map(ContentId::as_str).unwrap_or_default(),
            beat.action.as_deref().unwrap_or_default(),
            narrative.as_str(),
        ],
    )
}
