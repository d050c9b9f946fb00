//! Save node definitions - one point in a worldline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ContentId, RecordId, TreeId};

/// Provenance/role of a record. Not tree-structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// The starting configuration of a worldline (protagonist, world).
    InitialConfig,
    /// Written automatically as play progresses.
    #[default]
    Auto,
    /// Saved explicitly by the player.
    Manual,
}

/// A point on the visualization canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// User-placed positions keyed by record, owned by the presentation layer.
pub type PositionOverrides = BTreeMap<RecordId, Position>;

/// Names of the inheritable display attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisplayAttribute {
    /// Scene background image.
    BackgroundImage,
    /// Any other attribute stored in the `extra` bag.
    Custom(String),
}

impl DisplayAttribute {
    pub fn custom(name: impl Into<String>) -> Self {
        DisplayAttribute::Custom(name.into())
    }
}

/// Sparse bag of inheritable display fields.
///
/// A missing field means "inherit from the nearest ancestor that has one".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DisplayAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl DisplayAttributes {
    /// Look up an attribute carried directly by this bag (no inheritance).
    pub fn get(&self, attribute: &DisplayAttribute) -> Option<&str> {
        match attribute {
            DisplayAttribute::BackgroundImage => self.background_image.as_deref(),
            DisplayAttribute::Custom(name) => self.extra.get(name).map(String::as_str),
        }
    }

    pub fn set(&mut self, attribute: DisplayAttribute, value: impl Into<String>) {
        match attribute {
            DisplayAttribute::BackgroundImage => self.background_image = Some(value.into()),
            DisplayAttribute::Custom(name) => {
                self.extra.insert(name, value.into());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.background_image.is_none() && self.extra.is_empty()
    }
}

/// A single point in a worldline.
///
/// Parent links are expressed through content identity (`parent_content_id`)
/// rather than record identity, so the same beat re-imported as a different
/// record still attaches to the right place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveNode {
    pub record_id: RecordId,

    pub tree_id: TreeId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<ContentId>,

    /// Content id of the beat this node continues from. `None` marks a root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_content_id: Option<ContentId>,

    /// Creation time in Unix epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,

    /// Text that produced this node from its parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causing_action: Option<String>,

    /// Choices offered at this node. `None` = unknown (older data).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offered_options: Option<Vec<String>>,

    /// Explicit marker that the causing action was a picked choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_label: Option<String>,

    #[serde(default, skip_serializing_if = "DisplayAttributes::is_empty")]
    pub display: DisplayAttributes,

    #[serde(default)]
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_position: Option<Position>,

    /// Player-provided annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Opaque content produced by the generative service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<serde_json::Value>,
}

impl SaveNode {
    /// Create a new node with a fresh record id.
    pub fn new(tree_id: impl Into<TreeId>) -> Self {
        Self::with_record_id(RecordId::generate(), tree_id)
    }

    /// Create a new node with a known record id.
    pub fn with_record_id(record_id: impl Into<RecordId>, tree_id: impl Into<TreeId>) -> Self {
        Self {
            record_id: record_id.into(),
            tree_id: tree_id.into(),
            content_id: None,
            parent_content_id: None,
            timestamp: 0,
            causing_action: None,
            offered_options: None,
            choice_label: None,
            display: DisplayAttributes::default(),
            kind: NodeKind::Auto,
            manual_position: None,
            label: None,
            narrative: None,
        }
    }

    pub fn with_content(mut self, content_id: impl Into<ContentId>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    pub fn with_parent(mut self, parent_content_id: impl Into<ContentId>) -> Self {
        self.parent_content_id = Some(parent_content_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.causing_action = Some(action.into());
        self
    }

    /// Set the choices offered at this node.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.offered_options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_choice_label(mut self, label: impl Into<String>) -> Self {
        self.choice_label = Some(label.into());
        self
    }

    pub fn with_background(mut self, image: impl Into<String>) -> Self {
        self.display.background_image = Some(image.into());
        self
    }

    pub fn with_display(mut self, display: DisplayAttributes) -> Self {
        self.display = display;
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_manual_position(mut self, position: Position) -> Self {
        self.manual_position = Some(position);
        self
    }

    pub fn with_narrative(mut self, narrative: serde_json::Value) -> Self {
        self.narrative = Some(narrative);
        self
    }

    /// Pin this node to a user-chosen position.
    pub fn set_manual_position(&mut self, position: Position) {
        self.manual_position = Some(position);
    }

    pub fn clear_manual_position(&mut self) {
        self.manual_position = None;
    }

    pub fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// The causing action, treating an empty string as absent.
    pub fn action(&self) -> Option<&str> {
        self.causing_action.as_deref().filter(|a| !a.is_empty())
    }
}
