//! Edge Classifier - was a transition a picked choice or free text?
//!
//! Rules, first match wins:
//! 1. An explicit choice label on the child -> `Choice`
//! 2. No parent (root) -> `Choice`
//! 3. No causing action (empty or absent) -> `Choice`
//! 4. Parent's option list unknown (older data) -> `Choice`
//! 5. Action is byte-for-byte one of the parent's options -> `Choice`
//! 6. Otherwise -> `FreeText`
//!
//! Rule 4 is a heuristic: old saves never recorded what was offered, so they
//! are assumed to be choices unless proven otherwise.

use serde::{Deserialize, Serialize};
use worldline_model::SaveNode;

/// How a child node was reached from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    /// The player typed their own action.
    FreeText,
    /// The player picked one of the offered options.
    Choice,
}

impl TransitionKind {
    /// Short UI caption for the transition.
    pub fn caption(&self) -> &'static str {
        match self {
            TransitionKind::FreeText => "自由输入",
            TransitionKind::Choice => "关键抉择",
        }
    }
}

/// Classify the transition from `parent` to `child`.
pub fn classify(child: &SaveNode, parent: Option<&SaveNode>) -> TransitionKind {
    if child.choice_label.is_some() {
        return TransitionKind::Choice;
    }
    let Some(parent) = parent else {
        return TransitionKind::Choice;
    };
    let Some(action) = child.action() else {
        return TransitionKind::Choice;
    };
    match &parent.offered_options {
        None => TransitionKind::Choice,
        Some(options) if options.iter().any(|o| o == action) => TransitionKind::Choice,
        Some(_) => TransitionKind::FreeText,
    }
}
