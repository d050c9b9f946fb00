//! Import/Merge Engine - admits foreign save data without duplicating it.
//!
//! The merge works as follows:
//! 1. **Detect**: Decide which payload shape was given (see `payload`)
//! 2. **Materialize**: Turn each foreign record into save nodes, expanding
//!    embedded histories and synthesizing initial-configuration nodes
//! 3. **Dedup**: Skip candidates whose content already exists in their tree
//!    (or, lacking content, whose record id already exists)
//! 4. **Verify**: Cut parent links that would close a cycle and flag
//!    admitted nodes whose parent does not resolve
//!
//! Existing nodes are never modified; writing the admitted nodes is the
//! caller's job.

mod expand;
mod payload;

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use worldline_model::{ContentId, RecordId, SaveNode, SaveStore, TreeId};

use crate::config::ImportConfig;
use crate::error::{ImportError, IntegrityWarning};
use expand::{expand_session, synthesize_initial_config};
use payload::{detect, parse_record, ForeignRecord, Payload};

/// The result of one import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    /// Nodes to persist, in payload order.
    pub admitted: Vec<SaveNode>,
    pub admitted_count: usize,
    /// Candidates dropped as duplicates.
    pub skipped: usize,
    pub warnings: Vec<IntegrityWarning>,
}

impl ImportOutcome {
    /// True when the import brought in nothing new.
    pub fn is_empty(&self) -> bool {
        self.admitted_count == 0
    }
}

/// Imports foreign save data against a set of existing nodes.
pub struct Importer {
    config: ImportConfig,
}

impl Importer {
    /// Create a new importer with the given configuration.
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    /// Create an importer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ImportConfig::default())
    }

    /// Import a JSON payload.
    pub fn import_batch(
        &self,
        raw: &str,
        existing: &[SaveNode],
    ) -> Result<ImportOutcome, ImportError> {
        let value: Value = serde_json::from_str(raw)?;
        self.import_value(value, existing)
    }

    /// Import a JSON payload given as bytes.
    pub fn import_slice(
        &self,
        raw: &[u8],
        existing: &[SaveNode],
    ) -> Result<ImportOutcome, ImportError> {
        let value: Value = serde_json::from_slice(raw)?;
        self.import_value(value, existing)
    }

    /// Import an already-parsed payload.
    ///
    /// Fails only when the payload as a whole is unrecognizable. A batch
    /// element that cannot be read is skipped with a warning.
    pub fn import_value(
        &self,
        value: Value,
        existing: &[SaveNode],
    ) -> Result<ImportOutcome, ImportError> {
        let mut warnings = Vec::new();
        let candidates = match detect(value)? {
            Payload::Single(record) => self.materialize(record),
            Payload::Batch(elements) => {
                let mut candidates = Vec::new();
                for (index, element) in elements.into_iter().enumerate() {
                    match parse_record(element) {
                        Ok(record) => candidates.extend(self.materialize(record)),
                        Err(reason) => {
                            warnings.push(IntegrityWarning::MalformedRecord { index, reason })
                        }
                    }
                }
                candidates
            }
        };
        Ok(self.merge(candidates, existing, warnings))
    }

    /// Read everything from `store`, import `raw`, and write back only the
    /// admitted nodes.
    pub fn import_into<S: SaveStore>(
        &self,
        store: &mut S,
        raw: &str,
    ) -> Result<ImportOutcome, ImportError> {
        let existing = store.get_all()?;
        let outcome = self.import_batch(raw, &existing)?;
        if !outcome.is_empty() {
            store.put_many(outcome.admitted.clone())?;
        }
        Ok(outcome)
    }

    fn materialize(&self, record: ForeignRecord) -> Vec<SaveNode> {
        match record {
            ForeignRecord::Node(node) => vec![*node],
            ForeignRecord::Session(session) => expand_session(*session, &self.config),
            ForeignRecord::InitialConfig(doc) => vec![synthesize_initial_config(doc, &self.config)],
        }
    }

    fn merge(
        &self,
        candidates: Vec<SaveNode>,
        existing: &[SaveNode],
        mut warnings: Vec<IntegrityWarning>,
    ) -> ImportOutcome {
        let mut known_content: HashSet<(TreeId, ContentId)> = existing
            .iter()
            .filter_map(|n| Some((n.tree_id.clone(), n.content_id.clone()?)))
            .collect();
        let mut known_records: HashSet<RecordId> =
            existing.iter().map(|n| n.record_id.clone()).collect();

        let mut admitted = Vec::new();
        let mut skipped = 0;

        for mut candidate in candidates {
            if let Some(content_id) = candidate.content_id.clone() {
                let key = (candidate.tree_id.clone(), content_id);
                if known_content.contains(&key) {
                    skipped += 1;
                    continue;
                }
                if known_records.contains(&candidate.record_id) {
                    // Record ids are never reused: new content arriving under
                    // a taken id gets an id of its own.
                    let rekeyed = self.free_record_id(&key.0, &key.1, &known_records);
                    tracing::debug!(
                        from = %candidate.record_id,
                        to = %rekeyed,
                        "re-keyed imported record with a colliding id"
                    );
                    candidate.record_id = rekeyed;
                }
                known_content.insert(key);
            } else if known_records.contains(&candidate.record_id) {
                skipped += 1;
                continue;
            }
            known_records.insert(candidate.record_id.clone());
            admitted.push(candidate);
        }

        self.cut_cycles(&mut admitted, existing, &mut warnings);

        for node in &admitted {
            let Some(parent_id) = &node.parent_content_id else {
                continue;
            };
            if !known_content.contains(&(node.tree_id.clone(), parent_id.clone())) {
                warnings.push(IntegrityWarning::BrokenAncestry {
                    tree_id: node.tree_id.clone(),
                    record_id: node.record_id.clone(),
                    missing_parent: parent_id.clone(),
                });
            }
        }

        for warning in &warnings {
            tracing::warn!(%warning, "import integrity problem");
        }
        tracing::debug!(
            admitted = admitted.len(),
            skipped,
            warnings = warnings.len(),
            "import merged"
        );

        ImportOutcome {
            admitted_count: admitted.len(),
            admitted,
            skipped,
            warnings,
        }
    }
}

impl Importer {
    /// A record id derived from the node's tree and content, suffixed with a
    /// counter until it is not taken.
    fn free_record_id(
        &self,
        tree_id: &TreeId,
        content_id: &ContentId,
        taken: &HashSet<RecordId>,
    ) -> RecordId {
        let ns = &self.config.id_namespace;
        let mut record_id = RecordId::derived(ns, &[tree_id.as_str(), content_id.as_str()]);
        let mut attempt: u64 = 0;
        while taken.contains(&record_id) {
            attempt += 1;
            let suffix = attempt.to_string();
            record_id = RecordId::derived(
                ns,
                &[tree_id.as_str(), content_id.as_str(), suffix.as_str()],
            );
        }
        record_id
    }

    /// Drop the parent link of any admitted node whose parent chain leads
    /// back to itself. Nodes are checked in admission order, so the node
    /// that closes a cycle loses its link.
    fn cut_cycles(
        &self,
        admitted: &mut [SaveNode],
        existing: &[SaveNode],
        warnings: &mut Vec<IntegrityWarning>,
    ) {
        let mut parents: HashMap<(TreeId, ContentId), Option<ContentId>> = HashMap::new();
        for node in existing {
            if let Some(content_id) = &node.content_id {
                parents
                    .entry((node.tree_id.clone(), content_id.clone()))
                    .or_insert_with(|| node.parent_content_id.clone());
            }
        }

        for node in admitted.iter_mut() {
            let Some(content_id) = node.content_id.clone() else {
                continue;
            };
            let closes = closes_cycle(
                &parents,
                &node.tree_id,
                &content_id,
                node.parent_content_id.as_ref(),
            );
            if closes {
                tracing::debug!(
                    record_id = %node.record_id,
                    "cut imported parent link that closed a cycle"
                );
                warnings.push(IntegrityWarning::CyclicAncestry {
                    tree_id: node.tree_id.clone(),
                    record_id: node.record_id.clone(),
                });
                node.parent_content_id = None;
            }
            parents.insert((node.tree_id.clone(), content_id), node.parent_content_id.clone());
        }
    }
}

/// True when walking up from `parent` reaches `content_id`.
fn closes_cycle(
    parents: &HashMap<(TreeId, ContentId), Option<ContentId>>,
    tree_id: &TreeId,
    content_id: &ContentId,
    parent: Option<&ContentId>,
) -> bool {
    let mut seen = HashSet::new();
    let mut current = parent.cloned();
    while let Some(id) = current {
        if &id == content_id {
            return true;
        }
        if !seen.insert(id.clone()) {
            return false;
        }
        current = parents.get(&(tree_id.clone(), id)).cloned().flatten();
    }
    false
}

/// Import a JSON payload with the default configuration.
pub fn import_batch(raw: &str, existing: &[SaveNode]) -> Result<ImportOutcome, ImportError> {
    Importer::with_defaults().import_batch(raw, existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use worldline_model::{MemoryStore, NodeKind};

    fn import(value: Value, existing: &[SaveNode]) -> ImportOutcome {
        Importer::with_defaults().import_value(value, existing).unwrap()
    }

    #[test]
    fn test_initial_config_imported_once() {
        let doc = json!({"protagonist": {"name": "Lin"}, "world": "Ashfall"});

        let first = import(doc.clone(), &[]);
        assert_eq!(first.admitted_count, 1);
        assert_eq!(first.admitted[0].kind, NodeKind::InitialConfig);

        let second = import(doc, &first.admitted);
        assert_eq!(second.admitted_count, 0);
        assert_eq!(second.skipped, 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_existing_content_is_skipped() {
        let existing = vec![SaveNode::with_record_id("old", "t").with_content("c1")];
        let outcome = import(
            json!({"recordId": "new", "treeId": "t", "contentId": "c1"}),
            &existing,
        );
        assert_eq!(outcome.admitted_count, 0);
    }

    #[test]
    fn test_same_content_other_tree_is_admitted() {
        let existing = vec![SaveNode::with_record_id("old", "t").with_content("c1")];
        let outcome = import(
            json!({"recordId": "new", "treeId": "u", "contentId": "c1"}),
            &existing,
        );
        assert_eq!(outcome.admitted_count, 1);
    }

    #[test]
    fn test_record_without_content_dedups_on_record_id() {
        let existing = vec![SaveNode::with_record_id("r", "t")];
        let outcome = import(
            json!([{"recordId": "r", "treeId": "t"}, {"recordId": "s", "treeId": "t"}]),
            &existing,
        );
        assert_eq!(outcome.admitted_count, 1);
        assert_eq!(outcome.admitted[0].record_id, RecordId::new("s"));
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let outcome = import(
            json!([
                {"recordId": "a", "treeId": "t", "contentId": "c"},
                {"recordId": "b", "treeId": "t", "contentId": "c"}
            ]),
            &[],
        );
        assert_eq!(outcome.admitted_count, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_colliding_record_id_is_rekeyed() {
        let existing = vec![SaveNode::with_record_id("r", "t").with_content("old")];
        let outcome = import(
            json!({"recordId": "r", "treeId": "t", "contentId": "new"}),
            &existing,
        );

        assert_eq!(outcome.admitted_count, 1);
        assert_ne!(outcome.admitted[0].record_id, RecordId::new("r"));

        let mut after = existing.clone();
        after.extend(outcome.admitted);
        let again = import(json!({"recordId": "r", "treeId": "t", "contentId": "new"}), &after);
        assert_eq!(again.admitted_count, 0);
    }

    #[test]
    fn test_rekey_is_deterministic_when_derived_id_is_taken() {
        let derived = RecordId::derived(&ImportConfig::default().id_namespace, &["t", "new"]);
        let existing = vec![
            SaveNode::with_record_id("r", "t").with_content("old"),
            SaveNode::with_record_id(derived.clone(), "t").with_content("other"),
        ];
        let payload = json!({"recordId": "r", "treeId": "t", "contentId": "new"});

        let first = import(payload.clone(), &existing);
        let second = import(payload, &existing);

        assert_eq!(first.admitted_count, 1);
        let record_id = &first.admitted[0].record_id;
        assert_ne!(record_id, &RecordId::new("r"));
        assert_ne!(record_id, &derived);
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_session_record_imports_as_chain() {
        let outcome = import(
            json!({
                "id": "s",
                "treeId": "w",
                "contentId": "b2",
                "parentContentId": "b1",
                "history": [{"id": "b0"}, {"id": "b1", "action": "go"}, {"id": "b2"}]
            }),
            &[],
        );

        assert_eq!(outcome.admitted_count, 3);
        assert!(outcome.warnings.is_empty());
        let parents: Vec<_> = outcome
            .admitted
            .iter()
            .map(|n| n.parent_content_id.clone())
            .collect();
        assert_eq!(parents, vec![None, Some("b0".into()), Some("b1".into())]);
    }

    #[test]
    fn test_cycle_closing_link_is_cut() {
        let existing = vec![SaveNode::with_record_id("a", "t").with_content("x").with_parent("y")];
        let outcome = import(
            json!([
                {"recordId": "b", "treeId": "t", "contentId": "y", "parentContentId": "z"},
                {"recordId": "c", "treeId": "t", "contentId": "z", "parentContentId": "x"}
            ]),
            &existing,
        );

        assert_eq!(outcome.admitted_count, 2);
        assert_eq!(outcome.admitted[0].parent_content_id, Some("z".into()));
        assert_eq!(outcome.admitted[1].parent_content_id, None);
        assert_eq!(
            outcome.warnings,
            vec![IntegrityWarning::CyclicAncestry {
                tree_id: TreeId::new("t"),
                record_id: RecordId::new("c"),
            }]
        );
    }

    #[test]
    fn test_extreme_timestamp_does_not_panic() {
        let outcome = import(
            json!({
                "id": "s",
                "treeId": "w",
                "timestamp": i64::MIN,
                "history": [{"id": "b0"}, {"id": "b1"}]
            }),
            &[],
        );
        assert_eq!(outcome.admitted_count, 2);
        assert!(outcome.admitted.iter().all(|n| n.timestamp == i64::MIN));
    }

    #[test]
    fn test_reexport_under_new_id_merges() {
        let original = json!({
            "id": "save-1", "treeId": "w", "timestamp": 3000,
            "history": [{"id": "b0"}, {"id": "b1", "action": "go"}]
        });
        let first = import(original, &[]);
        assert_eq!(first.admitted_count, 2);

        let continued = json!({
            "id": "save-2", "treeId": "w", "timestamp": 9000,
            "history": [{"id": "b0"}, {"id": "b1", "action": "go"}, {"id": "b2", "action": "run"}]
        });
        let second = import(continued, &first.admitted);

        assert_eq!(second.admitted_count, 1);
        assert_eq!(second.admitted[0].record_id, RecordId::new("save-2"));
        assert_eq!(second.admitted[0].parent_content_id, Some("b1".into()));
        assert!(second.warnings.is_empty());
    }

    #[test]
    fn test_bad_element_does_not_sink_batch() {
        let mut batch: Vec<Value> = (0..50)
            .map(|i| {
                json!({
                    "recordId": format!("r{i}"),
                    "treeId": "t",
                    "contentId": format!("c{i}")
                })
            })
            .collect();
        batch[17] = json!({"nonsense": true});

        let outcome = import(Value::Array(batch), &[]);

        assert_eq!(outcome.admitted_count, 49);
        assert_eq!(
            outcome.warnings,
            vec![IntegrityWarning::MalformedRecord {
                index: 17,
                reason: "neither a save record nor an initial configuration".to_string(),
            }]
        );
    }

    #[test]
    fn test_config_with_history_in_batch_is_reported() {
        let outcome = import(
            json!([
                {"world": "Ashfall", "history": [{"text": "start"}]},
                {"recordId": "r", "treeId": "t", "contentId": "c"}
            ]),
            &[],
        );
        assert_eq!(outcome.admitted_count, 1);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [IntegrityWarning::MalformedRecord { index: 0, .. }]
        ));
    }

    #[test]
    fn test_dangling_parent_is_admitted_with_warning() {
        let outcome = import(
            json!({"recordId": "r", "treeId": "t", "contentId": "c", "parentContentId": "ghost"}),
            &[],
        );
        assert_eq!(outcome.admitted_count, 1);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [IntegrityWarning::BrokenAncestry { .. }]
        ));
    }

    #[test]
    fn test_parent_later_in_batch_is_not_dangling() {
        let outcome = import(
            json!([
                {"recordId": "kid", "treeId": "t", "contentId": "k", "parentContentId": "p"},
                {"recordId": "par", "treeId": "t", "contentId": "p"}
            ]),
            &[],
        );
        assert_eq!(outcome.admitted_count, 2);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_unrecognized_payload_fails() {
        let err = Importer::with_defaults()
            .import_batch(r#"{"unknown": 1}"#, &[])
            .unwrap_err();
        assert!(matches!(err, ImportError::MalformedPayload(_)));

        let err = import_batch("not json", &[]).unwrap_err();
        assert!(matches!(err, ImportError::InvalidJson(_)));
    }

    #[test]
    fn test_existing_nodes_untouched() {
        let existing = vec![SaveNode::with_record_id("r", "t").with_content("c")];
        let snapshot = existing.clone();
        import(json!({"recordId": "r", "treeId": "t", "contentId": "d"}), &existing);
        assert_eq!(existing, snapshot);
    }

    #[test]
    fn test_import_into_store() {
        let mut store = MemoryStore::new();
        let raw = r#"{"protagonist": "Lin", "world": "Ashfall"}"#;

        let first = Importer::with_defaults().import_into(&mut store, raw).unwrap();
        assert_eq!(first.admitted_count, 1);
        assert_eq!(store.len(), 1);

        let second = Importer::with_defaults().import_into(&mut store, raw).unwrap();
        assert_eq!(second.admitted_count, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_import_slice() {
        let outcome = Importer::with_defaults()
            .import_slice(br#"[{"recordId": "a", "treeId": "t"}]"#, &[])
            .unwrap();
        assert_eq!(outcome.admitted_count, 1);
    }
}
