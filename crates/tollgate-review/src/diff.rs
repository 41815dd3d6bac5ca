//! Snapshot differ
//!
//! Classifies the records of two table snapshots as added, modified or
//! deleted. Records are matched by a primary-key field and compared through
//! their canonical JSON rendering, so key order inside a record never counts
//! as a change.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tollgate_common::{canonical_json, scalar_key};
use tollgate_persistence::ChangeType;

/// Fields tried, in order, when no primary key is given or the record lacks it
const FALLBACK_KEY_FIELDS: [&str; 2] = ["id", "_id"];

/// One field whose value differs between the two sides of a modified record.
///
/// A side on which the field does not exist is left out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// One changed record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Primary key rendered as a string
    pub key: String,
    /// Primary key as it appears in the record
    pub rule_key: Value,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    /// Field level differences, filled for modified records only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

/// Records of one snapshot side indexed by key, remembering first-seen order
struct KeyedRecords<'a> {
    order: Vec<String>,
    records: HashMap<String, (&'a Value, &'a Value)>,
}

impl<'a> KeyedRecords<'a> {
    fn build(side: &str, records: &'a [Value], primary_key: Option<&str>) -> Self {
        let mut keyed = KeyedRecords {
            order: Vec::with_capacity(records.len()),
            records: HashMap::with_capacity(records.len()),
        };
        for (index, record) in records.iter().enumerate() {
            let Some(rule_key) = resolve_record_key(record, primary_key) else {
                tracing::warn!(
                    side,
                    index,
                    primary_key = primary_key.unwrap_or("-"),
                    "Skipping record without a resolvable key"
                );
                continue;
            };
            let key = scalar_key(rule_key);
            // last occurrence wins, first occurrence fixes the position
            if keyed.records.insert(key.clone(), (rule_key, record)).is_none() {
                keyed.order.push(key);
            }
        }
        keyed
    }

    fn get(&self, key: &str) -> Option<&(&'a Value, &'a Value)> {
        self.records.get(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }
}

/// Key value of a record: the primary key field, then `id`, then `_id`, then
/// the first non-null field in sorted key order. Non-objects and objects
/// without a non-null field resolve to nothing.
pub fn resolve_record_key<'a>(record: &'a Value, primary_key: Option<&str>) -> Option<&'a Value> {
    let object = record.as_object()?;
    let present = |field: &str| object.get(field).filter(|v| !v.is_null());

    primary_key
        .and_then(present)
        .or_else(|| FALLBACK_KEY_FIELDS.iter().find_map(|f| present(*f)))
        .or_else(|| {
            object
                .iter()
                .filter(|(_, v)| !v.is_null())
                .min_by_key(|(k, _)| *k)
                .map(|(_, v)| v)
        })
}

/// Diff two snapshots of a table.
///
/// Added and modified records come first in `current` order, followed by
/// deleted records in `original` order. Records present on both sides with
/// the same canonical content do not appear.
pub fn diff(original: &[Value], current: &[Value], primary_key: Option<&str>) -> Vec<ChangeRecord> {
    let before = KeyedRecords::build("original", original, primary_key);
    let after = KeyedRecords::build("current", current, primary_key);

    let mut changes = Vec::new();

    for key in &after.order {
        let Some(&(rule_key, new_record)) = after.get(key) else {
            continue;
        };
        match before.get(key) {
            None => changes.push(ChangeRecord {
                change_type: ChangeType::Added,
                key: key.clone(),
                rule_key: rule_key.clone(),
                old_value: None,
                new_value: Some(new_record.clone()),
                changes: Vec::new(),
            }),
            Some(&(_, old_record)) => {
                if canonical_json(old_record) != canonical_json(new_record) {
                    changes.push(ChangeRecord {
                        change_type: ChangeType::Modified,
                        key: key.clone(),
                        rule_key: rule_key.clone(),
                        old_value: Some(old_record.clone()),
                        new_value: Some(new_record.clone()),
                        changes: field_changes(old_record, new_record),
                    });
                }
            }
        }
    }

    for key in &before.order {
        if after.contains(key) {
            continue;
        }
        if let Some(&(rule_key, old_record)) = before.get(key) {
            changes.push(ChangeRecord {
                change_type: ChangeType::Deleted,
                key: key.clone(),
                rule_key: rule_key.clone(),
                old_value: Some(old_record.clone()),
                new_value: None,
                changes: Vec::new(),
            });
        }
    }

    changes
}

/// Every field whose canonical value differs, in sorted field order
pub fn field_changes(old_record: &Value, new_record: &Value) -> Vec<FieldChange> {
    let (Some(old), Some(new)) = (old_record.as_object(), new_record.as_object()) else {
        return Vec::new();
    };

    let fields: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    fields
        .into_iter()
        .filter_map(|field| {
            let old_value = old.get(field);
            let new_value = new.get(field);
            if old_value.map(canonical_json) == new_value.map(canonical_json) {
                return None;
            }
            Some(FieldChange {
                field: field.clone(),
                old_value: old_value.cloned(),
                new_value: new_value.cloned(),
            })
        })
        .collect()
}
