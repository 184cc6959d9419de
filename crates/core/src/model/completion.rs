use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ExerciseId;

/// Immutable set of completed exercises.
///
/// Every change produces a new set backed by a fresh allocation, so callers
/// can detect a change with [`CompletedSet::same_instance`] instead of a
/// deep comparison. Iteration follows insertion order.
#[derive(Clone, Default)]
pub struct CompletedSet {
    ids: Arc<Vec<ExerciseId>>,
}

impl CompletedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from ids, keeping the first occurrence of duplicates.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ExerciseId>) -> Self {
        let mut unique: Vec<ExerciseId> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            ids: Arc::new(unique),
        }
    }

    #[must_use]
    pub fn contains(&self, id: &ExerciseId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExerciseId> {
        self.ids.iter()
    }

    /// Returns a new set with `id` removed if present, added otherwise.
    #[must_use]
    pub fn toggled(&self, id: &ExerciseId) -> Self {
        let mut next: Vec<ExerciseId> = self.ids.as_ref().clone();
        if let Some(pos) = next.iter().position(|existing| existing == id) {
            next.remove(pos);
        } else {
            next.push(id.clone());
        }
        Self {
            ids: Arc::new(next),
        }
    }

    /// True when both handles point at the same underlying set.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ids, &other.ids)
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<ExerciseId> {
        self.ids.as_ref().clone()
    }
}

/// Order-independent set equality.
impl PartialEq for CompletedSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|id| other.contains(id))
    }
}

impl Eq for CompletedSet {}

impl std::fmt::Debug for CompletedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.ids.iter()).finish()
    }
}

impl FromIterator<ExerciseId> for CompletedSet {
    fn from_iter<T: IntoIterator<Item = ExerciseId>>(iter: T) -> Self {
        Self::from_ids(iter)
    }
}

/// Pure toggle helper: never mutates `ids`, always returns a new set.
#[must_use]
pub fn toggle(ids: &CompletedSet, id: &ExerciseId) -> CompletedSet {
    ids.toggled(id)
}

/// Persisted progress document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    #[serde(alias = "completedExercises")]
    pub completed_exercise_ids: Vec<ExerciseId>,
    /// Advisory only; never used to resolve conflicts.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CompletionRecord {
    #[must_use]
    pub fn new(ids: &CompletedSet, now: DateTime<Utc>) -> Self {
        Self {
            completed_exercise_ids: ids.to_vec(),
            last_updated: Some(now),
        }
    }

    /// Parse a persisted document.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the text is not a valid record.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[must_use]
    pub fn into_set(self) -> CompletedSet {
        CompletedSet::from_ids(self.completed_exercise_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn ids(raw: &[&str]) -> CompletedSet {
        raw.iter().map(|id| ExerciseId::new(*id)).collect()
    }

    #[test]
    fn toggle_adds_then_removes() {
        let empty = CompletedSet::new();
        let id = ExerciseId::new("jsx-1");

        let added = toggle(&empty, &id);
        assert!(added.contains(&id));
        assert!(empty.is_empty(), "input set must not be mutated");

        let removed = toggle(&added, &id);
        assert!(!removed.contains(&id));
        assert!(added.contains(&id), "input set must not be mutated");
    }

    #[test]
    fn toggle_twice_is_identity() {
        let start = ids(&["jsx-1", "props-2", "lists-7"]);
        for raw in ["jsx-1", "state-4", "unknown-99"] {
            let id = ExerciseId::new(raw);
            assert_eq!(toggle(&toggle(&start, &id), &id), start);
        }
    }

    #[test]
    fn toggle_always_yields_a_new_instance() {
        let start = ids(&["jsx-1"]);
        let next = toggle(&start, &ExerciseId::new("jsx-2"));
        assert!(!next.same_instance(&start));
        assert!(start.same_instance(&start.clone()));
    }

    #[test]
    fn equality_ignores_order() {
        assert_eq!(ids(&["a-1", "b-2"]), ids(&["b-2", "a-1"]));
        assert_ne!(ids(&["a-1"]), ids(&["a-1", "b-2"]));
    }

    #[test]
    fn from_ids_drops_duplicates_keeping_first_position() {
        let set = ids(&["b-2", "a-1", "b-2"]);
        let order: Vec<&str> = set.iter().map(ExerciseId::as_str).collect();
        assert_eq!(order, vec!["b-2", "a-1"]);
    }

    #[test]
    fn record_uses_camel_case_wire_names() {
        let record = CompletionRecord::new(&ids(&["jsx-1", "jsx-2"]), fixed_now());
        let json = record.to_json().unwrap();
        assert!(json.contains("\"completedExerciseIds\":[\"jsx-1\",\"jsx-2\"]"));
        assert!(json.contains("\"lastUpdated\":\"2023-11-14T22:13:20Z\""));
    }

    #[test]
    fn record_accepts_legacy_field_name_and_missing_timestamp() {
        let record = CompletionRecord::from_json(r#"{"completedExercises":["refs-1"]}"#).unwrap();
        assert_eq!(record.last_updated, None);
        assert_eq!(record.into_set(), ids(&["refs-1"]));
    }

    #[test]
    fn record_rejects_wrong_shape() {
        assert!(CompletionRecord::from_json(r#"{"completedExerciseIds":"jsx-1"}"#).is_err());
        assert!(CompletionRecord::from_json("not json").is_err());
    }
}
