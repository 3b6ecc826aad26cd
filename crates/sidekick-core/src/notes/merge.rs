//! Reconciliation of optimistic notes with notes loaded from storage.

use super::model::NoteList;
use std::collections::HashSet;
use std::sync::Arc;

/// Merges asynchronously loaded notes into the optimistic list.
///
/// - empty `optimistic` returns `loaded` unchanged
/// - empty `loaded` returns `optimistic` unchanged
/// - otherwise loaded notes whose id is absent from `optimistic` are appended,
///   keeping the optimistic order at the head
///
/// When no loaded note is new the original `optimistic` `Arc` is returned, so
/// `Arc::ptr_eq(&merge(&a, &a), &a)` holds.
pub fn merge_notes(optimistic: &NoteList, loaded: &NoteList) -> NoteList {
    if optimistic.is_empty() {
        return Arc::clone(loaded);
    }
    if loaded.is_empty() {
        return Arc::clone(optimistic);
    }

    let known: HashSet<&str> = optimistic.iter().map(|n| n.id.as_str()).collect();
    let mut seen = HashSet::new();
    let fresh: Vec<_> = loaded
        .iter()
        .filter(|n| !known.contains(n.id.as_str()) && seen.insert(n.id.as_str()))
        .cloned()
        .collect();

    if fresh.is_empty() {
        return Arc::clone(optimistic);
    }

    let mut merged = Vec::with_capacity(optimistic.len() + fresh.len());
    merged.extend(optimistic.iter().cloned());
    merged.extend(fresh);
    Arc::new(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::model::Note;

    fn note(id: &str) -> Note {
        let mut n = Note::new("analyst", format!("note {}", id));
        n.id = id.to_string();
        n
    }

    fn list(ids: &[&str]) -> NoteList {
        Arc::new(ids.iter().map(|id| note(id)).collect())
    }

    fn ids(list: &NoteList) -> Vec<&str> {
        list.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_empty_optimistic_returns_loaded() {
        let empty = list(&[]);
        let loaded = list(&["a", "b"]);
        assert!(Arc::ptr_eq(&merge_notes(&empty, &loaded), &loaded));
    }

    #[test]
    fn test_empty_loaded_returns_optimistic() {
        let optimistic = list(&["a"]);
        let empty = list(&[]);
        assert!(Arc::ptr_eq(&merge_notes(&optimistic, &empty), &optimistic));
    }

    #[test]
    fn test_self_merge_is_referentially_stable() {
        let a = list(&["a", "b", "c"]);
        assert!(Arc::ptr_eq(&merge_notes(&a, &a), &a));
    }

    #[test]
    fn test_appends_only_new_ids_after_optimistic_head() {
        let optimistic = list(&["new", "b"]);
        let loaded = list(&["a", "b", "c"]);
        let merged = merge_notes(&optimistic, &loaded);
        assert_eq!(ids(&merged), vec!["new", "b", "a", "c"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let optimistic = list(&["x"]);
        let loaded = list(&["a", "b"]);
        let once = merge_notes(&optimistic, &loaded);
        let twice = merge_notes(&once, &loaded);
        assert!(Arc::ptr_eq(&once, &twice));
        assert_eq!(ids(&twice), vec!["x", "a", "b"]);
    }

    #[test]
    fn test_duplicate_loaded_ids_appended_once() {
        let optimistic = list(&["x"]);
        let loaded = list(&["a", "a"]);
        assert_eq!(ids(&merge_notes(&optimistic, &loaded)), vec!["x", "a"]);
    }
}
