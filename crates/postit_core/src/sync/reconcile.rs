//! Snapshot decoding into a sorted note list.

use crate::model::note::{Note, NoteDecodeError};
use crate::state::sort_notes_desc;
use crate::store::Snapshot;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Decoded notes, newest first.
    pub notes: Vec<Note>,
    /// Children that could not be decoded.
    pub skipped: Vec<NoteDecodeError>,
}

/// Decodes every child of `snapshot` and sorts the survivors.
///
/// Ties on `created_at` keep snapshot order.
pub fn reconcile(snapshot: &Snapshot) -> Reconciled {
    let mut notes = Vec::with_capacity(snapshot.len());
    let mut skipped = Vec::new();
    for (key, value) in snapshot.children() {
        match Note::from_child(key, value) {
            Ok(note) => notes.push(note),
            Err(err) => skipped.push(err),
        }
    }
    sort_notes_desc(&mut notes);
    Reconciled { notes, skipped }
}

#[cfg(test)]
mod tests {
    use super::reconcile;
    use crate::store::Snapshot;
    use serde_json::json;

    fn snapshot(children: Vec<(&str, serde_json::Value)>) -> Snapshot {
        Snapshot::new(
            children
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    #[test]
    fn empty_snapshot_yields_empty_list() {
        let outcome = reconcile(&Snapshot::default());
        assert!(outcome.notes.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn skips_undecodable_children_and_keeps_the_rest() {
        let outcome = reconcile(&snapshot(vec![
            ("a", json!({ "id": "a", "content": "buy milk", "createdAt": 100 })),
            ("b", json!({ "id": "b", "createdAt": 300 })),
            ("c", json!("not an object")),
            ("d", json!({ "id": "d", "content": "call mom", "createdAt": 200 })),
        ]));

        let ids: Vec<_> = outcome.notes.iter().map(|note| note.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a"]);
        assert_eq!(outcome.skipped.len(), 2);
    }

    #[test]
    fn ties_keep_snapshot_order() {
        let outcome = reconcile(&snapshot(vec![
            ("k1", json!({ "id": "k1", "content": "", "createdAt": 7 })),
            ("k2", json!({ "id": "k2", "content": "", "createdAt": 7 })),
            ("k3", json!({ "id": "k3", "content": "", "createdAt": 9 })),
        ]));
        let ids: Vec<_> = outcome.notes.iter().map(|note| note.id.as_str()).collect();
        assert_eq!(ids, vec!["k3", "k1", "k2"]);
    }
}
