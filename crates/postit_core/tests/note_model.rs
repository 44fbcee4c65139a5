use postit_core::{Note, NoteDecodeError, NotePatch, NoteValidationError};
use serde_json::json;

#[test]
fn note_serialization_uses_expected_wire_fields() {
    let note = Note::new("-NxA1b2C3d4E5f6G7h8", "buy milk", 1_700_000_000_000);

    let json = serde_json::to_value(&note).unwrap();
    assert_eq!(
        json,
        json!({
            "id": "-NxA1b2C3d4E5f6G7h8",
            "content": "buy milk",
            "createdAt": 1_700_000_000_000_i64,
        })
    );
    assert_eq!(note.to_child(), json);
}

#[test]
fn child_decoding_ignores_unknown_fields() {
    let note = Note::from_child(
        "k1",
        &json!({ "id": "k1", "content": "x", "createdAt": 9, "color": "yellow" }),
    )
    .unwrap();
    assert_eq!(note, Note::new("k1", "x", 9));
}

#[test]
fn child_with_forbidden_id_is_invalid() {
    let err = Note::from_child("k1", &json!({ "id": "a/b", "content": "x", "createdAt": 1 }))
        .unwrap_err();
    assert!(matches!(
        err,
        NoteDecodeError::Invalid {
            source: NoteValidationError::InvalidId(_),
            ..
        }
    ));
}

#[test]
fn patch_touches_only_content_and_created_at() {
    let patch = NotePatch::new("changed", 42);
    let fields = patch.to_fields();

    let mut keys: Vec<_> = fields.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["content", "createdAt"]);
    assert_eq!(
        patch.apply_to(&Note::new("k1", "old", 1)),
        Note::new("k1", "changed", 42)
    );
}
