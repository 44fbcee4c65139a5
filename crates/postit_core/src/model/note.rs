//! Note domain model.
//!
//! # Responsibility
//! - Define the post-it value and its collection child encoding.
//! - Decode untrusted children written by any client of the collection.
//!
//! # Invariants
//! - `id` is non-empty and a legal collection key for every stored note.
//! - `created_at` is epoch milliseconds; edits re-stamp it.
//! - The empty sentinel (`Note::empty`) is never written to the store.

use crate::store::key::{validate_key, KeyError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque store-issued identifier of one note.
///
/// Kept as a type alias so signatures read as note ids rather than text.
pub type NoteId = String;

/// Wire field name for the creation timestamp.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Wire field name for the note text.
pub const CONTENT_FIELD: &str = "content";

/// One post-it note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-issued key, duplicated inside the child for self-description.
    pub id: NoteId,
    /// Free-form text.
    pub content: String,
    /// Epoch milliseconds. Serialized as `createdAt`.
    #[serde(rename = "createdAt", deserialize_with = "deserialize_created_at")]
    pub created_at: i64,
}

/// Validation errors for note invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyId,
    InvalidId(KeyError),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "note id must not be empty"),
            Self::InvalidId(err) => write!(f, "note id is not a valid key: {err}"),
        }
    }
}

impl Error for NoteValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EmptyId => None,
            Self::InvalidId(err) => Some(err),
        }
    }
}

/// Why a collection child could not become a `Note`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteDecodeError {
    /// Missing or mistyped fields.
    Malformed { key: String, reason: String },
    /// Well-formed but violates note invariants.
    Invalid {
        key: String,
        source: NoteValidationError,
    },
}

impl Display for NoteDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { key, reason } => write!(f, "child `{key}` is malformed: {reason}"),
            Self::Invalid { key, source } => write!(f, "child `{key}` is invalid: {source}"),
        }
    }
}

impl Error for NoteDecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed { .. } => None,
            Self::Invalid { source, .. } => Some(source),
        }
    }
}

impl Note {
    /// Creates a note for a store-issued id.
    pub fn new(id: impl Into<NoteId>, content: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at,
        }
    }

    /// Placeholder used when no note is focused.
    pub fn empty() -> Self {
        Self::new(String::new(), String::new(), 0)
    }

    /// Returns whether this is the unfocused placeholder.
    pub fn is_empty_sentinel(&self) -> bool {
        self.id.is_empty()
    }

    /// Validates note invariants before it reaches the store.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_note_id(&self.id)
    }

    /// Encodes this note as one collection child.
    pub fn to_child(&self) -> Value {
        json!({
            "id": self.id,
            "content": self.content,
            "createdAt": self.created_at,
        })
    }

    /// Decodes one collection child stored under `key`.
    ///
    /// The child must carry `id`, `content` and `createdAt`; extra fields are
    /// ignored so newer clients can add data without breaking this one.
    pub fn from_child(key: &str, value: &Value) -> Result<Self, NoteDecodeError> {
        let note = Note::deserialize(value).map_err(|err| NoteDecodeError::Malformed {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
        note.validate().map_err(|source| NoteDecodeError::Invalid {
            key: key.to_string(),
            source,
        })?;
        Ok(note)
    }
}

/// Partial update applied by an edit: only `content` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePatch {
    pub content: String,
    pub created_at: i64,
}

impl NotePatch {
    pub fn new(content: impl Into<String>, created_at: i64) -> Self {
        Self {
            content: content.into(),
            created_at,
        }
    }

    /// Field map handed to the store's merge operation.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(CONTENT_FIELD.to_string(), Value::from(self.content.as_str()));
        fields.insert(CREATED_AT_FIELD.to_string(), Value::from(self.created_at));
        fields
    }

    /// Applies this patch to a local copy, keeping the id.
    pub fn apply_to(&self, note: &Note) -> Note {
        Note::new(note.id.clone(), self.content.clone(), self.created_at)
    }
}

/// Checks that `id` can be used as a note identity.
pub fn validate_note_id(id: &str) -> Result<(), NoteValidationError> {
    if id.is_empty() {
        return Err(NoteValidationError::EmptyId);
    }
    validate_key(id).map_err(NoteValidationError::InvalidId)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CreatedAtWire {
    Millis(i64),
    // Older clients stored a serialized date object carrying `time`.
    Legacy { time: i64 },
}

fn deserialize_created_at<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match CreatedAtWire::deserialize(deserializer)? {
        CreatedAtWire::Millis(value) => value,
        CreatedAtWire::Legacy { time } => time,
    })
}
