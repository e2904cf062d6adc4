#![forbid(unsafe_code)]

//! Option model and the normalizer that projects heterogeneous records onto it.
//!
//! Endpoints disagree on field names: groups come back as `{id, name}`,
//! teachers as `{teacherId, surname, name}`, rooms as `{roomId, roomName,
//! capacity}`. Each call site declares a [`FieldMap`] saying which field
//! yields the id and which fields make up the label; the [`Normalizer`]
//! applies it and keeps the original record in [`SelectOption::raw`].
//!
//! # Invariants
//!
//! 1. Ids compare by their string form: `5` and `"5"` are the same id.
//! 2. Within one normalized set, ids are unique (first occurrence wins).
//! 3. Normalizing an already-normalized set returns it unchanged.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ---------------------------------------------------------------------------
// OptionId
// ---------------------------------------------------------------------------

/// Identifier of a selectable option.
///
/// Stores the string coercion of the source id, plus whether the source was
/// numeric so it can be written back in its original JSON type.
#[derive(Debug, Clone)]
pub struct OptionId {
    key: String,
    numeric: bool,
}

impl OptionId {
    /// Build an id from a JSON scalar. Strings must be non-empty; booleans,
    /// null, arrays and objects are not ids.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self {
                key: n.to_string(),
                numeric: true,
            }),
            Value::String(s) if !s.trim().is_empty() => Some(Self {
                key: s.clone(),
                numeric: false,
            }),
            _ => None,
        }
    }

    /// The id as JSON, numeric when the source was numeric.
    #[must_use]
    pub fn to_json(&self) -> Value {
        if self.numeric
            && let Ok(Value::Number(n)) = serde_json::from_str::<Value>(&self.key)
        {
            return Value::Number(n);
        }
        Value::String(self.key.clone())
    }

    /// String coercion of the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Whether the id arrived as a JSON number.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.numeric
    }
}

impl PartialEq for OptionId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for OptionId {}

impl Hash for OptionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for OptionId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OptionId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl From<i64> for OptionId {
    fn from(n: i64) -> Self {
        Self {
            key: n.to_string(),
            numeric: true,
        }
    }
}

impl From<u64> for OptionId {
    fn from(n: u64) -> Self {
        Self {
            key: n.to_string(),
            numeric: true,
        }
    }
}

impl From<i32> for OptionId {
    fn from(n: i32) -> Self {
        Self::from(i64::from(n))
    }
}

impl From<&str> for OptionId {
    fn from(s: &str) -> Self {
        Self {
            key: s.to_string(),
            numeric: false,
        }
    }
}

impl From<String> for OptionId {
    fn from(key: String) -> Self {
        Self {
            key,
            numeric: false,
        }
    }
}

impl Serialize for OptionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OptionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("not an option id: {value}")))
    }
}

// ---------------------------------------------------------------------------
// SelectOption
// ---------------------------------------------------------------------------

/// A normalized option: `{id, label}` plus the record it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Stable identifier.
    pub id: OptionId,
    /// Display text.
    pub label: String,
    /// Original record, for callers that need extra fields.
    #[serde(default)]
    pub raw: Value,
}

impl SelectOption {
    /// Create an option whose raw record is `{"id": .., "label": ..}`.
    pub fn new(id: impl Into<OptionId>, label: impl Into<String>) -> Self {
        let id = id.into();
        let label = label.into();
        let raw = serde_json::json!({ "id": id.to_json(), "label": label });
        Self { id, label, raw }
    }

    /// Attach a different raw record (builder).
    #[must_use]
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// Text this option contributes for the given search key.
    #[must_use]
    pub fn search_text(&self, key: &SearchKey) -> Option<Cow<'_, str>> {
        match key {
            SearchKey::Label => Some(Cow::Borrowed(self.label.as_str())),
            SearchKey::Id => Some(Cow::Borrowed(self.id.as_str())),
            SearchKey::Field(path) => lookup(&self.raw, path).and_then(scalar_text),
        }
    }
}

/// Which part of an option participates in search filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKey {
    /// The normalized label.
    Label,
    /// The id's string form.
    Id,
    /// A (dotted) field path into the raw record.
    Field(String),
}

// ---------------------------------------------------------------------------
// FieldMap / Normalizer
// ---------------------------------------------------------------------------

/// Declares how to read an id and a label out of a raw record.
///
/// Field names may be dotted paths (`"teacher.surname"`). The label is the
/// non-empty values of `label_fields` joined with `separator`; when none are
/// present the id's string form is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    /// Field holding the id.
    pub id_field: String,
    /// Fields concatenated into the label.
    pub label_fields: Vec<String>,
    /// Separator between label parts.
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    " ".to_string()
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::new("id", "name")
    }
}

impl FieldMap {
    /// Map with one id field and one label field.
    pub fn new(id_field: impl Into<String>, label_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            label_fields: vec![label_field.into()],
            separator: default_separator(),
        }
    }

    /// Use several fields for the label (builder).
    #[must_use]
    pub fn with_label_fields(mut self, fields: &[&str], separator: &str) -> Self {
        self.label_fields = fields.iter().map(|f| (*f).to_string()).collect();
        self.separator = separator.to_string();
        self
    }

    fn id_of(&self, record: &Value) -> Option<OptionId> {
        match record {
            Value::Object(_) => lookup(record, &self.id_field).and_then(OptionId::from_json),
            scalar => OptionId::from_json(scalar),
        }
    }

    fn label_of(&self, record: &Value) -> Option<String> {
        if !record.is_object() {
            return scalar_text(record).map(Cow::into_owned);
        }
        let parts: Vec<Cow<'_, str>> = self
            .label_fields
            .iter()
            .filter_map(|field| lookup(record, field).and_then(scalar_text))
            .filter(|text| !text.trim().is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(&self.separator))
        }
    }
}

/// Projects raw records to [`SelectOption`]s using a [`FieldMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalizer {
    map: FieldMap,
}

impl Normalizer {
    /// Create a normalizer for the given field map.
    #[must_use]
    pub fn new(map: FieldMap) -> Self {
        Self { map }
    }

    /// The field map in use.
    #[must_use]
    pub fn field_map(&self) -> &FieldMap {
        &self.map
    }

    /// Normalize raw records.
    ///
    /// Records without a usable id are skipped; later duplicates of an id
    /// are dropped. Scalar records (bare strings or numbers) serve as both
    /// id and label.
    pub fn normalize_records(&self, records: &[Value]) -> Vec<SelectOption> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut out = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let Some(id) = self.map.id_of(record) else {
                rozklad_core::trace!(index, field = %self.map.id_field, "option record without id skipped");
                continue;
            };
            if !seen.insert(id.clone()) {
                rozklad_core::trace!(index, id = %id, "duplicate option id skipped");
                continue;
            }
            let label = self
                .map
                .label_of(record)
                .unwrap_or_else(|| id.as_str().to_string());
            out.push(SelectOption {
                id,
                label,
                raw: record.clone(),
            });
        }
        out
    }
}

/// Enforce id uniqueness on an option list, keeping first occurrences.
///
/// Applying this to the output of [`Normalizer::normalize_records`] (or to
/// its own output) is a no-op.
#[must_use]
pub fn normalize(options: &[SelectOption]) -> Vec<SelectOption> {
    let mut seen = HashSet::with_capacity(options.len());
    options
        .iter()
        .filter(|opt| seen.insert(opt.id.clone()))
        .cloned()
        .collect()
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |node, segment| node.as_object()?.get(segment))
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        _ => None,
    }
}
