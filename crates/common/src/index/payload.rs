//! Typed view over the payload stored with each case chunk

use qdrant_client::qdrant::{value::Kind, Value};
use std::collections::HashMap;

/// Identifier value used to group hits of the same case
///
/// Text and numbers are different keys even when they print the same, so an
/// `id_caso` of `"17"` and a `fila_excel` of `17` stay apart. Integer-valued
/// numbers compare equal regardless of how they were stored (`17` and `17.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseKey {
    /// Identifier present in the payload but null
    Null,
    Text(String),
    Number(String),
}

impl CaseKey {
    /// Convert a payload value into a key
    pub fn from_value(value: &Value) -> Self {
        match value.kind.as_ref() {
            None | Some(Kind::NullValue(_)) | Some(Kind::StructValue(_)) => CaseKey::Null,
            Some(Kind::StringValue(s)) => CaseKey::Text(s.clone()),
            Some(Kind::IntegerValue(i)) => CaseKey::Number(i.to_string()),
            Some(Kind::DoubleValue(d)) => CaseKey::Number(canonical_number(*d)),
            Some(Kind::BoolValue(b)) => CaseKey::Number(if *b { "1" } else { "0" }.to_string()),
            Some(Kind::ListValue(_)) => {
                CaseKey::Text(value_to_string(value).unwrap_or_default())
            }
        }
    }

    /// Printable form; empty for `Null`
    pub fn as_str(&self) -> &str {
        match self {
            CaseKey::Null => "",
            CaseKey::Text(s) | CaseKey::Number(s) => s,
        }
    }
}

impl From<&str> for CaseKey {
    fn from(s: &str) -> Self {
        CaseKey::Text(s.to_string())
    }
}

impl From<String> for CaseKey {
    fn from(s: String) -> Self {
        CaseKey::Text(s)
    }
}

impl From<i64> for CaseKey {
    fn from(i: i64) -> Self {
        CaseKey::Number(i.to_string())
    }
}

/// Case fields carried in a point payload
///
/// Payload keys are the Spanish column names of the source spreadsheet. Text
/// fields missing from the payload (or null) become empty strings. The two
/// identifiers are `None` only when the key is missing; a stored null is kept
/// as [`CaseKey::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseRecord {
    /// `id_caso`
    pub case_id: Option<CaseKey>,

    /// `fila_excel`
    pub excel_row: Option<CaseKey>,

    pub providencia: String,

    /// `tema`
    pub topic: String,

    /// `sintesis`
    pub synthesis: String,

    /// `resuelve`
    pub ruling: String,

    /// `texto_chunk`
    pub chunk_text: String,
}

impl CaseRecord {
    /// Build a record from a Qdrant payload map
    pub fn from_payload(payload: &HashMap<String, Value>) -> Self {
        let key = |name: &str| payload.get(name).map(CaseKey::from_value);
        let text = |name: &str| payload.get(name).and_then(value_to_string).unwrap_or_default();

        Self {
            case_id: key("id_caso"),
            excel_row: key("fila_excel"),
            providencia: text("providencia"),
            topic: text("tema"),
            synthesis: text("sintesis"),
            ruling: text("resuelve"),
            chunk_text: text("texto_chunk"),
        }
    }

    /// Grouping key for deduplication
    ///
    /// The case id when the payload has one (even a null one), else the
    /// spreadsheet row. Records carrying neither share [`CaseKey::Null`].
    pub fn dedup_key(&self) -> CaseKey {
        self.case_id
            .as_ref()
            .or(self.excel_row.as_ref())
            .cloned()
            .unwrap_or(CaseKey::Null)
    }

    /// Uppercased synthesis, ruling, topic and chunk text, space separated
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.synthesis, self.ruling, self.topic, self.chunk_text
        )
        .to_uppercase()
    }
}

fn canonical_number(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 && d.abs() < i64::MAX as f64 {
        (d as i64).to_string()
    } else {
        d.to_string()
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value.kind.as_ref()? {
        Kind::NullValue(_) => None,
        Kind::StringValue(s) => Some(s.clone()),
        Kind::IntegerValue(i) => Some(i.to_string()),
        Kind::DoubleValue(d) => Some(d.to_string()),
        Kind::BoolValue(b) => Some(b.to_string()),
        Kind::ListValue(list) => Some(
            list.values
                .iter()
                .filter_map(value_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Kind::StructValue(_) => None,
    }
}
