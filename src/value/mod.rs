//! The dynamic value model.
//!
//! Everything a codec reads or writes is a [`Value`]. Codecs declare which
//! variants they can store; the resolver uses that to skip codecs that
//! cannot hold the value being saved.

mod array;
mod dicom;
mod table;
mod volume;

pub use array::{DType, Element, LazyArray, NdArray};
pub use dicom::{DICOM_MAGIC, DICOM_PREAMBLE_SIZE, DicomFile, EXPLICIT_VR_LITTLE_ENDIAN, is_dicom};
pub use table::Table;
pub use volume::{NIFTI1_HEADER_SIZE, Volume, is_nifti1};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A value that can be loaded or saved.
///
/// Serialises adjacently tagged, e.g. `{"kind": "text", "data": "hello"}`.
/// [`Value::LazyArray`] refers to a file on disk and is never serialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Value {
    /// A JSON-compatible document.
    Json(JsonValue),
    /// UTF-8 text.
    Text(String),
    /// A header row plus string records.
    Table(Table),
    /// An n-dimensional numeric array.
    Array(NdArray),
    /// A NIfTI-1 volume.
    Volume(Volume),
    /// A DICOM Part 10 file.
    Dicom(DicomFile),
    /// An array whose payload is still on disk.
    #[serde(skip)]
    LazyArray(LazyArray),
}

impl Value {
    /// Short type name, used in error messages and summaries.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Text(_) => "text",
            Self::Table(_) => "table",
            Self::Array(_) => "array",
            Self::Volume(_) => "volume",
            Self::Dicom(_) => "dicom",
            Self::LazyArray(_) => "lazy array",
        }
    }

    /// Returns the JSON document, if this is one.
    #[must_use]
    pub const fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(json) => Some(json),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the table, if this is one.
    #[must_use]
    pub const fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Returns the array, if this is an in-memory array.
    #[must_use]
    pub const fn as_array(&self) -> Option<&NdArray> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// One-line description for listings.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Json(json) => match json {
                JsonValue::Object(map) => format!("json object with {} keys", map.len()),
                JsonValue::Array(items) => format!("json array with {} items", items.len()),
                other => format!("json scalar {other}"),
            },
            Self::Text(text) => format!("text, {} characters", text.chars().count()),
            Self::Table(table) => format!(
                "table, {} columns x {} rows",
                table.headers().len(),
                table.rows().len()
            ),
            Self::Array(array) => format!(
                "array {} {:?}{}",
                array.dtype(),
                array.shape(),
                if array.fortran_order() { " (fortran order)" } else { "" }
            ),
            Self::Volume(volume) => format!(
                "nifti-1 volume {:?}, datatype {}",
                volume.dims(),
                volume.datatype()
            ),
            Self::Dicom(file) => format!(
                "dicom file, sop class {}, transfer syntax {}",
                file.sop_class_uid().as_deref().unwrap_or("unknown"),
                file.transfer_syntax_uid().as_deref().unwrap_or("unknown")
            ),
            Self::LazyArray(lazy) => format!(
                "lazy array {} {:?} in {}",
                lazy.dtype(),
                lazy.shape(),
                lazy.path().display()
            ),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Self::Json(json)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<NdArray> for Value {
    fn from(array: NdArray) -> Self {
        Self::Array(array)
    }
}

impl From<Volume> for Value {
    fn from(volume: Volume) -> Self {
        Self::Volume(volume)
    }
}

impl From<DicomFile> for Value {
    fn from(file: DicomFile) -> Self {
        Self::Dicom(file)
    }
}

impl From<LazyArray> for Value {
    fn from(lazy: LazyArray) -> Self {
        Self::LazyArray(lazy)
    }
}

/// Serde helpers that store raw payloads as byte strings instead of
/// integer sequences.
pub(crate) mod bytes {
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(data)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        deserializer.deserialize_byte_buf(BytesVisitor)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte string")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element::<u8>()? {
                out.push(byte);
            }
            Ok(out)
        }
    }
}
