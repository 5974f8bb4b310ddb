use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::asset::ContentType;

/// Value kinds a record field can hold.
///
/// Strategy by kind:
/// - Scalars (Int, Double): stored as-is. Booleans are stored as `Int` 1/0.
/// - String, Bytes: owned, Bytes is cheap to clone.
/// - Asset: reference to content stored outside the record.
/// - List: one level only, elements are non-asset primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordValue {
    Null,
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Bytes),
    Asset(Asset),
    List(Vec<RecordValue>),
}

impl RecordValue {
    /// Kind name used in mismatch errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordValue::Null => "null",
            RecordValue::Int(_) => "int",
            RecordValue::Double(_) => "double",
            RecordValue::String(_) => "string",
            RecordValue::Bytes(_) => "bytes",
            RecordValue::Asset(_) => "asset",
            RecordValue::List(_) => "list",
        }
    }

    /// Whether the value may appear as a list element.
    pub fn is_list_element(&self) -> bool {
        !matches!(self, RecordValue::Asset(_) | RecordValue::List(_))
    }
}

/// Externally stored binary content, referenced by a local file path.
///
/// The store uploads the file on save and downloads it on fetch; the codec
/// only ever sees the local copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub path: PathBuf,
    /// Content type recorded alongside the file, if the store kept one.
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &ContentType) -> Self {
        self.content_type = Some(content_type.as_str().to_owned());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content type observed for this asset: the recorded one first, then the
    /// file extension.
    pub fn observed_content_type(&self) -> Option<ContentType> {
        if let Some(ct) = &self.content_type {
            return Some(ContentType::parse(ct));
        }
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ContentType::from_extension)
    }
}
