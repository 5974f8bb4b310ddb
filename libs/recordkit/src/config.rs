use std::path::PathBuf;

use serde::Deserialize;

use crate::MAX_DATA_LEN;
use crate::record::ZoneId;

/// Codec configuration. Built once and borrowed by encoders.
///
/// Deserializable so hosts can embed it in their own config files; every
/// key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Bytes fields of this size or larger are rejected.
    pub max_data_len: usize,

    /// Directory receiving staged asset files.
    pub staging_dir: PathBuf,

    /// Zone for records encoded without prior system metadata.
    pub default_zone: ZoneId,

    /// Encoding of nested child values.
    pub structured: StructuredEncoding,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_data_len: MAX_DATA_LEN,
            staging_dir: std::env::temp_dir().join("recordkit-assets"),
            default_zone: ZoneId::default(),
            structured: StructuredEncoding::default(),
        }
    }
}

impl CodecConfig {
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_default_zone(mut self, zone: ZoneId) -> Self {
        self.default_zone = zone;
        self
    }
}

/// JSON encoding used for child values stored as Bytes.
///
/// Output is compact and never escapes `/`. With `sort_keys` object keys are
/// written in byte order, so equal values always produce equal bytes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StructuredEncoding {
    pub sort_keys: bool,
}

impl Default for StructuredEncoding {
    fn default() -> Self {
        Self { sort_keys: true }
    }
}

impl StructuredEncoding {
    pub fn encode(&self, value: &serde_json::Value) -> Result<Vec<u8>, serde_json::Error> {
        if self.sort_keys {
            serde_json::to_vec(&sorted(value))
        } else {
            serde_json::to_vec(value)
        }
    }
}

/// Rebuild objects with keys inserted in sorted order. Holds whether or not
/// `serde_json` preserves insertion order.
fn sorted(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.max_data_len, 1_000_000);
        assert!(config.default_zone.is_default());
        assert!(config.structured.sort_keys);
    }

    #[test]
    fn partial_config_deserializes() {
        let config: CodecConfig = serde_json::from_str(
            r#"{"staging_dir": "/var/tmp/assets",
                "default_zone": {"zone_name": "Notes", "owner_name": "me"}}"#,
        )
        .unwrap();
        assert_eq!(config.staging_dir, PathBuf::from("/var/tmp/assets"));
        assert_eq!(config.default_zone, ZoneId::new("Notes", "me"));
        assert_eq!(config.max_data_len, MAX_DATA_LEN);
    }

    #[test]
    fn nested_keys_are_sorted_and_slashes_kept() {
        let value = serde_json::json!({
            "b": {"z": 1, "a": [{"y": true, "x": null}]},
            "a": "https://example.com/x",
        });
        let bytes = StructuredEncoding::default().encode(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":"https://example.com/x","b":{"a":[{"x":null,"y":true}],"z":1}}"#
        );
    }
}
