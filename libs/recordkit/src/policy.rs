//! Field coercion rules shared by the encoder and decoder.
//!
//! Both directions are explicit ordered `match`es. The order of the arms is
//! the precedence order; when several rules could apply to a value, the
//! earlier arm wins.

use std::fs;

use url::Url;

use crate::asset::{AssetError, Staging};
use crate::config::CodecConfig;
use crate::error::FieldError;
use crate::field::{Decoded, FieldSource};
use crate::schema::DeclaredKind;
use crate::value::{Asset, RecordValue};

/// Map an encode-side field view to the value stored in the record.
///
/// Returns `None` for absent optionals. Staging asset bytes is the only side
/// effect.
pub fn coerce(
    source: FieldSource,
    config: &CodecConfig,
    staging: &mut Staging<'_>,
) -> Result<Option<RecordValue>, FieldError> {
    let value = match source {
        FieldSource::Absent => return Ok(None),
        // 1. file URLs reference the file in place, anything else is stored as text
        FieldSource::Url(url) => url_value(&url)?,
        // 2. lists of primitives
        FieldSource::List(items) => RecordValue::List(items),
        // 3. primitives pass through
        FieldSource::Primitive(value) => value,
        // 4-5. enum raw values
        FieldSource::StringRaw(raw) => RecordValue::String(raw),
        FieldSource::IntRaw(raw) => RecordValue::Int(raw),
        // 6. child values: assets are staged, everything else becomes a JSON blob
        FieldSource::Asset {
            filename,
            content_type,
            bytes,
        } => RecordValue::Asset(staging.stage(&filename, &content_type, &bytes)?),
        FieldSource::Child(value) => {
            let bytes = config.structured.encode(&value)?;
            RecordValue::Bytes(bytes.into())
        }
    };
    check_len(&value, config.max_data_len)?;
    Ok(Some(value))
}

fn url_value(url: &Url) -> Result<RecordValue, FieldError> {
    if url.scheme() != "file" {
        return Ok(RecordValue::String(url.as_str().to_owned()));
    }
    let path = url
        .to_file_path()
        .map_err(|()| FieldError::Unsupported(format!("'{url}' has no local file path")))?;
    Ok(RecordValue::Asset(Asset::new(path)))
}

/// Bytes payloads must stay below `max_len`.
pub fn check_len(value: &RecordValue, max_len: usize) -> Result<(), FieldError> {
    match value {
        RecordValue::Bytes(bytes) if bytes.len() >= max_len => Err(FieldError::TooLarge(bytes.len())),
        RecordValue::List(items) => items.iter().try_for_each(|item| check_len(item, max_len)),
        _ => Ok(()),
    }
}

/// Apply the decode rules for a field declared as `declared` to a stored
/// value. Missing fields and reserved keys are handled by the decoder before
/// this is reached.
pub fn resolve(declared: DeclaredKind, stored: &RecordValue) -> Result<Decoded<'_>, FieldError> {
    match (declared, stored) {
        // null list elements go to the element type, which maps them to `None`
        (_, RecordValue::Null) => return Ok(Decoded::Value(stored)),
        // 4. booleans
        (DeclaredKind::Bool, RecordValue::Int(v)) => return Ok(Decoded::Bool(*v == 1)),
        (DeclaredKind::Bool, _) => return Err(FieldError::Mismatch("int")),
        // 5. URLs
        (DeclaredKind::Url, RecordValue::Asset(asset)) => {
            let url = Url::from_file_path(asset.path())
                .map_err(|()| FieldError::Mismatch("asset with absolute path"))?;
            return Ok(Decoded::Url(url));
        }
        (DeclaredKind::Url, RecordValue::String(s)) => {
            let url = Url::parse(s).map_err(|_| FieldError::Mismatch("url string"))?;
            return Ok(Decoded::Url(url));
        }
        (DeclaredKind::Url, _) => return Err(FieldError::Mismatch("url string or asset")),
        // 6-7. enum raw values
        (DeclaredKind::StringEnum, RecordValue::String(s)) => return Ok(Decoded::StringRaw(s)),
        (DeclaredKind::StringEnum, _) => return Err(FieldError::Mismatch("string")),
        (DeclaredKind::IntEnum, RecordValue::Int(v)) => return Ok(Decoded::IntRaw(*v)),
        (DeclaredKind::IntEnum, _) => return Err(FieldError::Mismatch("int")),
        _ => {}
    }

    // 8. nested values, unless the field is declared as raw bytes
    if declared != DeclaredKind::Bytes {
        if let RecordValue::Bytes(bytes) = stored {
            return Ok(Decoded::Nested(bytes));
        }
    }

    // 9. assets
    if declared == DeclaredKind::Asset {
        return match stored {
            RecordValue::Asset(asset) => {
                let bytes = fs::read(asset.path()).map_err(AssetError::from)?;
                Ok(Decoded::Asset {
                    bytes,
                    observed: asset.observed_content_type(),
                })
            }
            _ => Err(FieldError::Mismatch("asset")),
        };
    }

    // 10. direct, kind-preserving cast
    Ok(Decoded::Value(stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::ContentType;

    fn coerce_default(source: FieldSource) -> Result<Option<RecordValue>, FieldError> {
        let config = CodecConfig::default();
        let mut staging = Staging::new(&config.staging_dir);
        coerce(source, &config, &mut staging)
    }

    #[test]
    fn remote_url_is_stored_as_string() {
        let url = Url::parse("https://guilhermerambo.me").unwrap();
        let value = coerce_default(FieldSource::Url(url)).unwrap();
        assert_eq!(value, Some(RecordValue::String("https://guilhermerambo.me/".into())));
    }

    #[test]
    fn file_url_is_stored_as_asset_in_place() {
        let url = Url::parse("file:///tmp/avatar.png").unwrap();
        let value = coerce_default(FieldSource::Url(url)).unwrap();
        assert_eq!(value, Some(RecordValue::Asset(Asset::new("/tmp/avatar.png"))));
    }

    #[test]
    fn child_is_stored_as_sorted_json() {
        let child = serde_json::json!({"value": "v", "name": "n/a"});
        let value = coerce_default(FieldSource::Child(child)).unwrap();
        assert_eq!(
            value,
            Some(RecordValue::Bytes(r#"{"name":"n/a","value":"v"}"#.as_bytes().to_vec().into()))
        );
    }

    #[test]
    fn oversized_bytes_fail() {
        let err = check_len(&RecordValue::Bytes(vec![0u8; 16].into()), 16).unwrap_err();
        assert!(matches!(err, FieldError::TooLarge(16)));
        assert!(check_len(&RecordValue::Bytes(vec![0u8; 15].into()), 16).is_ok());

        let list = RecordValue::List(vec![RecordValue::Bytes(vec![0u8; 32].into())]);
        assert!(matches!(check_len(&list, 16), Err(FieldError::TooLarge(32))));
    }

    #[test]
    fn bool_requires_int() {
        assert!(matches!(
            resolve(DeclaredKind::Bool, &RecordValue::Int(1)),
            Ok(Decoded::Bool(true))
        ));
        assert!(matches!(
            resolve(DeclaredKind::Bool, &RecordValue::Int(2)),
            Ok(Decoded::Bool(false))
        ));
        assert!(matches!(
            resolve(DeclaredKind::Bool, &RecordValue::String("true".into())),
            Err(FieldError::Mismatch("int"))
        ));
    }

    #[test]
    fn null_passes_through_for_every_kind() {
        for declared in [DeclaredKind::Bool, DeclaredKind::Url, DeclaredKind::IntEnum, DeclaredKind::Asset] {
            assert!(matches!(
                resolve(declared, &RecordValue::Null),
                Ok(Decoded::Value(RecordValue::Null))
            ));
        }
    }

    #[test]
    fn url_rejects_non_string_kinds() {
        assert!(matches!(
            resolve(DeclaredKind::Url, &RecordValue::Int(4)),
            Err(FieldError::Mismatch("url string or asset"))
        ));
        assert!(matches!(
            resolve(DeclaredKind::Url, &RecordValue::Bytes(b"\"https://a.b\"".to_vec().into())),
            Err(FieldError::Mismatch("url string or asset"))
        ));
    }

    #[test]
    fn bytes_go_nested_unless_declared_raw() {
        let stored = RecordValue::Bytes(b"\"x\"".to_vec().into());
        assert!(matches!(
            resolve(DeclaredKind::String, &stored),
            Ok(Decoded::Nested(b"\"x\""))
        ));
        assert!(matches!(
            resolve(DeclaredKind::Bytes, &stored),
            Ok(Decoded::Value(RecordValue::Bytes(_)))
        ));
    }

    #[test]
    fn unparsable_url_is_mismatch() {
        let stored = RecordValue::String("not a url".into());
        assert!(matches!(
            resolve(DeclaredKind::Url, &stored),
            Err(FieldError::Mismatch("url string"))
        ));
    }

    #[test]
    fn string_enum_rejects_ints() {
        assert!(matches!(
            resolve(DeclaredKind::StringEnum, &RecordValue::Int(3)),
            Err(FieldError::Mismatch("string"))
        ));
    }

    #[test]
    fn asset_content_is_read_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prefs.plist");
        fs::write(&path, b"payload").unwrap();
        let stored = RecordValue::Asset(Asset::new(&path));
        match resolve(DeclaredKind::Asset, &stored).unwrap() {
            Decoded::Asset { bytes, observed } => {
                assert_eq!(bytes, b"payload");
                assert_eq!(observed, Some(ContentType::XmlPropertyList));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_asset_file_is_an_asset_error() {
        let stored = RecordValue::Asset(Asset::new("/nonexistent/recordkit/asset.json"));
        assert!(matches!(
            resolve(DeclaredKind::Asset, &stored),
            Err(FieldError::Asset(AssetError::Io(_)))
        ));
    }
}
