use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::FieldError;
use crate::field::{Decoded, FieldSource};
use crate::finite::{self, NonFiniteFloat};
use crate::value::Asset;

/// Content type of asset bytes.
///
/// The default [`AssetValue`] codec understands JSON and both property-list
/// flavours; anything else needs a custom `encoded`/`decoded`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    Json,
    XmlPropertyList,
    BinaryPropertyList,
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Json => "application/json",
            ContentType::XmlPropertyList => "application/x-plist",
            ContentType::BinaryPropertyList => "application/x-bplist",
            ContentType::Other(s) => s,
        }
    }

    /// Accepts MIME types and the equivalent uniform type identifiers.
    pub fn parse(s: &str) -> Self {
        match s {
            "application/json" | "public.json" => ContentType::Json,
            "application/x-plist" | "com.apple.property-list" | "com.apple.xml-property-list" => {
                ContentType::XmlPropertyList
            }
            "application/x-bplist" | "com.apple.binary-property-list" => {
                ContentType::BinaryPropertyList
            }
            other => ContentType::Other(other.to_owned()),
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(ContentType::Json),
            "plist" => Some(ContentType::XmlPropertyList),
            "bplist" => Some(ContentType::BinaryPropertyList),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::XmlPropertyList => "plist",
            ContentType::BinaryPropertyList => "bplist",
            ContentType::Other(_) => "bin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),

    #[error("invalid asset filename '{0}'")]
    InvalidFilename(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("property list: {0}")]
    PropertyList(#[from] plist::Error),

    #[error("json: {0}")]
    NonFinite(#[from] NonFiniteFloat),
}

/// A sub-value stored as an external asset instead of inline bytes.
///
/// The defaults encode with [`AssetValue::preferred_content_type`] and decode
/// JSON or property lists. Override `encoded`/`decoded` for other formats.
pub trait AssetValue: Serialize + DeserializeOwned {
    fn preferred_content_type() -> ContentType {
        ContentType::Json
    }

    fn filename(&self) -> String {
        format!(
            "{}.{}",
            Uuid::new_v4(),
            Self::preferred_content_type().extension()
        )
    }

    fn encoded(&self) -> Result<Vec<u8>, AssetError> {
        encode_structured(self, &Self::preferred_content_type())
    }

    fn decoded(bytes: &[u8], content_type: &ContentType) -> Result<Self, AssetError> {
        decode_structured(bytes, content_type)
    }
}

pub fn encode_structured<T: Serialize>(
    value: &T,
    content_type: &ContentType,
) -> Result<Vec<u8>, AssetError> {
    let mut out = Vec::new();
    match content_type {
        ContentType::Json => {
            finite::ensure_finite(value)?;
            serde_json::to_writer(&mut out, value)?
        }
        ContentType::XmlPropertyList => plist::to_writer_xml(&mut out, value)?,
        ContentType::BinaryPropertyList => plist::to_writer_binary(&mut out, value)?,
        ContentType::Other(other) => return Err(AssetError::UnsupportedContentType(other.clone())),
    }
    Ok(out)
}

pub fn decode_structured<T: DeserializeOwned>(
    bytes: &[u8],
    content_type: &ContentType,
) -> Result<T, AssetError> {
    match content_type {
        ContentType::Json => Ok(serde_json::from_slice(bytes)?),
        // plist detects xml vs binary from the header.
        ContentType::XmlPropertyList | ContentType::BinaryPropertyList => {
            Ok(plist::from_bytes(bytes)?)
        }
        ContentType::Other(other) => Err(AssetError::UnsupportedContentType(other.clone())),
    }
}

/// Encode-side view of an [`AssetValue`]. Used by [`crate::asset_field!`].
pub fn asset_source<T: AssetValue>(value: &T) -> Result<FieldSource, FieldError> {
    Ok(FieldSource::Asset {
        filename: value.filename(),
        content_type: T::preferred_content_type(),
        bytes: value.encoded().map_err(|e| match e {
            AssetError::NonFinite(e) => FieldError::from(e),
            other => FieldError::from(other),
        })?,
    })
}

pub fn asset_from_decoded<T: AssetValue>(decoded: Decoded<'_>) -> Result<T, FieldError> {
    match decoded {
        Decoded::Nested(bytes) => Ok(serde_json::from_slice(bytes)?),
        Decoded::Asset { bytes, observed } => {
            let content_type = observed.unwrap_or_else(T::preferred_content_type);
            Ok(T::decoded(&bytes, &content_type)?)
        }
        _ => Err(FieldError::Mismatch("asset")),
    }
}

/// Store an [`AssetValue`] type as an external asset.
#[macro_export]
macro_rules! asset_field {
    ($ty:ty) => {
        impl $crate::field::RecordField for $ty {
            const DECLARED: $crate::schema::DeclaredKind = $crate::schema::DeclaredKind::Asset;

            fn to_source(
                &self,
            ) -> ::core::result::Result<$crate::field::FieldSource, $crate::error::FieldError> {
                $crate::asset::asset_source(self)
            }

            fn from_decoded(
                decoded: $crate::field::Decoded<'_>,
            ) -> ::core::result::Result<Self, $crate::error::FieldError> {
                $crate::asset::asset_from_decoded(decoded)
            }
        }
    };
}

/// Scratch area for asset bytes written during one encode call.
///
/// Every asset gets its own directory so the preferred filename survives.
/// [`Staging::discard`] removes everything written so far.
pub struct Staging<'a> {
    dir: &'a Path,
    staged: Vec<PathBuf>,
}

impl<'a> Staging<'a> {
    pub fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            staged: Vec::new(),
        }
    }

    pub fn stage(
        &mut self,
        filename: &str,
        content_type: &ContentType,
        bytes: &[u8],
    ) -> Result<Asset, AssetError> {
        let name = Path::new(filename)
            .file_name()
            .filter(|name| *name == filename)
            .ok_or_else(|| AssetError::InvalidFilename(filename.to_owned()))?;

        let dir = self.dir.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir)?;
        self.staged.push(dir.clone());

        let path = dir.join(name);
        fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "staged asset");
        Ok(Asset::new(path).with_content_type(content_type))
    }

    pub fn staged(&self) -> &[PathBuf] {
        &self.staged
    }

    pub fn discard(self) {
        for dir in self.staged {
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::warn!(path = %dir.display(), error = %e, "failed to remove staged asset");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Settings {
        theme: String,
        volume: i64,
    }

    #[test]
    fn content_type_parse_accepts_identifiers() {
        assert_eq!(ContentType::parse("public.json"), ContentType::Json);
        assert_eq!(
            ContentType::parse("com.apple.binary-property-list"),
            ContentType::BinaryPropertyList
        );
        assert_eq!(
            ContentType::parse("image/png"),
            ContentType::Other("image/png".into())
        );
    }

    #[test]
    fn property_lists_decode_both_flavours() {
        let settings = Settings {
            theme: "dark".into(),
            volume: 7,
        };
        for ct in [ContentType::XmlPropertyList, ContentType::BinaryPropertyList] {
            let bytes = encode_structured(&settings, &ct).unwrap();
            let back: Settings = decode_structured(&bytes, &ct).unwrap();
            assert_eq!(back, settings);
        }
    }

    #[test]
    fn unknown_content_type_is_rejected() {
        let ct = ContentType::Other("image/png".into());
        let err = decode_structured::<Settings>(b"{}", &ct).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedContentType(t) if t == "image/png"));
    }

    #[test]
    fn staging_writes_and_discards() {
        let tmp = tempfile::tempdir().unwrap();
        let mut staging = Staging::new(tmp.path());
        let asset = staging
            .stage("settings.json", &ContentType::Json, b"{}")
            .unwrap();
        assert_eq!(fs::read(asset.path()).unwrap(), b"{}");
        assert_eq!(asset.path().file_name().unwrap(), "settings.json");
        assert_eq!(asset.content_type.as_deref(), Some("application/json"));

        let dir = staging.staged()[0].clone();
        staging.discard();
        assert!(!dir.exists());
    }

    #[test]
    fn staging_rejects_path_like_filenames() {
        let tmp = tempfile::tempdir().unwrap();
        let mut staging = Staging::new(tmp.path());
        let err = staging
            .stage("../escape.json", &ContentType::Json, b"{}")
            .unwrap_err();
        assert!(matches!(err, AssetError::InvalidFilename(_)));
    }
}
