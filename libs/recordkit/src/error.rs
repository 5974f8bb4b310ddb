use crate::asset::AssetError;
use crate::finite::NonFiniteFloat;
use crate::system_fields::SystemFieldsError;

/// Failure of a single field's coercion, before the field name is attached.
///
/// Raised by [`crate::field::RecordField`] impls; the encoder and decoder turn
/// it into a [`CodecError`] with [`CodecError::at`].
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("expected {0}")]
    Mismatch(&'static str),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0} bytes exceeds the data field limit")]
    TooLarge(usize),

    #[error("nested value: {0}")]
    Nested(#[from] serde_json::Error),

    #[error("asset: {0}")]
    Asset(#[from] AssetError),
}

impl From<NonFiniteFloat> for FieldError {
    fn from(err: NonFiniteFloat) -> Self {
        FieldError::Unsupported(err.to_string())
    }
}

/// Error returned by encode and decode. Encoding and decoding are atomic: on
/// error no record or object is produced.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("field '{field}': unsupported value: {reason}")]
    UnsupportedValue { field: String, reason: String },

    #[error("system fields could not be decoded: {0}")]
    SystemFieldsDecodeFailure(#[from] SystemFieldsError),

    #[error("field '{field}': {size} bytes exceeds the data field limit")]
    DataFieldTooLarge { field: String, size: usize },

    #[error("field '{0}' not found in record")]
    FieldNotFound(String),

    #[error("field '{field}': type mismatch, expected {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("field '{field}': nested value: {source}")]
    NestedValue {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("field '{field}': asset: {source}")]
    Asset {
        field: String,
        #[source]
        source: AssetError,
    },
}

impl CodecError {
    /// Attach the field name to a field-local error.
    pub fn at(field: impl Into<String>, err: FieldError) -> Self {
        let field = field.into();
        match err {
            FieldError::Mismatch(expected) => CodecError::TypeMismatch { field, expected },
            FieldError::Unsupported(reason) => CodecError::UnsupportedValue { field, reason },
            FieldError::TooLarge(size) => CodecError::DataFieldTooLarge { field, size },
            FieldError::Nested(source) => CodecError::NestedValue { field, source },
            FieldError::Asset(source) => CodecError::Asset { field, source },
        }
    }

    /// Name of the offending field, if the error is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            CodecError::UnsupportedValue { field, .. }
            | CodecError::DataFieldTooLarge { field, .. }
            | CodecError::TypeMismatch { field, .. }
            | CodecError::NestedValue { field, .. }
            | CodecError::Asset { field, .. } => Some(field.as_str()),
            CodecError::FieldNotFound(field) => Some(field.as_str()),
            CodecError::SystemFieldsDecodeFailure(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_maps_field_errors_to_codec_errors() {
        let err = CodecError::at("age", FieldError::Mismatch("int"));
        assert!(matches!(
            &err,
            CodecError::TypeMismatch { field, expected: "int" } if field == "age"
        ));
        assert_eq!(err.to_string(), "field 'age': type mismatch, expected int");

        let err = CodecError::at("x", FieldError::Unsupported("relative path".into()));
        assert!(matches!(err, CodecError::UnsupportedValue { .. }));
        assert_eq!(err.field(), Some("x"));
    }
}
