use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::asset::ContentType;
use crate::error::FieldError;
use crate::finite;
use crate::policy;
use crate::schema::DeclaredKind;
use crate::value::RecordValue;

/// Encode-side view of a field value. One variant per coercion rule.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    /// `None`: the field is left out of the record.
    Absent,
    Url(Url),
    /// Elements of a list whose static element type is primitive.
    List(Vec<RecordValue>),
    Primitive(RecordValue),
    StringRaw(String),
    IntRaw(i64),
    /// Self-encoded asset content, staged by the encoder.
    Asset {
        filename: String,
        content_type: ContentType,
        bytes: Vec<u8>,
    },
    /// Structured value, stored as a JSON blob.
    Child(serde_json::Value),
}

/// Decode-side view of a stored value after the ordered rules in
/// [`policy::resolve`] have been applied.
#[derive(Debug)]
pub enum Decoded<'r> {
    Bool(bool),
    Url(Url),
    StringRaw(&'r str),
    IntRaw(i64),
    /// Bytes stored for a field not declared as raw bytes.
    Nested(&'r [u8]),
    Asset {
        bytes: Vec<u8>,
        observed: Option<ContentType>,
    },
    Value(&'r RecordValue),
}

/// A Rust type usable as a record field.
///
/// Each impl picks exactly one coercion rule through `DECLARED`. Enums, assets
/// and structured child values opt in with [`crate::enum_field!`],
/// [`crate::asset_field!`] and [`crate::child_field!`].
pub trait RecordField: Sized {
    const DECLARED: DeclaredKind;
    const OPTIONAL: bool = false;

    fn to_source(&self) -> Result<FieldSource, FieldError>;

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError>;

    /// Value used when the field is missing from the record.
    fn absent() -> Option<Self> {
        None
    }
}

macro_rules! int_field {
    ($($ty:ty),*) => {$(
        impl RecordField for $ty {
            const DECLARED: DeclaredKind = DeclaredKind::Int;

            fn to_source(&self) -> Result<FieldSource, FieldError> {
                Ok(FieldSource::Primitive(RecordValue::Int(i64::from(*self))))
            }

            fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
                match decoded {
                    Decoded::Value(RecordValue::Int(v)) => {
                        <$ty>::try_from(*v).map_err(|_| FieldError::Mismatch(stringify!($ty)))
                    }
                    Decoded::Nested(bytes) => Ok(serde_json::from_slice(bytes)?),
                    _ => Err(FieldError::Mismatch("int")),
                }
            }
        }
    )*};
}

int_field!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_int_field {
    ($($ty:ty),*) => {$(
        impl RecordField for $ty {
            const DECLARED: DeclaredKind = DeclaredKind::Int;

            fn to_source(&self) -> Result<FieldSource, FieldError> {
                let v = i64::try_from(*self).map_err(|_| {
                    FieldError::Unsupported(format!("{self} does not fit in a signed 64-bit int"))
                })?;
                Ok(FieldSource::Primitive(RecordValue::Int(v)))
            }

            fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
                match decoded {
                    Decoded::Value(RecordValue::Int(v)) => {
                        <$ty>::try_from(*v).map_err(|_| FieldError::Mismatch(stringify!($ty)))
                    }
                    Decoded::Nested(bytes) => Ok(serde_json::from_slice(bytes)?),
                    _ => Err(FieldError::Mismatch("int")),
                }
            }
        }
    )*};
}

wide_int_field!(u64, usize);

impl RecordField for f64 {
    const DECLARED: DeclaredKind = DeclaredKind::Double;

    fn to_source(&self) -> Result<FieldSource, FieldError> {
        Ok(FieldSource::Primitive(RecordValue::Double(*self)))
    }

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
        match decoded {
            Decoded::Value(RecordValue::Double(v)) => Ok(*v),
            Decoded::Nested(bytes) => Ok(serde_json::from_slice(bytes)?),
            _ => Err(FieldError::Mismatch("double")),
        }
    }
}

impl RecordField for f32 {
    const DECLARED: DeclaredKind = DeclaredKind::Double;

    fn to_source(&self) -> Result<FieldSource, FieldError> {
        Ok(FieldSource::Primitive(RecordValue::Double(f64::from(*self))))
    }

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
        f64::from_decoded(decoded).map(|v| v as f32)
    }
}

impl RecordField for bool {
    const DECLARED: DeclaredKind = DeclaredKind::Bool;

    fn to_source(&self) -> Result<FieldSource, FieldError> {
        Ok(FieldSource::Primitive(RecordValue::Int(i64::from(*self))))
    }

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
        match decoded {
            Decoded::Bool(v) => Ok(v),
            _ => Err(FieldError::Mismatch("int")),
        }
    }
}

impl RecordField for String {
    const DECLARED: DeclaredKind = DeclaredKind::String;

    fn to_source(&self) -> Result<FieldSource, FieldError> {
        Ok(FieldSource::Primitive(RecordValue::String(self.clone())))
    }

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
        match decoded {
            Decoded::Value(RecordValue::String(v)) => Ok(v.clone()),
            Decoded::Nested(bytes) => Ok(serde_json::from_slice(bytes)?),
            _ => Err(FieldError::Mismatch("string")),
        }
    }
}

impl RecordField for Bytes {
    const DECLARED: DeclaredKind = DeclaredKind::Bytes;

    fn to_source(&self) -> Result<FieldSource, FieldError> {
        Ok(FieldSource::Primitive(RecordValue::Bytes(self.clone())))
    }

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
        match decoded {
            Decoded::Value(RecordValue::Bytes(v)) => Ok(v.clone()),
            _ => Err(FieldError::Mismatch("bytes")),
        }
    }
}

impl RecordField for Url {
    const DECLARED: DeclaredKind = DeclaredKind::Url;

    fn to_source(&self) -> Result<FieldSource, FieldError> {
        Ok(FieldSource::Url(self.clone()))
    }

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
        match decoded {
            Decoded::Url(url) => Ok(url),
            _ => Err(FieldError::Mismatch("url string or asset")),
        }
    }
}

impl<T: RecordField> RecordField for Option<T> {
    const DECLARED: DeclaredKind = T::DECLARED;
    const OPTIONAL: bool = true;

    fn to_source(&self) -> Result<FieldSource, FieldError> {
        match self {
            Some(v) => v.to_source(),
            None => Ok(FieldSource::Absent),
        }
    }

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
        match decoded {
            Decoded::Value(RecordValue::Null) => Ok(None),
            other => T::from_decoded(other).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

/// Lists of primitive element types are stored as [`RecordValue::List`];
/// any other element type stores the whole list as a JSON blob.
impl<T> RecordField for Vec<T>
where
    T: RecordField + Serialize + DeserializeOwned,
{
    const DECLARED: DeclaredKind = DeclaredKind::List;

    fn to_source(&self) -> Result<FieldSource, FieldError> {
        if !T::DECLARED.is_primitive() {
            return child_source(self);
        }
        let mut items = Vec::with_capacity(self.len());
        for item in self {
            match item.to_source()? {
                FieldSource::Primitive(v) if v.is_list_element() => items.push(v),
                FieldSource::Absent => items.push(RecordValue::Null),
                _ => return child_source(self),
            }
        }
        Ok(FieldSource::List(items))
    }

    fn from_decoded(decoded: Decoded<'_>) -> Result<Self, FieldError> {
        match decoded {
            Decoded::Value(RecordValue::List(items)) => items
                .iter()
                .map(|item| policy::resolve(T::DECLARED, item).and_then(T::from_decoded))
                .collect(),
            Decoded::Nested(bytes) => Ok(serde_json::from_slice(bytes)?),
            _ => Err(FieldError::Mismatch("list")),
        }
    }
}

/// Structured value stored as a JSON blob. Used by [`crate::child_field!`].
pub fn child_source<T: Serialize>(value: &T) -> Result<FieldSource, FieldError> {
    finite::ensure_finite(value)?;
    Ok(FieldSource::Child(serde_json::to_value(value)?))
}

pub fn child_from_decoded<T: DeserializeOwned>(decoded: Decoded<'_>) -> Result<T, FieldError> {
    match decoded {
        Decoded::Nested(bytes) => Ok(serde_json::from_slice(bytes)?),
        _ => Err(FieldError::Mismatch("bytes")),
    }
}

/// Store a `Serialize + DeserializeOwned` type as a structured child value.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Address { street: String, city: String }
/// recordkit::child_field!(Address);
/// ```
#[macro_export]
macro_rules! child_field {
    ($ty:ty) => {
        impl $crate::field::RecordField for $ty {
            const DECLARED: $crate::schema::DeclaredKind = $crate::schema::DeclaredKind::Child;

            fn to_source(
                &self,
            ) -> ::core::result::Result<$crate::field::FieldSource, $crate::error::FieldError> {
                $crate::field::child_source(self)
            }

            fn from_decoded(
                decoded: $crate::field::Decoded<'_>,
            ) -> ::core::result::Result<Self, $crate::error::FieldError> {
                $crate::field::child_from_decoded(decoded)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_is_stored_as_int() {
        assert_eq!(
            true.to_source().unwrap(),
            FieldSource::Primitive(RecordValue::Int(1))
        );
        assert_eq!(
            false.to_source().unwrap(),
            FieldSource::Primitive(RecordValue::Int(0))
        );
    }

    #[test]
    fn primitive_vec_becomes_list() {
        let source = vec!["a".to_string(), "b".to_string()].to_source().unwrap();
        assert_eq!(
            source,
            FieldSource::List(vec![
                RecordValue::String("a".into()),
                RecordValue::String("b".into())
            ])
        );
    }

    #[test]
    fn url_vec_falls_back_to_child() {
        let urls = vec![Url::parse("https://example.com/a").unwrap()];
        let source = urls.to_source().unwrap();
        assert_eq!(
            source,
            FieldSource::Child(serde_json::json!(["https://example.com/a"]))
        );
    }

    #[test]
    fn int_out_of_range_is_mismatch() {
        let stored = RecordValue::Int(i64::from(u16::MAX) + 1);
        let err = u16::from_decoded(Decoded::Value(&stored)).unwrap_err();
        assert!(matches!(err, FieldError::Mismatch("u16")));
    }

    #[test]
    fn option_decodes_null_as_none() {
        let decoded = Option::<String>::from_decoded(Decoded::Value(&RecordValue::Null)).unwrap();
        assert_eq!(decoded, None);
        assert_eq!(Option::<String>::absent(), Some(None));
        assert_eq!(String::absent(), None);
    }

    #[test]
    fn small_and_wide_ints() {
        assert_eq!(
            7u8.to_source().unwrap(),
            FieldSource::Primitive(RecordValue::Int(7))
        );
        assert!(matches!(
            i8::from_decoded(Decoded::Value(&RecordValue::Int(200))),
            Err(FieldError::Mismatch("i8"))
        ));
        assert_eq!(
            u64::from_decoded(Decoded::Value(&RecordValue::Int(42))).unwrap(),
            42
        );
        assert!(matches!(u64::MAX.to_source(), Err(FieldError::Unsupported(_))));
    }

    #[test]
    fn non_finite_child_is_unsupported() {
        assert!(child_source(&serde_json::json!({"ok": 1})).is_ok());
        let err = vec![vec![f64::INFINITY]].to_source().unwrap_err();
        assert!(matches!(err, FieldError::Unsupported(_)));
    }

    #[test]
    fn raw_bytes_reject_nested_view() {
        let err = Bytes::from_decoded(Decoded::Nested(b"[]")).unwrap_err();
        assert!(matches!(err, FieldError::Mismatch("bytes")));
    }
}
