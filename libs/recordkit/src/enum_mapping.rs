use crate::error::FieldError;
use crate::field::{Decoded, FieldSource};
use crate::schema::DeclaredKind;

/// Raw representation an enum is stored as: `String` or `i64`.
pub trait RawValue: Sized {
    const DECLARED: DeclaredKind;

    fn into_source(self) -> FieldSource;

    fn from_decoded(decoded: Decoded<'_>) -> Option<Self>;
}

impl RawValue for String {
    const DECLARED: DeclaredKind = DeclaredKind::StringEnum;

    fn into_source(self) -> FieldSource {
        FieldSource::StringRaw(self)
    }

    fn from_decoded(decoded: Decoded<'_>) -> Option<Self> {
        match decoded {
            Decoded::StringRaw(s) => Some(s.to_owned()),
            _ => None,
        }
    }
}

impl RawValue for i64 {
    const DECLARED: DeclaredKind = DeclaredKind::IntEnum;

    fn into_source(self) -> FieldSource {
        FieldSource::IntRaw(self)
    }

    fn from_decoded(decoded: Decoded<'_>) -> Option<Self> {
        match decoded {
            Decoded::IntRaw(v) => Some(v),
            _ => None,
        }
    }
}

/// An enum stored as its raw value.
///
/// `fallback_case` is returned for raw values this build doesn't know, so
/// records written by newer clients still decode.
pub trait EnumMapping: Sized {
    type Raw: RawValue;

    fn raw_value(&self) -> Self::Raw;

    fn from_raw_value(raw: &Self::Raw) -> Option<Self>;

    fn fallback_case() -> Option<Self> {
        None
    }
}

pub fn enum_source<E: EnumMapping>(value: &E) -> FieldSource {
    value.raw_value().into_source()
}

pub fn enum_from_decoded<E: EnumMapping>(decoded: Decoded<'_>) -> Result<E, FieldError> {
    let expected = match E::Raw::DECLARED {
        DeclaredKind::IntEnum => "int",
        _ => "string",
    };
    let raw = E::Raw::from_decoded(decoded).ok_or(FieldError::Mismatch(expected))?;
    if let Some(value) = E::from_raw_value(&raw) {
        return Ok(value);
    }
    match E::fallback_case() {
        Some(fallback) => {
            tracing::debug!(
                enum_type = std::any::type_name::<E>(),
                "unknown raw value, using fallback case"
            );
            Ok(fallback)
        }
        None => Err(FieldError::Mismatch("known raw value")),
    }
}

/// Store an [`EnumMapping`] type as its raw value.
#[macro_export]
macro_rules! enum_field {
    ($ty:ty) => {
        impl $crate::field::RecordField for $ty {
            const DECLARED: $crate::schema::DeclaredKind =
                <<$ty as $crate::enum_mapping::EnumMapping>::Raw as $crate::enum_mapping::RawValue>::DECLARED;

            fn to_source(
                &self,
            ) -> ::core::result::Result<$crate::field::FieldSource, $crate::error::FieldError> {
                ::core::result::Result::Ok($crate::enum_mapping::enum_source(self))
            }

            fn from_decoded(
                decoded: $crate::field::Decoded<'_>,
            ) -> ::core::result::Result<Self, $crate::error::FieldError> {
                $crate::enum_mapping::enum_from_decoded(decoded)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::RecordField;

    #[derive(Debug, PartialEq)]
    enum Priority {
        Low,
        High,
    }

    impl EnumMapping for Priority {
        type Raw = i64;

        fn raw_value(&self) -> i64 {
            match self {
                Priority::Low => 1,
                Priority::High => 10,
            }
        }

        fn from_raw_value(raw: &i64) -> Option<Self> {
            match raw {
                1 => Some(Priority::Low),
                10 => Some(Priority::High),
                _ => None,
            }
        }
    }

    crate::enum_field!(Priority);

    #[test]
    fn int_enum_declares_int_kind() {
        assert_eq!(Priority::DECLARED, DeclaredKind::IntEnum);
        assert_eq!(Priority::High.to_source().unwrap(), FieldSource::IntRaw(10));
    }

    #[test]
    fn unknown_raw_without_fallback_is_mismatch() {
        assert_eq!(
            Priority::from_decoded(Decoded::IntRaw(1)).unwrap(),
            Priority::Low
        );
        let err = Priority::from_decoded(Decoded::IntRaw(5)).unwrap_err();
        assert!(matches!(err, FieldError::Mismatch("known raw value")));
    }
}
