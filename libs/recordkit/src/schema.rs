use crate::decoder::FieldDecoder;
use crate::encoder::FieldEncoder;
use crate::error::CodecError;

/// Declared semantic kind of a field type. Selects the coercion rule.
///
/// Resolved statically from the field's Rust type through
/// [`crate::field::RecordField::DECLARED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredKind {
    Bool,
    Int,
    Double,
    String,
    /// Raw bytes. Never run through the nested-value decoder.
    Bytes,
    Url,
    /// List of primitives, or a JSON blob for other element kinds.
    List,
    StringEnum,
    IntEnum,
    Asset,
    /// Structured value stored as a JSON blob.
    Child,
}

impl DeclaredKind {
    /// Kinds that may be stored directly as list elements.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            DeclaredKind::Bool
                | DeclaredKind::Int
                | DeclaredKind::Double
                | DeclaredKind::String
                | DeclaredKind::Bytes
        )
    }
}

/// A single field in a record type's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Record key. Reserved keys map to identity slots instead of fields.
    pub name: &'static str,
    pub declared: DeclaredKind,
    /// `Option<T>` fields decode to `None` when missing.
    pub optional: bool,
}

/// A domain type that can be stored as a [`crate::Record`].
///
/// Normally derived:
///
/// ```ignore
/// #[derive(RecordType)]
/// #[record(type_name = "Person", rename_all = "camelCase")]
/// struct Person {
///     name: String,
///     is_developer: bool,
///     #[record(system_fields)]
///     system_fields: Option<Bytes>,
/// }
/// ```
pub trait RecordType: Sized {
    /// Record type name written to and expected from records.
    const RECORD_TYPE: &'static str;

    /// Declared fields, in declaration order.
    fn schema() -> Vec<FieldSchema>;

    fn encode_fields(&self, encoder: &mut FieldEncoder<'_>) -> Result<(), CodecError>;

    fn decode_fields(decoder: &FieldDecoder<'_>) -> Result<Self, CodecError>;
}
