//! Bidirectional codec between typed domain objects and flat key/value records.
//!
//! Domain types describe themselves through `#[derive(RecordType)]`; each field
//! type opts into one coercion rule through its [`field::RecordField`] impl.
//! [`RecordEncoder`] and [`RecordDecoder`] walk that schema and apply the
//! shared rules in [`policy`].

pub mod asset;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod enum_mapping;
pub mod error;
pub mod field;
pub mod finite;
pub mod policy;
pub mod record;
pub mod schema;
pub mod system_fields;
pub mod value;

pub use recordkit_derive::{RecordEnum, RecordType};

pub use asset::{AssetError, AssetValue, ContentType};
pub use config::{CodecConfig, StructuredEncoding};
pub use decoder::RecordDecoder;
pub use encoder::RecordEncoder;
pub use enum_mapping::EnumMapping;
pub use error::CodecError;
pub use record::{Record, ZoneId};
pub use schema::{DeclaredKind, FieldSchema, RecordType};
pub use system_fields::{JsonSystemFields, SystemFieldsCodec, SystemIdentity};
pub use value::{Asset, RecordValue};

/// Maximum size of a single Bytes-valued field.
pub const MAX_DATA_LEN: usize = 1_000_000;

/// Reserved field holding the opaque system metadata blob.
pub const SYSTEM_FIELDS_KEY: &str = "cloudKitSystemFields";

/// Reserved field exposing the record identifier.
pub const IDENTIFIER_KEY: &str = "cloudKitIdentifier";
