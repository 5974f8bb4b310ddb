use bytes::Bytes;

use crate::error::CodecError;
use crate::field::{Decoded, RecordField};
use crate::policy;
use crate::record::Record;
use crate::schema::RecordType;
use crate::value::RecordValue;
use crate::{IDENTIFIER_KEY, SYSTEM_FIELDS_KEY};

/// Decodes records into domain objects. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDecoder;

impl RecordDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode `record` into a `T`, walking `T`'s declared fields in order.
    ///
    /// The object's system fields slot receives the record's metadata blob so
    /// the next encode keeps the record's identity.
    ///
    /// # Panics
    ///
    /// Panics if `record.type_name` is not `T::RECORD_TYPE`.
    pub fn decode<T: RecordType>(&self, record: &Record) -> Result<T, CodecError> {
        if record.type_name != T::RECORD_TYPE {
            panic!(
                "cannot decode a '{}' record as '{}'",
                record.type_name,
                T::RECORD_TYPE
            );
        }
        let value = T::decode_fields(&FieldDecoder { record })?;
        tracing::trace!(
            record_type = T::RECORD_TYPE,
            identifier = %record.identifier,
            "decoded record"
        );
        Ok(value)
    }
}

/// Per-call field source handed to [`RecordType::decode_fields`].
pub struct FieldDecoder<'r> {
    record: &'r Record,
}

impl<'r> FieldDecoder<'r> {
    pub fn record(&self) -> &'r Record {
        self.record
    }

    /// Decode one declared field.
    pub fn field<T: RecordField>(&self, name: &str) -> Result<T, CodecError> {
        if name == SYSTEM_FIELDS_KEY {
            return self.system_fields(name);
        }
        if name == IDENTIFIER_KEY {
            let identifier = RecordValue::String(self.record.identifier.clone());
            return T::from_decoded(Decoded::Value(&identifier)).map_err(|e| CodecError::at(name, e));
        }

        let stored = match self.record.fields.get(name) {
            None | Some(RecordValue::Null) => {
                return T::absent().ok_or_else(|| CodecError::FieldNotFound(name.to_owned()));
            }
            Some(stored) => stored,
        };
        policy::resolve(T::DECLARED, stored)
            .and_then(T::from_decoded)
            .map_err(|e| CodecError::at(name, e))
    }

    fn system_fields<T: RecordField>(&self, name: &str) -> Result<T, CodecError> {
        let blob = match &self.record.system_metadata {
            Some(blob) => blob.clone(),
            None => match T::absent() {
                Some(absent) => return Ok(absent),
                None => Bytes::new(),
            },
        };
        let stored = RecordValue::Bytes(blob);
        T::from_decoded(Decoded::Value(&stored)).map_err(|e| CodecError::at(name, e))
    }
}
