use std::collections::BTreeMap;

use bytes::Bytes;
use uuid::Uuid;

use crate::asset::Staging;
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::field::{FieldSource, RecordField};
use crate::policy;
use crate::record::{Record, ZoneId};
use crate::schema::RecordType;
use crate::system_fields::SystemFieldsCodec;
use crate::value::RecordValue;
use crate::{IDENTIFIER_KEY, SYSTEM_FIELDS_KEY};

/// Encodes domain objects into records.
///
/// Holds only borrowed configuration; one encoder can serve any number of
/// concurrent calls.
pub struct RecordEncoder<'a> {
    config: &'a CodecConfig,
    system_fields: &'a dyn SystemFieldsCodec,
    zone: ZoneId,
}

impl<'a> RecordEncoder<'a> {
    pub fn new(config: &'a CodecConfig, system_fields: &'a dyn SystemFieldsCodec) -> Self {
        Self {
            config,
            system_fields,
            zone: config.default_zone.clone(),
        }
    }

    /// Zone for records that carry no prior system metadata.
    pub fn in_zone(mut self, zone: ZoneId) -> Self {
        self.zone = zone;
        self
    }

    /// Encode `value` into a complete record.
    ///
    /// Identity comes from the value's system metadata when present, otherwise
    /// from its declared identifier or a fresh UUID in the encoder's zone.
    /// Assets staged before a failure are removed again.
    ///
    /// # Panics
    ///
    /// Panics if the value's system metadata belongs to a record of another
    /// type than `T::RECORD_TYPE`.
    pub fn encode<T: RecordType>(&self, value: &T) -> Result<Record, CodecError> {
        let mut encoder = FieldEncoder::new(self.config);
        let identity = value
            .encode_fields(&mut encoder)
            .and_then(|()| self.identity::<T>(&encoder));

        let FieldEncoder {
            staging,
            fields,
            system_metadata,
            ..
        } = encoder;

        match identity {
            Ok((identifier, zone_id)) => {
                tracing::trace!(
                    record_type = T::RECORD_TYPE,
                    identifier = %identifier,
                    fields = fields.len(),
                    "encoded record"
                );
                Ok(Record {
                    type_name: T::RECORD_TYPE.to_owned(),
                    identifier,
                    zone_id,
                    fields,
                    system_metadata,
                })
            }
            Err(e) => {
                staging.discard();
                Err(e)
            }
        }
    }

    fn identity<T: RecordType>(
        &self,
        encoder: &FieldEncoder<'_>,
    ) -> Result<(String, ZoneId), CodecError> {
        let Some(blob) = &encoder.system_metadata else {
            let identifier = encoder
                .identifier
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            return Ok((identifier, self.zone.clone()));
        };

        let identity = self.system_fields.identity(blob)?;
        if identity.record_type != T::RECORD_TYPE {
            panic!(
                "system fields belong to a '{}' record, cannot encode it as '{}'",
                identity.record_type,
                T::RECORD_TYPE
            );
        }
        tracing::debug!(
            record_type = T::RECORD_TYPE,
            identifier = %identity.identifier,
            zone = %identity.zone_id.zone_name,
            "identity restored from system fields"
        );
        Ok((identity.identifier, identity.zone_id))
    }
}

/// Per-call field sink handed to [`RecordType::encode_fields`].
pub struct FieldEncoder<'a> {
    config: &'a CodecConfig,
    staging: Staging<'a>,
    fields: BTreeMap<String, RecordValue>,
    system_metadata: Option<Bytes>,
    identifier: Option<String>,
}

impl<'a> FieldEncoder<'a> {
    fn new(config: &'a CodecConfig) -> Self {
        Self {
            config,
            staging: Staging::new(&config.staging_dir),
            fields: BTreeMap::new(),
            system_metadata: None,
            identifier: None,
        }
    }

    /// Encode one field. Reserved names are captured as identity instead of
    /// being stored.
    pub fn field<T: RecordField>(&mut self, name: &str, value: &T) -> Result<(), CodecError> {
        let source = value.to_source().map_err(|e| CodecError::at(name, e))?;
        match name {
            SYSTEM_FIELDS_KEY => self.system_metadata = reserved_bytes(name, source)?,
            IDENTIFIER_KEY => self.identifier = reserved_string(name, source)?,
            _ => {
                let value = policy::coerce(source, self.config, &mut self.staging)
                    .map_err(|e| CodecError::at(name, e))?;
                if let Some(value) = value {
                    self.fields.insert(name.to_owned(), value);
                }
            }
        }
        Ok(())
    }
}

fn reserved_bytes(name: &str, source: FieldSource) -> Result<Option<Bytes>, CodecError> {
    match source {
        FieldSource::Absent => Ok(None),
        FieldSource::Primitive(RecordValue::Bytes(blob)) => Ok(Some(blob).filter(|b| !b.is_empty())),
        _ => Err(CodecError::UnsupportedValue {
            field: name.to_owned(),
            reason: "system fields must be bytes".to_owned(),
        }),
    }
}

fn reserved_string(name: &str, source: FieldSource) -> Result<Option<String>, CodecError> {
    match source {
        FieldSource::Absent => Ok(None),
        FieldSource::Primitive(RecordValue::String(s)) => Ok(Some(s).filter(|s| !s.is_empty())),
        _ => Err(CodecError::UnsupportedValue {
            field: name.to_owned(),
            reason: "record identifier must be a string".to_owned(),
        }),
    }
}
