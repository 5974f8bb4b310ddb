use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::record::{Record, ZoneId};

/// Identity recovered from a system metadata blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemIdentity {
    pub record_type: String,
    pub identifier: String,
    pub zone_id: ZoneId,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SystemFieldsError(pub String);

/// Reads identity out of the store's opaque system metadata.
///
/// The blob format belongs to the record store; the codec never looks inside
/// it and forwards it untouched.
pub trait SystemFieldsCodec: Send + Sync {
    fn identity(&self, blob: &[u8]) -> Result<SystemIdentity, SystemFieldsError>;
}

/// System metadata kept as a JSON document.
///
/// For stores without a binary metadata format of their own, such as local
/// caches. Extra keys written by the store are ignored on read.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSystemFields;

impl JsonSystemFields {
    /// Metadata blob for a record as the store would hand it back after a save.
    pub fn archive(&self, record: &Record) -> Result<Bytes, SystemFieldsError> {
        let identity = SystemIdentity {
            record_type: record.type_name.clone(),
            identifier: record.identifier.clone(),
            zone_id: record.zone_id.clone(),
        };
        serde_json::to_vec(&identity)
            .map(Bytes::from)
            .map_err(|e| SystemFieldsError(e.to_string()))
    }
}

impl SystemFieldsCodec for JsonSystemFields {
    fn identity(&self, blob: &[u8]) -> Result<SystemIdentity, SystemFieldsError> {
        serde_json::from_slice(blob).map_err(|e| SystemFieldsError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_then_identity() {
        let record = Record::new("Person", "P-1").in_zone(ZoneId::new("ABCDE", "owner"));
        let blob = JsonSystemFields.archive(&record).unwrap();
        let identity = JsonSystemFields.identity(&blob).unwrap();
        assert_eq!(identity.record_type, "Person");
        assert_eq!(identity.identifier, "P-1");
        assert_eq!(identity.zone_id, ZoneId::new("ABCDE", "owner"));
    }

    #[test]
    fn garbage_blob_fails() {
        assert!(JsonSystemFields.identity(b"\x00\x01").is_err());
    }
}
