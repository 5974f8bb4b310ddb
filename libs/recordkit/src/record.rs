use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::value::RecordValue;

/// Named partition of the store's identifier space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId {
    pub zone_name: String,
    pub owner_name: String,
}

impl ZoneId {
    pub const DEFAULT_ZONE_NAME: &'static str = "_defaultZone";
    pub const DEFAULT_OWNER_NAME: &'static str = "__defaultOwner__";

    pub fn new(zone_name: impl Into<String>, owner_name: impl Into<String>) -> Self {
        Self {
            zone_name: zone_name.into(),
            owner_name: owner_name.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.zone_name == Self::DEFAULT_ZONE_NAME && self.owner_name == Self::DEFAULT_OWNER_NAME
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ZONE_NAME, Self::DEFAULT_OWNER_NAME)
    }
}

/// Flat key/value snapshot exchanged with the record store.
///
/// `identifier` and `zone_id` together form the record's identity.
/// `system_metadata` is owned by the store and never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: String,
    pub identifier: String,
    #[serde(default)]
    pub zone_id: ZoneId,
    #[serde(default)]
    pub fields: BTreeMap<String, RecordValue>,
    #[serde(default)]
    pub system_metadata: Option<Bytes>,
}

impl Record {
    /// Empty record in the default zone.
    pub fn new(type_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            identifier: identifier.into(),
            zone_id: ZoneId::default(),
            fields: BTreeMap::new(),
            system_metadata: None,
        }
    }

    pub fn in_zone(mut self, zone_id: ZoneId) -> Self {
        self.zone_id = zone_id;
        self
    }

    pub fn get(&self, name: &str) -> Option<&RecordValue> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: RecordValue) {
        self.fields.insert(name.into(), value);
    }
}
