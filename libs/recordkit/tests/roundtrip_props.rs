use bytes::Bytes;
use proptest::prelude::*;
use recordkit::{CodecConfig, JsonSystemFields, RecordDecoder, RecordEncoder, RecordType, ZoneId};

#[derive(Debug, Clone, PartialEq, RecordType)]
#[record(type_name = "Primitives")]
struct Primitives {
    int: i64,
    small: i32,
    double: f64,
    text: String,
    flag: bool,
    blob: Bytes,
    numbers: Vec<i32>,
    maybe: Option<String>,
    #[record(system_fields)]
    system_fields: Option<Bytes>,
}

fn primitives() -> impl Strategy<Value = Primitives> {
    (
        any::<i64>(),
        any::<i32>(),
        -1.0e12f64..1.0e12,
        ".{0,32}",
        any::<bool>(),
        proptest::collection::vec(any::<u8>(), 0..64),
        proptest::collection::vec(any::<i32>(), 0..8),
        proptest::option::of("[a-z]{1,8}"),
    )
        .prop_map(
            |(int, small, double, text, flag, blob, numbers, maybe)| Primitives {
                int,
                small,
                double,
                text,
                flag,
                blob: Bytes::from(blob),
                numbers,
                maybe,
                system_fields: None,
            },
        )
}

proptest! {
    #[test]
    fn primitives_round_trip(value in primitives()) {
        let config = CodecConfig::default();
        let record = RecordEncoder::new(&config, &JsonSystemFields).encode(&value).unwrap();
        let decoded: Primitives = RecordDecoder::new().decode(&record).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn identity_survives_decode_and_encode(
        value in primitives(),
        zone_name in "[A-Za-z0-9]{1,12}",
        owner_name in "[a-z_]{1,12}",
    ) {
        let config = CodecConfig::default();
        let zone = ZoneId::new(zone_name, owner_name);
        let mut saved = RecordEncoder::new(&config, &JsonSystemFields)
            .in_zone(zone.clone())
            .encode(&value)
            .unwrap();
        saved.system_metadata = Some(JsonSystemFields.archive(&saved).unwrap());

        let decoded: Primitives = RecordDecoder::new().decode(&saved).unwrap();
        let again = RecordEncoder::new(&config, &JsonSystemFields).encode(&decoded).unwrap();
        prop_assert_eq!(&again.identifier, &saved.identifier);
        prop_assert_eq!(&again.zone_id, &zone);
    }
}
