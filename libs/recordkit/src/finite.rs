//! Rejects NaN and infinite floats before a value is written as JSON.
//!
//! `serde_json` writes non-finite floats as `null`, which no longer decodes
//! into the original field. The check walks the value through a serializer
//! that produces nothing and fails on the first non-finite float.

use std::fmt::Display;

use serde::Serialize;
use serde::ser;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct NonFiniteFloat(String);

impl ser::Error for NonFiniteFloat {
    fn custom<T: Display>(msg: T) -> Self {
        NonFiniteFloat(msg.to_string())
    }
}

pub fn ensure_finite<T: Serialize + ?Sized>(value: &T) -> Result<(), NonFiniteFloat> {
    value.serialize(FiniteCheck)
}

fn float(v: f64) -> Result<(), NonFiniteFloat> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(NonFiniteFloat(format!("{v} has no JSON representation")))
    }
}

struct FiniteCheck;

macro_rules! accept {
    ($($method:ident($ty:ty)),* $(,)?) => {$(
        fn $method(self, _: $ty) -> Result<(), NonFiniteFloat> {
            Ok(())
        }
    )*};
}

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = NonFiniteFloat;
    type SerializeSeq = FiniteCheck;
    type SerializeTuple = FiniteCheck;
    type SerializeTupleStruct = FiniteCheck;
    type SerializeTupleVariant = FiniteCheck;
    type SerializeMap = FiniteCheck;
    type SerializeStruct = FiniteCheck;
    type SerializeStructVariant = FiniteCheck;

    accept!(
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    );

    fn serialize_f32(self, v: f32) -> Result<(), NonFiniteFloat> {
        float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), NonFiniteFloat> {
        float(v)
    }

    fn serialize_none(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), NonFiniteFloat> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), NonFiniteFloat> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), NonFiniteFloat> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<FiniteCheck, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<FiniteCheck, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<FiniteCheck, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<FiniteCheck, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<FiniteCheck, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<FiniteCheck, NonFiniteFloat> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<FiniteCheck, NonFiniteFloat> {
        Ok(self)
    }
}

macro_rules! elements {
    ($($trait:ident::$method:ident),* $(,)?) => {$(
        impl ser::$trait for FiniteCheck {
            type Ok = ();
            type Error = NonFiniteFloat;

            fn $method<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NonFiniteFloat> {
                value.serialize(FiniteCheck)
            }

            fn end(self) -> Result<(), NonFiniteFloat> {
                Ok(())
            }
        }
    )*};
}

elements!(
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field,
    SerializeTupleVariant::serialize_field,
);

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = NonFiniteFloat;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), NonFiniteFloat> {
        key.serialize(FiniteCheck)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NonFiniteFloat> {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result<(), NonFiniteFloat> {
        Ok(())
    }
}

macro_rules! fields {
    ($($trait:ident),* $(,)?) => {$(
        impl ser::$trait for FiniteCheck {
            type Ok = ();
            type Error = NonFiniteFloat;

            fn serialize_field<T: Serialize + ?Sized>(
                &mut self,
                _key: &'static str,
                value: &T,
            ) -> Result<(), NonFiniteFloat> {
                value.serialize(FiniteCheck)
            }

            fn end(self) -> Result<(), NonFiniteFloat> {
                Ok(())
            }
        }
    )*};
}

fields!(SerializeStruct, SerializeStructVariant);

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Serialize)]
    struct Reading {
        label: String,
        samples: Vec<Option<f32>>,
        extra: BTreeMap<String, f64>,
    }

    #[test]
    fn finite_values_pass() {
        let reading = Reading {
            label: "ok".into(),
            samples: vec![Some(1.5), None],
            extra: BTreeMap::from([("x".into(), -0.0)]),
        };
        assert!(ensure_finite(&reading).is_ok());
    }

    #[test]
    fn nested_non_finite_values_fail() {
        let reading = Reading {
            label: "nan".into(),
            samples: vec![Some(1.0), Some(f32::NAN)],
            extra: BTreeMap::new(),
        };
        let err = ensure_finite(&reading).unwrap_err();
        assert_eq!(err.to_string(), "NaN has no JSON representation");

        let reading = Reading {
            label: "inf".into(),
            samples: vec![],
            extra: BTreeMap::from([("x".into(), f64::NEG_INFINITY)]),
        };
        assert!(ensure_finite(&reading).is_err());
    }
}
