use crate::error::{DecodeError, RedmapError};
use std::io;
use std::io::Write;
use std::str::FromStr;

/// determine how a value is serialized into a hash field
pub trait ToFieldValue<W: Write> {
    fn get_length(&self) -> usize;
    fn write_to(&self, stream: &mut W) -> io::Result<()>;
}

impl<'a, W: Write> ToFieldValue<W> for &'a [u8] {
    fn get_length(&self) -> usize {
        return self.len();
    }

    fn write_to(&self, stream: &mut W) -> io::Result<()> {
        match stream.write_all(self) {
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<'a, W: Write> ToFieldValue<W> for &'a String {
    fn get_length(&self) -> usize {
        ToFieldValue::<W>::get_length(*self)
    }

    fn write_to(&self, stream: &mut W) -> io::Result<()> {
        ToFieldValue::<W>::write_to(*self, stream)
    }
}

impl<W: Write> ToFieldValue<W> for String {
    fn get_length(&self) -> usize {
        return self.as_bytes().len();
    }

    fn write_to(&self, stream: &mut W) -> io::Result<()> {
        match stream.write_all(self.as_bytes()) {
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<'a, W: Write> ToFieldValue<W> for &'a str {
    fn get_length(&self) -> usize {
        return self.as_bytes().len();
    }

    fn write_to(&self, stream: &mut W) -> io::Result<()> {
        match stream.write_all(self.as_bytes()) {
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<W: Write> ToFieldValue<W> for bool {
    fn get_length(&self) -> usize {
        return 1;
    }

    fn write_to(&self, stream: &mut W) -> io::Result<()> {
        let s = if *self { "1" } else { "0" };
        stream.write_all(s.as_bytes())
    }
}

macro_rules! impl_to_field_value_for_number {
    ($ty:ident) => {
        impl<W: Write> ToFieldValue<W> for $ty {
            fn get_length(&self) -> usize {
                return self.to_string().as_bytes().len();
            }

            fn write_to(&self, stream: &mut W) -> io::Result<()> {
                match stream.write_all(self.to_string().as_bytes()) {
                    Ok(_) => Ok(()),
                    Err(e) => Err(e),
                }
            }
        }
    };
}

impl_to_field_value_for_number!(u8);
impl_to_field_value_for_number!(u16);
impl_to_field_value_for_number!(u32);
impl_to_field_value_for_number!(u64);
impl_to_field_value_for_number!(i8);
impl_to_field_value_for_number!(i16);
impl_to_field_value_for_number!(i32);
impl_to_field_value_for_number!(i64);
impl_to_field_value_for_number!(f32);
impl_to_field_value_for_number!(f64);

type FieldValue<T> = Result<T, RedmapError>;

/// determine how a raw hash field value is decoded into a typed value
pub trait FromFieldValue: Sized {
    fn from_field_value(value: Vec<u8>) -> FieldValue<Self>;
}

impl FromFieldValue for Vec<u8> {
    fn from_field_value(value: Vec<u8>) -> FieldValue<Self> {
        return Ok(value);
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: Vec<u8>) -> FieldValue<Self> {
        return Ok(String::from_utf8(value)?);
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: Vec<u8>) -> FieldValue<Self> {
        let s: String = FromFieldValue::from_field_value(value)?;
        match s.as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(DecodeError::Bool(s))?,
        }
    }
}

macro_rules! impl_from_field_value_for_number {
    ($ty:ident) => {
        impl FromFieldValue for $ty {
            fn from_field_value(value: Vec<u8>) -> FieldValue<Self> {
                let s: String = FromFieldValue::from_field_value(value)?;
                Ok(Self::from_str(s.as_str())?)
            }
        }
    };
}

impl_from_field_value_for_number!(u8);
impl_from_field_value_for_number!(u16);
impl_from_field_value_for_number!(u32);
impl_from_field_value_for_number!(u64);
impl_from_field_value_for_number!(i8);
impl_from_field_value_for_number!(i16);
impl_from_field_value_for_number!(i32);
impl_from_field_value_for_number!(i64);
impl_from_field_value_for_number!(f32);
impl_from_field_value_for_number!(f64);

/// Typed view over a hash field holding a JSON document.
///
/// On the read side any `Deserialize` type works:
/// `client.get_field::<Json<Config>>(key, field)?`. On the write side store
/// a [`serde_json::Value`] (convert with `serde_json::to_value`, which owns
/// the fallible half of the conversion); rendering a `Value` never fails.
#[cfg(feature = "json")]
#[derive(Clone, Debug, PartialEq)]
pub struct Json<T>(pub T);

#[cfg(feature = "json")]
impl<T: serde::de::DeserializeOwned> FromFieldValue for Json<T> {
    fn from_field_value(value: Vec<u8>) -> FieldValue<Self> {
        return Ok(Json(serde_json::from_slice(&value)?));
    }
}

#[cfg(feature = "json")]
impl<W: Write> ToFieldValue<W> for serde_json::Value {
    fn get_length(&self) -> usize {
        return self.to_string().as_bytes().len();
    }

    fn write_to(&self, stream: &mut W) -> io::Result<()> {
        match stream.write_all(self.to_string().as_bytes()) {
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(feature = "json")]
impl FromFieldValue for serde_json::Value {
    fn from_field_value(value: Vec<u8>) -> FieldValue<Self> {
        return Ok(serde_json::from_slice(&value)?);
    }
}

/// Renders a value into the bytes sent to the server.
///
/// Panics if the value's `write_to` reports an error: writes into a `Vec`
/// themselves cannot fail, so an error can only come from a broken
/// [`ToFieldValue`] implementation.
pub(crate) fn render<V: ToFieldValue<Vec<u8>>>(value: &V) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.get_length());
    value
        .write_to(&mut buf)
        .expect("ToFieldValue reported an error writing to a Vec");
    buf
}
