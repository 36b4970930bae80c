//! Typed blob decoding (`json` and `msgpack`)
//!
//! The saver stores every blob next to a type tag. Both supported encodings
//! are decoded into a `serde_json::Value` tree so the rest of the crate only
//! deals with one shape. Serialized objects end up in constructor form:
//! `{"lc": 2, "type": "constructor", "id": [module..., Class], "kwargs": {...}}`.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{json, Map, Number, Value};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Extension codes used by the saver's MessagePack encoder
const EXT_CONSTRUCTOR_SINGLE_ARG: i8 = 0;
const EXT_CONSTRUCTOR_POS_ARGS: i8 = 1;
const EXT_CONSTRUCTOR_KW_ARGS: i8 = 2;
const EXT_METHOD_SINGLE_ARG: i8 = 3;
const EXT_PYDANTIC_V1: i8 = 4;
const EXT_PYDANTIC_V2: i8 = 5;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported serialization type: {0}")]
    UnsupportedType(String),

    #[error("invalid JSON blob: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid msgpack blob: {0}")]
    Msgpack(#[from] rmp_serde::decode::Error),

    #[error("unexpected shape: {0}")]
    Shape(String),
}

/// Decode a `(type, blob)` pair as stored in the checkpoint tables
pub fn loads_typed(type_tag: Option<&str>, blob: &[u8]) -> Result<Value, DecodeError> {
    match type_tag {
        Some("json") => Ok(serde_json::from_slice(blob)?),
        Some("msgpack") => loads_msgpack(blob),
        Some("null") | None if blob.is_empty() => Ok(Value::Null),
        Some(other) => Err(DecodeError::UnsupportedType(other.to_string())),
        None => Err(DecodeError::UnsupportedType("<none>".to_string())),
    }
}

/// Metadata blobs are JSON text; older savers wrote them as msgpack
pub fn loads_metadata(blob: &[u8]) -> Result<Value, DecodeError> {
    if blob.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    match serde_json::from_slice(blob) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!(error = %err, "metadata is not JSON, trying msgpack");
            loads_msgpack(blob)
        }
    }
}

pub fn loads_msgpack(blob: &[u8]) -> Result<Value, DecodeError> {
    let packed: Packed = rmp_serde::from_slice(blob)?;
    packed.into_json()
}

/// A MessagePack value, keeping extension types that JSON cannot express
#[derive(Debug, Clone, PartialEq)]
enum Packed {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Packed>),
    Map(Vec<(Packed, Packed)>),
    Ext(i8, Vec<u8>),
}

impl Packed {
    fn into_json(self) -> Result<Value, DecodeError> {
        Ok(match self {
            Packed::Nil => Value::Null,
            Packed::Bool(b) => Value::Bool(b),
            Packed::Int(i) => Value::from(i),
            Packed::UInt(u) => Value::from(u),
            Packed::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            Packed::Str(s) => Value::String(s),
            Packed::Bin(bytes) => Value::Array(bytes.into_iter().map(Value::from).collect()),
            Packed::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(Packed::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            Packed::Map(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.into_key(), value.into_json()?);
                }
                Value::Object(map)
            }
            Packed::Ext(code, data) => decode_ext(code, &data)?,
        })
    }

    fn into_key(self) -> String {
        match self {
            Packed::Str(s) => s,
            Packed::Int(i) => i.to_string(),
            Packed::UInt(u) => u.to_string(),
            Packed::Bool(b) => b.to_string(),
            Packed::Nil => "null".to_string(),
            other => match other.into_json() {
                Ok(value) => value.to_string(),
                Err(_) => "<key>".to_string(),
            },
        }
    }
}

/// Extension payloads are themselves msgpack: `(module, name, arg[, method])`
fn decode_ext(code: i8, data: &[u8]) -> Result<Value, DecodeError> {
    let known = matches!(
        code,
        EXT_CONSTRUCTOR_SINGLE_ARG
            | EXT_CONSTRUCTOR_POS_ARGS
            | EXT_CONSTRUCTOR_KW_ARGS
            | EXT_METHOD_SINGLE_ARG
            | EXT_PYDANTIC_V1
            | EXT_PYDANTIC_V2
    );
    if !known {
        debug!(code, len = data.len(), "skipping unknown msgpack extension");
        return Ok(json!({ "ext": code, "len": data.len() }));
    }

    let payload: Packed = rmp_serde::from_slice(data)?;
    let mut parts = match payload {
        Packed::Array(parts) if parts.len() >= 3 => parts.into_iter(),
        other => {
            return Err(DecodeError::Shape(format!(
                "extension {} payload is not a constructor tuple: {:?}",
                code, other
            )))
        }
    };

    let module = ext_str(parts.next())?;
    let name = ext_str(parts.next())?;
    let arg = parts.next().unwrap_or(Packed::Nil).into_json()?;

    match code {
        EXT_CONSTRUCTOR_SINGLE_ARG | EXT_CONSTRUCTOR_POS_ARGS | EXT_METHOD_SINGLE_ARG => Ok(arg),
        _ => {
            let mut id: Vec<Value> = module
                .split('.')
                .map(|part| Value::String(part.to_string()))
                .collect();
            id.push(Value::String(name));
            Ok(json!({
                "lc": 2,
                "type": "constructor",
                "id": id,
                "kwargs": arg,
            }))
        }
    }
}

fn ext_str(part: Option<Packed>) -> Result<String, DecodeError> {
    match part {
        Some(Packed::Str(s)) => Ok(s),
        other => Err(DecodeError::Shape(format!(
            "expected a string in extension payload, got {:?}",
            other
        ))),
    }
}

impl<'de> Deserialize<'de> for Packed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PackedVisitor)
    }
}

struct PackedVisitor;

impl<'de> Visitor<'de> for PackedVisitor {
    type Value = Packed;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a msgpack value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Packed, E> {
        Ok(Packed::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Packed, E> {
        Ok(Packed::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Packed, E> {
        Ok(Packed::UInt(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Packed, E> {
        Ok(Packed::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Packed, E> {
        Ok(Packed::Str(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Packed, E> {
        Ok(Packed::Str(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Packed, E> {
        Ok(Packed::Bin(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Packed, E> {
        Ok(Packed::Bin(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Packed, E> {
        Ok(Packed::Nil)
    }

    fn visit_none<E: de::Error>(self) -> Result<Packed, E> {
        Ok(Packed::Nil)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Packed, D::Error> {
        Packed::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Packed, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Packed::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Packed, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry()? {
            entries.push(entry);
        }
        Ok(Packed::Map(entries))
    }

    // rmp-serde hands extension values over as a newtype wrapping (tag, bytes)
    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Packed, D::Error> {
        let ExtPayload(code, data) = ExtPayload::deserialize(deserializer)?;
        Ok(Packed::Ext(code, data))
    }
}

struct ExtPayload(i8, Vec<u8>);

impl<'de> Deserialize<'de> for ExtPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(2, ExtPayloadVisitor)
    }
}

struct ExtPayloadVisitor;

impl<'de> Visitor<'de> for ExtPayloadVisitor {
    type Value = ExtPayload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a msgpack extension (tag, data)")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ExtPayload, A::Error> {
        let code: i8 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let RawBytes(data) = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        Ok(ExtPayload(code, data))
    }
}

struct RawBytes(Vec<u8>);

impl<'de> Deserialize<'de> for RawBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(RawBytesVisitor)
    }
}

struct RawBytesVisitor;

impl<'de> Visitor<'de> for RawBytesVisitor {
    type Value = RawBytes;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("extension data bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<RawBytes, E> {
        Ok(RawBytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<RawBytes, E> {
        Ok(RawBytes(v))
    }
}
