//! Protobuf codec for binary board-channel transport.
//!
//! Frames keep their payload as a JSON map; on the wire the map becomes a
//! `google.protobuf.Struct` so the envelope stays compact while payloads stay
//! schema-free. Ids travel as strings and are re-parsed on decode.

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;

use prost::Message;
use serde_json::Value;
use uuid::Uuid;

use crate::frame::{Data, Frame, Status};

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("invalid frame status: {0}")]
    InvalidStatus(i32),
    #[error("invalid {field} id: {value}")]
    InvalidId { field: &'static str, value: String },
}

/// Encode a frame into protobuf bytes.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let wire = WireFrame {
        id: frame.id.to_string(),
        parent_id: frame.parent_id.map(|id| id.to_string()),
        ts: frame.ts,
        board_id: frame.board_id.map(|id| id.to_string()),
        from: frame.from.clone(),
        syscall: frame.syscall.clone(),
        status: status_to_wire(frame.status) as i32,
        data: Some(data_to_struct(&frame.data)),
    };
    wire.encode_to_vec()
}

/// Decode protobuf bytes into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes, [`CodecError::InvalidStatus`]
/// for unknown status values, and [`CodecError::InvalidId`] for ids that are not UUIDs.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    Ok(Frame {
        id: parse_id("id", &wire.id)?,
        parent_id: wire.parent_id.as_deref().map(|v| parse_id("parent_id", v)).transpose()?,
        ts: wire.ts,
        board_id: wire.board_id.as_deref().map(|v| parse_id("board_id", v)).transpose()?,
        from: wire.from,
        syscall: wire.syscall,
        status: status_from_wire(wire.status)?,
        data: wire.data.map(struct_to_data).unwrap_or_default(),
    })
}

fn parse_id(field: &'static str, value: &str) -> Result<Uuid, CodecError> {
    Uuid::parse_str(value).map_err(|_| CodecError::InvalidId { field, value: value.to_owned() })
}

fn status_to_wire(status: Status) -> WireStatus {
    match status {
        Status::Request => WireStatus::Request,
        Status::Done => WireStatus::Done,
        Status::Error => WireStatus::Error,
    }
}

fn status_from_wire(value: i32) -> Result<Status, CodecError> {
    match WireStatus::try_from(value) {
        Ok(WireStatus::Request) => Ok(Status::Request),
        Ok(WireStatus::Done) => Ok(Status::Done),
        Ok(WireStatus::Error) => Ok(Status::Error),
        Err(_) => Err(CodecError::InvalidStatus(value)),
    }
}

fn data_to_struct(data: &Data) -> prost_types::Struct {
    prost_types::Struct { fields: data.iter().map(|(k, v)| (k.clone(), json_to_proto(v))).collect() }
}

fn struct_to_data(value: prost_types::Struct) -> Data {
    value.fields.iter().map(|(k, v)| (k.clone(), proto_to_json(v))).collect()
}

fn json_to_proto(value: &Value) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(v) => Kind::BoolValue(*v),
        Value::Number(v) => Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => Kind::StringValue(v.clone()),
        Value::Array(v) => Kind::ListValue(prost_types::ListValue { values: v.iter().map(json_to_proto).collect() }),
        Value::Object(v) => Kind::StructValue(prost_types::Struct {
            fields: v.iter().map(|(k, v)| (k.clone(), json_to_proto(v))).collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

/// Protobuf numbers are doubles; integral values come back as JSON integers
/// so ids like `z_index` keep deserializing into integer fields.
fn proto_to_json(value: &prost_types::Value) -> Value {
    use prost_types::value::Kind;

    let Some(kind) = &value.kind else {
        return Value::Null;
    };
    match kind {
        Kind::NullValue(_) => Value::Null,
        Kind::BoolValue(v) => Value::Bool(*v),
        Kind::NumberValue(v) => number_to_json(*v),
        Kind::StringValue(v) => Value::String(v.clone()),
        Kind::ListValue(v) => Value::Array(v.values.iter().map(proto_to_json).collect()),
        Kind::StructValue(v) => Value::Object(v.fields.iter().map(|(k, v)| (k.clone(), proto_to_json(v))).collect()),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_to_json(v: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if v.fract() == 0.0 && v.abs() < MAX_EXACT {
        return Value::from(v as i64);
    }
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(string, optional, tag = "2")]
    parent_id: Option<String>,
    #[prost(int64, tag = "3")]
    ts: i64,
    #[prost(string, optional, tag = "4")]
    board_id: Option<String>,
    #[prost(string, optional, tag = "5")]
    from: Option<String>,
    #[prost(string, tag = "6")]
    syscall: String,
    #[prost(enumeration = "WireStatus", tag = "7")]
    status: i32,
    #[prost(message, optional, tag = "8")]
    data: Option<prost_types::Struct>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireStatus {
    Request = 0,
    Done = 1,
    Error = 2,
}
