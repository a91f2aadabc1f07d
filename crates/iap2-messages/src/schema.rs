//! Wire format and generic parameter walking for Control Session Messages.
//!
//! A CSM is `start(2) | length(2) | msg_id(2) | parameters...`, where each
//! parameter is `param_len(2, includes its own 4-byte header) | param_id(2)
//! | payload`. Decoding a message means walking this parameter list once
//! into a flat [`Param`] list, then letting the concrete message type (in
//! `catalogue/`) pull the fields it cares about out by id — unknown or
//! duplicate parameters are simply left unconsumed, matching how an
//! accessory is expected to tolerate messages from newer peers.
//!
//! There is deliberately no runtime reflection here: each message type
//! lists its own `(param_id, field name, type, cardinality)` table as plain
//! Rust code and walks it by hand. A `FieldSpec` table exists for
//! documentation and the message registry, not for driving decode through a
//! generic interpreter.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{CsmError, Result};

/// Fixed CSM start marker.
pub const CSM_START: u16 = 0x4040;

/// Size of the fixed message header: `start | length | msg_id`.
pub const MESSAGE_HEADER_SIZE: usize = 6;

/// Size of a parameter header: `param_len | param_id`.
pub const PARAM_HEADER_SIZE: usize = 4;

/// Scalar and structural types a CSM parameter payload can hold.
///
/// Carried only for documentation and the message registry — decode logic
/// in `catalogue/` reads bytes directly rather than dispatching on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer, big-endian.
    I16,
    /// Unsigned 16-bit integer, big-endian.
    U16,
    /// Signed 32-bit integer, big-endian.
    I32,
    /// Unsigned 32-bit integer, big-endian.
    U32,
    /// Signed 64-bit integer, big-endian.
    I64,
    /// Unsigned 64-bit integer, big-endian.
    U64,
    /// A single byte, 0 or 1.
    Bool,
    /// A single byte with a closed set of meanings.
    EnumU8,
    /// UTF-8 text terminated by a single `NUL` byte.
    String,
    /// Opaque bytes with no further structure.
    Bytes,
    /// Zero-length payload whose mere presence is the value (a flag).
    Marker,
    /// A nested parameter list, itself walked with this same format.
    Group,
}

/// How many times a parameter may legally appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one; decode fails if it is missing.
    Required,
    /// Zero or one.
    Optional,
    /// Zero or more, in wire order.
    List,
}

/// One entry in a message's parameter table. Used by the registry to
/// describe known messages; decode/encode logic in `catalogue/` does not
/// consult this directly.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Wire parameter id.
    pub param_id: u16,
    /// Rust field name.
    pub field_name: &'static str,
    /// Declared wire type.
    pub field_type: FieldType,
    /// How many times it may appear.
    pub cardinality: Cardinality,
}

/// A single decoded parameter: its id and raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Wire parameter id.
    pub id: u16,
    /// Raw payload bytes (the group/scalar contents, header stripped).
    pub payload: Bytes,
}

/// Parses the fixed 6-byte CSM header, returning `(msg_id, body)` where
/// `body` is the parameter-list bytes (`length` worth, header excluded).
///
/// # Errors
///
/// [`CsmError::MessageTooShort`] if fewer than 6 bytes are given,
/// [`CsmError::InvalidStart`] if the start marker isn't `0x4040`, and
/// [`CsmError::MessageTruncated`] if `length` claims more than is present.
pub fn decode_header(bytes: &[u8]) -> Result<(u16, &[u8])> {
    if bytes.len() < MESSAGE_HEADER_SIZE {
        return Err(CsmError::MessageTooShort { expected: MESSAGE_HEADER_SIZE, actual: bytes.len() });
    }
    let start = u16::from_be_bytes([bytes[0], bytes[1]]);
    if start != CSM_START {
        return Err(CsmError::InvalidStart(start));
    }
    let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    let msg_id = u16::from_be_bytes([bytes[4], bytes[5]]);
    if bytes.len() < length {
        return Err(CsmError::MessageTruncated { expected: length, actual: bytes.len() });
    }
    Ok((msg_id, &bytes[MESSAGE_HEADER_SIZE..length]))
}

/// Walks a parameter-list body into a flat, order-preserving [`Param`] list.
///
/// # Errors
///
/// [`CsmError::ParameterHeaderTooShort`] if a parameter's `param_len` is
/// smaller than the 4-byte parameter header, and
/// [`CsmError::ParameterTruncated`] if it claims more bytes than remain.
pub fn decode_params(mut body: &[u8]) -> Result<Vec<Param>> {
    let mut params = Vec::new();
    while !body.is_empty() {
        if body.len() < PARAM_HEADER_SIZE {
            return Err(CsmError::ParameterTruncated { param_id: 0, expected: PARAM_HEADER_SIZE, actual: body.len() });
        }
        let param_len = u16::from_be_bytes([body[0], body[1]]) as usize;
        let param_id = u16::from_be_bytes([body[2], body[3]]);
        if param_len < PARAM_HEADER_SIZE {
            return Err(CsmError::ParameterHeaderTooShort(param_id));
        }
        if body.len() < param_len {
            return Err(CsmError::ParameterTruncated { param_id, expected: param_len, actual: body.len() });
        }
        let payload = Bytes::copy_from_slice(&body[PARAM_HEADER_SIZE..param_len]);
        params.push(Param { id: param_id, payload });
        body = &body[param_len..];
    }
    Ok(params)
}

/// Encodes a flat parameter list to its wire form, with no outer message
/// header — the representation a nested group parameter's payload takes.
#[must_use]
pub fn encode_params(params: &[Param]) -> Bytes {
    let body_len: usize = params.iter().map(|p| PARAM_HEADER_SIZE + p.payload.len()).sum();
    let mut out = BytesMut::with_capacity(body_len);
    for param in params {
        out.put_u16((PARAM_HEADER_SIZE + param.payload.len()) as u16);
        out.put_u16(param.id);
        out.extend_from_slice(&param.payload);
    }
    out.freeze()
}

/// Encodes a full message from its id and already-built parameter list.
#[must_use]
pub fn encode_message(msg_id: u16, params: &[Param]) -> Bytes {
    let body = encode_params(params);
    let total_len = MESSAGE_HEADER_SIZE + body.len();
    let mut out = BytesMut::with_capacity(total_len);
    out.put_u16(CSM_START);
    out.put_u16(total_len as u16);
    out.put_u16(msg_id);
    out.extend_from_slice(&body);
    out.freeze()
}

/// Finds the first parameter with `id`, for required/optional fields.
#[must_use]
pub fn find_one(params: &[Param], id: u16) -> Option<&Param> {
    params.iter().find(|p| p.id == id)
}

/// Finds every parameter with `id`, in wire order, for list fields.
pub fn find_all(params: &[Param], id: u16) -> impl Iterator<Item = &Param> {
    params.iter().filter(move |p| p.id == id)
}

/// Builds a scalar parameter from raw bytes.
#[must_use]
pub fn param(id: u16, payload: impl Into<Bytes>) -> Param {
    Param { id, payload: payload.into() }
}

/// Builds a zero-length marker parameter.
#[must_use]
pub fn marker(id: u16) -> Param {
    Param { id, payload: Bytes::new() }
}

/// Builds a `NUL`-terminated UTF-8 string parameter.
#[must_use]
pub fn string_param(id: u16, value: &str) -> Param {
    let mut bytes = BytesMut::with_capacity(value.len() + 1);
    bytes.extend_from_slice(value.as_bytes());
    bytes.put_u8(0);
    Param { id, payload: bytes.freeze() }
}

/// Reads a `NUL`-terminated UTF-8 string parameter's payload.
///
/// # Errors
///
/// [`CsmError::InvalidString`] if the payload has no trailing `NUL` or is
/// not valid UTF-8 once it is stripped.
pub fn read_string(p: &Param, field: &'static str) -> Result<String> {
    let bytes = p.payload.as_ref();
    let Some((&0, rest)) = bytes.split_last() else {
        return Err(CsmError::InvalidString { param_id: p.id, field });
    };
    std::str::from_utf8(rest).map(str::to_owned).map_err(|_| CsmError::InvalidString { param_id: p.id, field })
}

/// Reads a fixed-length scalar payload, or errors with the field name for
/// diagnostics.
///
/// # Errors
///
/// [`CsmError::InvalidParameterLength`] if `p.payload.len() != N`.
pub fn read_scalar<const N: usize>(p: &Param, field: &'static str) -> Result<[u8; N]> {
    p.payload
        .as_ref()
        .try_into()
        .map_err(|_| CsmError::InvalidParameterLength { param_id: p.id, field, expected: N, actual: p.payload.len() })
}

/// Reads a single-byte unsigned integer parameter.
pub fn read_u8(p: &Param, field: &'static str) -> Result<u8> {
    Ok(read_scalar::<1>(p, field)?[0])
}

/// Reads a single-byte signed integer parameter.
pub fn read_i8(p: &Param, field: &'static str) -> Result<i8> {
    Ok(read_scalar::<1>(p, field)?[0] as i8)
}

/// Reads a big-endian 16-bit unsigned integer parameter.
pub fn read_u16(p: &Param, field: &'static str) -> Result<u16> {
    Ok(u16::from_be_bytes(read_scalar::<2>(p, field)?))
}

/// Reads a big-endian 16-bit signed integer parameter.
pub fn read_i16(p: &Param, field: &'static str) -> Result<i16> {
    Ok(i16::from_be_bytes(read_scalar::<2>(p, field)?))
}

/// Reads a single-byte boolean parameter (`0` or `1`).
pub fn read_bool(p: &Param, field: &'static str) -> Result<bool> {
    Ok(read_u8(p, field)? != 0)
}

/// Builds a single-byte unsigned integer parameter.
#[must_use]
pub fn u8_param(id: u16, value: u8) -> Param {
    Param { id, payload: Bytes::copy_from_slice(&[value]) }
}

/// Builds a single-byte signed integer parameter.
#[must_use]
pub fn i8_param(id: u16, value: i8) -> Param {
    Param { id, payload: Bytes::copy_from_slice(&[value as u8]) }
}

/// Builds a big-endian 16-bit unsigned integer parameter.
#[must_use]
pub fn u16_param(id: u16, value: u16) -> Param {
    Param { id, payload: Bytes::copy_from_slice(&value.to_be_bytes()) }
}

/// Builds a big-endian 16-bit signed integer parameter.
#[must_use]
pub fn i16_param(id: u16, value: i16) -> Param {
    Param { id, payload: Bytes::copy_from_slice(&value.to_be_bytes()) }
}

/// Builds a single-byte boolean parameter.
#[must_use]
pub fn bool_param(id: u16, value: bool) -> Param {
    Param { id, payload: Bytes::copy_from_slice(&[u8::from(value)]) }
}

/// Builds a nested-group parameter from an already-encoded field list.
#[must_use]
pub fn group_param(id: u16, fields: &[Param]) -> Param {
    Param { id, payload: encode_params(fields) }
}
