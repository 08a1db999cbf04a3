//! Generic protobuf wire-format reader.
//!
//! Turns a buffer into `(field number, wire type, value)` tuples without any
//! knowledge of what the field numbers mean. Nested messages come back as
//! length-delimited byte slices and are decoded by calling
//! [`decode_fields`] again on the slice.

use crate::migration::cursor::Cursor;
use crate::migration::types::*;

/// How a field's value is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_tag(tag: u64) -> Option<Self> {
        match tag & 0x7 {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    pub(crate) fn code(self) -> u64 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::Fixed32 => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawPayload<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
}

/// One decoded tag and its value, borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawField<'a> {
    pub number: u64,
    pub wire_type: WireType,
    pub payload: RawPayload<'a>,
}

impl<'a> RawField<'a> {
    /// Value of a varint field; `what` names the field in errors.
    pub(crate) fn expect_varint(&self, what: &str) -> MigrationResult<u64> {
        match self.payload {
            RawPayload::Varint(v) => Ok(v),
            RawPayload::Bytes(_) => Err(self.mismatch(what, WireType::Varint)),
        }
    }

    /// Contents of a length-delimited field.
    pub(crate) fn expect_bytes(&self, what: &str) -> MigrationResult<&'a [u8]> {
        match (self.wire_type, self.payload) {
            (WireType::LengthDelimited, RawPayload::Bytes(b)) => Ok(b),
            _ => Err(self.mismatch(what, WireType::LengthDelimited)),
        }
    }

    /// Length-delimited field read as UTF-8 text.
    pub(crate) fn expect_text(&self, what: &str) -> MigrationResult<String> {
        self.expect_bytes(what)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Owned copy of the value, for fields outside the field tables.
    pub(crate) fn to_raw_value(&self) -> RawValue {
        match (self.wire_type, self.payload) {
            (_, RawPayload::Varint(v)) => RawValue::Varint(v),
            (WireType::Fixed64, RawPayload::Bytes(b)) => match <[u8; 8]>::try_from(b) {
                Ok(arr) => RawValue::Fixed64(arr),
                Err(_) => RawValue::Bytes(b.to_vec()),
            },
            (WireType::Fixed32, RawPayload::Bytes(b)) => match <[u8; 4]>::try_from(b) {
                Ok(arr) => RawValue::Fixed32(arr),
                Err(_) => RawValue::Bytes(b.to_vec()),
            },
            (_, RawPayload::Bytes(b)) => RawValue::Bytes(b.to_vec()),
        }
    }

    fn mismatch(&self, what: &str, expected: WireType) -> MigrationError {
        MigrationError::new(
            MigrationErrorKind::UnexpectedWireType,
            format!("Field {} ({}) has an unexpected wire type", self.number, what),
        )
        .with_detail(format!(
            "expected {}, found {}",
            expected.code(),
            self.wire_type.code()
        ))
    }
}

/// Decode every field in `buf`, in order.
pub(crate) fn decode_fields(buf: &[u8]) -> MigrationResult<Vec<RawField<'_>>> {
    let mut cursor = Cursor::new(buf);
    let mut fields = Vec::new();

    while !cursor.is_empty() {
        let offset = cursor.position();
        let tag = cursor.read_varint()?;
        let number = tag >> 3;
        let wire_type = WireType::from_tag(tag).ok_or_else(|| {
            MigrationError::new(
                MigrationErrorKind::UnsupportedWireType,
                format!("Unsupported wire type {}", tag & 0x7),
            )
            .with_detail(format!("field {} at offset {}", number, offset))
        })?;

        let payload = match wire_type {
            WireType::Varint => RawPayload::Varint(cursor.read_varint()?),
            WireType::Fixed64 => RawPayload::Bytes(cursor.read_fixed(8)?),
            WireType::LengthDelimited => RawPayload::Bytes(cursor.read_length_delimited()?),
            WireType::Fixed32 => RawPayload::Bytes(cursor.read_fixed(4)?),
        };

        fields.push(RawField {
            number,
            wire_type,
            payload,
        });
    }

    Ok(fields)
}
