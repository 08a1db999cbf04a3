//! Encode payloads back into the migration wire format.
//!
//! The inverse of the decoder: only fields that are set are written, and
//! `extra` values are written after the known fields in ascending key order.

use base64::Engine;

use crate::migration::transport::{MIGRATION_HOST, MIGRATION_SCHEME};
use crate::migration::types::*;
use crate::migration::wire::WireType;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Public API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Serialize a payload to protobuf bytes.
pub fn encode_payload(payload: &MigrationPayload) -> Vec<u8> {
    let mut out = Vec::new();
    for account in &payload.accounts {
        write_bytes(&mut out, 1, &encode_account(account));
    }
    write_opt_varint(&mut out, 2, payload.version);
    write_opt_varint(&mut out, 3, payload.batch_size);
    write_opt_varint(&mut out, 4, payload.batch_index);
    write_opt_varint(&mut out, 5, payload.batch_id);
    write_extra(&mut out, &payload.extra);
    out
}

/// Build an `otpauth-migration://offline?data=…` URL for a payload.
pub fn to_migration_url(payload: &MigrationPayload) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(encode_payload(payload));
    let data: String = url::form_urlencoded::byte_serialize(b64.as_bytes()).collect();
    format!("{}://{}?data={}", MIGRATION_SCHEME, MIGRATION_HOST, data)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Account message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn encode_account(account: &AccountRecord) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(secret) = &account.secret {
        write_bytes(&mut out, 1, secret.raw());
    }
    if let Some(name) = &account.name {
        write_bytes(&mut out, 2, name.as_bytes());
    }
    if let Some(issuer) = &account.issuer {
        write_bytes(&mut out, 3, issuer.as_bytes());
    }
    write_varint_field(&mut out, 4, account.algorithm.to_wire());
    write_varint_field(&mut out, 5, account.digits.to_wire());
    write_varint_field(&mut out, 6, account.otp_type.to_wire());
    write_opt_varint(&mut out, 7, account.counter);
    write_extra(&mut out, &account.extra);
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Wire primitives
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn write_tag(buf: &mut Vec<u8>, number: u64, wire_type: WireType) {
    encode_varint((number << 3) | wire_type.code(), buf);
}

fn write_varint_field(buf: &mut Vec<u8>, number: u64, value: u64) {
    write_tag(buf, number, WireType::Varint);
    encode_varint(value, buf);
}

fn write_opt_varint(buf: &mut Vec<u8>, number: u64, value: Option<u64>) {
    if let Some(v) = value {
        write_varint_field(buf, number, v);
    }
}

fn write_bytes(buf: &mut Vec<u8>, number: u64, bytes: &[u8]) {
    write_tag(buf, number, WireType::LengthDelimited);
    encode_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

fn write_extra(buf: &mut Vec<u8>, extra: &ExtraFields) {
    for (&number, value) in extra {
        match value {
            RawValue::Varint(v) => write_varint_field(buf, number, *v),
            RawValue::Fixed64(b) => {
                write_tag(buf, number, WireType::Fixed64);
                buf.extend_from_slice(b);
            }
            RawValue::Bytes(b) => write_bytes(buf, number, b),
            RawValue::Fixed32(b) => {
                write_tag(buf, number, WireType::Fixed32);
                buf.extend_from_slice(b);
            }
        }
    }
}
