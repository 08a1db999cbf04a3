//! Migration payload decoding: sub-modules and entry points.

pub mod types;
pub mod base32;
pub mod transport;
pub mod export;
mod cursor;
mod wire;
mod mapper;

pub use types::*;
pub use export::{encode_payload, to_migration_url};

/// Decode a migration URL with default options.
pub fn decode_migration_url(input: &str) -> MigrationResult<MigrationPayload> {
    decode_migration_url_with(input, &DecodeOptions::default())
}

/// Decode a migration URL, e.g. the text of a scanned QR code.
pub fn decode_migration_url_with(
    input: &str,
    options: &DecodeOptions,
) -> MigrationResult<MigrationPayload> {
    let bytes = transport::extract_payload(input)?;
    let payload = decode_payload_bytes(&bytes, options)?;
    log::debug!(
        "Decoded migration payload: {} account(s), batch {:?}/{:?}",
        payload.accounts.len(),
        payload.batch_index,
        payload.batch_size
    );
    Ok(payload)
}

/// Decode an already base64-decoded payload buffer.
pub fn decode_payload_bytes(
    bytes: &[u8],
    options: &DecodeOptions,
) -> MigrationResult<MigrationPayload> {
    mapper::map_payload(bytes, options)
}
