//! Base32 rendering of raw secrets (RFC 4648 alphabet).

use crate::migration::types::{Base32Case, Base32Style};

/// Encode raw bytes as base32 text in the requested style.
///
/// Empty input yields an empty string, with or without padding.
pub fn encode(bytes: &[u8], style: Base32Style) -> String {
    let text = ::base32::encode(
        ::base32::Alphabet::Rfc4648 {
            padding: style.padding,
        },
        bytes,
    );
    match style.case {
        Base32Case::Upper => text,
        Base32Case::Lower => text.to_ascii_lowercase(),
    }
}
