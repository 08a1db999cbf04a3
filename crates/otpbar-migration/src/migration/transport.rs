//! Extracts the binary payload from an `otpauth-migration://offline?data=…` URL.

use base64::Engine;

use crate::migration::types::*;

pub const MIGRATION_SCHEME: &str = "otpauth-migration";
pub const MIGRATION_HOST: &str = "offline";

/// Validate the URL and return the base64-decoded `data` parameter.
pub fn extract_payload(input: &str) -> MigrationResult<Vec<u8>> {
    let url = url::Url::parse(input.trim()).map_err(|e| {
        MigrationError::new(MigrationErrorKind::InvalidScheme, "Not a migration URL")
            .with_detail(e.to_string())
    })?;

    if url.scheme() != MIGRATION_SCHEME
        || url.host_str() != Some(MIGRATION_HOST)
        || !matches!(url.path(), "" | "/")
    {
        return Err(MigrationError::new(
            MigrationErrorKind::InvalidScheme,
            format!(
                "Expected '{}://{}', got '{}://{}{}'",
                MIGRATION_SCHEME,
                MIGRATION_HOST,
                url.scheme(),
                url.host_str().unwrap_or(""),
                url.path()
            ),
        ));
    }

    // Query decoding turns '+' into ' '; base64 never contains spaces.
    let data = url
        .query_pairs()
        .find(|(key, _)| key == "data")
        .map(|(_, value)| value.replace(' ', "+"))
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            MigrationError::new(
                MigrationErrorKind::MissingPayload,
                "No 'data' parameter in migration URL",
            )
        })?;

    base64_decode(&data)
}

fn base64_decode(data: &str) -> MigrationResult<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
    // Try standard, then URL-safe; report the standard alphabet's error
    STANDARD
        .decode(data)
        .or_else(|err| {
            STANDARD_NO_PAD
                .decode(data)
                .or_else(|_| URL_SAFE.decode(data))
                .or_else(|_| URL_SAFE_NO_PAD.decode(data))
                .map_err(|_| err)
        })
        .map_err(|e| {
            MigrationError::new(MigrationErrorKind::InvalidEncoding, "Invalid base64 payload")
                .with_detail(e.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_other_schemes() {
        for input in [
            "https://example.com",
            "otpauth://totp/Example:alice?secret=JBSWY3DP",
            "otpauth-migration://online?data=AAAA",
            "otpauth-migration://offline/extra?data=AAAA",
            "not a url",
        ] {
            let err = extract_payload(input).unwrap_err();
            assert_eq!(err.kind, MigrationErrorKind::InvalidScheme, "{}", input);
        }
    }

    #[test]
    fn missing_data_param() {
        for input in [
            "otpauth-migration://offline",
            "otpauth-migration://offline?foo=bar",
            "otpauth-migration://offline?data=",
        ] {
            let err = extract_payload(input).unwrap_err();
            assert_eq!(err.kind, MigrationErrorKind::MissingPayload, "{}", input);
        }
    }

    #[test]
    fn decodes_percent_encoded_base64() {
        // "CgH/" -> [0x0A, 0x01, 0xFF]
        let bytes = extract_payload("otpauth-migration://offline?data=CgH%2F").unwrap();
        assert_eq!(bytes, vec![0x0A, 0x01, 0xFF]);
    }

    #[test]
    fn unescaped_plus_survives() {
        // "+/8=" -> [0xFB, 0xFF]
        let bytes = extract_payload("otpauth-migration://offline?data=+/8=").unwrap();
        assert_eq!(bytes, vec![0xFB, 0xFF]);
    }

    #[test]
    fn accepts_url_safe_alphabet() {
        let bytes = extract_payload("otpauth-migration://offline?data=-_8").unwrap();
        assert_eq!(bytes, vec![0xFB, 0xFF]);
    }

    #[test]
    fn accepts_standard_alphabet_without_padding() {
        let bytes = extract_payload("otpauth-migration://offline?data=%2B%2F8").unwrap();
        assert_eq!(bytes, vec![0xFB, 0xFF]);
    }

    #[test]
    fn malformed_base64_reports_standard_error() {
        let err = extract_payload("otpauth-migration://offline?data=%21%21%21").unwrap_err();
        let expected = base64::engine::general_purpose::STANDARD
            .decode("!!!")
            .unwrap_err()
            .to_string();
        assert_eq!(err.detail.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn malformed_base64() {
        let err = extract_payload("otpauth-migration://offline?data=%21%21%21").unwrap_err();
        assert_eq!(err.kind, MigrationErrorKind::InvalidEncoding);
    }

    #[test]
    fn trailing_slash_and_whitespace_accepted() {
        let bytes = extract_payload("  otpauth-migration://offline/?data=CgA%3D\n").unwrap();
        assert_eq!(bytes, vec![0x0A, 0x00]);
    }
}
