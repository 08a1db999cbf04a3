//! Turns a scanned migration QR code into named token entries.
//!
//! This is the step between QR decoding and the token store: it decides
//! which accounts become entries and what they are called. Persisting the
//! entries is left to the caller.

use otpbar_migration::migration::{self, DecodeOptions, MigrationPayload, MigrationResult};
use serde::{Deserialize, Serialize};

/// A named secret ready to be written to the token store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToken {
    pub name: String,
    /// Base-32 encoded secret key.
    pub secret: String,
}

/// Options for [`generate_configuration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub decode: DecodeOptions,
    /// Prefix for accounts exported without a name; the 1-based account
    /// position is appended.
    pub fallback_name_prefix: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            decode: DecodeOptions::default(),
            fallback_name_prefix: "account_".into(),
        }
    }
}

/// Decode the text of a migration QR code into token entries.
pub fn generate_configuration(
    qr_text: &str,
    options: &ImportOptions,
) -> MigrationResult<Vec<UserToken>> {
    let payload = migration::decode_migration_url_with(qr_text, &options.decode)?;
    let tokens = tokens_from_payload(&payload, options);
    log::info!(
        "Imported {} of {} account(s) from migration QR code",
        tokens.len(),
        payload.accounts.len()
    );
    Ok(tokens)
}

/// Token entries for every account that carries a secret, in payload order.
pub fn tokens_from_payload(payload: &MigrationPayload, options: &ImportOptions) -> Vec<UserToken> {
    payload
        .accounts
        .iter()
        .enumerate()
        .filter_map(|(index, account)| {
            let Some(secret) = &account.secret else {
                log::warn!("Account {} has no secret, skipping", index + 1);
                return None;
            };
            let name = match account.name.as_deref() {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => format!("{}{}", options.fallback_name_prefix, index + 1),
            };
            Some(UserToken {
                name,
                secret: secret.base32().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use otpbar_migration::migration::{AccountRecord, Base32Style, Secret};

    fn account(name: Option<&str>, secret: Option<&[u8]>) -> AccountRecord {
        AccountRecord {
            name: name.map(str::to_string),
            secret: secret.map(|s| Secret::from_raw(s.to_vec(), Base32Style::default())),
            ..Default::default()
        }
    }

    #[test]
    fn names_and_secrets() {
        let payload = MigrationPayload {
            accounts: vec![account(Some("alice"), Some(b"Hello"))],
            ..Default::default()
        };
        let tokens = tokens_from_payload(&payload, &ImportOptions::default());
        assert_eq!(
            tokens,
            vec![UserToken {
                name: "alice".into(),
                secret: "JBSWY3DP".into()
            }]
        );
    }

    #[test]
    fn unnamed_accounts_get_positional_names() {
        let payload = MigrationPayload {
            accounts: vec![
                account(Some("alice"), Some(b"a")),
                account(None, Some(b"b")),
                account(Some(""), Some(b"c")),
            ],
            ..Default::default()
        };
        let names: Vec<_> = tokens_from_payload(&payload, &ImportOptions::default())
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["alice", "account_2", "account_3"]);
    }

    #[test]
    fn accounts_without_secret_are_skipped() {
        let payload = MigrationPayload {
            accounts: vec![account(Some("nosecret"), None), account(None, Some(b"x"))],
            ..Default::default()
        };
        let tokens = tokens_from_payload(&payload, &ImportOptions::default());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "account_2");
    }

    #[test]
    fn custom_prefix() {
        let payload = MigrationPayload {
            accounts: vec![account(None, Some(b"x"))],
            ..Default::default()
        };
        let options = ImportOptions {
            fallback_name_prefix: "token-".into(),
            ..Default::default()
        };
        assert_eq!(tokens_from_payload(&payload, &options)[0].name, "token-1");
    }

    #[test]
    fn options_from_json() {
        let options: ImportOptions =
            serde_json::from_str(r#"{"decode":{"base32":{"case":"lower","padding":false}}}"#)
                .unwrap();
        assert_eq!(options.fallback_name_prefix, "account_");
        assert!(!options.decode.base32.padding);
    }
}
