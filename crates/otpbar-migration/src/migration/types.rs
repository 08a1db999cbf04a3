//! Core types for migration payload decoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm recorded for an exported account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
    Md5,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha512 => write!(f, "SHA512"),
            Self::Md5 => write!(f, "MD5"),
        }
    }
}

impl Algorithm {
    /// Map the numeric value used on the wire.
    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Sha1),
            2 => Some(Self::Sha256),
            3 => Some(Self::Sha512),
            4 => Some(Self::Md5),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u64 {
        match self {
            Self::Sha1 => 1,
            Self::Sha256 => 2,
            Self::Sha512 => 3,
            Self::Md5 => 4,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Digits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Length of the generated code. Serializes as the plain digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "u8")]
pub enum Digits {
    #[default]
    Six,
    Eight,
}

impl Digits {
    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Six),
            2 => Some(Self::Eight),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u64 {
        match self {
            Self::Six => 1,
            Self::Eight => 2,
        }
    }

    /// Number of digits in a generated code.
    pub fn count(self) -> u8 {
        match self {
            Self::Six => 6,
            Self::Eight => 8,
        }
    }
}

impl From<Digits> for u8 {
    fn from(d: Digits) -> u8 {
        d.count()
    }
}

impl fmt::Display for Digits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whether the account uses counter-based or time-based codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Hotp,
    #[default]
    Totp,
}

impl OtpType {
    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Hotp),
            2 => Some(Self::Totp),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u64 {
        match self {
            Self::Hotp => 1,
            Self::Totp => 2,
        }
    }
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hotp => write!(f, "hotp"),
            Self::Totp => write!(f, "totp"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw values
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Value of a field that is not in the field tables, kept as it appeared
/// on the wire so it can be written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawValue {
    Varint(u64),
    Fixed64([u8; 8]),
    Bytes(Vec<u8>),
    Fixed32([u8; 4]),
}

/// Unrecognized fields keyed by field number.
pub type ExtraFields = BTreeMap<u64, RawValue>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Decoded records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared secret of an account, in raw and base32 form.
///
/// Only constructed through [`Secret::from_raw`], so the base32 text is
/// always the rendering of the raw bytes.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Secret {
    raw: Vec<u8>,
    base32: String,
}

impl Secret {
    pub fn from_raw(raw: Vec<u8>, style: Base32Style) -> Self {
        let base32 = crate::migration::base32::encode(&raw, style);
        Self { raw, base32 }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn base32(&self) -> &str {
        &self.base32
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.raw.len())
            .finish_non_exhaustive()
    }
}

/// One account from a migration payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    pub secret: Option<Secret>,
    /// Account label, e.g. "alice@example.com" or "Example:alice".
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub algorithm: Algorithm,
    pub digits: Digits,
    pub otp_type: OtpType,
    /// HOTP counter, when exported.
    pub counter: Option<u64>,
    pub extra: ExtraFields,
}

impl AccountRecord {
    /// Issuer and label to display.
    ///
    /// Exporters that leave the issuer empty often fold it into the name as
    /// `"Issuer:label"`; that form is split here.
    pub fn issuer_and_label(&self) -> (Option<&str>, Option<&str>) {
        let name = self.name.as_deref();
        match (self.issuer.as_deref(), name) {
            (Some(issuer), _) if !issuer.is_empty() => (Some(issuer), name),
            (_, Some(n)) => match n.split_once(':') {
                Some((issuer, label)) => (Some(issuer.trim()), Some(label.trim())),
                None => (None, Some(n)),
            },
            (_, None) => (None, None),
        }
    }
}

/// Top-level result of decoding one migration QR code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationPayload {
    /// Accounts in the order they appear in the payload.
    pub accounts: Vec<AccountRecord>,
    pub version: Option<u64>,
    /// Number of QR codes in the export batch.
    pub batch_size: Option<u64>,
    /// Position of this QR code within the batch (0-based).
    pub batch_index: Option<u64>,
    /// Identifier shared by all QR codes of one batch.
    pub batch_id: Option<u64>,
    pub extra: ExtraFields,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Letter case of rendered base32 secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Base32Case {
    #[default]
    Upper,
    Lower,
}

/// How decoded secrets are rendered as base32 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Base32Style {
    pub case: Base32Case,
    /// Pad the output with `=` to a multiple of 8 characters.
    pub padding: bool,
}

impl Default for Base32Style {
    fn default() -> Self {
        Self {
            case: Base32Case::Upper,
            padding: true,
        }
    }
}

/// Options for a decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub base32: Base32Style,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationErrorKind {
    InvalidScheme,
    MissingPayload,
    InvalidEncoding,
    TruncatedInput,
    VarintOverflow,
    UnsupportedWireType,
    UnexpectedWireType,
    UnknownEnumValue,
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationError {
    pub kind: MigrationErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for MigrationError {}

impl MigrationError {
    pub fn new(kind: MigrationErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<MigrationError> for String {
    fn from(e: MigrationError) -> String {
        e.to_string()
    }
}

pub type MigrationResult<T> = Result<T, MigrationError>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
