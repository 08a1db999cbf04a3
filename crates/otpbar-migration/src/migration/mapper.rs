//! Maps raw wire fields onto the migration payload and account records.
//!
//! Top-level message:
//!   1: account (repeated, nested message)
//!   2: version
//!   3: batch_size
//!   4: batch_index
//!   5: batch_id
//!
//! Account message:
//!   1: secret (bytes)
//!   2: name (string)
//!   3: issuer (string)
//!   4: algorithm (1=SHA1, 2=SHA256, 3=SHA512, 4=MD5)
//!   5: digits (1=six, 2=eight)
//!   6: type (1=HOTP, 2=TOTP)
//!   7: counter
//!
//! Each table row names the field, where it goes, and what kind of value it
//! carries. The kind decides both the accepted wire type and how the raw
//! value is interpreted. Any other field number lands in `extra`.

use crate::migration::types::*;
use crate::migration::wire::{decode_fields, RawField};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Field tables
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decoded value of a known enum field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumValue {
    Algorithm(Algorithm),
    Digits(Digits),
    OtpType(OtpType),
}

/// Maps a wire value to an enum member; `None` for values outside the table.
type EnumLookup = fn(u64) -> Option<EnumValue>;

/// What a known field carries.
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Message,
    Bytes,
    Text,
    Integer,
    Enum(EnumLookup),
}

/// A field after interpretation by its [`FieldKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue<'a> {
    Message(&'a [u8]),
    Bytes(&'a [u8]),
    Text(String),
    Integer(u64),
    Enum(EnumValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadSlot {
    Account,
    Version,
    BatchSize,
    BatchIndex,
    BatchId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccountSlot {
    Secret,
    Name,
    Issuer,
    Algorithm,
    Digits,
    Type,
    Counter,
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec<S> {
    number: u64,
    name: &'static str,
    slot: S,
    kind: FieldKind,
}

fn algorithm_value(v: u64) -> Option<EnumValue> {
    Algorithm::from_wire(v).map(EnumValue::Algorithm)
}

fn digits_value(v: u64) -> Option<EnumValue> {
    Digits::from_wire(v).map(EnumValue::Digits)
}

fn otp_type_value(v: u64) -> Option<EnumValue> {
    OtpType::from_wire(v).map(EnumValue::OtpType)
}

const fn spec<S>(number: u64, name: &'static str, slot: S, kind: FieldKind) -> FieldSpec<S> {
    FieldSpec {
        number,
        name,
        slot,
        kind,
    }
}

const PAYLOAD_FIELDS: &[FieldSpec<PayloadSlot>] = &[
    spec(1, "account", PayloadSlot::Account, FieldKind::Message),
    spec(2, "version", PayloadSlot::Version, FieldKind::Integer),
    spec(3, "batch_size", PayloadSlot::BatchSize, FieldKind::Integer),
    spec(4, "batch_index", PayloadSlot::BatchIndex, FieldKind::Integer),
    spec(5, "batch_id", PayloadSlot::BatchId, FieldKind::Integer),
];

const ACCOUNT_FIELDS: &[FieldSpec<AccountSlot>] = &[
    spec(1, "secret", AccountSlot::Secret, FieldKind::Bytes),
    spec(2, "name", AccountSlot::Name, FieldKind::Text),
    spec(3, "issuer", AccountSlot::Issuer, FieldKind::Text),
    spec(4, "algorithm", AccountSlot::Algorithm, FieldKind::Enum(algorithm_value)),
    spec(5, "digits", AccountSlot::Digits, FieldKind::Enum(digits_value)),
    spec(6, "type", AccountSlot::Type, FieldKind::Enum(otp_type_value)),
    spec(7, "counter", AccountSlot::Counter, FieldKind::Integer),
];

fn lookup<S>(table: &'static [FieldSpec<S>], number: u64) -> Option<&'static FieldSpec<S>> {
    table.iter().find(|spec| spec.number == number)
}

/// Interpret a raw field according to its table row.
fn interpret<'a, S>(field: &RawField<'a>, spec: &FieldSpec<S>) -> MigrationResult<FieldValue<'a>> {
    let value = match spec.kind {
        FieldKind::Message => FieldValue::Message(field.expect_bytes(spec.name)?),
        FieldKind::Bytes => FieldValue::Bytes(field.expect_bytes(spec.name)?),
        FieldKind::Text => FieldValue::Text(field.expect_text(spec.name)?),
        FieldKind::Integer => FieldValue::Integer(field.expect_varint(spec.name)?),
        FieldKind::Enum(to_enum) => {
            let v = field.expect_varint(spec.name)?;
            FieldValue::Enum(to_enum(v).ok_or_else(|| unknown_enum(spec.name, v))?)
        }
    };
    Ok(value)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Mapping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a top-level migration message.
pub(crate) fn map_payload(buf: &[u8], options: &DecodeOptions) -> MigrationResult<MigrationPayload> {
    let mut payload = MigrationPayload::default();

    for field in decode_fields(buf)? {
        match lookup(PAYLOAD_FIELDS, field.number) {
            Some(spec) => {
                let value = interpret(&field, spec)?;
                assign_payload(&mut payload, spec.slot, value, options)?;
            }
            None => {
                payload.extra.insert(field.number, field.to_raw_value());
            }
        }
    }

    Ok(payload)
}

/// Decode one nested account message.
pub(crate) fn map_account(buf: &[u8], options: &DecodeOptions) -> MigrationResult<AccountRecord> {
    let mut record = AccountRecord::default();

    for field in decode_fields(buf)? {
        match lookup(ACCOUNT_FIELDS, field.number) {
            Some(spec) => {
                let value = interpret(&field, spec)?;
                assign_account(&mut record, spec.slot, value, options)?;
            }
            None => {
                record.extra.insert(field.number, field.to_raw_value());
            }
        }
    }

    Ok(record)
}

fn assign_payload(
    payload: &mut MigrationPayload,
    slot: PayloadSlot,
    value: FieldValue<'_>,
    options: &DecodeOptions,
) -> MigrationResult<()> {
    match (slot, value) {
        (PayloadSlot::Account, FieldValue::Message(sub)) => {
            let index = payload.accounts.len();
            let account = map_account(sub, options).map_err(|e| {
                let detail = match e.detail {
                    Some(d) => format!("account {}: {}", index, d),
                    None => format!("account {}", index),
                };
                MigrationError { detail: Some(detail), ..e }
            })?;
            payload.accounts.push(account);
        }
        (PayloadSlot::Version, FieldValue::Integer(v)) => payload.version = Some(v),
        (PayloadSlot::BatchSize, FieldValue::Integer(v)) => payload.batch_size = Some(v),
        (PayloadSlot::BatchIndex, FieldValue::Integer(v)) => payload.batch_index = Some(v),
        (PayloadSlot::BatchId, FieldValue::Integer(v)) => payload.batch_id = Some(v),
        (slot, value) => return Err(slot_mismatch(slot, &value)),
    }
    Ok(())
}

fn assign_account(
    record: &mut AccountRecord,
    slot: AccountSlot,
    value: FieldValue<'_>,
    options: &DecodeOptions,
) -> MigrationResult<()> {
    match (slot, value) {
        (AccountSlot::Secret, FieldValue::Bytes(raw)) => {
            record.secret = Some(Secret::from_raw(raw.to_vec(), options.base32));
        }
        (AccountSlot::Name, FieldValue::Text(text)) => record.name = Some(text),
        (AccountSlot::Issuer, FieldValue::Text(text)) => record.issuer = Some(text),
        (AccountSlot::Algorithm, FieldValue::Enum(EnumValue::Algorithm(a))) => record.algorithm = a,
        (AccountSlot::Digits, FieldValue::Enum(EnumValue::Digits(d))) => record.digits = d,
        (AccountSlot::Type, FieldValue::Enum(EnumValue::OtpType(t))) => record.otp_type = t,
        (AccountSlot::Counter, FieldValue::Integer(v)) => record.counter = Some(v),
        (slot, value) => return Err(slot_mismatch(slot, &value)),
    }
    Ok(())
}

fn unknown_enum(what: &str, value: u64) -> MigrationError {
    MigrationError::new(
        MigrationErrorKind::UnknownEnumValue,
        format!("Unknown {} value {}", what, value),
    )
}

/// A table row pairs a slot with a kind the slot cannot hold.
fn slot_mismatch(slot: impl std::fmt::Debug, value: &FieldValue<'_>) -> MigrationError {
    MigrationError::new(
        MigrationErrorKind::UnexpectedWireType,
        format!("Slot {:?} does not accept the decoded value", slot),
    )
    .with_detail(format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> DecodeOptions {
        DecodeOptions::default()
    }

    // secret "Hello", name "alice", issuer "Ex", SHA256, 8 digits, TOTP
    const ACCOUNT: &[u8] = &[
        0x0A, 0x05, b'H', b'e', b'l', b'l', b'o', //
        0x12, 0x05, b'a', b'l', b'i', b'c', b'e', //
        0x1A, 0x02, b'E', b'x', //
        0x20, 0x02, //
        0x28, 0x02, //
        0x30, 0x02,
    ];

    fn wrap_account(account: &[u8]) -> Vec<u8> {
        let mut out = vec![0x0A, account.len() as u8];
        out.extend_from_slice(account);
        out
    }

    #[test]
    fn maps_account_fields() {
        let rec = map_account(ACCOUNT, &opts()).unwrap();
        let secret = rec.secret.as_ref().unwrap();
        assert_eq!(secret.raw(), b"Hello");
        assert_eq!(secret.base32(), "JBSWY3DP");
        assert_eq!(rec.name.as_deref(), Some("alice"));
        assert_eq!(rec.issuer.as_deref(), Some("Ex"));
        assert_eq!(rec.algorithm, Algorithm::Sha256);
        assert_eq!(rec.digits, Digits::Eight);
        assert_eq!(rec.otp_type, OtpType::Totp);
        assert_eq!(rec.counter, None);
    }

    #[test]
    fn hotp_with_counter() {
        let rec = map_account(&[0x30, 0x01, 0x38, 0xAC, 0x02], &opts()).unwrap();
        assert_eq!(rec.otp_type, OtpType::Hotp);
        assert_eq!(rec.counter, Some(300));
    }

    #[test]
    fn unknown_enum_values_fail() {
        for data in [[0x20, 0x00], [0x20, 0x05], [0x28, 0x03], [0x30, 0x00]] {
            let err = map_account(&data, &opts()).unwrap_err();
            assert_eq!(err.kind, MigrationErrorKind::UnknownEnumValue);
        }
    }

    #[test]
    fn md5_is_known() {
        let rec = map_account(&[0x20, 0x04], &opts()).unwrap();
        assert_eq!(rec.algorithm, Algorithm::Md5);
    }

    #[test]
    fn unknown_account_field_goes_to_extra() {
        let rec = map_account(&[0x40, 0x07, 0x4A, 0x01, b'z'], &opts()).unwrap();
        assert_eq!(rec.extra.get(&8), Some(&RawValue::Varint(7)));
        assert_eq!(rec.extra.get(&9), Some(&RawValue::Bytes(vec![b'z'])));
    }

    #[test]
    fn name_as_varint_is_rejected() {
        let err = map_account(&[0x10, 0x01], &opts()).unwrap_err();
        assert_eq!(err.kind, MigrationErrorKind::UnexpectedWireType);
    }

    #[test]
    fn version_as_bytes_is_rejected() {
        let err = map_payload(&[0x12, 0x01, 0x01], &opts()).unwrap_err();
        assert_eq!(err.kind, MigrationErrorKind::UnexpectedWireType);
        assert!(err.message.contains("version"));
    }

    #[test]
    fn account_as_varint_is_rejected() {
        let err = map_payload(&[0x08, 0x01], &opts()).unwrap_err();
        assert_eq!(err.kind, MigrationErrorKind::UnexpectedWireType);
        assert!(err.message.contains("account"));
    }

    #[test]
    fn enum_as_bytes_is_rejected() {
        let err = map_account(&[0x22, 0x01, 0x02], &opts()).unwrap_err();
        assert_eq!(err.kind, MigrationErrorKind::UnexpectedWireType);
        assert!(err.message.contains("algorithm"));
    }

    fn sample_value(kind: FieldKind) -> FieldValue<'static> {
        match kind {
            FieldKind::Message => FieldValue::Message(&[]),
            FieldKind::Bytes => FieldValue::Bytes(b"k"),
            FieldKind::Text => FieldValue::Text("t".into()),
            FieldKind::Integer => FieldValue::Integer(1),
            FieldKind::Enum(to_enum) => FieldValue::Enum(to_enum(1).unwrap()),
        }
    }

    #[test]
    fn every_table_row_fits_its_slot() {
        for spec in PAYLOAD_FIELDS {
            let mut payload = MigrationPayload::default();
            assign_payload(&mut payload, spec.slot, sample_value(spec.kind), &opts())
                .unwrap_or_else(|e| panic!("{}: {}", spec.name, e));
        }
        for spec in ACCOUNT_FIELDS {
            let mut record = AccountRecord::default();
            assign_account(&mut record, spec.slot, sample_value(spec.kind), &opts())
                .unwrap_or_else(|e| panic!("{}: {}", spec.name, e));
        }
    }

    #[test]
    fn table_numbers_are_unique() {
        let mut numbers: Vec<u64> = ACCOUNT_FIELDS.iter().map(|s| s.number).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), ACCOUNT_FIELDS.len());
        let mut numbers: Vec<u64> = PAYLOAD_FIELDS.iter().map(|s| s.number).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), PAYLOAD_FIELDS.len());
    }

    #[test]
    fn mismatched_slot_value_is_an_error() {
        let mut record = AccountRecord::default();
        let err = assign_account(&mut record, AccountSlot::Name, FieldValue::Integer(1), &opts())
            .unwrap_err();
        assert_eq!(err.kind, MigrationErrorKind::UnexpectedWireType);
    }

    #[test]
    fn two_accounts_in_order() {
        let mut buf = wrap_account(&[0x12, 0x01, b'a']);
        buf.extend(wrap_account(&[0x12, 0x01, b'b']));
        let payload = map_payload(&buf, &opts()).unwrap();
        assert_eq!(payload.accounts.len(), 2);
        assert_eq!(payload.accounts[0].name.as_deref(), Some("a"));
        assert_eq!(payload.accounts[1].name.as_deref(), Some("b"));
    }

    #[test]
    fn batch_fields() {
        let buf = [0x10, 0x01, 0x18, 0x02, 0x20, 0x01, 0x28, 0x96, 0x01];
        let payload = map_payload(&buf, &opts()).unwrap();
        assert_eq!(payload.version, Some(1));
        assert_eq!(payload.batch_size, Some(2));
        assert_eq!(payload.batch_index, Some(1));
        assert_eq!(payload.batch_id, Some(150));
        assert!(payload.accounts.is_empty());
    }

    #[test]
    fn unknown_top_level_field_is_preserved() {
        let mut buf = vec![0x48, 0x2A];
        buf.extend(wrap_account(ACCOUNT));
        let payload = map_payload(&buf, &opts()).unwrap();
        assert_eq!(payload.extra.get(&9), Some(&RawValue::Varint(42)));
        assert_eq!(payload.accounts.len(), 1);
    }

    #[test]
    fn malformed_account_fails_whole_payload() {
        let mut buf = wrap_account(ACCOUNT);
        buf.extend(wrap_account(&[0x20, 0x09]));
        let err = map_payload(&buf, &opts()).unwrap_err();
        assert_eq!(err.kind, MigrationErrorKind::UnknownEnumValue);
        assert!(err.detail.unwrap().contains("account 1"));
    }

    #[test]
    fn last_scalar_wins() {
        let rec = map_account(&[0x12, 0x01, b'a', 0x12, 0x01, b'b'], &opts()).unwrap();
        assert_eq!(rec.name.as_deref(), Some("b"));
    }

    #[test]
    fn lowercase_secret_option() {
        let options = DecodeOptions {
            base32: Base32Style {
                case: Base32Case::Lower,
                padding: true,
            },
        };
        let rec = map_account(ACCOUNT, &options).unwrap();
        assert_eq!(rec.secret.unwrap().base32(), "jbswy3dp");
    }
}
