//! # OTP Bar – Migration Import
//!
//! Decoder for bulk account exports in the `otpauth-migration://` format:
//!
//! - **Transport** – URL validation and base64 extraction of the `data` parameter
//! - **Wire format** – bounds-checked protobuf reader (varint, fixed, length-delimited)
//! - **Field mapping** – payload and per-account field tables, unknown fields kept verbatim
//! - **Base32** – secret rendering with configurable case and padding
//! - **Export** – the inverse encoder, producing payload bytes or migration URLs

pub mod migration;
