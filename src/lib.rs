//! OTP Bar import layer.
//!
//! Re-exports the migration decoder and adds the step that turns decoded
//! accounts into named token entries.

pub mod import;

pub use import::{generate_configuration, tokens_from_payload, ImportOptions, UserToken};
pub use otpbar_migration::migration;
