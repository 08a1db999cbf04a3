//! Position-tracked reads over an immutable byte buffer.

use crate::migration::types::*;

/// Longest varint that fits in 64 bits.
const MAX_VARINT_LEN: usize = 10;

/// Read position over a borrowed buffer.
///
/// Every read either succeeds and advances past what it consumed, or fails
/// and leaves the position where it was.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read a base-128 little-endian varint.
    pub(crate) fn read_varint(&mut self) -> MigrationResult<u64> {
        let (value, len) = self.peek_varint()?;
        self.pos += len;
        Ok(value)
    }

    /// Read the next `n` bytes verbatim.
    pub(crate) fn read_fixed(&mut self, n: usize) -> MigrationResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.truncated(format!(
                "need {} bytes, {} remain",
                n,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read a varint length followed by that many bytes.
    pub(crate) fn read_length_delimited(&mut self) -> MigrationResult<&'a [u8]> {
        let (declared, prefix_len) = self.peek_varint()?;
        let available = self.remaining() - prefix_len;
        let len = usize::try_from(declared)
            .ok()
            .filter(|&len| len <= available)
            .ok_or_else(|| {
                self.truncated(format!(
                    "declared length {} exceeds {} remaining bytes",
                    declared, available
                ))
            })?;
        let start = self.pos + prefix_len;
        self.pos = start + len;
        Ok(&self.buf[start..start + len])
    }

    /// Decode a varint at the current position without consuming it.
    /// Returns the value and its encoded length.
    fn peek_varint(&self) -> MigrationResult<(u64, usize)> {
        let mut result: u64 = 0;
        for (i, &byte) in self.buf[self.pos..].iter().enumerate() {
            let payload = (byte & 0x7F) as u64;
            if i == MAX_VARINT_LEN - 1 && (byte & 0x80 != 0 || payload > 1) {
                return Err(MigrationError::new(
                    MigrationErrorKind::VarintOverflow,
                    "Varint does not fit in 64 bits",
                )
                .with_detail(format!("at offset {}", self.pos)));
            }
            result |= payload << (7 * i);
            if byte & 0x80 == 0 {
                return Ok((result, i + 1));
            }
        }
        Err(self.truncated("buffer ended inside a varint"))
    }

    fn truncated(&self, detail: impl Into<String>) -> MigrationError {
        MigrationError::new(
            MigrationErrorKind::TruncatedInput,
            format!("Truncated input at offset {}", self.pos),
        )
        .with_detail(detail)
    }
}
