//! MARC record leader.
//!
//! The leader is a 24-byte fixed-length header at the start of every MARC record.
//! It is kept verbatim so that status, type and implementation-defined bytes
//! survive conversions between formats.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Record type
//! - Position 7: Bibliographic level
//! - Position 9: Character coding (space = MARC-8, a = UTF-8)
//! - Position 10: Indicator count (usually 2)
//! - Position 11: Subfield code count (usually 2)
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-23: Encoding level, cataloging form, entry map

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a MARC leader in bytes.
pub const LEADER_LEN: usize = 24;

/// Leader used to fill positions a source format leaves unset.
///
/// Line-MARC records often carry only the first few leader positions (or no
/// leader at all); the remaining bytes are taken from here.
pub const LEADER_TEMPLATE: &[u8; LEADER_LEN] = b"00000    a2200000   4500";

/// MARC Leader - 24 bytes at the start of every MARC record.
///
/// Serialized as its 24-character text; deserializing applies the same
/// checks as [`Leader::from_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Leader([u8; LEADER_LEN]);

impl Leader {
    /// Parse a leader from exactly 24 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not 24 bytes long or is not ASCII.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; LEADER_LEN] = bytes.try_into().map_err(|_| {
            MarcError::InvalidField(format!(
                "leader must be {LEADER_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        if !raw.is_ascii() {
            return Err(MarcError::InvalidField(
                "leader must be ASCII".to_string(),
            ));
        }
        Ok(Leader(raw))
    }

    /// Build a leader from a possibly short or blank-substituted prefix.
    ///
    /// Bytes of `text` overwrite [`LEADER_TEMPLATE`] from position 0; anything
    /// past position 23 is ignored. `^`, which line-mode files use in place of
    /// a blank, becomes a space, and non-ASCII characters become spaces too.
    ///
    /// ```
    /// use marc_codec::Leader;
    ///
    /// let leader = Leader::from_partial("     c");
    /// assert_eq!(leader.status(), 'c');
    /// assert_eq!(leader.as_str(), "     c   a2200000   4500");
    /// ```
    #[must_use]
    pub fn from_partial(text: &str) -> Self {
        let mut raw = *LEADER_TEMPLATE;
        for (slot, ch) in raw.iter_mut().zip(text.chars()) {
            *slot = match ch {
                '^' => b' ',
                c if c.is_ascii() => c as u8,
                _ => b' ',
            };
        }
        Leader(raw)
    }

    /// The leader bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; LEADER_LEN] {
        &self.0
    }

    /// The leader as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Record length from positions 0-4, if numeric.
    #[must_use]
    pub fn record_length(&self) -> Option<usize> {
        parse_decimal(&self.0[0..5])
    }

    /// Record status (position 5).
    #[must_use]
    pub fn status(&self) -> char {
        self.0[5] as char
    }

    /// Type of record (position 6).
    #[must_use]
    pub fn record_type(&self) -> char {
        self.0[6] as char
    }

    /// Bibliographic level (position 7).
    #[must_use]
    pub fn bibliographic_level(&self) -> char {
        self.0[7] as char
    }

    /// Indicator count (position 10).
    #[must_use]
    pub fn indicator_count(&self) -> char {
        self.0[10] as char
    }

    /// Subfield code length (position 11).
    #[must_use]
    pub fn subfield_code_length(&self) -> char {
        self.0[11] as char
    }

    /// Base address of data from positions 12-16, if numeric.
    #[must_use]
    pub fn base_address(&self) -> Option<usize> {
        parse_decimal(&self.0[12..17])
    }

    /// Positions 17-23: encoding level, cataloging form and entry map.
    #[must_use]
    pub fn entry_map(&self) -> &str {
        &self.as_str()[17..]
    }

    /// Copy of this leader with the record length and base address rewritten.
    ///
    /// Both values must fit in five decimal digits.
    #[must_use]
    pub(crate) fn with_lengths(&self, record_length: usize, base_address: usize) -> Self {
        let mut raw = self.0;
        raw[0..5].copy_from_slice(format!("{record_length:05}").as_bytes());
        raw[12..17].copy_from_slice(format!("{base_address:05}").as_bytes());
        Leader(raw)
    }
}

impl TryFrom<String> for Leader {
    type Error = MarcError;

    fn try_from(text: String) -> Result<Self> {
        Leader::from_bytes(text.as_bytes())
    }
}

impl From<Leader> for String {
    fn from(leader: Leader) -> Self {
        leader.as_str().to_owned()
    }
}

impl Default for Leader {
    fn default() -> Self {
        Leader(*LEADER_TEMPLATE)
    }
}

impl fmt::Display for Leader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_decimal(bytes: &[u8]) -> Option<usize> {
    bytes.iter().try_fold(0usize, |acc, &b| {
        b.is_ascii_digit()
            .then(|| acc * 10 + usize::from(b - b'0'))
    })
}
