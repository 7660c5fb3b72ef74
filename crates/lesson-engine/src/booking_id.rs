//! User-facing booking identifiers: `PREFIX-YYYYMMDD-XXXXXX`.
//!
//! `YYYYMMDD` is the UTC creation date and `XXXXXX` six uppercase base-36
//! characters. Together with the student's email the id is the only credential
//! for later lookups, so the suffix is drawn from a random source.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

const SUFFIX_LEN: usize = 6;
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(String);

impl BookingId {
    /// Generate a fresh id created at `now`.
    pub fn generate<R: Rng + ?Sized>(prefix: &str, now: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        BookingId(format!("{}-{}-{}", prefix, now.format("%Y%m%d"), suffix))
    }

    /// Validate `input` against the `PREFIX-YYYYMMDD-XXXXXX` shape.
    pub fn parse(input: &str, prefix: &str) -> Result<Self, BookingError> {
        let invalid = || BookingError::InvalidInput(format!("Invalid booking id format: {input}"));

        let mut parts = input.trim().splitn(3, '-');
        let (Some(head), Some(date), Some(suffix)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if head != prefix {
            return Err(invalid());
        }
        if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if suffix.len() != SUFFIX_LEN
            || !suffix
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        {
            return Err(invalid());
        }

        Ok(BookingId(input.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The creation date embedded in the id, if it is a real calendar date.
    pub fn created_on(&self) -> Option<NaiveDate> {
        let date = self.0.split('-').nth(1)?;
        NaiveDate::parse_from_str(date, "%Y%m%d").ok()
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BookingId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
