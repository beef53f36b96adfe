//! License key generation, normalization and comparison.

use crate::error::{LicenseError, LicenseResult};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Crockford base32: digits and upper-case letters without `I`, `L`, `O`, `U`.
pub const KEY_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Number of dash-separated groups.
pub const GROUP_COUNT: usize = 6;

/// Characters per group.
pub const GROUP_LEN: usize = 6;

const SYMBOLS: usize = GROUP_COUNT * GROUP_LEN;

/// A license key in canonical form (`XXXXXX-XXXXXX-...`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Generates a fresh key from the operating system's CSPRNG.
    ///
    /// 36 symbols of 5 bits each give 180 bits of entropy.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYMBOLS];
        OsRng.fill_bytes(&mut bytes);
        let symbols: Vec<u8> = bytes
            .iter()
            .map(|b| KEY_ALPHABET[usize::from(b & 0x1f)])
            .collect();
        Self(group(&symbols))
    }

    /// Parses user input into canonical form.
    ///
    /// Accepts lower case, missing or extra dashes, surrounding whitespace,
    /// and the look-alikes `O` (for `0`) and `I`/`L` (for `1`).
    pub fn parse(input: &str) -> LicenseResult<Self> {
        let mut symbols = Vec::with_capacity(SYMBOLS);
        for c in input.trim().chars() {
            if c == '-' || c.is_whitespace() {
                continue;
            }
            let c = match c.to_ascii_uppercase() {
                'O' => '0',
                'I' | 'L' => '1',
                other => other,
            };
            if !c.is_ascii() || !KEY_ALPHABET.contains(&(c as u8)) {
                return Err(LicenseError::InvalidFormat(format!(
                    "unexpected character {c:?}"
                )));
            }
            symbols.push(c as u8);
        }
        if symbols.len() != SYMBOLS {
            return Err(LicenseError::InvalidFormat(format!(
                "expected {SYMBOLS} characters, got {}",
                symbols.len()
            )));
        }
        Ok(Self(group(&symbols)))
    }

    /// Returns the canonical key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares a presented key against this one in constant time.
    ///
    /// Input that does not parse is a mismatch.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        match Self::parse(presented) {
            Ok(other) => self.0.as_bytes().ct_eq(other.0.as_bytes()).into(),
            Err(_) => false,
        }
    }
}

fn group(symbols: &[u8]) -> String {
    symbols
        .chunks(GROUP_LEN)
        .map(|chunk| chunk.iter().map(|&b| b as char).collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Keys are credentials; keep them out of logs.
impl fmt::Debug for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LicenseKey({}-…)", &self.0[..GROUP_LEN])
    }
}

impl FromStr for LicenseKey {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LicenseKey {
    type Error = LicenseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<LicenseKey> for String {
    fn from(key: LicenseKey) -> Self {
        key.0
    }
}
