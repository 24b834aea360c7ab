//! Opaque check-in codes and the scan-payload extractor.
//!
//! A [`CheckInCode`] is an unguessable string with no embedded structure.
//! Scanners hand over either the bare code or a URI of the form
//! `{scheme}://event/checkin/{code}`; [`CheckInCode::extract`] accepts both.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Path that precedes the code inside a check-in URI.
pub const CHECKIN_URI_PATH: &str = "event/checkin/";

/// Longest code the extractor will accept.
pub const MAX_CODE_LEN: usize = 512;

/// Fewest random bytes a generated code may carry.
pub const MIN_ENTROPY_BYTES: usize = 16;

/// Why a raw scan could not be turned into a code.
///
/// These fail before any store lookup and are distinct from an unknown code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeFormatError {
    /// The payload was empty after trimming.
    #[error("scanned payload is empty")]
    Empty,

    /// The payload looked like a URI but not a check-in URI.
    #[error("not a check-in URI: {0}")]
    UnexpectedUri(String),

    /// The bare code contains whitespace, control characters or `/`.
    #[error("code contains characters that are not allowed")]
    InvalidCharacters,

    /// The code exceeds [`MAX_CODE_LEN`].
    #[error("code is longer than {MAX_CODE_LEN} characters")]
    TooLong,
}

/// An opaque check-in code.
///
/// Deserialization goes through [`CheckInCode::extract`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckInCode(String);

impl TryFrom<String> for CheckInCode {
    type Error = CodeFormatError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::extract(&raw)
    }
}

impl From<CheckInCode> for String {
    fn from(code: CheckInCode) -> Self {
        code.0
    }
}

impl CheckInCode {
    /// Mints a fresh code from `entropy_bytes` random bytes, encoded as
    /// URL-safe base64 without padding.
    ///
    /// Values below [`MIN_ENTROPY_BYTES`] are raised to it.
    #[must_use]
    pub fn generate(entropy_bytes: usize) -> Self {
        let mut bytes = vec![0u8; entropy_bytes.max(MIN_ENTROPY_BYTES)];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(&bytes))
    }

    /// Normalizes a raw scanned string into a bare code.
    ///
    /// The input is trimmed. A URI must be `{scheme}://event/checkin/{code}`
    /// with a single non-empty trailing segment; anything without `://` is
    /// treated as a bare code. The code is returned verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`CodeFormatError`] when the payload matches neither shape.
    pub fn extract(raw: &str) -> Result<Self, CodeFormatError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CodeFormatError::Empty);
        }

        let candidate = match trimmed.split_once("://") {
            Some((scheme, rest)) => {
                let valid_scheme = !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
                match rest.strip_prefix(CHECKIN_URI_PATH) {
                    Some(code) if valid_scheme && !code.is_empty() => code,
                    _ => return Err(CodeFormatError::UnexpectedUri(trimmed.to_string())),
                }
            }
            None => trimmed,
        };

        Self::from_bare(candidate)
    }

    /// Validates an already-bare code.
    fn from_bare(code: &str) -> Result<Self, CodeFormatError> {
        if code.len() > MAX_CODE_LEN {
            return Err(CodeFormatError::TooLong);
        }
        if code
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/')
        {
            return Err(CodeFormatError::InvalidCharacters);
        }
        Ok(Self(code.to_string()))
    }

    /// Wraps a code read back from storage without validation.
    #[must_use]
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Embeds the code in a resolvable check-in URI.
    #[must_use]
    pub fn to_uri(&self, scheme: &str) -> String {
        format!("{scheme}://{CHECKIN_URI_PATH}{}", self.0)
    }
}

impl fmt::Display for CheckInCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
