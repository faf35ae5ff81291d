use crate::config::MAX_TOKEN_LENGTH;
use crate::error::{CsrfError, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// An opaque anti-forgery token.
///
/// The value is the lowercase hex encoding of random bytes, so a token of
/// `n` bytes is always `2 * n` characters long.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Mint a token from `byte_length` bytes of OS randomness.
    ///
    /// `byte_length` must be between 1 and [`MAX_TOKEN_LENGTH`].
    pub fn generate(byte_length: usize) -> Result<Self> {
        if byte_length == 0 || byte_length > MAX_TOKEN_LENGTH {
            return Err(CsrfError::configuration(format!(
                "token length must be between 1 and {MAX_TOKEN_LENGTH} bytes, got {byte_length}"
            )));
        }

        let mut bytes = vec![0u8; byte_length];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CsrfError::Generation(e.to_string()))?;

        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Compare against a submitted value in constant time
    pub fn matches(&self, submitted: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), submitted.as_bytes())
    }
}

// Token values must never end up in logs.
impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CsrfToken").field(&"<redacted>").finish()
    }
}

impl From<String> for CsrfToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CsrfToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for CsrfToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Byte equality whose running time depends only on the input lengths.
///
/// A length mismatch returns early; token length is fixed by configuration
/// and is not secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Source of fresh tokens
pub trait TokenGenerator: Send + Sync {
    fn generate(&self, byte_length: usize) -> Result<CsrfToken>;
}

/// Generator backed by the operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self, byte_length: usize) -> Result<CsrfToken> {
        CsrfToken::generate(byte_length)
    }
}
