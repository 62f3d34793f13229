//! Obfuscated secret payload and the cyclic cursor that reveals it one token
//! per broadcast.

use crate::cipher::CipherCodec;
use crate::error::ConfigError;

/// One obfuscated unit of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretToken {
    obfuscated: String,
    plain_length: usize,
}

impl SecretToken {
    pub fn obfuscated(&self) -> &str {
        &self.obfuscated
    }

    pub fn plain_length(&self) -> usize {
        self.plain_length
    }
}

/// Ordered tokens plus a cyclic position. Lives in process memory only; a
/// restart starts again from the first token.
#[derive(Debug, Clone)]
pub struct SecretSequence {
    tokens: Vec<SecretToken>,
    cursor: usize,
}

impl SecretSequence {
    /// Encode each plaintext word with `codec` and keep the original order.
    pub fn from_plaintext<S: AsRef<str>>(
        words: &[S],
        codec: CipherCodec,
    ) -> Result<Self, ConfigError> {
        let tokens = words
            .iter()
            .map(AsRef::as_ref)
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(|w| SecretToken {
                obfuscated: codec.encode(w),
                plain_length: w.chars().count(),
            })
            .collect::<Vec<_>>();

        if tokens.is_empty() {
            return Err(ConfigError::Validation(
                "secret sequence needs at least one word".into(),
            ));
        }

        Ok(Self { tokens, cursor: 0 })
    }

    pub fn peek(&self) -> &SecretToken {
        &self.tokens[self.cursor]
    }

    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.tokens.len();
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
