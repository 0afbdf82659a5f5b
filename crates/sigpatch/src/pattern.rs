//! Byte pattern compilation for signature scanning.
//!
//! A pattern is a whitespace-separated sequence of tokens, each either a
//! two-hex-digit byte (case-insensitive) or a wildcard (`??` or `?`) that
//! matches any byte. Compiled patterns are immutable and freely shareable
//! across threads.

use std::fmt;

use crate::error::{Error, Result};

/// A compiled byte pattern. `None` tokens are wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<Option<u8>>,
}

impl Pattern {
    /// Compile a textual pattern such as `"75 ?? 48 8B 0D"`.
    ///
    /// A bare `?` is accepted as a full-byte wildcard, same as `??`.
    pub fn compile(text: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        for token in text.split_whitespace() {
            if token == "??" || token == "?" {
                tokens.push(None);
                continue;
            }

            if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::MalformedToken(token.to_string()));
            }

            // Parse cannot fail after the digit check above.
            let value = u8::from_str_radix(token, 16)
                .map_err(|_| Error::MalformedToken(token.to_string()))?;
            tokens.push(Some(value));
        }

        if tokens.is_empty() {
            return Err(Error::EmptyPattern);
        }

        Ok(Self { tokens })
    }

    /// Number of tokens, which equals the number of bytes consumed per
    /// match attempt.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Option<u8>] {
        &self.tokens
    }

    /// The first concrete (non-wildcard) token and its position, if any.
    /// Used by the scanner to seed candidate searches.
    pub fn first_concrete(&self) -> Option<(usize, u8)> {
        self.tokens
            .iter()
            .enumerate()
            .find_map(|(i, t)| t.map(|b| (i, b)))
    }

    /// Compare the pattern against a byte slice of at least `len()` bytes.
    pub fn matches(&self, window: &[u8]) -> bool {
        window.len() >= self.tokens.len()
            && self
                .tokens
                .iter()
                .zip(window)
                .all(|(token, byte)| token.is_none_or(|expected| expected == *byte))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match token {
                Some(value) => write!(f, "{:02X}", value)?,
                None => f.write_str("??")?,
            }
        }
        Ok(())
    }
}
