//! Mock encoder implementation for testing.
//!
//! Provides [`MockEncoder`], a reversible stand-in for the character-subset
//! encoder. Its output uses the same six symbols as the real one, but it is
//! a plain substitution code rather than an executable program, so tests can
//! [`decode`](MockEncoder::decode) it back and inspect what was encoded.

use crate::encoder::{EncodeError, Encoder};

/// Symbols used by the mock output.
pub const MOCK_ALPHABET: [char; 6] = ['[', ']', '(', ')', '!', '+'];

/// Base-6 digits per UTF-16 code unit (6^7 > 65535).
const DIGITS: usize = 7;

/// Reversible six-symbol encoder.
///
/// # Example
///
/// ```ignore
/// use veil_encoder::{Encoder, MockEncoder};
///
/// let encoder = MockEncoder::new().failing_on("throw");
/// let encoded = encoder.encode("console.log(1)").unwrap();
/// assert_eq!(MockEncoder::decode(&encoded).unwrap(), "console.log(1)");
/// assert!(encoder.encode("throw 1").is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct MockEncoder {
    fail_marker: Option<String>,
}

impl MockEncoder {
    /// Create a mock encoder that accepts every input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any input containing `marker`.
    #[must_use]
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Reverse [`Encoder::encode`].
    ///
    /// Returns `None` if `encoded` is not valid mock output.
    #[must_use]
    pub fn decode(encoded: &str) -> Option<String> {
        let symbols: Vec<char> = encoded.chars().collect();
        if symbols.len() % DIGITS != 0 {
            return None;
        }

        let mut units = Vec::with_capacity(symbols.len() / DIGITS);
        for chunk in symbols.chunks(DIGITS) {
            let mut value: u32 = 0;
            for symbol in chunk {
                let digit = MOCK_ALPHABET.iter().position(|c| c == symbol)?;
                value = value * 6 + u32::try_from(digit).ok()?;
            }
            units.push(u16::try_from(value).ok()?);
        }
        String::from_utf16(&units).ok()
    }
}

impl Encoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    fn encode(&self, script: &str) -> Result<String, EncodeError> {
        if let Some(marker) = &self.fail_marker
            && script.contains(marker.as_str())
        {
            return Err(EncodeError::Rejected(marker.clone()));
        }

        let mut out = String::with_capacity(script.len() * DIGITS);
        for unit in script.encode_utf16() {
            let mut digits = [MOCK_ALPHABET[0]; DIGITS];
            let mut value = usize::from(unit);
            for slot in digits.iter_mut().rev() {
                *slot = MOCK_ALPHABET[value % 6];
                value /= 6;
            }
            out.extend(digits);
        }
        Ok(out)
    }
}
