//! Fixed-shift alphabetic substitution used to obfuscate the secret payload.

use crate::error::ConfigError;

/// Shift applied when the config does not name one.
pub const DEFAULT_SHIFT: u8 = 3;

/// Caesar-style codec over the ASCII alphabet.
///
/// Input is case-insensitive; output is always uppercase. Anything that is not
/// an ASCII letter passes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherCodec {
    shift: u8,
}

impl CipherCodec {
    pub fn new(shift: u8) -> Result<Self, ConfigError> {
        if !(1..=25).contains(&shift) {
            return Err(ConfigError::Validation(format!(
                "cipher shift must be within 1..=25, got {shift}"
            )));
        }
        Ok(Self { shift })
    }

    pub fn shift(self) -> u8 {
        self.shift
    }

    pub fn encode(self, plaintext: &str) -> String {
        Self::rotate(plaintext, self.shift)
    }

    pub fn decode(self, obfuscated: &str) -> String {
        Self::rotate(obfuscated, 26 - self.shift)
    }

    fn rotate(input: &str, by: u8) -> String {
        input
            .chars()
            .map(|c| {
                if c.is_ascii_alphabetic() {
                    let idx = c.to_ascii_uppercase() as u8 - b'A';
                    char::from(b'A' + (idx + by) % 26)
                } else {
                    c
                }
            })
            .collect()
    }
}

impl Default for CipherCodec {
    fn default() -> Self {
        Self {
            shift: DEFAULT_SHIFT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_shifts_and_uppercases() {
        let codec = CipherCodec::new(3).unwrap();
        assert_eq!(codec.encode("hello"), "KHOOR");
        assert_eq!(codec.encode("xyz"), "ABC");
    }

    #[test]
    fn non_letters_pass_through() {
        let codec = CipherCodec::new(5).unwrap();
        assert_eq!(codec.encode("a-1 b!"), "F-1 G!");
        assert_eq!(codec.decode("F-1 G!"), "A-1 B!");
    }

    #[test]
    fn decode_inverts_encode_for_every_shift() {
        for shift in 1..=25 {
            let codec = CipherCodec::new(shift).unwrap();
            for word in ["watching", "Always", "ZEBRA", "q", "theEndIsNear"] {
                assert_eq!(codec.decode(&codec.encode(word)), word.to_ascii_uppercase());
            }
        }
    }

    #[test]
    fn rejects_out_of_range_shift() {
        assert!(CipherCodec::new(0).is_err());
        assert!(CipherCodec::new(26).is_err());
    }

    #[test]
    fn empty_input_is_valid() {
        assert_eq!(CipherCodec::default().encode(""), "");
    }
}
