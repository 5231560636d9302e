//! Candidate password generation.
//!
//! Passwords are drawn uniformly from four character classes using the
//! operating system's random source and resampled until every class is
//! represented.

use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::error::{Result, RotationError};

/// Default candidate length in characters.
pub const DEFAULT_LENGTH: usize = 16;

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
/// ASCII punctuation without the quote characters `'` and `"`.
const PUNCTUATION: &str = "!#$%&()*+,-./:;<=>?@[\\]^_`{|}~";

const CLASSES: [&str; 4] = [LOWERCASE, UPPERCASE, DIGITS, PUNCTUATION];

/// Source of password candidates for the change protocol.
///
/// The production source is [`PasswordGenerator`]; tests substitute a fixed
/// sequence.
pub trait CandidateSource {
    /// Produce a fresh candidate. Never returns the same value twice.
    fn next_candidate(&mut self) -> Result<SecretString>;
}

/// Random password generator enforcing the four-class policy.
#[derive(Debug, Clone)]
pub struct PasswordGenerator {
    length: usize,
}

impl PasswordGenerator {
    /// Create a generator for passwords of `length` characters.
    ///
    /// # Errors
    ///
    /// Returns `RotationError::InvalidInput` if `length` is shorter than the
    /// number of character classes, since no such password can satisfy the
    /// policy.
    pub fn new(length: usize) -> Result<Self> {
        if length < CLASSES.len() {
            return Err(RotationError::InvalidInput(format!(
                "Password length must be at least {} (got {})",
                CLASSES.len(),
                length
            )));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Generate one password satisfying the character-class policy.
    pub fn generate(&self) -> Result<SecretString> {
        let alphabet: String = CLASSES.concat();
        let alphabet = alphabet.as_bytes();

        loop {
            let mut candidate = sample(alphabet, self.length)?;
            if satisfies_policy(&candidate) {
                return Ok(SecretString::from(std::mem::take(&mut *candidate)));
            }
        }
    }
}

impl Default for PasswordGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }
}

impl CandidateSource for PasswordGenerator {
    fn next_candidate(&mut self) -> Result<SecretString> {
        self.generate()
    }
}

/// Check that `candidate` contains at least one character from each class
/// and no quote characters.
pub fn satisfies_policy(candidate: &str) -> bool {
    if candidate.contains(['\'', '"']) {
        return false;
    }
    CLASSES
        .iter()
        .all(|class| candidate.chars().any(|c| class.contains(c)))
}

/// Draw `length` characters uniformly from `alphabet`.
///
/// Random bytes at or above the largest multiple of the alphabet size are
/// discarded so every character is equally likely.
fn sample(alphabet: &[u8], length: usize) -> Result<Zeroizing<String>> {
    let limit = 256 - (256 % alphabet.len());
    let mut out = Zeroizing::new(String::with_capacity(length));
    let mut buf = Zeroizing::new([0u8; 64]);

    while out.len() < length {
        getrandom::getrandom(&mut buf[..])
            .map_err(|e| RotationError::Entropy(format!("Failed to read random bytes: {}", e)))?;
        for &byte in buf.iter() {
            if out.len() == length {
                break;
            }
            let value = byte as usize;
            if value < limit {
                out.push(alphabet[value % alphabet.len()] as char);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashSet;

    #[test]
    fn test_generated_passwords_satisfy_policy() {
        for length in [4, 5, 16, 64] {
            let generator = PasswordGenerator::new(length).unwrap();
            for _ in 0..200 {
                let password = generator.generate().unwrap();
                let value = password.expose_secret();
                assert_eq!(value.chars().count(), length);
                assert!(value.chars().any(|c| c.is_ascii_lowercase()));
                assert!(value.chars().any(|c| c.is_ascii_uppercase()));
                assert!(value.chars().any(|c| c.is_ascii_digit()));
                assert!(value.chars().any(|c| c.is_ascii_punctuation()));
                assert!(!value.contains('\''));
                assert!(!value.contains('"'));
            }
        }
    }

    #[test]
    fn test_repeated_generation_differs() {
        let mut generator = PasswordGenerator::default();
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let password = generator.next_candidate().unwrap();
            assert!(seen.insert(password.expose_secret().to_string()));
        }
    }

    #[test]
    fn test_length_below_class_count_rejected() {
        let result = PasswordGenerator::new(3);
        assert!(matches!(result, Err(RotationError::InvalidInput(_))));
    }

    #[test]
    fn test_default_length() {
        assert_eq!(PasswordGenerator::default().length(), DEFAULT_LENGTH);
    }

    #[test]
    fn test_policy_check() {
        assert!(satisfies_policy("aA1!"));
        assert!(!satisfies_policy("aA1b"));
        assert!(!satisfies_policy("aa1!"));
        assert!(!satisfies_policy("aA1!'"));
        assert!(!satisfies_policy("aA1!\""));
    }

    #[test]
    fn test_punctuation_class_excludes_quotes() {
        assert_eq!(PUNCTUATION.len(), 30);
        assert!(PUNCTUATION.chars().all(|c| c.is_ascii_punctuation()));
        assert!(!PUNCTUATION.contains(['\'', '"']));
    }
}
