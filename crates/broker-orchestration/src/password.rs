//! Password generation for broker users.

use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;

/// Length of generated passwords
pub const PASSWORD_LENGTH: usize = 24;

/// Fresh password drawn from the operating system's CSPRNG
///
/// Alphanumeric only, so it can be embedded in AMQP URIs and dashboard URLs
/// without escaping.
pub fn generate_password() -> String {
    Alphanumeric.sample_string(&mut OsRng, PASSWORD_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_shape() {
        let password = generate_password();
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }
}
