//! # Password Utilities
//!
//! Generation and constant-time comparison of shared secrets.

use rand::distributions::Alphanumeric;
use rand::Rng;
use subtle::ConstantTimeEq;

/// Fixed system users of the ensemble
pub const SYSTEM_USERS: [&str; 2] = ["super", "sync"];

pub const PASSWORD_LENGTH: usize = 32;

pub fn is_system_user(username: &str) -> bool {
    SYSTEM_USERS.contains(&username)
}

/// Generate a random alphanumeric password
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Constant-time comparison of two strings
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_shape() {
        let password = generate_password();
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }

    #[test]
    fn test_constant_time_str_eq() {
        assert!(constant_time_str_eq("secret", "secret"));
        assert!(!constant_time_str_eq("secret", "secreT"));
        assert!(!constant_time_str_eq("secret", "secret2"));
    }

    #[test]
    fn test_system_users() {
        assert!(is_system_user("super"));
        assert!(is_system_user("sync"));
        assert!(!is_system_user("relation-3"));
    }
}
