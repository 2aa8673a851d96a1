// Session token generation.
//
// `rand::thread_rng` is a CSPRNG; a 32-character token over this 64-character
// alphabet carries 192 bits of entropy.

use rand::Rng;

/// Character set: a-z, A-Z, 0-9, -, _
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Length of generated session tokens.
pub const SESSION_TOKEN_LENGTH: usize = 32;

/// Generate a random string of the specified length over `[a-zA-Z0-9\-_]`.
pub fn generate_random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate a fresh session token.
pub fn generate_session_token() -> String {
    generate_random_string(SESSION_TOKEN_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_length() {
        assert_eq!(generate_random_string(0).len(), 0);
        assert_eq!(generate_random_string(16).len(), 16);
        assert_eq!(generate_session_token().len(), SESSION_TOKEN_LENGTH);
    }

    #[test]
    fn test_valid_characters() {
        let s = generate_random_string(1000);
        for c in s.chars() {
            assert!(
                c.is_ascii_alphanumeric() || c == '-' || c == '_',
                "Invalid character: {c}"
            );
        }
    }

    #[test]
    fn test_uniqueness() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
    }
}
