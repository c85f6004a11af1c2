//! Opaque token generation.
//!
//! Activation credentials and session identifiers are random bytes from the
//! operating system CSPRNG, hex-encoded so they are safe as URL path
//! segments. The two activation tokens of one account come from independent
//! draws; knowing one leaks nothing about the other.

use rand::RngCore;
use rand::rngs::OsRng;

/// Length, in characters, of one activation token.
pub const ACTIVATION_TOKEN_LENGTH: usize = 40;

const ACTIVATION_TOKEN_BYTES: usize = 20;
const SESSION_TOKEN_BYTES: usize = 32;

fn random_hex(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    // Randomness failure is unrecoverable for the whole request.
    OsRng.fill_bytes(&mut buffer);
    hex::encode(buffer)
}

/// Generate one half of an activation credential: 40 lowercase hex chars.
pub fn activation_token() -> String {
    random_hex(ACTIVATION_TOKEN_BYTES)
}

/// Generate an opaque session identifier: 64 lowercase hex chars.
pub fn session_token() -> String {
    random_hex(SESSION_TOKEN_BYTES)
}

/// Whether `value` has the shape of an activation token.
///
/// Checked before touching the store so malformed path segments short-circuit
/// into the same not-found response as unknown tokens.
pub fn is_activation_token(value: &str) -> bool {
    value.len() == ACTIVATION_TOKEN_LENGTH
        && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
