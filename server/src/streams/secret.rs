//! Stream key generation.
//!
//! A key is a random UUID written in base 35 over digits and uppercase
//! letters without `O`, left-padded with `0` to a fixed width.

use uuid::Uuid;

/// Digit alphabet for stream keys, most significant digit first.
pub const SECRET_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNPQRSTUVWXYZ";

/// Length of every stream key.
pub const SECRET_LEN: usize = 32;

/// Generate a fresh candidate key.
pub fn generate_secret() -> String {
    encode_secret(Uuid::new_v4().as_u128())
}

/// Encode `value` in the key alphabet, truncated or padded to [`SECRET_LEN`].
pub fn encode_secret(value: u128) -> String {
    let base = SECRET_ALPHABET.len() as u128;
    let mut digits = Vec::with_capacity(SECRET_LEN);
    let mut rest = value;
    loop {
        digits.push(SECRET_ALPHABET[(rest % base) as usize]);
        rest /= base;
        if rest == 0 {
            break;
        }
    }
    digits.reverse();
    digits.truncate(SECRET_LEN);

    let mut secret = String::with_capacity(SECRET_LEN);
    secret.extend(std::iter::repeat('0').take(SECRET_LEN - digits.len()));
    secret.extend(digits.into_iter().map(char::from));
    secret
}

/// Whether `candidate` has the shape of a stream key.
pub fn is_valid_secret(candidate: &str) -> bool {
    candidate.len() == SECRET_LEN && candidate.bytes().all(|b| SECRET_ALPHABET.contains(&b))
}
