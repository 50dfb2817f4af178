//! Credential comparison helpers.

/// Constant-time string comparison to prevent timing attacks.
///
/// Used when checking shared secrets such as the service API key. The length
/// check short-circuits, so only the length of the secret can leak.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
