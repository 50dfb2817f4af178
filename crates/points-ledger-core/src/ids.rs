//! Identifier types for the points ledger.
//!
//! User identifiers are opaque strings issued by the identity provider.
//! Transaction identifiers are ULIDs so that audit records sort by creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use parking_lot::Mutex;
use ulid::{Generator, Ulid};

/// Maximum accepted length of a user identifier, in bytes.
pub const MAX_USER_ID_LEN: usize = 128;

/// A user identifier (the identity provider's subject).
///
/// The ledger treats it as opaque. It must be non-empty, at most
/// [`MAX_USER_ID_LEN`] bytes and free of control characters, since it is used
/// verbatim as a storage key prefix.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Generate a new random identifier (primarily for testing).
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("usr_{}", Ulid::new().to_string().to_lowercase()))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the raw bytes of the identifier.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if s.len() > MAX_USER_ID_LEN {
            return Err(IdError::TooLong);
        }
        if s.chars().any(char::is_control) {
            return Err(IdError::InvalidCharacter);
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for UserId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A transaction identifier using ULID for time-ordering.
///
/// Identifiers generated in this process are strictly increasing, so audit
/// records written within the same millisecond still list in commit order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(Ulid);

impl TransactionId {
    /// Create a new `TransactionId` from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Generate a new `TransactionId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(next_ulid())
    }

    /// Return the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> &Ulid {
        &self.0
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

/// The next id from the process-wide monotonic generator.
///
/// The generator only fails when the random component overflows within a
/// single millisecond. That id then comes from a fresh `Ulid::new()`, which is
/// still unique but may sort before ids issued earlier in the same millisecond.
fn next_ulid() -> Ulid {
    static GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();

    GENERATOR
        .get_or_init(|| Mutex::new(Generator::new()))
        .lock()
        .generate()
        .unwrap_or_else(|_| Ulid::new())
}

impl FromStr for TransactionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The user identifier is empty.
    #[error("identifier is empty")]
    Empty,

    /// The user identifier exceeds the maximum length.
    #[error("identifier exceeds {} bytes", MAX_USER_ID_LEN)]
    TooLong,

    /// The user identifier contains a control character.
    #[error("identifier contains a control character")]
    InvalidCharacter,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}
