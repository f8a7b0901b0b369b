use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;
use crate::names::validate_component;

/// Name of a single queue entry.
///
/// The token is both the entry's identity and its sort key: entries created
/// earlier compare lower under plain string ordering.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryToken(String);

impl EntryToken {
    /// Wrap an existing token, e.g. a filename read back from disk.
    pub fn new(token: impl Into<String>) -> Result<Self, TypeError> {
        let token = token.into();
        validate_component(&token).map_err(|e| TypeError::InvalidToken {
            value: token.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self(token))
    }

    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time in milliseconds since the UNIX epoch, if this token is
    /// a UUIDv7.
    pub fn created_at_ms(&self) -> Option<u64> {
        let uuid = Uuid::parse_str(&self.0).ok()?;
        let (secs, nanos) = uuid.get_timestamp()?.to_unix();
        Some(secs * 1000 + u64::from(nanos) / 1_000_000)
    }
}

impl fmt::Debug for EntryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryToken({})", self.0)
    }
}

impl fmt::Display for EntryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntryToken {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntryToken> for String {
    fn from(token: EntryToken) -> Self {
        token.0
    }
}

/// Generator of entry tokens.
///
/// Implementations must be thread-safe, return filename-safe tokens, and
/// never hand out the same token twice. Tokens returned later must compare
/// greater than tokens returned earlier.
pub trait TokenSource: Send + Sync {
    /// Produce the next token.
    fn next_token(&self) -> EntryToken;
}

/// Default token source: lowercase hyphenated UUIDv7 strings.
///
/// UUIDv7 puts a millisecond timestamp in its most significant bits, so the
/// hyphenated form sorts by creation time. The last issued value is kept so
/// that tokens minted within the same millisecond still strictly increase.
pub struct UuidV7Tokens {
    last: Mutex<Uuid>,
}

impl UuidV7Tokens {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(Uuid::nil()),
        }
    }
}

impl Default for UuidV7Tokens {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for UuidV7Tokens {
    fn next_token(&self) -> EntryToken {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Uuid::now_v7();
        if next <= *last {
            next = Uuid::from_u128(last.as_u128() + 1);
        }
        *last = next;
        EntryToken(next.hyphenated().to_string())
    }
}

impl fmt::Debug for UuidV7Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UuidV7Tokens").finish_non_exhaustive()
    }
}

/// Deterministic token source producing zero-padded counters.
///
/// Intended for tests and reproducible fixtures: `prefix` followed by a
/// 20-digit sequence number.
#[derive(Debug)]
pub struct SequentialTokens {
    prefix: String,
    next: AtomicU64,
}

impl SequentialTokens {
    /// Start counting at zero with the prefix `"entry-"`.
    pub fn new() -> Self {
        Self {
            prefix: "entry-".to_string(),
            next: AtomicU64::new(0),
        }
    }

    /// Start counting at `first` with a custom prefix.
    ///
    /// # Errors
    ///
    /// [`TypeError::InvalidToken`] if tokens built from `prefix` would not be
    /// single visible path components: a leading `.`, a separator, or a
    /// prefix too long to leave room for the counter.
    pub fn starting_at(prefix: impl Into<String>, first: u64) -> Result<Self, TypeError> {
        let prefix = prefix.into();
        // u64::MAX has 20 digits, so the widest token has this shape.
        EntryToken::new(format!("{prefix}{:020}", u64::MAX))?;
        Ok(Self {
            prefix,
            next: AtomicU64::new(first),
        })
    }
}

impl Default for SequentialTokens {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for SequentialTokens {
    fn next_token(&self) -> EntryToken {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        EntryToken(format!("{}{n:020}", self.prefix))
    }
}
