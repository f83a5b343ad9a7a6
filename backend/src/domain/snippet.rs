//! Snippet entity and its identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of snippets returned by [`crate::domain::ports::SnippetRepository::list_recent`].
pub const RECENT_SNIPPETS_LIMIT: usize = 10;

/// Snippet identifier; must parse as a hyphenated or simple UUID.
///
/// # Examples
/// ```
/// use snippetbox::domain::SnippetId;
///
/// assert!("3fa85f64-5717-4562-b3fc-2c963f66afa6".parse::<SnippetId>().is_ok());
/// assert!("-1".parse::<SnippetId>().is_err());
/// assert!("1.23".parse::<SnippetId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnippetId(Uuid);

impl SnippetId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for SnippetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Permitted snippet lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    OneDay,
    OneWeek,
    OneYear,
}

impl Expiry {
    /// Day counts accepted by the create form, in display order.
    pub const PERMITTED_DAYS: [u32; 3] = [1, 7, 365];

    pub const fn days(self) -> u32 {
        match self {
            Self::OneDay => 1,
            Self::OneWeek => 7,
            Self::OneYear => 365,
        }
    }

    /// Expiry instant relative to `now`.
    pub fn expires_at(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + TimeDelta::days(i64::from(self.days()))
    }
}

impl TryFrom<u32> for Expiry {
    type Error = UnsupportedExpiry;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            1 => Ok(Self::OneDay),
            7 => Ok(Self::OneWeek),
            365 => Ok(Self::OneYear),
            other => Err(UnsupportedExpiry(other)),
        }
    }
}

/// Raised when a day count is not one of [`Expiry::PERMITTED_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported snippet expiry: {0} days")]
pub struct UnsupportedExpiry(pub u32);

/// Validated input for a new snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetDraft {
    pub title: String,
    pub content: String,
    pub expiry: Expiry,
}

/// Stored snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Snippet {
    /// Whether the snippet is still visible at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
