use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the user a session belongs to.
///
/// `UserId::GUEST` (-1) marks a session with no authenticated user. Hosts must
/// not hand out -1 as a real user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const GUEST: UserId = UserId(-1);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_guest(&self) -> bool {
        *self == Self::GUEST
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A session as handed out by the registry.
///
/// Callers always receive a copy; changing it has no effect on the registry
/// except through [`SessionRegistry::bind`](crate::SessionRegistry::bind).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl SessionRecord {
    pub fn is_guest(&self) -> bool {
        self.user_id.is_guest()
    }

    /// True while `now` has not reached the expiry.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Cookie to be attached to a response by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
}
