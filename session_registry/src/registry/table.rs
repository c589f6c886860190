use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::errors::RegistryError;
use crate::types::{SessionRecord, UserId};

/// Session storage with a secondary user index.
///
/// `by_user` maps a non-guest user to the record of that user with the latest
/// expiry. Guest records are never indexed. The table itself is not
/// synchronized; [`SessionRegistry`](super::SessionRegistry) wraps it in a lock.
#[derive(Debug, Default)]
pub(super) struct SessionTable {
    by_token: HashMap<String, SessionRecord>,
    by_user: HashMap<UserId, String>,
}

impl SessionTable {
    pub(super) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.by_token.len()
    }

    pub(super) fn contains(&self, token: &str) -> bool {
        self.by_token.contains_key(token)
    }

    pub(super) fn insert(&mut self, record: SessionRecord) {
        if !record.user_id.is_guest() {
            self.by_user.insert(record.user_id, record.token.clone());
        }
        self.by_token.insert(record.token.clone(), record);
    }

    pub(super) fn get_live(&self, token: &str, now: DateTime<Utc>) -> Option<&SessionRecord> {
        self.by_token
            .get(token)
            .filter(|record| record.is_live_at(now))
    }

    pub(super) fn live_token_for_user(&self, user_id: UserId, now: DateTime<Utc>) -> Option<&str> {
        if user_id.is_guest() {
            return None;
        }
        let token = self.by_user.get(&user_id)?;
        self.get_live(token, now).map(|record| record.token.as_str())
    }

    pub(super) fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.by_token.values().any(|record| !record.is_live_at(now))
    }

    pub(super) fn live_count(&self, now: DateTime<Utc>) -> usize {
        self.by_token
            .values()
            .filter(|record| record.is_live_at(now))
            .count()
    }

    pub(super) fn remove(&mut self, token: &str) -> Option<SessionRecord> {
        let record = self.by_token.remove(token)?;
        self.unindex(record.user_id, token);
        Some(record)
    }

    /// Remove every record whose expiry is at or before `now`.
    pub(super) fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .by_token
            .values()
            .filter(|record| !record.is_live_at(now))
            .map(|record| record.token.clone())
            .collect();

        for token in &expired {
            self.remove(token);
        }
        expired.len()
    }

    /// Move the live record `token` to `user_id` unless another live record owns that user.
    ///
    /// Check and update happen under the caller's single exclusive borrow.
    pub(super) fn bind(
        &mut self,
        token: &str,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, RegistryError> {
        let previous = match self.get_live(token, now) {
            Some(record) => record.user_id,
            None => return Err(RegistryError::NotFound),
        };

        if let Some(owner) = self.live_token_for_user(user_id, now) {
            if owner != token {
                return Err(RegistryError::AlreadyBound {
                    token: owner.to_string(),
                });
            }
        }

        self.unindex(previous, token);
        let record = self
            .by_token
            .get_mut(token)
            .ok_or(RegistryError::NotFound)?;
        record.user_id = user_id;
        let updated = record.clone();

        if !user_id.is_guest() {
            self.by_user.insert(user_id, token.to_string());
        }
        Ok(updated)
    }

    /// Drop the index entry of `user_id` if it points at `token`, falling back
    /// to the remaining record of that user with the latest expiry.
    fn unindex(&mut self, user_id: UserId, token: &str) {
        if user_id.is_guest() || self.by_user.get(&user_id).map(String::as_str) != Some(token) {
            return;
        }
        self.by_user.remove(&user_id);

        let successor = self
            .by_token
            .values()
            .filter(|record| record.user_id == user_id && record.token != token)
            .max_by_key(|record| record.expires_at)
            .map(|record| record.token.clone());

        if let Some(successor) = successor {
            self.by_user.insert(user_id, successor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(token: &str, user: i64, expires_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            token: token.to_string(),
            expires_at,
            user_id: UserId::new(user),
        }
    }

    #[test]
    fn test_guest_records_are_not_indexed() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("g1", -1, now + Duration::minutes(1)));
        table.insert(record("g2", -1, now + Duration::minutes(1)));

        assert_eq!(table.len(), 2);
        assert!(table.by_user.is_empty());
        assert_eq!(table.live_token_for_user(UserId::GUEST, now), None);
    }

    #[test]
    fn test_get_live_filters_expired() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("live", 1, now + Duration::seconds(1)));
        table.insert(record("dead", 2, now - Duration::seconds(1)));
        table.insert(record("edge", 3, now));

        assert!(table.get_live("live", now).is_some());
        assert!(table.get_live("dead", now).is_none());
        assert!(table.get_live("edge", now).is_none());
        assert!(table.get_live("missing", now).is_none());
    }

    #[test]
    fn test_live_token_for_user_checks_expiry() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("old", 7, now - Duration::seconds(1)));

        assert_eq!(table.live_token_for_user(UserId::new(7), now), None);
    }

    #[test]
    fn test_sweep_counts_and_keeps_live() {
        // Given 3 expired and 2 live records
        let now = Utc::now();
        let mut table = SessionTable::new();
        for i in 0..3 {
            table.insert(record(&format!("dead{i}"), i, now - Duration::seconds(10)));
        }
        table.insert(record("live0", 10, now + Duration::seconds(10)));
        table.insert(record("live1", -1, now + Duration::seconds(10)));

        // When sweeping
        let removed = table.sweep(now);

        // Then exactly the expired records are gone, index included
        assert_eq!(removed, 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.by_user.len(), 1);
        assert_eq!(table.sweep(now), 0);
    }

    #[test]
    fn test_remove_repoints_index_to_remaining_record() {
        // Given two records for the same user, created without a bind check
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("first", 7, now + Duration::minutes(1)));
        table.insert(record("second", 7, now + Duration::minutes(2)));
        assert_eq!(table.live_token_for_user(UserId::new(7), now), Some("second"));

        // When the indexed one is removed
        table.remove("second");

        // Then the other record takes over the index
        assert_eq!(table.live_token_for_user(UserId::new(7), now), Some("first"));

        table.remove("first");
        assert!(table.by_user.is_empty());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut table = SessionTable::new();
        assert!(table.remove("nope").is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_bind_guest_to_user() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("g", -1, now + Duration::minutes(1)));

        let updated = table.bind("g", UserId::new(42), now).unwrap();

        assert_eq!(updated.user_id, UserId::new(42));
        assert_eq!(table.live_token_for_user(UserId::new(42), now), Some("g"));
    }

    #[test]
    fn test_bind_conflict_leaves_table_untouched() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("owner", 42, now + Duration::minutes(1)));
        table.insert(record("other", 7, now + Duration::minutes(1)));

        let result = table.bind("other", UserId::new(42), now);

        assert_eq!(
            result,
            Err(RegistryError::AlreadyBound {
                token: "owner".to_string()
            })
        );
        assert_eq!(table.get_live("other", now).unwrap().user_id, UserId::new(7));
        assert_eq!(table.live_token_for_user(UserId::new(7), now), Some("other"));
        assert_eq!(table.live_token_for_user(UserId::new(42), now), Some("owner"));
    }

    #[test]
    fn test_bind_moves_index_from_previous_user() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("s", 7, now + Duration::minutes(1)));

        table.bind("s", UserId::new(42), now).unwrap();

        assert_eq!(table.live_token_for_user(UserId::new(7), now), None);
        assert_eq!(table.live_token_for_user(UserId::new(42), now), Some("s"));
    }

    #[test]
    fn test_bind_same_user_again_is_ok() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("s", 42, now + Duration::minutes(1)));

        assert!(table.bind("s", UserId::new(42), now).is_ok());
        assert_eq!(table.live_token_for_user(UserId::new(42), now), Some("s"));
    }

    #[test]
    fn test_bind_ignores_expired_owner() {
        // Given the user's previous session has expired but was not swept yet
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("stale", 42, now - Duration::seconds(1)));
        table.insert(record("fresh", -1, now + Duration::minutes(1)));

        // When binding a new session to that user
        table.bind("fresh", UserId::new(42), now).unwrap();

        // Then the new one owns the index, and sweeping the stale one keeps it
        assert_eq!(table.live_token_for_user(UserId::new(42), now), Some("fresh"));
        assert_eq!(table.sweep(now), 1);
        assert_eq!(table.live_token_for_user(UserId::new(42), now), Some("fresh"));
    }

    #[test]
    fn test_bind_expired_record_is_not_found() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("dead", -1, now - Duration::seconds(1)));

        assert_eq!(
            table.bind("dead", UserId::new(1), now),
            Err(RegistryError::NotFound)
        );
    }

    #[test]
    fn test_bind_to_guest_drops_index() {
        let now = Utc::now();
        let mut table = SessionTable::new();
        table.insert(record("s", 42, now + Duration::minutes(1)));

        let updated = table.bind("s", UserId::GUEST, now).unwrap();

        assert!(updated.is_guest());
        assert!(table.by_user.is_empty());
    }
}
