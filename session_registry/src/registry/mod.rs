mod sweeper;
mod table;

pub use sweeper::spawn_expiry_sweeper;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::config::RegistryConfig;
use crate::errors::RegistryError;
use crate::token::{generate_token, token_prefix};
use crate::types::{CookieSpec, SessionRecord, UserId};

use table::SessionTable;

/// Shared table of live sessions.
///
/// Lookups take a shared read lock and run concurrently; every mutation
/// (`create`, `bind`, `delete`, `sweep_expired`) takes the exclusive write lock.
/// Hosts typically keep one registry in an `Arc` for the process lifetime.
#[derive(Debug)]
pub struct SessionRegistry {
    config: RegistryConfig,
    table: RwLock<SessionTable>,
}

impl SessionRegistry {
    /// Build a registry, rejecting configs that fail [`RegistryConfig::validate`].
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        if let Err(e) = config.validate() {
            tracing::warn!("Refusing session registry config: {}", e);
            return Err(e);
        }

        tracing::info!(
            "Creating session registry: cookie_name={}, ttl={}s",
            config.cookie_name,
            config.ttl.num_seconds()
        );

        Ok(Self {
            config,
            table: RwLock::new(SessionTable::new()),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Start a new session for `user_id` (use [`UserId::GUEST`] for anonymous visitors).
    ///
    /// No check is made for an existing session of the same user; call
    /// [`bind`](Self::bind) when one session per user is required.
    ///
    /// # Returns
    /// * `Result<String, RegistryError>` - The new token; `Crypto` if the OS random source
    ///   failed, `InvalidConfig` if the ttl pushes the expiry past the representable range
    pub async fn create(&self, user_id: UserId) -> Result<String, RegistryError> {
        let mut table = self.table.write().await;

        let expires_at = Utc::now()
            .checked_add_signed(self.config.ttl)
            .ok_or_else(|| {
                RegistryError::InvalidConfig(format!(
                    "ttl of {}s puts the expiry out of range",
                    self.config.ttl.num_seconds()
                ))
            })?;

        let token = loop {
            let candidate = generate_token(&self.config.secret)?;
            if !table.contains(&candidate) {
                break candidate;
            }
            tracing::warn!("Session token collision, regenerating");
        };

        table.insert(SessionRecord {
            token: token.clone(),
            expires_at,
            user_id,
        });

        tracing::debug!(
            "Created session {}... for user {} expiring at {}",
            token_prefix(&token),
            user_id,
            expires_at
        );
        Ok(token)
    }

    /// Find the live session carrying `token`.
    ///
    /// Expired records anywhere in the table are swept afterwards in a
    /// separate exclusive step. The expiry is never extended.
    ///
    /// # Returns
    /// * `Result<SessionRecord, RegistryError>` - A copy of the record, or `NotFound`
    pub async fn lookup_by_token(&self, token: &str) -> Result<SessionRecord, RegistryError> {
        let now = Utc::now();

        let (found, needs_sweep) = {
            let table = self.table.read().await;
            (table.get_live(token, now).cloned(), table.has_expired(now))
        };

        if needs_sweep {
            self.sweep_expired().await;
        }

        found.ok_or(RegistryError::NotFound)
    }

    /// Token of the live session bound to `user_id`. Guests are never found.
    pub async fn lookup_by_user(&self, user_id: UserId) -> Result<String, RegistryError> {
        self.table
            .read()
            .await
            .live_token_for_user(user_id, Utc::now())
            .map(str::to_string)
            .ok_or(RegistryError::NotFound)
    }

    /// Attach `user_id` to the session in `record`.
    ///
    /// Fails with `AlreadyBound` carrying the owner's token when another live
    /// session already belongs to `user_id`; nothing is changed in that case.
    /// On success both the registry entry and `record` carry the new user.
    /// A record that is no longer live yields `NotFound`.
    pub async fn bind(
        &self,
        record: &mut SessionRecord,
        user_id: UserId,
    ) -> Result<(), RegistryError> {
        let result = self
            .table
            .write()
            .await
            .bind(&record.token, user_id, Utc::now());

        match result {
            Ok(updated) => {
                tracing::debug!(
                    "Bound session {}... to user {}",
                    token_prefix(&updated.token),
                    user_id
                );
                *record = updated;
                Ok(())
            }
            Err(RegistryError::AlreadyBound { token }) => {
                tracing::debug!(
                    "User {} already owns session {}...",
                    user_id,
                    token_prefix(&token)
                );
                Err(RegistryError::AlreadyBound { token })
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the session `token`. Unknown tokens are ignored.
    pub async fn delete(&self, token: &str) {
        if self.table.write().await.remove(token).is_some() {
            tracing::debug!("Deleted session {}...", token_prefix(token));
        }
    }

    /// Remove every session whose expiry is at or before now.
    ///
    /// # Returns
    /// * `usize` - Number of sessions removed
    pub async fn sweep_expired(&self) -> usize {
        let removed = self.table.write().await.sweep(Utc::now());
        if removed > 0 {
            tracing::debug!("Swept {} expired sessions", removed);
        }
        removed
    }

    /// Number of sessions that have not expired yet.
    pub async fn live_count(&self) -> usize {
        self.table.read().await.live_count(Utc::now())
    }

    /// Cookie carrying the session token, for the transport layer to set.
    pub fn emit_cookie(&self, record: &SessionRecord) -> CookieSpec {
        CookieSpec {
            name: self.config.cookie_name.clone(),
            value: record.token.clone(),
            expires: record.expires_at,
        }
    }

    /// Cookie that makes the browser discard the session cookie on logout.
    pub fn expired_cookie(&self) -> CookieSpec {
        CookieSpec {
            name: self.config.cookie_name.clone(),
            value: String::new(),
            expires: Utc::now() - Duration::seconds(86400),
        }
    }
}
