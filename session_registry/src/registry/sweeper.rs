use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::errors::RegistryError;

use super::SessionRegistry;

/// Run [`SessionRegistry::sweep_expired`] every `period` on the tokio runtime.
///
/// The task holds only a weak reference and ends once the registry is dropped.
/// Abort the returned handle to stop it earlier.
pub fn spawn_expiry_sweeper(
    registry: &Arc<SessionRegistry>,
    period: Duration,
) -> Result<JoinHandle<()>, RegistryError> {
    if period.is_zero() {
        return Err(RegistryError::InvalidConfig(
            "sweep period must be positive".to_string(),
        ));
    }

    let registry = Arc::downgrade(registry);
    tracing::info!("Starting session expiry sweeper every {:?}", period);

    Ok(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !sweep_tick(&registry).await {
                tracing::debug!("Session registry dropped, stopping sweeper");
                break;
            }
        }
    }))
}

#[tracing::instrument(skip(registry))]
async fn sweep_tick(registry: &Weak<SessionRegistry>) -> bool {
    let Some(registry) = registry.upgrade() else {
        return false;
    };
    registry.sweep_expired().await;
    true
}
