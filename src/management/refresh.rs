use std::sync::Arc;

use async_trait::async_trait;
use tokio::{sync::Mutex, task::JoinHandle};

use super::session::{Session, SessionConfig};
use crate::{error::ApiResult, utils};

/// What a backend's session-refresh endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Raw cookie material to merge into the stored cookie.
    Refreshed(String),
    /// Well-formed response reporting failure; kept for the log line.
    Rejected(String),
}

/// Backend specific call to the session-refresh endpoint.
#[async_trait]
pub trait CookieRefresh: Send + Sync + 'static {
    async fn refresh(&self) -> ApiResult<RefreshOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Skipped,
    Updated,
    Rejected,
    Failed,
}

/// Recurring per-provider cookie refresh.
///
/// Fires immediately, then sleeps for the interval found in the *current*
/// config after each tick. Each tick is independent: errors are logged and
/// swallowed so the task never ends on its own.
pub struct CookieRefresher {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CookieRefresher {
    pub fn spawn<C: SessionConfig>(session: Arc<Session<C>>, refresh: Arc<dyn CookieRefresh>) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                Self::tick(&session, refresh.as_ref()).await;
                let period = session.snapshot().await.cookie_update_interval();
                tokio::time::sleep(period).await;
            }
        });

        Self {
            handle: Mutex::new(Some(handle)),
        }
    }

    pub async fn tick<C: SessionConfig>(session: &Session<C>, refresh: &dyn CookieRefresh) -> TickOutcome {
        let config = session.snapshot().await;
        if !config.refresh_cookie() || config.cookie().is_empty() {
            return TickOutcome::Skipped;
        }

        match refresh.refresh().await {
            Ok(RefreshOutcome::Refreshed(raw)) => {
                match session.merge_cookie(&utils::process_cookie(&raw)).await {
                    Ok(()) => {
                        log::info!("[{}] Cookie update success", session.label());
                        TickOutcome::Updated
                    }
                    Err(e) => {
                        log::error!("[{}] Cookie update error: {}", session.label(), e);
                        TickOutcome::Failed
                    }
                }
            }
            Ok(RefreshOutcome::Rejected(detail)) => {
                log::warn!("[{}] Cookie update failed: {}", session.label(), detail);
                TickOutcome::Rejected
            }
            Err(e) => {
                log::error!("[{}] Cookie update error: {}", session.label(), e);
                TickOutcome::Failed
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Cancels the task. Safe to call more than once.
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }
}

impl Drop for CookieRefresher {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
