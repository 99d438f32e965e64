use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    error::{ApiError, ApiResult},
    http::HttpClient,
    utils,
};

pub const COOKIE_HEADER: &str = "Cookie";
pub const USER_AGENT_HEADER: &str = "User-Agent";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0";

pub fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        (COOKIE_HEADER.to_string(), String::new()),
        (USER_AGENT_HEADER.to_string(), DEFAULT_USER_AGENT.to_string()),
    ])
}

/// The part of a provider configuration the session machinery relies on.
pub trait SessionConfig: Serialize + Clone + Send + Sync + 'static {
    fn api_server_url(&self) -> &str;
    fn refresh_cookie(&self) -> bool;
    fn cookie_update_interval_min(&self) -> u64;
    fn header(&self) -> &BTreeMap<String, String>;
    fn header_mut(&mut self) -> &mut BTreeMap<String, String>;

    fn cookie(&self) -> &str {
        self.header()
            .get(COOKIE_HEADER)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn set_cookie(&mut self, cookie: String) {
        self.header_mut().insert(COOKIE_HEADER.to_string(), cookie);
    }

    /// Never shorter than one minute.
    fn cookie_update_interval(&self) -> Duration {
        Duration::from_secs(self.cookie_update_interval_min().max(1).saturating_mul(60))
    }

    /// Restores the `Cookie` and `User-Agent` entries if a config file dropped them.
    fn normalize(&mut self) {
        let header = self.header_mut();
        header.entry(COOKIE_HEADER.to_string()).or_default();
        header
            .entry(USER_AGENT_HEADER.to_string())
            .or_insert_with(|| DEFAULT_USER_AGENT.to_string());
    }
}

/// Persistence seam. The config store implements it; providers call it after
/// every credential mutation.
#[async_trait]
pub trait ConfigSaver: Send + Sync {
    async fn save(&self, entry_key: &str, config: Value) -> ApiResult<()>;
}

/// Saver that drops everything, for embedding without durable storage.
pub struct NoopSaver;

#[async_trait]
impl ConfigSaver for NoopSaver {
    async fn save(&self, _entry_key: &str, _config: Value) -> ApiResult<()> {
        Ok(())
    }
}

/// Shared, lock-guarded provider configuration.
///
/// Foreground operations and the background cookie refresh both go through
/// this accessor. Every mutation swaps the config, re-points the HTTP client and
/// persists as one unit under the same lock, so a reconfigure and a refresh
/// can never interleave partial updates.
pub struct Session<C: SessionConfig> {
    entry_key: String,
    label: String,
    config: Mutex<C>,
    client: Arc<HttpClient>,
    saver: Arc<dyn ConfigSaver>,
}

impl<C: SessionConfig> Session<C> {
    pub fn new(
        entry_key: impl Into<String>,
        label: impl Into<String>,
        mut config: C,
        client: Arc<HttpClient>,
        saver: Arc<dyn ConfigSaver>,
    ) -> Self {
        config.normalize();
        Self {
            entry_key: entry_key.into(),
            label: label.into(),
            config: Mutex::new(config),
            client,
            saver,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// Copy of the current configuration.
    pub async fn snapshot(&self) -> C {
        self.config.lock().await.clone()
    }

    pub async fn cookie(&self) -> String {
        self.config.lock().await.cookie().to_string()
    }

    /// Applies `mutate` to a copy of the current config and commits it.
    pub async fn update<F>(&self, mutate: F) -> ApiResult<()>
    where
        F: FnOnce(&mut C),
    {
        let mut guard = self.config.lock().await;
        let mut next = guard.clone();
        mutate(&mut next);
        self.commit(&mut guard, next, true).await
    }

    pub async fn set_cookie(&self, cookie: String) -> ApiResult<()> {
        self.update(|c| c.set_cookie(cookie)).await
    }

    /// Merges fresh fragments into whatever cookie is stored at commit time.
    pub async fn merge_cookie(&self, fresh: &str) -> ApiResult<()> {
        self.update(|c| {
            let merged = utils::merge_cookie(c.cookie(), fresh);
            c.set_cookie(merged);
        })
        .await
    }

    /// Swaps in a configuration that came from storage. Not written back.
    pub async fn replace(&self, config: C) -> ApiResult<()> {
        let mut guard = self.config.lock().await;
        self.commit(&mut guard, config, false).await
    }

    async fn commit(&self, current: &mut C, mut next: C, persist: bool) -> ApiResult<()> {
        next.normalize();
        self.client.set_headers(next.header().clone()).await;
        self.client.set_base_url(next.api_server_url()).await;
        *current = next;

        if !persist {
            return Ok(());
        }
        let value = serde_json::to_value(&*current)
            .map_err(|e| ApiError::Config(format!("cannot serialize config: {}", e)))?;
        self.saver.save(&self.entry_key, value).await.inspect_err(|e| {
            log::error!("[{}] Failed to persist config: {}", self.label, e);
        })
    }
}
