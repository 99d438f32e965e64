//! # Provider Contract
//!
//! Every backend is addressed through [`MusicApi`]. Backends differ in auth
//! flow, JSON shape and URL conventions; the trait is the normalization
//! boundary and only [`Track`], [`PlayListMeta`], [`UserInfo`] and
//! [`MusicApiInputData`] leave it.
//!
//! ## Layout
//!
//! - [`registry`] - static table of known providers and config decoding
//! - [`pool`] - the configured, running provider instances with alias lookup
//! - [`netease`] / [`qq`] - the two concrete backends
//!
//! ## Collaborators
//!
//! Providers talk to the hosting runtime only through [`Messenger`] (status
//! lines, avatar and description changes) and persist credentials through
//! [`ConfigSaver`](crate::management::ConfigSaver).

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Res,
    error::ApiResult,
    management::ConfigSaver,
    types::{MusicApiInputData, PlayListMeta, PlayableUrl, ProviderKind, Track, UserInfo},
};

pub mod netease;
pub mod pool;
pub mod qq;
pub mod registry;

pub use pool::{ConfiguredProvider, ProviderPool};
pub use registry::{ApiContainer, ProviderRegistration, ProviderRegistry, ProviderSettings};

/// Listings above this size trigger a "may take time" notice.
pub const LARGE_LISTING_THRESHOLD: usize = 100;

/// Outbound side effects towards the hosting runtime.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, text: &str) -> Res<()>;

    async fn set_description(&self, text: &str) -> Res<()>;

    async fn set_avatar_url(&self, url: &str) -> Res<()>;

    async fn upload_avatar(&self, image: Vec<u8>) -> Res<()>;

    async fn delete_avatar(&self) -> Res<()>;
}

/// Messenger that discards everything.
pub struct SilentMessenger;

#[async_trait]
impl Messenger for SilentMessenger {
    async fn send_message(&self, _text: &str) -> Res<()> {
        Ok(())
    }

    async fn set_description(&self, _text: &str) -> Res<()> {
        Ok(())
    }

    async fn set_avatar_url(&self, _url: &str) -> Res<()> {
        Ok(())
    }

    async fn upload_avatar(&self, _image: Vec<u8>) -> Res<()> {
        Ok(())
    }

    async fn delete_avatar(&self) -> Res<()> {
        Ok(())
    }
}

/// Everything a provider constructor needs besides its own config.
#[derive(Clone)]
pub struct ProviderDeps {
    pub messenger: Arc<dyn Messenger>,
    pub saver: Arc<dyn ConfigSaver>,
}

/// The uniform backend contract.
#[async_trait]
pub trait MusicApi: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    fn key(&self) -> ProviderKind;

    fn default_alias(&self) -> &[&'static str];

    /// Substrings identifying links that belong to this backend.
    fn key_in_url(&self) -> &[&'static str];

    /// Tracks come back unpopulated; call [`Track::init_music_info`].
    async fn search_tracks(&self, keyword: &str, limit: u32, offset: u32) -> ApiResult<Vec<Track>>;

    async fn search_playlists(
        &self,
        keyword: &str,
        limit: u32,
        offset: u32,
    ) -> ApiResult<Vec<PlayListMeta>>;

    async fn search_albums(&self, keyword: &str, limit: u32, offset: u32)
    -> ApiResult<Vec<PlayListMeta>>;

    /// Full listing in backend order. `limit == 0` means no cap.
    async fn fetch_playlist(&self, id: &str, limit: usize) -> ApiResult<PlayListMeta>;

    async fn fetch_album(&self, id: &str, limit: usize) -> ApiResult<PlayListMeta>;

    async fn fetch_track(&self, id: &str) -> ApiResult<Track>;

    async fn resolve_playable_url(&self, track: &Track) -> ApiResult<PlayableUrl> {
        track.music_url().await
    }

    /// Pure and offline.
    fn classify_input(&self, input: &str) -> MusicApiInputData;

    /// Expected failures come back as status text; only transport errors fail.
    async fn login(&self, args: &[String]) -> ApiResult<String>;

    /// `None` when no session cookie is stored.
    async fn fetch_current_user(&self) -> ApiResult<Option<UserInfo>>;

    async fn api_server_url(&self) -> String;

    async fn reconfigure(&self, settings: ProviderSettings) -> ApiResult<()>;

    /// Stops the refresh task and closes the HTTP client. Idempotent.
    async fn shutdown(&self);
}

/// Host-side effects are best effort; a refusal is logged and otherwise ignored.
pub(crate) fn host_result(label: &str, result: Res<()>) {
    if let Err(e) = result {
        log::warn!("[{}] Host request failed: {}", label, e);
    }
}

pub(crate) async fn notify(messenger: &dyn Messenger, label: &str, text: &str) {
    host_result(label, messenger.send_message(text).await);
}

pub(crate) fn large_listing_notice(kind: &str, count: usize) -> String {
    format!("warning: large {}, may take time [{}]", kind, count)
}

pub(crate) fn progress_notice(start: usize, end: usize) -> String {
    format!("added tracks [{}-{}]", start, end)
}

/// Effective number of items given a backend total and a caller limit.
pub(crate) fn capped(total: usize, limit: usize) -> usize {
    if limit == 0 { total } else { total.min(limit) }
}
