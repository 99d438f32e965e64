//! # CLI Module
//!
//! Operator-facing commands on top of the provider pool. Every command loads
//! the configured providers, runs one operation against them and prints the
//! result as a table or a status line.
//!
//! ## Commands
//!
//! - [`search`] - Keyword search for tracks, playlists or albums
//! - [`open`] - Classify a link or id and fetch what it points to
//! - [`play`] - Resolve a track to a playable URL
//! - [`login`] - Run a provider's login flow
//! - [`whoami`] - Show the account behind the stored session cookie
//! - [`providers`] - List configured providers and their aliases
//!
//! ## Usage Patterns
//!
//! ```bash
//! tunehub providers
//! tunehub search wy "blue bird" --kind playlist --limit 5
//! tunehub open "https://music.163.com/#/playlist?id=42" --limit 20
//! tunehub play qq 0039MnYb0qxYhV
//! tunehub login wy qr
//! ```
//!
//! Status lines the providers emit while working (large listing warnings,
//! progress, QR codes) are routed through [`ConsoleMessenger`].

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Res,
    config::{self, ConfigStore},
    error,
    providers::{MusicApi, ProviderDeps, ProviderPool, ProviderRegistry},
    types::{Track, TrackTableRow},
    warning,
};

mod account;
mod library;
mod messenger;
mod play;

pub use account::{login, providers, whoami};
pub use library::{SearchKind, open, search};
pub use messenger::ConsoleMessenger;
pub use play::play;

/// Everything a command needs: the registry, the backing store and the
/// running providers.
pub struct Context {
    pub registry: ProviderRegistry,
    pub store: Arc<ConfigStore>,
    pub pool: ProviderPool,
}

impl Context {
    pub async fn load() -> Res<Self> {
        let registry = ProviderRegistry::standard();
        let store = Arc::new(ConfigStore::open(config::config_path(), &registry).await?);
        let deps = ProviderDeps {
            messenger: Arc::new(ConsoleMessenger::new(config::data_dir())),
            saver: store.clone(),
        };
        let pool = ProviderPool::load(&registry, store.containers(&registry).await?, &deps).await?;

        Ok(Self {
            registry,
            store,
            pool,
        })
    }

    /// Looks a provider up by key, type, name or alias, exiting when none matches.
    pub async fn provider(&self, name: &str) -> Arc<dyn MusicApi> {
        match self.pool.select(name).await {
            Some(api) => api,
            None => error!(
                "Unknown provider '{}'. Run `tunehub providers` to list them.",
                name
            ),
        }
    }

    pub async fn shutdown(&self) {
        self.pool.shutdown_all().await;
    }
}

pub(crate) fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

/// Populates each track's metadata and converts it to a table row. Tracks
/// whose lookup fails are still listed, by id.
pub(crate) async fn track_rows(tracks: &mut [Track], pb: &ProgressBar) -> Vec<TrackTableRow> {
    let total = tracks.len();
    let mut rows = Vec::with_capacity(total);

    for (index, track) in tracks.iter_mut().enumerate() {
        pb.set_message(format!("Loading track details [{}/{}]...", index + 1, total));
        if let Err(e) = track.init_music_info().await {
            pb.suspend(|| warning!("Cannot load track {}. Err: {}", track.id, e));
        }
        rows.push(TrackTableRow {
            id: track.id.clone(),
            name: track.name.clone(),
            artists: track.author(),
        });
    }
    rows
}
