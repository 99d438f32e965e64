//! TuneHub Library
//!
//! One provider interface in front of several music streaming backends. Each
//! backend is reached through its own self-hosted API server; this crate
//! normalizes search, playlist and album listings, track metadata, playable URL
//! resolution and login flows, and keeps every backend's session cookie fresh
//! in the background.
//!
//! # Modules
//!
//! - `cli` - Command-line operations built on the provider pool
//! - `config` - Environment loading and the persisted provider document
//! - `error` - Error taxonomy shared by all layers
//! - `http` - Provider-scoped HTTP client with redirect following
//! - `management` - Shared session state and the cookie refresh task
//! - `providers` - The provider contract, registry, pool and backends
//! - `types` - Tracks, playlists, users and input classification
//! - `utils` - Cookie and timestamp helpers
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tunehub::{config, providers::{ProviderDeps, ProviderPool, ProviderRegistry, SilentMessenger}};
//!
//! #[tokio::main]
//! async fn main() -> tunehub::Res<()> {
//!     config::load_env().await?;
//!     let registry = ProviderRegistry::standard();
//!     let store = Arc::new(config::ConfigStore::open(config::config_path(), &registry).await?);
//!     let deps = ProviderDeps { messenger: Arc::new(SilentMessenger), saver: store.clone() };
//!     let pool = ProviderPool::load(&registry, store.containers(&registry).await?, &deps).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod management;
pub mod providers;
pub mod types;
pub mod utils;

/// A convenient Result type alias for top-level glue code.
///
/// Library operations return [`error::ApiResult`]; this boxed variant is what
/// the binary and host-side collaborators (such as a `Messenger`) use, where
/// any error is simply reported.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Searching {} for {}", provider, keyword);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Found {} tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Terminates with exit code 1 right after printing. Only for fatal errors at
/// the top level of the binary; library code returns errors instead.
///
/// # Example
///
/// ```
/// error!("Cannot load configuration: {}", e);
/// // Program exits here
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues the operator should notice, such as a track
/// that has no playable URL.
///
/// # Example
///
/// ```
/// warning!("Track {} is not playable: {}", id, reason);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
