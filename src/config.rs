//! Configuration loading and persistence.
//!
//! Two sources are involved:
//! 1. A `.env` file in the local data directory, loaded into the process
//!    environment before anything else.
//! 2. The provider document (`providers.json`), one `{ Type, Config, Alias? }`
//!    entry per configured backend.
//!
//! The document lives next to the `.env` file unless `TUNEHUB_CONFIG` points
//! somewhere else:
//! - Linux: `~/.local/share/tunehub/providers.json`
//! - macOS: `~/Library/Application Support/tunehub/providers.json`
//! - Windows: `%LOCALAPPDATA%/tunehub/providers.json`

use std::{
    env,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{
    error::{ApiError, ApiResult},
    management::ConfigSaver,
    providers::{ApiContainer, ProviderRegistry, ProviderSettings},
};

pub const APP_DIR: &str = "tunehub";
pub const CONFIG_FILE: &str = "providers.json";
pub const CONFIG_PATH_ENV: &str = "TUNEHUB_CONFIG";

/// Platform local data directory joined with the application folder.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Loads `.env` from the data directory if present. A missing file is not an
/// error; every setting has a default.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// `TUNEHUB_CONFIG` if set, otherwise `providers.json` in [`data_dir`].
pub fn config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join(CONFIG_FILE))
}

/// One default entry per registered provider, keyed by the lowercased type.
pub fn default_document(registry: &ProviderRegistry) -> ApiResult<Value> {
    let mut entries = Map::new();
    for kind in registry.kinds() {
        let container = ApiContainer {
            key: kind.as_str().to_lowercase(),
            settings: ProviderSettings::default_for(kind),
            alias: Vec::new(),
        };
        entries.insert(container.key.clone(), container.to_value()?);
    }
    Ok(Value::Object(entries))
}

async fn write_document(path: &Path, document: &Value) -> ApiResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| ApiError::Config(format!("cannot create {}: {}", parent.display(), e)))?;
    }

    let text = serde_json::to_string_pretty(document)
        .map_err(|e| ApiError::Config(format!("cannot serialize configuration: {}", e)))?;
    async_fs::write(path, text)
        .await
        .map_err(|e| ApiError::Config(format!("cannot write {}: {}", path.display(), e)))
}

async fn read_document(path: &Path) -> ApiResult<Option<Value>> {
    match async_fs::read_to_string(path).await {
        Ok(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ApiError::Config(format!("cannot parse {}: {}", path.display(), e))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ApiError::Config(format!("cannot read {}: {}", path.display(), e))),
    }
}

/// The provider document held in memory and mirrored to disk.
///
/// Providers never touch the file directly: they hand their serialized config
/// to [`ConfigSaver::save`] and the store rewrites their entry.
pub struct ConfigStore {
    path: PathBuf,
    document: Mutex<Value>,
}

impl ConfigStore {
    /// Reads the document at `path`, creating it from defaults when missing.
    pub async fn open(path: impl Into<PathBuf>, registry: &ProviderRegistry) -> ApiResult<Self> {
        let path = path.into();
        let document = match read_document(&path).await? {
            Some(document) => document,
            None => {
                let document = default_document(registry)?;
                write_document(&path, &document).await?;
                log::info!("Created default configuration at {}", path.display());
                document
            }
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn document(&self) -> Value {
        self.document.lock().await.clone()
    }

    /// Decodes every entry. Fails on the first bad one.
    pub async fn containers(&self, registry: &ProviderRegistry) -> ApiResult<Vec<ApiContainer>> {
        registry.decode_document(&*self.document.lock().await)
    }

    /// Re-reads the file, e.g. after an operator edited it by hand.
    pub async fn reload(&self) -> ApiResult<()> {
        let document = read_document(&self.path)
            .await?
            .ok_or_else(|| ApiError::Config(format!("{} disappeared", self.path.display())))?;
        *self.document.lock().await = document;
        Ok(())
    }
}

#[async_trait]
impl ConfigSaver for ConfigStore {
    async fn save(&self, entry_key: &str, config: Value) -> ApiResult<()> {
        let mut document = self.document.lock().await;
        let entries = document
            .as_object_mut()
            .ok_or_else(|| ApiError::Config("configuration document is not an object".into()))?;

        let entry = entries
            .entry(entry_key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry.as_object_mut() {
            Some(object) => {
                object.insert("Config".into(), config);
            }
            None => {
                return Err(ApiError::Config(format!("entry {} is not an object", entry_key)));
            }
        }

        write_document(&self.path, &document).await
    }
}
