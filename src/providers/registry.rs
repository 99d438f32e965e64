use std::sync::Arc;

use serde_json::Value;

use super::{
    MusicApi, ProviderDeps,
    netease::{self, NeteaseConfig},
    pool::ConfiguredProvider,
    qq::{self, QqMusicConfig},
};
use crate::{
    error::{ApiError, ApiResult},
    types::ProviderKind,
};

/// Decoded provider configuration, one variant per known backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSettings {
    Netease(NeteaseConfig),
    QqMusic(QqMusicConfig),
}

impl ProviderSettings {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSettings::Netease(_) => ProviderKind::Netease,
            ProviderSettings::QqMusic(_) => ProviderKind::QqMusic,
        }
    }

    pub fn default_for(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Netease => ProviderSettings::Netease(NeteaseConfig::default()),
            ProviderKind::QqMusic => ProviderSettings::QqMusic(QqMusicConfig::default()),
        }
    }

    /// Decodes `payload` with the configuration shape declared for `kind`.
    pub fn decode(kind: ProviderKind, payload: Value) -> ApiResult<Self> {
        let invalid = |e: serde_json::Error| ApiError::Config(format!("invalid {} config: {}", kind, e));
        match kind {
            ProviderKind::Netease => serde_json::from_value(payload)
                .map(ProviderSettings::Netease)
                .map_err(invalid),
            ProviderKind::QqMusic => serde_json::from_value(payload)
                .map(ProviderSettings::QqMusic)
                .map_err(invalid),
        }
    }

    pub fn to_value(&self) -> ApiResult<Value> {
        let value = match self {
            ProviderSettings::Netease(c) => serde_json::to_value(c),
            ProviderSettings::QqMusic(c) => serde_json::to_value(c),
        };
        value.map_err(|e| ApiError::Config(format!("cannot serialize {} config: {}", self.kind(), e)))
    }
}

/// One decoded entry of the persisted configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiContainer {
    pub key: String,
    pub settings: ProviderSettings,
    pub alias: Vec<String>,
}

impl ApiContainer {
    pub fn kind(&self) -> ProviderKind {
        self.settings.kind()
    }

    /// The persisted `{ Type, Config, Alias }` form.
    pub fn to_value(&self) -> ApiResult<Value> {
        let mut entry = serde_json::Map::new();
        entry.insert("Type".into(), Value::String(self.kind().to_string()));
        entry.insert("Config".into(), self.settings.to_value()?);
        if !self.alias.is_empty() {
            entry.insert(
                "Alias".into(),
                Value::Array(self.alias.iter().cloned().map(Value::String).collect()),
            );
        }
        Ok(Value::Object(entry))
    }
}

pub type BuildFn = fn(&str, ProviderSettings, &ProviderDeps) -> ApiResult<Arc<dyn MusicApi>>;

pub struct ProviderRegistration {
    pub kind: ProviderKind,
    pub build: BuildFn,
}

/// Immutable table of known providers, built once at startup and passed to
/// whatever constructs provider instances.
pub struct ProviderRegistry {
    registrations: Vec<ProviderRegistration>,
}

impl ProviderRegistry {
    pub fn new(registrations: Vec<ProviderRegistration>) -> Self {
        Self { registrations }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            ProviderRegistration {
                kind: ProviderKind::Netease,
                build: netease::build,
            },
            ProviderRegistration {
                kind: ProviderKind::QqMusic,
                build: qq::build,
            },
        ])
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.registrations.iter().map(|r| r.kind)
    }

    pub fn is_registered(&self, kind: ProviderKind) -> bool {
        self.registrations.iter().any(|r| r.kind == kind)
    }

    /// Decodes one `{ Type, Config, Alias? }` entry.
    pub fn decode_entry(&self, key: &str, entry: &Value) -> ApiResult<ApiContainer> {
        let object = entry
            .as_object()
            .ok_or_else(|| ApiError::Config(format!("entry {} is not an object", key)))?;

        let discriminator = object
            .get("Type")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Config(format!("No Type field in entry {}", key)))?;
        let kind: ProviderKind = discriminator
            .parse()
            .map_err(|e: String| ApiError::Config(e))?;
        if !self.is_registered(kind) {
            return Err(ApiError::Config(format!("No provider registered for type {}", kind)));
        }

        let payload = match object.get("Config") {
            Some(Value::Null) | None => {
                return Err(ApiError::Config(format!("No Config field in entry {}", key)));
            }
            Some(payload) => payload.clone(),
        };
        let settings = ProviderSettings::decode(kind, payload)?;

        let alias = match object.get("Alias") {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value::<Vec<String>>(value.clone())
                .map_err(|e| ApiError::Config(format!("invalid Alias in entry {}: {}", key, e)))?,
        };

        Ok(ApiContainer {
            key: key.to_string(),
            settings,
            alias,
        })
    }

    /// Decodes the whole document. Fails on the first bad entry.
    pub fn decode_document(&self, document: &Value) -> ApiResult<Vec<ApiContainer>> {
        let entries = document
            .as_object()
            .ok_or_else(|| ApiError::Config("configuration document is not an object".into()))?;
        entries
            .iter()
            .map(|(key, entry)| self.decode_entry(key, entry))
            .collect()
    }

    pub fn instantiate(&self, container: ApiContainer, deps: &ProviderDeps) -> ApiResult<ConfiguredProvider> {
        let registration = self
            .registrations
            .iter()
            .find(|r| r.kind == container.kind())
            .ok_or_else(|| {
                ApiError::Config(format!("No provider registered for type {}", container.kind()))
            })?;

        let api = (registration.build)(&container.key, container.settings, deps)?;
        Ok(ConfiguredProvider::new(container.key, api, container.alias))
    }
}
