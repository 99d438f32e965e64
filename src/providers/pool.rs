use std::sync::Arc;

use tokio::sync::RwLock;

use super::{MusicApi, ProviderDeps, registry::{ApiContainer, ProviderRegistry}};
use crate::{error::ApiResult, types::MusicApiInputData};

/// A running provider paired with its config entry key and alias overrides.
#[derive(Clone)]
pub struct ConfiguredProvider {
    pub key: String,
    pub api: Arc<dyn MusicApi>,
    pub alias: Vec<String>,
}

impl ConfiguredProvider {
    pub fn new(key: impl Into<String>, api: Arc<dyn MusicApi>, alias: Vec<String>) -> Self {
        Self {
            key: key.into(),
            api,
            alias,
        }
    }

    /// Alias overrides when configured, otherwise the provider's defaults.
    pub fn aliases(&self) -> Vec<String> {
        if self.alias.is_empty() {
            self.api.default_alias().iter().map(|a| a.to_string()).collect()
        } else {
            self.alias.clone()
        }
    }

    /// Case-insensitive match on entry key, provider type, display name or alias.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return false;
        }
        name == self.key.to_lowercase()
            || name == self.api.key().as_str().to_lowercase()
            || name == self.api.name().to_lowercase()
            || self.aliases().iter().any(|a| a.to_lowercase() == name)
    }
}

/// The set of configured providers, replaced as a whole on config reload.
pub struct ProviderPool {
    providers: RwLock<Vec<ConfiguredProvider>>,
}

impl ProviderPool {
    pub fn new(providers: Vec<ConfiguredProvider>) -> Self {
        Self {
            providers: RwLock::new(providers),
        }
    }

    pub async fn load(
        registry: &ProviderRegistry,
        containers: Vec<ApiContainer>,
        deps: &ProviderDeps,
    ) -> ApiResult<Self> {
        Ok(Self::new(Self::build_all(registry, containers, deps).await?))
    }

    /// Instantiates every container, or none: on the first failure the
    /// providers already built are shut down.
    async fn build_all(
        registry: &ProviderRegistry,
        containers: Vec<ApiContainer>,
        deps: &ProviderDeps,
    ) -> ApiResult<Vec<ConfiguredProvider>> {
        let mut built = Vec::with_capacity(containers.len());
        for container in containers {
            match registry.instantiate(container, deps) {
                Ok(provider) => built.push(provider),
                Err(e) => {
                    for provider in built {
                        provider.api.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(built)
    }

    pub async fn list(&self) -> Vec<ConfiguredProvider> {
        self.providers.read().await.clone()
    }

    pub async fn select(&self, name: &str) -> Option<Arc<dyn MusicApi>> {
        self.providers
            .read()
            .await
            .iter()
            .find(|p| p.matches(name))
            .map(|p| Arc::clone(&p.api))
    }

    /// First provider whose URL marker occurs in `input`.
    pub async fn detect(&self, input: &str) -> Option<Arc<dyn MusicApi>> {
        self.providers
            .read()
            .await
            .iter()
            .find(|p| p.api.key_in_url().iter().any(|k| input.contains(k)))
            .map(|p| Arc::clone(&p.api))
    }

    /// Picks a provider (by name if given, else by URL detection) and classifies `input`.
    pub async fn resolve(
        &self,
        input: &str,
        provider: Option<&str>,
    ) -> Option<(Arc<dyn MusicApi>, MusicApiInputData)> {
        let api = match provider {
            Some(name) => self.select(name).await?,
            None => self.detect(input).await?,
        };
        let data = api.classify_input(input);
        Some((api, data))
    }

    /// Replaces the whole set with providers built from `containers`. Every
    /// new provider is built before anything is swapped; if one fails, the ones
    /// already built are shut down and the running set stays in place. On
    /// success the old providers are shut down before being dropped.
    pub async fn reload(
        &self,
        registry: &ProviderRegistry,
        containers: Vec<ApiContainer>,
        deps: &ProviderDeps,
    ) -> ApiResult<()> {
        let next = Self::build_all(registry, containers, deps).await?;
        let previous = std::mem::replace(&mut *self.providers.write().await, next);
        for stale in previous {
            log::debug!("[{}] Disposing provider {}", stale.api.name(), stale.key);
            stale.api.shutdown().await;
        }
        Ok(())
    }

    pub async fn shutdown_all(&self) {
        for provider in self.providers.write().await.drain(..) {
            provider.api.shutdown().await;
        }
    }
}
