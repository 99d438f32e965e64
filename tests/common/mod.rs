#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use tokio::sync::Mutex;
use tunehub::{
    Res,
    error::ApiResult,
    management::ConfigSaver,
    providers::{Messenger, ProviderDeps},
};

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Counts hits per path so tests can assert how many calls were made.
#[derive(Clone, Default)]
pub struct Hits(Arc<Mutex<HashMap<String, usize>>>);

impl Hits {
    pub async fn record(&self, path: &str) {
        *self.0.lock().await.entry(path.to_string()).or_default() += 1;
    }

    pub async fn get(&self, path: &str) -> usize {
        self.0.lock().await.get(path).copied().unwrap_or_default()
    }

    pub async fn total(&self) -> usize {
        self.0.lock().await.values().sum()
    }
}

/// Remembers every status line and host request.
#[derive(Default)]
pub struct RecordingMessenger {
    pub messages: Mutex<Vec<String>>,
    pub descriptions: Mutex<Vec<String>>,
    pub avatars: AtomicUsize,
}

impl RecordingMessenger {
    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, text: &str) -> Res<()> {
        self.messages.lock().await.push(text.to_string());
        Ok(())
    }

    async fn set_description(&self, text: &str) -> Res<()> {
        self.descriptions.lock().await.push(text.to_string());
        Ok(())
    }

    async fn set_avatar_url(&self, _url: &str) -> Res<()> {
        Ok(())
    }

    async fn upload_avatar(&self, _image: Vec<u8>) -> Res<()> {
        self.avatars.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_avatar(&self) -> Res<()> {
        Ok(())
    }
}

/// Keeps every persisted config, newest last.
#[derive(Default)]
pub struct MemorySaver {
    pub saved: Mutex<Vec<(String, Value)>>,
}

impl MemorySaver {
    pub async fn count(&self) -> usize {
        self.saved.lock().await.len()
    }

    pub async fn last(&self) -> Option<(String, Value)> {
        self.saved.lock().await.last().cloned()
    }
}

#[async_trait]
impl ConfigSaver for MemorySaver {
    async fn save(&self, entry_key: &str, config: Value) -> ApiResult<()> {
        self.saved.lock().await.push((entry_key.to_string(), config));
        Ok(())
    }
}

pub type Deps = (ProviderDeps, Arc<RecordingMessenger>, Arc<MemorySaver>);

pub fn deps() -> Deps {
    let messenger = Arc::new(RecordingMessenger::default());
    let saver = Arc::new(MemorySaver::default());
    let deps = ProviderDeps {
        messenger: messenger.clone(),
        saver: saver.clone(),
    };
    (deps, messenger, saver)
}
