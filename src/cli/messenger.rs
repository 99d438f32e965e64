use std::path::PathBuf;

use async_trait::async_trait;

use crate::{Res, info, providers::Messenger};

const AVATAR_FILE: &str = "avatar.png";

/// Prints provider status lines and stores uploaded images (login QR codes)
/// as a file in the data directory.
pub struct ConsoleMessenger {
    dir: PathBuf,
}

impl ConsoleMessenger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn avatar_path(&self) -> PathBuf {
        self.dir.join(AVATAR_FILE)
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send_message(&self, text: &str) -> Res<()> {
        // data URLs are unreadable on a terminal; the image lands on disk instead
        if text.starts_with("data:") {
            return Ok(());
        }
        info!("{}", text);
        Ok(())
    }

    async fn set_description(&self, text: &str) -> Res<()> {
        info!("Description: {}", text);
        Ok(())
    }

    async fn set_avatar_url(&self, url: &str) -> Res<()> {
        if !url.is_empty() {
            info!("Cover: {}", url);
        }
        Ok(())
    }

    async fn upload_avatar(&self, image: Vec<u8>) -> Res<()> {
        async_fs::create_dir_all(&self.dir).await?;
        let path = self.avatar_path();
        async_fs::write(&path, image).await?;
        info!("Image saved to {}", path.display());
        Ok(())
    }

    async fn delete_avatar(&self) -> Res<()> {
        let path = self.avatar_path();
        if path.is_file() {
            async_fs::remove_file(&path).await?;
        }
        Ok(())
    }
}
