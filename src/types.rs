use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::ApiResult;

/// Closed set of supported backends. The serialized form doubles as the
/// `Type` discriminator of a persisted configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "Netease")]
    Netease,
    #[serde(rename = "QQMusic")]
    QqMusic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Netease, ProviderKind::QqMusic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Netease => "Netease",
            ProviderKind::QqMusic => "QQMusic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "netease" => Ok(ProviderKind::Netease),
            "qqmusic" => Ok(ProviderKind::QqMusic),
            _ => Err(format!(
                "Unsupported provider type: '{}'. Valid: Netease, QQMusic",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MusicUrlType {
    #[default]
    None,
    Music,
    PlayList,
    Album,
    /// A bare identifier with no declared kind.
    Number,
}

/// Result of classifying a user supplied string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MusicApiInputData {
    pub kind: MusicUrlType,
    pub id: String,
    pub url: String,
}

impl MusicApiInputData {
    pub fn new(kind: MusicUrlType, id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            url: url.into(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == MusicUrlType::None
    }
}

impl fmt::Display for MusicApiInputData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type: {:?}, Id: {}, Url: {}", self.kind, self.id, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Subscription tier and expiry, free-form.
    pub extra: String,
}

/// Outcome of resolving a track to something playable. An access-restricted
/// track is an expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayableUrl {
    Ready(String),
    Unavailable(String),
}

impl PlayableUrl {
    pub fn url(&self) -> Option<&str> {
        match self {
            PlayableUrl::Ready(url) => Some(url),
            PlayableUrl::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PlayableUrl::Ready(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub id: Option<String>,
}

/// Metadata a backend returns for one track.
#[derive(Debug, Clone, Default)]
pub struct TrackDetails {
    pub name: String,
    pub image: String,
    pub detail_url: String,
    pub authors: Vec<Author>,
}

/// Backend operations a [`Track`] needs to populate and resolve itself.
#[async_trait]
pub trait TrackSource: Send + Sync {
    fn artist_url(&self, artist_id: &str) -> String;

    async fn track_details(&self, id: &str) -> ApiResult<TrackDetails>;

    async fn playable_url(&self, id: &str) -> ApiResult<PlayableUrl>;

    async fn fetch_bytes(&self, url: &str) -> ApiResult<Vec<u8>>;
}

/// A single track. Metadata is fetched lazily by [`Track::init_music_info`].
#[derive(Clone)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub image: String,
    pub detail_url: String,
    /// Obtained as part of a bulk listing rather than directly.
    pub in_playlist: bool,
    pub authors: Vec<Author>,
    source: Arc<dyn TrackSource>,
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("image", &self.image)
            .field("detail_url", &self.detail_url)
            .field("in_playlist", &self.in_playlist)
            .field("authors", &self.authors)
            .finish()
    }
}

impl Track {
    pub fn new(source: Arc<dyn TrackSource>, id: impl Into<String>, in_playlist: bool) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            image: String::new(),
            detail_url: String::new(),
            in_playlist,
            authors: Vec::new(),
            source,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.name.is_empty() && !self.image.is_empty()
    }

    /// Populates name, image, detail URL and authors. No-op once populated.
    pub async fn init_music_info(&mut self) -> ApiResult<()> {
        if self.is_initialized() {
            return Ok(());
        }

        let details = self.source.track_details(&self.id).await?;
        self.name = details.name;
        self.image = details.image;
        self.detail_url = details.detail_url;
        self.authors = details
            .authors
            .into_iter()
            .filter(|a| !a.name.is_empty())
            .collect();
        Ok(())
    }

    pub async fn music_url(&self) -> ApiResult<PlayableUrl> {
        self.source.playable_url(&self.id).await
    }

    pub async fn fetch_image(&self) -> ApiResult<Vec<u8>> {
        self.source.fetch_bytes(&self.image).await
    }

    pub fn author(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn full_name(&self) -> String {
        let author = self.author();
        if author.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, author)
        }
    }

    pub fn artist_url(&self, artist_id: &str) -> String {
        self.source.artist_url(artist_id)
    }
}

/// A playlist or album. `music_list` is `None` for search summaries.
#[derive(Debug, Clone)]
pub struct PlayListMeta {
    pub id: String,
    pub url: String,
    pub name: String,
    pub image: String,
    pub music_list: Option<Vec<Track>>,
}

impl PlayListMeta {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        image: impl Into<String>,
        music_list: Option<Vec<Track>>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            name: name.into(),
            image: image.into(),
            music_list,
        }
    }

    pub fn len(&self) -> usize {
        self.music_list.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub id: String,
    pub name: String,
    pub artists: String,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Tabled)]
pub struct ProviderTableRow {
    pub key: String,
    pub name: String,
    pub aliases: String,
    pub server: String,
}
