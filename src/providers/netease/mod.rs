//! Netease Cloud Music, spoken to through a self-hosted API server.

use std::{
    collections::BTreeMap,
    sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    LARGE_LISTING_THRESHOLD, Messenger, MusicApi, ProviderDeps, ProviderSettings, capped,
    host_result, large_listing_notice, notify, progress_notice,
};
use crate::{
    error::{ApiError, ApiResult},
    http::{HttpClient, RawResponse},
    management::{CookieRefresh, CookieRefresher, RefreshOutcome, Session, SessionConfig, default_headers},
    types::{
        Author, MusicApiInputData, MusicUrlType, PlayListMeta, PlayableUrl, ProviderKind, Track,
        TrackDetails, TrackSource, UserInfo,
    },
    utils,
};

mod login;
pub mod models;

use models::{
    AlbumResponse, CodeCookie, ErrorBody, PlaylistDetailResponse, SearchResponse, SearchResult,
    SongDetailResponse, SongUrlResponse, TrackListResponse,
};

pub const NAME: &str = "Netease";
pub const DEFAULT_API_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_ALIAS: &[&str] = &["n", "wy", "wyy"];
pub const KEY_IN_URL: &[&str] = &["163.com"];

/// Largest page requested from `/playlist/track/all`.
const PAGE_SIZE: usize = 50;

static ID_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id=(\d+)").expect("id pattern is valid"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NeteaseConfig {
    pub api_server_url: String,
    pub refresh_cookie: bool,
    pub cookie_update_interval_min: u64,
    pub header: BTreeMap<String, String>,
    pub qr_poll_interval_secs: u64,
    pub qr_poll_max_attempts: u32,
}

impl Default for NeteaseConfig {
    fn default() -> Self {
        Self {
            api_server_url: DEFAULT_API_SERVER_URL.to_string(),
            refresh_cookie: false,
            cookie_update_interval_min: 30,
            header: default_headers(),
            qr_poll_interval_secs: 1,
            qr_poll_max_attempts: 120,
        }
    }
}

impl SessionConfig for NeteaseConfig {
    fn api_server_url(&self) -> &str {
        &self.api_server_url
    }

    fn refresh_cookie(&self) -> bool {
        self.refresh_cookie
    }

    fn cookie_update_interval_min(&self) -> u64 {
        self.cookie_update_interval_min
    }

    fn header(&self) -> &BTreeMap<String, String> {
        &self.header
    }

    fn header_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.header
    }
}

fn song_url(id: &str) -> String {
    format!("https://music.163.com/#/song?id={}", id)
}

fn playlist_url(id: &str) -> String {
    format!("https://music.163.com/#/playlist?id={}", id)
}

fn album_url(id: &str) -> String {
    format!("https://music.163.com/#/album?id={}", id)
}

/// Non-2xx answers carry `{ code, message }`; keep both for the operator.
fn classify_response(raw: &RawResponse) -> Option<ApiError> {
    if raw.status.is_success() {
        return None;
    }

    let status = raw.status.as_u16();
    let message = match serde_json::from_slice::<ErrorBody>(&raw.body) {
        Ok(ErrorBody {
            code,
            message: Some(message),
        }) => format!("{}: {}", code, message),
        Ok(ErrorBody { code, message: None }) => format!("{}: {}", code, raw.text()),
        Err(_) => raw.text(),
    };
    Some(ApiError::backend(status, message))
}

/// Extracts the numeric `id=` parameter, or returns the input unchanged.
fn extract_id(input: &str) -> String {
    ID_PARAM
        .captures(input)
        .and_then(|c| c.get(1))
        .map_or_else(|| input.to_string(), |m| m.as_str().to_string())
}

pub fn classify(input: &str) -> MusicApiInputData {
    let kind = if input.contains("playlist") {
        MusicUrlType::PlayList
    } else if input.contains("song") {
        MusicUrlType::Music
    } else if input.contains("album") {
        MusicUrlType::Album
    } else if utils::is_number(input) {
        return MusicApiInputData::new(MusicUrlType::Number, input, "");
    } else {
        return MusicApiInputData::default();
    };
    MusicApiInputData::new(kind, extract_id(input), input)
}

/// Per-track lookups, shared by every [`Track`] this provider hands out.
pub struct NeteaseTracks {
    client: Arc<HttpClient>,
}

#[async_trait]
impl TrackSource for NeteaseTracks {
    fn artist_url(&self, artist_id: &str) -> String {
        format!("https://music.163.com/#/artist?id={}", artist_id)
    }

    async fn track_details(&self, id: &str) -> ApiResult<TrackDetails> {
        let detail: SongDetailResponse = self.client.get_json("/song/detail", &[("ids", id)]).await?;
        let song = detail
            .songs
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Malformed(format!("no detail for song {}", id)))?;

        let authors = song
            .ar
            .into_iter()
            .filter_map(|artist| {
                artist.name.map(|name| Author {
                    name,
                    id: (artist.id > 0).then(|| artist.id.to_string()),
                })
            })
            .collect();

        Ok(TrackDetails {
            name: song.name,
            image: song.al.and_then(|al| al.pic_url).unwrap_or_default(),
            detail_url: song_url(id),
            authors,
        })
    }

    async fn playable_url(&self, id: &str) -> ApiResult<PlayableUrl> {
        let response: SongUrlResponse = self.client.get_json("/song/url", &[("id", id)]).await?;
        let entry = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Malformed(format!("no url entry for song {}", id)))?;

        if entry.free_trial_info.is_some() {
            return Ok(PlayableUrl::Unavailable("VIP track".to_string()));
        }
        match entry.url {
            Some(url) if !url.is_empty() => Ok(PlayableUrl::Ready(url)),
            _ => Ok(PlayableUrl::Unavailable("no playable url".to_string())),
        }
    }

    async fn fetch_bytes(&self, url: &str) -> ApiResult<Vec<u8>> {
        self.client.get_bytes(url).await
    }
}

struct NeteaseRefresh {
    client: Arc<HttpClient>,
}

#[async_trait]
impl CookieRefresh for NeteaseRefresh {
    async fn refresh(&self) -> ApiResult<RefreshOutcome> {
        let raw = self.client.get_response("/login/refresh", &[]).await?;
        let body: CodeCookie = raw.json()?;
        if body.code == 200 {
            Ok(RefreshOutcome::Refreshed(body.cookie.unwrap_or_default()))
        } else {
            Ok(RefreshOutcome::Rejected(raw.text()))
        }
    }
}

pub struct NeteaseMusic {
    session: Arc<Session<NeteaseConfig>>,
    tracks: Arc<NeteaseTracks>,
    messenger: Arc<dyn Messenger>,
    refresher: CookieRefresher,
}

impl NeteaseMusic {
    /// Builds the client and session and starts the cookie refresh task.
    /// Must be called inside a tokio runtime.
    pub fn new(entry_key: &str, mut config: NeteaseConfig, deps: &ProviderDeps) -> ApiResult<Self> {
        config.normalize();
        let client = Arc::new(
            HttpClient::builder(config.api_server_url.clone())
                .headers(config.header.clone())
                .auto_timestamp(true)
                .classifier(Arc::new(classify_response))
                .label(NAME)
                .build()?,
        );

        let session = Arc::new(Session::new(
            entry_key,
            NAME,
            config,
            Arc::clone(&client),
            Arc::clone(&deps.saver),
        ));
        let refresher = CookieRefresher::spawn(
            Arc::clone(&session),
            Arc::new(NeteaseRefresh {
                client: Arc::clone(&client),
            }),
        );

        Ok(Self {
            session,
            tracks: Arc::new(NeteaseTracks { client }),
            messenger: Arc::clone(&deps.messenger),
            refresher,
        })
    }

    pub fn session(&self) -> &Arc<Session<NeteaseConfig>> {
        &self.session
    }

    fn client(&self) -> &HttpClient {
        self.session.client()
    }

    fn track(&self, id: &str, in_playlist: bool) -> Track {
        Track::new(self.tracks.clone(), id, in_playlist)
    }

    fn tracks_from_ids(&self, ids: impl IntoIterator<Item = i64>) -> Vec<Track> {
        ids.into_iter()
            .map(|id| self.track(&id.to_string(), true))
            .collect()
    }

    async fn search(&self, keyword: &str, kind: Option<&str>, limit: u32, offset: u32) -> ApiResult<SearchResult> {
        let (limit, offset) = (limit.to_string(), offset.to_string());
        let mut params = vec![("keywords", keyword), ("limit", limit.as_str()), ("offset", offset.as_str())];
        if let Some(kind) = kind {
            params.push(("type", kind));
        }
        let response: SearchResponse = self.client().get_json("/search", &params).await?;
        Ok(response.result.unwrap_or_default())
    }

    /// Requests `total` ids in pages of at most [`PAGE_SIZE`], strictly in offset order.
    async fn paged_track_ids(&self, id: &str, total: usize) -> ApiResult<Vec<i64>> {
        let page = total.min(PAGE_SIZE);
        let mut ids = Vec::with_capacity(total);
        let mut offset = 0;

        while offset < total {
            let size = page.min(total - offset);
            let (limit, start) = (size.to_string(), offset.to_string());
            let response: TrackListResponse = self
                .client()
                .get_json(
                    "/playlist/track/all",
                    &[("id", id), ("limit", limit.as_str()), ("offset", start.as_str())],
                )
                .await?;
            if response.songs.is_empty() {
                log::debug!("[{}] Playlist {} ended early at {}", NAME, id, offset);
                break;
            }

            let fetched = response.songs.len().min(size);
            ids.extend(response.songs.into_iter().take(size).map(|s| s.id));
            offset += fetched;
            notify(self.messenger.as_ref(), NAME, &progress_notice(offset, total)).await;
        }
        Ok(ids)
    }
}

pub fn build(entry_key: &str, settings: ProviderSettings, deps: &ProviderDeps) -> ApiResult<Arc<dyn MusicApi>> {
    match settings {
        ProviderSettings::Netease(config) => Ok(Arc::new(NeteaseMusic::new(entry_key, config, deps)?)),
        other => Err(ApiError::Config(format!(
            "{} cannot be built from {} settings",
            NAME,
            other.kind()
        ))),
    }
}

#[async_trait]
impl MusicApi for NeteaseMusic {
    fn name(&self) -> &str {
        NAME
    }

    fn key(&self) -> ProviderKind {
        ProviderKind::Netease
    }

    fn default_alias(&self) -> &[&'static str] {
        DEFAULT_ALIAS
    }

    fn key_in_url(&self) -> &[&'static str] {
        KEY_IN_URL
    }

    async fn search_tracks(&self, keyword: &str, limit: u32, offset: u32) -> ApiResult<Vec<Track>> {
        let result = self.search(keyword, None, limit, offset).await?;
        Ok(result
            .songs
            .into_iter()
            .map(|song| self.track(&song.id.to_string(), false))
            .collect())
    }

    async fn search_playlists(&self, keyword: &str, limit: u32, offset: u32) -> ApiResult<Vec<PlayListMeta>> {
        let result = self.search(keyword, Some("1000"), limit, offset).await?;
        Ok(result
            .playlists
            .into_iter()
            .map(|p| {
                let id = p.id.to_string();
                PlayListMeta::new(id.clone(), p.name, playlist_url(&id), p.cover_img_url, None)
            })
            .collect())
    }

    async fn search_albums(&self, keyword: &str, limit: u32, offset: u32) -> ApiResult<Vec<PlayListMeta>> {
        let result = self.search(keyword, Some("10"), limit, offset).await?;
        Ok(result
            .albums
            .into_iter()
            .map(|a| {
                let id = a.id.to_string();
                PlayListMeta::new(id.clone(), a.name, album_url(&id), a.pic_url, None)
            })
            .collect())
    }

    async fn fetch_playlist(&self, id: &str, limit: usize) -> ApiResult<PlayListMeta> {
        let detail: PlaylistDetailResponse = self.client().get_json("/playlist/detail", &[("id", id)]).await?;
        let playlist = detail.playlist;

        host_result(NAME, self.messenger.set_description(&playlist.name).await);
        host_result(NAME, self.messenger.set_avatar_url(&playlist.cover_img_url).await);
        notify(
            self.messenger.as_ref(),
            NAME,
            &format!("start adding playlist [{}]", playlist.name),
        )
        .await;

        let ids = if playlist.track_count == 0 {
            // no count reported: one unpaged listing
            let response: TrackListResponse = self.client().get_json("/playlist/track/all", &[("id", id)]).await?;
            let valid = response.songs.into_iter().map(|s| s.id).filter(|id| *id > 0).collect::<Vec<_>>();
            let count = capped(valid.len(), limit);
            if count > LARGE_LISTING_THRESHOLD {
                notify(self.messenger.as_ref(), NAME, &large_listing_notice("playlist", count)).await;
            }
            let ids = valid.into_iter().take(count).collect::<Vec<_>>();
            notify(self.messenger.as_ref(), NAME, &progress_notice(ids.len(), count)).await;
            ids
        } else {
            let total = capped(playlist.track_count, limit);
            if total > LARGE_LISTING_THRESHOLD {
                notify(self.messenger.as_ref(), NAME, &large_listing_notice("playlist", total)).await;
            }
            self.paged_track_ids(id, total).await?
        };

        Ok(PlayListMeta::new(
            id,
            playlist.name,
            playlist_url(id),
            playlist.cover_img_url,
            Some(self.tracks_from_ids(ids)),
        ))
    }

    async fn fetch_album(&self, id: &str, limit: usize) -> ApiResult<PlayListMeta> {
        let response: AlbumResponse = self.client().get_json("/album", &[("id", id)]).await?;
        let valid = response.songs.into_iter().map(|s| s.id).filter(|id| *id > 0).collect::<Vec<_>>();
        let count = capped(valid.len(), limit);
        if count > LARGE_LISTING_THRESHOLD {
            notify(self.messenger.as_ref(), NAME, &large_listing_notice("album", count)).await;
        }

        let tracks = self.tracks_from_ids(valid.into_iter().take(count));
        Ok(PlayListMeta::new(
            id,
            response.album.name,
            album_url(id),
            response.album.pic_url,
            Some(tracks),
        ))
    }

    async fn fetch_track(&self, id: &str) -> ApiResult<Track> {
        Ok(self.track(id, false))
    }

    fn classify_input(&self, input: &str) -> MusicApiInputData {
        classify(input)
    }

    async fn login(&self, args: &[String]) -> ApiResult<String> {
        self.dispatch_login(args).await
    }

    async fn fetch_current_user(&self) -> ApiResult<Option<UserInfo>> {
        self.current_user().await
    }

    async fn api_server_url(&self) -> String {
        self.session.snapshot().await.api_server_url
    }

    async fn reconfigure(&self, settings: ProviderSettings) -> ApiResult<()> {
        match settings {
            ProviderSettings::Netease(config) => self.session.replace(config).await,
            other => Err(ApiError::Config(format!(
                "{} cannot be reconfigured with {} settings",
                NAME,
                other.kind()
            ))),
        }
    }

    async fn shutdown(&self) {
        self.refresher.stop().await;
        self.client().shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_links_by_marker() {
        let data = classify("https://music.163.com/#/playlist?id=42");
        assert_eq!(data.kind, MusicUrlType::PlayList);
        assert_eq!(data.id, "42");
        assert_eq!(data.url, "https://music.163.com/#/playlist?id=42");

        let data = classify("https://music.163.com/song?id=186016&userid=1");
        assert_eq!(data.kind, MusicUrlType::Music);
        assert_eq!(data.id, "186016");

        let data = classify("https://music.163.com/#/album?id=18905");
        assert_eq!(data.kind, MusicUrlType::Album);
        assert_eq!(data.id, "18905");
    }

    #[test]
    fn marker_without_id_keeps_whole_input() {
        let data = classify("my playlist");
        assert_eq!(data.kind, MusicUrlType::PlayList);
        assert_eq!(data.id, "my playlist");
    }

    #[test]
    fn bare_number_and_garbage() {
        assert_eq!(
            classify("8675309"),
            MusicApiInputData::new(MusicUrlType::Number, "8675309", "")
        );
        assert!(classify("hello world").is_none());
    }

    #[test]
    fn error_body_keeps_code_and_message() {
        let raw = RawResponse {
            status: reqwest::StatusCode::BAD_REQUEST,
            headers: Default::default(),
            url: reqwest::Url::parse("http://localhost/song/url").unwrap(),
            body: br#"{"code":-1,"message":"bad id"}"#.to_vec(),
        };
        let err = classify_response(&raw).unwrap();
        assert_eq!(err.to_string(), "[400] -1: bad id");

        let ok = RawResponse {
            status: reqwest::StatusCode::OK,
            ..raw
        };
        assert!(classify_response(&ok).is_none());
    }

    #[test]
    fn config_uses_pascal_case_keys_and_defaults() {
        let config: NeteaseConfig = serde_json::from_value(serde_json::json!({
            "ApiServerUrl": "http://music.local",
            "QrPollMaxAttempts": 5
        }))
        .unwrap();
        assert_eq!(config.api_server_url, "http://music.local");
        assert_eq!(config.qr_poll_max_attempts, 5);
        assert_eq!(config.qr_poll_interval_secs, 1);
        assert!(!config.refresh_cookie);

        let value = serde_json::to_value(NeteaseConfig::default()).unwrap();
        assert!(value.get("CookieUpdateIntervalMin").is_some());
        assert!(value["Header"].get("User-Agent").is_some());
    }
}
