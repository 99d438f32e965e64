//! QQ Music, spoken to through a self-hosted API server that wraps every
//! payload in a `{ result, data, errMsg }` envelope.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    LARGE_LISTING_THRESHOLD, Messenger, MusicApi, ProviderDeps, ProviderSettings, capped,
    large_listing_notice, notify,
};
use crate::{
    error::{ApiError, ApiResult},
    http::{BodyKind, HttpClient, RawResponse},
    management::{CookieRefresh, CookieRefresher, RefreshOutcome, Session, SessionConfig, default_headers},
    types::{
        Author, MusicApiInputData, MusicUrlType, PlayListMeta, PlayableUrl, ProviderKind, Track,
        TrackDetails, TrackSource, UserInfo,
    },
    utils,
};

pub mod models;

use models::{
    AlbumInfo, AlbumSearch, AlbumSongs, Envelope, PlaylistInfo, PlaylistSearch, SongInfo, SongSearch,
    UserDetail,
};

pub const NAME: &str = "QQ Music";
pub const DEFAULT_API_SERVER_URL: &str = "http://localhost:3001";
pub const DEFAULT_UIN: &str = "123456";
pub const DEFAULT_ALIAS: &[&str] = &["q", "qq"];
pub const KEY_IN_URL: &[&str] = &["qq.com"];

const USAGE: &str = "usage: [set|get] {cookie|uin}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QqMusicConfig {
    pub api_server_url: String,
    pub refresh_cookie: bool,
    pub cookie_update_interval_min: u64,
    pub header: BTreeMap<String, String>,
    /// Account the session cookie belongs to.
    pub uin: String,
}

impl Default for QqMusicConfig {
    fn default() -> Self {
        Self {
            api_server_url: DEFAULT_API_SERVER_URL.to_string(),
            refresh_cookie: false,
            cookie_update_interval_min: 30,
            header: default_headers(),
            uin: DEFAULT_UIN.to_string(),
        }
    }
}

impl SessionConfig for QqMusicConfig {
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

fn playlist_url(id: &str) -> String {
    format!("https://y.qq.com/n/ryqq/playlist/{}", id)
}

fn album_url(id: &str) -> String {
    format!("https://y.qq.com/n/ryqq/albumDetail/{}", id)
}

fn classify_response(raw: &RawResponse) -> Option<ApiError> {
    if raw.status.is_success() {
        return None;
    }
    let reason = raw.status.canonical_reason().unwrap_or("request failed");
    Some(ApiError::backend(raw.status.as_u16(), reason))
}

/// Last path segment with any query or fragment removed.
fn last_segment(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path).to_string()
}

pub fn classify(input: &str) -> MusicApiInputData {
    if input.contains("albumDetail") {
        MusicApiInputData::new(MusicUrlType::Album, last_segment(input), input)
    } else if input.contains("songDetail") {
        MusicApiInputData::new(MusicUrlType::Music, last_segment(input), input)
    } else if input.contains("playlist") {
        MusicApiInputData::new(MusicUrlType::PlayList, last_segment(input), input)
    } else if input.starts_with("00") {
        // song mids start with "00"
        MusicApiInputData::new(MusicUrlType::Music, input, input)
    } else if utils::is_number(input) {
        MusicApiInputData::new(MusicUrlType::Number, input, "")
    } else {
        MusicApiInputData::default()
    }
}

pub struct QqMusicTracks {
    client: Arc<HttpClient>,
}

#[async_trait]
impl TrackSource for QqMusicTracks {
    fn artist_url(&self, artist_id: &str) -> String {
        format!("https://y.qq.com/n/ryqq/singer/{}", artist_id)
    }

    async fn track_details(&self, id: &str) -> ApiResult<TrackDetails> {
        let envelope: Envelope<SongInfo> = self.client.get_json("/song", &[("songmid", id)]).await?;
        let track = envelope.into_data("song info")?.track_info;

        let album_mid = track.album.map(|a| a.mid).unwrap_or_default();
        let authors = track
            .singer
            .into_iter()
            .map(|s| Author {
                name: s.name,
                id: (!s.mid.is_empty()).then_some(s.mid),
            })
            .collect();

        Ok(TrackDetails {
            name: track.name,
            image: format!("https://y.gtimg.cn/music/photo_new/T002R300x300M000{}.jpg", album_mid),
            detail_url: format!("https://y.qq.com/n/ryqq/songDetail/{}", id),
            authors,
        })
    }

    async fn playable_url(&self, id: &str) -> ApiResult<PlayableUrl> {
        let envelope: Envelope<String> = self.client.get_json("/song/url", &[("id", id)]).await?;
        match envelope.data.as_deref() {
            Some(url) if envelope.is_ok() && !url.is_empty() => Ok(PlayableUrl::Ready(url.to_string())),
            _ => {
                log::debug!(
                    "[{}] No url for {} [{}] {}",
                    NAME,
                    id,
                    envelope.result,
                    envelope.error_text()
                );
                Ok(PlayableUrl::Unavailable(format!(
                    "[{}] {}",
                    envelope.result,
                    envelope.error_text()
                )))
            }
        }
    }

    async fn fetch_bytes(&self, url: &str) -> ApiResult<Vec<u8>> {
        self.client.get_bytes(url).await
    }
}

struct QqMusicRefresh {
    client: Arc<HttpClient>,
}

#[async_trait]
impl CookieRefresh for QqMusicRefresh {
    async fn refresh(&self) -> ApiResult<RefreshOutcome> {
        let raw = self.client.get_response("/user/refresh", &[]).await?;
        let envelope: Envelope<Value> = raw.json()?;
        if envelope.is_ok() {
            Ok(RefreshOutcome::Refreshed(raw.set_cookies().join("; ")))
        } else {
            Ok(RefreshOutcome::Rejected(raw.text()))
        }
    }
}

pub struct QqMusic {
    session: Arc<Session<QqMusicConfig>>,
    tracks: Arc<QqMusicTracks>,
    messenger: Arc<dyn Messenger>,
    refresher: CookieRefresher,
}

impl QqMusic {
    /// Must be called inside a tokio runtime; the cookie refresh task starts here.
    pub fn new(entry_key: &str, mut config: QqMusicConfig, deps: &ProviderDeps) -> ApiResult<Self> {
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
            Arc::new(QqMusicRefresh {
                client: Arc::clone(&client),
            }),
        );

        Ok(Self {
            session,
            tracks: Arc::new(QqMusicTracks { client }),
            messenger: Arc::clone(&deps.messenger),
            refresher,
        })
    }

    pub fn session(&self) -> &Arc<Session<QqMusicConfig>> {
        &self.session
    }

    fn client(&self) -> &HttpClient {
        self.session.client()
    }

    fn track(&self, id: &str, in_playlist: bool) -> Track {
        Track::new(self.tracks.clone(), id, in_playlist)
    }

    /// `pageNo` is 1-based on this backend; an offset of 0 means the first page.
    async fn search<T>(&self, keyword: &str, kind: &str, limit: u32, offset: u32, action: &str) -> ApiResult<T>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let page_size = limit.to_string();
        let page_no = offset.max(1).to_string();
        let envelope: Envelope<T> = self
            .client()
            .get_json(
                "/search",
                &[
                    ("key", keyword),
                    ("pageSize", page_size.as_str()),
                    ("pageNo", page_no.as_str()),
                    ("t", kind),
                ],
            )
            .await?;
        envelope.into_data(action)
    }

    async fn login_set(&self, data: &str) -> ApiResult<String> {
        let cookie = utils::process_cookie(data);
        let Some(uin) = utils::cookie_to_map(&cookie).remove("uin") else {
            return Ok("uin not found in cookie".to_string());
        };

        let envelope: Envelope<Value> = self
            .client()
            .post_json("/user/setCookie", &[("data", cookie.as_str())], BodyKind::Json)
            .await?;
        if !envelope.is_ok() {
            return Ok(format!("set failed [{}] {}", envelope.result, envelope.error_text()));
        }

        self.session
            .update(|c| {
                c.uin = uin;
                c.set_cookie(cookie);
            })
            .await?;
        Ok("set success".to_string())
    }

    async fn login_get(&self, uin: &str) -> ApiResult<String> {
        let raw = self.client().get_response("/user/getCookie", &[("id", uin)]).await?;
        let cookies = raw.set_cookies();
        if cookies.is_empty() {
            return Ok("user not found".to_string());
        }

        let envelope: Envelope<Value> = raw.json()?;
        if !envelope.is_ok() {
            return Ok(format!("get failed [{}] {}", envelope.result, envelope.error_text()));
        }

        let fresh = utils::process_cookie(&cookies.join("; "));
        self.session
            .update(|c| {
                let merged = utils::merge_cookie(c.cookie(), &fresh);
                c.set_cookie(merged);
                c.uin = uin.to_string();
            })
            .await?;
        Ok("get success".to_string())
    }
}

pub fn build(entry_key: &str, settings: ProviderSettings, deps: &ProviderDeps) -> ApiResult<Arc<dyn MusicApi>> {
    match settings {
        ProviderSettings::QqMusic(config) => Ok(Arc::new(QqMusic::new(entry_key, config, deps)?)),
        other => Err(ApiError::Config(format!(
            "{} cannot be built from {} settings",
            NAME,
            other.kind()
        ))),
    }
}

#[async_trait]
impl MusicApi for QqMusic {
    fn name(&self) -> &str {
        NAME
    }

    fn key(&self) -> ProviderKind {
        ProviderKind::QqMusic
    }

    fn default_alias(&self) -> &[&'static str] {
        DEFAULT_ALIAS
    }

    fn key_in_url(&self) -> &[&'static str] {
        KEY_IN_URL
    }

    async fn search_tracks(&self, keyword: &str, limit: u32, offset: u32) -> ApiResult<Vec<Track>> {
        let found: SongSearch = self.search(keyword, "0", limit, offset, "song search").await?;
        Ok(found
            .list
            .into_iter()
            .map(|song| self.track(&song.songmid, false))
            .collect())
    }

    async fn search_playlists(&self, keyword: &str, limit: u32, offset: u32) -> ApiResult<Vec<PlayListMeta>> {
        let found: PlaylistSearch = self.search(keyword, "2", limit, offset, "playlist search").await?;
        Ok(found
            .list
            .into_iter()
            .map(|p| {
                let url = playlist_url(&p.dissid);
                PlayListMeta::new(p.dissid, p.dissname, url, p.imgurl, None)
            })
            .collect())
    }

    async fn search_albums(&self, keyword: &str, limit: u32, offset: u32) -> ApiResult<Vec<PlayListMeta>> {
        let found: AlbumSearch = self.search(keyword, "8", limit, offset, "album search").await?;
        Ok(found
            .list
            .into_iter()
            .map(|a| {
                let url = album_url(&a.album_mid);
                PlayListMeta::new(a.album_mid, a.album_name, url, a.album_pic, None)
            })
            .collect())
    }

    async fn fetch_playlist(&self, id: &str, limit: usize) -> ApiResult<PlayListMeta> {
        let envelope: Envelope<PlaylistInfo> = self.client().get_json("/songlist", &[("id", id)]).await?;
        let info = envelope.into_data("playlist info")?;

        let count = capped(info.songnum.max(info.songlist.len()), limit);
        if count > LARGE_LISTING_THRESHOLD {
            notify(self.messenger.as_ref(), NAME, &large_listing_notice("playlist", count)).await;
        }

        let tracks = info
            .songlist
            .iter()
            .take(count)
            .map(|song| self.track(&song.songmid, true))
            .collect();
        Ok(PlayListMeta::new(id, info.dissname, playlist_url(id), info.logo, Some(tracks)))
    }

    async fn fetch_album(&self, id: &str, limit: usize) -> ApiResult<PlayListMeta> {
        let envelope: Envelope<AlbumInfo> = self.client().get_json("/album", &[("albummid", id)]).await?;
        let info = envelope.into_data("album info")?;
        let image = info
            .headpiclist
            .into_iter()
            .next()
            .map(|p| p.picurl)
            .unwrap_or_default();

        let envelope: Envelope<AlbumSongs> = self
            .client()
            .get_json("/album/songs", &[("albummid", id)])
            .await?;
        let songs = envelope.into_data("album songs")?;

        let count = capped(songs.total.max(songs.list.len()), limit);
        if count > LARGE_LISTING_THRESHOLD {
            notify(self.messenger.as_ref(), NAME, &large_listing_notice("album", count)).await;
        }

        let tracks = songs
            .list
            .iter()
            .take(count)
            .map(|song| self.track(&song.mid, true))
            .collect();
        Ok(PlayListMeta::new(id, info.name, album_url(id), image, Some(tracks)))
    }

    async fn fetch_track(&self, id: &str) -> ApiResult<Track> {
        Ok(self.track(id, false))
    }

    fn classify_input(&self, input: &str) -> MusicApiInputData {
        classify(input)
    }

    async fn login(&self, args: &[String]) -> ApiResult<String> {
        let Some((mode, rest)) = args.split_first() else {
            return Ok(USAGE.to_string());
        };
        let data = rest.join(" ");
        if data.trim().is_empty() {
            return Ok(USAGE.to_string());
        }

        match mode.as_str() {
            "set" => self.login_set(&data).await,
            "get" => self.login_get(data.trim()).await,
            _ => Ok(USAGE.to_string()),
        }
    }

    async fn fetch_current_user(&self) -> ApiResult<Option<UserInfo>> {
        let config = self.session.snapshot().await;
        if config.cookie().is_empty() {
            return Ok(None);
        }

        let envelope: Envelope<UserDetail> = self
            .client()
            .get_json("/user/detail", &[("id", config.uin.as_str())])
            .await?;
        let creator = envelope
            .into_data("user info")
            .inspect_err(|e| log::info!("[{}] {}", NAME, e))?
            .creator;

        Ok(Some(UserInfo {
            id: config.uin,
            name: creator.nick,
            url: format!("https://y.qq.com/n/ryqq/profile/like/song?uin={}", creator.encrypt_uin),
            extra: String::new(),
        }))
    }

    async fn api_server_url(&self) -> String {
        self.session.snapshot().await.api_server_url
    }

    async fn reconfigure(&self, settings: ProviderSettings) -> ApiResult<()> {
        match settings {
            ProviderSettings::QqMusic(config) => self.session.replace(config).await,
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
    fn classifies_ryqq_links_by_last_segment() {
        let data = classify("https://y.qq.com/n/ryqq/playlist/7843256891?ADTAG=share");
        assert_eq!(data.kind, MusicUrlType::PlayList);
        assert_eq!(data.id, "7843256891");

        let data = classify("https://y.qq.com/n/ryqq/albumDetail/002fRO0N4FftzY");
        assert_eq!(data.kind, MusicUrlType::Album);
        assert_eq!(data.id, "002fRO0N4FftzY");

        let data = classify("https://y.qq.com/n/ryqq/songDetail/0039MnYb0qxYhV/");
        assert_eq!(data.kind, MusicUrlType::Music);
        assert_eq!(data.id, "0039MnYb0qxYhV");
    }

    #[test]
    fn song_mid_and_bare_number() {
        let data = classify("0039MnYb0qxYhV");
        assert_eq!(data.kind, MusicUrlType::Music);
        assert_eq!(data.id, "0039MnYb0qxYhV");

        assert_eq!(
            classify("8675309"),
            MusicApiInputData::new(MusicUrlType::Number, "8675309", "")
        );
        assert!(classify("not a link").is_none());
    }

    #[test]
    fn config_defaults_include_uin() {
        let config: QqMusicConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.uin, DEFAULT_UIN);
        assert_eq!(config.api_server_url, DEFAULT_API_SERVER_URL);
        assert_eq!(config.cookie(), "");
    }
}
