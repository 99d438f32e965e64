//! Response shapes of the Netease API server. Only the fields the provider
//! reads are declared; everything else is ignored.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: i64,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdOnly {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SongDetailResponse {
    #[serde(default)]
    pub songs: Vec<SongDetail>,
}

#[derive(Debug, Deserialize)]
pub struct SongDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub al: Option<AlbumRef>,
    #[serde(default)]
    pub ar: Vec<ArtistRef>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumRef {
    #[serde(default, rename = "picUrl")]
    pub pic_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SongUrlResponse {
    #[serde(default)]
    pub data: Vec<SongUrl>,
}

#[derive(Debug, Deserialize)]
pub struct SongUrl {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "freeTrialInfo")]
    pub free_trial_info: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub result: Option<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub songs: Vec<IdOnly>,
    #[serde(default)]
    pub playlists: Vec<PlaylistSummary>,
    #[serde(default)]
    pub albums: Vec<AlbumSummary>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistSummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "coverImgUrl")]
    pub cover_img_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumSummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "picUrl")]
    pub pic_url: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistDetailResponse {
    pub playlist: PlaylistDetail,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "coverImgUrl")]
    pub cover_img_url: String,
    #[serde(default, rename = "trackCount")]
    pub track_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct TrackListResponse {
    #[serde(default)]
    pub songs: Vec<IdOnly>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumResponse {
    pub album: AlbumSummaryDetail,
    #[serde(default)]
    pub songs: Vec<IdOnly>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumSummaryDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "picUrl")]
    pub pic_url: String,
}

#[derive(Debug, Deserialize)]
pub struct QrKeyResponse {
    pub data: QrKey,
}

#[derive(Debug, Deserialize)]
pub struct QrKey {
    pub unikey: String,
}

#[derive(Debug, Deserialize)]
pub struct QrImageResponse {
    pub data: QrImage,
}

#[derive(Debug, Deserialize)]
pub struct QrImage {
    pub qrimg: String,
}

/// `{ code, cookie? }`, shared by QR checks, captcha calls, phone login and refresh.
#[derive(Debug, Deserialize)]
pub struct CodeCookie {
    pub code: i64,
    #[serde(default)]
    pub cookie: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginStatusResponse {
    #[serde(default)]
    pub data: Option<LoginStatus>,
}

#[derive(Debug, Deserialize)]
pub struct LoginStatus {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub status: i64,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct VipInfoResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub data: Option<VipInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VipInfo {
    #[serde(default)]
    pub redplus: Option<VipTier>,
    #[serde(default, rename = "redVipLevel")]
    pub red_vip_level: i64,
    #[serde(default)]
    pub associator: Option<VipTier>,
    #[serde(default, rename = "musicPackage")]
    pub music_package: Option<VipTier>,
    #[serde(default, rename = "redVipAnnualCount")]
    pub red_vip_annual_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct VipTier {
    #[serde(default, rename = "expireTime")]
    pub expire_time: i64,
    #[serde(default, rename = "vipLevel")]
    pub vip_level: i64,
}
