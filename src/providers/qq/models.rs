//! Response shapes of the QQ Music API server.

use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Success code of the `{ result, data, errMsg }` envelope.
pub const RESULT_OK: i64 = 100;

/// Every endpoint wraps its payload in this envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub result: i64,
    pub data: Option<T>,
    #[serde(rename = "errMsg")]
    pub err_msg: Option<String>,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        self.result == RESULT_OK
    }

    /// Best available failure text: `errMsg`, then `message`.
    pub fn error_text(&self) -> &str {
        self.err_msg
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or_default()
    }

    /// Unwraps the payload or turns the envelope into a backend error.
    pub fn into_data(self, action: &str) -> ApiResult<T> {
        if !self.is_ok() {
            return Err(self.failure(action));
        }
        match self.data {
            Some(data) => Ok(data),
            None => Err(ApiError::Malformed(format!("{}: no data", action))),
        }
    }

    pub fn failure(&self, action: &str) -> ApiError {
        ApiError::backend(
            u16::try_from(self.result).unwrap_or_default(),
            format!("{} failed: {}", action, self.error_text()),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SongInfo {
    pub track_info: TrackInfo,
}

#[derive(Debug, Deserialize)]
pub struct TrackInfo {
    #[serde(default)]
    pub name: String,
    pub album: Option<Mid>,
    #[serde(default)]
    pub singer: Vec<Singer>,
}

#[derive(Debug, Deserialize)]
pub struct Mid {
    #[serde(default)]
    pub mid: String,
}

#[derive(Debug, Deserialize)]
pub struct Singer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mid: String,
}

#[derive(Debug, Deserialize)]
pub struct SongSearch {
    #[serde(default)]
    pub list: Vec<SongMid>,
}

#[derive(Debug, Deserialize)]
pub struct SongMid {
    pub songmid: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistSearch {
    #[serde(default)]
    pub list: Vec<PlaylistHit>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistHit {
    pub dissid: String,
    #[serde(default)]
    pub dissname: String,
    #[serde(default)]
    pub imgurl: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumSearch {
    #[serde(default)]
    pub list: Vec<AlbumHit>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumHit {
    #[serde(rename = "albumMID")]
    pub album_mid: String,
    #[serde(default, rename = "albumName")]
    pub album_name: String,
    #[serde(default, rename = "albumPic")]
    pub album_pic: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistInfo {
    #[serde(default)]
    pub dissname: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub songnum: usize,
    #[serde(default)]
    pub songlist: Vec<SongMid>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub headpiclist: Vec<HeadPic>,
}

#[derive(Debug, Deserialize)]
pub struct HeadPic {
    #[serde(default)]
    pub picurl: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumSongs {
    #[serde(default)]
    pub list: Vec<Mid>,
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct UserDetail {
    pub creator: Creator,
}

#[derive(Debug, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub nick: String,
    #[serde(default)]
    pub encrypt_uin: String,
}
