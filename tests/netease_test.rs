mod common;

use std::{collections::HashMap, sync::atomic::Ordering};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use common::Hits;
use serde_json::{Value, json};
use tunehub::{
    management::SessionConfig,
    providers::{MusicApi, netease::{NeteaseConfig, NeteaseMusic}},
    types::{MusicUrlType, PlayableUrl},
};

const PLAYLIST_SIZE: usize = 120;

type Params = Query<HashMap<String, String>>;

fn param(q: &HashMap<String, String>, name: &str) -> usize {
    q.get(name).and_then(|v| v.parse().ok()).unwrap_or_default()
}

async fn playlist_detail(State(hits): State<Hits>, Query(q): Params) -> Json<Value> {
    hits.record("/playlist/detail").await;
    let count = if q.get("id").map(String::as_str) == Some("0") { 0 } else { PLAYLIST_SIZE };
    Json(json!({
        "code": 200,
        "playlist": { "name": "Mix", "coverImgUrl": "http://img/mix.jpg", "trackCount": count }
    }))
}

async fn playlist_tracks(State(hits): State<Hits>, Query(q): Params) -> Json<Value> {
    hits.record("/playlist/track/all").await;
    let (offset, limit) = (param(&q, "offset"), param(&q, "limit"));
    let end = if q.contains_key("limit") { (offset + limit).min(PLAYLIST_SIZE) } else { PLAYLIST_SIZE };
    // listings "0" and "9" carry a placeholder entry in third position
    let placeholder = matches!(q.get("id").map(String::as_str), Some("0" | "9"));
    let songs = (offset + 1..=end)
        .map(|id| if placeholder && id == 3 { json!({ "id": 0 }) } else { json!({ "id": id }) })
        .collect::<Vec<_>>();
    Json(json!({ "code": 200, "songs": songs }))
}

async fn song_detail(State(hits): State<Hits>, Query(q): Params, headers: HeaderMap) -> Json<Value> {
    hits.record("/song/detail").await;
    let id = q.get("ids").cloned().unwrap_or_default();
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({
        "songs": [{
            "name": format!("Song {}", id),
            "al": { "picUrl": format!("http://{}/cover/{}.jpg", host, id) },
            "ar": [
                { "id": 7, "name": "Singer" },
                { "id": 0, "name": "Guest" },
                { "id": 9, "name": null }
            ]
        }]
    }))
}

async fn song_url(Query(q): Params) -> impl IntoResponse {
    let body = match q.get("id").map(String::as_str) {
        Some("1") => json!({ "data": [{ "url": "http://media/1.mp3", "freeTrialInfo": null }] }),
        Some("2") => json!({ "data": [{ "url": "http://media/2.mp3", "freeTrialInfo": { "start": 0, "end": 30 } }] }),
        Some("3") => json!({ "data": [{ "url": null }] }),
        _ => return (StatusCode::BAD_REQUEST, Json(json!({ "code": -1, "message": "bad id" }))),
    };
    (StatusCode::OK, Json(body))
}

async fn album(Query(q): Params) -> Json<Value> {
    let songs = (1..=5).map(|id| json!({ "id": id })).collect::<Vec<_>>();
    Json(json!({
        "album": { "name": format!("Album {}", q.get("id").cloned().unwrap_or_default()), "picUrl": "http://img/a.jpg" },
        "songs": songs
    }))
}

async fn search(Query(q): Params) -> Json<Value> {
    let result = match q.get("type").map(String::as_str) {
        Some("1000") => json!({ "playlists": [{ "id": 11, "name": "Chill", "coverImgUrl": "http://img/c.jpg" }] }),
        Some("10") => json!({ "albums": [{ "id": 12, "name": "Blue", "picUrl": "http://img/b.jpg" }] }),
        _ => json!({ "songs": [{ "id": 21 }, { "id": 22 }] }),
    };
    Json(json!({ "code": 200, "result": result }))
}

async fn qr_check(State(hits): State<Hits>) -> Json<Value> {
    hits.record("/login/qr/check").await;
    if hits.get("/login/qr/check").await < 3 {
        Json(json!({ "code": 801, "message": "waiting" }))
    } else {
        Json(json!({ "code": 803, "cookie": "MUSIC_U=u1; Max-Age=100; Path=/; __csrf=c1; HTTPOnly" }))
    }
}

async fn login_status(State(hits): State<Hits>) -> Json<Value> {
    hits.record("/login/status").await;
    Json(json!({
        "data": {
            "code": 200,
            "account": { "status": 0 },
            "profile": { "userId": 1234, "nickname": "listener" }
        }
    }))
}

async fn cellphone(Query(q): Params) -> Json<Value> {
    if q.get("captcha").map(String::as_str) == Some("1111") {
        Json(json!({ "code": 200, "cookie": "MUSIC_U=sms; Path=/" }))
    } else {
        Json(json!({ "code": 503 }))
    }
}

fn app(hits: Hits) -> Router {
    Router::new()
        .route("/playlist/detail", get(playlist_detail))
        .route("/playlist/track/all", get(playlist_tracks))
        .route("/song/detail", get(song_detail))
        .route("/song/url", get(song_url))
        .route("/album", get(album))
        .route("/search", get(search))
        .route("/cover/{file}", get(|| async { vec![0x89u8, b'P', b'N', b'G'] }))
        .route(
            "/login/qr/key",
            get(|| async { Json(json!({ "data": { "code": 200, "unikey": "k1" } })) }),
        )
        .route(
            "/login/qr/create",
            get(|| async { Json(json!({ "data": { "qrimg": "data:image/png;base64,aGVsbG8=" } })) }),
        )
        .route("/login/qr/check", get(qr_check))
        .route("/login/status", get(login_status))
        .route(
            "/vip/info",
            get(|| async { Json(json!({ "code": 200, "data": { "redVipAnnualCount": -1 } })) }),
        )
        .route("/captcha/sent", get(|| async { Json(json!({ "code": 200 })) }))
        .route("/captcha/verify", get(cellphone))
        .route("/login/cellphone", get(cellphone))
        .with_state(hits)
}

async fn provider() -> (NeteaseMusic, Hits, common::Deps) {
    let hits = Hits::default();
    let base = common::serve(app(hits.clone())).await;
    let config = NeteaseConfig {
        api_server_url: base,
        qr_poll_interval_secs: 0,
        qr_poll_max_attempts: 5,
        ..Default::default()
    };
    let deps = common::deps();
    let api = NeteaseMusic::new("netease", config, &deps.0).unwrap();
    (api, hits, deps)
}

#[tokio::test]
async fn unlimited_playlist_fetch_is_paged_and_ordered() {
    let (api, hits, (_, messenger, _)) = provider().await;

    let playlist = api.fetch_playlist("42", 0).await.unwrap();
    let tracks = playlist.music_list.as_ref().unwrap();
    assert_eq!(tracks.len(), PLAYLIST_SIZE);
    let ids = tracks.iter().map(|t| t.id.parse::<usize>().unwrap()).collect::<Vec<_>>();
    assert_eq!(ids, (1..=PLAYLIST_SIZE).collect::<Vec<_>>());
    assert!(tracks.iter().all(|t| t.in_playlist && !t.is_initialized()));
    assert_eq!(playlist.name, "Mix");
    assert_eq!(playlist.url, "https://music.163.com/#/playlist?id=42");
    assert_eq!(hits.get("/playlist/track/all").await, 3);

    let messages = messenger.messages().await;
    assert_eq!(
        messages,
        vec![
            "start adding playlist [Mix]",
            "warning: large playlist, may take time [120]",
            "added tracks [50-120]",
            "added tracks [100-120]",
            "added tracks [120-120]",
        ]
    );
    assert_eq!(messenger.descriptions.lock().await.clone(), vec!["Mix"]);
}

#[tokio::test]
async fn limited_playlist_fetch_returns_first_tracks() {
    let (api, hits, (_, messenger, _)) = provider().await;

    let playlist = api.fetch_playlist("42", 7).await.unwrap();
    let ids = playlist
        .music_list
        .unwrap()
        .iter()
        .map(|t| t.id.clone())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7"]);
    assert_eq!(hits.get("/playlist/track/all").await, 1);
    assert!(!messenger.messages().await.iter().any(|m| m.starts_with("warning")));
}

#[tokio::test]
async fn paged_playlist_returns_exactly_the_requested_count() {
    let (api, hits, _) = provider().await;

    let playlist = api.fetch_playlist("9", 5).await.unwrap();
    let ids = playlist
        .music_list
        .unwrap()
        .iter()
        .map(|t| t.id.clone())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["1", "2", "0", "4", "5"]);
    assert_eq!(hits.get("/playlist/track/all").await, 1);
}

#[tokio::test]
async fn playlist_without_count_is_listed_in_one_call() {
    let (api, hits, (_, messenger, _)) = provider().await;

    let playlist = api.fetch_playlist("0", 10).await.unwrap();
    assert_eq!(playlist.len(), 10);
    let ids = playlist.music_list.as_ref().unwrap().iter().map(|t| t.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["1", "2", "4", "5", "6", "7", "8", "9", "10", "11"]);
    assert_eq!(hits.get("/playlist/track/all").await, 1);
    assert!(messenger.messages().await.contains(&"added tracks [10-10]".to_string()));
}

#[tokio::test]
async fn album_fetch_respects_limit() {
    let (api, _, _) = provider().await;

    let album = api.fetch_album("9", 0).await.unwrap();
    assert_eq!(album.len(), 5);
    assert_eq!(album.name, "Album 9");

    let album = api.fetch_album("9", 2).await.unwrap();
    assert_eq!(album.len(), 2);
}

#[tokio::test]
async fn track_info_is_fetched_once() {
    let (api, hits, _) = provider().await;

    let mut track = api.fetch_track("5").await.unwrap();
    track.init_music_info().await.unwrap();
    track.init_music_info().await.unwrap();

    assert_eq!(hits.get("/song/detail").await, 1);
    assert_eq!(track.name, "Song 5");
    assert!(track.image.ends_with("/cover/5.jpg"), "{}", track.image);
    assert_eq!(track.detail_url, "https://music.163.com/#/song?id=5");
    assert_eq!(track.author(), "Singer / Guest");
    assert_eq!(track.authors[0].id.as_deref(), Some("7"));
    assert_eq!(track.authors[1].id, None);
    assert_eq!(track.artist_url("7"), "https://music.163.com/#/artist?id=7");
    assert_eq!(track.full_name(), "Song 5 - Singer / Guest");

    let cover = track.fetch_image().await.unwrap();
    assert_eq!(cover, vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn playable_url_distinguishes_unavailable_tracks() {
    let (api, _, _) = provider().await;

    let ready = api.fetch_track("1").await.unwrap();
    let url = api.resolve_playable_url(&ready).await.unwrap();
    assert_eq!(url, PlayableUrl::Ready("http://media/1.mp3".to_string()));
    assert_eq!(url.url(), Some("http://media/1.mp3"));

    let trial = api.fetch_track("2").await.unwrap();
    assert!(!api.resolve_playable_url(&trial).await.unwrap().is_ready());

    let missing = api.fetch_track("3").await.unwrap();
    assert!(matches!(
        api.resolve_playable_url(&missing).await.unwrap(),
        PlayableUrl::Unavailable(_)
    ));
}

#[tokio::test]
async fn backend_error_carries_status_and_message() {
    let (api, _, _) = provider().await;

    let track = api.fetch_track("999").await.unwrap();
    let err = api.resolve_playable_url(&track).await.unwrap_err();
    assert!(err.is_backend());
    let text = err.to_string();
    assert!(text.contains("400"), "{}", text);
    assert!(text.contains("bad id"), "{}", text);
}

#[tokio::test]
async fn search_maps_each_result_kind() {
    let (api, _, _) = provider().await;

    let tracks = api.search_tracks("blue", 10, 0).await.unwrap();
    assert_eq!(tracks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["21", "22"]);
    assert!(tracks.iter().all(|t| !t.in_playlist));

    let playlists = api.search_playlists("blue", 10, 0).await.unwrap();
    assert_eq!(playlists[0].id, "11");
    assert_eq!(playlists[0].url, "https://music.163.com/#/playlist?id=11");
    assert!(playlists[0].music_list.is_none());

    let albums = api.search_albums("blue", 10, 0).await.unwrap();
    assert_eq!(albums[0].name, "Blue");
    assert_eq!(albums[0].image, "http://img/b.jpg");
}

#[tokio::test]
async fn unknown_login_mode_returns_usage_without_network() {
    let (api, hits, _) = provider().await;

    let status = api.login(&["fax".to_string()]).await.unwrap();
    assert!(status.starts_with("usage:"));
    let status = api.login(&[]).await.unwrap();
    assert!(status.starts_with("usage:"));
    let status = api.login(&["sms".to_string()]).await.unwrap();
    assert!(status.starts_with("usage:"));
    assert_eq!(hits.total().await, 0);
}

#[tokio::test]
async fn current_user_requires_a_cookie() {
    let (api, hits, _) = provider().await;

    assert!(api.fetch_current_user().await.unwrap().is_none());
    assert_eq!(hits.get("/login/status").await, 0);
}

#[tokio::test]
async fn cookie_login_persists_and_identifies_user() {
    let (api, hits, (_, _, saver)) = provider().await;

    let status = api
        .login(&["cookie".to_string(), "MUSIC_U=abc;".to_string(), "__csrf=x".to_string()])
        .await
        .unwrap();
    assert_eq!(status, "cookie set");
    let (key, saved) = saver.last().await.unwrap();
    assert_eq!(key, "netease");
    assert_eq!(saved["Header"]["Cookie"], "MUSIC_U=abc; __csrf=x");

    let user = api.fetch_current_user().await.unwrap().unwrap();
    assert_eq!(user.id, "1234");
    assert_eq!(user.name, "listener");
    assert_eq!(user.url, "https://music.163.com/#/user/home?id=1234");
    assert_eq!(user.extra, "non-annual no VIP");
    assert_eq!(hits.get("/login/status").await, 1);
}

#[tokio::test]
async fn sms_login_checks_captcha() {
    let (api, _, (_, _, saver)) = provider().await;

    let sent = api.login(&["sms".to_string(), "13800000000".to_string()]).await.unwrap();
    assert_eq!(sent, "captcha sent");

    let wrong = api
        .login(&["sms".to_string(), "13800000000".to_string(), "0000".to_string()])
        .await
        .unwrap();
    assert_eq!(wrong, "wrong captcha");
    assert_eq!(saver.count().await, 0);

    let ok = api
        .login(&["sms".to_string(), "13800000000".to_string(), "1111".to_string()])
        .await
        .unwrap();
    assert_eq!(ok, "login success");
    assert_eq!(api.session().cookie().await, "MUSIC_U=sms");
}

#[tokio::test]
async fn qr_login_polls_until_confirmed() {
    let (api, hits, (_, messenger, saver)) = provider().await;

    let status = api.login(&["qr".to_string()]).await.unwrap();
    assert_eq!(status, "QR login success");
    assert_eq!(hits.get("/login/qr/check").await, 3);
    assert_eq!(messenger.avatars.load(Ordering::SeqCst), 1);

    let config = api.session().snapshot().await;
    assert_eq!(config.cookie(), "MUSIC_U=u1; __csrf=c1");
    assert!(config.refresh_cookie);
    let (_, saved) = saver.last().await.unwrap();
    assert_eq!(saved["RefreshCookie"], true);
    assert_eq!(
        messenger.descriptions.lock().await.last().map(String::as_str),
        Some("Netease logged in")
    );
}

#[tokio::test]
async fn classification_is_offline() {
    let (api, hits, _) = provider().await;

    let data = api.classify_input("https://music.163.com/#/album?id=18905");
    assert_eq!(data.kind, MusicUrlType::Album);
    assert_eq!(data.id, "18905");
    assert_eq!(api.classify_input("123").kind, MusicUrlType::Number);
    assert!(api.classify_input("nothing here").is_none());
    assert_eq!(hits.total().await, 0);
}

#[tokio::test]
async fn shutdown_closes_the_client() {
    let (api, _, _) = provider().await;

    api.shutdown().await;
    api.shutdown().await;
    let track = api.fetch_track("1").await.unwrap();
    assert!(api.resolve_playable_url(&track).await.is_err());
}
