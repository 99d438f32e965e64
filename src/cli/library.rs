use clap::ValueEnum;
use tabled::Table;

use super::{Context, spinner, track_rows};
use crate::{
    error, info, success,
    types::{MusicUrlType, PlayListMeta, PlaylistTableRow},
    warning,
};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchKind {
    #[default]
    Track,
    Playlist,
    Album,
}

pub async fn search(ctx: &Context, provider: &str, keyword: &str, kind: SearchKind, limit: u32, offset: u32) {
    let api = ctx.provider(provider).await;
    let pb = spinner(format!("Searching {} for '{}'...", api.name(), keyword));

    match kind {
        SearchKind::Track => {
            let mut tracks = match api.search_tracks(keyword, limit, offset).await {
                Ok(tracks) => tracks,
                Err(e) => {
                    pb.finish_and_clear();
                    error!("Search failed. Err: {}", e);
                }
            };
            let rows = track_rows(&mut tracks, &pb).await;
            pb.finish_and_clear();

            if rows.is_empty() {
                warning!("No tracks found.");
                return;
            }
            success!("Found {} tracks", rows.len());
            println!("{}", Table::new(rows));
        }
        SearchKind::Playlist | SearchKind::Album => {
            let result = if kind == SearchKind::Playlist {
                api.search_playlists(keyword, limit, offset).await
            } else {
                api.search_albums(keyword, limit, offset).await
            };
            pb.finish_and_clear();

            let lists = match result {
                Ok(lists) => lists,
                Err(e) => error!("Search failed. Err: {}", e),
            };
            if lists.is_empty() {
                warning!("Nothing found.");
                return;
            }

            success!("Found {} results", lists.len());
            let rows = lists
                .into_iter()
                .map(|l| PlaylistTableRow {
                    id: l.id,
                    name: l.name,
                    url: l.url,
                })
                .collect::<Vec<_>>();
            println!("{}", Table::new(rows));
        }
    }
}

/// Classifies `input` (a link or a bare id) and fetches the item it names.
pub async fn open(ctx: &Context, input: &str, provider: Option<&str>, limit: usize) {
    let (api, data) = match ctx.pool.resolve(input, provider).await {
        Some(found) => found,
        None => error!("No configured provider recognizes '{}'. Try --provider.", input),
    };
    info!("{} -> {}", api.name(), data);

    match data.kind {
        MusicUrlType::Music | MusicUrlType::Number => {
            let pb = spinner("Loading track...");
            let mut track = match api.fetch_track(&data.id).await {
                Ok(track) => track,
                Err(e) => {
                    pb.finish_and_clear();
                    error!("Cannot load track. Err: {}", e);
                }
            };
            let rows = track_rows(std::slice::from_mut(&mut track), &pb).await;
            pb.finish_and_clear();
            println!("{}", Table::new(rows));
        }
        MusicUrlType::PlayList | MusicUrlType::Album => {
            let pb = spinner(format!("Loading {}...", data.id));
            let result = if data.kind == MusicUrlType::PlayList {
                api.fetch_playlist(&data.id, limit).await
            } else {
                api.fetch_album(&data.id, limit).await
            };
            let mut list = match result {
                Ok(list) => list,
                Err(e) => {
                    pb.finish_and_clear();
                    error!("Cannot load {}. Err: {}", data.id, e);
                }
            };
            print_listing(&mut list, &pb).await;
        }
        MusicUrlType::None => warning!("'{}' is neither a track, playlist nor album link.", input),
    }
}

async fn print_listing(list: &mut PlayListMeta, pb: &indicatif::ProgressBar) {
    let rows = match list.music_list.as_mut() {
        Some(tracks) => track_rows(tracks, pb).await,
        None => Vec::new(),
    };
    pb.finish_and_clear();

    success!("{} ({} tracks)", list.name, rows.len());
    info!("{}", list.url);
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }
}
