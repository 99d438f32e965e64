use super::{Context, spinner};
use crate::{error, success, types::PlayableUrl, warning};

/// Resolves a track id to a playable URL and prints it.
pub async fn play(ctx: &Context, provider: &str, id: &str) {
    let api = ctx.provider(provider).await;
    let pb = spinner(format!("Resolving {} on {}...", id, api.name()));

    let mut track = match api.fetch_track(id).await {
        Ok(track) => track,
        Err(e) => {
            pb.finish_and_clear();
            error!("Cannot load track. Err: {}", e);
        }
    };
    if let Err(e) = track.init_music_info().await {
        pb.suspend(|| warning!("Cannot load track details. Err: {}", e));
    }

    let resolved = api.resolve_playable_url(&track).await;
    pb.finish_and_clear();

    match resolved {
        Ok(PlayableUrl::Ready(url)) => {
            success!("{}", track.full_name());
            println!("{}", url);
        }
        Ok(PlayableUrl::Unavailable(reason)) => {
            warning!("{} is not playable: {}", track.full_name(), reason)
        }
        Err(e) => error!("Cannot resolve track. Err: {}", e),
    }
}
