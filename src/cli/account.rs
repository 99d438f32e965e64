use tabled::Table;

use super::Context;
use crate::{error, info, success, types::ProviderTableRow, warning};

pub async fn login(ctx: &Context, provider: &str, args: &[String]) {
    let api = ctx.provider(provider).await;
    match api.login(args).await {
        Ok(status) => info!("[{}] {}", api.name(), status),
        Err(e) => error!("Login request failed. Err: {}", e),
    }
}

pub async fn whoami(ctx: &Context, provider: &str) {
    let api = ctx.provider(provider).await;
    match api.fetch_current_user().await {
        Ok(Some(user)) => {
            success!("{} ({})", user.name, user.id);
            info!("{}", user.url);
            if !user.extra.is_empty() {
                info!("{}", user.extra);
            }
        }
        Ok(None) => warning!(
            "Not logged in to {}. Run `tunehub login {} ...` first.",
            api.name(),
            provider
        ),
        Err(e) => error!("Cannot fetch user info. Err: {}", e),
    }
}

pub async fn providers(ctx: &Context) {
    let configured = ctx.pool.list().await;
    if configured.is_empty() {
        warning!("No providers configured in {}", ctx.store.path().display());
        return;
    }

    let mut rows = Vec::with_capacity(configured.len());
    for provider in configured {
        rows.push(ProviderTableRow {
            key: provider.key.clone(),
            name: provider.api.name().to_string(),
            aliases: provider.aliases().join(", "),
            server: provider.api.api_server_url().await,
        });
    }

    info!("Configuration: {}", ctx.store.path().display());
    info!(
        "Known types: {}",
        ctx.registry
            .kinds()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("{}", Table::new(rows));
}
