use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use tunehub::{
    cli::{self, Context, SearchKind},
    config, error,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search a provider for tracks, playlists or albums
    Search(SearchOptions),

    /// Open a link or id and list what it points to
    Open(OpenOptions),

    /// Resolve a track to a playable URL
    Play(PlayOptions),

    /// Log in to a provider (e.g. `login wy qr`, `login qq set <cookie>`)
    Login(LoginOptions),

    /// Show the account behind a provider's session cookie
    Whoami(WhoamiOptions),

    /// List configured providers
    Providers,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Provider key, type, name or alias
    provider: String,

    keyword: String,

    #[clap(long, value_enum, default_value_t = SearchKind::Track)]
    kind: SearchKind,

    #[clap(long, default_value_t = 10)]
    limit: u32,

    #[clap(long, default_value_t = 0)]
    offset: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct OpenOptions {
    /// Link or bare id
    input: String,

    /// Skip URL detection and use this provider
    #[clap(long)]
    provider: Option<String>,

    /// Maximum number of tracks to list, 0 for all
    #[clap(long, default_value_t = 0)]
    limit: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    provider: String,
    id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct LoginOptions {
    provider: String,

    /// Mode followed by its parameters
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct WhoamiOptions {
    provider: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command_for_update();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let ctx = match Context::load().await {
        Ok(ctx) => ctx,
        Err(e) => error!("Cannot load providers. Err: {}", e),
    };

    match cli.command {
        Command::Search(opt) => {
            cli::search(&ctx, &opt.provider, &opt.keyword, opt.kind, opt.limit, opt.offset).await
        }
        Command::Open(opt) => cli::open(&ctx, &opt.input, opt.provider.as_deref(), opt.limit).await,
        Command::Play(opt) => cli::play(&ctx, &opt.provider, &opt.id).await,
        Command::Login(opt) => cli::login(&ctx, &opt.provider, &opt.args).await,
        Command::Whoami(opt) => cli::whoami(&ctx, &opt.provider).await,
        Command::Providers => cli::providers(&ctx).await,
        Command::Completions(_) => {}
    }

    ctx.shutdown().await;
}
