use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use vinylshelf::{
    cli::{self, Session},
    config, error,
    types::Decade,
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
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify
    Auth,

    /// Forget stored tokens
    Logout,

    /// Scan saved tracks and list albums by release decade
    Library(LibraryOptions),

    /// Play an album or playlist by URI
    Play(PlayOptions),

    /// Resume playback on the active device
    Resume,

    /// Pause playback
    Pause,

    /// Skip to the next track
    Next,

    /// Go back to the previous track
    Previous,

    /// Show the current track
    NowPlaying,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct LibraryOptions {
    /// Only print one decade (2020s, 2010s, 2000s, 1990s, 1980s, classic)
    #[clap(long)]
    pub decade: Option<Decade>,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// Context URI, e.g. spotify:album:...
    pub uri: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let session = Session::open().await;
    match cli.command {
        Command::Auth => cli::auth(&session).await,
        Command::Logout => cli::logout(&session).await,
        Command::Library(opt) => cli::library(&session, opt.decade).await,
        Command::Play(opt) => cli::play(&session, &opt.uri).await,
        Command::Resume => cli::resume(&session).await,
        Command::Pause => cli::pause(&session).await,
        Command::Next => cli::next(&session).await,
        Command::Previous => cli::previous(&session).await,
        Command::NowPlaying => cli::now_playing(&session).await,
        Command::Completions(_) => {}
    }
}
