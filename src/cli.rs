use clap::ValueHint;

use std::path::PathBuf;

#[derive(clap::Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Path to the config file.
    ///
    /// By default, gamewire looks for a file named `gamewire.toml` in the following directories
    /// (in order):
    ///
    /// - `./` (the current directory)
    /// - `/etc`
    #[arg(
        short,
        env = "GAMEWIRE_CONFIG",
        value_hint(ValueHint::FilePath)
    )]
    pub config_path: Option<PathBuf>,

    /// Path to the database file.
    #[arg(long, env = "GAMEWIRE_DB", value_hint(ValueHint::FilePath))]
    pub db_path: Option<PathBuf>,

    /// Path to the HTTP cache directory.
    #[arg(long, env = "GAMEWIRE_CACHE_DIR", value_hint(ValueHint::DirPath))]
    pub cache_dir: Option<PathBuf>,

    /// Telegram bot token.
    #[arg(long, env = "GAMEWIRE_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Identifier of the channel (or chat) posts are delivered to.
    #[arg(long, env = "GAMEWIRE_CHANNEL_ID")]
    pub channel_id: String,
}

impl Args {
    pub fn parse() -> Self {
        clap::Parser::parse()
    }
}
