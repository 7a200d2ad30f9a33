mod bot;
mod cli;
mod compose;
mod config;
mod entity;
mod feed;
mod fetch;
mod images;
mod storage;
mod telegram;
mod template;
mod translate;

use std::process::ExitCode;

use anyhow::Result;
use bot::Bot;
use cli::Args;
use tracing::error;
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn set_up_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_regex(false)
                .with_default_directive(Level::INFO.into())
                .with_env_var("GAMEWIRE_LOG")
                .from_env_lossy(),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    set_up_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,

        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let mut args = Args::parse();
    let config_paths = args
        .config_path
        .take()
        .into_iter()
        .chain(["./gamewire.toml".into(), "/etc/gamewire.toml".into()])
        .collect::<Vec<_>>();
    let mut config = config::load(&config_paths)?;

    let bot_token = args.bot_token.clone();
    let channel_id = args.channel_id.clone();
    config.update(args);

    let bot = Bot::new(config, &bot_token, channel_id).await?;

    bot.run().await
}
