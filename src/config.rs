mod types;

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use take_mut::take;
use tracing::{debug, info};

use crate::compose::style::MessageFormat;
use crate::entity::Entity;

pub use self::types::*;

fn default_max_item_age() -> Duration {
    Config::default().max_item_age
}

fn default_retention() -> Duration {
    Config::default().retention
}

fn default_sources_per_run() -> usize {
    Config::default().sources_per_run
}

fn default_entries_per_source() -> usize {
    Config::default().entries_per_source
}

fn default_fresh_per_source() -> usize {
    Config::default().fresh_per_source
}

fn default_entities_per_scan() -> usize {
    Config::default().entities_per_scan
}

fn default_telegram_base_url() -> String {
    Config::default().telegram_base_url
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Items older than this are not considered for posting.
    #[serde(default = "default_max_item_age")]
    pub max_item_age: Duration,

    /// Sent-post records older than this are pruned at startup.
    #[serde(default = "default_retention")]
    pub retention: Duration,

    #[serde(default = "default_sources_per_run")]
    pub sources_per_run: usize,

    #[serde(default = "default_entries_per_source")]
    pub entries_per_source: usize,

    #[serde(default = "default_fresh_per_source")]
    pub fresh_per_source: usize,

    #[serde(default = "default_entities_per_scan")]
    pub entities_per_scan: usize,

    #[serde(default = "default_telegram_base_url")]
    pub telegram_base_url: String,

    #[serde(default)]
    pub message_format: MessageFormat,

    #[serde(default)]
    pub translation: TranslationConfig,

    /// Feed catalog. The per-run subset is chosen at random.
    #[serde(default = "default_sources")]
    pub sources: Vec<FeedSource>,

    /// Entity catalog. Order is a priority signal: earlier entries win on
    /// ambiguous matches.
    #[serde(default = "default_entities")]
    pub entities: Vec<Entity>,

    /// Entities eligible for the curated fallback post.
    #[serde(default = "default_curated_entities")]
    pub curated_entities: Vec<String>,
}

fn default_db_path() -> PathBuf {
    Config::default().db_path
}

impl Config {
    pub fn update(&mut self, args: crate::cli::Args) {
        fn set_if_some<T>(dst: &mut T, v: Option<T>) {
            if let Some(v) = v {
                *dst = v;
            }
        }

        set_if_some(&mut self.db_path, args.db_path);
        set_if_some(&mut self.cache_dir, args.cache_dir.map(Some));
    }

    pub fn resolve_relative_paths(&mut self, config_dir: impl AsRef<Path>) {
        let config_dir = config_dir.as_ref();

        // do the dance for safety (so that I don't forget to update this after adding new fields).
        take(self, |this| Self {
            db_path: config_dir.join(&this.db_path),
            cache_dir: this.cache_dir.map(|cache_dir| config_dir.join(cache_dir)),
            max_item_age: this.max_item_age,
            retention: this.retention,
            sources_per_run: this.sources_per_run,
            entries_per_source: this.entries_per_source,
            fresh_per_source: this.fresh_per_source,
            entities_per_scan: this.entities_per_scan,
            telegram_base_url: this.telegram_base_url,
            message_format: this.message_format,
            translation: this.translation,
            sources: this.sources,
            entities: this.entities,
            curated_entities: this.curated_entities,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: "./gamewire.sqlite3".into(),
            cache_dir: None,
            max_item_age: Duration::from_secs(12 * 3600),
            retention: Duration::from_secs(5 * 86400),
            sources_per_run: 8,
            entries_per_source: 8,
            fresh_per_source: 3,
            entities_per_scan: 30,
            telegram_base_url: "https://api.telegram.org".into(),
            message_format: Default::default(),
            translation: Default::default(),
            sources: default_sources(),
            entities: default_entities(),
            curated_entities: default_curated_entities(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FeedSource {
    pub name: String,
    pub url: String,

    #[serde(default = "default_source_lang")]
    pub lang: String,
}

fn default_source_lang() -> String {
    "en".into()
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_url")]
    pub url: String,

    #[serde(default = "default_translation_source")]
    pub source_lang: String,

    #[serde(default = "default_translation_target")]
    pub target_lang: String,
}

fn default_translation_url() -> String {
    TranslationConfig::default().url
}

fn default_translation_source() -> String {
    TranslationConfig::default().source_lang
}

fn default_translation_target() -> String {
    TranslationConfig::default().target_lang
}

impl Default for TranslationConfig {
    fn default() -> Self {
        TranslationConfig {
            url: "https://libretranslate.de/translate".into(),
            source_lang: "en".into(),
            target_lang: "ru".into(),
        }
    }
}

fn default_sources() -> Vec<FeedSource> {
    fn src(name: &str, url: &str) -> FeedSource {
        FeedSource {
            name: name.into(),
            url: url.into(),
            lang: default_source_lang(),
        }
    }

    vec![
        src("IGN Games", "http://feeds.ign.com/ign/games-all"),
        src("GameSpot", "https://www.gamespot.com/feeds/game-news/"),
        src("Polygon", "https://www.polygon.com/rss/index.xml"),
        src("Kotaku", "https://kotaku.com/rss"),
        src("PC Gamer", "http://www.pcgamer.com/rss/"),
        src("Rock Paper Shotgun", "https://www.rockpapershotgun.com/feed/"),
        src("Eurogamer", "https://www.eurogamer.net/feed.php"),
        src("Game Informer", "https://www.gameinformer.com/news.xml"),
        src("Destructoid", "https://www.destructoid.com/feed/"),
        src("Nintendo Life", "http://www.nintendolife.com/feeds/latest"),
        src("PlayStation Blog", "https://blog.playstation.com/feed/"),
        src("Xbox Wire", "https://news.xbox.com/en-us/feed/"),
    ]
}

fn default_entities() -> Vec<Entity> {
    fn known(name: &str, emoji: &str) -> Entity {
        Entity {
            name: name.into(),
            emoji: Some(emoji.into()),
        }
    }

    fn plain(name: &str) -> Entity {
        Entity {
            name: name.into(),
            emoji: None,
        }
    }

    vec![
        // companies
        known("Nintendo", "🎮"),
        known("Sony", "🎯"),
        known("Microsoft", "⚡"),
        known("Valve", "🔷"),
        known("Electronic Arts", "🎲"),
        known("Ubisoft", "🏰"),
        known("Activision", "🎯"),
        known("Blizzard", "❄️"),
        known("Square Enix", "⚔️"),
        known("Capcom", "🐉"),
        plain("Bandai Namco"),
        plain("Sega"),
        plain("Epic Games"),
        plain("CD Projekt"),
        plain("Rockstar Games"),
        plain("Bethesda"),
        plain("Naughty Dog"),
        plain("FromSoftware"),
        plain("BioWare"),
        plain("Bungie"),
        // games and franchises
        known("The Legend of Zelda", "🗡️"),
        known("Mario", "🍄"),
        known("Halo", "👑"),
        known("Call of Duty", "🔫"),
        known("Fortnite", "💣"),
        known("Minecraft", "⛏️"),
        known("GTA", "🚗"),
        known("Elden Ring", "💍"),
        known("Cyberpunk 2077", "🔮"),
        known("Starfield", "🚀"),
        known("God of War", "⚡"),
        known("The Last of Us", "🧟"),
        known("Final Fantasy", "🎭"),
        known("Resident Evil", "🧪"),
        known("Dark Souls", "🔥"),
        plain("Overwatch"),
        plain("World of Warcraft"),
        plain("Apex Legends"),
        plain("Valorant"),
        plain("League of Legends"),
        plain("Dota 2"),
        plain("Counter-Strike"),
        plain("Battlefield"),
        plain("Assassin's Creed"),
        plain("Far Cry"),
        plain("Watch Dogs"),
        plain("The Witcher"),
        plain("Fallout"),
        plain("Elder Scrolls"),
        plain("Doom"),
        plain("Animal Crossing"),
        plain("Pokémon"),
        plain("Metroid"),
        plain("Street Fighter"),
        plain("Tekken"),
        plain("Sonic"),
        plain("Persona"),
        plain("Mass Effect"),
        plain("Dragon Age"),
    ]
}

fn default_curated_entities() -> Vec<String> {
    ["Nintendo", "Sony", "Microsoft", "Valve", "Ubisoft", "CD Projekt"]
        .map(String::from)
        .into()
}

pub fn load(search_paths: &[PathBuf]) -> Result<Config> {
    for path in search_paths {
        debug!("Trying to load {}", path.display());
        let mut contents = String::new();

        {
            let mut f = match File::open(path) {
                Ok(f) => f,

                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(file = %path.display(), "File not found, skipping");
                    continue;
                }

                Err(e) => {
                    return Err(e)
                        .context(anyhow!("could not load a config file `{}`", path.display()));
                }
            };

            f.read_to_string(&mut contents).with_context(|| {
                anyhow!(
                    "could not read the contents of a config file `{}`",
                    path.display()
                )
            })?;
        }

        let mut cfg: Config = toml::from_str(&contents)
            .with_context(|| anyhow!("could not load the config file `{}`", path.display()))?;

        if let Some(parent) = path.parent() {
            cfg.resolve_relative_paths(parent);
        }

        info!("Loaded a config file `{}`", path.display());

        return Ok(cfg);
    }

    info!("Using the default config");

    Ok(Default::default())
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn default_catalog_orders_companies_before_franchises() {
        let cfg = Config::default();
        let pos = |name: &str| {
            cfg.entities
                .iter()
                .position(|e| e.name == name)
                .unwrap_or_else(|| panic!("`{name}` missing from the default catalog"))
        };

        assert!(pos("Nintendo") < pos("The Legend of Zelda"));
        assert!(pos("Sony") < pos("The Last of Us"));
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let cfg: Config = toml::from_str("max-item-age = \"6h\"").unwrap();

        assert_eq!(cfg.sources_per_run, 8);
        assert_eq!(cfg.sources.len(), 12);
        assert!(!cfg.entities.is_empty());
    }
}
