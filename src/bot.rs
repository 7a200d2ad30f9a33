use anyhow::{anyhow, Context, Result};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};
use reqwest_middleware::ClientWithMiddleware;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::compose::{interpolate_entity, Composer, UniformPick, CURATED_STUBS};
use crate::config::{Config, FeedSource};
use crate::entity::{match_entity, Entity};
use crate::feed::{self, FeedItem};
use crate::fetch;
use crate::images;
use crate::storage::{fingerprint, Storage};
use crate::telegram::TelegramClient;
use crate::translate::Translator;

/// One-shot pipeline: prune the dedup store, scan a random subset of
/// sources, post the first fresh matched item, or fall back to a curated
/// post.
pub struct Bot {
    cfg: Config,
    storage: Storage,
    feed_client: ClientWithMiddleware,
    http_client: reqwest::Client,
    translator: Translator,
    composer: Composer<UniformPick>,
    telegram: TelegramClient,
    rng: SmallRng,
}

impl Bot {
    pub async fn new(cfg: Config, bot_token: &str, channel_id: String) -> Result<Self> {
        let storage = Storage::new(&cfg.db_path).await?;
        let feed_client = fetch::feed_client(cfg.cache_dir.clone())?;
        let http_client = fetch::http_client()?;
        let translator = Translator::new(http_client.clone(), cfg.translation.clone());
        let composer = Composer::new(cfg.message_format.markup(), UniformPick::new());
        let telegram = TelegramClient::new(
            http_client.clone(),
            &cfg.telegram_base_url,
            bot_token,
            channel_id,
            cfg.message_format.parse_mode(),
        );

        Ok(Self {
            cfg,
            storage,
            feed_client,
            http_client,
            translator,
            composer,
            telegram,
            rng: SmallRng::from_rng(thread_rng()).unwrap(),
        })
    }

    pub async fn run(mut self) -> Result<()> {
        self.storage.prune(self.cfg.retention.into()).await?;

        let mut sources = self.cfg.sources.clone();
        sources.shuffle(&mut self.rng);
        sources.truncate(self.cfg.sources_per_run);

        info!("Looking for fresh gaming news across {} sources", sources.len());

        for source in &sources {
            match self.scan_source(source).await {
                Ok(true) => return Ok(()),

                Ok(false) => {}

                Err(e) => {
                    warn!("Skipping the source `{}`: {e:#}", source.name);
                }
            }
        }

        info!("No fresh matched news anywhere; sending a curated post");

        self.send_curated().await
    }

    /// Scans one source. Returns `Ok(true)` once a post has been delivered.
    async fn scan_source(&mut self, source: &FeedSource) -> Result<bool> {
        debug!("Checking {} ({})", source.name, source.lang);

        let response = self
            .feed_client
            .get(source.url.as_str())
            .send()
            .await
            .map_err(anyhow::Error::from)
            .and_then(|r| r.error_for_status().context("server returned an error"))
            .with_context(|| anyhow!("could not fetch `{}`", source.url))?;
        let body = response
            .bytes()
            .await
            .with_context(|| anyhow!("could not read the response from `{}`", source.url))?;

        let items = feed::parse_feed(&body)
            .with_context(|| anyhow!("could not parse the feed of `{}`", source.name))?;

        let now = OffsetDateTime::now_utc();
        let fresh = items
            .iter()
            .take(self.cfg.entries_per_source)
            .filter(|item| feed::is_fresh(item, self.cfg.max_item_age.into(), now))
            .take(self.cfg.fresh_per_source)
            .collect::<Vec<_>>();

        debug!("{}: {} fresh items", source.name, fresh.len());

        for item in fresh {
            if item.title.is_empty() {
                continue;
            }

            let catalog =
                &self.cfg.entities[..self.cfg.entities_per_scan.min(self.cfg.entities.len())];
            let Some(entity) = match_entity(&item.full_text(), catalog).cloned() else {
                continue;
            };

            let fp = fingerprint(&item.title, &item.link, &entity.name);
            if self.storage.has_seen(&fp).await? {
                debug!("Already posted: {}", item.title);
                continue;
            }

            match self.publish(item, &entity, &fp).await {
                Ok(()) => return Ok(true),

                Err(e) => {
                    warn!("Could not publish `{}`: {e:#}", item.title);
                }
            }
        }

        Ok(false)
    }

    async fn publish(&mut self, item: &FeedItem, entity: &Entity, fp: &str) -> Result<()> {
        info!("Processing a fresh {} item: {}", entity.name, item.title);

        let image = images::find_article_image(&self.http_client, &item.link).await;
        let raw = item.full_text();
        let translated = self.translator.translate(&raw).await;
        let post = self.composer.compose(entity, &raw, &translated)?;

        let delivered = self.telegram.send(&post, image.as_ref()).await?;
        self.storage.mark_seen(fp, &entity.name, &item.title).await?;

        info!("Sent a {:?} post about {}", delivered, entity.name);

        Ok(())
    }

    /// Fallback post built from the curated entity list and a canned stub;
    /// goes through the same compose/translate path, without an image.
    async fn send_curated(&mut self) -> Result<()> {
        let name = self
            .cfg
            .curated_entities
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| anyhow!("the curated entity list is empty"))?;
        let entity = self
            .cfg
            .entities
            .iter()
            .find(|entity| entity.name == name)
            .cloned()
            .unwrap_or(Entity { name, emoji: None });

        let stub = CURATED_STUBS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(CURATED_STUBS[0]);
        let content = interpolate_entity(stub, &entity.name);

        let translated = self.translator.translate(&content).await;
        let post = self.composer.compose(&entity, &content, &translated)?;

        self.telegram.send(&post, None).await?;

        info!("Curated post sent");

        Ok(())
    }
}
