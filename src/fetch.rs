use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use http_cache_reqwest::{CACacheManager, Cache, HttpCache, MokaCache, MokaManager};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tracing::debug;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const FEED_TIMEOUT: Duration = Duration::from_secs(30);
pub const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("gamewire/", env!("CARGO_PKG_VERSION"));

/// Plain HTTP client for article pages, images and the external APIs.
/// Per-call timeouts are set at the request site; `FETCH_TIMEOUT` is the
/// default.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("could not create an HTTP client")
}

/// Caching HTTP client for feed fetches. The process is one-shot, so with a
/// configured cache dir the on-disk cache carries over between scheduled
/// runs; otherwise the cache only spans a single run.
pub fn feed_client(cache_dir: Option<PathBuf>) -> Result<ClientWithMiddleware> {
    let builder = ClientBuilder::new(
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(FEED_TIMEOUT)
            .build()
            .context("could not create an HTTP client")?,
    );

    let builder = if let Some(path) = cache_dir {
        debug!("Using a file cache at {}", path.display());
        builder.with(Cache(HttpCache {
            mode: Default::default(),
            manager: CACacheManager { path },
            options: Default::default(),
        }))
    } else {
        debug!("Using an in-memory cache");
        builder.with(Cache(HttpCache {
            mode: Default::default(),
            manager: MokaManager::new(MokaCache::builder().max_capacity(8192).build()),
            options: Default::default(),
        }))
    };

    Ok(builder.build())
}
