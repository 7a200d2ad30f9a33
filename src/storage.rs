use std::path::Path;

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument};

/// Titles are truncated to this many characters before persisting.
const TITLE_LIMIT: usize = 200;

/// Deterministic dedup key for a news item. The entity is part of the key:
/// the same article matched against a different entity is a different post.
pub fn fingerprint(title: &str, link: &str, entity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(link.as_bytes());
    hasher.update(b"|");
    hasher.update(entity.as_bytes());

    hex::encode(hasher.finalize())
}

pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        let pool = SqlitePoolOptions::new()
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .journal_mode(SqliteJournalMode::Delete)
                    .create_if_missing(true),
            )
            .await
            .with_context(|| anyhow!("could not open a SQLite database `{}`", db_path.display()))?;
        info!("Using an SQLite database `{}`", db_path.display());

        Self::with_pool(pool).await
    }

    /// A private in-memory database; nothing survives the process.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        use std::str::FromStr;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::from_str("sqlite::memory:")
                    .context("could not parse the in-memory SQLite URL")?,
            )
            .await
            .context("could not open an in-memory SQLite database")?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("could not prepare a database schema")?;

        Ok(Self { pool })
    }

    #[instrument(level = "TRACE", skip(self))]
    pub async fn has_seen(&self, fingerprint: &str) -> Result<bool> {
        let row: Option<i64> = sqlx::query_scalar(
            "SELECT 1
            FROM sent_posts
            WHERE fingerprint = ?1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .context("could not look up a fingerprint")?;

        Ok(row.is_some())
    }

    /// Records a delivered post. Inserting a fingerprint that is already
    /// present is a no-op, not an error.
    #[instrument(level = "TRACE", skip(self, title))]
    pub async fn mark_seen(&self, fingerprint: &str, entity: &str, title: &str) -> Result<()> {
        let title = title.chars().take(TITLE_LIMIT).collect::<String>();

        sqlx::query(
            "INSERT
            INTO sent_posts (fingerprint, entity, title, sent_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (fingerprint) DO NOTHING",
        )
        .bind(fingerprint)
        .bind(entity)
        .bind(title)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await
        .context("could not record a sent post")?;

        Ok(())
    }

    /// Deletes records older than the retention window. Runs at process
    /// start, before any source is polled.
    #[instrument(level = "TRACE", skip(self))]
    pub async fn prune(&self, retention: Duration) -> Result<u64> {
        let cutoff = OffsetDateTime::now_utc() - retention;

        let deleted = sqlx::query(
            "DELETE
            FROM sent_posts
            WHERE sent_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("could not prune old sent posts")?
        .rows_affected();

        if deleted > 0 {
            debug!("Pruned {deleted} sent posts older than the retention window");
        }

        Ok(deleted)
    }

    #[cfg(test)]
    async fn stored_title(&self, fingerprint: &str) -> Result<Option<String>> {
        Ok(sqlx::query_scalar(
            "SELECT title
            FROM sent_posts
            WHERE fingerprint = ?1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?)
    }

    #[cfg(test)]
    async fn mark_seen_at(
        &self,
        fingerprint: &str,
        entity: &str,
        title: &str,
        sent_at: OffsetDateTime,
    ) -> Result<()> {
        sqlx::query(
            "INSERT
            INTO sent_posts (fingerprint, entity, title, sent_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (fingerprint) DO NOTHING",
        )
        .bind(fingerprint)
        .bind(entity)
        .bind(title)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[cfg(test)]
    async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM sent_posts")
            .fetch_one(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::{fingerprint, Storage};

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("title", "https://example.com/a", "Nintendo");
        let b = fingerprint("title", "https://example.com/a", "Nintendo");

        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_depends_on_the_entity() {
        let a = fingerprint("title", "https://example.com/a", "Nintendo");
        let b = fingerprint("title", "https://example.com/a", "The Legend of Zelda");

        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn marking_twice_leaves_one_record() {
        let storage = Storage::in_memory().await.unwrap();
        let fp = fingerprint("t", "l", "e");

        storage.mark_seen(&fp, "Nintendo", "t").await.unwrap();
        storage.mark_seen(&fp, "Nintendo", "t").await.unwrap();

        assert!(storage.has_seen(&fp).await.unwrap());
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn titles_are_truncated() {
        let storage = Storage::in_memory().await.unwrap();
        let fp = fingerprint("t", "l", "e");
        let long_title = "x".repeat(500);

        storage.mark_seen(&fp, "Nintendo", &long_title).await.unwrap();

        let title = storage.stored_title(&fp).await.unwrap().unwrap();
        assert_eq!(title.chars().count(), 200);
    }

    #[tokio::test]
    async fn prune_respects_the_retention_window() {
        let storage = Storage::in_memory().await.unwrap();
        let now = OffsetDateTime::now_utc();

        storage
            .mark_seen_at("old", "Sony", "old post", now - Duration::days(6))
            .await
            .unwrap();
        storage
            .mark_seen_at("recent", "Sony", "recent post", now - Duration::days(2))
            .await
            .unwrap();

        let deleted = storage.prune(Duration::days(5)).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(!storage.has_seen("old").await.unwrap());
        assert!(storage.has_seen("recent").await.unwrap());
    }
}
