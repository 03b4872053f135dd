//! PostgreSQL news store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};

use super::{check_item, NewsStore, SaveReport};
use crate::error::Result;
use crate::schemas::NewsItem;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS news_items (
        guid         TEXT PRIMARY KEY,
        source_id    TEXT NOT NULL,
        language     TEXT NOT NULL,
        title        TEXT NOT NULL,
        description  TEXT NOT NULL DEFAULT '',
        content      TEXT NOT NULL DEFAULT '',
        link         TEXT NOT NULL,
        published_at TIMESTAMPTZ NOT NULL,
        fetched_at   TIMESTAMPTZ NOT NULL,
        author       TEXT,
        categories   TEXT[] NOT NULL DEFAULT '{}',
        image_url    TEXT,
        created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS news_items_source_recent ON news_items (source_id, published_at DESC)",
    "CREATE INDEX IF NOT EXISTS news_items_language_recent ON news_items (language, published_at DESC)",
];

const UPSERT: &str = r#"
    INSERT INTO news_items (
        guid, source_id, language, title, description, content, link,
        published_at, fetched_at, author, categories, image_url, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW())
    ON CONFLICT (guid) DO UPDATE SET
        source_id = EXCLUDED.source_id,
        language = EXCLUDED.language,
        title = EXCLUDED.title,
        description = EXCLUDED.description,
        content = EXCLUDED.content,
        link = EXCLUDED.link,
        published_at = EXCLUDED.published_at,
        author = EXCLUDED.author,
        categories = EXCLUDED.categories,
        image_url = EXCLUDED.image_url,
        updated_at = NOW()
"#;

const SELECT_COLUMNS: &str = "guid, source_id, language, title, description, content, link, \
     published_at, fetched_at, author, categories, image_url";

#[derive(Debug, FromRow)]
struct NewsRow {
    guid: String,
    source_id: String,
    language: String,
    title: String,
    description: String,
    content: String,
    link: String,
    published_at: DateTime<Utc>,
    fetched_at: DateTime<Utc>,
    author: Option<String>,
    categories: Vec<String>,
    image_url: Option<String>,
}

impl From<NewsRow> for NewsItem {
    fn from(row: NewsRow) -> Self {
        Self {
            guid: row.guid,
            source_id: row.source_id,
            language: row.language,
            title: row.title,
            description: row.description,
            content: row.content,
            link: row.link,
            published_at: row.published_at,
            fetched_at: row.fetched_at,
            author: row.author,
            categories: row.categories,
            image_url: row.image_url,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and makes sure the table exists
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self::from_pool(pool);
        store.ensure_schema().await?;
        info!("News store initialized");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn select(&self, column: &str, value: &str, limit: usize) -> Result<Vec<NewsItem>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM news_items WHERE {column} = $1 \
             ORDER BY published_at DESC, guid ASC LIMIT $2"
        );
        let rows: Vec<NewsRow> = sqlx::query_as(&sql)
            .bind(value)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(NewsItem::from).collect())
    }
}

#[async_trait]
impl NewsStore for PgStore {
    async fn save(&self, items: &[NewsItem]) -> Result<SaveReport> {
        let mut report = SaveReport::default();
        if items.is_empty() {
            return Ok(report);
        }

        // One connection for the batch; failing to get it loses the batch
        let mut conn = self.pool.acquire().await?;

        for item in items {
            if let Err(e) = check_item(item) {
                warn!(error = %e, "Skipping item");
                report.failed += 1;
                continue;
            }

            let result = sqlx::query(UPSERT)
                .bind(&item.guid)
                .bind(&item.source_id)
                .bind(&item.language)
                .bind(&item.title)
                .bind(&item.description)
                .bind(&item.content)
                .bind(&item.link)
                .bind(item.published_at)
                .bind(item.fetched_at)
                .bind(&item.author)
                .bind(&item.categories)
                .bind(&item.image_url)
                .execute(&mut *conn)
                .await;

            match result {
                Ok(_) => report.upserted += 1,
                Err(e) => {
                    warn!(guid = %item.guid, source = %item.source_id, error = %e, "Upsert failed");
                    report.failed += 1;
                }
            }
        }

        debug!(upserted = report.upserted, failed = report.failed, "Stored news batch");
        Ok(report)
    }

    async fn find_by_source(&self, source_id: &str, limit: usize) -> Result<Vec<NewsItem>> {
        self.select("source_id", source_id, limit).await
    }

    async fn find_by_language(&self, language: &str, limit: usize) -> Result<Vec<NewsItem>> {
        self.select("language", language, limit).await
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
