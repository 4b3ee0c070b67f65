//! SQLite-backed post repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::path::Path;

use crate::error::{Result, StorageError};
use crate::repo::{PostFilter, PostRepository};
use crate::types::{
    EngagementMetrics, Platform, PostError, PostMetadata, PostStatus, ScheduledPost,
    UniversalContent,
};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `db_path` and run migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::IoError)?;
        }

        // Use forward slashes for the SQLite URL and mode=rwc so the file is
        // created when missing
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(StorageError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StorageError::MigrationError)?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Result<ScheduledPost> {
        let platform: String = row.get("platform");
        let status: String = row.get("status");
        let content: String = row.get("content");
        let engagement: Option<String> = row.get("engagement");
        let error: Option<String> = row.get("error");

        let content: UniversalContent =
            serde_json::from_str(&content).map_err(StorageError::SerializeError)?;
        let engagement: Option<EngagementMetrics> = engagement
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::SerializeError)?;
        let error: Option<PostError> = error
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::SerializeError)?;

        Ok(ScheduledPost {
            id: row.get("id"),
            platform: platform
                .parse::<Platform>()
                .unwrap_or_default(),
            content,
            scheduled_at: timestamp_to_datetime(row.get("scheduled_at")),
            status: status.parse::<PostStatus>().unwrap_or(PostStatus::Failed),
            created_at: timestamp_to_datetime(row.get("created_at")),
            published_at: row
                .get::<Option<i64>, _>("published_at")
                .map(timestamp_to_datetime),
            platform_post_id: row.get("platform_post_id"),
            metadata: PostMetadata {
                campaign: row.get("campaign"),
                content_type: row.get("content_type"),
                retry_count: row.get::<i64, _>("retry_count") as u32,
            },
            engagement,
            error,
        })
    }
}

fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

fn encode_optional<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(|e| StorageError::SerializeError(e).into())
}

#[async_trait]
impl PostRepository for Database {
    async fn insert(&self, post: &ScheduledPost) -> Result<()> {
        let content = serde_json::to_string(&post.content).map_err(StorageError::SerializeError)?;

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, platform, status, content, scheduled_at, created_at,
                published_at, platform_post_id, campaign, content_type,
                retry_count, engagement, error
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(post.platform.as_str())
        .bind(post.status.as_str())
        .bind(content)
        .bind(post.scheduled_at.timestamp())
        .bind(post.created_at.timestamp())
        .bind(post.published_at.map(|t| t.timestamp()))
        .bind(&post.platform_post_id)
        .bind(&post.metadata.campaign)
        .bind(&post.metadata.content_type)
        .bind(post.metadata.retry_count as i64)
        .bind(encode_optional(&post.engagement)?)
        .bind(encode_optional(&post.error)?)
        .execute(&self.pool)
        .await
        .map_err(StorageError::SqlxError)?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ScheduledPost>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::SqlxError)?;

        row.as_ref().map(Self::row_to_post).transpose()
    }

    async fn list(&self, filter: &PostFilter) -> Result<Vec<ScheduledPost>> {
        // Build the WHERE clause dynamically, binding in the same order
        let mut where_clauses = vec!["1=1"];

        if filter.platform.is_some() {
            where_clauses.push("platform = ?");
        }
        if filter.status.is_some() {
            where_clauses.push("status = ?");
        }
        if filter.since.is_some() {
            where_clauses.push("scheduled_at >= ?");
        }
        if filter.until.is_some() {
            where_clauses.push("scheduled_at <= ?");
        }

        let query_str = format!(
            "SELECT * FROM posts WHERE {} ORDER BY scheduled_at ASC",
            where_clauses.join(" AND ")
        );

        let mut query = sqlx::query(&query_str);
        if let Some(platform) = filter.platform {
            query = query.bind(platform.as_str());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(since) = filter.since {
            query = query.bind(since.timestamp());
        }
        if let Some(until) = filter.until {
            query = query.bind(until.timestamp());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::SqlxError)?;

        rows.iter().map(Self::row_to_post).collect()
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM posts
            WHERE status = 'scheduled' AND scheduled_at <= ?
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::SqlxError)?;

        rows.iter().map(Self::row_to_post).collect()
    }

    async fn compare_and_swap(&self, expected: PostStatus, post: &ScheduledPost) -> Result<bool> {
        let content = serde_json::to_string(&post.content).map_err(StorageError::SerializeError)?;

        let result = sqlx::query(
            r#"
            UPDATE posts SET
                platform = ?, status = ?, content = ?, scheduled_at = ?,
                published_at = ?, platform_post_id = ?, campaign = ?,
                content_type = ?, retry_count = ?, engagement = ?, error = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(post.platform.as_str())
        .bind(post.status.as_str())
        .bind(content)
        .bind(post.scheduled_at.timestamp())
        .bind(post.published_at.map(|t| t.timestamp()))
        .bind(&post.platform_post_id)
        .bind(&post.metadata.campaign)
        .bind(&post.metadata.content_type)
        .bind(post.metadata.retry_count as i64)
        .bind(encode_optional(&post.engagement)?)
        .bind(encode_optional(&post.error)?)
        .bind(&post.id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(StorageError::SqlxError)?;

        Ok(result.rows_affected() == 1)
    }
}
