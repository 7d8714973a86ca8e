//! SQLite-backed store using sqlx.
//!
//! Schema:
//! - `oauth_tokens(principal_id, access_token, refresh_token, id_token, expiry_epoch_millis, updated_at)`
//!   keyed by `principal_id`; partial upserts merge with `COALESCE`.
//! - `drafts(id, owner_id, title, content, created_at, updated_at)`; every
//!   mutating statement filters on `owner_id` so ownership is checked against
//!   the row being changed.
//! - `export_records(id, owner_id, remote_file_id, title, created_at)`, append-only.

use async_trait::async_trait;
use letterbox_types::{
    Draft, DraftInput, DraftStore, DraftUpdate, ExportLog, ExportRecord, LetterboxError,
    Principal, TokenPair, TokenVault, now_millis, traits::Result,
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

type DraftRow = (String, String, String, String, i64, i64);

fn draft_from_row((id, owner_id, title, content, created_at, updated_at): DraftRow) -> Draft {
    Draft {
        id,
        owner_id,
        title,
        content,
        created_at,
        updated_at,
    }
}

/// A persistent [`TokenVault`], [`DraftStore`] and [`ExportLog`] backed by `SQLite`.
pub struct SqliteStore {
    /// Connection pool to the `SQLite` database.
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to a `SQLite` database (e.g. `"sqlite:./letterbox.db"` or `"sqlite::memory:"`).
    ///
    /// Automatically creates the database file if it does not exist.
    /// Runs migrations to create / upgrade the schema.
    ///
    /// # Errors
    ///
    /// Returns a [`sqlx::Error`] if the connection or table creation fails.
    pub async fn new(database_url: &str) -> std::result::Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Each in-memory connection is its own database.
        let max = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .connect_with(opts)
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS oauth_tokens (
                principal_id        TEXT    PRIMARY KEY,
                access_token        TEXT,
                refresh_token       TEXT,
                id_token            TEXT,
                expiry_epoch_millis INTEGER,
                updated_at          INTEGER NOT NULL DEFAULT (unixepoch())
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS drafts (
                id          TEXT    PRIMARY KEY,
                owner_id    TEXT    NOT NULL,
                title       TEXT    NOT NULL,
                content     TEXT    NOT NULL,
                created_at  INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_drafts_owner
             ON drafts(owner_id, updated_at DESC)",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS export_records (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id        TEXT    NOT NULL,
                remote_file_id  TEXT    NOT NULL,
                title           TEXT    NOT NULL,
                created_at      INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Distinguish a missing draft from one owned by someone else after an
    /// owner-filtered statement matched no row.
    async fn missing_or_forbidden(&self, id: &str) -> LetterboxError {
        let exists: std::result::Result<bool, sqlx::Error> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM drafts WHERE id = ?)")
                .bind(id)
                .fetch_one(&self.pool)
                .await;
        match exists {
            Ok(true) => LetterboxError::Forbidden(format!("draft {id} belongs to another user")),
            Ok(false) => LetterboxError::NotFound(format!("draft {id}")),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl TokenVault for SqliteStore {
    async fn upsert(&self, principal_id: &str, tokens: &TokenPair) -> Result<()> {
        sqlx::query(
            "INSERT INTO oauth_tokens
                 (principal_id, access_token, refresh_token, id_token, expiry_epoch_millis)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(principal_id) DO UPDATE SET
                 access_token = COALESCE(excluded.access_token, oauth_tokens.access_token),
                 refresh_token = COALESCE(excluded.refresh_token, oauth_tokens.refresh_token),
                 id_token = COALESCE(excluded.id_token, oauth_tokens.id_token),
                 expiry_epoch_millis =
                     COALESCE(excluded.expiry_epoch_millis, oauth_tokens.expiry_epoch_millis),
                 updated_at = unixepoch()",
        )
        .bind(principal_id)
        .bind(tokens.access_token.as_deref())
        .bind(tokens.refresh_token.as_deref())
        .bind(tokens.id_token.as_deref())
        .bind(tokens.expiry_epoch_millis)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn read(&self, principal_id: &str) -> Result<Option<TokenPair>> {
        let row: Option<(Option<String>, Option<String>, Option<String>, Option<i64>)> =
            sqlx::query_as(
                "SELECT access_token, refresh_token, id_token, expiry_epoch_millis
                 FROM oauth_tokens WHERE principal_id = ?",
            )
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(
            |(access_token, refresh_token, id_token, expiry_epoch_millis)| TokenPair {
                access_token,
                refresh_token,
                id_token,
                expiry_epoch_millis,
            },
        ))
    }

    async fn clear(&self, principal_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM oauth_tokens WHERE principal_id = ?")
            .bind(principal_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DraftStore for SqliteStore {
    async fn create(&self, principal: &Principal, input: DraftInput) -> Result<Draft> {
        input.validate()?;
        let now = now_millis();
        let draft = Draft {
            id: uuid::Uuid::new_v4().simple().to_string(),
            owner_id: principal.id.clone(),
            title: input.title,
            content: input.content,
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO drafts (id, owner_id, title, content, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.id)
        .bind(&draft.owner_id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .execute(&self.pool)
        .await?;
        tracing::debug!(draft_id = %draft.id, owner = %draft.owner_id, "draft created");
        Ok(draft)
    }

    async fn get(&self, principal: &Principal, id: &str) -> Result<Draft> {
        let row: Option<DraftRow> = sqlx::query_as(
            "SELECT id, owner_id, title, content, created_at, updated_at
             FROM drafts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let draft = draft_from_row(
            row.ok_or_else(|| LetterboxError::NotFound(format!("draft {id}")))?,
        );
        draft.ensure_owned_by(principal)?;
        Ok(draft)
    }

    async fn update(&self, principal: &Principal, id: &str, update: DraftUpdate) -> Result<Draft> {
        update.validate()?;
        let row: Option<DraftRow> = sqlx::query_as(
            "UPDATE drafts SET
                 title = COALESCE(?, title),
                 content = COALESCE(?, content),
                 updated_at = MAX(?, updated_at + 1)
             WHERE id = ? AND owner_id = ?
             RETURNING id, owner_id, title, content, created_at, updated_at",
        )
        .bind(update.title.as_deref())
        .bind(update.content.as_deref())
        .bind(now_millis())
        .bind(id)
        .bind(&principal.id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(draft_from_row(row)),
            None => Err(self.missing_or_forbidden(id).await),
        }
    }

    async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(&principal.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(self.missing_or_forbidden(id).await);
        }
        tracing::debug!(draft_id = %id, owner = %principal.id, "draft deleted");
        Ok(())
    }

    async fn list(&self, principal: &Principal) -> Result<Vec<Draft>> {
        let rows: Vec<DraftRow> = sqlx::query_as(
            "SELECT id, owner_id, title, content, created_at, updated_at
             FROM drafts WHERE owner_id = ?
             ORDER BY updated_at DESC, id",
        )
        .bind(&principal.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(draft_from_row).collect())
    }
}

#[async_trait]
impl ExportLog for SqliteStore {
    async fn append(&self, record: &ExportRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO export_records (owner_id, remote_file_id, title, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&record.owner_id)
        .bind(&record.remote_file_id)
        .bind(&record.title)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_exports(&self, owner_id: &str) -> Result<Vec<ExportRecord>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            "SELECT owner_id, remote_file_id, title, created_at
             FROM export_records WHERE owner_id = ?
             ORDER BY id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(owner_id, remote_file_id, title, created_at)| ExportRecord {
                owner_id,
                remote_file_id,
                title,
                created_at,
            })
            .collect())
    }
}
