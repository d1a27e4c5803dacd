use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::WaitlistEntry;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// A row appended to the waitlist sheet, column order
/// `timestamp, intent, userType, phone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub timestamp: String,
    pub intent: String,
    pub user_type: String,
    pub phone: String,
}

impl From<&WaitlistEntry> for SheetRow {
    fn from(entry: &WaitlistEntry) -> Self {
        Self {
            timestamp: entry.timestamp.clone(),
            intent: entry.intent.clone(),
            user_type: entry.user_type.clone(),
            phone: entry.phone.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredSheetRow {
    pub row_id: i64,
    pub row: SheetRow,
    pub received_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to an in-memory database sees its own empty schema.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn read_slot(&self, name: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM local_slots WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read local slot '{name}'"))?;
        Ok(value)
    }

    pub async fn write_slot(&self, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO local_slots (name, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write local slot '{name}'"))?;
        Ok(())
    }

    pub async fn append_sheet_row(&self, row: &SheetRow) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO sheet_rows (timestamp, intent, user_type, phone, received_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.timestamp)
        .bind(&row.intent)
        .bind(&row.user_type)
        .bind(&row.phone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed to append sheet row")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_sheet_rows(&self) -> Result<Vec<StoredSheetRow>> {
        let rows = sqlx::query(
            r#"
            SELECT row_id, timestamp, intent, user_type, phone, received_at
            FROM sheet_rows
            ORDER BY row_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list sheet rows")?;

        rows.into_iter()
            .map(|row| -> Result<StoredSheetRow> {
                Ok(StoredSheetRow {
                    row_id: row.try_get("row_id")?,
                    row: SheetRow {
                        timestamp: row.try_get("timestamp")?,
                        intent: row.try_get("intent")?,
                        user_type: row.try_get("user_type")?,
                        phone: row.try_get("phone")?,
                    },
                    received_at: row.try_get("received_at")?,
                })
            })
            .collect()
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
