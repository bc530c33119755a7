//! SQLite-backed analysis records

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use threadline_schema::{NewAnalysis, SavedAnalysis, StoredAnalysis};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::AnalysisStore;

const SHARE_ID_LEN: usize = 12;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at the given path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("opening analysis store at {}", db_path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        // Run migrations synchronously before wrapping in async mutex
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn fetch_one(&self, column: &str, key: &str) -> Result<Option<StoredAnalysis>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT id, share_id, content, concepts, thread_data, created_at
             FROM analyses WHERE {column} = ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_row([key], |row| {
                Ok(RawRow {
                    id: row.get(0)?,
                    share_id: row.get(1)?,
                    content: row.get(2)?,
                    concepts: row.get(3)?,
                    thread_data: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .optional()?;
        raw.map(RawRow::into_stored).transpose()
    }
}

#[async_trait]
impl AnalysisStore for SqliteStore {
    async fn save(&self, record: NewAnalysis) -> Result<SavedAnalysis> {
        let id = Uuid::new_v4().to_string();
        let share_id = new_share_id();
        let concepts = serde_json::to_string(&record.concepts)?;
        let thread_data = serde_json::to_string(&record.thread_data)?;

        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO analyses (id, share_id, content, concepts, thread_data, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                id,
                share_id,
                record.content,
                concepts,
                thread_data,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("inserting analysis record")?;

        tracing::info!(id = %id, share_id = %share_id, "analysis record saved");
        Ok(SavedAnalysis { id, share_id })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredAnalysis>> {
        self.fetch_one("id", id).await
    }

    async fn get_by_share_id(&self, share_id: &str) -> Result<Option<StoredAnalysis>> {
        self.fetch_one("share_id", share_id).await
    }
}

struct RawRow {
    id: String,
    share_id: String,
    content: String,
    concepts: String,
    thread_data: String,
    created_at: String,
}

impl RawRow {
    fn into_stored(self) -> Result<StoredAnalysis> {
        Ok(StoredAnalysis {
            concepts: serde_json::from_str(&self.concepts)
                .with_context(|| format!("decoding concepts of {}", self.id))?,
            thread_data: serde_json::from_str(&self.thread_data)
                .with_context(|| format!("decoding thread_data of {}", self.id))?,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)?.with_timezone(&Utc),
            id: self.id,
            share_id: self.share_id,
            content: self.content,
        })
    }
}

fn new_share_id() -> String {
    Uuid::new_v4().simple().to_string()[..SHARE_ID_LEN].to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Migrations
// ─────────────────────────────────────────────────────────────────────────────

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"CREATE TABLE IF NOT EXISTS __threadline_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );"#,
    )?;

    let applied: std::collections::HashSet<i64> = {
        let mut stmt = conn.prepare("SELECT version FROM __threadline_schema_version")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        rows.filter_map(|r| r.ok()).collect()
    };

    let migrations: Vec<(i64, &str)> = vec![
        (
            1,
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id TEXT PRIMARY KEY,
                share_id TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                concepts TEXT NOT NULL,
                thread_data TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        ),
        (
            2,
            r#"
            CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at DESC);
            "#,
        ),
    ];

    for (version, sql) in migrations {
        if applied.contains(&version) {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO __threadline_schema_version(version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}
