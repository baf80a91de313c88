use crate::resources;
use rusqlite::{Connection, Result, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One schema step. Steps run in `version` order and the highest applied
/// version is kept in `PRAGMA user_version`.
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    apply: fn(&Transaction) -> Result<()>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create posts",
        apply: create_posts,
    },
    Migration {
        version: 2,
        description: "add posts.image",
        apply: add_post_image,
    },
    Migration {
        version: 3,
        description: "create resources",
        apply: create_resources,
    },
    Migration {
        version: 4,
        description: "add resources.branch and resources.parent_id",
        apply: add_resource_branching,
    },
    Migration {
        version: 5,
        description: "drop legacy welcome roots",
        apply: drop_welcome_roots,
    },
];

fn create_posts(tx: &Transaction) -> Result<()> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT,
            content TEXT,
            date TEXT
        )",
    )
}

fn add_post_image(tx: &Transaction) -> Result<()> {
    add_column(tx, "posts", "image", "TEXT")
}

fn create_resources(tx: &Transaction) -> Result<()> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            order_index INTEGER NOT NULL
        )",
    )
}

fn add_resource_branching(tx: &Transaction) -> Result<()> {
    add_column(tx, "resources", "branch", "TEXT DEFAULT 'main'")?;
    add_column(tx, "resources", "parent_id", "INTEGER NULL")
}

// Older builds seeded a "Welcome" root into the roadmap. Removing it leaves a
// gap, so every branch is re-compacted afterwards.
fn drop_welcome_roots(tx: &Transaction) -> Result<()> {
    tx.execute("DELETE FROM resources WHERE LOWER(title) = 'welcome'", [])?;
    resources::compact_all(tx)
}

pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Databases written before versioning was introduced already carry some of
/// these columns, so the step only adds what is missing.
fn add_column(tx: &Transaction, table: &str, column: &str, decl: &str) -> Result<()> {
    if column_exists(tx, table, column)? {
        return Ok(());
    }
    tx.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl))
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Applies every pending migration, each in its own transaction.
/// Returns how many steps ran.
pub fn migrate(conn: &mut Connection) -> Result<usize> {
    let current = schema_version(conn)?;
    let mut applied = 0;
    for step in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        (step.apply)(&tx)?;
        tx.pragma_update(None, "user_version", step.version)?;
        tx.commit()?;
        debug!(version = step.version, description = step.description, "migration applied");
        applied += 1;
    }
    Ok(applied)
}

/// Handle to the on-disk database. Connections are short-lived: every
/// request opens its own and drops it when done.
#[derive(Clone, Debug)]
pub struct Database {
    pub db_path: PathBuf,
}

impl Database {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, DbError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let db = Database { db_path };
        let mut conn = db.connect()?;
        let applied = migrate(&mut conn)?;
        info!(
            path = %db.db_path.display(),
            applied,
            version = schema_version(&conn)?,
            "database ready"
        );
        Ok(db)
    }

    pub fn connect(&self) -> Result<Connection, DbError> {
        let conn = Connection::open(&self.db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }
}
