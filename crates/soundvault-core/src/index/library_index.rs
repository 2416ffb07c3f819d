//! SQLite file record store.
//!
//! The sole owner of persisted state: file records, tags, tag and
//! collection associations, and the synchronized free-text index. All
//! mutation goes through this type, with an explicit open/close
//! lifecycle.

use crate::classify::FileKind;
use crate::config::DbConfig;
use crate::error::{LibraryError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::fts5::{FtsConfig, FtsManager};
use super::query::{plan_search, SearchQuery};

/// Column list shared by every statement that loads full file records.
const FILE_COLUMNS: &str = "f.id, f.file_path, f.filename, f.file_kind, f.file_extension, \
     f.file_size, f.created_at, f.modified_at, f.last_accessed, f.hash, f.indexed_at, \
     f.duration, f.sample_rate, f.bit_depth, f.channels, f.bpm, f.detected_key, \
     f.detected_scale, f.energy_level, f.notes, f.rating, f.color_code, f.is_favorite, \
     f.use_count";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL UNIQUE,
    filename TEXT NOT NULL,
    file_kind TEXT NOT NULL,
    file_extension TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    modified_at INTEGER NOT NULL,
    last_accessed INTEGER,
    hash TEXT,
    indexed_at INTEGER NOT NULL,
    duration REAL,
    sample_rate INTEGER,
    bit_depth INTEGER,
    channels INTEGER,
    bpm REAL,
    detected_key TEXT,
    detected_scale TEXT,
    energy_level INTEGER CHECK (energy_level BETWEEN 1 AND 10),
    notes TEXT,
    rating INTEGER NOT NULL DEFAULT 0 CHECK (rating BETWEEN 0 AND 5),
    color_code TEXT,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    use_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_files_kind ON files(file_kind);
CREATE INDEX IF NOT EXISTS idx_files_hash ON files(hash);
CREATE INDEX IF NOT EXISTS idx_files_modified ON files(modified_at);
CREATE INDEX IF NOT EXISTS idx_files_bpm ON files(bpm);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    category TEXT,
    color TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS file_tags (
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (file_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_file_tags_tag ON file_tags(tag_id);

CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    color TEXT,
    icon TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    is_smart INTEGER NOT NULL DEFAULT 0,
    smart_query TEXT
);

CREATE TABLE IF NOT EXISTS collection_files (
    collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    added_at INTEGER NOT NULL,
    sort_order INTEGER,
    PRIMARY KEY (collection_id, file_id)
);

CREATE INDEX IF NOT EXISTS idx_collection_files_file ON collection_files(file_id);
"#;

/// Tag category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    Genre,
    Instrument,
    Energy,
    Custom,
}

impl TagCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagCategory::Genre => "genre",
            TagCategory::Instrument => "instrument",
            TagCategory::Energy => "energy",
            TagCategory::Custom => "custom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "genre" => Some(TagCategory::Genre),
            "instrument" => Some(TagCategory::Instrument),
            "energy" => Some(TagCategory::Energy),
            "custom" => Some(TagCategory::Custom),
            _ => None,
        }
    }
}

/// A seeded vocabulary entry. Seed data, not logic.
#[derive(Debug, Clone, Copy)]
pub struct TagSeed {
    pub name: &'static str,
    pub category: TagCategory,
}

/// Preset vocabulary for the harder styles, applied with INSERT OR IGNORE
/// at first initialization.
pub const DEFAULT_TAG_SEEDS: &[TagSeed] = &[
    TagSeed { name: "Hardstyle", category: TagCategory::Genre },
    TagSeed { name: "Rawstyle", category: TagCategory::Genre },
    TagSeed { name: "Hardcore", category: TagCategory::Genre },
    TagSeed { name: "Uptempo", category: TagCategory::Genre },
    TagSeed { name: "Euphoric", category: TagCategory::Genre },
    TagSeed { name: "Frenchcore", category: TagCategory::Genre },
    TagSeed { name: "Kick", category: TagCategory::Instrument },
    TagSeed { name: "Lead", category: TagCategory::Instrument },
    TagSeed { name: "Screech", category: TagCategory::Instrument },
    TagSeed { name: "Atmosphere", category: TagCategory::Instrument },
    TagSeed { name: "Vocal", category: TagCategory::Instrument },
    TagSeed { name: "FX", category: TagCategory::Instrument },
    TagSeed { name: "Bass", category: TagCategory::Instrument },
    TagSeed { name: "Snare", category: TagCategory::Instrument },
    TagSeed { name: "Melody", category: TagCategory::Instrument },
];

/// Category a suggested tag name would get if auto-applied.
pub fn seed_category(name: &str) -> Option<TagCategory> {
    DEFAULT_TAG_SEEDS
        .iter()
        .find(|seed| seed.name.eq_ignore_ascii_case(name))
        .map(|seed| seed.category)
}

/// A named, optionally categorized label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub category: Option<TagCategory>,
    pub color: Option<String>,
    pub created_at: i64,
}

/// One indexed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: i64,
    pub file_path: String,
    pub filename: String,
    pub kind: FileKind,
    pub file_extension: String,
    pub file_size: u64,
    pub created_at: i64,
    pub modified_at: i64,
    pub last_accessed: Option<i64>,
    pub hash: Option<String>,
    pub indexed_at: i64,
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u16>,
    pub channels: Option<u16>,
    pub bpm: Option<f64>,
    pub detected_key: Option<String>,
    pub detected_scale: Option<String>,
    pub energy_level: Option<u8>,
    pub notes: Option<String>,
    pub rating: u8,
    pub color_code: Option<String>,
    pub is_favorite: bool,
    pub use_count: u32,
    /// Resolved tags; populated by [`LibraryIndex::get_file`] only.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Fields for a new file record. Audio/musical fields start unset and are
/// filled in later by enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFileRecord {
    pub file_path: String,
    pub filename: String,
    pub kind: FileKind,
    pub file_extension: String,
    pub file_size: u64,
    pub created_at: i64,
    pub modified_at: i64,
    pub last_accessed: Option<i64>,
    pub hash: Option<String>,
    pub indexed_at: i64,
}

/// Sparse field changes for a file record. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileUpdate {
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u16>,
    pub channels: Option<u16>,
    pub bpm: Option<f64>,
    pub detected_key: Option<String>,
    pub detected_scale: Option<String>,
    pub energy_level: Option<u8>,
    pub notes: Option<String>,
    pub rating: Option<u8>,
    pub color_code: Option<String>,
    pub is_favorite: Option<bool>,
    pub last_accessed: Option<i64>,
}

impl FileUpdate {
    fn is_empty(&self) -> bool {
        *self == FileUpdate::default()
    }
}

/// Fields for a new collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCollection {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_smart: bool,
    /// Opaque serialized query; only meaningful when `is_smart` is set.
    pub smart_query: Option<String>,
}

/// A user-curated or rule-based grouping of files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_smart: bool,
    pub smart_query: Option<String>,
    /// Live member count, computed at list time.
    pub file_count: u32,
}

/// Aggregate library counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total_files: usize,
    pub total_tags: usize,
    pub total_collections: usize,
    pub total_favorites: usize,
}

/// A page of search results with the pagination-independent total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub files: Vec<FileRecord>,
    pub total: usize,
    pub query: SearchQuery,
}

/// Epoch milliseconds now.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// SQLite-backed file record store with FTS5 search.
pub struct LibraryIndex {
    db_path: PathBuf,
    conn: Arc<Mutex<Connection>>,
    fts_config: FtsConfig,
}

impl LibraryIndex {
    /// Create or open a library index at the given database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LibraryError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(&db_path)?;

        Self::configure_connection(&conn)?;
        conn.execute_batch(SCHEMA)?;

        let index = Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
            fts_config: FtsConfig::default(),
        };

        index.ensure_fts()?;
        info!("Opened library index at {}", index.db_path.display());

        Ok(index)
    }

    /// Configure connection with optimal settings.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout={};
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            PRAGMA foreign_keys=ON;
            ",
            DbConfig::BUSY_TIMEOUT_MS
        ))?;
        Ok(())
    }

    /// Ensure the FTS5 virtual table and triggers exist.
    fn ensure_fts(&self) -> Result<()> {
        let conn = self.conn()?;
        FtsManager::new(&self.fts_config).ensure_setup(&conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LibraryError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    /// Get the database path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ========================================
    // File records
    // ========================================

    /// Insert a new file record and return its id.
    ///
    /// Fails with [`LibraryError::DuplicatePath`] when the path is already
    /// indexed.
    pub fn insert_file(&self, record: &NewFileRecord) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO files (
                file_path, filename, file_kind, file_extension, file_size,
                created_at, modified_at, last_accessed, hash, indexed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.file_path,
                record.filename,
                record.kind.as_str(),
                record.file_extension,
                record.file_size,
                record.created_at,
                record.modified_at,
                record.last_accessed,
                record.hash,
                record.indexed_at,
            ],
        )
        .map_err(|e| map_unique_violation(e, "files.file_path", || {
            LibraryError::DuplicatePath {
                path: record.file_path.clone(),
            }
        }))?;

        let id = conn.last_insert_rowid();
        debug!("Inserted file record {}: {}", id, record.file_path);
        Ok(id)
    }

    /// Apply a sparse set of field changes to a file record.
    ///
    /// An empty update is a no-op; an unknown id is an error.
    pub fn update_file(&self, id: i64, update: &FileUpdate) -> Result<()> {
        if update.is_empty() {
            debug!("Empty update for file {}, skipping", id);
            return Ok(());
        }

        if let Some(rating) = update.rating {
            if rating > 5 {
                return Err(LibraryError::validation("rating", "rating is 0-5"));
            }
        }
        if let Some(energy) = update.energy_level {
            if !(1..=10).contains(&energy) {
                return Err(LibraryError::validation("energyLevel", "energy level is 1-10"));
            }
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        macro_rules! set_field {
            ($field:ident, $column:literal) => {
                if let Some(value) = &update.$field {
                    sets.push(concat!($column, " = ?"));
                    values.push(Box::new(value.clone()));
                }
            };
        }

        set_field!(duration, "duration");
        set_field!(sample_rate, "sample_rate");
        set_field!(bit_depth, "bit_depth");
        set_field!(channels, "channels");
        set_field!(bpm, "bpm");
        set_field!(detected_key, "detected_key");
        set_field!(detected_scale, "detected_scale");
        set_field!(energy_level, "energy_level");
        set_field!(notes, "notes");
        set_field!(rating, "rating");
        set_field!(color_code, "color_code");
        set_field!(is_favorite, "is_favorite");
        set_field!(last_accessed, "last_accessed");

        let sql = format!("UPDATE files SET {} WHERE id = ?", sets.join(", "));
        values.push(Box::new(id));

        let conn = self.conn()?;
        let value_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&sql, value_refs.as_slice())?;

        if changed == 0 {
            return Err(LibraryError::FileNotFound { id });
        }
        debug!("Updated file record {}", id);
        Ok(())
    }

    /// Delete a file record; tag and collection associations cascade.
    pub fn delete_file(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM files WHERE id = ?1", params![id])?;
        if deleted > 0 {
            debug!("Deleted file record {}", id);
        }
        Ok(deleted > 0)
    }

    /// Get a file record by id, with its resolved tag list.
    pub fn get_file(&self, id: i64) -> Result<Option<FileRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM files f WHERE f.id = ?1", FILE_COLUMNS);
        let record = conn
            .query_row(&sql, params![id], row_to_record)
            .optional()?;

        let mut record = match record {
            Some(record) => record,
            None => return Ok(None),
        };
        record.tags = Self::tags_for_file(&conn, id)?;
        Ok(Some(record))
    }

    /// Get a page of file records, most-recently-modified first.
    pub fn get_files(&self, limit: usize, offset: usize) -> Result<Vec<FileRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM files f ORDER BY f.modified_at DESC LIMIT ?1 OFFSET ?2",
            FILE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit, offset], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Find any record carrying the given content hash.
    pub fn lookup_by_hash(&self, hash: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM files WHERE hash = ?1 LIMIT 1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Record one external "use" event for a file.
    pub fn increment_use_count(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE files SET use_count = use_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(LibraryError::FileNotFound { id });
        }
        Ok(())
    }

    /// Run a faceted search; see [`SearchQuery`] for matching semantics.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        let plan = plan_search(query, FILE_COLUMNS)?;
        let conn = self.conn()?;

        let param_refs: Vec<&dyn ToSql> = plan.params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&plan.select_sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), row_to_record)?;
        let mut files = Vec::new();
        for row in rows {
            files.push(row?);
        }
        drop(stmt);

        let total: usize =
            conn.query_row(&plan.count_sql, param_refs.as_slice(), |row| row.get(0))?;

        Ok(SearchResults {
            files,
            total,
            query: query.clone(),
        })
    }

    // ========================================
    // Tags
    // ========================================

    /// Create a tag; fails with [`LibraryError::DuplicateTag`] on a name
    /// collision.
    pub fn create_tag(
        &self,
        name: &str,
        category: Option<TagCategory>,
        color: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tags (name, category, color, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, category.map(|c| c.as_str()), color, now_ms()],
        )
        .map_err(|e| {
            map_unique_violation(e, "tags.name", || LibraryError::DuplicateTag {
                name: name.to_string(),
            })
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a tag id by name, creating the tag if it does not exist.
    pub fn ensure_tag(&self, name: &str, category: Option<TagCategory>) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO tags (name, category, created_at) VALUES (?1, ?2, ?3)",
            params![name, category.map(|c| c.as_str()), now_ms()],
        )?;
        let id = conn.query_row(
            "SELECT id FROM tags WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Delete a tag; file associations cascade.
    pub fn delete_tag(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// List all tags alphabetically.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, category, color, created_at FROM tags ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], row_to_tag)?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    /// List the tags associated with one file.
    pub fn file_tags(&self, file_id: i64) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        Self::tags_for_file(&conn, file_id)
    }

    fn tags_for_file(conn: &Connection, file_id: i64) -> Result<Vec<Tag>> {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.category, t.color, t.created_at
             FROM tags t
             INNER JOIN file_tags ft ON ft.tag_id = t.id
             WHERE ft.file_id = ?1
             ORDER BY t.name ASC",
        )?;
        let rows = stmt.query_map(params![file_id], row_to_tag)?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    /// Associate a tag with a file; already-present pairs are a no-op.
    pub fn add_file_tag(&self, file_id: i64, tag_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO file_tags (file_id, tag_id) VALUES (?1, ?2)",
            params![file_id, tag_id],
        )?;
        Ok(())
    }

    /// Remove a tag from a file.
    pub fn remove_file_tag(&self, file_id: i64, tag_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM file_tags WHERE file_id = ?1 AND tag_id = ?2",
            params![file_id, tag_id],
        )?;
        Ok(())
    }

    /// Associate every listed file with every listed tag in one
    /// transaction. Duplicate pairs are silently ignored.
    pub fn bulk_add_file_tags(&self, file_ids: &[i64], tag_ids: &[i64]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO file_tags (file_id, tag_id) VALUES (?1, ?2)",
            )?;
            for file_id in file_ids {
                for tag_id in tag_ids {
                    stmt.execute(params![file_id, tag_id])?;
                }
            }
        }
        tx.commit()?;
        debug!(
            "Bulk-tagged {} files with {} tags",
            file_ids.len(),
            tag_ids.len()
        );
        Ok(())
    }

    /// Seed a tag vocabulary; existing names are left untouched.
    pub fn seed_tags(&self, seeds: &[TagSeed]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO tags (name, category, created_at) VALUES (?1, ?2, ?3)",
            )?;
            let now = now_ms();
            for seed in seeds {
                stmt.execute(params![seed.name, seed.category.as_str(), now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ========================================
    // Collections
    // ========================================

    /// Create a collection and return its id.
    pub fn create_collection(&self, collection: &NewCollection) -> Result<i64> {
        let conn = self.conn()?;
        let now = now_ms();
        conn.execute(
            "INSERT INTO collections (name, description, color, icon, created_at, updated_at, is_smart, smart_query)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                collection.name,
                collection.description,
                collection.color,
                collection.icon,
                now,
                now,
                collection.is_smart,
                collection.smart_query,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Delete a collection; memberships cascade.
    pub fn delete_collection(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// List all collections alphabetically, each with its live file count.
    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, c.description, c.color, c.icon, c.created_at, c.updated_at,
                    c.is_smart, c.smart_query, COUNT(cf.file_id)
             FROM collections c
             LEFT JOIN collection_files cf ON cf.collection_id = c.id
             GROUP BY c.id
             ORDER BY c.name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Collection {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                color: row.get(3)?,
                icon: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
                is_smart: row.get(7)?,
                smart_query: row.get(8)?,
                file_count: row.get(9)?,
            })
        })?;

        let mut collections = Vec::new();
        for row in rows {
            collections.push(row?);
        }
        Ok(collections)
    }

    /// Add files to a collection in one transaction; already-present
    /// members are a no-op.
    pub fn add_files_to_collection(&self, collection_id: i64, file_ids: &[i64]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM collections WHERE id = ?1",
                params![collection_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(LibraryError::CollectionNotFound { id: collection_id });
        }
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO collection_files (collection_id, file_id, added_at)
                 VALUES (?1, ?2, ?3)",
            )?;
            let now = now_ms();
            for file_id in file_ids {
                stmt.execute(params![collection_id, file_id, now])?;
            }
        }
        touch_collection(&tx, collection_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Remove files from a collection in one transaction.
    pub fn remove_files_from_collection(
        &self,
        collection_id: i64,
        file_ids: &[i64],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "DELETE FROM collection_files WHERE collection_id = ?1 AND file_id = ?2",
            )?;
            for file_id in file_ids {
                stmt.execute(params![collection_id, file_id])?;
            }
        }
        touch_collection(&tx, collection_id)?;
        tx.commit()?;
        Ok(())
    }

    /// List a collection's member files, most recently added first.
    pub fn collection_files(&self, collection_id: i64) -> Result<Vec<FileRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM files f
             INNER JOIN collection_files cf ON cf.file_id = f.id
             WHERE cf.collection_id = ?1
             ORDER BY cf.added_at DESC",
            FILE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![collection_id], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // ========================================
    // Statistics and lifecycle
    // ========================================

    /// Aggregate counters over the whole library.
    pub fn stats(&self) -> Result<LibraryStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<usize> {
            Ok(conn.query_row(sql, [], |row| row.get(0))?)
        };

        Ok(LibraryStats {
            total_files: count("SELECT COUNT(*) FROM files")?,
            total_tags: count("SELECT COUNT(*) FROM tags")?,
            total_collections: count("SELECT COUNT(*) FROM collections")?,
            total_favorites: count("SELECT COUNT(*) FROM files WHERE is_favorite = 1")?,
        })
    }

    /// Checkpoint the WAL file.
    pub fn checkpoint_wal(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        debug!("Checkpointed WAL");
        Ok(())
    }

    /// Checkpoint and close the store.
    ///
    /// When other handles to the same index are still alive, the
    /// connection closes once the last of them drops.
    pub fn close(self) -> Result<()> {
        self.checkpoint_wal()?;
        if let Ok(mutex) = Arc::try_unwrap(self.conn) {
            let conn = mutex.into_inner().map_err(|_| LibraryError::Database {
                message: "Failed to acquire connection lock".to_string(),
                source: None,
            })?;
            conn.close().map_err(|(_, e)| LibraryError::from(e))?;
            info!("Closed library index");
        }
        Ok(())
    }
}

/// Bump a collection's updated_at after membership changes.
fn touch_collection(conn: &Connection, collection_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE collections SET updated_at = ?1 WHERE id = ?2",
        params![now_ms(), collection_id],
    )?;
    Ok(())
}

/// Map a uniqueness violation on the given column to a domain error.
fn map_unique_violation(
    err: rusqlite::Error,
    column: &str,
    to_error: impl FnOnce() -> LibraryError,
) -> LibraryError {
    if let rusqlite::Error::SqliteFailure(code, Some(message)) = &err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation && message.contains(column) {
            return to_error();
        }
    }
    err.into()
}

/// Convert a row selected with [`FILE_COLUMNS`] to a FileRecord.
fn row_to_record(row: &Row) -> rusqlite::Result<FileRecord> {
    let kind_name: String = row.get(3)?;
    let kind = FileKind::from_name(&kind_name).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown file kind: {kind_name}").into(),
        )
    })?;

    Ok(FileRecord {
        id: row.get(0)?,
        file_path: row.get(1)?,
        filename: row.get(2)?,
        kind,
        file_extension: row.get(4)?,
        file_size: row.get(5)?,
        created_at: row.get(6)?,
        modified_at: row.get(7)?,
        last_accessed: row.get(8)?,
        hash: row.get(9)?,
        indexed_at: row.get(10)?,
        duration: row.get(11)?,
        sample_rate: row.get(12)?,
        bit_depth: row.get(13)?,
        channels: row.get(14)?,
        bpm: row.get(15)?,
        detected_key: row.get(16)?,
        detected_scale: row.get(17)?,
        energy_level: row.get(18)?,
        notes: row.get(19)?,
        rating: row.get(20)?,
        color_code: row.get(21)?,
        is_favorite: row.get(22)?,
        use_count: row.get(23)?,
        tags: Vec::new(),
    })
}

fn row_to_tag(row: &Row) -> rusqlite::Result<Tag> {
    let category: Option<String> = row.get(2)?;
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        category: category.as_deref().and_then(TagCategory::from_name),
        color: row.get(3)?,
        created_at: row.get(4)?,
    })
}
