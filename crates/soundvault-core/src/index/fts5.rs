//! FTS5 virtual table setup and management.
//!
//! Free-text search covers the filename and user notes of every file
//! record. Keeping the virtual table synchronized is the store's job, done
//! with AFTER INSERT/UPDATE/DELETE triggers so no caller can forget it.

use crate::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Configuration for the FTS5 table.
#[derive(Debug, Clone)]
pub struct FtsConfig {
    /// Name of the FTS5 virtual table.
    pub table_name: String,
    /// Tokenizer configuration.
    pub tokenizer: String,
}

impl Default for FtsConfig {
    fn default() -> Self {
        Self {
            table_name: "file_search".to_string(),
            tokenizer: "unicode61 remove_diacritics 1".to_string(),
        }
    }
}

/// Manager for FTS5 setup and maintenance.
pub struct FtsManager<'a> {
    config: &'a FtsConfig,
}

impl<'a> FtsManager<'a> {
    /// Create a new FTS5 manager.
    pub fn new(config: &'a FtsConfig) -> Self {
        Self { config }
    }

    /// Check if the FTS5 table exists.
    pub fn table_exists(&self, conn: &Connection) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [&self.config.table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Check if the FTS5 triggers exist.
    pub fn triggers_exist(&self, conn: &Connection) -> Result<bool> {
        let trigger_name = format!("{}_ai", self.config.table_name);
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='trigger' AND name=?1",
            [&trigger_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Ensure FTS5 is fully set up.
    pub fn ensure_setup(&self, conn: &Connection) -> Result<()> {
        if !self.table_exists(conn)? {
            self.create_table(conn)?;
            self.populate_from_files(conn)?;
        } else if !self.triggers_exist(conn)? {
            // Table exists but triggers missing - rebuild content
            self.populate_from_files(conn)?;
        }

        self.create_triggers(conn)?;
        Ok(())
    }

    /// Create the FTS5 virtual table.
    pub fn create_table(&self, conn: &Connection) -> Result<()> {
        let sql = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5(
                file_id UNINDEXED,
                filename,
                notes,
                tokenize='{}'
            )",
            self.config.table_name, self.config.tokenizer
        );

        conn.execute(&sql, [])?;
        info!("Created FTS5 table: {}", self.config.table_name);
        Ok(())
    }

    /// Create triggers to keep FTS5 in sync with the files table.
    pub fn create_triggers(&self, conn: &Connection) -> Result<()> {
        let table = &self.config.table_name;

        // AFTER INSERT trigger
        let insert_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {}_ai AFTER INSERT ON files BEGIN
                INSERT INTO {} (file_id, filename, notes)
                VALUES (NEW.id, NEW.filename, NEW.notes);
            END",
            table, table
        );
        conn.execute(&insert_trigger, [])?;

        // AFTER UPDATE trigger
        let update_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {}_au AFTER UPDATE ON files BEGIN
                DELETE FROM {} WHERE file_id = OLD.id;
                INSERT INTO {} (file_id, filename, notes)
                VALUES (NEW.id, NEW.filename, NEW.notes);
            END",
            table, table, table
        );
        conn.execute(&update_trigger, [])?;

        // AFTER DELETE trigger
        let delete_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS {}_ad AFTER DELETE ON files BEGIN
                DELETE FROM {} WHERE file_id = OLD.id;
            END",
            table, table
        );
        conn.execute(&delete_trigger, [])?;

        debug!("Created FTS5 triggers for {}", table);
        Ok(())
    }

    /// Populate FTS5 from the existing files table.
    pub fn populate_from_files(&self, conn: &Connection) -> Result<()> {
        let table = &self.config.table_name;

        // Clear existing FTS5 data using execute_batch to avoid "returns results" error
        conn.execute_batch(&format!("DELETE FROM {};", table))?;

        let sql = format!(
            "INSERT INTO {} (file_id, filename, notes)
             SELECT id, filename, notes FROM files",
            table
        );
        conn.execute(&sql, [])?;

        info!("Populated FTS5 table from files");
        Ok(())
    }

    /// Rebuild the FTS5 index completely.
    pub fn rebuild(&self, conn: &Connection) -> Result<()> {
        let table = &self.config.table_name;

        conn.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
        conn.execute(&format!("DROP TRIGGER IF EXISTS {}_ai", table), [])?;
        conn.execute(&format!("DROP TRIGGER IF EXISTS {}_au", table), [])?;
        conn.execute(&format!("DROP TRIGGER IF EXISTS {}_ad", table), [])?;

        self.create_table(conn)?;
        self.create_triggers(conn)?;
        self.populate_from_files(conn)?;

        info!("Rebuilt FTS5 index");
        Ok(())
    }

    /// Optimize the FTS5 index.
    pub fn optimize(&self, conn: &Connection) -> Result<()> {
        let sql = format!(
            "INSERT INTO {}({}) VALUES('optimize')",
            self.config.table_name, self.config.table_name
        );
        conn.execute(&sql, [])?;
        debug!("Optimized FTS5 index");
        Ok(())
    }
}
