//! SQLite access to the target store
//!
//! One `Store` owns the connection for the whole run: the preload queries
//! (type cache, duplicate index, key ceiling), the identity lookups behind
//! the resolvers, the prior-load purge, and the bulk import of the emitted
//! file. The loader assumes exclusive write access to `ref_assoc` for the
//! run's duration.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::core::record::{AssocRow, RowParseError};

/// Schema of the loader's view of the target store.
const SCHEMA: &str = r#"
    -- Domain object types; one type is selected per run
    CREATE TABLE object_type (
        object_type_key INTEGER PRIMARY KEY,
        label TEXT NOT NULL UNIQUE
    );

    -- Curator identities
    CREATE TABLE app_user (
        user_key INTEGER PRIMARY KEY,
        login TEXT NOT NULL UNIQUE
    );

    -- Accession identifiers, scoped per object type
    CREATE TABLE accession (
        accession_id TEXT NOT NULL,
        object_key INTEGER NOT NULL,
        object_type_key INTEGER NOT NULL
    );
    CREATE INDEX idx_accession_lookup ON accession(accession_id, object_type_key);

    -- Bibliographic references, keyed by J: designator
    CREATE TABLE bib_refs (
        refs_key INTEGER PRIMARY KEY,
        designator TEXT NOT NULL UNIQUE
    );

    -- Association types, scoped per object type
    CREATE TABLE ref_assoc_type (
        assoc_type_key INTEGER PRIMARY KEY,
        object_type_key INTEGER NOT NULL,
        label TEXT NOT NULL
    );
    CREATE INDEX idx_assoc_type_scope ON ref_assoc_type(object_type_key);

    -- The target table
    CREATE TABLE ref_assoc (
        assoc_key INTEGER PRIMARY KEY,
        refs_key INTEGER NOT NULL,
        object_key INTEGER NOT NULL,
        object_type_key INTEGER NOT NULL,
        assoc_type_key INTEGER NOT NULL,
        created_by_key INTEGER NOT NULL,
        modified_by_key INTEGER NOT NULL,
        creation_ts TEXT NOT NULL,
        modification_ts TEXT NOT NULL
    );
    CREATE INDEX idx_ref_assoc_scope ON ref_assoc(object_type_key);
"#;

/// Errors raised at the store boundary. All of them are fatal to the run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store not found: {0}")]
    Missing(PathBuf),

    #[error("store already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("could not read bulk file {path}: {source}")]
    BulkRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed bulk row at {path}:{line}: {source}")]
    BulkRow {
        path: PathBuf,
        line: usize,
        source: RowParseError,
    },

    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

/// The target relational store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open an existing store. The file must already exist; a run never
    /// creates its own target database.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::Missing(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Create a new store with the loader schema.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// In-memory store with the loader schema, for tests and fixtures.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Execute arbitrary SQL, e.g. to seed fixture rows.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Look up the key for an object-type label. `None` means the label is
    /// unknown, which aborts the run before the input file is opened.
    pub fn object_type_key(&self, label: &str) -> Result<Option<i64>, StoreError> {
        self.conn
            .query_row(
                "SELECT object_type_key FROM object_type WHERE label = ?1",
                params![label],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Accession id → object key, scoped to one object type. Misses are
    /// per-record problems, so lookup failures collapse to `None`.
    pub fn object_key(&self, accession_id: &str, object_type_key: i64) -> Option<i64> {
        self.conn
            .query_row(
                "SELECT object_key FROM accession WHERE accession_id = ?1 AND object_type_key = ?2",
                params![accession_id, object_type_key],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten()
    }

    /// Reference designator → reference key.
    pub fn reference_key(&self, designator: &str) -> Option<i64> {
        self.conn
            .query_row(
                "SELECT refs_key FROM bib_refs WHERE designator = ?1",
                params![designator],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten()
    }

    /// Login → user key.
    pub fn user_key(&self, login: &str) -> Option<i64> {
        self.conn
            .query_row(
                "SELECT user_key FROM app_user WHERE login = ?1",
                params![login],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten()
    }

    /// All association-type (label, key) pairs for an object type.
    pub fn assoc_types(&self, object_type_key: i64) -> Result<Vec<(String, i64)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT label, assoc_type_key FROM ref_assoc_type WHERE object_type_key = ?1",
        )?;
        let rows = stmt.query_map(params![object_type_key], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All (object, reference, association-type) composite keys already
    /// present for an object type. Rows created by `exclude_creator` are
    /// left out: load mode purges exactly those rows before repopulating,
    /// and preview must see the same index to log identically.
    pub fn existing_assocs(
        &self,
        object_type_key: i64,
        exclude_creator: Option<i64>,
    ) -> Result<Vec<(i64, i64, i64)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT object_key, refs_key, assoc_type_key FROM ref_assoc
             WHERE object_type_key = ?1 AND created_by_key != ?2",
        )?;
        // -1 is never a user key, so no row is excluded without a creator
        let excluded = exclude_creator.unwrap_or(-1);
        let rows = stmt.query_map(params![object_type_key, excluded], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Highest association key currently in the table, `None` when empty.
    pub fn max_assoc_key(&self) -> Result<Option<i64>, StoreError> {
        self.conn
            .query_row("SELECT MAX(assoc_key) FROM ref_assoc", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Delete prior rows for this object type and creator. The run owns
    /// that slice of the table and repopulates it from scratch.
    pub fn purge_prior_load(
        &self,
        object_type_key: i64,
        created_by_key: i64,
    ) -> Result<usize, StoreError> {
        self.conn
            .execute(
                "DELETE FROM ref_assoc WHERE object_type_key = ?1 AND created_by_key = ?2",
                params![object_type_key, created_by_key],
            )
            .map_err(Into::into)
    }

    /// Replay the emitted bulk file into `ref_assoc` with one prepared
    /// insert inside a single transaction. Returns the row count.
    pub fn bulk_import(&mut self, file: &Path) -> Result<usize, StoreError> {
        let reader = BufReader::new(File::open(file).map_err(|source| StoreError::BulkRead {
            path: file.to_path_buf(),
            source,
        })?);

        let tx = self.conn.transaction()?;
        let mut rows = 0;
        {
            let mut insert = tx.prepare(
                "INSERT INTO ref_assoc (assoc_key, refs_key, object_key, object_type_key,
                     assoc_type_key, created_by_key, modified_by_key, creation_ts, modification_ts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for (idx, line) in reader.lines().enumerate() {
                let line = line.map_err(|source| StoreError::BulkRead {
                    path: file.to_path_buf(),
                    source,
                })?;
                let row =
                    AssocRow::from_bcp_line(&line).map_err(|source| StoreError::BulkRow {
                        path: file.to_path_buf(),
                        line: idx + 1,
                        source,
                    })?;
                insert.execute(params![
                    row.assoc_key,
                    row.refs_key,
                    row.object_key,
                    row.object_type_key,
                    row.assoc_type_key,
                    row.created_by_key,
                    row.modified_by_key,
                    row.creation_ts,
                    row.modification_ts,
                ])?;
                rows += 1;
            }
        }
        tx.commit()?;

        Ok(rows)
    }

    /// Row count of the target table, mostly for diagnostics and tests.
    pub fn assoc_count(&self) -> Result<i64, StoreError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM ref_assoc", [], |row| row.get(0))
            .map_err(Into::into)
    }
}
