//! SQLite-backed warehouse store.
//!
//! `SqliteWarehouse` owns the single connection used by the sequential load
//! stage. All writes go through a [`LoadUnit`], one transaction per source
//! file set; dropping a unit without committing it rolls everything back.

use super::error::WarehouseError;
use super::rows::WarehouseRow;
use super::schema::WAREHOUSE_SCHEMA;
use crate::resolver::{SongLookup, SongMatch};
use crate::sqlite_persistence::Table;
use rusqlite::{params, params_from_iter, types::Value, Connection, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// SQLITE_MAX_VARIABLE_NUMBER of the bundled SQLite.
const MAX_BOUND_PARAMETERS: usize = 32_766;

/// Absolute tolerance when comparing a stored song duration with the
/// `length` reported by a play event.
const DURATION_TOLERANCE: f64 = 1e-6;

const FIND_SONG_SQL: &str = "SELECT songs.song_id, artists.artist_id
     FROM songs JOIN artists ON songs.artist_id = artists.artist_id
     WHERE songs.title = ?1 AND artists.name = ?2 AND ABS(songs.duration - ?3) <= ?4
     LIMIT 2";

/// How a bulk write treats rows whose primary key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain insert, a key collision fails the write.
    Insert,
    /// Rows whose key already exists are skipped, stored values are kept.
    InsertIfAbsent,
    /// Rows whose key already exists overwrite the `update` columns.
    Upsert {
        key: &'static str,
        update: &'static [&'static str],
    },
}

impl WriteMode {
    fn conflict_clause(&self) -> String {
        match self {
            WriteMode::Insert => String::new(),
            WriteMode::InsertIfAbsent => " ON CONFLICT DO NOTHING".to_string(),
            WriteMode::Upsert { key, update } if update.is_empty() => {
                format!(" ON CONFLICT({}) DO NOTHING", key)
            }
            WriteMode::Upsert { key, update } => format!(
                " ON CONFLICT({}) DO UPDATE SET {}",
                key,
                update
                    .iter()
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

fn insert_sql(table: &str, columns: &[&str], row_count: usize, mode: &WriteMode) -> String {
    let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}{}",
        table,
        columns.join(", "),
        vec![tuple.as_str(); row_count].join(", "),
        mode.conflict_clause()
    )
}

fn enable_foreign_keys(conn: &Connection) -> Result<(), WarehouseError> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(WarehouseError::query("PRAGMA foreign_keys = ON"))
}

pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    /// Open (or create) the warehouse database at `db_path`.
    ///
    /// A database without tables gets the warehouse schema; an existing one is
    /// validated against it unless the `no_checks` feature is enabled.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, WarehouseError> {
        let path = db_path.as_ref();
        let conn = Connection::open(path).map_err(|source| WarehouseError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Opened warehouse database at {:?}", path);
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        let conn = Connection::open_in_memory().map_err(|source| WarehouseError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open the database at `db_path` and replace any warehouse tables in it
    /// with empty ones, whatever state they were in.
    pub fn recreate<P: AsRef<Path>>(db_path: P) -> Result<Self, WarehouseError> {
        let path = db_path.as_ref();
        let conn = Connection::open(path).map_err(|source| WarehouseError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        enable_foreign_keys(&conn)?;
        let warehouse = SqliteWarehouse { conn };
        warehouse.reset()?;
        Ok(warehouse)
    }

    fn from_connection(conn: Connection) -> Result<Self, WarehouseError> {
        enable_foreign_keys(&conn)?;

        let count_sql =
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'";
        let table_count: i64 = conn
            .query_row(count_sql, [], |r| r.get(0))
            .map_err(WarehouseError::query(count_sql))?;

        if table_count == 0 {
            info!(
                "Creating warehouse schema at version {}",
                WAREHOUSE_SCHEMA.version
            );
            WAREHOUSE_SCHEMA
                .create(&conn)
                .map_err(WarehouseError::Schema)?;
        } else if cfg!(not(feature = "no_checks")) {
            WAREHOUSE_SCHEMA
                .validate(&conn)
                .map_err(WarehouseError::Schema)?;
        }

        Ok(SqliteWarehouse { conn })
    }

    /// Drop every warehouse table and create them again, empty.
    pub fn reset(&self) -> Result<(), WarehouseError> {
        info!("Dropping warehouse tables");
        WAREHOUSE_SCHEMA
            .drop_all(&self.conn)
            .map_err(WarehouseError::Schema)?;
        info!("Creating warehouse tables");
        WAREHOUSE_SCHEMA
            .create(&self.conn)
            .map_err(WarehouseError::Schema)
    }

    /// Start the unit of work for one source file set.
    pub fn begin_unit(&mut self) -> Result<LoadUnit<'_>, WarehouseError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| WarehouseError::Transaction {
                action: "begin",
                source,
            })?;
        Ok(LoadUnit { tx })
    }

    pub fn count_rows(&self, table: &Table) -> Result<usize, WarehouseError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name);
        let count: i64 = self
            .conn
            .query_row(&sql, [], |r| r.get(0))
            .map_err(WarehouseError::query(&sql))?;
        Ok(count as usize)
    }

    /// Read access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// One open load transaction.
pub struct LoadUnit<'conn> {
    tx: Transaction<'conn>,
}

impl LoadUnit<'_> {
    /// All values of `key_column` currently stored in `table`.
    pub fn fetch_keys(&self, table: &Table, key_column: &str) -> Result<HashSet<String>, WarehouseError> {
        let sql = format!("SELECT {} FROM {}", key_column, table.name);
        let mut stmt = self.tx.prepare(&sql).map_err(WarehouseError::query(&sql))?;
        let keys = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<HashSet<_>>>())
            .map_err(WarehouseError::query(&sql))?;
        debug!("Fetched {} existing keys from {}", keys.len(), table.name);
        Ok(keys)
    }

    /// Write `rows` into `table` as multi-row statements.
    ///
    /// Every row must supply one value per entry of `columns`, in the same
    /// order. Returns the number of rows SQLite reports as changed.
    pub fn bulk_write(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
        mode: WriteMode,
    ) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(WarehouseError::RowWidth {
                table: table.to_string(),
                index,
                got: row.len(),
                expected: columns.len(),
            });
        }

        let rows_per_statement = (MAX_BOUND_PARAMETERS / columns.len().max(1)).max(1);
        let mut changed = 0;
        for chunk in rows.chunks(rows_per_statement) {
            let sql = insert_sql(table, columns, chunk.len(), &mode);
            let to_error = |source| WarehouseError::BulkWrite {
                table: table.to_string(),
                sql: format!(
                    "INSERT INTO {} ({}) <{} rows>{}",
                    table,
                    columns.join(", "),
                    chunk.len(),
                    mode.conflict_clause()
                ),
                source,
            };
            let mut stmt = self.tx.prepare_cached(&sql).map_err(to_error)?;
            changed += stmt
                .execute(params_from_iter(chunk.iter().flatten()))
                .map_err(to_error)?;
        }
        Ok(changed)
    }

    /// Typed front end to [`LoadUnit::bulk_write`].
    pub fn write_rows<R: WarehouseRow>(&self, rows: &[R], mode: WriteMode) -> Result<usize, WarehouseError> {
        let columns = R::TABLE.insert_columns();
        let values: Vec<Vec<Value>> = rows.iter().map(WarehouseRow::to_values).collect();
        let changed = self.bulk_write(R::TABLE.name, &columns, &values, mode)?;
        debug!(
            "Wrote {} of {} rows into {}",
            changed,
            rows.len(),
            R::TABLE.name
        );
        Ok(changed)
    }

    pub fn commit(self) -> Result<(), WarehouseError> {
        self.tx
            .commit()
            .map_err(|source| WarehouseError::Transaction {
                action: "commit",
                source,
            })
    }

    pub fn rollback(self) -> Result<(), WarehouseError> {
        self.tx
            .rollback()
            .map_err(|source| WarehouseError::Transaction {
                action: "roll back",
                source,
            })
    }
}

impl SongLookup for LoadUnit<'_> {
    fn find_song_matches(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Vec<SongMatch>, WarehouseError> {
        let mut stmt = self
            .tx
            .prepare_cached(FIND_SONG_SQL)
            .map_err(WarehouseError::query(FIND_SONG_SQL))?;
        let matches = stmt
            .query_map(
                params![title, artist_name, duration, DURATION_TOLERANCE],
                |r| {
                    Ok(SongMatch {
                        song_id: r.get(0)?,
                        artist_id: r.get(1)?,
                    })
                },
            )
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(WarehouseError::query(FIND_SONG_SQL))?;
        Ok(matches)
    }
}
