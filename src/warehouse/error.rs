use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the warehouse store.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Failed to open warehouse database at {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("Warehouse schema error: {0:#}")]
    Schema(anyhow::Error),

    #[error("Bulk write into {table} failed ({sql}): {source}")]
    BulkWrite {
        table: String,
        sql: String,
        source: rusqlite::Error,
    },

    #[error("Row {index} for {table} has {got} values, expected {expected}")]
    RowWidth {
        table: String,
        index: usize,
        got: usize,
        expected: usize,
    },

    #[error("Query failed ({sql}): {source}")]
    Query {
        sql: String,
        source: rusqlite::Error,
    },

    #[error("Failed to {action} load transaction: {source}")]
    Transaction {
        action: &'static str,
        source: rusqlite::Error,
    },
}

impl WarehouseError {
    pub(crate) fn query(sql: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let sql = sql.into();
        move |source| WarehouseError::Query { sql, source }
    }
}
