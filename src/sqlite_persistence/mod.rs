mod table;

pub use table::{Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, WarehouseSchema};

/// Offset added to the schema version stored in `PRAGMA user_version`, so a
/// database created by this tool is distinguishable from an arbitrary file.
pub const BASE_DB_VERSION: usize = 77000;
