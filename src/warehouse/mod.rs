mod error;
mod rows;
pub mod schema;
mod store;

pub use error::WarehouseError;
pub use rows::{
    format_start_time, ArtistRow, SongPlayRow, SongRow, TimeRow, UserRow, WarehouseRow,
};
pub use store::{LoadUnit, SqliteWarehouse, WriteMode};
