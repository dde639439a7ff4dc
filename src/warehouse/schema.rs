//! SQLite schema definitions for the songplay star schema.
//!
//! Four dimension tables keyed by their natural keys (`artists`, `songs`,
//! `time`, `users`) and one fact table (`songplays`) keyed by a surrogate
//! rowid. Tables are listed in dependency order.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, WarehouseSchema};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "artist_id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "song_id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const TIME_FK: ForeignKey = ForeignKey {
    foreign_table: "time",
    foreign_column: "start_time",
    on_delete: ForeignKeyOnChange::NoAction,
};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "user_id",
    on_delete: ForeignKeyOnChange::NoAction,
};

// =============================================================================
// Dimension Tables
// =============================================================================

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("latitude", &SqlType::Real),
        sqlite_column!("longitude", &SqlType::Real),
    ],
    indices: &[("idx_artists_name", "name")],
};

pub const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("song_id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("title", &SqlType::Text),
        sqlite_column!("artist_id", &SqlType::Text, foreign_key = Some(&ARTIST_FK)),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("duration", &SqlType::Real),
    ],
    indices: &[
        ("idx_songs_title", "title"),
        ("idx_songs_artist", "artist_id"),
    ],
};

/// One row per distinct play timestamp. `start_time` is UTC text with
/// millisecond precision, see [`super::format_start_time`].
pub const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sqlite_column!("start_time", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("hour", &SqlType::Integer, non_null = true),
        sqlite_column!("day", &SqlType::Integer, non_null = true),
        sqlite_column!("week", &SqlType::Integer, non_null = true),
        sqlite_column!("month", &SqlType::Integer, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("weekday", &SqlType::Integer, non_null = true), // 0 = Monday
    ],
    indices: &[],
};

pub const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("user_id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("first_name", &SqlType::Text),
        sqlite_column!("last_name", &SqlType::Text),
        sqlite_column!("gender", &SqlType::Text),
        sqlite_column!("level", &SqlType::Text), // 'free' or 'paid'
    ],
    indices: &[],
};

// =============================================================================
// Fact Table
// =============================================================================

pub const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        sqlite_column!("songplay_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("start_time", &SqlType::Text, non_null = true, foreign_key = Some(&TIME_FK)),
        sqlite_column!("user_id", &SqlType::Text, foreign_key = Some(&USER_FK)),
        sqlite_column!("level", &SqlType::Text),
        sqlite_column!("song_id", &SqlType::Text, foreign_key = Some(&SONG_FK)),
        sqlite_column!("artist_id", &SqlType::Text, foreign_key = Some(&ARTIST_FK)),
        sqlite_column!("session_id", &SqlType::Integer),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("user_agent", &SqlType::Text),
    ],
    indices: &[
        ("idx_songplays_start_time", "start_time"),
        ("idx_songplays_user", "user_id"),
        ("idx_songplays_song", "song_id"),
        ("idx_songplays_artist", "artist_id"),
    ],
};

pub const WAREHOUSE_SCHEMA: WarehouseSchema = WarehouseSchema {
    version: 1,
    tables: &[
        ARTISTS_TABLE,
        SONGS_TABLE,
        TIME_TABLE,
        USERS_TABLE,
        SONGPLAYS_TABLE,
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn create_schema() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        WAREHOUSE_SCHEMA.create(&conn).unwrap();
        conn
    }

    #[test]
    fn test_schema_creates_successfully() {
        let conn = create_schema();
        WAREHOUSE_SCHEMA.validate(&conn).unwrap();
    }

    #[test]
    fn test_songplay_id_is_generated() {
        let conn = create_schema();
        conn.execute(
            "INSERT INTO time VALUES ('2018-11-15 00:30:26.796', 0, 15, 46, 11, 2018, 3)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO songplays (start_time, level) VALUES ('2018-11-15 00:30:26.796', 'free')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO songplays (start_time, level) VALUES ('2018-11-15 00:30:26.796', 'paid')",
            [],
        )
        .unwrap();

        let ids: Vec<i64> = conn
            .prepare("SELECT songplay_id FROM songplays ORDER BY songplay_id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_songplay_rejects_unknown_time() {
        let conn = create_schema();
        let result = conn.execute(
            "INSERT INTO songplays (start_time) VALUES ('1999-01-01 00:00:00.000')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_song_id_rejected() {
        let conn = create_schema();
        conn.execute("INSERT INTO songs (song_id, title) VALUES ('S1', 'a')", [])
            .unwrap();
        assert!(conn
            .execute("INSERT INTO songs (song_id, title) VALUES ('S1', 'b')", [])
            .is_err());
    }
}
