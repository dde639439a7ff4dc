//! Typed rows for each warehouse table.
//!
//! Every row type knows its target table and renders its values in the
//! table's bulk-write column order.

use super::schema::{ARTISTS_TABLE, SONGPLAYS_TABLE, SONGS_TABLE, TIME_TABLE, USERS_TABLE};
use crate::sqlite_persistence::Table;
use chrono::NaiveDateTime;
use rusqlite::types::Value;

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Canonical text form of a `time.start_time` key.
pub fn format_start_time(start_time: &NaiveDateTime) -> String {
    start_time.format(START_TIME_FORMAT).to_string()
}

pub trait WarehouseRow {
    const TABLE: &'static Table;

    /// Values in the order of `Self::TABLE.insert_columns()`.
    fn to_values(&self) -> Vec<Value>;
}

fn text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn integer(value: Option<i64>) -> Value {
    value.map(Value::Integer).unwrap_or(Value::Null)
}

fn real(value: Option<f64>) -> Value {
    value.map(Value::Real).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl WarehouseRow for ArtistRow {
    const TABLE: &'static Table = &ARTISTS_TABLE;

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.artist_id.clone()),
            text(&self.name),
            text(&self.location),
            real(self.latitude),
            real(self.longitude),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i64>,
    pub duration: Option<f64>,
}

impl WarehouseRow for SongRow {
    const TABLE: &'static Table = &SONGS_TABLE;

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.song_id.clone()),
            text(&self.title),
            text(&self.artist_id),
            integer(self.year),
            real(self.duration),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRow {
    pub start_time: NaiveDateTime,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// Days since Monday (Monday = 0, Sunday = 6).
    pub weekday: u32,
}

impl TimeRow {
    pub fn key(&self) -> String {
        format_start_time(&self.start_time)
    }
}

impl WarehouseRow for TimeRow {
    const TABLE: &'static Table = &TIME_TABLE;

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.key()),
            Value::Integer(self.hour.into()),
            Value::Integer(self.day.into()),
            Value::Integer(self.week.into()),
            Value::Integer(self.month.into()),
            Value::Integer(self.year.into()),
            Value::Integer(self.weekday.into()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

impl WarehouseRow for UserRow {
    const TABLE: &'static Table = &USERS_TABLE;

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.user_id.clone()),
            text(&self.first_name),
            text(&self.last_name),
            text(&self.gender),
            text(&self.level),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongPlayRow {
    pub start_time: NaiveDateTime,
    pub user_id: Option<String>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl WarehouseRow for SongPlayRow {
    const TABLE: &'static Table = &SONGPLAYS_TABLE;

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(format_start_time(&self.start_time)),
            text(&self.user_id),
            text(&self.level),
            text(&self.song_id),
            text(&self.artist_id),
            integer(self.session_id),
            text(&self.location),
            text(&self.user_agent),
        ]
    }
}
