//! Dimension rows derived from raw source records.
//!
//! Song and artist rows come from song metadata; time and user rows come
//! from the play events of the activity log. Every builder drops rows whose
//! natural key is already stored, so repeated loads never collide.

use crate::records::{LogRecord, SongRecord};
use crate::warehouse::{format_start_time, ArtistRow, SongRow, TimeRow, UserRow};
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use std::collections::{HashMap, HashSet};

/// Log action recorded when a user plays a song.
pub const NEXT_SONG_PAGE: &str = "NextSong";

fn key(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Keep the first record for every key not in `existing`, in input order.
fn first_per_key<'a, T, F>(records: &'a [T], existing: &HashSet<String>, key_of: F) -> Vec<(&'a str, &'a T)>
where
    F: Fn(&'a T) -> Option<&'a str>,
{
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|record| key_of(record).map(|k| (k, record)))
        .filter(|(k, _)| !existing.contains(*k) && seen.insert(*k))
        .collect()
}

pub fn build_artist_rows(records: &[SongRecord], existing: &HashSet<String>) -> Vec<ArtistRow> {
    first_per_key(records, existing, |r| key(&r.artist_id))
        .into_iter()
        .map(|(artist_id, r)| ArtistRow {
            artist_id: artist_id.to_string(),
            name: r.artist_name.clone(),
            location: r.artist_location.clone(),
            latitude: r.artist_latitude,
            longitude: r.artist_longitude,
        })
        .collect()
}

pub fn build_song_rows(records: &[SongRecord], existing: &HashSet<String>) -> Vec<SongRow> {
    first_per_key(records, existing, |r| key(&r.song_id))
        .into_iter()
        .map(|(song_id, r)| SongRow {
            song_id: song_id.to_string(),
            title: r.title.clone(),
            artist_id: key(&r.artist_id).map(str::to_string),
            year: r.year,
            duration: r.duration,
        })
        .collect()
}

/// A `NextSong` log event with its decoded timestamp.
#[derive(Debug, Clone, Copy)]
pub struct PlayEvent<'a> {
    pub record: &'a LogRecord,
    pub start_time: NaiveDateTime,
}

impl<'a> PlayEvent<'a> {
    /// The event's user id, if present and not blank.
    pub fn user_id(&self) -> Option<&'a str> {
        let record: &'a LogRecord = self.record;
        key(&record.user_id)
    }
}

#[derive(Debug, Default)]
pub struct PlayEvents<'a> {
    pub events: Vec<PlayEvent<'a>>,
    /// `NextSong` events dropped for lacking a usable `ts`.
    pub missing_timestamp: usize,
}

/// Milliseconds since the Unix epoch to a UTC timestamp.
pub fn timestamp_from_millis(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ts).map(|t| t.naive_utc())
}

/// Keep the `NextSong` events of a log batch, in order.
pub fn select_play_events(records: &[LogRecord]) -> PlayEvents<'_> {
    let mut selected = PlayEvents::default();
    for record in records {
        if record.page.as_deref() != Some(NEXT_SONG_PAGE) {
            continue;
        }
        match record.ts.and_then(timestamp_from_millis) {
            Some(start_time) => selected.events.push(PlayEvent { record, start_time }),
            None => selected.missing_timestamp += 1,
        }
    }
    selected
}

pub fn time_row(start_time: NaiveDateTime) -> TimeRow {
    TimeRow {
        start_time,
        hour: start_time.hour(),
        day: start_time.day(),
        week: start_time.iso_week().week(),
        month: start_time.month(),
        year: start_time.year(),
        weekday: start_time.weekday().num_days_from_monday(),
    }
}

/// One time row per distinct event timestamp not already in `existing`.
pub fn build_time_rows(events: &[PlayEvent<'_>], existing: &HashSet<String>) -> Vec<TimeRow> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter_map(|event| {
            let key = format_start_time(&event.start_time);
            (!existing.contains(&key) && seen.insert(key)).then(|| time_row(event.start_time))
        })
        .collect()
}

/// One user row per user id; the last event of the batch wins, rows keep
/// the order in which users first appear.
pub fn build_user_rows(events: &[PlayEvent<'_>]) -> Vec<UserRow> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<UserRow> = Vec::new();

    for event in events {
        let Some(user_id) = event.user_id() else {
            continue;
        };
        let record = event.record;
        let row = UserRow {
            user_id: user_id.to_string(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            gender: record.gender.clone(),
            level: record.level.clone(),
        };
        match position.get(user_id) {
            Some(&index) => rows[index] = row,
            None => {
                position.insert(user_id, rows.len());
                rows.push(row);
            }
        }
    }
    rows
}
