//! Raw source records and the parallel loader that reads them.
//!
//! Source files are line-delimited JSON: one song metadata object or one
//! activity log event per line.

mod discovery;
mod lenient;
mod loader;

pub use discovery::find_json_files;
pub use loader::{parse_file, RecordLoader};

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering or reading source files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?} at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Failed to list files under {root:?}: {source}")]
    Discovery {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to start record loader workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// One line of a song metadata file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SongRecord {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub num_songs: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub artist_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub artist_latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub artist_longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub artist_location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub artist_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub song_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub year: Option<i64>,
}

/// One line of a user activity log file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub auth: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub item_in_session: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_name: Option<String>,
    /// Song duration in seconds as reported by the player.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub length: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub method: Option<String>,
    /// Action performed, `NextSong` for a play.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub page: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub registration: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub session_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub song: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub status: Option<i64>,
    /// Event time, milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_song_record() {
        let line = r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": null, "artist_longitude": null, "artist_location": "California - LA", "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480", "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#;
        let record: SongRecord = serde_json::from_str(line).unwrap();

        assert_eq!(record.song_id.as_deref(), Some("SOMZWCG12A8C13C480"));
        assert_eq!(record.artist_id.as_deref(), Some("ARD7TVE1187B99BFB1"));
        assert_eq!(record.artist_name.as_deref(), Some("Casual"));
        assert_eq!(record.artist_latitude, None);
        assert_eq!(record.duration, Some(218.93179));
        assert_eq!(record.year, Some(0));
    }

    #[test]
    fn test_parse_log_record() {
        let line = r#"{"artist":"Pavement","auth":"Logged In","firstName":"Sylvie","gender":"F","itemInSession":0,"lastName":"Cruz","length":99.16036,"level":"free","location":"Washington-Arlington-Alexandria, DC-VA-MD-WV","method":"PUT","page":"NextSong","registration":1540266185796.0,"sessionId":345,"song":"Mercy:The Laundromat","status":200,"ts":1541990258796,"userAgent":"Mozilla\/5.0","userId":"10"}"#;
        let record: LogRecord = serde_json::from_str(line).unwrap();

        assert_eq!(record.artist.as_deref(), Some("Pavement"));
        assert_eq!(record.first_name.as_deref(), Some("Sylvie"));
        assert_eq!(record.length, Some(99.16036));
        assert_eq!(record.page.as_deref(), Some("NextSong"));
        assert_eq!(record.session_id, Some(345));
        assert_eq!(record.ts, Some(1_541_990_258_796));
        assert_eq!(record.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(record.user_id.as_deref(), Some("10"));
    }

    #[test]
    fn test_log_record_without_song_fields() {
        let line = r#"{"artist":null,"auth":"Logged In","firstName":"Wyatt","page":"Home","sessionId":152,"song":null,"ts":1541990217796,"userId":39}"#;
        let record: LogRecord = serde_json::from_str(line).unwrap();

        assert_eq!(record.artist, None);
        assert_eq!(record.length, None);
        assert_eq!(record.page.as_deref(), Some("Home"));
        assert_eq!(record.user_id.as_deref(), Some("39"));
    }
}
