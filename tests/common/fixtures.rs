//! Data directory and warehouse fixtures

use serde_json::{json, Value};
use songplay_warehouse::{Pipeline, PipelineConfig, PipelineError, PipelineReport, SqliteWarehouse};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A warehouse file with empty song and log data directories next to it.
pub struct TestWarehouse {
    _temp_dir: TempDir,
    pub db_path: PathBuf,
    pub song_data_dir: PathBuf,
    pub log_data_dir: PathBuf,
    pub warehouse: SqliteWarehouse,
}

impl TestWarehouse {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("warehouse.db");
        let song_data_dir = temp_dir.path().join("song_data");
        let log_data_dir = temp_dir.path().join("log_data");
        fs::create_dir_all(&song_data_dir).unwrap();
        fs::create_dir_all(&log_data_dir).unwrap();
        let warehouse = SqliteWarehouse::open(&db_path).unwrap();

        Self {
            _temp_dir: temp_dir,
            db_path,
            song_data_dir,
            log_data_dir,
            warehouse,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(PipelineConfig {
            song_data_dir: self.song_data_dir.clone(),
            log_data_dir: self.log_data_dir.clone(),
            workers: 2,
            show_progress: false,
        })
        .unwrap()
    }

    pub fn run(&mut self) -> Result<PipelineReport, PipelineError> {
        let pipeline = self.pipeline();
        pipeline.run(&mut self.warehouse)
    }

    pub fn write_song_file(&self, relative: &str, lines: &[Value]) -> PathBuf {
        write_lines(&self.song_data_dir, relative, lines)
    }

    pub fn write_log_file(&self, relative: &str, lines: &[Value]) -> PathBuf {
        write_lines(&self.log_data_dir, relative, lines)
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.warehouse
            .connection()
            .query_row(sql, [], |r| r.get(0))
            .unwrap()
    }
}

fn write_lines(root: &Path, relative: &str, lines: &[Value]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let content: Vec<String> = lines.iter().map(Value::to_string).collect();
    fs::write(&path, content.join("\n")).unwrap();
    path
}

/// One song metadata line.
pub fn song_line(song_id: &str, artist_id: &str, artist_name: &str, title: &str, duration: f64) -> Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": null,
        "artist_longitude": null,
        "artist_location": "",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": duration,
        "year": 0
    })
}

/// One activity log line without song fields.
pub fn log_line(page: &str, ts: i64, user_id: &str, level: &str) -> Value {
    json!({
        "artist": null,
        "auth": "Logged In",
        "firstName": "Jacob",
        "gender": "M",
        "itemInSession": 0,
        "lastName": "Klein",
        "length": null,
        "level": level,
        "location": "Tampa-St. Petersburg-Clearwater, FL",
        "method": "GET",
        "page": page,
        "registration": 1540558108796.0,
        "sessionId": 518,
        "song": null,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0",
        "userId": user_id
    })
}

/// One `NextSong` log line.
pub fn play_line(ts: i64, user_id: &str, level: &str, song: &str, artist: &str, length: f64) -> Value {
    let mut line = log_line("NextSong", ts, user_id, level);
    line["song"] = json!(song);
    line["artist"] = json!(artist);
    line["length"] = json!(length);
    line["method"] = json!("PUT");
    line
}
