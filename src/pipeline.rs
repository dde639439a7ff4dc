//! Load orchestration: song files first, then activity logs.
//!
//! Each source type is loaded inside its own unit of work. A failure aborts
//! the run; units committed before the failure stay in the warehouse.

use crate::dimensions::{
    build_artist_rows, build_song_rows, build_time_rows, build_user_rows, select_play_events,
};
use crate::records::{find_json_files, LoadError, LogRecord, RecordLoader, SongRecord};
use crate::resolver::{build_songplay_rows, ResolutionStats};
use crate::warehouse::schema::{ARTISTS_TABLE, SONGS_TABLE, TIME_TABLE};
use crate::warehouse::{SqliteWarehouse, WarehouseError, WriteMode};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Users are the one dimension whose attributes change between loads.
const USER_UPSERT: WriteMode = WriteMode::Upsert {
    key: "user_id",
    update: &["first_name", "last_name", "gender", "level"],
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub song_data_dir: PathBuf,
    pub log_data_dir: PathBuf,
    /// Parser threads, 0 for one per CPU.
    pub workers: usize,
    pub show_progress: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SongLoadReport {
    pub files: usize,
    pub records: usize,
    pub artists_inserted: usize,
    pub songs_inserted: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogLoadReport {
    pub files: usize,
    pub records: usize,
    pub play_events: usize,
    pub skipped_without_timestamp: usize,
    pub time_rows_inserted: usize,
    pub users_written: usize,
    pub songplays_inserted: usize,
    pub resolution: ResolutionStats,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub songs: SongLoadReport,
    pub logs: LogLoadReport,
}

pub struct Pipeline {
    config: PipelineConfig,
    loader: RecordLoader,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let loader = RecordLoader::new(config.workers, config.show_progress)?;
        Ok(Self { config, loader })
    }

    pub fn run(&self, warehouse: &mut SqliteWarehouse) -> Result<PipelineReport, PipelineError> {
        let songs = self.process_song_data(warehouse)?;
        let logs = self.process_log_data(warehouse)?;
        Ok(PipelineReport { songs, logs })
    }

    pub fn process_song_data(
        &self,
        warehouse: &mut SqliteWarehouse,
    ) -> Result<SongLoadReport, PipelineError> {
        let files = discover(&self.config.song_data_dir)?;
        self.load_song_files(warehouse, &files)
    }

    pub fn process_log_data(
        &self,
        warehouse: &mut SqliteWarehouse,
    ) -> Result<LogLoadReport, PipelineError> {
        let files = discover(&self.config.log_data_dir)?;
        self.load_log_files(warehouse, &files)
    }

    /// Load the artist and song dimensions from `files` in one unit of work.
    pub fn load_song_files(
        &self,
        warehouse: &mut SqliteWarehouse,
        files: &[PathBuf],
    ) -> Result<SongLoadReport, PipelineError> {
        let mut report = SongLoadReport {
            files: files.len(),
            ..Default::default()
        };
        if files.is_empty() {
            return Ok(report);
        }

        let records: Vec<SongRecord> = self.loader.load(files)?;
        report.records = records.len();

        let unit = warehouse.begin_unit()?;
        let artists = build_artist_rows(&records, &unit.fetch_keys(&ARTISTS_TABLE, "artist_id")?);
        report.artists_inserted = unit.write_rows(&artists, WriteMode::Insert)?;
        let songs = build_song_rows(&records, &unit.fetch_keys(&SONGS_TABLE, "song_id")?);
        report.songs_inserted = unit.write_rows(&songs, WriteMode::Insert)?;
        unit.commit()?;

        info!(
            "Song data loaded: {} records, {} new artists, {} new songs",
            report.records, report.artists_inserted, report.songs_inserted
        );
        Ok(report)
    }

    /// Load the time and user dimensions and the songplay facts from `files`
    /// in one unit of work. Songs must already be loaded for plays to resolve.
    pub fn load_log_files(
        &self,
        warehouse: &mut SqliteWarehouse,
        files: &[PathBuf],
    ) -> Result<LogLoadReport, PipelineError> {
        let mut report = LogLoadReport {
            files: files.len(),
            ..Default::default()
        };
        if files.is_empty() {
            return Ok(report);
        }

        let records: Vec<LogRecord> = self.loader.load(files)?;
        report.records = records.len();

        let selected = select_play_events(&records);
        report.play_events = selected.events.len();
        report.skipped_without_timestamp = selected.missing_timestamp;
        if selected.missing_timestamp > 0 {
            warn!(
                "Skipping {} NextSong events without a timestamp",
                selected.missing_timestamp
            );
        }

        let unit = warehouse.begin_unit()?;
        let time_rows = build_time_rows(
            &selected.events,
            &unit.fetch_keys(&TIME_TABLE, "start_time")?,
        );
        report.time_rows_inserted = unit.write_rows(&time_rows, WriteMode::Insert)?;
        report.users_written = unit.write_rows(&build_user_rows(&selected.events), USER_UPSERT)?;

        let (songplays, resolution) = build_songplay_rows(&unit, &selected.events)?;
        report.resolution = resolution;
        report.songplays_inserted = unit.write_rows(&songplays, WriteMode::Insert)?;
        unit.commit()?;

        info!(
            "Log data loaded: {} records, {} plays, {} new timestamps, {} users written",
            report.records, report.play_events, report.time_rows_inserted, report.users_written
        );
        info!(
            "Song resolution: {} matched, {} not found, {} ambiguous, {} incomplete",
            resolution.matched, resolution.not_found, resolution.ambiguous, resolution.incomplete
        );
        Ok(report)
    }
}

fn discover(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let files = find_json_files(root)?;
    if files.is_empty() {
        warn!("No json files found in {:?}", root);
    } else {
        info!("{} files found in {:?}", files.len(), root);
    }
    Ok(files)
}
