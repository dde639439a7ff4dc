use super::LoadError;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parse one line-delimited JSON file, keeping line order. Blank lines are
/// skipped; any other line that does not decode fails the whole file.
pub fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_error)?);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    debug!("Parsed {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Reads batches of source files on a bounded worker pool.
pub struct RecordLoader {
    pool: ThreadPool,
    show_progress: bool,
}

impl RecordLoader {
    /// `workers == 0` sizes the pool to the available CPUs.
    pub fn new(workers: usize, show_progress: bool) -> Result<Self, LoadError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("record-loader-{idx}"))
            .build()?;
        info!(
            "Record loader ready with {} workers",
            pool.current_num_threads()
        );
        Ok(Self {
            pool,
            show_progress,
        })
    }

    /// Parse every file in `paths` and concatenate the results in path order.
    ///
    /// Files are parsed concurrently; the call returns once all of them are
    /// done. The first file that fails to read or parse fails the load.
    pub fn load<T: DeserializeOwned + Send>(&self, paths: &[PathBuf]) -> Result<Vec<T>, LoadError> {
        let progress = self.progress_bar(paths.len());

        let batches = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let batch = parse_file::<T>(path);
                    progress.inc(1);
                    batch
                })
                .collect::<Result<Vec<_>, _>>()
        });
        progress.finish_and_clear();

        let records: Vec<T> = batches?.into_iter().flatten().collect();
        info!(
            "{} json files loaded, {} records",
            paths.len(),
            records.len()
        );
        Ok(records)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  Parsing    {bar:40.cyan/blue} {pos}/{len} files [{elapsed_precise}]",
        ) {
            progress.set_style(style.progress_chars("##-"));
        }
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{LogRecord, SongRecord};
    use std::fs;
    use tempfile::TempDir;

    fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn test_parse_file_keeps_line_order_and_skips_blanks() {
        let dir = TempDir::new().unwrap();
        let path = write_lines(
            dir.path(),
            "log.json",
            &[
                r#"{"page": "Home", "ts": 1}"#,
                "",
                r#"{"page": "NextSong", "ts": 2}"#,
                "   ",
                r#"{"page": "Logout", "ts": 3}"#,
            ],
        );

        let records: Vec<LogRecord> = parse_file(&path).unwrap();
        let ts: Vec<_> = records.iter().map(|r| r.ts).collect();
        assert_eq!(ts, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_parse_error_names_file_and_line() {
        let dir = TempDir::new().unwrap();
        let path = write_lines(
            dir.path(),
            "broken.json",
            &[r#"{"song_id": "S1"}"#, r#"{"song_id": "#],
        );

        let err = parse_file::<SongRecord>(&path).unwrap_err();
        match err {
            LoadError::Parse { path: p, line, .. } => {
                assert_eq!(p, path);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = parse_file::<SongRecord>(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_load_concatenates_in_path_order() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..12)
            .map(|i| {
                let first = format!(r#"{{"song_id": "S{i}-a"}}"#);
                let second = format!(r#"{{"song_id": "S{i}-b"}}"#);
                write_lines(dir.path(), &format!("song_{i:02}.json"), &[first.as_str(), second.as_str()])
            })
            .collect();

        let loader = RecordLoader::new(4, false).unwrap();
        let records: Vec<SongRecord> = loader.load(&paths).unwrap();

        let expected: Vec<String> = (0..12)
            .flat_map(|i| [format!("S{i}-a"), format!("S{i}-b")])
            .collect();
        let ids: Vec<String> = records.into_iter().filter_map(|r| r.song_id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_one_bad_file_fails_the_load() {
        let dir = TempDir::new().unwrap();
        let good = write_lines(dir.path(), "good.json", &[r#"{"song_id": "S1"}"#]);
        let bad = write_lines(dir.path(), "bad.json", &["not json"]);

        let loader = RecordLoader::new(2, false).unwrap();
        let result = loader.load::<SongRecord>(&[good, bad.clone()]);
        assert!(matches!(result, Err(LoadError::Parse { path, .. }) if path == bad));
    }

    #[test]
    fn test_load_of_no_files_is_empty() {
        let loader = RecordLoader::new(1, false).unwrap();
        let records: Vec<LogRecord> = loader.load(&[]).unwrap();
        assert!(records.is_empty());
    }
}
