mod file_config;

pub use file_config::FileConfig;

use crate::pipeline::PipelineConfig;
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_SONG_DATA_DIR: &str = "data/song_data";
pub const DEFAULT_LOG_DATA_DIR: &str = "data/log_data";

/// Values given on the command line, already carrying their defaults.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database_path: Option<PathBuf>,
    pub song_data_dir: PathBuf,
    pub log_data_dir: PathBuf,
    pub workers: usize,
    pub show_progress: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            song_data_dir: PathBuf::from(DEFAULT_SONG_DATA_DIR),
            log_data_dir: PathBuf::from(DEFAULT_LOG_DATA_DIR),
            workers: 0,
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub song_data_dir: PathBuf,
    pub log_data_dir: PathBuf,
    pub workers: usize,
    pub show_progress: bool,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let database_path = file
            .database_path
            .map(PathBuf::from)
            .or_else(|| cli.database_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("database_path must be specified via --db or in config file")
            })?;
        if database_path.is_dir() {
            bail!("database_path is a directory: {:?}", database_path);
        }

        let song_data_dir = file
            .song_data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.song_data_dir.clone());
        let log_data_dir = file
            .log_data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.log_data_dir.clone());

        let workers = file.workers.unwrap_or(cli.workers);
        let show_progress = file.progress.unwrap_or(cli.show_progress);

        Ok(Self {
            database_path,
            song_data_dir,
            log_data_dir,
            workers,
            show_progress,
            log_level: file.log_level,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            song_data_dir: self.song_data_dir.clone(),
            log_data_dir: self.log_data_dir.clone(),
            workers: self.workers,
            show_progress: self.show_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cli_with_db(path: &str) -> CliConfig {
        CliConfig {
            database_path: Some(PathBuf::from(path)),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let cli = CliConfig {
            database_path: Some(PathBuf::from("/tmp/warehouse.db")),
            song_data_dir: PathBuf::from("/data/songs"),
            log_data_dir: PathBuf::from("/data/logs"),
            workers: 3,
            show_progress: false,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/warehouse.db"));
        assert_eq!(config.song_data_dir, PathBuf::from("/data/songs"));
        assert_eq!(config.log_data_dir, PathBuf::from("/data/logs"));
        assert_eq!(config.workers, 3);
        assert!(!config.show_progress);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&cli_with_db("warehouse.db"), None).unwrap();

        assert_eq!(config.song_data_dir, PathBuf::from(DEFAULT_SONG_DATA_DIR));
        assert_eq!(config.log_data_dir, PathBuf::from(DEFAULT_LOG_DATA_DIR));
        assert_eq!(config.workers, 0);
        assert!(config.show_progress);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let file_config = FileConfig {
            database_path: Some("/var/lib/warehouse.db".to_string()),
            song_data_dir: Some("/srv/song_data".to_string()),
            log_data_dir: None,
            workers: Some(8),
            progress: Some(false),
            log_level: Some("debug".to_string()),
        };

        let config = AppConfig::resolve(&cli_with_db("cli.db"), Some(file_config)).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/warehouse.db"));
        assert_eq!(config.song_data_dir, PathBuf::from("/srv/song_data"));
        assert_eq!(config.log_data_dir, PathBuf::from(DEFAULT_LOG_DATA_DIR));
        assert_eq!(config.workers, 8);
        assert!(!config.show_progress);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_resolve_missing_database_path() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("database_path must be specified"));
    }

    #[test]
    fn test_resolve_rejects_directory_as_database() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            database_path: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_pipeline_config_carries_values() {
        let cli = CliConfig {
            workers: 5,
            show_progress: false,
            ..cli_with_db("warehouse.db")
        };
        let pipeline = AppConfig::resolve(&cli, None).unwrap().pipeline_config();

        assert_eq!(pipeline.workers, 5);
        assert!(!pipeline.show_progress);
        assert_eq!(pipeline.song_data_dir, PathBuf::from(DEFAULT_SONG_DATA_DIR));
    }

    #[test]
    fn test_load_file_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
database_path = "/data/sparkify.db"
log_data_dir = "/data/log_data"
workers = 4
progress = false
log_level = "songplay_warehouse=debug"
"#,
        )
        .unwrap();

        let file_config = FileConfig::load(&path).unwrap();

        assert_eq!(file_config.database_path.as_deref(), Some("/data/sparkify.db"));
        assert_eq!(file_config.song_data_dir, None);
        assert_eq!(file_config.log_data_dir.as_deref(), Some("/data/log_data"));
        assert_eq!(file_config.workers, Some(4));
        assert_eq!(file_config.progress, Some(false));
        assert_eq!(
            file_config.log_level.as_deref(),
            Some("songplay_warehouse=debug")
        );
    }

    #[test]
    fn test_load_file_config_rejects_bad_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "workers = \"many\"").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
