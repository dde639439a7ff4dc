use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use songplay_warehouse::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_LOG_DATA_DIR, DEFAULT_SONG_DATA_DIR,
};
use songplay_warehouse::{Pipeline, SqliteWarehouse};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().context("Error resolving current directory")?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(name = "songplay-etl")]
#[command(about = "Load song metadata and activity logs into the songplay warehouse")]
struct CliArgs {
    /// Path to the SQLite warehouse database file.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Path to a TOML config file. Values in the file override CLI values.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop the warehouse tables and create them again, empty.
    Init,

    /// Load song data, then log data, into the warehouse.
    Load {
        /// Root directory of the song metadata files.
        #[clap(long, value_parser = parse_path, default_value = DEFAULT_SONG_DATA_DIR)]
        song_data: PathBuf,

        /// Root directory of the activity log files.
        #[clap(long, value_parser = parse_path, default_value = DEFAULT_LOG_DATA_DIR)]
        log_data: PathBuf,

        /// Number of parser threads, 0 for one per CPU.
        #[clap(long, default_value_t = 0)]
        workers: usize,

        /// Hide the file parsing progress bar.
        #[clap(long, default_value_t = false)]
        no_progress: bool,
    },
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        let mut cli = CliConfig {
            database_path: self.db.clone(),
            ..Default::default()
        };
        if let Command::Load {
            song_data,
            log_data,
            workers,
            no_progress,
        } = &self.command
        {
            cli.song_data_dir = song_data.clone();
            cli.log_data_dir = log_data.clone();
            cli.workers = *workers;
            cli.show_progress = !no_progress;
        }
        cli
    }
}

fn init_tracing(config_level: Option<&str>) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(config_level.unwrap_or_default())
    });
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    init_tracing(config.log_level.as_deref());

    match cli_args.command {
        Command::Init => {
            info!("Recreating warehouse tables in {:?}", config.database_path);
            SqliteWarehouse::recreate(&config.database_path).with_context(|| {
                format!("Failed to initialize warehouse {:?}", config.database_path)
            })?;
            info!("Warehouse ready");
        }
        Command::Load { .. } => {
            let mut warehouse = SqliteWarehouse::open(&config.database_path)?;
            let pipeline = Pipeline::new(config.pipeline_config())?;
            let report = pipeline.run(&mut warehouse)?;

            info!("Load complete");
            info!(
                "  songs: {} files, {} artists, {} songs inserted",
                report.songs.files, report.songs.artists_inserted, report.songs.songs_inserted
            );
            info!(
                "  logs:  {} files, {} timestamps, {} users, {} songplays inserted",
                report.logs.files,
                report.logs.time_rows_inserted,
                report.logs.users_written,
                report.logs.songplays_inserted
            );
        }
    }

    Ok(())
}
