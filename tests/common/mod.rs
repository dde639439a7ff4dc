//! Common test infrastructure
//!
//! Provides a throwaway warehouse plus song and log data directories for
//! end-to-end pipeline tests. Tests should only import from this module.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{song_line, TestWarehouse, SONG_1_ID};
//!
//! #[test]
//! fn test_load_songs() {
//!     let mut env = TestWarehouse::new();
//!     env.write_song_file("A/song.json", &[song_line(SONG_1_ID, "A1", "Artist", "Song", 1.0)]);
//!     let report = env.run().unwrap();
//!     assert_eq!(report.songs.songs_inserted, 1);
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::{log_line, play_line, song_line, TestWarehouse};
