//! Shared constants for end-to-end tests

// ============================================================================
// Song Data
// ============================================================================

pub const SONG_1_ID: &str = "S1";
pub const SONG_1_TITLE: &str = "Test Song";
pub const SONG_1_DURATION: f64 = 210.5;

pub const ARTIST_1_ID: &str = "A1";
pub const ARTIST_1_NAME: &str = "Test Artist";

// ============================================================================
// Log Data
// ============================================================================

pub const USER_1_ID: &str = "U1";

/// 2018-11-15 00:30:26.796 UTC
pub const PLAY_TS: i64 = 1_542_241_826_796;
pub const PLAY_START_TIME: &str = "2018-11-15 00:30:26.796";
