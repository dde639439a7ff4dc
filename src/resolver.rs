//! Entity resolution: match each play event to a stored song/artist pair.
//!
//! A play event only carries the song title, the artist name and the song
//! length. An event resolves when exactly one stored song has that title,
//! belongs to an artist with that name and has that duration. No match and
//! several matches both leave the foreign keys empty.

use crate::dimensions::PlayEvent;
use crate::warehouse::{SongPlayRow, WarehouseError};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

/// Read access to the loaded song and artist dimensions.
pub trait SongLookup {
    /// Songs matching (title, artist name, duration) exactly. Implementations
    /// may stop after the second match.
    fn find_song_matches(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Vec<SongMatch>, WarehouseError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    pub matched: usize,
    pub not_found: usize,
    pub ambiguous: usize,
    /// Events lacking a title, artist or length, never looked up.
    pub incomplete: usize,
}

#[derive(Debug, Clone)]
enum Resolution {
    Matched(SongMatch),
    NotFound,
    Ambiguous,
}

/// Resolves events one at a time, remembering the outcome for every
/// (title, artist, length) already looked up in this run.
pub struct SongResolver<'a, L: SongLookup> {
    lookup: &'a L,
    cache: HashMap<(String, String, u64), Resolution>,
    stats: ResolutionStats,
}

impl<'a, L: SongLookup> SongResolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
            stats: ResolutionStats::default(),
        }
    }

    pub fn resolve(
        &mut self,
        title: Option<&str>,
        artist_name: Option<&str>,
        length: Option<f64>,
    ) -> Result<Option<SongMatch>, WarehouseError> {
        let (Some(title), Some(artist_name), Some(length)) = (title, artist_name, length) else {
            self.stats.incomplete += 1;
            return Ok(None);
        };

        let key = (title.to_string(), artist_name.to_string(), length.to_bits());
        let resolution = match self.cache.get(&key) {
            Some(resolution) => resolution.clone(),
            None => {
                let mut matches = self.lookup.find_song_matches(title, artist_name, length)?;
                let resolution = match matches.len() {
                    0 => Resolution::NotFound,
                    1 => Resolution::Matched(matches.remove(0)),
                    _ => Resolution::Ambiguous,
                };
                self.cache.insert(key, resolution.clone());
                resolution
            }
        };

        Ok(match resolution {
            Resolution::Matched(found) => {
                self.stats.matched += 1;
                Some(found)
            }
            Resolution::NotFound => {
                self.stats.not_found += 1;
                None
            }
            Resolution::Ambiguous => {
                self.stats.ambiguous += 1;
                None
            }
        })
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }
}

/// Build one fact row per play event, resolving song and artist ids.
pub fn build_songplay_rows<L: SongLookup>(
    lookup: &L,
    events: &[PlayEvent<'_>],
) -> Result<(Vec<SongPlayRow>, ResolutionStats), WarehouseError> {
    let mut resolver = SongResolver::new(lookup);
    let mut rows = Vec::with_capacity(events.len());

    for event in events {
        let record = event.record;
        let found = resolver.resolve(
            record.song.as_deref(),
            record.artist.as_deref(),
            record.length,
        )?;
        let (song_id, artist_id) = match found {
            Some(found) => (Some(found.song_id), Some(found.artist_id)),
            None => (None, None),
        };
        rows.push(SongPlayRow {
            start_time: event.start_time,
            user_id: event.user_id().map(str::to_string),
            level: record.level.clone(),
            song_id,
            artist_id,
            session_id: record.session_id,
            location: record.location.clone(),
            user_agent: record.user_agent.clone(),
        });
    }

    Ok((rows, resolver.stats()))
}
