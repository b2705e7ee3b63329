//! Saved session snapshot
//!
//! A flat JSON document holding the queue, the search results in view and
//! the cursor positions, written on quit or on demand and read at startup.

use std::fs;
use std::path::{ Path, PathBuf };

use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::queue::{ PlaybackMode, Queue };
use crate::session::PlayMode;
use crate::track::Track;


/// Errors reading or writing a snapshot.
#[derive( Debug, Error )]
pub enum SnapshotError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Invalid snapshot: {0}" )]
    Format( #[from] serde_json::Error ),

    #[error( "No state directory available" )]
    NoStateDir,
}


#[derive( Debug, Clone, Default, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct Snapshot {
    pub search_term: String,
    pub search_results: Vec<Track>,
    pub queue: Vec<Track>,
    pub current_index: Option<usize>,
    pub playback_mode: PlaybackMode,
    pub play_mode: PlayMode,
    pub search_page: usize,
    /// Index of the selected result across all pages.
    pub search_cursor: usize,
    pub queue_cursor: usize,
    pub last_saved: Option<DateTime<Utc>>,
}


impl Snapshot {
    /// `<state_dir>/tubetui/state.json`, falling back to the local data
    /// directory on platforms without a state dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::state_dir()
            .or_else( dirs::data_local_dir )
            .map( |p| p.join( "tubetui" ).join( "state.json" ) )
    }


    /// Captures the queue part of a snapshot.
    pub fn with_queue( mut self, queue: &Queue ) -> Self {
        self.queue = queue.tracks().to_vec();
        self.current_index = queue.current_index();
        self.playback_mode = queue.mode();
        self
    }


    /// Rebuilds the queue, dropping an index that no longer fits.
    pub fn to_queue( &self ) -> Queue {
        Queue::from_parts( self.queue.clone(), self.current_index, self.playback_mode )
    }


    /// Reads a snapshot. A missing file is `Ok(None)`.
    pub fn load( path: &Path ) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok( None );
        }
        let contents = fs::read_to_string( path )?;
        Ok( Some( serde_json::from_str( &contents )? ) )
    }


    /// Writes the snapshot, stamping `last_saved`.
    pub fn save( &mut self, path: &Path ) -> Result<(), SnapshotError> {
        if let Some( parent ) = path.parent() {
            fs::create_dir_all( parent )?;
        }
        self.last_saved = Some( Utc::now() );

        let json = serde_json::to_string_pretty( self )?;
        let temp = path.with_extension( "json.tmp" );
        fs::write( &temp, json )?;
        fs::rename( &temp, path )?;

        tracing::info!( "Saved state to {:?}", path );
        Ok( () )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "nested" ).join( "state.json" );

        let mut queue = Queue::new();
        queue.add( Track::new( "a", "https://v/a" ) );
        queue.add( Track::new( "b", "https://v/b" ) );
        queue.jump_to( 1 );
        queue.set_mode( PlaybackMode::RepeatAll );

        let mut snapshot = Snapshot {
            search_term: "lofi".to_string(),
            search_page: 2,
            play_mode: PlayMode::Video,
            ..Snapshot::default()
        }.with_queue( &queue );
        snapshot.save( &path ).unwrap();

        let loaded = Snapshot::load( &path ).unwrap().unwrap();
        assert_eq!( loaded.to_queue(), queue );
        assert_eq!( loaded.search_term, "lofi" );
        assert_eq!( loaded.play_mode, PlayMode::Video );
        assert!( loaded.last_saved.is_some() );
    }


    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!( Snapshot::load( &dir.path().join( "absent.json" ) ).unwrap().is_none() );
    }


    #[test]
    fn test_partial_document_uses_defaults() {
        let snapshot: Snapshot = serde_json::from_str( r#"{ "queue": [ { "title": "x", "url": "u" } ], "current_index": 5 }"# ).unwrap();
        let queue = snapshot.to_queue();
        assert_eq!( queue.len(), 1 );
        assert_eq!( queue.current_index(), None );
        assert_eq!( queue.mode(), PlaybackMode::Normal );
    }
}
