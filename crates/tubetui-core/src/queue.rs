//! Queue management
//!
//! Handles track ordering, the bound playback position, and the playback
//! mode. Selection of the next track lives in [`crate::advance`].

use serde::{ Deserialize, Serialize };

use crate::track::Track;


/// How the queue continues once a track finishes.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize )]
#[serde( rename_all = "snake_case" )]
pub enum PlaybackMode {
    #[default]
    Normal,
    RepeatOne,
    RepeatAll,
    Shuffle,
}


/// Presentation-free description of a mode.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct ModeLabel {
    /// Short tag suitable for a badge, e.g. `R1`.
    pub tag: &'static str,
    /// Human name, e.g. `Repeat one`.
    pub name: &'static str,
}


const MODE_LABELS: [( PlaybackMode, ModeLabel ); 4] = [
    ( PlaybackMode::Normal, ModeLabel { tag: "", name: "Normal" } ),
    ( PlaybackMode::RepeatOne, ModeLabel { tag: "R1", name: "Repeat one" } ),
    ( PlaybackMode::RepeatAll, ModeLabel { tag: "R", name: "Repeat all" } ),
    ( PlaybackMode::Shuffle, ModeLabel { tag: "S", name: "Shuffle" } ),
];


impl PlaybackMode {
    /// Looks up the label for this mode.
    pub fn label( self ) -> ModeLabel {
        MODE_LABELS.iter()
            .find( |( mode, _ )| *mode == self )
            .map( |( _, label )| *label )
            .unwrap_or( MODE_LABELS[ 0 ].1 )
    }


    /// Cycles the repeat modes: Normal → RepeatOne → RepeatAll → Normal.
    /// Shuffle drops back to Normal.
    pub fn cycle_repeat( self ) -> Self {
        match self {
            PlaybackMode::Normal => PlaybackMode::RepeatOne,
            PlaybackMode::RepeatOne => PlaybackMode::RepeatAll,
            PlaybackMode::RepeatAll | PlaybackMode::Shuffle => PlaybackMode::Normal,
        }
    }


    /// Switches between Shuffle and Normal.
    pub fn toggle_shuffle( self ) -> Self {
        if self == PlaybackMode::Shuffle {
            PlaybackMode::Normal
        } else {
            PlaybackMode::Shuffle
        }
    }
}


/// Result of removing a track from the queue.
#[derive( Debug, Clone, PartialEq )]
pub struct Removed {
    pub track: Track,
    /// True when the removed track was the bound playback position.
    pub was_current: bool,
}


/// Ordered queue of tracks with a bound playback position.
#[derive( Debug, Clone, Default, PartialEq )]
pub struct Queue {
    tracks: Vec<Track>,
    current_index: Option<usize>,
    mode: PlaybackMode,
}


impl Queue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }


    /// Rebuilds a queue from persisted parts, dropping an out-of-range index.
    pub fn from_parts( tracks: Vec<Track>, current_index: Option<usize>, mode: PlaybackMode ) -> Self {
        let current_index = current_index.filter( |&i| i < tracks.len() );
        Self { tracks, current_index, mode }
    }


    /// Adds a track to the end of the queue.
    pub fn add( &mut self, track: Track ) {
        self.tracks.push( track );
    }


    /// Adds multiple tracks to the queue.
    pub fn add_many( &mut self, tracks: impl IntoIterator<Item = Track> ) {
        self.tracks.extend( tracks );
    }


    /// Clears the queue and its bound position.
    pub fn clear( &mut self ) {
        self.tracks.clear();
        self.current_index = None;
    }


    /// Removes a track at the specified index.
    ///
    /// Removing before the bound position shifts it down by one; removing
    /// the bound track itself unbinds the queue.
    pub fn remove( &mut self, index: usize ) -> Option<Removed> {
        if index >= self.tracks.len() {
            return None;
        }

        let track = self.tracks.remove( index );
        let mut was_current = false;

        if let Some( current ) = self.current_index {
            if index < current {
                self.current_index = Some( current - 1 );
            } else if index == current {
                self.current_index = None;
                was_current = true;
            }
        }

        Some( Removed { track, was_current } )
    }


    /// Moves a track from one position to another, keeping the bound
    /// position attached to the same track.
    ///
    /// @returns true if the move was successful
    pub fn move_track( &mut self, from: usize, to: usize ) -> bool {
        if from >= self.tracks.len() || to >= self.tracks.len() {
            return false;
        }

        if from == to {
            return true;
        }

        let track = self.tracks.remove( from );
        self.tracks.insert( to, track );

        if let Some( current ) = self.current_index {
            if current == from {
                self.current_index = Some( to );
            } else if from < current && current <= to {
                self.current_index = Some( current - 1 );
            } else if to <= current && current < from {
                self.current_index = Some( current + 1 );
            }
        }

        true
    }


    /// Binds the queue to a position and returns the track there.
    pub fn jump_to( &mut self, index: usize ) -> Option<&Track> {
        if index < self.tracks.len() {
            self.current_index = Some( index );
            self.current()
        } else {
            None
        }
    }


    /// Drops the bound position (direct play or stop).
    pub fn unbind( &mut self ) {
        self.current_index = None;
    }


    /// Gets the bound track.
    pub fn current( &self ) -> Option<&Track> {
        self.current_index.and_then( |i| self.tracks.get( i ) )
    }


    /// Gets the bound position.
    pub fn current_index( &self ) -> Option<usize> {
        self.current_index
    }


    /// Gets a track by position.
    pub fn get( &self, index: usize ) -> Option<&Track> {
        self.tracks.get( index )
    }


    /// Gets all tracks in the queue.
    pub fn tracks( &self ) -> &[Track] {
        &self.tracks
    }


    /// Gets the number of tracks.
    pub fn len( &self ) -> usize {
        self.tracks.len()
    }


    /// Returns true if the queue is empty.
    pub fn is_empty( &self ) -> bool {
        self.tracks.is_empty()
    }


    /// Gets the playback mode.
    pub fn mode( &self ) -> PlaybackMode {
        self.mode
    }


    /// Sets the playback mode.
    pub fn set_mode( &mut self, mode: PlaybackMode ) {
        self.mode = mode;
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn queue_of( titles: &[&str] ) -> Queue {
        let mut queue = Queue::new();
        queue.add_many( titles.iter().map( |t| Track::new( *t, format!( "https://v/{}", t ) ) ) );
        queue
    }


    #[test]
    fn test_remove_before_current_shifts_index() {
        let mut queue = queue_of( &[ "a", "b", "c" ] );
        queue.jump_to( 2 );

        let removed = queue.remove( 0 ).unwrap();

        assert!( !removed.was_current );
        assert_eq!( queue.current_index(), Some( 1 ) );
        assert_eq!( queue.current().unwrap().title, "c" );
    }


    #[test]
    fn test_remove_current_unbinds() {
        let mut queue = queue_of( &[ "a", "b", "c" ] );
        queue.jump_to( 1 );

        let removed = queue.remove( 1 ).unwrap();

        assert!( removed.was_current );
        assert_eq!( queue.current_index(), None );
        assert_eq!( queue.len(), 2 );
    }


    #[test]
    fn test_remove_after_current_keeps_index() {
        let mut queue = queue_of( &[ "a", "b", "c" ] );
        queue.jump_to( 0 );

        queue.remove( 2 );

        assert_eq!( queue.current_index(), Some( 0 ) );
    }


    #[test]
    fn test_remove_out_of_range() {
        let mut queue = queue_of( &[ "a" ] );
        assert!( queue.remove( 5 ).is_none() );
    }


    #[test]
    fn test_move_track_follows_current() {
        let mut queue = queue_of( &[ "a", "b", "c", "d" ] );
        queue.jump_to( 1 );

        assert!( queue.move_track( 1, 3 ) );
        assert_eq!( queue.current_index(), Some( 3 ) );
        assert_eq!( queue.current().unwrap().title, "b" );

        assert!( queue.move_track( 0, 3 ) );
        assert_eq!( queue.current_index(), Some( 2 ) );
        assert_eq!( queue.current().unwrap().title, "b" );

        let titles: Vec<_> = queue.tracks().iter().map( |t| t.title.as_str() ).collect();
        assert_eq!( titles, vec![ "c", "d", "b", "a" ] );
    }


    #[test]
    fn test_from_parts_drops_invalid_index() {
        let queue = Queue::from_parts( vec![ Track::new( "a", "u" ) ], Some( 4 ), PlaybackMode::RepeatAll );
        assert_eq!( queue.current_index(), None );
        assert_eq!( queue.mode(), PlaybackMode::RepeatAll );
    }


    #[test]
    fn test_mode_cycles() {
        assert_eq!( PlaybackMode::Normal.cycle_repeat(), PlaybackMode::RepeatOne );
        assert_eq!( PlaybackMode::RepeatOne.cycle_repeat(), PlaybackMode::RepeatAll );
        assert_eq!( PlaybackMode::RepeatAll.cycle_repeat(), PlaybackMode::Normal );
        assert_eq!( PlaybackMode::Shuffle.cycle_repeat(), PlaybackMode::Normal );
        assert_eq!( PlaybackMode::RepeatAll.toggle_shuffle(), PlaybackMode::Shuffle );
        assert_eq!( PlaybackMode::Shuffle.toggle_shuffle(), PlaybackMode::Normal );
    }


    #[test]
    fn test_mode_labels() {
        assert_eq!( PlaybackMode::RepeatOne.label().tag, "R1" );
        assert_eq!( PlaybackMode::Shuffle.label().name, "Shuffle" );
    }
}
