//! Playback sessions
//!
//! A session is one running player process plus its dedicated control
//! socket and the progress observed from it.

use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::{ SystemTime, UNIX_EPOCH };

use serde::{ Deserialize, Serialize };
use tokio_util::sync::CancellationToken;

use crate::queue::ModeLabel;
use crate::track::Track;


static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new( 1 );
static LAST_SOCKET_STAMP: AtomicU64 = AtomicU64::new( 0 );


/// Identity stamp of a session. Never reused within a process.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct SessionId( u64 );


impl SessionId {
    /// Allocates the next identity.
    pub fn next() -> Self {
        Self( NEXT_SESSION_ID.fetch_add( 1, Ordering::Relaxed ) )
    }


    /// Wraps a raw value (tests and logging).
    pub fn from_raw( raw: u64 ) -> Self {
        Self( raw )
    }


    pub fn raw( self ) -> u64 {
        self.0
    }
}


/// Audio-only or audio+video rendering.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize )]
#[serde( rename_all = "snake_case" )]
pub enum PlayMode {
    #[default]
    Audio,
    Video,
}


impl PlayMode {
    pub fn toggle( self ) -> Self {
        match self {
            PlayMode::Audio => PlayMode::Video,
            PlayMode::Video => PlayMode::Audio,
        }
    }


    pub fn label( self ) -> ModeLabel {
        match self {
            PlayMode::Audio => ModeLabel { tag: "A", name: "Audio" },
            PlayMode::Video => ModeLabel { tag: "V", name: "Video" },
        }
    }
}


/// Current playback state.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}


/// Returns a control-socket path unique to this invocation.
///
/// The stamp is a nanosecond timestamp forced to be strictly increasing,
/// so two sessions started within the same clock tick still differ.
pub fn fresh_socket_path( dir: &Path ) -> PathBuf {
    let now = SystemTime::now()
        .duration_since( UNIX_EPOCH )
        .map( |d| d.as_nanos() as u64 )
        .unwrap_or( 0 );

    let mut last = LAST_SOCKET_STAMP.load( Ordering::Relaxed );
    let stamp = loop {
        let candidate = now.max( last + 1 );
        match LAST_SOCKET_STAMP.compare_exchange_weak( last, candidate, Ordering::Relaxed, Ordering::Relaxed ) {
            Ok( _ ) => break candidate,
            Err( actual ) => last = actual,
        }
    };

    dir.join( format!( "tubetui-mpv-{}.sock", stamp ) )
}


/// Live session owned by the controller.
#[derive( Debug )]
pub(crate) struct Session {
    pub id: SessionId,
    pub socket_path: PathBuf,
    pub track: Track,
    /// Started from a queue position rather than directly. The position
    /// itself is tracked by the queue so edits keep it in step.
    pub from_queue: bool,
    pub is_playing: bool,
    pub is_paused: bool,
    pub position: f64,
    pub duration: f64,
    /// Cancelling asks the exit watcher to kill the process.
    pub kill: CancellationToken,
}


impl Session {
    pub fn info( &self, queue_index: Option<usize> ) -> SessionInfo {
        SessionInfo {
            id: self.id,
            socket_path: self.socket_path.clone(),
            track: self.track.clone(),
            queue_index: if self.from_queue { queue_index } else { None },
            is_playing: self.is_playing,
            is_paused: self.is_paused,
            position: self.position,
            duration: self.duration,
        }
    }
}


/// Copy of a session's observable fields.
#[derive( Debug, Clone, PartialEq )]
pub struct SessionInfo {
    pub id: SessionId,
    pub socket_path: PathBuf,
    pub track: Track,
    pub queue_index: Option<usize>,
    pub is_playing: bool,
    pub is_paused: bool,
    pub position: f64,
    pub duration: f64,
}


impl SessionInfo {
    pub fn state( &self ) -> PlaybackState {
        match ( self.is_playing, self.is_paused ) {
            ( false, _ ) => PlaybackState::Stopped,
            ( true, true ) => PlaybackState::Paused,
            ( true, false ) => PlaybackState::Playing,
        }
    }


    /// Fraction of the track played, in `[0, 1]`.
    pub fn progress( &self ) -> f64 {
        if self.duration > 0.0 {
            ( self.position / self.duration ).clamp( 0.0, 1.0 )
        } else {
            0.0
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_socket_paths_never_repeat() {
        let dir = Path::new( "/tmp" );
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!( seen.insert( fresh_socket_path( dir ) ) );
        }
    }


    #[test]
    fn test_session_ids_increase() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert!( b > a );
    }


    #[test]
    fn test_progress_is_clamped() {
        let info = SessionInfo {
            id: SessionId::from_raw( 1 ),
            socket_path: PathBuf::from( "/tmp/x" ),
            track: Track::default(),
            queue_index: None,
            is_playing: true,
            is_paused: false,
            position: 30.0,
            duration: 20.0,
        };
        assert_eq!( info.progress(), 1.0 );
        assert_eq!( info.state(), PlaybackState::Playing );
    }
}
