//! Playback and queue controller
//!
//! The Controller owns the queue and the one current session behind a single
//! lock. Background tasks (exit watchers, pollers, seek refreshes) get copies
//! of what they need plus the session id they belong to, and report back
//! through the controller, which drops anything from a superseded session.

use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{ self, UnboundedReceiver, UnboundedSender };
use tokio_util::sync::CancellationToken;

use crate::advance::{ self, Binding, Boundary, ExitVerdict, SkipGuard, Step };
use crate::config::PlayerConfig;
use crate::ipc::{ ControlChannel, IpcError };
use crate::poller::{ self, ProgressSink, Reading };
use crate::queue::{ PlaybackMode, Queue, Removed };
use crate::session::{ fresh_socket_path, PlayMode, PlaybackState, Session, SessionId, SessionInfo };
use crate::supervisor::{ self, ExitOutcome, Invocation, Launcher, MpvLauncher };
use crate::track::Track;


/// Errors returned synchronously by playback actions.
#[derive( Debug, Error )]
pub enum PlaybackError {
    #[error( "{tool} is not installed or not on PATH" )]
    ToolMissing { tool: String },

    #[error( "Failed to start player: {0}" )]
    Spawn( String ),

    #[error( "Player command failed: {0}" )]
    Command( String ),

    #[error( "Nothing is playing" )]
    NothingPlaying,

    #[error( "No track at queue position {0}" )]
    InvalidIndex( usize ),
}


impl From<IpcError> for PlaybackError {
    fn from( e: IpcError ) -> Self {
        match e {
            IpcError::TransportMissing( tool ) => PlaybackError::ToolMissing { tool },
            other => PlaybackError::Command( other.to_string() ),
        }
    }
}


/// Asynchronous outcomes reported after a session ends.
#[derive( Debug, Clone, PartialEq )]
pub enum Notice {
    /// The source blocked the content; the extraction tool likely needs an update.
    Rejected { title: String },
    Failed { title: String, detail: String },
    /// Auto-advance stopped at a boundary.
    Halted( Boundary ),
    /// A directly played track ended.
    Finished { title: String },
}


/// Events emitted by the controller for UI updates.
#[derive( Debug, Clone, PartialEq )]
pub enum PlayerEvent {
    TrackChanged { track: Track, index: Option<usize> },
    StateChanged { state: PlaybackState },
    PositionChanged { position: f64, duration: f64 },
    QueueChanged,
    ModeChanged { mode: PlaybackMode },
    PlayModeChanged { mode: PlayMode },
    Notice( Notice ),
    Error { message: String },
}


/// Result of a play, next or previous request.
#[derive( Debug, Clone, PartialEq )]
pub enum Advance {
    Started { index: Option<usize>, track: Track },
    Unavailable( Boundary ),
}


struct State {
    queue: Queue,
    session: Option<Session>,
    play_mode: PlayMode,
    guard: SkipGuard,
    poller_stop: Option<CancellationToken>,
}


struct Inner {
    state: Mutex<State>,
    config: PlayerConfig,
    launcher: Arc<dyn Launcher>,
    channel: ControlChannel,
    handle: Handle,
    events: UnboundedSender<PlayerEvent>,
}


/// Cloneable handle to the playback controller.
#[derive( Clone )]
pub struct Controller {
    inner: Arc<Inner>,
}


impl Controller {
    /// Creates a controller that launches mpv as configured.
    pub fn new( config: PlayerConfig, handle: Handle ) -> ( Self, UnboundedReceiver<PlayerEvent> ) {
        let launcher = Arc::new( MpvLauncher::new( config.player_binary.clone(), config.ytdlp_binary.clone() ) );
        Self::with_launcher( config, launcher, handle )
    }


    /// Creates a controller with a custom process launcher.
    pub fn with_launcher(
        config: PlayerConfig,
        launcher: Arc<dyn Launcher>,
        handle: Handle,
    ) -> ( Self, UnboundedReceiver<PlayerEvent> ) {
        let ( events, receiver ) = mpsc::unbounded_channel();
        let channel = ControlChannel::new( config.transport, config.socat_binary.clone() );

        let state = State {
            queue: Queue::new(),
            session: None,
            play_mode: config.play_mode,
            guard: SkipGuard::default(),
            poller_stop: None,
        };

        let inner = Inner {
            state: Mutex::new( state ),
            config,
            launcher,
            channel,
            handle,
            events,
        };

        ( Self { inner: Arc::new( inner ) }, receiver )
    }


    /// Plays the queue entry at `index`.
    pub fn play_index( &self, index: usize ) -> Result<Advance, PlaybackError> {
        let mut state = self.inner.lock();
        if state.queue.is_empty() {
            return Ok( Advance::Unavailable( Boundary::QueueEmpty ) );
        }
        let track = state.queue.get( index ).cloned().ok_or( PlaybackError::InvalidIndex( index ) )?;
        self.inner.start( &mut state, track, Some( index ) )
    }


    /// Plays a track that is not bound to any queue position.
    pub fn play_direct( &self, track: Track ) -> Result<Advance, PlaybackError> {
        let mut state = self.inner.lock();
        self.inner.start( &mut state, track, None )
    }


    /// Skips forward using the current mode's selection rule.
    pub fn next( &self ) -> Result<Advance, PlaybackError> {
        let mut state = self.inner.lock();
        let step = advance::next_step(
            Inner::binding( &state ),
            state.queue.mode(),
            state.queue.len(),
            &mut rand::thread_rng(),
        );
        self.inner.skip_to( &mut state, step )
    }


    /// Skips backward using the current mode's selection rule.
    pub fn previous( &self ) -> Result<Advance, PlaybackError> {
        let mut state = self.inner.lock();
        let step = advance::previous_step( Inner::binding( &state ), state.queue.mode(), state.queue.len() );
        self.inner.skip_to( &mut state, step )
    }


    /// Stops playback. The queue keeps its position.
    pub fn stop( &self ) {
        let mut state = self.inner.lock();
        if let Some( id ) = Inner::teardown( &mut state ) {
            tracing::info!( "Stopped session {}", id.raw() );
            self.inner.emit( PlayerEvent::StateChanged { state: PlaybackState::Stopped } );
        }
    }


    /// Toggles pause on the current session.
    ///
    /// @returns the new paused state
    pub async fn toggle_pause( &self ) -> Result<bool, PlaybackError> {
        let ( id, socket ) = {
            let state = self.inner.lock();
            let session = state.session.as_ref().ok_or( PlaybackError::NothingPlaying )?;
            ( session.id, session.socket_path.clone() )
        };

        if !tokio::fs::try_exists( &socket ).await.unwrap_or( false ) {
            return Err( PlaybackError::NothingPlaying );
        }

        self.inner.channel.cycle_pause( &socket ).await?;

        let paused = {
            let mut state = self.inner.lock();
            let session = state.session.as_mut()
                .filter( |s| s.id == id )
                .ok_or( PlaybackError::NothingPlaying )?;
            session.is_paused = !session.is_paused;
            session.is_paused
        };

        let state = if paused { PlaybackState::Paused } else { PlaybackState::Playing };
        self.inner.emit( PlayerEvent::StateChanged { state } );
        Ok( paused )
    }


    /// Seeks by `delta_seconds`. Silently does nothing when idle.
    pub async fn seek_relative( &self, delta_seconds: f64 ) -> Result<(), PlaybackError> {
        let ( id, socket ) = {
            let state = self.inner.lock();
            match state.session.as_ref() {
                Some( session ) => ( session.id, session.socket_path.clone() ),
                None => return Ok( () ),
            }
        };

        if !tokio::fs::try_exists( &socket ).await.unwrap_or( false ) {
            return Ok( () );
        }

        self.inner.channel.seek_relative( &socket, delta_seconds ).await?;

        let inner = Arc::clone( &self.inner );
        let delay = inner.config.seek_refresh();
        self.inner.handle.spawn( async move {
            tokio::time::sleep( delay ).await;
            let reading = poller::read_progress( &inner.channel, &socket ).await;
            inner.apply( id, reading );
        });

        Ok( () )
    }


    /// Appends a track to the queue.
    pub fn add( &self, track: Track ) {
        self.inner.lock().queue.add( track );
        self.inner.emit( PlayerEvent::QueueChanged );
    }


    /// Appends several tracks to the queue.
    pub fn add_many( &self, tracks: Vec<Track> ) {
        self.inner.lock().queue.add_many( tracks );
        self.inner.emit( PlayerEvent::QueueChanged );
    }


    /// Removes a queue entry. Removing the playing entry stops playback.
    pub fn remove( &self, index: usize ) -> Option<Removed> {
        let mut state = self.inner.lock();
        let removed = state.queue.remove( index )?;

        let playing_from_queue = state.session.as_ref().map( |s| s.from_queue ).unwrap_or( false );
        if removed.was_current && playing_from_queue {
            if let Some( id ) = Inner::teardown( &mut state ) {
                tracing::info!( "Removed playing track, stopped session {}", id.raw() );
            }
            self.inner.emit( PlayerEvent::StateChanged { state: PlaybackState::Stopped } );
        }

        self.inner.emit( PlayerEvent::QueueChanged );
        Some( removed )
    }


    /// Moves a queue entry. The playing entry keeps playing.
    pub fn move_track( &self, from: usize, to: usize ) -> bool {
        let moved = self.inner.lock().queue.move_track( from, to );
        if moved {
            self.inner.emit( PlayerEvent::QueueChanged );
        }
        moved
    }


    /// Empties the queue. A playing queue track continues as a direct play.
    pub fn clear( &self ) {
        let mut state = self.inner.lock();
        state.queue.clear();
        if let Some( session ) = state.session.as_mut() {
            session.from_queue = false;
        }
        self.inner.emit( PlayerEvent::QueueChanged );
    }


    /// Replaces the queue, e.g. from a restored snapshot.
    pub fn restore_queue( &self, queue: Queue ) {
        let mut state = self.inner.lock();
        let mode = queue.mode();
        state.queue = queue;
        if let Some( session ) = state.session.as_mut() {
            session.from_queue = false;
        }
        self.inner.emit( PlayerEvent::QueueChanged );
        self.inner.emit( PlayerEvent::ModeChanged { mode } );
    }


    pub fn mode( &self ) -> PlaybackMode {
        self.inner.lock().queue.mode()
    }


    pub fn set_mode( &self, mode: PlaybackMode ) {
        self.inner.lock().queue.set_mode( mode );
        tracing::info!( "Playback mode: {}", mode.label().name );
        self.inner.emit( PlayerEvent::ModeChanged { mode } );
    }


    /// Advances the repeat cycle and returns the new mode.
    pub fn cycle_repeat( &self ) -> PlaybackMode {
        let mode = self.mode().cycle_repeat();
        self.set_mode( mode );
        mode
    }


    /// Toggles shuffle and returns the new mode.
    pub fn toggle_shuffle( &self ) -> PlaybackMode {
        let mode = self.mode().toggle_shuffle();
        self.set_mode( mode );
        mode
    }


    pub fn play_mode( &self ) -> PlayMode {
        self.inner.lock().play_mode
    }


    /// Sets audio or video rendering. Applies from the next session.
    pub fn set_play_mode( &self, mode: PlayMode ) {
        self.inner.lock().play_mode = mode;
        self.inner.emit( PlayerEvent::PlayModeChanged { mode } );
    }


    pub fn toggle_play_mode( &self ) -> PlayMode {
        let mode = self.play_mode().toggle();
        self.set_play_mode( mode );
        mode
    }


    /// Copy of the queue.
    pub fn queue( &self ) -> Queue {
        self.inner.lock().queue.clone()
    }


    /// Copy of the current session, if any.
    pub fn session( &self ) -> Option<SessionInfo> {
        let state = self.inner.lock();
        let index = state.queue.current_index();
        state.session.as_ref().map( |s| s.info( index ) )
    }


    pub fn playback_state( &self ) -> PlaybackState {
        self.session().map( |s| s.state() ).unwrap_or( PlaybackState::Stopped )
    }
}


impl Inner {
    fn lock( &self ) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else( PoisonError::into_inner )
    }


    fn emit( &self, event: PlayerEvent ) {
        // A closed receiver means the UI is gone; nothing left to notify.
        let _ = self.events.send( event );
    }


    fn binding( state: &State ) -> Binding {
        match state.session.as_ref() {
            None => Binding::Idle,
            Some( session ) => match state.queue.current_index() {
                Some( index ) if session.from_queue => Binding::Queue( index ),
                _ => Binding::Direct,
            },
        }
    }


    /// Stops the poller and kills the current session, if any.
    fn teardown( state: &mut State ) -> Option<SessionId> {
        if let Some( stop ) = state.poller_stop.take() {
            stop.cancel();
        }
        let session = state.session.take()?;
        session.kill.cancel();
        Some( session.id )
    }


    fn skip_to( self: &Arc<Self>, state: &mut State, step: Step ) -> Result<Advance, PlaybackError> {
        match step {
            Step::Halt( boundary ) => Ok( Advance::Unavailable( boundary ) ),
            Step::Play( index ) => {
                let track = state.queue.get( index ).cloned().ok_or( PlaybackError::InvalidIndex( index ) )?;
                if let Some( id ) = state.session.as_ref().map( |s| s.id ) {
                    state.guard.arm( id );
                }
                self.start( state, track, Some( index ) )
            }
        }
    }


    /// Replaces the current session with a new one for `track`.
    fn start( self: &Arc<Self>, state: &mut State, track: Track, index: Option<usize> ) -> Result<Advance, PlaybackError> {
        if let Some( old ) = Self::teardown( state ) {
            tracing::debug!( "Replacing session {}", old.raw() );
        }

        let invocation = Invocation {
            url: track.url.clone(),
            title: track.display_title().to_string(),
            socket_path: fresh_socket_path( &self.config.socket_dir() ),
            play_mode: state.play_mode,
        };

        let spawned = {
            let _runtime = self.handle.enter();
            supervisor::spawn( self.launcher.as_ref(), &invocation )
        };
        let child = match spawned {
            Ok( child ) => child,
            Err( e ) => {
                tracing::warn!( "Could not start {:?}: {}", track.title, e );
                self.emit( PlayerEvent::StateChanged { state: PlaybackState::Stopped } );
                return Err( e );
            }
        };

        match index {
            Some( i ) => {
                state.queue.jump_to( i );
            }
            None => state.queue.unbind(),
        }

        let id = SessionId::next();
        let kill = CancellationToken::new();
        tracing::info!( "Playing {:?} (session {}, queue position {:?})", track.title, id.raw(), index );

        state.session = Some( Session {
            id,
            socket_path: invocation.socket_path.clone(),
            track: track.clone(),
            from_queue: index.is_some(),
            is_playing: true,
            is_paused: false,
            position: 0.0,
            duration: 0.0,
            kill: kill.clone(),
        });

        let inner = Arc::clone( self );
        let socket = invocation.socket_path.clone();
        self.handle.spawn( async move {
            let outcome = supervisor::wait_for_exit( child, kill ).await;
            supervisor::remove_socket( &socket ).await;
            tokio::time::sleep( inner.config.exit_grace() ).await;
            inner.on_exit( id, outcome );
        });

        let stop = CancellationToken::new();
        state.poller_stop = Some( stop.clone() );
        let sink: Arc<dyn ProgressSink> = Arc::clone( self ) as Arc<dyn ProgressSink>;
        self.handle.spawn( poller::run(
            self.channel.clone(),
            invocation.socket_path,
            id,
            self.config.poll_interval(),
            stop,
            sink,
        ));

        self.emit( PlayerEvent::TrackChanged { track: track.clone(), index } );
        self.emit( PlayerEvent::StateChanged { state: PlaybackState::Playing } );
        Ok( Advance::Started { index, track } )
    }


    /// Called by a session's exit watcher once the grace delay has passed.
    fn on_exit( self: &Arc<Self>, id: SessionId, outcome: ExitOutcome ) {
        let mut state = self.lock();
        let current = state.session.as_ref().map( |s| s.id );

        match state.guard.judge( id, current ) {
            ExitVerdict::Suppressed => {
                tracing::debug!( "Session {} was skipped, no auto-advance", id.raw() );
                return;
            }
            ExitVerdict::Stale => {
                tracing::debug!( "Session {} was superseded, exit ignored", id.raw() );
                return;
            }
            ExitVerdict::Evaluate => {}
        }

        let binding = Self::binding( &state );
        let title = state.session.as_ref().map( |s| s.track.display_title().to_string() ).unwrap_or_default();
        Self::teardown( &mut state );

        match outcome {
            ExitOutcome::Rejected => {
                tracing::warn!( "Playback of {:?} was rejected by the source", title );
                self.emit( PlayerEvent::Notice( Notice::Rejected { title } ) );
                self.emit( PlayerEvent::StateChanged { state: PlaybackState::Stopped } );
            }
            ExitOutcome::Failed( detail ) => {
                tracing::warn!( "Playback of {:?} failed: {}", title, detail );
                self.emit( PlayerEvent::Notice( Notice::Failed { title, detail } ) );
                self.emit( PlayerEvent::StateChanged { state: PlaybackState::Stopped } );
            }
            ExitOutcome::Clean => match binding {
                Binding::Queue( current ) => {
                    let step = advance::auto_step(
                        current,
                        state.queue.mode(),
                        state.queue.len(),
                        &mut rand::thread_rng(),
                    );
                    self.auto_advance( &mut state, step );
                }
                Binding::Direct | Binding::Idle => {
                    tracing::info!( "Finished {:?}", title );
                    self.emit( PlayerEvent::Notice( Notice::Finished { title } ) );
                    self.emit( PlayerEvent::StateChanged { state: PlaybackState::Stopped } );
                }
            },
        }
    }


    fn auto_advance( self: &Arc<Self>, state: &mut State, step: Step ) {
        let next = match step {
            Step::Play( index ) => state.queue.get( index ).cloned().map( |t| ( index, t ) ),
            Step::Halt( _ ) => None,
        };

        match next {
            Some( ( index, track ) ) => {
                if let Err( e ) = self.start( state, track, Some( index ) ) {
                    self.emit( PlayerEvent::Error { message: e.to_string() } );
                }
            }
            None => {
                let boundary = match step {
                    Step::Halt( boundary ) => boundary,
                    Step::Play( _ ) => Boundary::QueueEmpty,
                };
                tracing::info!( "Queue stopped: {:?}", boundary );
                self.emit( PlayerEvent::Notice( Notice::Halted( boundary ) ) );
                self.emit( PlayerEvent::StateChanged { state: PlaybackState::Stopped } );
            }
        }
    }
}


impl ProgressSink for Inner {
    fn apply( &self, session: SessionId, reading: Reading ) -> bool {
        let ( position, duration ) = {
            let mut state = self.lock();
            let current = match state.session.as_mut() {
                Some( current ) if current.id == session && current.is_playing => current,
                _ => return false,
            };
            if let Some( position ) = reading.position {
                current.position = position;
            }
            if let Some( duration ) = reading.duration {
                current.duration = duration;
            }
            ( current.position, current.duration )
        };

        self.emit( PlayerEvent::PositionChanged { position, duration } );
        true
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_transport_missing_maps_to_tool_missing() {
        let err: PlaybackError = IpcError::TransportMissing( "socat".to_string() ).into();
        assert!( matches!( err, PlaybackError::ToolMissing { ref tool } if tool == "socat" ) );

        let err: PlaybackError = IpcError::Rejected( "invalid parameter".to_string() ).into();
        assert!( matches!( err, PlaybackError::Command( _ ) ) );
    }
}
