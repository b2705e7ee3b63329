//! tubetui CLI - terminal front end for searching and playing videos

mod art;
mod cli;
mod input;
mod logging;
mod results;
mod settings;
mod view;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{ Duration, Instant };

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{ self, Event, KeyCode, KeyEventKind, KeyModifiers },
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
    ExecutableCommand,
};
use image::DynamicImage;
use ratatui::{
    prelude::*,
    widgets::{ Block, Borders, List, ListItem, ListState, Paragraph, Wrap },
};
use tokio::runtime::{ Handle, Runtime };
use tokio::sync::mpsc::{ self, UnboundedReceiver, UnboundedSender };

use cli::Args;
use input::{ InputBuffer, InputMode };
use results::ResultList;
use settings::Settings;
use view::ViewMode;

use tubetui_core::{
    command,
    details::DEFAULT_DEBOUNCE,
    search,
    track::{ clock, format_upload_date },
    Advance, Boundary, Command, Controller, DetailLoader, Loaded, Notice, PlaybackError,
    PlaybackState, PlayerEvent, QueryKind, SearchError, Searcher, Snapshot, SnapshotError, ThumbnailCache,
    Track, VersionStatus,
};


const SEEK_STEP: f64 = 10.0;


/// Results of work spawned on the runtime, drained by `App::tick`.
enum Background {
    Searched { term: String, result: Result<Vec<Track>, SearchError> },
    LookedUp { url: String, result: Result<Track, SearchError> },
    Version( Result<VersionStatus, SearchError> ),
    Paused( Result<bool, PlaybackError> ),
    Seeked( Result<(), PlaybackError> ),
}


/// Application state.
struct App {
    runtime: Handle,
    controller: Controller,
    player_events: UnboundedReceiver<PlayerEvent>,
    searcher: Searcher,
    details: Option<( DetailLoader, UnboundedReceiver<Loaded> )>,
    background_tx: UnboundedSender<Background>,
    background_rx: UnboundedReceiver<Background>,
    snapshot_path: Option<PathBuf>,
    should_quit: bool,

    // View state
    view_mode: ViewMode,
    /// List the details pane describes.
    focus: ViewMode,
    results_state: ListState,
    queue_state: ListState,
    help_scroll: u16,

    // Search state
    results: ResultList,
    searching: bool,

    // Input state
    input_mode: InputMode,
    input_buffer: InputBuffer,

    // Details pane
    detail_url: Option<String>,
    detail_image: Option<Arc<DynamicImage>>,

    update_hint: Option<String>,

    // Status message (shown in status bar)
    status_message: Option<String>,
    status_clear_at: Option<Instant>,

    /// Opened on first copy and kept so X11 selections outlive the call.
    clipboard: Option<arboard::Clipboard>,
}


impl App {
    /// Creates a new App, restoring the last session unless asked not to.
    fn new( args: &Args, settings: Settings, runtime: Handle ) -> Result<Self> {
        let ( controller, player_events ) = Controller::new( settings.player.clone(), runtime.clone() );
        let searcher = Searcher::new( settings.player.ytdlp_binary.clone(), settings.search_limit );

        let details = if settings.thumbnails {
            ThumbnailCache::default_dir()
                .map( ThumbnailCache::new )
                .transpose()
                .unwrap_or_else( |e| {
                    tracing::warn!( "Thumbnails disabled: {}", e );
                    None
                })
                .map( |cache| DetailLoader::new( cache, runtime.clone(), DEFAULT_DEBOUNCE ) )
        } else {
            None
        };

        let ( background_tx, background_rx ) = mpsc::unbounded_channel();

        let mut app = Self {
            runtime,
            controller,
            player_events,
            searcher,
            details,
            background_tx,
            background_rx,
            snapshot_path: Snapshot::default_path(),
            should_quit: false,
            view_mode: ViewMode::Results,
            focus: ViewMode::Results,
            results_state: ListState::default(),
            queue_state: ListState::default(),
            help_scroll: 0,
            results: ResultList::new( settings.items_per_page ),
            searching: false,
            input_mode: InputMode::Normal,
            input_buffer: InputBuffer::new(),
            detail_url: None,
            detail_image: None,
            update_hint: None,
            status_message: None,
            status_clear_at: None,
            clipboard: None,
        };

        if settings.restore_on_start && !args.fresh {
            app.restore_snapshot();
        }
        if let Some( mode ) = args.play_mode() {
            app.controller.set_play_mode( mode );
        }
        // Restoring replays queue and mode events the user did not cause.
        while app.player_events.try_recv().is_ok() {}

        app.check_version();
        if let Some( query ) = args.initial_query() {
            app.start_search( query );
        }
        app.refresh_details();

        Ok( app )
    }


    /// Sets a status message that auto-clears after a delay.
    fn set_status( &mut self, msg: impl Into<String> ) {
        self.status_message = Some( msg.into() );
        self.status_clear_at = Some( Instant::now() + Duration::from_secs( 3 ) );
    }


    /// Clears expired messages and applies everything the runtime sent since the last frame.
    fn tick( &mut self ) {
        if let Some( clear_at ) = self.status_clear_at {
            if Instant::now() >= clear_at {
                self.status_message = None;
                self.status_clear_at = None;
            }
        }

        while let Ok( event ) = self.player_events.try_recv() {
            self.apply_player_event( event );
        }

        while let Ok( done ) = self.background_rx.try_recv() {
            self.apply_background( done );
        }

        if let Some(( loader, loaded )) = &mut self.details {
            while let Ok( item ) = loaded.try_recv() {
                if loader.is_current( item.generation ) && self.detail_url.as_deref() == Some( item.url.as_str() ) {
                    self.detail_image = item.image;
                }
            }
        }
    }


    fn apply_player_event( &mut self, event: PlayerEvent ) {
        match event {
            PlayerEvent::TrackChanged { track, index } => {
                tracing::debug!( "Now playing {:?} at {:?}", track.title, index );
            }
            PlayerEvent::StateChanged { .. } | PlayerEvent::PositionChanged { .. } => {}
            PlayerEvent::QueueChanged => {
                let len = self.controller.queue().len();
                clamp_selection( &mut self.queue_state, len );
                if self.focus == ViewMode::Queue {
                    self.refresh_details();
                }
            }
            PlayerEvent::ModeChanged { mode } => {
                self.set_status( format!( "Mode: {}", mode.label().name ) );
            }
            PlayerEvent::PlayModeChanged { mode } => {
                self.set_status( format!( "Playing {} from now on", mode.label().name.to_lowercase() ) );
            }
            PlayerEvent::Notice( notice ) => {
                self.set_status( notice_message( &notice ) );
            }
            PlayerEvent::Error { message } => {
                self.set_status( format!( "Error: {}", message ) );
            }
        }
    }


    fn apply_background( &mut self, done: Background ) {
        match done {
            Background::Searched { term, result } => {
                self.searching = false;
                match result {
                    Ok( tracks ) => {
                        let count = tracks.len();
                        self.results.replace( term, tracks );
                        self.results_state.select( if count == 0 { None } else { Some( 0 ) } );
                        self.view_mode = ViewMode::Results;
                        self.focus = ViewMode::Results;
                        self.refresh_details();
                        self.set_status( format!( "{} results for '{}'", count, self.results.term() ) );
                    }
                    Err( e ) => self.set_status( format!( "Search failed: {}", e ) ),
                }
            }
            Background::LookedUp { url, result } => match result {
                Ok( track ) => {
                    self.results.record_lookup( url, track );
                    self.set_status( "Details loaded" );
                }
                Err( e ) => self.set_status( format!( "Lookup failed: {}", e ) ),
            },
            Background::Version( result ) => match result {
                Ok( status ) if status.needs_update => {
                    let hint = format!( "yt-dlp {} looks old, run 'yt-dlp -U'", status.version );
                    self.set_status( hint.clone() );
                    self.update_hint = Some( hint );
                }
                Ok( status ) => tracing::info!( "yt-dlp {}", status.version ),
                Err( e ) => tracing::warn!( "yt-dlp version check failed: {}", e ),
            },
            Background::Paused( result ) => match result {
                Ok( true ) => self.set_status( "Paused" ),
                Ok( false ) => self.set_status( "Resumed" ),
                Err( e ) => self.set_status( format!( "Error: {}", e ) ),
            },
            Background::Seeked( result ) => {
                if let Err( e ) = result {
                    self.set_status( format!( "Error: {}", e ) );
                }
            }
        }
    }


    fn handle_key( &mut self, code: KeyCode, modifiers: KeyModifiers ) {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key( code ),
            InputMode::Command | InputMode::Search => self.handle_text_key( code, modifiers ),
        }
    }


    fn handle_normal_key( &mut self, code: KeyCode ) {
        if self.view_mode == ViewMode::Help {
            self.handle_help_key( code );
            return;
        }

        match code {
            KeyCode::Char( 'q' ) => self.should_quit = true,
            KeyCode::Char( '?' ) => {
                self.help_scroll = 0;
                self.view_mode = ViewMode::Help;
            }
            KeyCode::Char( '/' ) => {
                self.input_mode = InputMode::Command;
                self.input_buffer.clear();
            }
            KeyCode::Char( 'f' ) => {
                self.input_mode = InputMode::Search;
                self.input_buffer.set( self.results.term() );
            }
            KeyCode::Tab => self.switch_view( self.view_mode.next_tab() ),
            KeyCode::BackTab => self.switch_view( self.view_mode.prev_tab() ),

            KeyCode::Down | KeyCode::Char( 'j' ) => self.select_next(),
            KeyCode::Up | KeyCode::Char( 'k' ) => self.select_previous(),
            KeyCode::Char( ']' ) => self.change_page( true ),
            KeyCode::Char( '[' ) => self.change_page( false ),

            KeyCode::Enter => self.play_selected(),
            KeyCode::Char( 'a' ) => self.add_selected(),
            KeyCode::Char( 'd' ) => self.remove_selected(),
            KeyCode::Char( 'J' ) => self.move_selected( true ),
            KeyCode::Char( 'K' ) => self.move_selected( false ),
            KeyCode::Char( 'i' ) => self.lookup_selected(),
            KeyCode::Char( 'y' ) => self.copy_focused_url(),

            KeyCode::Char( ' ' ) => self.toggle_pause(),
            KeyCode::Char( 'n' ) => {
                let result = self.controller.next();
                self.report_advance( result );
            }
            KeyCode::Char( 'p' ) => {
                let result = self.controller.previous();
                self.report_advance( result );
            }
            KeyCode::Left => self.seek( -SEEK_STEP ),
            KeyCode::Right => self.seek( SEEK_STEP ),
            KeyCode::Char( 's' ) => {
                self.controller.stop();
                self.set_status( "Stopped" );
            }
            KeyCode::Char( 'r' ) => {
                self.controller.cycle_repeat();
            }
            KeyCode::Char( 'z' ) => {
                self.controller.toggle_shuffle();
            }
            KeyCode::Char( 'm' ) => {
                self.controller.toggle_play_mode();
            }
            _ => {}
        }
    }


    fn handle_help_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Char( '?' ) | KeyCode::Esc | KeyCode::Char( 'q' ) => {
                self.view_mode = self.focus;
            }
            KeyCode::Down | KeyCode::Char( 'j' ) => {
                self.help_scroll = self.help_scroll.saturating_add( 1 );
            }
            KeyCode::Up | KeyCode::Char( 'k' ) => {
                self.help_scroll = self.help_scroll.saturating_sub( 1 );
            }
            _ => {}
        }
    }


    /// Line editing shared by the command line and the search prompt.
    fn handle_text_key( &mut self, code: KeyCode, modifiers: KeyModifiers ) {
        match code {
            KeyCode::Enter => {
                let text = self.input_buffer.take();
                let mode = self.input_mode;
                self.input_mode = InputMode::Normal;
                match mode {
                    InputMode::Command => self.execute_command( &text ),
                    InputMode::Search => self.start_search( text ),
                    InputMode::Normal => {}
                }
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                if self.input_buffer.content().is_empty() {
                    self.input_mode = InputMode::Normal;
                } else {
                    self.input_buffer.backspace();
                }
            }
            KeyCode::Char( 'w' ) if modifiers.contains( KeyModifiers::CONTROL ) => {
                self.input_buffer.delete_word();
            }
            KeyCode::Delete => self.input_buffer.delete(),
            KeyCode::Left => self.input_buffer.move_left(),
            KeyCode::Right => self.input_buffer.move_right(),
            KeyCode::Home => self.input_buffer.move_home(),
            KeyCode::End => self.input_buffer.move_end(),
            KeyCode::Char( c ) => self.input_buffer.insert( c ),
            _ => {}
        }
    }


    fn execute_command( &mut self, input: &str ) {
        match Command::parse( input ) {
            Ok( cmd ) => {
                if let Err( e ) = self.run_command( cmd ) {
                    self.set_status( format!( "Error: {}", e ) );
                }
            }
            Err( e ) => {
                self.set_status( format!( "{}", e ) );
            }
        }
    }


    fn run_command( &mut self, cmd: Command ) -> Result<()> {
        match cmd {
            Command::Search { term } => self.start_search( term ),
            Command::Page { number } => {
                let total = self.results.page().total_pages();
                if number > total {
                    anyhow::bail!( "Only {} page(s) of results", total );
                }
                self.results.page_mut().set_page( number - 1 );
                self.select_first_on_page();
            }

            Command::Add => self.add_selected(),
            Command::Remove => self.remove_selected(),
            Command::Clear => {
                self.controller.clear();
                self.set_status( "Queue cleared" );
            }
            Command::Shuffle => {
                self.controller.toggle_shuffle();
            }
            Command::Repeat { mode } => match mode {
                Some( arg ) => self.controller.set_mode( arg.mode() ),
                None => {
                    self.controller.cycle_repeat();
                }
            },

            Command::Play => self.play_selected(),
            Command::Pause => self.toggle_pause(),
            Command::Stop => {
                self.controller.stop();
                self.set_status( "Stopped" );
            }
            Command::Next => {
                let result = self.controller.next();
                self.report_advance( result );
            }
            Command::Prev => {
                let result = self.controller.previous();
                self.report_advance( result );
            }
            Command::Seek { delta_seconds } => self.seek( delta_seconds ),
            Command::Mode { mode } => match mode {
                Some( mode ) => self.controller.set_play_mode( mode ),
                None => {
                    self.controller.toggle_play_mode();
                }
            },

            Command::Copy => self.copy_focused_url(),
            Command::Save => {
                self.save_snapshot()?;
                self.set_status( "Session saved" );
            }
            Command::Help => {
                self.help_scroll = 0;
                self.view_mode = ViewMode::Help;
            }
            Command::Quit => self.should_quit = true,
        }

        Ok(())
    }


    fn switch_view( &mut self, view: ViewMode ) {
        self.view_mode = view;
        if matches!( view, ViewMode::Results | ViewMode::Queue ) && self.focus != view {
            self.focus = view;
            self.refresh_details();
        }
    }


    /// List the cursor keys act on. The details pane steers its source list.
    fn active_list( &self ) -> ViewMode {
        match self.view_mode {
            ViewMode::Queue => ViewMode::Queue,
            ViewMode::Results => ViewMode::Results,
            _ => self.focus,
        }
    }


    fn select_next( &mut self ) {
        match self.active_list() {
            ViewMode::Queue => {
                let len = self.controller.queue().len();
                step_selection( &mut self.queue_state, len, true );
            }
            _ => {
                let len = self.results.page_items().len();
                step_selection( &mut self.results_state, len, true );
            }
        }
        self.refresh_details();
    }


    fn select_previous( &mut self ) {
        match self.active_list() {
            ViewMode::Queue => {
                let len = self.controller.queue().len();
                step_selection( &mut self.queue_state, len, false );
            }
            _ => {
                let len = self.results.page_items().len();
                step_selection( &mut self.results_state, len, false );
            }
        }
        self.refresh_details();
    }


    fn change_page( &mut self, forward: bool ) {
        let page = self.results.page_mut();
        let moved = if forward { page.next_page() } else { page.prev_page() };
        if moved {
            self.select_first_on_page();
        }
    }


    fn select_first_on_page( &mut self ) {
        let on_page = self.results.page_items().len();
        self.results_state = ListState::default();
        self.results_state.select( if on_page == 0 { None } else { Some( 0 ) } );
        self.refresh_details();
    }


    /// Absolute index of the selected search result.
    fn selected_result_index( &self ) -> Option<usize> {
        self.results_state.selected().and_then( |row| self.results.absolute( row ) )
    }


    fn selected_result( &self ) -> Option<Track> {
        self.selected_result_index().and_then( |i| self.results.get( i ).cloned() )
    }


    /// Track described by the details pane.
    fn focused_track( &self ) -> Option<Track> {
        match self.focus {
            ViewMode::Queue => self.queue_state
                .selected()
                .and_then( |i| self.controller.queue().get( i ).cloned() ),
            _ => self.selected_result(),
        }
    }


    fn copy_focused_url( &mut self ) {
        let track = self.focused_track();
        let clipboard = &mut self.clipboard;
        let status = copy_message( track.as_ref(), |url| {
            let board = match clipboard.take() {
                Some( board ) => board,
                None => arboard::Clipboard::new()?,
            };
            clipboard.insert( board ).set_text( url.to_string() )
        });
        self.set_status( status );
    }


    /// Points the detail loader at the focused track's thumbnail.
    fn refresh_details( &mut self ) {
        let thumbnail = self.focused_track()
            .map( |t| t.thumbnail )
            .filter( |t| !t.is_empty() );
        if thumbnail == self.detail_url {
            return;
        }

        self.detail_image = None;
        self.detail_url = thumbnail.clone();
        if let Some(( loader, _ )) = &self.details {
            match thumbnail {
                Some( url ) => {
                    loader.request( url );
                }
                None => loader.cancel(),
            }
        }
    }


    fn play_selected( &mut self ) {
        let result = match self.active_list() {
            ViewMode::Queue => match self.queue_state.selected() {
                Some( index ) => self.controller.play_index( index ),
                None => return,
            },
            _ => match self.selected_result() {
                Some( track ) => self.controller.play_direct( track ),
                None => return,
            },
        };
        self.report_advance( result );
    }


    fn add_selected( &mut self ) {
        if let Some( track ) = self.selected_result() {
            let title = track.display_title().to_string();
            self.controller.add( track );
            if self.queue_state.selected().is_none() {
                self.queue_state.select( Some( 0 ) );
            }
            self.set_status( format!( "Queued: {}", title ) );
        }
    }


    fn remove_selected( &mut self ) {
        let Some( index ) = self.queue_state.selected() else { return };
        if let Some( removed ) = self.controller.remove( index ) {
            let note = if removed.was_current { " (stopped)" } else { "" };
            self.set_status( format!( "Removed: {}{}", removed.track.display_title(), note ) );
        }
    }


    fn move_selected( &mut self, down: bool ) {
        let Some( index ) = self.queue_state.selected() else { return };
        let len = self.controller.queue().len();
        let target = if down {
            if index + 1 >= len { return }
            index + 1
        } else {
            if index == 0 { return }
            index - 1
        };
        if self.controller.move_track( index, target ) {
            self.queue_state.select( Some( target ) );
        }
    }


    fn lookup_selected( &mut self ) {
        let Some( track ) = self.focused_track() else { return };
        if self.results.has_lookup( &track.url ) {
            return;
        }

        self.set_status( "Fetching details..." );
        let searcher = self.searcher.clone();
        let tx = self.background_tx.clone();
        self.runtime.spawn( async move {
            let result = searcher.lookup( &track.url ).await;
            let _ = tx.send( Background::LookedUp { url: track.url, result } );
        });
    }


    fn start_search( &mut self, term: String ) {
        let term = term.trim().to_string();
        if term.is_empty() {
            self.set_status( "Nothing to search for" );
            return;
        }
        if self.searching {
            self.set_status( "A search is already running" );
            return;
        }

        self.searching = true;
        self.set_status( match search::classify( &term ) {
            QueryKind::Playlist => "Loading playlist...".to_string(),
            QueryKind::Video => "Loading video...".to_string(),
            QueryKind::Text => format!( "Searching for '{}'...", term ),
        });
        let searcher = self.searcher.clone();
        let tx = self.background_tx.clone();
        self.runtime.spawn( async move {
            let result = searcher.search( &term ).await;
            let _ = tx.send( Background::Searched { term, result } );
        });
    }


    fn check_version( &self ) {
        let searcher = self.searcher.clone();
        let tx = self.background_tx.clone();
        self.runtime.spawn( async move {
            let _ = tx.send( Background::Version( searcher.check_version().await ) );
        });
    }


    fn toggle_pause( &mut self ) {
        let controller = self.controller.clone();
        let tx = self.background_tx.clone();
        self.runtime.spawn( async move {
            let _ = tx.send( Background::Paused( controller.toggle_pause().await ) );
        });
    }


    fn seek( &mut self, delta_seconds: f64 ) {
        let controller = self.controller.clone();
        let tx = self.background_tx.clone();
        self.runtime.spawn( async move {
            let _ = tx.send( Background::Seeked( controller.seek_relative( delta_seconds ).await ) );
        });
    }


    fn report_advance( &mut self, result: Result<Advance, PlaybackError> ) {
        match result {
            Ok( Advance::Started { track, .. } ) => {
                self.set_status( format!( "Playing: {}", track.display_title() ) );
            }
            Ok( Advance::Unavailable( boundary ) ) => {
                self.set_status( boundary_message( boundary ) );
            }
            Err( e ) => {
                self.set_status( format!( "Error: {}", e ) );
            }
        }
    }


    fn restore_snapshot( &mut self ) {
        let Some( path ) = self.snapshot_path.clone() else { return };
        let snapshot = match Snapshot::load( &path ) {
            Ok( Some( snapshot ) ) => snapshot,
            Ok( None ) => return,
            Err( e ) => {
                tracing::warn!( "Ignoring saved session {:?}: {}", path, e );
                return;
            }
        };

        let queue = snapshot.to_queue();
        let queue_len = queue.len();
        self.controller.restore_queue( queue );
        self.controller.set_play_mode( snapshot.play_mode );

        let row = self.results.restore(
            snapshot.search_term,
            snapshot.search_results,
            snapshot.search_page,
            snapshot.search_cursor,
        );
        self.results_state.select( row );
        if queue_len > 0 {
            self.queue_state.select( Some( snapshot.queue_cursor.min( queue_len - 1 ) ) );
        }

        tracing::info!(
            "Restored session: {} queued, {} results for {:?}",
            queue_len,
            self.results.tracks().len(),
            self.results.term()
        );
    }


    /// Saves the current session state for restoration on next startup.
    fn save_snapshot( &self ) -> Result<(), SnapshotError> {
        let path = self.snapshot_path.as_ref().ok_or( SnapshotError::NoStateDir )?;
        let mut snapshot = Snapshot {
            search_term: self.results.term().to_string(),
            search_results: self.results.tracks().to_vec(),
            play_mode: self.controller.play_mode(),
            search_page: self.results.page().current_page(),
            search_cursor: self.selected_result_index().unwrap_or( 0 ),
            queue_cursor: self.queue_state.selected().unwrap_or( 0 ),
            ..Snapshot::default()
        }
        .with_queue( &self.controller.queue() );
        snapshot.save( path )
    }
}


/// Copies `track`'s URL with `copy` and describes the outcome.
fn copy_message<F>( track: Option<&Track>, copy: F ) -> String
where
    F: FnOnce( &str ) -> Result<(), arboard::Error>,
{
    let Some( track ) = track else {
        return "No track selected".to_string();
    };
    match copy( &track.url ) {
        Ok( () ) => format!( "Copied {}", track.url ),
        Err( e ) => {
            tracing::warn!( "Clipboard copy failed: {}", e );
            format!( "Clipboard error: {}", e )
        }
    }
}


fn boundary_message( boundary: Boundary ) -> &'static str {
    match boundary {
        Boundary::QueueEmpty => "Queue is empty",
        Boundary::QueueFinished => "End of queue",
        Boundary::AlreadyAtFirst => "Already at the first track",
        Boundary::NothingPlaying => "Nothing is playing",
    }
}


fn notice_message( notice: &Notice ) -> String {
    match notice {
        Notice::Rejected { title } => {
            format!( "'{}' was blocked by the site, yt-dlp may need an update", title )
        }
        Notice::Failed { title, detail } => format!( "'{}' failed: {}", title, detail ),
        Notice::Halted( boundary ) => boundary_message( *boundary ).to_string(),
        Notice::Finished { title } => format!( "Finished: {}", title ),
    }
}


/// Moves a list cursor one step, wrapping at either end.
fn step_selection( state: &mut ListState, len: usize, forward: bool ) {
    if len == 0 {
        state.select( None );
        return;
    }
    let i = match state.selected() {
        Some( i ) if forward => if i + 1 >= len { 0 } else { i + 1 },
        Some( i ) => if i == 0 { len - 1 } else { i - 1 },
        None => 0,
    };
    state.select( Some( i ) );
}


fn clamp_selection( state: &mut ListState, len: usize ) {
    match state.selected() {
        _ if len == 0 => state.select( None ),
        Some( i ) if i >= len => state.select( Some( len - 1 ) ),
        _ => {}
    }
}


fn main() -> Result<()> {
    let args = Args::parse();

    if let Err( e ) = logging::init() {
        eprintln!( "Logging disabled: {}", e );
    }

    let settings = Settings::load();
    settings.save_if_missing();

    let runtime = Runtime::new()?;
    let mut app = App::new( &args, settings, runtime.handle().clone() )?;

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;

    let mut terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;

    let outcome = run( &mut terminal, &mut app );

    app.controller.stop();
    if let Err( e ) = app.save_snapshot() {
        tracing::warn!( "Failed to save session: {}", e );
    }

    // Cleanup
    disable_raw_mode()?;
    io::stdout().execute( LeaveAlternateScreen )?;

    runtime.shutdown_timeout( Duration::from_millis( 500 ) );
    outcome
}


fn run( terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App ) -> Result<()> {
    loop {
        app.tick();

        terminal.draw( |frame| draw_ui( frame, app ) )?;

        if event::poll( Duration::from_millis( 100 ) )? {
            if let Event::Key( key ) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key( key.code, key.modifiers );
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}


/// Draws the main UI.
fn draw_ui( frame: &mut Frame, app: &mut App ) {
    let chunks = Layout::default()
        .direction( Direction::Vertical )
        .constraints([
            Constraint::Length( 2 ),  // Header
            Constraint::Min( 0 ),     // Main content
            Constraint::Length( 5 ),  // Now playing
            Constraint::Length( 1 ),  // Status bar
        ])
        .split( frame.area() );

    draw_header( frame, app, chunks[0] );

    match app.view_mode {
        ViewMode::Results => draw_results( frame, app, chunks[1] ),
        ViewMode::Queue => draw_queue( frame, app, chunks[1] ),
        ViewMode::Details => draw_details( frame, app, chunks[1] ),
        ViewMode::Help => draw_help( frame, app, chunks[1] ),
    }

    draw_now_playing( frame, app, chunks[2] );
    draw_status_bar( frame, app, chunks[3] );
}


fn draw_header( frame: &mut Frame, app: &App, area: Rect ) {
    let mut spans = vec![ Span::styled( "  TUBETUI ", Style::default().fg( Color::Cyan ).bold() ) ];
    for tab in ViewMode::TABS {
        let style = if tab == app.view_mode {
            Style::default().fg( Color::Black ).bg( Color::Cyan )
        } else {
            Style::default().fg( Color::DarkGray )
        };
        spans.push( Span::raw( " " ) );
        spans.push( Span::styled( format!( " {} ", tab.title() ), style ) );
    }
    if let Some( ref hint ) = app.update_hint {
        spans.push( Span::styled( format!( "   {}", hint ), Style::default().fg( Color::Yellow ) ) );
    }

    let header = Paragraph::new( Line::from( spans ) )
        .block( Block::default().borders( Borders::BOTTOM ) );
    frame.render_widget( header, area );
}


fn draw_results( frame: &mut Frame, app: &mut App, area: Rect ) {
    let playing_url = app.controller.session().map( |s| s.track.url );
    let items: Vec<ListItem> = app.results
        .on_page()
        .iter()
        .map( |track| {
            let marker = if playing_url.as_deref() == Some( track.url.as_str() ) { "> " } else { "  " };
            ListItem::new( Line::from( vec![
                Span::raw( marker ),
                Span::raw( track.display_title().to_string() ),
                Span::styled( format!( "  {}", track.author ), Style::default().fg( Color::Gray ) ),
                Span::styled( format!( "  {}", track.duration ), Style::default().fg( Color::DarkGray ) ),
            ]))
        })
        .collect();

    let title = if app.searching {
        " Searching... ".to_string()
    } else if app.results.is_empty() {
        " Results (press f to search) ".to_string()
    } else {
        format!(
            " '{}' - page {}/{} ",
            app.results.term(),
            app.results.page().current_page() + 1,
            app.results.page().total_pages()
        )
    };

    let list = List::new( items )
        .block( Block::default().title( title ).borders( Borders::ALL ) )
        .highlight_style( Style::default().bg( Color::DarkGray ).bold() );
    frame.render_stateful_widget( list, area, &mut app.results_state );
}


fn draw_queue( frame: &mut Frame, app: &mut App, area: Rect ) {
    let queue = app.controller.queue();
    let playing = app.controller.session().and_then( |s| s.queue_index );

    let items: Vec<ListItem> = queue
        .tracks()
        .iter()
        .enumerate()
        .map( |( i, track )| {
            let ( marker, style ) = if Some( i ) == playing {
                ( "> ", Style::default().fg( Color::Green ).bold() )
            } else if Some( i ) == queue.current_index() {
                ( "* ", Style::default() )
            } else {
                ( "  ", Style::default() )
            };
            ListItem::new( Line::from( vec![
                Span::styled( format!( "{}{:>3}. {}", marker, i + 1, track.display_title() ), style ),
                Span::styled( format!( "  {}", track.duration ), Style::default().fg( Color::DarkGray ) ),
            ]))
        })
        .collect();

    let title = format!( " Queue ({}) - {} ", queue.len(), queue.mode().label().name );
    let list = List::new( items )
        .block( Block::default().title( title ).borders( Borders::ALL ) )
        .highlight_style( Style::default().bg( Color::DarkGray ).bold() );
    frame.render_stateful_widget( list, area, &mut app.queue_state );
}


fn draw_details( frame: &mut Frame, app: &App, area: Rect ) {
    let block = Block::default()
        .title( format!( " Details ({}) ", app.focus.title() ) )
        .borders( Borders::ALL );
    let inner = block.inner( area );
    frame.render_widget( block, area );

    let Some( track ) = app.focused_track() else {
        frame.render_widget( Paragraph::new( " Nothing selected" ), inner );
        return;
    };
    let track = app.results.detailed( track );

    let columns = Layout::default()
        .direction( Direction::Horizontal )
        .constraints([ Constraint::Length( 42 ), Constraint::Min( 0 ) ])
        .split( inner );

    let picture = match ( &app.detail_image, &app.detail_url ) {
        ( Some( image ), _ ) => Paragraph::new( art::half_blocks(
            image,
            columns[0].width.saturating_sub( 2 ),
            columns[0].height,
        )),
        ( None, Some( _ ) ) => Paragraph::new( " Loading thumbnail..." ),
        ( None, None ) => Paragraph::new( " No thumbnail" ),
    };
    frame.render_widget( picture, columns[0] );

    let label = Style::default().fg( Color::Cyan );
    let mut lines = vec![
        Line::from( Span::styled( track.display_title().to_string(), Style::default().bold() ) ),
        Line::from( "" ),
        Line::from( vec![ Span::styled( "Channel:  ", label ), Span::raw( track.author.clone() ) ] ),
        Line::from( vec![ Span::styled( "Length:   ", label ), Span::raw( track.duration.clone() ) ] ),
    ];
    if let Some( date ) = format_upload_date( &track.published_at ) {
        lines.push( Line::from( vec![ Span::styled( "Uploaded: ", label ), Span::raw( date ) ] ) );
    }
    lines.push( Line::from( vec![ Span::styled( "URL:      ", label ), Span::raw( track.url.clone() ) ] ) );
    lines.push( Line::from( "" ) );
    if track.description.is_empty() {
        lines.push( Line::from( Span::styled( "Press i to fetch the description", Style::default().fg( Color::DarkGray ) ) ) );
    } else {
        lines.extend( track.description.lines().map( |l| Line::from( l.to_string() ) ) );
    }

    let text = Paragraph::new( lines ).wrap( Wrap { trim: false } );
    frame.render_widget( text, columns[1] );
}


fn draw_help( frame: &mut Frame, app: &mut App, area: Rect ) {
    let help_text = format!(
        "{}\n\nKeys:\n  f search   Tab switch pane   Enter play   a add   d remove   J/K move\n  \
         Space pause   n/p next/prev   Left/Right seek 10s   s stop\n  \
         r repeat   z shuffle   m audio/video   [ ] page   i details   q quit",
        command::help_text()
    );
    let line_count = help_text.lines().count() as u16;
    let visible_height = area.height.saturating_sub( 2 );

    let max_scroll = line_count.saturating_sub( visible_height );
    if app.help_scroll > max_scroll {
        app.help_scroll = max_scroll;
    }

    let help = Paragraph::new( help_text )
        .block( Block::default()
            .title( " Help (j/k scroll, ? or Esc to close) " )
            .borders( Borders::ALL )
        )
        .wrap( Wrap { trim: false } )
        .scroll(( app.help_scroll, 0 ));

    frame.render_widget( help, area );
}


fn draw_now_playing( frame: &mut Frame, app: &App, area: Rect ) {
    let session = app.controller.session();
    let mode = app.controller.mode().label();
    let play_mode = app.controller.play_mode().label();

    let state_str = match session.as_ref().map( |s| s.state() ).unwrap_or_default() {
        PlaybackState::Playing => ">",
        PlaybackState::Paused => "||",
        PlaybackState::Stopped => "[]",
    };

    let ( title, author ) = match &session {
        Some( s ) => ( s.track.display_title().to_string(), s.track.author.clone() ),
        None => ( "Nothing playing".to_string(), String::new() ),
    };

    let progress_width = 30;
    let ( progress, position, duration ) = match &session {
        Some( s ) => ( s.progress(), clock( s.position ), clock( s.duration ) ),
        None => ( 0.0, clock( 0.0 ), clock( 0.0 ) ),
    };
    let filled = ( progress * progress_width as f64 ).round() as usize;
    let bar = format!( "[{}{}]", "=".repeat( filled ), " ".repeat( progress_width - filled ) );

    let badges = [ play_mode.tag, mode.tag ]
        .iter()
        .filter( |t| !t.is_empty() )
        .map( |t| format!( "[{}]", t ) )
        .collect::<Vec<_>>()
        .join( " " );

    let mut lines = vec![
        Line::from( Span::styled( format!( " {} {} ", state_str, title ), Style::default().bold() ) ),
    ];
    if !author.is_empty() {
        lines.push( Line::from( Span::styled( format!( "   {} ", author ), Style::default().fg( Color::Gray ) ) ) );
    }
    lines.push( Line::from( format!( " {} {} / {}  {} ", bar, position, duration, badges ) ) );

    let now_playing = Paragraph::new( lines )
        .block( Block::default().title( " Now Playing " ).borders( Borders::ALL ) );

    frame.render_widget( now_playing, area );
}


fn draw_status_bar( frame: &mut Frame, app: &App, area: Rect ) {
    let ( text, style ) = match app.input_mode {
        InputMode::Command | InputMode::Search => (
            format!( "{}{}", app.input_mode.prompt(), app.input_buffer.content() ),
            Style::default().fg( Color::Yellow ),
        ),
        InputMode::Normal => {
            if let Some( ref msg ) = app.status_message {
                ( msg.clone(), Style::default().fg( Color::Green ) )
            } else {
                let hint = match app.view_mode {
                    ViewMode::Results => " [f]Search [Enter]Play [a]Queue [[ ]]Page [Tab]Panes [/]Cmd [?]Help [q]Quit ",
                    ViewMode::Queue => " [Enter]Play [d]Remove [J/K]Move [r]Repeat [z]Shuffle [Tab]Panes [?]Help ",
                    ViewMode::Details => " [j/k]Select [i]Fetch details [y]Copy URL [Tab]Panes [?]Help ",
                    ViewMode::Help => " [?]Close [Esc]Close ",
                };
                ( hint.to_string(), Style::default().fg( Color::DarkGray ) )
            }
        }
    };

    let status = Paragraph::new( text ).style( style );
    frame.render_widget( status, area );

    if app.input_mode != InputMode::Normal {
        let prompt = app.input_mode.prompt().chars().count();
        let cursor_x = area.x + ( prompt + app.input_buffer.cursor_char_pos() ) as u16;
        frame.set_cursor_position(( cursor_x, area.y ));
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_step_selection_wraps() {
        let mut state = ListState::default();
        step_selection( &mut state, 3, false );
        assert_eq!( state.selected(), Some( 0 ) );
        step_selection( &mut state, 3, false );
        assert_eq!( state.selected(), Some( 2 ) );
        step_selection( &mut state, 3, true );
        assert_eq!( state.selected(), Some( 0 ) );
        step_selection( &mut state, 0, true );
        assert_eq!( state.selected(), None );
    }


    #[test]
    fn test_clamp_selection_after_removal() {
        let mut state = ListState::default();
        state.select( Some( 4 ) );
        clamp_selection( &mut state, 2 );
        assert_eq!( state.selected(), Some( 1 ) );
        clamp_selection( &mut state, 0 );
        assert_eq!( state.selected(), None );
    }


    #[test]
    fn test_rejected_notice_mentions_update() {
        let message = notice_message( &Notice::Rejected { title: "Song".into() } );
        assert!( message.contains( "Song" ) );
        assert!( message.contains( "yt-dlp" ) );
        assert_eq!( notice_message( &Notice::Halted( Boundary::QueueFinished ) ), "End of queue" );
    }


    #[test]
    fn test_copy_message_reports_each_outcome() {
        let track = Track::new( "Song", "https://youtu.be/abc" );
        let mut copied = String::new();

        let ok = copy_message( Some( &track ), |url| {
            copied = url.to_string();
            Ok( () )
        });
        assert_eq!( ok, "Copied https://youtu.be/abc" );
        assert_eq!( copied, "https://youtu.be/abc" );

        let failed = copy_message( Some( &track ), |_| Err( arboard::Error::ClipboardNotSupported ) );
        assert!( failed.starts_with( "Clipboard error: " ) );

        let none = copy_message( None, |_| panic!( "nothing to copy" ) );
        assert_eq!( none, "No track selected" );
    }
}
