//! Integration tests for the playback controller
//!
//! Covers:
//! - explicit next/previous and queue boundaries
//! - auto-advance after natural completion
//! - stale exits and skip suppression
//! - queue edits while playing
//! - failure classification and pause/seek over the control socket

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use tokio::runtime::Handle;
use tubetui_core::{
    Advance, Boundary, Controller, MpvLauncher, Notice, PlaybackError, PlaybackMode, PlaybackState,
    PlayerEvent,
};


const LONG: &str = "sleep 30";


fn queue_of( controller: &Controller, scripts: &[( &str, &str )] ) {
    controller.add_many( scripts.iter().map( |( title, script )| track( title, script ) ).collect() );
}


fn started_index( advance: Advance ) -> Option<usize> {
    match advance {
        Advance::Started { index, .. } => index,
        other => panic!( "expected a started track, got {:?}", other ),
    }
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_next_walks_queue_then_reports_finished() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, _rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", LONG ), ( "B", LONG ), ( "C", LONG ) ] );

    assert_eq!( started_index( controller.play_index( 1 ).unwrap() ), Some( 1 ) );
    assert_eq!( started_index( controller.next().unwrap() ), Some( 2 ) );

    assert_eq!( controller.next().unwrap(), Advance::Unavailable( Boundary::QueueFinished ) );
    assert_eq!( controller.queue().current_index(), Some( 2 ) );
    assert_eq!( controller.session().unwrap().track.title, "C" );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_previous_rules() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, _rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", LONG ), ( "B", LONG ) ] );

    controller.play_index( 0 ).unwrap();
    assert_eq!( controller.previous().unwrap(), Advance::Unavailable( Boundary::AlreadyAtFirst ) );

    controller.set_mode( PlaybackMode::RepeatAll );
    assert_eq!( started_index( controller.previous().unwrap() ), Some( 1 ) );

    controller.stop();
    assert_eq!( controller.previous().unwrap(), Advance::Unavailable( Boundary::NothingPlaying ) );
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_empty_queue_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, _rx ) = scripted_controller( dir.path() );

    assert_eq!( controller.play_index( 0 ).unwrap(), Advance::Unavailable( Boundary::QueueEmpty ) );
    assert_eq!( controller.next().unwrap(), Advance::Unavailable( Boundary::QueueEmpty ) );
    assert!( controller.session().is_none() );
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_repeat_one_replays_on_completion() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", "sleep 0.1" ) ] );
    controller.set_mode( PlaybackMode::RepeatOne );

    controller.play_index( 0 ).unwrap();
    let first = controller.session().unwrap().id;
    wait_for( &mut rx, |e| matches!( e, PlayerEvent::TrackChanged { .. } ) ).await;

    let replay = wait_for( &mut rx, |e| matches!( e, PlayerEvent::TrackChanged { .. } ) ).await;
    assert!( matches!( replay, PlayerEvent::TrackChanged { index: Some( 0 ), ref track } if track.title == "A" ) );
    assert_ne!( controller.session().unwrap().id, first );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_direct_play_then_next_enters_queue() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, _rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "P", LONG ), ( "Q", LONG ) ] );

    assert_eq!( started_index( controller.play_direct( track( "X", LONG ) ).unwrap() ), None );
    assert_eq!( controller.session().unwrap().queue_index, None );

    match controller.next().unwrap() {
        Advance::Started { index, track } => {
            assert_eq!( index, Some( 0 ) );
            assert_eq!( track.title, "P" );
        }
        other => panic!( "unexpected {:?}", other ),
    }

    controller.play_direct( track( "Y", LONG ) ).unwrap();
    assert_eq!( started_index( controller.previous().unwrap() ), Some( 1 ) );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_removing_playing_entry_stops_playback() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, _rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", LONG ), ( "B", LONG ), ( "C", LONG ) ] );

    controller.play_index( 1 ).unwrap();
    let removed = controller.remove( 1 ).unwrap();

    assert!( removed.was_current );
    assert!( controller.session().is_none() );
    assert_eq!( controller.playback_state(), PlaybackState::Stopped );
    assert_eq!( controller.queue().current_index(), None );
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_removing_earlier_entry_shifts_binding() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, _rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", LONG ), ( "B", LONG ), ( "C", LONG ) ] );

    controller.play_index( 2 ).unwrap();
    let id = controller.session().unwrap().id;
    controller.remove( 0 ).unwrap();

    let session = controller.session().unwrap();
    assert_eq!( session.id, id );
    assert_eq!( session.queue_index, Some( 1 ) );
    assert_eq!( session.track.title, "C" );
    assert_eq!( controller.playback_state(), PlaybackState::Playing );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_superseded_session_exit_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", "sleep 0.1" ), ( "B", LONG ), ( "C", LONG ) ] );

    controller.play_index( 0 ).unwrap();
    controller.play_index( 1 ).unwrap();
    let b = controller.session().unwrap().id;

    tokio::time::sleep( Duration::from_millis( 500 ) ).await;

    let session = controller.session().unwrap();
    assert_eq!( session.id, b );
    assert_eq!( session.queue_index, Some( 1 ) );
    let events = drain( &mut rx );
    assert!( !events.iter().any( |e| matches!( e, PlayerEvent::TrackChanged { index: Some( 2 ), .. } ) ) );
    assert!( !events.iter().any( |e| matches!( e, PlayerEvent::Notice( _ ) ) ) );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_skip_suppression_does_not_leak_into_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", LONG ), ( "B", "sleep 0.2" ), ( "C", LONG ) ] );

    controller.play_index( 0 ).unwrap();
    assert_eq!( started_index( controller.next().unwrap() ), Some( 1 ) );

    // B ends on its own and must still auto-advance.
    let event = wait_for( &mut rx, |e| matches!( e, PlayerEvent::TrackChanged { index: Some( 2 ), .. } ) ).await;
    assert!( matches!( event, PlayerEvent::TrackChanged { ref track, .. } if track.title == "C" ) );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_queue_finishes_and_keeps_index() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", "true" ) ] );

    controller.play_index( 0 ).unwrap();

    wait_for( &mut rx, |e| *e == PlayerEvent::Notice( Notice::Halted( Boundary::QueueFinished ) ) ).await;
    assert!( controller.session().is_none() );
    assert_eq!( controller.queue().current_index(), Some( 0 ) );
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_repeat_all_wraps_on_completion() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", LONG ), ( "B", "true" ) ] );
    controller.set_mode( PlaybackMode::RepeatAll );

    controller.play_index( 1 ).unwrap();

    let event = wait_for( &mut rx, |e| matches!( e, PlayerEvent::TrackChanged { index: Some( 0 ), .. } ) ).await;
    assert!( matches!( event, PlayerEvent::TrackChanged { ref track, .. } if track.title == "A" ) );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_direct_play_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );

    controller.play_direct( track( "X", "true" ) ).unwrap();

    let event = wait_for( &mut rx, |e| matches!( e, PlayerEvent::Notice( _ ) ) ).await;
    assert_eq!( event, PlayerEvent::Notice( Notice::Finished { title: "X".to_string() } ) );
    assert_eq!( controller.playback_state(), PlaybackState::Stopped );
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_forbidden_exit_is_classified() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );

    controller.play_direct( track( "X", "echo 'ERROR: HTTP error 403: Forbidden' >&2; exit 1" ) ).unwrap();

    let event = wait_for( &mut rx, |e| matches!( e, PlayerEvent::Notice( _ ) ) ).await;
    assert_eq!( event, PlayerEvent::Notice( Notice::Rejected { title: "X".to_string() } ) );
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_generic_failure_goes_idle_without_advancing() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", "echo 'cannot open stream' >&2; exit 2" ), ( "B", LONG ) ] );

    controller.play_index( 0 ).unwrap();

    let event = wait_for( &mut rx, |e| matches!( e, PlayerEvent::Notice( _ ) ) ).await;
    assert_eq!( event, PlayerEvent::Notice( Notice::Failed {
        title: "A".to_string(),
        detail: "cannot open stream".to_string(),
    }));
    assert!( controller.session().is_none() );
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_missing_player_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new( MpvLauncher::new( "tubetui-no-such-player", "yt-dlp" ) );
    let ( controller, _rx ) = Controller::with_launcher( fast_config( dir.path() ), launcher, Handle::current() );

    let err = controller.play_direct( track( "X", "https://example.com/v" ) ).unwrap_err();

    assert!( matches!( err, PlaybackError::ToolMissing { ref tool } if tool == "tubetui-no-such-player" ) );
    assert!( controller.session().is_none() );
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_pause_needs_a_live_socket() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, mut rx ) = scripted_controller( dir.path() );

    assert!( matches!( controller.toggle_pause().await, Err( PlaybackError::NothingPlaying ) ) );
    controller.seek_relative( 10.0 ).await.unwrap();

    controller.play_direct( track( "X", LONG ) ).unwrap();
    assert!( matches!( controller.toggle_pause().await, Err( PlaybackError::NothingPlaying ) ) );

    let socket = controller.session().unwrap().socket_path;
    let _server = fake_mpv( &socket, mpv_reply( 42.0 ) );

    assert!( controller.toggle_pause().await.unwrap() );
    assert!( controller.session().unwrap().is_paused );
    assert_eq!( controller.playback_state(), PlaybackState::Paused );
    assert!( !controller.toggle_pause().await.unwrap() );

    controller.seek_relative( -5.0 ).await.unwrap();
    wait_for( &mut rx, |e| *e == PlayerEvent::PositionChanged { position: 42.0, duration: 42.0 } ).await;
    assert_eq!( controller.session().unwrap().position, 42.0 );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_socket_paths_are_unique_per_session() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, _rx ) = scripted_controller( dir.path() );
    queue_of( &controller, &[ ( "A", LONG ), ( "B", LONG ) ] );

    controller.play_index( 0 ).unwrap();
    let first = controller.session().unwrap().socket_path;
    controller.next().unwrap();
    let second = controller.session().unwrap().socket_path;

    assert_ne!( first, second );
    assert!( second.starts_with( dir.path() ) );

    controller.stop();
}


#[tokio::test( flavor = "multi_thread", worker_threads = 2 )]
async fn test_killed_sessions_leave_no_sockets() {
    let dir = tempfile::tempdir().unwrap();
    let ( controller, _rx ) = Controller::with_launcher(
        fast_config( dir.path() ),
        Arc::new( SocketLauncher ),
        Handle::current(),
    );
    queue_of( &controller, &[ ( "A", "a" ), ( "B", "b" ), ( "C", "c" ), ( "D", "d" ), ( "E", "e" ) ] );

    controller.play_index( 0 ).unwrap();
    for _ in 0..4 {
        tokio::time::sleep( Duration::from_millis( 50 ) ).await;
        controller.next().unwrap();
    }
    tokio::time::sleep( Duration::from_millis( 50 ) ).await;
    controller.stop();

    let empty = || std::fs::read_dir( dir.path() ).unwrap().next().is_none();
    for _ in 0..100 {
        if empty() {
            break;
        }
        tokio::time::sleep( Duration::from_millis( 20 ) ).await;
    }
    let left: Vec<_> = std::fs::read_dir( dir.path() ).unwrap().map( |e| e.unwrap().file_name() ).collect();
    assert!( left.is_empty(), "sockets left behind: {:?}", left );
}
