//! Integration tests for the control channel against a fake player socket

mod common;

use common::*;
use serde_json::json;
use tubetui_core::ipc::ControlChannel;
use tubetui_core::{ IpcError, Transport };


#[tokio::test]
async fn test_query_number_reads_data() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join( "mpv.sock" );
    let _server = fake_mpv( &socket, mpv_reply( 12.5 ) );

    let channel = ControlChannel::new( Transport::Socket, "socat" );

    assert_eq!( channel.query_number( &socket, "time-pos" ).await.unwrap(), 12.5 );
}


#[tokio::test]
async fn test_command_is_one_json_line() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join( "mpv.sock" );
    let ( tx, mut rx ) = tokio::sync::mpsc::unbounded_channel();
    let _server = fake_mpv( &socket, move |line| {
        let _ = tx.send( line.to_string() );
        r#"{"error":"success"}"#.to_string()
    });

    let channel = ControlChannel::new( Transport::Socket, "socat" );
    channel.seek_relative( &socket, -10.0 ).await.unwrap();
    channel.cycle_pause( &socket ).await.unwrap();

    let seek: serde_json::Value = serde_json::from_str( &rx.recv().await.unwrap() ).unwrap();
    assert_eq!( seek, json!( { "command": [ "seek", -10.0, "relative" ] } ) );
    let pause: serde_json::Value = serde_json::from_str( &rx.recv().await.unwrap() ).unwrap();
    assert_eq!( pause, json!( { "command": [ "cycle", "pause" ] } ) );
}


#[tokio::test]
async fn test_events_before_reply_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join( "mpv.sock" );
    let _server = fake_mpv( &socket, |_| {
        "{\"event\":\"playback-restart\"}\n{\"data\":3.0,\"error\":\"success\"}".to_string()
    });

    let channel = ControlChannel::new( Transport::Socket, "socat" );

    assert_eq!( channel.query_number( &socket, "duration" ).await.unwrap(), 3.0 );
}


#[tokio::test]
async fn test_rejected_and_malformed_replies() {
    let dir = tempfile::tempdir().unwrap();
    let rejecting = dir.path().join( "reject.sock" );
    let _a = fake_mpv( &rejecting, |_| r#"{"request_id":0,"error":"property unavailable"}"#.to_string() );
    let wordy = dir.path().join( "wordy.sock" );
    let _b = fake_mpv( &wordy, |_| r#"{"data":"idle","error":"success"}"#.to_string() );

    let channel = ControlChannel::new( Transport::Socket, "socat" );

    let err = channel.query_number( &rejecting, "time-pos" ).await.unwrap_err();
    assert!( matches!( err, IpcError::Rejected( _ ) ) );
    let err = channel.query_number( &wordy, "time-pos" ).await.unwrap_err();
    assert!( matches!( err, IpcError::Malformed( _ ) ) );
}


#[tokio::test]
async fn test_missing_socket_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let channel = ControlChannel::new( Transport::Socket, "socat" );

    let err = channel.cycle_pause( &dir.path().join( "absent.sock" ) ).await.unwrap_err();

    assert!( matches!( err, IpcError::Unreachable( _ ) ) );
}
