//! Shared fixtures for controller, IPC and thumbnail integration tests
//!
//! Sessions are driven by `sh -c <url>`, so a track's URL is the script the
//! fake player runs. The fake control socket answers like mpv does.

#![allow( dead_code )]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader };
use tokio::net::UnixListener;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use tubetui_core::{ Controller, Invocation, Launcher, PlayerConfig, PlayerEvent, Track, Transport };


/// Runs the track URL as a shell script.
pub struct ScriptLauncher;


impl Launcher for ScriptLauncher {
    fn program( &self ) -> &str {
        "sh"
    }


    fn args( &self, invocation: &Invocation ) -> Vec<String> {
        vec![ "-c".to_string(), invocation.url.clone() ]
    }
}


/// Creates the session's socket file the way mpv would, then idles.
pub struct SocketLauncher;


impl Launcher for SocketLauncher {
    fn program( &self ) -> &str {
        "sh"
    }


    fn args( &self, invocation: &Invocation ) -> Vec<String> {
        vec![
            "-c".to_string(),
            "touch \"$0\"; exec sleep 30".to_string(),
            invocation.socket_path.to_string_lossy().into_owned(),
        ]
    }
}


pub fn fast_config( socket_dir: &Path ) -> PlayerConfig {
    PlayerConfig {
        transport: Transport::Socket,
        poll_interval_ms: 20,
        exit_grace_ms: 30,
        seek_refresh_ms: 10,
        socket_dir: Some( socket_dir.to_path_buf() ),
        ..PlayerConfig::default()
    }
}


pub fn scripted_controller( socket_dir: &Path ) -> ( Controller, UnboundedReceiver<PlayerEvent> ) {
    Controller::with_launcher( fast_config( socket_dir ), Arc::new( ScriptLauncher ), Handle::current() )
}


/// A track whose "playback" is the given shell script.
pub fn track( title: &str, script: &str ) -> Track {
    Track::new( title, script )
}


/// Waits up to five seconds for an event matching `pred`.
pub async fn wait_for<F>( rx: &mut UnboundedReceiver<PlayerEvent>, pred: F ) -> PlayerEvent
where
    F: Fn( &PlayerEvent ) -> bool,
{
    let found = tokio::time::timeout( Duration::from_secs( 5 ), async {
        while let Some( event ) = rx.recv().await {
            if pred( &event ) {
                return Some( event );
            }
        }
        None
    }).await;

    match found {
        Ok( Some( event ) ) => event,
        Ok( None ) => panic!( "event channel closed" ),
        Err( _ ) => panic!( "timed out waiting for event" ),
    }
}


/// Collects whatever is queued right now.
pub fn drain( rx: &mut UnboundedReceiver<PlayerEvent> ) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok( event ) = rx.try_recv() {
        events.push( event );
    }
    events
}


/// Serves one reply per connection on a Unix socket, like mpv's IPC server.
pub fn fake_mpv<F>( path: &Path, reply: F ) -> JoinHandle<()>
where
    F: Fn( &str ) -> String + Send + Sync + 'static,
{
    let listener = UnixListener::bind( path ).unwrap();
    let reply = Arc::new( reply );

    tokio::spawn( async move {
        while let Ok(( stream, _ )) = listener.accept().await {
            let reply = Arc::clone( &reply );
            tokio::spawn( async move {
                let ( read, mut write ) = stream.into_split();
                let mut lines = BufReader::new( read ).lines();
                if let Ok( Some( line ) ) = lines.next_line().await {
                    let mut answer = reply( &line );
                    answer.push( '\n' );
                    let _ = write.write_all( answer.as_bytes() ).await;
                }
            });
        }
    })
}


/// Answers property queries with `value` and everything else with success.
pub fn mpv_reply( value: f64 ) -> impl Fn( &str ) -> String + Send + Sync + 'static {
    move |line: &str| {
        if line.contains( "get_property" ) {
            format!( r#"{{"data":{},"request_id":0,"error":"success"}}"#, value )
        } else {
            r#"{"data":null,"request_id":0,"error":"success"}"#.to_string()
        }
    }
}
