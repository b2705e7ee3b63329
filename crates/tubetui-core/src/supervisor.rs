//! Player process supervision
//!
//! Builds player invocations, spawns them and classifies how they ended.
//! The controller owns the spawned child through an exit watcher task.

use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use std::process::{ ExitStatus, Stdio };

use tokio::io::AsyncReadExt;
use tokio::process::{ Child, Command };
use tokio_util::sync::CancellationToken;

use crate::controller::PlaybackError;
use crate::session::PlayMode;


/// Everything needed to start one session.
#[derive( Debug, Clone, PartialEq )]
pub struct Invocation {
    pub url: String,
    pub title: String,
    pub socket_path: PathBuf,
    pub play_mode: PlayMode,
}


/// Produces the program and arguments for a session.
pub trait Launcher: Send + Sync {
    fn program( &self ) -> &str;

    fn args( &self, invocation: &Invocation ) -> Vec<String>;
}


/// Launches mpv with its ytdl hook pointed at yt-dlp.
#[derive( Debug, Clone )]
pub struct MpvLauncher {
    binary: String,
    ytdlp_binary: String,
}


impl MpvLauncher {
    pub fn new( binary: impl Into<String>, ytdlp_binary: impl Into<String> ) -> Self {
        Self {
            binary: binary.into(),
            ytdlp_binary: ytdlp_binary.into(),
        }
    }
}


impl Launcher for MpvLauncher {
    fn program( &self ) -> &str {
        &self.binary
    }


    fn args( &self, invocation: &Invocation ) -> Vec<String> {
        let mut args = vec![
            "--no-terminal".to_string(),
            format!( "--script-opts=ytdl_hook-ytdl_path={}", self.ytdlp_binary ),
            format!( "--title={}", invocation.title ),
            format!( "--input-ipc-server={}", invocation.socket_path.display() ),
        ];

        if invocation.play_mode == PlayMode::Audio {
            args.push( "--no-video".to_string() );
            args.push( "--ytdl-format=bestaudio".to_string() );
        }

        args.push( invocation.url.clone() );
        args
    }
}


/// Spawns the player for an invocation.
///
/// Must be called inside a tokio runtime context.
pub fn spawn( launcher: &dyn Launcher, invocation: &Invocation ) -> Result<Child, PlaybackError> {
    let program = launcher.program();

    Command::new( program )
        .args( launcher.args( invocation ) )
        .stdin( Stdio::null() )
        .stdout( Stdio::null() )
        .stderr( Stdio::piped() )
        .kill_on_drop( true )
        .spawn()
        .map_err( |e| match e.kind() {
            ErrorKind::NotFound => PlaybackError::ToolMissing { tool: program.to_string() },
            _ => PlaybackError::Spawn( e.to_string() ),
        })
}


/// How a session's process ended.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum ExitOutcome {
    Clean,
    /// The source refused the content (HTTP 403).
    Rejected,
    Failed( String ),
}


/// Classifies an exit from its status and captured stderr.
pub fn classify_exit( success: bool, stderr: &str ) -> ExitOutcome {
    if success {
        return ExitOutcome::Clean;
    }
    if stderr.contains( "HTTP error 403" ) || stderr.contains( "403" ) {
        return ExitOutcome::Rejected;
    }

    let detail = stderr.lines()
        .map( str::trim )
        .filter( |l| !l.is_empty() )
        .last()
        .unwrap_or( "player exited with an error" );
    ExitOutcome::Failed( detail.to_string() )
}


/// Waits for a child to exit, killing it first if `kill` fires.
///
/// Returns the outcome once the process is gone and stderr is drained.
pub async fn wait_for_exit( mut child: Child, kill: CancellationToken ) -> ExitOutcome {
    let stderr = child.stderr.take();
    let capture = async move {
        let mut buf = Vec::new();
        if let Some( mut stderr ) = stderr {
            if let Err( e ) = stderr.read_to_end( &mut buf ).await {
                tracing::debug!( "stderr capture ended early: {}", e );
            }
        }
        String::from_utf8_lossy( &buf ).into_owned()
    };

    let wait = async {
        tokio::select! {
            status = child.wait() => status,
            _ = kill.cancelled() => {
                if let Err( e ) = child.start_kill() {
                    tracing::debug!( "kill failed: {}", e );
                }
                child.wait().await
            }
        }
    };

    let ( status, stderr ) = tokio::join!( wait, capture );
    let success = status.as_ref().map( ExitStatus::success ).unwrap_or( false );
    classify_exit( success, &stderr )
}


/// Removes a session's IPC socket once its player is gone.
///
/// A killed mpv never unlinks its socket, so the watcher does it.
pub async fn remove_socket( path: &Path ) {
    match tokio::fs::remove_file( path ).await {
        Ok( () ) => tracing::debug!( "Removed socket {}", path.display() ),
        Err( e ) if e.kind() == ErrorKind::NotFound => {}
        Err( e ) => tracing::debug!( "Could not remove socket {}: {}", path.display(), e ),
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn invocation( mode: PlayMode ) -> Invocation {
        Invocation {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            title: "Song".to_string(),
            socket_path: PathBuf::from( "/tmp/tubetui-mpv-1.sock" ),
            play_mode: mode,
        }
    }


    #[test]
    fn test_audio_args() {
        let args = MpvLauncher::new( "mpv", "yt-dlp" ).args( &invocation( PlayMode::Audio ) );
        assert_eq!( args, vec![
            "--no-terminal",
            "--script-opts=ytdl_hook-ytdl_path=yt-dlp",
            "--title=Song",
            "--input-ipc-server=/tmp/tubetui-mpv-1.sock",
            "--no-video",
            "--ytdl-format=bestaudio",
            "https://www.youtube.com/watch?v=abc",
        ] );
    }


    #[test]
    fn test_video_args_have_no_audio_flags() {
        let args = MpvLauncher::new( "mpv", "yt-dlp" ).args( &invocation( PlayMode::Video ) );
        assert!( !args.iter().any( |a| a == "--no-video" ) );
        assert_eq!( args.last().map( String::as_str ), Some( "https://www.youtube.com/watch?v=abc" ) );
    }


    #[test]
    fn test_classify_exit() {
        assert_eq!( classify_exit( true, "403" ), ExitOutcome::Clean );
        assert_eq!(
            classify_exit( false, "[ytdl_hook] ERROR: HTTP error 403: Forbidden" ),
            ExitOutcome::Rejected
        );
        assert_eq!(
            classify_exit( false, "first\nFailed to open stream\n\n" ),
            ExitOutcome::Failed( "Failed to open stream".to_string() )
        );
        assert!( matches!( classify_exit( false, "" ), ExitOutcome::Failed( _ ) ) );
    }


    #[tokio::test]
    async fn test_kill_reports_failure() {
        let child = Command::new( "sh" )
            .args( [ "-c", "sleep 10" ] )
            .stderr( Stdio::piped() )
            .kill_on_drop( true )
            .spawn()
            .unwrap();
        let kill = CancellationToken::new();
        kill.cancel();

        let outcome = wait_for_exit( child, kill ).await;

        assert!( matches!( outcome, ExitOutcome::Failed( _ ) ) );
    }
}
