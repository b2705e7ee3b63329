//! Controller configuration
//!
//! Loaded by the front end as part of its settings file; every field has a
//! default so partial files are accepted.

use std::path::PathBuf;
use std::time::Duration;

use serde::{ Deserialize, Serialize };

use crate::ipc::Transport;
use crate::session::PlayMode;


/// Tunables for the playback controller.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct PlayerConfig {
    /// Media player executable
    pub player_binary: String,

    /// Search/extraction tool handed to the player's ytdl hook
    pub ytdlp_binary: String,

    /// Utility used by the socat transport
    pub socat_binary: String,

    pub transport: Transport,

    /// Progress refresh period in milliseconds
    pub poll_interval_ms: u64,

    /// Delay between process exit and auto-advance, in milliseconds
    pub exit_grace_ms: u64,

    /// Delay before the one-off progress refresh after a seek
    pub seek_refresh_ms: u64,

    pub play_mode: PlayMode,

    /// Directory for control sockets; the system temp dir when unset
    pub socket_dir: Option<PathBuf>,
}


impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            player_binary: "mpv".to_string(),
            ytdlp_binary: "yt-dlp".to_string(),
            socat_binary: "socat".to_string(),
            transport: Transport::Socat,
            poll_interval_ms: 500,
            exit_grace_ms: 500,
            seek_refresh_ms: 150,
            play_mode: PlayMode::Audio,
            socket_dir: None,
        }
    }
}


impl PlayerConfig {
    pub fn poll_interval( &self ) -> Duration {
        Duration::from_millis( self.poll_interval_ms.max( 10 ) )
    }


    pub fn exit_grace( &self ) -> Duration {
        Duration::from_millis( self.exit_grace_ms )
    }


    pub fn seek_refresh( &self ) -> Duration {
        Duration::from_millis( self.seek_refresh_ms )
    }


    pub fn socket_dir( &self ) -> PathBuf {
        self.socket_dir.clone().unwrap_or_else( std::env::temp_dir )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PlayerConfig = serde_json::from_str( r#"{ "transport": "socket", "exit_grace_ms": 50 }"# ).unwrap();
        assert_eq!( config.transport, Transport::Socket );
        assert_eq!( config.exit_grace(), Duration::from_millis( 50 ) );
        assert_eq!( config.poll_interval(), Duration::from_millis( 500 ) );
        assert_eq!( config.player_binary, "mpv" );
    }
}
