//! Command-line argument parsing for tubetui.

use clap::Parser;

use tubetui_core::PlayMode;


/// tubetui - search and play videos from the terminal through mpv.
#[derive( Parser, Debug )]
#[command( name = "tubetui" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Play audio only (default from settings).
    #[arg( long, conflicts_with = "video" )]
    pub audio: bool,

    /// Play with video.
    #[arg( long )]
    pub video: bool,

    /// Ignore the saved session.
    #[arg( long )]
    pub fresh: bool,

    /// Search for this on startup.
    #[arg( trailing_var_arg = true )]
    pub query: Vec<String>,
}


impl Args {
    /// Play mode forced by flags, if any.
    pub fn play_mode( &self ) -> Option<PlayMode> {
        if self.video {
            Some( PlayMode::Video )
        } else if self.audio {
            Some( PlayMode::Audio )
        } else {
            None
        }
    }


    /// Initial query joined from the trailing words.
    pub fn initial_query( &self ) -> Option<String> {
        let query = self.query.join( " " );
        let query = query.trim();
        if query.is_empty() { None } else { Some( query.to_string() ) }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_flags_and_query() {
        let args = Args::parse_from( [ "tubetui", "--video", "--fresh", "lofi", "beats" ] );
        assert_eq!( args.play_mode(), Some( PlayMode::Video ) );
        assert!( args.fresh );
        assert_eq!( args.initial_query().as_deref(), Some( "lofi beats" ) );
    }


    #[test]
    fn test_audio_and_video_conflict() {
        assert!( Args::try_parse_from( [ "tubetui", "--audio", "--video" ] ).is_err() );
        assert_eq!( Args::parse_from( [ "tubetui" ] ).play_mode(), None );
    }
}
