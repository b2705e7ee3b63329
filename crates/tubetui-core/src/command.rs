//! Slash command parsing.
//!
//! Commands typed after `/` in the UI are parsed here; the front end
//! executes them against the controller.

use std::str::FromStr;

use thiserror::Error;

use crate::queue::PlaybackMode;
use crate::session::PlayMode;


/// Errors that can occur during command parsing or execution.
#[derive( Debug, Error )]
pub enum CommandError {
    #[error( "Unknown command: {0}" )]
    Unknown( String ),

    #[error( "Invalid argument: {0}" )]
    InvalidArgument( String ),

    #[error( "Missing argument: {0}" )]
    MissingArgument( String ),

    #[error( "Execution failed: {0}" )]
    ExecutionFailed( String ),
}


/// Parsed slash command.
#[derive( Debug, Clone, PartialEq )]
pub enum Command {
    // Search
    Search { term: String },
    Page { number: usize },

    // Queue
    Add,
    Remove,
    Clear,
    Shuffle,
    Repeat { mode: Option<RepeatArg> },

    // Playback
    Play,
    Pause,
    Stop,
    Next,
    Prev,
    Seek { delta_seconds: f64 },
    Mode { mode: Option<PlayMode> },

    // Session
    Copy,
    Save,
    Help,
    Quit,
}


/// Repeat argument for parsing.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum RepeatArg {
    Normal,
    One,
    All,
}


impl RepeatArg {
    pub fn mode( self ) -> PlaybackMode {
        match self {
            RepeatArg::Normal => PlaybackMode::Normal,
            RepeatArg::One => PlaybackMode::RepeatOne,
            RepeatArg::All => PlaybackMode::RepeatAll,
        }
    }
}


impl FromStr for RepeatArg {
    type Err = CommandError;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" | "off" | "0" => Ok( RepeatArg::Normal ),
            "one" | "1" => Ok( RepeatArg::One ),
            "all" | "2" => Ok( RepeatArg::All ),
            _ => Err( CommandError::InvalidArgument(
                format!( "Invalid repeat mode: '{}'. Use 'normal', 'one', or 'all'", s )
            )),
        }
    }
}


fn parse_play_mode( s: &str ) -> Result<PlayMode, CommandError> {
    match s.to_lowercase().as_str() {
        "audio" | "a" => Ok( PlayMode::Audio ),
        "video" | "v" => Ok( PlayMode::Video ),
        _ => Err( CommandError::InvalidArgument(
            format!( "Invalid mode: '{}'. Use 'audio' or 'video'", s )
        )),
    }
}


impl Command {
    /// Parses a command string (without the leading `/`).
    ///
    /// @param input - The command string to parse
    ///
    /// @returns The parsed command or an error
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let input = input.trim();
        let mut parts = input.splitn( 2, ' ' );
        let cmd = parts.next().unwrap_or( "" ).to_lowercase();
        let args = parts.next().map( |s| s.trim() ).filter( |s| !s.is_empty() );

        match cmd.as_str() {
            "search" | "s" | "find" => {
                let term = args
                    .ok_or_else( || CommandError::MissingArgument( "search term".into() ) )?;
                Ok( Command::Search { term: term.to_string() } )
            }
            "page" | "pg" => {
                let raw = args
                    .ok_or_else( || CommandError::MissingArgument( "page number".into() ) )?;
                let number: usize = raw.parse()
                    .map_err( |_| CommandError::InvalidArgument( format!( "Invalid page: {}", raw ) ) )?;
                if number == 0 {
                    return Err( CommandError::InvalidArgument( "Pages start at 1".into() ) );
                }
                Ok( Command::Page { number } )
            }

            "add" | "a" => Ok( Command::Add ),
            "remove" | "rm" | "del" => Ok( Command::Remove ),
            "clear" | "cl" => Ok( Command::Clear ),
            "shuffle" | "sh" => Ok( Command::Shuffle ),
            "repeat" | "rep" => {
                let mode = args.map( |s| s.parse() ).transpose()?;
                Ok( Command::Repeat { mode } )
            }

            "play" | "p" => Ok( Command::Play ),
            "pause" | "pa" => Ok( Command::Pause ),
            "stop" | "st" => Ok( Command::Stop ),
            "next" | "n" => Ok( Command::Next ),
            "prev" | "previous" | "pr" => Ok( Command::Prev ),
            "seek" | "sk" => {
                let raw = args
                    .ok_or_else( || CommandError::MissingArgument( "seconds".into() ) )?;
                Ok( Command::Seek { delta_seconds: parse_offset( raw )? } )
            }
            "mode" | "m" => {
                let mode = args.map( parse_play_mode ).transpose()?;
                Ok( Command::Mode { mode } )
            }

            "copy" | "cp" | "yank" | "y" => Ok( Command::Copy ),
            "save" | "w" => Ok( Command::Save ),
            "help" | "h" | "?" => Ok( Command::Help ),
            "quit" | "q" | "exit" => Ok( Command::Quit ),

            "" => Err( CommandError::Unknown( "empty command".into() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }


    /// Returns a brief description of the command for help text.
    pub fn description( &self ) -> &'static str {
        match self {
            Command::Search { .. } => "Search videos",
            Command::Page { .. } => "Jump to result page",
            Command::Add => "Add selected result to queue",
            Command::Remove => "Remove selected queue entry",
            Command::Clear => "Clear queue",
            Command::Shuffle => "Toggle shuffle",
            Command::Repeat { .. } => "Set repeat mode",
            Command::Play => "Play selection",
            Command::Pause => "Pause or resume",
            Command::Stop => "Stop playback",
            Command::Next => "Next track",
            Command::Prev => "Previous track",
            Command::Seek { .. } => "Seek relative",
            Command::Mode { .. } => "Switch audio/video",
            Command::Copy => "Copy URL of selection",
            Command::Save => "Save session",
            Command::Help => "Show help",
            Command::Quit => "Quit application",
        }
    }
}


/// Parses a signed offset like "+10", "-5", "90" or "-1:30" into seconds.
///
/// @param s - Offset in seconds or "M:SS", with an optional sign
///
/// @returns seconds, negative for backwards
fn parse_offset( s: &str ) -> Result<f64, CommandError> {
    let s = s.trim();
    let ( sign, body ) = match s.strip_prefix( '-' ) {
        Some( rest ) => ( -1.0, rest ),
        None => ( 1.0, s.strip_prefix( '+' ).unwrap_or( s ) ),
    };

    let seconds = if let Some(( min, sec )) = body.split_once( ':' ) {
        let minutes: u64 = min.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid minutes: {}", min ) ) )?;
        let seconds: u64 = sec.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid seconds: {}", sec ) ) )?;
        ( minutes * 60 + seconds ) as f64
    } else {
        let seconds: f64 = body.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid offset: {}", s ) ) )?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err( CommandError::InvalidArgument( format!( "Invalid offset: {}", s ) ) );
        }
        seconds
    };

    Ok( sign * seconds )
}


/// Returns help text listing all available commands.
pub fn help_text() -> &'static str {
    r#"Search:
  /search <term>  Search videos or open a URL    [f]
  /page <n>       Jump to result page           [ [ ] ]

Queue:
  /add            Add selected result           [a]
  /remove         Remove selected entry         [d]
  /clear          Clear queue
  /shuffle        Toggle shuffle                [z]
  /repeat [mode]  Set repeat (normal/one/all)   [r]

Playback:
  /play           Play selection                [Enter]
  /pause          Pause or resume               [Space]
  /stop           Stop playback                 [s]
  /next           Next track                    [n]
  /prev           Previous track                [p]
  /seek <±secs>   Seek relative (e.g. -10, +1:00) [← →]
  /mode [a|v]     Switch audio/video            [m]

Other:
  /copy           Copy selection's URL          [y]
  /save           Save session now
  /help           Show this help                [?]
  /quit           Exit tubetui                  [q]"#
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_search() {
        let cmd = Command::parse( "search lofi hip hop" ).unwrap();
        assert_eq!( cmd, Command::Search { term: "lofi hip hop".to_string() } );
    }


    #[test]
    fn test_parse_aliases() {
        assert_eq!( Command::parse( "s jazz" ).unwrap(), Command::Search { term: "jazz".to_string() } );
        assert_eq!( Command::parse( "n" ).unwrap(), Command::Next );
        assert_eq!( Command::parse( "PR" ).unwrap(), Command::Prev );
        assert_eq!( Command::parse( "rm" ).unwrap(), Command::Remove );
    }


    #[test]
    fn test_parse_signed_seek() {
        assert_eq!( Command::parse( "seek -10" ).unwrap(), Command::Seek { delta_seconds: -10.0 } );
        assert_eq!( Command::parse( "seek +1:30" ).unwrap(), Command::Seek { delta_seconds: 90.0 } );
        assert_eq!( Command::parse( "sk 5" ).unwrap(), Command::Seek { delta_seconds: 5.0 } );
        assert!( matches!( Command::parse( "seek --3" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_repeat() {
        assert_eq!( Command::parse( "repeat all" ).unwrap(), Command::Repeat { mode: Some( RepeatArg::All ) } );
        assert_eq!( Command::parse( "repeat" ).unwrap(), Command::Repeat { mode: None } );
        assert_eq!( RepeatArg::One.mode(), PlaybackMode::RepeatOne );
    }


    #[test]
    fn test_parse_mode() {
        assert_eq!( Command::parse( "mode video" ).unwrap(), Command::Mode { mode: Some( PlayMode::Video ) } );
        assert_eq!( Command::parse( "m" ).unwrap(), Command::Mode { mode: None } );
        assert!( Command::parse( "mode tape" ).is_err() );
    }


    #[test]
    fn test_parse_page() {
        assert_eq!( Command::parse( "page 3" ).unwrap(), Command::Page { number: 3 } );
        assert!( matches!( Command::parse( "page 0" ), Err( CommandError::InvalidArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "page" ), Err( CommandError::MissingArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_copy() {
        assert_eq!( Command::parse( "copy" ).unwrap(), Command::Copy );
        assert_eq!( Command::parse( "YANK" ).unwrap(), Command::Copy );
        assert_eq!( Command::parse( "cp extra words" ).unwrap(), Command::Copy );
        assert_eq!( Command::Copy.description(), "Copy URL of selection" );
    }


    #[test]
    fn test_parse_unknown() {
        let result = Command::parse( "foobar" );
        assert!( matches!( result, Err( CommandError::Unknown( _ ) ) ) );
    }
}
