//! Application settings management
//!
//! Persistent settings: the player configuration plus UI options.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };

use tubetui_core::PlayerConfig;


/// Application settings.
#[derive( Debug, Clone, Serialize, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// Player, transport and timing options
    pub player: PlayerConfig,

    /// Search results shown per page
    pub items_per_page: usize,

    /// Results requested from yt-dlp per search
    pub search_limit: usize,

    /// Restore the saved session on start
    pub restore_on_start: bool,

    /// Fetch and render thumbnails in the details pane
    pub thumbnails: bool,
}


impl Default for Settings {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            items_per_page: 10,
            search_limit: 30,
            restore_on_start: true,
            thumbnails: true,
        }
    }
}


impl Settings {
    /// Returns the path to the settings file.
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "tubetui" ).join( "settings.json" ) )
    }


    /// Loads settings from disk, or returns defaults if not found.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some( path ) => Self::load_from( &path ),
            None => Self::default(),
        }
    }


    pub fn load_from( path: &Path ) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( path ) {
            Ok( contents ) => match serde_json::from_str( &contents ) {
                Ok( settings ) => settings,
                Err( e ) => {
                    tracing::warn!( "Ignoring invalid settings {:?}: {}", path, e );
                    Self::default()
                }
            },
            Err( e ) => {
                tracing::warn!( "Failed to read settings: {}", e );
                Self::default()
            }
        }
    }


    /// Writes the defaults out on first run so they can be edited.
    pub fn save_if_missing( &self ) {
        let Some( path ) = Self::settings_path() else { return };
        if path.exists() {
            return;
        }

        if let Some( parent ) = path.parent() {
            if let Err( e ) = fs::create_dir_all( parent ) {
                tracing::warn!( "Failed to create settings directory: {}", e );
                return;
            }
        }

        match serde_json::to_string_pretty( self ) {
            Ok( json ) => {
                if let Err( e ) = fs::write( &path, json ) {
                    tracing::warn!( "Failed to save settings: {}", e );
                }
            }
            Err( e ) => {
                tracing::warn!( "Failed to serialize settings: {}", e );
            }
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use tubetui_core::Transport;


    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "settings.json" );
        fs::write( &path, r#"{ "items_per_page": 5, "player": { "transport": "socket" } }"# ).unwrap();

        let settings = Settings::load_from( &path );

        assert_eq!( settings.items_per_page, 5 );
        assert_eq!( settings.search_limit, 30 );
        assert_eq!( settings.player.transport, Transport::Socket );
        assert_eq!( settings.player.player_binary, "mpv" );
    }


    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "settings.json" );
        fs::write( &path, "{ not json" ).unwrap();

        assert_eq!( Settings::load_from( &path ).items_per_page, 10 );
    }
}
