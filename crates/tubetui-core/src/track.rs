//! Track records
//!
//! A track is a plain value describing one video result. Queues, sessions
//! and snapshots all hold tracks by value.

use serde::{ Deserialize, Serialize };


/// One playable video result.
#[derive( Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize )]
#[serde( default )]
pub struct Track {
    pub title: String,
    pub author: String,
    pub url: String,
    pub thumbnail: String,
    pub duration: String,
    pub published_at: String,
    pub description: String,
}


impl Track {
    /// Creates a track with only a title and source URL.
    pub fn new( title: impl Into<String>, url: impl Into<String> ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Self::default()
        }
    }


    /// Title to show in lists, falling back to the URL for untitled entries.
    pub fn display_title( &self ) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}


/// Formats a length in whole seconds as `MM:SS`, or `H:MM:SS` past one hour.
///
/// Returns an empty string for non-positive lengths (live streams report 0).
pub fn human_duration( seconds: i64 ) -> String {
    if seconds <= 0 {
        return String::new();
    }
    let h = seconds / 3600;
    let m = ( seconds % 3600 ) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!( "{}:{:02}:{:02}", h, m, s )
    } else {
        format!( "{:02}:{:02}", m, s )
    }
}


/// Formats seconds of playback as `MM:SS` for progress display.
pub fn clock( seconds: f64 ) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--".to_string();
    }
    let total = seconds as u64;
    format!( "{:02}:{:02}", total / 60, total % 60 )
}


/// Converts a `YYYYMMDD` upload date into `DD/MM/YYYY`.
pub fn format_upload_date( raw: &str ) -> Option<String> {
    if raw.len() != 8 || !raw.bytes().all( |b| b.is_ascii_digit() ) {
        return None;
    }
    Some( format!( "{}/{}/{}", &raw[ 6..8 ], &raw[ 4..6 ], &raw[ 0..4 ] ) )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_human_duration() {
        assert_eq!( human_duration( 0 ), "" );
        assert_eq!( human_duration( 59 ), "00:59" );
        assert_eq!( human_duration( 754 ), "12:34" );
        assert_eq!( human_duration( 3725 ), "1:02:05" );
    }


    #[test]
    fn test_clock() {
        assert_eq!( clock( 65.9 ), "01:05" );
        assert_eq!( clock( -1.0 ), "--:--" );
        assert_eq!( clock( f64::NAN ), "--:--" );
    }


    #[test]
    fn test_format_upload_date() {
        assert_eq!( format_upload_date( "20240131" ).as_deref(), Some( "31/01/2024" ) );
        assert_eq!( format_upload_date( "2024013" ), None );
        assert_eq!( format_upload_date( "2024x131" ), None );
    }


    #[test]
    fn test_display_title_falls_back_to_url() {
        let track = Track::new( "  ", "https://example.com/watch?v=1" );
        assert_eq!( track.display_title(), "https://example.com/watch?v=1" );
    }
}
