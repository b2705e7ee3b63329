//! Video search through yt-dlp
//!
//! yt-dlp prints one JSON object per result. Lines are decoded one at a
//! time and anything malformed is skipped rather than failing the search.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use chrono::{ NaiveDate, Utc };
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{ AsyncBufReadExt, BufReader };
use tokio::process::Command;

use crate::track::{ format_upload_date, human_duration, Track };


pub const DEFAULT_LIMIT: usize = 30;
pub const MAX_LIMIT: usize = 50;
const SEARCH_TIMEOUT: Duration = Duration::from_secs( 30 );
pub const PLAYLIST_LIMIT: usize = 200;
const PLAYLIST_TIMEOUT: Duration = Duration::from_secs( 120 );
const STALE_AFTER_DAYS: i64 = 14;


/// Errors that can occur during a search or lookup.
#[derive( Debug, Error )]
pub enum SearchError {
    #[error( "Search query is empty" )]
    EmptyQuery,

    #[error( "{0} is not installed or not on PATH" )]
    ToolMissing( String ),

    #[error( "yt-dlp failed: {0}" )]
    Failed( String ),

    #[error( "No results for {0:?}" )]
    NoResults( String ),

    #[error( "Search timed out" )]
    Timeout,

    #[error( "Could not parse yt-dlp output: {0}" )]
    Parse( #[from] serde_json::Error ),

    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),
}


/// Fields read from one yt-dlp JSON line.
#[derive( Debug, Default, Deserialize )]
#[serde( default )]
struct Item {
    id: String,
    title: String,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    webpage_url: String,
    url: String,
    description: Option<String>,
    upload_date: Option<String>,
}


impl Item {
    fn into_track( self ) -> Option<Track> {
        if self.id.is_empty() && self.webpage_url.is_empty() && self.title.is_empty() {
            return None;
        }

        let url = if !self.webpage_url.is_empty() {
            self.webpage_url
        } else if !self.id.is_empty() {
            format!( "https://www.youtube.com/watch?v={}", self.id )
        } else {
            self.url
        };

        let thumbnail = if self.id.is_empty() {
            String::new()
        } else {
            format!( "https://i.ytimg.com/vi/{}/hqdefault.jpg", self.id )
        };

        Some( Track {
            title: self.title,
            author: self.uploader.or( self.channel ).unwrap_or_default(),
            url,
            thumbnail,
            duration: self.duration.map( |d| human_duration( d as i64 ) ).unwrap_or_default(),
            published_at: self.upload_date.as_deref().and_then( format_upload_date ).unwrap_or_default(),
            description: self.description.unwrap_or_default(),
        })
    }
}


/// Decodes one output line, or None if it is not a usable result.
pub fn parse_line( line: &str ) -> Option<Track> {
    serde_json::from_str::<Item>( line.trim() ).ok()?.into_track()
}


/// Installed yt-dlp version and whether it looks outdated.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct VersionStatus {
    pub version: String,
    pub released: Option<NaiveDate>,
    pub needs_update: bool,
}


/// Judges a `YYYY.MM.DD[...]` version string against `today`.
pub fn version_status( version: &str, today: NaiveDate ) -> VersionStatus {
    let version = version.trim().to_string();
    let released = version.get( ..10 )
        .and_then( |date| NaiveDate::parse_from_str( date, "%Y.%m.%d" ).ok() );
    let needs_update = released
        .map( |date| ( today - date ).num_days() > STALE_AFTER_DAYS )
        .unwrap_or( false );

    VersionStatus { version, released, needs_update }
}


/// What a search box entry refers to.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum QueryKind {
    /// Free text for `ytsearch`.
    Text,
    /// A single video page.
    Video,
    /// A playlist, or a video opened inside one.
    Playlist,
}


const VIDEO_MARKERS: [&str; 5] = [
    "youtube.com/watch",
    "youtu.be/",
    "youtube.com/shorts/",
    "youtube.com/playlist",
    "music.youtube.com/watch",
];


/// Classifies a search box entry by the URL patterns it contains.
pub fn classify( query: &str ) -> QueryKind {
    let query = query.trim();
    let is_video_site = VIDEO_MARKERS.iter().any( |m| query.contains( m ) );

    if query.contains( "youtube.com/playlist?list=" ) || ( is_video_site && query.contains( "&list=" ) ) {
        QueryKind::Playlist
    } else if is_video_site {
        QueryKind::Video
    } else {
        QueryKind::Text
    }
}


/// How one search request is carried out.
#[derive( Debug, Clone, PartialEq, Eq )]
enum Plan {
    /// Run a flat listing of `target`, keeping at most `limit` entries.
    Listing { target: String, limit: usize, timeout: Duration },
    Lookup( String ),
}


/// Runs searches and lookups with a yt-dlp binary.
#[derive( Debug, Clone )]
pub struct Searcher {
    binary: String,
    limit: usize,
}


impl Searcher {
    /// @param limit results per search, clamped to 1..=50 (0 means the default)
    pub fn new( binary: impl Into<String>, limit: usize ) -> Self {
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit.min( MAX_LIMIT ) };
        Self { binary: binary.into(), limit }
    }


    pub fn limit( &self ) -> usize {
        self.limit
    }


    fn plan( &self, query: &str ) -> Plan {
        match classify( query ) {
            QueryKind::Text => Plan::Listing {
                target: format!( "ytsearch{}:{}", self.limit, query ),
                limit: self.limit,
                timeout: SEARCH_TIMEOUT,
            },
            QueryKind::Playlist => Plan::Listing {
                target: query.to_string(),
                limit: PLAYLIST_LIMIT,
                timeout: PLAYLIST_TIMEOUT,
            },
            QueryKind::Video => Plan::Lookup( query.to_string() ),
        }
    }


    /// Searches for `query`. A pasted video URL yields that one video and a
    /// playlist URL yields the playlist's entries.
    pub async fn search( &self, query: &str ) -> Result<Vec<Track>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err( SearchError::EmptyQuery );
        }

        tracing::info!( "Searching for {:?}", query );
        let results = match self.plan( query ) {
            Plan::Lookup( url ) => vec![ self.lookup( &url ).await? ],
            Plan::Listing { target, limit, timeout } => {
                tokio::time::timeout( timeout, self.run_listing( &target, limit ) )
                    .await
                    .map_err( |_| SearchError::Timeout )??
            }
        };

        if results.is_empty() {
            return Err( SearchError::NoResults( query.to_string() ) );
        }
        tracing::info!( "Found {} results", results.len() );
        Ok( results )
    }


    async fn run_listing( &self, target: &str, limit: usize ) -> Result<Vec<Track>, SearchError> {
        let mut child = self.command()
            .args( [ "-j", "--no-warnings", "--flat-playlist", target ] )
            .stdout( Stdio::piped() )
            .stderr( Stdio::piped() )
            .spawn()
            .map_err( |e| self.spawn_error( e ) )?;

        let mut results = Vec::with_capacity( limit.min( MAX_LIMIT ) );
        if let Some( stdout ) = child.stdout.take() {
            let mut lines = BufReader::new( stdout ).lines();
            while let Some( line ) = lines.next_line().await? {
                match parse_line( &line ) {
                    Some( track ) => results.push( track ),
                    None => tracing::debug!( "Skipping unusable line: {}", line ),
                }
                if results.len() >= limit {
                    break;
                }
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() && results.is_empty() {
            let stderr = String::from_utf8_lossy( &output.stderr ).trim().to_string();
            return Err( SearchError::Failed( stderr ) );
        }
        Ok( results )
    }


    /// Fetches full metadata, including the description, for one URL.
    pub async fn lookup( &self, url: &str ) -> Result<Track, SearchError> {
        if url.trim().is_empty() {
            return Err( SearchError::EmptyQuery );
        }

        let run = self.command()
            .args( [ "-j", "--no-warnings", "--skip-download", url ] )
            .output();
        let output = tokio::time::timeout( SEARCH_TIMEOUT, run )
            .await
            .map_err( |_| SearchError::Timeout )?
            .map_err( |e| self.spawn_error( e ) )?;

        if !output.status.success() {
            return Err( SearchError::Failed( String::from_utf8_lossy( &output.stderr ).trim().to_string() ) );
        }

        let item: Item = serde_json::from_slice( &output.stdout )?;
        item.into_track().ok_or_else( || SearchError::NoResults( url.to_string() ) )
    }


    /// Reports the installed version and whether it is more than 14 days old.
    pub async fn check_version( &self ) -> Result<VersionStatus, SearchError> {
        let output = self.command()
            .arg( "--version" )
            .output()
            .await
            .map_err( |e| self.spawn_error( e ) )?;

        if !output.status.success() {
            return Err( SearchError::Failed( String::from_utf8_lossy( &output.stderr ).trim().to_string() ) );
        }

        let version = String::from_utf8_lossy( &output.stdout );
        Ok( version_status( &version, Utc::now().date_naive() ) )
    }


    fn command( &self ) -> Command {
        let mut command = Command::new( &self.binary );
        command.stdin( Stdio::null() ).kill_on_drop( true );
        command
    }


    fn spawn_error( &self, e: std::io::Error ) -> SearchError {
        match e.kind() {
            ErrorKind::NotFound => SearchError::ToolMissing( self.binary.clone() ),
            _ => SearchError::Io( e ),
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_flat_entry() {
        let line = r#"{"id":"dQw4w9WgXcQ","title":"Song","uploader":"Artist","duration":212.0,"url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ","upload_date":"20091025"}"#;
        let track = parse_line( line ).unwrap();

        assert_eq!( track.title, "Song" );
        assert_eq!( track.author, "Artist" );
        assert_eq!( track.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ" );
        assert_eq!( track.thumbnail, "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg" );
        assert_eq!( track.duration, "03:32" );
        assert_eq!( track.published_at, "25/10/2009" );
    }


    #[test]
    fn test_malformed_and_empty_lines_are_skipped() {
        assert!( parse_line( "not json" ).is_none() );
        assert!( parse_line( "{\"title\":" ).is_none() );
        assert!( parse_line( "{}" ).is_none() );
        assert!( parse_line( r#"{"duration":null,"id":"x"}"# ).is_some() );
    }


    #[test]
    fn test_limit_is_clamped() {
        assert_eq!( Searcher::new( "yt-dlp", 0 ).limit(), DEFAULT_LIMIT );
        assert_eq!( Searcher::new( "yt-dlp", 500 ).limit(), MAX_LIMIT );
        assert_eq!( Searcher::new( "yt-dlp", 5 ).limit(), 5 );
    }


    #[test]
    fn test_version_status() {
        let today = NaiveDate::from_ymd_opt( 2025, 3, 1 ).unwrap();
        assert!( version_status( "2025.01.02\n", today ).needs_update );
        assert!( !version_status( "2025.02.20", today ).needs_update );

        let unknown = version_status( "nightly", today );
        assert!( unknown.released.is_none() );
        assert!( !unknown.needs_update );
    }


    #[test]
    fn test_classify_urls() {
        assert_eq!( classify( "lofi hip hop" ), QueryKind::Text );
        assert_eq!( classify( "https://www.youtube.com/watch?v=abc" ), QueryKind::Video );
        assert_eq!( classify( " https://youtu.be/abc " ), QueryKind::Video );
        assert_eq!( classify( "https://www.youtube.com/shorts/abc" ), QueryKind::Video );
        assert_eq!( classify( "https://music.youtube.com/watch?v=abc" ), QueryKind::Video );
        assert_eq!( classify( "https://www.youtube.com/playlist?list=PLxyz" ), QueryKind::Playlist );
        assert_eq!( classify( "https://www.youtube.com/watch?v=abc&list=PLxyz" ), QueryKind::Playlist );
        assert_eq!( classify( "songs&list=mine" ), QueryKind::Text );
    }


    #[test]
    fn test_playlist_url_is_listed_not_searched() {
        let searcher = Searcher::new( "yt-dlp", 30 );
        let url = "https://www.youtube.com/playlist?list=PLxyz";

        assert_eq!(
            searcher.plan( url ),
            Plan::Listing { target: url.to_string(), limit: PLAYLIST_LIMIT, timeout: PLAYLIST_TIMEOUT }
        );
        assert_eq!(
            searcher.plan( "https://youtu.be/abc" ),
            Plan::Lookup( "https://youtu.be/abc".to_string() )
        );
        assert_eq!(
            searcher.plan( "jazz" ),
            Plan::Listing { target: "ytsearch30:jazz".to_string(), limit: 30, timeout: SEARCH_TIMEOUT }
        );
    }


    #[tokio::test]
    async fn test_empty_query() {
        let err = Searcher::new( "yt-dlp", 5 ).search( "   " ).await.unwrap_err();
        assert!( matches!( err, SearchError::EmptyQuery ) );
    }


    #[tokio::test]
    async fn test_missing_binary() {
        let err = Searcher::new( "tubetui-no-such-ytdlp", 5 ).search( "x" ).await.unwrap_err();
        assert!( matches!( err, SearchError::ToolMissing( _ ) ) );
    }
}
