//! Thumbnail cache
//!
//! Content-addressed disk cache for preview images. Files are named by the
//! SHA-256 of their source URL and stored pre-resized to 120x90.

use std::io::Cursor;
use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::Duration;

use image::{ DynamicImage, ImageFormat };
use sha2::{ Digest, Sha256 };
use thiserror::Error;
use tokio_util::sync::CancellationToken;


const FETCH_TIMEOUT: Duration = Duration::from_secs( 5 );
const CACHED_WIDTH: u32 = 120;
const CACHED_HEIGHT: u32 = 90;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new( 0 );


/// Errors from a thumbnail fetch.
#[derive( Debug, Error )]
pub enum ThumbnailError {
    #[error( "Thumbnail URL is empty" )]
    EmptyUrl,

    #[error( "Fetch cancelled" )]
    Cancelled,

    #[error( "Request failed: {0}" )]
    Request( #[from] reqwest::Error ),

    #[error( "Server answered {0}" )]
    Status( u16 ),

    #[error( "Could not decode image: {0}" )]
    Decode( #[from] image::ImageError ),
}


/// Disk-backed thumbnail fetcher.
#[derive( Debug, Clone )]
pub struct ThumbnailCache {
    dir: PathBuf,
    client: reqwest::Client,
}


impl ThumbnailCache {
    /// Creates a cache rooted at `dir`. The directory is created lazily.
    pub fn new( dir: impl Into<PathBuf> ) -> Result<Self, ThumbnailError> {
        let client = reqwest::Client::builder()
            .timeout( FETCH_TIMEOUT )
            .build()?;

        Ok( Self { dir: dir.into(), client } )
    }


    /// `<cache_dir>/tubetui/thumbnails`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map( |p| p.join( "tubetui" ).join( "thumbnails" ) )
    }


    pub fn dir( &self ) -> &Path {
        &self.dir
    }


    /// Cache file for a URL.
    pub fn path_for( &self, url: &str ) -> PathBuf {
        self.dir.join( cache_key( url ) )
    }


    /// Returns the image for `url`, from disk when cached.
    ///
    /// `cancel` aborts only the network request; a disk hit is always
    /// decoded. A failed cache write is logged and the image still returned.
    pub async fn fetch( &self, url: &str, cancel: &CancellationToken ) -> Result<DynamicImage, ThumbnailError> {
        if url.is_empty() {
            return Err( ThumbnailError::EmptyUrl );
        }

        let path = self.path_for( url );
        if let Ok( bytes ) = tokio::fs::read( &path ).await {
            match image::load_from_memory( &bytes ) {
                Ok( img ) => return Ok( img ),
                Err( e ) => tracing::debug!( "Discarding unreadable cache entry {:?}: {}", path, e ),
            }
        }

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err( ThumbnailError::Cancelled ),
            bytes = self.download( url ) => bytes?,
        };

        let img = image::load_from_memory( &bytes )?;
        if let Err( e ) = self.store( &path, &img ).await {
            tracing::warn!( "Failed to cache thumbnail {}: {}", url, e );
        }

        Ok( img )
    }


    async fn download( &self, url: &str ) -> Result<Vec<u8>, ThumbnailError> {
        let response = self.client.get( url ).send().await?;
        if !response.status().is_success() {
            return Err( ThumbnailError::Status( response.status().as_u16() ) );
        }
        Ok( response.bytes().await?.to_vec() )
    }


    /// Writes a resized copy through a unique temp file and a rename, so
    /// concurrent readers never see a partial file.
    async fn store( &self, path: &Path, img: &DynamicImage ) -> std::io::Result<()> {
        tokio::fs::create_dir_all( &self.dir ).await?;

        let small = img.thumbnail( CACHED_WIDTH, CACHED_HEIGHT ).to_rgb8();
        let mut encoded = Vec::new();
        small.write_to( &mut Cursor::new( &mut encoded ), ImageFormat::Jpeg )
            .map_err( std::io::Error::other )?;

        let temp = path.with_extension( format!(
            "tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add( 1, Ordering::Relaxed )
        ));

        tokio::fs::write( &temp, &encoded ).await?;
        if let Err( e ) = tokio::fs::rename( &temp, path ).await {
            let _ = tokio::fs::remove_file( &temp ).await;
            return Err( e );
        }
        Ok( () )
    }
}


/// Hex SHA-256 of the URL plus `.jpg`.
pub fn cache_key( url: &str ) -> String {
    let digest = Sha256::digest( url.as_bytes() );
    format!( "{}.jpg", hex::encode( digest ) )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_cache_key_is_stable_and_distinct() {
        let a = cache_key( "https://i.ytimg.com/vi/a/hqdefault.jpg" );
        assert_eq!( a, cache_key( "https://i.ytimg.com/vi/a/hqdefault.jpg" ) );
        assert_ne!( a, cache_key( "https://i.ytimg.com/vi/b/hqdefault.jpg" ) );
        assert_eq!( a.len(), 64 + 4 );
        assert!( a.ends_with( ".jpg" ) );
    }


    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new( dir.path() ).unwrap();
        let err = cache.fetch( "", &CancellationToken::new() ).await.unwrap_err();
        assert!( matches!( err, ThumbnailError::EmptyUrl ) );
    }


    #[tokio::test]
    async fn test_cancel_aborts_network_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new( dir.path() ).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Unroutable address; cancellation must win without waiting for it.
        let url = "http://10.255.255.1/thumb.jpg";
        let err = cache.fetch( url, &cancel ).await.unwrap_err();
        assert!( matches!( err, ThumbnailError::Cancelled ) );

        // A cached copy is served even with a cancelled token.
        let img = DynamicImage::new_rgb8( 4, 3 );
        cache.store( &cache.path_for( url ), &img ).await.unwrap();
        let hit = cache.fetch( url, &cancel ).await.unwrap();
        assert!( hit.width() <= CACHED_WIDTH && hit.height() <= CACHED_HEIGHT );
    }
}
