//! Debounced detail loading
//!
//! Rapid cursor movement produces one request per step. Each request
//! supersedes the previous one: its debounce timer and fetch are cancelled
//! and only the newest generation is ever delivered.

use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::{ Arc, Mutex, PoisonError };
use std::time::Duration;

use image::DynamicImage;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{ self, UnboundedReceiver, UnboundedSender };
use tokio_util::sync::CancellationToken;

use crate::thumbnail::ThumbnailCache;


pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis( 150 );


/// Result of a detail request that was still current when it finished.
#[derive( Debug, Clone )]
pub struct Loaded {
    pub generation: u64,
    pub url: String,
    /// None when the fetch failed; the UI shows no image.
    pub image: Option<Arc<DynamicImage>>,
}


/// Debounced thumbnail loader for the selected item.
pub struct DetailLoader {
    cache: ThumbnailCache,
    handle: Handle,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    inflight: Mutex<Option<CancellationToken>>,
    sender: UnboundedSender<Loaded>,
}


impl DetailLoader {
    pub fn new( cache: ThumbnailCache, handle: Handle, debounce: Duration ) -> ( Self, UnboundedReceiver<Loaded> ) {
        let ( sender, receiver ) = mpsc::unbounded_channel();
        let loader = Self {
            cache,
            handle,
            debounce,
            generation: Arc::new( AtomicU64::new( 0 ) ),
            inflight: Mutex::new( None ),
            sender,
        };
        ( loader, receiver )
    }


    /// Requests the image for `url`, superseding any earlier request.
    ///
    /// @returns the generation of this request
    pub fn request( &self, url: String ) -> u64 {
        let generation = self.generation.fetch_add( 1, Ordering::SeqCst ) + 1;
        let cancel = CancellationToken::new();

        if let Some( previous ) = self.swap_inflight( Some( cancel.clone() ) ) {
            previous.cancel();
        }

        let cache = self.cache.clone();
        let current = Arc::clone( &self.generation );
        let sender = self.sender.clone();
        let debounce = self.debounce;

        self.handle.spawn( async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep( debounce ) => {}
            }

            let image = match cache.fetch( &url, &cancel ).await {
                Ok( img ) => Some( Arc::new( img ) ),
                Err( e ) => {
                    tracing::debug!( "Thumbnail unavailable for {}: {}", url, e );
                    None
                }
            };

            if current.load( Ordering::SeqCst ) == generation && !cancel.is_cancelled() {
                let _ = sender.send( Loaded { generation, url, image } );
            }
        });

        generation
    }


    /// Cancels whatever is in flight.
    pub fn cancel( &self ) {
        self.generation.fetch_add( 1, Ordering::SeqCst );
        if let Some( previous ) = self.swap_inflight( None ) {
            previous.cancel();
        }
    }


    /// Returns true if `generation` is the newest request.
    pub fn is_current( &self, generation: u64 ) -> bool {
        self.generation.load( Ordering::SeqCst ) == generation
    }


    fn swap_inflight( &self, next: Option<CancellationToken> ) -> Option<CancellationToken> {
        let mut inflight = self.inflight.lock().unwrap_or_else( PoisonError::into_inner );
        std::mem::replace( &mut *inflight, next )
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use image::ImageFormat;


    fn seed( cache: &ThumbnailCache, url: &str ) {
        std::fs::create_dir_all( cache.dir() ).unwrap();
        DynamicImage::new_rgb8( 8, 6 )
            .to_rgb8()
            .save_with_format( cache.path_for( url ), ImageFormat::Jpeg )
            .unwrap();
    }


    #[tokio::test]
    async fn test_only_latest_request_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new( dir.path() ).unwrap();
        seed( &cache, "https://img/a.jpg" );
        seed( &cache, "https://img/b.jpg" );

        let ( loader, mut rx ) = DetailLoader::new( cache, Handle::current(), Duration::from_millis( 30 ) );
        loader.request( "https://img/a.jpg".to_string() );
        let latest = loader.request( "https://img/b.jpg".to_string() );

        let loaded = tokio::time::timeout( Duration::from_secs( 2 ), rx.recv() ).await.unwrap().unwrap();
        assert_eq!( loaded.generation, latest );
        assert_eq!( loaded.url, "https://img/b.jpg" );
        assert!( loaded.image.is_some() );

        let extra = tokio::time::timeout( Duration::from_millis( 150 ), rx.recv() ).await;
        assert!( extra.is_err() );
    }


    #[tokio::test]
    async fn test_failed_fetch_delivers_no_image() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new( dir.path() ).unwrap();
        let ( loader, mut rx ) = DetailLoader::new( cache, Handle::current(), Duration::from_millis( 1 ) );

        loader.request( String::new() );

        let loaded = tokio::time::timeout( Duration::from_secs( 2 ), rx.recv() ).await.unwrap().unwrap();
        assert!( loaded.image.is_none() );
    }


    #[tokio::test]
    async fn test_cancel_suppresses_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new( dir.path() ).unwrap();
        seed( &cache, "https://img/a.jpg" );
        let ( loader, mut rx ) = DetailLoader::new( cache, Handle::current(), Duration::from_millis( 20 ) );

        let generation = loader.request( "https://img/a.jpg".to_string() );
        loader.cancel();

        assert!( !loader.is_current( generation ) );
        let nothing = tokio::time::timeout( Duration::from_millis( 120 ), rx.recv() ).await;
        assert!( nothing.is_err() );
    }
}
