//! Integration tests for the thumbnail cache against a local HTTP responder

use std::io::Cursor;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;

use image::{ DynamicImage, ImageFormat, RgbImage };
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tubetui_core::thumbnail::cache_key;
use tubetui_core::{ ThumbnailCache, ThumbnailError };


fn png( width: u32, height: u32 ) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8( RgbImage::from_pixel( width, height, image::Rgb( [ 200, 30, 30 ] ) ) );
    let mut bytes = Vec::new();
    img.write_to( &mut Cursor::new( &mut bytes ), ImageFormat::Png ).unwrap();
    bytes
}


/// Serves `body` with `status` to every request and counts them.
async fn serve( status: &'static str, body: Vec<u8> ) -> ( String, Arc<AtomicUsize> ) {
    let listener = TcpListener::bind( "127.0.0.1:0" ).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new( AtomicUsize::new( 0 ) );
    let counter = Arc::clone( &hits );

    tokio::spawn( async move {
        while let Ok(( mut stream, _ )) = listener.accept().await {
            counter.fetch_add( 1, Ordering::SeqCst );
            let body = body.clone();
            tokio::spawn( async move {
                let mut request = Vec::new();
                let mut buf = [ 0u8; 1024 ];
                while !request.windows( 4 ).any( |w| w == b"\r\n\r\n" ) {
                    match stream.read( &mut buf ).await {
                        Ok( 0 ) | Err( _ ) => return,
                        Ok( n ) => request.extend_from_slice( &buf[ ..n ] ),
                    }
                }
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all( head.as_bytes() ).await;
                let _ = stream.write_all( &body ).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    ( format!( "http://{}/vi/abc/hqdefault.jpg", addr ), hits )
}


#[tokio::test]
async fn test_second_fetch_is_served_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let ( url, hits ) = serve( "200 OK", png( 480, 360 ) ).await;
    let cache = ThumbnailCache::new( dir.path() ).unwrap();
    let cancel = CancellationToken::new();

    let first = cache.fetch( &url, &cancel ).await.unwrap();
    assert_eq!( ( first.width(), first.height() ), ( 480, 360 ) );
    assert!( dir.path().join( cache_key( &url ) ).exists() );

    let second = cache.fetch( &url, &cancel ).await.unwrap();
    assert_eq!( ( second.width(), second.height() ), ( 120, 90 ) );
    assert_eq!( hits.load( Ordering::SeqCst ), 1 );
}


#[tokio::test]
async fn test_concurrent_callers_both_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let ( url, _hits ) = serve( "200 OK", png( 64, 48 ) ).await;
    let cache = ThumbnailCache::new( dir.path() ).unwrap();
    let keep = CancellationToken::new();
    let dropped = CancellationToken::new();
    dropped.cancel();

    let ( kept, cancelled ) = tokio::join!( cache.fetch( &url, &keep ), cache.fetch( &url, &dropped ) );

    assert!( kept.is_ok() );
    assert!( matches!( cancelled, Err( ThumbnailError::Cancelled ) ) );
    assert!( image::open( dir.path().join( cache_key( &url ) ) ).is_ok() );
}


#[tokio::test]
async fn test_http_error_is_a_fetch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let ( url, _hits ) = serve( "404 Not Found", Vec::new() ).await;
    let cache = ThumbnailCache::new( dir.path() ).unwrap();

    let err = cache.fetch( &url, &CancellationToken::new() ).await.unwrap_err();

    assert!( matches!( err, ThumbnailError::Status( 404 ) ) );
    assert!( !dir.path().join( cache_key( &url ) ).exists() );
}


#[tokio::test]
async fn test_unwritable_cache_still_returns_image() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join( "not-a-dir" );
    std::fs::write( &blocker, b"file" ).unwrap();
    let ( url, _hits ) = serve( "200 OK", png( 32, 24 ) ).await;
    let cache = ThumbnailCache::new( blocker.join( "thumbs" ) ).unwrap();

    let img = cache.fetch( &url, &CancellationToken::new() ).await.unwrap();

    assert_eq!( img.width(), 32 );
}
