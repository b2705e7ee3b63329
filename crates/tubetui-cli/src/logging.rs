//! Log file setup
//!
//! The terminal belongs to the UI, so logs go to
//! `<data_dir>/tubetui/tubetui.log`. `TUBETUI_LOG` overrides the filter.

use std::fs::{ self, OpenOptions };
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{ Context, Result };
use tracing_subscriber::EnvFilter;


pub const FILTER_ENV: &str = "TUBETUI_LOG";


pub fn log_path() -> Option<PathBuf> {
    dirs::data_dir().map( |p| p.join( "tubetui" ).join( "tubetui.log" ) )
}


/// Installs the global subscriber. Without a data dir logging is disabled.
pub fn init() -> Result<()> {
    let Some( path ) = log_path() else { return Ok( () ) };

    if let Some( parent ) = path.parent() {
        fs::create_dir_all( parent ).with_context( || format!( "creating {:?}", parent ) )?;
    }
    let file = OpenOptions::new()
        .create( true )
        .append( true )
        .open( &path )
        .with_context( || format!( "opening {:?}", path ) )?;

    let filter = EnvFilter::try_from_env( FILTER_ENV )
        .unwrap_or_else( |_| EnvFilter::new( "info" ) );

    tracing_subscriber::fmt()
        .with_writer( Mutex::new( file ) )
        .with_ansi( false )
        .with_target( true )
        .with_env_filter( filter )
        .try_init()
        .map_err( |e| anyhow::anyhow!( "installing log subscriber: {}", e ) )?;

    Ok( () )
}
