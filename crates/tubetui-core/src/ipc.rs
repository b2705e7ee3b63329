//! Control channel to a running player
//!
//! Every exchange is single shot: connect to the session's control socket,
//! write one `{"command": [...]}` line, read the reply carrying `error` and
//! `data`, disconnect.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value };
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;


/// Errors from the control channel.
#[derive( Debug, Error )]
pub enum IpcError {
    #[error( "{0} is not installed" )]
    TransportMissing( String ),

    #[error( "Control socket unreachable: {0}" )]
    Unreachable( String ),

    #[error( "Player rejected command: {0}" )]
    Rejected( String ),

    #[error( "Malformed reply: {0}" )]
    Malformed( String ),

    #[error( "I/O error: {0}" )]
    Io( #[from] std::io::Error ),
}


/// How commands reach the control socket.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize )]
#[serde( rename_all = "snake_case" )]
pub enum Transport {
    /// Pipe each command through the `socat` utility.
    #[default]
    Socat,
    /// Connect to the Unix-domain socket directly.
    Socket,
}


/// Command sender bound to a transport.
#[derive( Debug, Clone )]
pub struct ControlChannel {
    transport: Transport,
    socat_binary: String,
}


impl ControlChannel {
    pub fn new( transport: Transport, socat_binary: impl Into<String> ) -> Self {
        Self {
            transport,
            socat_binary: socat_binary.into(),
        }
    }


    pub fn transport( &self ) -> Transport {
        self.transport
    }


    /// Sends one command and returns the reply's `data` field.
    pub async fn send( &self, socket: &Path, command: Value ) -> Result<Value, IpcError> {
        let mut line = json!( { "command": command } ).to_string();
        line.push( '\n' );

        let reply = match self.transport {
            Transport::Socat => self.exchange_socat( socket, &line ).await?,
            Transport::Socket => exchange_socket( socket, &line ).await?,
        };

        tracing::trace!( "ipc {} -> {}", line.trim_end(), reply );
        parse_reply( &reply )
    }


    /// Reads a numeric property such as `time-pos` or `duration`.
    pub async fn query_number( &self, socket: &Path, property: &str ) -> Result<f64, IpcError> {
        let data = self.send( socket, json!( [ "get_property", property ] ) ).await?;
        data.as_f64()
            .ok_or_else( || IpcError::Malformed( format!( "{} is not a number: {}", property, data ) ) )
    }


    /// Flips the pause state.
    pub async fn cycle_pause( &self, socket: &Path ) -> Result<(), IpcError> {
        self.send( socket, json!( [ "cycle", "pause" ] ) ).await.map( |_| () )
    }


    /// Seeks relative to the current position.
    pub async fn seek_relative( &self, socket: &Path, delta_seconds: f64 ) -> Result<(), IpcError> {
        self.send( socket, json!( [ "seek", delta_seconds, "relative" ] ) ).await.map( |_| () )
    }


    async fn exchange_socat( &self, socket: &Path, line: &str ) -> Result<String, IpcError> {
        let mut child = Command::new( &self.socat_binary )
            .arg( "-" )
            .arg( format!( "UNIX-CONNECT:{}", socket.display() ) )
            .stdin( Stdio::piped() )
            .stdout( Stdio::piped() )
            .stderr( Stdio::piped() )
            .kill_on_drop( true )
            .spawn()
            .map_err( |e| match e.kind() {
                ErrorKind::NotFound => IpcError::TransportMissing( self.socat_binary.clone() ),
                _ => IpcError::Io( e ),
            })?;

        if let Some( mut stdin ) = child.stdin.take() {
            stdin.write_all( line.as_bytes() ).await?;
            // Dropping stdin closes it so socat finishes after the reply.
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy( &output.stdout );

        if let Some( reply ) = first_reply( &stdout ) {
            return Ok( reply.to_string() );
        }

        let stderr = String::from_utf8_lossy( &output.stderr ).trim().to_string();
        if output.status.success() {
            Err( IpcError::Malformed( "empty reply".to_string() ) )
        } else {
            Err( IpcError::Unreachable( stderr ) )
        }
    }
}


#[cfg( unix )]
async fn exchange_socket( socket: &Path, line: &str ) -> Result<String, IpcError> {
    use tokio::io::{ AsyncBufReadExt, BufReader };
    use tokio::net::UnixStream;

    let mut stream = UnixStream::connect( socket )
        .await
        .map_err( |e| IpcError::Unreachable( e.to_string() ) )?;
    stream.write_all( line.as_bytes() ).await?;

    let mut lines = BufReader::new( stream ).lines();
    while let Some( candidate ) = lines.next_line().await? {
        if let Some( reply ) = first_reply( &candidate ) {
            return Ok( reply.to_string() );
        }
    }

    Err( IpcError::Malformed( "connection closed before reply".to_string() ) )
}


#[cfg( not( unix ) )]
async fn exchange_socket( _socket: &Path, _line: &str ) -> Result<String, IpcError> {
    Err( IpcError::Unreachable( "unix sockets are not available on this platform".to_string() ) )
}


/// Picks the first line that is a command reply. The player interleaves
/// event lines, which carry an `event` key instead of `error`.
fn first_reply( output: &str ) -> Option<&str> {
    output.lines()
        .map( str::trim )
        .find( |l| {
            serde_json::from_str::<Value>( l )
                .map( |v| v.get( "error" ).is_some() )
                .unwrap_or( false )
        })
}


fn parse_reply( line: &str ) -> Result<Value, IpcError> {
    let value: Value = serde_json::from_str( line )
        .map_err( |e| IpcError::Malformed( e.to_string() ) )?;

    match value.get( "error" ).and_then( Value::as_str ) {
        Some( "success" ) => Ok( value.get( "data" ).cloned().unwrap_or( Value::Null ) ),
        Some( other ) => Err( IpcError::Rejected( other.to_string() ) ),
        None => Err( IpcError::Malformed( line.to_string() ) ),
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_reply_extracts_data() {
        let data = parse_reply( r#"{"data":42.5,"request_id":0,"error":"success"}"# ).unwrap();
        assert_eq!( data.as_f64(), Some( 42.5 ) );
    }


    #[test]
    fn test_parse_reply_rejected() {
        let err = parse_reply( r#"{"request_id":0,"error":"property unavailable"}"# ).unwrap_err();
        assert!( matches!( err, IpcError::Rejected( ref m ) if m == "property unavailable" ) );
    }


    #[test]
    fn test_first_reply_skips_events() {
        let out = "{\"event\":\"pause\"}\n{\"data\":null,\"error\":\"success\"}\n";
        assert_eq!( first_reply( out ), Some( r#"{"data":null,"error":"success"}"# ) );
        assert_eq!( first_reply( "garbage\n" ), None );
    }


    #[tokio::test]
    async fn test_missing_socat_is_reported() {
        let channel = ControlChannel::new( Transport::Socat, "tubetui-no-such-socat" );
        let err = channel.cycle_pause( Path::new( "/tmp/none.sock" ) ).await.unwrap_err();
        assert!( matches!( err, IpcError::TransportMissing( _ ) ) );
    }
}
