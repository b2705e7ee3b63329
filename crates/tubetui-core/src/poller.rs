//! Progress poller
//!
//! Periodically reads position and duration back from the player. It only
//! reports readings; it never advances the queue.

use std::path::{ Path, PathBuf };
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ipc::ControlChannel;
use crate::session::SessionId;


/// One progress reading. Missing fields mean the query failed and the
/// previous value should be kept.
#[derive( Debug, Clone, Copy, Default, PartialEq )]
pub struct Reading {
    pub position: Option<f64>,
    pub duration: Option<f64>,
}


/// Receives readings for a session.
pub trait ProgressSink: Send + Sync + 'static {
    /// Applies a reading. Returns false once the session is no longer
    /// current and playing, which ends the poller.
    fn apply( &self, session: SessionId, reading: Reading ) -> bool;
}


/// Queries `time-pos` and `duration`, swallowing failures.
pub async fn read_progress( channel: &ControlChannel, socket: &Path ) -> Reading {
    let position = match channel.query_number( socket, "time-pos" ).await {
        Ok( value ) => Some( value ),
        Err( e ) => {
            tracing::debug!( "time-pos query failed: {}", e );
            None
        }
    };

    let duration = match channel.query_number( socket, "duration" ).await {
        Ok( value ) if value > 0.0 => Some( value ),
        Ok( _ ) => None,
        Err( e ) => {
            tracing::debug!( "duration query failed: {}", e );
            None
        }
    };

    Reading { position, duration }
}


/// Polls until `stop` fires or the sink declines a reading.
pub async fn run(
    channel: ControlChannel,
    socket: PathBuf,
    session: SessionId,
    interval: Duration,
    stop: CancellationToken,
    sink: Arc<dyn ProgressSink>,
) {
    let mut ticker = tokio::time::interval( interval );
    ticker.set_missed_tick_behavior( MissedTickBehavior::Skip );

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let reading = read_progress( &channel, &socket ).await;
                if stop.is_cancelled() || !sink.apply( session, reading ) {
                    break;
                }
            }
        }
    }

    tracing::debug!( "poller for session {} stopped", session.raw() );
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::ipc::Transport;


    struct Recorder {
        readings: Mutex<Vec<Reading>>,
        limit: usize,
    }


    impl ProgressSink for Recorder {
        fn apply( &self, _session: SessionId, reading: Reading ) -> bool {
            let mut readings = self.readings.lock().unwrap();
            readings.push( reading );
            readings.len() < self.limit
        }
    }


    #[tokio::test]
    async fn test_failed_queries_keep_previous_values() {
        let channel = ControlChannel::new( Transport::Socket, "socat" );
        let reading = read_progress( &channel, Path::new( "/nonexistent/tubetui.sock" ) ).await;
        assert_eq!( reading, Reading::default() );
    }


    #[tokio::test]
    async fn test_sink_refusal_stops_poller() {
        let sink = Arc::new( Recorder { readings: Mutex::new( Vec::new() ), limit: 3 } );
        let channel = ControlChannel::new( Transport::Socket, "socat" );

        run(
            channel,
            PathBuf::from( "/nonexistent/tubetui.sock" ),
            SessionId::from_raw( 9 ),
            Duration::from_millis( 5 ),
            CancellationToken::new(),
            sink.clone(),
        ).await;

        assert_eq!( sink.readings.lock().unwrap().len(), 3 );
    }


    #[tokio::test]
    async fn test_cancel_stops_poller() {
        let sink = Arc::new( Recorder { readings: Mutex::new( Vec::new() ), limit: usize::MAX } );
        let stop = CancellationToken::new();
        stop.cancel();

        run(
            ControlChannel::new( Transport::Socket, "socat" ),
            PathBuf::from( "/nonexistent/tubetui.sock" ),
            SessionId::from_raw( 9 ),
            Duration::from_millis( 5 ),
            stop,
            sink.clone(),
        ).await;

        assert!( sink.readings.lock().unwrap().len() <= 1 );
    }
}
