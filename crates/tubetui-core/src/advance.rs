//! Queue advance rules
//!
//! Pure selection logic shared by explicit next/previous and by
//! auto-advance after a track ends, plus the skip guard that keeps an
//! explicit skip from racing the exit of the session it replaced.

use rand::Rng;

use crate::queue::PlaybackMode;
use crate::session::SessionId;


/// What the controller is currently playing.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Binding {
    Idle,
    Queue( usize ),
    Direct,
}


/// Informational reasons a step did not start a track.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Boundary {
    QueueEmpty,
    QueueFinished,
    AlreadyAtFirst,
    NothingPlaying,
}


/// Outcome of a selection.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Step {
    Play( usize ),
    Halt( Boundary ),
}


/// Picks a uniformly random index in `[0, len)` other than `current`.
///
/// A single-track queue always yields 0.
pub fn shuffle_pick<R: Rng + ?Sized>( current: usize, len: usize, rng: &mut R ) -> usize {
    if len <= 1 {
        return 0;
    }
    if current >= len {
        return rng.gen_range( 0..len );
    }
    let pick = rng.gen_range( 0..len - 1 );
    if pick >= current { pick + 1 } else { pick }
}


/// Forward rule from a bound queue position.
fn forward<R: Rng + ?Sized>( current: usize, mode: PlaybackMode, len: usize, rng: &mut R ) -> Step {
    if len == 0 {
        return Step::Halt( Boundary::QueueEmpty );
    }
    match mode {
        PlaybackMode::RepeatOne => Step::Play( current.min( len - 1 ) ),
        PlaybackMode::Shuffle => Step::Play( shuffle_pick( current, len, rng ) ),
        PlaybackMode::Normal | PlaybackMode::RepeatAll => {
            let next = current + 1;
            if next < len {
                Step::Play( next )
            } else if mode == PlaybackMode::RepeatAll {
                Step::Play( 0 )
            } else {
                Step::Halt( Boundary::QueueFinished )
            }
        }
    }
}


/// Selection for an explicit "next".
pub fn next_step<R: Rng + ?Sized>( binding: Binding, mode: PlaybackMode, len: usize, rng: &mut R ) -> Step {
    if len == 0 {
        return Step::Halt( Boundary::QueueEmpty );
    }
    match binding {
        Binding::Idle => Step::Halt( Boundary::NothingPlaying ),
        Binding::Direct => Step::Play( 0 ),
        Binding::Queue( current ) => forward( current, mode, len, rng ),
    }
}


/// Selection for an explicit "previous".
///
/// RepeatOne and Shuffle have no distinct backwards order and replay the
/// current position.
pub fn previous_step( binding: Binding, mode: PlaybackMode, len: usize ) -> Step {
    if len == 0 {
        return Step::Halt( Boundary::QueueEmpty );
    }
    match binding {
        Binding::Idle => Step::Halt( Boundary::NothingPlaying ),
        Binding::Direct => Step::Play( len - 1 ),
        Binding::Queue( current ) => match mode {
            PlaybackMode::RepeatOne | PlaybackMode::Shuffle => Step::Play( current.min( len - 1 ) ),
            PlaybackMode::Normal | PlaybackMode::RepeatAll => {
                if current > 0 {
                    Step::Play( ( current - 1 ).min( len - 1 ) )
                } else if mode == PlaybackMode::RepeatAll {
                    Step::Play( len - 1 )
                } else {
                    Step::Halt( Boundary::AlreadyAtFirst )
                }
            }
        },
    }
}


/// Selection after a queue-bound track finished on its own.
pub fn auto_step<R: Rng + ?Sized>( current: usize, mode: PlaybackMode, len: usize, rng: &mut R ) -> Step {
    forward( current, mode, len, rng )
}


/// How an observed process exit must be handled.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum ExitVerdict {
    /// An explicit skip already replaced this session.
    Suppressed,
    /// A newer session (or a stop) superseded this one.
    Stale,
    /// This is the current session; apply the auto rules.
    Evaluate,
}


/// One-shot suppression of auto-advance, stamped with the session it
/// applies to.
#[derive( Debug, Clone, Copy, Default, PartialEq, Eq )]
pub struct SkipGuard {
    suppressed: Option<SessionId>,
}


impl SkipGuard {
    /// Marks the session an explicit skip is about to kill.
    pub fn arm( &mut self, session: SessionId ) {
        self.suppressed = Some( session );
    }


    /// Judges an exit. A matching suppression is consumed.
    pub fn judge( &mut self, exited: SessionId, current: Option<SessionId> ) -> ExitVerdict {
        if self.suppressed == Some( exited ) {
            self.suppressed = None;
            return ExitVerdict::Suppressed;
        }
        if current != Some( exited ) {
            return ExitVerdict::Stale;
        }
        ExitVerdict::Evaluate
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;


    fn rng() -> StdRng {
        StdRng::seed_from_u64( 7 )
    }


    #[test]
    fn test_repeat_all_wraps_back_to_start() {
        let mut rng = rng();
        for len in 1..8 {
            for start in 0..len {
                let mut index = start;
                for _ in 0..len {
                    match next_step( Binding::Queue( index ), PlaybackMode::RepeatAll, len, &mut rng ) {
                        Step::Play( next ) => index = next,
                        other => panic!( "unexpected {:?}", other ),
                    }
                }
                assert_eq!( index, start );
            }
        }
    }


    #[test]
    fn test_shuffle_never_repeats_current() {
        let mut rng = rng();
        for len in 2..10 {
            for current in 0..len {
                for _ in 0..200 {
                    let pick = shuffle_pick( current, len, &mut rng );
                    assert_ne!( pick, current );
                    assert!( pick < len );
                }
            }
        }
    }


    #[test]
    fn test_shuffle_single_track() {
        let mut rng = rng();
        assert_eq!( auto_step( 0, PlaybackMode::Shuffle, 1, &mut rng ), Step::Play( 0 ) );
    }


    #[test]
    fn test_shuffle_reaches_every_other_index() {
        let mut rng = rng();
        let mut seen = [ false; 4 ];
        for _ in 0..500 {
            seen[ shuffle_pick( 1, 4, &mut rng ) ] = true;
        }
        assert_eq!( seen, [ true, false, true, true ] );
    }


    #[test]
    fn test_normal_stops_at_end() {
        let mut rng = rng();
        assert_eq!( next_step( Binding::Queue( 1 ), PlaybackMode::Normal, 3, &mut rng ), Step::Play( 2 ) );
        assert_eq!(
            next_step( Binding::Queue( 2 ), PlaybackMode::Normal, 3, &mut rng ),
            Step::Halt( Boundary::QueueFinished )
        );
    }


    #[test]
    fn test_repeat_one_replays() {
        let mut rng = rng();
        assert_eq!( auto_step( 0, PlaybackMode::RepeatOne, 1, &mut rng ), Step::Play( 0 ) );
        assert_eq!( next_step( Binding::Queue( 2 ), PlaybackMode::RepeatOne, 4, &mut rng ), Step::Play( 2 ) );
    }


    #[test]
    fn test_empty_queue_is_reported() {
        let mut rng = rng();
        for mode in [ PlaybackMode::Normal, PlaybackMode::RepeatOne, PlaybackMode::RepeatAll, PlaybackMode::Shuffle ] {
            assert_eq!( next_step( Binding::Direct, mode, 0, &mut rng ), Step::Halt( Boundary::QueueEmpty ) );
            assert_eq!( previous_step( Binding::Queue( 0 ), mode, 0 ), Step::Halt( Boundary::QueueEmpty ) );
            assert_eq!( auto_step( 0, mode, 0, &mut rng ), Step::Halt( Boundary::QueueEmpty ) );
        }
    }


    #[test]
    fn test_direct_play_enters_queue() {
        let mut rng = rng();
        assert_eq!( next_step( Binding::Direct, PlaybackMode::Normal, 2, &mut rng ), Step::Play( 0 ) );
        assert_eq!( previous_step( Binding::Direct, PlaybackMode::Normal, 2 ), Step::Play( 1 ) );
    }


    #[test]
    fn test_idle_reports_nothing_playing() {
        let mut rng = rng();
        assert_eq!(
            next_step( Binding::Idle, PlaybackMode::Normal, 3, &mut rng ),
            Step::Halt( Boundary::NothingPlaying )
        );
        assert_eq!( previous_step( Binding::Idle, PlaybackMode::Normal, 3 ), Step::Halt( Boundary::NothingPlaying ) );
    }


    #[test]
    fn test_previous_rules() {
        assert_eq!( previous_step( Binding::Queue( 2 ), PlaybackMode::Normal, 3 ), Step::Play( 1 ) );
        assert_eq!(
            previous_step( Binding::Queue( 0 ), PlaybackMode::Normal, 3 ),
            Step::Halt( Boundary::AlreadyAtFirst )
        );
        assert_eq!( previous_step( Binding::Queue( 0 ), PlaybackMode::RepeatAll, 3 ), Step::Play( 2 ) );
        assert_eq!( previous_step( Binding::Queue( 1 ), PlaybackMode::Shuffle, 3 ), Step::Play( 1 ) );
        assert_eq!( previous_step( Binding::Queue( 1 ), PlaybackMode::RepeatOne, 3 ), Step::Play( 1 ) );
    }


    #[test]
    fn test_skip_guard_consumes_matching_exit() {
        let mut guard = SkipGuard::default();
        let old = SessionId::from_raw( 1 );
        let new = SessionId::from_raw( 2 );

        guard.arm( old );

        assert_eq!( guard.judge( old, Some( new ) ), ExitVerdict::Suppressed );
        assert_eq!( guard.judge( old, Some( new ) ), ExitVerdict::Stale );
        // The replacement's own natural end is evaluated normally.
        assert_eq!( guard.judge( new, Some( new ) ), ExitVerdict::Evaluate );
    }


    #[test]
    fn test_skip_guard_flags_stale_exit() {
        let mut guard = SkipGuard::default();
        let old = SessionId::from_raw( 1 );
        let new = SessionId::from_raw( 2 );

        assert_eq!( guard.judge( old, Some( new ) ), ExitVerdict::Stale );
        assert_eq!( guard.judge( old, None ), ExitVerdict::Stale );
    }
}
