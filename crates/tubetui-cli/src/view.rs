//! Panes of the TUI.


/// Pane that owns the main area and the cursor keys.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum ViewMode {
    /// Search results, one page at a time.
    #[default]
    Results,

    /// The play queue.
    Queue,

    /// Thumbnail and metadata for the selected entry.
    Details,

    /// Key and command reference overlay.
    Help,
}


impl ViewMode {
    /// Next pane in tab order. Help stays until dismissed.
    pub fn next_tab( self ) -> Self {
        match self {
            ViewMode::Results => ViewMode::Queue,
            ViewMode::Queue => ViewMode::Details,
            ViewMode::Details => ViewMode::Results,
            ViewMode::Help => ViewMode::Help,
        }
    }


    pub fn prev_tab( self ) -> Self {
        match self {
            ViewMode::Results => ViewMode::Details,
            ViewMode::Queue => ViewMode::Results,
            ViewMode::Details => ViewMode::Queue,
            ViewMode::Help => ViewMode::Help,
        }
    }


    pub fn title( self ) -> &'static str {
        match self {
            ViewMode::Results => "Results",
            ViewMode::Queue => "Queue",
            ViewMode::Details => "Details",
            ViewMode::Help => "Help",
        }
    }


    /// Panes listed in the header.
    pub const TABS: [ ViewMode; 3 ] = [ ViewMode::Results, ViewMode::Queue, ViewMode::Details ];
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_tabs_cycle_both_ways() {
        let mut view = ViewMode::Results;
        for _ in 0..3 {
            view = view.next_tab();
        }
        assert_eq!( view, ViewMode::Results );
        assert_eq!( ViewMode::Results.prev_tab(), ViewMode::Details );
        assert_eq!( ViewMode::Help.next_tab(), ViewMode::Help );
    }
}
