//! Search results as shown in the results pane.
//!
//! Holds the last query, its tracks, the page window over them and any
//! full metadata fetched for individual entries since the query ran.

use std::collections::HashMap;
use std::ops::Range;

use tubetui_core::{ Page, Track };


#[derive( Debug )]
pub struct ResultList {
    term: String,
    tracks: Vec<Track>,
    page: Page,
    lookups: HashMap<String, Track>,
}


impl ResultList {
    pub fn new( items_per_page: usize ) -> Self {
        Self {
            term: String::new(),
            tracks: Vec::new(),
            page: Page::new( items_per_page ),
            lookups: HashMap::new(),
        }
    }


    /// Replaces the results with a fresh query's, back on the first page.
    pub fn replace( &mut self, term: String, tracks: Vec<Track> ) {
        self.term = term;
        self.tracks = tracks;
        self.lookups.clear();
        self.page.set_total_items( self.tracks.len() );
        self.page.reset();
    }


    /// Restores saved results and returns the cursor within the restored page.
    ///
    /// @param cursor - selected result across all pages
    pub fn restore( &mut self, term: String, tracks: Vec<Track>, page: usize, cursor: usize ) -> Option<usize> {
        self.replace( term, tracks );
        if self.tracks.is_empty() {
            self.page.set_page( page );
            return None;
        }

        let cursor = cursor.min( self.tracks.len() - 1 );
        self.page.set_page( self.page.page_of( cursor ) );
        Some( cursor - self.page.page_items().start )
    }


    pub fn term( &self ) -> &str {
        &self.term
    }


    pub fn tracks( &self ) -> &[Track] {
        &self.tracks
    }


    pub fn is_empty( &self ) -> bool {
        self.tracks.is_empty()
    }


    pub fn page( &self ) -> &Page {
        &self.page
    }


    pub fn page_mut( &mut self ) -> &mut Page {
        &mut self.page
    }


    pub fn page_items( &self ) -> Range<usize> {
        self.page.page_items()
    }


    pub fn on_page( &self ) -> &[Track] {
        &self.tracks[ self.page.page_items() ]
    }


    /// Absolute index of row `row` on the current page, if it exists.
    pub fn absolute( &self, row: usize ) -> Option<usize> {
        let range = self.page.page_items();
        Some( range.start + row ).filter( |i| range.contains( i ) )
    }


    pub fn get( &self, index: usize ) -> Option<&Track> {
        self.tracks.get( index )
    }


    pub fn record_lookup( &mut self, url: String, track: Track ) {
        self.lookups.insert( url, track );
    }


    pub fn has_lookup( &self, url: &str ) -> bool {
        self.lookups.contains_key( url )
    }


    /// The fetched metadata for `track`, or the track as listed.
    pub fn detailed( &self, track: Track ) -> Track {
        self.lookups.get( &track.url ).cloned().unwrap_or( track )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn tracks( n: usize ) -> Vec<Track> {
        ( 0..n ).map( |i| Track::new( format!( "t{}", i ), format!( "https://example.com/{}", i ) ) ).collect()
    }


    #[test]
    fn test_new_query_forgets_fetched_details() {
        let mut list = ResultList::new( 10 );
        list.replace( "first".into(), tracks( 3 ) );
        let mut full = Track::new( "t1", "https://example.com/1" );
        full.description = "long text".into();
        list.record_lookup( full.url.clone(), full );
        assert!( list.has_lookup( "https://example.com/1" ) );

        list.replace( "second".into(), tracks( 3 ) );

        assert!( !list.has_lookup( "https://example.com/1" ) );
        assert!( list.detailed( tracks( 2 ).remove( 1 ) ).description.is_empty() );
    }


    #[test]
    fn test_restore_finds_the_cursor_page() {
        let mut list = ResultList::new( 4 );

        let row = list.restore( "q".into(), tracks( 10 ), 0, 9 );

        assert_eq!( list.page().current_page(), 2 );
        assert_eq!( row, Some( 1 ) );
        assert_eq!( list.absolute( 1 ), Some( 9 ) );
        assert_eq!( list.absolute( 2 ), None );
        assert_eq!( list.on_page().len(), 2 );
    }


    #[test]
    fn test_restore_clamps_a_cursor_past_the_end() {
        let mut list = ResultList::new( 4 );
        assert_eq!( list.restore( "q".into(), tracks( 5 ), 0, 40 ), Some( 0 ) );
        assert_eq!( list.page().current_page(), 1 );
        assert_eq!( list.restore( "q".into(), Vec::new(), 3, 0 ), None );
    }
}
