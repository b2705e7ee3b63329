//! Paging over search results

use std::ops::Range;


/// Page window over a list of `total_items`.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct Page {
    items_per_page: usize,
    current_page: usize,
    total_items: usize,
}


impl Page {
    /// Creates a pager. `items_per_page` is clamped to at least 1.
    pub fn new( items_per_page: usize ) -> Self {
        Self {
            items_per_page: items_per_page.max( 1 ),
            current_page: 0,
            total_items: 0,
        }
    }


    pub fn items_per_page( &self ) -> usize {
        self.items_per_page
    }


    pub fn current_page( &self ) -> usize {
        self.current_page
    }


    pub fn total_items( &self ) -> usize {
        self.total_items
    }


    pub fn total_pages( &self ) -> usize {
        self.total_items.div_ceil( self.items_per_page )
    }


    /// Updates the item count, pulling the current page back into range.
    pub fn set_total_items( &mut self, total: usize ) {
        self.total_items = total;
        self.current_page = self.current_page.min( self.total_pages().saturating_sub( 1 ) );
    }


    /// Jumps to `page`, clamped to the last page.
    pub fn set_page( &mut self, page: usize ) {
        self.current_page = page.min( self.total_pages().saturating_sub( 1 ) );
    }


    /// @returns true if the page changed
    pub fn next_page( &mut self ) -> bool {
        if self.current_page + 1 < self.total_pages() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }


    /// @returns true if the page changed
    pub fn prev_page( &mut self ) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }


    /// Indices of the items on the current page.
    pub fn page_items( &self ) -> Range<usize> {
        let start = ( self.current_page * self.items_per_page ).min( self.total_items );
        let end = ( start + self.items_per_page ).min( self.total_items );
        start..end
    }


    pub fn reset( &mut self ) {
        self.current_page = 0;
    }


    /// Page containing item `index`.
    pub fn page_of( &self, index: usize ) -> usize {
        index / self.items_per_page
    }

}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_last_page_is_partial() {
        let mut page = Page::new( 10 );
        page.set_total_items( 25 );

        assert_eq!( page.total_pages(), 3 );
        assert_eq!( page.page_of( 2 ), 2 );
        assert!( page.next_page() );
        assert!( page.next_page() );
        assert_eq!( page.current_page(), 2 );
        assert_eq!( page.page_items(), 20..25 );
        assert!( !page.next_page() );
    }


    #[test]
    fn test_empty_has_no_pages() {
        let mut page = Page::new( 10 );
        page.set_total_items( 0 );
        assert_eq!( page.total_pages(), 0 );
        assert_eq!( page.page_items(), 0..0 );
        assert!( !page.next_page() );
        assert!( !page.prev_page() );
    }


    #[test]
    fn test_shrinking_clamps_page() {
        let mut page = Page::new( 10 );
        page.set_total_items( 40 );
        page.set_page( 3 );
        page.set_total_items( 15 );
        assert_eq!( page.current_page(), 1 );
        assert_eq!( page.page_items(), 10..15 );
    }


    #[test]
    fn test_zero_per_page_is_clamped() {
        let mut page = Page::new( 0 );
        page.set_total_items( 3 );
        assert_eq!( page.items_per_page(), 1 );
        assert_eq!( page.total_pages(), 3 );
    }
}
