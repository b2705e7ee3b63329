//! Text entry for the command line and the search prompt.


/// Where key presses go.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum InputMode {
    /// Single-key shortcuts.
    #[default]
    Normal,

    /// Typing a slash command.
    Command,

    /// Typing a yt-dlp search query.
    Search,
}


impl InputMode {
    /// Prompt shown in front of the buffer.
    pub fn prompt( self ) -> &'static str {
        match self {
            InputMode::Normal => "",
            InputMode::Command => "/",
            InputMode::Search => "search: ",
        }
    }
}


/// Editable line with a byte-offset cursor kept on char boundaries.
#[derive( Debug, Default )]
pub struct InputBuffer {
    content: String,
    cursor: usize,
}


impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }


    /// Starts editing with `text` and the cursor at its end.
    pub fn set( &mut self, text: &str ) {
        self.content = text.to_string();
        self.cursor = self.content.len();
    }


    pub fn insert( &mut self, c: char ) {
        self.content.insert( self.cursor, c );
        self.cursor += c.len_utf8();
    }


    pub fn backspace( &mut self ) {
        if let Some( prev ) = self.prev_boundary() {
            self.content.remove( prev );
            self.cursor = prev;
        }
    }


    pub fn delete( &mut self ) {
        if self.cursor < self.content.len() {
            self.content.remove( self.cursor );
        }
    }


    /// Deletes back to the start of the previous word (Ctrl-W).
    pub fn delete_word( &mut self ) {
        let head = &self.content[ ..self.cursor ];
        let trimmed = head.trim_end();
        let start = trimmed
            .rfind( char::is_whitespace )
            .map( |i| i + 1 )
            .unwrap_or( 0 );
        self.content.replace_range( start..self.cursor, "" );
        self.cursor = start;
    }


    pub fn clear( &mut self ) {
        self.content.clear();
        self.cursor = 0;
    }


    /// Returns the trimmed content and empties the buffer.
    pub fn take( &mut self ) -> String {
        let text = self.content.trim().to_string();
        self.clear();
        text
    }


    pub fn content( &self ) -> &str {
        &self.content
    }


    /// Cursor column in characters, for placing the terminal cursor.
    pub fn cursor_char_pos( &self ) -> usize {
        self.content[ ..self.cursor ].chars().count()
    }


    pub fn move_left( &mut self ) {
        if let Some( prev ) = self.prev_boundary() {
            self.cursor = prev;
        }
    }


    pub fn move_right( &mut self ) {
        if let Some( c ) = self.content[ self.cursor.. ].chars().next() {
            self.cursor += c.len_utf8();
        }
    }


    pub fn move_home( &mut self ) {
        self.cursor = 0;
    }


    pub fn move_end( &mut self ) {
        self.cursor = self.content.len();
    }


    fn prev_boundary( &self ) -> Option<usize> {
        self.content[ ..self.cursor ].char_indices().last().map( |( i, _ )| i )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_editing_multibyte_text() {
        let mut buf = InputBuffer::new();
        for c in "añb".chars() {
            buf.insert( c );
        }
        buf.move_left();
        buf.backspace();

        assert_eq!( buf.content(), "ab" );
        assert_eq!( buf.cursor_char_pos(), 1 );

        buf.move_right();
        buf.move_right();
        assert_eq!( buf.cursor_char_pos(), 2 );
    }


    #[test]
    fn test_delete_word_and_take() {
        let mut buf = InputBuffer::new();
        buf.set( "search lofi  beats " );
        buf.delete_word();
        assert_eq!( buf.content(), "search lofi  " );

        assert_eq!( buf.take(), "search lofi" );
        assert!( buf.content().is_empty() );
    }


    #[test]
    fn test_prompts() {
        assert_eq!( InputMode::Command.prompt(), "/" );
        assert_eq!( InputMode::Search.prompt(), "search: " );
    }
}
