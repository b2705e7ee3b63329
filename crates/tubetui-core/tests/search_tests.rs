//! Integration tests for search dispatch against a recording yt-dlp stand-in

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tubetui_core::Searcher;


/// Writes a yt-dlp stand-in that logs its arguments and prints one entry.
fn fake_ytdlp( dir: &Path ) -> String {
    let script = dir.join( "yt-dlp" );
    fs::write(
        &script,
        "#!/bin/sh\nprintf '%s\\n' \"$*\" >> \"$0.args\"\necho '{\"id\":\"abc\",\"title\":\"From fake\"}'\n",
    )
    .unwrap();
    fs::set_permissions( &script, fs::Permissions::from_mode( 0o755 ) ).unwrap();
    script.to_string_lossy().into_owned()
}


#[tokio::test]
async fn test_pasted_urls_skip_text_search() {
    let dir = tempfile::tempdir().unwrap();
    let searcher = Searcher::new( fake_ytdlp( dir.path() ), 30 );

    let listed = searcher.search( "https://www.youtube.com/playlist?list=PLxyz" ).await.unwrap();
    let single = searcher.search( "https://youtu.be/abc" ).await.unwrap();
    let text = searcher.search( "lofi beats" ).await.unwrap();

    assert_eq!( listed[ 0 ].title, "From fake" );
    assert_eq!( single.len(), 1 );
    assert_eq!( text.len(), 1 );

    let args = fs::read_to_string( dir.path().join( "yt-dlp.args" ) ).unwrap();
    let calls: Vec<&str> = args.lines().collect();
    assert_eq!( calls, vec![
        "-j --no-warnings --flat-playlist https://www.youtube.com/playlist?list=PLxyz",
        "-j --no-warnings --skip-download https://youtu.be/abc",
        "-j --no-warnings --flat-playlist ytsearch30:lofi beats",
    ]);
}
