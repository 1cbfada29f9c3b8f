//! Browser assets bundled with the lrs live-reload server.
//!
//! The livereload client script is compiled into the binary via `rust-embed`
//! so the server works from any directory.

use std::borrow::Cow;

/// Embedded client assets.
#[derive(rust_embed::RustEmbed)]
#[folder = "assets"]
struct Assets;

/// Name of the bundled livereload client.
pub const LIVERELOAD_JS: &str = "livereload.js";

/// Get a bundled asset by name.
///
/// Returns the file contents if the asset exists, `None` otherwise.
pub fn get(path: &str) -> Option<Cow<'static, [u8]>> {
    Assets::get(path).map(|f| f.data)
}

/// The livereload client served at `/livereload.js`.
pub fn livereload_js() -> Cow<'static, [u8]> {
    get(LIVERELOAD_JS).unwrap_or(Cow::Borrowed(&[]))
}

/// Return the MIME type for the given file path.
pub fn mime_for(path: &std::path::Path) -> mime_guess::Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}

/// Whether the file at `path` should get the reload script injected.
pub fn is_html(path: &std::path::Path) -> bool {
    let mime = mime_for(path);
    mime.type_() == mime_guess::mime::TEXT && mime.subtype() == mime_guess::mime::HTML
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_livereload_js_is_bundled() {
        let script = livereload_js();
        let text = std::str::from_utf8(&script).unwrap();
        assert!(text.contains("official-7"));
        assert!(text.contains("/livereload"));
    }

    #[test]
    fn test_get_nonexistent_asset() {
        assert!(get("nonexistent_file_that_does_not_exist.txt").is_none());
    }

    #[test]
    fn test_mime_for_known_types() {
        assert_eq!(mime_for(Path::new("style.css")).essence_str(), "text/css");
        assert_eq!(mime_for(Path::new("index.html")).essence_str(), "text/html");
        assert_eq!(mime_for(Path::new("image.png")).essence_str(), "image/png");
    }

    #[test]
    fn test_mime_for_unknown_type() {
        assert_eq!(
            mime_for(Path::new("file.unknown_ext_xyz")).essence_str(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Path::new("index.html")));
        assert!(is_html(Path::new("docs/page.htm")));
        assert!(!is_html(Path::new("app.js")));
        assert!(!is_html(Path::new("README")));
    }
}
