//! Stylesheet URI resolution.
//!
//! Stylesheets are referenced either by absolute URI (`file:/...`,
//! `http://...`) or by a reference relative to the document that references
//! them (the "document home"). This module resolves the latter and maps
//! `file:` URIs back onto filesystem paths. URL parsing, joining and
//! percent-decoding are done by [`url::Url`].

use std::path::{Path, PathBuf};

use url::Url;

/// Resolve a potentially relative stylesheet reference against a document home.
///
/// # Algorithm
///
/// STEP 1: If `href` is an absolute URI, return it unchanged.
///
/// STEP 2: If there is no document home, return `href` unchanged.
///
/// STEP 3: If the document home is an absolute URI, join `href` onto it
/// (RFC 3986 reference resolution).
///
/// STEP 4: Otherwise the document home is a plain path. A home ending in
/// `/` is itself the directory; any other home names a document whose
/// parent directory is used. The result is a plain path.
#[must_use]
pub fn resolve_uri(href: &str, doc_home: Option<&str>) -> String {
    // STEP 1
    if parse_absolute(href).is_some() {
        return href.to_string();
    }

    // STEP 2
    let Some(base) = doc_home else {
        return href.to_string();
    };

    // STEP 3
    if let Some(base_url) = parse_absolute(base) {
        return base_url
            .join(href)
            .map_or_else(|_| href.to_string(), String::from);
    }

    // STEP 4
    let directory_home = base.ends_with('/');
    let base_path = Path::new(base);
    if base_path.is_absolute() {
        let base_url = if directory_home {
            Url::from_directory_path(base_path)
        } else {
            Url::from_file_path(base_path)
        };
        let resolved = base_url
            .ok()
            .and_then(|url| url.join(href).ok())
            .and_then(|url| url.to_file_path().ok());
        if let Some(path) = resolved {
            return path.to_string_lossy().into_owned();
        }
    }

    // A relative home has no URL form; join lexically.
    let dir = if directory_home {
        base_path
    } else {
        base_path.parent().unwrap_or_else(|| Path::new(""))
    };
    dir.join(href).to_string_lossy().into_owned()
}

/// Map a resolved stylesheet URI onto a filesystem path.
///
/// Accepts `file:` URIs (`file:/a/b.css`, `file:///a/b.css`,
/// `file://localhost/a/b.css`), percent-decoding their path, and plain
/// paths, which are taken as they are. Returns `None` for any other scheme
/// and for `file:` URIs naming a remote host.
#[must_use]
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    match parse_absolute(uri) {
        Some(url) if url.scheme() == "file" => url.to_file_path().ok(),
        Some(_) => None,
        None => Some(PathBuf::from(uri)),
    }
}

/// Returns the scheme of `uri`, if it is an absolute URI.
#[must_use]
pub fn scheme_of(uri: &str) -> Option<&str> {
    parse_absolute(uri)
        .and(uri.split_once(':'))
        .map(|(scheme, _)| scheme)
}

/// Parse `s` as an absolute URI.
///
/// Single-letter schemes are rejected so that Windows drive letters
/// (`C:\styles\a.css`) are treated as paths.
fn parse_absolute(s: &str) -> Option<Url> {
    Url::parse(s).ok().filter(|url| url.scheme().len() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_uri_is_unchanged() {
        assert_eq!(
            resolve_uri("file:/etc/a.css", Some("file:/home/doc.easel")),
            "file:/etc/a.css"
        );
        assert_eq!(
            resolve_uri("https://example.com/a.css", None),
            "https://example.com/a.css"
        );
    }

    #[test]
    fn test_relative_to_document() {
        assert_eq!(
            resolve_uri("styles/a.css", Some("file:/home/user/drawing.easel")),
            "file:///home/user/styles/a.css"
        );
        assert_eq!(
            resolve_uri("../a.css", Some("file:///home/user/docs/drawing.easel")),
            "file:///home/user/a.css"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_relative_to_directory_home() {
        assert_eq!(
            resolve_uri("./a.css", Some("/home/user/")),
            "/home/user/a.css"
        );
        assert_eq!(
            resolve_uri("../css/a.css", Some("/home/user/docs/drawing.easel")),
            "/home/user/css/a.css"
        );
    }

    #[test]
    fn test_relative_home_joins_lexically() {
        assert_eq!(
            resolve_uri("a.css", Some("docs/drawing.easel")),
            "docs/a.css"
        );
    }

    #[test]
    fn test_no_home() {
        assert_eq!(resolve_uri("a.css", None), "a.css");
    }

    #[test]
    fn test_absolute_path_against_authority() {
        assert_eq!(
            resolve_uri("/css/a.css", Some("https://example.com/docs/x.easel")),
            "https://example.com/css/a.css"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_uri_to_path() {
        assert_eq!(uri_to_path("file:/tmp/a.css"), Some(PathBuf::from("/tmp/a.css")));
        assert_eq!(uri_to_path("file:///tmp/a.css"), Some(PathBuf::from("/tmp/a.css")));
        assert_eq!(
            uri_to_path("file://localhost/tmp/a.css"),
            Some(PathBuf::from("/tmp/a.css"))
        );
        assert_eq!(uri_to_path("tmp/a.css"), Some(PathBuf::from("tmp/a.css")));
        assert_eq!(uri_to_path("https://example.com/a.css"), None);
    }

    #[test]
    #[cfg(unix)]
    fn test_file_uri_is_percent_decoded() {
        assert_eq!(
            uri_to_path("file:///tmp/my%20styles/a.css"),
            Some(PathBuf::from("/tmp/my styles/a.css"))
        );
        let resolved = resolve_uri("theme.css", Some("file:///tmp/my%20styles/doc.easel"));
        assert_eq!(
            uri_to_path(&resolved),
            Some(PathBuf::from("/tmp/my styles/theme.css"))
        );
    }

    #[test]
    fn test_windows_drive_is_not_a_scheme() {
        assert_eq!(scheme_of("C:/styles/a.css"), None);
        assert_eq!(scheme_of("jar:file:/a!/b.css"), Some("jar"));
    }
}
