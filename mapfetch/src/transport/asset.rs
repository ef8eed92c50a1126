//! The `asset://` virtual scheme.
//!
//! Asset URLs name files relative to the process working directory. They are
//! only rewritten when a transfer is dispatched, so the coalescing and cache
//! key keeps the `asset://` form.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use url::Url;

pub const ASSET_SCHEME: &str = "asset://";

/// Rewrite `asset://{host}{path}` to `file://{cwd}/{host}{path}`.
///
/// Query and fragment are dropped and percent escapes in the host and path
/// are decoded before the file URL is built. Any other URL, or an asset URL
/// that does not parse, is returned unchanged.
pub fn resolve_asset_url(url: &str) -> Cow<'_, str> {
    if !url.starts_with(ASSET_SCHEME) {
        return Cow::Borrowed(url);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_asset_url_in(&cwd, url)
}

/// Same as [`resolve_asset_url`] with an explicit base directory.
pub fn resolve_asset_url_in<'a>(base: &Path, url: &'a str) -> Cow<'a, str> {
    if !url.starts_with(ASSET_SCHEME) {
        return Cow::Borrowed(url);
    }
    let Ok(parsed) = Url::parse(url) else {
        return Cow::Borrowed(url);
    };

    let relative = format!("{}{}", parsed.host_str().unwrap_or(""), parsed.path());
    let decoded = percent_decode_str(&relative).decode_utf8_lossy();
    let path = base.join(decoded.trim_start_matches('/'));

    match Url::from_file_path(&path) {
        Ok(file_url) => Cow::Owned(file_url.to_string()),
        Err(()) => Cow::Borrowed(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_rewritten_against_base() {
        let resolved = resolve_asset_url_in(Path::new("/opt/app"), "asset://styles/local.json");
        assert_eq!(resolved, "file:///opt/app/styles/local.json");
    }

    #[test]
    fn test_trailing_slash_on_base() {
        let resolved = resolve_asset_url_in(Path::new("/opt/app/"), "asset://a/b.png");
        assert_eq!(resolved, "file:///opt/app/a/b.png");
    }

    #[test]
    fn test_other_schemes_unchanged() {
        for url in ["https://example.com/a", "file:///tmp/x", "mapbox://styles/u/s", ""] {
            assert!(matches!(resolve_asset_url(url), Cow::Borrowed(u) if u == url));
        }
    }

    #[test]
    fn test_query_and_fragment_dropped() {
        let resolved =
            resolve_asset_url_in(Path::new("/opt/app"), "asset://styles/local.json?v=2#top");
        assert_eq!(resolved, "file:///opt/app/styles/local.json");
    }

    #[test]
    fn test_percent_escapes_name_the_decoded_file() {
        let resolved = resolve_asset_url_in(Path::new("/opt/app"), "asset://styles/my%20style.json");
        let path = Url::parse(&resolved).unwrap().to_file_path().unwrap();
        assert_eq!(path, Path::new("/opt/app/styles/my style.json"));
    }

    #[test]
    fn test_unparseable_asset_url_unchanged() {
        let url = "asset://bad host/x.json";
        assert!(matches!(
            resolve_asset_url_in(Path::new("/opt/app"), url),
            Cow::Borrowed(u) if u == url
        ));
    }

    #[test]
    fn test_uses_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        let resolved = resolve_asset_url("asset://x/y.json");
        let expected = Url::from_file_path(cwd.join("x/y.json")).unwrap();
        assert_eq!(resolved, expected.as_str());
    }
}
