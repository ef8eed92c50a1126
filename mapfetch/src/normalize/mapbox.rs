//! Mapbox managed-hosting rewrite rules.
//!
//! `mapbox://` URLs identify resources hosted on the Mapbox API. Each resource
//! kind maps to a different API path:
//!
//! | Kind | Input | Output path |
//! |------|-------|-------------|
//! | Style | `mapbox://styles/{user}/{id}[/draft]` | `/styles/v1/{user}/{id}[/draft]` |
//! | Source | `mapbox://{mapids}` | `/v4/{mapids}.json` (plus `secure`) |
//! | Glyphs | `mapbox://fonts/{user}/{fontstack}/{range}` | `/fonts/v1/{user}/{fontstack}/{range}` |
//! | Sprite | `mapbox://sprites/{user}/{id}[/draft]{@2x}{.ext}` | `/styles/v1/{user}/{id}/[draft/]sprite{@2x}{.ext}` |
//!
//! Every rewritten URL carries `access_token={token}` unless the token is empty.
//! Inputs with too few path segments for their kind return `None` and are
//! passed through unchanged by the caller.

use url::Url;

/// Managed-hosting scheme prefix.
pub const MANAGED_SCHEME: &str = "mapbox://";

/// Default API base URL that `mapbox://` URLs are rewritten against.
pub const DEFAULT_API_BASE_URL: &str = "https://api.mapbox.com";

/// Returns true if the URL uses the managed-hosting scheme.
pub(super) fn is_managed_url(url: &str) -> bool {
    url.starts_with(MANAGED_SCHEME)
}

/// Splits the path of a `mapbox://` URL into segments, ignoring query and fragment.
///
/// The "host" (`styles`, `fonts`, `sprites`, ...) is the first segment.
fn pathname(url: &str) -> Vec<&str> {
    let rest = &url[MANAGED_SCHEME.len()..];
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let path = &rest[..end];
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/').collect()
}

/// Builds `{base}{path}` with the given query parameters, adding the access
/// token first when it is non-empty.
fn with_query(base: &str, path: &str, access_token: &str, extra: &[&str]) -> String {
    let mut params: Vec<String> = Vec::with_capacity(extra.len() + 1);
    if !access_token.is_empty() {
        params.push(format!("access_token={}", access_token));
    }
    params.extend(extra.iter().map(|p| p.to_string()));

    if params.is_empty() {
        format!("{}{}", base, path)
    } else {
        format!("{}{}?{}", base, path, params.join("&"))
    }
}

pub(super) fn normalize_style_url(base: &str, url: &str, access_token: &str) -> Option<String> {
    let segments = pathname(url);
    if segments.len() < 3 {
        return None;
    }

    let user = segments[1];
    let id = segments[2];
    let draft = if segments.len() > 3 { "/draft" } else { "" };

    Some(with_query(
        base,
        &format!("/styles/v1/{}/{}{}", user, id, draft),
        access_token,
        &[],
    ))
}

pub(super) fn normalize_source_url(base: &str, url: &str, access_token: &str) -> Option<String> {
    let rest = &url[MANAGED_SCHEME.len()..];
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let mapids = &rest[..end];
    if mapids.is_empty() {
        return None;
    }

    Some(with_query(
        base,
        &format!("/v4/{}.json", mapids),
        access_token,
        &["secure"],
    ))
}

pub(super) fn normalize_glyphs_url(base: &str, url: &str, access_token: &str) -> Option<String> {
    let segments = pathname(url);
    if segments.len() < 4 {
        return None;
    }

    let user = segments[1];
    let fontstack = segments[2];
    let range = segments[3];

    Some(with_query(
        base,
        &format!("/fonts/v1/{}/{}/{}", user, fontstack, range),
        access_token,
        &[],
    ))
}

pub(super) fn normalize_sprite_url(base: &str, url: &str, access_token: &str) -> Option<String> {
    let segments = pathname(url);
    if segments.len() < 3 {
        return None;
    }

    let user = segments[1];
    let is_draft = segments.len() > 3;

    // The ratio/extension suffix lives on the last segment: `id@2x.png` or `draft@2x.png`.
    let last = segments[segments.len() - 1];
    let suffix_start = last.find(['@', '.']).unwrap_or(last.len());
    let suffix = &last[suffix_start..];

    let id = if is_draft {
        segments[2]
    } else {
        &last[..suffix_start]
    };
    if id.is_empty() {
        return None;
    }

    let draft = if is_draft { "draft/" } else { "" };

    Some(with_query(
        base,
        &format!("/styles/v1/{}/{}/{}sprite{}", user, id, draft, suffix),
        access_token,
        &[],
    ))
}

/// Appends `access_token` to an `http(s)` URL's query, before any fragment.
///
/// Leaves the URL untouched when the token is empty or the query already
/// carries an access token.
pub(super) fn append_access_token(url: &str, access_token: &str) -> String {
    if access_token.is_empty() {
        return url.to_string();
    }

    let (main, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };

    let query = main.split_once('?').map(|(_, q)| q).unwrap_or("");
    if query
        .split('&')
        .any(|param| param.starts_with("access_token="))
    {
        return url.to_string();
    }

    let separator = if !main.contains('?') {
        "?"
    } else if main.ends_with('?') || main.ends_with('&') {
        ""
    } else {
        "&"
    };

    format!("{}{}access_token={}{}", main, separator, access_token, fragment)
}

/// Extracts the host of a URL with any scheme, without userinfo or port.
///
/// IPv6 literals keep their brackets. Unparseable URLs have no host.
pub(super) fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Extracts the host of an `http` or `https` URL.
pub(super) fn http_host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.scheme() {
        "http" | "https" => parsed.host_str().map(str::to_string),
        _ => None,
    }
}
