//! Resource identity and fetch results.
//!
//! A [`Resource`] is what a caller asks for: a kind plus the URL as written in
//! the style. A [`Response`] is what every caller waiting on the same
//! normalized URL receives, shared behind an `Arc`.

mod response;

pub use response::{Response, ResponseStatus, EMPTY_BODY_MESSAGE};

use std::fmt;

/// Kind of resource being requested.
///
/// The kind decides which managed-hosting rewrite applies during URL
/// normalization. Two resources with the same raw URL but different kinds can
/// normalize to different URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Map style document
    Style,
    /// Vector or raster source (TileJSON)
    Source,
    /// Individual tile
    Tile,
    /// Glyph range (PBF)
    Glyphs,
    /// Sprite sheet image
    SpriteImage,
    /// Sprite sheet metadata
    SpriteJson,
    /// Anything else; never rewritten
    Other,
}

impl ResourceKind {
    /// All kinds, in declaration order.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Style,
        ResourceKind::Source,
        ResourceKind::Tile,
        ResourceKind::Glyphs,
        ResourceKind::SpriteImage,
        ResourceKind::SpriteJson,
        ResourceKind::Other,
    ];

    /// Short lowercase name used in logs and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Style => "style",
            ResourceKind::Source => "source",
            ResourceKind::Tile => "tile",
            ResourceKind::Glyphs => "glyphs",
            ResourceKind::SpriteImage => "sprite-image",
            ResourceKind::SpriteJson => "sprite-json",
            ResourceKind::Other => "other",
        }
    }

    /// Returns true if managed-hosting URLs of this kind receive an access token.
    pub fn is_managed(&self) -> bool {
        !matches!(self, ResourceKind::Tile | ResourceKind::Other)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown resource kind '{}' (expected one of: style, source, tile, glyphs, sprite-image, sprite-json, other)",
                    s
                )
            })
    }
}

/// A fetchable resource: a kind plus the URL as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resource {
    pub kind: ResourceKind,
    pub url: String,
}

impl Resource {
    /// Creates a resource of the given kind.
    pub fn new(kind: ResourceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }

    pub fn style(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Style, url)
    }

    pub fn source(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Source, url)
    }

    pub fn tile(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Tile, url)
    }

    pub fn glyphs(url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Glyphs, url)
    }
}
