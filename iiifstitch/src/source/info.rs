//! IIIF `info.json` resolver.
//!
//! Reads the service resolution and tile limits from the image's metadata
//! document. Both Image API 2 (`profile: [uri, {formats, maxWidth, ...}]`)
//! and Image API 3 (top-level `maxWidth`/`extraFormats`) layouts are read.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::error::ResolveError;
use super::types::ImageSource;
use super::Resolver;
use crate::config::DEFAULT_TILE_EDGE;
use crate::provider::AsyncHttpClient;

/// Tile format requested unless the template names another.
pub const DEFAULT_TILE_FORMAT: &str = "jpg";

#[derive(Debug, Deserialize)]
struct InfoDocument {
    width: u32,
    height: u32,
    #[serde(default)]
    tiles: Vec<TileInfo>,
    #[serde(default)]
    profile: Value,
    #[serde(rename = "maxWidth")]
    max_width: Option<u64>,
    #[serde(rename = "maxHeight")]
    max_height: Option<u64>,
    #[serde(rename = "extraFormats", default)]
    extra_formats: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TileInfo {
    width: u32,
    height: Option<u32>,
}

/// Limits and formats gathered from the document.
#[derive(Debug, Default, PartialEq)]
struct ServiceLimits {
    tile_edge: Option<u32>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    formats: Vec<String>,
}

impl InfoDocument {
    fn limits(&self) -> ServiceLimits {
        let mut limits = ServiceLimits {
            tile_edge: self
                .tiles
                .first()
                .map(|t| t.height.map_or(t.width, |h| h.min(t.width))),
            max_width: self.max_width.and_then(|v| u32::try_from(v).ok()),
            max_height: self.max_height.and_then(|v| u32::try_from(v).ok()),
            formats: self.extra_formats.clone(),
        };

        // Image API 2 puts the capabilities in the profile array.
        if let Value::Array(entries) = &self.profile {
            for entry in entries.iter().filter_map(Value::as_object) {
                if let Some(formats) = entry.get("formats").and_then(Value::as_array) {
                    limits
                        .formats
                        .extend(formats.iter().filter_map(Value::as_str).map(str::to_string));
                }
                let number = |key: &str| {
                    entry
                        .get(key)
                        .and_then(Value::as_u64)
                        .and_then(|v| u32::try_from(v).ok())
                };
                limits.max_width = limits.max_width.or_else(|| number("maxWidth"));
                limits.max_height = limits.max_height.or_else(|| number("maxHeight"));
            }
        }
        limits
    }
}

/// Split an IIIF image base URL into `(base_url, identifier)`.
///
/// Accepts a trailing slash or a trailing `/info.json`.
pub fn split_iiif_base(reference: &str) -> Option<(&str, &str)> {
    let trimmed = reference.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/info.json").unwrap_or(trimmed);
    let (base, identifier) = trimmed.rsplit_once('/')?;
    if identifier.is_empty() || base.is_empty() || base.ends_with(':') || base.ends_with('/') {
        return None;
    }
    Some((base, identifier))
}

/// Resolver reading an IIIF image's `info.json`.
///
/// # Example
///
/// ```ignore
/// use iiifstitch::provider::AsyncReqwestClient;
/// use iiifstitch::source::{IiifInfoResolver, Resolver};
///
/// let resolver = IiifInfoResolver::new(AsyncReqwestClient::new()?);
/// let source = resolver
///     .resolve("https://www.artic.edu/iiif/2/831a05de-d3f6-f4fa-a460-23008dd58dda")
///     .await?;
/// ```
#[derive(Clone)]
pub struct IiifInfoResolver<C: AsyncHttpClient> {
    client: C,
    default_tile_edge: u32,
    format: String,
}

impl<C: AsyncHttpClient> IiifInfoResolver<C> {
    /// Create a resolver with the default tile edge fallback.
    pub fn new(client: C) -> Self {
        Self {
            client,
            default_tile_edge: DEFAULT_TILE_EDGE,
            format: DEFAULT_TILE_FORMAT.to_string(),
        }
    }

    /// Tile edge used when the document advertises no tiles.
    pub fn with_default_tile_edge(mut self, edge: u32) -> Self {
        self.default_tile_edge = edge.max(1);
        self
    }

    /// Tile format the service must offer.
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    fn parse(&self, reference: &str, body: &[u8]) -> Result<ImageSource, ResolveError> {
        let (base, identifier) = split_iiif_base(reference)
            .ok_or_else(|| ResolveError::resolution(reference, "not an IIIF image URL"))?;

        let doc: InfoDocument = serde_json::from_slice(body).map_err(|e| {
            ResolveError::resolution(reference, format!("malformed info.json: {}", e))
        })?;
        if doc.width == 0 || doc.height == 0 {
            return Err(ResolveError::resolution(
                reference,
                format!("info.json reports {}x{}", doc.width, doc.height),
            ));
        }

        let limits = doc.limits();
        debug!(?limits, "Parsed service limits");

        if !limits.formats.is_empty()
            && !limits.formats.iter().any(|f| f.eq_ignore_ascii_case(&self.format))
        {
            return Err(ResolveError::UnsupportedFormat {
                reference: reference.to_string(),
                offered: limits.formats.join(", "),
            });
        }

        let tile_edge = [
            limits.tile_edge.unwrap_or(self.default_tile_edge),
            limits.max_width.unwrap_or(u32::MAX),
            limits.max_height.unwrap_or(u32::MAX),
        ]
        .into_iter()
        .min()
        .unwrap_or(self.default_tile_edge)
        .max(1);

        info!(
            identifier,
            width = doc.width,
            height = doc.height,
            tile_edge,
            formats = ?limits.formats,
            "Resolved IIIF image"
        );

        Ok(ImageSource::new(identifier, base, doc.width, doc.height, tile_edge))
    }
}

impl<C: AsyncHttpClient> Resolver for IiifInfoResolver<C> {
    async fn resolve(&self, reference: &str) -> Result<ImageSource, ResolveError> {
        let (base, identifier) = split_iiif_base(reference)
            .ok_or_else(|| ResolveError::resolution(reference, "not an IIIF image URL"))?;
        let url = format!("{}/{}/info.json", base, identifier);
        let body = self.client.get(&url).await?;
        self.parse(reference, &body)
    }
}
