//! Artwork page resolver.
//!
//! Collection pages expose the IIIF image behind gallery buttons carrying
//! `data-gallery-img-*` attributes:
//!
//! ```text
//! <button data-gallery-img-iiifid="https://www.artic.edu/iiif/2/831a05de-..."
//!         data-gallery-img-width="10817"
//!         data-gallery-img-height="8540"
//!         data-gallery-img-download-name="the-bedroom">
//! ```
//!
//! The last such element is the full image. Its dimensions cap the output;
//! tile limits come from the image's `info.json`.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use super::error::ResolveError;
use super::info::IiifInfoResolver;
use super::types::ImageSource;
use super::Resolver;
use crate::provider::AsyncHttpClient;

/// Matches an opening tag that carries `data-gallery-img-iiifid`.
fn gallery_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)<[a-zA-Z][^>]*\bdata-gallery-img-iiifid\s*=\s*"[^"]*"[^>]*>"#).unwrap()
    })
}

/// Captures `(name, value)` of each `data-gallery-img-*` attribute.
fn data_attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\bdata-gallery-img-([a-z-]+)\s*=\s*"([^"]*)""#).unwrap())
}

/// Gallery attributes extracted from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub iiif_id: String,
    pub width: u32,
    pub height: u32,
    pub download_name: Option<String>,
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Find the last gallery element in `html` and read its attributes.
pub fn extract_gallery_image(reference: &str, html: &str) -> Result<GalleryImage, ResolveError> {
    let tag = gallery_tag_pattern()
        .find_iter(html)
        .last()
        .ok_or_else(|| ResolveError::resolution(reference, "no gallery image on page"))?;

    let attributes: HashMap<&str, String> = data_attribute_pattern()
        .captures_iter(tag.as_str())
        .filter_map(|c| Some((c.get(1)?.as_str(), unescape(c.get(2)?.as_str()))))
        .collect();

    let dimension = |key: &str| -> Result<u32, ResolveError> {
        let raw = attributes.get(key).ok_or_else(|| {
            ResolveError::resolution(reference, format!("missing data-gallery-img-{}", key))
        })?;
        match raw.trim().parse::<u32>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(ResolveError::resolution(
                reference,
                format!("invalid data-gallery-img-{} '{}'", key, raw),
            )),
        }
    };

    let iiif_id = attributes
        .get("iiifid")
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ResolveError::resolution(reference, "empty data-gallery-img-iiifid"))?;

    Ok(GalleryImage {
        iiif_id,
        width: dimension("width")?,
        height: dimension("height")?,
        download_name: attributes.get("download-name").cloned(),
    })
}

/// Resolver for artwork pages embedding a gallery button.
pub struct PageResolver<C: AsyncHttpClient + Clone> {
    client: C,
    info: IiifInfoResolver<C>,
}

impl<C: AsyncHttpClient + Clone> PageResolver<C> {
    pub fn new(client: C) -> Self {
        Self {
            info: IiifInfoResolver::new(client.clone()),
            client,
        }
    }

    /// Use a preconfigured info resolver for the second hop.
    pub fn with_info_resolver(mut self, info: IiifInfoResolver<C>) -> Self {
        self.info = info;
        self
    }
}

impl<C: AsyncHttpClient + Clone> Resolver for PageResolver<C> {
    async fn resolve(&self, reference: &str) -> Result<ImageSource, ResolveError> {
        let body = self.client.get(reference).await?;
        let html = String::from_utf8_lossy(&body);
        let gallery = extract_gallery_image(reference, &html)?;

        info!(
            iiif_id = %gallery.iiif_id,
            width = gallery.width,
            height = gallery.height,
            download_name = ?gallery.download_name,
            "Found gallery image on page"
        );

        let source = self
            .info
            .resolve(&gallery.iiif_id)
            .await?
            .with_output_size(gallery.width, gallery.height);

        Ok(match gallery.download_name {
            Some(name) => source.with_download_name(name),
            None => source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ScriptedHttpClient;
    use std::sync::Arc;

    const PAGE: &str = "https://www.artic.edu/artworks/28560/the-bedroom";
    const IIIF: &str = "https://www.artic.edu/iiif/2/831a05de";

    fn page_html() -> String {
        format!(
            r#"<html><body>
            <button class="btn" data-gallery-img-iiifid="{iiif}"
                data-gallery-img-width="843" data-gallery-img-height="666"
                data-gallery-img-download-name="thumb">small</button>
            <button class="btn"
                data-gallery-img-iiifid="{iiif}"
                data-gallery-img-width="3000"
                data-gallery-img-height="2368"
                data-gallery-img-download-name="the-bedroom &amp; chair">Download</button>
            </body></html>"#,
            iiif = IIIF
        )
    }

    #[test]
    fn test_extract_last_gallery_image() {
        let gallery = extract_gallery_image(PAGE, &page_html()).unwrap();
        assert_eq!(gallery.iiif_id, IIIF);
        assert_eq!(gallery.width, 3000);
        assert_eq!(gallery.height, 2368);
        assert_eq!(gallery.download_name.as_deref(), Some("the-bedroom & chair"));
    }

    #[test]
    fn test_extract_without_gallery() {
        let err = extract_gallery_image(PAGE, "<html><button>x</button></html>").unwrap_err();
        assert!(err.to_string().contains("no gallery image"));
    }

    #[test]
    fn test_extract_missing_height() {
        let html = r#"<button data-gallery-img-iiifid="x/y" data-gallery-img-width="5">"#;
        let err = extract_gallery_image(PAGE, html).unwrap_err();
        assert!(err.to_string().contains("missing data-gallery-img-height"));
    }

    #[test]
    fn test_extract_invalid_width() {
        let html = r#"<button data-gallery-img-iiifid="x/y" data-gallery-img-width="wide"
            data-gallery-img-height="5">"#;
        let err = extract_gallery_image(PAGE, html).unwrap_err();
        assert!(err.to_string().contains("invalid data-gallery-img-width"));
    }

    #[tokio::test]
    async fn test_page_resolver_caps_to_page_size() {
        let info = r#"{"width": 6000, "height": 4736, "tiles": [{"width": 512}]}"#;
        let client = Arc::new(
            ScriptedHttpClient::new()
                .route(PAGE, Ok(page_html().into_bytes()))
                .route(&format!("{}/info.json", IIIF), Ok(info.into())),
        );

        let source = PageResolver::new(client).resolve(PAGE).await.unwrap();
        assert_eq!(source.identifier(), "831a05de");
        assert_eq!(source.native_width(), 3000);
        assert_eq!(source.native_height(), 2368);
        assert_eq!(source.full_width(), 6000);
        assert_eq!(source.max_tile_edge(), 512);
        assert_eq!(source.suggested_filename(), "the-bedroom & chair.jpg");
    }
}
