//! Metadata resolution
//!
//! Turns a reference (an artwork page URL or an IIIF image URL) into an
//! [`ImageSource`]: identifier, output resolution and tile-size limit.
//!
//! ```text
//! page URL ──► PageResolver ──┐
//!                             ├──► IiifInfoResolver ──► ImageSource
//! IIIF URL ───────────────────┘      (info.json)
//! ```
//!
//! The rest of the crate only depends on the [`Resolver`] trait, so tests
//! can substitute a fixed source.

mod error;
mod info;
mod page;
mod types;

use std::future::Future;

pub use error::ResolveError;
pub use info::{split_iiif_base, IiifInfoResolver, DEFAULT_TILE_FORMAT};
pub use page::{extract_gallery_image, GalleryImage, PageResolver};
pub use types::{ImageSource, OUTPUT_EXTENSION};

use crate::config::DownloadConfig;
use crate::provider::AsyncHttpClient;

/// Resolves a reference string into an image source.
pub trait Resolver: Send + Sync {
    /// Resolve `reference`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Resolution`] if the identifier or dimensions cannot be found
    /// - [`ResolveError::UnsupportedFormat`] if the service lacks the supported format
    /// - [`ResolveError::Http`] if a metadata fetch failed
    fn resolve(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<ImageSource, ResolveError>> + Send;
}

/// True when `reference` points straight at an IIIF image service.
pub fn is_iiif_reference(reference: &str) -> bool {
    reference.contains("/iiif/")
}

/// Resolver that dispatches on the shape of the reference.
///
/// IIIF image URLs go straight to `info.json`; anything else is treated as
/// an artwork page.
pub struct SourceResolver<C: AsyncHttpClient + Clone> {
    info: IiifInfoResolver<C>,
    page: PageResolver<C>,
}

impl<C: AsyncHttpClient + Clone> SourceResolver<C> {
    pub fn new(client: C) -> Self {
        Self::from_config(client, &DownloadConfig::default())
    }

    /// Create a resolver using the tile edge fallback and request format
    /// of `config`.
    pub fn from_config(client: C, config: &DownloadConfig) -> Self {
        let info = IiifInfoResolver::new(client.clone())
            .with_default_tile_edge(config.default_tile_edge())
            .with_format(&config.template().format);
        Self {
            page: PageResolver::new(client).with_info_resolver(info.clone()),
            info,
        }
    }
}

impl<C: AsyncHttpClient + Clone> Resolver for SourceResolver<C> {
    async fn resolve(&self, reference: &str) -> Result<ImageSource, ResolveError> {
        if is_iiif_reference(reference) {
            self.info.resolve(reference).await
        } else {
            self.page.resolve(reference).await
        }
    }
}
