//! Image service HTTP access
//!
//! This module provides the HTTP client abstraction shared by the metadata
//! resolvers and the tile fetcher.
//!
//! ```ignore
//! use iiifstitch::provider::{AsyncHttpClient, AsyncReqwestClient};
//!
//! let client = AsyncReqwestClient::new()?;
//! let body = client.get("https://www.artic.edu/iiif/2/abc/info.json").await?;
//! ```

mod http;
mod types;

pub use http::{
    parse_retry_after, AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::{MockAsyncHttpClient, ScriptedHttpClient};
