//! Item endpoints backing the home feed
//!
//! Wraps the three listing endpoints the feed aggregates (resume, next up,
//! suggestions) and the construction of item image URLs.

use super::JellyfinClient;
use crate::error::Result;
use crate::models::ItemsPage;
use tracing::debug;
use url::Url;

/// Image variants used by the feed cards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Wide thumbnail shown on card shelves
    Thumb,
    /// Full-bleed backdrop behind the featured banner
    Backdrop,
    /// Transparent title logo overlaid on the banner
    Logo,
}

impl ImageKind {
    /// Path segment of this image type in the Items route
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Thumb => "Thumb",
            ImageKind::Backdrop => "Backdrop",
            ImageKind::Logo => "Logo",
        }
    }

    /// Fill size requested from the server, as (width, height)
    ///
    /// The server scales and crops to these bounds, so cards can rely on
    /// a fixed aspect ratio without client-side resizing.
    pub fn fill_size(&self) -> (u32, u32) {
        match self {
            ImageKind::Thumb => (910, 512),
            ImageKind::Backdrop => (1920, 1080),
            ImageKind::Logo => (800, 310),
        }
    }
}

/// Builder of item image URLs for one server
///
/// Holds only the base URL, so it stays usable after the client that
/// produced it is gone.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base_url: Url,
}

impl ImageUrls {
    /// Create a builder for the given server base URL
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// URL of an item image, optionally pinned to an image tag
    ///
    /// The tag ties the URL to one image version so it stays cacheable;
    /// without it the server serves whatever is current.
    pub fn item_image(&self, item_id: &str, kind: ImageKind, tag: Option<&str>) -> String {
        let (width, height) = kind.fill_size();
        let mut url = format!(
            "{}/Items/{}/Images/{}?fillWidth={}&fillHeight={}",
            self.base_url.as_str().trim_end_matches('/'),
            item_id,
            kind.as_str(),
            width,
            height
        );
        if let Some(tag) = tag {
            url.push_str("&tag=");
            url.push_str(tag);
        }
        url
    }
}

impl JellyfinClient {
    /// Items the user can resume, most recently played first
    ///
    /// Restricted to video so partially played music does not surface in
    /// the feed.
    pub async fn resume_items(&self, limit: u32) -> Result<ItemsPage> {
        debug!("Fetching resume items (limit: {})", limit);
        let limit = limit.to_string();
        let params = [
            ("limit", limit.as_str()),
            ("mediaTypes", "Video"),
            ("enableImageTypes", "Primary,Backdrop,Thumb"),
            ("imageTypeLimit", "1"),
            ("enableTotalRecordCount", "false"),
        ];
        self.get("/UserItems/Resume", &params).await
    }

    /// Next unwatched episodes of followed series
    pub async fn next_up(&self, limit: u32) -> Result<ItemsPage> {
        debug!("Fetching next up episodes (limit: {})", limit);
        let limit = limit.to_string();
        let params = [
            ("limit", limit.as_str()),
            ("enableImageTypes", "Primary,Backdrop,Banner,Thumb"),
            ("imageTypeLimit", "1"),
            ("enableTotalRecordCount", "false"),
            ("disableFirstEpisode", "false"),
        ];
        self.get("/Shows/NextUp", &params).await
    }

    /// Server-picked suggestions, movies and series only
    pub async fn suggestions(&self, limit: u32) -> Result<ItemsPage> {
        debug!("Fetching suggestions (limit: {})", limit);
        let limit = limit.to_string();
        let params = [("limit", limit.as_str()), ("type", "Movie,Series")];
        self.get("/Items/Suggestions", &params).await
    }

    /// Image URL builder bound to this client's server
    pub fn image_urls(&self) -> ImageUrls {
        ImageUrls::new(self.base_url().clone())
    }
}
