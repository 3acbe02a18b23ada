//! Home feed aggregation
//!
//! One load fans out to the three item endpoints concurrently, normalizes
//! each list into cards and publishes the result as a single atomic state
//! change. A category that fails becomes an empty row; only when every
//! category fails is the previous state kept and an error returned.
//!
//! Overlapping loads are resolved with a generation counter: the load
//! started last wins, earlier ones discard their result on completion.

use crate::api::JellyfinClient;
use crate::api::items::ImageUrls;
use crate::card::{Card, CardStyle, normalize_cards};
use crate::error::JellyfinError;
use crate::models::ItemsPage;
use async_trait::async_trait;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// How many resume items one load requests
pub const RESUME_LIMIT: u32 = 12;

/// How many next-up episodes one load requests
pub const NEXT_UP_LIMIT: u32 = 24;

/// How many featured suggestions one load requests
pub const SUGGESTIONS_LIMIT: u32 = 100;

/// Number of categories a load fans out to
const CATEGORY_COUNT: usize = 3;

/// The three rows of the home feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCategory {
    /// Partially watched items
    Resume,
    /// Next unwatched episodes
    NextUp,
    /// Server-picked suggestions
    Featured,
}

impl fmt::Display for FeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedCategory::Resume => "resume",
            FeedCategory::NextUp => "next-up",
            FeedCategory::Featured => "featured",
        };
        write!(f, "{}", name)
    }
}

/// Errors surfaced by a feed load
#[derive(Debug, Error)]
pub enum LoadError {
    /// One category failed; its row is published empty
    #[error("could not load {category} row: {source}")]
    Category {
        /// Which row failed
        category: FeedCategory,
        /// The underlying API failure
        source: JellyfinError,
    },

    /// Every category failed; the previous state is kept
    #[error("could not load any feed row")]
    AllFailed,

    /// A load started later finished first; this result was discarded
    #[error("feed load superseded by a newer one")]
    Superseded,
}

/// Source of the three feed categories
///
/// [`JellyfinClient`] is the production implementation; tests substitute
/// their own.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the resume row
    async fn fetch_resume(&self, limit: u32) -> crate::error::Result<ItemsPage>;

    /// Fetch the next-up row
    async fn fetch_next_up(&self, limit: u32) -> crate::error::Result<ItemsPage>;

    /// Fetch the featured suggestions
    async fn fetch_suggestions(&self, limit: u32) -> crate::error::Result<ItemsPage>;

    /// Image URL builder for the server behind this source
    fn image_urls(&self) -> ImageUrls;
}

#[async_trait]
impl FeedSource for JellyfinClient {
    async fn fetch_resume(&self, limit: u32) -> crate::error::Result<ItemsPage> {
        self.resume_items(limit).await
    }

    async fn fetch_next_up(&self, limit: u32) -> crate::error::Result<ItemsPage> {
        self.next_up(limit).await
    }

    async fn fetch_suggestions(&self, limit: u32) -> crate::error::Result<ItemsPage> {
        self.suggestions(limit).await
    }

    fn image_urls(&self) -> ImageUrls {
        JellyfinClient::image_urls(self)
    }
}

/// The three card rows of the home feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Partially watched items, thumbnail cards
    pub resume: Vec<Card>,
    /// Next unwatched episodes, thumbnail cards
    pub next_up: Vec<Card>,
    /// Suggestions, featured cards
    pub featured: Vec<Card>,
}

impl FeedState {
    /// Whether all three rows are empty
    pub fn is_empty(&self) -> bool {
        self.resume.is_empty() && self.next_up.is_empty() && self.featured.is_empty()
    }

    /// Card the featured banner starts on
    ///
    /// Falls back from the featured row to the first resume card, then the
    /// first next-up card.
    pub fn initial_featured(&self) -> Option<&Card> {
        self.featured
            .first()
            .or_else(|| self.resume.first())
            .or_else(|| self.next_up.first())
    }
}

/// Loader and holder of the home feed state
pub struct FeedAggregator {
    state: RwLock<FeedState>,
    generation: AtomicU64,
}

impl FeedAggregator {
    /// Create an aggregator with an empty feed
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FeedState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current feed state
    pub fn state(&self) -> FeedState {
        self.state.read().unwrap().clone()
    }

    /// Load all three categories and publish the result
    ///
    /// The three requests run concurrently. Failed categories are logged
    /// and published as empty rows; when all three fail the previous state
    /// is kept and [`LoadError::AllFailed`] is returned. When a newer load
    /// was started while this one ran, the result is discarded and
    /// [`LoadError::Superseded`] is returned.
    pub async fn load_home_feed<S>(&self, source: &S) -> Result<FeedState, LoadError>
    where
        S: FeedSource + ?Sized,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Loading home feed (generation {})", generation);

        let images = source.image_urls();
        let (resume, next_up, featured) = tokio::join!(
            source.fetch_resume(RESUME_LIMIT),
            source.fetch_next_up(NEXT_UP_LIMIT),
            source.fetch_suggestions(SUGGESTIONS_LIMIT),
        );

        let mut failures = 0;
        let resume = Self::normalize(
            FeedCategory::Resume,
            resume,
            CardStyle::Thumbnail,
            &images,
            &mut failures,
        );
        let next_up = Self::normalize(
            FeedCategory::NextUp,
            next_up,
            CardStyle::Thumbnail,
            &images,
            &mut failures,
        );
        let featured = Self::normalize(
            FeedCategory::Featured,
            featured,
            CardStyle::Featured,
            &images,
            &mut failures,
        );

        if failures == CATEGORY_COUNT {
            warn!("All feed categories failed, keeping previous state");
            return Err(LoadError::AllFailed);
        }

        let new_state = FeedState {
            resume,
            next_up,
            featured,
        };

        {
            let mut state = self.state.write().unwrap();
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("Discarding superseded feed load (generation {})", generation);
                return Err(LoadError::Superseded);
            }
            *state = new_state.clone();
        }

        info!(
            "Home feed loaded: {} resume, {} next up, {} featured",
            new_state.resume.len(),
            new_state.next_up.len(),
            new_state.featured.len()
        );

        Ok(new_state)
    }

    /// Normalize one category, turning a failure into an empty row
    fn normalize(
        category: FeedCategory,
        result: crate::error::Result<ItemsPage>,
        style: CardStyle,
        images: &ImageUrls,
        failures: &mut usize,
    ) -> Vec<Card> {
        match result {
            Ok(page) => normalize_cards(&page.items, style, images),
            Err(source) => {
                *failures += 1;
                warn!("{}", LoadError::Category { category, source });
                Vec::new()
            }
        }
    }
}

impl Default for FeedAggregator {
    fn default() -> Self {
        Self::new()
    }
}
