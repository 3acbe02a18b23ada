//! # pmojellyfin - Jellyfin client core for PMOFlix
//!
//! This crate holds the server-facing half of PMOFlix: signing in to a
//! Jellyfin server, keeping the session alive across restarts, and turning
//! the server's item endpoints into the rows of the home screen.
//!
//! ## Overview
//!
//! `pmojellyfin` provides:
//! - Authentication against `/Users/AuthenticateByName` with a stable
//!   device identity
//! - Session persistence through any [`pmovault::CredentialStore`], with
//!   the password encrypted at rest
//! - Concurrent loading of the three home feed rows (resume, next up,
//!   featured suggestions)
//! - Normalization of raw item records into uniform [`Card`]s, episodes
//!   adopting their parent series
//! - Rotation scheduling for the featured banner
//!
//! ## Architecture
//!
//! ```text
//! pmojellyfin/
//! ├── src/
//! │   ├── lib.rs              # Main module (this file)
//! │   ├── api/
//! │   │   ├── mod.rs          # HTTP plumbing, MediaBrowser header
//! │   │   ├── auth.rs         # AuthenticateByName
//! │   │   └── items.rs        # Item endpoints, image URLs
//! │   ├── models.rs           # Wire data structures
//! │   ├── card.rs             # Card normalization
//! │   ├── session.rs          # Session manager and persistence
//! │   ├── feed.rs             # Home feed aggregation
//! │   ├── carousel.rs         # Featured banner rotation
//! │   └── error.rs            # Error handling
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pmojellyfin::{FeedAggregator, SessionManager};
//! use pmovault::FileVault;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let vault = Arc::new(FileVault::open_default()?);
//!     let session = SessionManager::restore(vault).await;
//!
//!     if !session.is_authenticated() {
//!         session
//!             .authenticate("http://media.local:8096", "alice", "secret")
//!             .await?;
//!     }
//!
//!     let client = session.client().expect("just signed in");
//!     let feed = FeedAggregator::new();
//!     let state = feed.load_home_feed(&client).await?;
//!
//!     println!("{} items to resume", state.resume.len());
//!     for card in &state.resume {
//!         println!("  {} ({})", card.title, card.subtitle.as_deref().unwrap_or("-"));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! Three error types cover the three layers:
//! - [`JellyfinError`] for the raw API (HTTP failures, status codes)
//! - [`AuthError`] for the sign-in flow
//! - [`LoadError`] for feed loads
//!
//! ```rust,ignore
//! match session.authenticate(server, user, password).await {
//!     Ok(auth) => println!("Signed in as {}", auth.user_id),
//!     Err(AuthError::Rejected(reason)) => println!("Refused: {}", reason),
//!     Err(AuthError::InvalidServer(reason)) => println!("Bad address: {}", reason),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```
//!
//! ## See also
//!
//! - [`pmovault`] : Credential storage backing the session

pub mod api;
pub mod card;
pub mod carousel;
pub mod error;
pub mod feed;
pub mod models;
pub mod session;

pub use api::auth::AuthSession;
pub use api::items::{ImageKind, ImageUrls};
pub use api::{ClientBuilder, DeviceProfile, JellyfinClient, normalize_server_url};
pub use card::{Card, CardStyle, normalize_cards};
pub use carousel::{Carousel, CarouselMode, DEFAULT_ROTATION_PERIOD};
pub use error::{JellyfinError, Result};
pub use feed::{
    FeedAggregator, FeedCategory, FeedSource, FeedState, LoadError, NEXT_UP_LIMIT, RESUME_LIMIT,
    SUGGESTIONS_LIMIT,
};
pub use models::{ItemsPage, MediaItem, MediaKind, UserItemData};
pub use session::{AuthError, SESSION_KEY, SessionManager};

/// Re-export of the credential store trait for convenience
pub use pmovault::CredentialStore;
