//! Card normalization
//!
//! Turns raw item records into the uniform card shape the feed rows render.
//! Episodes adopt the identity of their parent series (id, title, artwork),
//! so a resume row shows one entry per series instead of one per episode.
//!
//! Normalization is strict: a record missing a required field is dropped
//! with a warning, a partial card is never produced.

use crate::api::items::{ImageKind, ImageUrls};
use crate::models::{MediaItem, MediaKind};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// Artwork variant a card is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStyle {
    /// Wide thumbnail for card shelves
    Thumbnail,
    /// Backdrop plus title logo for the featured banner
    Featured,
}

/// One entry of a feed row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    /// Item identifier (the parent series for episodes)
    pub id: String,
    /// Display title (the parent series name for episodes)
    pub title: String,
    /// Secondary line: `S{season}:E{episode} - {name}` for episodes, the
    /// production year for other items when known
    pub subtitle: Option<String>,
    /// Primary artwork URL for this card's style
    pub image_url: String,
    /// Title logo URL (featured style only)
    pub logo_url: Option<String>,
    /// Watched percentage in 0-100, absent when playback never started
    pub progress_pct: Option<f32>,
    /// Community rating in 0-10
    pub rating: Option<f32>,
    /// Kind of the underlying record
    pub kind: MediaKind,
}

impl Card {
    /// Build a card from one item record
    ///
    /// Returns `None` when the record cannot make a complete card: no id,
    /// no name, or an episode without its parent series identity.
    pub fn from_item(item: &MediaItem, style: CardStyle, images: &ImageUrls) -> Option<Card> {
        if item.id.is_empty() {
            warn!("Skipping item without id");
            return None;
        }
        let name = match item.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                warn!("Skipping item {} without name", item.id);
                return None;
            }
        };

        let (display_id, title) = if item.is_episode() {
            match (item.series_id.as_deref(), item.series_name.as_deref()) {
                (Some(series_id), Some(series_name))
                    if !series_id.is_empty() && !series_name.is_empty() =>
                {
                    (series_id, series_name)
                }
                _ => {
                    warn!("Skipping episode {} without series identity", item.id);
                    return None;
                }
            }
        } else {
            (item.id.as_str(), name)
        };

        let subtitle = if item.is_episode() {
            match (item.parent_index_number, item.index_number) {
                (Some(season), Some(episode)) => {
                    Some(format!("S{}:E{} - {}", season, episode, name))
                }
                _ => Some(name.to_string()),
            }
        } else {
            item.production_year.map(|year| year.to_string())
        };

        let (image_url, logo_url) = match style {
            CardStyle::Thumbnail => {
                let tag = if item.is_episode() {
                    item.series_primary_image_tag.as_deref()
                } else {
                    item.primary_image_tag()
                };
                (images.item_image(display_id, ImageKind::Thumb, tag), None)
            }
            CardStyle::Featured => {
                let backdrop =
                    images.item_image(display_id, ImageKind::Backdrop, item.backdrop_image_tag());
                let logo = item
                    .logo_image_tag()
                    .map(|tag| images.item_image(display_id, ImageKind::Logo, Some(tag)));
                (backdrop, logo)
            }
        };

        let progress_pct = item.run_time_ticks.and_then(|runtime| {
            let position = item.playback_position_ticks();
            if position <= 0 {
                return None;
            }
            let pct = (position as f64 / runtime.max(1) as f64 * 100.0).clamp(0.0, 100.0);
            Some(pct as f32)
        });

        let rating = item.community_rating.map(|r| r.clamp(0.0, 10.0));

        Some(Card {
            id: display_id.to_string(),
            title: title.to_string(),
            subtitle,
            image_url,
            logo_url,
            progress_pct,
            rating,
            kind: item.kind,
        })
    }
}

/// Normalize a list of item records into cards
///
/// Invalid records are dropped, duplicate ids keep their first occurrence,
/// and the server order is preserved otherwise.
pub fn normalize_cards(items: &[MediaItem], style: CardStyle, images: &ImageUrls) -> Vec<Card> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| Card::from_item(item, style, images))
        .filter(|card| seen.insert(card.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserItemData;
    use url::Url;

    fn images() -> ImageUrls {
        ImageUrls::new(Url::parse("http://media.local:8096").unwrap())
    }

    fn movie(id: &str, name: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            name: Some(name.to_string()),
            kind: MediaKind::Movie,
            ..Default::default()
        }
    }

    fn episode(id: &str, name: &str, series_id: &str, series_name: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            name: Some(name.to_string()),
            kind: MediaKind::Episode,
            series_id: Some(series_id.to_string()),
            series_name: Some(series_name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_episode_adopts_series_identity() {
        let mut item = episode("ep1", "Pilot", "s1", "Foo");
        item.parent_index_number = Some(2);
        item.index_number = Some(5);
        item.series_primary_image_tag = Some("tag-series".to_string());

        let card = Card::from_item(&item, CardStyle::Thumbnail, &images()).unwrap();
        assert_eq!(card.id, "s1");
        assert_eq!(card.title, "Foo");
        assert_eq!(card.subtitle.as_deref(), Some("S2:E5 - Pilot"));
        assert_eq!(
            card.image_url,
            "http://media.local:8096/Items/s1/Images/Thumb?fillWidth=910&fillHeight=512&tag=tag-series"
        );
    }

    #[test]
    fn test_episode_without_series_is_skipped() {
        let mut item = episode("ep1", "Pilot", "s1", "Foo");
        item.series_name = None;
        assert!(Card::from_item(&item, CardStyle::Thumbnail, &images()).is_none());

        let mut item = episode("ep1", "Pilot", "s1", "Foo");
        item.series_id = Some(String::new());
        assert!(Card::from_item(&item, CardStyle::Thumbnail, &images()).is_none());
    }

    #[test]
    fn test_episode_subtitle_without_indices_falls_back_to_name() {
        let item = episode("ep1", "Pilot", "s1", "Foo");
        let card = Card::from_item(&item, CardStyle::Thumbnail, &images()).unwrap();
        assert_eq!(card.subtitle.as_deref(), Some("Pilot"));
    }

    #[test]
    fn test_movie_card_uses_year_and_own_image() {
        let mut item = movie("m1", "Heat");
        item.production_year = Some(1995);
        item.image_tags.insert("Primary".to_string(), "t1".to_string());
        item.community_rating = Some(8.3);

        let card = Card::from_item(&item, CardStyle::Thumbnail, &images()).unwrap();
        assert_eq!(card.id, "m1");
        assert_eq!(card.title, "Heat");
        assert_eq!(card.subtitle.as_deref(), Some("1995"));
        assert!(card.image_url.ends_with("/Items/m1/Images/Thumb?fillWidth=910&fillHeight=512&tag=t1"));
        assert_eq!(card.rating, Some(8.3));
    }

    #[test]
    fn test_movie_without_year_has_no_subtitle() {
        let card = Card::from_item(&movie("m1", "Heat"), CardStyle::Thumbnail, &images()).unwrap();
        assert!(card.subtitle.is_none());
    }

    #[test]
    fn test_missing_id_or_name_is_skipped() {
        let item = MediaItem::default();
        assert!(Card::from_item(&item, CardStyle::Thumbnail, &images()).is_none());

        let mut item = movie("m1", "Heat");
        item.name = Some(String::new());
        assert!(Card::from_item(&item, CardStyle::Thumbnail, &images()).is_none());
    }

    #[test]
    fn test_progress_is_computed_and_clamped() {
        let mut item = movie("m1", "Heat");
        item.run_time_ticks = Some(1000);
        item.user_data = Some(UserItemData {
            playback_position_ticks: 250,
            ..Default::default()
        });
        let card = Card::from_item(&item, CardStyle::Thumbnail, &images()).unwrap();
        assert_eq!(card.progress_pct, Some(25.0));

        // Position beyond runtime clamps to 100
        item.user_data.as_mut().unwrap().playback_position_ticks = 2000;
        let card = Card::from_item(&item, CardStyle::Thumbnail, &images()).unwrap();
        assert_eq!(card.progress_pct, Some(100.0));

        // A zero runtime must not divide by zero
        item.run_time_ticks = Some(0);
        let card = Card::from_item(&item, CardStyle::Thumbnail, &images()).unwrap();
        assert_eq!(card.progress_pct, Some(100.0));
    }

    #[test]
    fn test_unstarted_playback_has_no_progress() {
        let mut item = movie("m1", "Heat");
        item.run_time_ticks = Some(1000);
        let card = Card::from_item(&item, CardStyle::Thumbnail, &images()).unwrap();
        assert!(card.progress_pct.is_none());
    }

    #[test]
    fn test_rating_is_clamped() {
        let mut item = movie("m1", "Heat");
        item.community_rating = Some(11.5);
        let card = Card::from_item(&item, CardStyle::Thumbnail, &images()).unwrap();
        assert_eq!(card.rating, Some(10.0));
    }

    #[test]
    fn test_featured_card_uses_backdrop_and_logo() {
        let mut item = movie("m1", "Heat");
        item.backdrop_image_tags.push("bd1".to_string());
        item.image_tags.insert("Logo".to_string(), "lg1".to_string());

        let card = Card::from_item(&item, CardStyle::Featured, &images()).unwrap();
        assert_eq!(
            card.image_url,
            "http://media.local:8096/Items/m1/Images/Backdrop?fillWidth=1920&fillHeight=1080&tag=bd1"
        );
        assert_eq!(
            card.logo_url.as_deref(),
            Some("http://media.local:8096/Items/m1/Images/Logo?fillWidth=800&fillHeight=310&tag=lg1")
        );
    }

    #[test]
    fn test_normalize_dedups_by_id_first_wins() {
        let items = vec![
            episode("ep1", "Pilot", "s1", "Foo"),
            movie("m1", "Heat"),
            episode("ep2", "Part Two", "s1", "Foo"),
            movie("m1", "Heat Again"),
        ];
        let cards = normalize_cards(&items, CardStyle::Thumbnail, &images());
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, "s1");
        assert_eq!(cards[0].subtitle.as_deref(), Some("Pilot"));
        assert_eq!(cards[1].id, "m1");
        assert_eq!(cards[1].title, "Heat");
    }

    #[test]
    fn test_normalize_drops_invalid_keeps_order() {
        let mut orphan = episode("ep9", "Lost", "s9", "Bar");
        orphan.series_id = None;
        let items = vec![movie("m1", "A"), orphan, movie("m2", "B")];
        let cards = normalize_cards(&items, CardStyle::Thumbnail, &images());
        let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
    }
}
