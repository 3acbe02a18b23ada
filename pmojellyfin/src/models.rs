//! Data models for Jellyfin item records
//!
//! The item endpoints all return the same record shape (Jellyfin's
//! `BaseItemDto`, PascalCase on the wire); only the fields the home feed
//! consumes are mirrored here. Deserialization is lenient: unexpected or
//! missing fields never fail a whole response, validation happens later in
//! the card normalization step.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of media item (the `Type` discriminator on item records)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MediaKind {
    /// Standalone movie
    Movie,
    /// A series (the parent of seasons/episodes)
    Series,
    /// One episode of a series
    Episode,
    /// Anything else the server may return (music, photos, folders...)
    #[default]
    #[serde(other)]
    Other,
}

/// Per-user playback state attached to an item record
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserItemData {
    /// Playback position in server ticks (opaque unit, see `Card` progress)
    pub playback_position_ticks: i64,
    /// Percentage watched as computed by the server, when present
    pub played_percentage: Option<f64>,
    /// Number of completed plays
    pub play_count: i32,
    /// Whether the user marked the item as favorite
    pub is_favorite: bool,
}

/// One item record as returned by the item endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaItem {
    /// Unique item identifier (empty when the server omitted it)
    pub id: String,
    /// Display name
    pub name: Option<String>,
    /// Item kind discriminator
    #[serde(rename = "Type")]
    pub kind: MediaKind,
    /// Identifier of the parent series (episodes only)
    pub series_id: Option<String>,
    /// Name of the parent series (episodes only)
    pub series_name: Option<String>,
    /// Primary image tag of the parent series (episodes only)
    pub series_primary_image_tag: Option<String>,
    /// Season number (episodes only)
    pub parent_index_number: Option<i32>,
    /// Episode number within the season (episodes only)
    pub index_number: Option<i32>,
    /// Production year
    pub production_year: Option<i32>,
    /// Community rating, 0-10
    pub community_rating: Option<f32>,
    /// Total runtime in server ticks
    pub run_time_ticks: Option<i64>,
    /// Image tags by image type (`Primary`, `Logo`, ...)
    pub image_tags: HashMap<String, String>,
    /// Backdrop image tags, in server preference order
    pub backdrop_image_tags: Vec<String>,
    /// Per-user playback state
    pub user_data: Option<UserItemData>,
}

impl MediaItem {
    /// Whether this record is an episode of a series
    pub fn is_episode(&self) -> bool {
        self.kind == MediaKind::Episode
    }

    /// Tag of the item's primary image, if the server exposed one
    pub fn primary_image_tag(&self) -> Option<&str> {
        self.image_tags.get("Primary").map(String::as_str)
    }

    /// Tag of the item's logo image, if the server exposed one
    pub fn logo_image_tag(&self) -> Option<&str> {
        self.image_tags.get("Logo").map(String::as_str)
    }

    /// Tag of the preferred backdrop image, if the server exposed one
    pub fn backdrop_image_tag(&self) -> Option<&str> {
        self.backdrop_image_tags.first().map(String::as_str)
    }

    /// Playback position in ticks (0 when the server sent no user data)
    pub fn playback_position_ticks(&self) -> i64 {
        self.user_data
            .as_ref()
            .map(|u| u.playback_position_ticks)
            .unwrap_or(0)
    }
}

/// Paginated envelope returned by the item endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemsPage {
    /// Item records in server order
    pub items: Vec<MediaItem>,
    /// Total matching records (0 when total counting is disabled)
    pub total_record_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_episode_record() {
        let json = r#"{
            "Id": "ep1",
            "Name": "Pilot",
            "Type": "Episode",
            "SeriesId": "series9",
            "SeriesName": "Foo",
            "SeriesPrimaryImageTag": "tag-series",
            "ParentIndexNumber": 2,
            "IndexNumber": 5,
            "RunTimeTicks": 10000,
            "ImageTags": {"Primary": "tag-ep"},
            "UserData": {"PlaybackPositionTicks": 5000, "PlayCount": 1}
        }"#;

        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert!(item.is_episode());
        assert_eq!(item.series_id.as_deref(), Some("series9"));
        assert_eq!(item.parent_index_number, Some(2));
        assert_eq!(item.index_number, Some(5));
        assert_eq!(item.playback_position_ticks(), 5000);
        assert_eq!(item.primary_image_tag(), Some("tag-ep"));
    }

    #[test]
    fn test_unknown_kind_maps_to_other() {
        let json = r#"{"Id": "x", "Name": "A Song", "Type": "Audio"}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, MediaKind::Other);
        assert!(!item.is_episode());
    }

    #[test]
    fn test_missing_fields_default() {
        let json = r#"{"Id": "x"}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, MediaKind::Other);
        assert!(item.name.is_none());
        assert_eq!(item.playback_position_ticks(), 0);
        assert!(item.backdrop_image_tag().is_none());
    }

    #[test]
    fn test_deserialize_items_page() {
        let json = r#"{"Items": [{"Id": "a", "Type": "Movie"}], "TotalRecordCount": 1}"#;
        let page: ItemsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_record_count, 1);
    }
}
