//! Background asset records.

use serde::{Deserialize, Serialize};

/// A nightlight backdrop: either a photo (bundled or fetched) or a flat colour.
///
/// `color` holds the colour encoding used for flat backgrounds and as the
/// fallback while an image is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundAsset {
    pub id: String,
    pub title: String,
    pub full_size_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_image: bool,
    pub color: Option<String>,
    pub is_selected: bool,
    pub is_favorite: bool,
    pub is_local_image: bool,
}

impl BackgroundAsset {
    pub fn solid(id: impl Into<String>, title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            full_size_url: None,
            thumbnail_url: None,
            is_image: false,
            color: Some(color.into()),
            is_selected: false,
            is_favorite: false,
            is_local_image: false,
        }
    }

    pub fn image(
        id: impl Into<String>,
        title: impl Into<String>,
        full_size_url: impl Into<String>,
        thumbnail_url: Option<String>,
        is_local_image: bool,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            full_size_url: Some(full_size_url.into()),
            thumbnail_url,
            is_image: true,
            color: None,
            is_selected: false,
            is_favorite: false,
            is_local_image,
        }
    }
}
