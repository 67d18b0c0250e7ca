//! Sound asset records.

use serde::{Deserialize, Serialize};

/// A selectable ambience loop.
///
/// `source_alt` is an optional second locator for the same ambience; outputs
/// that support it cross-fade between the two to hide the loop seam.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoundAsset {
    pub id: String,
    pub title: String,
    pub source: String,
    pub source_alt: Option<String>,
    pub is_selected: bool,
    pub is_favorite: bool,
}

impl SoundAsset {
    pub fn new(id: impl Into<String>, title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source: source.into(),
            source_alt: None,
            is_selected: false,
            is_favorite: false,
        }
    }

    /// Both locators, primary first.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.source.as_str()).chain(self.source_alt.as_deref())
    }
}
