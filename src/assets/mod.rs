//! Selectable sounds and backgrounds as the session engine sees them.
//!
//! The engine only reads selections through [`AssetStore`]; mutating them is
//! the caller's job and happens before a session starts.

pub mod catalog;
pub mod defaults;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::{BackgroundAsset, SoundAsset};

pub use catalog::AssetCatalog;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("no sound or background with id '{0}'")]
    UnknownAsset(String),
}

/// Whether one or many assets of a kind may be selected at once.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SelectionPolicy {
    #[default]
    Single,
    Multiple,
}

impl SelectionPolicy {
    pub fn from_flag(multiple: bool) -> Self {
        if multiple {
            SelectionPolicy::Multiple
        } else {
            SelectionPolicy::Single
        }
    }
}

pub trait AssetStore: Send + Sync {
    /// Sounds in the current mix, in title order.
    fn selected_sounds(&self) -> Vec<SoundAsset>;

    /// Selected backgrounds, in title order. At most one under
    /// [`SelectionPolicy::Single`].
    fn selected_backgrounds(&self) -> Vec<BackgroundAsset>;

    fn current_background(&self) -> Option<BackgroundAsset> {
        self.selected_backgrounds().into_iter().next()
    }

    /// Flip the favourite flag. Returns the new value.
    fn toggle_favorite(&self, id: &str) -> Result<bool, AssetError>;

    /// Flip the selected flag, honouring the kind's selection policy.
    /// Returns the new value.
    fn toggle_selected(&self, id: &str) -> Result<bool, AssetError>;
}
