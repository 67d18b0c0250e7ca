mod columns;
mod connection;
mod migrations;
pub mod models;
pub mod repositories;

use anyhow::{Context, Result};
use log::info;

pub use connection::Database;
pub use models::{BackgroundAsset, SessionRecord, SessionStatus, SoundAsset};

use crate::assets::defaults::{default_backgrounds, default_sounds};
use repositories::{backgrounds::insert_background_if_missing, sounds::insert_sound_if_missing};

impl Database {
    /// Insert the bundled sounds and backgrounds that are not present yet.
    /// Existing rows, and the flags users set on them, are left alone.
    pub async fn seed_defaults(&self) -> Result<usize> {
        let inserted = self
            .execute(|conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                for sound in default_sounds() {
                    if insert_sound_if_missing(&tx, &sound)? {
                        inserted += 1;
                    }
                }
                for bg in default_backgrounds() {
                    if insert_background_if_missing(&tx, &bg)? {
                        inserted += 1;
                    }
                }
                tx.commit().context("failed to commit default content")?;
                Ok(inserted)
            })
            .await?;

        if inserted > 0 {
            info!("Seeded {inserted} default assets");
        }
        Ok(inserted)
    }
}
