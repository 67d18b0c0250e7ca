use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{connection::Database, models::SoundAsset};

fn row_to_sound(row: &Row) -> Result<SoundAsset> {
    Ok(SoundAsset {
        id: row.get("id")?,
        title: row.get("title")?,
        source: row.get("source")?,
        source_alt: row.get("source_alt")?,
        is_selected: row.get("is_selected")?,
        is_favorite: row.get("is_favorite")?,
    })
}

pub(crate) fn insert_sound_if_missing(conn: &Connection, sound: &SoundAsset) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO sounds (id, title, source, source_alt, is_selected, is_favorite)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                sound.id,
                sound.title,
                sound.source,
                sound.source_alt,
                sound.is_selected,
                sound.is_favorite,
            ],
        )
        .with_context(|| format!("failed to insert sound {}", sound.id))?;
    Ok(inserted > 0)
}

/// Persist the two user-controlled flags of a sound.
pub fn write_sound_flags(
    conn: &Connection,
    id: &str,
    is_selected: bool,
    is_favorite: bool,
) -> Result<()> {
    conn.execute(
        "UPDATE sounds SET is_selected = ?1, is_favorite = ?2 WHERE id = ?3",
        params![is_selected, is_favorite, id],
    )
    .with_context(|| format!("failed to update flags for sound {id}"))?;
    Ok(())
}

impl Database {
    /// All sounds ordered by title.
    pub async fn list_sounds(&self) -> Result<Vec<SoundAsset>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, source, source_alt, is_selected, is_favorite
                 FROM sounds
                 ORDER BY title ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sounds = Vec::new();
            while let Some(row) = rows.next()? {
                sounds.push(row_to_sound(row)?);
            }
            Ok(sounds)
        })
        .await
    }

    pub async fn insert_sound(&self, sound: &SoundAsset) -> Result<()> {
        let record = sound.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO sounds (id, title, source, source_alt, is_selected, is_favorite)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.title,
                    record.source,
                    record.source_alt,
                    record.is_selected,
                    record.is_favorite,
                ],
            )
            .with_context(|| "failed to insert sound")?;
            Ok(())
        })
        .await
    }
}
