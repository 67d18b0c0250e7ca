use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{connection::Database, models::BackgroundAsset};

const BACKGROUND_COLUMNS: &str = "id, title, full_size_url, thumbnail_url, is_image, color, \
                                  is_selected, is_favorite, is_local_image";

fn row_to_background(row: &Row) -> Result<BackgroundAsset> {
    Ok(BackgroundAsset {
        id: row.get("id")?,
        title: row.get("title")?,
        full_size_url: row.get("full_size_url")?,
        thumbnail_url: row.get("thumbnail_url")?,
        is_image: row.get("is_image")?,
        color: row.get("color")?,
        is_selected: row.get("is_selected")?,
        is_favorite: row.get("is_favorite")?,
        is_local_image: row.get("is_local_image")?,
    })
}

fn insert_background_with(conn: &Connection, verb: &str, bg: &BackgroundAsset) -> Result<usize> {
    let sql = format!(
        "{verb} INTO backgrounds ({BACKGROUND_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    );
    conn.execute(
        &sql,
        params![
            bg.id,
            bg.title,
            bg.full_size_url,
            bg.thumbnail_url,
            bg.is_image,
            bg.color,
            bg.is_selected,
            bg.is_favorite,
            bg.is_local_image,
        ],
    )
    .with_context(|| format!("failed to insert background {}", bg.id))
}

pub(crate) fn upsert_background(conn: &Connection, bg: &BackgroundAsset) -> Result<()> {
    insert_background_with(conn, "INSERT OR REPLACE", bg)?;
    Ok(())
}

pub(crate) fn insert_background_if_missing(conn: &Connection, bg: &BackgroundAsset) -> Result<bool> {
    Ok(insert_background_with(conn, "INSERT OR IGNORE", bg)? > 0)
}

/// Persist the two user-controlled flags of a background.
pub fn write_background_flags(
    conn: &Connection,
    id: &str,
    is_selected: bool,
    is_favorite: bool,
) -> Result<()> {
    conn.execute(
        "UPDATE backgrounds SET is_selected = ?1, is_favorite = ?2 WHERE id = ?3",
        params![is_selected, is_favorite, id],
    )
    .with_context(|| format!("failed to update flags for background {id}"))?;
    Ok(())
}

impl Database {
    /// All backgrounds ordered by title.
    pub async fn list_backgrounds(&self) -> Result<Vec<BackgroundAsset>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BACKGROUND_COLUMNS} FROM backgrounds ORDER BY title ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut backgrounds = Vec::new();
            while let Some(row) = rows.next()? {
                backgrounds.push(row_to_background(row)?);
            }
            Ok(backgrounds)
        })
        .await
    }

    /// Drop fetched photos the user has not kept as favourites. Bundled
    /// images and flat colours are never removed.
    pub async fn delete_unfavorited_backgrounds(&self) -> Result<usize> {
        self.execute(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM backgrounds
                     WHERE is_image = 1 AND is_local_image = 0 AND is_favorite = 0",
                    [],
                )
                .context("failed to prune remote backgrounds")?;
            Ok(removed)
        })
        .await
    }
}
