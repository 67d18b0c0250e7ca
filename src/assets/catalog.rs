use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;

use crate::db::{
    models::{BackgroundAsset, SoundAsset},
    repositories::{backgrounds::upsert_background, write_background_flags, write_sound_flags},
    Database,
};

use super::{AssetError, AssetStore, SelectionPolicy};

#[derive(Debug, Clone, Copy)]
enum AssetKind {
    Sound,
    Background,
}

/// A flag change that still has to reach the record store.
struct FlagWrite {
    kind: AssetKind,
    id: String,
    is_selected: bool,
    is_favorite: bool,
}

struct CatalogState {
    sounds: Vec<SoundAsset>,
    backgrounds: Vec<BackgroundAsset>,
    sound_policy: SelectionPolicy,
    background_policy: SelectionPolicy,
}

/// In-memory asset store, hydrated once from the database.
///
/// Reads never touch disk. Flag changes are applied in memory and then queued
/// to the database worker when one is attached.
pub struct AssetCatalog {
    state: RwLock<CatalogState>,
    db: Option<Database>,
}

impl AssetCatalog {
    pub fn new(
        mut sounds: Vec<SoundAsset>,
        mut backgrounds: Vec<BackgroundAsset>,
        sound_policy: SelectionPolicy,
        background_policy: SelectionPolicy,
    ) -> Self {
        sounds.sort_by(|a, b| a.title.cmp(&b.title));
        backgrounds.sort_by(|a, b| a.title.cmp(&b.title));

        let catalog = Self {
            state: RwLock::new(CatalogState {
                sounds,
                backgrounds,
                sound_policy: SelectionPolicy::Multiple,
                background_policy: SelectionPolicy::Multiple,
            }),
            db: None,
        };
        catalog.set_sound_policy(sound_policy);
        catalog.set_background_policy(background_policy);
        catalog
    }

    pub async fn load(
        db: Database,
        sound_policy: SelectionPolicy,
        background_policy: SelectionPolicy,
    ) -> Result<Self> {
        let sounds = db.list_sounds().await?;
        let backgrounds = db.list_backgrounds().await?;
        let mut catalog = Self::new(
            sounds,
            backgrounds,
            SelectionPolicy::Multiple,
            SelectionPolicy::Multiple,
        );
        catalog.db = Some(db);
        // Narrowing the policy may deselect rows; attach the db first so
        // those changes are persisted too.
        catalog.set_sound_policy(sound_policy);
        catalog.set_background_policy(background_policy);
        Ok(catalog)
    }

    pub fn sounds(&self) -> Vec<SoundAsset> {
        self.read().sounds.clone()
    }

    pub fn backgrounds(&self) -> Vec<BackgroundAsset> {
        self.read().backgrounds.clone()
    }

    pub fn sound_policy(&self) -> SelectionPolicy {
        self.read().sound_policy
    }

    pub fn background_policy(&self) -> SelectionPolicy {
        self.read().background_policy
    }

    /// Switching to `Single` keeps only the first selected sound.
    pub fn set_sound_policy(&self, policy: SelectionPolicy) {
        let writes = {
            let mut state = self.write();
            state.sound_policy = policy;
            if policy == SelectionPolicy::Single {
                keep_first_selected(&mut state.sounds, |s| &mut s.is_selected, sound_write)
            } else {
                Vec::new()
            }
        };
        self.persist(writes);
    }

    /// Switching to `Single` keeps only the first selected background.
    pub fn set_background_policy(&self, policy: SelectionPolicy) {
        let writes = {
            let mut state = self.write();
            state.background_policy = policy;
            if policy == SelectionPolicy::Single {
                keep_first_selected(&mut state.backgrounds, |b| &mut b.is_selected, background_write)
            } else {
                Vec::new()
            }
        };
        self.persist(writes);
    }

    /// Add a fetched background to the catalog and the record store.
    pub fn add_background(&self, background: BackgroundAsset) {
        {
            let mut state = self.write();
            state.backgrounds.retain(|b| b.id != background.id);
            let pos = state
                .backgrounds
                .partition_point(|b| b.title <= background.title);
            state.backgrounds.insert(pos, background.clone());
        }
        if let Some(db) = &self.db {
            db.enqueue("insert background", move |conn| {
                upsert_background(conn, &background)
            });
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, writes: Vec<FlagWrite>) {
        let Some(db) = &self.db else {
            return;
        };
        if writes.is_empty() {
            return;
        }

        db.enqueue("asset flags", move |conn| {
            let tx = conn.transaction()?;
            for w in &writes {
                match w.kind {
                    AssetKind::Sound => write_sound_flags(&tx, &w.id, w.is_selected, w.is_favorite)?,
                    AssetKind::Background => {
                        write_background_flags(&tx, &w.id, w.is_selected, w.is_favorite)?
                    }
                }
            }
            tx.commit()?;
            Ok(())
        });
    }
}

/// Clear every selection after the first, returning the rows that changed.
fn keep_first_selected<T>(
    items: &mut [T],
    selected: impl Fn(&mut T) -> &mut bool,
    to_write: impl Fn(&T) -> FlagWrite,
) -> Vec<FlagWrite> {
    let mut seen = false;
    let mut writes = Vec::new();
    for item in items.iter_mut() {
        let flag = selected(item);
        if !*flag {
            continue;
        }
        if seen {
            *flag = false;
            writes.push(to_write(item));
        }
        seen = true;
    }
    writes
}

/// Toggle `idx`; under `Single`, selecting it deselects every other item.
fn toggle_in<T>(
    items: &mut [T],
    idx: usize,
    policy: SelectionPolicy,
    selected: impl Fn(&mut T) -> &mut bool,
    to_write: impl Fn(&T) -> FlagWrite,
) -> (bool, Vec<FlagWrite>) {
    let now_selected = {
        let flag = selected(&mut items[idx]);
        *flag = !*flag;
        *flag
    };
    let mut writes = vec![to_write(&items[idx])];

    if now_selected && policy == SelectionPolicy::Single {
        for (i, item) in items.iter_mut().enumerate() {
            if i == idx {
                continue;
            }
            let flag = selected(item);
            if *flag {
                *flag = false;
                writes.push(to_write(item));
            }
        }
    }

    (now_selected, writes)
}

fn sound_write(s: &SoundAsset) -> FlagWrite {
    FlagWrite {
        kind: AssetKind::Sound,
        id: s.id.clone(),
        is_selected: s.is_selected,
        is_favorite: s.is_favorite,
    }
}

fn background_write(b: &BackgroundAsset) -> FlagWrite {
    FlagWrite {
        kind: AssetKind::Background,
        id: b.id.clone(),
        is_selected: b.is_selected,
        is_favorite: b.is_favorite,
    }
}

impl AssetStore for AssetCatalog {
    fn selected_sounds(&self) -> Vec<SoundAsset> {
        self.read()
            .sounds
            .iter()
            .filter(|s| s.is_selected)
            .cloned()
            .collect()
    }

    fn selected_backgrounds(&self) -> Vec<BackgroundAsset> {
        self.read()
            .backgrounds
            .iter()
            .filter(|b| b.is_selected)
            .cloned()
            .collect()
    }

    fn toggle_favorite(&self, id: &str) -> Result<bool, AssetError> {
        let (value, write) = {
            let mut state = self.write();
            if let Some(sound) = state.sounds.iter_mut().find(|s| s.id == id) {
                sound.is_favorite = !sound.is_favorite;
                (sound.is_favorite, sound_write(sound))
            } else if let Some(bg) = state.backgrounds.iter_mut().find(|b| b.id == id) {
                bg.is_favorite = !bg.is_favorite;
                (bg.is_favorite, background_write(bg))
            } else {
                return Err(AssetError::UnknownAsset(id.to_string()));
            }
        };
        self.persist(vec![write]);
        Ok(value)
    }

    fn toggle_selected(&self, id: &str) -> Result<bool, AssetError> {
        let (value, writes) = {
            let mut state = self.write();
            let state = &mut *state;
            if let Some(idx) = state.sounds.iter().position(|s| s.id == id) {
                toggle_in(
                    &mut state.sounds,
                    idx,
                    state.sound_policy,
                    |s| &mut s.is_selected,
                    sound_write,
                )
            } else if let Some(idx) = state.backgrounds.iter().position(|b| b.id == id) {
                toggle_in(
                    &mut state.backgrounds,
                    idx,
                    state.background_policy,
                    |b| &mut b.is_selected,
                    background_write,
                )
            } else {
                return Err(AssetError::UnknownAsset(id.to_string()));
            }
        };
        self.persist(writes);
        Ok(value)
    }
}
