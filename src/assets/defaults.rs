//! Bundled content inserted into a fresh record store.

use crate::db::models::{BackgroundAsset, SoundAsset};

/// `(id suffix, title, locator)` for every bundled loop. Locators starting
/// with `synth:` are generated procedurally; the rest are paths relative to
/// the sound directory.
const BUNDLED_SOUNDS: &[(&str, &str, &str)] = &[
    ("thunderstorm", "Thunder Storm", "sounds/ThunderStorm.mp3"),
    ("campfire", "Campfire", "sounds/campfire.mp3"),
    ("crickets", "Crickets", "sounds/crickets.mp3"),
    ("forest", "Forest", "sounds/forest.mp3"),
    ("frogs", "Frogs", "sounds/frogs.mp3"),
    ("heavy-rain", "Heavy Rain", "sounds/heavy-rain.mp3"),
    ("lake-waves", "Lake Waves", "sounds/lake-waves.mp3"),
    ("rain", "Rain", "sounds/rain.mp3"),
    ("stream", "Stream", "sounds/stream.mp3"),
    ("waterfall", "Waterfall", "sounds/waterfall.mp3"),
    ("waves", "Waves", "sounds/waves.mp3"),
    ("wind", "Wind", "sounds/wind.mp3"),
    ("brown-noise", "Brown Noise", "synth:brown-noise"),
    ("soft-rain", "Soft Rain (generated)", "synth:rain"),
    ("swell", "Ocean Swell (generated)", "synth:waves"),
    ("breeze", "Breeze (generated)", "synth:wind"),
];

const PALETTE: &[(&str, &str)] = &[
    ("White", "whiteColor"),
    ("Blue", "blueColor"),
    ("Red", "redColor"),
    ("Green", "greenColor"),
    ("Black", "blackColor"),
    ("Dark Gray", "darkGrayColor"),
    ("Light Gray", "lightGrayColor"),
    ("Gray", "grayColor"),
    ("Cyan", "cyanColor"),
    ("Yellow", "yellowColor"),
    ("Magenta", "magentaColor"),
    ("Orange", "orangeColor"),
    ("Purple", "purpleColor"),
    ("Brown", "brownColor"),
    ("Clear", "clearColor"),
];

const BUNDLED_IMAGES: &[(&str, &str)] = &[
    ("Independence Grove", "images/igrove_1.jpg"),
    ("Independence Grove 1", "images/grove2.jpg"),
    ("Independence Grove 2", "images/grove3.jpg"),
    ("Independence Grove 3", "images/grove4.jpg"),
    ("Independence Grove 4", "images/grove5.jpg"),
];

pub fn default_sounds() -> Vec<SoundAsset> {
    BUNDLED_SOUNDS
        .iter()
        .map(|(slug, title, source)| SoundAsset::new(format!("sound-{slug}"), *title, *source))
        .collect()
}

/// Flat colours first, then the bundled photos. The black background starts
/// selected so a fresh install can run the nightlight without any setup.
pub fn default_backgrounds() -> Vec<BackgroundAsset> {
    let colors = PALETTE.iter().map(|(title, color)| {
        let mut bg = BackgroundAsset::solid(format!("bg-{color}"), *title, *color);
        bg.is_selected = *color == "blackColor";
        bg
    });

    let images = BUNDLED_IMAGES.iter().enumerate().map(|(idx, (title, path))| {
        BackgroundAsset::image(format!("bg-local-{idx}"), *title, *path, Some((*path).to_string()), true)
    });

    colors.chain(images).collect()
}
