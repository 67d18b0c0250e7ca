use serde::{Deserialize, Serialize};

use crate::db::models::BackgroundAsset;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB` packed colour.
    pub fn from_packed(rgb: u32) -> Self {
        Self {
            r: ((rgb & 0xFF_0000) >> 16) as f32 / 255.0,
            g: ((rgb & 0x00_FF00) >> 8) as f32 / 255.0,
            b: (rgb & 0x00_00FF) as f32 / 255.0,
        }
    }

    /// Accepts palette names (`blueColor`) and hex (`#1e90ff`, `0x1E90FF`).
    pub fn parse(encoded: &str) -> Option<Self> {
        let encoded = encoded.trim();
        let hex = encoded
            .strip_prefix('#')
            .or_else(|| encoded.strip_prefix("0x"))
            .or_else(|| encoded.strip_prefix("0X"));
        if let Some(hex) = hex {
            if hex.len() != 6 {
                return None;
            }
            return u32::from_str_radix(hex, 16).ok().map(Self::from_packed);
        }

        let rgb = match encoded {
            "whiteColor" => Rgb::new(1.0, 1.0, 1.0),
            "blackColor" | "clearColor" => Rgb::BLACK,
            "blueColor" => Rgb::new(0.0, 0.0, 1.0),
            "redColor" => Rgb::new(1.0, 0.0, 0.0),
            "greenColor" => Rgb::new(0.0, 1.0, 0.0),
            "darkGrayColor" => Rgb::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
            "lightGrayColor" => Rgb::new(2.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0),
            "grayColor" => Rgb::new(0.5, 0.5, 0.5),
            "cyanColor" => Rgb::new(0.0, 1.0, 1.0),
            "yellowColor" => Rgb::new(1.0, 1.0, 0.0),
            "magentaColor" => Rgb::new(1.0, 0.0, 1.0),
            "orangeColor" => Rgb::new(1.0, 0.5, 0.0),
            "purpleColor" => Rgb::new(0.5, 0.0, 0.5),
            "brownColor" => Rgb::new(0.6, 0.4, 0.2),
            _ => return None,
        };
        Some(rgb)
    }
}

/// Colour wash and screen brightness for the nightlight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    pub color: Rgb,
    pub brightness: f32,
}

pub const MIN_BRIGHTNESS: f32 = 0.01;

impl Tint {
    pub fn new(color: Rgb, brightness: f32) -> Self {
        Self {
            color,
            brightness: brightness.clamp(MIN_BRIGHTNESS, 1.0),
        }
    }

    /// Flat backgrounds tint with their own colour; photos (and colours that
    /// fail to parse) sit on black.
    pub fn for_background(background: Option<&BackgroundAsset>, brightness: f32) -> Self {
        let color = background
            .filter(|bg| !bg.is_image)
            .and_then(|bg| bg.color.as_deref())
            .and_then(Rgb::parse)
            .unwrap_or(Rgb::BLACK);
        Self::new(color, brightness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_palette_and_hex() {
        assert_eq!(Rgb::parse("blueColor"), Some(Rgb::new(0.0, 0.0, 1.0)));
        assert_eq!(Rgb::parse("#FF0000"), Some(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(Rgb::parse("0x00ff00"), Some(Rgb::new(0.0, 1.0, 0.0)));
        assert_eq!(Rgb::parse("#FFF"), None);
        assert_eq!(Rgb::parse("mauveColor"), None);
    }

    #[test]
    fn brightness_is_clamped() {
        assert_eq!(Tint::new(Rgb::BLACK, 0.0).brightness, MIN_BRIGHTNESS);
        assert_eq!(Tint::new(Rgb::BLACK, 3.0).brightness, 1.0);
    }

    #[test]
    fn images_use_black_tint() {
        let photo = BackgroundAsset::image("p", "Grove", "images/grove2.jpg", None, true);
        let solid = BackgroundAsset::solid("c", "Red", "redColor");

        assert_eq!(Tint::for_background(Some(&photo), 0.2).color, Rgb::BLACK);
        assert_eq!(
            Tint::for_background(Some(&solid), 0.2).color,
            Rgb::new(1.0, 0.0, 0.0)
        );
        assert_eq!(Tint::for_background(None, 0.2).color, Rgb::BLACK);
    }
}
