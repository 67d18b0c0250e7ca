use std::{
    fs,
    path::{Path, PathBuf},
};

use super::DisplayError;

const SYSFS_BACKLIGHT: &str = "/sys/class/backlight";

/// The physical screen a nightlight drives.
pub trait Screen: Send + Sync {
    /// Current brightness, `0.0..=1.0`.
    fn brightness(&self) -> Result<f32, DisplayError>;

    fn set_brightness(&self, level: f32) -> Result<(), DisplayError>;

    /// Hold off screen lock while `on`. Screens without a lock accept and
    /// ignore it.
    fn set_keep_awake(&self, _on: bool) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Linux backlight under `/sys/class/backlight/<device>`.
pub struct SysfsScreen {
    device: PathBuf,
    max: u32,
}

impl SysfsScreen {
    /// First backlight device under the standard sysfs root.
    pub fn discover() -> Result<Self, DisplayError> {
        Self::discover_in(Path::new(SYSFS_BACKLIGHT))
    }

    pub fn discover_in(root: &Path) -> Result<Self, DisplayError> {
        let mut devices: Vec<PathBuf> = fs::read_dir(root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        devices.sort();
        let device = devices
            .into_iter()
            .next()
            .ok_or_else(|| DisplayError::ControlFailed(format!("no backlight under {}", root.display())))?;
        Self::open(device)
    }

    pub fn open(device: PathBuf) -> Result<Self, DisplayError> {
        let max = read_u32(&device.join("max_brightness"))?;
        if max == 0 {
            return Err(DisplayError::ControlFailed(format!(
                "{} reports zero max_brightness",
                device.display()
            )));
        }
        Ok(Self { device, max })
    }
}

fn read_u32(path: &Path) -> Result<u32, DisplayError> {
    let raw = fs::read_to_string(path)?;
    raw.trim()
        .parse()
        .map_err(|e| DisplayError::ControlFailed(format!("bad value in {}: {e}", path.display())))
}

impl Screen for SysfsScreen {
    fn brightness(&self) -> Result<f32, DisplayError> {
        let raw = read_u32(&self.device.join("brightness"))?;
        Ok((raw as f32 / self.max as f32).clamp(0.0, 1.0))
    }

    fn set_brightness(&self, level: f32) -> Result<(), DisplayError> {
        let raw = (level.clamp(0.0, 1.0) * self.max as f32).round() as u32;
        fs::write(self.device.join("brightness"), raw.to_string())?;
        Ok(())
    }
}
