// ~/simple-desktop/src/bootstrap.rs

use std::{fs, path::Path};

use image::{Rgb, RgbImage};

use crate::data_loaders::settings::Settings;
use crate::{info, paths, warn, APP_NAME};

const DEFAULT_WALLPAPER_SIZE: (u32, u32) = (1920, 1080);
const DEFAULT_TOP: [u8; 3] = [24, 32, 48];
const DEFAULT_BOTTOM: [u8; 3] = [64, 88, 120];

/// Creates the data directory and scaffolds the default files the runtime
/// relies on (only the ones that don't exist yet).
pub fn bootstrap_app() {
    let data_dir = paths::app_data_dir();
    info!("[{}] === Bootstrap starting ===", APP_NAME);
    info!("[{}] Data directory: {}", APP_NAME, data_dir.display());

    if let Err(e) = fs::create_dir_all(&data_dir) {
        warn!("[{}] Failed to create {}: {e}", APP_NAME, data_dir.display());
        return;
    }

    scaffold_settings(&paths::settings_path());
    scaffold_default_wallpaper(&paths::default_wallpaper_path());
    info!("[{}] Scaffolding complete", APP_NAME);
}

pub fn scaffold_settings(path: &Path) {
    if path.exists() {
        return;
    }

    match Settings::default().save(path) {
        Ok(()) => info!("[{}] Created {}", APP_NAME, path.display()),
        Err(e) => warn!("[{}] Failed to create settings file: {e}", APP_NAME),
    }
}

/// Writes a plain vertical gradient used as the OS wallpaper fallback.
pub fn scaffold_default_wallpaper(path: &Path) {
    if path.exists() {
        return;
    }

    let (width, height) = DEFAULT_WALLPAPER_SIZE;
    let image = RgbImage::from_fn(width, height, |_, y| {
        let t = y as f32 / (height - 1) as f32;
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb([
            mix(DEFAULT_TOP[0], DEFAULT_BOTTOM[0]),
            mix(DEFAULT_TOP[1], DEFAULT_BOTTOM[1]),
            mix(DEFAULT_TOP[2], DEFAULT_BOTTOM[2]),
        ])
    });

    match image.save(path) {
        Ok(()) => info!("[{}] Created default wallpaper {}", APP_NAME, path.display()),
        Err(e) => warn!("[{}] Failed to create default wallpaper: {e}", APP_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("simple-desktop-bootstrap-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn scaffolded_settings_load_as_defaults() {
        let path = temp_dir("settings").join("settings.yaml");
        scaffold_settings(&path);
        assert_eq!(Settings::load(&path), Some(Settings::default()));
    }

    #[test]
    fn existing_settings_are_left_alone() {
        let path = temp_dir("keep").join("settings.yaml");
        fs::write(&path, "Ui:\n  imageTime: 42\n").unwrap();
        scaffold_settings(&path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Ui:\n  imageTime: 42\n");
    }

    #[test]
    fn default_wallpaper_is_a_full_hd_png() {
        let path = temp_dir("png").join("default.png");
        scaffold_default_wallpaper(&path);
        assert_eq!(image::image_dimensions(&path).unwrap(), DEFAULT_WALLPAPER_SIZE);
    }
}
