// ~/simple-desktop/src/paths.rs

use std::path::PathBuf;

use crate::APP_NAME;

/// Per-user data root. `%APPDATA%` first, then the profile directory.
pub fn app_data_dir() -> PathBuf {
    if let Ok(appdata) = std::env::var("APPDATA") {
        return PathBuf::from(appdata).join(APP_NAME);
    }

    if let Ok(profile) = std::env::var("USERPROFILE") {
        return PathBuf::from(profile).join("AppData").join("Roaming").join(APP_NAME);
    }

    // Fallback (non-Windows hosts, stripped environments)
    match std::env::current_exe() {
        Ok(path) => path
            .parent()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| PathBuf::from(APP_NAME)),
        Err(_) => PathBuf::from(APP_NAME),
    }
}

pub fn settings_path() -> PathBuf {
    app_data_dir().join("settings.yaml")
}

pub fn log_path() -> PathBuf {
    app_data_dir().join("simpledesktop.log")
}

pub fn default_wallpaper_path() -> PathBuf {
    app_data_dir().join("default.png")
}

/// Generated page the WebView2 surface navigates to.
pub fn wallpaper_page_path() -> PathBuf {
    app_data_dir().join("wallpaper.html")
}

pub fn current_exe_path() -> Option<PathBuf> {
    std::env::current_exe().ok()
}
