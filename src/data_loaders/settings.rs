use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use super::yaml::{load_yaml, save_yaml};
use crate::color::Rgba;

/// Group and key names of the persisted settings. These are part of the file
/// format and must not be renamed.
pub mod keys {
    pub const UI: &str = "Ui";
    pub const RES_TYPE: &str = "resType";
    pub const IMAGE_TIME: &str = "imageTime";
    pub const VIDEO_VOLUME: &str = "vedioVolume";
    pub const CHARACTER_VISIBLE: &str = "characterVisible";
    pub const CHARACTER_TEXT: &str = "characteText";
    pub const CHARACTER_X: &str = "characteX";
    pub const CHARACTER_Y: &str = "characteY";
    pub const CHARACTER_SLIDER: &str = "characteSlider";
    pub const TASKBAR_AUTO_HIDE: &str = "taskBarAutoHideBox";
    pub const TASKBAR_TRANSPARENT_GRADIENT: &str = "taskBarTransparentgradientBtn";
    pub const TASKBAR_BLUR_BEHIND: &str = "taskBarBlurbehindBtn";
    pub const TASKBAR_ALPHA: &str = "taskBarAlphaSlider";
    pub const AUTO_RUN: &str = "autoRuning";

    pub const PARAMETER: &str = "Parameter";
    pub const RES_FILE_PATH: &str = "resFilePath";
    pub const CHARACTER_FONT: &str = "characteFont";
    pub const CHARACTER_COLOR: &str = "characteColor";
    pub const TASKBAR_COLOR: &str = "taskBarColor";

    pub const APP: &str = "App";
}

pub const IMAGE_TIME_RANGE: (u32, u32) = (1, 1000);
pub const VOLUME_MAX: u8 = 100;
pub const POSITION_MAX: u32 = 65535;
pub const CHARACTER_ALPHA_MIN: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceMode {
    /// Several still images, shown as a slideshow.
    MultiImage,
    /// One image, GIF or video file.
    SingleFile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ui: UiSettings,
    pub parameter: ParameterSettings,
    pub app: AppSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiSettings {
    pub resource_mode: ResourceMode,
    pub image_time_secs: u32,
    pub video_volume: u8,
    pub character_visible: bool,
    pub character_text: String,
    pub character_x: u32,
    pub character_y: u32,
    pub character_alpha: u8,
    pub taskbar_auto_hide: bool,
    pub taskbar_transparent_gradient: bool,
    pub taskbar_blur_behind: bool,
    pub taskbar_alpha: u8,
    pub auto_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSettings {
    pub res_file_paths: Vec<PathBuf>,
    pub character_font: FontSpec,
    pub character_color: Rgba,
    pub taskbar_color: Rgba,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub point_size: u32,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub debug: bool,
    pub log_level: String,
    pub watcher: WatcherSettings,
    pub runtime: RuntimeSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatcherSettings {
    pub enabled: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub tick_sleep_ms: u64,
    pub taskbar_refresh_ms: u64,
    pub host_check_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ui: UiSettings::default(),
            parameter: ParameterSettings::default(),
            app: AppSettings::default(),
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            resource_mode: ResourceMode::MultiImage,
            image_time_secs: 5,
            video_volume: 0,
            character_visible: false,
            character_text: String::new(),
            character_x: 0,
            character_y: 0,
            character_alpha: CHARACTER_ALPHA_MIN,
            taskbar_auto_hide: true,
            taskbar_transparent_gradient: false,
            taskbar_blur_behind: false,
            taskbar_alpha: 0,
            auto_run: false,
        }
    }
}

impl Default for ParameterSettings {
    fn default() -> Self {
        Self {
            res_file_paths: Vec::new(),
            character_font: FontSpec::default(),
            character_color: Rgba::OPAQUE_BLACK,
            taskbar_color: Rgba::CLEAR_WHITE,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Microsoft YaHei".to_string(),
            point_size: 9,
            bold: false,
            italic: false,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "warn".to_string(),
            watcher: WatcherSettings::default(),
            runtime: RuntimeSettings::default(),
        }
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 600,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_sleep_ms: 8,
            taskbar_refresh_ms: 10,
            host_check_interval_ms: 2000,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Option<Self> {
        let value = load_yaml(path)?;
        Self::from_yaml(&value)
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        save_yaml(path, &self.to_yaml())
    }

    /// Missing groups and keys fall back to defaults; values are clamped to
    /// the ranges the settings can hold. Only a non-mapping root is rejected.
    pub fn from_yaml(root: &Value) -> Option<Self> {
        let map = root.as_mapping()?;
        let empty = Mapping::new();

        Some(Self {
            ui: parse_ui(mapping_at(map, keys::UI).unwrap_or(&empty)),
            parameter: parse_parameter(mapping_at(map, keys::PARAMETER).unwrap_or(&empty)),
            app: parse_app(mapping_at(map, keys::APP).unwrap_or(&empty)),
        })
    }

    pub fn to_yaml(&self) -> Value {
        let ui = &self.ui;
        let mut ui_map = Mapping::new();
        put(&mut ui_map, keys::RES_TYPE, ui.resource_mode == ResourceMode::MultiImage);
        put(&mut ui_map, keys::IMAGE_TIME, ui.image_time_secs);
        put(&mut ui_map, keys::VIDEO_VOLUME, ui.video_volume);
        put(&mut ui_map, keys::CHARACTER_VISIBLE, ui.character_visible);
        put(&mut ui_map, keys::CHARACTER_TEXT, ui.character_text.as_str());
        put(&mut ui_map, keys::CHARACTER_X, ui.character_x);
        put(&mut ui_map, keys::CHARACTER_Y, ui.character_y);
        put(&mut ui_map, keys::CHARACTER_SLIDER, ui.character_alpha);
        put(&mut ui_map, keys::TASKBAR_AUTO_HIDE, ui.taskbar_auto_hide);
        put(&mut ui_map, keys::TASKBAR_TRANSPARENT_GRADIENT, ui.taskbar_transparent_gradient);
        put(&mut ui_map, keys::TASKBAR_BLUR_BEHIND, ui.taskbar_blur_behind);
        put(&mut ui_map, keys::TASKBAR_ALPHA, ui.taskbar_alpha);
        put(&mut ui_map, keys::AUTO_RUN, ui.auto_run);

        let param = &self.parameter;
        let mut param_map = Mapping::new();
        let paths: Vec<Value> = param
            .res_file_paths
            .iter()
            .map(|p| Value::from(p.to_string_lossy().to_string()))
            .collect();
        put(&mut param_map, keys::RES_FILE_PATH, Value::Sequence(paths));

        let mut font_map = Mapping::new();
        put(&mut font_map, "family", param.character_font.family.as_str());
        put(&mut font_map, "size", param.character_font.point_size);
        put(&mut font_map, "bold", param.character_font.bold);
        put(&mut font_map, "italic", param.character_font.italic);
        put(&mut param_map, keys::CHARACTER_FONT, Value::Mapping(font_map));
        put(&mut param_map, keys::CHARACTER_COLOR, param.character_color.to_string());
        put(&mut param_map, keys::TASKBAR_COLOR, param.taskbar_color.to_string());

        let app = &self.app;
        let mut watcher_map = Mapping::new();
        put(&mut watcher_map, "enabled", app.watcher.enabled);
        put(&mut watcher_map, "interval_ms", app.watcher.interval_ms);
        let mut runtime_map = Mapping::new();
        put(&mut runtime_map, "tick_sleep_ms", app.runtime.tick_sleep_ms);
        put(&mut runtime_map, "taskbar_refresh_ms", app.runtime.taskbar_refresh_ms);
        put(&mut runtime_map, "host_check_interval_ms", app.runtime.host_check_interval_ms);
        let mut app_map = Mapping::new();
        put(&mut app_map, "debug", app.debug);
        put(&mut app_map, "log_level", app.log_level.as_str());
        put(&mut app_map, "watcher", Value::Mapping(watcher_map));
        put(&mut app_map, "runtime", Value::Mapping(runtime_map));

        let mut root = Mapping::new();
        put(&mut root, keys::UI, Value::Mapping(ui_map));
        put(&mut root, keys::PARAMETER, Value::Mapping(param_map));
        put(&mut root, keys::APP, Value::Mapping(app_map));
        Value::Mapping(root)
    }

    /// True when the wallpaper has to be torn down and rebuilt to reflect `other`,
    /// as opposed to updating the running one in place.
    pub fn wallpaper_differs(&self, other: &Settings) -> bool {
        self.ui.resource_mode != other.ui.resource_mode
            || self.parameter.res_file_paths != other.parameter.res_file_paths
    }

    pub fn taskbar_differs(&self, other: &Settings) -> bool {
        self.ui.taskbar_auto_hide != other.ui.taskbar_auto_hide
            || self.ui.taskbar_transparent_gradient != other.ui.taskbar_transparent_gradient
            || self.ui.taskbar_blur_behind != other.ui.taskbar_blur_behind
            || self.ui.taskbar_alpha != other.ui.taskbar_alpha
            || self.parameter.taskbar_color != other.parameter.taskbar_color
    }
}

fn parse_ui(map: &Mapping) -> UiSettings {
    let mut ui = UiSettings::default();

    ui.resource_mode = match bool_at(map, keys::RES_TYPE) {
        Some(false) => ResourceMode::SingleFile,
        Some(true) => ResourceMode::MultiImage,
        None => ui.resource_mode,
    };
    ui.image_time_secs = u32_at(map, keys::IMAGE_TIME)
        .unwrap_or(ui.image_time_secs)
        .clamp(IMAGE_TIME_RANGE.0, IMAGE_TIME_RANGE.1);
    ui.video_volume = u32_at(map, keys::VIDEO_VOLUME)
        .map(|v| v.min(VOLUME_MAX as u32) as u8)
        .unwrap_or(ui.video_volume);
    ui.character_visible = bool_at(map, keys::CHARACTER_VISIBLE).unwrap_or(ui.character_visible);
    ui.character_text = str_at(map, keys::CHARACTER_TEXT)
        .map(str::to_string)
        .unwrap_or(ui.character_text);
    ui.character_x = u32_at(map, keys::CHARACTER_X)
        .unwrap_or(ui.character_x)
        .min(POSITION_MAX);
    ui.character_y = u32_at(map, keys::CHARACTER_Y)
        .unwrap_or(ui.character_y)
        .min(POSITION_MAX);
    ui.character_alpha = u32_at(map, keys::CHARACTER_SLIDER)
        .map(|v| v.clamp(CHARACTER_ALPHA_MIN as u32, 255) as u8)
        .unwrap_or(ui.character_alpha);
    ui.taskbar_auto_hide = bool_at(map, keys::TASKBAR_AUTO_HIDE).unwrap_or(ui.taskbar_auto_hide);
    ui.taskbar_transparent_gradient = bool_at(map, keys::TASKBAR_TRANSPARENT_GRADIENT)
        .unwrap_or(ui.taskbar_transparent_gradient);
    ui.taskbar_blur_behind = bool_at(map, keys::TASKBAR_BLUR_BEHIND).unwrap_or(ui.taskbar_blur_behind);
    ui.taskbar_alpha = u32_at(map, keys::TASKBAR_ALPHA)
        .map(|v| v.min(255) as u8)
        .unwrap_or(ui.taskbar_alpha);
    ui.auto_run = bool_at(map, keys::AUTO_RUN).unwrap_or(ui.auto_run);

    ui
}

fn parse_parameter(map: &Mapping) -> ParameterSettings {
    let mut param = ParameterSettings::default();

    if let Some(paths) = string_list_at(map, keys::RES_FILE_PATH) {
        param.res_file_paths = paths
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
    }

    if let Some(font) = mapping_at(map, keys::CHARACTER_FONT) {
        let defaults = FontSpec::default();
        param.character_font = FontSpec {
            family: str_at(font, "family")
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .unwrap_or(defaults.family),
            point_size: u32_at(font, "size").unwrap_or(defaults.point_size).clamp(1, 512),
            bold: bool_at(font, "bold").unwrap_or(defaults.bold),
            italic: bool_at(font, "italic").unwrap_or(defaults.italic),
        };
    }

    param.character_color = str_at(map, keys::CHARACTER_COLOR)
        .and_then(Rgba::parse)
        .unwrap_or(param.character_color);
    param.taskbar_color = str_at(map, keys::TASKBAR_COLOR)
        .and_then(Rgba::parse)
        .unwrap_or(param.taskbar_color);

    param
}

fn parse_app(map: &Mapping) -> AppSettings {
    let mut app = AppSettings::default();

    app.debug = bool_at(map, "debug").unwrap_or(app.debug);
    app.log_level = str_at(map, "log_level")
        .unwrap_or(&app.log_level)
        .to_lowercase();

    if let Some(watcher) = mapping_at(map, "watcher") {
        app.watcher.enabled = bool_any(watcher, &["enabled", "live_reload"]).unwrap_or(app.watcher.enabled);
        app.watcher.interval_ms = u64_any(watcher, &["interval_ms", "check_interval_ms"])
            .unwrap_or(app.watcher.interval_ms)
            .max(100);
    }

    if let Some(runtime) = mapping_at(map, "runtime") {
        app.runtime.tick_sleep_ms = u64_at(runtime, "tick_sleep_ms")
            .unwrap_or(app.runtime.tick_sleep_ms)
            .max(1);
        app.runtime.taskbar_refresh_ms = u64_at(runtime, "taskbar_refresh_ms")
            .unwrap_or(app.runtime.taskbar_refresh_ms)
            .max(1);
        app.runtime.host_check_interval_ms = u64_at(runtime, "host_check_interval_ms")
            .unwrap_or(app.runtime.host_check_interval_ms)
            .max(250);
    }

    app
}

fn put(map: &mut Mapping, key: &str, value: impl Into<Value>) {
    map.insert(Value::String(key.to_string()), value.into());
}

fn bool_at(map: &Mapping, key: &str) -> Option<bool> {
    map.get(Value::String(key.to_string()))?.as_bool()
}

fn bool_any(map: &Mapping, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| bool_at(map, k))
}

fn str_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(Value::String(key.to_string()))?.as_str()
}

fn mapping_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    map.get(Value::String(key.to_string()))?.as_mapping()
}

fn u64_at(map: &Mapping, key: &str) -> Option<u64> {
    map.get(Value::String(key.to_string()))?
        .as_i64()
        .map(|v| v.max(0) as u64)
}

fn u64_any(map: &Mapping, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| u64_at(map, k))
}

fn u32_at(map: &Mapping, key: &str) -> Option<u32> {
    u64_at(map, key).map(|v| v.min(u32::MAX as u64) as u32)
}

/// A single string is accepted as a one-element list.
fn string_list_at(map: &Mapping, key: &str) -> Option<Vec<String>> {
    let value = map.get(Value::String(key.to_string()))?;
    if let Some(single) = value.as_str() {
        return Some(vec![single.to_string()]);
    }

    let list = value.as_sequence()?;
    Some(
        list.iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Settings {
        Settings::from_yaml(&serde_yaml::from_str(text).unwrap()).unwrap()
    }

    fn customized() -> Settings {
        let mut s = Settings::default();
        s.ui.resource_mode = ResourceMode::SingleFile;
        s.ui.image_time_secs = 42;
        s.ui.video_volume = 63;
        s.ui.character_visible = true;
        s.ui.character_text = "hello: world".to_string();
        s.ui.character_x = 120;
        s.ui.character_y = 640;
        s.ui.character_alpha = 200;
        s.ui.taskbar_auto_hide = false;
        s.ui.taskbar_blur_behind = true;
        s.ui.taskbar_alpha = 77;
        s.ui.auto_run = true;
        s.parameter.res_file_paths = vec![PathBuf::from(r"C:\Videos\loop.mp4")];
        s.parameter.character_font = FontSpec {
            family: "Segoe UI".to_string(),
            point_size: 28,
            bold: true,
            italic: true,
        };
        s.parameter.character_color = Rgba::new(10, 20, 30, 40);
        s.parameter.taskbar_color = Rgba::new(200, 100, 50, 77);
        s.app.debug = true;
        s.app.log_level = "info".to_string();
        s.app.runtime.taskbar_refresh_ms = 15;
        s
    }

    #[test]
    fn written_settings_read_back_identically() {
        let dir = std::env::temp_dir().join(format!("simple-desktop-settings-{}", std::process::id()));
        let path = dir.join("settings.yaml");
        let original = customized();

        original.save(&path).unwrap();
        let restored = Settings::load(&path).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn persisted_file_uses_fixed_key_names() {
        let value = Settings::default().to_yaml();
        let ui = value.get(keys::UI).unwrap();
        let param = value.get(keys::PARAMETER).unwrap();

        for key in [
            "resType",
            "imageTime",
            "vedioVolume",
            "characterVisible",
            "characteText",
            "characteX",
            "characteY",
            "characteSlider",
            "taskBarAutoHideBox",
            "taskBarTransparentgradientBtn",
            "taskBarBlurbehindBtn",
            "taskBarAlphaSlider",
            "autoRuning",
        ] {
            assert!(ui.get(key).is_some(), "missing Ui/{key}");
        }
        for key in ["resFilePath", "characteFont", "characteColor", "taskBarColor"] {
            assert!(param.get(key).is_some(), "missing Parameter/{key}");
        }
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(parse("{}"), Settings::default());
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        assert!(Settings::from_yaml(&serde_yaml::from_str("- 1\n- 2").unwrap()).is_none());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let s = parse(
            "Ui:\n  imageTime: 0\n  vedioVolume: 250\n  characteSlider: 3\n  characteX: 999999\n  taskBarAlphaSlider: -4\n",
        );
        assert_eq!(s.ui.image_time_secs, 1);
        assert_eq!(s.ui.video_volume, 100);
        assert_eq!(s.ui.character_alpha, CHARACTER_ALPHA_MIN);
        assert_eq!(s.ui.character_x, POSITION_MAX);
        assert_eq!(s.ui.taskbar_alpha, 0);

        let s = parse("Ui:\n  imageTime: 5000\n");
        assert_eq!(s.ui.image_time_secs, 1000);
    }

    #[test]
    fn mistyped_values_fall_back_to_defaults() {
        let s = parse("Ui:\n  resType: maybe\n  imageTime: soon\nParameter:\n  characteColor: blue\n");
        assert_eq!(s.ui.resource_mode, ResourceMode::MultiImage);
        assert_eq!(s.ui.image_time_secs, 5);
        assert_eq!(s.parameter.character_color, Rgba::OPAQUE_BLACK);
    }

    #[test]
    fn single_path_string_is_accepted() {
        let s = parse("Parameter:\n  resFilePath: 'D:\\clip.mkv'\n");
        assert_eq!(s.parameter.res_file_paths, vec![PathBuf::from(r"D:\clip.mkv")]);
    }

    #[test]
    fn wallpaper_rebuild_only_for_source_changes() {
        let base = Settings::default();

        let mut volume = base.clone();
        volume.ui.video_volume = 80;
        volume.ui.character_text = "caption".to_string();
        assert!(!base.wallpaper_differs(&volume));

        let mut files = base.clone();
        files.parameter.res_file_paths.push(PathBuf::from("a.png"));
        assert!(base.wallpaper_differs(&files));

        let mut mode = base.clone();
        mode.ui.resource_mode = ResourceMode::SingleFile;
        assert!(base.wallpaper_differs(&mode));
    }

    #[test]
    fn taskbar_changes_ignore_wallpaper_fields() {
        let base = Settings::default();

        let mut caption = base.clone();
        caption.ui.character_text = "caption".to_string();
        assert!(!base.taskbar_differs(&caption));

        let mut alpha = base.clone();
        alpha.ui.taskbar_alpha = 10;
        assert!(base.taskbar_differs(&alpha));

        let mut color = base.clone();
        color.parameter.taskbar_color = Rgba::OPAQUE_BLACK;
        assert!(base.taskbar_differs(&color));
    }
}
