use std::path::{Path, PathBuf};

use image::ImageReader;

use crate::{
    data_loaders::settings::{ResourceMode, Settings},
    debug, warn,
};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "jpe", "jfif", "png", "ico"];
const ANIMATED_EXTENSIONS: &[&str] = &["gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "flv", "rmvb", "avi", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Animated,
    Video,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Animated => "animated",
            Self::Video => "video",
        }
    }
}

/// What the wallpaper window should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WallpaperSource {
    /// One or more still images; more than one cycles as a slideshow.
    Images(Vec<PathBuf>),
    Animated(PathBuf),
    Video(PathBuf),
}

impl WallpaperSource {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Images(_) => MediaKind::Image,
            Self::Animated(_) => MediaKind::Animated,
            Self::Video(_) => MediaKind::Video,
        }
    }

    pub fn image_count(&self) -> usize {
        match self {
            Self::Images(paths) => paths.len(),
            _ => 0,
        }
    }
}

/// Routes a file to its renderer by case-insensitive extension.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if ANIMATED_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Animated)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// The first selected file decides the renderer. Images that fail to decode
/// are dropped; `None` means there is nothing to show.
pub fn resolve(settings: &Settings) -> Option<WallpaperSource> {
    let paths = &settings.parameter.res_file_paths;
    let first = paths.first()?;

    let Some(kind) = classify(first) else {
        warn!("[MEDIA] Unsupported wallpaper file type: {}", first.display());
        return None;
    };

    match kind {
        MediaKind::Image => {
            let candidates: Vec<&PathBuf> = match settings.ui.resource_mode {
                ResourceMode::MultiImage => paths.iter().collect(),
                ResourceMode::SingleFile => vec![first],
            };

            let images: Vec<PathBuf> = candidates
                .into_iter()
                .filter(|p| classify(p) == Some(MediaKind::Image))
                .filter(|p| is_decodable_image(p))
                .cloned()
                .collect();

            if images.is_empty() {
                warn!("[MEDIA] None of {} selected image(s) could be loaded", paths.len());
                return None;
            }
            Some(WallpaperSource::Images(images))
        }
        MediaKind::Animated | MediaKind::Video => {
            if !first.is_file() {
                warn!("[MEDIA] {} file not found: {}", kind.label(), first.display());
                return None;
            }
            Some(match kind {
                MediaKind::Animated => WallpaperSource::Animated(first.clone()),
                _ => WallpaperSource::Video(first.clone()),
            })
        }
    }
}

fn is_decodable_image(path: &Path) -> bool {
    let dimensions = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| e.to_string())
        .and_then(|reader| reader.into_dimensions().map_err(|e| e.to_string()));

    match dimensions {
        Ok((w, h)) if w > 0 && h > 0 => true,
        Ok(_) => false,
        Err(e) => {
            debug!("[MEDIA] Skipping unreadable image {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("simple-desktop-media-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path) {
        RgbImage::from_pixel(4, 3, Rgb([10, 20, 30])).save(path).unwrap();
    }

    fn settings_with(mode: ResourceMode, paths: &[&Path]) -> Settings {
        let mut s = Settings::default();
        s.ui.resource_mode = mode;
        s.parameter.res_file_paths = paths.iter().map(|p| p.to_path_buf()).collect();
        s
    }

    #[test]
    fn extensions_route_to_renderers() {
        for name in ["a.jpg", "a.JPEG", "a.jpe", "a.jfif", "a.Png", "a.ico"] {
            assert_eq!(classify(Path::new(name)), Some(MediaKind::Image), "{name}");
        }
        assert_eq!(classify(Path::new("loop.GIF")), Some(MediaKind::Animated));
        for name in ["a.mp4", "a.flv", "a.RMVB", "a.avi", "a.mkv"] {
            assert_eq!(classify(Path::new(name)), Some(MediaKind::Video), "{name}");
        }
        assert_eq!(classify(Path::new("notes.txt")), None);
        assert_eq!(classify(Path::new("no_extension")), None);
    }

    #[test]
    fn nothing_selected_means_no_wallpaper() {
        assert_eq!(resolve(&Settings::default()), None);
    }

    #[test]
    fn multi_image_mode_keeps_every_loadable_image() {
        let dir = temp_dir("multi");
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        let broken = dir.join("broken.png");
        write_png(&a);
        write_png(&b);
        fs::write(&broken, b"not an image").unwrap();
        let missing = dir.join("missing.png");

        let s = settings_with(ResourceMode::MultiImage, &[&a, &broken, &missing, &b]);
        assert_eq!(resolve(&s), Some(WallpaperSource::Images(vec![a, b])));
    }

    #[test]
    fn single_file_mode_uses_only_the_first_image() {
        let dir = temp_dir("single");
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        write_png(&a);
        write_png(&b);

        let s = settings_with(ResourceMode::SingleFile, &[&a, &b]);
        assert_eq!(resolve(&s), Some(WallpaperSource::Images(vec![a])));
    }

    #[test]
    fn first_file_decides_the_renderer() {
        let dir = temp_dir("first");
        let video = dir.join("clip.mp4");
        let png = dir.join("still.png");
        fs::write(&video, b"").unwrap();
        write_png(&png);

        let s = settings_with(ResourceMode::MultiImage, &[&video, &png]);
        assert_eq!(resolve(&s), Some(WallpaperSource::Video(video)));
    }

    #[test]
    fn missing_animation_is_not_shown() {
        let dir = temp_dir("gif");
        let s = settings_with(ResourceMode::SingleFile, &[&dir.join("gone.gif")]);
        assert_eq!(resolve(&s), None);
    }

    #[test]
    fn unsupported_first_file_is_not_shown() {
        let s = settings_with(ResourceMode::SingleFile, &[Path::new("readme.md")]);
        assert_eq!(resolve(&s), None);
    }
}
