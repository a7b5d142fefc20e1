//! The HTML document the WebView2 surface renders, and the JSON messages used
//! to update it while it runs.

use std::{
    path::Path,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{
    data_loaders::settings::Settings,
    media::{MediaKind, WallpaperSource},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionStyle {
    pub visible: bool,
    pub text: String,
    pub family: String,
    pub size_pt: u32,
    pub bold: bool,
    pub italic: bool,
    pub color: String,
    pub x: u32,
    pub y: u32,
}

impl CaptionStyle {
    /// Captions are drawn over still and animated images only, never over video.
    /// The alpha slider overrides the alpha of the chosen color.
    pub fn from_settings(settings: &Settings, kind: MediaKind) -> Self {
        let ui = &settings.ui;
        let font = &settings.parameter.character_font;
        Self {
            visible: ui.character_visible && kind != MediaKind::Video,
            text: ui.character_text.clone(),
            family: font.family.clone(),
            size_pt: font.point_size,
            bold: font.bold,
            italic: font.italic,
            color: settings
                .parameter
                .character_color
                .with_alpha(ui.character_alpha)
                .to_css(),
            x: ui.character_x,
            y: ui.character_y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageMessage {
    Slide { index: usize },
    Volume { level: f32 },
    Caption(CaptionStyle),
}

impl PageMessage {
    pub fn volume(percent: u8) -> Self {
        Self::Volume {
            level: f32::from(percent.min(100)) / 100.0,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Serialize)]
struct InitialState<'a> {
    kind: &'a str,
    sources: Vec<String>,
    volume: f32,
    caption: &'a CaptionStyle,
}

/// Builds the full wallpaper page for `source`.
pub fn build(source: &WallpaperSource, settings: &Settings) -> String {
    let kind = source.kind();
    let caption = CaptionStyle::from_settings(settings, kind);
    let sources: Vec<String> = match source {
        WallpaperSource::Images(paths) => paths.iter().map(|p| path_to_file_url(p)).collect(),
        WallpaperSource::Animated(path) | WallpaperSource::Video(path) => vec![path_to_file_url(path)],
    };

    let media_element = match kind {
        MediaKind::Video => r#"<video id="media" autoplay loop playsinline></video>"#,
        MediaKind::Image | MediaKind::Animated => r#"<img id="media" alt="" />"#,
    };

    let state = InitialState {
        kind: kind.label(),
        sources,
        volume: f32::from(settings.ui.video_volume.min(100)) / 100.0,
        caption: &caption,
    };
    let state_json = serde_json::to_string(&state)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");

    format!(
r#"<!DOCTYPE html>
<html>
<head>
	<meta charset="UTF-8" />
	<title>SimpleDesktop</title>
	<style>
		html, body {{ margin: 0; padding: 0; width: 100%; height: 100%; overflow: hidden; background: #000; }}
		#media {{ position: absolute; inset: 0; width: 100%; height: 100%; object-fit: fill; }}
		#caption {{ position: absolute; white-space: pre; pointer-events: none; display: none; }}
	</style>
</head>
<body>
	{media_element}
	<div id="caption"></div>
	<script>
		const state = {state_json};
		const media = document.getElementById("media");
		const caption = document.getElementById("caption");

		function applyCaption(c) {{
			caption.textContent = c.text;
			caption.style.left = c.x + "px";
			caption.style.top = c.y + "px";
			caption.style.fontFamily = JSON.stringify(c.family);
			caption.style.fontSize = c.size_pt + "pt";
			caption.style.fontWeight = c.bold ? "bold" : "normal";
			caption.style.fontStyle = c.italic ? "italic" : "normal";
			caption.style.color = c.color;
			caption.style.display = c.visible ? "block" : "none";
		}}

		function applyVolume(level) {{
			if (state.kind !== "video") return;
			media.volume = level;
			media.muted = level <= 0;
		}}

		media.src = state.sources[0];
		applyVolume(state.volume);
		applyCaption(state.caption);
		if (state.kind === "video") {{
			media.addEventListener("ended", () => {{ media.currentTime = 0; media.play(); }});
		}}

		if (window.chrome && window.chrome.webview) {{
			window.chrome.webview.addEventListener("message", (event) => {{
				const msg = event.data;
				if (msg.type === "slide" && state.sources[msg.index]) media.src = state.sources[msg.index];
				else if (msg.type === "volume") applyVolume(msg.level);
				else if (msg.type === "caption") applyCaption(msg);
			}});
		}}
	</script>
</body>
</html>
"#
    )
}

/// Cycles through `count` images, one step per interval.
#[derive(Debug, Clone)]
pub struct Slideshow {
    count: usize,
    index: usize,
    interval: Duration,
    last_switch: Instant,
}

impl Slideshow {
    pub fn new(count: usize, interval: Duration, now: Instant) -> Self {
        Self {
            count,
            index: 0,
            interval,
            last_switch: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Changing the interval restarts the countdown.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        self.last_switch = now;
    }

    /// Returns the new index when it is time to switch.
    pub fn advance(&mut self, now: Instant) -> Option<usize> {
        if self.count <= 1 || now.duration_since(self.last_switch) < self.interval {
            return None;
        }

        self.index = (self.index + 1) % self.count;
        self.last_switch = now;
        Some(self.index)
    }
}

pub fn path_to_file_url(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    // `//host/share/...` keeps the host as the URL authority.
    let (prefix, rest) = if let Some(unc) = normalized.strip_prefix("//?/UNC/") {
        ("file://", unc)
    } else if let Some(local) = normalized.strip_prefix("//?/") {
        ("file:///", local)
    } else if let Some(unc) = normalized.strip_prefix("//") {
        ("file://", unc)
    } else {
        ("file:///", normalized.trim_start_matches('/'))
    };

    let mut encoded = String::with_capacity(rest.len());
    for ch in rest.chars() {
        match ch {
            ' ' => encoded.push_str("%20"),
            '#' => encoded.push_str("%23"),
            '%' => encoded.push_str("%25"),
            '?' => encoded.push_str("%3F"),
            _ => encoded.push(ch),
        }
    }
    format!("{prefix}{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use std::path::PathBuf;

    #[test]
    fn caption_is_hidden_over_video() {
        let mut s = Settings::default();
        s.ui.character_visible = true;

        assert!(CaptionStyle::from_settings(&s, MediaKind::Image).visible);
        assert!(CaptionStyle::from_settings(&s, MediaKind::Animated).visible);
        assert!(!CaptionStyle::from_settings(&s, MediaKind::Video).visible);

        s.ui.character_visible = false;
        assert!(!CaptionStyle::from_settings(&s, MediaKind::Image).visible);
    }

    #[test]
    fn caption_alpha_comes_from_slider() {
        let mut s = Settings::default();
        s.parameter.character_color = Rgba::new(255, 0, 0, 255);
        s.ui.character_alpha = 51;

        let caption = CaptionStyle::from_settings(&s, MediaKind::Image);
        assert_eq!(caption.color, "rgba(255, 0, 0, 0.200)");
    }

    #[test]
    fn messages_are_tagged_json() {
        assert_eq!(PageMessage::Slide { index: 3 }.to_json(), r#"{"type":"slide","index":3}"#);
        assert_eq!(PageMessage::volume(50).to_json(), r#"{"type":"volume","level":0.5}"#);
        assert_eq!(PageMessage::volume(200), PageMessage::Volume { level: 1.0 });

        let caption = CaptionStyle::from_settings(&Settings::default(), MediaKind::Image);
        let json: serde_json::Value = serde_json::from_str(&PageMessage::Caption(caption).to_json()).unwrap();
        assert_eq!(json["type"], "caption");
        assert_eq!(json["family"], "Microsoft YaHei");
    }

    #[test]
    fn page_uses_renderer_for_kind() {
        let s = Settings::default();
        let video = build(&WallpaperSource::Video(PathBuf::from(r"C:\clips\sea.mp4")), &s);
        assert!(video.contains("<video id=\"media\" autoplay loop"));
        assert!(video.contains("file:///C:/clips/sea.mp4"));

        let gif = build(&WallpaperSource::Animated(PathBuf::from(r"C:\a.gif")), &s);
        assert!(gif.contains("<img id=\"media\""));
        assert!(!gif.contains("<video"));
    }

    #[test]
    fn caption_text_cannot_close_the_script() {
        let mut s = Settings::default();
        s.ui.character_text = "</script><b>".to_string();
        let page = build(&WallpaperSource::Images(vec![PathBuf::from("a.png")]), &s);
        assert_eq!(page.matches("</script>").count(), 1);
    }

    #[test]
    fn file_urls_are_escaped() {
        assert_eq!(
            path_to_file_url(Path::new(r"C:\My Pictures\#1.png")),
            "file:///C:/My%20Pictures/%231.png"
        );
        assert_eq!(path_to_file_url(Path::new("/tmp/a.png")), "file:///tmp/a.png");
        assert_eq!(
            path_to_file_url(Path::new(r"\\nas\pics\sea view.png")),
            "file://nas/pics/sea%20view.png"
        );
        assert_eq!(
            path_to_file_url(Path::new(r"\\?\UNC\nas\pics\a.png")),
            "file://nas/pics/a.png"
        );
        assert_eq!(path_to_file_url(Path::new(r"\\?\C:\a.png")), "file:///C:/a.png");
    }

    #[test]
    fn slideshow_advances_once_per_interval_and_wraps() {
        let start = Instant::now();
        let mut show = Slideshow::new(3, Duration::from_secs(5), start);

        assert_eq!(show.advance(start + Duration::from_secs(4)), None);
        assert_eq!(show.advance(start + Duration::from_secs(5)), Some(1));
        assert_eq!(show.advance(start + Duration::from_secs(6)), None);
        assert_eq!(show.advance(start + Duration::from_secs(10)), Some(2));
        assert_eq!(show.advance(start + Duration::from_secs(15)), Some(0));
    }

    #[test]
    fn slideshow_interval_change_restarts_countdown() {
        let start = Instant::now();
        let mut show = Slideshow::new(2, Duration::from_secs(5), start);

        show.set_interval(Duration::from_secs(2), start + Duration::from_secs(4));
        assert_eq!(show.advance(start + Duration::from_secs(5)), None);
        assert_eq!(show.advance(start + Duration::from_secs(6)), Some(1));
    }

    #[test]
    fn single_image_never_advances() {
        let start = Instant::now();
        let mut show = Slideshow::new(1, Duration::from_secs(1), start);
        assert_eq!(show.advance(start + Duration::from_secs(60)), None);
        assert_eq!(show.index, 0);
    }
}
