use std::{
    fs, ptr,
    sync::{mpsc, OnceLock},
    time::{Duration, Instant},
};

use webview2_com::{
    CoreWebView2EnvironmentOptions,
    Microsoft::Web::WebView2::Win32::*,
};
use windows::{
    core::{w, HSTRING, PCWSTR},
    Win32::{
        Foundation::{E_POINTER, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM},
        System::{Com::*, LibraryLoader::GetModuleHandleW},
        UI::WindowsAndMessaging::{
            CreateWindowExW, DefWindowProcW, DestroyWindow, FindWindowW, GetParent, GetWindowLongW,
            RegisterClassW, SetParent, SetWindowLongW, SetWindowPos, GWL_EXSTYLE, GWL_STYLE, HWND_TOP,
            SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_SHOWWINDOW, WINDOW_EX_STYLE,
            WINDOW_STYLE, WNDCLASSW, WS_CAPTION, WS_CHILD, WS_CLIPCHILDREN, WS_CLIPSIBLINGS,
            WS_EX_APPWINDOW, WS_EX_DLGMODALFRAME, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
            WS_EX_WINDOWEDGE, WS_MAXIMIZEBOX, WS_MINIMIZEBOX, WS_SYSMENU, WS_THICKFRAME, WS_VISIBLE,
        },
    },
};

use crate::{
    data_loaders::settings::Settings,
    debug,
    desktop::{find_desktop_host, primary_monitor_rect, window_rect},
    error, info,
    media::{self, MediaKind, WallpaperSource},
    page::{self, path_to_file_url, CaptionStyle, PageMessage, Slideshow},
    paths,
    utility::to_wstring,
    warn,
};

const HOST_CLASS_NAME: PCWSTR = w!("SimpleDesktopWallpaperWindow");
const BROWSER_ARGS: &str = "--autoplay-policy=no-user-gesture-required";

struct HostedWallpaper {
    hwnd: HWND,
    parent: HWND,
    controller: ICoreWebView2Controller,
    webview: ICoreWebView2,
    monitor_rect: RECT,
    kind: MediaKind,
    caption: CaptionStyle,
    volume: u8,
}

impl Drop for HostedWallpaper {
    fn drop(&mut self) {
        unsafe {
            // Closing the controller stops any playing video.
            let _ = self.controller.Close();
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostHealth {
    Healthy,
    /// The window had been detached and was parented back under the desktop.
    Reattached,
    /// The desktop host or the monitor layout changed; the wallpaper must be rebuilt.
    Lost,
}

pub struct WallpaperRuntime {
    hosted: Option<HostedWallpaper>,
    slideshow: Option<Slideshow>,
}

impl WallpaperRuntime {
    pub fn new() -> Self {
        let _ = ensure_host_class();
        unsafe {
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        }

        Self {
            hosted: None,
            slideshow: None,
        }
    }

    /// Tears down the current wallpaper and builds the one `settings` selects.
    pub fn apply(&mut self, settings: &Settings) {
        self.remove();

        let Some(source) = media::resolve(settings) else {
            info!("[WALLPAPER] No wallpaper selected");
            return;
        };

        match self.launch(&source, settings) {
            Ok(()) => warn!(
                "[WALLPAPER] Showing {} wallpaper ({} file(s))",
                source.kind().label(),
                source.image_count().max(1)
            ),
            Err(e) => error!("[WALLPAPER] Failed to show {} wallpaper: {}", source.kind().label(), e),
        }
    }

    pub fn remove(&mut self) {
        if self.hosted.take().is_some() {
            debug!("[WALLPAPER] Removed previous wallpaper");
        }
        self.slideshow = None;
    }

    fn launch(&mut self, source: &WallpaperSource, settings: &Settings) -> Result<(), String> {
        let desktop = find_desktop_host().ok_or_else(|| "Failed to locate the desktop host window".to_string())?;
        let parent_rect =
            window_rect(desktop).ok_or_else(|| "Failed to read desktop host window rect".to_string())?;
        let monitor_rect =
            primary_monitor_rect().ok_or_else(|| "No monitors detected".to_string())?;

        let page_path = paths::wallpaper_page_path();
        fs::write(&page_path, page::build(source, settings))
            .map_err(|e| format!("Failed to write {}: {e}", page_path.display()))?;

        let hwnd = create_desktop_child_window(desktop, parent_rect, monitor_rect)?;
        if let Err(e) = apply_host_style(hwnd) {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(e);
        }

        let controller = match create_webview_controller(hwnd, monitor_rect, &path_to_file_url(&page_path)) {
            Ok(controller) => controller,
            Err(e) => {
                unsafe {
                    let _ = DestroyWindow(hwnd);
                }
                return Err(e);
            }
        };

        let webview = match unsafe { controller.CoreWebView2() } {
            Ok(webview) => webview,
            Err(e) => {
                unsafe {
                    let _ = controller.Close();
                    let _ = DestroyWindow(hwnd);
                }
                return Err(format!("WebView2 CoreWebView2 unavailable: {e:?}"));
            }
        };

        let kind = source.kind();
        self.hosted = Some(HostedWallpaper {
            hwnd,
            parent: desktop,
            controller,
            webview,
            monitor_rect,
            kind,
            caption: CaptionStyle::from_settings(settings, kind),
            volume: settings.ui.video_volume,
        });

        if source.image_count() > 1 {
            self.slideshow = Some(Slideshow::new(
                source.image_count(),
                image_interval(settings),
                Instant::now(),
            ));
        }

        Ok(())
    }

    /// Pushes settings that do not require a rebuild into the running page.
    pub fn update(&mut self, settings: &Settings) {
        let Some(hosted) = self.hosted.as_mut() else {
            return;
        };

        if hosted.kind == MediaKind::Video && hosted.volume != settings.ui.video_volume {
            hosted.volume = settings.ui.video_volume;
            let _ = post_webview_json(&hosted.webview, &PageMessage::volume(hosted.volume).to_json());
            debug!("[WALLPAPER] Volume set to {}", hosted.volume);
        }

        let caption = CaptionStyle::from_settings(settings, hosted.kind);
        if caption != hosted.caption {
            let _ = post_webview_json(&hosted.webview, &PageMessage::Caption(caption.clone()).to_json());
            hosted.caption = caption;
            debug!("[WALLPAPER] Caption updated");
        }

        if let Some(show) = self.slideshow.as_mut() {
            let interval = image_interval(settings);
            if show.interval() != interval {
                show.set_interval(interval, Instant::now());
                debug!("[WALLPAPER] Slideshow interval set to {:?}", interval);
            }
        }
    }

    /// Advances the slideshow when its interval has elapsed.
    pub fn tick(&mut self, now: Instant) {
        let (Some(hosted), Some(show)) = (self.hosted.as_ref(), self.slideshow.as_mut()) else {
            return;
        };

        if let Some(index) = show.advance(now) {
            let _ = post_webview_json(&hosted.webview, &PageMessage::Slide { index }.to_json());
        }
    }

    /// With nothing hosted, reports `Lost` once a wallpaper is configured and
    /// the desktop host exists, so a launch that failed before the shell was up
    /// gets retried.
    pub fn check_host(&mut self, settings: &Settings) -> HostHealth {
        let progman = unsafe { FindWindowW(w!("Progman"), PCWSTR::null()).ok() };

        let Some(hosted) = self.hosted.as_ref() else {
            return missing_host_health(progman.is_some(), media::resolve(settings).is_some());
        };

        if progman != Some(hosted.parent) {
            warn!("[WALLPAPER][HOST] Desktop host changed (Explorer restarted?)");
            return HostHealth::Lost;
        }

        if primary_monitor_rect().map(|r| r != hosted.monitor_rect).unwrap_or(true) {
            warn!("[WALLPAPER][HOST] Primary monitor layout changed");
            return HostHealth::Lost;
        }

        let current_parent = unsafe { GetParent(hosted.hwnd).ok() };
        if current_parent != Some(hosted.parent) {
            return match unsafe { SetParent(hosted.hwnd, Some(hosted.parent)) } {
                Ok(_) => {
                    warn!("[WALLPAPER][HOST] Wallpaper window re-parented under desktop host");
                    HostHealth::Reattached
                }
                Err(e) => {
                    warn!("[WALLPAPER][HOST] Re-parenting failed: {e:?}");
                    HostHealth::Lost
                }
            };
        }

        HostHealth::Healthy
    }
}

fn missing_host_health(shell_ready: bool, wallpaper_wanted: bool) -> HostHealth {
    if shell_ready && wallpaper_wanted {
        HostHealth::Lost
    } else {
        HostHealth::Healthy
    }
}

fn image_interval(settings: &Settings) -> Duration {
    Duration::from_secs(settings.ui.image_time_secs as u64)
}

fn post_webview_json(webview: &ICoreWebView2, payload: &str) -> Result<(), String> {
    let payload_wide = to_wstring(payload);
    unsafe {
        webview
            .PostWebMessageAsJson(PCWSTR(payload_wide.as_ptr()))
            .map_err(|e| format!("WebView2 PostWebMessageAsJson failed: {e:?}"))
    }
}

fn ensure_host_class() -> Result<(), String> {
    static CLASS_ONCE: OnceLock<bool> = OnceLock::new();
    if CLASS_ONCE.get().is_some() {
        return Ok(());
    }

    let hinstance = unsafe {
        GetModuleHandleW(None)
            .map(|h| HINSTANCE(h.0))
            .map_err(|e| format!("GetModuleHandleW failed: {e:?}"))?
    };

    let wc = WNDCLASSW {
        lpfnWndProc: Some(host_window_proc),
        hInstance: hinstance,
        lpszClassName: HOST_CLASS_NAME,
        ..Default::default()
    };

    unsafe {
        let _ = RegisterClassW(&wc);
    }

    let _ = CLASS_ONCE.set(true);
    Ok(())
}

unsafe extern "system" fn host_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn create_desktop_child_window(desktop: HWND, parent_rect: RECT, rect: RECT) -> Result<HWND, String> {
    let x = rect.left - parent_rect.left;
    let y = rect.top - parent_rect.top;
    let width = rect.right - rect.left;
    let height = rect.bottom - rect.top;
    debug!(
        "[WALLPAPER][HOST] creating child window parent={:?} pos=({}, {}) size={}x{}",
        desktop,
        x,
        y,
        width,
        height
    );

    let style = WINDOW_STYLE((WS_CHILD | WS_VISIBLE | WS_CLIPSIBLINGS | WS_CLIPCHILDREN).0);
    let ex_style = WINDOW_EX_STYLE((WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE).0);

    let hinstance = unsafe {
        GetModuleHandleW(None)
            .map(|h| HINSTANCE(h.0))
            .map_err(|e| format!("GetModuleHandleW failed: {e:?}"))?
    };

    let hwnd = unsafe {
        CreateWindowExW(
            ex_style,
            HOST_CLASS_NAME,
            PCWSTR::null(),
            style,
            x,
            y,
            width,
            height,
            Some(desktop),
            None,
            Some(hinstance),
            Some(ptr::null()),
        )
    }
    .map_err(|e| format!("CreateWindowExW failed: {e:?}"))?;

    Ok(hwnd)
}

/// Strips frame decorations and keeps the window out of the taskbar and Alt+Tab.
fn apply_host_style(hwnd: HWND) -> Result<(), String> {
    unsafe {
        let style = GetWindowLongW(hwnd, GWL_STYLE) as u32;
        let mut new_style = style
            & !(WS_CAPTION.0 | WS_THICKFRAME.0 | WS_MINIMIZEBOX.0 | WS_MAXIMIZEBOX.0 | WS_SYSMENU.0);
        new_style |= WS_VISIBLE.0 | WS_CHILD.0;
        let _ = SetWindowLongW(hwnd, GWL_STYLE, new_style as i32);

        let ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE) as u32;
        let mut new_ex = ex_style & !(WS_EX_APPWINDOW.0 | WS_EX_WINDOWEDGE.0 | WS_EX_DLGMODALFRAME.0);
        new_ex |= WS_EX_TOOLWINDOW.0 | WS_EX_NOACTIVATE.0;
        let _ = SetWindowLongW(hwnd, GWL_EXSTYLE, new_ex as i32);

        SetWindowPos(
            hwnd,
            Some(HWND_TOP),
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_SHOWWINDOW | SWP_FRAMECHANGED,
        )
        .map_err(|e| format!("SetWindowPos failed for host style: {e:?}"))
    }
}

fn create_webview_controller(hwnd: HWND, rect: RECT, url: &str) -> Result<ICoreWebView2Controller, String> {
    debug!("[WALLPAPER][WEBVIEW] creating environment for hwnd={:?}", hwnd);
    let environment = {
        let (tx, rx) = mpsc::channel();
        let data_dir = HSTRING::from(paths::app_data_dir().join("WebView2").as_path());
        let options = CoreWebView2EnvironmentOptions::default();
        unsafe {
            options.set_additional_browser_arguments(BROWSER_ARGS.to_string());
        }
        let options = ICoreWebView2EnvironmentOptions::from(options);

        webview2_com::CreateCoreWebView2EnvironmentCompletedHandler::wait_for_async_operation(
            Box::new(move |handler| unsafe {
                CreateCoreWebView2EnvironmentWithOptions(PCWSTR::null(), &data_dir, &options, &handler)
                    .map_err(webview2_com::Error::WindowsError)
            }),
            Box::new(move |error_code, environment| {
                error_code?;
                let _ = tx.send(environment.ok_or_else(|| windows::core::Error::from(E_POINTER)));
                Ok(())
            }),
        )
        .map_err(|e| format!("CreateCoreWebView2Environment failed: {e:?}"))?;

        rx.recv()
            .map_err(|_| "Failed to receive WebView2 environment".to_string())?
            .map_err(|e| format!("WebView2 environment unavailable: {e:?}"))?
    };

    let controller = {
        let (tx, rx) = mpsc::channel();

        webview2_com::CreateCoreWebView2ControllerCompletedHandler::wait_for_async_operation(
            Box::new(move |handler| unsafe {
                environment
                    .CreateCoreWebView2Controller(hwnd, &handler)
                    .map_err(webview2_com::Error::WindowsError)
            }),
            Box::new(move |error_code, controller| {
                error_code?;
                let _ = tx.send(controller.ok_or_else(|| windows::core::Error::from(E_POINTER)));
                Ok(())
            }),
        )
        .map_err(|e| format!("CreateCoreWebView2Controller failed: {e:?}"))?;

        rx.recv()
            .map_err(|_| "Failed to receive WebView2 controller".to_string())?
            .map_err(|e| format!("WebView2 controller unavailable: {e:?}"))?
    };
    debug!("[WALLPAPER][WEBVIEW] controller ready for hwnd={:?}", hwnd);

    unsafe {
        let width = rect.right - rect.left;
        let height = rect.bottom - rect.top;
        controller
            .SetBounds(RECT {
                left: 0,
                top: 0,
                right: width,
                bottom: height,
            })
            .map_err(|e| format!("WebView2 SetBounds failed: {e:?}"))?;

        controller
            .SetIsVisible(true)
            .map_err(|e| format!("WebView2 SetIsVisible failed: {e:?}"))?;

        let webview = controller
            .CoreWebView2()
            .map_err(|e| format!("WebView2 CoreWebView2 unavailable: {e:?}"))?;

        let url_wide = to_wstring(url);
        webview
            .Navigate(PCWSTR(url_wide.as_ptr()))
            .map_err(|e| format!("WebView2 Navigate failed for '{}': {e:?}", url))?;
    }
    debug!("[WALLPAPER][WEBVIEW] navigated to '{}'", url);

    Ok(controller)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_wallpaper_is_retried_once_the_shell_is_up() {
        assert_eq!(missing_host_health(true, true), HostHealth::Lost);
        assert_eq!(missing_host_health(false, true), HostHealth::Healthy);
        assert_eq!(missing_host_health(true, false), HostHealth::Healthy);
    }

    #[test]
    fn idle_runtime_without_wallpaper_stays_healthy() {
        let mut runtime = WallpaperRuntime {
            hosted: None,
            slideshow: None,
        };
        assert_eq!(runtime.check_host(&Settings::default()), HostHealth::Healthy);
    }
}
