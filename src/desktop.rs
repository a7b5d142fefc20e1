use std::{ffi::c_void, mem, path::Path};

use windows::{
    core::{w, BOOL, PCWSTR},
    Win32::{
        Foundation::{HWND, LPARAM, RECT, WPARAM},
        Graphics::Gdi::{EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFOEXW},
        UI::WindowsAndMessaging::{
            FindWindowExW, FindWindowW, GetWindowRect, SendMessageTimeoutW, ShowWindow,
            SystemParametersInfoW, SMTO_NORMAL, SPIF_SENDWININICHANGE, SPIF_UPDATEINIFILE,
            SPI_SETDESKWALLPAPER, SW_HIDE,
        },
    },
};

use crate::{debug, utility::to_wstring, warn};

/// Undocumented Progman message that makes Explorer spawn a WorkerW behind the icons.
const SPAWN_WORKERW: u32 = 0x052C;
const MONITORINFOF_PRIMARY: u32 = 1;

#[derive(Debug, Clone)]
pub struct MonitorArea {
    pub primary: bool,
    pub rect: RECT,
}

/// Locates the window wallpaper content is parented under.
///
/// Progman is asked to spawn its WorkerW, the WorkerW list is walked until the
/// one hosting `SHELLDLL_DefView` is found, the WorkerW after it (which paints
/// the static wallpaper) is hidden, and Progman itself is returned.
pub fn find_desktop_host() -> Option<HWND> {
    unsafe {
        let Ok(progman) = FindWindowW(w!("Progman"), PCWSTR::null()) else {
            warn!("[DESKTOP] Progman window not found");
            return None;
        };
        debug!("[DESKTOP] Progman={:?}", progman);

        let mut spawn_result = 0usize;
        let _ = SendMessageTimeoutW(
            progman,
            SPAWN_WORKERW,
            WPARAM(0),
            LPARAM(0),
            SMTO_NORMAL,
            1000,
            Some(&mut spawn_result as *mut usize),
        );

        let mut worker = FindWindowExW(None, None, w!("WorkerW"), PCWSTR::null()).ok();
        let mut def_view: Option<HWND> = None;

        while def_view.is_none() {
            let Some(current) = worker else {
                break;
            };
            def_view = FindWindowExW(Some(current), None, w!("SHELLDLL_DefView"), PCWSTR::null()).ok();
            worker = FindWindowExW(None, Some(current), w!("WorkerW"), PCWSTR::null()).ok();
        }

        match worker {
            Some(wallpaper_worker) => {
                debug!("[DESKTOP] Hiding wallpaper WorkerW={:?}", wallpaper_worker);
                let _ = ShowWindow(wallpaper_worker, SW_HIDE);
            }
            None => debug!("[DESKTOP] No WorkerW follows the icon host; nothing to hide"),
        }

        Some(progman)
    }
}

pub fn window_rect(hwnd: HWND) -> Option<RECT> {
    unsafe {
        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_ok() {
            Some(rect)
        } else {
            None
        }
    }
}

pub fn enumerate_monitors() -> Vec<MonitorArea> {
    unsafe extern "system" fn enum_monitor_proc(
        monitor: HMONITOR,
        _hdc: HDC,
        _rect: *mut RECT,
        lparam: LPARAM,
    ) -> BOOL {
        let vec = &mut *(lparam.0 as *mut Vec<MonitorArea>);

        let mut info: MONITORINFOEXW = mem::zeroed();
        info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;

        if GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut _).as_bool() {
            vec.push(MonitorArea {
                primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
                rect: info.monitorInfo.rcMonitor,
            });
        }

        BOOL(1)
    }

    let mut monitors = Vec::<MonitorArea>::new();
    unsafe {
        let _ = EnumDisplayMonitors(
            None,
            None,
            Some(enum_monitor_proc),
            LPARAM((&mut monitors as *mut Vec<MonitorArea>) as isize),
        );
    }

    monitors
}

/// The area a full-screen wallpaper covers: the primary monitor.
pub fn primary_monitor_rect() -> Option<RECT> {
    let monitors = enumerate_monitors();
    monitors
        .iter()
        .find(|m| m.primary)
        .or_else(|| monitors.first())
        .map(|m| m.rect)
}

/// Sets the OS wallpaper, persisted to the user profile.
pub fn set_system_wallpaper(path: &Path) -> Result<(), String> {
    let wide = to_wstring(&path.to_string_lossy());
    unsafe {
        SystemParametersInfoW(
            SPI_SETDESKWALLPAPER,
            0,
            Some(wide.as_ptr() as *mut c_void),
            SPIF_UPDATEINIFILE | SPIF_SENDWININICHANGE,
        )
        .map_err(|e| format!("SystemParametersInfoW(SPI_SETDESKWALLPAPER) failed: {e:?}"))
    }
}
