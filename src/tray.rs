use std::{
    mem, ptr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::{
            Shell::{
                ShellExecuteW, Shell_NotifyIconW, NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_TIP, NIIF_INFO,
                NIM_ADD, NIM_DELETE, NIM_MODIFY, NOTIFYICONDATAW,
            },
            WindowsAndMessaging::{
                AppendMenuW, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu, DestroyWindow,
                GetCursorPos, LoadIconW, PostMessageW, RegisterClassW, RegisterWindowMessageW,
                SetForegroundWindow, TrackPopupMenuEx, IDI_APPLICATION, MF_SEPARATOR, MF_STRING,
                SW_SHOWNORMAL, TPM_RETURNCMD, TPM_RIGHTBUTTON, WINDOW_EX_STYLE, WINDOW_STYLE, WM_APP,
                WM_CONTEXTMENU, WM_LBUTTONUP, WM_NULL, WM_RBUTTONUP, WNDCLASSW, WS_EX_TOOLWINDOW,
            },
        },
    },
};

use crate::{
    debug,
    utility::{copy_to_wide_buf, info_box, to_wstring},
    warn, APP_NAME, APP_VERSION,
};

const TRAY_CLASS_NAME: PCWSTR = w!("SimpleDesktopTrayWindow");
const TRAY_ICON_ID: u32 = 1;
const WM_TRAY: u32 = WM_APP + 1;

const CMD_SETTINGS: usize = 1001;
const CMD_ABOUT: usize = 1002;
const CMD_HELP: usize = 1003;
const CMD_EXIT: usize = 1004;

const ABOUT_TEXT: &str = "SimpleDesktop is a lightweight live wallpaper manager.\n\
It does not collect any user information and never accesses the network.\n\n\
Copyright © 1994-2020 TianSong Studio";
const HELP_TEXT: &str = "Choose \"Settings\" to edit settings.yaml. Changes apply as soon as the file is saved.\n\n\
Ui/resType: true for an image slideshow, false for a single image, GIF or video.\n\
Parameter/resFilePath: the files to show. The first file decides the renderer.\n\n\
Feedback: 1508539502@qq.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    OpenSettings,
    About,
    Help,
    Exit,
}

static PENDING: Mutex<Vec<TrayCommand>> = Mutex::new(Vec::new());
static TASKBAR_CREATED: AtomicU32 = AtomicU32::new(0);

pub struct TrayIcon {
    hwnd: HWND,
}

impl TrayIcon {
    pub fn create() -> Result<Self, String> {
        let hinstance = unsafe {
            GetModuleHandleW(None)
                .map(|h| HINSTANCE(h.0))
                .map_err(|e| format!("GetModuleHandleW failed: {e:?}"))?
        };

        let wc = WNDCLASSW {
            lpfnWndProc: Some(tray_window_proc),
            hInstance: hinstance,
            lpszClassName: TRAY_CLASS_NAME,
            ..Default::default()
        };

        let hwnd = unsafe {
            let _ = RegisterClassW(&wc);
            TASKBAR_CREATED.store(RegisterWindowMessageW(w!("TaskbarCreated")), Ordering::Relaxed);

            CreateWindowExW(
                WINDOW_EX_STYLE(WS_EX_TOOLWINDOW.0),
                TRAY_CLASS_NAME,
                w!("SimpleDesktop"),
                WINDOW_STYLE(0),
                0,
                0,
                0,
                0,
                None,
                None,
                Some(hinstance),
                Some(ptr::null()),
            )
        }
        .map_err(|e| format!("CreateWindowExW failed for tray window: {e:?}"))?;

        // The shell may not be up yet at logon; the TaskbarCreated broadcast re-adds it.
        if let Err(e) = add_icon(hwnd) {
            warn!("[TRAY] {}; waiting for the taskbar to be created", e);
        }
        Ok(Self { hwnd })
    }

    /// Shows a balloon notification from the tray icon.
    pub fn notify(&self, title: &str, text: &str) {
        let mut nid = base_notify_data(self.hwnd);
        nid.uFlags = NIF_INFO;
        nid.dwInfoFlags = NIIF_INFO;
        copy_to_wide_buf(&mut nid.szInfoTitle, title);
        copy_to_wide_buf(&mut nid.szInfo, text);
        unsafe {
            if !Shell_NotifyIconW(NIM_MODIFY, &nid).as_bool() {
                debug!("[TRAY] Balloon notification was not shown");
            }
        }
    }

}

impl Drop for TrayIcon {
    fn drop(&mut self) {
        let nid = base_notify_data(self.hwnd);
        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

/// Drains the menu commands queued by the tray window procedure.
pub fn take_commands() -> Vec<TrayCommand> {
    match PENDING.lock() {
        Ok(mut pending) => mem::take(&mut *pending),
        Err(_) => Vec::new(),
    }
}

pub fn show_about() {
    info_box(
        &format!("About {APP_NAME}"),
        &format!("Version {APP_VERSION}\n\n{ABOUT_TEXT}"),
    );
}

pub fn show_help() {
    info_box(APP_NAME, HELP_TEXT);
}

/// Opens `path` with the handler the shell has registered for it.
pub fn open_with_shell(path: &std::path::Path) {
    let file = to_wstring(&path.to_string_lossy());
    let result = unsafe {
        ShellExecuteW(
            None,
            w!("open"),
            PCWSTR(file.as_ptr()),
            PCWSTR::null(),
            PCWSTR::null(),
            SW_SHOWNORMAL,
        )
    };

    // Values above 32 indicate success.
    if result.0 as isize <= 32 {
        warn!("[TRAY] Failed to open {} (code {})", path.display(), result.0 as isize);
    }
}

fn base_notify_data(hwnd: HWND) -> NOTIFYICONDATAW {
    let mut nid: NOTIFYICONDATAW = unsafe { mem::zeroed() };
    nid.cbSize = mem::size_of::<NOTIFYICONDATAW>() as u32;
    nid.hWnd = hwnd;
    nid.uID = TRAY_ICON_ID;
    nid
}

fn add_icon(hwnd: HWND) -> Result<(), String> {
    let mut nid = base_notify_data(hwnd);
    nid.uFlags = NIF_MESSAGE | NIF_ICON | NIF_TIP;
    nid.uCallbackMessage = WM_TRAY;
    nid.hIcon = unsafe { LoadIconW(None, IDI_APPLICATION) }
        .map_err(|e| format!("LoadIconW failed: {e:?}"))?;
    copy_to_wide_buf(&mut nid.szTip, APP_NAME);

    unsafe {
        if Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
            Ok(())
        } else {
            Err("Shell_NotifyIconW(NIM_ADD) failed".to_string())
        }
    }
}

fn push_command(command: TrayCommand) {
    if let Ok(mut pending) = PENDING.lock() {
        pending.push(command);
    }
}

fn show_context_menu(hwnd: HWND) {
    unsafe {
        let Ok(menu) = CreatePopupMenu() else {
            return;
        };

        let _ = AppendMenuW(menu, MF_STRING, CMD_SETTINGS, w!("Settings"));
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null());
        let _ = AppendMenuW(menu, MF_STRING, CMD_ABOUT, w!("About"));
        let _ = AppendMenuW(menu, MF_STRING, CMD_HELP, w!("Help"));
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null());
        let _ = AppendMenuW(menu, MF_STRING, CMD_EXIT, w!("Exit"));

        let mut cursor = POINT::default();
        let _ = GetCursorPos(&mut cursor);

        // Required so the menu closes when the user clicks elsewhere.
        let _ = SetForegroundWindow(hwnd);
        let selected = TrackPopupMenuEx(
            menu,
            (TPM_RETURNCMD | TPM_RIGHTBUTTON).0,
            cursor.x,
            cursor.y,
            hwnd,
            None,
        );
        let _ = PostMessageW(Some(hwnd), WM_NULL, WPARAM(0), LPARAM(0));
        let _ = DestroyMenu(menu);

        match selected.0 as usize {
            CMD_SETTINGS => push_command(TrayCommand::OpenSettings),
            CMD_ABOUT => push_command(TrayCommand::About),
            CMD_HELP => push_command(TrayCommand::Help),
            CMD_EXIT => push_command(TrayCommand::Exit),
            _ => {}
        }
    }
}

unsafe extern "system" fn tray_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_TRAY {
        match (lparam.0 & 0xFFFF) as u32 {
            WM_LBUTTONUP => push_command(TrayCommand::OpenSettings),
            WM_RBUTTONUP | WM_CONTEXTMENU => show_context_menu(hwnd),
            _ => {}
        }
        return LRESULT(0);
    }

    let taskbar_created = TASKBAR_CREATED.load(Ordering::Relaxed);
    if taskbar_created != 0 && msg == taskbar_created {
        // Explorer restarted; the icon has to be added again.
        if let Err(e) = add_icon(hwnd) {
            warn!("[TRAY] Re-adding tray icon failed: {}", e);
        }
        return LRESULT(0);
    }

    DefWindowProcW(hwnd, msg, wparam, lparam)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_commands_are_drained_once() {
        let _ = take_commands();
        push_command(TrayCommand::About);
        push_command(TrayCommand::Exit);

        assert_eq!(take_commands(), vec![TrayCommand::About, TrayCommand::Exit]);
        assert!(take_commands().is_empty());
    }
}
