use std::{
    ffi::c_void,
    mem,
    time::{Duration, Instant},
};

use windows::{
    core::{s, w, BOOL, PCWSTR},
    Win32::{
        Foundation::{HWND, LPARAM},
        System::LibraryLoader::{GetModuleHandleW, GetProcAddress},
        UI::{
            Shell::{SHAppBarMessage, ABM_SETSTATE, ABS_ALWAYSONTOP, ABS_AUTOHIDE, APPBARDATA},
            WindowsAndMessaging::{FindWindowExW, FindWindowW},
        },
    },
};

use crate::{
    accent::{AccentPolicy, TaskbarAppearance},
    debug, warn,
};

const WCA_ACCENT_POLICY: u32 = 19;

#[repr(C)]
struct WindowCompositionAttribData {
    attrib: u32,
    data: *mut c_void,
    size: usize,
}

type SetWindowCompositionAttributeFn =
    unsafe extern "system" fn(HWND, *mut WindowCompositionAttribData) -> BOOL;

/// Keeps the taskbar painted with an accent policy. Explorer resets the
/// attribute on its own repaints, so it is re-applied on a short period.
pub struct TaskbarControl {
    set_composition: Option<SetWindowCompositionAttributeFn>,
    appearance: TaskbarAppearance,
    refresh_interval: Duration,
    last_apply: Option<Instant>,
}

impl TaskbarControl {
    pub fn new(appearance: TaskbarAppearance, refresh_interval: Duration) -> Self {
        let set_composition = resolve_set_window_composition_attribute();
        if set_composition.is_none() {
            warn!("[TASKBAR] SetWindowCompositionAttribute unavailable; taskbar styling disabled");
        }

        Self {
            set_composition,
            appearance,
            refresh_interval,
            last_apply: None,
        }
    }

    pub fn set_refresh_interval(&mut self, interval: Duration) {
        self.refresh_interval = interval;
    }

    /// Applies a new appearance. Auto-hide is only sent to the shell when it changes.
    pub fn set_appearance(&mut self, appearance: TaskbarAppearance) {
        let auto_hide_changed = appearance.auto_hide != self.appearance.auto_hide;
        self.appearance = appearance;
        if auto_hide_changed {
            self.set_auto_hide(appearance.auto_hide);
        } else {
            self.apply_now();
        }
    }

    pub fn set_auto_hide(&mut self, hide: bool) {
        self.appearance.auto_hide = hide;
        let Ok(tray) = (unsafe { FindWindowW(w!("Shell_TrayWnd"), PCWSTR::null()) }) else {
            warn!("[TASKBAR] Shell_TrayWnd not found; auto-hide unchanged");
            return;
        };

        let mut data = APPBARDATA {
            cbSize: mem::size_of::<APPBARDATA>() as u32,
            hWnd: tray,
            lParam: LPARAM((if hide { ABS_AUTOHIDE } else { ABS_ALWAYSONTOP }) as isize),
            ..Default::default()
        };
        unsafe {
            SHAppBarMessage(ABM_SETSTATE, &mut data);
        }
        debug!("[TASKBAR] Auto-hide set to {}", hide);

        self.apply_now();
    }

    pub fn tick(&mut self, now: Instant) {
        let due = self
            .last_apply
            .map(|last| now.duration_since(last) >= self.refresh_interval)
            .unwrap_or(true);
        if due {
            self.apply_now();
            self.last_apply = Some(now);
        }
    }

    pub fn apply_now(&self) {
        let Some(set_composition) = self.set_composition else {
            return;
        };

        let mut policy: AccentPolicy = self.appearance.policy();
        for tray in taskbar_windows() {
            let mut data = WindowCompositionAttribData {
                attrib: WCA_ACCENT_POLICY,
                data: &mut policy as *mut AccentPolicy as *mut c_void,
                size: mem::size_of::<AccentPolicy>(),
            };
            unsafe {
                let _ = set_composition(tray, &mut data);
            }
        }
    }

    /// Puts the taskbar back the way the shell draws it by default.
    pub fn restore(&mut self) {
        self.appearance.state = TaskbarAppearance::RESTORED.state;
        self.appearance.color = TaskbarAppearance::RESTORED.color;
        self.set_auto_hide(TaskbarAppearance::RESTORED.auto_hide);
        debug!("[TASKBAR] Restored default appearance");
    }
}

fn resolve_set_window_composition_attribute() -> Option<SetWindowCompositionAttributeFn> {
    unsafe {
        let user32 = GetModuleHandleW(w!("user32.dll")).ok()?;
        let proc = GetProcAddress(user32, s!("SetWindowCompositionAttribute"))?;
        Some(mem::transmute::<
            unsafe extern "system" fn() -> isize,
            SetWindowCompositionAttributeFn,
        >(proc))
    }
}

/// The primary taskbar plus one per secondary monitor.
fn taskbar_windows() -> Vec<HWND> {
    let mut trays = Vec::new();
    unsafe {
        if let Ok(primary) = FindWindowW(w!("Shell_TrayWnd"), PCWSTR::null()) {
            trays.push(primary);
        }

        let mut after: Option<HWND> = None;
        while let Ok(secondary) = FindWindowExW(None, after, w!("Shell_SecondaryTrayWnd"), PCWSTR::null()) {
            trays.push(secondary);
            after = Some(secondary);
        }
    }
    trays
}
