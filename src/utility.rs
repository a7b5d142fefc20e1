use std::{ffi::OsStr, os::windows::ffi::OsStrExt};

use windows::{
    core::PCWSTR,
    Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONINFORMATION, MB_OK},
};

pub fn to_wstring(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// Copies `s` into a fixed, NUL-terminated UTF-16 buffer, truncating if needed.
pub fn copy_to_wide_buf(buf: &mut [u16], s: &str) {
    let wide: Vec<u16> = OsStr::new(s).encode_wide().collect();
    let len = wide.len().min(buf.len().saturating_sub(1));
    buf[..len].copy_from_slice(&wide[..len]);
    if let Some(terminator) = buf.get_mut(len) {
        *terminator = 0;
    }
}

pub fn info_box(title: &str, text: &str) {
    let title_wide = to_wstring(title);
    let text_wide = to_wstring(text);
    unsafe {
        let _ = MessageBoxW(
            None,
            PCWSTR(text_wide.as_ptr()),
            PCWSTR(title_wide.as_ptr()),
            MB_OK | MB_ICONINFORMATION,
        );
    }
}
