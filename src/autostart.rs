use std::mem;

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS},
        System::Registry::{RegDeleteKeyValueW, RegSetKeyValueW, HKEY_CURRENT_USER, REG_SZ},
    },
};

use crate::{debug, paths, utility::to_wstring, APP_NAME};

const RUN_KEY: PCWSTR = w!("Software\\Microsoft\\Windows\\CurrentVersion\\Run");

/// Adds or removes the per-user `Run` entry that starts the program at logon.
pub fn set_enabled(enabled: bool) -> Result<(), String> {
    let name = to_wstring(APP_NAME);

    if !enabled {
        let status = unsafe { RegDeleteKeyValueW(HKEY_CURRENT_USER, RUN_KEY, PCWSTR(name.as_ptr())) };
        return if status == ERROR_SUCCESS || status == ERROR_FILE_NOT_FOUND {
            debug!("[AUTOSTART] Run entry removed");
            Ok(())
        } else {
            Err(format!("RegDeleteKeyValueW failed: {status:?}"))
        };
    }

    let exe = paths::current_exe_path().ok_or_else(|| "Cannot resolve current executable".to_string())?;
    let command = to_wstring(&format!("\"{}\"", exe.display()));
    let status = unsafe {
        RegSetKeyValueW(
            HKEY_CURRENT_USER,
            RUN_KEY,
            PCWSTR(name.as_ptr()),
            REG_SZ.0,
            Some(command.as_ptr() as *const _),
            (command.len() * mem::size_of::<u16>()) as u32,
        )
    };

    if status == ERROR_SUCCESS {
        debug!("[AUTOSTART] Run entry set to {}", exe.display());
        Ok(())
    } else {
        Err(format!("RegSetKeyValueW failed: {status:?}"))
    }
}
