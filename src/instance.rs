use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, INVALID_HANDLE_VALUE},
        System::Memory::{CreateFileMappingW, PAGE_READWRITE},
    },
};

use crate::{utility::to_wstring, warn};

const LOCK_NAME: &str = "SimpleDesktop.SingleInstance";
const LOCK_SIZE: u32 = 512;

/// Named shared memory held for the life of the process. Only used as a lock.
pub struct InstanceLock {
    handle: HANDLE,
}

impl InstanceLock {
    /// Returns `None` when another instance already holds the lock.
    pub fn acquire() -> Option<Self> {
        let name = to_wstring(LOCK_NAME);
        unsafe {
            let handle = match CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                None,
                PAGE_READWRITE,
                0,
                LOCK_SIZE,
                PCWSTR(name.as_ptr()),
            ) {
                Ok(handle) => handle,
                Err(e) => {
                    // Without the segment there is no way to tell; run anyway.
                    warn!("[INSTANCE] CreateFileMappingW failed: {e:?}");
                    return Some(Self { handle: HANDLE::default() });
                }
            };

            if GetLastError() == ERROR_ALREADY_EXISTS {
                let _ = CloseHandle(handle);
                return None;
            }

            Some(Self { handle })
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if !self.handle.is_invalid() {
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }
}
