use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        mpsc::{self, Sender},
        OnceLock,
    },
    thread,
};

use crate::paths;

const MAX_LOG_BYTES: u64 = 2 * 1024 * 1024;

/* =========================
   GLOBAL STATE
   ========================= */

static DEBUG: AtomicBool = AtomicBool::new(false);
static LEVEL: AtomicU8 = AtomicU8::new(Level::Warn as u8);
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_TX: OnceLock<Sender<String>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl Level {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" | "trace" => Some(Self::Debug),
            _ => None,
        }
    }

    fn from_tag(tag: &str) -> Self {
        match tag {
            "ERROR" => Self::Error,
            "WARN" => Self::Warn,
            "INFO" => Self::Info,
            _ => Self::Debug,
        }
    }
}

/* =========================
   PUBLIC API
   ========================= */

pub fn init(debug: bool, level: &str) {
    if LOG_TX.get().is_some() {
        return;
    }

    set_debug(debug);
    set_level(level);

    let path = log_path().clone();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    truncate_if_oversized(&path, MAX_LOG_BYTES);

    let (tx, rx) = mpsc::channel::<String>();
    if LOG_TX.set(tx).is_err() {
        return;
    }

    thread::spawn(move || {
        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) else {
            // Nowhere to write; drain so senders never block on a full buffer.
            while rx.recv().is_ok() {}
            return;
        };

        while let Ok(line) = rx.recv() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    });
}

pub fn set_debug(debug: bool) {
    DEBUG.store(debug, Ordering::Relaxed);
}

pub fn set_level(level: &str) {
    let parsed = Level::parse(level).unwrap_or(Level::Warn);
    LEVEL.store(parsed as u8, Ordering::Relaxed);
}

#[inline]
pub fn should_log(tag: &str) -> bool {
    if DEBUG.load(Ordering::Relaxed) {
        return true;
    }
    (Level::from_tag(tag) as u8) <= LEVEL.load(Ordering::Relaxed)
}

/* =========================
   INTERNAL
   ========================= */

#[inline]
pub fn enqueue(level: &str, msg: String) {
    if let Some(tx) = LOG_TX.get() {
        let ts = timestamp();
        let _ = tx.send(format!("{ts} [{level}] {msg}"));
    }
}

/// Removes the log once it grows past `limit` bytes. Returns true if it did.
fn truncate_if_oversized(path: &Path, limit: u64) -> bool {
    let oversized = fs::metadata(path).map(|m| m.len() > limit).unwrap_or(false);
    oversized && fs::remove_file(path).is_ok()
}

fn timestamp() -> String {
    let now = chrono::Local::now();
    now.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/* =========================
   MACROS
   ========================= */

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{
        if $crate::logging::should_log("DEBUG") {
            $crate::logging::enqueue(
                "DEBUG",
                format!($($arg)*)
            );
        }
    }};
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if $crate::logging::should_log("INFO") {
            $crate::logging::enqueue(
                "INFO",
                format!($($arg)*)
            );
        }
    }};
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        if $crate::logging::should_log("WARN") {
            $crate::logging::enqueue(
                "WARN",
                format!($($arg)*)
            );
        }
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        $crate::logging::enqueue(
            "ERROR",
            format!($($arg)*)
        );
    }};
}

/* =========================
   PATH
   ========================= */

fn log_path() -> &'static PathBuf {
    LOG_PATH.get_or_init(paths::log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(Level::parse("WARN"), Some(Level::Warn));
        assert_eq!(Level::parse(" warning "), Some(Level::Warn));
        assert_eq!(Level::parse("trace"), Some(Level::Debug));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn levels_are_ordered_by_verbosity() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
        assert!(Level::Info < Level::Debug);
        assert_eq!(Level::from_tag("INFO"), Level::Info);
    }

    #[test]
    fn oversized_log_is_truncated() {
        let dir = std::env::temp_dir().join(format!("simple-desktop-logging-{}", std::process::id()));
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("app.log");

        fs::write(&path, vec![b'x'; 64]).unwrap();
        assert!(!truncate_if_oversized(&path, 64));
        assert!(path.exists());

        fs::write(&path, vec![b'x'; 65]).unwrap();
        assert!(truncate_if_oversized(&path, 64));
        assert!(!path.exists());

        assert!(!truncate_if_oversized(&path, 64));
    }
}
