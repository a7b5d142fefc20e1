#![windows_subsystem = "windows"]
#![cfg_attr(not(windows), allow(dead_code, unused_imports))]

mod accent;
#[cfg(windows)]
mod autostart;
mod bootstrap;
mod color;
mod data_loaders;
#[cfg(windows)]
mod desktop;
#[cfg(windows)]
mod instance;
mod logging;
mod media;
mod page;
mod paths;
#[cfg(windows)]
mod taskbar;
#[cfg(windows)]
mod tray;
#[cfg(windows)]
mod utility;
#[cfg(windows)]
mod wallpaper_engine;

use std::{
	fs,
	path::Path,
	thread,
	time::{Duration, Instant, SystemTime},
};

use crate::data_loaders::settings::Settings;

pub const APP_NAME: &str = "SimpleDesktop";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn modified_at(path: &Path) -> Option<SystemTime> {
	fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Loop timing derived from the `App` settings group.
struct LoopTiming {
	tick_sleep: Duration,
	watcher_enabled: bool,
	watcher_interval: Duration,
	host_check_interval: Duration,
	taskbar_refresh: Duration,
}

impl LoopTiming {
	fn from_settings(settings: &Settings) -> Self {
		let app = &settings.app;
		Self {
			tick_sleep: Duration::from_millis(app.runtime.tick_sleep_ms.max(1)),
			watcher_enabled: app.watcher.enabled,
			watcher_interval: Duration::from_millis(app.watcher.interval_ms.max(100)),
			host_check_interval: Duration::from_millis(app.runtime.host_check_interval_ms.max(250)),
			taskbar_refresh: Duration::from_millis(app.runtime.taskbar_refresh_ms.max(1)),
		}
	}
}

#[cfg(windows)]
fn enable_per_monitor_dpi_awareness() {
	use windows::Win32::UI::HiDpi::{
		SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
	};

	unsafe {
		if SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2).is_err() {
			warn!(
				"[{}] Failed to set process DPI awareness to PerMonitorV2; monitor sizes may be scaled",
				APP_NAME
			);
		}
	}
}

#[cfg(windows)]
fn sync_autostart(enabled: bool) {
	if let Err(e) = autostart::set_enabled(enabled) {
		warn!("[{}][AUTOSTART] {}", APP_NAME, e);
	}
}

/// Brings every subsystem in line with `next`, rebuilding the wallpaper only
/// when its source changed.
#[cfg(windows)]
fn apply_settings_change(
	previous: &Settings,
	next: &Settings,
	runtime: &mut wallpaper_engine::WallpaperRuntime,
	taskbar: &mut taskbar::TaskbarControl,
) {
	logging::set_debug(next.app.debug);
	logging::set_level(&next.app.log_level);

	if previous.wallpaper_differs(next) {
		runtime.apply(next);
	} else {
		runtime.update(next);
	}

	taskbar.set_refresh_interval(LoopTiming::from_settings(next).taskbar_refresh);
	if previous.taskbar_differs(next) {
		taskbar.set_appearance(accent::TaskbarAppearance::from_settings(next));
	}

	if previous.ui.auto_run != next.ui.auto_run {
		sync_autostart(next.ui.auto_run);
	}
}

#[cfg(windows)]
fn main() -> windows::core::Result<()> {
	use windows::Win32::UI::WindowsAndMessaging::{
		DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE, WM_QUIT,
	};

	use crate::{
		accent::TaskbarAppearance,
		instance::InstanceLock,
		taskbar::TaskbarControl,
		tray::{TrayCommand, TrayIcon},
		wallpaper_engine::{HostHealth, WallpaperRuntime},
	};

	logging::init(false, "warn");
	std::panic::set_hook(Box::new(|panic_info| {
		error!("[{}] Panic: {}", APP_NAME, panic_info);
	}));

	let Some(_instance_lock) = InstanceLock::acquire() else {
		utility::info_box(
			APP_NAME,
			"SimpleDesktop is already running. Look for its icon in the system tray.",
		);
		return Ok(());
	};

	bootstrap::bootstrap_app();
	enable_per_monitor_dpi_awareness();

	let settings_path = paths::settings_path();
	let mut settings = Settings::load(&settings_path).unwrap_or_else(|| {
		warn!(
			"[{}] Failed to parse {}; using default settings",
			APP_NAME,
			settings_path.display()
		);
		Settings::default()
	});
	logging::set_debug(settings.app.debug);
	logging::set_level(&settings.app.log_level);

	info!("!---------- [{}] Starting {} ----------!", APP_NAME, APP_VERSION);
	info!("[{}] Settings loaded from {}", APP_NAME, settings_path.display());

	// Give Windows a sane wallpaper to fall back to if this process dies.
	if let Err(e) = desktop::set_system_wallpaper(&paths::default_wallpaper_path()) {
		warn!("[{}] {}", APP_NAME, e);
	}
	sync_autostart(settings.ui.auto_run);

	let tray = match TrayIcon::create() {
		Ok(tray) => Some(tray),
		Err(e) => {
			error!("[{}][TRAY] {}", APP_NAME, e);
			None
		}
	};

	let mut timing = LoopTiming::from_settings(&settings);
	let mut taskbar = TaskbarControl::new(TaskbarAppearance::from_settings(&settings), timing.taskbar_refresh);
	taskbar.set_auto_hide(settings.ui.taskbar_auto_hide);

	let mut runtime = WallpaperRuntime::new();
	runtime.apply(&settings);

	if let Some(tray) = tray.as_ref() {
		tray.notify(APP_NAME, "SimpleDesktop is now managing your desktop");
	}

	let mut last_settings_modified = modified_at(&settings_path);
	let mut last_watch_tick = Instant::now();
	let mut last_host_check = Instant::now();

	'main: loop {
		unsafe {
			let mut msg = MSG::default();
			while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
				if msg.message == WM_QUIT {
					warn!("[{}] WM_QUIT received", APP_NAME);
					break 'main;
				}
				let _ = TranslateMessage(&msg);
				DispatchMessageW(&msg);
			}
		}

		for command in tray::take_commands() {
			match command {
				TrayCommand::OpenSettings => tray::open_with_shell(&settings_path),
				TrayCommand::About => tray::show_about(),
				TrayCommand::Help => tray::show_help(),
				TrayCommand::Exit => {
					info!("[{}] Exit requested from tray", APP_NAME);
					break 'main;
				}
			}
		}

		let now = Instant::now();
		taskbar.tick(now);
		runtime.tick(now);

		if now.duration_since(last_host_check) >= timing.host_check_interval {
			last_host_check = now;
			match runtime.check_host(&settings) {
				HostHealth::Lost => {
					warn!("[{}][HOST] Wallpaper host missing; rebuilding", APP_NAME);
					runtime.apply(&settings);
				}
				HostHealth::Reattached | HostHealth::Healthy => {}
			}
		}

		if timing.watcher_enabled && now.duration_since(last_watch_tick) >= timing.watcher_interval {
			last_watch_tick = now;

			let current_modified = modified_at(&settings_path);
			let changed = match (last_settings_modified, current_modified) {
				(Some(prev), Some(curr)) => curr != prev,
				(None, Some(_)) => true,
				_ => false,
			};

			if changed {
				match Settings::load(&settings_path) {
					Some(next) => {
						apply_settings_change(&settings, &next, &mut runtime, &mut taskbar);
						settings = next;
						timing = LoopTiming::from_settings(&settings);
						warn!(
							"[{}][WATCHER] Reloaded settings from {}",
							APP_NAME,
							settings_path.display()
						);
					}
					None => {
						warn!(
							"[{}][WATCHER] Detected settings change but failed to parse {}; keeping previous settings",
							APP_NAME,
							settings_path.display()
						);
					}
				}

				last_settings_modified = current_modified;
			}
		}

		thread::sleep(timing.tick_sleep);
	}

	// A newer file on disk wins over what this process would write back.
	if modified_at(&settings_path) == last_settings_modified {
		if let Err(e) = settings.save(&settings_path) {
			warn!("[{}] Failed to save settings: {}", APP_NAME, e);
		}
	}

	runtime.remove();
	taskbar.restore();
	drop(tray);
	info!("[{}] Shut down cleanly", APP_NAME);
	Ok(())
}

#[cfg(not(windows))]
fn main() {
	eprintln!("{APP_NAME} only runs on Windows");
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn loop_timing_respects_minimums() {
		let mut settings = Settings::default();
		settings.app.runtime.tick_sleep_ms = 0;
		settings.app.watcher.interval_ms = 5;

		let timing = LoopTiming::from_settings(&settings);
		assert_eq!(timing.tick_sleep, Duration::from_millis(1));
		assert_eq!(timing.watcher_interval, Duration::from_millis(100));
		assert_eq!(timing.taskbar_refresh, Duration::from_millis(10));
		assert_eq!(timing.host_check_interval, Duration::from_millis(2000));
	}
}
