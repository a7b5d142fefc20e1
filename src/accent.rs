use crate::{color::Rgba, data_loaders::settings::Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AccentState {
    /// Solid color.
    Gradient = 1,
    TransparentGradient = 2,
    /// Frosted glass.
    BlurBehind = 3,
}

/// Mirror of the shell's `ACCENT_POLICY` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AccentPolicy {
    pub accent_state: u32,
    pub accent_flags: u32,
    pub gradient_color: u32,
    pub animation_id: u32,
}

const ACCENT_FLAGS: u32 = 2;

impl AccentPolicy {
    /// Blur-behind ignores the chosen color and always tints with transparent white.
    pub fn new(state: AccentState, color: Rgba) -> Self {
        let gradient_color = match state {
            AccentState::BlurBehind => Rgba::CLEAR_WHITE.to_abgr(),
            _ => color.to_abgr(),
        };

        Self {
            accent_state: state as u32,
            accent_flags: ACCENT_FLAGS,
            gradient_color,
            animation_id: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskbarAppearance {
    pub state: AccentState,
    pub color: Rgba,
    pub auto_hide: bool,
}

impl TaskbarAppearance {
    /// What the shell taskbar looks like without this program running.
    pub const RESTORED: TaskbarAppearance = TaskbarAppearance {
        state: AccentState::Gradient,
        color: Rgba::OPAQUE_WHITE,
        auto_hide: false,
    };

    pub fn from_settings(settings: &Settings) -> Self {
        let ui = &settings.ui;
        let state = if ui.taskbar_transparent_gradient {
            AccentState::TransparentGradient
        } else if ui.taskbar_blur_behind {
            AccentState::BlurBehind
        } else {
            AccentState::Gradient
        };

        Self {
            state,
            color: settings.parameter.taskbar_color.with_alpha(ui.taskbar_alpha),
            auto_hide: ui.taskbar_auto_hide,
        }
    }

    pub fn policy(&self) -> AccentPolicy {
        AccentPolicy::new(self.state, self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_packs_color_as_abgr() {
        let policy = AccentPolicy::new(AccentState::TransparentGradient, Rgba::new(0x12, 0x34, 0x56, 0x78));
        assert_eq!(
            policy,
            AccentPolicy {
                accent_state: 2,
                accent_flags: 2,
                gradient_color: 0x7856_3412,
                animation_id: 0,
            }
        );
    }

    #[test]
    fn blur_behind_always_uses_clear_white() {
        let policy = AccentPolicy::new(AccentState::BlurBehind, Rgba::new(1, 2, 3, 255));
        assert_eq!(policy.accent_state, 3);
        assert_eq!(policy.gradient_color, 0x00FF_FFFF);
    }

    #[test]
    fn transparent_gradient_wins_over_blur() {
        let mut s = Settings::default();
        assert_eq!(TaskbarAppearance::from_settings(&s).state, AccentState::Gradient);

        s.ui.taskbar_blur_behind = true;
        assert_eq!(TaskbarAppearance::from_settings(&s).state, AccentState::BlurBehind);

        s.ui.taskbar_transparent_gradient = true;
        assert_eq!(TaskbarAppearance::from_settings(&s).state, AccentState::TransparentGradient);
    }

    #[test]
    fn alpha_slider_overrides_color_alpha() {
        let mut s = Settings::default();
        s.parameter.taskbar_color = Rgba::new(10, 20, 30, 255);
        s.ui.taskbar_alpha = 128;
        assert_eq!(TaskbarAppearance::from_settings(&s).color, Rgba::new(10, 20, 30, 128));
    }

    #[test]
    fn restored_appearance_is_opaque_white_gradient() {
        let policy = TaskbarAppearance::RESTORED.policy();
        assert_eq!(policy.accent_state, AccentState::Gradient as u32);
        assert_eq!(policy.gradient_color, 0xFFFF_FFFF);
        assert!(!TaskbarAppearance::RESTORED.auto_hide);
    }
}
