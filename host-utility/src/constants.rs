// Constants for the PhenoCam installation tool
//
// Camera-side paths live in `phenocam_lib::paths`; this module holds the
// operator-side defaults and the terminal theme.

use std::time::Duration;

use inquire::ui::Color;

// ============================================================================
// Connection defaults
// ============================================================================

/// SSH account of the StarDot admin shell
pub const DEFAULT_SSH_USER: &str = "admin";

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Seconds before an unreachable camera is given up on
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// User for the camera's HTTP admin API
pub const CAMERA_HTTP_USER: &str = "admin";

// ============================================================================
// Reboot
// ============================================================================

/// Pause before rebooting so writes on the settings partition settle
pub const REBOOT_DELAY: Duration = Duration::from_secs(30);

/// Restart endpoint of the camera admin API
pub const RESTART_QUERY: &str = "vb.htm?ipcamrestartcmd";

// ============================================================================
// Progress Bar Theming
// ============================================================================

/// PhenoCam green, single source of truth for RGB values
/// (95, 175, 0) sits exactly on xterm-256 color 70
pub const THEME: (u8, u8, u8) = (95, 175, 0);

/// Theme color for inquire prompts
pub const THEME_RGB: Color = Color::Rgb {
    r: THEME.0,
    g: THEME.1,
    b: THEME.2,
};

/// Calculate nearest xterm-256 color index from RGB
///
/// Colors 16-231 form a 6×6×6 cube with component levels
/// 0, 95, 135, 175, 215, 255.
const fn rgb_to_xterm256(r: u8, g: u8, b: u8) -> u8 {
    const fn nearest_idx(val: u8) -> u8 {
        if val < 48 {
            0
        } else if val < 115 {
            1
        } else if val < 155 {
            2
        } else if val < 195 {
            3
        } else if val < 235 {
            4
        } else {
            5
        }
    }
    16 + 36 * nearest_idx(r) + 6 * nearest_idx(g) + nearest_idx(b)
}

/// Theme color as an xterm-256 index for indicatif templates
pub const THEME_256: u8 = rgb_to_xterm256(THEME.0, THEME.1, THEME.2);
