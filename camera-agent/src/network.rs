use phenocam_lib::metadata::{CAMERA_MODEL, CameraIdentity};

use crate::camera::Camera;
use crate::utils::run_command;

/// Wired interface of the NetCam
pub const INTERFACE: &str = "eth0";

/// Address details parsed from busybox `ifconfig` output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
}

/// Parse `ifconfig <iface>` output (busybox `HWaddr`/`inet addr:` format)
pub fn parse_ifconfig(output: &str) -> InterfaceInfo {
    let mut info = InterfaceInfo::default();
    for line in output.lines() {
        let mut words = line.split_whitespace();
        while let Some(word) = words.next() {
            match word {
                "HWaddr" | "ether" => info.mac_address = words.next().map(str::to_uppercase),
                "inet" => {
                    info.ip_address = words
                        .next()
                        .map(|addr| addr.trim_start_matches("addr:").to_string());
                }
                _ => {}
            }
        }
    }
    info
}

/// Query the interface; a missing `ifconfig` yields empty fields
pub fn interface_info() -> InterfaceInfo {
    match run_command("ifconfig", &[INTERFACE]) {
        Ok(output) if output.status.success() => {
            parse_ifconfig(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            log::warn!(
                "ifconfig {INTERFACE} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            InterfaceInfo::default()
        }
        Err(e) => {
            log::warn!("{e:#}");
            InterfaceInfo::default()
        }
    }
}

/// Static identity of this camera for metadata
pub fn camera_identity(camera: &dyn Camera, info: &InterfaceInfo) -> CameraIdentity {
    let firmware = camera.get_param("version").unwrap_or_else(|e| {
        log::debug!("Firmware version unavailable: {e:#}");
        String::new()
    });
    CameraIdentity {
        model: CAMERA_MODEL.to_string(),
        mac_address: info.mac_address.clone().unwrap_or_default(),
        ip_address: info.ip_address.clone().unwrap_or_default(),
        firmware,
    }
}
