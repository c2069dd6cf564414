//! Capture naming and image metadata
//!
//! Every capture is uploaded as a JPEG plus a `.meta` sidecar of `key=value`
//! lines. The sidecar combines static camera identity with per-capture
//! exposure information.

use chrono::NaiveDateTime;

use crate::settings::CameraSettings;

/// Camera model reported in metadata
pub const CAMERA_MODEL: &str = "NetCam Live2";

/// Timestamp layout used in image file names
const FILE_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H%M%S";

/// Capture state of the IR cut filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Visible light, IR filter in place
    Vis,
    /// Near infrared, IR filter removed
    Nir,
}

impl CaptureMode {
    /// Capture order of one cycle
    pub const CYCLE: [CaptureMode; 2] = [Self::Vis, Self::Nir];

    pub fn ir_enabled(self) -> bool {
        matches!(self, Self::Nir)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Vis => "VIS",
            Self::Nir => "NIR",
        }
    }

    /// `<site>_<timestamp>.jpg` or `<site>_IR_<timestamp>.jpg`
    pub fn image_file_name(self, site: &str, taken_at: &NaiveDateTime) -> String {
        let stamp = taken_at.format(FILE_TIMESTAMP_FORMAT);
        match self {
            Self::Vis => format!("{site}_{stamp}.jpg"),
            Self::Nir => format!("{site}_IR_{stamp}.jpg"),
        }
    }
}

/// Sidecar name for an image file
pub fn meta_file_name(image_file_name: &str) -> String {
    let stem = image_file_name
        .strip_suffix(".jpg")
        .unwrap_or(image_file_name);
    format!("{stem}.meta")
}

/// Static identity of the camera, gathered once per cycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CameraIdentity {
    pub model: String,
    pub mac_address: String,
    pub ip_address: String,
    pub firmware: String,
}

/// Metadata describing one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMetadata {
    pub identity: CameraIdentity,
    pub site_name: String,
    pub network: String,
    pub timezone: String,
    pub mode: CaptureMode,
    pub exposure: Option<u32>,
    pub taken_at: NaiveDateTime,
    pub color: Vec<(String, String)>,
}

impl CaptureMetadata {
    pub fn new(
        settings: &CameraSettings,
        identity: CameraIdentity,
        mode: CaptureMode,
        exposure: Option<u32>,
        taken_at: NaiveDateTime,
    ) -> Self {
        let gains = settings.gains;
        let adj = settings.adjustments;
        let color = [
            ("red", gains.red),
            ("green", gains.green),
            ("blue", gains.blue),
            ("brightness", adj.brightness),
            ("sharpness", adj.sharpness),
            ("hue", adj.hue),
            ("contrast", adj.contrast),
            ("saturation", adj.saturation),
            ("backlight", adj.backlight),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            identity,
            site_name: settings.site_name.clone(),
            network: settings.network.to_string(),
            timezone: settings.timezone_label(),
            mode,
            exposure,
            taken_at,
            color,
        }
    }

    /// Ordered `key=value` pairs
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("model".to_string(), self.identity.model.clone()),
            ("firmware".to_string(), self.identity.firmware.clone()),
            ("mac_addr".to_string(), self.identity.mac_address.clone()),
            ("ip_addr".to_string(), self.identity.ip_address.clone()),
            ("site_name".to_string(), self.site_name.clone()),
            ("network".to_string(), self.network.clone()),
            ("timezone".to_string(), self.timezone.clone()),
            (
                "ir_enable".to_string(),
                u8::from(self.mode.ir_enabled()).to_string(),
            ),
            (
                "exposure".to_string(),
                self.exposure.map(|e| e.to_string()).unwrap_or_default(),
            ),
            (
                "datetime_original".to_string(),
                self.taken_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            ),
        ];
        pairs.extend(self.color.iter().cloned());
        pairs
    }

    pub fn render(&self) -> String {
        self.pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect()
    }
}
