// Local camera control through the StarDot admin HTTP API
//
// The firmware exposes `vb.htm?<param>=<value>` for settings and
// `vb.htm?paratest=<param>` for reads, both behind HTTP basic auth as the
// `admin` user. Frames come from `netcam.jpg`.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use phenocam_lib::CameraSettings;
use phenocam_lib::metadata::CaptureMode;
use zeroize::Zeroizing;

use crate::utils::create_http_agent;

/// Loopback address of the camera's own web server
pub const LOCAL_CAMERA_URL: &str = "http://127.0.0.1";

/// Admin user of the camera web interface
pub const ADMIN_USER: &str = "admin";

/// HTTP timeout for local API calls
const HTTP_TIMEOUT_SECS: u64 = 20;

/// What the capture cycle and installer need from a camera
pub trait Camera {
    /// Apply one `vb.htm` setting
    fn set_param(&self, name: &str, value: &str) -> Result<()>;

    /// Read one `vb.htm` parameter
    fn get_param(&self, name: &str) -> Result<String>;

    /// Fetch the current frame as JPEG bytes
    fn snapshot(&self) -> Result<Vec<u8>>;

    fn set_ir(&self, enabled: bool) -> Result<()> {
        self.set_param("ir_enable", if enabled { "1" } else { "0" })
    }

    fn set_overlay(&self, text: &str) -> Result<()> {
        self.set_param("overlaytext1", text)
    }

    /// Current exposure, if the firmware reports one
    fn exposure(&self) -> Option<u32> {
        self.get_param("exposure")
            .ok()
            .and_then(|value| value.trim().parse().ok())
    }
}

/// StarDot NetCam reached over its loopback web server
pub struct StarDotCamera {
    agent: ureq::Agent,
    base_url: String,
    authorization: Zeroizing<String>,
}

impl StarDotCamera {
    pub fn new(base_url: &str, password: &str) -> Self {
        let credentials = Zeroizing::new(format!("{ADMIN_USER}:{password}"));
        Self {
            agent: create_http_agent(HTTP_TIMEOUT_SECS),
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: Zeroizing::new(format!(
                "Basic {}",
                STANDARD.encode(credentials.as_bytes())
            )),
        }
    }

    pub fn local(password: &str) -> Self {
        Self::new(LOCAL_CAMERA_URL, password)
    }

    fn get(&self, path_and_query: &str) -> Result<ureq::http::Response<ureq::Body>> {
        let url = format!("{}/{path_and_query}", self.base_url);
        log::debug!("GET {}", redact_query(&url));
        let response = self
            .agent
            .get(&url)
            .header("Authorization", self.authorization.as_str())
            .call()
            .with_context(|| format!("Camera request failed: {}", redact_query(&url)))?;

        if response.status() != 200 {
            anyhow::bail!("HTTP {} from camera for {}", response.status(), path_and_query);
        }
        Ok(response)
    }
}

impl Camera for StarDotCamera {
    fn set_param(&self, name: &str, value: &str) -> Result<()> {
        let query = format!("vb.htm?{name}={}", encode_query_value(value));
        let mut response = self.get(&query)?;
        let body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read camera response")?;
        if body.trim_start().starts_with("NG") {
            anyhow::bail!("Camera rejected {name}={value}");
        }
        Ok(())
    }

    fn get_param(&self, name: &str) -> Result<String> {
        let mut response = self.get(&format!("vb.htm?paratest={name}"))?;
        let body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read camera response")?;
        parse_paratest(&body, name)
            .with_context(|| format!("Camera did not report {name}: {}", body.trim()))
    }

    fn snapshot(&self) -> Result<Vec<u8>> {
        let mut response = self.get("netcam.jpg")?;
        response
            .body_mut()
            .read_to_vec()
            .context("Failed to read image from camera")
    }
}

/// Extract `<value>` from a `OK <name>=<value>` paratest reply
pub fn parse_paratest(body: &str, name: &str) -> Option<String> {
    body.lines()
        .map(|line| line.trim().trim_start_matches("OK").trim())
        .find_map(|line| {
            line.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(|value| value.trim().to_string())
}

/// Percent-encode a query value (overlay text carries spaces and `%` codes)
pub fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// Overlay text burned into frames; capture cycles tag the mode
pub fn overlay_text(settings: &CameraSettings, mode: Option<CaptureMode>) -> String {
    let base = format!(
        "{} - {} - %a %b %d %Y %H:%M:%S",
        settings.site_name,
        settings.timezone_label()
    );
    match mode {
        Some(mode) => format!("{base} - {} - Exposure: %e", mode.label()),
        None => base,
    }
}

/// Camera parameters derived from the settings record, in apply order
pub fn camera_params(settings: &CameraSettings) -> Vec<(&'static str, String)> {
    let gains = settings.gains;
    let adj = settings.adjustments;
    vec![
        ("timezone", settings.utc_offset.posix_tz()),
        ("overlaytext1", overlay_text(settings, None)),
        ("red", gains.red.to_string()),
        ("green", gains.green.to_string()),
        ("blue", gains.blue.to_string()),
        ("brightness", adj.brightness.to_string()),
        ("sharpness", adj.sharpness.to_string()),
        ("hue", adj.hue.to_string()),
        ("contrast", adj.contrast.to_string()),
        ("saturation", adj.saturation.to_string()),
        ("backlight", adj.backlight.to_string()),
    ]
}


#[cfg(test)]
mod tests {
    use super::*;
    use phenocam_lib::Network;

    fn settings() -> CameraSettings {
        CameraSettings::new(
            "mycam",
            "-5".parse().unwrap(),
            9,
            22,
            30,
            Network::Phenocam,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_paratest() {
        assert_eq!(
            parse_paratest("OK exposure=123\n", "exposure"),
            Some("123".to_string())
        );
        assert_eq!(parse_paratest("NG exposure\n", "exposure"), None);
        assert_eq!(parse_paratest("OK exposures=1\n", "exposure"), None);
    }

    #[test]
    fn test_encode_query_value() {
        assert_eq!(encode_query_value("a b%c"), "a%20b%25c");
        assert_eq!(encode_query_value("UTC+5"), "UTC%2B5");
    }

    #[test]
    fn test_redact_query() {
        assert_eq!(
            redact_query("http://127.0.0.1/vb.htm?overlaytext1=x"),
            "http://127.0.0.1/vb.htm"
        );
    }

    #[test]
    fn test_camera_params_use_posix_timezone() {
        let params = camera_params(&settings());
        assert_eq!(params[0], ("timezone", "UTC+5".to_string()));
        assert!(params.iter().any(|(k, v)| *k == "saturation" && v == "100"));
    }

    #[test]
    fn test_overlay_text() {
        let live = overlay_text(&settings(), None);
        assert!(live.starts_with("mycam - UTC-5"));
        let nir = overlay_text(&settings(), Some(CaptureMode::Nir));
        assert!(nir.contains("NIR"));
        assert!(nir.starts_with(&live));
    }

    #[test]
    fn test_default_ir_toggle_goes_through_set_param() {
        let camera = testing::FakeCamera::default();
        camera.set_ir(true).unwrap();
        camera.set_ir(false).unwrap();
        assert_eq!(camera.calls_for("ir_enable"), vec!["1", "0"]);
        assert_eq!(camera.exposure(), Some(42));
    }
}
