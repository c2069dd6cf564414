use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use zeroize::Zeroizing;

use crate::constants::{CAMERA_HTTP_USER, RESTART_QUERY};
use crate::ssh::{Remote, RemoteCommand};
use crate::utils::{create_http_agent, info, warning};

/// How the camera was restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootMethod {
    Http,
    Ssh,
    DryRun,
}

pub fn restart_url(camera: &str) -> String {
    format!("http://{camera}/{RESTART_QUERY}")
}

/// Ask the camera firmware to restart through its admin API
pub fn http_restart(camera: &str, password: &str, timeout_secs: u64) -> Result<()> {
    let credentials = Zeroizing::new(format!("{CAMERA_HTTP_USER}:{password}"));
    let authorization = Zeroizing::new(format!(
        "Basic {}",
        STANDARD.encode(credentials.as_bytes())
    ));
    let url = restart_url(camera);
    let response = create_http_agent(timeout_secs)
        .get(&url)
        .header("Authorization", authorization.as_str())
        .call()
        .with_context(|| format!("HTTP request failed: {url}"))?;

    if response.status() != 200 {
        anyhow::bail!("HTTP {} from {}", response.status(), url);
    }
    Ok(())
}

/// Restart the camera after `delay`, preferring the admin API over SSH
pub fn trigger(
    remote: &dyn Remote,
    delay: Duration,
    http: impl FnOnce() -> Result<()>,
) -> Result<RebootMethod> {
    if remote.is_dry_run() {
        info(&format!(
            "Would wait {}s and request {RESTART_QUERY}",
            delay.as_secs()
        ));
        return Ok(RebootMethod::DryRun);
    }

    thread::sleep(delay);

    match http() {
        Ok(()) => Ok(RebootMethod::Http),
        Err(e) => {
            log::debug!("{e:#}");
            warning("Restart over HTTP failed; rebooting over SSH");
            // The connection drops as the camera goes down
            let output = remote.run(&RemoteCommand::new("reboot"))?;
            if !output.success() && output.code.is_some() && output.code != Some(255) {
                anyhow::bail!("reboot failed: {}", output.stderr.trim());
            }
            Ok(RebootMethod::Ssh)
        }
    }
}
