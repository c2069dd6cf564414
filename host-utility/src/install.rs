// Camera install over SSH
//
// The install is a fixed sequence of remote steps: settings files, the sFTP
// key, the agent payload, the boot hook and finally a reboot. The agent's
// boot-time `install` picks up the update flag and does the rest on the
// camera itself.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use phenocam_lib::CameraSettings;
use phenocam_lib::keys::{KEY_BITS, KEY_TYPE};
use phenocam_lib::paths::{
    AGENT_FILE_NAME, AGENT_PATH, PASSWORD_PATH, PAYLOAD_STAGING_DIR, PRIVATE_KEY_PATH,
    SCRIPTS_DIR, SERVER_LIST_PATH, SETTINGS_PATH, UPDATE_FLAG_PATH, USERBOOT_PATH,
    userboot_script,
};
use phenocam_lib::payload::{Bundle, decode_installer, find_payload, render_installer};
use phenocam_lib::servers::render_server_list;
use zeroize::Zeroizing;

use crate::progress::{run_step, run_step_detail};
use crate::ssh::{Remote, RemoteCommand};
use crate::utils::format_size;

/// Everything needed to install one camera
pub struct InstallRequest {
    pub camera: String,
    pub password: Zeroizing<String>,
    pub settings: CameraSettings,
}

/// Bundle the camera build of the agent
pub fn build_bundle(agent_binary: &Path) -> Result<Bundle> {
    let data = std::fs::read(agent_binary).with_context(|| {
        format!(
            "Failed to read agent binary {} (set agent_binary in the pit config or pass --agent)",
            agent_binary.display()
        )
    })?;
    let mut bundle = Bundle::new();
    bundle.add(AGENT_FILE_NAME, 0o755, data)?;
    Ok(bundle)
}

/// Write a standalone self-extracting installer
pub fn write_bundle(bundle: &Bundle, path: &Path) -> Result<()> {
    let installer = render_installer(bundle, SCRIPTS_DIR)?;
    std::fs::write(path, installer)
        .with_context(|| format!("Failed to write installer: {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }
    Ok(())
}

/// Commands writing the settings, password, server list and update flag
pub fn settings_commands(request: &InstallRequest) -> Vec<RemoteCommand> {
    let settings = &request.settings;
    let password = Zeroizing::new(format!("{}\n", request.password.as_str()));
    vec![
        RemoteCommand::write_file(SETTINGS_PATH, settings.to_file_contents()),
        RemoteCommand::write_file(PASSWORD_PATH, password.as_bytes()),
        RemoteCommand::new("chmod").args(["600", PASSWORD_PATH]),
        RemoteCommand::write_file(
            SERVER_LIST_PATH,
            render_server_list(&settings.network.servers()),
        ),
        RemoteCommand::write_file(
            UPDATE_FLAG_PATH,
            format!("{}\n", Local::now().to_rfc3339()),
        ),
    ]
}

/// Generate the sFTP key pair unless the camera already has one
///
/// Returns whether a new key was made.
pub fn ensure_key(remote: &dyn Remote) -> Result<bool> {
    let exists = remote.run(&RemoteCommand::new("test").args(["-f", PRIVATE_KEY_PATH]))?;
    if exists.success() {
        return Ok(false);
    }
    remote.run_checked(
        &RemoteCommand::new("dropbearkey").args(["-t", KEY_TYPE, "-s", KEY_BITS, "-f", PRIVATE_KEY_PATH]),
    )?;
    Ok(true)
}

/// Commands unpacking the payload body into the scripts directory
pub fn payload_commands(body: &str) -> Vec<RemoteCommand> {
    vec![
        RemoteCommand::new("rm").args(["-rf", PAYLOAD_STAGING_DIR]),
        RemoteCommand::new("mkdir").args(["-p", PAYLOAD_STAGING_DIR]),
        RemoteCommand::new("base64")
            .arg("-d")
            .pipe("tar")
            .args(["-x", "-f", "-", "-C", PAYLOAD_STAGING_DIR])
            .stdin(body),
        RemoteCommand::new("rm").args(["-rf", SCRIPTS_DIR]),
        RemoteCommand::new("mkdir").args(["-p", SCRIPTS_DIR]),
        RemoteCommand::new("cp")
            .arg("-R")
            .arg(format!("{PAYLOAD_STAGING_DIR}/."))
            .arg(format!("{SCRIPTS_DIR}/")),
        RemoteCommand::new("chmod").args(["755", AGENT_PATH]),
        RemoteCommand::new("rm").args(["-rf", PAYLOAD_STAGING_DIR]),
    ]
}

pub fn boot_hook_commands() -> Vec<RemoteCommand> {
    vec![
        RemoteCommand::write_file(USERBOOT_PATH, userboot_script()),
        RemoteCommand::new("chmod").args(["755", USERBOOT_PATH]),
    ]
}

fn run_all(remote: &dyn Remote, commands: &[RemoteCommand]) -> Result<()> {
    for command in commands {
        remote.run_checked(command)?;
    }
    Ok(())
}

/// Run every install step up to, not including, the reboot
pub fn run_install(remote: &dyn Remote, request: &InstallRequest, bundle: &Bundle) -> Result<()> {
    let site = &request.settings.site_name;

    run_step(&format!("Write settings for {site}"), || {
        run_all(remote, &settings_commands(request))
    })?;

    run_step_detail("Check sFTP key", || {
        let created = ensure_key(remote)?;
        let detail = if created { "generated" } else { "kept existing" };
        Ok(((), detail.to_string()))
    })?;

    run_step_detail("Transfer payload", || {
        let installer = render_installer(bundle, SCRIPTS_DIR)?;
        // Fail here rather than leave a half-extracted scripts directory
        decode_installer(&installer).context("Rendered payload does not verify")?;
        let body = find_payload(&installer)?;
        run_all(remote, &payload_commands(body))?;
        Ok(((), format_size(body.len())))
    })?;

    run_step("Install boot hook", || run_all(remote, &boot_hook_commands()))?;

    log::info!("Installed {site} on {}", request.camera);
    Ok(())
}
