use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use phenocam_lib::keys::{extract_public_key, public_key_file_name};
use phenocam_lib::paths::PRIVATE_KEY_PATH;

use crate::ssh::{Remote, RemoteCommand};

/// Print the camera's sFTP public key and save it under `output_dir`
///
/// Returns `None` on a dry run.
pub fn retrieve_key(
    remote: &dyn Remote,
    camera: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let exists = remote.run(&RemoteCommand::new("test").args(["-f", PRIVATE_KEY_PATH]))?;
    if remote.is_dry_run() {
        remote.run(&dump_command())?;
        return Ok(None);
    }
    if !exists.success() {
        anyhow::bail!("No sFTP key on {camera}; run an install first");
    }

    let output = remote.run_checked(&dump_command())?;
    let key = extract_public_key(&output.stdout)
        .with_context(|| format!("Unexpected dropbearkey output from {camera}"))?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;
    let path = output_dir.join(public_key_file_name(camera));
    std::fs::write(&path, format!("{key}\n"))
        .with_context(|| format!("Failed to write key file: {}", path.display()))?;

    Ok(Some(path))
}

fn dump_command() -> RemoteCommand {
    RemoteCommand::new("dropbearkey").args(["-y", "-f", PRIVATE_KEY_PATH])
}
