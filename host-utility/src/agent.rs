// Remote invocations of the on-camera agent (`-u` and `-v`)
//
// The agent exits 0/2/1 for complete/partial/failed; that code is carried
// back through SSH and becomes pit's own exit status.

use anyhow::Result;
use phenocam_lib::UploadStatus;
use phenocam_lib::paths::AGENT_PATH;

use crate::ssh::{Remote, RemoteCommand, RemoteOutput};
use crate::utils::{failure, success, warning};

/// Map an agent exit code to a run status
pub fn status_from_exit(code: Option<i32>) -> UploadStatus {
    match code {
        Some(0) => UploadStatus::Complete,
        Some(2) => UploadStatus::Partial,
        _ => UploadStatus::Failed,
    }
}

fn run_agent(remote: &dyn Remote, subcommand: &str) -> Result<RemoteOutput> {
    let output = remote.run(&RemoteCommand::new(AGENT_PATH).arg(subcommand))?;
    // 127: the payload was never installed
    if output.code == Some(127) {
        anyhow::bail!("phenocam-agent is not installed on the camera; run an install first");
    }
    Ok(output)
}

/// Trigger one capture and upload cycle on the camera
pub fn upload(remote: &dyn Remote) -> Result<UploadStatus> {
    let output = run_agent(remote, "upload")?;
    if remote.is_dry_run() {
        return Ok(UploadStatus::Complete);
    }
    for line in output.stderr.lines().filter(|l| l.contains("WARN") || l.contains("ERROR")) {
        warning(line.trim());
    }
    let status = status_from_exit(output.code);
    match status {
        UploadStatus::Complete => success("Images captured and uploaded"),
        UploadStatus::Partial => warning("Upload incomplete; some servers were unreachable"),
        UploadStatus::Failed => failure("Upload failed"),
    }
    Ok(status)
}

/// Probe every configured server's sFTP login from the camera
pub fn validate(remote: &dyn Remote) -> Result<UploadStatus> {
    let output = run_agent(remote, "validate")?;
    if remote.is_dry_run() {
        return Ok(UploadStatus::Complete);
    }
    for line in output.stdout.lines() {
        if let Some(server) = line.strip_prefix("PASS ") {
            success(server);
        } else if let Some(detail) = line.strip_prefix("FAIL ") {
            failure(detail);
        }
    }
    if output.stdout.trim().is_empty() && !output.stderr.trim().is_empty() {
        failure(output.stderr.trim());
    }
    Ok(status_from_exit(output.code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::testing::MockRemote;

    #[test]
    fn test_status_from_exit() {
        assert_eq!(status_from_exit(Some(0)), UploadStatus::Complete);
        assert_eq!(status_from_exit(Some(2)), UploadStatus::Partial);
        assert_eq!(status_from_exit(Some(1)), UploadStatus::Failed);
        assert_eq!(status_from_exit(None), UploadStatus::Failed);
    }

    #[test]
    fn test_validate_surfaces_partial() {
        let remote = MockRemote::default().reply(
            AGENT_PATH,
            2,
            "PASS phenocam.nau.edu\nFAIL icos01.uantwerpen.be: timeout\n",
        );
        assert_eq!(validate(&remote).unwrap(), UploadStatus::Partial);
        assert_eq!(
            remote.rendered(),
            vec!["/mnt/cfg1/scripts/phenocam-agent validate"]
        );
    }

    #[test]
    fn test_upload_runs_agent() {
        let remote = MockRemote::default();
        assert_eq!(upload(&remote).unwrap(), UploadStatus::Complete);
        assert_eq!(
            remote.rendered(),
            vec!["/mnt/cfg1/scripts/phenocam-agent upload"]
        );
    }

    #[test]
    fn test_missing_agent_is_an_error() {
        let remote = MockRemote::default().reply(AGENT_PATH, 127, "");
        assert!(upload(&remote).is_err());
    }
}
