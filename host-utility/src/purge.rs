use anyhow::Result;
use phenocam_lib::paths::PURGE_TARGETS;

use crate::ssh::{Remote, RemoteCommand};
use crate::utils::{info, success};

/// What a purge run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    Removed,
    Cancelled,
    DryRun,
}

/// The single removal command covering every purge target
pub fn purge_command() -> RemoteCommand {
    RemoteCommand::new("rm").arg("-rf").args(PURGE_TARGETS)
}

/// Remove PhenoCam state from the camera once `confirm` says yes
///
/// The key pair goes too, so a later install generates a new key that has
/// to be allow-listed again.
pub fn run_purge(
    remote: &dyn Remote,
    camera: &str,
    confirm: impl FnOnce() -> Result<bool>,
) -> Result<PurgeOutcome> {
    if remote.is_dry_run() {
        for target in PURGE_TARGETS {
            info(&format!("Would remove {target}"));
        }
        remote.run(&purge_command())?;
        return Ok(PurgeOutcome::DryRun);
    }

    if !confirm()? {
        return Ok(PurgeOutcome::Cancelled);
    }

    remote.run_checked(&purge_command())?;
    log::info!("Purged {} from {camera}", PURGE_TARGETS.join(", "));
    success(&format!("Removed PhenoCam configuration from {camera}"));
    Ok(PurgeOutcome::Removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::DryRun;
    use crate::ssh::testing::MockRemote;

    #[test]
    fn test_declined_purge_runs_nothing() {
        let remote = MockRemote::default();
        let outcome = run_purge(&remote, "10.0.0.5", || Ok(false)).unwrap();
        assert_eq!(outcome, PurgeOutcome::Cancelled);
        assert!(remote.commands.borrow().is_empty());
    }

    #[test]
    fn test_prompt_error_runs_nothing() {
        let remote = MockRemote::default();
        assert!(run_purge(&remote, "10.0.0.5", || anyhow::bail!("no tty")).is_err());
        assert!(remote.commands.borrow().is_empty());
    }

    #[test]
    fn test_confirmed_purge_removes_exactly_five_targets() {
        let remote = MockRemote::default();
        let outcome = run_purge(&remote, "10.0.0.5", || Ok(true)).unwrap();
        assert_eq!(outcome, PurgeOutcome::Removed);
        assert_eq!(
            remote.rendered(),
            vec![
                "rm -rf /mnt/cfg1/settings.txt /mnt/cfg1/.password /mnt/cfg1/phenocam_key \
                 /mnt/cfg1/phenocam_key.pub /mnt/cfg1/scripts"
            ]
        );
    }

    #[test]
    fn test_dry_run_never_asks() {
        let remote = DryRun {
            destination: "admin@10.0.0.5".to_string(),
        };
        let outcome = run_purge(&remote, "10.0.0.5", || panic!("prompted")).unwrap();
        assert_eq!(outcome, PurgeOutcome::DryRun);
    }

    #[test]
    fn test_failed_removal_is_an_error() {
        let remote = MockRemote::default().reply("rm -rf", 1, "");
        assert!(run_purge(&remote, "10.0.0.5", || Ok(true)).is_err());
    }
}
