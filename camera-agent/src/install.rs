// Boot-time installer
//
// Runs from userboot.sh on every boot. When the operator CLI has left an
// update flag, camera settings are pushed through the admin API and a fresh
// jittered schedule is generated; otherwise the persisted schedule is kept
// so the jitter stays stable across reboots. Either way the persisted
// crontabs are copied into the volatile cron spool.

use std::path::Path;

use anyhow::{Context, Result};
use phenocam_lib::paths::{
    ADMIN_SCHEDULE_PATH, CRONTAB_DIR, ROOT_SCHEDULE_PATH, SETTINGS_PATH, UPDATE_FLAG_PATH,
};
use phenocam_lib::schedule::admin_crontab;
use phenocam_lib::{CameraSettings, Schedule};

use crate::camera::{Camera, camera_params};
use crate::layout::Layout;
use crate::utils::{read_file, remove_file_if_exists, write_file};

/// What a boot install did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub applied_update: bool,
    pub regenerated_schedule: bool,
    pub failed_params: Vec<String>,
}

pub fn run(layout: &Layout, camera: &dyn Camera) -> Result<InstallOutcome> {
    let settings_path = layout.path(SETTINGS_PATH);
    let settings = CameraSettings::parse(&read_file(&settings_path)?)
        .with_context(|| format!("Invalid settings in {}", settings_path.display()))?;

    let flag = layout.path(UPDATE_FLAG_PATH);
    let applied_update = flag.exists();
    let admin_schedule = layout.path(ADMIN_SCHEDULE_PATH);
    let root_schedule = layout.path(ROOT_SCHEDULE_PATH);

    let mut failed_params = Vec::new();
    if applied_update {
        log::info!("Update flag present; applying settings for {}", settings.site_name);
        failed_params = apply_settings(camera, &settings);
    }

    let regenerated_schedule =
        applied_update || !admin_schedule.exists() || !root_schedule.exists();
    if regenerated_schedule {
        let schedule = Schedule::generate(settings.window()?, settings.fixed_schedule);
        log::info!(
            "Capture schedule: minutes {} hours {} (jitter {}m)",
            schedule.minute_field(),
            schedule.hour_field(),
            schedule.jitter()
        );
        write_file(&root_schedule, schedule.root_crontab().as_bytes())?;
        write_file(&admin_schedule, admin_crontab().as_bytes())?;
    }

    install_crontabs(layout, &admin_schedule, &root_schedule)?;

    // Only clear the flag once everything above has landed
    if applied_update {
        remove_file_if_exists(&flag)?;
    }

    Ok(InstallOutcome {
        applied_update,
        regenerated_schedule,
        failed_params,
    })
}

/// Push every settings-derived parameter; failures are collected, not fatal
fn apply_settings(camera: &dyn Camera, settings: &CameraSettings) -> Vec<String> {
    let mut failed = Vec::new();
    for (name, value) in camera_params(settings) {
        if let Err(e) = camera.set_param(name, &value) {
            log::warn!("Failed to set {name}: {e:#}");
            failed.push(name.to_string());
        }
    }
    failed
}

fn install_crontabs(layout: &Layout, admin: &Path, root: &Path) -> Result<()> {
    let spool = layout.path(CRONTAB_DIR);
    for (source, user) in [(admin, "admin"), (root, "root")] {
        let content = read_file(source)?;
        write_file(&spool.join(user), content.as_bytes())?;
    }
    log::info!("Installed crontabs into {}", spool.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::testing::FakeCamera;
    use crate::context::testing::install_fixture;
    use phenocam_lib::Network;

    #[test]
    fn test_update_flag_applies_settings_and_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let layout = install_fixture(dir.path(), Network::Phenocam);
        write_file(&layout.path(UPDATE_FLAG_PATH), b"").unwrap();
        let camera = FakeCamera::default();

        let outcome = run(&layout, &camera).unwrap();

        assert!(outcome.applied_update);
        assert!(outcome.regenerated_schedule);
        assert!(outcome.failed_params.is_empty());
        assert!(!layout.path(UPDATE_FLAG_PATH).exists());
        assert_eq!(camera.calls_for("timezone"), vec!["UTC-1"]);

        let root = read_file(&layout.path(CRONTAB_DIR).join("root")).unwrap();
        let lines: Vec<&str> = root.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" 9-22 * * * "));
        assert!(lines[0].ends_with("phenocam-agent upload"));
        assert_eq!(lines[1], "0 0 * * * /sbin/reboot");
        let admin = read_file(&layout.path(CRONTAB_DIR).join("admin")).unwrap();
        assert!(admin.trim_end().ends_with("phenocam-agent report-ip"));
        assert!(!admin.contains(" upload"));
    }

    #[test]
    fn test_plain_boot_keeps_existing_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let layout = install_fixture(dir.path(), Network::Phenocam);
        write_file(&layout.path(ADMIN_SCHEDULE_PATH), b"59 11 * * * agent report-ip\n").unwrap();
        write_file(
            &layout.path(ROOT_SCHEDULE_PATH),
            b"7,37 9-22 * * * agent upload\n0 0 * * * /sbin/reboot\n",
        )
        .unwrap();
        let camera = FakeCamera::default();

        let outcome = run(&layout, &camera).unwrap();

        assert!(!outcome.applied_update);
        assert!(!outcome.regenerated_schedule);
        assert!(camera.params.borrow().is_empty());
        let live = read_file(&layout.path(CRONTAB_DIR).join("root")).unwrap();
        assert_eq!(live, "7,37 9-22 * * * agent upload\n0 0 * * * /sbin/reboot\n");
    }

    #[test]
    fn test_first_boot_without_schedule_generates_one() {
        let dir = tempfile::tempdir().unwrap();
        let layout = install_fixture(dir.path(), Network::Phenocam);
        let outcome = run(&layout, &FakeCamera::default()).unwrap();
        assert!(outcome.regenerated_schedule);
        assert!(layout.path(ADMIN_SCHEDULE_PATH).exists());
        assert!(read_file(&layout.path(ROOT_SCHEDULE_PATH)).unwrap().contains(" upload"));
    }
}
