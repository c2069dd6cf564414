// Filesystem layout of a StarDot NetCam Live2 as used by the PhenoCam tooling
//
// Everything persistent lives on the camera's `/mnt/cfg1` settings partition;
// `/var` is a tmpfs that is rebuilt on every boot.

// ============================================================================
// Persistent settings partition
// ============================================================================

/// Root of the persistent settings partition
pub const CFG_DIR: &str = "/mnt/cfg1";

/// Ordered settings record
pub const SETTINGS_PATH: &str = "/mnt/cfg1/settings.txt";

/// Camera admin password (root-owned, mode 0600)
pub const PASSWORD_PATH: &str = "/mnt/cfg1/.password";

/// Upload destinations, one hostname per line
pub const SERVER_LIST_PATH: &str = "/mnt/cfg1/server.txt";

/// sFTP private key generated on the camera
pub const PRIVATE_KEY_PATH: &str = "/mnt/cfg1/phenocam_key";

/// sFTP public key (only present on older installs that exported it to disk)
pub const PUBLIC_KEY_PATH: &str = "/mnt/cfg1/phenocam_key.pub";

/// Marker telling the boot-time installer that settings changed
pub const UPDATE_FLAG_PATH: &str = "/mnt/cfg1/update.txt";

/// Vendor boot hook executed after every boot
pub const USERBOOT_PATH: &str = "/mnt/cfg1/userboot.sh";

/// Directory holding the unpacked payload
pub const SCRIPTS_DIR: &str = "/mnt/cfg1/scripts";

/// Persisted admin crontab (IP report), copied into the cron spool on boot
pub const ADMIN_SCHEDULE_PATH: &str = "/mnt/cfg1/schedule/admin";

/// Persisted root crontab (capture/upload and daily reboot)
pub const ROOT_SCHEDULE_PATH: &str = "/mnt/cfg1/schedule/root";

/// Agent binary inside the scripts directory
pub const AGENT_PATH: &str = "/mnt/cfg1/scripts/phenocam-agent";

/// File name of the agent inside the payload bundle
pub const AGENT_FILE_NAME: &str = "phenocam-agent";

// ============================================================================
// Volatile locations
// ============================================================================

/// Live cron spool read by busybox crond
pub const CRONTAB_DIR: &str = "/var/spool/cron/crontabs";

/// Scratch directory for captures and metadata
pub const TMP_DIR: &str = "/var/tmp";

/// Shared metadata file assembled before every capture
pub const METADATA_PATH: &str = "/var/tmp/metadata.txt";

/// Where the installer unpacks the payload before copying it into place
pub const PAYLOAD_STAGING_DIR: &str = "/var/tmp/pit-payload";

// ============================================================================
// SD card backup
// ============================================================================

/// Mount point of an inserted SD card
pub const SD_MOUNT_POINT: &str = "/mnt/sd";

/// Backup root on the SD card; images land in `<root>/<site>/`
pub const SD_BACKUP_DIR: &str = "/mnt/sd/backup";

/// Resources removed by a purge, in removal order
pub const PURGE_TARGETS: [&str; 5] = [
    SETTINGS_PATH,
    PASSWORD_PATH,
    PRIVATE_KEY_PATH,
    PUBLIC_KEY_PATH,
    SCRIPTS_DIR,
];

/// Boot hook: apply pending settings, then capture once
pub fn userboot_script() -> String {
    format!("#!/bin/sh\n{AGENT_PATH} install\n{AGENT_PATH} upload &\n")
}

/// Remote upload path for a file: `data/<site>/<file>`
pub fn remote_data_path(site: &str, file_name: &str) -> String {
    format!("data/{site}/{file_name}")
}
