use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Run a command and return the output
pub fn run_command(program: &str, args: &[&str]) -> Result<std::process::Output> {
    log::debug!("Running command: {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", program, args.join(" ")))?;

    log::debug!("Command exit status: {}", output.status);
    if !output.stdout.is_empty() {
        log::debug!("stdout: {}", String::from_utf8_lossy(&output.stdout));
    }
    if !output.stderr.is_empty() {
        log::debug!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    }

    Ok(output)
}

/// Create a ureq HTTP agent with the specified timeout
pub fn create_http_agent(timeout_secs: u64) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build();
    config.into()
}

/// Read a file to string
pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Write a file, creating parent directories as needed
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Remove a file, ignoring one that is already gone
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove file: {}", path.display())),
    }
}

/// Whether `mount_point` appears in a `/proc/mounts` style listing
pub fn is_mounted(mounts: &str, mount_point: &str) -> bool {
    mounts
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|mounted| mounted == mount_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_mounted() {
        let mounts = "rootfs / rootfs rw 0 0\n/dev/mmcblk0p1 /mnt/sd vfat rw 0 0\n";
        assert!(is_mounted(mounts, "/mnt/sd"));
        assert!(!is_mounted(mounts, "/mnt/usb"));
        assert!(!is_mounted("", "/mnt/sd"));
    }

    #[test]
    fn test_remove_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_file_if_exists(&dir.path().join("nope")).is_ok());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        write_file(&path, b"hi").unwrap();
        assert_eq!(read_file(&path).unwrap(), "hi");
    }
}
