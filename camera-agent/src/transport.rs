// sFTP and FTP transports backed by the camera's command-line clients
//
// sFTP runs `sftp -b <batch>` with the on-camera key; the batch file is a
// temp file so concurrent cycles never share one. FTP runs busybox
// `ftpput` with anonymous credentials.

use std::io::Write;
use std::path::{Path, PathBuf};

use phenocam_lib::TransferError;
use phenocam_lib::upload::{
    FTP_PASSWORD, FTP_USER, SFTP_PROBE_BATCH, SFTP_USER, Transport, TransportKind,
    sftp_put_batch,
};

use crate::utils::run_command;

/// Seconds before an unreachable server is given up on
const CONNECT_TIMEOUT_SECS: u32 = 15;

pub struct SftpTransport {
    key: PathBuf,
}

impl SftpTransport {
    pub fn new(key: impl Into<PathBuf>) -> Self {
        Self { key: key.into() }
    }

    fn args(&self, batch: &Path, server: &str) -> Vec<String> {
        vec![
            "-b".to_string(),
            batch.display().to_string(),
            "-i".to_string(),
            self.key.display().to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
            format!("{SFTP_USER}@{server}"),
        ]
    }

    fn run_batch(&self, server: &str, batch: &str) -> Result<(), String> {
        let mut file = tempfile::Builder::new()
            .prefix("sftp_batch")
            .tempfile()
            .map_err(|e| e.to_string())?;
        file.write_all(batch.as_bytes()).map_err(|e| e.to_string())?;

        let args = self.args(file.path(), server);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = run_command("sftp", &args).map_err(|e| format!("{e:#}"))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

impl Transport for SftpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Sftp
    }

    fn probe(&self, server: &str) -> Result<(), TransferError> {
        self.run_batch(server, SFTP_PROBE_BATCH)
            .map_err(|detail| TransferError::Unreachable {
                server: server.to_string(),
                detail,
            })
    }

    fn put(&self, server: &str, local: &Path, remote: &str) -> Result<(), TransferError> {
        self.run_batch(server, &sftp_put_batch(local, remote))
            .map_err(|detail| TransferError::Rejected {
                server: server.to_string(),
                file: remote.to_string(),
                detail,
            })
    }
}

pub struct FtpTransport;

impl FtpTransport {
    fn put_args(server: &str, local: &Path, remote: &str) -> Vec<String> {
        vec![
            "-u".to_string(),
            FTP_USER.to_string(),
            "-p".to_string(),
            FTP_PASSWORD.to_string(),
            server.to_string(),
            remote.to_string(),
            local.display().to_string(),
        ]
    }
}

impl Transport for FtpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Ftp
    }

    /// Anonymous FTP has no side-effect-free login in busybox; assume reachable
    fn probe(&self, _server: &str) -> Result<(), TransferError> {
        Ok(())
    }

    fn put(&self, server: &str, local: &Path, remote: &str) -> Result<(), TransferError> {
        let args = Self::put_args(server, local, remote);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = run_command("ftpput", &args).map_err(|e| TransferError::Unreachable {
            server: server.to_string(),
            detail: format!("{e:#}"),
        })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(TransferError::Rejected {
                server: server.to_string(),
                file: remote.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sftp_args() {
        let transport = SftpTransport::new("/mnt/cfg1/phenocam_key");
        let args = transport.args(Path::new("/tmp/batch"), "phenocam.nau.edu");
        assert_eq!(args[0..4], ["-b", "/tmp/batch", "-i", "/mnt/cfg1/phenocam_key"]);
        assert_eq!(args.last().unwrap(), "phenosftp@phenocam.nau.edu");
    }

    #[test]
    fn test_ftp_args_put_remote_before_local() {
        let args = FtpTransport::put_args(
            "phenocam.nau.edu",
            Path::new("/var/tmp/a.jpg"),
            "data/mycam/a.jpg",
        );
        assert_eq!(
            args,
            [
                "-u",
                "anonymous",
                "-p",
                "anonymous",
                "phenocam.nau.edu",
                "data/mycam/a.jpg",
                "/var/tmp/a.jpg"
            ]
        );
    }
}
