//! Upload driver with sFTP → FTP fallback
//!
//! For each server the driver probes sFTP with a no-op batch. A reachable
//! server gets its files over sFTP; an unreachable one, a camera without a
//! key, or a failed sFTP `put` falls back to anonymous FTP for that file.
//! FTP is never tried for a file that sFTP already delivered. A failing
//! server is recorded and the loop moves on; nothing is retried.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::TransferError;

/// sFTP account on the archive servers
pub const SFTP_USER: &str = "phenosftp";

/// Credentials for the anonymous FTP fallback
pub const FTP_USER: &str = "anonymous";
pub const FTP_PASSWORD: &str = "anonymous";

/// Batch file used to probe an sFTP login without side effects
pub const SFTP_PROBE_BATCH: &str = "pwd\n";

/// Wire protocol used for a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Sftp,
    Ftp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sftp => f.write_str("sFTP"),
            Self::Ftp => f.write_str("FTP"),
        }
    }
}

/// A way of moving files to an archive server
pub trait Transport {
    fn kind(&self) -> TransportKind;

    /// Log in and do nothing, to test reachability and credentials
    fn probe(&self, server: &str) -> Result<(), TransferError>;

    /// Copy `local` to `remote` (relative to the login directory)
    fn put(&self, server: &str, local: &Path, remote: &str) -> Result<(), TransferError>;
}

/// sFTP batch that uploads one file
pub fn sftp_put_batch(local: &Path, remote: &str) -> String {
    format!("put {} {remote}\n", local.display())
}

/// A local file and its destination path on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub local: PathBuf,
    pub remote: String,
}

impl UploadFile {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

/// Result of delivering one file to one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub server: String,
    pub remote: String,
    /// Transport that delivered the file, or the last error
    pub result: Result<TransportKind, String>,
    /// Set when sFTP was attempted for this file and failed
    pub sftp_error: Option<String>,
}

/// Overall result of an upload or probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// Every transfer succeeded
    Complete,
    /// Some transfers failed, some succeeded
    Partial,
    /// Nothing was delivered
    Failed,
}

impl UploadStatus {
    fn from_counts(ok: usize, total: usize) -> Self {
        if total > 0 && ok == total {
            Self::Complete
        } else if ok > 0 {
            Self::Partial
        } else {
            Self::Failed
        }
    }

    /// Process exit code: 0 complete, 2 partial, 1 failed
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Partial => 2,
            Self::Failed => 1,
        }
    }
}

/// Per-server, per-file record of an upload run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub outcomes: Vec<FileOutcome>,
}

impl UploadReport {
    pub fn status(&self) -> UploadStatus {
        let ok = self.outcomes.iter().filter(|o| o.result.is_ok()).count();
        UploadStatus::from_counts(ok, self.outcomes.len())
    }

    /// Servers that missed at least one file, each once, in first-failure order
    pub fn failed_servers(&self) -> Vec<&str> {
        let mut servers: Vec<&str> = Vec::new();
        for outcome in self.outcomes.iter().filter(|o| o.result.is_err()) {
            if !servers.contains(&outcome.server.as_str()) {
                servers.push(&outcome.server);
            }
        }
        servers
    }

    /// Operator-facing lines for everything short of a clean sFTP delivery
    pub fn warnings(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .outcomes
            .iter()
            .filter_map(|o| {
                let sftp_error = o.sftp_error.as_deref()?;
                Some(match &o.result {
                    Ok(kind) => format!(
                        "{} reached {} over {kind} after sFTP failed: {sftp_error}",
                        o.remote, o.server
                    ),
                    Err(e) => format!(
                        "{} missed {}: sFTP failed ({sftp_error}), then {e}",
                        o.remote, o.server
                    ),
                })
            })
            .collect();
        lines.extend(
            self.failed_servers()
                .into_iter()
                .map(|server| format!("Upload to {server} incomplete")),
        );
        lines
    }

    pub fn merge(&mut self, other: UploadReport) {
        self.outcomes.extend(other.outcomes);
    }
}

/// Upload every file to every server, preferring sFTP
///
/// `sftp` is `None` when the camera has no key.
pub fn upload_to_servers(
    servers: &[String],
    files: &[UploadFile],
    sftp: Option<&dyn Transport>,
    ftp: &dyn Transport,
) -> UploadReport {
    let mut report = UploadReport::default();
    if sftp.is_none() && !servers.is_empty() {
        log::warn!("No sFTP key; uploading over {}", ftp.kind());
    }

    for server in servers {
        let sftp = sftp.filter(|transport| match transport.probe(server) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("sFTP login to {server} failed, using FTP: {e}");
                false
            }
        });

        for file in files {
            let mut sftp_error = None;
            if let Some(transport) = sftp {
                match transport.put(server, &file.local, &file.remote) {
                    Ok(()) => {
                        log::info!(
                            "Uploaded {} to {server} via {}",
                            file.remote,
                            transport.kind()
                        );
                        report.outcomes.push(FileOutcome {
                            server: server.clone(),
                            remote: file.remote.clone(),
                            result: Ok(transport.kind()),
                            sftp_error: None,
                        });
                        continue;
                    }
                    Err(e) => {
                        log::warn!(
                            "{} upload of {} to {server} failed: {e}",
                            transport.kind(),
                            file.remote
                        );
                        sftp_error = Some(e.to_string());
                    }
                }
            }

            let result = match ftp.put(server, &file.local, &file.remote) {
                Ok(()) => {
                    log::info!("Uploaded {} to {server} via {}", file.remote, ftp.kind());
                    Ok(ftp.kind())
                }
                Err(e) => {
                    log::warn!("{} upload of {} to {server} failed: {e}", ftp.kind(), file.remote);
                    Err(e.to_string())
                }
            };
            report.outcomes.push(FileOutcome {
                server: server.clone(),
                remote: file.remote.clone(),
                result,
                sftp_error,
            });
        }
    }

    report
}

/// Result of probing each server's sFTP login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub results: Vec<(String, Result<(), String>)>,
}

impl ProbeReport {
    pub fn status(&self) -> UploadStatus {
        let ok = self.results.iter().filter(|(_, r)| r.is_ok()).count();
        UploadStatus::from_counts(ok, self.results.len())
    }
}

/// Probe every server's sFTP login without transferring anything
pub fn probe_servers(servers: &[String], sftp: &dyn Transport) -> ProbeReport {
    ProbeReport {
        results: servers
            .iter()
            .map(|server| {
                let result = sftp.probe(server).map_err(|e| e.to_string());
                (server.clone(), result)
            })
            .collect(),
    }
}
