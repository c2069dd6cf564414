// Typed remote execution over SSH
//
// Every remote action is a RemoteCommand: a pipeline of programs whose
// arguments are quoted one by one, an optional output redirect, and an
// optional stdin payload. File contents and secrets only ever travel on
// stdin, never inside the command line.

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::PitConfig;
use crate::utils;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote command failed ({status}): {command}\n{stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Quote one word for a POSIX shell
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./:=@%+,".contains(&b));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// A command to run on the camera
#[derive(Clone)]
pub struct RemoteCommand {
    stages: Vec<Vec<String>>,
    redirect: Option<String>,
    stdin: Option<Zeroizing<Vec<u8>>>,
}

impl RemoteCommand {
    pub fn new(program: &str) -> Self {
        Self {
            stages: vec![vec![program.to_string()]],
            redirect: None,
            stdin: None,
        }
    }

    /// `cat > path` fed from stdin
    pub fn write_file(path: &str, contents: impl Into<Vec<u8>>) -> Self {
        Self::new("cat").redirect_to(path).stdin(contents)
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(stage) = self.stages.last_mut() {
            stage.push(arg.into());
        }
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Start a new pipeline stage
    #[must_use]
    pub fn pipe(mut self, program: &str) -> Self {
        self.stages.push(vec![program.to_string()]);
        self
    }

    #[must_use]
    pub fn redirect_to(mut self, path: &str) -> Self {
        self.redirect = Some(path.to_string());
        self
    }

    #[must_use]
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(Zeroizing::new(data.into()));
        self
    }

    pub fn program(&self) -> &str {
        self.stages
            .first()
            .and_then(|stage| stage.first())
            .map_or("", String::as_str)
    }

    pub fn stdin_bytes(&self) -> Option<&[u8]> {
        self.stdin.as_ref().map(|data| data.as_slice())
    }

    /// Shell text sent as the SSH command
    pub fn render(&self) -> String {
        let mut line = self
            .stages
            .iter()
            .map(|stage| {
                stage
                    .iter()
                    .map(|word| shell_quote(word))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(" | ");
        if let Some(path) = &self.redirect {
            line.push_str(" > ");
            line.push_str(&shell_quote(path));
        }
        line
    }
}

/// Rendered command plus stdin size; stdin content is never shown
impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())?;
        if let Some(data) = &self.stdin {
            write!(f, " < ({} bytes)", data.len())?;
        }
        Ok(())
    }
}

impl fmt::Debug for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Exit status and output of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Something that can run commands on a camera
pub trait Remote {
    fn run(&self, command: &RemoteCommand) -> Result<RemoteOutput>;

    /// Whether commands are only being shown
    fn is_dry_run(&self) -> bool {
        false
    }

    /// Run and treat a non-zero exit as an error
    fn run_checked(&self, command: &RemoteCommand) -> Result<RemoteOutput> {
        let output = self.run(command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(RemoteError::Failed {
                command: command.to_string(),
                status: output
                    .code
                    .map_or_else(|| "signal".to_string(), |c| format!("exit {c}")),
                stderr: output.stderr.trim().to_string(),
            }
            .into())
        }
    }
}

/// OpenSSH client session to one camera
///
/// Connections are multiplexed through a control socket so the operator
/// types the camera's SSH password once per run.
pub struct SshSession {
    host: String,
    user: String,
    port: u16,
    connect_timeout_secs: u64,
}

impl SshSession {
    pub fn new(host: &str, config: &PitConfig) -> Self {
        Self {
            host: host.to_string(),
            user: config.ssh_user.clone(),
            port: config.ssh_port,
            connect_timeout_secs: config.connect_timeout_secs,
        }
    }

    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn ssh_args(&self, remote_command: String) -> Vec<String> {
        let control_path = std::env::temp_dir().join("pit-ssh-%r@%h:%p");
        vec![
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
            "-o".to_string(),
            "ControlPersist=60".to_string(),
            "-p".to_string(),
            self.port.to_string(),
            self.destination(),
            "--".to_string(),
            remote_command,
        ]
    }
}

impl Remote for SshSession {
    fn run(&self, command: &RemoteCommand) -> Result<RemoteOutput> {
        let args = self.ssh_args(command.render());
        log::debug!("Running remote command on {}: {command}", self.destination());

        let mut child = Command::new("ssh")
            .args(&args)
            .stdin(if command.stdin_bytes().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to execute ssh")?;

        if let Some(data) = command.stdin_bytes() {
            let mut stdin = child.stdin.take().context("Failed to open ssh stdin")?;
            stdin
                .write_all(data)
                .with_context(|| format!("Failed to stream input for: {command}"))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for: {command}"))?;

        log::debug!("Remote exit status: {}", output.status);
        if !output.stderr.is_empty() {
            log::debug!("stderr: {}", String::from_utf8_lossy(&output.stderr));
        }

        Ok(RemoteOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Prints what would run instead of running it
pub struct DryRun {
    pub destination: String,
}

impl Remote for DryRun {
    fn run(&self, command: &RemoteCommand) -> Result<RemoteOutput> {
        utils::info(&format!("Would run on {}: {command}", self.destination));
        Ok(RemoteOutput {
            code: Some(0),
            ..RemoteOutput::default()
        })
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
