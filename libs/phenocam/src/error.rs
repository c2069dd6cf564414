use thiserror::Error;

use crate::settings::SETTINGS_VERSION;

/// Errors raised while reading, validating or writing camera settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file is missing line {line} ({field})")]
    MissingField { line: usize, field: &'static str },
    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
    #[error("Unsupported settings version {0} (this build understands up to {SETTINGS_VERSION})")]
    UnsupportedVersion(u32),
    #[error("Invalid site name '{0}': use letters, digits, '-' or '_'")]
    InvalidSiteName(String),
    #[error("Invalid UTC offset '{0}': expected e.g. +1, -5 or +5:30 within -12..+14")]
    InvalidOffset(String),
    #[error("Unknown network '{0}': expected phenocam or icos")]
    UnknownNetwork(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Errors raised by the cron schedule generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Interval must be between 1 and 59 minutes, got {0}")]
    InvalidInterval(u32),
    #[error("Hour must be between 0 and 23, got {0}")]
    InvalidHour(u32),
    #[error("Start hour {start} is after end hour {end}")]
    InvertedWindow { start: u8, end: u8 },
}

/// Errors raised while packing or unpacking the installer payload
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("No __BINARY__ marker line found; the installer is truncated or not self-extracting")]
    MissingMarker,
    #[error("Payload is empty")]
    Empty,
    #[error("Payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Payload is not a valid tar archive: {0}")]
    InvalidArchive(#[source] std::io::Error),
    #[error("Payload digest mismatch: header says {expected}, body hashes to {actual}")]
    DigestMismatch { expected: String, actual: String },
    #[error("Refusing bundle entry with unsafe path '{0}'")]
    UnsafePath(String),
}

/// Errors raised while handling the camera's sFTP keypair
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("No ecdsa-sha2 or ssh-rsa public key found in dropbearkey output")]
    NoPublicKey,
}

/// Errors raised by an upload transport
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("{server} is not reachable: {detail}")]
    Unreachable { server: String, detail: String },
    #[error("{server} rejected {file}: {detail}")]
    Rejected {
        server: String,
        file: String,
        detail: String,
    },
    #[error("No sFTP key present")]
    NoKey,
}
