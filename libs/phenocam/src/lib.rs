//! Shared core of the PhenoCam installation tool
//!
//! Both the operator CLI (`pit`) and the on-camera agent (`phenocam-agent`)
//! build on this crate. It has no I/O beyond what callers hand it: remote
//! execution, HTTP and file transfer live in the binaries, behind the
//! [`upload::Transport`] seam.
//!
//! - [`paths`]: filesystem layout of the camera's settings partition
//! - [`settings`]: the named, versioned settings record behind `settings.txt`
//! - [`schedule`]: jittered cron schedule generation
//! - [`payload`]: the `__BINARY__` self-extracting tar+base64 bundle
//! - [`metadata`]: capture naming and `.meta` sidecars
//! - [`servers`]: destination networks and server lists
//! - [`keys`]: dropbear public key extraction
//! - [`upload`]: sFTP → FTP fallback driver and run reports

pub mod error;
pub mod keys;
pub mod metadata;
pub mod paths;
pub mod payload;
pub mod schedule;
pub mod servers;
pub mod settings;
pub mod upload;

pub use error::{KeyError, PayloadError, ScheduleError, SettingsError, TransferError};
pub use schedule::{Schedule, ScheduleWindow};
pub use servers::Network;
pub use settings::{CameraSettings, UtcOffset};
pub use upload::{Transport, TransportKind, UploadReport, UploadStatus};
