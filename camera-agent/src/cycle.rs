// Capture and upload cycle
//
// One cycle walks CaptureMode::CYCLE (VIS, then NIR). Each mode toggles the
// IR filter, waits for exposure to settle, grabs a frame, writes the image
// and its .meta sidecar to scratch space, uploads the pair to every server
// and optionally mirrors it to the SD card. The camera is always left in
// VIS with the live overlay restored, even when a capture fails.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use phenocam_lib::metadata::{CameraIdentity, CaptureMetadata, CaptureMode, meta_file_name};
use phenocam_lib::paths::{METADATA_PATH, SD_BACKUP_DIR, SD_MOUNT_POINT, TMP_DIR, remote_data_path};
use phenocam_lib::upload::{UploadFile, upload_to_servers};
use phenocam_lib::{Transport, UploadReport, UploadStatus};

use crate::camera::{Camera, overlay_text};
use crate::context::AgentContext;
use crate::utils::{is_mounted, remove_file_if_exists, write_file};

/// Time for auto exposure to adapt after the IR filter moves
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

const PROC_MOUNTS: &str = "/proc/mounts";

/// Files written for one capture
#[derive(Debug, Clone, PartialEq, Eq)]
struct Capture {
    image: PathBuf,
    meta: PathBuf,
}

impl Capture {
    fn files(&self, site: &str) -> Vec<UploadFile> {
        [&self.image, &self.meta]
            .into_iter()
            .map(|local| {
                let name = local
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                UploadFile::new(local, remote_data_path(site, &name))
            })
            .collect()
    }
}

/// Result of one capture cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Modes whose capture failed, with the reason
    pub capture_errors: Vec<(CaptureMode, String)>,
    pub upload: UploadReport,
    pub backed_up: usize,
}

impl CycleReport {
    pub fn status(&self) -> UploadStatus {
        let upload = self.upload.status();
        if self.capture_errors.is_empty() || upload == UploadStatus::Failed {
            upload
        } else {
            UploadStatus::Partial
        }
    }
}

pub struct Cycle<'a> {
    pub ctx: &'a AgentContext,
    pub camera: &'a dyn Camera,
    pub identity: CameraIdentity,
    pub sftp: Option<&'a dyn Transport>,
    pub ftp: &'a dyn Transport,
    pub settle: Duration,
}

impl Cycle<'_> {
    pub fn run(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let site = self.ctx.settings.site_name.as_str();
        let backup_dir = self.backup_dir();

        for mode in CaptureMode::CYCLE {
            let capture = match self.capture(mode) {
                Ok(capture) => capture,
                Err(e) => {
                    log::error!("{} capture failed: {e:#}", mode.label());
                    report.capture_errors.push((mode, format!("{e:#}")));
                    continue;
                }
            };

            report.upload.merge(upload_to_servers(
                &self.ctx.servers,
                &capture.files(site),
                self.sftp,
                self.ftp,
            ));

            if let Some(dir) = &backup_dir {
                match backup(&capture, dir) {
                    Ok(()) => report.backed_up += 1,
                    Err(e) => log::warn!("SD backup failed: {e:#}"),
                }
            }

            for path in [&capture.image, &capture.meta] {
                if let Err(e) = remove_file_if_exists(path) {
                    log::warn!("{e:#}");
                }
            }
        }

        self.restore();
        report
    }

    fn capture(&self, mode: CaptureMode) -> Result<Capture> {
        let settings = &self.ctx.settings;
        self.camera
            .set_overlay(&overlay_text(settings, Some(mode)))
            .context("Failed to set overlay")?;
        self.camera
            .set_ir(mode.ir_enabled())
            .with_context(|| format!("Failed to switch to {}", mode.label()))?;
        thread::sleep(self.settle);

        let frame = self.camera.snapshot()?;
        let taken_at = Local::now().naive_local();
        let exposure = self.camera.exposure();
        log::info!(
            "Captured {} frame ({} bytes, exposure {exposure:?})",
            mode.label(),
            frame.len()
        );

        let metadata = CaptureMetadata::new(
            settings,
            self.identity.clone(),
            mode,
            exposure,
            taken_at,
        )
        .render();

        let layout = &self.ctx.layout;
        let image_name = mode.image_file_name(&settings.site_name, &taken_at);
        let scratch = layout.path(TMP_DIR);
        let image = scratch.join(&image_name);
        let meta = scratch.join(meta_file_name(&image_name));

        write_file(&layout.path(METADATA_PATH), metadata.as_bytes())?;
        write_file(&image, &frame)?;
        write_file(&meta, metadata.as_bytes())?;

        Ok(Capture { image, meta })
    }

    /// Back to VIS with the live overlay; failures only warn
    fn restore(&self) {
        if let Err(e) = self.camera.set_ir(false) {
            log::warn!("Failed to reset IR: {e:#}");
        }
        if let Err(e) = self
            .camera
            .set_overlay(&overlay_text(&self.ctx.settings, None))
        {
            log::warn!("Failed to restore overlay: {e:#}");
        }
    }

    /// Per-site SD backup directory, if a card is mounted
    fn backup_dir(&self) -> Option<PathBuf> {
        let layout = &self.ctx.layout;
        let mounts = std::fs::read_to_string(layout.path(PROC_MOUNTS)).ok()?;
        is_mounted(&mounts, SD_MOUNT_POINT)
            .then(|| layout.path(SD_BACKUP_DIR).join(&self.ctx.settings.site_name))
    }
}

fn backup(capture: &Capture, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    for source in [&capture.image, &capture.meta] {
        if let Some(name) = source.file_name() {
            std::fs::copy(source, dir.join(name))
                .with_context(|| format!("Failed to copy {} to SD", source.display()))?;
        }
    }
    Ok(())
}
