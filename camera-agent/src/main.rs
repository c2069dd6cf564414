use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use phenocam_lib::{Transport, UploadReport, UploadStatus};

use camera::StarDotCamera;
use context::AgentContext;
use layout::Layout;

mod camera;
mod context;
mod cycle;
mod install;
mod layout;
mod network;
mod report_ip;
mod transport;
mod utils;
mod validate;

/// On-camera agent for PhenoCam StarDot NetCam Live2 cameras
#[derive(Parser, Debug)]
#[command(name = "phenocam-agent")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Display detailed diagnostic information
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Filesystem root the camera paths resolve under
    #[arg(long, global = true, default_value = "/", hide = true)]
    root: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending settings and install the cron schedule (run at boot)
    Install,
    /// Capture VIS and NIR images and upload them
    Upload {
        /// Seconds to let exposure settle after switching the IR filter
        #[arg(long, default_value_t = cycle::SETTLE_DELAY.as_secs())]
        settle_secs: u64,
    },
    /// Upload the camera's IP address
    ReportIp,
    /// Test the sFTP login against every configured server
    Validate,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let code = match run(cli) {
        Ok(status) => status.exit_code(),
        Err(e) => {
            log::error!("{e:#}");
            UploadStatus::Failed.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<UploadStatus> {
    let layout = Layout::new(cli.root);
    let ctx = AgentContext::load(layout)?;

    match cli.command {
        Commands::Install => {
            let camera = StarDotCamera::local(&ctx.password);
            let outcome = install::run(&ctx.layout, &camera)?;
            if outcome.failed_params.is_empty() {
                Ok(UploadStatus::Complete)
            } else {
                log::warn!(
                    "Camera rejected: {}",
                    outcome.failed_params.join(", ")
                );
                Ok(UploadStatus::Partial)
            }
        }
        Commands::Upload { settle_secs } => {
            let sftp = ctx.sftp();
            let ftp = ctx.ftp();
            let camera = StarDotCamera::local(&ctx.password);
            let identity = network::camera_identity(&camera, &network::interface_info());
            let report = cycle::Cycle {
                ctx: &ctx,
                camera: &camera,
                identity,
                sftp: sftp.as_ref().map(|t| t as &dyn Transport),
                ftp: &ftp,
                settle: Duration::from_secs(settle_secs),
            }
            .run();
            log_warnings(&report.upload);
            Ok(report.status())
        }
        Commands::ReportIp => {
            let sftp = ctx.sftp();
            let ftp = ctx.ftp();
            let report = report_ip::run(
                &ctx,
                &network::interface_info(),
                sftp.as_ref().map(|t| t as &dyn Transport),
                &ftp,
            )?;
            log_warnings(&report);
            Ok(report.status())
        }
        Commands::Validate => {
            let sftp = ctx.sftp();
            let report = validate::run(&ctx, sftp.as_ref().map(|t| t as &dyn Transport))?;
            print!("{}", validate::render(&report));
            Ok(report.status())
        }
    }
}

fn log_warnings(report: &UploadReport) {
    for line in report.warnings() {
        log::warn!("{line}");
    }
}
