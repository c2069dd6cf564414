use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use colored::Colorize;
use phenocam_lib::settings::{
    DEFAULT_END_HOUR, DEFAULT_INTERVAL_MINUTES, DEFAULT_START_HOUR, parse_flag,
};
use phenocam_lib::{CameraSettings, Network, UploadStatus, UtcOffset};
use zeroize::Zeroizing;

use config::PitConfig;
use ssh::{DryRun, Remote, SshSession};
use utils::print_title_bar;

mod agent;
mod config;
mod confirmation;
mod constants;
mod install;
mod progress;
mod purge;
mod reboot;
mod retrieve;
mod ssh;
mod utils;

/// Action flags; at most one may be given, none means install
const ACTIONS: [&str; 4] = ["upload", "validate", "retrieve", "purge"];

/// PhenoCam Installation Tool: configure a StarDot NetCam Live2 over SSH
///
/// Without an action flag, installs the camera at `-i` with the given settings.
#[derive(Parser, Debug)]
#[command(name = "pit")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("action").args(ACTIONS)))]
struct Cli {
    /// Camera IP address or hostname
    #[arg(short = 'i', value_name = "IP")]
    ip: String,

    /// Camera admin password
    #[arg(short = 'p', value_name = "PASSWORD", required_unless_present_any = ACTIONS)]
    password: Option<String>,

    /// Site name, used in image file names and upload paths
    #[arg(short = 'n', value_name = "NAME", required_unless_present_any = ACTIONS)]
    name: Option<String>,

    /// UTC offset of the site, e.g. +1, -5 or +5:30
    #[arg(
        short = 'o',
        value_name = "OFFSET",
        required_unless_present_any = ACTIONS,
        allow_hyphen_values = true
    )]
    offset: Option<String>,

    /// First hour of the capture window
    #[arg(short = 's', value_name = "HOUR", default_value_t = DEFAULT_START_HOUR)]
    start: u32,

    /// Last hour of the capture window
    #[arg(short = 'e', value_name = "HOUR", default_value_t = DEFAULT_END_HOUR)]
    end: u32,

    /// Minutes between captures (1-59)
    #[arg(short = 'm', value_name = "MINUTES", default_value_t = DEFAULT_INTERVAL_MINUTES)]
    interval: u32,

    /// Destination network
    #[arg(short = 'd', value_name = "NETWORK", default_value = "phenocam")]
    network: Network,

    /// Fixed schedule without jitter, for synchronized cameras
    #[arg(
        short = 'k',
        value_name = "TRUE",
        num_args = 0..=1,
        default_missing_value = "TRUE"
    )]
    fixed: Option<String>,

    /// Capture and upload one image pair now
    #[arg(short = 'u')]
    upload: bool,

    /// Test the camera's sFTP login against every server
    #[arg(short = 'v')]
    validate: bool,

    /// Retrieve the camera's sFTP public key
    #[arg(short = 'r')]
    retrieve: bool,

    /// Remove all PhenoCam configuration from the camera
    #[arg(short = 'x')]
    purge: bool,

    /// Show remote commands without running them
    #[arg(long)]
    dry_run: bool,

    /// Display detailed diagnostic information
    #[arg(long)]
    verbose: bool,

    /// Write a self-extracting installer to FILE instead of installing
    #[arg(long, value_name = "FILE")]
    bundle: Option<PathBuf>,

    /// Camera build of phenocam-agent (overrides the config file)
    #[arg(long, value_name = "PATH")]
    agent: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let code = match run(&cli) {
        Ok(status) => status.exit_code(),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            UploadStatus::Failed.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<UploadStatus> {
    let mut config = PitConfig::load();
    if let Some(agent) = &cli.agent {
        config.agent_binary = Some(agent.clone());
    }

    let session = SshSession::new(&cli.ip, &config);
    let dry_run = DryRun {
        destination: session.destination(),
    };
    let remote: &dyn Remote = if cli.dry_run { &dry_run } else { &session };

    if cli.upload {
        print_title_bar(&format!("📷 Upload from {}", cli.ip));
        agent::upload(remote)
    } else if cli.validate {
        print_title_bar(&format!("🔑 Validate sFTP access from {}", cli.ip));
        agent::validate(remote)
    } else if cli.retrieve {
        run_retrieve(cli, remote, &config)
    } else if cli.purge {
        run_purge(cli, remote)
    } else {
        run_install(cli, remote, &config)
    }
}

fn run_retrieve(cli: &Cli, remote: &dyn Remote, config: &PitConfig) -> Result<UploadStatus> {
    print_title_bar(&format!("🔑 Retrieve sFTP key from {}", cli.ip));
    if let Some(path) = retrieve::retrieve_key(remote, &cli.ip, &config.key_output_dir()?)? {
        utils::success(&format!("Public key saved to {}", path.display()));
        utils::info("Email this file to the PhenoCam network operator to have it allow-listed.");
    }
    Ok(UploadStatus::Complete)
}

fn run_purge(cli: &Cli, remote: &dyn Remote) -> Result<UploadStatus> {
    print_title_bar(&format!("🧹 Purge {}", cli.ip));
    let mutations = confirmation::Mutations {
        target: cli.ip.clone(),
        actions: phenocam_lib::paths::PURGE_TARGETS
            .iter()
            .map(ToString::to_string)
            .collect(),
    };
    // Declining is not a failure; nothing was touched
    purge::run_purge(remote, &cli.ip, || confirmation::confirm_mutations(&mutations))?;
    Ok(UploadStatus::Complete)
}

fn settings_from_cli(cli: &Cli) -> Result<CameraSettings> {
    let name = cli.name.as_deref().context("-n is required to install")?;
    let offset: UtcOffset = cli
        .offset
        .as_deref()
        .context("-o is required to install")?
        .parse()?;
    let fixed = cli.fixed.as_deref().is_some_and(parse_flag);
    Ok(CameraSettings::new(
        name,
        offset,
        cli.start,
        cli.end,
        cli.interval,
        cli.network,
        fixed,
    )?)
}

fn run_install(cli: &Cli, remote: &dyn Remote, config: &PitConfig) -> Result<UploadStatus> {
    let settings = settings_from_cli(cli)?;
    let bundle = install::build_bundle(&config.agent_binary()?)?;

    if let Some(path) = &cli.bundle {
        install::write_bundle(&bundle, path)?;
        utils::success(&format!("Installer written to {}", path.display()));
        utils::info(&format!("Payload sha256: {}", bundle.digest()?));
        return Ok(UploadStatus::Complete);
    }

    let password = Zeroizing::new(
        cli.password
            .clone()
            .context("-p is required to install")?,
    );

    print_title_bar(&format!("📷 Install {} on {}", settings.site_name, cli.ip));
    let request = install::InstallRequest {
        camera: cli.ip.clone(),
        password,
        settings,
    };
    install::run_install(remote, &request, &bundle)?;

    let method = reboot::trigger(remote, constants::REBOOT_DELAY, || {
        reboot::http_restart(&cli.ip, &request.password, config.connect_timeout_secs)
    })?;
    match method {
        reboot::RebootMethod::DryRun => {}
        reboot::RebootMethod::Http | reboot::RebootMethod::Ssh => {
            utils::success("Camera rebooting; settings apply on boot");
        }
    }
    Ok(UploadStatus::Complete)
}
