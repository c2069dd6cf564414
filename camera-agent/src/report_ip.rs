use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use phenocam_lib::paths::{TMP_DIR, remote_data_path};
use phenocam_lib::upload::{UploadFile, upload_to_servers};
use phenocam_lib::{Transport, UploadReport};

use crate::context::AgentContext;
use crate::network::InterfaceInfo;
use crate::utils::{remove_file_if_exists, write_file};

/// `<site>_ip.txt`
pub fn ip_file_name(site: &str) -> String {
    format!("{site}_ip.txt")
}

pub fn render(info: &InterfaceInfo, at: &NaiveDateTime) -> String {
    format!(
        "{}\n{}\n{}\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        info.ip_address.as_deref().unwrap_or("unknown"),
        info.mac_address.as_deref().unwrap_or("unknown"),
    )
}

/// Upload the camera's current address so the network can find it
pub fn run(
    ctx: &AgentContext,
    info: &InterfaceInfo,
    sftp: Option<&dyn Transport>,
    ftp: &dyn Transport,
) -> Result<UploadReport> {
    let name = ip_file_name(&ctx.settings.site_name);
    let local = ctx.layout.path(TMP_DIR).join(&name);
    write_file(&local, render(info, &Local::now().naive_local()).as_bytes())?;

    let files = [UploadFile::new(
        &local,
        remote_data_path(&ctx.settings.site_name, &name),
    )];
    let report = upload_to_servers(&ctx.servers, &files, sftp, ftp);
    remove_file_if_exists(&local)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::install_fixture;
    use crate::transport::FtpTransport;
    use chrono::NaiveDate;
    use phenocam_lib::{Network, UploadStatus};

    #[test]
    fn test_render() {
        let at = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(11, 59, 0)
            .unwrap();
        let info = InterfaceInfo {
            mac_address: Some("00:30:F4:D2:11:22".to_string()),
            ip_address: Some("10.0.0.5".to_string()),
        };
        assert_eq!(
            render(&info, &at),
            "2024-06-01 11:59:00\n10.0.0.5\n00:30:F4:D2:11:22\n"
        );
        assert!(render(&InterfaceInfo::default(), &at).contains("unknown"));
    }

    #[test]
    fn test_ip_file_name() {
        assert_eq!(ip_file_name("mycam"), "mycam_ip.txt");
    }

    #[test]
    fn test_run_without_servers_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let layout = install_fixture(dir.path(), Network::Phenocam);
        let mut ctx = AgentContext::load(layout).unwrap();
        ctx.servers.clear();

        let report = run(&ctx, &InterfaceInfo::default(), None, &FtpTransport).unwrap();

        assert_eq!(report.status(), UploadStatus::Failed);
        assert!(!ctx.layout.path(TMP_DIR).join("mycam_ip.txt").exists());
    }
}
