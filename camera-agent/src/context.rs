use anyhow::{Context, Result};
use phenocam_lib::paths::{PASSWORD_PATH, PRIVATE_KEY_PATH, SERVER_LIST_PATH, SETTINGS_PATH};
use phenocam_lib::servers::parse_server_list;
use phenocam_lib::{CameraSettings, Transport};
use zeroize::Zeroizing;

use crate::layout::Layout;
use crate::transport::{FtpTransport, SftpTransport};
use crate::utils::read_file;

/// Everything an agent command reads from the settings partition
pub struct AgentContext {
    pub layout: Layout,
    pub settings: CameraSettings,
    pub servers: Vec<String>,
    pub password: Zeroizing<String>,
}

impl AgentContext {
    pub fn load(layout: Layout) -> Result<Self> {
        let settings_path = layout.path(SETTINGS_PATH);
        let settings = CameraSettings::parse(&read_file(&settings_path)?)
            .with_context(|| format!("Invalid settings in {}", settings_path.display()))?;

        // A missing server list falls back to the network's defaults
        let servers = match read_file(&layout.path(SERVER_LIST_PATH)) {
            Ok(content) => parse_server_list(&content),
            Err(e) => {
                log::warn!("{e:#}; using {} defaults", settings.network);
                settings.network.servers()
            }
        };

        let password = Zeroizing::new(
            read_file(&layout.path(PASSWORD_PATH))
                .context("Camera password is not installed")?
                .trim()
                .to_string(),
        );

        Ok(Self {
            layout,
            settings,
            servers,
            password,
        })
    }

    /// sFTP transport, if this camera has a key
    pub fn sftp(&self) -> Option<SftpTransport> {
        let key = self.layout.path(PRIVATE_KEY_PATH);
        key.is_file().then(|| SftpTransport::new(key))
    }

    pub fn ftp(&self) -> impl Transport {
        FtpTransport
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::utils::write_file;
    use phenocam_lib::Network;

    /// Scratch camera filesystem with settings, servers and password installed
    pub fn install_fixture(root: &std::path::Path, network: Network) -> Layout {
        let layout = Layout::new(root);
        let settings = CameraSettings::new(
            "mycam",
            "+1".parse().unwrap(),
            9,
            22,
            30,
            network,
            false,
        )
        .unwrap();
        write_file(
            &layout.path(SETTINGS_PATH),
            settings.to_file_contents().as_bytes(),
        )
        .unwrap();
        write_file(
            &layout.path(SERVER_LIST_PATH),
            phenocam_lib::servers::render_server_list(&network.servers()).as_bytes(),
        )
        .unwrap();
        write_file(&layout.path(PASSWORD_PATH), b"secret\n").unwrap();
        layout
    }
}
