//! Upload destinations
//!
//! The destination network tag picks the servers a camera reports to. The
//! resulting list is persisted one hostname per line and consumed in order.

use std::fmt;
use std::str::FromStr;

use crate::error::SettingsError;

/// Primary PhenoCam archive
pub const PHENOCAM_SERVER: &str = "phenocam.nau.edu";

/// ICOS ecosystem network archive
pub const ICOS_SERVER: &str = "icos01.uantwerpen.be";

/// Monitoring network a camera belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Phenocam,
    Icos,
}

impl Network {
    /// Servers this network uploads to, in upload order
    pub fn servers(self) -> Vec<String> {
        match self {
            Self::Phenocam => vec![PHENOCAM_SERVER.to_string()],
            Self::Icos => vec![PHENOCAM_SERVER.to_string(), ICOS_SERVER.to_string()],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phenocam => "phenocam",
            Self::Icos => "icos",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phenocam" => Ok(Self::Phenocam),
            "icos" => Ok(Self::Icos),
            other => Err(SettingsError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Render a server list file
pub fn render_server_list(servers: &[String]) -> String {
    let mut out = servers.join("\n");
    out.push('\n');
    out
}

/// Parse a server list file, skipping blank lines and `#` comments
pub fn parse_server_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_servers() {
        assert_eq!(Network::Phenocam.servers(), vec![PHENOCAM_SERVER]);
        assert_eq!(Network::Icos.servers(), vec![PHENOCAM_SERVER, ICOS_SERVER]);
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("phenocam".parse::<Network>().unwrap(), Network::Phenocam);
        assert_eq!("ICOS".parse::<Network>().unwrap(), Network::Icos);
        assert!(matches!(
            "neon".parse::<Network>(),
            Err(SettingsError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn test_server_list_preserves_order() {
        let servers = Network::Icos.servers();
        let parsed = parse_server_list(&render_server_list(&servers));
        assert_eq!(parsed, servers);
    }

    #[test]
    fn test_parse_server_list_skips_noise() {
        let parsed = parse_server_list("\n# primary\nphenocam.nau.edu\n\n  backup.example.org \n");
        assert_eq!(parsed, vec!["phenocam.nau.edu", "backup.example.org"]);
    }
}
