use phenocam_lib::upload::{ProbeReport, probe_servers};
use phenocam_lib::{TransferError, Transport};

use crate::context::AgentContext;

/// Probe every configured server's sFTP login; no files are transferred
pub fn run(ctx: &AgentContext, sftp: Option<&dyn Transport>) -> Result<ProbeReport, TransferError> {
    let sftp = sftp.ok_or(TransferError::NoKey)?;
    Ok(probe_servers(&ctx.servers, sftp))
}

/// One `PASS`/`FAIL` line per server
pub fn render(report: &ProbeReport) -> String {
    report
        .results
        .iter()
        .map(|(server, result)| match result {
            Ok(()) => format!("PASS {server}\n"),
            Err(e) => format!("FAIL {server}: {e}\n"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::install_fixture;
    use phenocam_lib::{Network, UploadStatus};

    #[test]
    fn test_render() {
        let report = ProbeReport {
            results: vec![
                ("phenocam.nau.edu".to_string(), Ok(())),
                ("icos01.uantwerpen.be".to_string(), Err("timeout".to_string())),
            ],
        };
        assert_eq!(
            render(&report),
            "PASS phenocam.nau.edu\nFAIL icos01.uantwerpen.be: timeout\n"
        );
        assert_eq!(report.status(), UploadStatus::Partial);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AgentContext::load(install_fixture(dir.path(), Network::Phenocam)).unwrap();
        assert!(matches!(run(&ctx, None), Err(TransferError::NoKey)));
    }
}
