//! Self-extracting installer payload
//!
//! The camera programs travel as a tar archive, base64-encoded and appended
//! to a small `sh` script after a literal `__BINARY__` line. The script finds
//! its own payload with awk and pipes everything after the marker through
//! `base64 -d | tar -x`. The operator CLI streams the same lines over SSH.
//!
//! Lines above the marker may change freely; the body must survive byte for
//! byte. A `# payload-sha256:` header line lets readers detect corruption
//! instead of extracting garbage.

use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::error::PayloadError;

/// Line separating the script header from the encoded archive
pub const MARKER: &str = "__BINARY__";

/// Header line prefix carrying the archive digest
pub const DIGEST_PREFIX: &str = "# payload-sha256: ";

/// Column width of the encoded body, matching coreutils `base64`
const LINE_WIDTH: usize = 76;

/// One file inside a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub path: String,
    pub mode: u32,
    pub data: Vec<u8>,
}

/// Ordered set of files shipped to the camera
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    entries: Vec<BundleEntry>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file; paths must be relative and stay inside the extraction dir
    pub fn add(&mut self, path: &str, mode: u32, data: Vec<u8>) -> Result<(), PayloadError> {
        validate_entry_path(path)?;
        self.entries.retain(|entry| entry.path != path);
        self.entries.push(BundleEntry {
            path: path.to_string(),
            mode,
            data,
        });
        Ok(())
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to a ustar archive with zeroed mtimes, so equal bundles hash equal
    pub fn to_tar(&self) -> Result<Vec<u8>, PayloadError> {
        let mut builder = tar::Builder::new(Vec::new());
        for entry in &self.entries {
            let mut header = tar::Header::new_ustar();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(entry.data.len() as u64);
            header.set_mode(entry.mode);
            header.set_mtime(0);
            builder
                .append_data(&mut header, &entry.path, entry.data.as_slice())
                .map_err(PayloadError::InvalidArchive)?;
        }
        builder.into_inner().map_err(PayloadError::InvalidArchive)
    }

    /// Parse a tar archive, keeping regular files only
    pub fn from_tar(bytes: &[u8]) -> Result<Self, PayloadError> {
        let mut bundle = Self::new();
        let mut archive = tar::Archive::new(bytes);
        for entry in archive.entries().map_err(PayloadError::InvalidArchive)? {
            let mut entry = entry.map_err(PayloadError::InvalidArchive)?;
            if entry.header().entry_type() != tar::EntryType::Regular {
                continue;
            }
            let path = entry
                .path()
                .map_err(PayloadError::InvalidArchive)?
                .to_string_lossy()
                .into_owned();
            let mode = entry.header().mode().map_err(PayloadError::InvalidArchive)?;
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(PayloadError::InvalidArchive)?;
            bundle.add(&path, mode, data)?;
        }
        if bundle.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(bundle)
    }

    /// Hex SHA-256 of the serialized archive
    pub fn digest(&self) -> Result<String, PayloadError> {
        Ok(sha256_hex(&self.to_tar()?))
    }
}

fn validate_entry_path(path: &str) -> Result<(), PayloadError> {
    let unsafe_path = path.is_empty()
        || path.starts_with('/')
        || path
            .split('/')
            .any(|component| component.is_empty() || component == "..");
    if unsafe_path {
        return Err(PayloadError::UnsafePath(path.to_string()));
    }
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Base64-encode an archive, wrapped at 76 columns with a trailing newline
pub fn encode_body(archive: &[u8]) -> String {
    let encoded = STANDARD.encode(archive);
    let mut body = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 1);
    for (idx, c) in encoded.chars().enumerate() {
        if idx > 0 && idx % LINE_WIDTH == 0 {
            body.push('\n');
        }
        body.push(c);
    }
    body.push('\n');
    body
}

/// Decode a (possibly line-wrapped) base64 body
pub fn decode_body(body: &str) -> Result<Vec<u8>, PayloadError> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(STANDARD.decode(compact)?)
}

/// Render a self-extracting installer that unpacks into `$1` (or `target_dir`)
pub fn render_installer(bundle: &Bundle, target_dir: &str) -> Result<String, PayloadError> {
    let archive = bundle.to_tar()?;
    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str("# PhenoCam installer payload\n");
    script.push_str(&format!("{DIGEST_PREFIX}{}\n", sha256_hex(&archive)));
    script.push_str("set -e\n");
    script.push_str(&format!("dest=\"${{1:-{target_dir}}}\"\n"));
    script.push_str("mkdir -p \"$dest\"\n");
    script.push_str(&format!(
        "line=$(awk '/^{MARKER}/ {{print NR+1; exit 0;}}' \"$0\")\n"
    ));
    script.push_str("tail -n +\"$line\" \"$0\" | base64 -d | tar -x -C \"$dest\"\n");
    script.push_str("exit 0\n");
    script.push_str(MARKER);
    script.push('\n');
    script.push_str(&encode_body(&archive));
    Ok(script)
}

/// Everything after the first line that starts with the marker
pub fn find_payload(text: &str) -> Result<&str, PayloadError> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        if line.starts_with(MARKER) {
            return Ok(&text[offset..]);
        }
    }
    Err(PayloadError::MissingMarker)
}

/// Digest declared in the script header, if any
pub fn declared_digest(text: &str) -> Option<&str> {
    text.lines()
        .take_while(|line| !line.starts_with(MARKER))
        .find_map(|line| line.strip_prefix(DIGEST_PREFIX))
        .map(str::trim)
}

/// Locate, decode and verify the payload of a self-extracting installer
pub fn decode_installer(text: &str) -> Result<Bundle, PayloadError> {
    let archive = decode_body(find_payload(text)?)?;
    if let Some(expected) = declared_digest(text) {
        let actual = sha256_hex(&archive);
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(PayloadError::DigestMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
    }
    Bundle::from_tar(&archive)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> Bundle {
        let mut bundle = Bundle::new();
        bundle
            .add("phenocam-agent", 0o755, b"\x7fELF fake agent".to_vec())
            .unwrap();
        bundle
            .add("README.txt", 0o644, b"installed by pit\n".to_vec())
            .unwrap();
        bundle
    }

    #[test]
    fn test_installer_preserves_payload_bytes() {
        let bundle = sample_bundle();
        let script = render_installer(&bundle, "/var/tmp/pit-payload").unwrap();
        let decoded = decode_installer(&script).unwrap();
        assert_eq!(decoded, bundle);
        assert_eq!(decoded.get("phenocam-agent").unwrap().mode, 0o755);
    }

    #[test]
    fn test_edits_above_marker_are_harmless() {
        let script = render_installer(&sample_bundle(), "/tmp/x").unwrap();
        let edited = format!("#!/bin/sh\n# extra comment\n# another\n{}", &script[10..]);
        assert_eq!(decode_installer(&edited).unwrap(), sample_bundle());
    }

    #[test]
    fn test_marker_must_start_a_line() {
        let script = render_installer(&sample_bundle(), "/tmp/x").unwrap();
        let body = find_payload(&script).unwrap();
        // The awk pattern in the header mentions the marker but must not match
        assert!(!body.contains("awk"));
        assert!(body.lines().all(|l| l.len() <= LINE_WIDTH));
    }

    #[test]
    fn test_missing_marker() {
        assert!(matches!(
            find_payload("#!/bin/sh\necho hi\n"),
            Err(PayloadError::MissingMarker)
        ));
    }

    #[test]
    fn test_corrupted_body_is_detected() {
        let script = render_installer(&sample_bundle(), "/tmp/x").unwrap();
        let (head, body) = script.split_at(script.len() - find_payload(&script).unwrap().len());
        let corrupted = format!("{head}{}", body.replacen('A', "B", 1));
        let err = decode_installer(&corrupted).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::DigestMismatch { .. }
                | PayloadError::InvalidBase64(_)
                | PayloadError::InvalidArchive(_)
        ));
    }

    #[test]
    fn test_invalid_base64() {
        let script = format!("{MARKER}\n!!!not base64!!!\n");
        assert!(matches!(
            decode_installer(&script),
            Err(PayloadError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_empty_body() {
        let script = format!("{MARKER}\n\n");
        assert!(matches!(decode_installer(&script), Err(PayloadError::Empty)));
    }

    #[test]
    fn test_unsafe_paths_rejected() {
        let mut bundle = Bundle::new();
        for path in ["", "/etc/passwd", "../x", "a//b", "a/../../b"] {
            assert!(matches!(
                bundle.add(path, 0o644, Vec::new()),
                Err(PayloadError::UnsafePath(_))
            ));
        }
        assert!(bundle.add("scripts/agent", 0o755, Vec::new()).is_ok());
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(
            sample_bundle().digest().unwrap(),
            sample_bundle().digest().unwrap()
        );
        assert_eq!(sample_bundle().digest().unwrap().len(), 64);
    }

    #[test]
    fn test_re_adding_replaces_entry() {
        let mut bundle = sample_bundle();
        bundle.add("README.txt", 0o600, b"new".to_vec()).unwrap();
        assert_eq!(bundle.entries().len(), 2);
        assert_eq!(bundle.get("README.txt").unwrap().data, b"new");
    }
}
