// sFTP keypair handling
//
// The keypair is generated on the camera by dropbear's `dropbearkey` and the
// private half never leaves it. `dropbearkey -y` prints the public key among
// other noise (`Public key portion is:`, fingerprint lines), so callers pick
// out the actual key line here.

use crate::error::KeyError;

/// Key type passed to `dropbearkey -t`
pub const KEY_TYPE: &str = "ecdsa";

/// Key size passed to `dropbearkey -s`
pub const KEY_BITS: &str = "521";

/// Prefixes of public key lines we accept; RSA keys come from older installs
const KEY_PREFIXES: [&str; 2] = ["ecdsa-sha2-", "ssh-rsa "];

/// Extract the OpenSSH-format public key line from `dropbearkey -y` output
pub fn extract_public_key(output: &str) -> Result<String, KeyError> {
    output
        .lines()
        .map(str::trim)
        .find(|line| KEY_PREFIXES.iter().any(|prefix| line.starts_with(prefix)))
        .map(ToString::to_string)
        .ok_or(KeyError::NoPublicKey)
}

/// Local file name used when exporting a camera's public key
pub fn public_key_file_name(camera: &str) -> String {
    let safe: String = camera
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("phenocam_key_{safe}.pub")
}
