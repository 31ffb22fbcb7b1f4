//! Chromium key provider.
//!
//! Yields the AES key wrapping a profile's secrets: the DPAPI-unwrapped
//! 256-bit key from `Local State` on Windows, a PBKDF2-derived 128-bit key
//! from the OS passphrase store on macOS and Linux, and `None` elsewhere —
//! the caller then falls back to `unprotect` per ciphertext.

use std::path::Path;
use tracing::debug;
use zeroize::ZeroizeOnDrop;

use super::ChromiumConfig;
use crate::crypto::{decrypt_chromium_blob, is_key_wrapped};
use crate::error::HarvestResult;
use crate::unprotect::unprotect;

#[cfg(windows)]
#[derive(Debug, serde::Deserialize)]
struct LocalState {
    os_crypt: OsCrypt,
}

#[cfg(windows)]
#[derive(Debug, serde::Deserialize)]
struct OsCrypt {
    encrypted_key: Option<String>,
}

/// AES key wrapping Chromium secrets; opaque to the pipeline.
#[derive(ZeroizeOnDrop)]
pub struct ChromiumKey {
    bytes: Vec<u8>,
}

impl ChromiumKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(windows)]
pub fn provide_key(
    _config: &ChromiumConfig,
    user_data_dir: &Path,
) -> HarvestResult<Option<ChromiumKey>> {
    use crate::error::HarvestError;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    const DPAPI_PREFIX: &[u8] = b"DPAPI";

    let local_state_path = user_data_dir.join("Local State");
    let content = std::fs::read_to_string(&local_state_path).map_err(|e| {
        HarvestError::Io(format!("cannot read {}: {e}", local_state_path.display()))
    })?;
    let local_state: LocalState = serde_json::from_str(&content)?;

    let Some(encrypted_key) = local_state.os_crypt.encrypted_key else {
        debug!("no os_crypt.encrypted_key, falling back to per-value DPAPI");
        return Ok(None);
    };

    let wrapped = BASE64
        .decode(encrypted_key.as_bytes())
        .map_err(|_| HarvestError::Base64)?;
    let wrapped = wrapped
        .strip_prefix(DPAPI_PREFIX)
        .unwrap_or(&wrapped)
        .to_vec();

    let bytes = unprotect(&wrapped)?;
    Ok(Some(ChromiumKey { bytes }))
}

#[cfg(target_os = "macos")]
pub fn provide_key(
    config: &ChromiumConfig,
    _user_data_dir: &Path,
) -> HarvestResult<Option<ChromiumKey>> {
    let passphrase = safe_storage_passphrase(config);
    Ok(Some(derive_passphrase_key(passphrase.as_bytes(), 1003)))
}

#[cfg(target_os = "linux")]
pub fn provide_key(
    config: &ChromiumConfig,
    _user_data_dir: &Path,
) -> HarvestResult<Option<ChromiumKey>> {
    let passphrase = safe_storage_passphrase(config);
    Ok(Some(derive_passphrase_key(passphrase.as_bytes(), 1)))
}

#[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
pub fn provide_key(
    _config: &ChromiumConfig,
    _user_data_dir: &Path,
) -> HarvestResult<Option<ChromiumKey>> {
    Ok(None)
}

/// PBKDF2-HMAC-SHA1 over the passphrase with Chromium's fixed salt.
#[cfg(any(target_os = "macos", target_os = "linux", test))]
fn derive_passphrase_key(passphrase: &[u8], iterations: u32) -> ChromiumKey {
    use pbkdf2::pbkdf2_hmac;
    use sha1::Sha1;

    const SALT: &[u8] = b"saltysalt";

    let mut bytes = vec![0u8; 16];
    pbkdf2_hmac::<Sha1>(passphrase, SALT, iterations, &mut bytes);
    ChromiumKey { bytes }
}

#[cfg(target_os = "macos")]
fn safe_storage_passphrase(config: &ChromiumConfig) -> String {
    use std::process::Command;

    let output = Command::new("security")
        .args(["find-generic-password", "-w", "-s", config.safe_storage_service])
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let secret = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if !secret.is_empty() {
                return secret;
            }
            debug!("keychain returned an empty passphrase");
        }
        Ok(out) => {
            debug!(
                "keychain lookup failed: {}",
                String::from_utf8_lossy(&out.stderr)
            );
        }
        Err(e) => debug!("failed to run security: {e}"),
    }

    "peanuts".to_string()
}

#[cfg(target_os = "linux")]
fn safe_storage_passphrase(config: &ChromiumConfig) -> String {
    use std::process::Command;

    // Chromium may have stored the secret under either schema generation.
    const SCHEMAS: [&str; 2] = [
        "chrome_libsecret_os_crypt_password_v2",
        "chrome_libsecret_os_crypt_password_v1",
    ];

    for schema in SCHEMAS {
        let output = Command::new("secret-tool")
            .args([
                "lookup",
                "xdg:schema",
                schema,
                "application",
                config.secret_tool_app,
            ])
            .output();

        match output {
            Ok(out) if out.status.success() => {
                let secret = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if !secret.is_empty() {
                    debug!("retrieved passphrase via schema {schema}");
                    return secret;
                }
            }
            Ok(out) => {
                debug!(
                    "secret-tool failed for schema {schema}: {}",
                    String::from_utf8_lossy(&out.stderr)
                );
            }
            Err(e) => debug!("failed to run secret-tool: {e}"),
        }
    }

    debug!("no keyring passphrase found, using the basic-mode default");
    "peanuts".to_string()
}

/// Decrypt one ciphertext column value. Wrapped blobs go through AES-GCM
/// under the provided key; everything else is handed to the OS adapter.
/// Failures downgrade to an empty value so the record still flows.
pub fn decrypt_value(key: Option<&ChromiumKey>, blob: &[u8]) -> String {
    if blob.is_empty() {
        return String::new();
    }

    let result = match key {
        Some(key) if is_key_wrapped(blob) => decrypt_chromium_blob(key.as_bytes(), blob),
        _ => unprotect(blob),
    };

    match result {
        Ok(plain) => match String::from_utf8(plain) {
            Ok(text) => text,
            Err(_) => {
                debug!("undecryptable: plaintext is not valid UTF-8");
                String::new()
            }
        },
        Err(e) => {
            debug!("undecryptable: {e}");
            String::new()
        }
    }
}
