//! Machine-bound password encryption
//!
//! Remembered passwords are stored encrypted with AES-256-GCM. The key is
//! derived from the machine's hardware UUID, which makes a vault file
//! non-portable: copied to another host, the password cannot be decrypted.
//!
//! Stored format is `encrypted:BASE64(nonce ++ ciphertext)` with a 12-byte
//! random nonce.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Result};
use base64::Engine;
use sha2::{Digest, Sha256};

/// Prefix marking an encrypted value.
const ENCRYPTED_PREFIX: &str = "encrypted:";

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Reads the machine's hardware UUID.
///
/// On Linux, `/etc/machine-id` (with `/var/lib/dbus/machine-id` as
/// fallback). On macOS, `ioreg -d2 -c IOPlatformExpertDevice`. On Windows,
/// `wmic csproduct get UUID`.
fn machine_uuid() -> Result<String> {
    #[cfg(target_os = "linux")]
    {
        use std::fs;

        if let Ok(uuid) = fs::read_to_string("/etc/machine-id") {
            return Ok(uuid.trim().to_string());
        }

        if let Ok(uuid) = fs::read_to_string("/var/lib/dbus/machine-id") {
            return Ok(uuid.trim().to_string());
        }

        Err(anyhow!("Failed to read machine-id"))
    }

    #[cfg(target_os = "macos")]
    {
        use std::process::Command;

        let output = Command::new("ioreg")
            .args(["-d2", "-c", "IOPlatformExpertDevice"])
            .output()?;

        let output_str = String::from_utf8_lossy(&output.stdout);

        for line in output_str.lines() {
            if line.contains("IOPlatformUUID") {
                // "IOPlatformUUID" = "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"
                if let Some(uuid) = line.split('"').nth(3) {
                    return Ok(uuid.to_string());
                }
            }
        }

        Err(anyhow!("Failed to extract IOPlatformUUID from ioreg"))
    }

    #[cfg(target_os = "windows")]
    {
        use std::process::Command;

        let output = Command::new("wmic")
            .args(["csproduct", "get", "UUID"])
            .output()?;

        let output_str = String::from_utf8_lossy(&output.stdout);

        if let Some(uuid) = output_str.lines().nth(1) {
            return Ok(uuid.trim().to_string());
        }

        Err(anyhow!("Failed to extract UUID from wmic"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Err(anyhow!("Unsupported platform for machine UUID extraction"))
    }
}

/// Derives the AES-256 key from the machine UUID.
fn derive_key() -> Result<[u8; 32]> {
    let uuid = machine_uuid()?;

    let mut hasher = Sha256::new();
    hasher.update(uuid.as_bytes());
    hasher.update(b"pmoflix-vault-encryption-v1");

    let digest = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);

    Ok(key)
}

/// Encrypts a password for storage.
///
/// # Returns
///
/// The value in `encrypted:BASE64` form, where the payload is the 12-byte
/// nonce followed by the ciphertext.
pub fn encrypt_password(password: &str) -> Result<String> {
    let key = derive_key()?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| anyhow!("Failed to create cipher: {}", e))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, password.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);

    Ok(format!(
        "{}{}",
        ENCRYPTED_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(&payload)
    ))
}

/// Decrypts a stored `encrypted:BASE64` password.
///
/// # Errors
///
/// Fails if the format is invalid, or if the value was encrypted on a
/// different machine (wrong key) or corrupted.
pub fn decrypt_password(stored: &str) -> Result<String> {
    let base64_data = stored
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Invalid encrypted password format (missing prefix)"))?;

    let payload = base64::engine::general_purpose::STANDARD
        .decode(base64_data)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;

    if payload.len() < NONCE_LEN {
        return Err(anyhow!("Invalid ciphertext (too short)"));
    }

    let key = derive_key()?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| anyhow!("Failed to create cipher: {}", e))?;

    let nonce = Nonce::from_slice(&payload[..NONCE_LEN]);
    let plaintext = cipher
        .decrypt(nonce, &payload[NONCE_LEN..])
        .map_err(|e| anyhow!("Decryption failed (wrong machine or corrupted data): {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

/// Whether a stored value is in encrypted form.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Returns the plaintext password from a stored value, decrypting if needed.
///
/// Plaintext values pass through unchanged so a hand-edited vault entry
/// still works.
pub fn reveal_password(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_password(value)
    } else {
        Ok(value.to_string())
    }
}
