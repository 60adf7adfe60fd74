//! Versioned payload encryption for stored secret values.
//!
//! Values carry their format in a string prefix, never out-of-band:
//!
//! - `encrypted:v3:<base64>` — current format. AES-256-GCM, key and IV
//!   expanded from the caller's salt.
//! - `encrypted:<binary>` — legacy format, decrypt-only. AES-GCM under a
//!   hardcoded keyword, ciphertext stored as latin1 code points.
//! - no prefix — pre-encryption plaintext, returned unchanged.
//!
//! New writes always produce the current format; the older providers exist
//! so historical data stays readable. Decrypting anything [`encrypt`]
//! produced round-trips, for every format that ever wrote data — that
//! invariant must never regress.
//!
//! # Security model
//!
//! - Key/IV expansion is a deterministic cyclic repetition of the salt, NOT
//!   a KDF. Changing it breaks every previously written value.
//! - The legacy keyword derives only 16 key bytes despite the source
//!   nominally using AES-256. The original shipped that way; the expansion
//!   is preserved bit-for-bit (as AES-128-GCM, the one cipher a 16-byte
//!   key selects) so legacy data stays readable.
//! - Failures surface as a single coarse [`CryptoError::EncryptionFailed`] /
//!   [`CryptoError::DecryptionFailed`] with the cause suppressed — detailed
//!   crypto errors are an oracle.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Prefix of the current wire format.
const V3_PREFIX: &str = "encrypted:v3:";

/// Prefix shared by every encrypted format; bare (no version segment)
/// means the legacy binary format.
const ENCRYPTED_PREFIX: &str = "encrypted:";

/// Key-derivation keyword of the legacy format. Hardcoded in the original;
/// must never change.
const LEGACY_KEYWORD: &str = "vaultscout";

const KEY_LEN: usize = 32;
const LEGACY_KEY_LEN: usize = 16;
const IV_LEN: usize = 12;

/// Wire format of one stored value, inferred from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Untagged pre-encryption plaintext.
    V1Plain,
    /// Legacy keyword-keyed binary format.
    V2Legacy,
    /// Current salted base64 format.
    V3,
}

/// Infer a value's format from its prefix. Pure; does not touch key
/// material.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedVersion`] for an `encrypted:vN:` tag
/// this build does not know.
pub fn detect_version(value: &str) -> Result<FormatVersion, CryptoError> {
    if value.starts_with(V3_PREFIX) {
        return Ok(FormatVersion::V3);
    }
    if let Some(rest) = value.strip_prefix(ENCRYPTED_PREFIX) {
        // "encrypted:v9:..." is a tagged format from the future, not
        // legacy binary data that happens to start with a 'v'.
        if let Some(tag) = version_tag(rest) {
            return Err(CryptoError::UnsupportedVersion {
                tag: tag.to_owned(),
            });
        }
        return Ok(FormatVersion::V2Legacy);
    }
    Ok(FormatVersion::V1Plain)
}

/// Encrypt a value in the current format.
///
/// # Errors
///
/// Returns [`CryptoError::EncryptionFailed`] on any internal failure,
/// including an empty salt.
pub fn encrypt(plaintext: &str, salt: &str) -> Result<String, CryptoError> {
    provider_for(FormatVersion::V3)
        .encrypt(plaintext, salt)
        .map_err(|e| {
            debug!(error = %e, "encrypt failed");
            CryptoError::EncryptionFailed
        })
}

/// Decrypt a value of any supported format.
///
/// # Errors
///
/// - [`CryptoError::NullValue`] for an empty input, before any version
///   inspection.
/// - [`CryptoError::UnsupportedVersion`] for an unknown version tag.
/// - [`CryptoError::DecryptionFailed`] for any internal failure, cause
///   suppressed.
pub fn decrypt(value: &str, salt: &str) -> Result<String, CryptoError> {
    if value.is_empty() {
        return Err(CryptoError::NullValue);
    }
    let version = detect_version(value)?;
    provider_for(version).decrypt(value, salt).map_err(|e| {
        debug!(error = %e, "decrypt failed");
        CryptoError::DecryptionFailed
    })
}

/// One wire format's encrypt/decrypt pair.
///
/// Internal errors stay inside this module; the public functions collapse
/// them to the coarse taxonomy.
trait CryptoProvider {
    fn encrypt(&self, plaintext: &str, salt: &str) -> Result<String, ProviderError>;
    fn decrypt(&self, value: &str, salt: &str) -> Result<String, ProviderError>;
}

/// Select the provider for a detected format.
fn provider_for(version: FormatVersion) -> &'static dyn CryptoProvider {
    match version {
        FormatVersion::V1Plain => &PlainV1,
        FormatVersion::V2Legacy => &LegacyV2,
        FormatVersion::V3 => &CurrentV3,
    }
}

#[derive(Debug, thiserror::Error)]
enum ProviderError {
    #[error("empty salt")]
    EmptySalt,
    #[error("aead failure")]
    Aead,
    #[error("payload is not valid base64")]
    Base64,
    #[error("payload is not latin1")]
    Latin1,
    #[error("plaintext is not utf-8")]
    Utf8,
    #[error("value does not carry the expected prefix")]
    Prefix,
}

/// Untagged plaintext. Decrypt is a passthrough; encrypt is retained for
/// completeness but never selected for new writes.
struct PlainV1;

impl CryptoProvider for PlainV1 {
    fn encrypt(&self, plaintext: &str, _salt: &str) -> Result<String, ProviderError> {
        Ok(plaintext.to_owned())
    }

    fn decrypt(&self, value: &str, _salt: &str) -> Result<String, ProviderError> {
        Ok(value.to_owned())
    }
}

/// Legacy binary format: `encrypted:` + latin1-coded AES-GCM output under
/// the hardcoded keyword.
struct LegacyV2;

impl CryptoProvider for LegacyV2 {
    fn encrypt(&self, plaintext: &str, _salt: &str) -> Result<String, ProviderError> {
        let key = expand(LEGACY_KEYWORD.as_bytes(), LEGACY_KEY_LEN)?;
        let iv = expand(LEGACY_KEYWORD.as_bytes(), IV_LEN)?;

        let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| ProviderError::Aead)?;
        Ok(format!("{ENCRYPTED_PREFIX}{}", latin1_encode(&ciphertext)))
    }

    fn decrypt(&self, value: &str, _salt: &str) -> Result<String, ProviderError> {
        let payload = value
            .strip_prefix(ENCRYPTED_PREFIX)
            .ok_or(ProviderError::Prefix)?;
        let ciphertext = latin1_decode(payload)?;

        let key = expand(LEGACY_KEYWORD.as_bytes(), LEGACY_KEY_LEN)?;
        let iv = expand(LEGACY_KEYWORD.as_bytes(), IV_LEN)?;

        let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| ProviderError::Aead)?;
        String::from_utf8(plaintext).map_err(|_| ProviderError::Utf8)
    }
}

/// Current format: `encrypted:v3:` + base64 AES-256-GCM output under a
/// salt-expanded key and IV.
struct CurrentV3;

impl CryptoProvider for CurrentV3 {
    fn encrypt(&self, plaintext: &str, salt: &str) -> Result<String, ProviderError> {
        let key = expand(salt.as_bytes(), KEY_LEN)?;
        let iv = expand(salt.as_bytes(), IV_LEN)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| ProviderError::Aead)?;
        Ok(format!("{V3_PREFIX}{}", BASE64.encode(ciphertext)))
    }

    fn decrypt(&self, value: &str, salt: &str) -> Result<String, ProviderError> {
        let payload = value.strip_prefix(V3_PREFIX).ok_or(ProviderError::Prefix)?;
        let ciphertext = BASE64.decode(payload).map_err(|_| ProviderError::Base64)?;

        let key = expand(salt.as_bytes(), KEY_LEN)?;
        let iv = expand(salt.as_bytes(), IV_LEN)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| ProviderError::Aead)?;
        String::from_utf8(plaintext).map_err(|_| ProviderError::Utf8)
    }
}

/// Cyclically repeat `src` to exactly `len` bytes. Deterministic by design
/// (wire compatibility); key material is zeroized on drop.
fn expand(src: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
    if src.is_empty() {
        return Err(ProviderError::EmptySalt);
    }
    Ok(Zeroizing::new(
        src.iter().copied().cycle().take(len).collect(),
    ))
}

/// Is `rest` (the part after `encrypted:`) a `vN:` version tag?
fn version_tag(rest: &str) -> Option<&str> {
    let (tag, _) = rest.split_once(':')?;
    let digits = tag.strip_prefix('v')?;
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(tag)
    } else {
        None
    }
}

/// Map raw bytes to a string of latin1 code points (how the original
/// carried binary ciphertext inside a string value).
fn latin1_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`latin1_encode`]. Any char above `U+00FF` means the value
/// was not produced by the legacy writer.
fn latin1_decode(s: &str) -> Result<Vec<u8>, ProviderError> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| ProviderError::Latin1))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn current_format_round_trips() {
        for (plaintext, salt) in [
            ("hunter2", "alice@example.com"),
            ("", "salty"),
            ("unicode ✓ payload", "s"),
            ("a considerably longer plaintext that spans several blocks of the cipher", "another salt"),
        ] {
            let encrypted = encrypt(plaintext, salt).unwrap();
            assert!(encrypted.starts_with("encrypted:v3:"));
            assert_eq!(decrypt(&encrypted, salt).unwrap(), plaintext);
        }
    }

    #[test]
    fn encryption_is_deterministic_for_a_given_salt() {
        // Salt-derived IV, no random nonce: same inputs, same wire value.
        let a = encrypt("value", "salt").unwrap();
        let b = encrypt("value", "salt").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_salt_fails_without_detail() {
        let encrypted = encrypt("value", "right-salt").unwrap();
        assert_eq!(
            decrypt(&encrypted, "wrong-salt").unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn legacy_binary_values_still_decrypt() {
        // A value written by the legacy format's own writer.
        let legacy = LegacyV2.encrypt("old secret", "ignored").unwrap();
        assert!(legacy.starts_with("encrypted:"));
        assert!(!legacy.starts_with("encrypted:v"));
        assert_eq!(decrypt(&legacy, "any salt").unwrap(), "old secret");
    }

    #[test]
    fn untagged_values_pass_through_unchanged() {
        assert_eq!(decrypt("plain old value", "salt").unwrap(), "plain old value");
    }

    #[test]
    fn empty_value_is_rejected_before_version_inspection() {
        assert_eq!(decrypt("", "salt").unwrap_err(), CryptoError::NullValue);
    }

    #[test]
    fn unknown_version_tag_is_rejected() {
        assert_eq!(
            decrypt("encrypted:v9:AAAA", "salt").unwrap_err(),
            CryptoError::UnsupportedVersion {
                tag: "v9".to_owned()
            }
        );
    }

    #[test]
    fn legacy_payload_starting_with_v_but_not_a_tag_is_legacy() {
        // "vault..." after the prefix is binary data, not a version tag.
        assert_eq!(detect_version("encrypted:vault").unwrap(), FormatVersion::V2Legacy);
        assert_eq!(detect_version("encrypted:v1x:zz").unwrap(), FormatVersion::V2Legacy);
    }

    #[test]
    fn tampered_ciphertext_fails_coarsely() {
        let encrypted = encrypt("value", "salt").unwrap();
        let mut corrupted = encrypted.into_bytes();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == b'A' { b'B' } else { b'A' };
        let corrupted = String::from_utf8(corrupted).unwrap();
        assert_eq!(
            decrypt(&corrupted, "salt").unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn empty_salt_cannot_encrypt() {
        assert_eq!(encrypt("value", "").unwrap_err(), CryptoError::EncryptionFailed);
    }

    #[test]
    fn key_expansion_cycles_the_source() {
        let expanded = expand(b"abc", 8).unwrap();
        assert_eq!(&*expanded, b"abcabcab");
    }

    #[test]
    fn latin1_round_trips_all_byte_values() {
        let bytes: Vec<u8> = (0..=255).collect();
        let encoded = latin1_encode(&bytes);
        assert_eq!(latin1_decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn latin1_rejects_wide_chars() {
        assert!(latin1_decode("snowman ☃").is_err());
    }
}
