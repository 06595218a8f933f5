//! Authenticated encryption for cookie payloads.
//!
//! Format: `base64(nonce || AES-256-GCM(plaintext))`, where the key is
//! SHA-256 of the tenant secret and the 96-bit nonce is random per call.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Failure to seal or open a payload. Carries no key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("payload is not valid base64")]
    Encoding,
    #[error("payload is too short")]
    Truncated,
    #[error("payload failed authentication")]
    Authentication,
    #[error("encryption failed")]
    Encryption,
}

fn cipher_for(secret: &str) -> Aes256Gcm {
    let digest = Sha256::digest(secret.as_bytes());
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(digest.as_slice()))
}

/// Encrypt `plaintext` under a key derived from `secret`.
pub fn encrypt(plaintext: &[u8], secret: &str) -> Result<String, CipherError> {
    let cipher = cipher_for(secret);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CipherError::Encryption)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(nonce.as_slice());
    sealed.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(sealed))
}

/// Decrypt a payload produced by [`encrypt`] with the same secret.
pub fn decrypt(payload: &str, secret: &str) -> Result<Vec<u8>, CipherError> {
    let sealed = STANDARD.decode(payload).map_err(|_| CipherError::Encoding)?;
    if sealed.len() <= NONCE_LEN {
        return Err(CipherError::Truncated);
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher_for(secret)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CipherError::Authentication)
}
