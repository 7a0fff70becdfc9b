//! AES-128-CBC file body encryption.
//!
//! File bodies are encrypted under the random per-file key that the
//! threshold protocol protects. The key travels as a 32-hex-char string; the
//! IV is drawn fresh per file and persisted alongside the ciphertext.
//! Ciphertexts are base64 armored for the JSON wire.

use aes::cipher::{BlockDecryptMut as _, BlockEncryptMut as _, KeyIvInit as _, block_padding::Pkcs7};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::{CryptoRng, Rng};
use zeroize::Zeroize as _;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Errors of the file cipher.
#[derive(Debug, thiserror::Error)]
pub enum FileCipherError {
    /// The key is not 32 hex characters.
    #[error("file key must be 32 hex characters")]
    BadKey,
    /// The IV is not 32 hex characters.
    #[error("file IV must be 32 hex characters")]
    BadIv,
    /// The ciphertext is not valid base64 or has broken padding.
    #[error("ciphertext is malformed: {0}")]
    Malformed(String),
}

/// Generates a random AES-128 key as a 32-char lowercase hex string.
pub fn random_key_hex<R: Rng + CryptoRng>(rng: &mut R) -> String {
    let mut key = [0u8; 16];
    rng.fill(&mut key);
    hex::encode(key)
}

/// Generates a random 16-byte IV as a 32-char lowercase hex string.
pub fn random_iv_hex<R: Rng + CryptoRng>(rng: &mut R) -> String {
    let mut iv = [0u8; 16];
    rng.fill(&mut iv);
    hex::encode(iv)
}

fn parse_16(hex_str: &str) -> Option<[u8; 16]> {
    let trimmed = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(trimmed).ok()?.try_into().ok()
}

/// Encrypts `data` under `key_hex`/`iv_hex`, returning base64 ciphertext.
pub fn encrypt(key_hex: &str, iv_hex: &str, data: &[u8]) -> Result<String, FileCipherError> {
    let mut key = parse_16(key_hex).ok_or(FileCipherError::BadKey)?;
    let iv = parse_16(iv_hex).ok_or(FileCipherError::BadIv)?;
    let cipher = Aes128CbcEnc::new(&key.into(), &iv.into());
    key.zeroize();
    Ok(BASE64.encode(cipher.encrypt_padded_vec_mut::<Pkcs7>(data)))
}

/// Decrypts a base64 ciphertext under `key_hex`/`iv_hex`.
pub fn decrypt(key_hex: &str, iv_hex: &str, armored: &str) -> Result<Vec<u8>, FileCipherError> {
    let mut key = parse_16(key_hex).ok_or(FileCipherError::BadKey)?;
    let iv = parse_16(iv_hex).ok_or(FileCipherError::BadIv)?;
    let ciphertext = BASE64
        .decode(armored.trim())
        .map_err(|e| FileCipherError::Malformed(e.to_string()))?;
    let cipher = Aes128CbcDec::new(&key.into(), &iv.into());
    key.zeroize();
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|e| FileCipherError::Malformed(e.to_string()))
}
