//! Symmetric primitives shared by both browser families.

use aes::cipher::{generic_array::GenericArray, BlockDecryptMut, KeyIvInit};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use cbc::Decryptor;
use des::TdesEde3;

use crate::error::{HarvestError, HarvestResult};

pub const GCM_NONCE_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;

/// Version prefixes marking a Chromium ciphertext as wrapped under the
/// locally managed AES key.
pub const V10_PREFIX: &[u8] = b"v10";
pub const V11_PREFIX: &[u8] = b"v11";

pub fn is_key_wrapped(blob: &[u8]) -> bool {
    blob.starts_with(V10_PREFIX) || blob.starts_with(V11_PREFIX)
}

/// AES-GCM decryption with a 12-byte nonce and 16-byte tag. The key length
/// selects the variant: 16 bytes for the PBKDF2-derived Unix keys, 32 bytes
/// for the DPAPI-wrapped key.
pub fn aes_gcm_decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> HarvestResult<Vec<u8>> {
    if nonce.len() != GCM_NONCE_LEN {
        return Err(HarvestError::InvalidKeyLength(format!(
            "GCM nonce must be {} bytes, got {}",
            GCM_NONCE_LEN,
            nonce.len()
        )));
    }

    let nonce = Nonce::from_slice(nonce);
    match key.len() {
        16 => {
            let cipher = Aes128Gcm::new_from_slice(key)
                .map_err(|e| HarvestError::InvalidKeyLength(e.to_string()))?;
            cipher.decrypt(nonce, ciphertext).map_err(|_| HarvestError::AuthFail)
        }
        32 => {
            let cipher = Aes256Gcm::new_from_slice(key)
                .map_err(|e| HarvestError::InvalidKeyLength(e.to_string()))?;
            cipher.decrypt(nonce, ciphertext).map_err(|_| HarvestError::AuthFail)
        }
        n => Err(HarvestError::InvalidKeyLength(format!(
            "AES-GCM key must be 16 or 32 bytes, got {n}"
        ))),
    }
}

/// Decrypt a Chromium `v10`/`v11` blob: strip the 3-byte prefix, split the
/// 12-byte nonce, then AES-GCM over the remainder (ciphertext plus tag).
pub fn decrypt_chromium_blob(key: &[u8], blob: &[u8]) -> HarvestResult<Vec<u8>> {
    if !is_key_wrapped(blob) {
        return Err(HarvestError::AuthFail);
    }

    let body = &blob[V10_PREFIX.len()..];
    if body.len() < GCM_NONCE_LEN + GCM_TAG_LEN {
        return Err(HarvestError::AuthFail);
    }

    let (nonce, remainder) = body.split_at(GCM_NONCE_LEN);
    aes_gcm_decrypt(key, nonce, remainder)
}

/// 3DES-CBC decryption followed by a strict PKCS#5 strip.
pub fn des3_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> HarvestResult<Vec<u8>> {
    let mut padded = des3_cbc_decrypt_raw(key, iv, ciphertext)?;
    let result = pkcs5_strip(&padded).map(<[u8]>::to_vec);
    zeroize::Zeroize::zeroize(&mut padded);
    result
}

fn des3_cbc_decrypt_raw(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> HarvestResult<Vec<u8>> {
    if key.len() != 24 {
        return Err(HarvestError::InvalidKeyLength(format!(
            "3DES key must be 24 bytes, got {}",
            key.len()
        )));
    }

    if iv.len() != 8 {
        return Err(HarvestError::InvalidKeyLength(format!(
            "3DES IV must be 8 bytes, got {}",
            iv.len()
        )));
    }

    if ciphertext.is_empty() || ciphertext.len() % 8 != 0 {
        return Err(HarvestError::BadPadding);
    }

    let mut cipher = Decryptor::<TdesEde3>::new_from_slices(key, iv)
        .map_err(|e| HarvestError::InvalidKeyLength(e.to_string()))?;

    let mut result = Vec::with_capacity(ciphertext.len());
    for chunk in ciphertext.chunks_exact(8) {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block_mut(&mut block);
        result.extend_from_slice(block.as_slice());
    }

    Ok(result)
}

/// Strict PKCS#5 strip: the final byte `p` must lie in `[1, 8]` and the
/// trailing `p` bytes must all equal `p`.
pub fn pkcs5_strip(buf: &[u8]) -> HarvestResult<&[u8]> {
    let &pad = buf.last().ok_or(HarvestError::BadPadding)?;
    let pad = pad as usize;
    if pad == 0 || pad > 8 || pad > buf.len() {
        return Err(HarvestError::BadPadding);
    }

    let (body, tail) = buf.split_at(buf.len() - pad);
    if tail.iter().any(|&b| b as usize != pad) {
        return Err(HarvestError::BadPadding);
    }

    Ok(body)
}
