//! Fixture builders shared by the unit tests: handcrafted DER envelopes
//! and a 3DES-CBC encryptor mirroring what NSS writes to disk.

use aes::cipher::{generic_array::GenericArray, BlockEncryptMut, KeyIvInit};
use des::TdesEde3;

use crate::gecko::asn1pbe::nss_key_schedule;

pub const PBE_OID_DER: &[u8] = &[
    0x06, 0x0b, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x0c, 0x05, 0x01, 0x03,
];
pub const DES_EDE3_OID_DER: &[u8] = &[
    0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x03, 0x07,
];

pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    match content.len() {
        n if n < 128 => out.push(n as u8),
        n if n < 256 => {
            out.push(0x81);
            out.push(n as u8);
        }
        n => {
            out.push(0x82);
            out.push((n >> 8) as u8);
            out.push(n as u8);
        }
    }
    out.extend_from_slice(content);
    out
}

pub fn build_pbe_envelope(entry_salt: &[u8], ciphertext: &[u8], with_iterations: bool) -> Vec<u8> {
    let mut params = tlv(0x04, entry_salt);
    if with_iterations {
        params.extend_from_slice(&[0x02, 0x01, 0x01]);
    }
    let params = tlv(0x30, &params);

    let mut algo = PBE_OID_DER.to_vec();
    algo.extend_from_slice(&params);
    let algo = tlv(0x30, &algo);

    let mut envelope = algo;
    envelope.extend_from_slice(&tlv(0x04, ciphertext));
    tlv(0x30, &envelope)
}

pub fn build_login_envelope(key_id: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut cipher = DES_EDE3_OID_DER.to_vec();
    cipher.extend_from_slice(&tlv(0x04, iv));
    let cipher = tlv(0x30, &cipher);

    let mut envelope = tlv(0x04, key_id);
    envelope.extend_from_slice(&cipher);
    envelope.extend_from_slice(&tlv(0x04, ciphertext));
    tlv(0x30, &envelope)
}

pub fn des3_cbc_encrypt_padded(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let pad = 8 - plaintext.len() % 8;
    let mut padded = plaintext.to_vec();
    padded.extend(std::iter::repeat(pad as u8).take(pad));

    let mut cipher = cbc::Encryptor::<TdesEde3>::new_from_slices(key, iv).unwrap();
    let mut out = Vec::with_capacity(padded.len());
    for chunk in padded.chunks_exact(8) {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.encrypt_block_mut(&mut block);
        out.extend_from_slice(block.as_slice());
    }
    out
}

/// Encrypt `plaintext` the way NSS seals PBE envelope payloads under the
/// empty master password.
pub fn schedule_encrypt(global_salt: &[u8], entry_salt: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let (key, iv) = nss_key_schedule(global_salt, b"", entry_salt).unwrap();
    des3_cbc_encrypt_padded(&key, &iv, plaintext)
}

/// Write a minimal `key4.db` sealing `planted_key` under the empty master
/// password.
pub fn write_key4(
    profile: &std::path::Path,
    global_salt: &[u8],
    planted_key: &[u8],
    a102: &[u8],
) -> std::path::PathBuf {
    let meta_salt = [0x10, 0x20, 0x30, 0x40];
    let meta_ct = schedule_encrypt(global_salt, &meta_salt, b"password-check");
    let meta_envelope = build_pbe_envelope(&meta_salt, &meta_ct, true);

    let nss_salt = [0x0a, 0x0b, 0x0c, 0x0d, 0x0e];
    let nss_ct = schedule_encrypt(global_salt, &nss_salt, planted_key);
    let nss_envelope = build_pbe_envelope(&nss_salt, &nss_ct, true);

    let path = profile.join("key4.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE metaData (id TEXT, item1 BLOB, item2 BLOB);
         CREATE TABLE nssPrivate (a11 BLOB, a102 BLOB);",
    )
    .unwrap();
    conn.execute(
        "INSERT INTO metaData VALUES ('password', ?1, ?2)",
        rusqlite::params![global_salt, meta_envelope],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO nssPrivate VALUES (?1, ?2)",
        rusqlite::params![nss_envelope, a102],
    )
    .unwrap();
    path
}
