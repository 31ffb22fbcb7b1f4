//! Firefox master-key recovery from `key4.db`.

use std::path::Path;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::asn1pbe::PbeEnvelope;
use crate::error::{HarvestError, HarvestResult};
use crate::snapshot::Snapshot;

/// NSS key id of the default private key in `nssPrivate.a102`.
const NSS_DEFAULT_KEY_ID: [u8; 16] = [
    0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x01,
];

const PASSWORD_CHECK: &[u8] = b"password-check";

/// The 24-byte 3DES key protecting every login envelope in the profile.
#[derive(ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; 24],
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey").field("bytes", &"<redacted>").finish()
    }
}

impl MasterKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Recover the master key from a profile's `key4.db`.
///
/// `master_pwd` is the extension point for user-set master passwords; the
/// orchestrator always passes the empty slice.
pub fn provide_key(
    profile_dir: &Path,
    scratch_dir: &Path,
    namespace: &str,
    master_pwd: &[u8],
) -> HarvestResult<MasterKey> {
    let key4 = profile_dir.join("key4.db");
    let snapshot = Snapshot::take(&key4, scratch_dir, namespace)?;
    let conn = snapshot.open_db()?;

    let (global_salt, meta_blob): (Vec<u8>, Vec<u8>) = conn
        .query_row(
            "SELECT item1, item2 FROM metaData WHERE id = 'password'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                HarvestError::SchemaMismatch("metaData has no password row".into())
            }
            other => HarvestError::Database(other),
        })?;

    let meta = PbeEnvelope::parse(&meta_blob)?;
    let mut check = meta.decrypt(&global_salt, master_pwd)?;
    let check_ok = check
        .windows(PASSWORD_CHECK.len())
        .any(|window| window == PASSWORD_CHECK);
    check.zeroize();
    if !check_ok {
        return Err(HarvestError::WrongMasterPassword);
    }
    debug!("password-check validated for {:?}", profile_dir);

    let (nss_a11, nss_a102): (Vec<u8>, Vec<u8>) = conn
        .query_row("SELECT a11, a102 FROM nssPrivate", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                HarvestError::SchemaMismatch("nssPrivate is empty".into())
            }
            other => HarvestError::Database(other),
        })?;

    if nss_a102 != NSS_DEFAULT_KEY_ID {
        return Err(HarvestError::UnknownKeyId);
    }

    let nss = PbeEnvelope::parse(&nss_a11)?;
    let mut wrapped = nss.decrypt(&global_salt, master_pwd)?;
    if wrapped.len() < 24 {
        wrapped.zeroize();
        return Err(HarvestError::InvalidKeyLength(format!(
            "unwrapped NSS key is {} bytes, need 24",
            wrapped.len()
        )));
    }

    let mut bytes = [0u8; 24];
    bytes.copy_from_slice(&wrapped[..24]);
    wrapped.zeroize();

    Ok(MasterKey { bytes })
}
