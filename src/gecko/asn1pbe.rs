//! DER envelopes and key schedule for the NSS key store.
//!
//! Two shapes cover everything `key4.db` and `logins.json` hand us: the PBE
//! envelope wrapping `metaData.item2` and `nssPrivate.a11`, and the login
//! envelope wrapping each base64-decoded credential field. Both decrypt with
//! 3DES-CBC; the PBE envelope derives its key from the PKCS#12 v1
//! SHA-1/HMAC schedule, the login envelope uses the master key directly.

use asn1_rs::{DerSequence, FromDer, OctetString, Oid};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use zeroize::Zeroize;

use crate::crypto::des3_cbc_decrypt;
use crate::error::{HarvestError, HarvestResult};

type HmacSha1 = Hmac<Sha1>;

const PBE_SHA1_3DES_OID: &str = "1.2.840.113549.1.12.5.1.3";
const DES_EDE3_CBC_OID: &str = "1.2.840.113549.3.7";

/// `SEQUENCE { SEQUENCE { OID, SEQUENCE { entrySalt, iterations? } }, ct }`
#[derive(Debug, PartialEq, DerSequence)]
pub struct PbeEnvelope<'a> {
    algo: PbeAlgorithm<'a>,
    ciphertext: OctetString<'a>,
}

#[derive(Debug, PartialEq, DerSequence)]
pub struct PbeAlgorithm<'a> {
    oid: Oid<'a>,
    params: PbeParams<'a>,
}

#[derive(Debug, PartialEq, DerSequence)]
pub struct PbeParams<'a> {
    entry_salt: OctetString<'a>,
    #[optional]
    iterations: Option<u32>,
}

impl<'a> PbeEnvelope<'a> {
    pub fn parse(bytes: &'a [u8]) -> HarvestResult<Self> {
        let (_, envelope) = PbeEnvelope::from_der(bytes)
            .map_err(|e| HarvestError::MalformedAsn1(e.to_string()))?;

        let oid = envelope.algo.oid.to_id_string();
        if oid != PBE_SHA1_3DES_OID {
            return Err(HarvestError::UnknownOid(oid));
        }

        Ok(envelope)
    }

    pub fn entry_salt(&self) -> &[u8] {
        self.algo.params.entry_salt.as_cow()
    }

    /// Derive the entry key from the schedule and decrypt the payload.
    /// `master_pwd` is empty unless the profile has a user-set master
    /// password.
    pub fn decrypt(&self, global_salt: &[u8], master_pwd: &[u8]) -> HarvestResult<Vec<u8>> {
        let (mut key, iv) = nss_key_schedule(global_salt, master_pwd, self.entry_salt())?;
        let result = des3_cbc_decrypt(&key, &iv, self.ciphertext.as_cow());
        key.zeroize();
        result
    }
}

/// `SEQUENCE { keyId, SEQUENCE { OID, iv }, ct }` — the keyId always names
/// the profile's single NSS key and is not inspected.
#[derive(Debug, PartialEq, DerSequence)]
pub struct LoginEnvelope<'a> {
    _key_id: OctetString<'a>,
    cipher: LoginCipher<'a>,
    ciphertext: OctetString<'a>,
}

#[derive(Debug, PartialEq, DerSequence)]
pub struct LoginCipher<'a> {
    oid: Oid<'a>,
    iv: OctetString<'a>,
}

impl<'a> LoginEnvelope<'a> {
    pub fn parse(bytes: &'a [u8]) -> HarvestResult<Self> {
        let (_, envelope) = LoginEnvelope::from_der(bytes)
            .map_err(|e| HarvestError::MalformedAsn1(e.to_string()))?;

        let oid = envelope.cipher.oid.to_id_string();
        if oid != DES_EDE3_CBC_OID {
            return Err(HarvestError::UnknownOid(oid));
        }

        Ok(envelope)
    }

    pub fn decrypt(&self, master_key: &[u8]) -> HarvestResult<Vec<u8>> {
        des3_cbc_decrypt(master_key, self.cipher.iv.as_cow(), self.ciphertext.as_cow())
    }
}

/// PKCS#12 v1 PBE key schedule on SHA-1/HMAC:
///
/// ```text
/// HP  = SHA1(globalSalt ‖ masterPwd)
/// CHP = SHA1(HP ‖ entrySalt)
/// PES = entrySalt zero-padded to 20 bytes
/// k1  = HMAC(CHP, PES ‖ entrySalt)
/// tk  = HMAC(CHP, PES)
/// k2  = HMAC(CHP, tk ‖ entrySalt)
/// ```
///
/// `k1 ‖ k2` is 40 bytes; the 3DES key is the first 24, the IV the last 8.
pub fn nss_key_schedule(
    global_salt: &[u8],
    master_pwd: &[u8],
    entry_salt: &[u8],
) -> HarvestResult<([u8; 24], [u8; 8])> {
    let mut sha1 = Sha1::new();
    sha1.update(global_salt);
    sha1.update(master_pwd);
    let hashed_pwd = sha1.finalize();

    let mut sha1 = Sha1::new();
    sha1.update(hashed_pwd);
    sha1.update(entry_salt);
    let composite = sha1.finalize();

    let mut padded_salt = entry_salt.to_vec();
    padded_salt.resize(20, 0);

    let hmac = |parts: &[&[u8]]| -> HarvestResult<[u8; 20]> {
        let mut mac = HmacSha1::new_from_slice(&composite)
            .map_err(|e| HarvestError::InvalidKeyLength(e.to_string()))?;
        for part in parts {
            mac.update(part);
        }
        Ok(mac.finalize().into_bytes().into())
    };

    let mut k1 = hmac(&[&padded_salt, entry_salt])?;
    let mut throwaway = hmac(&[&padded_salt])?;
    let mut k2 = hmac(&[&throwaway, entry_salt])?;

    let mut key = [0u8; 24];
    key[..20].copy_from_slice(&k1);
    key[20..].copy_from_slice(&k2[..4]);
    let mut iv = [0u8; 8];
    iv.copy_from_slice(&k2[12..]);

    k1.zeroize();
    k2.zeroize();
    throwaway.zeroize();
    padded_salt.zeroize();

    Ok((key, iv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        build_login_envelope, build_pbe_envelope, des3_cbc_encrypt_padded, tlv, DES_EDE3_OID_DER,
    };

    #[test]
    fn pbe_envelope_parses_salt_and_ciphertext() {
        let der = build_pbe_envelope(&[1, 2, 3, 4], &[0xAA; 16], true);
        let envelope = PbeEnvelope::parse(&der).unwrap();
        assert_eq!(envelope.entry_salt(), &[1, 2, 3, 4]);
        assert_eq!(envelope.ciphertext.as_cow().len(), 16);
    }

    #[test]
    fn pbe_envelope_tolerates_absent_iteration_count() {
        let der = build_pbe_envelope(&[1, 2, 3, 4], &[0xAA; 8], false);
        let envelope = PbeEnvelope::parse(&der).unwrap();
        assert_eq!(envelope.entry_salt(), &[1, 2, 3, 4]);
        assert_eq!(envelope.algo.params.iterations, None);
    }

    #[test]
    fn unknown_oid_is_rejected() {
        // Same shape, but the login cipher OID where the PBE OID belongs.
        let mut params = tlv(0x04, &[1, 2, 3, 4]);
        params.extend_from_slice(&[0x02, 0x01, 0x01]);
        let params = tlv(0x30, &params);
        let mut algo = DES_EDE3_OID_DER.to_vec();
        algo.extend_from_slice(&params);
        let algo = tlv(0x30, &algo);
        let mut envelope = algo;
        envelope.extend_from_slice(&tlv(0x04, &[0xAA; 8]));
        let der = tlv(0x30, &envelope);

        assert!(matches!(
            PbeEnvelope::parse(&der),
            Err(HarvestError::UnknownOid(_))
        ));
    }

    #[test]
    fn garbage_is_malformed_asn1() {
        assert!(matches!(
            PbeEnvelope::parse(&[0xff, 0x00, 0x12]),
            Err(HarvestError::MalformedAsn1(_))
        ));
        assert!(matches!(
            LoginEnvelope::parse(b"not der at all"),
            Err(HarvestError::MalformedAsn1(_))
        ));
    }

    #[test]
    fn key_schedule_is_deterministic() {
        let global_salt = [0u8; 20];
        let entry_salt = [1, 2, 3, 4];
        let (key_a, iv_a) = nss_key_schedule(&global_salt, b"", &entry_salt).unwrap();
        let (key_b, iv_b) = nss_key_schedule(&global_salt, b"", &entry_salt).unwrap();
        assert_eq!(key_a, key_b);
        assert_eq!(iv_a, iv_b);

        // A different master password must move the key.
        let (key_c, _) = nss_key_schedule(&global_salt, b"hunter2", &entry_salt).unwrap();
        assert_ne!(key_a, key_c);
    }

    #[test]
    fn pbe_envelope_decrypts_schedule_encrypted_payload() {
        let global_salt = [0u8; 20];
        let entry_salt = [1, 2, 3, 4];
        let (key, iv) = nss_key_schedule(&global_salt, b"", &entry_salt).unwrap();
        let ciphertext = des3_cbc_encrypt_padded(&key, &iv, b"password-check");

        let der = build_pbe_envelope(&entry_salt, &ciphertext, true);
        let envelope = PbeEnvelope::parse(&der).unwrap();
        let plain = envelope.decrypt(&global_salt, b"").unwrap();
        assert_eq!(plain, b"password-check");
    }

    #[test]
    fn login_envelope_decrypts_with_master_key() {
        let master_key: Vec<u8> = (0..24).collect();
        let iv = [7u8; 8];
        let ciphertext = des3_cbc_encrypt_padded(&master_key, &iv, b"s3cret");

        let der = build_login_envelope(&[0xf8; 16], &iv, &ciphertext);
        let envelope = LoginEnvelope::parse(&der).unwrap();
        assert_eq!(envelope.decrypt(&master_key).unwrap(), b"s3cret");
    }

    #[test]
    fn login_envelope_wrong_key_never_recovers_plaintext() {
        let master_key: Vec<u8> = (0..24).collect();
        let iv = [7u8; 8];
        let ciphertext = des3_cbc_encrypt_padded(&master_key, &iv, b"s3cret");
        let der = build_login_envelope(&[0xf8; 16], &iv, &ciphertext);
        let envelope = LoginEnvelope::parse(&der).unwrap();

        // Usually BadPadding; at worst garbage, but never the plaintext.
        let wrong_key: Vec<u8> = (100..124).collect();
        match envelope.decrypt(&wrong_key) {
            Ok(plain) => assert_ne!(plain, b"s3cret"),
            Err(e) => assert!(matches!(e, HarvestError::BadPadding)),
        }
    }
}
