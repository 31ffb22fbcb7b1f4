//! OS data-protection adapter.
//!
//! One operation: hand a wrapped blob to the platform secret store and get
//! plaintext back. On platforms without a native provider the call reports
//! `UnprotectUnavailable`, which the pipeline recovers from per record.

use crate::error::HarvestResult;

#[cfg(windows)]
pub fn unprotect(blob: &[u8]) -> HarvestResult<Vec<u8>> {
    use crate::error::HarvestError;
    use windows::Win32::Foundation::{LocalFree, HLOCAL};
    use windows::Win32::Security::Cryptography::{CryptUnprotectData, CRYPT_INTEGER_BLOB};

    let mut input = blob.to_vec();
    let data_in = CRYPT_INTEGER_BLOB {
        cbData: input.len() as u32,
        pbData: input.as_mut_ptr(),
    };
    let mut data_out = CRYPT_INTEGER_BLOB::default();

    unsafe {
        CryptUnprotectData(&data_in, None, None, None, None, 0, &mut data_out)
            .map_err(|_| HarvestError::UnprotectUnavailable)?;

        let plaintext =
            std::slice::from_raw_parts(data_out.pbData, data_out.cbData as usize).to_vec();
        LocalFree(HLOCAL(data_out.pbData.cast()));
        Ok(plaintext)
    }
}

#[cfg(not(windows))]
pub fn unprotect(_blob: &[u8]) -> HarvestResult<Vec<u8>> {
    Err(crate::error::HarvestError::UnprotectUnavailable)
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::error::HarvestError;

    #[test]
    fn unavailable_without_native_provider() {
        assert!(matches!(
            unprotect(b"blob"),
            Err(HarvestError::UnprotectUnavailable)
        ));
    }
}
