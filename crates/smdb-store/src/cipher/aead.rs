use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use smdb_core::CipherError;

/// Arbitrary key material is normalized to this block length before key
/// derivation.
const KEY_BLOCK_LEN: usize = 256;
/// PBKDF2-HMAC-SHA256 iteration count.
const KDF_ITERATIONS: u32 = 65_536;
/// Fixed, non-secret application salt. Keeping the salt constant means any
/// instance built from the same key material derives the same AES key, so
/// ciphertext stays readable across process restarts.
const KDF_SALT: &[u8] = b"smdb.store.v1";
/// AES-GCM nonce length. The nonce travels with each sealed value.
const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher with a PBKDF2-derived key. Each encode seals under a
/// fresh random nonce which is prepended to the ciphertext, so the wire
/// form is `base64(nonce ‖ ciphertext ‖ tag)` with a 128-bit tag (half the
/// 256-bit key size).
pub struct AeadCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for AeadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadCipher").finish_non_exhaustive()
    }
}

impl AeadCipher {
    pub fn new(key_material: &[u8]) -> Result<Self, CipherError> {
        if key_material.is_empty() {
            return Err(CipherError::EmptyKey);
        }

        let block = normalize_key(key_material);
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(&block, KDF_SALT, KDF_ITERATIONS, &mut key);

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| CipherError::Encrypt {
            reason: format!("cipher init failed: {e}"),
        })?;
        Ok(Self { cipher })
    }

    pub fn encode(&self, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, input)
            .map_err(|e| CipherError::Encrypt {
                reason: format!("encrypt failed: {e}"),
            })?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed).into_bytes())
    }

    pub fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        let sealed = STANDARD.decode(input).map_err(|e| CipherError::Malformed {
            reason: format!("base64 decode failed: {e}"),
        })?;
        if sealed.len() < NONCE_LEN {
            return Err(CipherError::Integrity);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Integrity)
    }
}

/// Tile short key material into a fixed block in whole-key strides; copying
/// stops as soon as the next whole copy would not fit, which can leave the
/// tail zeroed. Longer material is truncated. The block only feeds PBKDF2,
/// never AES directly.
fn normalize_key(material: &[u8]) -> [u8; KEY_BLOCK_LEN] {
    let mut block = [0u8; KEY_BLOCK_LEN];
    if material.len() >= KEY_BLOCK_LEN {
        block.copy_from_slice(&material[..KEY_BLOCK_LEN]);
        return block;
    }

    let mut offset = 0;
    while offset + material.len() < KEY_BLOCK_LEN {
        block[offset..offset + material.len()].copy_from_slice(material);
        offset += material.len();
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key_material() {
        let err = AeadCipher::new(b"").expect_err("empty key must fail");
        assert_eq!(err, CipherError::EmptyKey);
    }

    #[test]
    fn round_trips_on_the_same_instance() {
        let cipher = AeadCipher::new(b"settings").expect("cipher");
        for input in [&b""[..], &b"1"[..], &b"hello world"[..], &[0u8; 300][..]] {
            let encoded = cipher.encode(input).expect("encode");
            let decoded = cipher.decode(&encoded).expect("decode");
            assert_eq!(decoded, input);
        }
    }

    #[test]
    fn same_key_material_opens_across_instances() {
        let writer = AeadCipher::new(b"settings").expect("cipher");
        let reader = AeadCipher::new(b"settings").expect("cipher");

        let encoded = writer.encode(b"persisted value").expect("encode");
        let decoded = reader.decode(&encoded).expect("decode");
        assert_eq!(decoded, b"persisted value");
    }

    #[test]
    fn different_key_material_fails_integrity() {
        let writer = AeadCipher::new(b"settings").expect("cipher");
        let reader = AeadCipher::new(b"other-store").expect("cipher");

        let encoded = writer.encode(b"secret").expect("encode");
        let err = reader.decode(&encoded).expect_err("wrong key must fail");
        assert_eq!(err, CipherError::Integrity);
    }

    #[test]
    fn tampered_ciphertext_fails_integrity() {
        let cipher = AeadCipher::new(b"settings").expect("cipher");
        let encoded = cipher.encode(b"secret").expect("encode");

        let mut sealed = STANDARD.decode(&encoded).expect("base64");
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        let tampered = STANDARD.encode(sealed).into_bytes();

        let err = cipher.decode(&tampered).expect_err("tamper must fail");
        assert_eq!(err, CipherError::Integrity);
    }

    #[test]
    fn truncated_input_fails_integrity() {
        let cipher = AeadCipher::new(b"settings").expect("cipher");
        let short = STANDARD.encode([0u8; 4]).into_bytes();
        assert_eq!(
            cipher.decode(&short).expect_err("too short"),
            CipherError::Integrity
        );
    }

    #[test]
    fn non_base64_input_is_malformed() {
        let cipher = AeadCipher::new(b"settings").expect("cipher");
        let err = cipher.decode(b"%%%not-base64%%%").expect_err("bad base64");
        assert!(matches!(err, CipherError::Malformed { .. }));
    }

    #[test]
    fn normalize_tiles_whole_copies_and_leaves_zero_tail() {
        let material = [0xABu8; 100];
        let block = normalize_key(&material);
        assert_eq!(&block[..100], &material[..]);
        assert_eq!(&block[100..200], &material[..]);
        // third copy would run past the block, so the tail stays zeroed
        assert!(block[200..].iter().all(|&b| b == 0));
    }

    #[test]
    fn normalize_truncates_long_material() {
        let material: Vec<u8> = (0..400).map(|i| (i % 256) as u8).collect();
        let block = normalize_key(&material);
        assert_eq!(&block[..], &material[..KEY_BLOCK_LEN]);
    }
}
