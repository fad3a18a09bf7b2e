//! Value transforms applied before anything reaches memory or disk.
//! A closed set of strategies with a fallback chain: AES-256-GCM when it
//! can be keyed, the XOR-stream obfuscator otherwise, plain passthrough as
//! the last resort.

mod aead;
mod stream;

pub use aead::AeadCipher;
pub use stream::StreamCipher;

use smdb_core::{CipherError, LogSink};

/// Active transform for one store. `None` keeps values unencoded and only
/// exists so a cipher failure degrades availability, never crashes the host.
pub enum Cipher {
    None,
    Stream(StreamCipher),
    Aead(AeadCipher),
}

impl Cipher {
    /// Pick the strongest cipher that can be keyed from the given material.
    /// Every attempt and fallback is narrated through the sink; failures
    /// never escape to the caller.
    pub fn select(key_material: &[u8], prefer_aead: bool, log: &dyn LogSink) -> Cipher {
        if prefer_aead {
            log.log("trying to init AES-GCM cipher...");
            match AeadCipher::new(key_material) {
                Ok(cipher) => return Cipher::Aead(cipher),
                Err(err) => log.log(&format!(
                    "!!! AES-GCM cipher init failed ({err}), falling back to stream cipher !!!"
                )),
            }
        }

        log.log("trying to init stream cipher...");
        match StreamCipher::new(key_material) {
            Ok(cipher) => Cipher::Stream(cipher),
            Err(err) => {
                log.log(&format!(
                    "!!! stream cipher init failed ({err}), storing values unencoded !!!"
                ));
                Cipher::None
            }
        }
    }

    pub fn encode(&self, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        match self {
            Cipher::None => Ok(input.to_vec()),
            Cipher::Stream(cipher) => Ok(cipher.encode(input)),
            Cipher::Aead(cipher) => cipher.encode(input),
        }
    }

    pub fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        match self {
            Cipher::None => Ok(input.to_vec()),
            Cipher::Stream(cipher) => cipher.decode(input),
            Cipher::Aead(cipher) => cipher.decode(input),
        }
    }

    /// String convenience over [`encode`](Self::encode). Both concrete
    /// ciphers emit pure-ASCII encodings, so the encoded form is always
    /// valid UTF-8.
    pub fn encode_str(&self, input: &str) -> Result<String, CipherError> {
        let bytes = self.encode(input.as_bytes())?;
        String::from_utf8(bytes).map_err(|_| CipherError::Malformed {
            reason: "encoded form is not valid UTF-8".to_string(),
        })
    }

    /// String convenience over [`decode`](Self::decode).
    pub fn decode_str(&self, input: &str) -> Result<String, CipherError> {
        let bytes = self.decode(input.as_bytes())?;
        String::from_utf8(bytes).map_err(|_| CipherError::Malformed {
            reason: "decoded value is not valid UTF-8".to_string(),
        })
    }
}
