use smdb_core::CipherError;

/// Delimiter between hex groups in the encoded form. Non-secret; it can
/// never collide with a hex digit.
const SPLIT: char = '\u{1b}';

/// Keyed XOR obfuscator. Reversible and deliberately cheap: this is the
/// availability fallback when AES-GCM cannot be keyed, not a security
/// boundary.
#[derive(Debug)]
pub struct StreamCipher {
    key: Vec<u8>,
}

impl StreamCipher {
    pub fn new(key_material: &[u8]) -> Result<Self, CipherError> {
        if key_material.is_empty() {
            return Err(CipherError::EmptyKey);
        }
        Ok(Self {
            key: key_material.to_vec(),
        })
    }

    /// Position- and key-dependent XOR pass. Self-inverse, so encode and
    /// decode share it.
    fn transform(&self, buf: &mut [u8]) {
        for i in 0..buf.len() {
            for (j, &k) in self.key.iter().enumerate() {
                buf[i] ^= k ^ (i as u8) ^ (j as u8);
            }
        }
    }

    /// Transform the input and render it as lowercase hex groups joined by
    /// the split delimiter. Empty input encodes to an empty string.
    pub fn encode(&self, input: &[u8]) -> Vec<u8> {
        let mut buf = input.to_vec();
        self.transform(&mut buf);

        let mut out = String::with_capacity(buf.len() * 3);
        for b in buf {
            out.push_str(&format!("{b:x}"));
            out.push(SPLIT);
        }
        out.pop();
        out.into_bytes()
    }

    pub fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let text = std::str::from_utf8(input).map_err(|_| CipherError::Malformed {
            reason: "encoded form is not valid UTF-8".to_string(),
        })?;

        let mut buf = Vec::with_capacity(text.len() / 2);
        for group in text.split(SPLIT) {
            let b = u8::from_str_radix(group, 16).map_err(|_| CipherError::Malformed {
                reason: format!("bad hex group {group:?}"),
            })?;
            buf.push(b);
        }

        self.transform(&mut buf);
        Ok(buf)
    }
}
