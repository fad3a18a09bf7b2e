use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the value transforms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Key material was empty; nothing can be keyed from it.
    #[error("cipher key material is empty")]
    EmptyKey,
    /// The AEAD backend refused to seal the input.
    #[error("encryption failed: {reason}")]
    Encrypt { reason: String },
    /// Ciphertext failed authentication or was truncated. Surfacing this
    /// loudly is mandatory; returning garbage plaintext is not an option.
    #[error("ciphertext rejected: authentication failed or input truncated")]
    Integrity,
    /// The stored encoding could not be parsed back into bytes.
    #[error("malformed encoded value: {reason}")]
    Malformed { reason: String },
}

/// Errors surfaced by store operations. Per-key I/O failures are swallowed
/// by policy and never appear here; what remains is misuse of the API and
/// cipher failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query rule did not match `OP=value` with a known operator.
    #[error("invalid query rule: {reason}")]
    InvalidRule { reason: String },
    /// Export target must be an existing directory.
    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
    /// The active cipher rejected a value.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_error_converts_into_store_error() {
        let err: StoreError = CipherError::Integrity.into();
        assert!(matches!(err, StoreError::Cipher(CipherError::Integrity)));
    }

    #[test]
    fn not_a_directory_names_the_path() {
        let err = StoreError::NotADirectory {
            path: PathBuf::from("/tmp/somewhere"),
        };
        assert_eq!(err.to_string(), "/tmp/somewhere is not a directory");
    }
}
