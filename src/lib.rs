//! SSH key and certificate handling: load, decrypt, generate, save;
//! wire-format public-key/signature blobs; sign and verify.

#[macro_use]
extern crate log;

pub mod algorithm;
pub mod cert;
pub mod encoding;
pub mod format;
pub mod key;
#[cfg(feature = "pq")]
pub mod pq;
pub mod session;
pub mod sign;
pub mod signature;

pub use format::{decode_secret_key, decode_secret_key_with_callback, encode_secret_key};

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("could not read key")]
    CouldNotReadKey,
    #[error("unsupported key type {0:?}")]
    UnsupportedKeyType(Vec<u8>),
    #[error("key is encrypted")]
    KeyIsEncrypted,
    #[error("bad passphrase")]
    BadPassphrase,
    #[error("index out of bounds")]
    IndexOutOfBounds,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("unknown signature type {sig_type:?}")]
    UnknownSignatureType { sig_type: String },
    #[error("signature key mismatch")]
    SignatureKeyMismatch,
    #[error("no session id")]
    NoSessionId,
    #[error("certificate already set")]
    CertificateAlreadySet,
    #[error("FIPS mode disallows this operation")]
    FipsDisallowed,
    #[error("incompatible hash {hash:?} for key type {key_type:?}")]
    IncompatibleHash {
        key_type: algorithm::KeyType,
        hash: algorithm::SignatureHash,
    },
    #[error("key derivation failed")]
    Kdf,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "openssl")]
    #[error(transparent)]
    OpenSsl(#[from] openssl::error::ErrorStack),
    #[error(transparent)]
    Base64(#[from] data_encoding::DecodeError),
    #[error(transparent)]
    BlockMode(#[from] block_modes::BlockModeError),
    #[error(transparent)]
    Ed25519(#[from] ed25519_dalek::ed25519::Error),
}

/// Whether `c` may appear in base64-encoded PEM/OpenSSH body text.
pub(crate) fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '/' || c == '+' || c == '='
}

/// Access to a key's wire-format public-key blob, base64-encoded.
pub trait PublicKeyBase64 {
    fn public_key_bytes(&self) -> Vec<u8>;

    fn public_key_base64(&self) -> String {
        data_encoding::BASE64_NOPAD.encode(&self.public_key_bytes())
    }
}
