//! OpenSSH `*-cert-v01@openssh.com` certificates. Only the leading type
//! string, nonce and embedded public key are parsed; everything after them
//! (serial, principals, validity, CA signature) is carried verbatim in the
//! stored blob.

use crate::algorithm::KeyType;
use crate::encoding::Reader;
use crate::key::{parse_components, PublicKey};
use crate::Error;

#[derive(Debug, Clone)]
pub struct Certificate {
    key_type: KeyType,
    blob: Vec<u8>,
    key: PublicKey,
}

impl PartialEq for Certificate {
    fn eq(&self, b: &Certificate) -> bool {
        self.blob == b.blob
    }
}
impl Eq for Certificate {}

impl Certificate {
    /// Parse a certificate blob, materializing the embedded public key.
    pub fn parse(blob: &[u8]) -> Result<Certificate, Error> {
        let mut p = blob.reader(0);
        let name = p.read_string()?;
        let name = std::str::from_utf8(name)
            .map_err(|_| Error::UnsupportedKeyType(name.to_vec()))?;
        let key_type = KeyType::from_signature_name(name);
        if !key_type.is_cert() {
            return Err(Error::CouldNotReadKey);
        }
        let _nonce = p.read_string()?;
        let key = parse_components(key_type.plain(), &mut p)?;
        Ok(Certificate {
            key_type,
            blob: blob.to_vec(),
            key,
        })
    }

    /// The certificate algorithm identifier.
    pub fn name(&self) -> &'static str {
        self.key_type.name().unwrap_or("unknown")
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// The public key embedded in the certificate.
    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    /// The serialized certificate, exactly as imported.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }
}

/// Build a syntactically valid, unsigned Ed25519 certificate blob for
/// tests.
#[cfg(test)]
pub(crate) fn fake_ed25519_cert(pubkey: &[u8; 32]) -> Vec<u8> {
    use crate::encoding::Encoding;
    let mut blob = Vec::new();
    blob.extend_ssh_string(b"ssh-ed25519-cert-v01@openssh.com");
    blob.extend_ssh_string(&[0xabu8; 32]); // nonce
    blob.extend_ssh_string(pubkey);
    blob.extend_from_slice(&1u64.to_be_bytes()); // serial
    blob.extend_from_slice(&1u32.to_be_bytes()); // type: user
    blob.extend_ssh_string(b"test-key");
    blob.extend_ssh_string(b""); // principals
    blob.extend_from_slice(&0u64.to_be_bytes()); // valid after
    blob.extend_from_slice(&u64::MAX.to_be_bytes()); // valid before
    blob.extend_ssh_string(b""); // critical options
    blob.extend_ssh_string(b""); // extensions
    blob.extend_ssh_string(b""); // reserved
    blob.extend_ssh_string(b""); // signature key
    blob.extend_ssh_string(b""); // signature
    blob
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoding::Encoding;

    #[test]
    fn parse_ed25519_cert() {
        let key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let public = key.verifying_key();
        let blob = fake_ed25519_cert(public.as_bytes());
        let cert = Certificate::parse(&blob).unwrap();
        assert_eq!(cert.key_type(), KeyType::Ed25519Cert);
        assert_eq!(cert.name(), "ssh-ed25519-cert-v01@openssh.com");
        assert_eq!(cert.public_key(), &PublicKey::Ed25519(public));
        assert_eq!(cert.blob(), &blob[..]);
    }

    #[test]
    fn reject_plain_key_as_cert() {
        let mut blob = Vec::new();
        blob.extend_ssh_string(b"ssh-ed25519");
        blob.extend_ssh_string(&[0u8; 32]);
        assert!(Certificate::parse(&blob).is_err());
    }
}
