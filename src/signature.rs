use crate::algorithm::{hash_for_name, KeyType, SignatureHash};
use crate::encoding::{Encoding, Reader};
#[cfg(feature = "openssl")]
use crate::key::EcCurve;
use crate::Error;
use byteorder::{BigEndian, WriteBytesExt};
use std::fmt;
use zeroize::Zeroize;

pub struct SignatureBytes(pub [u8; 64]);

/// The type of a signature, depending on the algorithm used.
pub enum Signature {
    /// An Ed25519 signature
    Ed25519(SignatureBytes),
    /// An RSA signature
    #[cfg(feature = "openssl")]
    RSA { hash: SignatureHash, bytes: Vec<u8> },
    /// A DSA signature: `r ∥ s`, each padded to 20 bytes.
    #[cfg(feature = "openssl")]
    DSA { bytes: Vec<u8> },
    /// An ECDSA signature: `mpint r ∥ mpint s`.
    #[cfg(feature = "openssl")]
    ECDSA { curve: EcCurve, bytes: Vec<u8> },
    /// A security-key Ed25519 signature with its authenticator state.
    SkEd25519 {
        signature: SignatureBytes,
        flags: u8,
        counter: u32,
    },
    /// A security-key ECDSA signature with its authenticator state.
    #[cfg(feature = "openssl")]
    SkEcdsa {
        bytes: Vec<u8>,
        flags: u8,
        counter: u32,
    },
    /// A pure post-quantum signature. Its blob is the raw signature
    /// bytes, with no identifier.
    #[cfg(feature = "pq")]
    Oqs { key_type: KeyType, bytes: Vec<u8> },
    /// A classical and a post-quantum signature under one identifier.
    #[cfg(all(feature = "pq", feature = "openssl"))]
    Hybrid {
        key_type: KeyType,
        classical: Box<Signature>,
        pq: Vec<u8>,
    },
}

impl Drop for Signature {
    fn drop(&mut self) {
        match self {
            Signature::Ed25519(sig) => sig.0.zeroize(),
            #[cfg(feature = "openssl")]
            Signature::RSA { bytes, .. } => bytes.zeroize(),
            #[cfg(feature = "openssl")]
            Signature::DSA { bytes } => bytes.zeroize(),
            #[cfg(feature = "openssl")]
            Signature::ECDSA { bytes, .. } => bytes.zeroize(),
            Signature::SkEd25519 { signature, .. } => signature.0.zeroize(),
            #[cfg(feature = "openssl")]
            Signature::SkEcdsa { bytes, .. } => bytes.zeroize(),
            #[cfg(feature = "pq")]
            Signature::Oqs { bytes, .. } => bytes.zeroize(),
            #[cfg(all(feature = "pq", feature = "openssl"))]
            Signature::Hybrid { pq, .. } => pq.zeroize(),
        }
    }
}

impl Signature {
    /// The on-the-wire signature-algorithm identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Signature::Ed25519(_) => "ssh-ed25519",
            #[cfg(feature = "openssl")]
            Signature::RSA { hash, .. } => {
                KeyType::Rsa.signature_name(*hash).unwrap_or("ssh-rsa")
            }
            #[cfg(feature = "openssl")]
            Signature::DSA { .. } => "ssh-dss",
            #[cfg(feature = "openssl")]
            Signature::ECDSA { curve, .. } => curve.key_type().name().unwrap_or("unknown"),
            Signature::SkEd25519 { .. } => "sk-ssh-ed25519@openssh.com",
            #[cfg(feature = "openssl")]
            Signature::SkEcdsa { .. } => "sk-ecdsa-sha2-nistp256@openssh.com",
            #[cfg(feature = "pq")]
            Signature::Oqs { key_type, .. } => key_type.name().unwrap_or("unknown"),
            #[cfg(all(feature = "pq", feature = "openssl"))]
            Signature::Hybrid { key_type, .. } => key_type.name().unwrap_or("unknown"),
        }
    }

    /// The key type this signature was made with.
    pub fn key_type(&self) -> KeyType {
        match self {
            Signature::Ed25519(_) => KeyType::Ed25519,
            #[cfg(feature = "openssl")]
            Signature::RSA { .. } => KeyType::Rsa,
            #[cfg(feature = "openssl")]
            Signature::DSA { .. } => KeyType::Dss,
            #[cfg(feature = "openssl")]
            Signature::ECDSA { curve, .. } => curve.key_type(),
            Signature::SkEd25519 { .. } => KeyType::SkEd25519,
            #[cfg(feature = "openssl")]
            Signature::SkEcdsa { .. } => KeyType::SkEcdsa,
            #[cfg(feature = "pq")]
            Signature::Oqs { key_type, .. } => *key_type,
            #[cfg(all(feature = "pq", feature = "openssl"))]
            Signature::Hybrid { key_type, .. } => *key_type,
        }
    }

    /// The digest this signature binds.
    pub fn hash(&self) -> SignatureHash {
        match self {
            Signature::Ed25519(_) | Signature::SkEd25519 { .. } => SignatureHash::Auto,
            #[cfg(feature = "openssl")]
            Signature::RSA { hash, .. } => *hash,
            #[cfg(feature = "openssl")]
            Signature::DSA { .. } => SignatureHash::SHA1,
            #[cfg(feature = "openssl")]
            Signature::ECDSA { curve, .. } => curve.hash(),
            #[cfg(feature = "openssl")]
            Signature::SkEcdsa { .. } => SignatureHash::SHA2_256,
            #[cfg(feature = "pq")]
            Signature::Oqs { .. } => SignatureHash::Auto,
            #[cfg(all(feature = "pq", feature = "openssl"))]
            Signature::Hybrid { key_type, .. } => key_type.default_hash(),
        }
    }

    /// Serialize to the SSH signature blob.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut blob = Vec::new();
        self.write_blob(&mut blob);
        blob
    }

    pub(crate) fn write_blob(&self, buf: &mut Vec<u8>) {
        match self {
            Signature::Ed25519(sig) => {
                buf.extend_ssh_string(self.name().as_bytes());
                buf.extend_ssh_string(&sig.0);
            }
            #[cfg(feature = "openssl")]
            Signature::RSA { bytes, .. } => {
                buf.extend_ssh_string(self.name().as_bytes());
                buf.extend_ssh_string(bytes);
            }
            #[cfg(feature = "openssl")]
            Signature::DSA { bytes } => {
                buf.extend_ssh_string(self.name().as_bytes());
                buf.extend_ssh_string(bytes);
            }
            #[cfg(feature = "openssl")]
            Signature::ECDSA { bytes, .. } => {
                buf.extend_ssh_string(self.name().as_bytes());
                buf.extend_ssh_string(bytes);
            }
            Signature::SkEd25519 {
                signature,
                flags,
                counter,
            } => {
                buf.extend_ssh_string(self.name().as_bytes());
                buf.extend_ssh_string(&signature.0);
                buf.push(*flags);
                buf.write_u32::<BigEndian>(*counter).unwrap();
            }
            #[cfg(feature = "openssl")]
            Signature::SkEcdsa {
                bytes,
                flags,
                counter,
            } => {
                buf.extend_ssh_string(self.name().as_bytes());
                buf.extend_ssh_string(bytes);
                buf.push(*flags);
                buf.write_u32::<BigEndian>(*counter).unwrap();
            }
            #[cfg(feature = "pq")]
            Signature::Oqs { bytes, .. } => {
                buf.extend_from_slice(bytes);
            }
            #[cfg(all(feature = "pq", feature = "openssl"))]
            Signature::Hybrid { classical, pq, .. } => {
                // The classical half keeps its bare family identifier
                // (ssh-rsa), whatever digest the hybrid algorithm pins.
                let mut inner = Vec::new();
                match &**classical {
                    Signature::RSA { bytes, .. } => {
                        inner.extend_ssh_string(b"ssh-rsa");
                        inner.extend_ssh_string(bytes);
                    }
                    other => other.write_blob(&mut inner),
                }
                buf.extend_ssh_string(&inner);
                buf.extend_ssh_string(pq);
            }
        }
    }

    /// Parse a signature blob produced by a `key_type` key. The key type
    /// is required because pure post-quantum blobs are not
    /// self-describing, and hybrid blobs pin the digest of their
    /// classical half.
    pub fn from_blob(blob: &[u8], key_type: KeyType) -> Result<Signature, Error> {
        let t = key_type.plain();
        #[cfg(feature = "pq")]
        {
            if t.is_oqs() && !t.is_hybrid() {
                return Ok(Signature::Oqs {
                    key_type: t,
                    bytes: blob.to_vec(),
                });
            }
        }
        #[cfg(all(feature = "pq", feature = "openssl"))]
        {
            if t.is_hybrid() {
                let mut r = blob.reader(0);
                let classical_blob = r.read_string()?;
                let pq = r.read_string()?;
                let mut classical = Signature::parse_classical(classical_blob)?;
                // The classical half keeps its family identifier; the
                // digest follows the hybrid algorithm.
                if let Signature::RSA { ref mut hash, .. } = classical {
                    *hash = t.default_hash();
                }
                return Ok(Signature::Hybrid {
                    key_type: t,
                    classical: Box::new(classical),
                    pq: pq.to_vec(),
                });
            }
        }
        Signature::parse_classical(blob)
    }

    fn parse_classical(blob: &[u8]) -> Result<Signature, Error> {
        let mut r = blob.reader(0);
        let typ = r.read_string()?;
        match typ {
            b"ssh-ed25519" => {
                let bytes = r.read_string()?;
                let mut sig = SignatureBytes([0; 64]);
                if bytes.len() != 64 {
                    return Err(Error::CouldNotReadKey);
                }
                sig.0.clone_from_slice(bytes);
                Ok(Signature::Ed25519(sig))
            }
            #[cfg(feature = "openssl")]
            b"ssh-rsa" | b"rsa-sha2-256" | b"rsa-sha2-512" => {
                let name = std::str::from_utf8(typ).unwrap_or("ssh-rsa");
                let bytes = r.read_string()?;
                Ok(Signature::RSA {
                    hash: hash_for_name(name),
                    bytes: bytes.to_vec(),
                })
            }
            #[cfg(feature = "openssl")]
            b"ssh-dss" => {
                let bytes = r.read_string()?;
                if bytes.len() != 40 {
                    return Err(Error::CouldNotReadKey);
                }
                Ok(Signature::DSA {
                    bytes: bytes.to_vec(),
                })
            }
            #[cfg(feature = "openssl")]
            b"ecdsa-sha2-nistp256" | b"ecdsa-sha2-nistp384" | b"ecdsa-sha2-nistp521" => {
                let curve = EcCurve::from_identifier(&typ[b"ecdsa-sha2-".len()..])
                    .ok_or(Error::CouldNotReadKey)?;
                let bytes = r.read_string()?;
                Ok(Signature::ECDSA {
                    curve,
                    bytes: bytes.to_vec(),
                })
            }
            b"sk-ssh-ed25519@openssh.com" => {
                let bytes = r.read_string()?;
                let mut sig = SignatureBytes([0; 64]);
                if bytes.len() != 64 {
                    return Err(Error::CouldNotReadKey);
                }
                sig.0.clone_from_slice(bytes);
                let flags = r.read_byte()?;
                let counter = r.read_u32()?;
                Ok(Signature::SkEd25519 {
                    signature: sig,
                    flags,
                    counter,
                })
            }
            #[cfg(feature = "openssl")]
            b"sk-ecdsa-sha2-nistp256@openssh.com" => {
                let bytes = r.read_string()?;
                let flags = r.read_byte()?;
                let counter = r.read_u32()?;
                Ok(Signature::SkEcdsa {
                    bytes: bytes.to_vec(),
                    flags,
                    counter,
                })
            }
            _ => Err(Error::UnknownSignatureType {
                sig_type: std::str::from_utf8(typ).unwrap_or("").to_string(),
            }),
        }
    }

    pub fn to_base64(&self) -> String {
        let blob = self.to_blob();
        let mut bytes_ = Vec::new();
        bytes_.write_u32::<BigEndian>(blob.len() as u32).unwrap();
        bytes_.extend_from_slice(&blob);
        data_encoding::BASE64_NOPAD.encode(&bytes_[..])
    }

    pub fn from_base64(s: &[u8], key_type: KeyType) -> Result<Self, Error> {
        let bytes_ = data_encoding::BASE64_NOPAD.decode(s)?;
        let mut r = bytes_.reader(0);
        let sig = r.read_string()?;
        Signature::from_blob(sig, key_type)
    }
}

impl AsRef<[u8]> for Signature {
    /// The algorithm-specific signature bytes; the post-quantum half for
    /// hybrids.
    fn as_ref(&self) -> &[u8] {
        match self {
            Signature::Ed25519(signature) => &signature.0,
            #[cfg(feature = "openssl")]
            Signature::RSA { bytes, .. } => &bytes[..],
            #[cfg(feature = "openssl")]
            Signature::DSA { bytes } => &bytes[..],
            #[cfg(feature = "openssl")]
            Signature::ECDSA { bytes, .. } => &bytes[..],
            Signature::SkEd25519 { signature, .. } => &signature.0,
            #[cfg(feature = "openssl")]
            Signature::SkEcdsa { bytes, .. } => &bytes[..],
            #[cfg(feature = "pq")]
            Signature::Oqs { bytes, .. } => &bytes[..],
            #[cfg(all(feature = "pq", feature = "openssl"))]
            Signature::Hybrid { pq, .. } => &pq[..],
        }
    }
}

impl AsRef<[u8]> for SignatureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{:?}", &self.0[..])
    }
}

impl Clone for SignatureBytes {
    fn clone(&self) -> Self {
        let mut result = SignatureBytes([0; 64]);
        result.0.clone_from_slice(&self.0);
        result
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Signature {{ {}, {:?} }}", self.name(), self.hash())
    }
}

impl Clone for Signature {
    fn clone(&self) -> Self {
        match self {
            Signature::Ed25519(sig) => Signature::Ed25519(sig.clone()),
            #[cfg(feature = "openssl")]
            Signature::RSA { hash, bytes } => Signature::RSA {
                hash: *hash,
                bytes: bytes.clone(),
            },
            #[cfg(feature = "openssl")]
            Signature::DSA { bytes } => Signature::DSA {
                bytes: bytes.clone(),
            },
            #[cfg(feature = "openssl")]
            Signature::ECDSA { curve, bytes } => Signature::ECDSA {
                curve: *curve,
                bytes: bytes.clone(),
            },
            Signature::SkEd25519 {
                signature,
                flags,
                counter,
            } => Signature::SkEd25519 {
                signature: signature.clone(),
                flags: *flags,
                counter: *counter,
            },
            #[cfg(feature = "openssl")]
            Signature::SkEcdsa {
                bytes,
                flags,
                counter,
            } => Signature::SkEcdsa {
                bytes: bytes.clone(),
                flags: *flags,
                counter: *counter,
            },
            #[cfg(feature = "pq")]
            Signature::Oqs { key_type, bytes } => Signature::Oqs {
                key_type: *key_type,
                bytes: bytes.clone(),
            },
            #[cfg(all(feature = "pq", feature = "openssl"))]
            Signature::Hybrid {
                key_type,
                classical,
                pq,
            } => Signature::Hybrid {
                key_type: *key_type,
                classical: classical.clone(),
                pq: pq.clone(),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ed25519_blob_roundtrip() {
        let sig = Signature::Ed25519(SignatureBytes([0x5a; 64]));
        let blob = sig.to_blob();
        assert_eq!(&blob[..4], &[0, 0, 0, 11]);
        assert_eq!(&blob[4..15], b"ssh-ed25519");
        let back = Signature::from_blob(&blob, KeyType::Ed25519).unwrap();
        assert_eq!(back.as_ref(), sig.as_ref());
    }

    #[test]
    fn sk_fields_follow_signature() {
        let sig = Signature::SkEd25519 {
            signature: SignatureBytes([1; 64]),
            flags: 0x01,
            counter: 42,
        };
        let blob = sig.to_blob();
        // trailing u8 flags + u32 counter
        assert_eq!(&blob[blob.len() - 5..], &[0x01, 0, 0, 0, 42]);
        match Signature::from_blob(&blob, KeyType::SkEd25519).unwrap() {
            Signature::SkEd25519 { flags, counter, .. } => {
                assert_eq!(flags, 0x01);
                assert_eq!(counter, 42);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_signature_name() {
        use crate::encoding::Encoding;
        let mut blob = Vec::new();
        blob.extend_ssh_string(b"future-algo");
        blob.extend_ssh_string(b"xx");
        match Signature::from_blob(&blob, KeyType::Ed25519) {
            Err(Error::UnknownSignatureType { sig_type }) => {
                assert_eq!(sig_type, "future-algo")
            }
            r => panic!("unexpected: {:?}", r.map(|_| ())),
        }
    }
}
