//! Post-quantum signature mechanisms and the byte-level key material for
//! pure-PQ and hybrid key types. The classical halves of hybrid keys live
//! in [`crate::key`]; this module only knows the PQ component.

use crate::algorithm::KeyType;
use crate::Error;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mechanism {
    Dilithium2,
    Dilithium3,
    Falcon512,
    Falcon1024,
    SphincsSha2128f,
}

/// A post-quantum signature mechanism, named after its liboqs identifier.
/// Key material handed to this type MUST have the declared lengths.
#[derive(Debug, PartialEq, Eq)]
pub struct PqAlgorithm {
    mechanism: Mechanism,
    pub name: &'static str,
}

static DILITHIUM2: PqAlgorithm = PqAlgorithm {
    mechanism: Mechanism::Dilithium2,
    name: "Dilithium2",
};
static DILITHIUM3: PqAlgorithm = PqAlgorithm {
    mechanism: Mechanism::Dilithium3,
    name: "Dilithium3",
};
static FALCON512: PqAlgorithm = PqAlgorithm {
    mechanism: Mechanism::Falcon512,
    name: "Falcon-512",
};
static FALCON1024: PqAlgorithm = PqAlgorithm {
    mechanism: Mechanism::Falcon1024,
    name: "Falcon-1024",
};
static SPHINCS_SHA2_128F: PqAlgorithm = PqAlgorithm {
    mechanism: Mechanism::SphincsSha2128f,
    name: "SPHINCS+-SHA2-128f-simple",
};

macro_rules! dispatch {
    ($mech:expr, $m:ident, $body:expr) => {
        match $mech {
            Mechanism::Dilithium2 => {
                use pqcrypto_dilithium::dilithium2 as $m;
                $body
            }
            Mechanism::Dilithium3 => {
                use pqcrypto_dilithium::dilithium3 as $m;
                $body
            }
            Mechanism::Falcon512 => {
                use pqcrypto_falcon::falcon512 as $m;
                $body
            }
            Mechanism::Falcon1024 => {
                use pqcrypto_falcon::falcon1024 as $m;
                $body
            }
            Mechanism::SphincsSha2128f => {
                use pqcrypto_sphincsplus::sphincssha2128fsimple as $m;
                $body
            }
        }
    };
}

impl PqAlgorithm {
    /// The mechanism backing `key_type`'s post-quantum component.
    pub fn from_key_type(key_type: KeyType) -> Option<&'static PqAlgorithm> {
        match key_type {
            KeyType::Dilithium2 | KeyType::Rsa3072Dilithium2 | KeyType::P256Dilithium2 => {
                Some(&DILITHIUM2)
            }
            KeyType::Dilithium3 | KeyType::P384Dilithium3 => Some(&DILITHIUM3),
            KeyType::Falcon512 | KeyType::Rsa3072Falcon512 | KeyType::P256Falcon512 => {
                Some(&FALCON512)
            }
            KeyType::Falcon1024 | KeyType::P521Falcon1024 => Some(&FALCON1024),
            KeyType::SphincsSha2128f => Some(&SPHINCS_SHA2_128F),
            _ => None,
        }
    }

    pub fn public_key_len(&self) -> usize {
        dispatch!(self.mechanism, m, m::public_key_bytes())
    }

    pub fn secret_key_len(&self) -> usize {
        dispatch!(self.mechanism, m, m::secret_key_bytes())
    }

    /// Upper bound; Falcon signatures are variable-length.
    pub fn max_signature_len(&self) -> usize {
        dispatch!(self.mechanism, m, m::signature_bytes())
    }

    fn keypair(&self) -> (Vec<u8>, Zeroizing<Vec<u8>>) {
        dispatch!(self.mechanism, m, {
            let (pk, sk) = m::keypair();
            (
                pk.as_bytes().to_vec(),
                Zeroizing::new(sk.as_bytes().to_vec()),
            )
        })
    }

    pub(crate) fn sign(&self, sk: &[u8], msg: &[u8]) -> Result<Vec<u8>, Error> {
        dispatch!(self.mechanism, m, {
            let sk = m::SecretKey::from_bytes(sk).map_err(|_| Error::CouldNotReadKey)?;
            Ok(m::detached_sign(msg, &sk).as_bytes().to_vec())
        })
    }

    pub(crate) fn verify(&self, pk: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), Error> {
        dispatch!(self.mechanism, m, {
            let pk = m::PublicKey::from_bytes(pk).map_err(|_| Error::CouldNotReadKey)?;
            let sig =
                m::DetachedSignature::from_bytes(sig).map_err(|_| Error::InvalidSignature)?;
            m::verify_detached_signature(&sig, msg, &pk).map_err(|_| Error::InvalidSignature)
        })
    }
}

/// Public half of a post-quantum component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OqsPublicKey {
    pub(crate) key_type: KeyType,
    pub(crate) pk: Vec<u8>,
}

impl OqsPublicKey {
    pub fn new(key_type: KeyType, pk: Vec<u8>) -> Result<Self, Error> {
        let alg = PqAlgorithm::from_key_type(key_type).ok_or(Error::CouldNotReadKey)?;
        if pk.len() != alg.public_key_len() {
            return Err(Error::CouldNotReadKey);
        }
        Ok(OqsPublicKey { key_type, pk })
    }

    pub fn algorithm(&self) -> &'static PqAlgorithm {
        // Constructed through `new`, so the mechanism is always known.
        PqAlgorithm::from_key_type(self.key_type).unwrap()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pk
    }

    pub(crate) fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<(), Error> {
        self.algorithm().verify(&self.pk, msg, sig)
    }
}

/// Both halves of a post-quantum component. The secret key is zeroized on
/// drop.
pub struct OqsKeyPair {
    pub(crate) key_type: KeyType,
    pub(crate) pk: Vec<u8>,
    pub(crate) sk: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for OqsKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "OqsKeyPair {{ {}, secret: (hidden) }}",
            self.algorithm().name
        )
    }
}

impl OqsKeyPair {
    pub fn new(key_type: KeyType, pk: Vec<u8>, sk: Vec<u8>) -> Result<Self, Error> {
        let alg = PqAlgorithm::from_key_type(key_type).ok_or(Error::CouldNotReadKey)?;
        if pk.len() != alg.public_key_len() || sk.len() != alg.secret_key_len() {
            return Err(Error::CouldNotReadKey);
        }
        Ok(OqsKeyPair {
            key_type,
            pk,
            sk: Zeroizing::new(sk),
        })
    }

    pub fn generate(key_type: KeyType) -> Result<Self, Error> {
        let alg = PqAlgorithm::from_key_type(key_type).ok_or(Error::CouldNotReadKey)?;
        let (pk, sk) = alg.keypair();
        Ok(OqsKeyPair { key_type, pk, sk })
    }

    pub fn algorithm(&self) -> &'static PqAlgorithm {
        PqAlgorithm::from_key_type(self.key_type).unwrap()
    }

    pub fn public(&self) -> OqsPublicKey {
        OqsPublicKey {
            key_type: self.key_type,
            pk: self.pk.clone(),
        }
    }

    pub(crate) fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, Error> {
        self.algorithm().sign(&self.sk, msg)
    }

    pub(crate) fn clone_pair(&self) -> OqsKeyPair {
        OqsKeyPair {
            key_type: self.key_type,
            pk: self.pk.clone(),
            sk: Zeroizing::new(self.sk.to_vec()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn declared_lengths_enforced() {
        let pair = OqsKeyPair::generate(KeyType::Dilithium2).unwrap();
        assert_eq!(pair.pk.len(), DILITHIUM2.public_key_len());
        assert_eq!(pair.sk.len(), DILITHIUM2.secret_key_len());
        assert!(OqsPublicKey::new(KeyType::Dilithium2, vec![0; 3]).is_err());
    }

    #[test]
    fn sign_verify_roundtrip() {
        let pair = OqsKeyPair::generate(KeyType::Falcon512).unwrap();
        let sig = pair.sign(b"hello").unwrap();
        assert!(sig.len() <= FALCON512.max_signature_len());
        pair.public().verify(b"hello", &sig).unwrap();
        assert!(pair.public().verify(b"hellp", &sig).is_err());
    }
}
