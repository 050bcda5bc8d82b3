//! Key-algorithm registry: identifier strings, digest selection, and the
//! certificate/plain/security-key/post-quantum classification of every
//! supported algorithm, driven off one static table.

use serde::{Deserialize, Serialize};

/// The hash function used for hashing buffers.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum SignatureHash {
    /// SHA1
    SHA1,
    /// SHA2, 256 bits.
    SHA2_256,
    /// SHA2, 384 bits.
    SHA2_384,
    /// SHA2, 512 bits.
    SHA2_512,
    /// The algorithm hashes internally (Ed25519, pure post-quantum).
    Auto,
}

impl SignatureHash {
    /// Output length in bytes, 0 for `Auto`.
    pub fn digest_len(&self) -> usize {
        match *self {
            SignatureHash::SHA1 => 20,
            SignatureHash::SHA2_256 => 32,
            SignatureHash::SHA2_384 => 48,
            SignatureHash::SHA2_512 => 64,
            SignatureHash::Auto => 0,
        }
    }
}

/// A key algorithm, including certificate, security-key and (with the
/// `pq` feature) post-quantum and hybrid variants.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum KeyType {
    Dss,
    Rsa,
    /// Legacy SSH-1 RSA. Recognized by name, always rejected on import.
    Rsa1,
    /// Deprecated generic ECDSA tag, kept for legacy identifiers only.
    Ecdsa,
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Ed25519,
    DssCert,
    RsaCert,
    EcdsaP256Cert,
    EcdsaP384Cert,
    EcdsaP521Cert,
    Ed25519Cert,
    SkEcdsa,
    SkEd25519,
    SkEcdsaCert,
    SkEd25519Cert,
    Unknown,
    #[cfg(feature = "pq")]
    Dilithium2,
    #[cfg(feature = "pq")]
    Dilithium3,
    #[cfg(feature = "pq")]
    Falcon512,
    #[cfg(feature = "pq")]
    Falcon1024,
    #[cfg(feature = "pq")]
    SphincsSha2128f,
    #[cfg(feature = "pq")]
    Rsa3072Dilithium2,
    #[cfg(feature = "pq")]
    Rsa3072Falcon512,
    #[cfg(feature = "pq")]
    P256Dilithium2,
    #[cfg(feature = "pq")]
    P256Falcon512,
    #[cfg(feature = "pq")]
    P384Dilithium3,
    #[cfg(feature = "pq")]
    P521Falcon1024,
}

pub(crate) struct AlgorithmInfo {
    pub tag: KeyType,
    pub name: &'static str,
    /// Digest implied by the identifier.
    pub hash: SignatureHash,
    /// Certificate suffix stripped; identity for everything else.
    pub plain: KeyType,
    /// liboqs mechanism name for post-quantum material.
    #[allow(dead_code)]
    pub oqs_name: Option<&'static str>,
}

macro_rules! alg {
    ($tag:ident, $name:expr, $hash:ident) => {
        alg!($tag, $name, $hash, $tag, None)
    };
    ($tag:ident, $name:expr, $hash:ident, $plain:ident) => {
        alg!($tag, $name, $hash, $plain, None)
    };
    ($tag:ident, $name:expr, $hash:ident, $plain:ident, $oqs:expr) => {
        AlgorithmInfo {
            tag: KeyType::$tag,
            name: $name,
            hash: SignatureHash::$hash,
            plain: KeyType::$plain,
            oqs_name: $oqs,
        }
    };
}

static ALGORITHMS: &[AlgorithmInfo] = &[
    alg!(Dss, "ssh-dss", SHA1),
    alg!(Rsa, "ssh-rsa", SHA1),
    alg!(Rsa1, "ssh-rsa1", SHA1),
    alg!(Ecdsa, "ssh-ecdsa", SHA2_256),
    alg!(EcdsaP256, "ecdsa-sha2-nistp256", SHA2_256),
    alg!(EcdsaP384, "ecdsa-sha2-nistp384", SHA2_384),
    alg!(EcdsaP521, "ecdsa-sha2-nistp521", SHA2_512),
    alg!(Ed25519, "ssh-ed25519", Auto),
    alg!(DssCert, "ssh-dss-cert-v01@openssh.com", SHA1, Dss),
    alg!(RsaCert, "ssh-rsa-cert-v01@openssh.com", SHA1, Rsa),
    alg!(
        EcdsaP256Cert,
        "ecdsa-sha2-nistp256-cert-v01@openssh.com",
        SHA2_256,
        EcdsaP256
    ),
    alg!(
        EcdsaP384Cert,
        "ecdsa-sha2-nistp384-cert-v01@openssh.com",
        SHA2_384,
        EcdsaP384
    ),
    alg!(
        EcdsaP521Cert,
        "ecdsa-sha2-nistp521-cert-v01@openssh.com",
        SHA2_512,
        EcdsaP521
    ),
    alg!(Ed25519Cert, "ssh-ed25519-cert-v01@openssh.com", Auto, Ed25519),
    alg!(SkEcdsa, "sk-ecdsa-sha2-nistp256@openssh.com", SHA2_256),
    alg!(SkEd25519, "sk-ssh-ed25519@openssh.com", Auto),
    alg!(
        SkEcdsaCert,
        "sk-ecdsa-sha2-nistp256-cert-v01@openssh.com",
        SHA2_256,
        SkEcdsa
    ),
    alg!(
        SkEd25519Cert,
        "sk-ssh-ed25519-cert-v01@openssh.com",
        Auto,
        SkEd25519
    ),
];

#[cfg(feature = "pq")]
static PQ_ALGORITHMS: &[AlgorithmInfo] = &[
    alg!(Dilithium2, "ssh-dilithium2", Auto, Dilithium2, Some("Dilithium2")),
    alg!(Dilithium3, "ssh-dilithium3", Auto, Dilithium3, Some("Dilithium3")),
    alg!(Falcon512, "ssh-falcon512", Auto, Falcon512, Some("Falcon-512")),
    alg!(Falcon1024, "ssh-falcon1024", Auto, Falcon1024, Some("Falcon-1024")),
    alg!(
        SphincsSha2128f,
        "ssh-sphincssha2128fsimple",
        Auto,
        SphincsSha2128f,
        Some("SPHINCS+-SHA2-128f-simple")
    ),
    alg!(
        Rsa3072Dilithium2,
        "ssh-rsa3072-dilithium2",
        SHA2_256,
        Rsa3072Dilithium2,
        Some("Dilithium2")
    ),
    alg!(
        Rsa3072Falcon512,
        "ssh-rsa3072-falcon512",
        SHA2_256,
        Rsa3072Falcon512,
        Some("Falcon-512")
    ),
    alg!(
        P256Dilithium2,
        "ssh-p256-dilithium2",
        SHA2_256,
        P256Dilithium2,
        Some("Dilithium2")
    ),
    alg!(
        P256Falcon512,
        "ssh-p256-falcon512",
        SHA2_256,
        P256Falcon512,
        Some("Falcon-512")
    ),
    alg!(
        P384Dilithium3,
        "ssh-p384-dilithium3",
        SHA2_384,
        P384Dilithium3,
        Some("Dilithium3")
    ),
    alg!(
        P521Falcon1024,
        "ssh-p521-falcon1024",
        SHA2_512,
        P521Falcon1024,
        Some("Falcon-1024")
    ),
];

pub(crate) fn algorithms() -> impl Iterator<Item = &'static AlgorithmInfo> {
    #[cfg(feature = "pq")]
    {
        ALGORITHMS.iter().chain(PQ_ALGORITHMS.iter())
    }
    #[cfg(not(feature = "pq"))]
    {
        ALGORITHMS.iter()
    }
}

fn info(tag: KeyType) -> Option<&'static AlgorithmInfo> {
    algorithms().find(|i| i.tag == tag)
}

impl KeyType {
    /// Canonical SSH identifier, `None` for [`KeyType::Unknown`].
    pub fn name(self) -> Option<&'static str> {
        info(self).map(|i| i.name)
    }

    /// Resolve an identifier, accepting the legacy aliases `"rsa"`,
    /// `"dsa"`, `"rsa1"`, `"ecdsa"` and `"ssh-ecdsa"`.
    pub fn from_name(name: &str) -> KeyType {
        match name {
            "rsa" => return KeyType::Rsa,
            "dsa" => return KeyType::Dss,
            "rsa1" => return KeyType::Rsa1,
            "ecdsa" => return KeyType::Ecdsa,
            _ => {}
        }
        algorithms()
            .find(|i| i.name == name)
            .map(|i| i.tag)
            .unwrap_or(KeyType::Unknown)
    }

    /// Like [`KeyType::from_name`], but also resolves the RFC 8332
    /// signature-algorithm identifiers to their key type.
    pub fn from_signature_name(name: &str) -> KeyType {
        match name {
            "rsa-sha2-256" | "rsa-sha2-512" => KeyType::Rsa,
            "rsa-sha2-256-cert-v01@openssh.com" | "rsa-sha2-512-cert-v01@openssh.com" => {
                KeyType::RsaCert
            }
            _ => KeyType::from_name(name),
        }
    }

    /// Strip the `-cert-v01@openssh.com` wrapping, if any.
    pub fn plain(self) -> KeyType {
        info(self).map(|i| i.plain).unwrap_or(self)
    }

    pub fn is_cert(self) -> bool {
        self.plain() != self
    }

    /// Whether any part of the key material is post-quantum.
    pub fn is_oqs(self) -> bool {
        #[cfg(feature = "pq")]
        {
            info(self).map(|i| i.oqs_name.is_some()).unwrap_or(false)
        }
        #[cfg(not(feature = "pq"))]
        {
            false
        }
    }

    pub fn is_hybrid(self) -> bool {
        self.is_rsa_hybrid() || self.is_ecdsa_hybrid()
    }

    pub fn is_rsa_hybrid(self) -> bool {
        #[cfg(feature = "pq")]
        {
            matches!(self, KeyType::Rsa3072Dilithium2 | KeyType::Rsa3072Falcon512)
        }
        #[cfg(not(feature = "pq"))]
        {
            false
        }
    }

    pub fn is_ecdsa_hybrid(self) -> bool {
        #[cfg(feature = "pq")]
        {
            matches!(
                self,
                KeyType::P256Dilithium2
                    | KeyType::P256Falcon512
                    | KeyType::P384Dilithium3
                    | KeyType::P521Falcon1024
            )
        }
        #[cfg(not(feature = "pq"))]
        {
            false
        }
    }

    /// Digest implied by the canonical identifier of this type.
    pub fn default_hash(self) -> SignatureHash {
        info(self).map(|i| i.hash).unwrap_or(SignatureHash::Auto)
    }

    /// The on-the-wire signature-algorithm identifier for this key type
    /// signed with `hash`. RSA is the only family whose identifier varies
    /// with the digest.
    pub fn signature_name(self, hash: SignatureHash) -> Option<&'static str> {
        match (self, hash) {
            (KeyType::Rsa, SignatureHash::SHA1) | (KeyType::Rsa, SignatureHash::Auto) => {
                Some("ssh-rsa")
            }
            (KeyType::Rsa, SignatureHash::SHA2_256) => Some("rsa-sha2-256"),
            (KeyType::Rsa, SignatureHash::SHA2_512) => Some("rsa-sha2-512"),
            (KeyType::Rsa, _) => None,
            (KeyType::RsaCert, SignatureHash::SHA1) | (KeyType::RsaCert, SignatureHash::Auto) => {
                Some("ssh-rsa-cert-v01@openssh.com")
            }
            (KeyType::RsaCert, SignatureHash::SHA2_256) => {
                Some("rsa-sha2-256-cert-v01@openssh.com")
            }
            (KeyType::RsaCert, SignatureHash::SHA2_512) => {
                Some("rsa-sha2-512-cert-v01@openssh.com")
            }
            (KeyType::RsaCert, _) => None,
            _ => self.name(),
        }
    }

    /// liboqs mechanism name for the post-quantum component.
    #[cfg(feature = "pq")]
    pub fn oqs_name(self) -> Option<&'static str> {
        info(self).and_then(|i| i.oqs_name)
    }
}

/// Digest implied by a signature-algorithm identifier.
///
/// Unknown identifiers yield [`SignatureHash::Auto`] with a warning.
pub fn hash_for_name(name: &str) -> SignatureHash {
    match name {
        "rsa-sha2-256" | "rsa-sha2-256-cert-v01@openssh.com" => return SignatureHash::SHA2_256,
        "rsa-sha2-512" | "rsa-sha2-512-cert-v01@openssh.com" => return SignatureHash::SHA2_512,
        _ => {}
    }
    if let Some(i) = algorithms().find(|i| i.name == name) {
        i.hash
    } else {
        // TODO promote to a hard error at the next major version bump.
        warn!("unknown signature algorithm {:?}, assuming self-hashing", name);
        SignatureHash::Auto
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_tag_roundtrip() {
        for info in algorithms() {
            assert_eq!(KeyType::from_name(info.name), info.tag, "{}", info.name);
        }
    }

    #[test]
    fn plain_is_idempotent() {
        for info in algorithms() {
            assert_eq!(info.tag.plain().plain(), info.tag.plain());
            assert!(!info.tag.plain().is_cert());
        }
    }

    #[test]
    fn cert_names_carry_suffix() {
        for info in algorithms() {
            assert_eq!(
                info.tag.is_cert(),
                info.name.ends_with("-cert-v01@openssh.com"),
                "{}",
                info.name
            );
        }
    }

    #[test]
    fn legacy_aliases() {
        assert_eq!(KeyType::from_name("rsa"), KeyType::Rsa);
        assert_eq!(KeyType::from_name("dsa"), KeyType::Dss);
        assert_eq!(KeyType::from_name("ssh-ecdsa"), KeyType::Ecdsa);
        assert_eq!(KeyType::from_name("ecdsa"), KeyType::Ecdsa);
        assert_eq!(KeyType::from_name("no-such-algo"), KeyType::Unknown);
    }

    #[test]
    fn signature_names_for_rsa() {
        assert_eq!(KeyType::from_signature_name("rsa-sha2-256"), KeyType::Rsa);
        assert_eq!(KeyType::from_signature_name("rsa-sha2-512"), KeyType::Rsa);
        assert_eq!(KeyType::from_signature_name("ssh-rsa"), KeyType::Rsa);
        assert_eq!(
            KeyType::Rsa.signature_name(SignatureHash::SHA2_512),
            Some("rsa-sha2-512")
        );
        assert_eq!(
            KeyType::Rsa.signature_name(SignatureHash::SHA1),
            Some("ssh-rsa")
        );
        assert_eq!(
            KeyType::RsaCert.signature_name(SignatureHash::SHA2_256),
            Some("rsa-sha2-256-cert-v01@openssh.com")
        );
        assert_eq!(KeyType::Rsa.signature_name(SignatureHash::SHA2_384), None);
    }

    #[test]
    fn digest_table() {
        assert_eq!(hash_for_name("ssh-rsa"), SignatureHash::SHA1);
        assert_eq!(hash_for_name("ssh-dss"), SignatureHash::SHA1);
        assert_eq!(hash_for_name("rsa-sha2-256"), SignatureHash::SHA2_256);
        assert_eq!(hash_for_name("rsa-sha2-512"), SignatureHash::SHA2_512);
        assert_eq!(hash_for_name("ecdsa-sha2-nistp256"), SignatureHash::SHA2_256);
        assert_eq!(hash_for_name("ecdsa-sha2-nistp384"), SignatureHash::SHA2_384);
        assert_eq!(hash_for_name("ecdsa-sha2-nistp521"), SignatureHash::SHA2_512);
        assert_eq!(hash_for_name("ssh-ed25519"), SignatureHash::Auto);
        assert_eq!(
            hash_for_name("sk-ecdsa-sha2-nistp256@openssh.com"),
            SignatureHash::SHA2_256
        );
        assert_eq!(
            hash_for_name("sk-ssh-ed25519@openssh.com"),
            SignatureHash::Auto
        );
        assert_eq!(hash_for_name("made-up-name"), SignatureHash::Auto);
    }
}
