// Copyright 2016 Pierre-Étienne Meunier
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
use crate::cert::Certificate;
use crate::encoding::{Encoding, Position, Reader};
pub use crate::algorithm::{KeyType, SignatureHash};
#[cfg(feature = "pq")]
use crate::pq::{OqsKeyPair, OqsPublicKey};
pub use crate::signature::*;
use crate::Error;
#[cfg(feature = "openssl")]
use openssl::bn::BigNum;
#[cfg(feature = "openssl")]
use openssl::dsa::Dsa;
#[cfg(feature = "openssl")]
use openssl::ec::{EcGroup, EcKey, EcPoint, PointConversionForm};
#[cfg(feature = "openssl")]
use openssl::nid::Nid;
#[cfg(feature = "openssl")]
use openssl::pkey::{PKey, Private, Public};
#[cfg(feature = "openssl")]
use openssl::rsa::Rsa;
use rand::rngs::OsRng;
use std::convert::TryInto;
use zeroize::Zeroize;

impl SignatureHash {
    #[cfg(feature = "openssl")]
    pub(crate) fn to_message_digest(&self) -> Option<openssl::hash::MessageDigest> {
        use openssl::hash::MessageDigest;
        match *self {
            SignatureHash::SHA1 => Some(MessageDigest::sha1()),
            SignatureHash::SHA2_256 => Some(MessageDigest::sha256()),
            SignatureHash::SHA2_384 => Some(MessageDigest::sha384()),
            SignatureHash::SHA2_512 => Some(MessageDigest::sha512()),
            SignatureHash::Auto => None,
        }
    }
}

/// A NIST curve usable for SSH ECDSA keys.
#[cfg(feature = "openssl")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    NistP256,
    NistP384,
    NistP521,
}

#[cfg(feature = "openssl")]
impl EcCurve {
    /// The curve identifier carried inside ECDSA key and signature blobs.
    pub fn identifier(self) -> &'static str {
        match self {
            EcCurve::NistP256 => "nistp256",
            EcCurve::NistP384 => "nistp384",
            EcCurve::NistP521 => "nistp521",
        }
    }

    pub fn from_identifier(ident: &[u8]) -> Option<EcCurve> {
        match ident {
            b"nistp256" => Some(EcCurve::NistP256),
            b"nistp384" => Some(EcCurve::NistP384),
            b"nistp521" => Some(EcCurve::NistP521),
            _ => None,
        }
    }

    pub fn key_type(self) -> KeyType {
        match self {
            EcCurve::NistP256 => KeyType::EcdsaP256,
            EcCurve::NistP384 => KeyType::EcdsaP384,
            EcCurve::NistP521 => KeyType::EcdsaP521,
        }
    }

    /// The curve of the (classical half of the) given key type.
    pub fn from_key_type(t: KeyType) -> Option<EcCurve> {
        match t {
            KeyType::EcdsaP256 | KeyType::EcdsaP256Cert | KeyType::SkEcdsa
            | KeyType::SkEcdsaCert => Some(EcCurve::NistP256),
            KeyType::EcdsaP384 | KeyType::EcdsaP384Cert => Some(EcCurve::NistP384),
            KeyType::EcdsaP521 | KeyType::EcdsaP521Cert => Some(EcCurve::NistP521),
            #[cfg(feature = "pq")]
            KeyType::P256Dilithium2 | KeyType::P256Falcon512 => Some(EcCurve::NistP256),
            #[cfg(feature = "pq")]
            KeyType::P384Dilithium3 => Some(EcCurve::NistP384),
            #[cfg(feature = "pq")]
            KeyType::P521Falcon1024 => Some(EcCurve::NistP521),
            _ => None,
        }
    }

    pub(crate) fn nid(self) -> Nid {
        match self {
            EcCurve::NistP256 => Nid::X9_62_PRIME256V1,
            EcCurve::NistP384 => Nid::SECP384R1,
            EcCurve::NistP521 => Nid::SECP521R1,
        }
    }

    pub(crate) fn from_nid(nid: Nid) -> Option<EcCurve> {
        match nid {
            Nid::X9_62_PRIME256V1 => Some(EcCurve::NistP256),
            Nid::SECP384R1 => Some(EcCurve::NistP384),
            Nid::SECP521R1 => Some(EcCurve::NistP521),
            _ => None,
        }
    }

    /// The digest bound to this curve by RFC 5656.
    pub fn hash(self) -> SignatureHash {
        match self {
            EcCurve::NistP256 => SignatureHash::SHA2_256,
            EcCurve::NistP384 => SignatureHash::SHA2_384,
            EcCurve::NistP521 => SignatureHash::SHA2_512,
        }
    }

    pub(crate) fn group(self) -> Result<EcGroup, Error> {
        Ok(EcGroup::from_curve_name(self.nid())?)
    }
}

/// A public key from OpenSSL.
#[cfg(feature = "openssl")]
#[derive(Clone)]
pub struct OpenSSLPKey(pub openssl::pkey::PKey<Public>);

#[cfg(feature = "openssl")]
impl PartialEq for OpenSSLPKey {
    fn eq(&self, b: &OpenSSLPKey) -> bool {
        self.0.public_eq(&b.0)
    }
}
#[cfg(feature = "openssl")]
impl Eq for OpenSSLPKey {}
#[cfg(feature = "openssl")]
impl std::fmt::Debug for OpenSSLPKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "OpenSSLPKey {{ (hidden) }}")
    }
}

/// Public key
#[derive(Debug, Clone)]
pub enum PublicKey {
    #[doc(hidden)]
    Ed25519(ed25519_dalek::VerifyingKey),
    #[doc(hidden)]
    #[cfg(feature = "openssl")]
    RSA {
        key: OpenSSLPKey,
        hash: SignatureHash,
    },
    #[doc(hidden)]
    #[cfg(feature = "openssl")]
    DSA { key: OpenSSLPKey },
    #[doc(hidden)]
    #[cfg(feature = "openssl")]
    ECDSA { key: OpenSSLPKey, curve: EcCurve },
    /// A FIDO/U2F-backed Ed25519 key, bound to its application string.
    SkEd25519 {
        key: ed25519_dalek::VerifyingKey,
        application: String,
    },
    /// A FIDO/U2F-backed ECDSA key, bound to its application string.
    #[cfg(feature = "openssl")]
    SkEcdsa {
        key: OpenSSLPKey,
        curve: EcCurve,
        application: String,
    },
    /// An OpenSSH certificate; the embedded public key is materialized
    /// inside.
    Cert(Box<Certificate>),
    #[cfg(feature = "pq")]
    Oqs(OqsPublicKey),
    #[cfg(all(feature = "pq", feature = "openssl"))]
    Hybrid {
        key_type: KeyType,
        classical: Box<PublicKey>,
        oqs: OqsPublicKey,
    },
}

impl PartialEq for PublicKey {
    fn eq(&self, b: &PublicKey) -> bool {
        match (self, b) {
            (PublicKey::Ed25519(a), PublicKey::Ed25519(b)) => a == b,
            #[cfg(feature = "openssl")]
            (PublicKey::RSA { key: a, .. }, PublicKey::RSA { key: b, .. }) => a == b,
            #[cfg(feature = "openssl")]
            (PublicKey::DSA { key: a }, PublicKey::DSA { key: b }) => a == b,
            #[cfg(feature = "openssl")]
            (
                PublicKey::ECDSA { key: a, curve: ca },
                PublicKey::ECDSA { key: b, curve: cb },
            ) => ca == cb && a == b,
            (
                PublicKey::SkEd25519 {
                    key: a,
                    application: aa,
                },
                PublicKey::SkEd25519 {
                    key: b,
                    application: ab,
                },
            ) => a == b && aa == ab,
            #[cfg(feature = "openssl")]
            (
                PublicKey::SkEcdsa {
                    key: a,
                    curve: ca,
                    application: aa,
                },
                PublicKey::SkEcdsa {
                    key: b,
                    curve: cb,
                    application: ab,
                },
            ) => ca == cb && a == b && aa == ab,
            (PublicKey::Cert(a), PublicKey::Cert(b)) => a.blob() == b.blob(),
            #[cfg(feature = "pq")]
            (PublicKey::Oqs(a), PublicKey::Oqs(b)) => a == b,
            #[cfg(all(feature = "pq", feature = "openssl"))]
            (
                PublicKey::Hybrid {
                    key_type: ta,
                    classical: ca,
                    oqs: oa,
                },
                PublicKey::Hybrid {
                    key_type: tb,
                    classical: cb,
                    oqs: ob,
                },
            ) => ta == tb && ca == cb && oa == ob,
            _ => false,
        }
    }
}
impl Eq for PublicKey {}

impl PublicKey {
    /// Parse a public key in SSH format, checking it against the announced
    /// algorithm.
    pub fn parse(algo: &[u8], pubkey: &[u8]) -> Result<Self, Error> {
        let algo_str =
            std::str::from_utf8(algo).map_err(|_| Error::UnsupportedKeyType(algo.to_vec()))?;
        let t = KeyType::from_signature_name(algo_str);
        let mut key = parse_public_key(pubkey)?;
        if t.plain() != key.key_type().plain() {
            return Err(Error::CouldNotReadKey);
        }
        key.set_algorithm(algo);
        Ok(key)
    }

    /// Algorithm name for that key, hash-qualified for RSA.
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "openssl")]
            PublicKey::RSA { hash, .. } => {
                KeyType::Rsa.signature_name(*hash).unwrap_or("ssh-rsa")
            }
            PublicKey::Cert(cert) => cert.name(),
            _ => self.key_type().name().unwrap_or("unknown"),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Ed25519(_) => KeyType::Ed25519,
            #[cfg(feature = "openssl")]
            PublicKey::RSA { .. } => KeyType::Rsa,
            #[cfg(feature = "openssl")]
            PublicKey::DSA { .. } => KeyType::Dss,
            #[cfg(feature = "openssl")]
            PublicKey::ECDSA { curve, .. } => curve.key_type(),
            PublicKey::SkEd25519 { .. } => KeyType::SkEd25519,
            #[cfg(feature = "openssl")]
            PublicKey::SkEcdsa { .. } => KeyType::SkEcdsa,
            PublicKey::Cert(cert) => cert.key_type(),
            #[cfg(feature = "pq")]
            PublicKey::Oqs(k) => k.key_type,
            #[cfg(all(feature = "pq", feature = "openssl"))]
            PublicKey::Hybrid { key_type, .. } => *key_type,
        }
    }

    /// Select the RSA digest announced by a signature-algorithm name.
    pub fn set_algorithm(&mut self, algorithm: &[u8]) {
        #[cfg(feature = "openssl")]
        {
            if let PublicKey::RSA { ref mut hash, .. } = self {
                if algorithm == b"rsa-sha2-512" {
                    *hash = SignatureHash::SHA2_512
                } else if algorithm == b"rsa-sha2-256" {
                    *hash = SignatureHash::SHA2_256
                } else if algorithm == b"ssh-rsa" {
                    *hash = SignatureHash::SHA1
                }
            }
        }
        #[cfg(not(feature = "openssl"))]
        {
            let _ = algorithm;
        }
    }

    /// Compute the key fingerprint, hashed with sha2-256.
    pub fn fingerprint(&self) -> String {
        use crate::PublicKeyBase64;
        use sha2::{Digest, Sha256};
        let key = self.public_key_bytes();
        let mut hasher = Sha256::new();
        hasher.update(&key[..]);
        data_encoding::BASE64_NOPAD.encode(&hasher.finalize())
    }

    /// Serialize the algorithm-specific components, without the leading
    /// identifier string. Certificates serialize as their whole blob and
    /// must not reach this.
    pub(crate) fn write_components(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            PublicKey::Ed25519(key) => {
                buf.extend_ssh_string(key.as_bytes());
            }
            #[cfg(feature = "openssl")]
            PublicKey::RSA { key, .. } => {
                let rsa = key.0.rsa()?;
                buf.extend_ssh_mpint(&rsa.e().to_vec());
                buf.extend_ssh_mpint(&rsa.n().to_vec());
            }
            #[cfg(feature = "openssl")]
            PublicKey::DSA { key } => {
                let dsa = key.0.dsa()?;
                buf.extend_ssh_mpint(&dsa.p().to_vec());
                buf.extend_ssh_mpint(&dsa.q().to_vec());
                buf.extend_ssh_mpint(&dsa.g().to_vec());
                buf.extend_ssh_mpint(&dsa.pub_key().to_vec());
            }
            #[cfg(feature = "openssl")]
            PublicKey::ECDSA { key, curve } => {
                write_ec_point(&key.0, *curve, buf)?;
            }
            PublicKey::SkEd25519 { key, application } => {
                buf.extend_ssh_string(key.as_bytes());
                buf.extend_ssh_string(application.as_bytes());
            }
            #[cfg(feature = "openssl")]
            PublicKey::SkEcdsa {
                key,
                curve,
                application,
            } => {
                write_ec_point(&key.0, *curve, buf)?;
                buf.extend_ssh_string(application.as_bytes());
            }
            PublicKey::Cert(_) => return Err(Error::CouldNotReadKey),
            #[cfg(feature = "pq")]
            PublicKey::Oqs(k) => {
                buf.extend_ssh_string(k.as_bytes());
            }
            #[cfg(all(feature = "pq", feature = "openssl"))]
            PublicKey::Hybrid { classical, oqs, .. } => {
                classical.write_components(buf)?;
                buf.extend_ssh_string(oqs.as_bytes());
            }
        }
        Ok(())
    }

    /// The full wire blob: identifier string followed by the components,
    /// or the raw certificate blob for certificate keys.
    pub(crate) fn write_blob(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        if let PublicKey::Cert(cert) = self {
            buf.extend_from_slice(cert.blob());
            return Ok(());
        }
        let name = self
            .key_type()
            .name()
            .ok_or_else(|| Error::UnsupportedKeyType(Vec::new()))?;
        buf.extend_ssh_string(name.as_bytes());
        self.write_components(buf)
    }
}

impl crate::PublicKeyBase64 for PublicKey {
    fn public_key_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let _ = self.write_blob(&mut buf);
        buf
    }
}

#[cfg(feature = "openssl")]
fn write_ec_point(key: &PKey<Public>, curve: EcCurve, buf: &mut Vec<u8>) -> Result<(), Error> {
    let ec = key.ec_key()?;
    let mut ctx = openssl::bn::BigNumContext::new()?;
    let q = ec
        .public_key()
        .to_bytes(ec.group(), PointConversionForm::UNCOMPRESSED, &mut ctx)?;
    buf.extend_ssh_string(curve.identifier().as_bytes());
    buf.extend_ssh_string(&q);
    Ok(())
}

/// Parse the algorithm-specific components of a `t`-typed key. `t` must be
/// a plain (non-certificate) type; the identifier string has already been
/// consumed.
pub(crate) fn parse_components(t: KeyType, p: &mut Position) -> Result<PublicKey, Error> {
    match t {
        KeyType::Ed25519 => Ok(PublicKey::Ed25519(read_ed25519_pubkey(p)?)),
        #[cfg(feature = "openssl")]
        KeyType::Rsa => {
            let e = p.read_mpint()?;
            let n = p.read_mpint()?;
            let rsa = Rsa::from_public_components(BigNum::from_slice(n)?, BigNum::from_slice(e)?)?;
            Ok(PublicKey::RSA {
                key: OpenSSLPKey(PKey::from_rsa(rsa)?),
                hash: SignatureHash::SHA1,
            })
        }
        #[cfg(feature = "openssl")]
        KeyType::Dss => {
            let pp = BigNum::from_slice(p.read_mpint()?)?;
            let q = BigNum::from_slice(p.read_mpint()?)?;
            let g = BigNum::from_slice(p.read_mpint()?)?;
            let y = BigNum::from_slice(p.read_mpint()?)?;
            let dsa = Dsa::from_public_components(pp, q, g, y)?;
            Ok(PublicKey::DSA {
                key: OpenSSLPKey(PKey::from_dsa(dsa)?),
            })
        }
        #[cfg(feature = "openssl")]
        KeyType::EcdsaP256 | KeyType::EcdsaP384 | KeyType::EcdsaP521 => {
            let curve = EcCurve::from_key_type(t).ok_or(Error::CouldNotReadKey)?;
            let key = read_ec_pubkey(curve, p)?;
            Ok(PublicKey::ECDSA { key, curve })
        }
        KeyType::SkEd25519 => {
            let key = read_ed25519_pubkey(p)?;
            let application = read_application(p)?;
            Ok(PublicKey::SkEd25519 { key, application })
        }
        #[cfg(feature = "openssl")]
        KeyType::SkEcdsa => {
            let curve = EcCurve::NistP256;
            let key = read_ec_pubkey(curve, p)?;
            let application = read_application(p)?;
            Ok(PublicKey::SkEcdsa {
                key,
                curve,
                application,
            })
        }
        #[cfg(feature = "pq")]
        t if t.is_oqs() && !t.is_hybrid() => {
            let pk = p.read_string()?;
            Ok(PublicKey::Oqs(OqsPublicKey::new(t, pk.to_vec())?))
        }
        #[cfg(all(feature = "pq", feature = "openssl"))]
        t if t.is_hybrid() => {
            let classical = if t.is_rsa_hybrid() {
                parse_components(KeyType::Rsa, p)?
            } else {
                let curve = EcCurve::from_key_type(t).ok_or(Error::CouldNotReadKey)?;
                let key = read_ec_pubkey(curve, p)?;
                PublicKey::ECDSA { key, curve }
            };
            let pk = p.read_string()?;
            Ok(PublicKey::Hybrid {
                key_type: t,
                classical: Box::new(classical),
                oqs: OqsPublicKey::new(t, pk.to_vec())?,
            })
        }
        _ => Err(Error::UnsupportedKeyType(
            t.name().unwrap_or("unknown").as_bytes().to_vec(),
        )),
    }
}

fn read_ed25519_pubkey(p: &mut Position) -> Result<ed25519_dalek::VerifyingKey, Error> {
    let bytes = p.read_string()?;
    let bytes: &[u8; 32] = bytes.try_into().map_err(|_| Error::CouldNotReadKey)?;
    Ok(ed25519_dalek::VerifyingKey::from_bytes(bytes)?)
}

fn read_application(p: &mut Position) -> Result<String, Error> {
    let application = p.read_string()?;
    Ok(std::str::from_utf8(application)
        .map_err(|_| Error::CouldNotReadKey)?
        .to_string())
}

#[cfg(feature = "openssl")]
fn read_ec_pubkey(curve: EcCurve, p: &mut Position) -> Result<OpenSSLPKey, Error> {
    let ident = p.read_string()?;
    if EcCurve::from_identifier(ident) != Some(curve) {
        return Err(Error::CouldNotReadKey);
    }
    let q = p.read_string()?;
    let group = curve.group()?;
    let mut ctx = openssl::bn::BigNumContext::new()?;
    let point = EcPoint::from_bytes(&group, q, &mut ctx)?;
    let ec = EcKey::from_public_key(&group, &point)?;
    Ok(OpenSSLPKey(PKey::from_ec_key(ec)?))
}

/// Parse a public key from a byte slice.
pub fn parse_public_key(p: &[u8]) -> Result<PublicKey, Error> {
    let mut pos = p.reader(0);
    let t = pos.read_string()?;
    let name = std::str::from_utf8(t).map_err(|_| Error::UnsupportedKeyType(t.to_vec()))?;
    let kt = KeyType::from_signature_name(name);
    match kt {
        KeyType::Unknown | KeyType::Rsa1 | KeyType::Ecdsa => {
            return Err(Error::UnsupportedKeyType(t.to_vec()))
        }
        _ => {}
    }
    if kt.is_cert() {
        return Ok(PublicKey::Cert(Box::new(Certificate::parse(p)?)));
    }
    let mut key = parse_components(kt.plain(), &mut pos)?;
    key.set_algorithm(t);
    Ok(key)
}

/// A secret key and, optionally, the certificate attached to it.
pub struct KeyPair {
    pub(crate) key: KeyPairData,
    pub(crate) certificate: Option<Certificate>,
}

/// Secret key material.
pub enum KeyPairData {
    Ed25519(ed25519_dalek::SigningKey),
    #[cfg(feature = "openssl")]
    RSA {
        key: Rsa<Private>,
        hash: SignatureHash,
    },
    #[cfg(feature = "openssl")]
    DSA { key: Dsa<Private> },
    #[cfg(feature = "openssl")]
    ECDSA { key: EcKey<Private>, curve: EcCurve },
    #[cfg(feature = "pq")]
    Oqs(OqsKeyPair),
    #[cfg(all(feature = "pq", feature = "openssl"))]
    Hybrid {
        key_type: KeyType,
        classical: Box<KeyPairData>,
        oqs: OqsKeyPair,
    },
}

impl std::fmt::Debug for KeyPairData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            KeyPairData::Ed25519(key) => write!(
                f,
                "Ed25519 {{ public: {:?}, secret: (hidden) }}",
                key.verifying_key().as_bytes()
            ),
            #[cfg(feature = "openssl")]
            KeyPairData::RSA { .. } => write!(f, "RSA {{ (hidden) }}"),
            #[cfg(feature = "openssl")]
            KeyPairData::DSA { .. } => write!(f, "DSA {{ (hidden) }}"),
            #[cfg(feature = "openssl")]
            KeyPairData::ECDSA { curve, .. } => write!(f, "ECDSA {{ {:?}, (hidden) }}", curve),
            #[cfg(feature = "pq")]
            KeyPairData::Oqs(k) => k.fmt(f),
            #[cfg(all(feature = "pq", feature = "openssl"))]
            KeyPairData::Hybrid { key_type, .. } => {
                write!(f, "Hybrid {{ {:?}, (hidden) }}", key_type)
            }
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.key.fmt(f)
    }
}

impl From<KeyPairData> for KeyPair {
    fn from(key: KeyPairData) -> KeyPair {
        KeyPair {
            key,
            certificate: None,
        }
    }
}

impl KeyPair {
    pub fn data(&self) -> &KeyPairData {
        &self.key
    }

    pub fn key_type(&self) -> KeyType {
        self.key.key_type()
    }

    /// Name of this key algorithm, hash-qualified for RSA.
    pub fn name(&self) -> &'static str {
        match &self.key {
            #[cfg(feature = "openssl")]
            KeyPairData::RSA { hash, .. } => {
                KeyType::Rsa.signature_name(*hash).unwrap_or("ssh-rsa")
            }
            _ => self.key_type().name().unwrap_or("unknown"),
        }
    }

    /// The certificate attached to this key, if any.
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Attach a certificate to this private key. Fails if one is attached
    /// already.
    pub fn set_certificate(&mut self, certificate: Certificate) -> Result<(), Error> {
        if self.certificate.is_some() {
            return Err(Error::CertificateAlreadySet);
        }
        self.certificate = Some(certificate);
        Ok(())
    }

    /// Copy the public key of this algorithm.
    pub fn clone_public_key(&self) -> Result<PublicKey, Error> {
        self.key.public_key()
    }

    /// Generate a key pair. `bits` selects the modulus size for RSA and
    /// DSA; for the deprecated generic ECDSA type it selects the curve;
    /// everything else ignores it.
    pub fn generate(t: KeyType, bits: usize) -> Result<KeyPair, Error> {
        Ok(KeyPair::from(KeyPairData::generate(t, bits)?))
    }

    /// Generate a key pair.
    pub fn generate_ed25519() -> Option<Self> {
        Some(KeyPair::from(KeyPairData::Ed25519(
            ed25519_dalek::SigningKey::generate(&mut OsRng),
        )))
    }

    #[cfg(feature = "openssl")]
    pub fn generate_rsa(bits: usize, hash: SignatureHash) -> Option<Self> {
        let key = Rsa::generate(bits as u32).ok()?;
        Some(KeyPair::from(KeyPairData::RSA { key, hash }))
    }

    /// Duplicate the key pair, including any attached certificate.
    pub fn try_clone(&self) -> Result<KeyPair, Error> {
        Ok(KeyPair {
            key: self.key.try_clone()?,
            certificate: self.certificate.clone(),
        })
    }

    /// Compare the private halves of two keys.
    pub fn equal_private(&self, other: &KeyPair) -> bool {
        self.key.equal_private(&other.key)
    }
}

impl KeyPairData {
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPairData::Ed25519(_) => KeyType::Ed25519,
            #[cfg(feature = "openssl")]
            KeyPairData::RSA { .. } => KeyType::Rsa,
            #[cfg(feature = "openssl")]
            KeyPairData::DSA { .. } => KeyType::Dss,
            #[cfg(feature = "openssl")]
            KeyPairData::ECDSA { curve, .. } => curve.key_type(),
            #[cfg(feature = "pq")]
            KeyPairData::Oqs(k) => k.key_type,
            #[cfg(all(feature = "pq", feature = "openssl"))]
            KeyPairData::Hybrid { key_type, .. } => *key_type,
        }
    }

    fn generate(t: KeyType, bits: usize) -> Result<KeyPairData, Error> {
        match t {
            KeyType::Ed25519 => Ok(KeyPairData::Ed25519(ed25519_dalek::SigningKey::generate(
                &mut OsRng,
            ))),
            #[cfg(feature = "openssl")]
            KeyType::Rsa => {
                if bits == 0 {
                    return Err(Error::InvalidParameter);
                }
                Ok(KeyPairData::RSA {
                    key: Rsa::generate(bits as u32)?,
                    hash: SignatureHash::SHA2_256,
                })
            }
            #[cfg(feature = "openssl")]
            KeyType::Dss => {
                if bits == 0 {
                    return Err(Error::InvalidParameter);
                }
                Ok(KeyPairData::DSA {
                    key: Dsa::generate(bits as u32)?,
                })
            }
            #[cfg(feature = "openssl")]
            KeyType::EcdsaP256 | KeyType::EcdsaP384 | KeyType::EcdsaP521 => {
                let curve = EcCurve::from_key_type(t).ok_or(Error::InvalidParameter)?;
                let group = curve.group()?;
                Ok(KeyPairData::ECDSA {
                    key: EcKey::generate(&group)?,
                    curve,
                })
            }
            #[cfg(feature = "openssl")]
            KeyType::Ecdsa => {
                let curve = match bits {
                    256 => EcCurve::NistP256,
                    384 => EcCurve::NistP384,
                    521 => EcCurve::NistP521,
                    _ => return Err(Error::InvalidParameter),
                };
                KeyPairData::generate(curve.key_type(), 0)
            }
            #[cfg(feature = "pq")]
            t if t.is_oqs() && !t.is_hybrid() => Ok(KeyPairData::Oqs(OqsKeyPair::generate(t)?)),
            #[cfg(all(feature = "pq", feature = "openssl"))]
            t if t.is_hybrid() => {
                let classical = if t.is_rsa_hybrid() {
                    KeyPairData::RSA {
                        key: Rsa::generate(3072)?,
                        hash: SignatureHash::SHA2_256,
                    }
                } else {
                    let curve = EcCurve::from_key_type(t).ok_or(Error::InvalidParameter)?;
                    KeyPairData::ECDSA {
                        key: EcKey::generate(&curve.group()?)?,
                        curve,
                    }
                };
                Ok(KeyPairData::Hybrid {
                    key_type: t,
                    classical: Box::new(classical),
                    oqs: OqsKeyPair::generate(t)?,
                })
            }
            _ => Err(Error::UnsupportedKeyType(
                t.name().unwrap_or("unknown").as_bytes().to_vec(),
            )),
        }
    }

    pub(crate) fn public_key(&self) -> Result<PublicKey, Error> {
        match self {
            KeyPairData::Ed25519(key) => Ok(PublicKey::Ed25519(key.verifying_key())),
            #[cfg(feature = "openssl")]
            KeyPairData::RSA { key, hash } => {
                let public =
                    Rsa::from_public_components(key.n().to_owned()?, key.e().to_owned()?)?;
                Ok(PublicKey::RSA {
                    key: OpenSSLPKey(PKey::from_rsa(public)?),
                    hash: *hash,
                })
            }
            #[cfg(feature = "openssl")]
            KeyPairData::DSA { key } => {
                let public = Dsa::from_public_components(
                    key.p().to_owned()?,
                    key.q().to_owned()?,
                    key.g().to_owned()?,
                    key.pub_key().to_owned()?,
                )?;
                Ok(PublicKey::DSA {
                    key: OpenSSLPKey(PKey::from_dsa(public)?),
                })
            }
            #[cfg(feature = "openssl")]
            KeyPairData::ECDSA { key, curve } => {
                let public = EcKey::from_public_key(key.group(), key.public_key())?;
                Ok(PublicKey::ECDSA {
                    key: OpenSSLPKey(PKey::from_ec_key(public)?),
                    curve: *curve,
                })
            }
            #[cfg(feature = "pq")]
            KeyPairData::Oqs(k) => Ok(PublicKey::Oqs(k.public())),
            #[cfg(all(feature = "pq", feature = "openssl"))]
            KeyPairData::Hybrid {
                key_type,
                classical,
                oqs,
            } => Ok(PublicKey::Hybrid {
                key_type: *key_type,
                classical: Box::new(classical.public_key()?),
                oqs: oqs.public(),
            }),
        }
    }

    fn try_clone(&self) -> Result<KeyPairData, Error> {
        match self {
            KeyPairData::Ed25519(key) => Ok(KeyPairData::Ed25519(key.clone())),
            #[cfg(feature = "openssl")]
            KeyPairData::RSA { key, hash } => {
                let mut der = key.private_key_to_der()?;
                let key = Rsa::private_key_from_der(&der)?;
                der.zeroize();
                Ok(KeyPairData::RSA { key, hash: *hash })
            }
            #[cfg(feature = "openssl")]
            KeyPairData::DSA { key } => {
                let mut der = key.private_key_to_der()?;
                let key = PKey::private_key_from_der(&der)?.dsa()?;
                der.zeroize();
                Ok(KeyPairData::DSA { key })
            }
            #[cfg(feature = "openssl")]
            KeyPairData::ECDSA { key, curve } => {
                let mut der = key.private_key_to_der()?;
                let key = EcKey::private_key_from_der(&der)?;
                der.zeroize();
                Ok(KeyPairData::ECDSA { key, curve: *curve })
            }
            #[cfg(feature = "pq")]
            KeyPairData::Oqs(k) => Ok(KeyPairData::Oqs(k.clone_pair())),
            #[cfg(all(feature = "pq", feature = "openssl"))]
            KeyPairData::Hybrid {
                key_type,
                classical,
                oqs,
            } => Ok(KeyPairData::Hybrid {
                key_type: *key_type,
                classical: Box::new(classical.try_clone()?),
                oqs: oqs.clone_pair(),
            }),
        }
    }

    fn equal_private(&self, other: &KeyPairData) -> bool {
        match (self, other) {
            (KeyPairData::Ed25519(a), KeyPairData::Ed25519(b)) => {
                a.to_bytes() == b.to_bytes()
            }
            #[cfg(feature = "openssl")]
            (KeyPairData::RSA { key: a, .. }, KeyPairData::RSA { key: b, .. }) => {
                a.n() == b.n() && a.e() == b.e() && a.d() == b.d()
            }
            #[cfg(feature = "openssl")]
            (KeyPairData::DSA { key: a }, KeyPairData::DSA { key: b }) => {
                a.p() == b.p()
                    && a.q() == b.q()
                    && a.g() == b.g()
                    && a.priv_key() == b.priv_key()
            }
            #[cfg(feature = "openssl")]
            (
                KeyPairData::ECDSA { key: a, curve: ca },
                KeyPairData::ECDSA { key: b, curve: cb },
            ) => ca == cb && a.private_key() == b.private_key(),
            #[cfg(feature = "pq")]
            (KeyPairData::Oqs(a), KeyPairData::Oqs(b)) => {
                a.key_type == b.key_type && *a.sk == *b.sk
            }
            #[cfg(all(feature = "pq", feature = "openssl"))]
            (
                KeyPairData::Hybrid {
                    key_type: ta,
                    classical: ca,
                    oqs: oa,
                },
                KeyPairData::Hybrid {
                    key_type: tb,
                    classical: cb,
                    oqs: ob,
                },
            ) => ta == tb && ca.equal_private(cb) && *oa.sk == *ob.sk,
            _ => false,
        }
    }
}
