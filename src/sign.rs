//! Signing and verification: provider dispatch, hash-compatibility and
//! FIPS policy, session-id binding, the security-key pre-image, and
//! hybrid classical+post-quantum composition.

use crate::algorithm::{KeyType, SignatureHash};
use crate::encoding::Encoding;
#[cfg(feature = "openssl")]
use crate::encoding::Reader;
use crate::key::{KeyPair, KeyPairData, PublicKey};
use crate::session::SshSession;
use crate::signature::{Signature, SignatureBytes};
use crate::Error;
use ed25519_dalek::{Signer, Verifier};
#[cfg(feature = "openssl")]
use openssl::bn::BigNum;
#[cfg(feature = "openssl")]
use openssl::dsa::{Dsa, DsaSig};
#[cfg(feature = "openssl")]
use openssl::ecdsa::EcdsaSig;
#[cfg(feature = "openssl")]
use openssl::pkey::{PKey, Private};
#[cfg(feature = "openssl")]
use openssl::rsa::Rsa;
use zeroize::Zeroize;

/// Check that `hash` may be used with a `t`-typed key, and resolve
/// [`SignatureHash::Auto`] to the effective digest. `fips` additionally
/// rejects SHA1.
pub fn hash_compatible(
    t: KeyType,
    hash: SignatureHash,
    fips: bool,
) -> Result<SignatureHash, Error> {
    let plain = t.plain();
    let effective = match hash {
        SignatureHash::Auto => plain.default_hash(),
        h => h,
    };
    if fips && effective == SignatureHash::SHA1 {
        return Err(Error::FipsDisallowed);
    }
    let ok = match plain {
        KeyType::Rsa => matches!(
            effective,
            SignatureHash::SHA1 | SignatureHash::SHA2_256 | SignatureHash::SHA2_512
        ),
        KeyType::Dss => effective == SignatureHash::SHA1,
        KeyType::Ed25519 | KeyType::SkEd25519 => effective == SignatureHash::Auto,
        KeyType::EcdsaP256 | KeyType::EcdsaP384 | KeyType::EcdsaP521 | KeyType::SkEcdsa => {
            effective == plain.default_hash()
        }
        #[cfg(feature = "pq")]
        t if t.is_oqs() => effective == plain.default_hash(),
        _ => false,
    };
    if ok {
        Ok(effective)
    } else {
        Err(Error::IncompatibleHash {
            key_type: t,
            hash,
        })
    }
}

/// The data a security-key authenticator actually signs:
/// `SHA256(application) ∥ flags ∥ counter ∥ SHA256(message)`.
pub fn sk_signed_data(application: &str, flags: u8, counter: u32, data: &[u8]) -> Vec<u8> {
    use sha2::{Digest, Sha256};
    let mut msg = Vec::with_capacity(69);
    msg.extend_from_slice(&Sha256::digest(application.as_bytes()));
    msg.push(flags);
    msg.extend_from_slice(&counter.to_be_bytes());
    msg.extend_from_slice(&Sha256::digest(data));
    msg
}

impl KeyPair {
    /// Sign a slice using this algorithm and its default digest.
    pub fn sign_detached(&self, to_sign: &[u8]) -> Result<Signature, Error> {
        let hash = match &self.key {
            #[cfg(feature = "openssl")]
            KeyPairData::RSA { hash, .. } => *hash,
            _ => SignatureHash::Auto,
        };
        self.sign_detached_with_hash(to_sign, hash)
    }

    /// Sign a slice with an explicit digest.
    pub fn sign_detached_with_hash(
        &self,
        to_sign: &[u8],
        hash: SignatureHash,
    ) -> Result<Signature, Error> {
        let effective = hash_compatible(self.key_type(), hash, false)?;
        self.key.sign(to_sign, effective)
    }
}

impl KeyPairData {
    fn sign(&self, to_sign: &[u8], hash: SignatureHash) -> Result<Signature, Error> {
        match self {
            KeyPairData::Ed25519(secret) => Ok(Signature::Ed25519(SignatureBytes(
                secret.sign(to_sign).to_bytes(),
            ))),
            #[cfg(feature = "openssl")]
            KeyPairData::RSA { key, .. } => Ok(Signature::RSA {
                bytes: rsa_signature(&hash, key, to_sign)?,
                hash,
            }),
            #[cfg(feature = "openssl")]
            KeyPairData::DSA { key } => Ok(Signature::DSA {
                bytes: dsa_signature(key, to_sign)?,
            }),
            #[cfg(feature = "openssl")]
            KeyPairData::ECDSA { key, curve } => {
                let digest = message_digest(curve.hash(), to_sign)?;
                let sig = EcdsaSig::sign(&digest, key)?;
                let mut bytes = Vec::new();
                bytes.extend_ssh_mpint(&sig.r().to_vec());
                bytes.extend_ssh_mpint(&sig.s().to_vec());
                Ok(Signature::ECDSA {
                    curve: *curve,
                    bytes,
                })
            }
            #[cfg(feature = "pq")]
            KeyPairData::Oqs(pair) => Ok(Signature::Oqs {
                key_type: pair.key_type,
                bytes: pair.sign(to_sign)?,
            }),
            #[cfg(all(feature = "pq", feature = "openssl"))]
            KeyPairData::Hybrid {
                key_type,
                classical,
                oqs,
            } => {
                // Both halves sign the same input.
                let classical_sig = classical.sign(to_sign, key_type.default_hash())?;
                let pq = oqs.sign(to_sign)?;
                Ok(Signature::Hybrid {
                    key_type: *key_type,
                    classical: Box::new(classical_sig),
                    pq,
                })
            }
        }
    }
}

#[cfg(feature = "openssl")]
fn message_digest(hash: SignatureHash, data: &[u8]) -> Result<Vec<u8>, Error> {
    let md = hash.to_message_digest().ok_or(Error::InvalidParameter)?;
    Ok(openssl::hash::hash(md, data)?.to_vec())
}

#[cfg(feature = "openssl")]
fn rsa_signature(
    hash: &SignatureHash,
    key: &Rsa<Private>,
    b: &[u8],
) -> Result<Vec<u8>, Error> {
    use openssl::sign::Signer;
    let pkey = PKey::from_rsa(Rsa::from_private_components(
        key.n().to_owned()?,
        key.e().to_owned()?,
        key.d().to_owned()?,
        key.p().ok_or(Error::CouldNotReadKey)?.to_owned()?,
        key.q().ok_or(Error::CouldNotReadKey)?.to_owned()?,
        key.dmp1().ok_or(Error::CouldNotReadKey)?.to_owned()?,
        key.dmq1().ok_or(Error::CouldNotReadKey)?.to_owned()?,
        key.iqmp().ok_or(Error::CouldNotReadKey)?.to_owned()?,
    )?)?;
    let md = hash.to_message_digest().ok_or(Error::InvalidParameter)?;
    let mut signer = Signer::new(md, &pkey)?;
    signer.update(b)?;
    Ok(signer.sign_to_vec()?)
}

#[cfg(feature = "openssl")]
fn dsa_pkey(key: &Dsa<Private>) -> Result<PKey<Private>, Error> {
    let mut der = key.private_key_to_der()?;
    let dsa = PKey::private_key_from_der(&der).and_then(|pk| pk.dsa());
    der.zeroize();
    Ok(PKey::from_dsa(dsa?)?)
}

#[cfg(feature = "openssl")]
fn dsa_signature(key: &Dsa<Private>, b: &[u8]) -> Result<Vec<u8>, Error> {
    use openssl::hash::MessageDigest;
    use openssl::sign::Signer;
    let pkey = dsa_pkey(key)?;
    let mut signer = Signer::new(MessageDigest::sha1(), &pkey)?;
    signer.update(b)?;
    let der = signer.sign_to_vec()?;
    let sig = DsaSig::from_der(&der)?;
    // r ∥ s, each left-padded to the 160-bit subgroup size
    let mut bytes = sig.r().to_vec_padded(20)?;
    bytes.extend(sig.s().to_vec_padded(20)?);
    Ok(bytes)
}

impl PublicKey {
    /// Verify the signature math over `buffer`, with no session policy
    /// applied. For security-key types `buffer` must already be the
    /// authenticator pre-image; [`verify_signature`] builds it.
    pub fn verify_detached(&self, buffer: &[u8], sig: &Signature) -> Result<(), Error> {
        match (self, sig) {
            (PublicKey::Ed25519(key), Signature::Ed25519(bytes)) => {
                let sig = ed25519_dalek::Signature::from_bytes(&bytes.0);
                key.verify(buffer, &sig).map_err(|_| Error::InvalidSignature)
            }
            (PublicKey::SkEd25519 { key, .. }, Signature::SkEd25519 { signature, .. }) => {
                let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
                key.verify(buffer, &sig).map_err(|_| Error::InvalidSignature)
            }
            #[cfg(feature = "openssl")]
            (PublicKey::RSA { key, .. }, Signature::RSA { hash, bytes }) => {
                use openssl::sign::Verifier;
                let md = hash.to_message_digest().ok_or(Error::InvalidParameter)?;
                let mut verifier = Verifier::new(md, &key.0)?;
                verifier.update(buffer)?;
                if verifier.verify(bytes)? {
                    Ok(())
                } else {
                    Err(Error::InvalidSignature)
                }
            }
            #[cfg(feature = "openssl")]
            (PublicKey::DSA { key }, Signature::DSA { bytes }) => {
                use openssl::hash::MessageDigest;
                use openssl::sign::Verifier;
                if bytes.len() != 40 {
                    return Err(Error::InvalidSignature);
                }
                let r = BigNum::from_slice(&bytes[..20])?;
                let s = BigNum::from_slice(&bytes[20..])?;
                let der = DsaSig::from_private_components(r, s)?.to_der()?;
                let mut verifier = Verifier::new(MessageDigest::sha1(), &key.0)?;
                verifier.update(buffer)?;
                if verifier.verify(&der)? {
                    Ok(())
                } else {
                    Err(Error::InvalidSignature)
                }
            }
            #[cfg(feature = "openssl")]
            (
                PublicKey::ECDSA { key, curve },
                Signature::ECDSA {
                    curve: sig_curve,
                    bytes,
                },
            ) => {
                if curve != sig_curve {
                    return Err(Error::SignatureKeyMismatch);
                }
                verify_ecdsa(&key.0, curve.hash(), buffer, bytes)
            }
            #[cfg(feature = "openssl")]
            (PublicKey::SkEcdsa { key, .. }, Signature::SkEcdsa { bytes, .. }) => {
                verify_ecdsa(&key.0, SignatureHash::SHA2_256, buffer, bytes)
            }
            (PublicKey::Cert(cert), _) => cert.public_key().verify_detached(buffer, sig),
            #[cfg(feature = "pq")]
            (PublicKey::Oqs(key), Signature::Oqs { bytes, .. }) => key.verify(buffer, bytes),
            #[cfg(all(feature = "pq", feature = "openssl"))]
            (
                PublicKey::Hybrid { classical, oqs, .. },
                Signature::Hybrid {
                    classical: classical_sig,
                    pq,
                    ..
                },
            ) => {
                // Success requires BOTH halves to verify.
                classical.verify_detached(buffer, classical_sig)?;
                oqs.verify(buffer, pq)
            }
            _ => Err(Error::SignatureKeyMismatch),
        }
    }
}

#[cfg(feature = "openssl")]
fn verify_ecdsa(
    key: &openssl::pkey::PKey<openssl::pkey::Public>,
    hash: SignatureHash,
    buffer: &[u8],
    sig: &[u8],
) -> Result<(), Error> {
    let mut p = sig.reader(0);
    let r = BigNum::from_slice(p.read_mpint()?)?;
    let s = BigNum::from_slice(p.read_mpint()?)?;
    let sig = EcdsaSig::from_private_components(r, s)?;
    let digest = message_digest(hash, buffer)?;
    let ec_key = key.ec_key()?;
    if sig.verify(&digest, &ec_key)? {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

/// Verify `sig` over `data` against `key`, applying session policy: the
/// signature algorithm must match the key, the digest must be compatible
/// (and FIPS-allowed), and security-key signatures are checked against
/// the synthesized authenticator pre-image.
pub fn verify_signature(
    session: Option<&dyn SshSession>,
    sig: &Signature,
    key: &PublicKey,
    data: &[u8],
) -> Result<(), Error> {
    let fips = session.map(|s| s.fips_mode()).unwrap_or(false);
    // Certificates verify with their embedded key.
    let key = match key {
        PublicKey::Cert(cert) => cert.public_key(),
        k => k,
    };
    let key_type = key.key_type().plain();
    let sig_type = sig.key_type().plain();
    // The classical half of an RSA hybrid retains the ssh-rsa identifier.
    let type_ok = key_type == sig_type
        || (sig_type == KeyType::Rsa && key_type.is_rsa_hybrid());
    if !type_ok {
        return Err(Error::SignatureKeyMismatch);
    }
    hash_compatible(key_type, sig.hash(), fips)?;
    match (key, sig) {
        (
            PublicKey::SkEd25519 { application, .. },
            Signature::SkEd25519 { flags, counter, .. },
        ) => {
            let msg = sk_signed_data(application, *flags, *counter, data);
            key.verify_detached(&msg, sig)
        }
        #[cfg(feature = "openssl")]
        (
            PublicKey::SkEcdsa { application, .. },
            Signature::SkEcdsa { flags, counter, .. },
        ) => {
            let msg = sk_signed_data(application, *flags, *counter, data);
            key.verify_detached(&msg, sig)
        }
        _ => key.verify_detached(data, sig),
    }
}

/// Sign a client authentication request: the input is the session
/// identifier as an SSH string, followed by `buf`. Returns the signature
/// blob.
pub fn sign_with_session_id(
    session: &dyn SshSession,
    key: &KeyPair,
    buf: &[u8],
    hash: SignatureHash,
) -> Result<Vec<u8>, Error> {
    let session_id = session.session_id().ok_or(Error::NoSessionId)?;
    let effective = hash_compatible(key.key_type(), hash, session.fips_mode())?;
    let mut to_sign = Vec::with_capacity(session_id.len() + buf.len() + 4);
    to_sign.extend_ssh_string(session_id);
    to_sign.extend_from_slice(buf);
    let sig = key.key.sign(&to_sign, effective)?;
    Ok(sig.to_blob())
}

/// Sign the current exchange hash for the server's host signature. Unlike
/// [`sign_with_session_id`], the hash is packed as a bare byte-run with no
/// length prefix; the asymmetry is part of the protocol.
pub fn sign_session_id(
    session: &dyn SshSession,
    key: &KeyPair,
    hash: SignatureHash,
) -> Result<Vec<u8>, Error> {
    let exchange_hash = session.exchange_hash().ok_or(Error::NoSessionId)?;
    let effective = hash_compatible(key.key_type(), hash, session.fips_mode())?;
    let sig = key.key.sign(exchange_hash, effective)?;
    Ok(sig.to_blob())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::test::TestSession;

    fn ed25519_pair() -> (KeyPair, PublicKey) {
        let key = KeyPair::generate(KeyType::Ed25519, 0).unwrap();
        let public = key.clone_public_key().unwrap();
        (key, public)
    }

    #[test]
    fn sign_verify_roundtrip() {
        let (key, public) = ed25519_pair();
        let sig = key.sign_detached(b"hello").unwrap();
        verify_signature(None, &sig, &public, b"hello").unwrap();
        assert!(verify_signature(None, &sig, &public, b"hellp").is_err());
    }

    #[test]
    fn bit_flip_breaks_signature() {
        let (key, public) = ed25519_pair();
        let blob = key.sign_detached(b"payload").unwrap().to_blob();
        for bit in [0usize, 7, 200] {
            let mut broken = blob.clone();
            let n = broken.len();
            broken[n - 1 - bit / 8] ^= 1 << (bit % 8);
            let sig = match Signature::from_blob(&broken, KeyType::Ed25519) {
                Ok(sig) => sig,
                // Damage to the framing is just as fatal.
                Err(_) => continue,
            };
            assert!(verify_signature(None, &sig, &public, b"payload").is_err());
        }
    }

    #[test]
    fn session_id_is_length_prefixed_for_clients() {
        let (key, public) = ed25519_pair();
        let mut session = TestSession::default();
        session.session_id = vec![9u8; 32];
        let blob = sign_with_session_id(&session, &key, b"userauth", SignatureHash::Auto)
            .unwrap();
        let sig = Signature::from_blob(&blob, KeyType::Ed25519).unwrap();

        let mut expected = Vec::new();
        expected.extend_ssh_string(&session.session_id);
        expected.extend_from_slice(b"userauth");
        verify_signature(None, &sig, &public, &expected).unwrap();

        // The bare concatenation must NOT verify.
        let mut bare = session.session_id.clone();
        bare.extend_from_slice(b"userauth");
        assert!(verify_signature(None, &sig, &public, &bare).is_err());
    }

    #[test]
    fn host_signature_uses_bare_exchange_hash() {
        let (key, public) = ed25519_pair();
        let mut session = TestSession::default();
        session.session_id = vec![3u8; 32];
        session.exchange_hash = Some(vec![4u8; 32]);
        let blob = sign_session_id(&session, &key, SignatureHash::Auto).unwrap();
        let sig = Signature::from_blob(&blob, KeyType::Ed25519).unwrap();
        verify_signature(None, &sig, &public, &[4u8; 32]).unwrap();
        assert!(verify_signature(None, &sig, &public, &[3u8; 32]).is_err());
    }

    #[test]
    fn sha1_rejected_in_fips_mode() {
        assert!(hash_compatible(KeyType::Rsa, SignatureHash::SHA1, false).is_ok());
        match hash_compatible(KeyType::Rsa, SignatureHash::SHA1, true) {
            Err(Error::FipsDisallowed) => {}
            r => panic!("unexpected: {:?}", r),
        }
        // DSS only knows SHA1, so FIPS rejects it entirely.
        assert!(hash_compatible(KeyType::Dss, SignatureHash::Auto, true).is_err());
    }

    #[test]
    fn ed25519_only_signs_auto() {
        let (key, _) = ed25519_pair();
        assert!(key
            .sign_detached_with_hash(b"x", SignatureHash::SHA2_256)
            .is_err());
    }

    #[test]
    fn sk_ed25519_verification() {
        use crate::signature::SignatureBytes;
        use ed25519_dalek::Signer;

        // The authenticator's key, standing in for the hardware token.
        let device = ed25519_dalek::SigningKey::from_bytes(&[0x42; 32]);
        let public = PublicKey::SkEd25519 {
            key: device.verifying_key(),
            application: "ssh:".to_string(),
        };
        let message = b"sk challenge";
        let signed = sk_signed_data("ssh:", 0x01, 42, message);
        let raw = device.sign(&signed);
        let sig = Signature::SkEd25519 {
            signature: SignatureBytes(raw.to_bytes()),
            flags: 0x01,
            counter: 42,
        };
        verify_signature(None, &sig, &public, message).unwrap();

        let wrong_counter = Signature::SkEd25519 {
            signature: SignatureBytes(raw.to_bytes()),
            flags: 0x01,
            counter: 43,
        };
        assert!(verify_signature(None, &wrong_counter, &public, message).is_err());
    }

    #[cfg(feature = "openssl")]
    #[test]
    fn rsa_signature_names_and_sizes() {
        let key = KeyPair::generate(KeyType::Rsa, 2048).unwrap();
        let public = key.clone_public_key().unwrap();
        let sig = key
            .sign_detached_with_hash(b"abc", SignatureHash::SHA2_256)
            .unwrap();
        let blob = sig.to_blob();
        assert_eq!(&blob[..4], &[0, 0, 0, 12]);
        assert_eq!(&blob[4..16], b"rsa-sha2-256");
        // 2048-bit modulus: 256 signature bytes
        assert_eq!(&blob[16..20], &[0, 0, 1, 0]);
        verify_signature(None, &sig, &public, b"abc").unwrap();

        // SHA1 path still verifies against the same key.
        let sha1_sig = key
            .sign_detached_with_hash(b"abc", SignatureHash::SHA1)
            .unwrap();
        let sha1_blob = sha1_sig.to_blob();
        assert_eq!(&sha1_blob[4..11], b"ssh-rsa");
        verify_signature(None, &sha1_sig, &public, b"abc").unwrap();

        // Unless FIPS mode is enabled.
        let mut fips = TestSession::default();
        fips.fips_mode = true;
        assert!(verify_signature(Some(&fips), &sha1_sig, &public, b"abc").is_err());
    }

    #[cfg(feature = "openssl")]
    #[test]
    fn rsa_signature_rejected_for_other_keys() {
        let rsa = KeyPair::generate(KeyType::Rsa, 2048).unwrap();
        let (_, ed_public) = ed25519_pair();
        let sig = rsa.sign_detached(b"abc").unwrap();
        match verify_signature(None, &sig, &ed_public, b"abc") {
            Err(Error::SignatureKeyMismatch) => {}
            r => panic!("unexpected: {:?}", r),
        }
    }

    #[cfg(feature = "openssl")]
    #[test]
    fn dsa_and_ecdsa_roundtrip() {
        for (t, bits) in [
            (KeyType::Dss, 1024),
            (KeyType::EcdsaP256, 0),
            (KeyType::EcdsaP384, 0),
            (KeyType::EcdsaP521, 0),
        ] {
            let key = KeyPair::generate(t, bits).unwrap();
            let public = key.clone_public_key().unwrap();
            let sig = key.sign_detached(b"data").unwrap();
            let blob = sig.to_blob();
            let parsed = Signature::from_blob(&blob, t).unwrap();
            verify_signature(None, &parsed, &public, b"data").unwrap();
            assert!(verify_signature(None, &parsed, &public, b"datb").is_err());
        }
    }

    #[cfg(all(feature = "pq", feature = "openssl"))]
    #[test]
    fn hybrid_blob_layout_and_both_halves_required() {
        use crate::encoding::Reader;

        let key = KeyPair::generate(KeyType::Rsa3072Dilithium2, 0).unwrap();
        let public = key.clone_public_key().unwrap();
        let sig = key.sign_detached(b"m").unwrap();
        let blob = sig.to_blob();

        let mut r = blob.reader(0);
        let classical = r.read_string().unwrap();
        let pq = r.read_string().unwrap();
        // The classical half is a complete ssh-rsa signature blob.
        let mut c = classical.reader(0);
        assert_eq!(c.read_string().unwrap(), b"ssh-rsa");
        assert!(!pq.is_empty());

        let parsed = Signature::from_blob(&blob, KeyType::Rsa3072Dilithium2).unwrap();
        verify_signature(None, &parsed, &public, b"m").unwrap();

        // Zero out the PQ half; the classical half alone must not pass.
        let mut broken = Vec::new();
        broken.extend_ssh_string(classical);
        broken.extend_ssh_string(&vec![0u8; pq.len()]);
        let broken = Signature::from_blob(&broken, KeyType::Rsa3072Dilithium2).unwrap();
        assert!(verify_signature(None, &broken, &public, b"m").is_err());
    }
}
