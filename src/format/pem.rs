//! Legacy PEM, PKCS#5 and PKCS#8 private keys, parsed and emitted through
//! the crypto provider. The provider transparently handles the
//! `Proc-Type: 4,ENCRYPTED` headers of traditional PEM as well as
//! encrypted PKCS#8.

use crate::algorithm::SignatureHash;
use crate::key::{EcCurve, KeyPair, KeyPairData};
use crate::Error;
use openssl::pkey::{Id, PKey, Private};
use std::convert::TryInto;
use std::io::Write;
use zeroize::{Zeroize, Zeroizing};

/// Decode a PEM private key. The prompt is invoked at most once, when the
/// provider demands a passphrase and none was supplied; its result is
/// truncated at the first NUL.
pub(crate) fn decode_pem<F>(
    secret: &str,
    password: Option<&str>,
    prompt: F,
) -> Result<KeyPair, Error>
where
    F: FnOnce() -> Result<String, Error>,
{
    let mut asked = false;
    let mut missing_password = false;
    let result = PKey::private_key_from_pem_callback(secret.as_bytes(), |buf| {
        asked = true;
        let pass: Zeroizing<String> = if let Some(p) = password {
            Zeroizing::new(p.to_string())
        } else {
            match prompt() {
                Ok(mut s) => {
                    if let Some(i) = s.find('\0') {
                        s.truncate(i)
                    }
                    Zeroizing::new(s)
                }
                Err(_) => {
                    missing_password = true;
                    return Ok(0);
                }
            }
        };
        let bytes = pass.as_bytes();
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    });
    match result {
        Ok(pkey) => keypair_from_pkey(&pkey),
        Err(e) => {
            debug!("PEM import failed: {:?}", e);
            if missing_password {
                Err(Error::KeyIsEncrypted)
            } else if asked {
                // No decrypt detail beyond this leaves the library.
                Err(Error::BadPassphrase)
            } else {
                Err(Error::CouldNotReadKey)
            }
        }
    }
}

fn keypair_from_pkey(pkey: &PKey<Private>) -> Result<KeyPair, Error> {
    match pkey.id() {
        Id::RSA => Ok(KeyPair::from(KeyPairData::RSA {
            key: pkey.rsa()?,
            hash: SignatureHash::SHA2_256,
        })),
        Id::DSA => Ok(KeyPair::from(KeyPairData::DSA { key: pkey.dsa()? })),
        Id::EC => {
            let key = pkey.ec_key()?;
            // The specific P-xxx type is only known once the curve is.
            let nid = key
                .group()
                .curve_name()
                .ok_or_else(|| Error::UnsupportedKeyType(b"ecdsa".to_vec()))?;
            let curve = EcCurve::from_nid(nid)
                .ok_or_else(|| Error::UnsupportedKeyType(b"ecdsa".to_vec()))?;
            Ok(KeyPair::from(KeyPairData::ECDSA { key, curve }))
        }
        Id::ED25519 => {
            let mut raw = pkey.raw_private_key()?;
            let mut seed: [u8; 32] = raw[..]
                .try_into()
                .map_err(|_| Error::CouldNotReadKey)?;
            let key = ed25519_dalek::SigningKey::from_bytes(&seed);
            raw.zeroize();
            seed.zeroize();
            Ok(KeyPair::from(KeyPairData::Ed25519(key)))
        }
        id => Err(Error::UnsupportedKeyType(
            format!("{:?}", id).into_bytes(),
        )),
    }
}

fn pkey_of(key: &KeyPair) -> Result<PKey<Private>, Error> {
    match key.data() {
        KeyPairData::Ed25519(k) => {
            let mut seed = k.to_bytes();
            let pkey = PKey::private_key_from_raw_bytes(&seed, Id::ED25519)?;
            seed.zeroize();
            Ok(pkey)
        }
        KeyPairData::RSA { key, .. } => {
            let mut der = key.private_key_to_der()?;
            let rsa = openssl::rsa::Rsa::private_key_from_der(&der);
            der.zeroize();
            Ok(PKey::from_rsa(rsa?)?)
        }
        KeyPairData::DSA { key } => {
            let mut der = key.private_key_to_der()?;
            let dsa = PKey::private_key_from_der(&der).and_then(|pk| pk.dsa());
            der.zeroize();
            Ok(PKey::from_dsa(dsa?)?)
        }
        KeyPairData::ECDSA { key, .. } => {
            let mut der = key.private_key_to_der()?;
            let ec = openssl::ec::EcKey::private_key_from_der(&der);
            der.zeroize();
            Ok(PKey::from_ec_key(ec?)?)
        }
        #[cfg(feature = "pq")]
        _ => Err(Error::UnsupportedKeyType(b"post-quantum".to_vec())),
    }
}

/// Write the key as cleartext PKCS#8 PEM.
pub fn encode_pkcs8_pem<W: Write>(key: &KeyPair, mut w: W) -> Result<(), Error> {
    let pkey = pkey_of(key)?;
    w.write_all(&pkey.private_key_to_pem_pkcs8()?)?;
    Ok(())
}

/// Write the key as PKCS#8 PEM, encrypted under `pass` with AES-256-CBC.
pub fn encode_pkcs8_pem_encrypted<W: Write>(
    key: &KeyPair,
    pass: &[u8],
    mut w: W,
) -> Result<(), Error> {
    let pkey = pkey_of(key)?;
    w.write_all(
        &pkey.private_key_to_pem_pkcs8_passphrase(openssl::symm::Cipher::aes_256_cbc(), pass)?,
    )?;
    Ok(())
}
