//! Read-only view of the SSH session state that key operations depend on:
//! the session identifier, negotiated RFC 8332 extensions, peer version
//! quirks, accepted-algorithm lists and FIPS mode.

use crate::algorithm::{KeyType, SignatureHash};

/// The peer advertised `server-sig-algs` support for `rsa-sha2-256`.
pub const SSH_EXT_SIG_RSA_SHA256: u32 = 0x01;
/// The peer advertised `server-sig-algs` support for `rsa-sha2-512`.
pub const SSH_EXT_SIG_RSA_SHA512: u32 = 0x02;

/// Host-key algorithms usable in FIPS mode.
pub const FIPS_ALLOWED_HOSTKEYS: &str =
    "ecdsa-sha2-nistp521,ecdsa-sha2-nistp384,ecdsa-sha2-nistp256,rsa-sha2-512,rsa-sha2-256";

/// What the PKI layer needs to know about an SSH session. All methods are
/// read-only; the defaults describe a session with nothing negotiated.
pub trait SshSession {
    /// The session identifier (the hash of the initial key exchange).
    fn session_id(&self) -> Option<&[u8]>;

    /// The exchange hash of the most recent key exchange. Equal to the
    /// session id until a rekey happens.
    fn exchange_hash(&self) -> Option<&[u8]> {
        self.session_id()
    }

    /// Bitmask of `SSH_EXT_SIG_RSA_*`.
    fn extensions(&self) -> u32 {
        0
    }

    /// The peer's OpenSSH version as `major * 10000 + minor * 100 +
    /// patch`, if the peer runs OpenSSH.
    fn peer_openssh_version(&self) -> Option<u32> {
        None
    }

    /// Comma-separated `PubkeyAcceptedTypes` list, if configured.
    fn accepted_pubkey_types(&self) -> Option<&str> {
        None
    }

    /// Comma-separated wanted host-key algorithms, if configured.
    fn wanted_hostkeys(&self) -> Option<&str> {
        None
    }

    fn fips_mode(&self) -> bool {
        false
    }
}

/// Whether `name` may be used as a host-key algorithm on this session. In
/// FIPS mode the check runs against [`FIPS_ALLOWED_HOSTKEYS`] instead of
/// the configured lists.
pub fn algorithm_allowed(session: &dyn SshSession, name: &str) -> bool {
    let allowed = if session.fips_mode() {
        Some(FIPS_ALLOWED_HOSTKEYS)
    } else {
        session
            .accepted_pubkey_types()
            .or_else(|| session.wanted_hostkeys())
    };
    match allowed {
        Some(list) => list.split(',').any(|x| x == name),
        // Nothing configured: everything is acceptable.
        None => true,
    }
}

/// The digest to use for an RSA or RSA-certificate key on this session,
/// per RFC 8332: prefer SHA-512, then SHA-256, then SHA-1. OpenSSH before
/// 7.2.0 mishandles SHA-2 on certificates, so RSA certificates against
/// such peers are pinned to SHA-1. Non-RSA types keep the digest implied
/// by their identifier.
pub fn key_type_to_hash(session: &dyn SshSession, key_type: KeyType) -> SignatureHash {
    match key_type.plain() {
        KeyType::Rsa => {}
        _ => return key_type.default_hash(),
    }
    if key_type == KeyType::RsaCert {
        if let Some(version) = session.peer_openssh_version() {
            if version > 0 && version < 70200 {
                debug!("old OpenSSH peer ({}), using SHA1 for RSA certificate", version);
                return SignatureHash::SHA1;
            }
        }
    }
    let extensions = session.extensions();
    if extensions & SSH_EXT_SIG_RSA_SHA512 != 0 {
        SignatureHash::SHA2_512
    } else if extensions & SSH_EXT_SIG_RSA_SHA256 != 0 {
        SignatureHash::SHA2_256
    } else if session.fips_mode() {
        // SHA1 is never an option in FIPS mode.
        SignatureHash::SHA2_256
    } else {
        SignatureHash::SHA1
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    #[derive(Default)]
    pub(crate) struct TestSession {
        pub session_id: Vec<u8>,
        pub exchange_hash: Option<Vec<u8>>,
        pub extensions: u32,
        pub peer_openssh_version: Option<u32>,
        pub accepted_pubkey_types: Option<String>,
        pub fips_mode: bool,
    }

    impl SshSession for TestSession {
        fn session_id(&self) -> Option<&[u8]> {
            if self.session_id.is_empty() {
                None
            } else {
                Some(&self.session_id)
            }
        }
        fn exchange_hash(&self) -> Option<&[u8]> {
            self.exchange_hash.as_deref().or_else(|| self.session_id())
        }
        fn extensions(&self) -> u32 {
            self.extensions
        }
        fn peer_openssh_version(&self) -> Option<u32> {
            self.peer_openssh_version
        }
        fn accepted_pubkey_types(&self) -> Option<&str> {
            self.accepted_pubkey_types.as_deref()
        }
        fn fips_mode(&self) -> bool {
            self.fips_mode
        }
    }

    #[test]
    fn rsa_hash_negotiation() {
        let mut session = TestSession::default();
        assert_eq!(
            key_type_to_hash(&session, KeyType::Rsa),
            SignatureHash::SHA1
        );
        session.extensions = SSH_EXT_SIG_RSA_SHA256;
        assert_eq!(
            key_type_to_hash(&session, KeyType::Rsa),
            SignatureHash::SHA2_256
        );
        session.extensions |= SSH_EXT_SIG_RSA_SHA512;
        assert_eq!(
            key_type_to_hash(&session, KeyType::Rsa),
            SignatureHash::SHA2_512
        );
        assert_eq!(
            key_type_to_hash(&session, KeyType::Ed25519),
            SignatureHash::Auto
        );
    }

    #[test]
    fn old_openssh_rsa_cert_quirk() {
        let mut session = TestSession::default();
        session.extensions = SSH_EXT_SIG_RSA_SHA512;
        session.peer_openssh_version = Some(70100);
        assert_eq!(
            key_type_to_hash(&session, KeyType::RsaCert),
            SignatureHash::SHA1
        );
        // Plain RSA is unaffected by the certificate quirk.
        assert_eq!(
            key_type_to_hash(&session, KeyType::Rsa),
            SignatureHash::SHA2_512
        );
        session.peer_openssh_version = Some(70200);
        assert_eq!(
            key_type_to_hash(&session, KeyType::RsaCert),
            SignatureHash::SHA2_512
        );
    }

    #[test]
    fn allowed_list_matching() {
        let mut session = TestSession::default();
        assert!(algorithm_allowed(&session, "ssh-ed25519"));
        session.accepted_pubkey_types = Some("ssh-ed25519,rsa-sha2-256".to_string());
        assert!(algorithm_allowed(&session, "ssh-ed25519"));
        assert!(!algorithm_allowed(&session, "ssh-dss"));
        session.fips_mode = true;
        assert!(!algorithm_allowed(&session, "ssh-ed25519"));
        assert!(algorithm_allowed(&session, "rsa-sha2-512"));
    }
}
