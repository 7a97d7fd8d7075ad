//! Feed keypairs and the deterministic content-key derivation from §6.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;

/// Public half of a feed keypair. Feeds are "assumed present" collaborators
/// (§1), so this crate only needs key *identity*, not a real signature
/// scheme; the byte layout mirrors the 32-byte Ed25519 public key shape
/// feeds use in practice.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex(&self.0))
    }
}

/// Secret half of a feed keypair, 64 bytes matching the Ed25519 secret key
/// layout (seed + derived public key) used by feed implementations.
#[derive(Clone)]
pub struct SecretKey(pub [u8; 64]);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted>)")
    }
}

/// A feed keypair: public key plus, for writable feeds, the secret key.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: Option<SecretKey>,
}

impl KeyPair {
    /// Generate a fresh, random keypair for a brand new feed.
    pub fn generate() -> Self {
        let mut secret = [0u8; 64];
        OsRng.fill_bytes(&mut secret);
        let public = derive_public(&secret);
        Self { public, secret: Some(SecretKey(secret)) }
    }

    /// `true` iff this keypair carries a secret (i.e. the owner can append).
    pub fn is_writable(&self) -> bool {
        self.secret.is_some()
    }

    /// The public-key-only view of this keypair.
    pub fn public_only(&self) -> KeyPair {
        KeyPair { public: self.public, secret: None }
    }
}

/// Derive the content feed's keypair deterministically from the metadata
/// feed's secret key (§4.1 step 3, §6 "content-key derivation").
///
/// Re-opening the same drive therefore always yields the same content
/// feed, the way the spec requires, without persisting a second secret
/// anywhere. The derivation uses `blake3`'s keyed-derivation construction,
/// which is designed for exactly this "derive one key from another,
/// reproducibly, across implementations" use case.
pub fn derive_content_keypair(metadata_secret: &SecretKey) -> KeyPair {
    let mut seed = [0u8; 32];
    seed.copy_from_slice(blake3::derive_key(
        "hyperdrive content feed keypair v1",
        &metadata_secret.0,
    ) .as_slice());
    let mut secret = [0u8; 64];
    secret[..32].copy_from_slice(&seed);
    let public = derive_public(&secret);
    secret[32..].copy_from_slice(&public.0);
    KeyPair { public, secret: Some(SecretKey(secret)) }
}

/// Derive a public key from a secret key's seed. Since the real signature
/// scheme is out of scope, this is a content-addressing hash rather than a
/// cryptographic keypair derivation; it is deterministic, which is all §6
/// requires.
fn derive_public(secret: &[u8; 64]) -> PublicKey {
    let digest = blake3::hash(&secret[..32]);
    let mut public = [0u8; 32];
    public.copy_from_slice(digest.as_bytes());
    PublicKey(public)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
