//! BIP-340 Schnorr signatures over secp256k1.
//!
//! Callers go through [`SignatureScheme`] so the identity and event code can run
//! against a fake in tests. [`Schnorr`] is the real implementation.

use secp256k1::schnorr::Signature;
use secp256k1::{Keypair, Secp256k1, SecretKey, XOnlyPublicKey};

use crate::error::{Error, Result};

pub type SecretBytes = [u8; 32];
pub type PublicBytes = [u8; 32];
pub type SignatureBytes = [u8; 64];

pub trait SignatureScheme {
    /// Fresh secret from a CSPRNG.
    fn generate_secret(&self) -> Result<SecretBytes>;

    /// x-only public key for `secret`.
    fn derive_public(&self, secret: &SecretBytes) -> Result<PublicBytes>;

    /// Sign a 32-byte event id.
    fn sign(&self, secret: &SecretBytes, digest: &[u8; 32]) -> Result<SignatureBytes>;

    fn verify(&self, public: &PublicBytes, digest: &[u8; 32], sig: &SignatureBytes) -> bool;
}

#[derive(Debug, Clone)]
pub struct Schnorr {
    secp: Secp256k1<secp256k1::All>,
}

impl Schnorr {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    fn keypair(&self, secret: &SecretBytes) -> Result<Keypair> {
        let sk = SecretKey::from_slice(secret).map_err(|_| Error::Signature("invalid nostr sk".to_string()))?;
        Ok(Keypair::from_secret_key(&self.secp, &sk))
    }
}

impl Default for Schnorr {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureScheme for Schnorr {
    fn generate_secret(&self) -> Result<SecretBytes> {
        let (sk, _pk) = self.secp.generate_keypair(&mut rand::thread_rng());
        Ok(sk.secret_bytes())
    }

    fn derive_public(&self, secret: &SecretBytes) -> Result<PublicBytes> {
        let sk = SecretKey::from_slice(secret)
            .map_err(|e| Error::SignatureScheme(format!("invalid secret key: {}", e)))?;
        let keypair = Keypair::from_secret_key(&self.secp, &sk);
        let (pk, _parity) = XOnlyPublicKey::from_keypair(&keypair);
        Ok(pk.serialize())
    }

    fn sign(&self, secret: &SecretBytes, digest: &[u8; 32]) -> Result<SignatureBytes> {
        let keypair = self.keypair(secret)?;
        let sig = self.secp.sign_schnorr(digest, &keypair);
        let mut out = [0u8; 64];
        out.copy_from_slice(sig.as_ref());
        Ok(out)
    }

    fn verify(&self, public: &PublicBytes, digest: &[u8; 32], sig: &SignatureBytes) -> bool {
        let sig = match Signature::from_slice(sig) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let pk = match XOnlyPublicKey::from_slice(public) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        self.secp.verify_schnorr(&sig, digest, &pk).is_ok()
    }
}
