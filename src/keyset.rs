use serde::{Deserialize, Serialize};

use crate::crypto::{PublicBytes, SecretBytes, SignatureScheme};
use crate::error::{Error, Result};
use crate::nip19;

/// A Nostr identity in its display encodings.
///
/// Serialized with the `Private` / `Public` field names so key files written by
/// earlier tools keep loading.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyset {
    #[serde(rename = "Private")]
    pub private: String,
    #[serde(rename = "Public")]
    pub public: String,
}

impl Keyset {
    pub fn generate(scheme: &impl SignatureScheme) -> Result<Self> {
        let sk = scheme.generate_secret()?;
        Self::from_secret_bytes(scheme, &sk)
    }

    pub fn from_secret(scheme: &impl SignatureScheme, nsec: &str) -> Result<Self> {
        let sk = nip19::decode_secret(nsec)?;
        Self::from_secret_bytes(scheme, &sk)
    }

    fn from_secret_bytes(scheme: &impl SignatureScheme, sk: &SecretBytes) -> Result<Self> {
        let pk = scheme.derive_public(sk)?;
        Ok(Self {
            private: nip19::encode_secret(sk)?,
            public: nip19::encode_public(&pk)?,
        })
    }

    pub fn secret_bytes(&self) -> Result<SecretBytes> {
        nip19::decode_secret(&self.private)
    }

    pub fn public_bytes(&self) -> Result<PublicBytes> {
        nip19::decode_public(&self.public)
    }

    /// Hex x-only public key, the form events carry on the wire.
    pub fn public_hex(&self) -> Result<String> {
        Ok(hex::encode(self.public_bytes()?))
    }

    /// Fails unless `public` is the key derived from `private`.
    pub fn check(&self, scheme: &impl SignatureScheme) -> Result<()> {
        let sk = self.secret_bytes()?;
        let derived = scheme
            .derive_public(&sk)
            .map_err(|e| Error::Decode(format!("stored secret key unusable: {}", e)))?;
        if derived != self.public_bytes()? {
            return Err(Error::Decode("public key does not match private key".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Keyset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyset")
            .field("private", &"<redacted>")
            .field("public", &self.public)
            .finish()
    }
}
