//! NIP-19 bech32 display encodings for raw keys (`nsec1...`, `npub1...`).

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};

use crate::crypto::{PublicBytes, SecretBytes};
use crate::error::{Error, Result};

const SECRET_HRP: &str = "nsec";
const PUBLIC_HRP: &str = "npub";

pub fn encode_secret(secret: &SecretBytes) -> Result<String> {
    encode(SECRET_HRP, secret)
}

pub fn encode_public(public: &PublicBytes) -> Result<String> {
    encode(PUBLIC_HRP, public)
}

pub fn decode_secret(nsec: &str) -> Result<SecretBytes> {
    decode(SECRET_HRP, nsec)
}

pub fn decode_public(npub: &str) -> Result<PublicBytes> {
    decode(PUBLIC_HRP, npub)
}

fn encode(prefix: &str, bytes: &[u8; 32]) -> Result<String> {
    let hrp = Hrp::parse(prefix).map_err(|e| Error::SignatureScheme(format!("invalid hrp {}: {}", prefix, e)))?;
    bech32::encode::<Bech32>(hrp, bytes)
        .map_err(|e| Error::SignatureScheme(format!("{} encode failed: {}", prefix, e)))
}

/// Plain bech32 only; a bech32m string with the right prefix is still rejected.
fn decode(prefix: &str, s: &str) -> Result<[u8; 32]> {
    let checked = CheckedHrpstring::new::<Bech32>(s.trim())
        .map_err(|e| Error::Decode(format!("invalid {}: {}", prefix, e)))?;
    let hrp = checked.hrp();
    if hrp.to_lowercase() != prefix {
        return Err(Error::Decode(format!(
            "expected {} prefix, found {}",
            prefix,
            hrp.to_lowercase()
        )));
    }
    let data: Vec<u8> = checked.byte_iter().collect();
    if data.len() != 32 {
        return Err(Error::Decode(format!("invalid {} length: {}", prefix, data.len())));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&data);
    Ok(out)
}
