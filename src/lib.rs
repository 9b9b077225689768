//! Nostr note publisher library surface.
//!
//! A run resolves a persistent identity, signs one kind-1 note with it and
//! publishes the note to a single relay:
//! - identity file handling and key generation
//! - NIP-01 event signing and relay framing
//! - websocket relay publishing

/// CLI-independent settings.
pub mod config;
/// Schnorr signature scheme over secp256k1.
pub mod crypto;
pub mod error;
/// Load-or-create identity file.
pub mod identity;
/// Display-encoded key pair.
pub mod keyset;
/// NIP-19 bech32 key encodings.
pub mod nip19;
/// Event construction, signing and framing.
pub mod nostr;
/// Platform default paths.
pub mod platform;
/// Relay publish exchange.
pub mod relay;
/// Shared utility helpers.
pub mod util;

pub use error::{Error, Result};
