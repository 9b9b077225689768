//! NIP-01 events: canonical id, signing, verification and relay framing.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::crypto::SignatureScheme;
use crate::error::{Error, Result};
use crate::keyset::Keyset;
use crate::util;

pub const KIND_TEXT_NOTE: u32 = 1;

/// A signed event as it goes on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NostrEvent {
    /// Lowercase hex of the SHA-256 over [`canonical_json`].
    pub id: String,
    /// x-only public key, lowercase hex.
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    /// BIP-340 signature over the id bytes, lowercase hex.
    pub sig: String,
}

/// The fields an event id commits to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NostrUnsignedEvent {
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl NostrUnsignedEvent {
    fn seal(self, id: &[u8; 32], sig: &[u8; 64]) -> NostrEvent {
        NostrEvent {
            id: hex::encode(id),
            sig: hex::encode(sig),
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
        }
    }
}

impl NostrEvent {
    pub fn unsigned(&self) -> NostrUnsignedEvent {
        let NostrEvent {
            pubkey,
            created_at,
            kind,
            tags,
            content,
            ..
        } = self.clone();
        NostrUnsignedEvent {
            pubkey,
            created_at,
            kind,
            tags,
            content,
        }
    }
}

pub fn build_unsigned_event(
    pubkey: impl Into<String>,
    kind: u32,
    tags: Vec<Vec<String>>,
    content: impl Into<String>,
    created_at: u64,
) -> NostrUnsignedEvent {
    NostrUnsignedEvent {
        pubkey: pubkey.into(),
        created_at,
        kind,
        tags,
        content: content.into(),
    }
}

/// Kind-1 note from `keyset`, stamped now, no tags. The keyset must be self-consistent.
pub fn sign_text_note(scheme: &impl SignatureScheme, keyset: &Keyset, content: &str) -> Result<NostrEvent> {
    keyset
        .check(scheme)
        .map_err(|e| Error::Signature(format!("keyset cannot sign: {}", e)))?;
    let pubkey = keyset
        .public_hex()
        .map_err(|e| Error::Signature(format!("unusable public key: {}", e)))?;
    let unsigned = build_unsigned_event(pubkey, KIND_TEXT_NOTE, Vec::new(), content, util::unix_timestamp());
    sign_event(scheme, &unsigned, keyset)
}

pub fn sign_event(scheme: &impl SignatureScheme, unsigned: &NostrUnsignedEvent, keyset: &Keyset) -> Result<NostrEvent> {
    let sk = keyset
        .secret_bytes()
        .map_err(|e| Error::Signature(format!("corrupted identity: {}", e)))?;
    let id = event_id(unsigned)?;
    let sig = scheme.sign(&sk, &id)?;
    Ok(unsigned.clone().seal(&id, &sig))
}

/// `true` only if the id matches the fields and the signature matches the id.
pub fn verify_event(scheme: &impl SignatureScheme, ev: &NostrEvent) -> Result<bool> {
    let expected = event_id(&ev.unsigned())?;
    if hex::encode(expected) != ev.id {
        return Ok(false);
    }
    let pk = decode_fixed::<32>(&ev.pubkey).ok_or_else(|| Error::Signature("invalid pubkey".to_string()))?;
    let sig = decode_fixed::<64>(&ev.sig).ok_or_else(|| Error::Signature("invalid signature".to_string()))?;
    Ok(scheme.verify(&pk, &expected, &sig))
}

/// The exact bytes the id commits to: `[0,pubkey,created_at,kind,tags,content]`.
pub fn canonical_json(unsigned: &NostrUnsignedEvent) -> Result<String> {
    let content = json!([
        0,
        unsigned.pubkey,
        unsigned.created_at,
        unsigned.kind,
        unsigned.tags,
        unsigned.content,
    ]);
    serde_json::to_string(&content).map_err(|e| Error::Signature(format!("event serialize failed: {}", e)))
}

pub fn event_id(unsigned: &NostrUnsignedEvent) -> Result<[u8; 32]> {
    let raw = canonical_json(unsigned)?;
    Ok(Sha256::digest(raw.as_bytes()).into())
}

pub fn event_id_hex(unsigned: &NostrUnsignedEvent) -> Result<String> {
    Ok(hex::encode(event_id(unsigned)?))
}

pub fn frame_event(ev: &NostrEvent) -> String {
    json!(["EVENT", ev]).to_string()
}

/// Frames a relay may send back on a publish connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayMessage {
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    Notice(String),
    Closed {
        sub_id: String,
        message: String,
    },
    Eose(String),
    Event {
        sub_id: String,
        event: Value,
    },
    Auth(String),
}

impl RelayMessage {
    pub fn parse(frame: &str) -> Result<Self> {
        let v: Value = serde_json::from_str(frame).map_err(|e| Error::Protocol(format!("invalid relay frame: {}", e)))?;
        let arr = v
            .as_array()
            .ok_or_else(|| Error::Protocol("relay frame is not an array".to_string()))?;
        let label = arr
            .first()
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Protocol("relay frame has no label".to_string()))?;
        let text = |i: usize| arr.get(i).and_then(|v| v.as_str()).map(|s| s.to_string());

        match label {
            "OK" => {
                let event_id = text(1).ok_or_else(|| Error::Protocol("OK frame missing event id".to_string()))?;
                let accepted = arr
                    .get(2)
                    .and_then(|v| v.as_bool())
                    .ok_or_else(|| Error::Protocol("OK frame missing status".to_string()))?;
                Ok(RelayMessage::Ok {
                    event_id,
                    accepted,
                    message: text(3).unwrap_or_default(),
                })
            }
            "NOTICE" => Ok(RelayMessage::Notice(text(1).unwrap_or_default())),
            "CLOSED" => Ok(RelayMessage::Closed {
                sub_id: text(1).unwrap_or_default(),
                message: text(2).unwrap_or_default(),
            }),
            "EOSE" => Ok(RelayMessage::Eose(text(1).unwrap_or_default())),
            "EVENT" => Ok(RelayMessage::Event {
                sub_id: text(1).unwrap_or_default(),
                event: arr.get(2).cloned().unwrap_or(Value::Null),
            }),
            "AUTH" => Ok(RelayMessage::Auth(text(1).unwrap_or_default())),
            other => Err(Error::Protocol(format!("unknown relay frame: {}", other))),
        }
    }
}

/// Machine-readable prefix of an `OK` message, e.g. `blocked` in `"blocked: spam"`.
pub fn reason_prefix(message: &str) -> Option<&str> {
    let (prefix, _) = message.split_once(':')?;
    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_lowercase() || c == '-') {
        Some(prefix)
    } else {
        None
    }
}

fn decode_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let bytes = hex::decode(s.trim()).ok()?;
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::{
        build_unsigned_event, canonical_json, frame_event, reason_prefix, sign_event, sign_text_note, verify_event,
        RelayMessage, KIND_TEXT_NOTE,
    };
    use crate::crypto::Schnorr;
    use crate::error::Error;
    use crate::keyset::Keyset;
    use serde_json::Value;

    fn signed(content: &str) -> (Schnorr, super::NostrEvent) {
        let scheme = Schnorr::new();
        let keyset = Keyset::generate(&scheme).expect("keyset");
        let ev = sign_text_note(&scheme, &keyset, content).expect("sign");
        (scheme, ev)
    }

    #[test]
    fn canonical_form_is_compact_with_nip01_escapes() {
        let unsigned = build_unsigned_event(
            "ab",
            KIND_TEXT_NOTE,
            vec![vec!["t".to_string(), "x".to_string()]],
            "say \"hi\"\n\té/".to_string(),
            1700000000,
        );
        assert_eq!(
            canonical_json(&unsigned).expect("json"),
            r#"[0,"ab",1700000000,1,[["t","x"]],"say \"hi\"\n\té/"]"#
        );
    }

    #[test]
    fn text_note_shape() {
        let (_scheme, ev) = signed("Hello");
        assert_eq!(ev.kind, 1);
        assert!(ev.tags.is_empty());
        assert_eq!(ev.content, "Hello");
        assert_eq!(ev.pubkey.len(), 64);
        assert_eq!(ev.id.len(), 64);
        assert_eq!(ev.sig.len(), 128);
        assert!(ev.created_at > 0);
    }

    #[test]
    fn pubkey_matches_keyset() {
        let scheme = Schnorr::new();
        let keyset = Keyset::generate(&scheme).expect("keyset");
        let ev = sign_text_note(&scheme, &keyset, "x").expect("sign");
        assert_eq!(ev.pubkey, keyset.public_hex().expect("hex"));
    }

    #[test]
    fn signature_verifies() {
        let (scheme, ev) = signed("Hello");
        assert!(verify_event(&scheme, &ev).expect("verify"));
    }

    #[test]
    fn mutation_after_signing_breaks_verification() {
        let (scheme, ev) = signed("Hello");

        let mut content = ev.clone();
        content.content = "Hellp".to_string();
        assert!(!verify_event(&scheme, &content).expect("verify"));

        let mut ts = ev.clone();
        ts.created_at += 1;
        assert!(!verify_event(&scheme, &ts).expect("verify"));

        let (_, other) = signed("Hello");
        let mut author = ev.clone();
        author.pubkey = other.pubkey;
        assert!(!verify_event(&scheme, &author).expect("verify"));

        // Recomputing the id does not help without the key.
        let mut reid = author.clone();
        reid.id = super::event_id_hex(&reid.unsigned()).expect("id");
        assert!(!verify_event(&scheme, &reid).expect("verify"));
    }

    #[test]
    fn corrupted_private_key_is_signature_error() {
        let scheme = Schnorr::new();
        let mut keyset = Keyset::generate(&scheme).expect("keyset");
        keyset.private = "nsec1garbage".to_string();
        let unsigned = build_unsigned_event("00", 1, vec![], "x".to_string(), 1);
        let err = sign_event(&scheme, &unsigned, &keyset).unwrap_err();
        assert!(matches!(err, Error::Signature(_)));
    }

    #[test]
    fn text_note_with_foreign_public_key_is_signature_error() {
        let scheme = Schnorr::new();
        let mut keyset = Keyset::generate(&scheme).expect("keyset");
        keyset.public = Keyset::generate(&scheme).expect("other").public;
        let err = sign_text_note(&scheme, &keyset, "Hello").unwrap_err();
        assert!(matches!(err, Error::Signature(_)), "got {:?}", err);
    }

    #[test]
    fn frame_wraps_event() {
        let (_scheme, ev) = signed("Hello");
        let v: Value = serde_json::from_str(&frame_event(&ev)).expect("json");
        assert_eq!(v[0], "EVENT");
        assert_eq!(v[1]["id"], ev.id.as_str());
        assert_eq!(v[1]["content"], "Hello");
        assert_eq!(v.as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn parses_ok_frames() {
        let msg = RelayMessage::parse(r#"["OK","abc",false,"blocked: no spam"]"#).expect("parse");
        assert_eq!(
            msg,
            RelayMessage::Ok {
                event_id: "abc".to_string(),
                accepted: false,
                message: "blocked: no spam".to_string(),
            }
        );
        let msg = RelayMessage::parse(r#"["OK","abc",true]"#).expect("parse");
        assert!(matches!(msg, RelayMessage::Ok { accepted: true, .. }));
    }

    #[test]
    fn malformed_frames_are_protocol_errors() {
        for raw in ["not json", "{}", "[]", r#"["OK","abc"]"#, r#"["OK","abc","yes"]"#, r#"["WAT"]"#] {
            assert!(
                matches!(RelayMessage::parse(raw), Err(Error::Protocol(_))),
                "expected protocol error for {}",
                raw
            );
        }
    }

    #[test]
    fn reason_prefix_parsing() {
        assert_eq!(reason_prefix("rate-limited: slow down"), Some("rate-limited"));
        assert_eq!(reason_prefix("pow: difficulty 20 required"), Some("pow"));
        assert_eq!(reason_prefix("plain text"), None);
        assert_eq!(reason_prefix(""), None);
        assert_eq!(reason_prefix("Error: Capital"), None);
    }
}
