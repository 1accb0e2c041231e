//! Nostr events and their signatures.
//!
//! An event id is the SHA256 of the canonical serialization
//! `[0, pubkey, created_at, kind, tags, content]` (NIP-01), and the
//! event signature is a BIP340 Schnorr signature over those 32 id
//! bytes. That makes a signed event exactly the artifact the adaptor
//! swap needs: a Schnorr signature over a known digest whose scalar
//! half can serve as the swap secret.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rand::rngs::ThreadRng;
use schnorr_fun::nonce::{GlobalRng, Synthetic};
use schnorr_fun::{Message, Schnorr, Signature};
use secp256kfun::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::schnorr::{lift_x, scalar_from_bytes};

/// Kind of a plain text note.
pub const KIND_TEXT_NOTE: u16 = 1;

/// A Nostr event in its wire form (NIP-01). All byte fields are
/// lowercase hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

fn bip340_signer() -> Schnorr<Sha256, Synthetic<Sha256, GlobalRng<ThreadRng>>> {
    Schnorr::new(Synthetic::default())
}

/// Canonical event id: SHA256 over the NIP-01 serialization array.
fn compute_id(
    pubkey: &str,
    created_at: u64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> Result<[u8; 32]> {
    let canonical = serde_json::to_string(&(0u8, pubkey, created_at, kind, tags, content))
        .context("Failed to serialize event for id computation")?;
    Ok(Sha256::digest(canonical.as_bytes()).into())
}

impl Event {
    /// Creates and signs a text-note event. The signature uses a fresh
    /// synthetic nonce drawn from the thread RNG.
    pub fn sign_text_note(secret_key: &Scalar<Secret, NonZero>, content: &str) -> Result<Event> {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before the unix epoch")?
            .as_secs();

        let schnorr = bip340_signer();
        let keypair = schnorr.new_keypair(secret_key.clone());
        let pubkey = hex::encode(keypair.public_key().to_xonly_bytes());

        let tags: Vec<Vec<String>> = Vec::new();
        let id = compute_id(&pubkey, created_at, KIND_TEXT_NOTE, &tags, content)?;
        let sig = schnorr.sign(&keypair, Message::raw(&id));

        Ok(Event {
            id: hex::encode(id),
            pubkey,
            created_at,
            kind: KIND_TEXT_NOTE,
            tags,
            content: content.to_string(),
            sig: hex::encode(sig.to_bytes()),
        })
    }

    /// Recomputes the canonical id and verifies the signature over it.
    pub fn verify(&self) -> Result<bool> {
        let id = compute_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )?;
        if hex::encode(id) != self.id {
            return Ok(false);
        }

        let pubkey = lift_x(decode32(&self.pubkey).context("Invalid event pubkey")?)?;
        let sig_bytes: [u8; 64] = hex::decode(&self.sig)
            .context("Invalid hex in event signature")?
            .try_into()
            .map_err(|_| anyhow::anyhow!("Event signature must be exactly 64 bytes"))?;
        let signature = Signature::from_bytes(sig_bytes)
            .ok_or_else(|| anyhow::anyhow!("Invalid s value in event signature"))?;

        let schnorr = Schnorr::<Sha256>::verify_only();
        Ok(schnorr.verify(&pubkey, Message::raw(&id), &signature))
    }

    /// The 32-byte event id.
    pub fn id_bytes(&self) -> Result<[u8; 32]> {
        decode32(&self.id).context("Invalid event id")
    }

    /// Splits the 64-byte signature into the even-Y nonce point and the
    /// signature scalar — the two halves the swap trades on.
    pub fn signature_parts(&self) -> Result<(Point<EvenY>, Scalar<Public, Zero>)> {
        let sig_bytes: [u8; 64] = hex::decode(&self.sig)
            .context("Invalid hex in event signature")?
            .try_into()
            .map_err(|_| anyhow::anyhow!("Event signature must be exactly 64 bytes"))?;

        let nonce_x: [u8; 32] = sig_bytes[..32].try_into().expect("split at 32");
        let s_bytes: [u8; 32] = sig_bytes[32..].try_into().expect("split at 32");

        let nonce = lift_x(nonce_x).context("Signature nonce is not on the curve")?;
        let scalar = scalar_from_bytes(s_bytes).context("Signature scalar overflows")?;
        Ok((nonce, scalar))
    }
}

fn decode32(hex_str: &str) -> Result<[u8; 32]> {
    hex::decode(hex_str)
        .context("Invalid hex string")?
        .try_into()
        .map_err(|_| anyhow::anyhow!("Expected exactly 32 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn signed_event_verifies() {
        let mut rng = ChaCha20Rng::seed_from_u64(20);
        let secret = Scalar::random(&mut rng);
        let event = Event::sign_text_note(&secret, "hello nostr").unwrap();

        assert!(event.verify().unwrap());
        assert_eq!(event.kind, KIND_TEXT_NOTE);
        assert_eq!(event.content, "hello nostr");
    }

    #[test]
    fn tampered_content_fails_verification() {
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let secret = Scalar::random(&mut rng);
        let mut event = Event::sign_text_note(&secret, "original").unwrap();
        event.content = "tampered".to_string();

        assert!(!event.verify().unwrap());
    }

    #[test]
    fn signature_parts_reassemble_the_signature() {
        let mut rng = ChaCha20Rng::seed_from_u64(22);
        let secret = Scalar::random(&mut rng);
        let event = Event::sign_text_note(&secret, "parts").unwrap();

        let (nonce, scalar) = event.signature_parts().unwrap();
        let mut reassembled = [0u8; 64];
        reassembled[..32].copy_from_slice(&nonce.to_xonly_bytes());
        reassembled[32..].copy_from_slice(&scalar.to_bytes());
        assert_eq!(hex::encode(reassembled), event.sig);
    }

    #[test]
    fn wire_form_round_trips_through_json() {
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        let secret = Scalar::random(&mut rng);
        let event = Event::sign_text_note(&secret, "json").unwrap();

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, event.id);
        assert_eq!(parsed.sig, event.sig);
        assert!(parsed.verify().unwrap());
    }
}
