//! Nostr-side functionality for the swap.
//!
//! Provides:
//! - The NIP-01 event type with canonical id computation
//! - BIP340 signing and verification of events
//! - Extraction of the signature nonce and scalar the swap trades on

pub mod event;

pub use event::{Event, KIND_TEXT_NOTE};
