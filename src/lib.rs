//! TANOS: Taproot Adaptor for Nostr-Orchestrated Swaps.
//!
//! Atomic exchange of a signed Nostr event for a Bitcoin payment,
//! enforced with a Schnorr adaptor signature instead of a trusted third
//! party. The seller's event signature scalar doubles as the secret that
//! completes the buyer's Bitcoin signature, so whichever artifact is
//! published first reveals the other.
//!
//! The crate is layered bottom-up:
//! - [`schnorr`]: BIP340 tagged hashes, challenge, and point/scalar parsing
//! - [`adaptor`]: the pre-signature engine
//! - [`commitment`]: deriving the adaptor point from an event signature
//! - [`nostr`] / [`btc`]: the two sides of the trade
//! - [`swap`]: the seller and buyer state machines tying it together

pub mod adaptor;
pub mod btc;
pub mod commitment;
pub mod error;
pub mod nostr;
pub mod schnorr;
pub mod swap;

pub use adaptor::AdaptorSignature;
pub use commitment::{derive_commitment, derive_commitment_checked, random_commitment};
pub use error::SwapError;
pub use swap::{SwapBuyer, SwapOffer, SwapSeller};
