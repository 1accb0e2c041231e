//! Commitment points for the swap.
//!
//! The adaptor point `T` the buyer binds to is not an arbitrary value:
//! it is reconstructed from the seller's (still unpublished) Schnorr
//! signature. For a BIP340 signature `(R.x, s)` over `m` under `P`, the
//! verification equation `s*G = R + e*P` means the point `R + e*P` has
//! discrete log exactly `s` — so deriving `T = R + e*P` from public data
//! commits the swap to the signature scalar the seller will later
//! reveal.

use rand::{CryptoRng, RngCore};
use secp256kfun::prelude::*;

use crate::error::SwapError;
use crate::schnorr::{challenge, lift_x};

/// Derives the commitment `T = R + e*P` from the public half of a
/// Schnorr signature: the signer's key, the signed digest, and the
/// signature's nonce X coordinate.
///
/// Fails with [`SwapError::InvalidPoint`] when the nonce X does not lie
/// on the curve or the sum degenerates to the identity.
pub fn derive_commitment(
    public_key: &Point<EvenY>,
    message: &[u8; 32],
    nonce_x: [u8; 32],
) -> Result<Point, SwapError> {
    let r = lift_x(nonce_x)?;
    let e = challenge(&r, public_key, message);
    let public_key = *public_key;
    g!(r + e * public_key)
        .normalize()
        .non_zero()
        .ok_or(SwapError::InvalidPoint)
}

/// Derives the commitment and confirms the supplied signature scalar is
/// its discrete log, i.e. `s*G == T`.
///
/// The check is exactly BIP340 verification of `(nonce_x, s)`, so the
/// holder of the signature uses this form before offering the commitment
/// to a counterparty. Fails with [`SwapError::InvalidSecret`] when the
/// scalar does not match.
pub fn derive_commitment_checked(
    public_key: &Point<EvenY>,
    message: &[u8; 32],
    nonce_x: [u8; 32],
    signature_scalar: &Scalar<Public, Zero>,
) -> Result<Point, SwapError> {
    let commitment = derive_commitment(public_key, message, nonce_x)?;
    let signature_scalar = signature_scalar.clone();
    let expected = g!(signature_scalar * G).normalize().non_zero();
    match expected {
        Some(expected) if expected == commitment => Ok(commitment),
        _ => Err(SwapError::InvalidSecret),
    }
}

/// A fresh random commitment pair `(t, t*G)`.
///
/// Not part of the swap protocol proper; exists so the adaptor engine
/// can be exercised symmetrically without a signature to derive from.
pub fn random_commitment(rng: &mut (impl RngCore + CryptoRng)) -> (Scalar<Public, Zero>, Point) {
    let t = Scalar::random(rng).public();
    let t_point = g!(t * G).normalize();
    (t.mark_zero(), t_point)
}
