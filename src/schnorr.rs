//! BIP340 Schnorr primitives.
//!
//! Tagged hashing, the BIP340 challenge scalar, and the byte-level
//! conversions shared by the adaptor engine and the commitment deriver.
//!
//! BIP340 specifies:
//! - 32-byte x-only public keys (even Y coordinate assumed)
//! - Tagged hashing for domain separation
//! - The challenge `e = H("BIP0340/challenge", R.x || P.x || m) mod n`
//!
//! References:
//! - BIP340: https://github.com/bitcoin/bips/blob/master/bip-0340.mediawiki

use secp256kfun::prelude::*;
use sha2::{Digest, Sha256};

use crate::error::SwapError;

/// Computes a BIP340 tagged hash: SHA256(SHA256(tag) || SHA256(tag) || msg)
/// This provides domain separation for different use cases.
pub fn tagged_hash(tag: &str, msg: &[u8]) -> [u8; 32] {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(&tag_hash);
    hasher.update(&tag_hash);
    hasher.update(msg);
    hasher.finalize().into()
}

/// BIP340/challenge tagged hash over `R.x || P.x || m`.
fn challenge_hash(r_bytes: &[u8; 32], pubkey_bytes: &[u8; 32], message: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(32 + 32 + message.len());
    data.extend_from_slice(r_bytes);
    data.extend_from_slice(pubkey_bytes);
    data.extend_from_slice(message);
    tagged_hash("BIP0340/challenge", &data)
}

/// The BIP340 challenge scalar `e`, reduced mod the curve order.
///
/// Both points must already be the even-Y representatives; this function
/// does not re-canonicalize. Overflow of the 256-bit digest is reduced,
/// matching BIP340 verification.
pub fn challenge(
    nonce: &Point<EvenY>,
    public_key: &Point<EvenY>,
    message: &[u8; 32],
) -> Scalar<Public, Zero> {
    let e_bytes = challenge_hash(
        &nonce.to_xonly_bytes(),
        &public_key.to_xonly_bytes(),
        message,
    );
    let e: Scalar<Public, Zero> = Scalar::from_bytes_mod_order(e_bytes);
    e
}

/// Lifts an X coordinate to the unique curve point with even Y.
pub fn lift_x(x_bytes: [u8; 32]) -> Result<Point<EvenY>, SwapError> {
    Point::<EvenY, Public>::from_xonly_bytes(x_bytes).ok_or(SwapError::InvalidPoint)
}

/// Parses 32 big-endian bytes as a scalar, rejecting values >= the curve
/// order instead of reducing them.
pub fn scalar_from_bytes(bytes: [u8; 32]) -> Result<Scalar<Public, Zero>, SwapError> {
    let scalar: Option<Scalar<Public, Zero>> = Scalar::from_bytes(bytes);
    scalar.ok_or(SwapError::ScalarOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_hash_matches_manual_construction() {
        let tag_hash = Sha256::digest(b"BIP0340/challenge");
        let mut hasher = Sha256::new();
        hasher.update(&tag_hash);
        hasher.update(&tag_hash);
        hasher.update(b"test");
        let expected: [u8; 32] = hasher.finalize().into();

        assert_eq!(tagged_hash("BIP0340/challenge", b"test"), expected);
    }

    #[test]
    fn lift_x_rejects_non_curve_x() {
        // X coordinate with no corresponding curve point (from the BIP340
        // test vectors' invalid-key case).
        let bad: [u8; 32] =
            hex::decode("eefdea4cdb677750a420fee807eacf21eb9898ae79b9768766e4faa04a2d4a34")
                .unwrap()
                .try_into()
                .unwrap();
        assert_eq!(lift_x(bad), Err(SwapError::InvalidPoint));
    }

    #[test]
    fn scalar_from_bytes_rejects_order_overflow() {
        assert_eq!(scalar_from_bytes([0xff; 32]), Err(SwapError::ScalarOverflow));
    }

    #[test]
    fn challenge_is_deterministic_in_its_inputs() {
        let x = Scalar::<Secret, Zero>::from(7u32)
            .non_zero()
            .expect("nonzero")
            .public();
        let (p, _) = g!(x * G).normalize().into_point_with_even_y();
        let m = [0u8; 32];
        let e1 = challenge(&p, &p, &m);
        let e2 = challenge(&p, &p, &m);
        assert_eq!(e1, e2);

        let m2 = [1u8; 32];
        assert_ne!(challenge(&p, &p, &m), challenge(&p, &p, &m2));
    }
}
