//! Schnorr adaptor signatures over secp256k1.
//!
//! An adaptor signature is a pre-signature bound to an adaptor point
//! `T = t*G`: adding the scalar `t` to the pre-signature scalar yields a
//! BIP340-valid signature, and subtracting the pre-signature scalar from
//! a published final signature yields `t` back. This is what makes the
//! atomic swap atomic — whichever side publishes first hands the other
//! side the secret.
//!
//! The nonce commitment `R' = k*G + T` is canonicalized to even Y at
//! creation time by drawing a fresh `k` until `R'` lands on the even-Y
//! branch. The committed secret belongs to the counterparty and cannot
//! be negated, so the usual sign-flip trick BIP340 signers use for odd
//! nonces is not available here; resampling keeps every downstream
//! operation (verify, complete, extract, emit) free of parity
//! adjustments, and any result that still needs one indicates
//! inconsistent inputs rather than bad luck.

use rand::{CryptoRng, RngCore};
use secp256kfun::prelude::*;

use crate::error::SwapError;
use crate::schnorr::{challenge, lift_x, scalar_from_bytes};

/// A pre-signature bound to an adaptor point.
///
/// Immutable once produced. The adaptor point itself is deliberately not
/// stored: the verifier must supply the point it believes the signature
/// is bound to, so a signer cannot quietly swap commitments.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptorSignature {
    /// Adaptor nonce point `R' = k*G + T`, always even Y.
    nonce_point: Point<EvenY>,
    /// Pre-signature scalar `s_a = k + e*x`.
    s: Scalar<Public, Zero>,
    /// The signer's public key, canonical even-Y form.
    public_key: Point<EvenY>,
    /// The 32-byte digest being signed.
    message: [u8; 32],
}

/// Creates an adaptor signature with a nonce from the thread RNG.
///
/// The result completes to a BIP340-valid signature over `message` under
/// the even-Y form of `signing_key * G` once the discrete log of
/// `adaptor_point` is added to it.
pub fn create(
    signing_key: &Scalar<Secret, NonZero>,
    adaptor_point: &Point,
    message: [u8; 32],
) -> Result<AdaptorSignature, SwapError> {
    create_with_rng(signing_key, adaptor_point, message, &mut rand::thread_rng())
}

/// Creates an adaptor signature, drawing nonces from the supplied RNG.
///
/// A fresh nonce is drawn on every call; nonce reuse across two adaptor
/// signatures under the same key leaks the signing key.
pub fn create_with_rng(
    signing_key: &Scalar<Secret, NonZero>,
    adaptor_point: &Point,
    message: [u8; 32],
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<AdaptorSignature, SwapError> {
    // BIP340 canonicalization of the signing key: the challenge commits
    // to the x-only public key, so sign with the scalar whose public
    // point has even Y.
    let mut x = signing_key.clone();
    let raw_public_point = g!(x * G).normalize();
    if !raw_public_point.is_y_even() {
        x = -x;
    }
    let public_key = lift_x(raw_public_point.to_xonly_bytes())?;

    let t_point = *adaptor_point;

    // Draw k until R' = k*G + T has even Y. The committed secret cannot
    // be negated, so an odd-Y R' is discarded rather than flipped.
    let (k, nonce_point) = loop {
        let k = Scalar::random(rng);
        let candidate = g!(t_point + k * G)
            .normalize()
            .non_zero()
            .ok_or(SwapError::DegenerateNonce)?;
        if candidate.is_y_even() {
            break (k, lift_x(candidate.to_xonly_bytes())?);
        }
    };

    let e = challenge(&nonce_point, &public_key, &message);
    let s = s!(k + e * x).public();

    let sig = AdaptorSignature {
        nonce_point,
        s,
        public_key,
        message,
    };

    // Recompute the verification equation against the adaptor point the
    // caller gave us. A mismatch here means a curve-library fault, not
    // bad input.
    if !sig.verify(adaptor_point) {
        return Err(SwapError::SanityCheckFailed);
    }

    Ok(sig)
}

impl AdaptorSignature {
    /// Checks the pre-signature equation `s_a*G == (R' - T) + e*P`
    /// against the supplied adaptor point.
    ///
    /// A `true` result means completing this signature with the discrete
    /// log of `adaptor_point` yields a BIP340-valid signature.
    pub fn verify(&self, adaptor_point: &Point) -> bool {
        let neg_t = -*adaptor_point;
        let nonce_point = self.nonce_point;
        let r = match g!(nonce_point + neg_t).normalize().non_zero() {
            Some(r) => r,
            None => return false,
        };

        let e = challenge(&self.nonce_point, &self.public_key, &self.message);
        let s = self.s.clone();
        let public_key = self.public_key;

        let lhs = g!(s * G).normalize();
        let rhs = g!(r + e * public_key).normalize();
        lhs == rhs
    }

    /// Completes the pre-signature with the secret: `s_final = s_a + t`.
    ///
    /// No validation is performed; a `t` whose commitment differs from
    /// the adaptor point produces a scalar that fails BIP340
    /// verification, which is where the mistake surfaces.
    pub fn complete(&self, secret: &Scalar<Public, Zero>) -> Scalar<Public, Zero> {
        let s = &self.s;
        s!(s + secret).public()
    }

    /// Recovers the secret from a completed signature scalar:
    /// `t = s_final - s_a`.
    ///
    /// The caller must check `t*G` against the adaptor point before
    /// trusting the result; [`extract_secret_checked`] does both steps.
    ///
    /// [`extract_secret_checked`]: Self::extract_secret_checked
    pub fn extract_secret(&self, completed: &Scalar<Public, Zero>) -> Scalar<Public, Zero> {
        let s = &self.s;
        s!(completed - s).public()
    }

    /// Recovers the secret and verifies it against the adaptor point.
    pub fn extract_secret_checked(
        &self,
        completed: &Scalar<Public, Zero>,
        adaptor_point: &Point,
    ) -> Result<Scalar<Public, Zero>, SwapError> {
        let secret = self.extract_secret(completed);
        let commitment = g!(secret * G).normalize().non_zero();
        match commitment {
            Some(commitment) if commitment == *adaptor_point => Ok(secret),
            _ => Err(SwapError::InvalidSecret),
        }
    }

    /// Serializes a completed signature as 64 bytes `R'.x || s_final`.
    ///
    /// The nonce point was canonicalized at creation, so no parity
    /// adjustment happens here; the output is a standard BIP340
    /// signature over [`message`](Self::message) under
    /// [`public_key`](Self::public_key).
    pub fn final_signature(&self, completed: &Scalar<Public, Zero>) -> [u8; 64] {
        let mut signature = [0u8; 64];
        signature[..32].copy_from_slice(&self.nonce_point.to_xonly_bytes());
        signature[32..].copy_from_slice(&completed.to_bytes());
        signature
    }

    /// Recovers the secret from a broadcast 64-byte final signature.
    ///
    /// Checks that the signature's nonce matches this pre-signature and
    /// that the recovered scalar commits to `adaptor_point`. This is the
    /// observing side of the swap: the party that withheld the secret
    /// uses it to confirm what the spend revealed.
    pub fn secret_from_final_signature(
        &self,
        final_signature: &[u8; 64],
        adaptor_point: &Point,
    ) -> Result<Scalar<Public, Zero>, SwapError> {
        let r_bytes: [u8; 32] = final_signature[..32].try_into().expect("split at 32");
        if lift_x(r_bytes)? != self.nonce_point {
            return Err(SwapError::InvalidSecret);
        }

        let s_bytes: [u8; 32] = final_signature[32..].try_into().expect("split at 32");
        let completed = scalar_from_bytes(s_bytes)?;
        self.extract_secret_checked(&completed, adaptor_point)
    }

    /// The canonical (even-Y) adaptor nonce point `R' = k*G + T`.
    pub fn nonce_point(&self) -> Point<EvenY> {
        self.nonce_point
    }

    /// The pre-signature scalar.
    pub fn pre_signature_scalar(&self) -> Scalar<Public, Zero> {
        self.s.clone()
    }

    /// The signer's public key in canonical even-Y form.
    pub fn public_key(&self) -> Point<EvenY> {
        self.public_key
    }

    /// The 32-byte digest this signature commits to.
    pub fn message(&self) -> [u8; 32] {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::random_commitment;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use schnorr_fun::{Message, Schnorr, Signature};
    use sha2::{Digest, Sha256};

    fn scalar(n: u32) -> Scalar<Secret, NonZero> {
        Scalar::<Secret, Zero>::from(n).non_zero().expect("nonzero")
    }

    fn point_of(scalar: &Scalar<Secret, NonZero>) -> Point {
        let scalar = scalar.clone().public();
        g!(scalar * G).normalize()
    }

    fn verify_bip340(public_key: &Point<EvenY>, message: &[u8; 32], signature: &[u8; 64]) -> bool {
        let schnorr = Schnorr::<Sha256>::verify_only();
        let signature = Signature::from_bytes(*signature).expect("64 bytes");
        schnorr.verify(public_key, Message::raw(message), &signature)
    }

    #[test]
    fn create_verify_complete_extract_with_fixed_inputs() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let x = scalar(1);
        let t = scalar(2);
        let t_point = point_of(&t);
        let message: [u8; 32] = Sha256::digest(b"hello").into();

        let sig = create_with_rng(&x, &t_point, message, &mut rng).unwrap();
        assert!(sig.verify(&t_point));

        let completed = sig.complete(&t.clone().public().mark_zero());
        let extracted = sig.extract_secret_checked(&completed, &t_point).unwrap();
        assert_eq!(extracted.to_bytes(), t.to_bytes());

        let final_sig = sig.final_signature(&completed);
        assert!(verify_bip340(&sig.public_key(), &message, &final_sig));
    }

    #[test]
    fn odd_y_signing_key_is_canonicalized() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        // Find a key whose raw public point has odd Y; the stored public
        // key must still come out even.
        let x = (1u32..)
            .map(scalar)
            .find(|x| {
                let x = x.clone();
                !g!(x * G).normalize().is_y_even()
            })
            .unwrap();

        let t = scalar(5);
        let t_point = point_of(&t);
        let message: [u8; 32] = Sha256::digest(b"odd key").into();

        let sig = create_with_rng(&x, &t_point, message, &mut rng).unwrap();
        let raw = g!(x * G).normalize();
        assert_eq!(sig.public_key().to_xonly_bytes(), raw.to_xonly_bytes());
        assert!(sig.verify(&t_point));

        let completed = sig.complete(&t.clone().public().mark_zero());
        let final_sig = sig.final_signature(&completed);
        assert!(verify_bip340(&sig.public_key(), &message, &final_sig));
    }

    #[test]
    fn tampered_pre_signature_fails_verification() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let x = scalar(7);
        let t = scalar(11);
        let t_point = point_of(&t);
        let message: [u8; 32] = Sha256::digest(b"tamper").into();

        let sig = create_with_rng(&x, &t_point, message, &mut rng).unwrap();

        let mut s_bytes = sig.pre_signature_scalar().to_bytes();
        s_bytes[31] ^= 0x01;
        let tampered = AdaptorSignature {
            s: scalar_from_bytes(s_bytes).unwrap(),
            ..sig
        };
        assert!(!tampered.verify(&t_point));
    }

    #[test]
    fn verify_rejects_wrong_adaptor_point() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let x = scalar(9);
        let (_, t_point) = random_commitment(&mut rng);
        let (_, other_point) = random_commitment(&mut rng);
        let message: [u8; 32] = Sha256::digest(b"wrong point").into();

        let sig = create_with_rng(&x, &t_point, message, &mut rng).unwrap();
        assert!(sig.verify(&t_point));
        assert!(!sig.verify(&other_point));
    }

    #[test]
    fn extract_checked_rejects_inconsistent_completion() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let x = scalar(13);
        let (t, t_point) = random_commitment(&mut rng);
        let message: [u8; 32] = Sha256::digest(b"inconsistent").into();

        let sig = create_with_rng(&x, &t_point, message, &mut rng).unwrap();

        // Complete with a scalar that does not commit to T.
        let wrong = s!(t + t).public();
        let completed = sig.complete(&wrong);
        assert_eq!(
            sig.extract_secret_checked(&completed, &t_point),
            Err(SwapError::InvalidSecret)
        );
    }

    #[test]
    fn both_initial_parities_produce_valid_bip340_signatures() {
        // The nonce loop discards odd-Y candidates; over this many seeded
        // trials both the accept-first and redraw paths are exercised.
        let mut rng = ChaCha20Rng::seed_from_u64(6);

        for trial in 0u64..50 {
            let x = Scalar::random(&mut rng);
            let (t, t_point) = random_commitment(&mut rng);
            let message: [u8; 32] = Sha256::digest(trial.to_be_bytes()).into();

            let sig = create_with_rng(&x, &t_point, message, &mut rng).unwrap();
            assert!(sig.verify(&t_point), "trial {trial}: pre-signature invalid");

            let completed = sig.complete(&t);
            let extracted = sig.extract_secret_checked(&completed, &t_point).unwrap();
            assert_eq!(extracted, t, "trial {trial}: secret round-trip failed");

            let final_sig = sig.final_signature(&completed);
            assert!(
                verify_bip340(&sig.public_key(), &message, &final_sig),
                "trial {trial}: final signature not BIP340-valid"
            );
        }
    }

    #[test]
    fn two_pre_signatures_under_one_key_use_distinct_nonces() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let x = scalar(17);
        let (_, t1) = random_commitment(&mut rng);
        let (_, t2) = random_commitment(&mut rng);
        let message: [u8; 32] = Sha256::digest(b"same key, same message").into();

        let sig1 = create_with_rng(&x, &t1, message, &mut rng).unwrap();
        let sig2 = create_with_rng(&x, &t2, message, &mut rng).unwrap();

        // Fresh k per call: shared nonces across commitments would let
        // anyone solve for the signing key from the two s values.
        assert_ne!(
            sig1.nonce_point().to_xonly_bytes(),
            sig2.nonce_point().to_xonly_bytes()
        );
        assert_ne!(sig1.pre_signature_scalar(), sig2.pre_signature_scalar());
    }

    #[test]
    fn secret_recovered_from_broadcast_signature_bytes() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let x = Scalar::random(&mut rng);
        let (t, t_point) = random_commitment(&mut rng);
        let message: [u8; 32] = Sha256::digest(b"broadcast").into();

        let sig = create_with_rng(&x, &t_point, message, &mut rng).unwrap();
        let completed = sig.complete(&t);
        let final_sig = sig.final_signature(&completed);

        let recovered = sig
            .secret_from_final_signature(&final_sig, &t_point)
            .unwrap();
        assert_eq!(recovered, t);

        // A signature for some other nonce must be rejected.
        let mut foreign = final_sig;
        foreign[0] ^= 0x01;
        assert!(sig.secret_from_final_signature(&foreign, &t_point).is_err());
    }
}
