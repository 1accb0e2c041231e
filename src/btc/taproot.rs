//! Taproot addresses and key tweaking.
//!
//! Key-path-only P2TR: the output key is the internal key tweaked with
//! `tagged_hash("TapTweak", P.x)` and an empty script tree (BIP341). A
//! key-path spend therefore needs a BIP340 signature under the tweaked
//! key, so the signing side of the swap tweaks its secret the same way.

use anyhow::{Context, Result};
use bitcoin::address::Address;
use bitcoin::key::XOnlyPublicKey;
use bitcoin::script::ScriptBuf;
use bitcoin::Network;
use secp256kfun::prelude::*;

use crate::schnorr::{lift_x, tagged_hash};

/// The BIP341 key tweak for an internal key with no script tree.
pub fn taptweak(internal_key: &Point<EvenY>) -> Scalar<Public, Zero> {
    let tweak_bytes = tagged_hash("TapTweak", &internal_key.to_xonly_bytes());
    let tweak: Scalar<Public, Zero> = Scalar::from_bytes_mod_order(tweak_bytes);
    tweak
}

/// Tweaks a signing key for a key-path spend: `d' = d + taptweak(P)`,
/// with both the input and the tweaked result canonicalized to their
/// even-Y public keys.
pub fn tweaked_keypair(
    secret_key: &Scalar<Secret, NonZero>,
) -> Result<(Scalar<Secret, NonZero>, Point<EvenY>)> {
    let mut secret = secret_key.clone();
    let raw_key = g!(secret * G).normalize();
    if !raw_key.is_y_even() {
        secret = -secret;
    }
    let internal_key = lift_x(raw_key.to_xonly_bytes())?;

    let tweak = taptweak(&internal_key);
    let mut tweaked_secret = s!(secret + tweak)
        .non_zero()
        .context("Tweaked secret is zero")?;

    let raw_tweaked = g!(tweaked_secret * G).normalize();
    if !raw_tweaked.is_y_even() {
        tweaked_secret = -tweaked_secret;
    }
    let tweaked_key = lift_x(raw_tweaked.to_xonly_bytes())?;

    Ok((tweaked_secret, tweaked_key))
}

/// P2TR address for an internal key (key-path only, no script tree).
pub fn p2tr_address(internal_key: &Point<EvenY>, network: Network) -> Result<Address> {
    let xonly = XOnlyPublicKey::from_slice(&internal_key.to_xonly_bytes())
        .context("Failed to create x-only public key")?;
    let secp = bitcoin::secp256k1::Secp256k1::new();
    Ok(Address::p2tr(&secp, xonly, None, network))
}

/// The scriptPubKey of the P2TR output for an internal key.
pub fn p2tr_script(internal_key: &Point<EvenY>, network: Network) -> Result<ScriptBuf> {
    Ok(p2tr_address(internal_key, network)?.script_pubkey())
}

/// A taproot output locked to the combination of a signer's key and a
/// swap commitment: the internal key is `P + T`, spendable only with
/// knowledge of both discrete logs.
pub fn swap_lock_address(
    signer_key: &Point<EvenY>,
    commitment: &Point,
    network: Network,
) -> Result<Address> {
    let signer_key = *signer_key;
    let commitment = *commitment;
    let combined = g!(signer_key + commitment)
        .normalize()
        .non_zero()
        .context("Signer key and commitment cancel out")?;
    let (internal_key, _) = combined.into_point_with_even_y();
    p2tr_address(&internal_key, network)
}
