//! Spend-transaction building and sighash computation.
//!
//! The swap signs exactly one digest: the BIP341 key-path sighash of the
//! transaction spending the locked output. Construction here is
//! deliberately minimal — one input, one output, RBF-enabled — since fee
//! negotiation and broadcasting belong to the caller.

use anyhow::{Context, Result};
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::transaction::Version;
use bitcoin::{Amount, Network, OutPoint, Sequence, Transaction, TxIn, TxOut, Witness};
use secp256kfun::prelude::*;

use super::taproot;

/// Builds a transaction spending `prev_outpoint` into a single P2TR
/// output for `recipient_key`. Returns the transaction and the
/// scriptPubKey of its output.
pub fn build_p2tr_spend(
    recipient_key: &Point<EvenY>,
    amount_sats: u64,
    prev_outpoint: OutPoint,
    network: Network,
) -> Result<(Transaction, ScriptBuf)> {
    let script_pubkey = taproot::p2tr_script(recipient_key, network)?;

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: prev_outpoint,
            script_sig: ScriptBuf::new(), // Empty for SegWit
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(amount_sats),
            script_pubkey: script_pubkey.clone(),
        }],
    };

    Ok((tx, script_pubkey))
}

/// BIP341 key-path sighash (`SIGHASH_DEFAULT`) for one input, given the
/// script and value of the output it spends.
pub fn key_spend_sighash(
    tx: &Transaction,
    input_index: usize,
    prevout_script: &ScriptBuf,
    prevout_value: u64,
) -> Result<[u8; 32]> {
    let prevouts = vec![TxOut {
        value: Amount::from_sat(prevout_value),
        script_pubkey: prevout_script.clone(),
    }];

    let mut sighash_cache = SighashCache::new(tx);
    let sighash = sighash_cache
        .taproot_key_spend_signature_hash(input_index, &Prevouts::All(&prevouts), TapSighashType::Default)
        .context("Failed to compute sighash")?;

    Ok(*sighash.as_byte_array())
}

/// Attaches a 64-byte BIP340 signature as the key-path witness.
pub fn attach_key_spend_witness(tx: &mut Transaction, input_index: usize, signature: &[u8; 64]) {
    tx.input[input_index].witness = Witness::from_slice(&[&signature[..]]);
}

/// Serializes a transaction to consensus-encoded hex for broadcast.
pub fn serialize_tx(tx: &Transaction) -> String {
    bitcoin::consensus::encode::serialize_hex(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::Txid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::str::FromStr;

    fn demo_outpoint() -> OutPoint {
        let txid =
            Txid::from_str("0000000000000000000000000000000000000000000000000000000000000000")
                .unwrap();
        OutPoint::new(txid, 0)
    }

    #[test]
    fn spend_has_one_input_and_one_p2tr_output() {
        let mut rng = ChaCha20Rng::seed_from_u64(40);
        let secret = Scalar::random(&mut rng).public();
        let (key, _) = g!(secret * G).normalize().into_point_with_even_y();

        let (tx, script) = build_p2tr_spend(&key, 90_000, demo_outpoint(), Network::Signet).unwrap();
        assert_eq!(tx.input.len(), 1);
        assert_eq!(tx.output.len(), 1);
        assert_eq!(tx.output[0].value, Amount::from_sat(90_000));
        assert!(script.is_p2tr());
        assert_eq!(tx.output[0].script_pubkey, script);
    }

    #[test]
    fn sighash_commits_to_prevout_value() {
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        let secret = Scalar::random(&mut rng).public();
        let (key, _) = g!(secret * G).normalize().into_point_with_even_y();

        let (tx, script) = build_p2tr_spend(&key, 90_000, demo_outpoint(), Network::Signet).unwrap();
        let h1 = key_spend_sighash(&tx, 0, &script, 100_000).unwrap();
        let h2 = key_spend_sighash(&tx, 0, &script, 100_001).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn witness_carries_the_signature() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let secret = Scalar::random(&mut rng).public();
        let (key, _) = g!(secret * G).normalize().into_point_with_even_y();

        let (mut tx, _) = build_p2tr_spend(&key, 90_000, demo_outpoint(), Network::Signet).unwrap();
        let signature = [7u8; 64];
        attach_key_spend_witness(&mut tx, 0, &signature);

        assert_eq!(tx.input[0].witness.len(), 1);
        assert_eq!(tx.input[0].witness.nth(0).unwrap(), &signature[..]);

        let raw = serialize_tx(&tx);
        assert!(raw.contains(&hex::encode(signature)));
    }
}
