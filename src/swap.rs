//! Swap orchestration: the seller and buyer roles.
//!
//! The seller owns a Nostr key and sells a signed event; the buyer owns
//! bitcoin and buys it. The exchange hinges on one scalar: the seller's
//! event-signature scalar, committed to as an adaptor point. Publishing
//! the event completes the buyer's Bitcoin signature; broadcasting the
//! completed Bitcoin signature hands the seller proof of exactly the
//! scalar the event signature reveals.
//!
//! Each role is a small state machine. Operations are only legal in the
//! state they are documented for, every failure is terminal for the
//! party that hit it, and nothing mutates after completion. Running
//! several swaps concurrently is fine as long as each has its own
//! seller/buyer value.

use anyhow::{bail, Context, Result};
use bitcoin::{Network, OutPoint, ScriptBuf, Transaction};
use secp256kfun::prelude::*;
use tracing::{debug, info};

use crate::adaptor::{self, AdaptorSignature};
use crate::btc::{taproot, transaction};
use crate::commitment;
use crate::nostr::Event;

/// The public artifacts a seller hands the buyer before the swap: the
/// commitment and the data needed to re-derive and audit it.
#[derive(Debug, Clone)]
pub struct SwapOffer {
    /// Seller's public key, canonical even-Y form.
    pub public_key: Point<EvenY>,
    /// Canonical id of the (still unpublished) event.
    pub event_id: [u8; 32],
    /// X coordinate of the event signature's nonce.
    pub nonce_x: [u8; 32],
    /// Commitment `T` to the event signature's scalar.
    pub commitment: Point,
}

impl SwapOffer {
    /// Re-derives the commitment from the offer's public data and checks
    /// it matches the offered point. Buyers call this before locking
    /// funds; trusting a seller-supplied `T` blindly would let the
    /// seller bind the swap to a secret they never reveal.
    pub fn audit(&self) -> Result<()> {
        let derived = commitment::derive_commitment(&self.public_key, &self.event_id, self.nonce_x)
            .context("Offer data does not derive a commitment")?;
        if derived != self.commitment {
            bail!("Offered commitment does not match the derivation from public data");
        }
        Ok(())
    }
}

// ============================================================================
// Seller
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SellerStage {
    Fresh,
    Signed,
    Revealed,
    Failed,
}

/// The selling side: signs the event, withholds it, reveals it once the
/// buyer's pre-signature is in place, and later confirms what the
/// on-chain spend revealed.
#[derive(Debug)]
pub struct SwapSeller {
    secret_key: Scalar<Secret, NonZero>,
    public_key: Point<EvenY>,
    stage: SellerStage,
    event: Option<Event>,
    offer: Option<SwapOffer>,
    signature_scalar: Option<Scalar<Public, Zero>>,
}

impl SwapSeller {
    /// Creates a seller from an existing Nostr secret key. The key is
    /// canonicalized so its public point has even Y.
    pub fn new(secret_key: Scalar<Secret, NonZero>) -> Self {
        let mut secret_key = secret_key;
        let shown = secret_key.clone().public();
        let (public_key, negated) = g!(shown * G).normalize().into_point_with_even_y();
        if negated {
            secret_key = -secret_key;
        }
        SwapSeller {
            secret_key,
            public_key,
            stage: SellerStage::Fresh,
            event: None,
            offer: None,
            signature_scalar: None,
        }
    }

    /// Creates a seller from a 32-byte hex secret key.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let secret_bytes: [u8; 32] = hex::decode(secret_hex)
            .context("Invalid hex string for secret key")?
            .try_into()
            .map_err(|_| anyhow::anyhow!("Secret key must be exactly 32 bytes"))?;
        let secret_key = Scalar::from_bytes(secret_bytes)
            .context("Secret key overflows the curve order")?
            .non_zero()
            .context("Secret key is zero")?;
        Ok(SwapSeller::new(secret_key))
    }

    /// Creates a seller with a fresh random key.
    pub fn new_random(rng: &mut (impl rand::RngCore + rand::CryptoRng)) -> Self {
        SwapSeller::new(Scalar::random(rng))
    }

    pub fn public_key(&self) -> Point<EvenY> {
        self.public_key
    }

    /// Signs the event being sold and derives the commitment from its
    /// signature. The event and its signature stay private; only the
    /// [`SwapOffer`] is meant for the counterparty.
    pub fn sign_event(&mut self, content: &str) -> Result<&SwapOffer> {
        if self.stage != SellerStage::Fresh {
            bail!("Seller has already signed an event");
        }
        match self.sign_event_inner(content) {
            Ok(()) => Ok(self.offer.as_ref().expect("offer set on success")),
            Err(err) => {
                self.stage = SellerStage::Failed;
                Err(err)
            }
        }
    }

    fn sign_event_inner(&mut self, content: &str) -> Result<()> {
        let event = Event::sign_text_note(&self.secret_key, content)?;
        let event_id = event.id_bytes()?;
        let (nonce, signature_scalar) = event.signature_parts()?;

        let nonce_x = nonce.to_xonly_bytes();
        let commitment = commitment::derive_commitment_checked(
            &self.public_key,
            &event_id,
            nonce_x,
            &signature_scalar,
        )
        .context("Commitment derivation disagrees with the event signature")?;

        debug!(event_id = %event.id, "seller signed swap event");

        self.event = Some(event);
        self.offer = Some(SwapOffer {
            public_key: self.public_key,
            event_id,
            nonce_x,
            commitment,
        });
        self.signature_scalar = Some(signature_scalar);
        self.stage = SellerStage::Signed;
        Ok(())
    }

    /// The offer to hand the buyer. Available once the event is signed.
    pub fn offer(&self) -> Result<&SwapOffer> {
        self.offer
            .as_ref()
            .context("No offer yet: the event has not been signed")
    }

    /// Publishes the signed event, releasing the signature scalar the
    /// buyer needs. Idempotent.
    pub fn reveal(&mut self) -> Result<&Event> {
        match self.stage {
            SellerStage::Signed | SellerStage::Revealed => {
                self.stage = SellerStage::Revealed;
                info!("seller revealed the signed event");
                Ok(self.event.as_ref().expect("event set when signed"))
            }
            _ => bail!("Nothing to reveal: no signed event in this state"),
        }
    }

    /// Confirms an observed spend: extracts the secret from the buyer's
    /// broadcast final signature and checks it is the withheld event
    /// signature scalar. This is how the seller proves the chain paid
    /// for exactly the event it published.
    pub fn confirm_spend(
        &self,
        pre_signature: &AdaptorSignature,
        final_signature: &[u8; 64],
    ) -> Result<Scalar<Public, Zero>> {
        let offer = self.offer()?;
        let expected = self
            .signature_scalar
            .as_ref()
            .context("No signature scalar: the event has not been signed")?;

        let secret = pre_signature
            .secret_from_final_signature(final_signature, &offer.commitment)
            .context("Broadcast signature does not decompose to the committed secret")?;
        if secret != *expected {
            bail!("Extracted secret differs from the event signature scalar");
        }

        info!("seller confirmed the spend revealed the event signature");
        Ok(secret)
    }
}

// ============================================================================
// Buyer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuyerStage {
    Fresh,
    Funded,
    Adapted,
    Completed,
    Failed,
}

/// The buying side: locks funds behind its own taproot key, pre-signs
/// the spend bound to the seller's commitment, and completes the
/// signature once the event is published.
#[derive(Debug)]
pub struct SwapBuyer {
    secret_key: Scalar<Secret, NonZero>,
    public_key: Point<EvenY>,
    stage: BuyerStage,
    spend_tx: Option<Transaction>,
    prevout_script: Option<ScriptBuf>,
    sighash: Option<[u8; 32]>,
    tweaked_secret: Option<Scalar<Secret, NonZero>>,
    commitment: Option<Point>,
    pre_signature: Option<AdaptorSignature>,
}

impl SwapBuyer {
    /// Creates a buyer from an existing Bitcoin secret key.
    pub fn new(secret_key: Scalar<Secret, NonZero>) -> Self {
        let mut secret_key = secret_key;
        let shown = secret_key.clone().public();
        let (public_key, negated) = g!(shown * G).normalize().into_point_with_even_y();
        if negated {
            secret_key = -secret_key;
        }
        SwapBuyer {
            secret_key,
            public_key,
            stage: BuyerStage::Fresh,
            spend_tx: None,
            prevout_script: None,
            sighash: None,
            tweaked_secret: None,
            commitment: None,
            pre_signature: None,
        }
    }

    /// Creates a buyer with a fresh random key.
    pub fn new_random(rng: &mut (impl rand::RngCore + rand::CryptoRng)) -> Self {
        SwapBuyer::new(Scalar::random(rng))
    }

    pub fn public_key(&self) -> Point<EvenY> {
        self.public_key
    }

    /// Builds the transaction spending the locked output and computes
    /// the digest the adaptor signature will commit to. The locked
    /// output is the P2TR output of the buyer's own key; its key path
    /// demands the taptweaked key, so the tweaked secret is prepared
    /// here as well.
    pub fn build_spending_tx(
        &mut self,
        prev_outpoint: OutPoint,
        prevout_value: u64,
        amount_sats: u64,
        network: Network,
    ) -> Result<()> {
        if self.stage != BuyerStage::Fresh {
            bail!("Spending transaction already built");
        }
        match self.build_spending_tx_inner(prev_outpoint, prevout_value, amount_sats, network) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.stage = BuyerStage::Failed;
                Err(err)
            }
        }
    }

    fn build_spending_tx_inner(
        &mut self,
        prev_outpoint: OutPoint,
        prevout_value: u64,
        amount_sats: u64,
        network: Network,
    ) -> Result<()> {
        if amount_sats > prevout_value {
            bail!(
                "Output amount {} exceeds locked value {}",
                amount_sats,
                prevout_value
            );
        }

        let prevout_script = taproot::p2tr_script(&self.public_key, network)?;
        let (tx, _) =
            transaction::build_p2tr_spend(&self.public_key, amount_sats, prev_outpoint, network)?;
        let sighash = transaction::key_spend_sighash(&tx, 0, &prevout_script, prevout_value)?;
        let (tweaked_secret, _) = taproot::tweaked_keypair(&self.secret_key)?;

        debug!(sighash = %hex::encode(sighash), "buyer built spending transaction");

        self.spend_tx = Some(tx);
        self.prevout_script = Some(prevout_script);
        self.sighash = Some(sighash);
        self.tweaked_secret = Some(tweaked_secret);
        self.stage = BuyerStage::Funded;
        Ok(())
    }

    /// Creates and verifies the pre-signature bound to the seller's
    /// commitment. Aborts the swap if verification fails.
    pub fn create_adaptor(&mut self, commitment_point: &Point) -> Result<&AdaptorSignature> {
        if self.stage != BuyerStage::Funded {
            bail!("Adaptor signature can only be created once funding is built");
        }
        match self.create_adaptor_inner(commitment_point) {
            Ok(()) => Ok(self.pre_signature.as_ref().expect("set on success")),
            Err(err) => {
                self.stage = BuyerStage::Failed;
                Err(err)
            }
        }
    }

    fn create_adaptor_inner(&mut self, commitment_point: &Point) -> Result<()> {
        let sighash = self.sighash.context("Missing sighash")?;
        let tweaked_secret = self
            .tweaked_secret
            .as_ref()
            .context("Missing tweaked secret")?;

        let pre_signature = adaptor::create(tweaked_secret, commitment_point, sighash)
            .context("Failed to create adaptor signature")?;
        if !pre_signature.verify(commitment_point) {
            bail!("Adaptor signature failed verification against the commitment");
        }

        debug!("buyer created and verified adaptor signature");

        self.commitment = Some(*commitment_point);
        self.pre_signature = Some(pre_signature);
        self.stage = BuyerStage::Adapted;
        Ok(())
    }

    /// Completes the pre-signature with the revealed scalar, checks the
    /// completion decomposes back to the committed secret, and finalizes
    /// the spending transaction's witness. Returns the 64-byte BIP340
    /// signature ready for broadcast.
    pub fn complete(&mut self, revealed: &Scalar<Public, Zero>) -> Result<[u8; 64]> {
        if self.stage != BuyerStage::Adapted {
            bail!("Completion requires a verified adaptor signature");
        }
        match self.complete_inner(revealed) {
            Ok(sig) => Ok(sig),
            Err(err) => {
                self.stage = BuyerStage::Failed;
                Err(err)
            }
        }
    }

    fn complete_inner(&mut self, revealed: &Scalar<Public, Zero>) -> Result<[u8; 64]> {
        let pre_signature = self.pre_signature.as_ref().context("Missing pre-signature")?;
        let commitment_point = self.commitment.as_ref().context("Missing commitment")?;

        let completed = pre_signature.complete(revealed);
        pre_signature
            .extract_secret_checked(&completed, commitment_point)
            .context("Revealed scalar does not match the commitment")?;

        let final_signature = pre_signature.final_signature(&completed);
        let tx = self.spend_tx.as_mut().context("Missing spending transaction")?;
        transaction::attach_key_spend_witness(tx, 0, &final_signature);

        info!("buyer completed the swap signature");

        self.stage = BuyerStage::Completed;
        Ok(final_signature)
    }

    /// Completes from a published event: verifies the event's own
    /// signature, then completes with its scalar half.
    pub fn complete_from_event(&mut self, event: &Event) -> Result<[u8; 64]> {
        if !event.verify().context("Failed to verify event")? {
            self.stage = BuyerStage::Failed;
            bail!("Published event carries an invalid signature");
        }
        let (_, revealed) = event.signature_parts()?;
        self.complete(&revealed)
    }

    /// The pre-signature to share with the seller.
    pub fn pre_signature(&self) -> Result<&AdaptorSignature> {
        self.pre_signature
            .as_ref()
            .context("No adaptor signature yet")
    }

    /// The digest the adaptor signature commits to.
    pub fn sighash(&self) -> Result<[u8; 32]> {
        self.sighash.context("No sighash yet: funding not built")
    }

    /// The spending transaction (witness included once completed).
    pub fn spend_tx(&self) -> Result<&Transaction> {
        self.spend_tx
            .as_ref()
            .context("No spending transaction yet")
    }

    /// Script of the locked output the spend consumes; what an observer
    /// watches on chain for the completing signature.
    pub fn prevout_script(&self) -> Result<&ScriptBuf> {
        self.prevout_script
            .as_ref()
            .context("No locked output yet: funding not built")
    }

    /// Consensus-encoded hex of the spending transaction for broadcast.
    pub fn raw_spend_tx(&self) -> Result<String> {
        Ok(transaction::serialize_tx(self.spend_tx()?))
    }
}
