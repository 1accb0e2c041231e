//! Bitcoin Integration
//!
//! This module provides Bitcoin-specific functionality:
//!
//! - **taproot**: P2TR addresses, scripts, and key tweaking (BIP341)
//! - **transaction**: spend-transaction building and key-path sighash

pub mod taproot;
pub mod transaction;
