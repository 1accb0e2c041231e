//! Error kinds surfaced by the adaptor engine and commitment deriver.
//!
//! Every failure is fatal for the swap that hit it; there is no retry
//! policy at this layer. The orchestration code in [`crate::swap`] wraps
//! these in `anyhow` context on the way up.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SwapError {
    /// An X coordinate does not lift to a curve point, or a computed
    /// point is the identity.
    #[error("point is not on the curve or is the identity")]
    InvalidPoint,

    /// 32 bytes interpreted as a scalar were >= the curve order.
    #[error("scalar bytes overflow the curve order")]
    ScalarOverflow,

    /// The adaptor nonce computation produced the point at infinity,
    /// meaning the adaptor point was the exact negation of the nonce
    /// commitment.
    #[error("adaptor nonce degenerated to the point at infinity")]
    DegenerateNonce,

    /// A freshly created adaptor signature failed its own verification
    /// equation. Indicates a curve-library bug, not bad input.
    #[error("adaptor signature failed its creation-time sanity check")]
    SanityCheckFailed,

    /// A completed signature did not decompose to the scalar committed
    /// to by the adaptor point.
    #[error("extracted secret does not match the commitment")]
    InvalidSecret,
}
