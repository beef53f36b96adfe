//! Webhook signature verification (Stripe `v1` scheme).
//!
//! The `Stripe-Signature` header has the format:
//!   t=<timestamp>,v1=<signature>[,v1=<signature>...]
//!
//! Each `v1` value is hex HMAC-SHA256 over `"{timestamp}.{payload}"` keyed
//! with the endpoint secret.

use crate::error::ReconcileError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Tolerance window for the signed timestamp (5 minutes).
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

fn mac_for(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, ReconcileError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ReconcileError::InvalidSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verifies `header` against `payload`.
///
/// `now_secs` is the current Unix time; the signed timestamp must be within
/// `tolerance_secs` of it. Signature bytes are compared in constant time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_secs: i64,
    tolerance_secs: i64,
) -> Result<(), ReconcileError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if let Some(ts) = part.strip_prefix("t=") {
            timestamp = Some(ts);
        } else if let Some(sig) = part.strip_prefix("v1=") {
            signatures.push(sig);
        }
    }

    let ts = timestamp.ok_or(ReconcileError::InvalidSignature)?;
    if signatures.is_empty() {
        debug!("signature header has no v1 entries");
        return Err(ReconcileError::InvalidSignature);
    }

    let ts_val: i64 = ts.parse().map_err(|_| ReconcileError::InvalidSignature)?;
    if (now_secs - ts_val).abs() > tolerance_secs {
        debug!(signed_at = ts_val, now = now_secs, "signature timestamp outside tolerance");
        return Err(ReconcileError::InvalidSignature);
    }

    let mac = mac_for(secret, ts, payload)?;
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(ReconcileError::InvalidSignature)
    }
}

/// Builds a valid signature header for `payload` signed at `timestamp`.
///
/// Used by tooling and tests that replay provider deliveries.
pub fn signature_header(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, ReconcileError> {
    let ts = timestamp.to_string();
    let sig = hex::encode(mac_for(secret, &ts, payload)?.finalize().into_bytes());
    Ok(format!("t={ts},v1={sig}"))
}
